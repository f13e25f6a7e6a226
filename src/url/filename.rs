use sha2::{Digest, Sha256};
use url::Url;

/// Number of hex characters kept from the URL hash
pub const IDENTIFIER_LEN: usize = 10;

/// Basename used when a URL ends in a slash
pub const DEFAULT_BASENAME: &str = "file.pdf";

/// Computes the short, stable identifier of a URL
///
/// The identifier is the first [`IDENTIFIER_LEN`] hex characters of the
/// SHA-256 digest of the URL string. The same URL always yields the same
/// identifier, across runs and machines.
///
/// # Examples
///
/// ```
/// use doc_harvest::url::url_identifier;
///
/// let a = url_identifier("https://example.com/a.pdf");
/// assert_eq!(a.len(), 10);
/// assert_eq!(a, url_identifier("https://example.com/a.pdf"));
/// assert_ne!(a, url_identifier("https://example.com/b.pdf"));
/// ```
pub fn url_identifier(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(IDENTIFIER_LEN);
    id
}

/// Extracts a filesystem-safe basename from a URL
///
/// Query strings and fragments are dropped. Characters outside
/// `[A-Za-z0-9._-]` are replaced with `_`. A URL without a final path
/// segment yields [`DEFAULT_BASENAME`].
pub fn url_basename(url: &str) -> String {
    let raw = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_string(),
        Err(_) => {
            let without_suffix = url.split(['?', '#']).next().unwrap_or("");
            without_suffix.rsplit('/').next().unwrap_or("").to_string()
        }
    };

    let sanitized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        DEFAULT_BASENAME.to_string()
    } else {
        sanitized
    }
}

/// Builds the on-disk file name for a URL: `<identifier>_<basename>`
pub fn target_filename(url: &str) -> String {
    format!("{}_{}", url_identifier(url), url_basename(url))
}

/// Returns the lowercase extension of a file name, including the dot
///
/// Everything from the last `.` onwards counts as the extension, so
/// `"report.PDF"` gives `Some(".pdf")` and `"README"` gives `None`.
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|idx| filename[idx..].to_lowercase())
}

/// Checks whether a file name ends in one of the given extensions
pub fn has_extension(filename: &str, extensions: &[String]) -> bool {
    match extension_of(filename) {
        Some(ext) => extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)),
        None => false,
    }
}
