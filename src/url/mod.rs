//! URL handling module for Doc-Harvest
//!
//! Turns document URLs into stable, collision-resistant local file names:
//! a short hash of the URL followed by the URL's basename.

mod filename;

// Re-export main functions
pub use filename::{
    extension_of, has_extension, target_filename, url_basename, url_identifier,
    DEFAULT_BASENAME, IDENTIFIER_LEN,
};
