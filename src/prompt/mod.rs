//! Prompt profiles for grounded queries
//!
//! A profile names a file holding the system instruction sent with a query.
//! Unknown profiles fall back to the configured default profile, then to the
//! first profile defined, and finally to a built-in instruction.

use crate::config::PromptConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Instruction used when no profile provides usable text
pub const FALLBACK_INSTRUCTION: &str = "You are an expert assistant on the indexed documents. \
Answer precisely, in the language of the question, and always finish with a 'Sources' \
section citing the documents you used.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Cannot read prompt file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolved instruction for a query
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInstruction {
    /// Profile actually used; `None` when the built-in text was used
    pub profile: Option<String>,
    pub text: String,
}

/// Named system-instruction files
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    default_profile: String,
    profiles: BTreeMap<String, PathBuf>,
    base_dir: PathBuf,
}

impl PromptLibrary {
    /// Relative profile paths are resolved against `base_dir`
    pub fn new(config: &PromptConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_profile: config.default_profile.clone(),
            profiles: config.profiles.clone(),
            base_dir: base_dir.into(),
        }
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Picks the profile to use for `requested`
    fn resolve(&self, requested: &str) -> Option<(&str, &Path)> {
        self.profiles
            .get_key_value(requested)
            .or_else(|| self.profiles.get_key_value(&self.default_profile))
            .or_else(|| self.profiles.iter().next())
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Loads the system instruction for `profile`
    ///
    /// # Errors
    ///
    /// Fails only when the resolved profile file cannot be read. An empty
    /// file yields [`FALLBACK_INSTRUCTION`].
    pub fn system_instruction(&self, profile: &str) -> Result<SystemInstruction, PromptError> {
        let Some((name, path)) = self.resolve(profile) else {
            tracing::warn!(profile, "No prompt profiles configured, using built-in instruction");
            return Ok(SystemInstruction {
                profile: None,
                text: FALLBACK_INSTRUCTION.to_string(),
            });
        };

        if name != profile {
            tracing::info!(requested = profile, used = name, "Prompt profile not found, falling back");
        }

        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        let content = std::fs::read_to_string(&full_path).map_err(|e| PromptError::Read {
            path: full_path.clone(),
            source: e,
        })?;

        let text = content.trim();
        if text.is_empty() {
            tracing::warn!(profile = name, "Prompt file is empty, using built-in instruction");
            return Ok(SystemInstruction {
                profile: Some(name.to_string()),
                text: FALLBACK_INSTRUCTION.to_string(),
            });
        }

        Ok(SystemInstruction {
            profile: Some(name.to_string()),
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library(dir: &TempDir, profiles: &[(&str, &str, &str)], default: &str) -> PromptLibrary {
        let mut map = BTreeMap::new();
        for (name, file, content) in profiles {
            std::fs::write(dir.path().join(file), content).unwrap();
            map.insert(name.to_string(), PathBuf::from(file));
        }
        let config = PromptConfig {
            default_profile: default.to_string(),
            profiles: map,
        };
        PromptLibrary::new(&config, dir.path())
    }

    #[test]
    fn test_requested_profile() {
        let dir = TempDir::new().unwrap();
        let lib = library(
            &dir,
            &[("default", "base.txt", "Base."), ("legal", "legal.txt", "Cite articles.")],
            "default",
        );
        let instruction = lib.system_instruction("legal").unwrap();
        assert_eq!(instruction.profile.as_deref(), Some("legal"));
        assert_eq!(instruction.text, "Cite articles.");
    }

    #[test]
    fn test_unknown_profile_uses_default() {
        let dir = TempDir::new().unwrap();
        let lib = library(
            &dir,
            &[("default", "base.txt", "Base."), ("legal", "legal.txt", "Cite.")],
            "default",
        );
        let instruction = lib.system_instruction("missing").unwrap();
        assert_eq!(instruction.profile.as_deref(), Some("default"));
    }

    #[test]
    fn test_no_default_uses_first_profile() {
        let dir = TempDir::new().unwrap();
        let lib = library(
            &dir,
            &[("beta", "b.txt", "B."), ("alpha", "a.txt", "A.")],
            "default",
        );
        let instruction = lib.system_instruction("missing").unwrap();
        assert_eq!(instruction.profile.as_deref(), Some("alpha"));
        assert_eq!(instruction.text, "A.");
    }

    #[test]
    fn test_empty_file_uses_builtin() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir, &[("default", "base.txt", "  \n")], "default");
        let instruction = lib.system_instruction("default").unwrap();
        assert_eq!(instruction.text, FALLBACK_INSTRUCTION);
    }

    #[test]
    fn test_no_profiles_uses_builtin() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir, &[], "default");
        let instruction = lib.system_instruction("anything").unwrap();
        assert_eq!(instruction.profile, None);
        assert_eq!(instruction.text, FALLBACK_INSTRUCTION);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let config = PromptConfig {
            default_profile: "default".to_string(),
            profiles: BTreeMap::from([("default".to_string(), PathBuf::from("nope.txt"))]),
        };
        let lib = PromptLibrary::new(&config, dir.path());
        assert!(matches!(
            lib.system_instruction("default"),
            Err(PromptError::Read { .. })
        ));
    }
}
