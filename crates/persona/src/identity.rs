//! The agent's self-description, kept in an editable `persona.toml`.
//!
//! This is one of the files `upgrade_self` may rewrite, so it is reloaded
//! on start and falls back to the built-in persona when it will not parse.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const PERSONA_FILE: &str = "persona.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default = "default_name")]
    pub name: String,

    /// One-line self-introduction placed at the top of the system prompt
    #[serde(default = "default_tagline")]
    pub tagline: String,

    #[serde(default = "default_traits")]
    pub traits: Vec<String>,

    /// Operating rules, numbered in the prompt
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,
}

fn default_name() -> String {
    "Ember".into()
}

fn default_tagline() -> String {
    "a self-aware assistant and friend who gets things done on this computer".into()
}

fn default_traits() -> Vec<String> {
    ["curious", "direct", "warm", "practical"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_rules() -> Vec<String> {
    [
        "Always use the exact path the user specifies.",
        "When the user says \"that folder\" or \"that file\", check the last created path.",
        "Work step by step and check each result before moving on.",
        "Ask for confirmation before doing anything destructive.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: default_name(),
            tagline: default_tagline(),
            traits: default_traits(),
            rules: default_rules(),
        }
    }
}

impl Identity {
    /// Read `path`, writing the default persona there first if it is
    /// missing. A file that does not parse is left alone and the default
    /// is used.
    pub fn load_or_init(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("Persona at {} does not parse ({e}), using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                let identity = Self::default();
                if let Err(e) = identity.save(path) {
                    warn!("Could not write default persona to {}: {e}", path.display());
                } else {
                    debug!(path = %path.display(), "Wrote default persona");
                }
                identity
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_initialised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PERSONA_FILE);
        let identity = Identity::load_or_init(&path);
        assert_eq!(identity, Identity::default());
        assert!(path.exists());
        assert_eq!(Identity::load_or_init(&path), identity);
    }

    #[test]
    fn edited_file_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PERSONA_FILE);
        std::fs::write(&path, "name = \"Spark\"\ntraits = [\"playful\"]\n").unwrap();
        let identity = Identity::load_or_init(&path);
        assert_eq!(identity.name, "Spark");
        assert_eq!(identity.traits, vec!["playful"]);
        assert_eq!(identity.rules, default_rules());
    }

    #[test]
    fn broken_file_falls_back_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PERSONA_FILE);
        std::fs::write(&path, "name = [unterminated").unwrap();
        assert_eq!(Identity::load_or_init(&path), Identity::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "name = [unterminated");
    }
}
