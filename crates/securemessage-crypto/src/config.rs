//! Codec configuration.
//!
//! Resolution order (lowest to highest priority):
//! 1. Built-in defaults
//! 2. Optional JSON settings file
//! 3. Environment variables (`SECUREMESSAGE_*`)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};

/// Environment variable overriding [`CodecConfig::reuse_session_keys`].
pub const ENV_REUSE_SESSION_KEYS: &str = "SECUREMESSAGE_REUSE_SESSION_KEYS";

/// Environment variable overriding [`CodecConfig::max_envelope_bytes`].
pub const ENV_MAX_ENVELOPE_BYTES: &str = "SECUREMESSAGE_MAX_ENVELOPE_BYTES";

/// Tunables for an [`Identity`](crate::Identity)'s encrypt/decrypt calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Default `reuse` flag for `encrypt`/`decrypt` when none is given.
    pub reuse_session_keys: bool,
    /// Inbound envelopes longer than this are rejected before parsing.
    pub max_envelope_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            reuse_session_keys: true,
            max_envelope_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl CodecConfig {
    /// Load configuration from an optional JSON file, then apply
    /// environment overrides.
    ///
    /// A path that does not exist yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON settings file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            CryptoError::SerializationError(format!("Failed to parse codec config: {e}"))
        })
    }

    /// Apply `SECUREMESSAGE_*` overrides read through `lookup`.
    ///
    /// Values that do not parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_REUSE_SESSION_KEYS) {
            if let Some(flag) = parse_flag(&val) {
                self.reuse_session_keys = flag;
            }
        }
        if let Some(val) = lookup(ENV_MAX_ENVELOPE_BYTES) {
            if let Ok(n) = val.trim().parse() {
                self.max_envelope_bytes = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_envelope_bytes == 0 {
            return Err(CryptoError::InvalidConfig(
                "max_envelope_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_reuse_keys_and_cap_at_one_mebibyte() {
        let config = CodecConfig::default();
        assert!(config.reuse_session_keys);
        assert_eq!(config.max_envelope_bytes, 1024 * 1024);
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config = CodecConfig::load(None).unwrap();
        assert_eq!(config.max_envelope_bytes, 1024 * 1024);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CodecConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.max_envelope_bytes, 1024 * 1024);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.json");
        std::fs::write(&path, r#"{ "reuse_session_keys": false }"#).unwrap();

        let config = CodecConfig::from_file(&path).unwrap();
        assert!(!config.reuse_session_keys);
        // Field absent from the file keeps its default.
        assert_eq!(config.max_envelope_bytes, 1024 * 1024);
    }

    #[test]
    fn corrupted_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = CodecConfig::load(Some(&path));
        assert!(matches!(result, Err(CryptoError::SerializationError(_))));
    }

    #[test]
    fn env_overrides_take_priority() {
        let mut config = CodecConfig::default();
        config.apply_overrides(env(&[
            (ENV_REUSE_SESSION_KEYS, "false"),
            (ENV_MAX_ENVELOPE_BYTES, "4096"),
        ]));
        assert!(!config.reuse_session_keys);
        assert_eq!(config.max_envelope_bytes, 4096);
    }

    #[test]
    fn unparsable_env_values_are_ignored() {
        let mut config = CodecConfig::default();
        config.apply_overrides(env(&[
            (ENV_REUSE_SESSION_KEYS, "maybe"),
            (ENV_MAX_ENVELOPE_BYTES, "lots"),
        ]));
        assert_eq!(config, CodecConfig::default());
    }

    #[test]
    fn numeric_flags_are_accepted() {
        let mut config = CodecConfig::default();
        config.apply_overrides(env(&[(ENV_REUSE_SESSION_KEYS, "0")]));
        assert!(!config.reuse_session_keys);
        config.apply_overrides(env(&[(ENV_REUSE_SESSION_KEYS, " 1 ")]));
        assert!(config.reuse_session_keys);
    }

    #[test]
    fn zero_envelope_limit_is_invalid() {
        let config = CodecConfig {
            max_envelope_bytes: 0,
            ..CodecConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CryptoError::InvalidConfig(_))
        ));
    }
}
