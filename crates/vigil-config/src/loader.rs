//! Rule-document discovery and layered loading.
//!
//! The `load()` algorithm:
//! 1. Parse the embedded `defaults.toml` -> base
//! 2. Deep-merge the user rule file over it, if one was given
//! 3. Deserialize the merged tree -> [`RuleConfig`]
//! 4. Validate

use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::types::RuleConfig;
use crate::validate;

/// Embedded default rule document.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Load the rule document, overlaying `path` (when given) on the
/// built-in defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, either document
/// is malformed, or the merged result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<RuleConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    if let Some(path) = path {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let overlay: toml::Value = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        deep_merge(&mut merged, overlay);
        info!(path = %path.display(), "loaded rule document");
    }

    let config: RuleConfig = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: "<merged rule document>".to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Merge `overlay` into `base`: tables merge recursively, everything
/// else (including arrays) replaces wholesale.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vigil_core::CriticalityTier;

    #[test]
    fn test_load_defaults_only() {
        let config = load(None).unwrap();
        assert!(config.learning.enabled);
        assert_eq!(config.learning.min_feedback_count, 10);
    }

    #[test]
    fn test_overlay_replaces_scalars_and_arrays() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "vip_contacts = [\"Chair\"]\n\n[timeout_settings.high]\ntimeout_minutes = 3\nescalation_enabled = true\nescalation_channels = [\"call\"]"
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.vip_contacts, vec!["Chair".to_string()]);
        assert_eq!(config.timeout_settings.high.timeout_minutes, 3);
        // Untouched sections keep their defaults
        assert_eq!(config.timeout_settings.medium.timeout_minutes, 15);
        assert_eq!(
            config.default_tier(vigil_core::ActionType::CallMake),
            CriticalityTier::High
        );
    }

    #[test]
    fn test_malformed_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "vip_contacts = not toml").unwrap();
        assert!(matches!(
            load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = load(Some(Path::new("/nonexistent/rules.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_overlay_rejected_by_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // HIGH timeout above MEDIUM violates tier ordering
        writeln!(
            file,
            "[timeout_settings.high]\ntimeout_minutes = 30\nescalation_enabled = true\nescalation_channels = [\"call\"]"
        )
        .unwrap();
        assert!(matches!(
            load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }
}
