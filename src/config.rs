//! Runtime configuration from `VISIONCARE_*` environment variables.

use std::path::PathBuf;

use crate::adapters::forest::{load_verifying_key, ArtifactPolicy};
use crate::adapters::sanitize::DEFAULT_SANITIZE_MAX_BYTES;
use crate::adapters::ArtifactError;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise.
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Model artifact file, or a directory holding `vision_model.json`
    pub model_path: PathBuf,
    /// Directory the PDF report is written to
    pub report_dir: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub allow_unsigned_models: bool,
    /// File holding the base64 Ed25519 verifying key
    pub model_pubkey_file: Option<PathBuf>,
    /// Lowest signed manifest serial to accept, as configured (parsed in
    /// [`AppConfig::artifact_policy`])
    pub model_min_serial: Option<String>,
    /// Per-line input cap for log redaction
    pub sanitize_max_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models"),
            report_dir: PathBuf::from("."),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from("visioncare.log"),
            allow_unsigned_models: false,
            model_pubkey_file: None,
            model_min_serial: None,
            sanitize_max_bytes: DEFAULT_SANITIZE_MAX_BYTES,
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

impl AppConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; unset or empty values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            model_path: get("VISIONCARE_MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
            report_dir: get("VISIONCARE_REPORT_DIR").map_or(defaults.report_dir, PathBuf::from),
            log_mode: get("VISIONCARE_LOG_MODE").map_or(defaults.log_mode, |v| LogMode::parse(&v)),
            log_file: get("VISIONCARE_LOG_FILE").map_or(defaults.log_file, PathBuf::from),
            allow_unsigned_models: get("VISIONCARE_ALLOW_UNSIGNED_MODELS")
                .is_some_and(|v| truthy(&v)),
            model_pubkey_file: get("VISIONCARE_MODEL_PUBKEY_B64_FILE").map(PathBuf::from),
            model_min_serial: get("VISIONCARE_MODEL_MIN_SERIAL"),
            sanitize_max_bytes: get("VISIONCARE_SANITIZE_MAX_BYTES")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&v| v > 0)
                .unwrap_or(defaults.sanitize_max_bytes),
        }
    }

    /// Artifact policy derived from the signing settings.
    ///
    /// # Errors
    /// Returns `ArtifactError` if the configured key file cannot be read or
    /// the minimum serial is not an unsigned integer.
    pub fn artifact_policy(&self) -> Result<ArtifactPolicy, ArtifactError> {
        let verifying_key = self
            .model_pubkey_file
            .as_deref()
            .map(load_verifying_key)
            .transpose()?;
        let min_serial = self
            .model_min_serial
            .as_deref()
            .map(|v| {
                v.trim().parse::<u64>().map_err(|_| {
                    ArtifactError::Signature(format!(
                        "VISIONCARE_MODEL_MIN_SERIAL must be an unsigned integer, got {v:?}"
                    ))
                })
            })
            .transpose()?;
        Ok(ArtifactPolicy {
            allow_unsigned: self.allow_unsigned_models,
            verifying_key,
            min_serial,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model_path, PathBuf::from("models"));
        assert!(!config.allow_unsigned_models);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("VISIONCARE_MODEL_PATH", "/srv/models/vision_model.json"),
            ("VISIONCARE_REPORT_DIR", "/tmp/reports"),
            ("VISIONCARE_LOG_MODE", "STDOUT"),
            ("VISIONCARE_ALLOW_UNSIGNED_MODELS", "Yes"),
            ("VISIONCARE_MODEL_PUBKEY_B64_FILE", "/etc/visioncare/model.pub"),
        ]);
        assert_eq!(config.model_path, PathBuf::from("/srv/models/vision_model.json"));
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.log_mode, LogMode::Stdout);
        assert!(config.allow_unsigned_models);
        assert_eq!(
            config.model_pubkey_file,
            Some(PathBuf::from("/etc/visioncare/model.pub"))
        );
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = config_from(&[("VISIONCARE_MODEL_PATH", "  "), ("VISIONCARE_LOG_MODE", "")]);
        assert_eq!(config.model_path, PathBuf::from("models"));
        assert_eq!(config.log_mode, LogMode::Auto);
    }

    #[test]
    fn test_boolean_parsing() {
        for value in ["1", "true", "TRUE", "yes"] {
            assert!(config_from(&[("VISIONCARE_ALLOW_UNSIGNED_MODELS", value)]).allow_unsigned_models);
        }
        for value in ["0", "false", "no", "maybe"] {
            assert!(!config_from(&[("VISIONCARE_ALLOW_UNSIGNED_MODELS", value)]).allow_unsigned_models);
        }
    }

    #[test]
    fn test_log_mode_resolution() {
        assert!(LogMode::Auto.use_file(true));
        assert!(!LogMode::Auto.use_file(false));
        assert!(LogMode::File.use_file(false));
        assert!(!LogMode::Stdout.use_file(true));
    }

    #[test]
    fn test_min_serial_policy() {
        let policy = config_from(&[("VISIONCARE_MODEL_MIN_SERIAL", " 42 ")])
            .artifact_policy()
            .expect("policy");
        assert_eq!(policy.min_serial, Some(42));
        assert_eq!(config_from(&[]).artifact_policy().expect("policy").min_serial, None);

        let err = config_from(&[("VISIONCARE_MODEL_MIN_SERIAL", "latest")])
            .artifact_policy()
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("VISIONCARE_MODEL_MIN_SERIAL"));
    }

    #[test]
    fn test_sanitize_limit() {
        assert_eq!(config_from(&[]).sanitize_max_bytes, DEFAULT_SANITIZE_MAX_BYTES);
        assert_eq!(
            config_from(&[("VISIONCARE_SANITIZE_MAX_BYTES", "4096")]).sanitize_max_bytes,
            4096
        );
        for bad in ["0", "-1", "lots"] {
            assert_eq!(
                config_from(&[("VISIONCARE_SANITIZE_MAX_BYTES", bad)]).sanitize_max_bytes,
                DEFAULT_SANITIZE_MAX_BYTES
            );
        }
    }

    #[test]
    fn test_missing_key_file_fails_policy() {
        let config = config_from(&[("VISIONCARE_MODEL_PUBKEY_B64_FILE", "/nonexistent/key.pub")]);
        assert!(config.artifact_policy().is_err());
        assert!(config_from(&[]).artifact_policy().is_ok());
    }
}
