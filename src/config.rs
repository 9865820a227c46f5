//! Configuration for the extraction workflow.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractorError, Result};

/// Settings for talking to the recognition service and for intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Base URL of the recognition service (e.g. `http://localhost:5000`)
    pub endpoint: String,

    /// Path of the extraction route, appended to `endpoint`
    pub extract_path: String,

    /// Multipart field name repeated once per image
    pub field_name: String,

    /// Request timeout in milliseconds. None leaves it to the transport.
    pub timeout_ms: Option<u64>,

    /// Number of files per batch that get a preview handle
    pub preview_limit: usize,

    /// Accounts allowed to sign in
    pub credentials: Vec<CredentialEntry>,
}

/// One allow-listed account. Only a SHA-256 digest of the secret is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialEntry {
    pub email: String,
    /// Lowercase hex SHA-256 of the secret
    pub secret_sha256: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            extract_path: "/extract".to_string(),
            field_name: "images".to_string(),
            timeout_ms: None,
            preview_limit: 6,
            credentials: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Full URL of the extraction route.
    pub fn extract_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.extract_path.trim_start_matches('/')
        )
    }

    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ExtractorError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ExtractorError::Config("endpoint must not be empty".into()));
        }
        if self.field_name.trim().is_empty() {
            return Err(ExtractorError::Config(
                "field_name must not be empty".into(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(ExtractorError::Config(
                "timeout_ms must be positive when set".into(),
            ));
        }
        if let Some(entry) = self.credentials.iter().find(|c| {
            c.secret_sha256.len() != 64 || !c.secret_sha256.chars().all(|ch| ch.is_ascii_hexdigit())
        }) {
            return Err(ExtractorError::Config(format!(
                "credential for {} is not a SHA-256 hex digest",
                entry.email
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = ExtractorConfig::default();
        assert_eq!(config.extract_url(), "http://localhost:5000/extract");
        assert_eq!(config.field_name, "images");
        assert_eq!(config.timeout_ms, None);
        assert_eq!(config.preview_limit, 6);
    }

    #[test]
    fn test_extract_url_joins_slashes() {
        let config = ExtractorConfig {
            endpoint: "https://ocr.example.com/api/".to_string(),
            extract_path: "/extract".to_string(),
            ..Default::default()
        };
        assert_eq!(config.extract_url(), "https://ocr.example.com/api/extract");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ExtractorConfig::from_yaml_str(
            "endpoint: http://10.0.0.5:8080\ntimeout_ms: 30000\n",
        )
        .unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.5:8080");
        assert_eq!(config.timeout_ms, Some(30000));
        assert_eq!(config.extract_path, "/extract");
    }

    #[test]
    fn test_yaml_with_credentials() {
        let yaml = r#"
credentials:
  - email: ops@example.com
    secret_sha256: 2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b
"#;
        let config = ExtractorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.credentials.len(), 1);
        assert_eq!(config.credentials[0].email, "ops@example.com");
    }

    #[test]
    fn test_rejects_unknown_fields_and_bad_values() {
        assert!(matches!(
            ExtractorConfig::from_yaml_str("endpiont: http://x\n"),
            Err(ExtractorError::Config(_))
        ));
        assert!(matches!(
            ExtractorConfig::from_yaml_str("timeout_ms: 0\n"),
            Err(ExtractorError::Config(_))
        ));
        assert!(matches!(
            ExtractorConfig::from_yaml_str(
                "credentials:\n  - email: a@b.c\n    secret_sha256: hunter2\n"
            ),
            Err(ExtractorError::Config(_))
        ));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extractor.yaml");
        std::fs::write(&path, "field_name: scans\n").unwrap();

        let config = ExtractorConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.field_name, "scans");

        let missing = ExtractorConfig::from_yaml_file(dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(ExtractorError::Config(_))));
    }
}
