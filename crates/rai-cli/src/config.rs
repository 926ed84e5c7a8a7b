//! # CLI Configuration
//!
//! An optional YAML file with three sections, each defaulting field by
//! field:
//!
//! ```yaml
//! api:
//!   base_url: http://127.0.0.1:8095/api/v1
//!   timeout_secs: 30
//! coverage:
//!   valid_threshold: 0.75
//!   expected: [balance_sheet, income_statement, cash_flow_statement]
//! stream:
//!   inactivity_timeout_secs: 120
//! ```
//!
//! Without a file the `api` section comes from the environment
//! (`ClientConfig::from_env`). Command-line flags override both.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rai_analysis::StreamConfig;
use rai_client::ClientConfig;
use rai_compliance::CoverageConfig;

/// Settings of one CLI invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api: ClientConfig,
    pub coverage: CoverageConfig,
    pub stream: StreamConfig,
}

/// Values given on the command line or through `RAI_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiOverrides {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Parse a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("invalid configuration file")
    }

    /// Load `path` if given, else build from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                Self::from_yaml(&raw).with_context(|| format!("in {}", path.display()))
            }
            None => Ok(Self {
                api: ClientConfig::from_env()?,
                ..Self::default()
            }),
        }
    }

    /// Apply overrides, then check every section.
    pub fn finish(mut self, overrides: ApiOverrides) -> Result<Self> {
        if let Some(url) = overrides.api_url {
            self.api.base_url = url;
        }
        if let Some(token) = overrides.api_token.filter(|t| !t.is_empty()) {
            self.api.api_token = Some(token);
        }
        if let Some(secs) = overrides.timeout_secs {
            self.api.timeout_secs = secs;
        }
        self.api.validate()?;
        self.coverage.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_compliance::StatementKind;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = CliConfig::from_yaml(
            "api:\n  base_url: http://stub:8095/api/v1\ncoverage:\n  valid_threshold: 0.5\n",
        )
        .unwrap();
        assert_eq!(cfg.api.base_url, "http://stub:8095/api/v1");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.coverage.valid_threshold, 0.5);
        assert_eq!(cfg.coverage.min_chunks, 2);
        assert_eq!(cfg.stream.inactivity_timeout_secs, 120);
    }

    #[test]
    fn expected_statements_from_yaml() {
        let cfg = CliConfig::from_yaml(
            "coverage:\n  expected: [balance_sheet, notes]\nstream:\n  inactivity_timeout_secs: 5\n",
        )
        .unwrap();
        assert_eq!(
            cfg.coverage.expected,
            vec![StatementKind::BalanceSheet, StatementKind::Notes]
        );
        assert_eq!(cfg.stream.inactivity_timeout_secs, 5);
    }

    #[test]
    fn overrides_win_over_file() {
        let cfg = CliConfig::from_yaml("api:\n  base_url: http://file:1/api/v1\n")
            .unwrap()
            .finish(ApiOverrides {
                api_url: Some("http://flag:2/api/v1".to_string()),
                api_token: Some("secret".to_string()),
                timeout_secs: Some(5),
            })
            .unwrap();
        assert_eq!(cfg.api.base_url, "http://flag:2/api/v1");
        assert_eq!(cfg.api.api_token.as_deref(), Some("secret"));
        assert_eq!(cfg.api.timeout_secs, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_url = CliConfig::default().finish(ApiOverrides {
            api_url: Some("ftp://nowhere".to_string()),
            ..ApiOverrides::default()
        });
        assert!(bad_url.is_err());

        let bad_threshold = CliConfig::from_yaml("coverage:\n  valid_threshold: 2.0\n")
            .unwrap()
            .finish(ApiOverrides::default());
        assert!(bad_threshold.is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rai.yaml");
        std::fs::write(&path, "stream:\n  inactivity_timeout_secs: 9\n").unwrap();
        let cfg = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.stream.inactivity_timeout_secs, 9);
        assert!(CliConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
