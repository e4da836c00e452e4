use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub request_timeout: Duration,
    /// Pause before reading again after a failed read.
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerBackend {
    /// SQLite-backed reference ledger shared through the data directory.
    Local { db_path: PathBuf },
    /// Remote ledger speaking the JSON session API.
    Http { base_url: String },
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Local {
                db_path: PathBuf::from("dicepoker.db"),
            },
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl LedgerConfig {
    pub fn local(db_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: LedgerBackend::Local {
                db_path: db_path.into(),
            },
            ..Self::default()
        }
    }

    pub fn http(base_url: impl Into<String>) -> Self {
        Self {
            backend: LedgerBackend::Http {
                base_url: base_url.into(),
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.backend {
            LedgerBackend::Local { db_path } if db_path.as_os_str().is_empty() => {
                return Err(LedgerError::config("Local ledger path cannot be empty"));
            }
            LedgerBackend::Http { base_url } => {
                if base_url.trim().is_empty() {
                    return Err(LedgerError::config("Ledger URL cannot be empty"));
                }
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(LedgerError::config(format!(
                        "Invalid ledger URL scheme: {} (expected http or https)",
                        base_url
                    )));
                }
            }
            _ => {}
        }

        if self.request_timeout.is_zero() {
            return Err(LedgerError::config(
                "Request timeout must be greater than 0",
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(LedgerError::config(
                "Poll interval must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_bad_http_url() {
        assert!(LedgerConfig::http("").validate().is_err());
        assert!(LedgerConfig::http("ftp://ledger").validate().is_err());
        assert!(LedgerConfig::http("https://ledger.example").validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_timeout_and_poll_interval() {
        let mut config = LedgerConfig::local("game.db");
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::local("game.db");
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
