use anyhow::{Context, Result};
use dicepoker_core::{Denomination, LedgerBackend, LedgerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const LEDGER_DB: &str = "dicepoker.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub ledger: LedgerConfig,
    /// Unit amounts are typed and shown in, e.g. "BTC" or "sat".
    pub denomination: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::for_data_dir(default_data_dir())
    }
}

impl CliConfig {
    fn for_data_dir(data_dir: PathBuf) -> Self {
        Self {
            ledger: LedgerConfig::local(data_dir.join(LEDGER_DB)),
            data_dir,
            denomination: "BTC".to_string(),
        }
    }

    /// Read `config.json` from `data_dir`, or fall back to defaults rooted there.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::for_data_dir(data_dir.to_path_buf()));
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn with_overrides(mut self, ledger_url: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(base_url) = ledger_url {
            self.ledger.backend = LedgerBackend::Http { base_url };
        }
        if let Some(secs) = timeout_secs {
            self.ledger.request_timeout = Duration::from_secs(secs);
        }
        self
    }

    pub fn denomination(&self) -> Result<Denomination> {
        Denomination::from_str(&self.denomination)
            .with_context(|| format!("Unknown denomination '{}'", self.denomination))
    }

    /// The SQLite file holding local sessions and the audit log.
    pub fn db_path(&self) -> PathBuf {
        match &self.ledger.backend {
            LedgerBackend::Local { db_path } => db_path.clone(),
            LedgerBackend::Http { .. } => self.data_dir.join(LEDGER_DB),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dicepoker")
}
