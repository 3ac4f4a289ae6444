//! Exchange configuration loaded from TOML
use super::ledger::SledLedger;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExchangeConfig {
    pub db_path: PathBuf,
    pub flush_on_write: bool,
    pub keys: LedgerKeys,
}

/// Well-known ledger keys. Marble ids share the key space, so ids equal to one of
/// these are refused on creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerKeys {
    pub marble_index: String,
    pub open_trades: String,
    pub bank_index: String,
    pub asset_holding: String,
    pub bank_marker: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("marbles.db"),
            flush_on_write: false,
            keys: LedgerKeys::default(),
        }
    }
}

impl Default for LedgerKeys {
    fn default() -> Self {
        Self {
            marble_index: "_marbleindex".into(),
            open_trades: "_opentrades".into(),
            bank_index: "_allBank".into(),
            asset_holding: "kyc".into(),
            bank_marker: "bank".into(),
        }
    }
}

impl LedgerKeys {
    pub fn is_reserved(&self, key: &str) -> bool {
        [
            &self.marble_index,
            &self.open_trades,
            &self.bank_index,
            &self.asset_holding,
            &self.bank_marker,
        ]
        .iter()
        .any(|reserved| reserved.as_str() == key)
    }
}

impl ExchangeConfig {
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid exchange config")
    }
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents)
    }
    /// Open (or create) the sled database at `db_path`
    pub fn open_ledger(&self) -> anyhow::Result<SledLedger> {
        let db = sled::open(&self.db_path)
            .with_context(|| format!("failed to open sled db {}", self.db_path.display()))?;
        Ok(SledLedger::new(Arc::new(db)).with_flush_on_write(self.flush_on_write))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ExchangeConfig::default();
        assert_eq!(c.keys.marble_index, "_marbleindex");
        assert_eq!(c.keys.open_trades, "_opentrades");
        assert!(!c.flush_on_write);
        assert!(c.keys.is_reserved("_allBank"));
        assert!(c.keys.is_reserved("bank"));
        assert!(!c.keys.is_reserved("A1"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ExchangeConfig::from_toml_str(
            r#"
            db_path = "/tmp/exchange.db"

            [keys]
            open_trades = "_trades"
            "#,
        )
        .unwrap();

        assert_eq!(c.db_path, PathBuf::from("/tmp/exchange.db"));
        assert_eq!(c.keys.open_trades, "_trades");
        assert_eq!(c.keys.marble_index, "_marbleindex");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(ExchangeConfig::from_toml_str("db_path = [").is_err());
    }
}
