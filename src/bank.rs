//! Directory of registered banks
use super::config::LedgerKeys;
use super::error::{ExchangeError, Result};
use super::ledger::Ledger;
use super::types::{decode_or_default, encode};
use tracing::info;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct BankIndex {
    #[n(0)]
    pub names: Vec<String>,
}

pub struct BankDirectory<'a> {
    ledger: &'a dyn Ledger,
    index_key: &'a str,
}

impl<'a> BankDirectory<'a> {
    pub fn new(ledger: &'a dyn Ledger, keys: &'a LedgerKeys) -> Self {
        Self {
            ledger,
            index_key: &keys.bank_index,
        }
    }

    /// Store `details` joined with `;` under `name` and list the name in the index
    pub fn register(&self, name: &str, details: &[&str]) -> Result<()> {
        self.ledger.put(name, details.join(";").as_bytes())?;

        let mut index = self.list()?;
        index.names.push(name.to_string());
        self.ledger.put(self.index_key, &encode(&index)?)?;

        info!(name, "bank registered");
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.ledger
            .get(name)?
            .ok_or_else(|| ExchangeError::NotFound(name.to_string()))
    }

    pub fn list(&self) -> Result<BankIndex> {
        Ok(decode_or_default(
            self.index_key,
            self.ledger.get(self.index_key)?.as_deref(),
        ))
    }

    pub(crate) fn clear(&self) -> Result<()> {
        self.ledger.put(self.index_key, &encode(&BankIndex::default())?)?;
        Ok(())
    }
}
