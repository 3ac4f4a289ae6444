//! Marble records and the flat marble index
use super::config::LedgerKeys;
use super::error::{ExchangeError, Result};
use super::ledger::Ledger;
use super::types::{Marble, MarbleIndex, decode_or_default, encode};
use tracing::{debug, info};

pub struct MarbleRegistry<'a> {
    ledger: &'a dyn Ledger,
    index_key: &'a str,
}

impl<'a> MarbleRegistry<'a> {
    pub fn new(ledger: &'a dyn Ledger, keys: &'a LedgerKeys) -> Self {
        Self {
            ledger,
            index_key: &keys.marble_index,
        }
    }

    /// Store a new marble under its id and append the id to the index.
    ///
    /// Only the record key is checked for collisions, the index is appended to as is.
    pub fn create(&self, marble: &Marble) -> Result<()> {
        let existing: Marble = decode_or_default(&marble.id, self.ledger.get(&marble.id)?.as_deref());
        if !existing.id.is_empty() && existing.id == marble.id {
            return Err(ExchangeError::DuplicateId(marble.id.clone()));
        }

        self.ledger.put(&marble.id, &encode(marble)?)?;

        let mut index = self.index()?;
        index.push(&marble.id);
        self.write_index(&index)?;

        info!(id = %marble.id, owner = %marble.owner, size = marble.size, "marble created");
        Ok(())
    }

    /// Raw stored bytes for `id`
    pub fn read(&self, id: &str) -> Result<Vec<u8>> {
        self.ledger
            .get(id)?
            .ok_or_else(|| ExchangeError::NotFound(id.to_string()))
    }

    /// Decoded marble for `id`. Undecodable bytes read as an empty marble.
    pub fn load(&self, id: &str) -> Result<Marble> {
        let bytes = self.read(id)?;
        Ok(decode_or_default(id, Some(&bytes)))
    }

    /// Rewrite the owner of `id`.
    ///
    /// A missing record is not rejected: an empty marble carrying only the new
    /// owner is written under `id`.
    pub fn set_owner(&self, id: &str, owner: &str) -> Result<Marble> {
        let mut marble: Marble = decode_or_default(id, self.ledger.get(id)?.as_deref());
        if marble.id.is_empty() {
            debug!(id, "setting owner on a marble that does not exist");
        }
        marble.owner = owner.to_string();
        self.ledger.put(id, &encode(&marble)?)?;

        info!(id, owner, "marble owner set");
        Ok(marble)
    }

    /// Remove the record and the first index entry for `id`.
    ///
    /// Returns whether an index entry was found. Open trades are left for the sweep.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.ledger.delete(id)?;

        let mut index = self.index()?;
        let removed = index.remove_first(id);
        self.write_index(&index)?;

        info!(id, indexed = removed, "marble deleted");
        Ok(removed)
    }

    pub fn index(&self) -> Result<MarbleIndex> {
        Ok(decode_or_default(
            self.index_key,
            self.ledger.get(self.index_key)?.as_deref(),
        ))
    }

    pub(crate) fn write_index(&self, index: &MarbleIndex) -> Result<()> {
        self.ledger.put(self.index_key, &encode(index)?)?;
        Ok(())
    }
}
