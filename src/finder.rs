//! Locate a marble by owner and shape
use super::config::LedgerKeys;
use super::error::Result;
use super::ledger::Ledger;
use super::registry::MarbleRegistry;
use super::types::{Marble, decode_or_default};
use tracing::debug;

pub struct MatchFinder<'a> {
    ledger: &'a dyn Ledger,
    registry: MarbleRegistry<'a>,
}

impl<'a> MatchFinder<'a> {
    pub fn new(ledger: &'a dyn Ledger, keys: &'a LedgerKeys) -> Self {
        Self {
            ledger,
            registry: MarbleRegistry::new(ledger, keys),
        }
    }

    /// First marble in index order owned by `owner` (case-insensitive) with the
    /// given timestamp and size.
    ///
    /// Every call rescans the whole index. Index ids with no stored record are skipped.
    pub fn find(&self, owner: &str, timestamp: i64, size: i64) -> Result<Option<Marble>> {
        let index = self.registry.index()?;
        for id in &index.ids {
            let Some(bytes) = self.ledger.get(id)? else {
                debug!(id = %id, "index entry has no marble");
                continue;
            };
            let marble: Marble = decode_or_default(id, Some(&bytes));
            if marble.matches(owner, timestamp, size) {
                debug!(id = %id, owner, timestamp, size, "found a marble");
                return Ok(Some(marble));
            }
        }
        debug!(owner, timestamp, size, scanned = index.ids.len(), "no marble matched");
        Ok(None)
    }
}
