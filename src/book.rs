//! The book of open trades
use super::config::LedgerKeys;
use super::error::Result;
use super::ledger::Ledger;
use super::types::{OpenTrade, TradeBook, decode_or_default, encode};
use tracing::{debug, info};

pub struct TradeBookStore<'a> {
    ledger: &'a dyn Ledger,
    key: &'a str,
}

impl<'a> TradeBookStore<'a> {
    pub fn new(ledger: &'a dyn Ledger, keys: &'a LedgerKeys) -> Self {
        Self {
            ledger,
            key: &keys.open_trades,
        }
    }

    /// The stored book, empty when nothing has been written yet
    pub fn read_all(&self) -> Result<TradeBook> {
        Ok(decode_or_default(self.key, self.ledger.get(self.key)?.as_deref()))
    }

    pub fn save(&self, book: &TradeBook) -> Result<()> {
        self.ledger.put(self.key, &encode(book)?)?;
        debug!(open_trades = book.len(), "trade book saved");
        Ok(())
    }

    pub fn append(&self, trade: OpenTrade) -> Result<()> {
        let mut book = self.read_all()?;
        info!(id = trade.id(), owner = %trade.owner, willing = trade.willing.len(), "trade opened");
        book.open_trades.push(trade);
        self.save(&book)
    }

    /// Remove the first trade with `id`. An unknown id is not an error and writes nothing.
    pub fn remove_by_id(&self, id: i64) -> Result<Option<OpenTrade>> {
        let mut book = self.read_all()?;
        let removed = book.remove(id);
        match &removed {
            Some(_) => {
                self.save(&book)?;
                info!(id, "trade removed");
            }
            None => debug!(id, "no trade to remove"),
        }
        Ok(removed)
    }
}
