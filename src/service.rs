//! Service layer API for marble and trade operations
use super::bank::{BankDirectory, BankIndex};
use super::book::TradeBookStore;
use super::config::LedgerKeys;
use super::engine::{FillOutcome, MatchingEngine, TradeFill};
use super::error::{ExchangeError, Result};
use super::ledger::Ledger;
use super::registry::MarbleRegistry;
use super::sweep::{ConsistencySweep, SweepReport};
use super::types::{Marble, MarbleIndex, OpenTrade, TradeBook, encode};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Every operation reads the blobs it needs fresh from the ledger and writes them
/// back before returning. Nothing is cached between calls, and callers must not
/// run two operations against the same ledger at once.
pub struct ExchangeService<L: Ledger> {
    ledger: Arc<L>,
    keys: LedgerKeys,
}

impl<L: Ledger> ExchangeService<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self::with_keys(ledger, LedgerKeys::default())
    }

    pub fn with_keys(ledger: Arc<L>, keys: LedgerKeys) -> Self {
        Self { ledger, keys }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn keys(&self) -> &LedgerKeys {
        &self.keys
    }

    fn registry(&self) -> MarbleRegistry<'_> {
        MarbleRegistry::new(&*self.ledger, &self.keys)
    }

    fn book(&self) -> TradeBookStore<'_> {
        TradeBookStore::new(&*self.ledger, &self.keys)
    }

    fn banks(&self) -> BankDirectory<'_> {
        BankDirectory::new(&*self.ledger, &self.keys)
    }

    /// Run the sweep after a mutation. A failing sweep is logged and never
    /// replaces the mutation's own result.
    fn then_sweep<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = self.sweep() {
            warn!(error = %e, "open trade sweep failed");
        }
        result
    }

    /// Reset all the things: store the asset holding, seed the bank marker and
    /// empty every index
    pub fn reset(&self, asset_holding: i64) -> Result<()> {
        self.ledger
            .put(&self.keys.asset_holding, asset_holding.to_string().as_bytes())?;
        self.ledger.put(&self.keys.bank_marker, b"a")?;
        self.banks().clear()?;
        self.registry().write_index(&MarbleIndex::default())?;
        self.book().save(&TradeBook::default())?;

        info!(asset_holding, "exchange reset");
        Ok(())
    }

    /// Write a free-form value under `key`, stamped with the current time
    pub fn write_note(&self, key: &str, value: &str) -> Result<()> {
        let stamped = format!("{};{}", value, Utc::now().format("%A, %d-%b-%y %H:%M:%S UTC"));
        self.ledger.put(key, stamped.as_bytes())?;
        Ok(())
    }

    pub fn register_bank(&self, name: &str, details: &[&str]) -> Result<()> {
        self.banks().register(name, details)
    }

    pub fn read_bank(&self, name: &str) -> Result<Vec<u8>> {
        self.banks().read(name)
    }

    pub fn list_banks(&self) -> Result<BankIndex> {
        self.banks().list()
    }

    /// Create a marble. Category and owner are stored lower-cased.
    pub fn create_marble(&self, id: &str, category: &str, size: i64, owner: &str) -> Result<Marble> {
        if self.keys.is_reserved(id) {
            warn!(id, "refusing to create a marble over a reserved key");
            return Err(ExchangeError::ReservedId(id.to_string()));
        }
        let marble = Marble::new(id, &category.to_lowercase(), size, &owner.to_lowercase());
        self.registry().create(&marble)?;
        Ok(marble)
    }

    pub fn set_owner(&self, id: &str, owner: &str) -> Result<Marble> {
        let result = self.registry().set_owner(id, owner);
        self.then_sweep(result)
    }

    pub fn delete_marble(&self, id: &str) -> Result<()> {
        let result = self.registry().delete(id).map(|_| ());
        self.then_sweep(result)
    }

    /// Put `trade` on the book and return its id
    pub fn open_trade(&self, trade: OpenTrade) -> Result<i64> {
        let id = trade.id();
        self.book().append(trade)?;
        Ok(id)
    }

    pub fn perform_trade(&self, fill: &TradeFill) -> Result<FillOutcome> {
        let result = MatchingEngine::new(&*self.ledger, &self.keys).perform(fill);
        self.then_sweep(result)
    }

    /// Cancel an open trade. Unknown ids are ignored.
    pub fn remove_trade(&self, id: i64) -> Result<Option<OpenTrade>> {
        self.book().remove_by_id(id)
    }

    pub fn sweep(&self) -> Result<SweepReport> {
        ConsistencySweep::new(&*self.ledger, &self.keys).run()
    }

    /// Raw stored bytes of a marble
    pub fn read_marble(&self, id: &str) -> Result<Vec<u8>> {
        self.registry().read(id)
    }

    pub fn marble(&self, id: &str) -> Result<Marble> {
        self.registry().load(id)
    }

    pub fn read_all(&self) -> Result<TradeBook> {
        self.book().read_all()
    }

    /// The trade book as stored bytes, an encoded empty book when none is stored
    pub fn read_all_bytes(&self) -> Result<Vec<u8>> {
        match self.ledger.get(&self.keys.open_trades)? {
            Some(bytes) => Ok(bytes),
            None => encode(&TradeBook::default()),
        }
    }

    pub fn read_index(&self) -> Result<MarbleIndex> {
        self.registry().index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Closer, Opener};
    use crate::error::LedgerError;
    use crate::ledger::{LedgerResult, MemoryLedger};
    use crate::types::Description;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> ExchangeService<MemoryLedger> {
        ExchangeService::new(Arc::new(MemoryLedger::new()))
    }

    /// Memory ledger whose `key` becomes unavailable once it has been written `after` times
    struct FailsAfterWrites {
        inner: MemoryLedger,
        key: &'static str,
        after: usize,
        seen: AtomicUsize,
    }

    impl FailsAfterWrites {
        fn new(key: &'static str, after: usize) -> Self {
            Self {
                inner: MemoryLedger::new(),
                key,
                after,
                seen: AtomicUsize::new(0),
            }
        }
        fn check(&self, key: &str) -> LedgerResult<()> {
            if key == self.key && self.seen.load(Ordering::SeqCst) >= self.after {
                return Err(LedgerError::Unavailable(key.to_string()));
            }
            Ok(())
        }
    }

    impl Ledger for FailsAfterWrites {
        fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
            self.check(key)?;
            self.inner.get(key)
        }
        fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
            self.check(key)?;
            self.inner.put(key, value)?;
            if key == self.key {
                self.seen.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
        fn delete(&self, key: &str) -> LedgerResult<()> {
            self.check(key)?;
            self.inner.delete(key)
        }
    }

    fn alice_trade() -> OpenTrade {
        OpenTrade::new("alice")
            .set_timestamp(100)
            .set_want(Description::new(0, 5))
            .add_willing(Description::new(0, 7))
    }

    #[test]
    fn create_lowercases_owner_and_category() {
        let service = service();
        let marble = service.create_marble("A1", "Blue", 5, "Bob").unwrap();

        assert_eq!(marble.owner, "bob");
        assert_eq!(service.marble("A1").unwrap().category, "blue");
    }

    #[test]
    fn set_owner_sweeps_stale_offers() {
        let service = service();
        service.create_marble("A2", "red", 7, "alice").unwrap();
        service
            .open_trade(
                OpenTrade::new("alice")
                    .set_timestamp(1)
                    .set_want(Description::new(0, 5))
                    .add_willing(Description::new(0, 7)),
            )
            .unwrap();

        service.set_owner("A2", "carol").unwrap();

        assert!(service.read_all().unwrap().is_empty());
    }

    #[test]
    fn sweep_failure_does_not_mask_delete() {
        let service = service();
        service.create_marble("A1", "blue", 5, "bob").unwrap();
        service.ledger().make_unavailable("_opentrades").unwrap();

        service.delete_marble("A1").unwrap();

        assert!(matches!(
            service.read_marble("A1"),
            Err(ExchangeError::NotFound(_))
        ));
        assert!(service.read_index().unwrap().ids.is_empty());
    }

    #[test]
    fn sweep_failure_does_not_mask_set_owner() {
        // the book becomes unreadable right after the trade is opened
        let service = ExchangeService::new(Arc::new(FailsAfterWrites::new("_opentrades", 1)));
        service.create_marble("A2", "red", 7, "alice").unwrap();
        service.open_trade(alice_trade()).unwrap();

        let marble = service.set_owner("A2", "carol").unwrap();

        assert_eq!(marble.id, "A2");
        assert_eq!(marble.owner, "carol");
        assert_eq!(service.marble("A2").unwrap().owner, "carol");
        assert!(service.read_all().is_err());
    }

    #[test]
    fn sweep_failure_does_not_mask_perform_trade() {
        // opening the trade and closing it are the two book writes, the sweep's read fails
        let service = ExchangeService::new(Arc::new(FailsAfterWrites::new("_opentrades", 2)));
        service.create_marble("A1", "blue", 5, "bob").unwrap();
        service.create_marble("A2", "red", 7, "alice").unwrap();
        service.open_trade(alice_trade()).unwrap();

        let outcome = service
            .perform_trade(&TradeFill {
                trade_id: 100,
                closer: Closer {
                    user: "bob".into(),
                    marble_id: "A1".into(),
                },
                opener: Opener {
                    user: "alice".into(),
                    timestamp: 0,
                    size: 7,
                },
            })
            .unwrap();

        assert_eq!(
            outcome,
            FillOutcome::Completed {
                to_opener: "A1".into(),
                to_closer: "A2".into()
            }
        );
        assert_eq!(service.marble("A1").unwrap().owner, "alice");
        assert_eq!(service.marble("A2").unwrap().owner, "bob");
        assert!(service.sweep().is_err());
    }

    #[test]
    fn reserved_keys_cannot_be_marble_ids() {
        let service = service();
        service.reset(0).unwrap();

        for id in ["_marbleindex", "_opentrades", "_allBank", "kyc", "bank"] {
            assert!(matches!(
                service.create_marble(id, "blue", 5, "bob"),
                Err(ExchangeError::ReservedId(reserved)) if reserved == id
            ));
        }
        assert!(service.read_index().unwrap().ids.is_empty());
        assert_eq!(service.ledger().get("kyc").unwrap(), Some(b"0".to_vec()));
    }

    #[test]
    fn reset_empties_indexes() {
        let service = service();
        service.create_marble("A1", "blue", 5, "bob").unwrap();
        service.register_bank("sbi", &["a", "b", "c"]).unwrap();

        service.reset(100).unwrap();

        assert!(service.read_index().unwrap().ids.is_empty());
        assert!(service.list_banks().unwrap().names.is_empty());
        assert!(service.read_all().unwrap().is_empty());
        assert_eq!(service.ledger().get("kyc").unwrap(), Some(b"100".to_vec()));
        assert_eq!(service.ledger().get("bank").unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn write_note_appends_timestamp() {
        let service = service();
        service.write_note("memo", "hello").unwrap();

        let stored = String::from_utf8(service.ledger().get("memo").unwrap().unwrap()).unwrap();
        assert!(stored.starts_with("hello;"));
        assert!(stored.ends_with("UTC"));
    }
}
