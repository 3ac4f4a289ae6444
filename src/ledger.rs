//! Byte-oriented key-value ledger backends
use super::error::LedgerError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// The only persistence boundary of the exchange.
///
/// Each call is atomic and immediately visible to the next call made within the
/// same invocation. `get` returns `Ok(None)` when nothing is stored under `key`.
pub trait Ledger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()>;
    fn delete(&self, key: &str) -> LedgerResult<()>;
}

/// Ledger backed by an embedded sled database.
pub struct SledLedger {
    instance: Arc<sled::Db>,
    flush_on_write: bool,
}

impl SledLedger {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            instance,
            flush_on_write: false,
        }
    }
    /// Flush to disk after every put/delete instead of relying on sled's background flusher
    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }
    fn maybe_flush(&self) -> LedgerResult<()> {
        if self.flush_on_write {
            self.instance.flush()?;
        }
        Ok(())
    }
}

impl Ledger for SledLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.instance.get(key.as_bytes())?.map(|ivec| ivec.to_vec()))
    }
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.instance.insert(key.as_bytes(), value)?;
        self.maybe_flush()
    }
    fn delete(&self, key: &str) -> LedgerResult<()> {
        self.instance.remove(key.as_bytes())?;
        self.maybe_flush()
    }
}

/// In-memory ledger for tests and embedding.
///
/// Counts every successful put/delete so callers can assert that an operation
/// did not write, and can mark keys unavailable to simulate a failing backend.
#[derive(Default)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: RwLock<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
    /// Number of successful put and delete calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
    /// Every subsequent access to `key` fails with [`LedgerError::Unavailable`]
    pub fn make_unavailable(&self, key: &str) -> LedgerResult<()> {
        self.unavailable
            .write()
            .map_err(|_| LedgerError::Poisoned)?
            .insert(key.to_string());
        Ok(())
    }
    fn check(&self, key: &str) -> LedgerResult<()> {
        let unavailable = self.unavailable.read().map_err(|_| LedgerError::Poisoned)?;
        if unavailable.contains(key) {
            return Err(LedgerError::Unavailable(key.to_string()));
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.check(key)?;
        let map = self.entries.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(map.get(key).cloned())
    }
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.check(key)?;
        let mut map = self.entries.write().map_err(|_| LedgerError::Poisoned)?;
        map.insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn delete(&self, key: &str) -> LedgerResult<()> {
        self.check(key)?;
        let mut map = self.entries.write().map_err(|_| LedgerError::Poisoned)?;
        map.remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
