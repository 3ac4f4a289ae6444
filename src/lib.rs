pub mod bank;
pub mod book;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod finder;
pub mod ledger;
pub mod registry;
pub mod service;
pub mod sweep;
pub mod types;
pub mod utils;

pub use config::{ExchangeConfig, LedgerKeys};
pub use error::{ExchangeError, LedgerError, Result};
pub use ledger::{Ledger, MemoryLedger, SledLedger};
pub use service::ExchangeService;
