//! Fulfilment of open trades
use super::book::TradeBookStore;
use super::config::LedgerKeys;
use super::error::{ExchangeError, Result};
use super::finder::MatchFinder;
use super::ledger::Ledger;
use super::registry::MarbleRegistry;
use tracing::{debug, info};

/// The user closing a trade and the marble they hand over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closer {
    pub user: String,
    pub marble_id: String,
}

/// The shape of the opener's marble the closer wants in return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opener {
    pub user: String,
    pub timestamp: i64,
    pub size: i64,
}

/// A request to close trade `trade_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeFill {
    pub trade_id: i64,
    pub closer: Closer,
    pub opener: Opener,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// Ownership swapped and the trade closed
    Completed {
        to_opener: String,
        to_closer: String,
    },
    /// No open trade has this id; nothing changed
    UnknownTrade,
}

pub struct MatchingEngine<'a> {
    registry: MarbleRegistry<'a>,
    book: TradeBookStore<'a>,
    finder: MatchFinder<'a>,
}

impl<'a> MatchingEngine<'a> {
    pub fn new(ledger: &'a dyn Ledger, keys: &'a LedgerKeys) -> Self {
        Self {
            registry: MarbleRegistry::new(ledger, keys),
            book: TradeBookStore::new(ledger, keys),
            finder: MatchFinder::new(ledger, keys),
        }
    }

    /// Swap the closer's marble for a matching marble of the trade's opener.
    ///
    /// Only the size of the closer's marble is checked against the trade's want.
    /// The two owner rewrites are separate ledger writes.
    pub fn perform(&self, fill: &TradeFill) -> Result<FillOutcome> {
        let mut book = self.book.read_all()?;
        let Some(trade) = book.find(fill.trade_id).cloned() else {
            debug!(trade = fill.trade_id, "no open trade with this id");
            return Ok(FillOutcome::UnknownTrade);
        };
        if !fill.opener.user.eq_ignore_ascii_case(&trade.owner) {
            debug!(trade = trade.id(), given = %fill.opener.user, owner = %trade.owner, "opener differs from trade owner, using trade owner");
        }

        let offered = self.registry.load(&fill.closer.marble_id)?;
        if offered.size != trade.want.size {
            return Err(ExchangeError::CriteriaMismatch {
                marble: fill.closer.marble_id.clone(),
                size: offered.size,
                want: trade.want.size,
            });
        }

        let Some(counterpart) =
            self.finder
                .find(&trade.owner, fill.opener.timestamp, fill.opener.size)?
        else {
            return Err(ExchangeError::NoEligibleRecord {
                owner: trade.owner.clone(),
                timestamp: fill.opener.timestamp,
                size: fill.opener.size,
            });
        };

        self.registry.set_owner(&fill.closer.marble_id, &trade.owner)?;
        self.registry.set_owner(&counterpart.id, &fill.closer.user)?;

        book.remove(trade.id());
        self.book.save(&book)?;

        info!(
            trade = trade.id(),
            to_opener = %fill.closer.marble_id,
            to_closer = %counterpart.id,
            "trade closed"
        );
        Ok(FillOutcome::Completed {
            to_opener: fill.closer.marble_id.clone(),
            to_closer: counterpart.id,
        })
    }
}
