//! Pruning of open trades that can no longer be honoured
use super::book::TradeBookStore;
use super::config::LedgerKeys;
use super::error::Result;
use super::finder::MatchFinder;
use super::ledger::Ledger;
use tracing::{debug, info};

/// What a sweep changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub pruned_offers: usize,
    pub removed_trades: usize,
}

impl SweepReport {
    /// The book is written back only when this is true
    pub fn did_work(&self) -> bool {
        self.pruned_offers > 0 || self.removed_trades > 0
    }
}

pub struct ConsistencySweep<'a> {
    book: TradeBookStore<'a>,
    finder: MatchFinder<'a>,
}

impl<'a> ConsistencySweep<'a> {
    pub fn new(ledger: &'a dyn Ledger, keys: &'a LedgerKeys) -> Self {
        Self {
            book: TradeBookStore::new(ledger, keys),
            finder: MatchFinder::new(ledger, keys),
        }
    }

    /// Drop every willing offer whose opener no longer owns a matching marble, then
    /// every trade left with nothing to offer.
    pub fn run(&self) -> Result<SweepReport> {
        let mut book = self.book.read_all()?;
        let mut report = SweepReport::default();

        for trade in book.open_trades.iter_mut() {
            let mut still_valid = Vec::with_capacity(trade.willing.len());
            for offer in trade.willing.drain(..) {
                match self.finder.find(&trade.owner, offer.timestamp, offer.size)? {
                    Some(_) => still_valid.push(offer),
                    None => {
                        debug!(trade = trade.timestamp, size = offer.size, "removing offer");
                        report.pruned_offers += 1;
                    }
                }
            }
            trade.willing = still_valid;
        }

        let before = book.len();
        book.open_trades.retain(|trade| {
            if trade.willing.is_empty() {
                debug!(trade = trade.timestamp, "no more options for this trade, removing");
            }
            !trade.willing.is_empty()
        });
        report.removed_trades = before - book.len();

        if report.did_work() {
            self.book.save(&book)?;
            info!(
                pruned_offers = report.pruned_offers,
                removed_trades = report.removed_trades,
                "open trades cleaned"
            );
        } else {
            debug!("all open trades are fine");
        }
        Ok(report)
    }
}
