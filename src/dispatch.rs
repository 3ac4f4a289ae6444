//! Positional string-argument entry points
//!
//! Callers name an operation and pass its arguments as strings, the way a ledger
//! client submits a transaction. Arguments are checked and parsed here before the
//! typed [`ExchangeService`] operation runs.
use super::engine::{Closer, Opener, TradeFill};
use super::error::{ExchangeError, Result};
use super::ledger::Ledger;
use super::service::ExchangeService;
use super::types::{Description, OpenTrade, encode};
use super::utils::identity_timestamp;
use tracing::debug;

/// A parsed mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Reset {
        asset_holding: i64,
    },
    Write {
        key: String,
        value: String,
    },
    WriteBank {
        name: String,
        details: Vec<String>,
    },
    CreateMarble {
        id: String,
        category: String,
        size: i64,
        owner: String,
    },
    SetOwner {
        id: String,
        owner: String,
    },
    DeleteMarble {
        id: String,
    },
    OpenTrade(OpenTrade),
    PerformTrade(TradeFill),
    RemoveTrade {
        id: i64,
    },
}

/// A parsed read-only query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    ReadMarble { id: String },
    ReadBank { name: String },
    ReadAll,
    ReadBanks,
    ReadIndex,
}

fn expect_exactly(args: &[&str], n: usize, expected: &'static str) -> Result<()> {
    if args.len() != n {
        return Err(ExchangeError::InvalidArgumentCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn expect_at_least(args: &[&str], n: usize, expected: &'static str) -> Result<()> {
    if args.len() < n {
        return Err(ExchangeError::InvalidArgumentCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

// positions in errors are 1-based
fn parse_int(args: &[&str], index: usize) -> Result<i64> {
    args[index]
        .parse()
        .map_err(|_| ExchangeError::InvalidNumericArgument {
            position: index + 1,
            value: args[index].to_string(),
        })
}

impl Invocation {
    pub fn parse(function: &str, args: &[&str]) -> Result<Self> {
        debug!(function, args = args.len(), "parsing invocation");
        match function {
            "init" => {
                expect_exactly(args, 1, "1")?;
                Ok(Self::Reset {
                    asset_holding: parse_int(args, 0)?,
                })
            }
            "write" => {
                expect_exactly(args, 2, "2. key and value to set")?;
                Ok(Self::Write {
                    key: args[0].to_string(),
                    value: args[1].to_string(),
                })
            }
            "writeBank" => {
                expect_exactly(args, 4, "4. bank name and three details")?;
                Ok(Self::WriteBank {
                    name: args[0].to_string(),
                    details: args[1..].iter().map(|s| s.to_string()).collect(),
                })
            }
            "init_marble" | "createRecord" => {
                expect_exactly(args, 4, "4. id, category, size, owner")?;
                if let Some(position) = args.iter().position(|arg| arg.is_empty()) {
                    return Err(ExchangeError::EmptyArgument {
                        position: position + 1,
                    });
                }
                Ok(Self::CreateMarble {
                    id: args[0].to_string(),
                    category: args[1].to_string(),
                    size: parse_int(args, 2)?,
                    owner: args[3].to_string(),
                })
            }
            "set_user" | "setOwner" => {
                expect_at_least(args, 2, "2. id and new owner")?;
                Ok(Self::SetOwner {
                    id: args[0].to_string(),
                    owner: args[1].to_string(),
                })
            }
            "delete" | "deleteRecord" => {
                expect_exactly(args, 1, "1")?;
                Ok(Self::DeleteMarble {
                    id: args[0].to_string(),
                })
            }
            "open_trade" | "openTrade" => Ok(Self::OpenTrade(parse_open_trade(args)?)),
            "perform_trade" | "performTrade" => {
                expect_at_least(args, 6, "6")?;
                Ok(Self::PerformTrade(TradeFill {
                    trade_id: parse_int(args, 0)?,
                    closer: Closer {
                        user: args[1].to_string(),
                        marble_id: args[2].to_string(),
                    },
                    opener: Opener {
                        user: args[3].to_string(),
                        timestamp: parse_int(args, 4)?,
                        size: parse_int(args, 5)?,
                    },
                }))
            }
            "remove_trade" | "removeTrade" => {
                expect_at_least(args, 1, "1")?;
                Ok(Self::RemoveTrade {
                    id: parse_int(args, 0)?,
                })
            }
            other => Err(ExchangeError::UnknownFunction(other.to_string())),
        }
    }

    pub fn apply<L: Ledger>(self, service: &ExchangeService<L>) -> Result<()> {
        match self {
            Self::Reset { asset_holding } => service.reset(asset_holding),
            Self::Write { key, value } => service.write_note(&key, &value),
            Self::WriteBank { name, details } => {
                let details: Vec<&str> = details.iter().map(String::as_str).collect();
                service.register_bank(&name, &details)
            }
            Self::CreateMarble {
                id,
                category,
                size,
                owner,
            } => service.create_marble(&id, &category, size, &owner).map(|_| ()),
            Self::SetOwner { id, owner } => service.set_owner(&id, &owner).map(|_| ()),
            Self::DeleteMarble { id } => service.delete_marble(&id),
            Self::OpenTrade(trade) => service.open_trade(trade).map(|_| ()),
            Self::PerformTrade(fill) => service.perform_trade(&fill).map(|_| ()),
            Self::RemoveTrade { id } => service.remove_trade(id).map(|_| ()),
        }
    }
}

// owner, want label, want size, then (offer label, offer size) pairs.
// Every criteria timestamp is the owner's identity read as an integer; the labels
// only fill their positions.
fn parse_open_trade(args: &[&str]) -> Result<OpenTrade> {
    expect_at_least(args, 5, "at least 5")?;
    if args.len() % 2 == 0 {
        return Err(ExchangeError::InvalidArgumentCount {
            expected: "an odd number",
            got: args.len(),
        });
    }

    let owner = args[0];
    let timestamp = identity_timestamp(owner);
    let mut trade =
        OpenTrade::new(owner).set_want(Description::new(timestamp, parse_int(args, 2)?));
    for index in (4..args.len()).step_by(2) {
        trade = trade.add_willing(Description::new(timestamp, parse_int(args, index)?));
    }
    Ok(trade)
}

impl Query {
    pub fn parse(function: &str, args: &[&str]) -> Result<Self> {
        match function {
            "read" | "readRecord" => {
                expect_exactly(args, 1, "1. id to query")?;
                Ok(Self::ReadMarble {
                    id: args[0].to_string(),
                })
            }
            "readBank" => {
                expect_exactly(args, 1, "1. bank name to query")?;
                Ok(Self::ReadBank {
                    name: args[0].to_string(),
                })
            }
            "readAll" => Ok(Self::ReadAll),
            "readBanks" => Ok(Self::ReadBanks),
            "readIndex" => Ok(Self::ReadIndex),
            other => Err(ExchangeError::UnknownFunction(other.to_string())),
        }
    }

    pub fn run<L: Ledger>(self, service: &ExchangeService<L>) -> Result<Vec<u8>> {
        match self {
            Self::ReadMarble { id } => service.read_marble(&id),
            Self::ReadBank { name } => service.read_bank(&name),
            Self::ReadAll => service.read_all_bytes(),
            Self::ReadBanks => encode(&service.list_banks()?),
            Self::ReadIndex => encode(&service.read_index()?),
        }
    }
}

/// Parse and run a mutating operation
pub fn invoke<L: Ledger>(service: &ExchangeService<L>, function: &str, args: &[&str]) -> Result<()> {
    Invocation::parse(function, args)?.apply(service)
}

/// Parse and run a read-only query
pub fn query<L: Ledger>(
    service: &ExchangeService<L>,
    function: &str,
    args: &[&str],
) -> Result<Vec<u8>> {
    Query::parse(function, args)?.run(service)
}
