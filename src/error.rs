use std::convert::Infallible;

/// Failures raised by a [`crate::ledger::Ledger`] backend.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("ledger key is unavailable: {0}")]
    Unavailable(String),
    #[error("ledger lock poisoned")]
    Poisoned,
}

#[derive(thiserror::Error, Debug)]
pub enum ExchangeError {
    #[error("Incorrect number of arguments. Expecting {expected}, got {got}")]
    InvalidArgumentCount { expected: &'static str, got: usize },
    #[error("Argument {position} must be a numeric string, got {value:?}")]
    InvalidNumericArgument { position: usize, value: String },
    #[error("Argument {position} must be a non-empty string")]
    EmptyArgument { position: usize },
    #[error("Marble id already exists: {0}")]
    DuplicateId(String),
    #[error("Marble id is a reserved ledger key: {0}")]
    ReservedId(String),
    #[error("Nothing stored under key: {0}")]
    NotFound(String),
    #[error("Marble {marble} has size {size}, trade wants size {want}")]
    CriteriaMismatch { marble: String, size: i64, want: i64 },
    #[error("No marble owned by {owner} with timestamp {timestamp} and size {size}")]
    NoEligibleRecord {
        owner: String,
        timestamp: i64,
        size: i64,
    },
    #[error("Received unknown function invocation: {0}")]
    UnknownFunction(String),
    #[error("Failed to encode cbor: {0}")]
    Encode(#[from] minicbor::encode::Error<Infallible>),
    #[error(transparent)]
    Store(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
