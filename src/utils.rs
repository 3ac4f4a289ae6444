//! Utility functions for ids and timestamps

use bech32::Bech32m;
use chrono::Utc;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// A fresh marble id for callers that don't bring their own
pub fn mint_marble_id() -> anyhow::Result<String> {
    new_uuid_to_bech32("marble_")
}

/// Current UTC time in milliseconds, used as trade ids
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Integer reading of an identity or category string, 0 when it isn't numeric.
///
/// Trade criteria and marbles carry this value as their `timestamp`. It is not a
/// creation time.
pub fn identity_timestamp(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}
