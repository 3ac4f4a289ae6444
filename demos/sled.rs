use anyhow::Context;
use marble_exchange::{
    ExchangeConfig, ExchangeService,
    dispatch::{invoke, query},
    types::TradeBook,
};
use std::sync::Arc;

// Walks through a barter between bob and alice on a sled database.
// Pass a TOML config path as the first argument to override the defaults.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ExchangeConfig::load(path)?,
        None => ExchangeConfig {
            db_path: "sled".into(),
            ..ExchangeConfig::default()
        },
    };
    let ledger = config.open_ledger()?;
    let service = ExchangeService::with_keys(Arc::new(ledger), config.keys.clone());

    invoke(&service, "init", &["0"])?;
    invoke(&service, "init_marble", &["A1", "blue", "5", "bob"])?;
    invoke(&service, "init_marble", &["A2", "red", "7", "alice"])?;
    invoke(&service, "open_trade", &["alice", "blue", "5", "red", "7"])?;

    let book: TradeBook = minicbor::decode(&query(&service, "readAll", &[])?)?;
    println!("{:#?}", book);

    let trade_id = book
        .open_trades
        .first()
        .context("alice's trade was not opened")?
        .id()
        .to_string();
    invoke(
        &service,
        "perform_trade",
        &[trade_id.as_str(), "bob", "A1", "alice", "0", "7"],
    )?;

    for id in ["A1", "A2"] {
        println!("{:#?}", service.marble(id)?);
    }
    println!("open trades left: {}", service.read_all()?.len());

    Ok(())
}
