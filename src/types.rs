//! Marbles, trade criteria and the blobs they are stored in
use super::error::Result;
use super::utils;
use tracing::warn;

/// A uniquely identified, single-owner record. Stored under its own id.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct Marble {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub category: String,
    // secondary integer matched by trade criteria, always 0 for created marbles
    #[n(2)]
    pub timestamp: i64,
    #[n(3)]
    pub size: i64,
    #[n(4)]
    pub owner: String,
}

/// The shape of a marble: what a trade wants, or one of the things it is willing to give.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Description {
    #[n(0)]
    pub timestamp: i64,
    #[n(1)]
    pub size: i64,
}

/// An open barter offer.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct OpenTrade {
    #[n(0)]
    pub owner: String, // user who opened the trade
    #[n(1)]
    pub timestamp: i64, // creation time in ms, doubles as the trade id
    #[n(2)]
    pub want: Description,
    #[n(3)]
    pub willing: Vec<Description>,
}

/// Every open trade, stored as a single blob.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct TradeBook {
    #[n(0)]
    pub open_trades: Vec<OpenTrade>,
}

/// Ordered ids of every marble, stored as a single blob.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct MarbleIndex {
    #[n(0)]
    pub ids: Vec<String>,
}

impl Marble {
    pub fn new(id: &str, category: &str, size: i64, owner: &str) -> Self {
        Self {
            id: id.to_string(),
            category: category.to_string(),
            timestamp: 0,
            size,
            owner: owner.to_string(),
        }
    }
    /// Owner and shape test used when looking for a marble to trade
    pub fn matches(&self, owner: &str, timestamp: i64, size: i64) -> bool {
        self.owner.to_lowercase() == owner.to_lowercase()
            && self.timestamp == timestamp
            && self.size == size
    }
}

impl Description {
    pub fn new(timestamp: i64, size: i64) -> Self {
        Self { timestamp, size }
    }
}

impl OpenTrade {
    /// Start a trade for `owner`, stamped with the current time in ms
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            timestamp: utils::now_millis(),
            ..Self::default()
        }
    }
    pub fn set_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
    pub fn set_want(mut self, want: Description) -> Self {
        self.want = want;
        self
    }
    pub fn add_willing(mut self, offer: Description) -> Self {
        self.willing.push(offer);
        self
    }
    pub fn id(&self) -> i64 {
        self.timestamp
    }
}

impl TradeBook {
    pub fn find(&self, id: i64) -> Option<&OpenTrade> {
        self.open_trades.iter().find(|trade| trade.id() == id)
    }
    /// Removes the first trade with `id`, returning it
    pub fn remove(&mut self, id: i64) -> Option<OpenTrade> {
        let pos = self.open_trades.iter().position(|trade| trade.id() == id)?;
        Some(self.open_trades.remove(pos))
    }
    pub fn len(&self) -> usize {
        self.open_trades.len()
    }
    pub fn is_empty(&self) -> bool {
        self.open_trades.is_empty()
    }
}

impl MarbleIndex {
    pub fn push(&mut self, id: &str) {
        self.ids.push(id.to_string());
    }
    /// Removes only the first occurrence of `id`
    pub fn remove_first(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|entry| entry == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            }
            None => false,
        }
    }
    pub fn occurrences(&self, id: &str) -> usize {
        self.ids.iter().filter(|entry| entry.as_str() == id).count()
    }
}

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>> {
    Ok(minicbor::to_vec(value)?)
}

// A missing or unreadable blob stands in for an empty value.
pub(crate) fn decode_or_default<T>(key: &str, bytes: Option<&[u8]>) -> T
where
    T: for<'b> minicbor::Decode<'b, ()> + Default,
{
    match bytes {
        None => T::default(),
        Some(bytes) => minicbor::decode(bytes).unwrap_or_else(|e| {
            warn!(key, error = %e, "undecodable blob, treating as empty");
            T::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_marble_timestamp_is_zero_even_for_numeric_category() {
        let marble = Marble::new("m1", "1700", 5, "bob");
        assert_eq!(marble.timestamp, 0);
        assert_eq!(marble.category, "1700");
        assert_eq!(Marble::new("m2", "blue", 5, "bob").timestamp, 0);
    }

    #[test]
    fn matches_ignores_owner_case() {
        let marble = Marble::new("m1", "blue", 5, "Bob");
        assert!(marble.matches("bOB", 0, 5));
        assert!(!marble.matches("bob", 0, 6));
        assert!(!marble.matches("bob", 1, 5));
        assert!(!marble.matches("alice", 0, 5));
    }

    #[test]
    fn trade_book_removes_first_alias_only() {
        let trade = OpenTrade::new("alice").set_timestamp(10);
        let mut book = TradeBook {
            open_trades: vec![
                trade.clone().add_willing(Description::new(0, 1)),
                trade.add_willing(Description::new(0, 2)),
            ],
        };

        let removed = book.remove(10).unwrap();
        assert_eq!(removed.willing, vec![Description::new(0, 1)]);
        assert_eq!(book.len(), 1);
        assert!(book.remove(99).is_none());
    }

    #[test]
    fn index_remove_first_leaves_duplicates() {
        let mut index = MarbleIndex::default();
        index.push("a");
        index.push("b");
        index.push("a");

        assert!(index.remove_first("a"));
        assert_eq!(index.ids, vec!["b".to_string(), "a".to_string()]);
        assert!(!index.remove_first("zzz"));
    }

    #[test]
    fn garbage_blob_decodes_to_default() {
        let book: TradeBook = decode_or_default("_opentrades", Some(&b"\xff\x00garbage"[..]));
        assert!(book.is_empty());

        let marble: Marble = decode_or_default("m1", None);
        assert_eq!(marble, Marble::default());
    }

    #[test]
    fn open_trade_cbor_roundtrip() {
        let trade = OpenTrade::new("alice")
            .set_want(Description::new(0, 5))
            .add_willing(Description::new(0, 7));

        let encoded = encode(&trade).unwrap();
        let decoded: OpenTrade = minicbor::decode(&encoded).unwrap();

        assert_eq!(trade, decoded);
    }
}
