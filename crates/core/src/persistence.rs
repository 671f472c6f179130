use crate::{LedgerState, OwnedCard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

pub const SAVE_SCHEMA_VERSION: u32 = 1;
pub const LEDGER_KEY: &str = "packrip-ledger";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read failed for '{key}': {reason}")]
    Read { key: String, reason: String },
    #[error("write failed for '{key}': {reason}")]
    Write { key: String, reason: String },
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Corrupt(value.to_string())
    }
}

/// String key-value persistence provider.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLedger {
    pub version: u32,
    pub coins: u64,
    #[serde(default)]
    pub collection: Vec<OwnedCard>,
    /// Written for readers of the file; rebuilt from `collection` on load.
    #[serde(default)]
    pub unlocked_cards: Vec<String>,
}

pub fn encode_ledger(ledger: &LedgerState) -> Result<String, StoreError> {
    let payload = SavedLedger {
        version: SAVE_SCHEMA_VERSION,
        coins: ledger.coins(),
        collection: ledger.collection().to_vec(),
        unlocked_cards: ledger.unlocked_ids(),
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}

pub fn decode_ledger(body: &str) -> Result<LedgerState, StoreError> {
    let payload: SavedLedger = serde_json::from_str(body)?;
    if payload.version != SAVE_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: payload.version,
            expected: SAVE_SCHEMA_VERSION,
        });
    }
    Ok(LedgerState::from_collection(payload.coins, payload.collection))
}

/// Reads and writes the ledger record under a single key.
#[derive(Debug)]
pub struct LedgerStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> LedgerStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, LEDGER_KEY)
    }

    pub fn with_key(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        match self.store.get(&self.key)? {
            Some(body) => decode_ledger(&body).map(Some),
            None => Ok(None),
        }
    }

    /// Missing, unreadable and corrupt records all start a fresh ledger.
    pub fn load_or_default(&self, starting_coins: u64) -> LedgerState {
        match self.load() {
            Ok(Some(ledger)) => ledger,
            Ok(None) => LedgerState::new(starting_coins),
            Err(err) => {
                warn!(key = %self.key, error = %err, "discarding saved ledger");
                LedgerState::new(starting_coins)
            }
        }
    }

    pub fn save(&mut self, ledger: &LedgerState) -> Result<(), StoreError> {
        let body = encode_ledger(ledger)?;
        self.store.set(&self.key, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tier;
    use chrono::{DateTime, Utc};

    fn owned(id: &str, tier: Tier, secs: i64) -> OwnedCard {
        OwnedCard {
            card_id: id.to_string(),
            tier,
            pack_id: Some("silver".to_string()),
            acquired_at: DateTime::<Utc>::from_timestamp(secs, 0).expect("timestamp"),
        }
    }

    fn sample() -> LedgerState {
        LedgerState::from_collection(
            640,
            vec![
                owned("alex-hales", Tier::Common, 1_700_000_000),
                owned("rashid-khan", Tier::Rare, 1_700_000_100),
            ],
        )
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Read {
                key: key.to_string(),
                reason: "disk gone".to_string(),
            })
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                key: key.to_string(),
                reason: "disk gone".to_string(),
            })
        }
    }

    #[test]
    fn save_load_roundtrip() {
        let mut store = LedgerStore::new(MemoryStore::new());
        store.save(&sample()).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded, sample());
    }

    #[test]
    fn encoding_is_stable_across_reload() {
        let first = encode_ledger(&sample()).expect("encode");
        let second = encode_ledger(&decode_ledger(&first).expect("decode")).expect("encode");
        assert_eq!(first, second);
    }

    #[test]
    fn record_uses_camel_case_layout() {
        let body = encode_ledger(&sample()).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert_eq!(value["coins"], 640);
        assert_eq!(value["collection"][1]["cardId"], "rashid-khan");
        assert_eq!(value["collection"][1]["tier"], "Rare");
        assert!(value["collection"][0]["acquiredAt"].is_string());
        assert_eq!(value["unlockedCards"], serde_json::json!(["alex-hales", "rashid-khan"]));
    }

    #[test]
    fn stale_unlocked_list_is_ignored() {
        let body = r#"{
            "version": 1,
            "coins": 10,
            "collection": [
                {"cardId": "ms-dhoni", "tier": "Legend", "acquiredAt": "2024-01-01T00:00:00Z"}
            ],
            "unlockedCards": ["virat-kohli"]
        }"#;
        let ledger = decode_ledger(body).expect("decode");
        assert!(ledger.is_unlocked("ms-dhoni"));
        assert!(!ledger.is_unlocked("virat-kohli"));
        assert_eq!(ledger.collection()[0].pack_id, None);
    }

    #[test]
    fn missing_record_yields_default() {
        let store = LedgerStore::new(MemoryStore::new());
        let ledger = store.load_or_default(1000);
        assert_eq!(ledger.coins(), 1000);
        assert!(ledger.collection().is_empty());
    }

    #[test]
    fn corrupt_record_yields_default() {
        let store = LedgerStore::new(MemoryStore::with_entry(LEDGER_KEY, "{not json"));
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
        assert_eq!(store.load_or_default(1000), LedgerState::new(1000));
    }

    #[test]
    fn other_version_yields_default() {
        let body = r#"{"version": 9, "coins": 5}"#;
        let store = LedgerStore::new(MemoryStore::with_entry(LEDGER_KEY, body));
        assert!(matches!(
            store.load(),
            Err(StoreError::UnsupportedVersion { found: 9, expected: 1 })
        ));
        assert_eq!(store.load_or_default(1000).coins(), 1000);
    }

    #[test]
    fn unreadable_store_yields_default() {
        let store = LedgerStore::new(BrokenStore);
        assert_eq!(store.load_or_default(1000).coins(), 1000);
    }

    #[test]
    fn write_failure_is_reported() {
        let mut store = LedgerStore::new(BrokenStore);
        assert!(matches!(store.save(&sample()), Err(StoreError::Write { .. })));
    }
}
