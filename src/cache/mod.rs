//! # Entity Cache Layer
//!
//! Read-through, write-deferred caches over a [`DocumentCollection`](crate::store::DocumentCollection).
//!
//! ## Architecture
//!
//! ```text
//! EntityStore (trait)              <- get / set / remove / pull / push
//!   ├── PlayerStore                <- Cache<String, PunishmentPlayer> + presence ledger
//!   └── ReasonStore                <- Cache<i32, PunishmentReason>
//!                                     + Cache<String, i32> name index (case-insensitive)
//!                                     + presence and deletion ledgers
//! ```
//!
//! `get` answers from memory and falls back to `pull` on a miss. Mutations
//! stay in memory until `push` reconciles them with the collection: an insert
//! the first time an identifier is written, a replace afterwards, and for
//! reasons a delete when the identifier was marked with `delete`.
//!
//! Each store keeps its map and ledgers behind a single async mutex, so
//! concurrent command handlers can share one store through an `Arc`.

pub mod player_store;
pub mod reason_store;

pub use player_store::PlayerStore;
pub use reason_store::ReasonStore;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::hash_map::{self, HashMap};
use std::hash::Hash;

/// Identifier type usable as a cache key
pub trait CacheKey: Eq + Hash + Clone + Send + Sync {
    /// Case-folded form used for case-insensitive matching, `None` for non-text keys
    fn folded(&self) -> Option<String> {
        None
    }
}

impl CacheKey for String {
    fn folded(&self) -> Option<String> {
        Some(self.to_lowercase())
    }
}

impl CacheKey for i32 {}
impl CacheKey for i64 {}
impl CacheKey for u32 {}
impl CacheKey for u64 {}
impl CacheKey for uuid::Uuid {}

/// How lookups compare identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMatching {
    #[default]
    Exact,
    /// Text keys also match ignoring case; at most one spelling is kept per key
    CaseInsensitive,
}

/// In-memory identifier → data map
///
/// Holds no locks and performs no I/O; the entity stores wrap it.
#[derive(Debug, Clone)]
pub struct Cache<I, D> {
    entries: HashMap<I, D>,
    folded: HashMap<String, I>,
    matching: KeyMatching,
}

impl<I: CacheKey, D> Default for Cache<I, D> {
    fn default() -> Self {
        Self::new(KeyMatching::Exact)
    }
}

impl<I: CacheKey, D> Cache<I, D> {
    pub fn new(matching: KeyMatching) -> Self {
        Self {
            entries: HashMap::new(),
            folded: HashMap::new(),
            matching,
        }
    }

    pub fn case_insensitive() -> Self {
        Self::new(KeyMatching::CaseInsensitive)
    }

    pub fn matching(&self) -> KeyMatching {
        self.matching
    }

    /// Stored spelling of the key matching `ident`
    pub fn resolve(&self, ident: &I) -> Option<&I> {
        if let Some((key, _)) = self.entries.get_key_value(ident) {
            return Some(key);
        }
        match self.matching {
            KeyMatching::Exact => None,
            KeyMatching::CaseInsensitive => ident.folded().and_then(|f| self.folded.get(&f)),
        }
    }

    pub fn get(&self, ident: &I) -> Option<&D> {
        let key = self.resolve(ident)?;
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, ident: &I) -> Option<&mut D> {
        let key = self.resolve(ident)?.clone();
        self.entries.get_mut(&key)
    }

    pub fn contains(&self, ident: &I) -> bool {
        self.resolve(ident).is_some()
    }

    /// Upsert; in case-insensitive mode the new spelling replaces any previous one
    pub fn set(&mut self, ident: I, data: D) -> Option<D> {
        let mut previous = None;
        if self.matching == KeyMatching::CaseInsensitive {
            if let Some(folded) = ident.folded() {
                if let Some(old_key) = self.folded.insert(folded, ident.clone()) {
                    if old_key != ident {
                        previous = self.entries.remove(&old_key);
                    }
                }
            }
        }
        self.entries.insert(ident, data).or(previous)
    }

    pub fn remove(&mut self, ident: &I) -> Option<D> {
        let key = self.resolve(ident)?.clone();
        if let Some(folded) = key.folded() {
            self.folded.remove(&folded);
        }
        self.entries.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, I, D> {
        self.entries.keys()
    }

    pub fn values(&self) -> hash_map::Values<'_, I, D> {
        self.entries.values()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, I, D> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.folded.clear();
    }
}

/// Snapshot of a store's in-memory state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Cached records
    pub entries: usize,
    /// Identifiers known to exist in the collection
    pub present: usize,
    /// Identifiers marked for deletion at the next flush
    pub pending_deletions: usize,
}

/// A cache of one entity kind backed by a document collection
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Ident: Send + Sync;
    type Data: Send;

    /// Name used in logs, normally the collection name
    fn name(&self) -> &str;

    /// Cached record for `ident`, pulled from the collection on a miss
    ///
    /// A record missing from both is `Ok(None)`.
    async fn get(&self, ident: &Self::Ident) -> Result<Option<Self::Data>>;

    /// Upsert into memory only; written by the next `push` covering it
    async fn set(&self, ident: Self::Ident, data: Self::Data);

    /// Evict from memory only; the collection is untouched
    async fn remove(&self, ident: &Self::Ident) -> Option<Self::Data>;

    /// Look `ident` up in the collection and cache a hit
    async fn pull(&self, ident: &Self::Ident) -> Result<Option<Self::Data>>;

    /// Write cached state back: every entry for `None`, only the matching entry otherwise
    async fn push(&self, ident: Option<&Self::Ident>) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        self.push(None).await
    }

    async fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_cache_is_case_sensitive() {
        let mut cache = Cache::<String, u8>::default();
        cache.set("Alice".to_string(), 1);

        assert_eq!(cache.get(&"Alice".to_string()), Some(&1));
        assert_eq!(cache.get(&"alice".to_string()), None);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut cache = Cache::<String, u8>::case_insensitive();
        cache.set("Alice".to_string(), 1);

        assert_eq!(cache.get(&"alice".to_string()), Some(&1));
        assert_eq!(cache.get(&"ALICE".to_string()), Some(&1));
        assert_eq!(cache.resolve(&"aLiCe".to_string()), Some(&"Alice".to_string()));
    }

    #[test]
    fn test_case_insensitive_set_keeps_one_spelling() {
        let mut cache = Cache::<String, u8>::case_insensitive();
        cache.set("Alice".to_string(), 1);
        let previous = cache.set("ALICE".to_string(), 2);

        assert_eq!(previous, Some(1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"alice".to_string()), Some(&2));
        assert_eq!(cache.keys().next(), Some(&"ALICE".to_string()));
    }

    #[test]
    fn test_remove_clears_folded_index() {
        let mut cache = Cache::<String, u8>::case_insensitive();
        cache.set("Spam".to_string(), 7);

        assert_eq!(cache.remove(&"SPAM".to_string()), Some(7));
        assert!(cache.is_empty());
        assert!(!cache.contains(&"spam".to_string()));
    }

    #[test]
    fn test_numeric_keys_ignore_matching_mode() {
        let mut cache = Cache::<i32, &str>::case_insensitive();
        cache.set(7, "spam");
        assert_eq!(cache.get(&7), Some(&"spam"));
        assert_eq!(cache.get(&8), None);
    }

    proptest! {
        #[test]
        fn prop_any_casing_resolves_to_stored_entry(name in "[a-zA-Z]{1,16}", flips in proptest::collection::vec(any::<bool>(), 16)) {
            let mut cache = Cache::<String, usize>::case_insensitive();
            cache.set(name.clone(), name.len());

            let probe: String = name
                .chars()
                .zip(flips.iter().cycle())
                .map(|(c, flip)| if *flip { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                .collect();

            prop_assert_eq!(cache.get(&probe), Some(&name.len()));
            prop_assert_eq!(cache.len(), 1);
        }
    }
}
