//! # Reason Entity Store
//!
//! Caches [`PunishmentReason`] documents, each addressable by two identifier
//! forms: the numeric id (`"7"`) and the display name (`"Spam"`, matched
//! case-insensitively).
//!
//! Records live in a single map keyed by id; a case-insensitive name index
//! points at the id, so both forms always resolve to the same record.
//!
//! Whenever an identifier parses as an integer it is treated as an id first.
//! A reason literally named `"42"` is therefore only reachable by name through
//! the in-memory name index, never through a collection lookup.

use super::{Cache, CacheKey, CacheStats, EntityStore};
use crate::error::Result;
use crate::logging::log_cache_operation;
use crate::models::PunishmentReason;
use crate::store::{Collation, Filter, SharedCollection};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct ReasonState {
    records: Cache<i32, PunishmentReason>,
    /// Folded name → id
    names: Cache<String, i32>,
    /// Ids known to exist in the collection
    present: HashSet<i32>,
    /// Identifiers as passed to `delete`, resolved at flush time
    deletions: HashSet<String>,
}

impl Default for ReasonState {
    fn default() -> Self {
        Self {
            records: Cache::default(),
            names: Cache::case_insensitive(),
            present: HashSet::new(),
            deletions: HashSet::new(),
        }
    }
}

impl ReasonState {
    /// Id of the cached record addressed by `ident`, id form first
    fn resolve(&self, ident: &str) -> Option<i32> {
        if let Ok(id) = ident.parse::<i32>() {
            if self.records.contains(&id) {
                return Some(id);
            }
        }
        self.names.get(&ident.to_string()).copied()
    }

    /// Cache `reason` under both forms, dropping a stale name of the same id
    fn index(&mut self, reason: PunishmentReason) {
        if let Some(previous) = self.records.get(&reason.id) {
            if previous.name.folded() != reason.name.folded() {
                let stale = previous.name.clone();
                // the old name may already belong to another id
                if self.names.get(&stale) == Some(&reason.id) {
                    self.names.remove(&stale);
                }
            }
        }
        if let Some(other) = self.names.get(&reason.name).copied() {
            if other != reason.id {
                warn!(
                    name = %reason.name,
                    previous_id = other,
                    id = reason.id,
                    "Reason name now points at a different id"
                );
            }
        }
        self.names.set(reason.name.clone(), reason.id);
        self.records.set(reason.id, reason);
    }

    fn evict(&mut self, id: i32) -> Option<PunishmentReason> {
        let reason = self.records.remove(&id)?;
        if self.names.get(&reason.name) == Some(&id) {
            self.names.remove(&reason.name);
        }
        Some(reason)
    }

    /// Whether a deletion mark addresses `reason`, id form first
    fn mark_matches(mark: &str, reason: &PunishmentReason) -> bool {
        match mark.parse::<i32>() {
            Ok(id) => id == reason.id,
            Err(_) => mark.to_lowercase() == reason.name.to_lowercase(),
        }
    }

    /// The mark to delete `reason` by, preferring an id mark over a name mark
    fn deletion_mark(&self, reason: &PunishmentReason) -> Option<String> {
        let mut marks: Vec<&String> = self
            .deletions
            .iter()
            .filter(|mark| Self::mark_matches(mark, reason))
            .collect();
        marks.sort_by_key(|mark| mark.parse::<i32>().is_err());
        marks.first().map(|mark| mark.to_string())
    }
}

/// Write-deferred cache of punishment reasons
pub struct ReasonStore {
    collection: SharedCollection<PunishmentReason>,
    collation: Collation,
    state: Mutex<ReasonState>,
}

impl std::fmt::Debug for ReasonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasonStore")
            .field("collection", &self.collection.name())
            .field("collation", &self.collation)
            .finish()
    }
}

impl ReasonStore {
    pub fn new(collection: SharedCollection<PunishmentReason>, collation: Collation) -> Self {
        Self {
            collection,
            collation,
            state: Mutex::new(ReasonState::default()),
        }
    }

    /// Collection filter for `ident`: by id when it parses, by collated name otherwise
    fn lookup_filter(&self, ident: &str) -> Filter {
        match ident.parse::<i32>() {
            Ok(id) => Filter::eq(PunishmentReason::ID_FIELD, id),
            Err(_) => Filter::collated(PunishmentReason::NAME_FIELD, ident, self.collation.clone()),
        }
    }

    async fn pull_locked(
        &self,
        state: &mut ReasonState,
        ident: &str,
    ) -> Result<Option<PunishmentReason>> {
        let found = self.collection.find_one(&self.lookup_filter(ident)).await?;

        match &found {
            Some(reason) => {
                state.present.insert(reason.id);
                state.index(reason.clone());
                log_cache_operation("pull", self.name(), Some(ident), "hit", None);
            }
            None => log_cache_operation("pull", self.name(), Some(ident), "miss", None),
        }
        Ok(found)
    }

    /// Reconcile one cached record with the collection
    async fn flush_record(&self, state: &mut ReasonState, id: i32) -> Result<()> {
        let Some(reason) = state.records.get(&id).cloned() else {
            return Ok(());
        };

        if let Some(mark) = state.deletion_mark(&reason) {
            return self.delete_record(state, &mark, &reason).await;
        }

        if state.present.contains(&id) {
            let matched = self
                .collection
                .replace_one(&Filter::eq(PunishmentReason::ID_FIELD, id), &reason)
                .await?;
            if !matched {
                warn!(collection = %self.name(), id = id, "Replace matched no document");
            }
            log_cache_operation("push", self.name(), Some(&reason.name), "replaced", None);
        } else {
            self.collection.insert_one(&reason).await?;
            state.present.insert(id);
            log_cache_operation("push", self.name(), Some(&reason.name), "inserted", None);
        }
        Ok(())
    }

    /// Delete by the marked identifier, then forget every form of the record
    async fn delete_record(
        &self,
        state: &mut ReasonState,
        mark: &str,
        reason: &PunishmentReason,
    ) -> Result<()> {
        let deleted = self.collection.delete_one(&self.lookup_filter(mark)).await?;
        if !deleted {
            debug!(collection = %self.name(), mark = %mark, "Delete matched no document");
        }

        state
            .deletions
            .retain(|other| !ReasonState::mark_matches(other, reason));
        state.present.remove(&reason.id);
        state.evict(reason.id);

        info!(id = reason.id, name = %reason.name, "Punishment reason deleted");
        log_cache_operation("push", self.name(), Some(mark), "deleted", None);
        Ok(())
    }

    /// Delete by every mark no cached record answered to, then drop the mark
    async fn flush_unresolved_marks(&self, state: &mut ReasonState) -> Result<()> {
        let mut marks: Vec<String> = state.deletions.iter().cloned().collect();
        marks.sort();

        for mark in marks {
            let deleted = self.collection.delete_one(&self.lookup_filter(&mark)).await?;
            state.deletions.remove(&mark);
            if let Ok(id) = mark.parse::<i32>() {
                state.present.remove(&id);
            }

            let status = if deleted { "deleted" } else { "dropped" };
            log_cache_operation("push", self.name(), Some(&mark), status, None);
        }
        Ok(())
    }

    /// Read the whole collection into memory, marking every record present
    pub async fn load_all_into_cache(&self) -> Result<usize> {
        let reasons = self.collection.find_all().await?;
        let mut state = self.state.lock().await;
        let loaded = reasons.len();

        for reason in reasons {
            state.present.insert(reason.id);
            state.index(reason);
        }

        info!(collection = %self.name(), loaded = loaded, "Punishment reasons loaded into cache");
        Ok(loaded)
    }

    /// Mark `ident` for deletion at the next flush covering its record
    pub async fn delete(&self, ident: &str) {
        let mut state = self.state.lock().await;
        state.deletions.insert(ident.to_string());
        log_cache_operation("delete", self.name(), Some(ident), "marked", None);
    }

    /// Whether `ident` is waiting for deletion
    pub async fn is_marked_for_deletion(&self, ident: &str) -> bool {
        let state = self.state.lock().await;
        match state.resolve(ident) {
            Some(id) => state
                .records
                .get(&id)
                .is_some_and(|reason| state.deletion_mark(reason).is_some()),
            None => state.deletions.contains(ident),
        }
    }

    /// Whether the record addressed by `ident` is known to exist in the collection
    pub async fn is_present(&self, ident: &str) -> bool {
        let state = self.state.lock().await;
        match ident.parse::<i32>() {
            Ok(id) => state.present.contains(&id),
            Err(_) => state
                .names
                .get(&ident.to_string())
                .is_some_and(|id| state.present.contains(id)),
        }
    }

    /// Cache-only check, never touches the collection
    pub async fn is_cached(&self, ident: &str) -> bool {
        self.state.lock().await.resolve(ident).is_some()
    }

    /// Smallest id above every cached reason
    ///
    /// Only meaningful once the cache is warm (see [`Self::load_all_into_cache`]).
    pub async fn next_id(&self) -> i32 {
        let state = self.state.lock().await;
        state.records.keys().max().map_or(1, |max| max + 1)
    }

    /// Cached reasons ordered by id
    pub async fn all(&self) -> Vec<PunishmentReason> {
        let state = self.state.lock().await;
        let mut reasons: Vec<PunishmentReason> = state.records.values().cloned().collect();
        reasons.sort_by_key(|reason| reason.id);
        reasons
    }
}

#[async_trait]
impl EntityStore for ReasonStore {
    type Ident = String;
    type Data = PunishmentReason;

    fn name(&self) -> &str {
        self.collection.name()
    }

    async fn get(&self, ident: &String) -> Result<Option<PunishmentReason>> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.resolve(ident) {
            log_cache_operation("get", self.name(), Some(ident), "hit", None);
            return Ok(state.records.get(&id).cloned());
        }
        self.pull_locked(&mut state, ident).await
    }

    /// The record is indexed under its own id and name
    async fn set(&self, ident: String, data: PunishmentReason) {
        let mut state = self.state.lock().await;
        if let Some(id) = state.resolve(&ident) {
            if id != data.id {
                debug!(ident = %ident, cached_id = id, id = data.id, "Reason set under a handle of another id");
            }
        }
        state.index(data);
    }

    async fn remove(&self, ident: &String) -> Option<PunishmentReason> {
        let mut state = self.state.lock().await;
        let id = state.resolve(ident)?;
        state.evict(id)
    }

    async fn pull(&self, ident: &String) -> Result<Option<PunishmentReason>> {
        let mut state = self.state.lock().await;
        self.pull_locked(&mut state, ident).await
    }

    async fn push(&self, ident: Option<&String>) -> Result<()> {
        let mut state = self.state.lock().await;

        match ident {
            Some(ident) => match state.resolve(ident) {
                Some(id) => self.flush_record(&mut state, id).await?,
                None => debug!(collection = %self.name(), ident = %ident, "Nothing cached to push"),
            },
            None => {
                let mut ids: Vec<i32> = state.records.keys().copied().collect();
                ids.sort_unstable();
                for id in ids {
                    self.flush_record(&mut state, id).await?;
                }
                self.flush_unresolved_marks(&mut state).await?;
            }
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.records.len(),
            present: state.present.len(),
            pending_deletions: state.deletions.len(),
        }
    }
}
