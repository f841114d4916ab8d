//! # Player Entity Store
//!
//! Caches one [`PunishmentPlayer`] document per player uuid. Identifiers are
//! matched exactly.

use super::{Cache, CacheStats, EntityStore};
use crate::error::Result;
use crate::logging::log_cache_operation;
use crate::models::{Punishment, PunishmentPlayer, PunishmentType};
use crate::store::{Filter, SharedCollection};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct PlayerState {
    cache: Cache<String, PunishmentPlayer>,
    /// Uuids known to exist in the collection
    present: HashSet<String>,
}

/// Write-deferred cache of player punishment histories
pub struct PlayerStore {
    collection: SharedCollection<PunishmentPlayer>,
    state: Mutex<PlayerState>,
}

impl std::fmt::Debug for PlayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStore")
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl PlayerStore {
    pub fn new(collection: SharedCollection<PunishmentPlayer>) -> Self {
        Self {
            collection,
            state: Mutex::new(PlayerState::default()),
        }
    }

    fn ident_filter(uuid: &str) -> Filter {
        Filter::eq(PunishmentPlayer::IDENT_FIELD, uuid)
    }

    async fn pull_locked(
        &self,
        state: &mut PlayerState,
        uuid: &str,
    ) -> Result<Option<PunishmentPlayer>> {
        let found = self.collection.find_one(&Self::ident_filter(uuid)).await?;

        match &found {
            Some(player) => {
                state.present.insert(uuid.to_string());
                state.cache.set(uuid.to_string(), player.clone());
                log_cache_operation("pull", self.name(), Some(uuid), "hit", None);
            }
            None => log_cache_operation("pull", self.name(), Some(uuid), "miss", None),
        }
        Ok(found)
    }

    async fn get_locked(&self, state: &mut PlayerState, uuid: &str) -> Result<Option<PunishmentPlayer>> {
        if let Some(player) = state.cache.get(&uuid.to_string()) {
            return Ok(Some(player.clone()));
        }
        self.pull_locked(state, uuid).await
    }

    /// Replace when the uuid is known to exist, insert and remember it otherwise
    async fn write_entry(
        &self,
        present: &mut HashSet<String>,
        uuid: &str,
        player: &PunishmentPlayer,
    ) -> Result<()> {
        if present.contains(uuid) {
            let matched = self
                .collection
                .replace_one(&Self::ident_filter(uuid), player)
                .await?;
            if !matched {
                warn!(collection = %self.name(), uuid = %uuid, "Replace matched no document");
            }
            log_cache_operation("push", self.name(), Some(uuid), "replaced", None);
        } else {
            self.collection.insert_one(player).await?;
            present.insert(uuid.to_string());
            log_cache_operation("push", self.name(), Some(uuid), "inserted", None);
        }
        Ok(())
    }

    /// Append `punishment` to the player's history, creating the record when needed
    ///
    /// The change stays in memory until the next flush.
    pub async fn punish(&self, uuid: &str, punishment: Punishment) -> Result<PunishmentPlayer> {
        let mut state = self.state.lock().await;
        let mut player = self
            .get_locked(&mut state, uuid)
            .await?
            .unwrap_or_else(|| PunishmentPlayer::new(uuid));

        debug!(
            uuid = %uuid,
            punishment_id = %punishment.id,
            punishment_type = %punishment.punishment_type,
            reason = %punishment.reason,
            "Recording punishment"
        );
        player.punishments.push(punishment);
        state.cache.set(uuid.to_string(), player.clone());
        Ok(player)
    }

    /// Lift the player's active punishment of `punishment_type`, if any
    pub async fn revoke(
        &self,
        uuid: &str,
        punishment_type: PunishmentType,
        moderator: &str,
        reason: &str,
        now: i64,
    ) -> Result<Option<Punishment>> {
        let mut state = self.state.lock().await;
        let Some(mut player) = self.get_locked(&mut state, uuid).await? else {
            return Ok(None);
        };

        let revoked = player
            .active_punishment_mut(punishment_type, now)
            .map(|punishment| {
                punishment.revoke(moderator, reason, now);
                punishment.clone()
            });

        if revoked.is_some() {
            state.cache.set(uuid.to_string(), player);
        }
        Ok(revoked)
    }

    /// Active punishment of `punishment_type` at `now`
    pub async fn active_punishment(
        &self,
        uuid: &str,
        punishment_type: PunishmentType,
        now: i64,
    ) -> Result<Option<Punishment>> {
        let player = self.get(&uuid.to_string()).await?;
        Ok(player.and_then(|p| p.active_punishment(punishment_type, now).cloned()))
    }
}

#[async_trait]
impl EntityStore for PlayerStore {
    type Ident = String;
    type Data = PunishmentPlayer;

    fn name(&self) -> &str {
        self.collection.name()
    }

    async fn get(&self, ident: &String) -> Result<Option<PunishmentPlayer>> {
        let mut state = self.state.lock().await;
        self.get_locked(&mut state, ident).await
    }

    async fn set(&self, ident: String, data: PunishmentPlayer) {
        let mut state = self.state.lock().await;
        state.cache.set(ident, data);
    }

    async fn remove(&self, ident: &String) -> Option<PunishmentPlayer> {
        let mut state = self.state.lock().await;
        state.cache.remove(ident)
    }

    async fn pull(&self, ident: &String) -> Result<Option<PunishmentPlayer>> {
        let mut state = self.state.lock().await;
        self.pull_locked(&mut state, ident).await
    }

    async fn push(&self, ident: Option<&String>) -> Result<()> {
        let mut guard = self.state.lock().await;
        let PlayerState { cache, present } = &mut *guard;

        match ident {
            Some(uuid) => {
                if let Some(player) = cache.get(uuid) {
                    self.write_entry(present, uuid, player).await?;
                }
            }
            None => {
                for (uuid, player) in cache.iter() {
                    self.write_entry(present, uuid, player).await?;
                }
            }
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.cache.len(),
            present: state.present.len(),
            pending_deletions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryCollection, StoreOperation};
    use std::sync::Arc;

    const UUID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

    fn store_with(
        players: Vec<PunishmentPlayer>,
    ) -> (PlayerStore, Arc<InMemoryCollection<PunishmentPlayer>>) {
        let collection =
            Arc::new(InMemoryCollection::with_documents("punishment_players", players).unwrap());
        (PlayerStore::new(collection.clone()), collection)
    }

    #[tokio::test]
    async fn test_get_pulls_once_then_hits_cache() {
        let (store, collection) = store_with(vec![PunishmentPlayer::new(UUID)]);

        let first = store.get(&UUID.to_string()).await.unwrap();
        let second = store.get(&UUID.to_string()).await.unwrap();

        assert_eq!(first, Some(PunishmentPlayer::new(UUID)));
        assert_eq!(second, first);
        assert_eq!(collection.count(StoreOperation::FIND_ONE), 1);
    }

    #[tokio::test]
    async fn test_miss_is_not_cached() {
        let (store, collection) = store_with(vec![]);

        assert_eq!(store.get(&UUID.to_string()).await.unwrap(), None);
        assert_eq!(store.get(&UUID.to_string()).await.unwrap(), None);
        assert_eq!(collection.count(StoreOperation::FIND_ONE), 2);
        assert_eq!(store.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_uuid_matching_is_exact() {
        let (store, collection) = store_with(vec![]);
        store.set("AbC".to_string(), PunishmentPlayer::new("AbC")).await;

        assert!(store.get(&"abc".to_string()).await.unwrap().is_none());
        assert_eq!(collection.count(StoreOperation::FIND_ONE), 1);
    }

    #[tokio::test]
    async fn test_pulled_record_is_replaced_on_push() {
        let (store, collection) = store_with(vec![PunishmentPlayer::new(UUID)]);
        store.get(&UUID.to_string()).await.unwrap();

        store.push(Some(&UUID.to_string())).await.unwrap();

        assert_eq!(collection.count(StoreOperation::INSERT_ONE), 0);
        assert_eq!(collection.count(StoreOperation::REPLACE_ONE), 1);
    }

    #[tokio::test]
    async fn test_push_of_uncached_ident_is_noop() {
        let (store, collection) = store_with(vec![]);
        store.push(Some(&UUID.to_string())).await.unwrap();
        assert!(collection.operations().is_empty());
    }

    #[tokio::test]
    async fn test_punish_and_revoke() {
        let (store, collection) = store_with(vec![]);
        let ban = Punishment::new("Hacking", PunishmentType::Ban, "mod", 1_000, None);
        let ban_id = ban.id.clone();

        let player = store.punish(UUID, ban).await.unwrap();
        assert!(player.is_banned_at(2_000));
        // nothing written until flushed
        assert_eq!(collection.count(StoreOperation::INSERT_ONE), 0);

        let active = store
            .active_punishment(UUID, PunishmentType::Ban, 2_000)
            .await
            .unwrap();
        assert_eq!(active.map(|p| p.id), Some(ban_id.clone()));

        let revoked = store
            .revoke(UUID, PunishmentType::Ban, "admin", "appeal", 3_000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(revoked.id, ban_id);
        assert_eq!(revoked.unban_date, Some(3_000));
        assert!(store
            .active_punishment(UUID, PunishmentType::Ban, 4_000)
            .await
            .unwrap()
            .is_none());

        store.flush().await.unwrap();
        let stored = collection.documents().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].punishments[0].unban_moderator.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_revoke_without_active_punishment() {
        let (store, _collection) = store_with(vec![PunishmentPlayer::new(UUID)]);
        let revoked = store
            .revoke(UUID, PunishmentType::Mute, "admin", "n/a", 0)
            .await
            .unwrap();
        assert!(revoked.is_none());
    }
}
