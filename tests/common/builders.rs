//! Fixtures for the store and context integration tests

#![allow(dead_code)] // Not every test binary uses every fixture

use punishments_core::cache::{PlayerStore, ReasonStore};
use punishments_core::models::{PunishmentPlayer, PunishmentReason, PunishmentType};
use punishments_core::store::{Collation, InMemoryCollection};
use std::sync::Arc;

pub const PLAYER_UUID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";
pub const OTHER_UUID: &str = "853c80ef-3c37-49fd-aa49-938b674adae6";

pub type ReasonCollection = Arc<InMemoryCollection<PunishmentReason>>;
pub type PlayerCollection = Arc<InMemoryCollection<PunishmentPlayer>>;

pub fn spam() -> PunishmentReason {
    PunishmentReason::new(7, "Spam", PunishmentType::Mute, Some(3_600_000))
}

pub fn hacking() -> PunishmentReason {
    PunishmentReason::new(1, "Hacking", PunishmentType::Ban, None)
}

/// A reason whose name looks like an id
pub fn named_42() -> PunishmentReason {
    PunishmentReason::new(3, "42", PunishmentType::Mute, Some(60_000))
}

pub fn reason_collection(reasons: Vec<PunishmentReason>) -> ReasonCollection {
    Arc::new(
        InMemoryCollection::with_documents("punishment_reasons", reasons)
            .expect("reasons should serialize"),
    )
}

pub fn player_collection(players: Vec<PunishmentPlayer>) -> PlayerCollection {
    Arc::new(
        InMemoryCollection::with_documents("punishment_players", players)
            .expect("players should serialize"),
    )
}

pub fn reason_store(reasons: Vec<PunishmentReason>) -> (ReasonStore, ReasonCollection) {
    let collection = reason_collection(reasons);
    let store = ReasonStore::new(collection.clone(), Collation::default());
    (store, collection)
}

pub fn player_store(players: Vec<PunishmentPlayer>) -> (PlayerStore, PlayerCollection) {
    let collection = player_collection(players);
    (PlayerStore::new(collection.clone()), collection)
}
