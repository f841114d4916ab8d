use super::{Punishment, PunishmentType};
use serde::{Deserialize, Serialize};

/// Punishment history of one player
///
/// Maps to one document in the players collection, keyed by `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentPlayer {
    pub uuid: String,
    #[serde(default)]
    pub punishments: Vec<Punishment>,
}

impl PunishmentPlayer {
    /// Field the players collection is keyed on
    pub const IDENT_FIELD: &'static str = "uuid";

    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            punishments: Vec::new(),
        }
    }

    /// Most recent punishment of `punishment_type` in force at `now`
    pub fn active_punishment(&self, punishment_type: PunishmentType, now: i64) -> Option<&Punishment> {
        self.punishments
            .iter()
            .rev()
            .find(|p| p.punishment_type == punishment_type && p.is_active_at(now))
    }

    pub fn active_punishment_mut(
        &mut self,
        punishment_type: PunishmentType,
        now: i64,
    ) -> Option<&mut Punishment> {
        self.punishments
            .iter_mut()
            .rev()
            .find(|p| p.punishment_type == punishment_type && p.is_active_at(now))
    }

    pub fn is_banned_at(&self, now: i64) -> bool {
        self.active_punishment(PunishmentType::Ban, now).is_some()
    }

    pub fn is_muted_at(&self, now: i64) -> bool {
        self.active_punishment(PunishmentType::Mute, now).is_some()
    }

    pub fn punishment(&self, id: &str) -> Option<&Punishment> {
        self.punishments.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_active_punishment_wins() {
        let mut player = PunishmentPlayer::new("069a79f4-44e9-4726-a5be-fca90e38aaf5");
        player
            .punishments
            .push(Punishment::new("Spam", PunishmentType::Mute, "a", 0, Some(100)));
        player
            .punishments
            .push(Punishment::new("Insult", PunishmentType::Mute, "b", 50, Some(1_000)));

        let active = player.active_punishment(PunishmentType::Mute, 60).unwrap();
        assert_eq!(active.reason, "Insult");
        assert!(player.is_muted_at(500));
        assert!(!player.is_banned_at(500));
        assert!(!player.is_muted_at(2_000));
    }

    #[test]
    fn test_missing_history_deserializes_empty() {
        let player: PunishmentPlayer =
            serde_json::from_value(serde_json::json!({"uuid": "abc"})).unwrap();
        assert!(player.punishments.is_empty());
    }
}
