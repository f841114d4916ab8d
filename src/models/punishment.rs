use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// `expires_at` value of a punishment that never expires
pub const PERMANENT: i64 = -1;

/// Kind of punishment a moderator can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PunishmentType {
    Ban,
    Mute,
}

impl fmt::Display for PunishmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunishmentType::Ban => write!(f, "ban"),
            PunishmentType::Mute => write!(f, "mute"),
        }
    }
}

/// A single ban or mute issued against a player
///
/// Timestamps are epoch milliseconds. Stored as part of its
/// [`PunishmentPlayer`](super::PunishmentPlayer) document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Punishment {
    pub id: String,
    /// Name of the [`PunishmentReason`](super::PunishmentReason) this was issued for
    pub reason: String,
    #[serde(rename = "type")]
    pub punishment_type: PunishmentType,
    pub expires_at: i64,
    pub date: i64,
    pub moderator: String,
    #[serde(default)]
    pub unban_moderator: Option<String>,
    #[serde(default)]
    pub unban_reason: Option<String>,
    #[serde(default)]
    pub unban_date: Option<i64>,
    #[serde(default)]
    pub annotation: Option<String>,
}

impl Punishment {
    /// Issue a punishment at `date`; `duration_millis` of `None` makes it permanent
    pub fn new(
        reason: impl Into<String>,
        punishment_type: PunishmentType,
        moderator: impl Into<String>,
        date: i64,
        duration_millis: Option<i64>,
    ) -> Self {
        Self {
            id: generate_punishment_id(),
            reason: reason.into(),
            punishment_type,
            expires_at: duration_millis
                .map_or(PERMANENT, |duration| date.saturating_add(duration)),
            date,
            moderator: moderator.into(),
            unban_moderator: None,
            unban_reason: None,
            unban_date: None,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.expires_at == PERMANENT
    }

    pub fn is_revoked(&self) -> bool {
        self.unban_date.is_some()
    }

    /// Whether the punishment is in force at `now`
    pub fn is_active_at(&self, now: i64) -> bool {
        !self.is_revoked() && (self.is_permanent() || self.expires_at > now)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now().timestamp_millis())
    }

    /// Lift the punishment early
    pub fn revoke(&mut self, moderator: impl Into<String>, reason: impl Into<String>, now: i64) {
        self.unban_moderator = Some(moderator.into());
        self.unban_reason = Some(reason.into());
        self.unban_date = Some(now);
    }

    /// Milliseconds left at `now`, `None` for permanent or inactive punishments
    pub fn remaining_millis(&self, now: i64) -> Option<i64> {
        (self.is_active_at(now) && !self.is_permanent()).then(|| self.expires_at - now)
    }
}

/// Short punishment id: the first nine hex digits of a random uuid
pub fn generate_punishment_id() -> String {
    Uuid::new_v4().simple().to_string()[..9].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 60 * 60 * 1000;

    #[test]
    fn test_generated_ids_are_short_hex() {
        let id = generate_punishment_id();
        assert_eq!(id.len(), 9);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_punishment_id());
    }

    #[test]
    fn test_temporary_punishment_expires() {
        let punishment = Punishment::new("Spam", PunishmentType::Mute, "mod", 1_000, Some(HOUR));
        assert_eq!(punishment.expires_at, 1_000 + HOUR);
        assert!(punishment.is_active_at(1_000));
        assert_eq!(punishment.remaining_millis(1_000), Some(HOUR));
        assert!(!punishment.is_active_at(1_000 + HOUR));
        assert_eq!(punishment.remaining_millis(1_000 + HOUR), None);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let punishment =
            Punishment::new("Spam", PunishmentType::Mute, "mod", 1_000, Some(i64::MAX));
        assert_eq!(punishment.expires_at, i64::MAX);
        assert!(!punishment.is_permanent());
        assert!(punishment.is_active_at(i64::MAX - 1));
    }

    #[test]
    fn test_permanent_punishment_until_revoked() {
        let mut punishment = Punishment::new("Hacking", PunishmentType::Ban, "mod", 0, None);
        assert!(punishment.is_permanent());
        assert!(punishment.is_active_at(i64::MAX));
        assert_eq!(punishment.remaining_millis(5), None);

        punishment.revoke("admin", "appeal accepted", 10);
        assert!(punishment.is_revoked());
        assert!(!punishment.is_active_at(11));
        assert_eq!(punishment.unban_moderator.as_deref(), Some("admin"));
    }

    #[test]
    fn test_document_shape() {
        let punishment = Punishment::new("Spam", PunishmentType::Ban, "mod", 5, None)
            .with_annotation("first offence");
        let json = serde_json::to_value(&punishment).unwrap();

        assert_eq!(json["type"], "BAN");
        assert_eq!(json["expiresAt"], PERMANENT);
        assert_eq!(json["annotation"], "first offence");

        let parsed: Punishment = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, punishment);
    }
}
