use super::{Punishment, PunishmentType};
use serde::{Deserialize, Serialize};

/// Predefined reason a moderator picks when punishing a player
///
/// Addressable by its numeric `id` or, case-insensitively, by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunishmentReason {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub punishment_type: PunishmentType,
    /// `None` for permanent punishments
    #[serde(default)]
    pub duration_millis: Option<i64>,
}

impl PunishmentReason {
    pub const ID_FIELD: &'static str = "id";
    pub const NAME_FIELD: &'static str = "name";

    pub fn new(
        id: i32,
        name: impl Into<String>,
        punishment_type: PunishmentType,
        duration_millis: Option<i64>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            punishment_type,
            duration_millis,
        }
    }

    /// Issue a punishment for this reason at `now`
    pub fn punish(&self, moderator: impl Into<String>, now: i64) -> Punishment {
        Punishment::new(
            self.name.clone(),
            self.punishment_type,
            moderator,
            now,
            self.duration_millis,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::punishment::PERMANENT;

    #[test]
    fn test_punish_applies_reason_terms() {
        let reason = PunishmentReason::new(7, "Spam", PunishmentType::Mute, Some(3_600_000));
        let punishment = reason.punish("mod", 1_000);
        assert_eq!(punishment.reason, "Spam");
        assert_eq!(punishment.punishment_type, PunishmentType::Mute);
        assert_eq!(punishment.expires_at, 3_601_000);

        let permanent = PunishmentReason::new(8, "Hacking", PunishmentType::Ban, None);
        assert_eq!(permanent.punish("mod", 1_000).expires_at, PERMANENT);
    }

    #[test]
    fn test_stored_duration_out_of_range_does_not_wrap() {
        let reason = PunishmentReason::new(1, "Hacking", PunishmentType::Ban, Some(i64::MAX));
        let punishment = reason.punish("mod", 1_000);
        assert_eq!(punishment.expires_at, i64::MAX);
        assert!(punishment.is_active_at(1_000));
    }
}
