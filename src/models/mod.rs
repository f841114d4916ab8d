//! Documents persisted by the entity stores

pub mod punishment;
pub mod punishment_player;
pub mod punishment_reason;

// Re-export core models for easy access
pub use punishment::{generate_punishment_id, Punishment, PunishmentType, PERMANENT};
pub use punishment_player::PunishmentPlayer;
pub use punishment_reason::PunishmentReason;
