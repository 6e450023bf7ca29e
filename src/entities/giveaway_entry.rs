//! Giveaway entry entity - One row per (giveaway, user) pair.
//!
//! The composite primary key is the storage-level uniqueness guarantee for
//! "one entry per user per giveaway": concurrent inserts race at the
//! database, and the loser surfaces a unique-constraint violation that the
//! engine maps to the user-facing "already entered" outcome.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Giveaway entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "giveaway_entries")]
pub struct Model {
    /// Giveaway the entry belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub giveaway_id: i64,
    /// Discord user ID of the entrant
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Entry weight from the entrant's tier at entry time
    pub weight: f64,
    /// When the entry was recorded
    pub entered_at: DateTimeUtc,
}

/// Defines relationships between `GiveawayEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one giveaway
    #[sea_orm(
        belongs_to = "super::giveaway::Entity",
        from = "Column::GiveawayId",
        to = "super::giveaway::Column::Id"
    )]
    Giveaway,
}

impl Related<super::giveaway::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Giveaway.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
