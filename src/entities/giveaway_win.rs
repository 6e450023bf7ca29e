//! Giveaway win entity - Append-only record of every winner draw.
//!
//! Used to enforce the winner cooldown and to answer win-history queries.
//! Rerolls add rows without retracting earlier ones, so the table is an
//! audit trail rather than a mirror of the current winner list.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Giveaway win database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "giveaway_wins")]
pub struct Model {
    /// Unique identifier for the win record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID of the winner
    pub user_id: String,
    /// Giveaway that was won
    pub giveaway_id: i64,
    /// When the draw happened
    pub won_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
