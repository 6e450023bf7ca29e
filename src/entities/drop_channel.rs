//! Drop channel entity - Registered coin-drop targets.
//!
//! Pure membership set mirrored to storage so the scheduler can reload its
//! registry at startup.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Drop channel database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drop_channels")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    /// Discord channel ID eligible to receive drops
    #[sea_orm(primary_key, auto_increment = false)]
    pub channel_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
