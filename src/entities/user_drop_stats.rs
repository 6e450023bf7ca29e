//! Per-user drop statistics entity.
//!
//! Aggregates written after every successful collection and never read
//! back by the engine; `/dropstats` is the only consumer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User drop statistics database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_drop_stats")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    /// Discord user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Total coins collected from drops
    pub total_collected: i64,
    /// Collections from common drops
    pub common_count: i64,
    /// Collections from rare drops
    pub rare_count: i64,
    /// Collections from epic drops
    pub epic_count: i64,
    /// Collections from legendary drops
    pub legendary_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
