//! Per-guild drop statistics entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild drop statistics database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guild_drop_stats")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    /// Total coins collected from drops in this guild
    pub total_collected: i64,
    /// How many drops have been opened in this guild
    pub drop_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
