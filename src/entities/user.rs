//! User entity - Per-guild economy and leveling state.
//!
//! One row per (guild, user) pair, created lazily the first time a member
//! earns currency or XP.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Discord guild ID this row belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    /// Discord user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Current coin balance
    pub balance: i64,
    /// Total accumulated XP
    pub xp: i64,
    /// Current level, derived from `xp`
    pub level: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
