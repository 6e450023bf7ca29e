//! Ledger entity - Append-only record of every balance mutation.
//!
//! Each row notes the signed amount and a human-readable reason
//! (`"coin drop"`, `"coinflip win"`, ...). Never read back by the engines;
//! consumed only by reporting.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger")]
pub struct Model {
    /// Unique identifier for the ledger row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord guild ID
    pub guild_id: String,
    /// Discord user ID whose balance changed
    pub user_id: String,
    /// Signed amount (positive for credit, negative for debit)
    pub amount: i64,
    /// Why the balance changed
    pub reason: String,
    /// When the mutation happened
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
