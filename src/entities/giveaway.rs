//! Giveaway entity - One row per giveaway, open or finished.
//!
//! `winner_ids` holds the current winner list as a JSON-encoded array of
//! user ID strings; rerolls overwrite it in place. `ended` and `cancelled`
//! are mutually exclusive terminal flags.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Giveaway database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "giveaways")]
pub struct Model {
    /// Unique identifier, assigned by storage on creation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord guild ID the giveaway runs in
    pub guild_id: String,
    /// Discord channel ID the announcement lives in
    pub channel_id: String,
    /// Discord message ID of the announcement, set after posting
    pub message_id: Option<String>,
    /// Short title shown in the announcement
    pub title: String,
    /// Longer free-form description
    pub description: String,
    /// What the winners receive
    pub prize: String,
    /// How many winners to draw (fixed at creation, reroll may override)
    pub winner_count: i32,
    /// How long the giveaway stays open, in minutes
    pub duration_minutes: i64,
    /// Role a member must hold to enter, if any
    pub required_role_id: Option<String>,
    /// Minimum Discord account age in days, if any
    pub min_account_age_days: Option<i64>,
    /// Minimum bot level, if any
    pub min_level: Option<i32>,
    /// Whether recent winners are barred from entering
    pub restrict_winners: bool,
    /// Discord user ID of the admin who created it
    pub created_by: String,
    /// When the giveaway was created
    pub created_at: DateTimeUtc,
    /// Whether the giveaway has been ended and winners drawn
    pub ended: bool,
    /// Whether the giveaway was cancelled before ending
    pub cancelled: bool,
    /// JSON array of winner user IDs, `"[]"` until ended
    pub winner_ids: String,
}

impl Model {
    /// When entries stop being accepted.
    #[must_use]
    pub fn ends_at(&self) -> DateTimeUtc {
        self.created_at + chrono::Duration::minutes(self.duration_minutes)
    }

    /// Decodes the stored winner list.
    #[must_use]
    pub fn winners(&self) -> Vec<String> {
        serde_json::from_str(&self.winner_ids).unwrap_or_default()
    }
}

/// Defines relationships between Giveaway and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One giveaway has many entries
    #[sea_orm(has_many = "super::giveaway_entry::Entity")]
    Entries,
}

impl Related<super::giveaway_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
