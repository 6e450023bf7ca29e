//! Shared test utilities for `WonderBot`.
//!
//! Provides the standard in-memory database setup, entity factories with
//! sensible defaults, and a constant-output random source for
//! deterministic draw tests.

use crate::{
    core::giveaway::CreateGiveaway,
    core::tier::MemberProfile,
    errors::Result,
};
use rand::RngCore;
use sea_orm::DatabaseConnection;
use std::collections::HashSet;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A member with no tier roles and a year-old account.
pub fn regular_profile(user_id: &str) -> MemberProfile {
    MemberProfile {
        user_id: user_id.to_string(),
        role_ids: HashSet::new(),
        account_created_at: chrono::Utc::now() - chrono::Duration::days(365),
    }
}

/// A giveaway request with sensible defaults: restricted to non-recent
/// winners, no entry requirements.
pub fn test_giveaway(guild_id: &str, winner_count: i32, duration_minutes: i64) -> CreateGiveaway {
    CreateGiveaway {
        guild_id: guild_id.to_string(),
        channel_id: "chan".to_string(),
        title: "Test giveaway".to_string(),
        description: "A test giveaway".to_string(),
        prize: "A prize".to_string(),
        winner_count,
        duration_minutes,
        required_role_id: None,
        min_account_age_days: None,
        min_level: None,
        restrict_winners: true,
        created_by: "admin".to_string(),
    }
}

/// A random source that returns the same 64 bits forever.
///
/// `gen::<f64>()` maps those bits onto `[0, 1)` as
/// `(bits >> 11) * 2^-53`, so [`ConstRng::zero`] draws exactly 0.0 and
/// [`ConstRng::half`] draws exactly 0.5 - which is what the deterministic
/// winner-selection tests rely on.
pub struct ConstRng(u64);

impl ConstRng {
    /// Always draws 0.0.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Always draws 0.5.
    #[must_use]
    pub const fn half() -> Self {
        Self(1 << 63)
    }
}

impl RngCore for ConstRng {
    fn next_u32(&mut self) -> u32 {
        (self.0 >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.0.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
