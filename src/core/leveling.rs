//! Leveling business logic - per-message XP awards and the level curve.
//!
//! XP is throttled by an in-memory per-member cooldown so message spam
//! earns nothing. The cooldown map is lost on restart, which at worst
//! hands each member one early award.

use crate::{
    config::LevelSettings,
    core::economy,
    entities::{User, user},
    errors::Result,
};
use rand::Rng;
use sea_orm::{DatabaseConnection, Set, prelude::*};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

/// Cumulative XP needed to go from `level` to `level + 1`.
#[must_use]
pub fn xp_for_level(level: i32) -> i64 {
    let level = i64::from(level);
    5 * level * level + 50 * level + 100
}

/// Level reached with `xp` total XP.
#[must_use]
pub fn level_for_xp(xp: i64) -> i32 {
    let mut level = 0;
    let mut remaining = xp;
    loop {
        let needed = xp_for_level(level);
        if remaining < needed {
            return level;
        }
        remaining -= needed;
        level += 1;
    }
}

/// A level increase produced by an XP award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    /// The level the member just reached
    pub new_level: i32,
}

/// Tracks XP cooldowns and hands out message XP.
pub struct LevelTracker {
    settings: LevelSettings,
    cooldowns: Mutex<HashMap<(String, String), Instant>>,
}

impl LevelTracker {
    /// Creates a tracker with the given settings.
    #[must_use]
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            settings,
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    /// Awards XP for one message if the member is off cooldown.
    ///
    /// Returns `Ok(None)` when throttled, `Ok(Some(level_up))` when the
    /// award crossed a level boundary.
    pub async fn award_message_xp(
        &self,
        db: &DatabaseConnection,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<LevelUp>> {
        if !self.try_take_cooldown(guild_id, user_id) {
            return Ok(None);
        }

        let gained = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.settings.min_xp..=self.settings.max_xp)
        };

        let current = economy::ensure_user(db, guild_id, user_id).await?;
        let new_xp = current.xp + gained;
        let new_level = level_for_xp(new_xp);

        let mut row: user::ActiveModel = current.clone().into();
        row.xp = Set(new_xp);
        row.level = Set(new_level);
        row.update(db).await?;

        debug!(guild = guild_id, user = user_id, gained, new_xp, "xp awarded");
        if new_level > current.level {
            Ok(Some(LevelUp { new_level }))
        } else {
            Ok(None)
        }
    }

    fn try_take_cooldown(&self, guild_id: &str, user_id: &str) -> bool {
        let key = (guild_id.to_string(), user_id.to_string());
        let window = std::time::Duration::from_secs(self.settings.xp_cooldown_secs);
        let now = Instant::now();
        let mut cooldowns = self.cooldowns.lock().unwrap();
        match cooldowns.get(&key) {
            Some(last) if now.duration_since(*last) < window => false,
            _ => {
                cooldowns.insert(key, now);
                true
            }
        }
    }
}

/// Reads back a member's xp and level for display.
pub async fn get_rank(
    db: &DatabaseConnection,
    guild_id: &str,
    user_id: &str,
) -> Result<Option<user::Model>> {
    User::find_by_id((guild_id.to_string(), user_id.to_string()))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn level_curve_checkpoints() {
        assert_eq!(xp_for_level(0), 100);
        assert_eq!(xp_for_level(1), 155);
        assert_eq!(xp_for_level(10), 1100);

        assert_eq!(level_for_xp(0), 0);
        assert_eq!(level_for_xp(99), 0);
        assert_eq!(level_for_xp(100), 1);
        assert_eq!(level_for_xp(254), 1);
        assert_eq!(level_for_xp(255), 2);
    }

    #[test]
    fn level_for_xp_is_monotonic() {
        let mut last = 0;
        for xp in (0..20_000).step_by(37) {
            let level = level_for_xp(xp);
            assert!(level >= last);
            last = level;
        }
    }

    #[tokio::test]
    async fn first_message_awards_xp_and_cooldown_throttles() -> Result<()> {
        let db = setup_test_db().await?;
        let tracker = LevelTracker::new(LevelSettings::default());

        tracker.award_message_xp(&db, "g1", "u1").await?;
        let after_first = get_rank(&db, "g1", "u1").await?.unwrap();
        assert!(after_first.xp >= 15 && after_first.xp <= 25);

        // Immediately again: throttled, xp unchanged
        tracker.award_message_xp(&db, "g1", "u1").await?;
        let after_second = get_rank(&db, "g1", "u1").await?.unwrap();
        assert_eq!(after_second.xp, after_first.xp);
        Ok(())
    }

    #[tokio::test]
    async fn crossing_the_boundary_reports_level_up() -> Result<()> {
        let db = setup_test_db().await?;
        let tracker = LevelTracker::new(LevelSettings {
            xp_cooldown_secs: 0,
            min_xp: 100,
            max_xp: 100,
        });

        let first = tracker.award_message_xp(&db, "g1", "u1").await?;
        assert_eq!(first, Some(LevelUp { new_level: 1 }));

        let second = tracker.award_message_xp(&db, "g1", "u1").await?;
        assert_eq!(second, None); // 200 xp is still level 1

        let third = tracker.award_message_xp(&db, "g1", "u1").await?;
        assert_eq!(third, Some(LevelUp { new_level: 2 })); // 300 xp
        Ok(())
    }
}
