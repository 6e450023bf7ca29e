//! Reward and eligibility policy.
//!
//! Pure functions over a member's attribute set. The engines never touch a
//! platform member object; callers distill one into a [`MemberProfile`]
//! first, which keeps the core testable without a Discord client.

use crate::config::TierSettings;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// The minimal member capabilities the engines need.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    /// Discord user ID
    pub user_id: String,
    /// IDs of every role the member holds
    pub role_ids: HashSet<String>,
    /// When the Discord account was created
    pub account_created_at: DateTime<Utc>,
}

impl MemberProfile {
    /// Whole days since the account was created.
    #[must_use]
    pub fn account_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.account_created_at).num_days()
    }
}

/// A member's role-derived standing. Premium outranks booster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// No tier role held
    Regular,
    /// Server booster
    Booster,
    /// Premium supporter
    Premium,
}

impl Tier {
    /// Derives the tier from role membership; premium is checked before
    /// booster, highest applicable tier wins.
    #[must_use]
    pub fn of(profile: &MemberProfile, settings: &TierSettings) -> Self {
        let holds = |role: &Option<String>| {
            role.as_ref()
                .is_some_and(|id| profile.role_ids.contains(id))
        };
        if holds(&settings.premium_role_id) {
            Self::Premium
        } else if holds(&settings.booster_role_id) {
            Self::Booster
        } else {
            Self::Regular
        }
    }

    /// Giveaway entry weight for the tier.
    #[must_use]
    pub const fn entry_weight(self) -> f64 {
        match self {
            Self::Regular => 1.0,
            Self::Booster => 2.0,
            Self::Premium => 3.0,
        }
    }

    /// Flat multiplier applied after any collection-method bonus.
    #[must_use]
    pub const fn reward_multiplier(self) -> f64 {
        match self {
            Self::Regular => 1.0,
            Self::Booster => 1.25,
            Self::Premium => 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::Duration;

    fn settings() -> TierSettings {
        TierSettings {
            premium_role_id: Some("premium".to_string()),
            booster_role_id: Some("booster".to_string()),
        }
    }

    fn profile(roles: &[&str]) -> MemberProfile {
        MemberProfile {
            user_id: "user".to_string(),
            role_ids: roles.iter().map(ToString::to_string).collect(),
            account_created_at: Utc::now() - Duration::days(400),
        }
    }

    #[test]
    fn premium_wins_over_booster() {
        let settings = settings();
        assert_eq!(
            Tier::of(&profile(&["booster", "premium"]), &settings),
            Tier::Premium
        );
        assert_eq!(Tier::of(&profile(&["booster"]), &settings), Tier::Booster);
        assert_eq!(Tier::of(&profile(&["other"]), &settings), Tier::Regular);
    }

    #[test]
    fn unconfigured_roles_never_match() {
        let settings = TierSettings::default();
        assert_eq!(
            Tier::of(&profile(&["premium", "booster"]), &settings),
            Tier::Regular
        );
    }

    #[test]
    fn weights_and_multipliers() {
        assert_eq!(Tier::Regular.entry_weight(), 1.0);
        assert_eq!(Tier::Booster.entry_weight(), 2.0);
        assert_eq!(Tier::Premium.entry_weight(), 3.0);
        assert_eq!(Tier::Regular.reward_multiplier(), 1.0);
        assert_eq!(Tier::Booster.reward_multiplier(), 1.25);
        assert_eq!(Tier::Premium.reward_multiplier(), 1.5);
    }

    #[test]
    fn account_age_in_whole_days() {
        let now = Utc::now();
        let p = MemberProfile {
            user_id: "user".to_string(),
            role_ids: HashSet::new(),
            account_created_at: now - Duration::days(10) - Duration::hours(5),
        };
        assert_eq!(p.account_age_days(now), 10);
    }
}
