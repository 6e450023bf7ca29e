//! Giveaway engine - entity lifecycle, entry admission, and weighted
//! winner selection.
//!
//! The engine owns the active-giveaway index (an existence cache; the
//! database stays the source of truth) and the auto-close timers. Winner
//! announcements travel over an event channel so that timer-driven closes,
//! which have no interaction context, render the same way as explicit
//! `/giveaway end` calls.

use crate::{
    config::{GiveawaySettings, TierSettings},
    core::economy,
    core::tier::{MemberProfile, Tier},
    core::timer::TimerMap,
    entities::{
        Giveaway, GiveawayEntry, GiveawayWin, giveaway, giveaway_entry, giveaway_win,
    },
    errors::Result,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, PaginatorTrait, QueryOrder, QuerySelect, Set, SqlErr, prelude::*};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Parameters for [`GiveawayEngine::create`].
#[derive(Debug, Clone)]
pub struct CreateGiveaway {
    /// Guild the giveaway runs in
    pub guild_id: String,
    /// Channel the announcement is posted to
    pub channel_id: String,
    /// Short title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Prize string, not validated here
    pub prize: String,
    /// Number of winners to draw (the 1..=10 convention is the caller's job)
    pub winner_count: i32,
    /// Minutes until auto-close
    pub duration_minutes: i64,
    /// Required role, if any
    pub required_role_id: Option<String>,
    /// Minimum account age in days, if any
    pub min_account_age_days: Option<i64>,
    /// Minimum bot level, if any
    pub min_level: Option<i32>,
    /// Whether recent winners are barred
    pub restrict_winners: bool,
    /// Admin who created the giveaway
    pub created_by: String,
}

/// Announcements the bot layer renders into Discord messages.
#[derive(Debug)]
pub enum GiveawayEvent {
    /// A giveaway closed with winners drawn
    Ended {
        /// The closed giveaway
        giveaway: giveaway::Model,
        /// User IDs of the drawn winners
        winner_ids: Vec<String>,
    },
    /// A giveaway closed with zero entries
    NoWinners {
        /// The closed giveaway
        giveaway: giveaway::Model,
    },
}

/// Why an entry attempt was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDenied {
    /// The user already holds an entry
    AlreadyEntered,
    /// A recent win bars the user for the stated number of days
    WinnerCooldown {
        /// Days until the cooldown lapses
        days_left: i64,
    },
    /// The giveaway requires a role the user lacks
    MissingRole {
        /// The required role ID
        role_id: String,
    },
    /// The user's account is newer than the requirement allows
    AccountTooYoung {
        /// Required account age in days
        required_days: i64,
    },
    /// The user's level is below the requirement
    LevelTooLow {
        /// Required level
        required: i32,
    },
}

impl EntryDenied {
    /// Human-readable rejection reason.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::AlreadyEntered => "You have already entered this giveaway.".to_string(),
            Self::WinnerCooldown { days_left } => format!(
                "You won a giveaway recently. You can enter again in {days_left} day(s)."
            ),
            Self::MissingRole { role_id } => {
                format!("This giveaway requires the <@&{role_id}> role.")
            }
            Self::AccountTooYoung { required_days } => format!(
                "Your Discord account must be at least {required_days} day(s) old to enter."
            ),
            Self::LevelTooLow { required } => {
                format!("You must be at least level {required} to enter.")
            }
        }
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EnterOutcome {
    /// Entry recorded
    Accepted {
        /// Total entries after this one
        entry_count: u64,
        /// The weight this entry carries in the draw
        weight: f64,
    },
    /// No giveaway with that ID
    NotFound,
    /// The giveaway has already closed (or was cancelled)
    AlreadyEnded,
    /// The user is ineligible
    Denied(EntryDenied),
}

/// Result of an end attempt. Ending an already-ended or missing giveaway
/// is a safe no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    /// Nothing to do - missing, cancelled, or already ended
    Noop,
    /// Closed with zero entries
    NoEntries,
    /// Closed with these winners
    Winners(Vec<String>),
}

/// Result of a reroll attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerollOutcome {
    /// No such giveaway (or it was cancelled)
    NotFound,
    /// The giveaway has not ended yet
    NotEnded,
    /// The giveaway ended with zero entries; nothing to redraw
    NoEntries,
    /// The new winner list
    Winners(Vec<String>),
}

/// Result of a cancel attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Cancelled; no winners will ever be drawn
    Cancelled,
    /// No such giveaway (or it was already cancelled)
    NotFound,
    /// The giveaway already ended normally
    AlreadyEnded,
}

/// The giveaway lifecycle engine.
pub struct GiveawayEngine {
    db: DatabaseConnection,
    tiers: TierSettings,
    settings: GiveawaySettings,
    /// Existence cache of open giveaways; the database is authoritative.
    active: Mutex<HashMap<i64, giveaway::Model>>,
    timers: TimerMap<i64>,
    events: mpsc::UnboundedSender<GiveawayEvent>,
}

impl GiveawayEngine {
    /// Creates the engine and the event receiver the bot layer drains.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        tiers: TierSettings,
        settings: GiveawaySettings,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<GiveawayEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            db,
            tiers,
            settings,
            active: Mutex::new(HashMap::new()),
            timers: TimerMap::new(),
            events,
        });
        (engine, rx)
    }

    /// Repopulates the active index from storage at startup.
    ///
    /// Auto-close timers are not restored; a giveaway whose deadline passed
    /// while the process was down stays open until an operator runs
    /// `/giveaway end`.
    pub async fn load_active(&self) -> Result<usize> {
        let open = Giveaway::find()
            .filter(giveaway::Column::Ended.eq(false))
            .filter(giveaway::Column::Cancelled.eq(false))
            .all(&self.db)
            .await?;
        let count = open.len();
        let mut active = self.active.lock().unwrap();
        for model in open {
            active.insert(model.id, model);
        }
        info!(count, "loaded open giveaways into the active index");
        Ok(count)
    }

    /// Persists a new giveaway, caches it, and schedules its auto-close.
    pub async fn create(self: &Arc<Self>, req: CreateGiveaway) -> Result<giveaway::Model> {
        let model = giveaway::ActiveModel {
            guild_id: Set(req.guild_id),
            channel_id: Set(req.channel_id),
            message_id: Set(None),
            title: Set(req.title),
            description: Set(req.description),
            prize: Set(req.prize),
            winner_count: Set(req.winner_count.max(1)),
            duration_minutes: Set(req.duration_minutes),
            required_role_id: Set(req.required_role_id),
            min_account_age_days: Set(req.min_account_age_days),
            min_level: Set(req.min_level),
            restrict_winners: Set(req.restrict_winners),
            created_by: Set(req.created_by),
            created_at: Set(chrono::Utc::now()),
            ended: Set(false),
            cancelled: Set(false),
            winner_ids: Set("[]".to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        self.active
            .lock()
            .unwrap()
            .insert(model.id, model.clone());

        let delay = Duration::from_secs(model.duration_minutes.max(0) as u64 * 60);
        let engine = Arc::clone(self);
        let id = model.id;
        self.timers.schedule(id, delay, async move {
            if let Err(err) = engine.end(id).await {
                error!(giveaway = id, "scheduled giveaway close failed: {err}");
            }
        });

        info!(
            giveaway = model.id,
            guild = %model.guild_id,
            minutes = model.duration_minutes,
            "giveaway created"
        );
        Ok(model)
    }

    /// Records the announcement message ID once the bot layer has posted it.
    pub async fn set_message_id(&self, giveaway_id: i64, message_id: &str) -> Result<()> {
        Giveaway::update_many()
            .col_expr(
                giveaway::Column::MessageId,
                Expr::value(Some(message_id.to_string())),
            )
            .filter(giveaway::Column::Id.eq(giveaway_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Fetches a giveaway, consulting the active index before storage.
    pub async fn get(&self, giveaway_id: i64) -> Result<Option<giveaway::Model>> {
        if let Some(model) = self.active.lock().unwrap().get(&giveaway_id) {
            return Ok(Some(model.clone()));
        }
        Giveaway::find_by_id(giveaway_id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Number of entries recorded for a giveaway.
    pub async fn entry_count(&self, giveaway_id: i64) -> Result<u64> {
        GiveawayEntry::find()
            .filter(giveaway_entry::Column::GiveawayId.eq(giveaway_id))
            .count(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Evaluates the admission chain in order, short-circuiting on the
    /// first failure. `None` means the member may enter.
    pub async fn can_enter(
        &self,
        giveaway: &giveaway::Model,
        profile: &MemberProfile,
    ) -> Result<Option<EntryDenied>> {
        let entered = GiveawayEntry::find_by_id((giveaway.id, profile.user_id.clone()))
            .one(&self.db)
            .await?
            .is_some();
        if entered {
            return Ok(Some(EntryDenied::AlreadyEntered));
        }

        let tier = Tier::of(profile, &self.tiers);
        if giveaway.restrict_winners {
            // A recent win only ever blocks non-premium members. The bypass
            // flag just skips the lookup for premium holders.
            let skip_lookup = tier == Tier::Premium && self.settings.premium_bypass;
            if !skip_lookup
                && let Some(won_at) = self.recent_win(&profile.user_id).await?
                && tier != Tier::Premium
            {
                let elapsed_days = (chrono::Utc::now() - won_at).num_days();
                let days_left = (self.settings.winner_cooldown_days - elapsed_days).max(1);
                return Ok(Some(EntryDenied::WinnerCooldown { days_left }));
            }
        }

        if let Some(role_id) = &giveaway.required_role_id
            && !profile.role_ids.contains(role_id)
        {
            return Ok(Some(EntryDenied::MissingRole {
                role_id: role_id.clone(),
            }));
        }

        if let Some(required_days) = giveaway.min_account_age_days
            && profile.account_age_days(chrono::Utc::now()) < required_days
        {
            return Ok(Some(EntryDenied::AccountTooYoung { required_days }));
        }

        if let Some(required) = giveaway.min_level {
            let level = economy::get_user(&self.db, &giveaway.guild_id, &profile.user_id)
                .await?
                .map_or(0, |user| user.level);
            if level < required {
                return Ok(Some(EntryDenied::LevelTooLow { required }));
            }
        }

        Ok(None)
    }

    /// Enters a member into a giveaway.
    ///
    /// The eligibility check is a hint; the composite primary key on the
    /// entries table is the actual uniqueness guarantee, and a conflicting
    /// concurrent insert comes back as [`EntryDenied::AlreadyEntered`].
    pub async fn enter(
        &self,
        giveaway_id: i64,
        profile: &MemberProfile,
    ) -> Result<EnterOutcome> {
        let Some(giveaway) = Giveaway::find_by_id(giveaway_id).one(&self.db).await? else {
            return Ok(EnterOutcome::NotFound);
        };
        if giveaway.ended || giveaway.cancelled || chrono::Utc::now() >= giveaway.ends_at() {
            return Ok(EnterOutcome::AlreadyEnded);
        }
        if let Some(denied) = self.can_enter(&giveaway, profile).await? {
            return Ok(EnterOutcome::Denied(denied));
        }

        let weight = Tier::of(profile, &self.tiers).entry_weight();
        let entry = giveaway_entry::ActiveModel {
            giveaway_id: Set(giveaway_id),
            user_id: Set(profile.user_id.clone()),
            weight: Set(weight),
            entered_at: Set(chrono::Utc::now()),
        };
        if let Err(err) = GiveawayEntry::insert(entry).exec(&self.db).await {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return Ok(EnterOutcome::Denied(EntryDenied::AlreadyEntered));
            }
            return Err(err.into());
        }

        let entry_count = self.entry_count(giveaway_id).await?;
        Ok(EnterOutcome::Accepted {
            entry_count,
            weight,
        })
    }

    /// Ends a giveaway and draws winners with a fresh random source.
    ///
    /// `StdRng` rather than the thread RNG so the future stays `Send`; the
    /// auto-close timer runs this on a spawned task.
    pub async fn end(&self, giveaway_id: i64) -> Result<EndOutcome> {
        self.end_with_rng(giveaway_id, &mut StdRng::from_entropy())
            .await
    }

    /// Ends a giveaway with a caller-supplied random source.
    ///
    /// No-op when the giveaway is missing, cancelled, or already ended, so
    /// the explicit command and the auto-close timer can race safely.
    pub async fn end_with_rng<R: Rng>(
        &self,
        giveaway_id: i64,
        rng: &mut R,
    ) -> Result<EndOutcome> {
        let Some(giveaway) = Giveaway::find_by_id(giveaway_id).one(&self.db).await? else {
            return Ok(EndOutcome::Noop);
        };
        if giveaway.ended || giveaway.cancelled {
            return Ok(EndOutcome::Noop);
        }

        let entries = self.entries(giveaway_id).await?;
        if entries.is_empty() {
            let closed = self.persist_close(&giveaway, &[]).await?;
            self.forget(giveaway_id);
            info!(giveaway = giveaway_id, "giveaway ended with no entries");
            let _ = self.events.send(GiveawayEvent::NoWinners { giveaway: closed });
            return Ok(EndOutcome::NoEntries);
        }

        let winners = select_weighted_winners(&entries, giveaway.winner_count.max(1) as usize, rng);
        let winner_ids: Vec<String> = winners.into_iter().map(|entry| entry.user_id).collect();

        // Persist the ended state before recording wins so a storage
        // failure cannot leave win rows for a giveaway still marked open.
        let closed = self.persist_close(&giveaway, &winner_ids).await?;
        self.record_wins(giveaway_id, &winner_ids).await?;
        self.forget(giveaway_id);

        info!(
            giveaway = giveaway_id,
            winners = winner_ids.len(),
            "giveaway ended"
        );
        let _ = self.events.send(GiveawayEvent::Ended {
            giveaway: closed,
            winner_ids: winner_ids.clone(),
        });
        Ok(EndOutcome::Winners(winner_ids))
    }

    /// Redraws winners over the original entry pool.
    pub async fn reroll(
        &self,
        giveaway_id: i64,
        new_winner_count: Option<i32>,
    ) -> Result<RerollOutcome> {
        self.reroll_with_rng(giveaway_id, new_winner_count, &mut StdRng::from_entropy())
            .await
    }

    /// Reroll with a caller-supplied random source.
    ///
    /// Win rows from earlier draws are kept: the wins table is an audit
    /// trail, so a rerolled-out user still counts as a recent winner for
    /// the cooldown.
    pub async fn reroll_with_rng<R: Rng>(
        &self,
        giveaway_id: i64,
        new_winner_count: Option<i32>,
        rng: &mut R,
    ) -> Result<RerollOutcome> {
        let Some(giveaway) = Giveaway::find_by_id(giveaway_id).one(&self.db).await? else {
            return Ok(RerollOutcome::NotFound);
        };
        if giveaway.cancelled {
            return Ok(RerollOutcome::NotFound);
        }
        if !giveaway.ended {
            return Ok(RerollOutcome::NotEnded);
        }

        let entries = self.entries(giveaway_id).await?;
        if entries.is_empty() {
            return Ok(RerollOutcome::NoEntries);
        }

        let count = new_winner_count.unwrap_or(giveaway.winner_count).max(1) as usize;
        let winners = select_weighted_winners(&entries, count, rng);
        let winner_ids: Vec<String> = winners.into_iter().map(|entry| entry.user_id).collect();

        Giveaway::update_many()
            .col_expr(
                giveaway::Column::WinnerIds,
                Expr::value(encode_winners(&winner_ids)),
            )
            .filter(giveaway::Column::Id.eq(giveaway_id))
            .exec(&self.db)
            .await?;
        self.record_wins(giveaway_id, &winner_ids).await?;

        info!(
            giveaway = giveaway_id,
            winners = winner_ids.len(),
            "giveaway rerolled"
        );
        Ok(RerollOutcome::Winners(winner_ids))
    }

    /// Cancels an open giveaway. Terminal, and mutually exclusive with a
    /// normal end; no winners are ever drawn.
    pub async fn cancel(&self, giveaway_id: i64) -> Result<CancelOutcome> {
        let Some(giveaway) = Giveaway::find_by_id(giveaway_id).one(&self.db).await? else {
            return Ok(CancelOutcome::NotFound);
        };
        if giveaway.cancelled {
            return Ok(CancelOutcome::NotFound);
        }
        if giveaway.ended {
            return Ok(CancelOutcome::AlreadyEnded);
        }

        Giveaway::update_many()
            .col_expr(giveaway::Column::Cancelled, Expr::value(true))
            .filter(giveaway::Column::Id.eq(giveaway_id))
            .exec(&self.db)
            .await?;
        self.forget(giveaway_id);
        info!(giveaway = giveaway_id, "giveaway cancelled");
        Ok(CancelOutcome::Cancelled)
    }

    /// A user's win history, most recent first.
    pub async fn user_history(
        &self,
        user_id: &str,
        limit: u64,
    ) -> Result<Vec<giveaway_win::Model>> {
        GiveawayWin::find()
            .filter(giveaway_win::Column::UserId.eq(user_id))
            .order_by_desc(giveaway_win::Column::WonAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Giveaways in a guild, newest first, optionally including closed ones.
    pub async fn list_guild(
        &self,
        guild_id: &str,
        include_ended: bool,
        limit: u64,
    ) -> Result<Vec<giveaway::Model>> {
        let mut query = Giveaway::find()
            .filter(giveaway::Column::GuildId.eq(guild_id))
            .filter(giveaway::Column::Cancelled.eq(false));
        if !include_ended {
            query = query.filter(giveaway::Column::Ended.eq(false));
        }
        query
            .order_by_desc(giveaway::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn entries(&self, giveaway_id: i64) -> Result<Vec<giveaway_entry::Model>> {
        GiveawayEntry::find()
            .filter(giveaway_entry::Column::GiveawayId.eq(giveaway_id))
            .order_by_asc(giveaway_entry::Column::EnteredAt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Most recent win inside the cooldown window, if any.
    async fn recent_win(&self, user_id: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        let cutoff =
            chrono::Utc::now() - chrono::Duration::days(self.settings.winner_cooldown_days);
        let win = GiveawayWin::find()
            .filter(giveaway_win::Column::UserId.eq(user_id))
            .filter(giveaway_win::Column::WonAt.gt(cutoff))
            .order_by_desc(giveaway_win::Column::WonAt)
            .one(&self.db)
            .await?;
        Ok(win.map(|w| w.won_at))
    }

    async fn persist_close(
        &self,
        giveaway: &giveaway::Model,
        winner_ids: &[String],
    ) -> Result<giveaway::Model> {
        Giveaway::update_many()
            .col_expr(giveaway::Column::Ended, Expr::value(true))
            .col_expr(
                giveaway::Column::WinnerIds,
                Expr::value(encode_winners(winner_ids)),
            )
            .filter(giveaway::Column::Id.eq(giveaway.id))
            .exec(&self.db)
            .await?;

        let mut closed = giveaway.clone();
        closed.ended = true;
        closed.winner_ids = encode_winners(winner_ids);
        Ok(closed)
    }

    async fn record_wins(&self, giveaway_id: i64, winner_ids: &[String]) -> Result<()> {
        let now = chrono::Utc::now();
        for user_id in winner_ids {
            let win = giveaway_win::ActiveModel {
                user_id: Set(user_id.clone()),
                giveaway_id: Set(giveaway_id),
                won_at: Set(now),
                ..Default::default()
            };
            GiveawayWin::insert(win).exec(&self.db).await?;
        }
        Ok(())
    }

    fn forget(&self, giveaway_id: i64) {
        self.active.lock().unwrap().remove(&giveaway_id);
        self.timers.cancel(&giveaway_id);
    }
}

fn encode_winners(winner_ids: &[String]) -> String {
    serde_json::to_string(winner_ids).unwrap_or_else(|_| "[]".to_string())
}

/// Weighted sampling without replacement by linear scan.
///
/// Each draw picks a uniform value in `[0, total_weight)` and walks the
/// remaining pool subtracting weights until the remainder drops to or
/// below zero; the entry reached is removed before the next draw. Entry
/// counts are small here, so the linear scan is intentional.
#[must_use]
pub fn select_weighted_winners<R: Rng + ?Sized>(
    entries: &[giveaway_entry::Model],
    count: usize,
    rng: &mut R,
) -> Vec<giveaway_entry::Model> {
    let mut pool: Vec<giveaway_entry::Model> = entries.to_vec();
    let mut winners = Vec::with_capacity(count.min(pool.len()));

    while winners.len() < count && !pool.is_empty() {
        let total_weight: f64 = pool.iter().map(|entry| entry.weight).sum();
        let mut remainder = rng.r#gen::<f64>() * total_weight;
        let mut selected = pool.len() - 1;
        for (index, entry) in pool.iter().enumerate() {
            remainder -= entry.weight;
            if remainder <= 0.0 {
                selected = index;
                break;
            }
        }
        winners.push(pool.remove(selected));
    }

    winners
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{ConstRng, regular_profile, setup_test_db, test_giveaway};
    use std::collections::HashSet;

    async fn engine() -> Result<(
        Arc<GiveawayEngine>,
        mpsc::UnboundedReceiver<GiveawayEvent>,
    )> {
        let db = setup_test_db().await?;
        Ok(GiveawayEngine::new(
            db,
            TierSettings {
                premium_role_id: Some("premium".to_string()),
                booster_role_id: Some("booster".to_string()),
            },
            GiveawaySettings::default(),
        ))
    }

    fn entry(user_id: &str, weight: f64) -> giveaway_entry::Model {
        giveaway_entry::Model {
            giveaway_id: 1,
            user_id: user_id.to_string(),
            weight,
            entered_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn selection_returns_min_count_distinct_entries() {
        let entries: Vec<_> = (0..5).map(|i| entry(&format!("u{i}"), 1.0 + i as f64)).collect();
        let mut rng = rand::thread_rng();

        for k in [0, 1, 3, 5, 9] {
            let winners = select_weighted_winners(&entries, k, &mut rng);
            assert_eq!(winners.len(), k.min(entries.len()));
            let distinct: HashSet<_> = winners.iter().map(|w| w.user_id.clone()).collect();
            assert_eq!(distinct.len(), winners.len());
        }
    }

    #[test]
    fn zero_draw_always_picks_first_remaining_entry() {
        let entries = vec![entry("a", 1.0), entry("b", 2.0), entry("c", 3.0)];
        let mut rng = ConstRng::zero();

        let winners = select_weighted_winners(&entries, 3, &mut rng);
        let ids: Vec<_> = winners.iter().map(|w| w.user_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn midpoint_draw_picks_second_of_three_equal_entries() {
        let entries = vec![entry("a", 1.0), entry("b", 1.0), entry("c", 1.0)];
        // Draw lands at 1.5 of a total weight of 3
        let winners = select_weighted_winners(&entries, 1, &mut ConstRng::half());
        assert_eq!(winners[0].user_id, "b");
    }

    #[tokio::test]
    async fn create_and_enter() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 60)).await?;

        let outcome = engine.enter(giveaway.id, &regular_profile("alice")).await?;
        assert_eq!(
            outcome,
            EnterOutcome::Accepted {
                entry_count: 1,
                weight: 1.0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn double_enter_is_rejected_and_count_is_stable() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 60)).await?;
        let alice = regular_profile("alice");

        engine.enter(giveaway.id, &alice).await?;
        let second = engine.enter(giveaway.id, &alice).await?;
        assert_eq!(second, EnterOutcome::Denied(EntryDenied::AlreadyEntered));
        assert_eq!(engine.entry_count(giveaway.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn enter_unknown_giveaway_is_not_found() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let outcome = engine.enter(999, &regular_profile("alice")).await?;
        assert_eq!(outcome, EnterOutcome::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn enter_after_deadline_is_already_ended() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 0)).await?;

        let outcome = engine.enter(giveaway.id, &regular_profile("alice")).await?;
        assert_eq!(outcome, EnterOutcome::AlreadyEnded);
        Ok(())
    }

    #[tokio::test]
    async fn booster_and_premium_weights_apply() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 60)).await?;

        let mut booster = regular_profile("bob");
        booster.role_ids.insert("booster".to_string());
        let mut premium = regular_profile("carol");
        premium.role_ids.insert("premium".to_string());
        premium.role_ids.insert("booster".to_string());

        match engine.enter(giveaway.id, &booster).await? {
            EnterOutcome::Accepted { weight, .. } => assert_eq!(weight, 2.0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match engine.enter(giveaway.id, &premium).await? {
            EnterOutcome::Accepted { weight, .. } => assert_eq!(weight, 3.0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn end_with_zero_entries_is_idempotent() -> Result<()> {
        let (engine, mut rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 1)).await?;

        assert_eq!(engine.end(giveaway.id).await?, EndOutcome::NoEntries);
        let stored = engine.get(giveaway.id).await?.unwrap();
        assert!(stored.ended);
        assert!(stored.winners().is_empty());
        assert!(matches!(
            rx.try_recv(),
            Ok(GiveawayEvent::NoWinners { .. })
        ));

        // Second end is a no-op; state unchanged, no second event
        assert_eq!(engine.end(giveaway.id).await?, EndOutcome::Noop);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn end_to_end_midpoint_draw_selects_second_entrant() -> Result<()> {
        let (engine, mut rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 60)).await?;

        for name in ["alice", "bob", "carol"] {
            engine.enter(giveaway.id, &regular_profile(name)).await?;
        }

        let outcome = engine
            .end_with_rng(giveaway.id, &mut ConstRng::half())
            .await?;
        assert_eq!(outcome, EndOutcome::Winners(vec!["bob".to_string()]));

        match rx.try_recv().unwrap() {
            GiveawayEvent::Ended { winner_ids, .. } => {
                assert_eq!(winner_ids, vec!["bob".to_string()]);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(engine.end(giveaway.id).await?, EndOutcome::Noop);
        Ok(())
    }

    #[tokio::test]
    async fn reroll_preconditions_and_redraw() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 2, 60)).await?;

        assert_eq!(engine.reroll(999, None).await?, RerollOutcome::NotFound);
        assert_eq!(
            engine.reroll(giveaway.id, None).await?,
            RerollOutcome::NotEnded
        );

        for name in ["alice", "bob", "carol"] {
            engine.enter(giveaway.id, &regular_profile(name)).await?;
        }
        engine.end(giveaway.id).await?;

        match engine.reroll(giveaway.id, Some(3)).await? {
            RerollOutcome::Winners(ids) => assert_eq!(ids.len(), 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn reroll_on_zero_entry_giveaway_fails() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 1)).await?;
        engine.end(giveaway.id).await?;

        assert_eq!(
            engine.reroll(giveaway.id, None).await?,
            RerollOutcome::NoEntries
        );
        Ok(())
    }

    #[tokio::test]
    async fn reroll_keeps_prior_win_records() -> Result<()> {
        // Documented property: rerolling is additive, the original winner's
        // win row survives and still trips the cooldown.
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 60)).await?;
        engine.enter(giveaway.id, &regular_profile("alice")).await?;
        engine.enter(giveaway.id, &regular_profile("bob")).await?;

        engine.end_with_rng(giveaway.id, &mut ConstRng::zero()).await?;
        engine
            .reroll_with_rng(giveaway.id, None, &mut ConstRng::half())
            .await?;

        let alice_wins = engine.user_history("alice", 10).await?;
        assert_eq!(alice_wins.len(), 1, "original win row must survive reroll");
        Ok(())
    }

    #[tokio::test]
    async fn winner_cooldown_blocks_and_premium_bypasses() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let first = engine.create(test_giveaway("g1", 1, 60)).await?;
        engine.enter(first.id, &regular_profile("alice")).await?;
        engine
            .end_with_rng(first.id, &mut ConstRng::zero())
            .await?;

        let second = engine.create(test_giveaway("g1", 1, 60)).await?;
        let outcome = engine.enter(second.id, &regular_profile("alice")).await?;
        assert!(matches!(
            outcome,
            EnterOutcome::Denied(EntryDenied::WinnerCooldown { days_left }) if days_left >= 1
        ));

        // An unrestricted giveaway ignores the cooldown entirely
        let mut open_req = test_giveaway("g1", 1, 60);
        open_req.restrict_winners = false;
        let open = engine.create(open_req).await?;
        assert!(matches!(
            engine.enter(open.id, &regular_profile("alice")).await?,
            EnterOutcome::Accepted { .. }
        ));

        // Premium holders skip the cooldown when bypass is enabled
        let third = engine.create(test_giveaway("g1", 1, 60)).await?;
        engine.enter(third.id, &regular_profile("dave")).await?;
        engine.end_with_rng(third.id, &mut ConstRng::zero()).await?;
        let fourth = engine.create(test_giveaway("g1", 1, 60)).await?;
        let mut dave = regular_profile("dave");
        dave.role_ids.insert("premium".to_string());
        assert!(matches!(
            engine.enter(fourth.id, &dave).await?,
            EnterOutcome::Accepted { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn premium_holder_is_never_cooldown_blocked() -> Result<()> {
        // Even with the bypass flag off, a recent win only blocks
        // non-premium members.
        let db = setup_test_db().await?;
        let (engine, _rx) = GiveawayEngine::new(
            db,
            TierSettings {
                premium_role_id: Some("premium".to_string()),
                booster_role_id: None,
            },
            GiveawaySettings {
                premium_bypass: false,
                ..GiveawaySettings::default()
            },
        );
        let mut dave = regular_profile("dave");
        dave.role_ids.insert("premium".to_string());

        let first = engine.create(test_giveaway("g1", 1, 60)).await?;
        engine.enter(first.id, &dave).await?;
        engine.end_with_rng(first.id, &mut ConstRng::zero()).await?;

        let second = engine.create(test_giveaway("g1", 1, 60)).await?;
        assert!(matches!(
            engine.enter(second.id, &dave).await?,
            EnterOutcome::Accepted { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn requirement_checks_deny_in_order() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let mut req = test_giveaway("g1", 1, 60);
        req.required_role_id = Some("vip".to_string());
        req.min_account_age_days = Some(30);
        let giveaway = engine.create(req).await?;

        // Missing role is reported first
        let mut young = regular_profile("alice");
        young.account_created_at = chrono::Utc::now() - chrono::Duration::days(3);
        assert_eq!(
            engine.enter(giveaway.id, &young).await?,
            EnterOutcome::Denied(EntryDenied::MissingRole {
                role_id: "vip".to_string()
            })
        );

        // With the role, account age is checked next
        young.role_ids.insert("vip".to_string());
        assert_eq!(
            engine.enter(giveaway.id, &young).await?,
            EnterOutcome::Denied(EntryDenied::AccountTooYoung { required_days: 30 })
        );
        Ok(())
    }

    #[tokio::test]
    async fn min_level_requirement_is_enforced() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let mut req = test_giveaway("g1", 1, 60);
        req.min_level = Some(5);
        let giveaway = engine.create(req).await?;

        assert_eq!(
            engine.enter(giveaway.id, &regular_profile("alice")).await?,
            EnterOutcome::Denied(EntryDenied::LevelTooLow { required: 5 })
        );
        Ok(())
    }

    #[tokio::test]
    async fn cancel_is_terminal_and_distinct_from_end() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let giveaway = engine.create(test_giveaway("g1", 1, 60)).await?;

        assert_eq!(engine.cancel(999).await?, CancelOutcome::NotFound);
        assert_eq!(engine.cancel(giveaway.id).await?, CancelOutcome::Cancelled);
        // A cancelled giveaway is gone as far as further commands go
        assert_eq!(engine.cancel(giveaway.id).await?, CancelOutcome::NotFound);
        assert_eq!(engine.end(giveaway.id).await?, EndOutcome::Noop);
        assert_eq!(
            engine.reroll(giveaway.id, None).await?,
            RerollOutcome::NotFound
        );

        let ended = engine.create(test_giveaway("g1", 1, 1)).await?;
        engine.end(ended.id).await?;
        assert_eq!(engine.cancel(ended.id).await?, CancelOutcome::AlreadyEnded);
        Ok(())
    }

    #[tokio::test]
    async fn list_guild_filters_by_guild_and_state() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let open = engine.create(test_giveaway("g1", 1, 60)).await?;
        let ended = engine.create(test_giveaway("g1", 1, 1)).await?;
        engine.end(ended.id).await?;
        let cancelled = engine.create(test_giveaway("g1", 1, 60)).await?;
        engine.cancel(cancelled.id).await?;
        engine.create(test_giveaway("g2", 1, 60)).await?;

        let open_only = engine.list_guild("g1", false, 10).await?;
        let ids: Vec<i64> = open_only.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![open.id]);

        // Including ended rows still never surfaces cancelled ones
        let with_ended = engine.list_guild("g1", true, 10).await?;
        let ids: HashSet<i64> = with_ended.iter().map(|g| g.id).collect();
        assert!(ids.contains(&open.id));
        assert!(ids.contains(&ended.id));
        assert!(!ids.contains(&cancelled.id));
        Ok(())
    }

    #[tokio::test]
    async fn load_active_restores_open_giveaways() -> Result<()> {
        let (engine, _rx) = engine().await?;
        let open = engine.create(test_giveaway("g1", 1, 60)).await?;
        let closed = engine.create(test_giveaway("g1", 1, 1)).await?;
        engine.end(closed.id).await?;

        // Fresh engine over the same database, as after a restart
        let (restarted, _rx2) = GiveawayEngine::new(
            engine.db.clone(),
            TierSettings::default(),
            GiveawaySettings::default(),
        );
        assert_eq!(restarted.load_active().await?, 1);
        assert!(restarted.active.lock().unwrap().contains_key(&open.id));
        Ok(())
    }
}
