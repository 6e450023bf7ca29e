//! Coin-drop engine - randomized scheduling, collection resolution, and
//! expiry.
//!
//! One shared scheduler covers every registered channel across all guilds.
//! A single async mutex owns the channel registry, the active-drop map,
//! and the scheduler handle, so registry mutations and start/stop
//! decisions never race. Drops live only in memory; aggregate statistics
//! are the only thing that outlives them.

use crate::{
    config::{DropSettings, TierSettings},
    core::economy,
    core::tier::{MemberProfile, Tier},
    core::timer::TimerMap,
    entities::{
        DropChannel, GuildDropStats, UserDropStats, drop_channel, guild_drop_stats,
        user_drop_stats,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How many collectors a `quick` drop pays the bonus to before closing.
pub const QUICK_COLLECTOR_LIMIT: usize = 3;
/// Bonus factor for `quick` collections under the limit.
pub const QUICK_BONUS: f64 = 2.0;
/// Bonus factor for winning `lucky` collections.
pub const LUCKY_BONUS: f64 = 1.5;
/// Independent chance each `lucky` collector has of the bonus.
pub const LUCKY_CHANCE: f64 = 0.3;

/// Reward tier of a drop, fixed at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rarity {
    /// 90% of drops, no multiplier
    Common,
    /// 5% band, 3x
    Rare,
    /// 4% band, 5x
    Epic,
    /// 1% band, 10x
    Legendary,
}

impl Rarity {
    /// Resolves a single uniform draw in `[0, 1)` against cumulative
    /// disjoint bands: legendary below 0.01, epic below 0.05, rare below
    /// 0.10, common otherwise. One draw decides the tier; the bands are
    /// not independent rolls.
    #[must_use]
    pub fn from_draw(draw: f64) -> Self {
        if draw < 0.01 {
            Self::Legendary
        } else if draw < 0.05 {
            Self::Epic
        } else if draw < 0.10 {
            Self::Rare
        } else {
            Self::Common
        }
    }

    /// Amount multiplier for the tier.
    #[must_use]
    pub const fn multiplier(self) -> i64 {
        match self {
            Self::Common => 1,
            Self::Rare => 3,
            Self::Epic => 5,
            Self::Legendary => 10,
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

/// Per-drop collection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMethod {
    /// No bonus
    Normal,
    /// 2x for the first three collectors, then the drop closes
    Quick,
    /// 1.5x at an independent 30% chance per collector
    Lucky,
}

impl CollectMethod {
    /// Lowercase display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Quick => "quick",
            Self::Lucky => "lucky",
        }
    }
}

/// Method bonus for one collection attempt. `prior_collectors` is how many
/// collected before this attempt; `lucky_draw` is a fresh uniform draw in
/// `[0, 1)` consumed only by the `lucky` method.
#[must_use]
pub fn resolve_method_bonus(
    method: CollectMethod,
    prior_collectors: usize,
    lucky_draw: f64,
) -> f64 {
    match method {
        CollectMethod::Normal => 1.0,
        CollectMethod::Quick => {
            if prior_collectors < QUICK_COLLECTOR_LIMIT {
                QUICK_BONUS
            } else {
                1.0
            }
        }
        CollectMethod::Lucky => {
            if lucky_draw < LUCKY_CHANCE {
                LUCKY_BONUS
            } else {
                1.0
            }
        }
    }
}

/// The rolled parameters of a drop before it opens.
#[derive(Debug, Clone, Copy)]
pub struct GeneratedDrop {
    /// Reward amount, rarity multiplier already applied
    pub amount: i64,
    /// Rolled rarity tier
    pub rarity: Rarity,
    /// Rolled collection method
    pub method: CollectMethod,
}

/// Rolls a drop: base amount uniform in the configured range, rarity from
/// one cumulative-band draw, method uniform over the three strategies.
#[must_use]
pub fn generate_drop<R: Rng>(settings: &DropSettings, rng: &mut R) -> GeneratedDrop {
    let base = rng.gen_range(settings.min_amount..=settings.max_amount);
    let rarity = Rarity::from_draw(rng.r#gen::<f64>());
    let method = match rng.gen_range(0..3) {
        0 => CollectMethod::Normal,
        1 => CollectMethod::Quick,
        _ => CollectMethod::Lucky,
    };
    GeneratedDrop {
        amount: base * rarity.multiplier(),
        rarity,
        method,
    }
}

/// One successful collection within a drop.
#[derive(Debug, Clone)]
pub struct Collector {
    /// Who collected
    pub user_id: String,
    /// What they were paid after all bonuses
    pub amount: i64,
}

/// An open drop, keyed by channel in the active map.
#[derive(Debug, Clone)]
pub struct ActiveDrop {
    /// Guild the drop belongs to
    pub guild_id: String,
    /// Channel the drop is open in
    pub channel_id: String,
    /// Reward amount after the rarity multiplier
    pub amount: i64,
    /// Rarity tier
    pub rarity: Rarity,
    /// Collection method
    pub method: CollectMethod,
    /// Announcement message, set once posted
    pub message_id: Option<String>,
    /// When the drop opened; pairs with the channel as a correlation id
    pub created_at: DateTime<Utc>,
    /// Everyone who collected so far, at most once each
    pub collectors: Vec<Collector>,
}

/// Announcements the bot layer renders into Discord messages.
#[derive(Debug)]
pub enum DropEvent {
    /// A drop opened in a channel
    Opened {
        /// Guild of the channel
        guild_id: String,
        /// Channel the drop is collectable in
        channel_id: String,
        /// Reward amount after the rarity multiplier
        amount: i64,
        /// Rarity tier
        rarity: Rarity,
        /// Collection method
        method: CollectMethod,
    },
    /// A drop closed, by timeout or by the quick cap
    Expired {
        /// Guild of the channel
        guild_id: String,
        /// Channel the drop was open in
        channel_id: String,
        /// How many members collected
        collectors: usize,
        /// Total coins paid out
        total_paid: i64,
    },
}

/// Result of a collection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Paid out
    Collected {
        /// Final amount after method and tier bonuses
        amount: i64,
        /// Rarity of the drop collected from
        rarity: Rarity,
    },
    /// No open drop on this channel (never opened, or already expired)
    NothingToCollect,
    /// The user already collected from this drop
    AlreadyCollected,
}

#[derive(Default)]
struct DropState {
    /// guild id -> registered channel ids
    channels: HashMap<String, HashSet<String>>,
    /// channel id -> open drop
    active: HashMap<String, ActiveDrop>,
    scheduler: Option<JoinHandle<()>>,
}

impl DropState {
    fn total_channels(&self) -> usize {
        self.channels.values().map(HashSet::len).sum()
    }
}

/// The coin-drop engine.
pub struct DropEngine {
    db: DatabaseConnection,
    tiers: TierSettings,
    settings: DropSettings,
    state: Mutex<DropState>,
    expiry: TimerMap<String>,
    events: mpsc::UnboundedSender<DropEvent>,
}

impl DropEngine {
    /// Creates the engine and the event receiver the bot layer drains.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        tiers: TierSettings,
        settings: DropSettings,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<DropEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            db,
            tiers,
            settings,
            state: Mutex::new(DropState::default()),
            expiry: TimerMap::new(),
            events,
        });
        (engine, rx)
    }

    /// Restores the channel registry from storage at startup and starts
    /// the scheduler if any channels are registered.
    pub async fn load_channels(self: &Arc<Self>) -> Result<usize> {
        let rows = DropChannel::find().all(&self.db).await?;
        let count = rows.len();

        let mut state = self.state.lock().await;
        for row in rows {
            state
                .channels
                .entry(row.guild_id)
                .or_default()
                .insert(row.channel_id);
        }
        if state.total_channels() > 0 {
            self.start_scheduler(&mut state);
        }
        info!(count, "loaded drop channel registrations");
        Ok(count)
    }

    /// Registers a channel as a drop target. Returns false when it was
    /// already registered. The first registration overall starts the
    /// scheduler.
    pub async fn register_channel(
        self: &Arc<Self>,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<bool> {
        let row = drop_channel::ActiveModel {
            guild_id: Set(guild_id.to_string()),
            channel_id: Set(channel_id.to_string()),
        };
        DropChannel::insert(row)
            .on_conflict(
                OnConflict::columns([
                    drop_channel::Column::GuildId,
                    drop_channel::Column::ChannelId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await?;

        let mut state = self.state.lock().await;
        let added = state
            .channels
            .entry(guild_id.to_string())
            .or_default()
            .insert(channel_id.to_string());
        if added {
            info!(guild = guild_id, channel = channel_id, "drop channel registered");
        }
        if state.scheduler.is_none() {
            self.start_scheduler(&mut state);
        }
        Ok(added)
    }

    /// Deregisters a channel. Removing the last channel overall halts the
    /// scheduler until something is registered again.
    pub async fn deregister_channel(&self, guild_id: &str, channel_id: &str) -> Result<bool> {
        DropChannel::delete_by_id((guild_id.to_string(), channel_id.to_string()))
            .exec(&self.db)
            .await?;

        let mut state = self.state.lock().await;
        let removed = state
            .channels
            .get_mut(guild_id)
            .is_some_and(|set| set.remove(channel_id));
        if state.channels.get(guild_id).is_some_and(HashSet::is_empty) {
            state.channels.remove(guild_id);
        }
        if removed {
            info!(guild = guild_id, channel = channel_id, "drop channel removed");
        }
        if state.total_channels() == 0
            && let Some(handle) = state.scheduler.take()
        {
            handle.abort();
            info!("last drop channel removed, scheduler halted");
        }
        Ok(removed)
    }

    /// Drops a channel that turned out to be unusable (deleted on the
    /// platform side): deregisters it and discards any open drop there
    /// without paying anyone. The skipped cycle is not replaced.
    pub async fn invalidate_channel(&self, guild_id: &str, channel_id: &str) -> Result<()> {
        warn!(guild = guild_id, channel = channel_id, "invalidating dead drop channel");
        self.deregister_channel(guild_id, channel_id).await?;
        self.expiry.cancel(&channel_id.to_string());
        self.state.lock().await.active.remove(channel_id);
        Ok(())
    }

    /// Whether the scheduler task is currently running.
    pub async fn scheduler_running(&self) -> bool {
        self.state.lock().await.scheduler.is_some()
    }

    /// Opens a drop with the given parameters in a channel and arms its
    /// expiry timer. The scheduler calls this with freshly rolled
    /// parameters; tests inject their own.
    pub async fn open_drop(
        self: &Arc<Self>,
        guild_id: &str,
        channel_id: &str,
        generated: GeneratedDrop,
    ) -> Result<()> {
        let created_at = Utc::now();
        let drop = ActiveDrop {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            amount: generated.amount,
            rarity: generated.rarity,
            method: generated.method,
            message_id: None,
            created_at,
            collectors: Vec::new(),
        };

        {
            let mut state = self.state.lock().await;
            state.active.insert(channel_id.to_string(), drop);
        }

        self.bump_guild_drop_count(guild_id).await?;

        let engine = Arc::clone(self);
        let channel = channel_id.to_string();
        let key = channel.clone();
        self.expiry.schedule(
            key,
            Duration::from_secs(self.settings.collect_window_secs),
            async move {
                if let Err(err) = engine.expire(&channel, created_at).await {
                    error!(channel = %channel, "drop expiry failed: {err}");
                }
            },
        );

        info!(
            guild = guild_id,
            channel = channel_id,
            amount = generated.amount,
            rarity = generated.rarity.label(),
            method = generated.method.label(),
            "drop opened"
        );
        let _ = self.events.send(DropEvent::Opened {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            amount: generated.amount,
            rarity: generated.rarity,
            method: generated.method,
        });
        Ok(())
    }

    /// Records the announcement message for an open drop.
    pub async fn set_drop_message(&self, channel_id: &str, message_id: &str) {
        if let Some(drop) = self.state.lock().await.active.get_mut(channel_id) {
            drop.message_id = Some(message_id.to_string());
        }
    }

    /// Resolves one collection attempt.
    ///
    /// Bonus composition is multiplicative: the method bonus first, then
    /// the collector's tier multiplier. Reaching the quick cap closes the
    /// drop immediately instead of waiting for the timeout.
    pub async fn collect(
        &self,
        channel_id: &str,
        profile: &MemberProfile,
    ) -> Result<CollectOutcome> {
        let lucky_draw = { rand::thread_rng().r#gen::<f64>() };
        self.collect_with_draw(channel_id, profile, lucky_draw).await
    }

    /// Collection with a caller-supplied lucky draw, for deterministic
    /// tests.
    pub async fn collect_with_draw(
        &self,
        channel_id: &str,
        profile: &MemberProfile,
        lucky_draw: f64,
    ) -> Result<CollectOutcome> {
        let (guild_id, amount, rarity, created_at, reached_cap) = {
            let mut state = self.state.lock().await;
            let Some(drop) = state.active.get_mut(channel_id) else {
                return Ok(CollectOutcome::NothingToCollect);
            };
            if drop
                .collectors
                .iter()
                .any(|collector| collector.user_id == profile.user_id)
            {
                return Ok(CollectOutcome::AlreadyCollected);
            }

            let method_bonus =
                resolve_method_bonus(drop.method, drop.collectors.len(), lucky_draw);
            let tier_bonus = Tier::of(profile, &self.tiers).reward_multiplier();
            let amount = (drop.amount as f64 * method_bonus * tier_bonus).floor() as i64;

            drop.collectors.push(Collector {
                user_id: profile.user_id.clone(),
                amount,
            });
            let reached_cap = drop.method == CollectMethod::Quick
                && drop.collectors.len() >= QUICK_COLLECTOR_LIMIT;
            (
                drop.guild_id.clone(),
                amount,
                drop.rarity,
                drop.created_at,
                reached_cap,
            )
        };

        if let Err(err) =
            economy::credit(&self.db, &guild_id, &profile.user_id, amount, "coin drop").await
        {
            // The member was not paid; undo the in-memory record so a retry
            // is not turned away as AlreadyCollected and the expiry totals
            // stay honest.
            let mut state = self.state.lock().await;
            if let Some(drop) = state.active.get_mut(channel_id)
                && drop.created_at == created_at
            {
                drop.collectors
                    .retain(|collector| collector.user_id != profile.user_id);
            }
            return Err(err);
        }
        self.bump_user_stats(&guild_id, &profile.user_id, amount, rarity)
            .await?;
        self.bump_guild_collected(&guild_id, amount).await?;

        if reached_cap {
            self.expiry.cancel(&channel_id.to_string());
            self.expire(channel_id, created_at).await?;
        }

        Ok(CollectOutcome::Collected { amount, rarity })
    }

    /// Finalizes a drop: removes it from the active map and reports the
    /// totals. Safe to call twice; the second call finds nothing. The
    /// `created_at` correlation id stops a stale timer from expiring a
    /// newer drop on the same channel.
    pub async fn expire(&self, channel_id: &str, created_at: DateTime<Utc>) -> Result<()> {
        let removed = {
            let mut state = self.state.lock().await;
            let same_drop = state
                .active
                .get(channel_id)
                .is_some_and(|drop| drop.created_at == created_at);
            if same_drop {
                state.active.remove(channel_id)
            } else {
                None
            }
        };

        if let Some(drop) = removed {
            let total_paid: i64 = drop.collectors.iter().map(|collector| collector.amount).sum();
            info!(
                channel = channel_id,
                collectors = drop.collectors.len(),
                total_paid,
                "drop closed"
            );
            let _ = self.events.send(DropEvent::Expired {
                guild_id: drop.guild_id,
                channel_id: drop.channel_id,
                collectors: drop.collectors.len(),
                total_paid,
            });
        }
        Ok(())
    }

    /// Per-user aggregate stats, if the user ever collected.
    pub async fn user_stats(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<user_drop_stats::Model>> {
        UserDropStats::find_by_id((guild_id.to_string(), user_id.to_string()))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    fn start_scheduler(self: &Arc<Self>, state: &mut DropState) {
        let engine = Arc::clone(self);
        info!("drop scheduler started");
        state.scheduler = Some(tokio::spawn(async move {
            engine.run_scheduler().await;
        }));
    }

    async fn run_scheduler(self: Arc<Self>) {
        loop {
            let wait_minutes = {
                let mut rng = rand::thread_rng();
                rng.gen_range(self.settings.min_interval_minutes..=self.settings.max_interval_minutes)
            };
            tokio::time::sleep(Duration::from_secs(wait_minutes * 60)).await;

            let target = {
                let state = self.state.lock().await;
                let all: Vec<(String, String)> = state
                    .channels
                    .iter()
                    .flat_map(|(guild, channels)| {
                        channels
                            .iter()
                            .map(move |channel| (guild.clone(), channel.clone()))
                    })
                    .collect();
                if all.is_empty() {
                    None
                } else {
                    let index = rand::thread_rng().gen_range(0..all.len());
                    Some(all[index].clone())
                }
            };

            let Some((guild_id, channel_id)) = target else {
                // Deregistration normally aborts this task first; this is
                // the fallback if the registry drained under us.
                self.state.lock().await.scheduler = None;
                info!("no drop channels registered, scheduler halting");
                return;
            };

            let generated = {
                let mut rng = rand::thread_rng();
                generate_drop(&self.settings, &mut rng)
            };
            if let Err(err) = self.open_drop(&guild_id, &channel_id, generated).await {
                error!(channel = %channel_id, "failed to open drop: {err}");
            }
        }
    }

    async fn bump_user_stats(
        &self,
        guild_id: &str,
        user_id: &str,
        amount: i64,
        rarity: Rarity,
    ) -> Result<()> {
        let row = user_drop_stats::ActiveModel {
            guild_id: Set(guild_id.to_string()),
            user_id: Set(user_id.to_string()),
            total_collected: Set(0),
            common_count: Set(0),
            rare_count: Set(0),
            epic_count: Set(0),
            legendary_count: Set(0),
        };
        UserDropStats::insert(row)
            .on_conflict(
                OnConflict::columns([
                    user_drop_stats::Column::GuildId,
                    user_drop_stats::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await?;

        let rarity_column = match rarity {
            Rarity::Common => user_drop_stats::Column::CommonCount,
            Rarity::Rare => user_drop_stats::Column::RareCount,
            Rarity::Epic => user_drop_stats::Column::EpicCount,
            Rarity::Legendary => user_drop_stats::Column::LegendaryCount,
        };
        UserDropStats::update_many()
            .col_expr(
                user_drop_stats::Column::TotalCollected,
                Expr::col(user_drop_stats::Column::TotalCollected).add(amount),
            )
            .col_expr(rarity_column, Expr::col(rarity_column).add(1))
            .filter(user_drop_stats::Column::GuildId.eq(guild_id))
            .filter(user_drop_stats::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn bump_guild_collected(&self, guild_id: &str, amount: i64) -> Result<()> {
        self.ensure_guild_stats(guild_id).await?;
        GuildDropStats::update_many()
            .col_expr(
                guild_drop_stats::Column::TotalCollected,
                Expr::col(guild_drop_stats::Column::TotalCollected).add(amount),
            )
            .filter(guild_drop_stats::Column::GuildId.eq(guild_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn bump_guild_drop_count(&self, guild_id: &str) -> Result<()> {
        self.ensure_guild_stats(guild_id).await?;
        GuildDropStats::update_many()
            .col_expr(
                guild_drop_stats::Column::DropCount,
                Expr::col(guild_drop_stats::Column::DropCount).add(1),
            )
            .filter(guild_drop_stats::Column::GuildId.eq(guild_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn ensure_guild_stats(&self, guild_id: &str) -> Result<()> {
        let row = guild_drop_stats::ActiveModel {
            guild_id: Set(guild_id.to_string()),
            total_collected: Set(0),
            drop_count: Set(0),
        };
        GuildDropStats::insert(row)
            .on_conflict(
                OnConflict::column(guild_drop_stats::Column::GuildId)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
