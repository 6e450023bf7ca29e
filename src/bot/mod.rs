//! Bot layer - Discord-specific interface and command handlers.
//!
//! Translates platform events into engine calls and engine outcomes into
//! rendered messages. Permission gating happens here, before any engine
//! call; the engines never see Discord types.

/// Discord command implementations organized by category
pub mod commands;

use crate::config::AppSettings;
use crate::core::drop::{DropEngine, DropEvent};
use crate::core::giveaway::{GiveawayEngine, GiveawayEvent};
use crate::core::leveling::LevelTracker;
use crate::core::tier::MemberProfile;
use crate::errors::{Error, Result};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Giveaway lifecycle engine
    pub giveaways: Arc<GiveawayEngine>,
    /// Coin-drop engine
    pub drops: Arc<DropEngine>,
    /// Message-XP tracker
    pub leveler: LevelTracker,
    /// Loaded application settings
    pub settings: Arc<AppSettings>,
}

/// Command context alias used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Distills the invoking member into the capability struct the engines
/// consume.
pub async fn member_profile(ctx: &Context<'_>) -> MemberProfile {
    let role_ids: HashSet<String> = match ctx.author_member().await {
        Some(member) => member.roles.iter().map(ToString::to_string).collect(),
        None => HashSet::new(),
    };
    let created = ctx.author().created_at();
    let account_created_at =
        chrono::DateTime::from_timestamp(created.unix_timestamp(), 0).unwrap_or_default();
    MemberProfile {
        user_id: ctx.author().id.to_string(),
        role_ids,
        account_created_at,
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            panic!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say("Something went wrong running that command.").await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    if let serenity::FullEvent::Message { new_message } = event {
        if new_message.author.bot {
            return Ok(());
        }
        let Some(guild_id) = new_message.guild_id else {
            return Ok(());
        };

        let level_up = data
            .leveler
            .award_message_xp(
                &data.database,
                &guild_id.to_string(),
                &new_message.author.id.to_string(),
            )
            .await?;
        if let Some(level_up) = level_up {
            let text = format!(
                "🎉 <@{}> reached level **{}**!",
                new_message.author.id, level_up.new_level
            );
            if let Err(e) = new_message.channel_id.say(&ctx.http, text).await {
                error!("Failed to send level-up message: {e}");
            }
        }
    }
    Ok(())
}

/// Forwards giveaway engine events into the giveaway's channel. Runs for
/// the life of the process; timer-driven closes announce through here.
async fn forward_giveaway_events(
    http: Arc<serenity::Http>,
    mut events: mpsc::UnboundedReceiver<GiveawayEvent>,
) {
    while let Some(event) = events.recv().await {
        let (channel_id, text) = match event {
            GiveawayEvent::Ended {
                giveaway,
                winner_ids,
            } => {
                let mentions: Vec<String> =
                    winner_ids.iter().map(|id| format!("<@{id}>")).collect();
                (
                    giveaway.channel_id.clone(),
                    format!(
                        "🎉 The **{}** giveaway has ended! Congratulations to {} - you won **{}**!",
                        giveaway.title,
                        mentions.join(", "),
                        giveaway.prize
                    ),
                )
            }
            GiveawayEvent::NoWinners { giveaway } => (
                giveaway.channel_id.clone(),
                format!(
                    "The **{}** giveaway has ended with no entries, so no one won.",
                    giveaway.title
                ),
            ),
        };

        let Ok(id) = channel_id.parse::<u64>() else {
            error!(channel = %channel_id, "giveaway announcement channel id did not parse");
            continue;
        };
        if let Err(e) = serenity::ChannelId::new(id).say(&http, text).await {
            error!(channel = %channel_id, "failed to post giveaway announcement: {e}");
        }
    }
}

/// Forwards drop engine events into their channels. A channel that cannot
/// be posted to is treated as dead and invalidated, skipping the cycle.
async fn forward_drop_events(
    http: Arc<serenity::Http>,
    drops: Arc<DropEngine>,
    mut events: mpsc::UnboundedReceiver<DropEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            DropEvent::Opened {
                guild_id,
                channel_id,
                amount,
                rarity,
                method,
            } => {
                let hint = match method {
                    crate::core::drop::CollectMethod::Normal => String::new(),
                    crate::core::drop::CollectMethod::Quick => {
                        " The first 3 collectors get double!".to_string()
                    }
                    crate::core::drop::CollectMethod::Lucky => {
                        " Lucky collectors get a 1.5x bonus!".to_string()
                    }
                };
                let text = format!(
                    "💰 A **{}** coin drop of **{amount}** coins appeared! Use `/collect` to grab it.{hint}",
                    rarity.label()
                );
                let Ok(id) = channel_id.parse::<u64>() else {
                    error!(channel = %channel_id, "drop channel id did not parse");
                    continue;
                };
                match serenity::ChannelId::new(id).say(&http, text).await {
                    Ok(message) => {
                        drops
                            .set_drop_message(&channel_id, &message.id.to_string())
                            .await;
                    }
                    Err(e) => {
                        error!(channel = %channel_id, "failed to post drop, invalidating channel: {e}");
                        if let Err(err) = drops.invalidate_channel(&guild_id, &channel_id).await {
                            error!("failed to invalidate drop channel: {err}");
                        }
                    }
                }
            }
            DropEvent::Expired {
                channel_id,
                collectors,
                total_paid,
                ..
            } => {
                let text = if collectors == 0 {
                    "The coin drop vanished uncollected.".to_string()
                } else {
                    format!(
                        "The coin drop is gone - {collectors} member(s) collected **{total_paid}** coins."
                    )
                };
                let Ok(id) = channel_id.parse::<u64>() else {
                    continue;
                };
                if let Err(e) = serenity::ChannelId::new(id).say(&http, text).await {
                    error!(channel = %channel_id, "failed to post drop summary: {e}");
                }
            }
        }
    }
}

/// Builds the engines, wires the poise framework, and runs the client
/// until it disconnects.
pub async fn run_bot(
    token: String,
    settings: Arc<AppSettings>,
    database: DatabaseConnection,
) -> Result<()> {
    let (giveaways, giveaway_events) = GiveawayEngine::new(
        database.clone(),
        settings.tiers.clone(),
        settings.giveaways.clone(),
    );
    let (drops, drop_events) = DropEngine::new(
        database.clone(),
        settings.tiers.clone(),
        settings.drops.clone(),
    );

    // Happy-path startup recovery: the active index and the channel
    // registry come back, pending timers do not.
    giveaways.load_active().await?;
    drops.load_channels().await?;

    let leveler = LevelTracker::new(settings.leveling.clone());
    let data = BotData {
        database,
        giveaways,
        drops: Arc::clone(&drops),
        leveler,
        settings,
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::general::ping(),
                commands::economy::balance(),
                commands::economy::coinflip(),
                commands::economy::slots(),
                commands::leveling::rank(),
                commands::giveaway::giveaway(),
                commands::drops::dropchannel(),
                commands::drops::collect(),
                commands::drops::dropstats(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let http = Arc::clone(&ctx.http);
                tokio::spawn(forward_giveaway_events(Arc::clone(&http), giveaway_events));
                tokio::spawn(forward_drop_events(http, drops, drop_events));

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;
    client.start().await?;
    Ok(())
}
