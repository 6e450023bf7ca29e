//! Coin-drop channel management, collection, and stats.

use crate::bot::{Context, member_profile};
use crate::core::drop::CollectOutcome;
use crate::errors::Result;
use poise::serenity_prelude as serenity;

/// Manages which channels receive random coin drops.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("add", "remove"),
    required_permissions = "MANAGE_GUILD"
)]
pub async fn dropchannel(_ctx: Context<'_>) -> Result<()> {
    Ok(())
}

/// Registers a channel for coin drops.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Channel to register (defaults to this one)"] channel: Option<
        serenity::ChannelId,
    >,
) -> Result<()> {
    let Some(guild) = ctx.guild_id().map(|id| id.to_string()) else {
        ctx.say("This command only works in a server.").await?;
        return Ok(());
    };
    let channel_id = channel.unwrap_or_else(|| ctx.channel_id()).to_string();

    let added = ctx
        .data()
        .drops
        .register_channel(&guild, &channel_id)
        .await?;
    let text = if added {
        format!("💰 <#{channel_id}> will now receive random coin drops.")
    } else {
        format!("<#{channel_id}> is already registered for drops.")
    };
    ctx.say(text).await?;
    Ok(())
}

/// Removes a channel from the drop rotation.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Channel to remove (defaults to this one)"] channel: Option<
        serenity::ChannelId,
    >,
) -> Result<()> {
    let Some(guild) = ctx.guild_id().map(|id| id.to_string()) else {
        ctx.say("This command only works in a server.").await?;
        return Ok(());
    };
    let channel_id = channel.unwrap_or_else(|| ctx.channel_id()).to_string();

    let removed = ctx
        .data()
        .drops
        .deregister_channel(&guild, &channel_id)
        .await?;
    let text = if removed {
        format!("<#{channel_id}> will no longer receive coin drops.")
    } else {
        format!("<#{channel_id}> wasn't registered for drops.")
    };
    ctx.say(text).await?;
    Ok(())
}

/// Collects the coin drop open in this channel.
#[poise::command(slash_command, guild_only)]
pub async fn collect(ctx: Context<'_>) -> Result<()> {
    let profile = member_profile(&ctx).await;
    let channel_id = ctx.channel_id().to_string();

    let text = match ctx.data().drops.collect(&channel_id, &profile).await? {
        CollectOutcome::Collected { amount, rarity } => format!(
            "💰 You collected **{amount}** coins from a **{}** drop!",
            rarity.label()
        ),
        CollectOutcome::NothingToCollect => {
            "There's nothing to collect here right now.".to_string()
        }
        CollectOutcome::AlreadyCollected => {
            "You already collected from this drop.".to_string()
        }
    };
    ctx.say(text).await?;
    Ok(())
}

/// Shows your lifetime drop-collection stats.
#[poise::command(slash_command, guild_only)]
pub async fn dropstats(ctx: Context<'_>) -> Result<()> {
    let Some(guild) = ctx.guild_id().map(|id| id.to_string()) else {
        ctx.say("This command only works in a server.").await?;
        return Ok(());
    };

    let stats = ctx
        .data()
        .drops
        .user_stats(&guild, &ctx.author().id.to_string())
        .await?;
    let text = match stats {
        Some(stats) => format!(
            "📊 You've collected **{}** coins from drops.\n\
             Common: {} | Rare: {} | Epic: {} | Legendary: {}",
            stats.total_collected,
            stats.common_count,
            stats.rare_count,
            stats.epic_count,
            stats.legendary_count
        ),
        None => "You haven't collected any drops yet.".to_string(),
    };
    ctx.say(text).await?;
    Ok(())
}
