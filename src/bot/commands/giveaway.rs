//! Giveaway lifecycle commands.
//!
//! The start/end/reroll/cancel subcommands are admin-gated; entering and
//! looking things up is open to everyone.

use crate::bot::{Context, member_profile};
use crate::core::giveaway::{
    CancelOutcome, CreateGiveaway, EndOutcome, EnterOutcome, RerollOutcome,
};
use crate::errors::Result;
use poise::serenity_prelude as serenity;

/// Manages giveaways.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("start", "enter", "end", "reroll", "cancel", "info", "list", "history")
)]
pub async fn giveaway(_ctx: Context<'_>) -> Result<()> {
    Ok(())
}

/// Starts a giveaway in the current channel.
#[allow(clippy::too_many_arguments)]
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn start(
    ctx: Context<'_>,
    #[description = "Short title"] title: String,
    #[description = "What the winners get"] prize: String,
    #[description = "Minutes until the giveaway closes"]
    #[min = 1]
    duration_minutes: i64,
    #[description = "Number of winners (default 1)"]
    #[min = 1]
    winners: Option<i32>,
    #[description = "Longer description"] description: Option<String>,
    #[description = "Role required to enter"] required_role: Option<serenity::RoleId>,
    #[description = "Minimum account age in days"]
    #[min = 1]
    min_account_age_days: Option<i64>,
    #[description = "Minimum bot level"]
    #[min = 1]
    min_level: Option<i32>,
    #[description = "Bar recent winners from entering (default true)"] restrict_winners: Option<
        bool,
    >,
) -> Result<()> {
    let Some(guild) = ctx.guild_id().map(|id| id.to_string()) else {
        ctx.say("This command only works in a server.").await?;
        return Ok(());
    };

    let max = ctx.data().settings.giveaways.max_winner_count;
    let winner_count = winners.unwrap_or(1).clamp(1, max);

    let created = ctx
        .data()
        .giveaways
        .create(CreateGiveaway {
            guild_id: guild,
            channel_id: ctx.channel_id().to_string(),
            title: title.clone(),
            description: description.unwrap_or_default(),
            prize: prize.clone(),
            winner_count,
            duration_minutes,
            required_role_id: required_role.map(|role| role.to_string()),
            min_account_age_days,
            min_level,
            restrict_winners: restrict_winners.unwrap_or(true),
            created_by: ctx.author().id.to_string(),
        })
        .await?;

    let reply = ctx
        .say(format!(
            "🎉 **{title}** (#{id})\nPrize: **{prize}** for {winner_count} winner(s).\n\
             Ends <t:{ends}:R>. Enter with `/giveaway enter id:{id}`.",
            id = created.id,
            ends = created.ends_at().timestamp(),
        ))
        .await?;

    // Remember the announcement so it can be referenced later
    let message = reply.message().await?;
    ctx.data()
        .giveaways
        .set_message_id(created.id, &message.id.to_string())
        .await?;
    Ok(())
}

/// Enters you into a giveaway.
#[poise::command(slash_command, guild_only)]
pub async fn enter(
    ctx: Context<'_>,
    #[description = "Giveaway ID"] id: i64,
) -> Result<()> {
    let profile = member_profile(&ctx).await;
    let text = match ctx.data().giveaways.enter(id, &profile).await? {
        EnterOutcome::Accepted {
            entry_count,
            weight,
        } => {
            let weight_note = if weight > 1.0 {
                format!(" Your entry counts {weight}x.")
            } else {
                String::new()
            };
            format!("✅ You're in! {entry_count} entries so far.{weight_note}")
        }
        EnterOutcome::NotFound => format!("No giveaway with ID {id}."),
        EnterOutcome::AlreadyEnded => "That giveaway has already ended.".to_string(),
        EnterOutcome::Denied(denied) => denied.message(),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Ends a giveaway now and draws the winners.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn end(
    ctx: Context<'_>,
    #[description = "Giveaway ID"] id: i64,
) -> Result<()> {
    // Winner announcements are posted to the giveaway's channel by the
    // event forwarder; this reply just confirms the action.
    let text = match ctx.data().giveaways.end(id).await? {
        EndOutcome::Noop => format!("Giveaway {id} is not open (missing, cancelled, or already ended)."),
        EndOutcome::NoEntries => format!("Giveaway {id} ended with no entries."),
        EndOutcome::Winners(ids) => format!("Giveaway {id} ended with {} winner(s).", ids.len()),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Redraws winners for an ended giveaway.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reroll(
    ctx: Context<'_>,
    #[description = "Giveaway ID"] id: i64,
    #[description = "Number of winners to redraw (defaults to the original)"]
    #[min = 1]
    winners: Option<i32>,
) -> Result<()> {
    let max = ctx.data().settings.giveaways.max_winner_count;
    let winners = winners.map(|count| count.clamp(1, max));
    let text = match ctx.data().giveaways.reroll(id, winners).await? {
        RerollOutcome::NotFound => format!("No giveaway with ID {id}."),
        RerollOutcome::NotEnded => "That giveaway hasn't ended yet.".to_string(),
        RerollOutcome::NoEntries => "That giveaway had no entries; nothing to redraw.".to_string(),
        RerollOutcome::Winners(ids) => {
            let mentions: Vec<String> = ids.iter().map(|id| format!("<@{id}>")).collect();
            format!("🎉 New winner(s): {}", mentions.join(", "))
        }
    };
    ctx.say(text).await?;
    Ok(())
}

/// Cancels an open giveaway without drawing winners.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn cancel(
    ctx: Context<'_>,
    #[description = "Giveaway ID"] id: i64,
) -> Result<()> {
    let text = match ctx.data().giveaways.cancel(id).await? {
        CancelOutcome::Cancelled => format!("Giveaway {id} cancelled."),
        CancelOutcome::NotFound => format!("No open giveaway with ID {id}."),
        CancelOutcome::AlreadyEnded => {
            "That giveaway already ended; it can't be cancelled.".to_string()
        }
    };
    ctx.say(text).await?;
    Ok(())
}

/// Shows the state of a giveaway.
#[poise::command(slash_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Giveaway ID"] id: i64,
) -> Result<()> {
    let Some(giveaway) = ctx.data().giveaways.get(id).await? else {
        ctx.say(format!("No giveaway with ID {id}.")).await?;
        return Ok(());
    };
    let entries = ctx.data().giveaways.entry_count(id).await?;

    let status = if giveaway.cancelled {
        "cancelled".to_string()
    } else if giveaway.ended {
        let winners = giveaway.winners();
        if winners.is_empty() {
            "ended with no winners".to_string()
        } else {
            let mentions: Vec<String> = winners.iter().map(|w| format!("<@{w}>")).collect();
            format!("ended, won by {}", mentions.join(", "))
        }
    } else {
        format!("open, ends <t:{}:R>", giveaway.ends_at().timestamp())
    };

    ctx.say(format!(
        "**{}** (#{id})\nPrize: **{}** for {} winner(s).\nEntries: {entries}. Status: {status}.",
        giveaway.title, giveaway.prize, giveaway.winner_count
    ))
    .await?;
    Ok(())
}

/// Lists this server's giveaways, newest first.
#[poise::command(slash_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "Include ended giveaways"] include_ended: Option<bool>,
) -> Result<()> {
    let Some(guild) = ctx.guild_id().map(|id| id.to_string()) else {
        ctx.say("This command only works in a server.").await?;
        return Ok(());
    };

    let giveaways = ctx
        .data()
        .giveaways
        .list_guild(&guild, include_ended.unwrap_or(false), 10)
        .await?;
    if giveaways.is_empty() {
        ctx.say("No giveaways to show.").await?;
        return Ok(());
    }

    let lines: Vec<String> = giveaways
        .iter()
        .map(|g| {
            let status = if g.ended {
                "ended".to_string()
            } else {
                format!("ends <t:{}:R>", g.ends_at().timestamp())
            };
            format!("- #{} **{}** - {} ({status})", g.id, g.title, g.prize)
        })
        .collect();
    ctx.say(format!("🎉 Giveaways:\n{}", lines.join("\n")))
        .await?;
    Ok(())
}

/// Shows your recent giveaway wins.
#[poise::command(slash_command, guild_only)]
pub async fn history(ctx: Context<'_>) -> Result<()> {
    let wins = ctx
        .data()
        .giveaways
        .user_history(&ctx.author().id.to_string(), 10)
        .await?;
    if wins.is_empty() {
        ctx.say("You haven't won any giveaways yet.").await?;
        return Ok(());
    }
    let lines: Vec<String> = wins
        .iter()
        .map(|win| format!("- Giveaway #{} on <t:{}:D>", win.giveaway_id, win.won_at.timestamp()))
        .collect();
    ctx.say(format!("🏆 Your recent wins:\n{}", lines.join("\n")))
        .await?;
    Ok(())
}
