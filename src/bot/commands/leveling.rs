//! Rank lookup.

use crate::bot::Context;
use crate::core::leveling::{self, xp_for_level};
use crate::errors::Result;
use poise::serenity_prelude as serenity;

/// Shows a member's level and XP progress.
#[poise::command(slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] member: Option<serenity::User>,
) -> Result<()> {
    let Some(guild) = ctx.guild_id().map(|id| id.to_string()) else {
        ctx.say("This command only works in a server.").await?;
        return Ok(());
    };
    let target = member.as_ref().unwrap_or_else(|| ctx.author());

    let row = leveling::get_rank(&ctx.data().database, &guild, &target.id.to_string()).await?;
    let text = match row {
        Some(user) => {
            // XP already spent on earlier levels
            let spent: i64 = (0..user.level).map(xp_for_level).sum();
            let into_level = user.xp - spent;
            let needed = xp_for_level(user.level);
            format!(
                "📈 <@{}> is level **{}** with {into_level}/{needed} XP toward the next level ({} total).",
                target.id, user.level, user.xp
            )
        }
        None => format!("<@{}> hasn't earned any XP yet.", target.id),
    };
    ctx.say(text).await?;
    Ok(())
}
