use crate::bot::Context;
use crate::errors::Result;

/// Checks that the bot is alive.
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<()> {
    ctx.say("Pong!").await?;
    Ok(())
}
