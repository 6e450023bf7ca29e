//! Balance and gambling commands.

use crate::bot::Context;
use crate::core::economy;
use crate::core::games::{self, CoinSide, CoinflipOutcome, SlotsOutcome, SLOT_SYMBOLS};
use crate::errors::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn guild_id(ctx: &Context<'_>) -> String {
    // Commands here are guild_only; outside a guild they never dispatch.
    ctx.guild_id().map(|id| id.to_string()).unwrap_or_default()
}

/// Shows your coin balance.
#[poise::command(slash_command, guild_only)]
pub async fn balance(ctx: Context<'_>) -> Result<()> {
    let guild = guild_id(&ctx);
    let user = economy::get_user(&ctx.data().database, &guild, &ctx.author().id.to_string()).await?;
    let balance = user.map_or(0, |u| u.balance);
    ctx.say(format!("💰 You have **{balance}** coins.")).await?;
    Ok(())
}

/// The caller's side of the coin, as a slash-command choice.
#[derive(poise::ChoiceParameter)]
pub enum CoinSideChoice {
    /// Heads
    #[name = "heads"]
    Heads,
    /// Tails
    #[name = "tails"]
    Tails,
}

impl From<CoinSideChoice> for CoinSide {
    fn from(choice: CoinSideChoice) -> Self {
        match choice {
            CoinSideChoice::Heads => Self::Heads,
            CoinSideChoice::Tails => Self::Tails,
        }
    }
}

/// Bets coins on a coin flip. A correct call pays double.
#[poise::command(slash_command, guild_only)]
pub async fn coinflip(
    ctx: Context<'_>,
    #[description = "How many coins to bet"]
    #[min = 1]
    bet: i64,
    #[description = "Your call"] side: CoinSideChoice,
) -> Result<()> {
    let guild = guild_id(&ctx);
    let call: CoinSide = side.into();
    // StdRng keeps the command future Send
    let mut rng = StdRng::from_entropy();
    let outcome = games::coinflip(
        &ctx.data().database,
        &guild,
        &ctx.author().id.to_string(),
        bet,
        call,
        &mut rng,
    )
    .await?;

    let text = match outcome {
        CoinflipOutcome::Won {
            landed,
            payout,
            balance,
        } => format!(
            "🪙 The coin landed on **{}** - you won **{payout}** coins! Balance: {balance}.",
            landed.label()
        ),
        CoinflipOutcome::Lost { landed, balance } => format!(
            "🪙 The coin landed on **{}** - you lost your {bet} coin bet. Balance: {balance}.",
            landed.label()
        ),
        CoinflipOutcome::InsufficientFunds { balance } => {
            format!("You only have **{balance}** coins; you can't bet {bet}.")
        }
    };
    ctx.say(text).await?;
    Ok(())
}

/// Bets coins on the slot machine.
#[poise::command(slash_command, guild_only)]
pub async fn slots(
    ctx: Context<'_>,
    #[description = "How many coins to bet"]
    #[min = 1]
    bet: i64,
) -> Result<()> {
    let guild = guild_id(&ctx);
    let mut rng = StdRng::from_entropy();
    let outcome = games::slots(
        &ctx.data().database,
        &guild,
        &ctx.author().id.to_string(),
        bet,
        &mut rng,
    )
    .await?;

    let text = match outcome {
        SlotsOutcome::Spun {
            reels,
            multiplier,
            winnings,
            balance,
        } => {
            let display: Vec<&str> = reels.iter().map(|&i| SLOT_SYMBOLS[i].0).collect();
            let reels_line = display.join(" | ");
            if multiplier > 0 {
                format!(
                    "🎰 {reels_line}\nYou won **{winnings}** coins ({multiplier}x)! Balance: {balance}."
                )
            } else {
                format!("🎰 {reels_line}\nNo match - you lost {bet} coins. Balance: {balance}.")
            }
        }
        SlotsOutcome::InsufficientFunds { balance } => {
            format!("You only have **{balance}** coins; you can't bet {bet}.")
        }
    };
    ctx.say(text).await?;
    Ok(())
}
