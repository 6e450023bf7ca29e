//! Gambling mini-games built on the economy.
//!
//! Bets are debited up front; winnings are credited back through the same
//! ledgered economy calls, so every game round leaves a paper trail.

use crate::{
    core::economy::{self, DebitOutcome},
    errors::Result,
};
use rand::Rng;
use sea_orm::DatabaseConnection;

/// The two coinflip calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSide {
    /// Heads
    Heads,
    /// Tails
    Tails,
}

impl CoinSide {
    /// Lowercase display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Heads => "heads",
            Self::Tails => "tails",
        }
    }
}

/// Result of a coinflip round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinflipOutcome {
    /// The call matched; the payout is twice the bet
    Won {
        /// What the coin showed
        landed: CoinSide,
        /// Amount credited
        payout: i64,
        /// Balance after the round
        balance: i64,
    },
    /// The call missed; the bet is gone
    Lost {
        /// What the coin showed
        landed: CoinSide,
        /// Balance after the round
        balance: i64,
    },
    /// The bet exceeded the balance; nothing changed
    InsufficientFunds {
        /// Balance at the time of the attempt
        balance: i64,
    },
}

/// Plays one coinflip round: debit the bet, flip, pay 2x on a match.
pub async fn coinflip<R: Rng>(
    db: &DatabaseConnection,
    guild_id: &str,
    user_id: &str,
    bet: i64,
    call: CoinSide,
    rng: &mut R,
) -> Result<CoinflipOutcome> {
    let balance = match economy::debit(db, guild_id, user_id, bet, "coinflip bet").await? {
        DebitOutcome::Debited(balance) => balance,
        DebitOutcome::InsufficientFunds { balance } => {
            return Ok(CoinflipOutcome::InsufficientFunds { balance });
        }
    };

    let landed = if rng.gen_bool(0.5) {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    };

    if landed == call {
        let payout = bet * 2;
        let user = economy::credit(db, guild_id, user_id, payout, "coinflip win").await?;
        Ok(CoinflipOutcome::Won {
            landed,
            payout,
            balance: user.balance,
        })
    } else {
        Ok(CoinflipOutcome::Lost { landed, balance })
    }
}

/// The slot machine's reel symbols and their triple payout multipliers.
pub const SLOT_SYMBOLS: [(&str, i64); 5] =
    [("🍒", 3), ("🍋", 4), ("🔔", 6), ("💎", 10), ("7️⃣", 20)];

/// Payout multiplier for pairs.
const PAIR_MULTIPLIER: i64 = 2;

/// Payout multiplier for a spun reel triple: the symbol's own multiplier
/// for three of a kind, 2 for any pair, 0 otherwise.
#[must_use]
pub fn slots_multiplier(reels: [usize; 3]) -> i64 {
    let [a, b, c] = reels;
    if a == b && b == c {
        SLOT_SYMBOLS[a].1
    } else if a == b || b == c || a == c {
        PAIR_MULTIPLIER
    } else {
        0
    }
}

/// Result of a slots round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotsOutcome {
    /// The reels paid out
    Spun {
        /// Indexes into [`SLOT_SYMBOLS`]
        reels: [usize; 3],
        /// Multiplier applied to the bet (0 for a loss)
        multiplier: i64,
        /// Amount credited, 0 for a loss
        winnings: i64,
        /// Balance after the round
        balance: i64,
    },
    /// The bet exceeded the balance; nothing changed
    InsufficientFunds {
        /// Balance at the time of the attempt
        balance: i64,
    },
}

/// Plays one slots round: debit the bet, spin three reels, pay
/// `bet * multiplier` on a pair or triple.
pub async fn slots<R: Rng>(
    db: &DatabaseConnection,
    guild_id: &str,
    user_id: &str,
    bet: i64,
    rng: &mut R,
) -> Result<SlotsOutcome> {
    let balance = match economy::debit(db, guild_id, user_id, bet, "slots bet").await? {
        DebitOutcome::Debited(balance) => balance,
        DebitOutcome::InsufficientFunds { balance } => {
            return Ok(SlotsOutcome::InsufficientFunds { balance });
        }
    };

    let reels = [
        rng.gen_range(0..SLOT_SYMBOLS.len()),
        rng.gen_range(0..SLOT_SYMBOLS.len()),
        rng.gen_range(0..SLOT_SYMBOLS.len()),
    ];
    let multiplier = slots_multiplier(reels);

    if multiplier > 0 {
        let winnings = bet * multiplier;
        let user = economy::credit(db, guild_id, user_id, winnings, "slots win").await?;
        Ok(SlotsOutcome::Spun {
            reels,
            multiplier,
            winnings,
            balance: user.balance,
        })
    } else {
        Ok(SlotsOutcome::Spun {
            reels,
            multiplier: 0,
            winnings: 0,
            balance,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{ConstRng, setup_test_db};

    #[test]
    fn slots_multiplier_resolution() {
        assert_eq!(slots_multiplier([0, 0, 0]), 3);
        assert_eq!(slots_multiplier([4, 4, 4]), 20);
        assert_eq!(slots_multiplier([1, 1, 2]), 2);
        assert_eq!(slots_multiplier([1, 2, 1]), 2);
        assert_eq!(slots_multiplier([2, 1, 1]), 2);
        assert_eq!(slots_multiplier([0, 1, 2]), 0);
    }

    #[tokio::test]
    async fn coinflip_win_pays_double() -> Result<()> {
        let db = setup_test_db().await?;
        economy::credit(&db, "g1", "u1", 100, "seed").await?;

        // A zeroed rng flips heads
        let outcome =
            coinflip(&db, "g1", "u1", 40, CoinSide::Heads, &mut ConstRng::zero()).await?;
        assert_eq!(
            outcome,
            CoinflipOutcome::Won {
                landed: CoinSide::Heads,
                payout: 80,
                balance: 140,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn coinflip_loss_keeps_the_debit() -> Result<()> {
        let db = setup_test_db().await?;
        economy::credit(&db, "g1", "u1", 100, "seed").await?;

        let outcome =
            coinflip(&db, "g1", "u1", 40, CoinSide::Tails, &mut ConstRng::zero()).await?;
        assert_eq!(
            outcome,
            CoinflipOutcome::Lost {
                landed: CoinSide::Heads,
                balance: 60,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn games_reject_bets_over_balance() -> Result<()> {
        let db = setup_test_db().await?;
        economy::credit(&db, "g1", "u1", 30, "seed").await?;

        let flip =
            coinflip(&db, "g1", "u1", 50, CoinSide::Heads, &mut ConstRng::zero()).await?;
        assert_eq!(flip, CoinflipOutcome::InsufficientFunds { balance: 30 });

        let spin = slots(&db, "g1", "u1", 50, &mut ConstRng::zero()).await?;
        assert_eq!(spin, SlotsOutcome::InsufficientFunds { balance: 30 });
        Ok(())
    }

    #[tokio::test]
    async fn slots_triple_with_rigged_reels() -> Result<()> {
        let db = setup_test_db().await?;
        economy::credit(&db, "g1", "u1", 100, "seed").await?;

        // A zeroed rng spins reel index 0 three times: cherry triple, 3x
        let outcome = slots(&db, "g1", "u1", 10, &mut ConstRng::zero()).await?;
        assert_eq!(
            outcome,
            SlotsOutcome::Spun {
                reels: [0, 0, 0],
                multiplier: 3,
                winnings: 30,
                balance: 120,
            }
        );
        Ok(())
    }
}
