//! Economy business logic - balance mutations and the transaction ledger.
//!
//! Every balance change goes through [`credit`] or [`debit`], which update
//! the stored balance with an atomic column expression
//! (`balance = balance + delta`) rather than read-modify-write, and append
//! a ledger row describing the mutation.

use crate::{
    entities::{Ledger, User, ledger, user},
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ConnectionTrait, Set, prelude::*};

/// Outcome of a debit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Balance after the debit
    Debited(i64),
    /// The user's balance was too small; nothing changed
    InsufficientFunds {
        /// Balance at the time of the attempt
        balance: i64,
    },
}

/// Fetches a user's economy row, if one exists yet.
pub async fn get_user<C: ConnectionTrait>(
    db: &C,
    guild_id: &str,
    user_id: &str,
) -> Result<Option<user::Model>> {
    User::find_by_id((guild_id.to_string(), user_id.to_string()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Ensures a user row exists, inserting a zeroed one if needed.
pub async fn ensure_user<C: ConnectionTrait>(
    db: &C,
    guild_id: &str,
    user_id: &str,
) -> Result<user::Model> {
    let row = user::ActiveModel {
        guild_id: Set(guild_id.to_string()),
        user_id: Set(user_id.to_string()),
        balance: Set(0),
        xp: Set(0),
        level: Set(0),
    };
    User::insert(row)
        .on_conflict(
            OnConflict::columns([user::Column::GuildId, user::Column::UserId])
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(db)
        .await?;

    get_user(db, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("user row vanished for {guild_id}/{user_id}"),
        })
}

/// Credits `amount` coins to a user and records a ledger row.
///
/// Returns the updated user row. Rejects non-positive amounts.
pub async fn credit<C: ConnectionTrait>(
    db: &C,
    guild_id: &str,
    user_id: &str,
    amount: i64,
    reason: &str,
) -> Result<user::Model> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    ensure_user(db, guild_id, user_id).await?;
    apply_delta(db, guild_id, user_id, amount, reason).await
}

/// Debits `amount` coins from a user if the balance covers it.
///
/// The insufficient-funds check is read-then-write; a single-writer call
/// path per user is assumed (one Discord interaction at a time).
pub async fn debit<C: ConnectionTrait>(
    db: &C,
    guild_id: &str,
    user_id: &str,
    amount: i64,
    reason: &str,
) -> Result<DebitOutcome> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let user = ensure_user(db, guild_id, user_id).await?;
    if user.balance < amount {
        return Ok(DebitOutcome::InsufficientFunds {
            balance: user.balance,
        });
    }
    let updated = apply_delta(db, guild_id, user_id, -amount, reason).await?;
    Ok(DebitOutcome::Debited(updated.balance))
}

async fn apply_delta<C: ConnectionTrait>(
    db: &C,
    guild_id: &str,
    user_id: &str,
    delta: i64,
    reason: &str,
) -> Result<user::Model> {
    // Atomic update: balance = balance + delta
    User::update_many()
        .col_expr(
            user::Column::Balance,
            Expr::col(user::Column::Balance).add(delta),
        )
        .filter(user::Column::GuildId.eq(guild_id))
        .filter(user::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    let entry = ledger::ActiveModel {
        guild_id: Set(guild_id.to_string()),
        user_id: Set(user_id.to_string()),
        amount: Set(delta),
        reason: Set(reason.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ledger::insert(entry).exec(db).await?;

    get_user(db, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("user row vanished for {guild_id}/{user_id}"),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn credit_creates_user_and_ledger_row() -> Result<()> {
        let db = setup_test_db().await?;

        let user = credit(&db, "g1", "u1", 100, "coin drop").await?;
        assert_eq!(user.balance, 100);

        let rows = Ledger::find().all(&db).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 100);
        assert_eq!(rows[0].reason, "coin drop");
        Ok(())
    }

    #[tokio::test]
    async fn credits_accumulate() -> Result<()> {
        let db = setup_test_db().await?;

        credit(&db, "g1", "u1", 100, "a").await?;
        let user = credit(&db, "g1", "u1", 50, "b").await?;
        assert_eq!(user.balance, 150);
        Ok(())
    }

    #[tokio::test]
    async fn debit_respects_balance() -> Result<()> {
        let db = setup_test_db().await?;
        credit(&db, "g1", "u1", 100, "seed").await?;

        let outcome = debit(&db, "g1", "u1", 40, "coinflip bet").await?;
        assert_eq!(outcome, DebitOutcome::Debited(60));

        let outcome = debit(&db, "g1", "u1", 100, "coinflip bet").await?;
        assert_eq!(outcome, DebitOutcome::InsufficientFunds { balance: 60 });
        Ok(())
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(matches!(
            credit(&db, "g1", "u1", 0, "nope").await,
            Err(Error::InvalidAmount { amount: 0 })
        ));
        assert!(matches!(
            debit(&db, "g1", "u1", -5, "nope").await,
            Err(Error::InvalidAmount { amount: -5 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn balances_are_scoped_per_guild() -> Result<()> {
        let db = setup_test_db().await?;

        credit(&db, "g1", "u1", 100, "a").await?;
        credit(&db, "g2", "u1", 25, "b").await?;

        assert_eq!(get_user(&db, "g1", "u1").await?.unwrap().balance, 100);
        assert_eq!(get_user(&db, "g2", "u1").await?.unwrap().balance, 25);
        Ok(())
    }
}
