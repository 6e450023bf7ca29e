//! Unified error types and result handling.

use thiserror::Error;

/// All failure modes surfaced by the bot.
///
/// Domain outcomes (a giveaway the user already entered, an expired drop,
/// an ineligible member) are *not* errors; engines report those as plain
/// outcome values. `Error` is reserved for storage, configuration, and
/// platform failures.
#[derive(Debug, Error)]
pub enum Error {
    /// A settings file exists but could not be parsed
    #[error("configuration error: {message}")]
    Config {
        /// What went wrong, including the file path
        message: String,
    },

    /// Any storage failure surfaced by `SeaORM`
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A caller passed a zero or negative coin amount
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Filesystem failure while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable is missing or malformed
    #[error("environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Discord connection or API failure, boxed to keep the enum small
    #[error("Discord framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
