//! Application settings loaded from an optional TOML file.
//!
//! Every section has working defaults so the bot starts with no config file
//! at all; `WONDER_CONFIG` overrides the file path. Secrets
//! (`DISCORD_BOT_TOKEN`, `DATABASE_URL`) stay in the environment and never
//! enter the settings struct.

/// Database connection and table creation
pub mod database;

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level settings, one section per subsystem.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Role IDs that map members onto reward tiers
    pub tiers: TierSettings,
    /// Giveaway engine tunables
    pub giveaways: GiveawaySettings,
    /// Coin-drop engine tunables
    pub drops: DropSettings,
    /// Message-XP tunables
    pub leveling: LevelSettings,
}

/// Maps role membership onto the premium/booster tiers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TierSettings {
    /// Role ID granting premium tier, if configured
    pub premium_role_id: Option<String>,
    /// Role ID granting booster tier, if configured
    pub booster_role_id: Option<String>,
}

/// Giveaway engine tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GiveawaySettings {
    /// How long a win bars a non-premium user from restricted giveaways
    pub winner_cooldown_days: i64,
    /// Whether premium members skip the winner cooldown entirely
    pub premium_bypass: bool,
    /// Upper bound on `winner_count`, enforced by the command layer
    pub max_winner_count: i32,
}

impl Default for GiveawaySettings {
    fn default() -> Self {
        Self {
            winner_cooldown_days: 7,
            premium_bypass: true,
            max_winner_count: 10,
        }
    }
}

/// Coin-drop engine tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DropSettings {
    /// Shortest wait between drops, in minutes
    pub min_interval_minutes: u64,
    /// Longest wait between drops, in minutes
    pub max_interval_minutes: u64,
    /// Smallest base reward before the rarity multiplier
    pub min_amount: i64,
    /// Largest base reward before the rarity multiplier
    pub max_amount: i64,
    /// How long a drop stays collectable, in seconds
    pub collect_window_secs: u64,
}

impl Default for DropSettings {
    fn default() -> Self {
        Self {
            min_interval_minutes: 30,
            max_interval_minutes: 180,
            min_amount: 10,
            max_amount: 500,
            collect_window_secs: 60,
        }
    }
}

/// Message-XP tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    /// Minimum seconds between XP awards per member
    pub xp_cooldown_secs: u64,
    /// Smallest XP award per eligible message
    pub min_xp: i64,
    /// Largest XP award per eligible message
    pub max_xp: i64,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            xp_cooldown_secs: 60,
            min_xp: 15,
            max_xp: 25,
        }
    }
}

/// Loads settings from `WONDER_CONFIG` (default `wonder.toml`).
///
/// A missing file is not an error; defaults apply. A present but malformed
/// file is, so typos never silently fall back to defaults.
pub fn load_settings() -> Result<AppSettings> {
    let path = std::env::var("WONDER_CONFIG").unwrap_or_else(|_| "wonder.toml".to_string());
    load_settings_from(&path)
}

fn load_settings_from<P: AsRef<Path>>(path: P) -> Result<AppSettings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        tracing::info!("No settings file at {:?}, using defaults", path_ref);
        return Ok(AppSettings::default());
    }

    tracing::debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref)?;
    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("failed to parse settings file {path_ref:?}: {e}"),
    })
}
