//! Slash command handlers, grouped by feature.

/// Coin-drop channel management and collection
pub mod drops;
/// Balance and gambling commands
pub mod economy;
/// Uncategorized utility commands
pub mod general;
/// Giveaway lifecycle commands
pub mod giveaway;
/// Rank lookup
pub mod leveling;
