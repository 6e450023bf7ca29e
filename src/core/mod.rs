//! Core business logic - framework-agnostic engines.
//!
//! Everything in this layer takes opaque ID strings and a database
//! connection; nothing here knows about Discord types. The bot layer
//! translates platform events into these calls and renders the returned
//! outcome values.

/// Randomized coin-drop scheduling, collection, and expiry
pub mod drop;
/// Balance credit/debit and the transaction ledger
pub mod economy;
/// Gambling mini-games built on the economy
pub mod games;
/// Giveaway lifecycle, entry admission, and weighted winner selection
pub mod giveaway;
/// Per-message XP awards and the level curve
pub mod leveling;
/// Role-derived tiers, multipliers, and eligibility helpers
pub mod tier;
/// Cancellable single-shot timers keyed by entity id
pub mod timer;
