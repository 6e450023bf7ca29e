//! `WonderBot` - A Discord community-engagement bot
//!
//! This crate provides a virtual-currency economy, gambling mini-games,
//! a leveling/XP system, time-boxed giveaways with weighted winner
//! selection, and randomized coin drops, all backed by a local `SQLite`
//! database accessed through `SeaORM`.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    unsafe_code,
    unsafe_op_in_unsafe_fn,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::dbg_macro,
    clippy::float_cmp,
    clippy::large_enum_variant,
    clippy::match_same_arms,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,       // Will add gradually
    clippy::missing_panics_doc,       // Will add gradually
    clippy::cast_possible_truncation, // Reward math stays well inside i64
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

/// Discord bot interface - commands, handlers, and bot context
pub mod bot;
/// Configuration management for database and application settings
pub mod config;
/// Core business logic - framework-agnostic engines for giveaways, drops,
/// economy, leveling, and games
pub mod core;
/// SeaORM entity definitions for database tables
pub mod entities;
/// Unified error types and result handling
pub mod errors;

#[cfg(test)]
pub mod test_utils;
