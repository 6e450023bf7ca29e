//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod drop_channel;
pub mod giveaway;
pub mod giveaway_entry;
pub mod giveaway_win;
pub mod guild_drop_stats;
pub mod ledger;
pub mod user;
pub mod user_drop_stats;

// Re-export specific types to avoid conflicts
pub use drop_channel::Entity as DropChannel;
pub use giveaway::{Entity as Giveaway, Model as GiveawayModel};
pub use giveaway_entry::{Entity as GiveawayEntry, Model as GiveawayEntryModel};
pub use giveaway_win::Entity as GiveawayWin;
pub use guild_drop_stats::Entity as GuildDropStats;
pub use ledger::Entity as Ledger;
pub use user::{Entity as User, Model as UserModel};
pub use user_drop_stats::Entity as UserDropStats;
