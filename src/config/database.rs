//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`'s
//! `Schema::create_table_from_entity`, so the schema always matches the
//! entity definitions without hand-written SQL.

use crate::entities::{
    DropChannel, Giveaway, GiveawayEntry, GiveawayWin, GuildDropStats, Ledger, User, UserDropStats,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Establishes a connection using `DATABASE_URL`, falling back to a local
/// `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://data/wonder_bot.sqlite?mode=rwc".to_string());

    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables from the entity definitions, skipping any that
/// already exist.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Ledger),
        schema.create_table_from_entity(Giveaway),
        schema.create_table_from_entity(GiveawayEntry),
        schema.create_table_from_entity(GiveawayWin),
        schema.create_table_from_entity(DropChannel),
        schema.create_table_from_entity(UserDropStats),
        schema.create_table_from_entity(GuildDropStats),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(statement)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{GiveawayEntryModel, GiveawayModel, UserModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Tables exist if querying them succeeds
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<GiveawayModel> = Giveaway::find().limit(1).all(&db).await?;
        let _: Vec<GiveawayEntryModel> = GiveawayEntry::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
