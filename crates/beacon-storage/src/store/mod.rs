use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;

use crate::error::Result;

pub mod alert;
pub mod channel;
pub mod rule;

/// Database file created under the data directory by [`Store::open`].
pub const DEFAULT_DB_FILE: &str = "beacon.db";

/// SeaORM-backed implementation of the rule, alert and channel stores.
///
/// All methods are `async fn`; the schema is brought up to date by the
/// `migration` crate when the store connects.
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connects to `db_url` and runs pending migrations.
    ///
    /// SQLite example: `sqlite:///data/beacon.db?mode=rwc`
    pub async fn connect(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized alert store");

        Ok(Self { db })
    }

    /// Opens (creating if needed) `beacon.db` under `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(DEFAULT_DB_FILE);
        Self::connect(&format!("sqlite://{}?mode=rwc", path.display())).await
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
