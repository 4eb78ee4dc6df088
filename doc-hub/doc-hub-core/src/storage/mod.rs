//! Relational persistence for users and documents.

pub mod documents;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;

pub use documents::{DocumentSummary, NewDocument, StoredDocument};
pub use users::UserRecord;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL,
        token TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        mime TEXT NOT NULL DEFAULT '',
        has_file BOOLEAN NOT NULL DEFAULT FALSE,
        public BOOLEAN NOT NULL DEFAULT FALSE,
        grant_login TEXT NOT NULL DEFAULT '[]',  -- JSON array of logins
        owner TEXT NOT NULL,
        created INTEGER NOT NULL,                 -- unix microseconds
        json TEXT,
        file BLOB
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner, name, created)",
];

/// Handle to the SQL store. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `url` and provisions the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to an in-memory database sees its own empty copy.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut pool_opts = SqlitePoolOptions::new();
        pool_opts = if in_memory {
            pool_opts
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_opts.max_connections(max_connections.max(1))
        };

        let pool = pool_opts.connect_with(opts).await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// A private, empty in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("database schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
