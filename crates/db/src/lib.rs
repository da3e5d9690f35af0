//! SQLite access for the bookstore: pool factory, request-scoped sessions and
//! the module migration runner.

use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection};

mod migration;

pub use migration::Migration;

/// Shared handle to the relational store.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool against `url`, creating the database file when missing.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url '{url}'"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{url}'"))?;

        tracing::info!(target: "bookstore-db", %url, max_connections, "database pool ready");
        Ok(Self { pool })
    }

    /// Private in-memory database backed by a single long-lived connection.
    ///
    /// An in-memory SQLite database lives as long as its connection, so the
    /// pool is pinned to exactly one connection that never idles out.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory database url")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .context("failed to open in-memory database")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check out a connection for one unit of work.
    pub async fn session(&self) -> anyhow::Result<Session> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;
        tracing::trace!(target: "bookstore-db", "session acquired");
        Ok(Session { conn })
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Returns the number of migrations applied by this call.
    pub async fn apply_migrations(
        &self,
        migrations: &[(String, Migration)],
    ) -> anyhow::Result<usize> {
        migration::apply(&self.pool, migrations).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(target: "bookstore-db", "database pool closed");
    }
}

/// A pooled connection scoped to one request.
///
/// The connection goes back to the pool when the session is dropped, whether
/// the request succeeded or not.
#[derive(Debug)]
pub struct Session {
    conn: PoolConnection<Sqlite>,
}

impl Deref for Session {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
