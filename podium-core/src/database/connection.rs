//! Database connection management.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, Transaction};

use crate::{
    constants::REGISTRY_MIGRATIONS, database::migration::apply_migrations, error::PodiumError,
    PodiumResult,
};

/// Thread-safe wrapper around the registry SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the registry database, applying pending migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> PodiumResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database for tests.
    pub fn in_memory() -> PodiumResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> PodiumResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        apply_migrations(&mut conn, REGISTRY_MIGRATIONS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Executes a read or single-statement write against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> PodiumResult<T>
    where
        F: FnOnce(&Connection) -> PodiumResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| PodiumError::PoisonError)?;
        f(&conn)
    }

    /// Executes a function within a transaction. The transaction is
    /// committed when the function returns `Ok` and rolled back otherwise.
    pub fn transaction<F, T>(&self, f: F) -> PodiumResult<T>
    where
        F: FnOnce(&Transaction) -> PodiumResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| PodiumError::PoisonError)?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}
