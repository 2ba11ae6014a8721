//! SQLite connection management for LinkTrove.
//!
//! Provides the [`Database`] struct that wraps a `rusqlite::Connection`,
//! runs schema migrations on open, and exposes the transaction wrapper
//! all higher-level store operations are composed through.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;

use super::migrations;

/// Access mode for [`Database::with_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Deferred transaction; suitable for consistent multi-table reads.
    ReadOnly,
    /// Immediate transaction; takes the write lock up front so racing
    /// mutations serialize instead of failing mid-way.
    ReadWrite,
}

/// Core database wrapper providing SQLite connection management.
///
/// Owns a `rusqlite::Connection` and ensures all required tables and
/// indexes exist when the database is opened.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// Useful for testing; the database is discarded when the `Database` is dropped.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<(), rusqlite::Error> {
        migrations::run_all(&self.conn)
    }

    /// Returns a reference to the underlying `rusqlite::Connection`.
    ///
    /// Managers borrow this to execute single-statement queries; anything
    /// that mutates more than one row or table belongs inside
    /// [`with_transaction`](Self::with_transaction).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside a single SQLite transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back when it returns `Err`, so
    /// no partial writes are ever observable. This wrapper is the only
    /// mutual-exclusion mechanism in the engine; store operations must not
    /// read-modify-write across statements outside of it.
    pub fn with_transaction<T, E>(
        &self,
        mode: TransactionMode,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let behavior = match mode {
            TransactionMode::ReadOnly => TransactionBehavior::Deferred,
            TransactionMode::ReadWrite => TransactionBehavior::Immediate,
        };
        let tx = Transaction::new_unchecked(&self.conn, behavior)?;
        // Dropping `tx` without commit rolls back, which is exactly what an
        // early `?` return produces here.
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
