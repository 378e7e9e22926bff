//! Shared application state.
//!
//! `CoreState` is the single handle every request sees. It owns no open
//! connection: each request opens its own SQLite connection, so there is
//! no in-process mutable state besides the token store in `ApiContext`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

pub struct CoreState {
    db_path: PathBuf,
    started_at: Instant,
}

impl CoreState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            started_at: Instant::now(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Create the data directory and bring the schema up to date.
    pub fn initialize(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.open_db()?;
        let tables = db::count_tables(&conn)?;
        tracing::info!(path = %self.db_path.display(), tables, "Database ready");
        Ok(())
    }

    /// Open a database connection. Most common operation in handlers.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("hillcrest.db");
        let core = CoreState::new(&path);
        core.initialize().unwrap();
        assert!(path.exists());
        assert_eq!(core.db_path(), path.as_path());
    }

    #[test]
    fn connections_share_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::new(dir.path().join("hillcrest.db"));
        core.initialize().unwrap();

        let conn = core.open_db().unwrap();
        db::insert_department(&conn, "Cardiology").unwrap();
        drop(conn);

        let conn = core.open_db().unwrap();
        assert_eq!(db::list_departments(&conn).unwrap().len(), 1);
    }
}
