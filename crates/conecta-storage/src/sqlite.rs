use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use conecta_core::connection::{ConnectionError, ConnectionFactory};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, instrument};

/// Fixed configuration identifier used by the application.
pub const DEFAULT_UNIT: &str = "conecta-itson";

/// SQLite-backed connection factory.
///
/// Holds one primary connection for its whole lifetime; every `connect` opens
/// a fresh, independent connection to the same database file.
pub struct SqliteConnectionFactory {
    path: PathBuf,
    primary: Mutex<Option<Connection>>,
}

impl SqliteConnectionFactory {
    /// Open (creating if needed) the database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(backend_err)?;
        }
        let primary = Connection::open(&path).map_err(backend_err)?;
        debug!("sqlite factory opened");
        Ok(Self {
            path,
            primary: Mutex::new(Some(primary)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    type Handle = Connection;

    fn connect(&self) -> Result<Connection, ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::ProviderClosed);
        }
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(backend_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(backend_err)?;
        Ok(conn)
    }

    fn is_open(&self) -> bool {
        self.primary
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn close(&self) -> Result<(), ConnectionError> {
        let mut guard = self.primary.lock().map_err(|err| ConnectionError::Backend {
            reason: format!("lock poisoned: {err}"),
        })?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, err)| backend_err(err))?;
            debug!(path = %self.path.display(), "sqlite factory closed");
        }
        Ok(())
    }
}

fn backend_err<E: ToString>(err: E) -> ConnectionError {
    ConnectionError::Backend {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use conecta_core::connection::ConnectionProvider;

    use super::*;

    #[test]
    fn handles_see_the_same_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let factory = SqliteConnectionFactory::open(dir.path().join("db/conecta.db")).expect("open");

        let writer = factory.connect().expect("connect");
        writer
            .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (5);")
            .expect("write");
        drop(writer);

        let reader = factory.connect().expect("connect");
        let v: i64 = reader
            .query_row("SELECT v FROM t", [], |row| row.get(0))
            .expect("read");
        assert_eq!(v, 5);
    }

    #[test]
    fn close_is_idempotent_and_blocks_new_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let factory = SqliteConnectionFactory::open(dir.path().join("conecta.db")).expect("open");
        assert!(factory.is_open());

        factory.close().expect("close");
        factory.close().expect("close again");
        assert!(!factory.is_open());
        assert!(matches!(factory.connect(), Err(ConnectionError::ProviderClosed)));
    }

    #[test]
    fn provider_over_sqlite_refuses_after_shutdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let factory = SqliteConnectionFactory::open(dir.path().join("conecta.db")).expect("open");
        let provider = ConnectionProvider::new(DEFAULT_UNIT, factory);

        provider.open_connection().expect("open before shutdown");
        provider.shutdown().expect("shutdown");
        provider.shutdown().expect("shutdown twice");
        assert!(matches!(
            provider.open_connection(),
            Err(ConnectionError::ProviderClosed)
        ));
    }
}
