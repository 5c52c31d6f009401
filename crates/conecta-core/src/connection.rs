use std::{
    fmt,
    sync::{Arc, Mutex, RwLock},
};

use thiserror::Error;
use tracing::{debug, info};

/// Errors produced by connection factories and the provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The provider was shut down; no further handles are issued.
    #[error("connection provider is closed")]
    ProviderClosed,
    /// Underlying storage failure.
    #[error("storage backend failure: {reason}")]
    Backend { reason: String },
}

/// Long-lived resource able to produce per-operation connection handles.
pub trait ConnectionFactory: Send + Sync {
    /// Short-lived handle owned by the caller; released when dropped.
    type Handle: Send;

    /// Open a new, independent handle.
    fn connect(&self) -> Result<Self::Handle, ConnectionError>;

    /// Whether the factory still holds its underlying resources.
    fn is_open(&self) -> bool;

    /// Release the underlying resources (idempotent).
    fn close(&self) -> Result<(), ConnectionError>;
}

/// Owns the single storage factory for the process and hands out handles.
///
/// `open_connection` calls share a read lock, so they may run concurrently;
/// `shutdown` takes the write lock, so no handle creation begins after it
/// completes and creations already in flight finish first.
pub struct ConnectionProvider<F: ConnectionFactory> {
    unit: String,
    factory: F,
    closed: RwLock<bool>,
}

impl<F: ConnectionFactory> fmt::Debug for ConnectionProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let closed = match self.closed.read() {
            Ok(closed) => *closed,
            Err(poisoned) => *poisoned.into_inner(),
        };
        f.debug_struct("ConnectionProvider")
            .field("unit", &self.unit)
            .field("closed", &closed)
            .finish()
    }
}

impl<F: ConnectionFactory> ConnectionProvider<F> {
    pub fn new(unit: impl Into<String>, factory: F) -> Self {
        Self {
            unit: unit.into(),
            factory,
            closed: RwLock::new(false),
        }
    }

    /// Configuration identifier this provider was built for.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn open_connection(&self) -> Result<F::Handle, ConnectionError> {
        let closed = self.closed.read().map_err(|err| ConnectionError::Backend {
            reason: format!("lock poisoned: {err}"),
        })?;
        if *closed {
            return Err(ConnectionError::ProviderClosed);
        }
        self.factory.connect()
    }

    /// Release the factory. Safe to call any number of times.
    pub fn shutdown(&self) -> Result<(), ConnectionError> {
        let mut closed = self.closed.write().map_err(|err| ConnectionError::Backend {
            reason: format!("lock poisoned: {err}"),
        })?;
        if *closed {
            debug!(unit = %self.unit, "connection provider already closed");
            return Ok(());
        }
        // Mark closed first: a failing close must not leave handles flowing.
        *closed = true;
        if self.factory.is_open() {
            self.factory.close()?;
        }
        info!(unit = %self.unit, "connection provider shut down");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        match self.closed.read() {
            Ok(closed) => !*closed && self.factory.is_open(),
            Err(_) => false,
        }
    }
}

/// Process-wide home for one [`ConnectionProvider`].
///
/// Usable as a `static`; the composition root decides how the factory is
/// built. Construction runs under a lock so only one factory is ever created.
pub struct ProviderSlot<F: ConnectionFactory> {
    inner: Mutex<Option<Arc<ConnectionProvider<F>>>>,
}

impl<F: ConnectionFactory> ProviderSlot<F> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Return the provider, building it on first call with `build`.
    /// A failed build propagates and leaves the slot empty.
    pub fn instance<E>(
        &self,
        build: impl FnOnce() -> Result<ConnectionProvider<F>, E>,
    ) -> Result<Arc<ConnectionProvider<F>>, E>
    where
        E: From<ConnectionError>,
    {
        let mut guard = self.inner.lock().map_err(|err| {
            E::from(ConnectionError::Backend {
                reason: format!("lock poisoned: {err}"),
            })
        })?;
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let provider = Arc::new(build()?);
        info!(unit = %provider.unit(), "connection provider created");
        *guard = Some(Arc::clone(&provider));
        Ok(provider)
    }

    /// The provider, if it has been built.
    pub fn get(&self) -> Option<Arc<ConnectionProvider<F>>> {
        // A poisoned lock still holds a valid slot.
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<F: ConnectionFactory> Default for ProviderSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}
