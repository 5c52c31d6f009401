use std::{path::PathBuf, sync::Arc};

use color_eyre::{
    eyre::{bail, eyre},
    Result,
};
use conecta_core::{
    cipher::Cipher,
    codec::{AttributeCodec, IntegerCodec, TextCodec},
    connection::{ConnectionError, ConnectionProvider, ProviderSlot},
    diagnostics::{DiagnosticSink, RecordingSink, TracingSink},
};
use conecta_records::SqliteStudentRepo;
use conecta_storage::{
    aes_cipher::AesGcmCipher,
    key_provider::{KeyProvider, KeyringProvider},
    sqlite::SqliteConnectionFactory,
};
use dirs::data_dir;
use tracing::debug;

use crate::config::Config;

/// The one provider for this process.
static PROVIDER: ProviderSlot<SqliteConnectionFactory> = ProviderSlot::new();

pub type StudentRepo<C> = SqliteStudentRepo<SqliteConnectionFactory, C>;

/// Resolve the default data directory for ConectaITSON.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| eyre!("no data dir available"))?;
    Ok(base.join("conecta"))
}

/// Database location, honoring the config override.
pub fn database_path(config: &Config) -> Result<PathBuf> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    Ok(root.join(&config.storage.database))
}

/// Composition root: owns the connection provider, the cipher and the
/// diagnostic sink, and wires them into repositories.
pub struct App<C: Cipher> {
    provider: Arc<ConnectionProvider<SqliteConnectionFactory>>,
    cipher: Arc<C>,
    sink: Arc<dyn DiagnosticSink>,
}

impl App<AesGcmCipher> {
    /// Production wiring: process-wide provider, keyring-backed AES-GCM key.
    pub async fn start(config: &Config) -> Result<Self> {
        let path = database_path(config)?;
        debug!(path = %path.display(), "initializing connection provider");
        let provider = PROVIDER
            .instance(|| {
                let factory = SqliteConnectionFactory::open(&path)?;
                Ok::<_, ConnectionError>(ConnectionProvider::new(
                    config.storage.unit.clone(),
                    factory,
                ))
            })
            .map_err(|e| eyre!(e.to_string()))?;

        let key = KeyringProvider::new(&config.keyring.service, &config.keyring.account)
            .get_or_create()
            .await
            .map_err(|e| eyre!(e.to_string()))?;
        let cipher = AesGcmCipher::new(&key).map_err(|e| eyre!(e.to_string()))?;

        Ok(Self::with_parts(provider, Arc::new(cipher), Arc::new(TracingSink)))
    }
}

impl<C: Cipher> App<C> {
    pub fn with_parts(
        provider: Arc<ConnectionProvider<SqliteConnectionFactory>>,
        cipher: Arc<C>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            provider,
            cipher,
            sink,
        }
    }

    pub fn students(&self) -> Result<StudentRepo<C>> {
        SqliteStudentRepo::new(self.provider.clone(), self.cipher.clone(), self.sink.clone())
            .map_err(|e| eyre!("{e:#}"))
    }

    /// Check storage and the encryption round trip. Returns the unit name.
    pub fn health(&self) -> Result<String> {
        let conn = self
            .provider
            .open_connection()
            .map_err(|e| eyre!(e.to_string()))?;
        let one: i64 = conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .map_err(|e| eyre!(e.to_string()))?;
        if one != 1 {
            bail!("storage check returned {one}");
        }

        let checks = RecordingSink::new();
        let int = IntegerCodec::new("health.integer", self.cipher.clone(), Arc::new(checks.clone()));
        let text = TextCodec::new("health.text", self.cipher.clone(), Arc::new(checks.clone()));

        let stored = int.to_storage(Some(&42)).map_err(|e| eyre!(e.to_string()))?;
        let stored_text = text
            .to_storage(Some(&"ok".to_string()))
            .map_err(|e| eyre!(e.to_string()))?;
        if int.from_storage(stored.as_deref()) != Some(42)
            || text.from_storage(stored_text.as_deref()).as_deref() != Some("ok")
            || !checks.is_empty()
        {
            bail!("encryption round-trip failed");
        }
        Ok(self.provider.unit().to_string())
    }

    /// Release the provider; safe to call more than once.
    pub fn shutdown(&self) -> Result<()> {
        self.provider.shutdown().map_err(|e| eyre!(e.to_string()))
    }
}

/// Helper for tests: a private provider rooted at `root` with a pinned in-memory key.
#[cfg(test)]
pub async fn test_app(root: &std::path::Path) -> App<AesGcmCipher> {
    use conecta_storage::key_provider::InMemoryKeyProvider;

    let factory = SqliteConnectionFactory::open(root.join("conecta.db")).expect("open factory");
    let key = InMemoryKeyProvider::with_key([5u8; 32])
        .get_or_create()
        .await
        .expect("key");
    let cipher = AesGcmCipher::new(&key).expect("cipher");
    App::with_parts(
        Arc::new(ConnectionProvider::new("conecta-test", factory)),
        Arc::new(cipher),
        Arc::new(RecordingSink::new()),
    )
}
