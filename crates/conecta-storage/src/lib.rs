//! Concrete backends for the ConectaITSON core contracts.
//! AES-GCM attribute encryption with keys sourced from the OS keyring (or test
//! doubles), and a SQLite connection factory.

pub mod aes_cipher;
pub mod key_provider;
pub mod sqlite;
