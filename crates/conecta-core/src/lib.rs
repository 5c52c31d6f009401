//! Core abstractions for ConectaITSON: cipher, codec, connection-provider and
//! student repository contracts. This crate does no I/O; concrete backends live
//! in `conecta-storage` and `conecta-records`.

pub mod cipher;
pub mod codec;
pub mod connection;
pub mod diagnostics;
pub mod policy;
pub mod students;
