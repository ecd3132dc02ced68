//! Common utilities shared across database drivers.
//!
//! - [`tls`]: TLS configuration for PostgreSQL and MySQL connections

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
