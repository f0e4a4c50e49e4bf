// permscope-api: Async Rust client for the permscope audit service REST API.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::AuditClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
