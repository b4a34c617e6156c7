pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod init;
pub mod remote;
pub mod summary;
pub mod versions;

/// `User-Agent` sent to the gateway API and the blocklist hosts.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
