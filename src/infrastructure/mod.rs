//! Adapters behind the domain ports: configuration loading, the `SQLite`
//! store, and the HTTP oracle client.

pub mod config;
pub mod database;
pub mod oracle;
