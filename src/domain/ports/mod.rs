//! Ports: traits the engine depends on, implemented by infrastructure.

pub mod oracle;
pub mod store;

pub use oracle::{OracleError, OracleRequest, RoleOracle, TokenStream};
pub use store::DebateStore;
