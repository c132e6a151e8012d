pub mod client;
pub mod error;
pub mod retry;
pub mod sse;

pub use client::OracleClient;
pub use retry::RetryPolicy;
