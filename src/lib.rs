//! ProdMind - Adversarial Debate Engine
//!
//! ProdMind pressure-tests a product idea by driving four scripted personas
//! (architect, assassin, user-ghost, grounder) through up to five rounds of
//! structured debate, mechanically detecting known failure modes — false
//! consensus, unfalsifiable claims, technology-capability deflection — and
//! scoring how stable the surviving hypotheses are across rounds.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the oracle/store ports
//! - **Service Layer** (`services`): the phase state machine, conflict rules,
//!   convergence scorer, and invocation controller
//! - **Infrastructure Layer** (`infrastructure`): configuration loading, the
//!   `SQLite` store, and the HTTP oracle client
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use prodmind::domain::models::{Action, ActionKind, Session};
//! use prodmind::services::DebateEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Build an engine from a store, an oracle, and debate config,
//!     // then feed it actions one at a time.
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DebateError, DebateResult};
pub use domain::models::{
    Action, ActionKind, Config, ConflictChoice, ConflictEvent, ConflictRule, DatabaseConfig,
    DebateConfig, DebateEvent, DebatePhase, LoggingConfig, Message, OracleConfig, RetryConfig,
    Role, Session, SessionStatus, MAX_ROUNDS,
};
pub use domain::ports::{DebateStore, OracleError, OracleRequest, RoleOracle, TokenStream};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::DebateEngine;
