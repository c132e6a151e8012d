//! Pure domain models for the debate engine.

pub mod action;
pub mod config;
pub mod conflict;
pub mod event;
pub mod message;
pub mod session;

pub use action::{Action, ActionKind};
pub use config::{Config, DatabaseConfig, DebateConfig, LoggingConfig, OracleConfig, RetryConfig};
pub use conflict::{ConflictChoice, ConflictEvent, ConflictRule};
pub use event::DebateEvent;
pub use message::{Message, Role};
pub use session::{DebatePhase, Session, SessionStatus, MAX_ROUNDS};
