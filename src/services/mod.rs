//! Debate orchestration services.
//!
//! `engine` is the root state machine; everything else here is either a pure
//! text function (`rules`, `convergence`, `history`, `sections`, `export`) or
//! a thin wrapper over the oracle port (`invoker`, `personas`).

pub mod convergence;
pub mod engine;
pub mod export;
pub mod history;
pub mod invoker;
pub mod personas;
pub mod rules;
pub mod sections;

pub use engine::DebateEngine;
