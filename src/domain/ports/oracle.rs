//! Port for the external text-generation capability ("role oracle").
//!
//! The engine depends only on this contract, never on a specific vendor.
//! Implementations own retry for transient transport failures; by the time
//! an error reaches the caller it is final for this invocation.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Terminal failure of one oracle invocation.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Transient signature (connection reset, premature close, timeout,
    /// throttling) that survived the bounded retry.
    #[error("transient failure exhausted retries: {0}")]
    Transient(String),

    /// Anything else: bad credentials, malformed request, server rejection.
    #[error("hard failure: {0}")]
    Hard(String),
}

/// One generation request: a persona's fixed instruction plus constructed
/// context, with an optional appended system note (forcing instruction,
/// regeneration note).
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub system_note: Option<String>,
    pub temperature: f64,
}

impl OracleRequest {
    /// Full system text: instruction template plus the optional note.
    pub fn system_text(&self) -> String {
        match &self.system_note {
            Some(note) => format!("{}\n\n{}", self.system_prompt, note),
            None => self.system_prompt.clone(),
        }
    }
}

/// Incrementally yielded text fragments; their concatenation equals the full
/// generated text.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, OracleError>> + Send>>;

#[async_trait]
pub trait RoleOracle: Send + Sync {
    /// Produce the full generated text in one piece (validation-retry path).
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError>;

    /// Produce the generated text as an incremental token stream.
    async fn stream(&self, request: OracleRequest) -> Result<TokenStream, OracleError>;
}
