//! Port for the session store.
//!
//! The store is mutated only by the debate engine; the conflict detector and
//! convergence scorer are pure functions over data read from here. Messages
//! and conflict events are append-only (a conflict event is updated exactly
//! once, to attach the user's resolution).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DebateResult;
use crate::domain::models::{ConflictEvent, Message, Role, Session};

#[async_trait]
pub trait DebateStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> DebateResult<()>;

    async fn get_session(&self, id: Uuid) -> DebateResult<Option<Session>>;

    async fn update_session(&self, session: &Session) -> DebateResult<()>;

    async fn list_sessions(&self) -> DebateResult<Vec<Session>>;

    async fn delete_session(&self, id: Uuid) -> DebateResult<()>;

    /// Appends a message, returning it with the store-assigned insertion id.
    async fn append_message(&self, message: &Message) -> DebateResult<Message>;

    /// All messages for a session ordered by (round, insertion id).
    async fn list_messages(&self, session_id: Uuid) -> DebateResult<Vec<Message>>;

    /// Messages for one role in one round, in insertion order.
    async fn messages_by_role(
        &self,
        session_id: Uuid,
        round: u32,
        role: Role,
    ) -> DebateResult<Vec<Message>>;

    async fn append_conflict(&self, event: &ConflictEvent) -> DebateResult<ConflictEvent>;

    /// All conflict events for a session ordered by (round, insertion id).
    async fn list_conflicts(&self, session_id: Uuid) -> DebateResult<Vec<ConflictEvent>>;

    /// Attaches the user's resolution to a conflict event.
    async fn resolve_conflict(&self, event_id: i64, user_choice: &str) -> DebateResult<()>;
}
