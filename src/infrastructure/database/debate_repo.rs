//! `SQLite` implementation of the session store port.
//!
//! All temporal and identifier columns are stored as TEXT (RFC 3339 / UUID
//! strings); rows are converted through intermediate structs so a corrupt
//! column surfaces as a store error instead of a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DebateError, DebateResult};
use crate::domain::models::{
    ConflictEvent, ConflictRule, DebatePhase, Message, Role, Session, SessionStatus,
};
use crate::domain::ports::DebateStore;

pub struct SqliteDebateStore {
    pool: SqlitePool,
}

impl SqliteDebateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    title: String,
    idea: String,
    status: String,
    current_round: i64,
    debate_phase: String,
    locale: String,
    created_at: String,
    updated_at: String,
}

fn parse_timestamp(column: &str, value: &str) -> DebateResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DebateError::StoreError(format!("invalid {column} timestamp {value}: {e}")))
}

fn parse_uuid(value: &str) -> DebateResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| DebateError::StoreError(format!("invalid session id {value}: {e}")))
}

fn parse_round(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl TryFrom<SessionRow> for Session {
    type Error = DebateError;

    fn try_from(row: SessionRow) -> DebateResult<Self> {
        Ok(Session {
            id: parse_uuid(&row.id)?,
            title: row.title,
            idea: row.idea,
            status: SessionStatus::parse(&row.status)
                .ok_or_else(|| DebateError::StoreError(format!("unknown status {}", row.status)))?,
            current_round: parse_round(row.current_round),
            phase: DebatePhase::parse(&row.debate_phase).ok_or_else(|| {
                DebateError::StoreError(format!("unknown phase {}", row.debate_phase))
            })?,
            locale: row.locale,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    session_id: String,
    round: i64,
    role: String,
    content: String,
    metadata: Option<String>,
    created_at: String,
}

impl TryFrom<MessageRow> for Message {
    type Error = DebateError;

    fn try_from(row: MessageRow) -> DebateResult<Self> {
        Ok(Message {
            id: row.id,
            session_id: parse_uuid(&row.session_id)?,
            round: parse_round(row.round),
            role: Role::parse(&row.role)
                .ok_or_else(|| DebateError::StoreError(format!("unknown role {}", row.role)))?,
            content: row.content,
            metadata: row.metadata,
            created_at: parse_timestamp("created_at", &row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConflictRow {
    id: i64,
    session_id: String,
    round: i64,
    rule_type: String,
    detail: String,
    user_choice: Option<String>,
    created_at: String,
}

impl TryFrom<ConflictRow> for ConflictEvent {
    type Error = DebateError;

    fn try_from(row: ConflictRow) -> DebateResult<Self> {
        Ok(ConflictEvent {
            id: row.id,
            session_id: parse_uuid(&row.session_id)?,
            round: parse_round(row.round),
            rule: ConflictRule::parse(&row.rule_type).ok_or_else(|| {
                DebateError::StoreError(format!("unknown rule type {}", row.rule_type))
            })?,
            detail: row.detail,
            user_choice: row.user_choice,
            created_at: parse_timestamp("created_at", &row.created_at)?,
        })
    }
}

#[async_trait]
impl DebateStore for SqliteDebateStore {
    async fn create_session(&self, session: &Session) -> DebateResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, title, idea, status, current_round, debate_phase, locale, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(&session.title)
        .bind(&session.idea)
        .bind(session.status.as_str())
        .bind(i64::from(session.current_round))
        .bind(session.phase.as_str())
        .bind(&session.locale)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> DebateResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Session::try_from).transpose()
    }

    async fn update_session(&self, session: &Session) -> DebateResult<()> {
        sqlx::query(
            "UPDATE sessions
             SET title = ?, status = ?, current_round = ?, debate_phase = ?, locale = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&session.title)
        .bind(session.status.as_str())
        .bind(i64::from(session.current_round))
        .bind(session.phase.as_str())
        .bind(&session.locale)
        .bind(Utc::now().to_rfc3339())
        .bind(session.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_sessions(&self) -> DebateResult<Vec<Session>> {
        let rows =
            sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Session::try_from).collect()
    }

    async fn delete_session(&self, id: Uuid) -> DebateResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> DebateResult<Message> {
        let result = sqlx::query(
            "INSERT INTO messages (session_id, round, role, content, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.session_id.to_string())
        .bind(i64::from(message.round))
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.metadata)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let mut stored = message.clone();
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn list_messages(&self, session_id: Uuid) -> DebateResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE session_id = ? ORDER BY round, id",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn messages_by_role(
        &self,
        session_id: Uuid,
        round: u32,
        role: Role,
    ) -> DebateResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE session_id = ? AND round = ? AND role = ? ORDER BY id",
        )
        .bind(session_id.to_string())
        .bind(i64::from(round))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn append_conflict(&self, event: &ConflictEvent) -> DebateResult<ConflictEvent> {
        let result = sqlx::query(
            "INSERT INTO conflict_events (session_id, round, rule_type, detail, user_choice, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.session_id.to_string())
        .bind(i64::from(event.round))
        .bind(event.rule.as_str())
        .bind(&event.detail)
        .bind(&event.user_choice)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let mut stored = event.clone();
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn list_conflicts(&self, session_id: Uuid) -> DebateResult<Vec<ConflictEvent>> {
        let rows = sqlx::query_as::<_, ConflictRow>(
            "SELECT * FROM conflict_events WHERE session_id = ? ORDER BY round, id",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ConflictEvent::try_from).collect()
    }

    async fn resolve_conflict(&self, event_id: i64, user_choice: &str) -> DebateResult<()> {
        sqlx::query("UPDATE conflict_events SET user_choice = ? WHERE id = ?")
            .bind(user_choice)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;

    async fn store() -> SqliteDebateStore {
        let db = DatabaseConnection::new("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        SqliteDebateStore::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("prodmind.db").display());

        let session = Session::new("做一个代码审查工具", "zh");
        {
            let db = DatabaseConnection::new(&url, 1).await.unwrap();
            db.migrate().await.unwrap();
            let store = SqliteDebateStore::new(db.pool().clone());
            store.create_session(&session).await.unwrap();
            db.pool().close().await;
        }

        let db = DatabaseConnection::new(&url, 1).await.unwrap();
        db.migrate().await.unwrap();
        let store = SqliteDebateStore::new(db.pool().clone());
        let loaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.idea, session.idea);
        assert_eq!(loaded.phase, DebatePhase::Idle);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let store = store().await;
        let mut session = Session::new("做一个代码审查工具", "zh");
        store.create_session(&session).await.unwrap();

        let loaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.idea, session.idea);
        assert_eq!(loaded.phase, DebatePhase::Idle);

        session.current_round = 2;
        session.phase = DebatePhase::Grounding;
        store.update_session(&session).await.unwrap();
        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.current_round, 2);
        assert_eq!(updated.phase, DebatePhase::Grounding);
    }

    #[tokio::test]
    async fn test_missing_session_is_none() {
        let store = store().await;
        assert!(store.get_session(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_messages_keep_insertion_order_within_round() {
        let store = store().await;
        let session = Session::new("idea", "zh");
        store.create_session(&session).await.unwrap();

        for (role, content) in [
            (Role::Architect, "定义"),
            (Role::User, "确认"),
            (Role::Assassin, "攻击"),
        ] {
            store.append_message(&Message::new(session.id, 1, role, content)).await.unwrap();
        }
        store.append_message(&Message::new(session.id, 2, Role::Architect, "二")).await.unwrap();

        let messages = store.list_messages(session.id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["定义", "确认", "攻击", "二"]);

        let assassins = store.messages_by_role(session.id, 1, Role::Assassin).await.unwrap();
        assert_eq!(assassins.len(), 1);
        assert!(assassins[0].id > 0);
    }

    #[tokio::test]
    async fn test_conflict_resolution_is_persisted() {
        let store = store().await;
        let session = Session::new("idea", "zh");
        store.create_session(&session).await.unwrap();

        let event = store
            .append_conflict(&ConflictEvent::new(
                session.id,
                1,
                ConflictRule::ConsensusAlert,
                "All roles converging",
            ))
            .await
            .unwrap();
        store.resolve_conflict(event.id, "force_opposition").await.unwrap();

        let conflicts = store.list_conflicts(session.id).await.unwrap();
        assert_eq!(conflicts[0].user_choice.as_deref(), Some("force_opposition"));
    }

    #[tokio::test]
    async fn test_delete_session_cascades_to_messages() {
        let store = store().await;
        let session = Session::new("idea", "zh");
        store.create_session(&session).await.unwrap();
        store.append_message(&Message::new(session.id, 1, Role::User, "x")).await.unwrap();

        store.delete_session(session.id).await.unwrap();
        assert!(store.get_session(session.id).await.unwrap().is_none());
        assert!(store.list_messages(session.id).await.unwrap().is_empty());
    }
}
