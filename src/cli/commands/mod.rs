pub mod config;
pub mod debate;
pub mod init;
pub mod session;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::domain::models::{Config, Session};
use crate::domain::ports::DebateStore;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::database::{DatabaseConnection, SqliteDebateStore};
use crate::infrastructure::oracle::OracleClient;
use crate::services::DebateEngine;

/// Shared command context: loaded configuration plus an opened store.
pub(crate) struct App {
    pub config: Config,
    pub store: Arc<SqliteDebateStore>,
}

impl App {
    pub async fn open() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let db = DatabaseConnection::new(&config.database.url, config.database.max_connections)
            .await
            .context("failed to open database (run `prodmind init` first?)")?;
        db.migrate().await?;
        let store = Arc::new(SqliteDebateStore::new(db.pool().clone()));
        Ok(Self { config, store })
    }

    /// Builds the debate engine; fails fast when no API key is configured.
    pub fn engine(&self) -> Result<DebateEngine> {
        let oracle = OracleClient::new(&self.config.oracle, &self.config.retry)?;
        Ok(DebateEngine::new(
            self.store.clone() as Arc<dyn DebateStore>,
            Arc::new(oracle),
            self.config.debate.clone(),
        ))
    }

    /// Resolves a full UUID or a unique prefix to a session.
    pub async fn resolve_session(&self, input: &str) -> Result<Session> {
        if let Ok(id) = Uuid::parse_str(input) {
            return self
                .store
                .get_session(id)
                .await?
                .with_context(|| format!("no session with id {input}"));
        }

        let sessions = self.store.list_sessions().await?;
        let mut matches: Vec<Session> = sessions
            .into_iter()
            .filter(|s| s.id.to_string().starts_with(input))
            .collect();
        match matches.len() {
            0 => bail!("no session matches prefix {input}"),
            1 => Ok(matches.swap_remove(0)),
            n => bail!("prefix {input} is ambiguous ({n} sessions match)"),
        }
    }
}
