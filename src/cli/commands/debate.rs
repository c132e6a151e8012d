//! Implementation of the `prodmind debate` commands.
//!
//! Each subcommand maps to one engine action; events are rendered live while
//! the action runs.

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::App;
use crate::cli::render::EventRenderer;
use crate::cli::types::DebateCommands;
use crate::domain::models::{Action, ActionKind, ConflictChoice};
use crate::services::DebateEngine;

pub async fn execute(command: DebateCommands) -> Result<()> {
    let app = App::open().await?;
    let engine = app.engine()?;

    let (id, action) = match command {
        DebateCommands::Start { id } => (id, ActionBuilder::plain(ActionKind::StartRound)),
        DebateCommands::Next { id } => (id, ActionBuilder::plain(ActionKind::NextRound)),
        DebateCommands::Confirm { id, content } => {
            (id, ActionBuilder::with_content(ActionKind::UserConfirm, content))
        }
        DebateCommands::Respond { id, content } => {
            (id, ActionBuilder::with_content(ActionKind::UserResponse, content))
        }
        DebateCommands::Choice { id, choice, content } => {
            let choice = ConflictChoice::parse(&choice)
                .with_context(|| format!("unknown choice {choice}"))?;
            (id, ActionBuilder::choice(choice, content))
        }
        DebateCommands::End { id } => (id, ActionBuilder::plain(ActionKind::EndSession)),
    };

    let session = app.resolve_session(&id).await?;
    run_action(&engine, action.build(session.id)).await
}

/// Deferred action construction: the session id is resolved after parsing.
enum ActionBuilder {
    Plain(ActionKind),
    Content(ActionKind, String),
    Choice(ConflictChoice, Option<String>),
}

impl ActionBuilder {
    fn plain(kind: ActionKind) -> Self {
        Self::Plain(kind)
    }

    fn with_content(kind: ActionKind, content: String) -> Self {
        Self::Content(kind, content)
    }

    fn choice(choice: ConflictChoice, content: Option<String>) -> Self {
        Self::Choice(choice, content)
    }

    fn build(self, session_id: uuid::Uuid) -> Action {
        match self {
            Self::Plain(kind) => Action::new(session_id, kind),
            Self::Content(kind, content) => Action::new(session_id, kind).with_content(content),
            Self::Choice(choice, content) => {
                let action = Action::new(session_id, ActionKind::ConflictChoice).with_choice(choice);
                match content {
                    Some(content) => action.with_content(content),
                    None => action,
                }
            }
        }
    }
}

/// Runs one action, rendering its event stream as it happens.
async fn run_action(engine: &DebateEngine, action: Action) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(async move {
        let mut renderer = EventRenderer::default();
        while let Some(event) = rx.recv().await {
            renderer.render(&event);
        }
    });

    let result = engine.process(action, &tx).await;
    drop(tx);
    renderer.await.context("event renderer task failed")?;
    result?;
    Ok(())
}
