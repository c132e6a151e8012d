//! Implementation of the `prodmind session` commands.

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::style;

use super::App;
use crate::cli::types::SessionCommands;
use crate::domain::models::Session;
use crate::domain::ports::DebateStore;
use crate::services::export::{export_to_json, export_to_markdown};

pub async fn execute(command: SessionCommands) -> Result<()> {
    let app = App::open().await?;
    match command {
        SessionCommands::New { idea, locale } => new_session(&app, idea, locale).await,
        SessionCommands::List => list_sessions(&app).await,
        SessionCommands::Show { id } => show_session(&app, &id).await,
        SessionCommands::Export { id, format, output } => {
            export_session(&app, &id, &format, output).await
        }
        SessionCommands::Delete { id } => delete_session(&app, &id).await,
    }
}

async fn new_session(app: &App, idea: String, locale: String) -> Result<()> {
    if idea.trim().is_empty() {
        bail!("the idea cannot be empty");
    }
    let session = Session::new(idea, locale);
    app.store.create_session(&session).await?;

    println!("{} {}", style("已创建会话").green().bold(), session.title);
    println!("  ID: {}", session.id);
    println!("  开始辩论：prodmind debate start {}", short_id(&session));
    Ok(())
}

async fn list_sessions(app: &App) -> Result<()> {
    let sessions = app.store.list_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions yet. Create one with `prodmind session new \"<idea>\"`.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "标题", "状态", "轮次", "阶段", "更新时间"]);
    for session in sessions {
        table.add_row(vec![
            Cell::new(short_id(&session)),
            Cell::new(&session.title),
            Cell::new(session.status.as_str()),
            Cell::new(format!("{}/5", session.current_round)),
            Cell::new(session.phase.as_str()),
            Cell::new(session.updated_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn show_session(app: &App, id: &str) -> Result<()> {
    let session = app.resolve_session(id).await?;
    let messages = app.store.list_messages(session.id).await?;
    let conflicts = app.store.list_conflicts(session.id).await?;
    print!("{}", export_to_markdown(&session, &messages, &conflicts));
    Ok(())
}

async fn export_session(
    app: &App,
    id: &str,
    format: &str,
    output: Option<std::path::PathBuf>,
) -> Result<()> {
    let session = app.resolve_session(id).await?;
    let messages = app.store.list_messages(session.id).await?;
    let conflicts = app.store.list_conflicts(session.id).await?;

    let rendered = match format {
        "json" => export_to_json(&session, &messages, &conflicts)?,
        _ => export_to_markdown(&session, &messages, &conflicts),
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

async fn delete_session(app: &App, id: &str) -> Result<()> {
    let session = app.resolve_session(id).await?;
    app.store.delete_session(session.id).await?;
    println!("Deleted session {} ({})", short_id(&session), session.title);
    Ok(())
}

fn short_id(session: &Session) -> String {
    session.id.to_string().chars().take(8).collect()
}
