//! Implementation of the `prodmind init` command.

use anyhow::{Context, Result};
use tokio::fs;

use crate::domain::models::Config;
use crate::infrastructure::database::DatabaseConnection;

pub async fn execute(force: bool) -> Result<()> {
    let dir = std::path::Path::new(".prodmind");
    let config_path = dir.join("config.yaml");

    if config_path.exists() && !force {
        println!("Already initialized. Use --force to overwrite .prodmind/config.yaml.");
        return Ok(());
    }

    fs::create_dir_all(dir).await.context("failed to create .prodmind directory")?;

    let defaults = Config::default();
    let yaml =
        serde_yaml::to_string(&defaults).context("failed to serialize default configuration")?;
    let contents = format!(
        "# ProdMind configuration. Values here are overridden by\n\
         # .prodmind/local.yaml and PRODMIND_* environment variables\n\
         # (e.g. PRODMIND_ORACLE__API_KEY).\n{yaml}"
    );
    fs::write(&config_path, contents).await.context("failed to write config.yaml")?;

    let db = DatabaseConnection::new(&defaults.database.url, defaults.database.max_connections)
        .await
        .context("failed to initialize database")?;
    db.migrate().await?;

    println!("Initialized .prodmind/config.yaml and {}", defaults.database.url);
    println!("Set your API key: export PRODMIND_ORACLE__API_KEY=sk-...");
    Ok(())
}
