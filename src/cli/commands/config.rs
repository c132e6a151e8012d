//! Implementation of the `prodmind config` command.

use anyhow::{Context, Result};

use crate::infrastructure::config::{mask_api_key, ConfigLoader};

pub fn execute() -> Result<()> {
    let mut config = ConfigLoader::load()?;
    config.oracle.api_key = mask_api_key(&config.oracle.api_key);
    let yaml = serde_yaml::to_string(&config).context("failed to render configuration")?;
    print!("{yaml}");
    Ok(())
}
