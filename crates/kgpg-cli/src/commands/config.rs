use crate::GlobalOpts;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use kgpg_config::Config;
use kgpg_logger as logger;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective settings from kgpg.toml
    Show,
    /// Set a key in kgpg.toml (plugin-dir, output-dir, repo-owner, ...)
    Set { key: String, value: String },
    /// Print the resolved kgpg.toml path
    Path,
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<()> {
    let root = opts.project_root();
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = Config::load(&root).context("Failed to load config")?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                println!("  {}", "(defaults)".yellow());
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(&root).context("Failed to load config")?;
            config.set(&key, value.clone()).with_context(|| {
                format!("Supported keys: {}", Config::known_keys().join(", "))
            })?;
            config.save(&root).context("Failed to save config")?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            let path = Config::path(&root);
            logger::debug(&format!("Reading config from: {}", path.display()));
            println!("{}", path.display());
        }
    }
    Ok(())
}
