use crate::index::{generate_catalog, write_index};
use crate::GlobalOpts;
use anyhow::Result;
use clap::Args;
use colored::*;
use kgpg_config::release::read_manifest_version;
use kgpg_config::{Config, ReleaseEnv, ReleaseInfo, ReleaseOverrides};
use kgpg_logger as logger;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct IndexCommand {
    /// Repository owner (default: $GITHUB_REPOSITORY_OWNER, config, kabegame)
    #[arg(long, value_name = "OWNER")]
    pub repo_owner: Option<String>,

    /// Repository name (default: from $GITHUB_REPOSITORY, config, crawler-plugins)
    #[arg(long, value_name = "NAME")]
    pub repo_name: Option<String>,

    /// Release tag (default: $GITHUB_REF_NAME when release-shaped, else package.json version)
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Directory holding the built archives; index.json is written here
    #[arg(
        long = "out-dir",
        visible_alias = "output-dir",
        aliases = ["outDir", "outdir", "outputDir"],
        value_name = "DIR"
    )]
    pub out_dir: Option<PathBuf>,
}

pub async fn handle_index(cmd: IndexCommand, opts: &GlobalOpts, env: &ReleaseEnv) -> Result<()> {
    let root = opts.project_root();
    let config = Config::load_or_default(&root);

    let manifest_path = config.release_manifest_path(&root);
    let manifest_version = read_manifest_version(&manifest_path);
    let overrides = ReleaseOverrides {
        tag: cmd.tag,
        repo_owner: cmd.repo_owner,
        repo_name: cmd.repo_name,
    };
    let release = ReleaseInfo::resolve(&overrides, env, &config, manifest_version.as_deref());

    println!("{}", "Generating plugin index".bold());
    println!("  {} {}/{}", "repository:".cyan(), release.owner, release.name);
    println!(
        "  {} {}",
        "manifest version:".cyan(),
        manifest_version.as_deref().unwrap_or("(none)")
    );
    println!("  {} {}", "release tag:".cyan(), release.tag);

    let output_dir = cmd.out_dir.unwrap_or_else(|| config.output_dir(&root));
    let catalog = generate_catalog(
        &config.plugin_dir(&root),
        &config.excluded_dirs(),
        &output_dir,
        &release,
    )
    .await?;
    let path = write_index(&catalog, &output_dir)?;

    logger::success(&format!(
        "Index written to {} ({} plugins)",
        path.display(),
        catalog.len()
    ));
    Ok(())
}
