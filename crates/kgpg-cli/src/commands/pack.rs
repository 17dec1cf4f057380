use crate::batch::{BatchMode, BatchOptions, BatchReport, BatchRunner};
use crate::GlobalOpts;
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args};
use colored::*;
use kgpg_config::{Config, PatternSpec};
use kgpg_logger as logger;
use kgpg_pack::{ArchiveBackend, ArchiveBuilder, ExternalPacker, PackageFormat, ZipBackend};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone, Default)]
pub struct PackCommand {
    /// Package only this plugin (directory name under plugins/)
    #[arg(conflicts_with = "only")]
    pub plugin: Option<String>,

    /// Package an allow-list of plugins; comma-separated and repeatable
    #[arg(
        long,
        visible_alias = "plugins",
        value_name = "NAMES",
        num_args = 1..,
        action = ArgAction::Append
    )]
    pub only: Vec<String>,

    /// Output directory for archives and icon side-files
    #[arg(
        long = "out-dir",
        visible_alias = "output-dir",
        aliases = ["outDir", "outdir", "outputDir"],
        value_name = "DIR"
    )]
    pub out_dir: Option<PathBuf>,

    /// Write only .kgpg archives, no <id>.icon.png side-files
    #[arg(long, alias = "kgpgOnly")]
    pub kgpg_only: bool,

    /// Container format: v1 (plain zip) or v2 (zip with 64 KiB header)
    #[arg(long, value_name = "v1|v2")]
    pub format: Option<String>,

    /// External packer executable used instead of the built-in zip writer
    #[arg(long, value_name = "PATH")]
    pub packer: Option<String>,

    /// Drop doc_root images that doc.md does not reference
    #[arg(long)]
    pub prune_doc_images: bool,
}

fn select_backend(cmd: &PackCommand, config: &Config) -> Result<Arc<dyn ArchiveBackend>> {
    let packer = cmd
        .packer
        .clone()
        .or_else(|| config.packer.clone())
        .filter(|p| !p.trim().is_empty());
    match packer {
        Some(program) => {
            let packer = ExternalPacker::locate(&program)?;
            logger::debug(&format!("Using external packer {}", packer.program().display()));
            Ok(Arc::new(packer))
        }
        None => Ok(Arc::new(ZipBackend::new())),
    }
}

fn select_format(cmd: &PackCommand, config: &Config) -> Result<PackageFormat> {
    match cmd.format.as_deref().or(config.package_format.as_deref()) {
        Some(value) => value.parse().context("invalid --format"),
        None => Ok(PackageFormat::default()),
    }
}

pub fn print_summary(report: &BatchReport) {
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} {}", "succeeded:".green(), report.success_count());
    if report.has_failures() {
        println!("  {} {}", "failed:".red(), report.failure_count());
        for outcome in report.outcomes.iter().filter(|o| !o.success) {
            println!(
                "    {} {}",
                outcome.name.red(),
                outcome.error.as_deref().unwrap_or_default()
            );
        }
        logger::show_log_path();
    }
    println!("{} {}", "Output directory:".cyan(), report.output_dir.display());
}

pub async fn handle_pack(cmd: PackCommand, opts: &GlobalOpts) -> Result<()> {
    let root = opts.project_root();
    let config = Config::load_or_default(&root);

    let output_dir = match &cmd.out_dir {
        Some(dir) => {
            logger::info(&format!("Using output directory {}", dir.display()));
            dir.clone()
        }
        None => config.output_dir(&root),
    };
    if cmd.kgpg_only {
        logger::info("Writing .kgpg archives only (no icon side-files)");
    }

    let builder = ArchiveBuilder::new(
        select_backend(&cmd, &config)?,
        select_format(&cmd, &config)?,
    );
    let options = BatchOptions {
        plugin_root: config.plugin_dir(&root),
        output_dir,
        excluded_dirs: config.excluded_dirs(),
        patterns: PatternSpec::load_or_default(&Config::project_file(&root)),
        kgpg_only: cmd.kgpg_only,
        prune_doc_images: cmd.prune_doc_images || config.prune_doc_images(),
    };

    let mode = BatchMode::from_args(cmd.plugin, &cmd.only);
    logger::debug(&format!("Pack mode: {:?}", mode));

    let runner = BatchRunner::new(options, builder);
    let report = runner.run(&mode).await?;
    print_summary(&report);

    if report.has_failures() {
        bail!("{} plugin(s) failed to package", report.failure_count());
    }
    Ok(())
}
