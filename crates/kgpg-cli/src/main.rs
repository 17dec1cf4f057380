use clap::{Parser, Subcommand};
use kgpg::{
    commands::{
        config::{self, ConfigAction},
        ensure_tag,
        index::{self, IndexCommand},
        pack::{self, PackCommand},
    },
    GlobalOpts,
};
use kgpg_config::ReleaseEnv;
use kgpg_logger as logger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV_VAR: &str = "KGPG_LOG";

#[derive(Parser)]
#[command(name = "kgpg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Crawler plugin packager",
    long_about = "kgpg packages each plugin directory into a .kgpg archive and writes the index.json release catalog."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package plugins into .kgpg archives
    Pack(PackCommand),
    /// Generate index.json from the built archives
    Index(IndexCommand),
    /// Create and push the v<version> release tag (never fails)
    EnsureTag,
    /// Show or edit kgpg.toml
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(logger::verbosity_to_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let release_env = ReleaseEnv::from_env();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            logger::error(&format!("Failed to start async runtime: {}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Pack(cmd) => runtime.block_on(pack::handle_pack(cmd, &cli.global)),
        Commands::Index(cmd) => {
            runtime.block_on(index::handle_index(cmd, &cli.global, &release_env))
        }
        Commands::EnsureTag => {
            ensure_tag::handle_ensure_tag(&cli.global);
            Ok(())
        }
        Commands::Config { action } => config::handle_config(action, &cli.global),
    };

    if let Err(e) = result {
        logger::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
