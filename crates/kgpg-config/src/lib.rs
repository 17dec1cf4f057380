//! Configuration for the kgpg packager
//!
//! Three independent sources feed a packaging run:
//! - `kgpg.toml`: tool settings (directories, repository defaults, backend)
//! - `project.json`: the glob pattern spec selecting each plugin's files
//! - the release manifest (`package.json`) plus CI environment, which together
//!   decide the release tag and repository coordinates

pub mod config_manager;
pub mod errors;
pub mod project;
pub mod release;

pub use config_manager::Config;
pub use errors::ConfigError;
pub use project::{PatternSpec, DEFAULT_PATTERNS, PLUGIN_ANCHOR};
pub use release::{resolve_release_tag, ReleaseEnv, ReleaseInfo, ReleaseOverrides};
