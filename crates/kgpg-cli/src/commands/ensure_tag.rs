use crate::tag::{ensure_tag, TagOutcome};
use crate::GlobalOpts;
use kgpg_config::Config;
use kgpg_logger as logger;

/// Create and push the release tag; never fails so a pre-push hook can call it
pub fn handle_ensure_tag(opts: &GlobalOpts) {
    let root = opts.project_root();
    let config = Config::load_or_default(&root);
    let manifest_path = config.release_manifest_path(&root);

    match ensure_tag(&root, &manifest_path) {
        TagOutcome::Created { tag, pushed: true } => {
            logger::success(&format!("Created and pushed tag {}", tag));
        }
        TagOutcome::Created { tag, pushed: false } => {
            logger::warn(&format!("Created tag {} locally; push it manually", tag));
        }
        TagOutcome::AlreadyExists(tag) => {
            logger::info(&format!("Tag {} already exists, nothing to do", tag));
        }
        TagOutcome::Skipped(reason) => {
            logger::warn(&format!("Skipping release tag: {}", reason));
        }
    }
}
