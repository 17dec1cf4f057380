//! Release tag helper for pre-push hooks
//!
//! Creates and pushes an annotated `v<version>` tag for the version declared in
//! the release manifest. Every failure is reported as a warning so the hook
//! never blocks a push.

use anyhow::{bail, Context, Result};
use kgpg_config::release::{read_manifest_version, to_tag, LATEST_TAG};
use kgpg_logger as logger;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    Created { tag: String, pushed: bool },
    AlreadyExists(String),
    Skipped(String),
}

fn run_git(git: &Path, repo: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(git)
        .args(args)
        .current_dir(repo)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;
    logger::capture_output(&format!("git {}", args.join(" ")), &output);
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}

fn locate_git() -> Result<PathBuf> {
    which::which("git").context("git executable not found on PATH")
}

/// Ensure the release tag for `manifest_path` exists locally and on `origin`
pub fn ensure_tag(repo: &Path, manifest_path: &Path) -> TagOutcome {
    let Some(version) = read_manifest_version(manifest_path) else {
        return TagOutcome::Skipped(format!(
            "no version in {}",
            manifest_path.display()
        ));
    };
    let tag = to_tag(&version);
    if tag == LATEST_TAG {
        return TagOutcome::Skipped("release manifest version is 'latest'".to_string());
    }

    let git = match locate_git() {
        Ok(git) => git,
        Err(e) => return TagOutcome::Skipped(e.to_string()),
    };

    match run_git(&git, repo, &["tag", "-l", &tag]) {
        Ok(output) if !String::from_utf8_lossy(&output.stdout).trim().is_empty() => {
            return TagOutcome::AlreadyExists(tag);
        }
        Ok(_) => {}
        Err(e) => return TagOutcome::Skipped(e.to_string()),
    }

    let message = format!("crawler-plugins {}", tag);
    if let Err(e) = run_git(&git, repo, &["tag", "-a", &tag, "-m", &message]) {
        return TagOutcome::Skipped(e.to_string());
    }

    logger::spinner_start(&format!("Pushing {} to origin", tag));
    let pushed = match run_git(&git, repo, &["push", "origin", &tag]) {
        Ok(_) => {
            logger::spinner_stop();
            true
        }
        Err(e) => {
            logger::spinner_error(&format!("Push of {} failed: {}", tag, e));
            false
        }
    };
    TagOutcome::Created { tag, pushed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_manifest_is_skipped() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let outcome = ensure_tag(temp_dir.path(), &temp_dir.path().join("package.json"));
        assert!(matches!(outcome, TagOutcome::Skipped(_)));
    }

    #[test]
    fn test_creates_then_detects_existing_tag() {
        let Ok(git) = locate_git() else {
            return;
        };
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let repo = temp_dir.path();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "Release Bot"],
            vec!["config", "user.email", "release@example.invalid"],
            vec!["commit", "-q", "--allow-empty", "-m", "init"],
        ] {
            if run_git(&git, repo, &args).is_err() {
                return;
            }
        }
        let manifest = repo.join("package.json");
        assert!(fs::write(&manifest, r#"{"version": "0.9.0"}"#).is_ok());

        // No origin remote, so the push step fails without blocking
        assert_eq!(
            ensure_tag(repo, &manifest),
            TagOutcome::Created {
                tag: "v0.9.0".to_string(),
                pushed: false
            }
        );
        assert_eq!(
            ensure_tag(repo, &manifest),
            TagOutcome::AlreadyExists("v0.9.0".to_string())
        );
    }
}
