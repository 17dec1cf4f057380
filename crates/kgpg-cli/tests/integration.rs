//! Integration tests for kgpg

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn kgpg_cmd(root: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("kgpg");
    cmd.env("KGPG_CONFIG", root.join("kgpg.toml"))
        .env("HOME", root)
        .env_remove("GITHUB_REF_NAME")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_REPOSITORY_OWNER")
        .env_remove("KGPG_LOG")
        .arg("--root")
        .arg(root);
    cmd
}

fn write_plugin(root: &Path, id: &str, with_script: bool) {
    let dir = root.join("plugins").join(id);
    assert!(fs::create_dir_all(dir.join("doc_root")).is_ok());
    assert!(fs::write(
        dir.join("manifest.json"),
        format!(r#"{{"name": "{} crawler", "version": "0.2.0", "author": "kabegame"}}"#, id)
    )
    .is_ok());
    assert!(fs::write(dir.join("icon.png"), [0x89, b'P', b'N', b'G']).is_ok());
    assert!(fs::write(dir.join("doc_root").join("doc.md"), format!("# {}\n", id)).is_ok());
    assert!(fs::write(dir.join("notes.txt"), "not packaged").is_ok());
    if with_script {
        assert!(fs::write(dir.join("crawl.rhai"), "let page = fetch(url);").is_ok());
    }
}

fn packed_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root.join("packed"))
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter_map(|e| e.file_name().into_string().ok())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn sha_of(path: &Path) -> Option<String> {
    fs::read(path).ok().map(|bytes| hex::encode(Sha256::digest(bytes)))
}

#[test]
fn test_version() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    kgpg_cmd(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kgpg"));
}

#[test]
fn test_help() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    kgpg_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("index.json release catalog"));
}

#[test]
fn test_invalid_command() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    kgpg_cmd(temp_dir.path()).arg("invalid").assert().failure();
}

#[test]
fn test_config_show_defaults() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    kgpg_cmd(temp_dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration:"));
}

#[test]
fn test_config_set_then_show() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    kgpg_cmd(temp_dir.path())
        .args(["config", "set", "repo-owner", "someone"])
        .assert()
        .success();
    kgpg_cmd(temp_dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("someone"));
}

#[test]
fn test_pack_partial_failure_exits_nonzero() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    let root = temp_dir.path();
    write_plugin(root, "alpha", true);
    write_plugin(root, "broken", false);
    write_plugin(root, "gamma", true);

    kgpg_cmd(root)
        .arg("pack")
        .assert()
        .failure()
        .stderr(predicate::str::contains("crawl.rhai"));
    assert_eq!(
        packed_names(root),
        ["alpha.icon.png", "alpha.kgpg", "gamma.icon.png", "gamma.kgpg"]
    );
}

#[test]
fn test_pack_v1_archive_contents() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    let root = temp_dir.path();
    write_plugin(root, "alpha", true);

    kgpg_cmd(root)
        .args(["pack", "alpha", "--format", "v1", "--kgpg-only"])
        .assert()
        .success();
    assert_eq!(packed_names(root), ["alpha.kgpg"]);

    let bytes = fs::read(root.join("packed").join("alpha.kgpg"));
    assert!(bytes.is_ok(), "alpha.kgpg was not written");
    let Ok(bytes) = bytes else {
        return;
    };
    let archive = zip::ZipArchive::new(Cursor::new(bytes));
    assert!(archive.is_ok(), "alpha.kgpg is not a readable zip");
    let Ok(mut archive) = archive else {
        return;
    };
    let names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .collect();
    assert_eq!(
        names,
        ["crawl.rhai", "doc_root/doc.md", "icon.png", "manifest.json"]
    );
}

#[test]
fn test_pack_is_deterministic() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    let root = temp_dir.path();
    write_plugin(root, "alpha", true);
    let archive = root.join("packed").join("alpha.kgpg");

    kgpg_cmd(root).arg("pack").assert().success();
    let first = sha_of(&archive);
    kgpg_cmd(root).arg("pack").assert().success();
    let second = sha_of(&archive);

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_only_mode_cleanup_is_idempotent() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    let root = temp_dir.path();
    for id in ["alpha", "beta", "gamma"] {
        write_plugin(root, id, true);
    }
    kgpg_cmd(root).arg("pack").assert().success();

    for _ in 0..2 {
        kgpg_cmd(root)
            .args(["pack", "--only", "alpha,gamma"])
            .assert()
            .success();
        assert_eq!(
            packed_names(root),
            ["alpha.icon.png", "alpha.kgpg", "gamma.icon.png", "gamma.kgpg"]
        );
    }
}

#[test]
fn test_out_dir_alias() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    let root = temp_dir.path();
    write_plugin(root, "alpha", true);
    let out = root.join("dist");

    kgpg_cmd(root)
        .args(["pack", "--kgpgOnly", "--outDir"])
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("alpha.kgpg").exists());
    assert!(!out.join("alpha.icon.png").exists());
}

#[test]
fn test_index_is_sorted_and_uses_tag() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    let root = temp_dir.path();
    for id in ["zeta", "alpha", "mid"] {
        write_plugin(root, id, true);
    }
    assert!(fs::write(root.join("package.json"), r#"{"version": "1.4.0"}"#).is_ok());

    kgpg_cmd(root).arg("pack").assert().success();
    kgpg_cmd(root)
        .args(["index", "--repo-owner", "someone"])
        .assert()
        .success();

    let content = fs::read_to_string(root.join("packed").join("index.json"));
    assert!(content.is_ok(), "index.json was not written");
    let Ok(content) = content else {
        return;
    };
    let catalog = serde_json::from_str::<serde_json::Value>(&content);
    assert!(catalog.is_ok(), "index.json is not valid JSON");
    let Ok(catalog) = catalog else {
        return;
    };
    assert_eq!(catalog["version"], "v1.4.0");
    assert_eq!(catalog["repository"]["owner"], "someone");
    let ids: Vec<&str> = catalog["plugins"]
        .as_array()
        .map(|plugins| plugins.iter().filter_map(|p| p["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, ["alpha", "mid", "zeta"]);

    let alpha = &catalog["plugins"][0];
    assert_eq!(alpha["name"], "alpha crawler");
    assert_eq!(alpha["packageVersion"], 2);
    assert_eq!(
        alpha["downloadUrl"],
        "https://github.com/someone/crawler-plugins/releases/download/v1.4.0/alpha.kgpg"
    );
    assert_eq!(
        alpha["sha256"].as_str().map(str::to_string),
        sha_of(&root.join("packed").join("alpha.kgpg"))
    );
}

#[test]
fn test_index_without_plugins_fails() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    assert!(fs::create_dir_all(temp_dir.path().join("plugins")).is_ok());
    kgpg_cmd(temp_dir.path()).arg("index").assert().failure();
}

#[test]
fn test_ensure_tag_never_fails() {
    let Ok(temp_dir) = TempDir::new() else {
        return;
    };
    kgpg_cmd(temp_dir.path()).arg("ensure-tag").assert().success();
}
