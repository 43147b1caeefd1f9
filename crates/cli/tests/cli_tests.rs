#![allow(deprecated)] // cargo_bin is deprecated but still functional

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a config pointing the catalog and object store into `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let config = format!(
        "[metadata]\ntype = \"sqlite\"\npath = {:?}\n\n\
         [storage]\ntype = \"filesystem\"\npath = {:?}\n\n\
         [assets]\nbucket = \"landing\"\nprefix = \"daily\"\n",
        dir.join("catalog.db"),
        dir.join("objects"),
    );
    let path = dir.join("assetcat.toml");
    fs::write(&path, config).unwrap();
    path
}

fn assetcat(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("assetcat").unwrap();
    cmd.env_remove("ASSETCAT_CONFIG")
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(config);
    cmd
}

fn manifest_line(local_file: &str, metahash: &str) -> String {
    serde_json::json!({
        "local_file": local_file,
        "base_url": "https://feeds.example.com",
        "srcfile": format!("/exports/{local_file}"),
        "metahash": metahash,
    })
    .to_string()
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("assetcat")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("ingest"))
        .stdout(contains("detect-deletions"))
        .stdout(contains("filter-feed"))
        .stdout(contains("check"));
}

#[test]
fn detect_deletions_from_files() {
    let temp = TempDir::new().unwrap();
    let manifest = temp.path().join("manifest.jsonl");
    fs::write(
        &manifest,
        format!("{}\n\n{}\n", manifest_line("a.csv", "1"), manifest_line("c.csv", "3")),
    )
    .unwrap();
    let dbassets = temp.path().join("dbassets.txt");
    fs::write(&dbassets, "a.csv\nb.csv\nc.csv\n").unwrap();

    assetcat(&temp.path().join("missing.toml"))
        .current_dir(temp.path())
        .arg("detect-deletions")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--dbassets")
        .arg(&dbassets)
        .assert()
        .success()
        .stdout("b.csv\n");
}

#[test]
fn detect_deletions_requires_a_source_of_known_files() {
    let temp = TempDir::new().unwrap();
    assetcat(&temp.path().join("missing.toml"))
        .arg("detect-deletions")
        .arg("--manifest")
        .arg(temp.path().join("manifest.jsonl"))
        .assert()
        .failure()
        .stderr(contains("--dbassets"));
}

#[test]
fn filter_feed_rejects_unknown_source() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assetcat(&config)
        .arg("filter-feed")
        .arg("--source")
        .arg("awin")
        .write_stdin("{\"CampaignId\": 1}\n")
        .assert()
        .failure()
        .stderr(contains("unrecognized record source 'awin'"));
}

#[test]
fn filter_feed_with_empty_allow_list_forwards_nothing() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assetcat(&config)
        .arg("filter-feed")
        .arg("--source")
        .arg("partnerize")
        .write_stdin("{\"feed_id\": \"pz-1\"}\n")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn ingest_acks_detects_and_deletes() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let batch = format!(
        "{}\n{}\n\nnot json\n{}\n",
        manifest_line("orders.csv", "h1"),
        manifest_line("orders.csv", "h1"),
        manifest_line("clicks.csv", "h2"),
    );
    let input = temp.path().join("batch.jsonl");
    fs::write(&input, &batch).unwrap();

    assetcat(&config)
        .arg("ingest")
        .arg("--record-type")
        .arg("asset")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout("{\"metahash\":\"h1\"}\n{\"metahash\":\"h2\"}\n");

    // Re-ingesting the same batch writes nothing.
    assetcat(&config)
        .arg("ingest")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout("");

    let manifest = temp.path().join("latest.jsonl");
    fs::write(&manifest, manifest_line("orders.csv", "h1")).unwrap();

    let detected = assetcat(&config)
        .arg("detect-deletions")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--from-catalog")
        .assert()
        .success()
        .stdout("clicks.csv\n")
        .get_output()
        .stdout
        .clone();

    assetcat(&config)
        .arg("ingest")
        .arg("--record-type")
        .arg("deletion")
        .write_stdin(detected)
        .assert()
        .success();

    assetcat(&config)
        .arg("detect-deletions")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--from-catalog")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn ingest_rejects_unknown_mode() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assetcat(&config)
        .arg("ingest")
        .arg("--mode")
        .arg("fuzzy")
        .assert()
        .failure()
        .stderr(contains("fuzzy"));
}

#[test]
fn check_reports_both_backends() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assetcat(&config)
        .arg("check")
        .assert()
        .success()
        .stdout(contains("catalog: ok (sqlite)"))
        .stdout(contains("storage: ok (filesystem)"))
        .stdout(predicate::str::contains("error").not());
}
