//! Tests for the `pantry` binary

use assert_cmd::Command;
use pantry_common::{Datasource, Language, Manifest};
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn pantry(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pantry").unwrap();
    cmd.current_dir(workdir)
        .env_remove("PANTRY_OUTPUT_DIR")
        .env_remove("PANTRY_MAX_PART_SIZE")
        .env("PANTRY_LOG_LEVEL", "warn");
    cmd
}

#[test]
fn test_extract_writes_shards_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("public");

    pantry(dir.path())
        .args(["extract", "--sources", "off", "--input"])
        .arg(fixture("openfoodfacts-products.jsonl"))
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let manifest = Manifest::load(output.join("overview.json")).unwrap();
    assert_eq!(manifest.packages().len(), 2);
    let german = manifest.package(Language::German).unwrap();
    assert_eq!(german.files[0].name, "off_small_products_de.json");
    assert!(output.join("off_small_products_en.json").exists());
}

#[test]
fn test_extract_keeps_other_datasources_in_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("public");

    for (source, file) in [("np", "nutritionprivacy-products.jsonl"), ("off", "openfoodfacts-products.jsonl")] {
        pantry(dir.path())
            .args(["extract", "--sources", source, "--input"])
            .arg(fixture(file))
            .arg("--output")
            .arg(&output)
            .assert()
            .success();
    }

    let manifest = Manifest::load(output.join("overview.json")).unwrap();
    let english = manifest.package(Language::English).unwrap();
    let sources: Vec<Datasource> = english.files.iter().map(|f| f.source).collect();
    assert_eq!(sources, [Datasource::NutritionPrivacy, Datasource::OpenFoodFacts]);
}

#[test]
fn test_input_requires_single_source() {
    let dir = tempfile::tempdir().unwrap();

    pantry(dir.path())
        .args(["extract", "--input"])
        .arg(fixture("openfoodfacts-products.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly one"));
}

#[test]
fn test_unknown_datasource_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    pantry(dir.path())
        .args(["extract", "--sources", "usda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown datasource"));
}

#[test]
fn test_missing_dump_fails() {
    let dir = tempfile::tempdir().unwrap();

    pantry(dir.path())
        .args(["extract", "--sources", "np"])
        .assert()
        .failure();
    assert!(!dir.path().join("public").join("overview.json").exists());
}

#[test]
fn test_verify_detects_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("public");

    pantry(dir.path())
        .args(["extract", "--sources", "np", "--input"])
        .arg(fixture("nutritionprivacy-products.jsonl"))
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    pantry(dir.path()).arg("verify").arg("--output").arg(&output).assert().success();

    std::fs::write(output.join("np_small_products_en.json"), "tampered").unwrap();
    pantry(dir.path())
        .arg("verify")
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Checksum mismatch"));
}
