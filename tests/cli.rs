mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, cell, fixture_path, parse_csv, read_csv};
use predicates::prelude::*;
use predicates::str::contains;
use wellbeing_merge::aliases::AliasTable;

fn bin() -> Command {
    Command::cargo_bin("wellbeing-merge").expect("binary exists")
}

#[test]
fn merge_writes_csv_file_and_manifest() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("merged.csv");
    let manifest = workspace.file("manifest.json");

    bin()
        .args([
            "merge",
            "--happiness",
            fixture_path("happiness.csv").to_str().unwrap(),
            "--life",
            fixture_path("life_expectancy.csv").to_str().unwrap(),
            "--peace",
            fixture_path("peace_index.csv").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--manifest",
            manifest.to_str().unwrap(),
        ])
        .assert()
        .success();

    let (headers, rows) = read_csv(&output);
    assert_eq!(headers.first().map(String::as_str), Some("entity"));
    assert_eq!(headers.last().map(String::as_str), Some("peace_score"));
    assert_eq!(rows.len(), 3);
    assert_eq!(cell(&headers, &rows[0], "life_expectancy"), "82");
    assert_eq!(cell(&headers, &rows[1], "peace_score"), "2.4");
    assert_eq!(cell(&headers, &rows[2], "region"), "Unknown");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(manifest["rows"], 3);
    assert_eq!(manifest["tool"], "wellbeing-merge");
    assert_eq!(manifest["merge"]["sources"][0]["matched"], 2);
    assert_eq!(
        manifest["sources"][2]["selected_column"]["header"],
        "2022"
    );
}

#[test]
fn merge_streams_json_to_stdout() {
    let assert = bin()
        .args([
            "merge",
            "--happiness",
            fixture_path("happiness.csv").to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    let rows = rows.as_array().expect("array of rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["entity"], "Atlantis");
    assert_eq!(rows[0]["score"], 7.2);
    assert!(rows[0]["life_expectancy"].is_null());
    assert!(rows[2]["peace_score"].is_null());
}

#[test]
fn merge_reads_paths_and_overrides_from_config() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "pipeline.yaml",
        &format!(
            "happiness:\n  path: {:?}\npeace_index:\n  path: {:?}\n  score_column: \"2023\"\n",
            fixture_path("happiness.csv"),
            fixture_path("peace_index.csv"),
        ),
    );
    let assert = bin()
        .args(["merge", "--config", config.to_str().unwrap()])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let (headers, rows) = parse_csv(&stdout);
    assert_eq!(cell(&headers, &rows[0], "peace_score"), "2.1");
    assert_eq!(cell(&headers, &rows[2], "peace_score"), "");
}

#[test]
fn merge_table_preview_replaces_stdout_output() {
    bin()
        .args([
            "merge",
            "--happiness",
            fixture_path("happiness.csv").to_str().unwrap(),
            "--table",
            "--limit",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("entity").and(contains("Atlantis")))
        .stdout(contains("Ruritania").not())
        .stdout(contains(",").not());
}

#[test]
fn merge_with_tab_output_delimiter() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("merged.tsv");
    bin()
        .args([
            "merge",
            "--happiness",
            fixture_path("happiness.csv").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    let contents = fs::read_to_string(&output).unwrap();
    assert!(contents.starts_with("entity\tregion\tyear\thappiness_rank\tscore"));
}

#[test]
fn merge_fails_when_required_fields_are_missing() {
    bin()
        .args([
            "merge",
            "--happiness",
            fixture_path("renamed_happiness.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("required field(s) not found: entity, score"))
        .stderr(contains("'Nation', 'Points'"));
}

#[test]
fn merge_accepts_renamed_headers_through_config_aliases() {
    let assert = bin()
        .args([
            "merge",
            "--happiness",
            fixture_path("renamed_happiness.csv").to_str().unwrap(),
            "--config",
            fixture_path("renamed_happiness.yaml").to_str().unwrap(),
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let (headers, rows) = parse_csv(&stdout);
    assert_eq!(cell(&headers, &rows[0], "entity"), "Atlantis");
    assert_eq!(cell(&headers, &rows[0], "score"), "7.2");
}

#[test]
fn merge_requires_a_happiness_source() {
    bin()
        .args(["merge"])
        .assert()
        .failure()
        .stderr(contains("No happiness source given"));
}

#[test]
fn resolve_prints_mapping_and_selected_column() {
    bin()
        .args([
            "resolve",
            "-i",
            fixture_path("happiness.csv").to_str().unwrap(),
            "--source",
            "happiness",
        ])
        .assert()
        .success()
        .stdout(contains("Ladder score").and(contains("score")))
        .stdout(contains("sha256:"));

    bin()
        .args([
            "resolve",
            "-i",
            fixture_path("peace_index.csv").to_str().unwrap(),
            "--source",
            "peace-index",
        ])
        .assert()
        .success()
        .stdout(contains("selected column: '2022'"));
}

#[test]
fn resolve_reports_missing_fields_and_fails() {
    bin()
        .args([
            "resolve",
            "-i",
            fixture_path("renamed_happiness.csv").to_str().unwrap(),
            "--source",
            "happiness",
        ])
        .assert()
        .failure()
        .stdout(contains("missing: entity, score"));
}

#[test]
fn aliases_writes_loadable_yaml() {
    let workspace = TestWorkspace::new();
    let path = workspace.file("life_aliases.yaml");
    bin()
        .args([
            "aliases",
            "--source",
            "life-expectancy",
            "-o",
            path.to_str().unwrap(),
        ])
        .assert()
        .success();
    let table = AliasTable::load(&path).expect("alias table loads");
    assert_eq!(
        table.candidates(wellbeing_merge::fields::CanonicalField::Year),
        Some(&["year".to_string()][..])
    );

    bin()
        .args(["aliases", "--source", "happiness"])
        .assert()
        .success()
        .stdout(contains("- field: entity"));
}
