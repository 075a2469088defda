mod common;

use std::fs;

use assert_cmd::Command;
use common::{EVAL_HEADER, TestWorkspace};
use predicates::str::contains;

fn evalboard() -> Command {
    Command::cargo_bin("csv-evalboard").expect("binary exists")
}

fn write_family_csv(workspace: &TestWorkspace) {
    workspace.write(
        "data.csv",
        &format!("{EVAL_HEADER},score\nsetA_1,v1,acc,p1,eval,80\nsetA_2,v1,acc,p1,eval,90\n"),
    );
}

#[test]
fn import_then_summary_prints_family_average() {
    let workspace = TestWorkspace::new();
    write_family_csv(&workspace);
    let csv = workspace.csv_path();
    let store = workspace.store_path();

    evalboard()
        .args([
            "import",
            csv.to_str().unwrap(),
            "ModelEvaluation",
            store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("imported 2 rows"));

    // Marker is cleared on exit by default.
    assert!(!workspace.path().join("summary.db.hash").exists());

    evalboard()
        .args(["summary", "--store", store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("setA"))
        .stdout(contains("85.00"));
}

#[test]
fn kept_marker_skips_unchanged_import() {
    let workspace = TestWorkspace::new();
    write_family_csv(&workspace);
    let csv = workspace.csv_path();
    let store = workspace.store_path();
    let args = [
        "import",
        csv.to_str().unwrap(),
        "ModelEvaluation",
        store.to_str().unwrap(),
        "--keep-marker",
    ];

    evalboard().args(args).assert().success().stdout(contains("imported 2 rows"));
    assert!(workspace.path().join("summary.db.hash").exists());
    evalboard().args(args).assert().success().stdout(contains("no update"));

    let mut forced = args.to_vec();
    forced.push("--force");
    evalboard()
        .args(forced)
        .assert()
        .success()
        .stdout(contains("imported 2 rows"));
}

#[test]
fn missing_csv_fails_with_message() {
    let workspace = TestWorkspace::new();
    let csv = workspace.csv_path();
    let store = workspace.store_path();
    evalboard()
        .args([
            "import",
            csv.to_str().unwrap(),
            "ModelEvaluation",
            store.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("CSV file not found"));
}

#[test]
fn schema_prints_definition_and_listing() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write(
        "data.csv",
        &format!("{EVAL_HEADER},Top-1 Acc,order,准确率\na,v1,acc,p,eval,0.5,3,1\n"),
    );
    evalboard()
        .args(["schema", csv.to_str().unwrap(), "Evals"])
        .assert()
        .success()
        .stdout(contains("CREATE TABLE IF NOT EXISTS Evals ("))
        .stdout(contains("top_1_acc DECIMAL(10, 4)"))
        .stdout(contains("\"order\" INTEGER"))
        .stdout(contains("col_8 INTEGER"))
        .stdout(contains("normalized"));
}

#[test]
fn summary_json_uses_settings_file() {
    let workspace = TestWorkspace::new();
    write_family_csv(&workspace);
    let config = workspace.write(
        "settings.yaml",
        &format!(
            "csv_path: {}\nstore_path: {}\ntable_name: Runs\n",
            workspace.csv_path().display(),
            workspace.store_path().display()
        ),
    );

    evalboard()
        .args(["import", "--config", config.to_str().unwrap()])
        .assert()
        .success();

    let output = evalboard()
        .args([
            "summary",
            "--config",
            config.to_str().unwrap(),
            "--format",
            "json",
        ])
        .output()
        .expect("run summary");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["headers"][5], "score");
    assert_eq!(value["rows"][0][0], "setA");
    assert_eq!(value["rows"][0][5], "85.00");
    assert_eq!(value["rows"][1][0], "");
}

#[test]
fn unknown_settings_key_is_rejected() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("settings.yaml", "tabel_name: Typo\n");
    evalboard()
        .args(["import", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Loading settings"));
}

#[test]
fn add_column_appends_random_scores() {
    let workspace = TestWorkspace::new();
    write_family_csv(&workspace);
    let csv = workspace.csv_path();

    evalboard()
        .args(["add-column", csv.to_str().unwrap(), "随机分数"])
        .assert()
        .success()
        .stdout(contains("2 row(s)"));

    let content = fs::read_to_string(&csv).expect("read csv");
    let header = content.lines().next().expect("header");
    assert!(header.ends_with(",score,随机分数"), "{header}");
    assert!(content.lines().skip(1).all(|line| line.split(',').count() == 7));
}
