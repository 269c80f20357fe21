//! End-to-end tests of the `arbor` binary: CSV in, model file and summary out.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use arbor_rf::RandomForest;
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("crates")
        .join("arbor-io")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .args(args)
        .arg("--quiet")
        .output()
        .expect("binary should launch")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

#[test]
fn trains_saves_and_reports() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("models").join("rf.bin");
    let report = dir.path().join("reports").join("run.json");
    let data = fixture_path("employees.csv");

    let out = run(&[
        "--data",
        path_arg(&data),
        "--model-out",
        path_arg(&model),
        "--report",
        path_arg(&report),
        "--n-trees",
        "25",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Training finished.");
    assert!(lines[1].starts_with("Accuracy: "));
    assert_eq!(lines[1].len(), "Accuracy: 0.0000".len());
    assert_eq!(lines[2], "Confusion Matrix:");
    assert!(lines[3].starts_with("[[") && lines[3].ends_with("]]"));
    assert_eq!(lines[4], format!("Model saved to: {}", model.display()));

    // 40 rows at the default 0.2 split hold out 8, stratified 4/4.
    let counts: Vec<usize> = lines[3]
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(counts.len(), 4);
    assert_eq!(counts.iter().sum::<usize>(), 8);
    assert_eq!(counts[0] + counts[1], 4);

    let forest = RandomForest::load(&model).unwrap();
    assert_eq!(forest.n_trees(), 25);
    assert_eq!(forest.feature_names(), &["age", "income", "years_experience", "gender"]);
    assert_eq!(forest.class_labels().as_slice(), &["0", "1"]);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["n_test"], 8);
    assert_eq!(json["n_train"], 32);
    assert_eq!(json["stratified"], true);
    assert_eq!(json["feature_importances"].as_array().unwrap().len(), 4);
}

#[test]
fn same_seed_same_summary() {
    let dir = TempDir::new().unwrap();
    let data = fixture_path("employees.csv");
    let summary = |name: &str| {
        let model = dir.path().join(name);
        let out = run(&[
            "--data",
            path_arg(&data),
            "--model-out",
            path_arg(&model),
            "--n-trees",
            "15",
            "--seed",
            "7",
            "--threads",
            "2",
        ]);
        assert!(out.status.success());
        let stdout = String::from_utf8(out.stdout).unwrap();
        stdout.lines().take(4).map(str::to_string).collect::<Vec<_>>()
    };
    assert_eq!(summary("a.bin"), summary("b.bin"));
}

#[test]
fn constant_target_trains_unstratified() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("rf.bin");
    let out = run(&[
        "--data",
        path_arg(&fixture_path("constant_target.csv")),
        "--model-out",
        path_arg(&model),
        "--n-trees",
        "5",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Accuracy: 1.0000"));
    assert!(stdout.contains("\n[[2]]\n"));
    assert!(model.is_file());
}

#[test]
fn missing_column_fails_without_writing() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("rf.bin");
    let out = run(&[
        "--data",
        path_arg(&fixture_path("missing_income.csv")),
        "--model-out",
        path_arg(&model),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains(r#"["income"]"#));
    assert!(out.stdout.is_empty());
    assert!(!model.exists());
}

#[test]
fn missing_data_file_fails() {
    let dir = TempDir::new().unwrap();
    let out = run(&[
        "--data",
        path_arg(&dir.path().join("absent.csv")),
        "--model-out",
        path_arg(&dir.path().join("rf.bin")),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("file not found"));
}

#[test]
fn invalid_test_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let out = run(&[
        "--data",
        path_arg(&fixture_path("employees.csv")),
        "--model-out",
        path_arg(&dir.path().join("rf.bin")),
        "--test-size",
        "1.5",
    ]);
    assert!(!out.status.success());
}

#[test]
fn report_dir_failure_writes_no_model() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let model = dir.path().join("models").join("rf.bin");

    let out = run(&[
        "--data",
        path_arg(&fixture_path("employees.csv")),
        "--model-out",
        path_arg(&model),
        "--report",
        path_arg(&blocker.join("run.json")),
        "--n-trees",
        "5",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("report"));
    assert!(out.stdout.is_empty());
    assert!(!model.exists());
}

#[test]
fn report_write_failure_removes_model() {
    let dir = TempDir::new().unwrap();
    // The report path is an existing directory, so only the final write fails.
    let report = dir.path().join("run.json");
    fs::create_dir(&report).unwrap();
    let model = dir.path().join("rf.bin");

    let out = run(&[
        "--data",
        path_arg(&fixture_path("employees.csv")),
        "--model-out",
        path_arg(&model),
        "--report",
        path_arg(&report),
        "--n-trees",
        "5",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to write report"));
    assert!(out.stdout.is_empty());
    assert!(!model.exists());
}
