//! CLI Contract Tests
//!
//! Spawns the `pipeguard` binary and checks what a host process relies on:
//! exactly one JSON line on stdout, `{"error": ...}` plus a non-zero exit on
//! fatal errors, and byte-identical output across repeated runs.

use std::path::{Path, PathBuf};
use std::io::Write;
use std::process::{Command, Output, Stdio};

use pipeguard::models::{ForestArtifact, ModelTask, Node, Tree};
use pipeguard::{ModelStore, PipelineConfig};

const SNAPSHOTS: &str = "\
Run_ID,P_0,P_500,P_1000,A_0,A_500,A_1000,Leak_Location
Run_1,100000,99980,99960,0.01,0.4,0.01,480
Run_2,100000,99995,99990,0.01,0.02,0.01,
Run_3,100000,,99990,0.01,0.02,0.01,
";

const LABELLED: &str = "\
Run_ID,P_0,P_500,P_1000,A_0,A_500,A_1000,LeakLabel,Leak_Location
1,100000,99980,99960,0.01,0.4,0.01,leak,480
2,100000,99995,99990,0.01,0.02,0.01,no leak,
3,100000,99995,99990,0.01,0.3,0.01,no leak,
";

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tmpdir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn model_dir(&self) -> PathBuf {
        self.path("models")
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let p = self.path(name);
        std::fs::write(&p, contents).expect("write fixture");
        p
    }

    /// Classifier: leak when A_500 > 0.2 (p = 0.92).
    fn with_classifier(self) -> Self {
        let mut config = PipelineConfig::default();
        config.models.dir = self.model_dir();
        let artifact = ForestArtifact::new(
            ModelTask::Classifier,
            1,
            vec![Tree::new(vec![Node::split(0, 0.2, 1, 2), Node::leaf(0.08), Node::leaf(0.92)])],
        )
        .with_feature_names(vec!["A_500".into()]);
        ModelStore::from_config(&config)
            .save_classifier(&artifact)
            .expect("save classifier");
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipeguard"));
        cmd.args(args)
            .arg("--model-dir")
            .arg(self.model_dir())
            .current_dir(self.dir.path())
            .env_remove("PIPEGUARD_CONFIG")
            .env_remove("PIPEGUARD_MODEL_DIR")
            .env("RUST_LOG", "debug");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("spawn pipeguard")
    }

    fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn pipeguard");
        child
            .stdin
            .take()
            .expect("stdin handle")
            .write_all(input.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for pipeguard")
    }
}

fn single_json_line(out: &Output) -> serde_json::Value {
    let stdout = String::from_utf8(out.stdout.clone()).expect("utf8 stdout");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout must be one line, got: {stdout:?}");
    serde_json::from_str(lines[0]).expect("stdout is JSON")
}

fn arg(p: &Path) -> &str {
    p.to_str().expect("utf8 path")
}

#[test]
fn missing_input_file_is_one_error_line() {
    let ws = Workspace::new().with_classifier();
    let out = ws.run(&["predict", arg(&ws.path("nope.csv"))]);

    assert!(!out.status.success());
    let v = single_json_line(&out);
    let msg = v["error"].as_str().expect("error string");
    assert!(msg.starts_with("File not found"), "{msg}");
    assert!(v.get("summary").is_none());
}

#[test]
fn missing_classifier_is_fatal() {
    let ws = Workspace::new();
    let csv = ws.write("snapshots.csv", SNAPSHOTS);
    let out = ws.run(&[arg(&csv)]);

    assert_eq!(out.status.code(), Some(1));
    let v = single_json_line(&out);
    assert!(v["error"].as_str().expect("error").contains("Leak detector model not found"));
}

#[test]
fn no_input_path() {
    let ws = Workspace::new().with_classifier();
    let out = ws.run(&[]);
    assert!(!out.status.success());
    assert_eq!(single_json_line(&out)["error"], "No CSV file path provided");
}

#[test]
fn predict_emits_report() {
    let ws = Workspace::new().with_classifier();
    let csv = ws.write("snapshots.csv", SNAPSHOTS);
    let out = ws.run(&["predict", arg(&csv)]);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = single_json_line(&out);

    assert_eq!(v["summary"]["total"], 2);
    assert_eq!(v["summary"]["leak"], 1);
    assert_eq!(v["summary"]["no_leak"], 1);
    assert_eq!(v["summary"]["error"], 1);

    let first = &v["results"][0];
    assert_eq!(first["run_id"], "Run_1");
    assert_eq!(first["status"], "leak");
    assert_eq!(first["probability"], 0.92);
    let x = first["location_pred"].as_f64().expect("located");
    assert!((x - 500.0).abs() < 1e-9);
    assert_eq!(first["actual_location"], 480.0);
    assert!((first["delta_x"].as_f64().expect("delta") - 20.0).abs() < 1e-9);

    assert!(v["results"][1]["location_pred"].is_null());
    assert_eq!(v["results"][2]["status"], "error");

    // Logs never leak onto stdout.
    assert!(!out.stderr.is_empty());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let ws = Workspace::new().with_classifier();
    let csv = ws.write("snapshots.csv", SNAPSHOTS);
    let a = ws.run(&[arg(&csv)]);
    let b = ws.run(&[arg(&csv)]);
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn prepare_writes_matrix() {
    let ws = Workspace::new();
    let csv = ws.write("labelled.csv", LABELLED);
    let output = ws.path("features.csv");
    let out = ws.run(&["prepare", arg(&csv), "--output", arg(&output)]);

    assert!(out.status.success());
    let v = single_json_line(&out);
    assert_eq!(v["status"], "preprocessing_complete");
    assert_eq!(v["rows"], 3);
    assert_eq!(v["features"], 10);
    assert_eq!(v["leak"], 1);
    assert_eq!(v["no_leak"], 2);

    let matrix = std::fs::read_to_string(&output).expect("matrix written");
    assert_eq!(matrix.lines().count(), 4);
}

#[test]
fn prepare_requires_labels() {
    let ws = Workspace::new();
    let csv = ws.write("snapshots.csv", SNAPSHOTS);
    let out = ws.run(&["prepare", arg(&csv)]);
    assert!(!out.status.success());
    assert!(single_json_line(&out)["error"].as_str().expect("error").contains("LeakLabel"));
}

#[test]
fn evaluate_scores_models() {
    let ws = Workspace::new().with_classifier();
    let csv = ws.write("labelled.csv", LABELLED);
    let out = ws.run(&["evaluate", arg(&csv)]);

    assert!(out.status.success());
    let v = single_json_line(&out);
    assert_eq!(v["samples"], 3);
    assert_eq!(v["confusion_matrix"], serde_json::json!([[1, 1], [0, 1]]));
    assert_eq!(v["located"], 1);
}

#[test]
fn inspect_single_run() {
    let ws = Workspace::new();
    let csv = ws.write("snapshots.csv", SNAPSHOTS);
    let out = ws.run(&["inspect", arg(&csv), "--run-id", "Run_1"]);

    assert!(out.status.success());
    let v = single_json_line(&out);
    let rows = v["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["breakdown"]["peak_position_m"], 500.0);
}

#[test]
fn invalid_config_file_is_fatal() {
    let ws = Workspace::new().with_classifier();
    let csv = ws.write("snapshots.csv", SNAPSHOTS);
    let cfg = ws.write("pipeguard.toml", "[inference]\ndecision_threshold = 7.0\n");
    let out = ws.run(&["--config", arg(&cfg), arg(&csv)]);

    assert!(!out.status.success());
    assert!(single_json_line(&out)["error"]
        .as_str()
        .expect("error")
        .contains("decision_threshold"));
}

#[test]
fn predict_from_stdin() {
    let ws = Workspace::new().with_classifier();
    let input = "{\"Run_ID\": \"007\", \"P_0\": 100000, \"P_500\": 99980, \"P_1000\": 99960, \"A_0\": 0.01, \"A_500\": 0.4, \"A_1000\": 0.01}\n";
    let out = ws.run_with_stdin(&["predict", "--stdin"], input);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = single_json_line(&out);
    assert_eq!(v["summary"]["total"], 1);
    assert_eq!(v["summary"]["leak"], 1);
    let first = &v["results"][0];
    assert_eq!(first["run_id"], "007");
    assert_eq!(first["status"], "leak");
    assert!((first["location_pred"].as_f64().expect("located") - 500.0).abs() < 1e-9);
}

#[test]
fn undecodable_cell_only_fails_its_row() {
    let ws = Workspace::new().with_classifier();
    let csv = ws.path("snapshots.csv");
    let mut bytes = b"Run_ID,P_0,P_500,P_1000,A_0,A_500,A_1000\n".to_vec();
    bytes.extend_from_slice(b"1,100000,99980,99960,0.01,0.4,0.01\n");
    bytes.extend_from_slice(b"2,100000,99980,99960,0.01,\xff,0.01\n");
    bytes.extend_from_slice(b"3,100000,99995,99990,0.01,0.02,0.01\n");
    std::fs::write(&csv, bytes).expect("write fixture");

    let out = ws.run(&[arg(&csv)]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = single_json_line(&out);
    assert_eq!(v["results"][0]["status"], "leak");
    assert_eq!(v["results"][1]["status"], "error");
    assert!(v["results"][1]["message"].as_str().expect("message").contains("A_500"));
    assert_eq!(v["results"][2]["status"], "no_leak");
    assert_eq!(v["summary"]["error"], 1);
}

#[test]
fn run_ids_round_trip_verbatim() {
    let ws = Workspace::new().with_classifier();
    let csv = ws.write(
        "snapshots.csv",
        "Run_ID,P_0,P_500,P_1000,A_0,A_500,A_1000\n\
         007,100000,99995,99990,0.01,0.02,0.01\n\
         1.50,100000,99995,99990,0.01,0.02,0.01\n\
         42,100000,99995,99990,0.01,0.02,0.01\n",
    );

    let v = single_json_line(&ws.run(&[arg(&csv)]));
    assert_eq!(v["results"][0]["run_id"], "007");
    assert_eq!(v["results"][1]["run_id"], "1.50");
    assert_eq!(v["results"][2]["run_id"], 42);

    let out = ws.run(&["inspect", arg(&csv), "--run-id", "007"]);
    assert!(out.status.success());
    assert_eq!(single_json_line(&out)["rows"][0]["run_id"], "007");
}
