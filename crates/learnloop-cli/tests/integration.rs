#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn learnloop(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("learnloop").unwrap();
    cmd.current_dir(dir.path())
        .env("LEARNLOOP_ROOT", dir.path())
        .env_remove("LEARNLOOP_STORE")
        .env_remove("RUST_LOG");
    cmd
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join(".learnloop/global-learnings.yaml")
}

fn write_learnings(
    dir: &TempDir,
    name: &str,
    project: &str,
    learnings: &[(&str, &str, &str)],
) -> PathBuf {
    let mut yaml = format!("project: {project}\nlearnings:\n");
    for (id, severity, root_cause) in learnings {
        yaml.push_str(&format!("  - id: {id}\n    issue: Issue {id}\n    severity: {severity}\n"));
        yaml.push_str(&format!("    root_cause: {root_cause}\n    solution: Fix {root_cause}\n"));
    }
    let path = dir.path().join(name);
    std::fs::write(&path, yaml).unwrap();
    path
}

fn merge(dir: &TempDir, learnings: &Path, discovered_in: &str) -> assert_cmd::assert::Assert {
    learnloop(dir)
        .args(["merge", "--iteration-learnings"])
        .arg(learnings)
        .args([
            "--discovered-in",
            discovered_in,
            "--duration",
            "900",
            "--healing-rounds",
            "2",
            "--files-modified",
            "7",
        ])
        .assert()
}

/// Store with PATTERN-001 (critical, R1) seen in P1 and P2.
fn recurring_store(dir: &TempDir) {
    let a = write_learnings(dir, "a.yaml", "P1", &[("L1", "critical", "R1")]);
    merge(dir, &a, "plan-1-iter-1").success();
    let b = write_learnings(dir, "b.yaml", "P2", &[("L2", "critical", "R1")]);
    merge(dir, &b, "plan-1-iter-2").success();
}

fn load_store(dir: &TempDir) -> serde_yaml::Value {
    serde_yaml::from_str(&std::fs::read_to_string(store_path(dir)).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// learnloop merge
// ---------------------------------------------------------------------------

#[test]
fn merge_creates_store() {
    let dir = TempDir::new().unwrap();
    let a = write_learnings(&dir, "a.yaml", "P1", &[("L1", "critical", "R1")]);

    merge(&dir, &a, "plan-1-iter-1")
        .success()
        .stdout(predicate::str::contains(
            "Merged 1 learnings into global knowledge base",
        ))
        .stdout(predicate::str::contains("PATTERN-001"));

    let store = load_store(&dir);
    assert_eq!(store["total_learnings"].as_u64(), Some(1));
    assert_eq!(store["total_projects"].as_u64(), Some(1));
    assert_eq!(store["patterns"][0]["pattern_id"].as_str(), Some("PATTERN-001"));
    assert_eq!(store["patterns"][0]["status"].as_str(), Some("IDENTIFIED"));
    assert_eq!(
        store["patterns"][0]["iteration_metadata"]["files_modified"].as_u64(),
        Some(7)
    );
    assert!(!dir.path().join(".learnloop/global-learnings.yaml.bak").exists());
}

#[test]
fn merge_dedups_across_projects_and_backs_up() {
    let dir = TempDir::new().unwrap();
    let a = write_learnings(&dir, "a.yaml", "P1", &[("L1", "critical", "R1")]);
    merge(&dir, &a, "plan-1-iter-1").success();
    let before = std::fs::read(store_path(&dir)).unwrap();

    let b = write_learnings(&dir, "b.yaml", "P2", &[("L2", "critical", "R1")]);
    merge(&dir, &b, "plan-1-iter-2").success();

    let store = load_store(&dir);
    let p = &store["patterns"][0];
    assert_eq!(store["patterns"].as_sequence().unwrap().len(), 1);
    assert_eq!(p["occurrences"].as_u64(), Some(2));
    assert_eq!(p["projects"][1].as_str(), Some("P2"));
    assert_eq!(store["total_learnings"].as_u64(), Some(1));
    assert_eq!(store["total_projects"].as_u64(), Some(2));

    let backup = std::fs::read(dir.path().join(".learnloop/global-learnings.yaml.bak")).unwrap();
    assert_eq!(backup, before);
}

#[test]
fn merge_json_summary() {
    let dir = TempDir::new().unwrap();
    let a = write_learnings(
        &dir,
        "a.yaml",
        "P1",
        &[("L1", "medium", "R1"), ("L2", "medium", "R1"), ("L3", "low", "R2")],
    );
    let out = learnloop(&dir)
        .args(["--json", "merge", "--iteration-learnings"])
        .arg(&a)
        .args([
            "--discovered-in",
            "i1",
            "--duration",
            "1",
            "--healing-rounds",
            "0",
            "--files-modified",
            "0",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(summary["processed"], 3);
    assert_eq!(summary["created"], serde_json::json!(["PATTERN-001", "PATTERN-002"]));
    assert_eq!(summary["merged"], serde_json::json!(["PATTERN-001"]));
}

#[test]
fn merge_missing_learnings_file_fails() {
    let dir = TempDir::new().unwrap();
    merge(&dir, &dir.path().join("missing.yaml"), "i1")
        .failure()
        .stderr(predicate::str::contains("file not found"));
    assert!(!store_path(&dir).exists());
}

#[test]
fn merge_malformed_learnings_fails_without_touching_store() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);
    let before = std::fs::read(store_path(&dir)).unwrap();

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "project: P3\nlearnings:\n  - id: L9\n    severity: extreme\n").unwrap();
    merge(&dir, &bad, "i3")
        .failure()
        .stderr(predicate::str::contains("failed to parse"));

    assert_eq!(std::fs::read(store_path(&dir)).unwrap(), before);
}

#[test]
fn merge_respects_store_flag() {
    let dir = TempDir::new().unwrap();
    let custom = dir.path().join("kb/learnings.yaml");
    let a = write_learnings(&dir, "a.yaml", "P1", &[("L1", "low", "R1")]);

    learnloop(&dir)
        .arg("--store")
        .arg(&custom)
        .args(["merge", "--iteration-learnings"])
        .arg(&a)
        .args([
            "--discovered-in",
            "i1",
            "--duration",
            "1",
            "--healing-rounds",
            "0",
            "--files-modified",
            "0",
        ])
        .assert()
        .success();

    assert!(custom.exists());
    assert!(!store_path(&dir).exists());
}

#[test]
fn relative_store_flag_resolves_against_root() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir_all(&sub).unwrap();
    let a = write_learnings(&dir, "a.yaml", "P1", &[("L1", "low", "R1")]);

    learnloop(&dir)
        .current_dir(&sub)
        .args(["--store", "kb.yaml", "merge", "--iteration-learnings"])
        .arg(&a)
        .args([
            "--discovered-in",
            "i1",
            "--duration",
            "1",
            "--healing-rounds",
            "0",
            "--files-modified",
            "0",
        ])
        .assert()
        .success();

    assert!(dir.path().join("kb.yaml").exists());
    assert!(!sub.join("kb.yaml").exists());

    learnloop(&dir)
        .current_dir(&sub)
        .args(["--store", "kb.yaml", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PATTERN-001"));
}

#[test]
fn rust_log_enables_debug_output() {
    let dir = TempDir::new().unwrap();
    let a = write_learnings(&dir, "a.yaml", "P1", &[("L1", "low", "R1")]);

    learnloop(&dir)
        .env("RUST_LOG", "debug")
        .args(["merge", "--iteration-learnings"])
        .arg(&a)
        .args([
            "--discovered-in",
            "i1",
            "--duration",
            "1",
            "--healing-rounds",
            "0",
            "--files-modified",
            "0",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("atomic write complete"));
}

#[test]
fn default_log_level_hides_debug_output() {
    let dir = TempDir::new().unwrap();
    let a = write_learnings(&dir, "a.yaml", "P1", &[("L1", "low", "R1")]);

    merge(&dir, &a, "i1")
        .success()
        .stderr(predicate::str::contains("atomic write complete").not());
}

// ---------------------------------------------------------------------------
// learnloop detect
// ---------------------------------------------------------------------------

#[test]
fn detect_ranks_recurring_patterns() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);

    let out = learnloop(&dir)
        .args(["detect", "--min-occurrences", "2", "--min-severity", "medium"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["patterns_found"], 1);
    assert_eq!(report["min_severity"], "medium");
    assert_eq!(report["patterns"][0]["pattern_id"], "PATTERN-001");
    assert_eq!(report["patterns"][0]["impact_score"], 30.0);
}

#[test]
fn detect_threshold_from_config() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);
    std::fs::write(
        dir.path().join(".learnloop/config.yaml"),
        "detection:\n  min_occurrences: 3\n",
    )
    .unwrap();

    learnloop(&dir)
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"patterns_found\": 0"));
}

#[test]
fn detect_writes_output_file() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);
    let out = dir.path().join("patterns.json");

    learnloop(&dir)
        .args(["detect", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Patterns written to"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["patterns_found"], 1);
}

#[test]
fn detect_rejects_unknown_severity() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);
    learnloop(&dir)
        .args(["detect", "--min-severity", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid severity"));
}

#[test]
fn detect_without_store_fails() {
    let dir = TempDir::new().unwrap();
    learnloop(&dir)
        .arg("detect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

// ---------------------------------------------------------------------------
// learnloop status
// ---------------------------------------------------------------------------

#[test]
fn status_unknown_pattern_fails_and_leaves_store() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);
    let before = std::fs::read(store_path(&dir)).unwrap();

    learnloop(&dir)
        .args(["status", "PATTERN-999", "IMPLEMENTED"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pattern not found: PATTERN-999"));

    assert_eq!(std::fs::read(store_path(&dir)).unwrap(), before);
}

#[test]
fn status_implemented_is_idempotent() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);

    learnloop(&dir)
        .args([
            "status",
            "PATTERN-001",
            "IMPLEMENTED",
            "--meta",
            "implemented_in_plan=plan-6",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("status set to IMPLEMENTED"));
    let once = std::fs::read(store_path(&dir)).unwrap();

    learnloop(&dir)
        .args(["status", "PATTERN-001", "IMPLEMENTED"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no change"));
    assert_eq!(std::fs::read(store_path(&dir)).unwrap(), once);

    let store = load_store(&dir);
    assert_eq!(
        store["patterns"][0]["implemented_in_plan"].as_str(),
        Some("plan-6")
    );
}

#[test]
fn status_without_store_fails() {
    let dir = TempDir::new().unwrap();
    learnloop(&dir)
        .args(["status", "PATTERN-001", "VERIFIED"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn status_metadata_json() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);

    learnloop(&dir)
        .args([
            "status",
            "PATTERN-001",
            "VERIFIED",
            "--metadata-json",
            r#"{"verified_in": "plan-7", "regressions": 0}"#,
        ])
        .assert()
        .success();

    let store = load_store(&dir);
    let p = &store["patterns"][0];
    assert_eq!(p["status"].as_str(), Some("VERIFIED"));
    assert_eq!(p["verified_in"].as_str(), Some("plan-7"));
    assert_eq!(p["regressions"].as_u64(), Some(0));
}

#[test]
fn status_meta_keeps_free_text_notes() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);

    learnloop(&dir)
        .args([
            "status",
            "PATTERN-001",
            "IMPLEMENTED",
            "--meta",
            "note=cause: missing tsconfig path",
            "--meta",
            "review=# see plan-6",
        ])
        .assert()
        .success();

    let store = load_store(&dir);
    let p = &store["patterns"][0];
    assert_eq!(p["note"].as_str(), Some("cause: missing tsconfig path"));
    assert_eq!(p["review"].as_str(), Some("# see plan-6"));
}

// ---------------------------------------------------------------------------
// learnloop vision
// ---------------------------------------------------------------------------

#[test]
fn vision_from_store_with_builtin_template() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);
    let out = dir.path().join("plan-6/vision.md");

    learnloop(&dir)
        .args(["vision", "--pattern", "PATTERN-001", "--plan-id", "plan-6", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Vision generated"))
        .stdout(predicate::str::contains("PATTERN-001"));

    let vision = std::fs::read_to_string(&out).unwrap();
    assert!(vision.contains("**Plan:** plan-6"));
    assert!(vision.contains("- P1\n- P2"));
    assert!(!vision.contains("{PATTERN_ID}"));
}

#[test]
fn vision_from_detect_entry_reports_unreplaced() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);

    let report = learnloop(&dir)
        .arg("detect")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&report).unwrap();
    let pattern_json = dir.path().join("pattern.json");
    std::fs::write(&pattern_json, report["patterns"][0].to_string()).unwrap();

    let template = dir.path().join("template.md");
    std::fs::write(&template, "# {PATTERN_NAME}\nOwner: {OWNER}\n").unwrap();
    let out = dir.path().join("vision.md");

    learnloop(&dir)
        .arg("vision")
        .arg("--pattern-json")
        .arg(&pattern_json)
        .args(["--plan-id", "plan-6", "--template"])
        .arg(&template)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("unreplaced placeholders"))
        .stderr(predicate::str::contains("OWNER"));

    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "# Issue L1\nOwner: {OWNER}\n"
    );
}

#[test]
fn vision_requires_a_pattern_source() {
    let dir = TempDir::new().unwrap();
    learnloop(&dir)
        .args(["vision", "--plan-id", "plan-6", "--output", "v.md"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// learnloop list / show / config
// ---------------------------------------------------------------------------

#[test]
fn list_and_show() {
    let dir = TempDir::new().unwrap();
    recurring_store(&dir);

    learnloop(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("PATTERN-001"))
        .stdout(predicate::str::contains("critical"));

    learnloop(&dir)
        .args(["list", "--status", "VERIFIED"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no patterns"));

    learnloop(&dir)
        .args(["show", "PATTERN-001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Projects:    P1, P2"));
}

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    learnloop(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_missing_template() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".learnloop")).unwrap();
    std::fs::write(
        dir.path().join(".learnloop/config.yaml"),
        "vision:\n  template: missing.md\n",
    )
    .unwrap();
    learnloop(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("vision.template not found"));
}
