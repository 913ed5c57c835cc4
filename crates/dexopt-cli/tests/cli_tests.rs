use assert_cmd::Command;
use dexopt_test_helpers::fixtures;
use dexopt_test_helpers::query::has_class;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn dexopt_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dexopt"))
}

fn write_sample(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("app.json");
    fs::write(&path, fixtures::sample_app_json()).unwrap();
    path
}

// ============================================================================
// OPTIMIZATION TESTS
// ============================================================================

/// Test the pass summary is printed and the optimized image written
#[test]
fn test_optimize_writes_output_image() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);
    let output = temp_dir.path().join("out.json");

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "single-impl: removed_interfaces=2 invoke_interface_rewrites=1 cycles=2",
        ));

    let program = dexopt_core::read_image(&output).unwrap();
    assert!(!has_class(&program, "Lcom/app/Repository;"));
    assert!(!has_class(&program, "Lcom/app/Failure;"));
    assert!(has_class(&program, "Lcom/app/DiskRepository;"));
}

/// Test nothing is written without -o
#[test]
fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("removed_interfaces=2"));

    let entries = fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

/// Test --dump prints the rewritten classes
#[test]
fn test_dump_prints_rewritten_code() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .arg("--dump")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "invoke-virtual Lcom/app/DiskRepository;.load:(I)Lcom/app/DiskRepository;",
        ))
        .stdout(predicate::str::contains(".class public interface abstract Lcom/app/Repository;").not());
}

/// Test --max-cycles caps the driver
#[test]
fn test_max_cycles_flag() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .arg("--max-cycles")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("cycles=1"));
}

#[test]
fn test_zero_max_cycles_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .arg("--max-cycles")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-cycles must be at least 1"));
}

/// Test a profile file is accepted
#[test]
fn test_pgo_profile_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);
    fs::write(temp_dir.path().join("profile.json"), r#"{ "hot": ["Lcom/app/Main;"] }"#).unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .arg("--pgo")
        .arg("profile.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed_interfaces=2"));
}

// ============================================================================
// CONFIGURATION TESTS
// ============================================================================

/// Test --init creates a loadable configuration
#[test]
fn test_init_creates_config_file() {
    let temp_dir = TempDir::new().unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("dexopt.yaml"));

    let config = fs::read_to_string(temp_dir.path().join("dexopt.yaml")).unwrap();
    assert!(config.contains("singleImpl"));
    assert!(config.contains("maxCycles"));
}

/// Test a black-listed interface survives
#[test]
fn test_config_black_list_is_honored() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);
    let config = r#"
singleImpl:
  blackList:
    - Lcom/app/Failure;
"#;
    fs::write(temp_dir.path().join("strict.yaml"), config).unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .arg("--config")
        .arg("strict.yaml")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed_interfaces=1"));
}

/// Test dexopt.yaml in the working directory is picked up
#[test]
fn test_default_config_file_is_picked_up() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_sample(&temp_dir);
    fs::write(temp_dir.path().join("dexopt.yaml"), "passes: []\n").unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("single-impl").not());
}

// ============================================================================
// ERROR TESTS
// ============================================================================

#[test]
fn test_missing_input_argument() {
    let temp_dir = TempDir::new().unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No input image specified"));
}

#[test]
fn test_missing_input_file() {
    let temp_dir = TempDir::new().unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg("nope.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load image"));
}

#[test]
fn test_malformed_image() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("bad.json"), r#"{ "library": [], "dexes": [[{ "name": "NotADescriptor" }]] }"#)
        .unwrap();

    dexopt_cmd()
        .current_dir(&temp_dir)
        .arg("bad.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load image"));
}

#[test]
fn test_help_lists_options() {
    dexopt_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-cycles"))
        .stdout(predicate::str::contains("--dump"));
}
