use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const LDIF: &str = "version: 1

dn: dc=example,dc=com
objectClass: top
objectClass: domain
dc: example

dn: uid=jdoe,dc=example,dc=com
changetype: modify
replace: mail
mail: jdoe@example.com
";

fn ldifber() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ldifber"))
}

/// Helper to create a test LDIF file
fn create_test_ldif(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("input.ldif");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let output = ldifber().arg("--help").output().expect("Failed to execute process");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("reformat"));
    assert!(stdout.contains("to-ber"));
    assert!(stdout.contains("dump-ber"));
    assert!(stdout.contains("--duplicate-values"));
    assert!(stdout.contains("--trailing-spaces"));
}

#[test]
fn test_cli_version() {
    let output = ldifber().arg("--version").output().expect("Failed to execute process");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ldifber"));
}

#[test]
fn test_cli_missing_file() {
    let output = ldifber()
        .args(["validate", "nonexistent.ldif"])
        .output()
        .expect("Failed to execute process");

    assert!(!output.status.success());
}

#[test]
fn test_cli_missing_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, LDIF);

    let output = ldifber()
        .args(["--config", "nonexistent.toml", "validate"])
        .arg(&input)
        .output()
        .expect("Failed to execute process");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Settings file not found"));
}

#[test]
fn test_cli_validate() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, LDIF);

    let output = ldifber()
        .arg("validate")
        .arg(&input)
        .output()
        .expect("Failed to execute process");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 records OK"));
}

#[test]
fn test_cli_validate_reports_errors() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, "dn: cn=a\ncn: a\ncn: a\n");

    let output = ldifber()
        .args(["--duplicate-values", "reject", "validate"])
        .arg(&input)
        .output()
        .expect("Failed to execute process");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 of 1 records failed to parse"));
}

#[test]
fn test_cli_reformat_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, "dn: cn=a\ncn:: YQ==\nsn:: w6k=\n");

    let output = ldifber()
        .arg("reformat")
        .arg(&input)
        .output()
        .expect("Failed to execute process");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "version: 1\n\ndn: cn=a\ncn: a\nsn:: w6k=\n"
    );
}

#[test]
fn test_cli_to_ber_then_dump() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, LDIF);
    let ber = temp_dir.path().join("out.ber");

    let output = ldifber()
        .arg("to-ber")
        .arg(&input)
        .arg("-o")
        .arg(&ber)
        .output()
        .expect("Failed to execute process");
    assert!(output.status.success());

    let output = ldifber()
        .arg("dump-ber")
        .arg(&ber)
        .output()
        .expect("Failed to execute process");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0x64 [APPLICATION 4]"));
    assert!(stdout.contains("0x66 [APPLICATION 6]"));
    assert!(stdout.contains("\"uid=jdoe,dc=example,dc=com\""));
}

#[test]
fn test_cli_log_levels() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, LDIF);

    for level in &[
        "debug", "info", "warn", "error", "DEBUG", "INFO", "WARN", "ERROR",
    ] {
        let output = ldifber()
            .args(["--log-level", *level, "validate"])
            .arg(&input)
            .output()
            .expect("Failed to execute process");

        assert!(output.status.success(), "Failed for log level: {}", level);
    }
}

#[test]
fn test_cli_settings_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_ldif(&temp_dir, "dn: cn=a\ncn: a\ncn: a\n");

    let output = ldifber()
        .env("LDIFBER_DUPLICATE_VALUES", "reject")
        .arg("validate")
        .arg(&input)
        .output()
        .expect("Failed to execute process");

    assert!(!output.status.success());
}
