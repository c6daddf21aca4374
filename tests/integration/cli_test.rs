//! Binary tests: exit status and filesystem effects of `sqlrun`.

use std::path::Path;
use std::process::Command;

/// Runs the sqlrun binary with an isolated config file.
fn run_sqlrun(config_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_sqlrun"))
        .arg("--config")
        .arg(config_dir.join("config.toml"))
        .args(args)
        .output()
        .expect("Failed to execute command");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}

#[test]
fn test_export_of_empty_folder_succeeds() {
    let work = tempfile::tempdir().unwrap();
    let sql_dir = work.path().join("project_sql");
    let output_dir = work.path().join("csv_files");
    std::fs::create_dir(&sql_dir).unwrap();

    let (code, stdout, _) = run_sqlrun(
        work.path(),
        &[
            "export",
            "-H",
            "127.0.0.1",
            "-d",
            "sql_course",
            "--sql-dir",
            sql_dir.to_str().unwrap(),
            "--output-dir",
            output_dir.to_str().unwrap(),
        ],
    );

    assert_eq!(code, 0);
    assert!(output_dir.is_dir());
    assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 0);
    assert!(stdout.contains("0 processed"));
}

#[test]
fn test_missing_sql_folder_exits_nonzero() {
    let work = tempfile::tempdir().unwrap();
    let missing = work.path().join("nope");

    let (code, _, stderr) = run_sqlrun(
        work.path(),
        &[
            "run",
            "-d",
            "sql_course",
            "--sql-dir",
            missing.to_str().unwrap(),
        ],
    );

    assert_eq!(code, 1);
    assert!(stderr.contains("I/O Error"), "stderr was: {stderr}");
}

#[test]
fn test_unknown_named_connection_exits_nonzero() {
    let work = tempfile::tempdir().unwrap();
    std::fs::write(
        work.path().join("config.toml"),
        "[connections.default]\ndatabase = \"sql_course\"\n",
    )
    .unwrap();

    let (code, _, stderr) = run_sqlrun(work.path(), &["run", "-c", "staging"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("staging"), "stderr was: {stderr}");
}
