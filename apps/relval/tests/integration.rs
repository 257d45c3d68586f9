//! Integration tests for the relval CLI

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const REV1: &str = "aliroot-v5-05-Rev-01-Linux-x86_64.tar.gz";

fn relval() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_relval"));
    for var in [
        "RELVAL_DB_PATH",
        "RELVAL_LOG_DIR",
        "RELVAL_CATALOG_URL",
        "RELVAL_DRY_RUN",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Lay out a file catalog and a config file pointing everything into `dir`
fn setup(dir: &Path) -> std::path::PathBuf {
    let root = dir.display();
    let catalog = dir.join("catalog");
    std::fs::create_dir_all(&catalog).unwrap();
    std::fs::write(
        catalog.join("Packages-Validation"),
        format!(
            "{REV1} AliRoot v5-05-Rev-01 Linux-x86_64 VO_ALICE@AliRoot::v5-05-Rev-01 \
             VO_ALICE@ROOT::v5-34-08\n"
        ),
    )
    .unwrap();
    std::fs::write(catalog.join("Packages"), "").unwrap();

    let config = format!(
        r#"
[general]
log_dir = "{root}/logs"
db_path = "{root}/db/relval.sqlite"
pid_file = "{root}/run/relval.pid"
catalog_url = "file://{root}/catalog"
results_url = "http://results.local/$SESSIONTAG"

[validation]
unpack_dir = "{root}/packages/$ARCH/$VERSION"
module_file = "{root}/modules/$ARCH/AliRoot/$VERSION"
unpack_cmd = "echo $URL > $DESTDIR/source"
run_cmd = "echo $SESSIONTAG >> {root}/started"
status_cmd = "exit $(cat {root}/status)"

[mail]
enabled = false

[lock]
attempts = 2
retry_delay_ms = 10
"#
    );
    let path = dir.join("relval.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    relval()
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("Failed to execute relval")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_cli_version() {
    let output = relval()
        .arg("--version")
        .output()
        .expect("Failed to execute relval");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("relval"));
}

#[test]
fn test_cli_help() {
    let output = relval()
        .arg("--help")
        .output()
        .expect("Failed to execute relval");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Release validation queue controller"));
    assert!(stdout.contains("queue-validation"));
    assert!(stdout.contains("start-next-queued-validation"));
    assert!(stdout.contains("refresh-validations"));
}

#[test]
fn test_cli_invalid_command() {
    let output = relval()
        .arg("invalid-command")
        .output()
        .expect("Failed to execute relval");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_cli_ambiguous_prefix() {
    let output = relval()
        .arg("list-")
        .output()
        .expect("Failed to execute relval");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir.path().join("absent.toml"), &["list"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_queue_then_list_json() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let queued = json(&run(&config, &["--json", "queue-validation", REV1]));
    assert_eq!(queued["type"], "QueueReport");
    assert_eq!(queued["data"]["outcome"]["outcome"], "enqueued");

    let again = json(&run(&config, &["--json", "add-validation", "--tarball", REV1]));
    assert_eq!(again["data"]["outcome"]["outcome"], "already_queued");

    let listed = json(&run(&config, &["--json", "list-queued-validations"]));
    assert_eq!(listed["type"], "ValidationList");
    let validations = listed["data"]["validations"].as_array().unwrap();
    assert_eq!(validations.len(), 1);
    assert_eq!(validations[0]["status"], "QUEUED");
    assert_eq!(validations[0]["package"]["tarball"], REV1);

    let known = json(&run(&config, &["--json", "list-known-packages"]));
    assert_eq!(known["data"]["packages"].as_array().unwrap().len(), 1);
}

#[test]
fn test_queue_reads_tarball_from_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let mut child = relval()
        .arg("--config")
        .arg(&config)
        .args(["--json", "queue-validation"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute relval");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(format!("{REV1}\n").as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let queued = json(&output);
    assert_eq!(queued["data"]["package"]["tarball"], REV1);
}

#[test]
fn test_unknown_tarball_fails() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let output = run(&config, &["queue-validation", "nope.tar.gz"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_dispatch_and_refresh_cycle() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    json(&run(&config, &["--json", "queue-validation", REV1]));

    let dispatched = json(&run(&config, &["--json", "run-next"]));
    assert_eq!(dispatched["type"], "DispatchReport");
    assert_eq!(dispatched["data"]["validation"]["status"], "RUNNING");
    assert!(dir.path().join("started").exists());
    assert!(dir
        .path()
        .join("modules/x86_64/AliRoot/v5-05-Rev-01")
        .exists());

    std::fs::write(dir.path().join("status"), "100").unwrap();
    let still_running = json(&run(&config, &["--json", "update"]));
    assert_eq!(still_running["data"]["unchanged"], 1);

    std::fs::write(dir.path().join("status"), "102").unwrap();
    let finished = json(&run(&config, &["--json", "refresh-validations"]));
    let transitions = finished["data"]["transitions"].as_array().unwrap();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0]["status"], "DONE_OK");

    let idle = json(&run(&config, &["--json", "start-next"]));
    assert!(idle["data"]["validation"].is_null());
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let queued = json(&run(&config, &["--json", "--dryrun", "queue-validation", REV1]));
    assert_eq!(queued["data"]["outcome"]["outcome"], "skipped");

    let listed = json(&run(&config, &["--json", "list-validations"]));
    assert!(listed["data"]["validations"].as_array().unwrap().is_empty());

    json(&run(&config, &["--json", "queue-validation", REV1]));
    let dispatched = json(&run(&config, &["--json", "--dry-run", "run-next"]));
    assert_eq!(dispatched["data"]["dry_run"], true);
    assert!(dispatched["data"]["module_content"]
        .as_str()
        .unwrap()
        .contains("#%Module1.0"));
    assert!(!dir.path().join("started").exists());

    let listed = json(&run(&config, &["--json", "list-queued-validations"]));
    assert_eq!(listed["data"]["validations"].as_array().unwrap().len(), 1);
}

#[test]
fn test_table_output_lists_validations() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    json(&run(&config, &["--json", "queue-validation", REV1]));
    let output = run(&config, &["list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Software"));
    assert!(stdout.contains("QUEUED"));

    let output = run(&config, &["list", "--extended"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Package VO_ALICE@AliRoot::v5-05-Rev-01:"));
}
