use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const MUTEX: &str = "\
mutex = Semaphore(1)
count = 0
## thread
mutex.wait()
count += 1
mutex.signal()
## thread
mutex.wait()
count += 1
mutex.signal()
";

fn write_script(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).expect("write script");
    path
}

fn sync_sim(args: &[&str], script: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sync-sim"))
        .args(["--no-config", "--no-color"])
        .args(args)
        .arg(script)
        .env_remove("RUST_LOG")
        .output()
        .expect("run sync-sim")
}

#[test]
fn check_reports_malformed_rows() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let script = write_script(tmp.path(), "bad.sync", "x = 1\n## thread\nx = = 1\nx += 1\n");

    let output = sync_sim(&["check"], &script);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("thread 0 row 0"), "got: {stdout}");
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn check_accepts_clean_script() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let script = write_script(tmp.path(), "mutex.sync", MUTEX);

    let output = sync_sim(&["check"], &script);
    assert!(
        output.status.success(),
        "check failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn step_emits_json_events() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let script = write_script(tmp.path(), "mutex.sync", MUTEX);

    let output = sync_sim(&["step", "--count", "2", "--json"], &script);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(events[0]["event"], "step");
    assert_eq!(events[0]["step"]["thread_name"], "A");
    assert_eq!(events[1]["step"]["thread_name"], "B");
    assert_eq!(events[1]["step"]["blocked"], true);
    // B stays queued on the second tick, so only A steps.
    assert_eq!(events.len(), 3);
}

#[test]
fn bounded_run_writes_trace() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let script = write_script(tmp.path(), "mutex.sync", MUTEX);
    let trace = tmp.path().join("trace.jsonl");

    let output = sync_sim(
        &[
            "run",
            "--steps",
            "3",
            "--delay-ms",
            "0",
            "--seed",
            "1",
            "--random",
            "--trace-log",
            trace.to_str().expect("utf-8 path"),
        ],
        &script,
    );
    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("3 tick(s)"), "got: {stderr}");

    let content = fs::read_to_string(&trace).expect("trace written");
    assert_eq!(content.lines().count(), 3);
    for line in content.lines() {
        let entry: serde_json::Value = serde_json::from_str(line).expect("json line");
        assert_eq!(entry["mode"], "random");
    }
}

#[cfg(unix)]
#[test]
fn interrupt_ends_unbounded_run() {
    use std::process::Stdio;
    use std::time::Duration;

    let tmp = tempfile::tempdir().expect("create temp dir");
    let script = write_script(tmp.path(), "mutex.sync", MUTEX);

    let child = Command::new(env!("CARGO_BIN_EXE_sync-sim"))
        .args(["--no-config", "--no-color", "run", "--delay-ms", "5"])
        .arg(&script)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn sync-sim");

    std::thread::sleep(Duration::from_millis(500));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("send SIGINT");
    assert!(status.success());

    let output = child.wait_with_output().expect("wait for sync-sim");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr={stderr}");
    assert!(stderr.contains("stopped: Stopped"), "got: {stderr}");
}

#[test]
fn missing_script_fails() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let output = sync_sim(&["check"], &tmp.path().join("nope.sync"));
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.sync"));
}

#[test]
fn demo_scripts_are_well_formed() {
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    let mut seen = 0;
    for entry in fs::read_dir(&demos).expect("demos dir") {
        let path = entry.expect("dir entry").path();
        if path.extension().is_some_and(|ext| ext == "sync") {
            let output = sync_sim(&["check"], &path);
            assert!(
                output.status.success(),
                "{} failed: {}",
                path.display(),
                String::from_utf8_lossy(&output.stdout)
            );
            seen += 1;
        }
    }
    assert!(seen >= 4);
}
