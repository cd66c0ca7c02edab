//! The watch loop driving real shell scripts

#![cfg(unix)]

use qscripts_cli::{WatchExit, run_watch};
use qscripts_core::{MonitorOptions, ReloadOrchestrator};
use qscripts_host::{QScriptsConfig, build_registry};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

fn monitor() -> ReloadOrchestrator {
    ReloadOrchestrator::new(
        build_registry(&QScriptsConfig::default()),
        MonitorOptions::default(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_reruns_until_shutdown() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    let out = dir.join("runs.txt");
    let main = write(dir, "main.sh", &format!("echo run >> '{}'\n", out.display()));

    let mut monitor = monitor();
    monitor.activate(&main).expect("Activation should run the script");

    let touched = main.clone();
    let toucher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        File::options()
            .write(true)
            .open(&touched)
            .and_then(|f| f.set_modified(SystemTime::now() + Duration::from_secs(10)))
            .expect("Failed to set modification time");
    });

    let exit = run_watch(&mut monitor, tokio::time::sleep(Duration::from_millis(1500))).await;
    toucher.await.unwrap();

    assert_eq!(exit, WatchExit::Interrupted);
    assert!(!monitor.is_monitoring());
    assert!(!monitor.has_session());
    let runs = fs::read_to_string(&out).unwrap().lines().count();
    assert_eq!(runs, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_ends_when_script_removed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let main = write(temp_dir.path(), "main.sh", "true\n");

    let mut monitor = monitor();
    monitor.activate(&main).expect("Activation should run the script");
    fs::remove_file(&main).unwrap();

    let exit = tokio::time::timeout(
        Duration::from_secs(5),
        run_watch(&mut monitor, std::future::pending::<()>()),
    )
    .await
    .expect("Watch loop should stop on its own");

    assert_eq!(exit, WatchExit::ScriptRemoved);
    assert!(!monitor.has_session());
}
