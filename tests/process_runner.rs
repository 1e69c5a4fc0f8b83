// tests/process_runner.rs
#![cfg(unix)]

use std::sync::Arc;

use autosweep::exec::{ProcessRunner, CONFIG_ENV};
use autosweep::fs::RealFileSystem;
use autosweep::sweep::{DiscoveryRules, FileRunLog, Orchestrator};
use autosweep::types::ExecStatus;
use autosweep_test_utils::builders::ConfigFileBuilder;
use autosweep_test_utils::init_tracing;

#[tokio::test]
async fn test_scripts_see_config_path_and_run_in_scripts_dir() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let scripts = root.path().join("scripts");
    std::fs::create_dir(&scripts).unwrap();
    // Not executable: runs through the configured interpreter.
    std::fs::write(
        scripts.join("env.sh"),
        format!("echo \"${CONFIG_ENV}\"\nls\n"),
    )
    .unwrap();

    let config_path = root.path().join("Autosweep.toml");
    std::fs::write(&config_path, "").unwrap();

    let cfg = ConfigFileBuilder::new()
        .scripts_dir(&scripts)
        .logs_dir(root.path().join("logs"))
        .timeout("10s")
        .extensions(&["sh"])
        .no_interpreters()
        .interpreter("sh", "sh")
        .build();

    let fs = Arc::new(RealFileSystem);
    let rules = DiscoveryRules::from_config(&cfg).unwrap();
    let runner = ProcessRunner::from_config(&cfg, Some(&config_path));
    let sink = FileRunLog::new(fs.clone(), &cfg.sweep.logs_dir, cfg.sweep.output_limit);
    let mut orchestrator = Orchestrator::new(fs, &cfg.sweep.scripts_dir, rules, runner, sink);

    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.results.len(), 1);

    let result = &report.results[0];
    assert_eq!(result.status, ExecStatus::Success);
    let mut lines = result.stdout.lines();
    assert_eq!(lines.next(), Some(config_path.to_str().unwrap()));
    assert_eq!(lines.next(), Some("env.sh"));

    let run_dir = orchestrator.sink().run_dir().unwrap();
    let saved = std::fs::read_to_string(run_dir.join("env.sh.stdout.txt")).unwrap();
    assert_eq!(saved, result.stdout);
}
