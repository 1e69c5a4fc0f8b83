// tests/drive_checker_gate.rs

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};

use autosweep::drives::report::{ERROR_LOG_FILE, REPORT_FILE};
use autosweep::drives::{DriveTask, TaskOutcome, FAILURE_NOTICE_TASK, TASK_NAME};
use autosweep::fs::mock::MockFileSystem;
use autosweep::fs::FileSystem;
use autosweep::gate::marker::marker_path;
use autosweep::gate::RunMarker;
use autosweep::types::FailurePolicy;
use autosweep_test_utils::builders::ConfigFileBuilder;
use autosweep_test_utils::fake_drives::{
    failing_ata_json, healthy_ata_json, nvme_json, FakeProbe, RecordingNotifier,
};
use autosweep_test_utils::init_tracing;

const STATE: &str = "reports";

fn day_start() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).single().unwrap()
}

fn task(
    fs: &Arc<MockFileSystem>,
    probe: &FakeProbe,
    notifier: &RecordingNotifier,
    policy: FailurePolicy,
) -> DriveTask {
    let cfg = ConfigFileBuilder::new()
        .drive_dirs(STATE)
        .on_failure(policy)
        .build();
    DriveTask::new(
        cfg.drive_checker,
        fs.clone(),
        Box::new(probe.clone()),
        Box::new(notifier.clone()),
    )
}

fn marker(fs: &MockFileSystem) -> Option<RunMarker> {
    let path = marker_path(Path::new(STATE), TASK_NAME);
    fs.exists(&path)
        .then(|| RunMarker::parse(&fs.read_to_string(&path).unwrap()).unwrap())
}

#[tokio::test]
async fn test_144_invocations_in_a_day_scan_once() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), failing_ata_json("/dev/sda"))]);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let mut checked = 0;
    for i in 0..144 {
        let now = day_start() + ChronoDuration::minutes(10 * i);
        match task.run(now, false).await.unwrap() {
            TaskOutcome::Checked(_) => checked += 1,
            TaskOutcome::Skipped { last_run } => assert_eq!(last_run, day_start()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(checked, 1);
    assert_eq!(probe.scans(), 1);
    assert_eq!(notifier.sent().len(), 1);
    assert!(fs.exists(&Path::new(STATE).join(REPORT_FILE)));

    // Next calendar day runs again.
    let tomorrow = day_start() + ChronoDuration::days(1);
    assert!(matches!(
        task.run(tomorrow, false).await.unwrap(),
        TaskOutcome::Checked(_)
    ));
    assert_eq!(probe.scans(), 2);
}

#[tokio::test]
async fn test_failed_check_keeps_marker_and_retries() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    probe.set_fail_scan(true);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let outcome = task.run(day_start(), false).await.unwrap();
    assert!(matches!(outcome, TaskOutcome::Failed(ref e) if e.contains("command not found")));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(marker(&fs), None);

    let error_log = fs
        .read_to_string(&Path::new(STATE).join(ERROR_LOG_FILE))
        .unwrap();
    assert!(error_log.contains("enumerating drives"));

    // Failure notification went out.
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("failed"));

    // Ten minutes later the check is retried and succeeds.
    probe.set_fail_scan(false);
    let later = day_start() + ChronoDuration::minutes(10);
    let outcome = task.run(later, false).await.unwrap();
    assert!(matches!(outcome, TaskOutcome::Checked(ref c) if c.healthy()));
    assert_eq!(probe.scans(), 2);
    assert_eq!(marker(&fs), Some(RunMarker::new(later)));
}

#[tokio::test]
async fn test_failing_check_all_day_sends_one_failure_notice() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    probe.set_fail_scan(true);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let mut failed = 0;
    for i in 0..144 {
        let now = day_start() + ChronoDuration::minutes(10 * i);
        if let TaskOutcome::Failed(_) = task.run(now, false).await.unwrap() {
            failed += 1;
        }
    }

    assert_eq!(failed, 144);
    assert_eq!(probe.scans(), 144);
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(marker(&fs), None);
    assert!(fs.exists(&marker_path(Path::new(STATE), FAILURE_NOTICE_TASK)));

    let error_log = fs
        .read_to_string(&Path::new(STATE).join(ERROR_LOG_FILE))
        .unwrap();
    assert_eq!(error_log.lines().count(), 144);

    // A new day gets a fresh notice.
    let tomorrow = day_start() + ChronoDuration::days(1);
    task.run(tomorrow, false).await.unwrap();
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_undelivered_failure_notice_is_retried() {
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![]);
    probe.set_fail_scan(true);
    let notifier = RecordingNotifier::new();
    notifier.set_failing(true);
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    task.run(day_start(), false).await.unwrap();
    notifier.set_failing(false);
    task.run(day_start() + ChronoDuration::minutes(10), false)
        .await
        .unwrap();
    task.run(day_start() + ChronoDuration::minutes(20), false)
        .await
        .unwrap();

    // Attempted twice: once undelivered, once delivered.
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_corrupt_marker_counts_as_due() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(marker_path(Path::new(STATE), TASK_NAME), "not a date");
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let now = day_start() + ChronoDuration::hours(9);
    assert!(matches!(
        task.run(now, false).await.unwrap(),
        TaskOutcome::Checked(_)
    ));
    assert_eq!(probe.scans(), 1);

    let text = fs
        .read_to_string(&marker_path(Path::new(STATE), TASK_NAME))
        .unwrap();
    let stored = DateTime::parse_from_rfc3339(text.trim()).unwrap();
    assert_eq!(stored, now);
}

#[tokio::test]
async fn test_poll_that_is_not_due_leaves_no_trace() {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(
        marker_path(Path::new(STATE), TASK_NAME),
        RunMarker::new(day_start()).render(),
    );
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    let notifier = RecordingNotifier::new();
    let mut cfg = ConfigFileBuilder::new().drive_dirs(STATE).build();
    cfg.drive_checker.report_dir = "drive-reports".into();
    let task = DriveTask::new(
        cfg.drive_checker,
        fs.clone(),
        Box::new(probe.clone()),
        Box::new(notifier.clone()),
    );

    let outcome = task
        .run(day_start() + ChronoDuration::minutes(10), false)
        .await
        .unwrap();
    assert!(matches!(outcome, TaskOutcome::Skipped { last_run } if last_run == day_start()));
    assert_eq!(probe.scans(), 0);
    assert!(!fs.exists(Path::new("drive-reports")));
    assert!(!fs.exists(&Path::new(STATE).join(format!("{TASK_NAME}.lock"))));
}

#[tokio::test]
async fn test_suppress_policy_marks_failed_day_as_done() {
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    probe.fail_query("/dev/sda", "read timeout");
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Suppress);

    assert!(matches!(
        task.run(day_start(), false).await.unwrap(),
        TaskOutcome::Failed(_)
    ));
    assert_eq!(marker(&fs), Some(RunMarker::new(day_start())));

    let later = day_start() + ChronoDuration::hours(1);
    assert!(matches!(
        task.run(later, false).await.unwrap(),
        TaskOutcome::Skipped { .. }
    ));
    assert_eq!(probe.scans(), 1);
}

#[tokio::test]
async fn test_three_failing_drives_one_notification() {
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![
        ("/dev/sda".into(), failing_ata_json("/dev/sda")),
        ("/dev/sdb".into(), healthy_ata_json("/dev/sdb")),
        ("/dev/nvme0".into(), nvme_json("/dev/nvme0", 3)),
        ("/dev/nvme1".into(), nvme_json("/dev/nvme1", 1)),
    ]);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let outcome = task.run(day_start(), false).await.unwrap();
    let TaskOutcome::Checked(check) = outcome else {
        panic!("expected a completed check");
    };
    assert_eq!(check.drives.len(), 4);
    assert_eq!(check.alert.as_ref().unwrap().drives.len(), 3);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    let body = &sent[0].body;
    assert!(body.contains("Drive /dev/sda, type ATA:"));
    assert!(body.contains("Drive /dev/nvme0, type NVME:"));
    assert!(body.contains("Drive /dev/nvme1, type NVME:"));
    assert!(!body.contains("/dev/sdb"));

    let report = fs.read_to_string(&Path::new(STATE).join(REPORT_FILE)).unwrap();
    assert!(report.contains(" DRIVE 4 "));
}

#[tokio::test]
async fn test_notification_failure_still_updates_marker() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), failing_ata_json("/dev/sda"))]);
    let notifier = RecordingNotifier::new();
    notifier.set_failing(true);
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let outcome = task.run(day_start(), false).await.unwrap();
    let TaskOutcome::Checked(check) = outcome else {
        panic!("expected a completed check");
    };
    assert!(check.notification_error.unwrap().contains("unreachable"));
    assert_eq!(marker(&fs), Some(RunMarker::new(day_start())));

    // Not retried within the day.
    let later = day_start() + ChronoDuration::minutes(10);
    assert!(matches!(
        task.run(later, false).await.unwrap(),
        TaskOutcome::Skipped { .. }
    ));
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_held_lock_skips_the_invocation() {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(
        Path::new(STATE).join(format!("{TASK_NAME}.lock")),
        "pid=1\n",
    );
    let probe = FakeProbe::new(vec![]);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    let outcome = task.run(day_start(), false).await.unwrap();
    assert!(matches!(outcome, TaskOutcome::Locked));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(probe.scans(), 0);
}

#[tokio::test]
async fn test_force_ignores_marker_and_lock_is_released() {
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    let notifier = RecordingNotifier::new();
    let task = task(&fs, &probe, &notifier, FailurePolicy::Retry);

    task.run(day_start(), false).await.unwrap();
    task.run(day_start() + ChronoDuration::minutes(1), true)
        .await
        .unwrap();
    assert_eq!(probe.scans(), 2);
    assert!(!fs.exists(&Path::new(STATE).join(format!("{TASK_NAME}.lock"))));
}

#[tokio::test]
async fn test_interval_period_and_quiet_failures() {
    let fs = Arc::new(MockFileSystem::new());
    let probe = FakeProbe::new(vec![("/dev/sda".into(), healthy_ata_json("/dev/sda"))]);
    let notifier = RecordingNotifier::new();
    let cfg = ConfigFileBuilder::new()
        .drive_dirs(STATE)
        .period("12h")
        .notify_on_failure(false)
        .build();
    let task = DriveTask::new(
        cfg.drive_checker,
        fs.clone(),
        Box::new(probe.clone()),
        Box::new(notifier.clone()),
    );

    let start = day_start() + ChronoDuration::hours(20);
    assert!(matches!(task.run(start, false).await.unwrap(), TaskOutcome::Checked(_)));
    assert_eq!(probe.queries(), 1);

    // Crossing midnight does not matter for an interval period.
    let next_day = start + ChronoDuration::hours(6);
    assert!(matches!(
        task.run(next_day, false).await.unwrap(),
        TaskOutcome::Skipped { .. }
    ));

    probe.set_fail_scan(true);
    let due = start + ChronoDuration::hours(12);
    assert!(matches!(task.run(due, false).await.unwrap(), TaskOutcome::Failed(_)));
    assert!(notifier.sent().is_empty());
    assert!(fs.exists(&Path::new(STATE).join(ERROR_LOG_FILE)));
}
