mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{init_logging, monitor_in, page, target, RecordingNotifier, ScriptedFetcher};
use labwatch_engine::{
    CheckOutcome, ContentDigest, FailureKind, FsHashLedger, FsSnapshotStore, HashLedger,
    MessageTemplate, MonitorError, SnapshotStore, TargetMonitor, TextNormalizer, LEDGER_FILENAME,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn ledger_text(root: &Path, id: &str) -> String {
    fs::read_to_string(root.join(id).join(LEDGER_FILENAME)).unwrap()
}

#[tokio::test]
async fn baseline_then_unchanged_then_change() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let fetcher = ScriptedFetcher::serving(&page("WBC 6.1"));
    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = monitor_in(root, fetcher.clone())
        .with_notifier(notifier.clone(), MessageTemplate::default());
    let p1 = target("P1");

    // First observation establishes the baseline.
    let outcome = monitor.poll(&p1).await.unwrap();
    let CheckOutcome::BaselineEstablished(first) = outcome else {
        panic!("expected baseline, got {outcome:?}");
    };
    let d1 = ContentDigest::of_text("WBC 6.1");
    assert_eq!(first.digest, d1);
    assert_eq!(ledger_text(root, "P1"), d1.as_str());
    assert_eq!(
        files_in(&root.join("P1")),
        vec![
            "20240101_100000_UTC.html",
            "20240101_100000_UTC.sha256",
            "last_hash.txt"
        ]
    );
    assert_eq!(fs::read_to_string(&first.digest_path).unwrap(), d1.as_str());
    assert_eq!(notifier.count(), 0);

    // Same content: nothing written.
    let outcome = monitor.poll(&p1).await.unwrap();
    assert_eq!(outcome, CheckOutcome::Unchanged(d1.clone()));
    assert_eq!(files_in(&root.join("P1")).len(), 3);
    assert_eq!(ledger_text(root, "P1"), d1.as_str());
    assert_eq!(notifier.count(), 0);

    // New content: second snapshot pair, ledger advanced, one notification.
    fetcher.set_page(&page("WBC 9.4"));
    let outcome = monitor.poll(&p1).await.unwrap();
    let d2 = ContentDigest::of_text("WBC 9.4");
    match &outcome {
        CheckOutcome::ChangeDetected { previous, snapshot } => {
            assert_eq!(previous, &d1);
            assert_eq!(snapshot.digest, d2);
            assert_eq!(snapshot.captured_at, "20240101_100001_UTC");
        }
        other => panic!("expected change, got {other:?}"),
    }
    assert_eq!(ledger_text(root, "P1"), d2.as_str());
    assert_eq!(files_in(&root.join("P1")).len(), 5);
    assert_eq!(
        notifier.messages.lock().unwrap().clone(),
        vec![(
            "P1".to_string(),
            "Update detected for patient P1 at 20240101_100001_UTC".to_string()
        )]
    );

    // Prior snapshot untouched.
    assert_eq!(
        fs::read_to_string(&first.content_path).unwrap(),
        page("WBC 6.1")
    );
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn markup_only_change_is_not_a_change() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = ScriptedFetcher::serving(&page("<b>WBC</b> 6.1"));
    let monitor = monitor_in(temp.path(), fetcher.clone());
    let p1 = target("P1");

    monitor.poll(&p1).await.unwrap();
    fetcher.set_page(&page("<span class=\"hl\">WBC</span>\n  6.1"));
    let outcome = monitor.poll(&p1).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::Unchanged(_)));
}

#[tokio::test]
async fn inline_script_change_is_not_a_change() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let fetcher = ScriptedFetcher::serving(&page(
        "<script>var rendered='10:31';</script>WBC 6.1",
    ));
    let monitor = monitor_in(temp.path(), fetcher.clone())
        .with_notifier(notifier.clone(), MessageTemplate::default());
    let p1 = target("P1");

    monitor.poll(&p1).await.unwrap();
    fetcher.set_page(&page(
        "<script>var rendered='10:41';</script><style>.x{}</style>WBC 6.1",
    ));
    let outcome = monitor.poll(&p1).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::Unchanged(_)));
    assert_eq!(notifier.count(), 0);
    assert_eq!(files_in(&temp.path().join("P1")).len(), 3);
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let fetcher = ScriptedFetcher::serving(&page("v1"));
    let monitor = monitor_in(root, fetcher.clone());
    let p1 = target("P1");

    monitor.poll(&p1).await.unwrap();
    let before = files_in(&root.join("P1"));

    fetcher.set_failure(FailureKind::Timeout);
    let outcome = monitor.poll(&p1).await.unwrap();
    let CheckOutcome::FetchFailed(err) = outcome else {
        panic!("expected fetch failure");
    };
    assert_eq!(err.kind, FailureKind::Timeout);
    assert_eq!(files_in(&root.join("P1")), before);
    assert_eq!(ledger_text(root, "P1"), ContentDigest::of_text("v1").as_str());
}

#[tokio::test]
async fn first_fetch_failure_creates_nothing() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = ScriptedFetcher::serving("");
    fetcher.set_failure(FailureKind::HttpStatus(503));
    let monitor = monitor_in(temp.path(), fetcher);

    let outcome = monitor.poll(&target("P1")).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::FetchFailed(_)));
    assert!(!temp.path().join("P1").exists());
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_check() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = ScriptedFetcher::serving(&page("v1"));
    let notifier = Arc::new(RecordingNotifier::failing());
    let monitor = monitor_in(temp.path(), fetcher.clone())
        .with_notifier(notifier.clone(), MessageTemplate::new("{id} changed"));
    let p1 = target("P1");

    monitor.poll(&p1).await.unwrap();
    fetcher.set_page(&page("v2"));
    let outcome = monitor.poll(&p1).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::ChangeDetected { .. }));
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn explicit_previous_digest_drives_the_decision() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let fetcher = ScriptedFetcher::serving(&page("v1"));
    let monitor = monitor_in(temp.path(), fetcher);
    let p1 = target("P1");

    let same = ContentDigest::of_text("v1");
    let outcome = monitor.check(&p1, Some(&same)).await.unwrap();
    assert_eq!(outcome, CheckOutcome::Unchanged(same));
    assert!(!temp.path().join("P1").exists());

    let other = ContentDigest::of_text("v0");
    let outcome = monitor.check(&p1, Some(&other)).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::ChangeDetected { .. }));
}

#[tokio::test]
async fn store_failure_is_fatal_and_keeps_ledger() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let fetcher = ScriptedFetcher::serving(&page("v1"));
    let monitor = monitor_in(root, fetcher.clone());
    let p1 = target("P1");
    monitor.poll(&p1).await.unwrap();

    // A snapshot whose label collides with an existing file cannot be written.
    let clashing = TargetMonitor::new(
        fetcher.clone(),
        Arc::new(FsSnapshotStore::new(root)),
        Arc::new(FsHashLedger::new(root)),
        Arc::new(|| "20240101_100000_UTC".to_string()),
    );
    fetcher.set_page(&page("v2"));
    let err = clashing.poll(&p1).await.unwrap_err();
    assert!(matches!(err, MonitorError::Persist { ref target, .. } if target == "P1"));
    assert_eq!(ledger_text(root, "P1"), ContentDigest::of_text("v1").as_str());
    assert_eq!(
        fs::read_to_string(root.join("P1").join("20240101_100000_UTC.html")).unwrap(),
        page("v1")
    );
}

#[tokio::test]
async fn unwritable_archive_root_is_a_persistence_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let file_root = temp.path().join("not_a_dir");
    fs::write(&file_root, "x").unwrap();
    let monitor = monitor_in(&file_root, ScriptedFetcher::serving(&page("v1")));

    let err = monitor.poll(&target("P1")).await.unwrap_err();
    assert!(matches!(err, MonitorError::Persist { .. }));
}

#[tokio::test]
async fn corrupt_ledger_re_establishes_baseline() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("P1")).unwrap();
    fs::write(root.join("P1").join(LEDGER_FILENAME), "garbage").unwrap();

    let ledger = FsHashLedger::new(root);
    assert_eq!(ledger.load("P1").unwrap(), None);

    let monitor = monitor_in(root, ScriptedFetcher::serving(&page("v1")));
    let outcome = monitor.poll(&target("P1")).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::BaselineEstablished(_)));
    assert_eq!(
        ledger.load("P1").unwrap(),
        Some(ContentDigest::of_text("v1"))
    );
}

#[tokio::test]
async fn history_lists_snapshots_in_order() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let fetcher = ScriptedFetcher::serving(&page("v1"));
    let monitor = monitor_in(root, fetcher.clone())
        .with_normalizer(TextNormalizer::new("form#form1").unwrap());
    let p1 = target("P1");
    for body in ["v1", "v2", "v3"] {
        fetcher.set_page(&page(body));
        monitor.poll(&p1).await.unwrap();
    }

    let store = FsSnapshotStore::new(root);
    let history = store.list("P1").unwrap();
    let labels: Vec<_> = history.iter().map(|s| s.captured_at.as_str()).collect();
    assert_eq!(
        labels,
        vec!["20240101_100000_UTC", "20240101_100001_UTC", "20240101_100002_UTC"]
    );
    assert_eq!(store.read_content(&history[2]).unwrap(), page("v3"));
    assert!(store.list("nobody").unwrap().is_empty());
}
