mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use support::{
    FakeLauncher, FakeMerger, Harness, InterruptingProbe, ScriptedProbe, Step, G1, G2, G3,
};
use winrec_capture_engine::{
    MergeOutcome, ShutdownSignal, StopOutcome, TickOutcome, WatcherState,
};
use winrec_platform_core::WindowGeometry;

async fn tick_n(harness: &mut Harness, n: usize) -> Vec<TickOutcome> {
    let mut outcomes = Vec::with_capacity(n);
    for _ in 0..n {
        outcomes.push(harness.watcher.tick().await);
    }
    outcomes
}

#[tokio::test]
async fn rotation_follows_geometry_changes_and_window_loss() {
    let probe = ScriptedProbe::geometries(&[Some(G1), Some(G1), Some(G2), None, Some(G1)]);
    let mut h = Harness::new("scenario_a", probe, FakeLauncher::default(), FakeMerger::default());

    let outcomes = tick_n(&mut h, 5).await;
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Started { segment: 1 },
            TickOutcome::Unchanged,
            TickOutcome::Rotated {
                closed: 1,
                started: 2
            },
            TickOutcome::Lost { closed: 2 },
            TickOutcome::Started { segment: 3 },
        ]
    );
    assert_eq!(h.watcher.state(), WatcherState::Recording);
    assert_eq!(h.launcher.starts(), 3);
    assert_eq!(h.ledger_indices(), vec![1, 2]);

    let report = h.coordinator.finish(&mut h.watcher).await.unwrap();
    assert_eq!(h.watcher.state(), WatcherState::Stopped);
    assert_eq!(report.segments_ledgered, 3);
    assert_eq!(h.ledger_indices(), vec![1, 2, 3]);
    assert_eq!(
        report.merge.as_ref().unwrap().outcome,
        MergeOutcome::Merged {
            output: h.layout.output_path.clone(),
            segments: 3
        }
    );
    assert!(report.work_dir_removed);
    assert!(!h.layout.work_dir.exists());
    assert!(h.layout.output_path.exists());
    assert_eq!(h.merger.concats(), 1);
    assert_eq!(h.launcher.max_active(), 1);
    assert_eq!(h.launcher.active(), 0);

    let geometries: Vec<WindowGeometry> = h
        .launcher
        .log
        .lock()
        .unwrap()
        .starts
        .iter()
        .map(|(g, _)| *g)
        .collect();
    assert_eq!(geometries, vec![G1, G2, G1]);
}

#[tokio::test]
async fn window_never_found_records_nothing() {
    let probe = ScriptedProbe::geometries(&[None, None, None]);
    let mut h = Harness::new("scenario_b", probe, FakeLauncher::default(), FakeMerger::default());

    let outcomes = tick_n(&mut h, 3).await;
    assert!(outcomes.iter().all(|o| *o == TickOutcome::Idle));
    assert_eq!(h.watcher.state(), WatcherState::Idle);

    let report = h.coordinator.finish(&mut h.watcher).await.unwrap();
    assert_eq!(report.segments_ledgered, 0);
    assert_eq!(report.merge.as_ref().unwrap().outcome, MergeOutcome::Empty);
    assert!(report.output().is_none());
    assert_eq!(h.merger.concats(), 0);
    assert_eq!(h.launcher.starts(), 0);
    assert!(!h.layout.output_path.exists());
    assert!(report.work_dir_removed);
}

#[tokio::test]
async fn forced_stop_still_ledgers_the_segment() {
    let launcher = FakeLauncher {
        ignore_interrupt: true,
        ..FakeLauncher::default()
    };
    let probe = ScriptedProbe::geometries(&[Some(G1), Some(G2)]);
    let mut h = Harness::new("scenario_c", probe, launcher, FakeMerger::default());

    tick_n(&mut h, 2).await;
    assert_eq!(h.launcher.stops(), vec![StopOutcome::Forced]);
    assert_eq!(h.ledger_indices(), vec![1]);

    let report = h.coordinator.finish(&mut h.watcher).await.unwrap();
    assert_eq!(
        h.launcher.stops(),
        vec![StopOutcome::Forced, StopOutcome::Forced]
    );
    assert_eq!(report.segments_ledgered, 2);
}

#[tokio::test]
async fn degenerate_geometry_is_treated_as_lost() {
    let collapsed = WindowGeometry::new(G1.x, G1.y, 0, G1.height);
    let probe = ScriptedProbe::geometries(&[Some(G1), Some(collapsed)]);
    let mut h = Harness::new("scenario_d", probe, FakeLauncher::default(), FakeMerger::default());

    let outcomes = tick_n(&mut h, 2).await;
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Started { segment: 1 },
            TickOutcome::Lost { closed: 1 }
        ]
    );
    assert_eq!(h.watcher.state(), WatcherState::Idle);
    assert_eq!(h.launcher.starts(), 1);
    assert_eq!(h.ledger_indices(), vec![1]);
}

#[tokio::test]
async fn probe_errors_count_as_window_missing() {
    let probe = ScriptedProbe::new([Step::Found(G1), Step::Fail, Step::Found(G1)]);
    let mut h = Harness::new("probe_error", probe, FakeLauncher::default(), FakeMerger::default());

    let outcomes = tick_n(&mut h, 3).await;
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Started { segment: 1 },
            TickOutcome::Lost { closed: 1 },
            TickOutcome::Started { segment: 2 },
        ]
    );
}

#[tokio::test]
async fn failed_launch_is_retried_without_skipping_an_index() {
    let launcher = FakeLauncher::default();
    launcher.failing_launches.store(2, Ordering::SeqCst);
    let probe = ScriptedProbe::geometries(&[Some(G1), Some(G1), Some(G1)]);
    let mut h = Harness::new("launch_retry", probe, launcher, FakeMerger::default());

    let outcomes = tick_n(&mut h, 3).await;
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::LaunchFailed,
            TickOutcome::LaunchFailed,
            TickOutcome::Started { segment: 1 },
        ]
    );
    assert_eq!(h.watcher.state(), WatcherState::Recording);
}

#[tokio::test]
async fn crashed_recorder_is_ledgered_and_restarted() {
    let probe = ScriptedProbe::geometries(&[Some(G1)]).repeating();
    let mut h = Harness::new("crash", probe, FakeLauncher::default(), FakeMerger::default());

    assert_eq!(h.watcher.tick().await, TickOutcome::Started { segment: 1 });
    h.launcher.crash.store(true, Ordering::SeqCst);
    assert_eq!(h.watcher.tick().await, TickOutcome::Started { segment: 2 });

    assert_eq!(h.ledger_indices(), vec![1]);
    assert_eq!(h.launcher.max_active(), 1);
    // The crashed recorder is never asked to stop.
    assert!(h.launcher.stops().is_empty());
}

#[tokio::test]
async fn shutdown_request_stops_at_next_tick() {
    let probe = ScriptedProbe::geometries(&[Some(G1)]).repeating();
    let mut h = Harness::new("shutdown_tick", probe, FakeLauncher::default(), FakeMerger::default());

    h.watcher.tick().await;
    assert!(h.coordinator.request_shutdown());
    assert!(!h.coordinator.request_shutdown());

    assert_eq!(h.watcher.tick().await, TickOutcome::Stopped);
    assert_eq!(h.watcher.state(), WatcherState::Stopped);
    assert_eq!(h.launcher.active(), 0);
    assert_eq!(h.ledger_indices(), vec![1]);

    // Further ticks never start a recorder.
    assert_eq!(h.watcher.tick().await, TickOutcome::Stopped);
    assert_eq!(h.launcher.starts(), 1);
}

#[tokio::test]
async fn finishing_twice_merges_once() {
    let probe = ScriptedProbe::geometries(&[Some(G1), Some(G3)]);
    let mut h = Harness::new("finish_twice", probe, FakeLauncher::default(), FakeMerger::default());
    tick_n(&mut h, 2).await;

    h.signal.request_shutdown();
    h.signal.request_shutdown();
    let first = h.coordinator.finish(&mut h.watcher).await;
    let second = h.coordinator.finish(&mut h.watcher).await;

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(h.merger.concats(), 1);
    assert_eq!(h.ledger_indices(), vec![1, 2]);
}

#[tokio::test]
async fn failed_merge_keeps_the_work_directory() {
    let merger = FakeMerger {
        fail: true,
        ..FakeMerger::default()
    };
    let probe = ScriptedProbe::geometries(&[Some(G1)]);
    let mut h = Harness::new("merge_fail", probe, FakeLauncher::default(), merger);
    h.watcher.tick().await;

    let report = h.coordinator.finish(&mut h.watcher).await.unwrap();
    assert!(report.merge.is_err());
    assert!(!report.work_dir_removed);
    assert!(h.layout.ledger_path.exists());
    assert!(h.layout.segment_path(1).exists());
}

#[tokio::test]
async fn run_returns_after_shutdown_request() {
    let probe = ScriptedProbe::geometries(&[Some(G1)]).repeating();
    let mut h = Harness::new("run_loop", probe, FakeLauncher::default(), FakeMerger::default());

    let signal = h.signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        signal.request_shutdown();
    });

    tokio::time::timeout(Duration::from_secs(5), h.watcher.run())
        .await
        .expect("watcher should stop after shutdown request");

    assert_eq!(h.watcher.state(), WatcherState::Stopped);
    assert_eq!(h.launcher.starts(), 1);
    assert_eq!(h.launcher.active(), 0);
    assert_eq!(h.ledger_indices(), vec![1]);
}

#[tokio::test]
async fn shutdown_during_query_does_not_start_a_recorder() {
    let signal = ShutdownSignal::new();
    let probe = InterruptingProbe::new(ScriptedProbe::geometries(&[Some(G1)]), signal.clone(), 0);
    let mut h = Harness::with_signal(
        "shutdown_mid_query",
        signal,
        probe,
        FakeLauncher::default(),
        FakeMerger::default(),
    );

    assert_eq!(h.watcher.tick().await, TickOutcome::Stopped);
    assert_eq!(h.watcher.state(), WatcherState::Stopped);
    assert_eq!(h.launcher.starts(), 0);
    assert!(h.ledger_indices().is_empty());

    let report = h.coordinator.finish(&mut h.watcher).await.unwrap();
    assert_eq!(report.merge.as_ref().unwrap().outcome, MergeOutcome::Empty);
    assert_eq!(h.merger.concats(), 0);
}

#[tokio::test]
async fn shutdown_during_query_ends_rotation_after_ledgering() {
    let signal = ShutdownSignal::new();
    let probe = InterruptingProbe::new(
        ScriptedProbe::geometries(&[Some(G1), Some(G2)]),
        signal.clone(),
        1,
    );
    let mut h = Harness::with_signal(
        "shutdown_mid_rotation",
        signal,
        probe,
        FakeLauncher::default(),
        FakeMerger::default(),
    );

    assert_eq!(h.watcher.tick().await, TickOutcome::Started { segment: 1 });
    assert_eq!(h.watcher.tick().await, TickOutcome::Stopped);

    assert_eq!(h.watcher.state(), WatcherState::Stopped);
    assert_eq!(h.launcher.starts(), 1);
    assert_eq!(h.launcher.active(), 0);
    assert_eq!(h.ledger_indices(), vec![1]);
}
