mod common;

use std::{sync::atomic::Ordering, time::Duration};

use common::{sample, Harness};
use walk_tracker::{
    Action, ErrorKind, LocationError, SessionError, SessionState, TrackerConfig, WalkEvent,
};
use walk_tracker_lib::walk::WalkDetails;

#[tokio::test]
async fn walk_with_a_pause_is_saved() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0000, -73.0000, 0)));

    h.tracker.start("pet-1").await.unwrap();
    assert_eq!(h.tracker.snapshot().await.unwrap().state, SessionState::Active);

    h.clock.set_millis(10_000);
    assert!(h.provider.send(Ok(sample(40.0010, -73.0000, 10_000))));
    let progress = h.tracker.snapshot().await.unwrap();
    assert!((progress.distance_meters - 111.2).abs() < 0.1, "got {}", progress.distance_meters);

    h.clock.set_millis(15_000);
    h.tracker.pause().await.unwrap();
    assert!(h.provider.send(Ok(sample(40.0100, -73.0000, 17_000))));

    h.clock.set_millis(20_000);
    h.tracker.resume().await.unwrap();
    h.clock.set_millis(30_000);
    h.tracker.stop().await.unwrap();

    let saved = h.tracker.finalize().await.unwrap();
    assert_eq!(saved.walk_id, 1);
    assert_eq!(saved.payload.duration_seconds, 25);
    assert_eq!(saved.payload.samples.len(), 2);
    assert!((saved.payload.distance_meters - 111.2).abs() < 0.1);

    let stored = h.store.samples.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, 1);
    assert_eq!(stored[0].1, saved.payload.samples);
}

#[tokio::test]
async fn lifecycle_events_are_broadcast() {
    let h = Harness::new();
    let mut events = h.tracker.subscribe();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));

    h.tracker.start("pet-1").await.unwrap();
    h.tracker.pause().await.unwrap();
    h.tracker.resume().await.unwrap();
    h.clock.set_millis(5_000);
    h.tracker.stop().await.unwrap();
    let saved = h.tracker.finalize().await.unwrap();

    assert!(matches!(events.recv().await.unwrap(), WalkEvent::Started { pet_id, .. } if pet_id.as_str() == "pet-1"));
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Paused);
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Resumed);
    assert!(matches!(events.recv().await.unwrap(), WalkEvent::Stopped { ended_at } if ended_at.timestamp_millis() == 5_000));
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Saved { walk_id: saved.walk_id });
}

#[tokio::test]
async fn pause_before_start_is_rejected() {
    let h = Harness::new();
    let mut events = h.tracker.subscribe();

    let err = h.tracker.pause().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidStateTransition { state: SessionState::Idle, action: Action::Pause }
    ));
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Error(ErrorKind::InvalidStateTransition));

    let progress = h.tracker.snapshot().await.unwrap();
    assert_eq!(progress.state, SessionState::Idle);
    assert_eq!(progress.sample_count, 0);
}

#[tokio::test]
async fn pause_after_stop_leaves_the_walk_alone() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    h.provider.send(Ok(sample(40.001, -73.0, 1_000)));
    h.tracker.stop().await.unwrap();
    let before = h.tracker.snapshot().await.unwrap();

    assert!(matches!(
        h.tracker.pause().await,
        Err(SessionError::InvalidStateTransition { state: SessionState::Stopped, .. })
    ));
    assert_eq!(h.tracker.snapshot().await.unwrap(), before);
    assert_eq!(before.sample_count, 2);
}

#[tokio::test]
async fn failed_first_fix_leaves_the_walk_idle() {
    let h = Harness::new();
    let mut events = h.tracker.subscribe();
    h.provider.push_fix(Err(LocationError::PermissionDenied));
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));

    let err = h.tracker.start("pet-1").await.unwrap_err();
    assert!(matches!(err, SessionError::LocationUnavailable(LocationError::PermissionDenied)));
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Error(ErrorKind::LocationUnavailable));
    assert_eq!(h.tracker.snapshot().await.unwrap().state, SessionState::Idle);
    assert_eq!(h.provider.subscribed(), 0);

    h.tracker.start("pet-1").await.unwrap();
    assert_eq!(h.tracker.snapshot().await.unwrap().state, SessionState::Active);
    assert_eq!(h.provider.subscribed(), 1);
}

#[tokio::test(start_paused = true)]
async fn refused_subscription_leaves_the_walk_idle() {
    let h = Harness::with_config(TrackerConfig {
        tick_interval: Duration::from_secs(1),
        ..TrackerConfig::default()
    });
    let mut events = h.tracker.subscribe();
    h.provider.fail_subscribe.store(true, Ordering::SeqCst);
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));

    let err = h.tracker.start("pet-1").await.unwrap_err();
    assert!(matches!(err, SessionError::LocationUnavailable(LocationError::Unavailable(_))));
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Error(ErrorKind::LocationUnavailable));

    let progress = h.tracker.snapshot().await.unwrap();
    assert_eq!(progress.state, SessionState::Idle);
    assert_eq!(progress.sample_count, 0);
    assert_eq!(h.provider.subscribed(), 0);
    assert_eq!(h.provider.unsubscribed(), 0);

    // No timer was started for the failed walk
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(events.try_recv().is_err());

    h.provider.fail_subscribe.store(false, Ordering::SeqCst);
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    assert_eq!(h.tracker.snapshot().await.unwrap().state, SessionState::Active);
    assert_eq!(h.provider.subscribed(), 1);
}

#[tokio::test(start_paused = true)]
async fn first_fix_times_out() {
    let h = Harness::with_config(TrackerConfig {
        fix_timeout: Duration::from_secs(10),
        ..common::quiet_config()
    });
    h.provider.push_silent_fix();

    let err = h.tracker.start("pet-1").await.unwrap_err();
    assert!(matches!(err, SessionError::LocationUnavailable(LocationError::Timeout)));
    assert_eq!(h.tracker.snapshot().await.unwrap().state, SessionState::Idle);
}

#[tokio::test]
async fn empty_pet_id_does_not_request_a_fix() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));

    assert!(matches!(h.tracker.start("").await, Err(SessionError::InvalidPetId)));
    assert_eq!(h.tracker.snapshot().await.unwrap().state, SessionState::Idle);

    // The scripted fix is still there for a proper start
    h.tracker.start("pet-1").await.unwrap();
}

#[tokio::test]
async fn stop_while_waiting_for_first_fix() {
    let h = Harness::new();
    let gate = h.provider.push_gated_fix();

    let (started, stopped) = tokio::join!(h.tracker.start("pet-1"), async {
        h.provider.fix_requested.notified().await;
        h.tracker.stop().await
    });

    assert!(matches!(started, Err(SessionError::StartCancelled)));
    stopped.unwrap();

    // A fix showing up now must not revive the walk
    let _ = gate.send(Ok(sample(40.0, -73.0, 0)));
    tokio::task::yield_now().await;

    let progress = h.tracker.snapshot().await.unwrap();
    assert_eq!(progress.state, SessionState::Stopped);
    assert_eq!(progress.sample_count, 0);
    assert_eq!(h.provider.subscribed(), 0);

    assert!(matches!(
        h.tracker.start("pet-1").await,
        Err(SessionError::InvalidStateTransition { state: SessionState::Stopped, action: Action::Start })
    ));
    assert!(matches!(h.tracker.finalize().await, Err(SessionError::EmptySession)));
}

#[tokio::test]
async fn abandon_while_waiting_for_first_fix() {
    let h = Harness::new();
    let mut gate = h.provider.push_gated_fix();

    let start = tokio::spawn(h.tracker.start("pet-1"));
    h.provider.fix_requested.notified().await;
    h.tracker.abandon().await;

    assert!(matches!(start.await.unwrap(), Err(SessionError::TrackerClosed)));

    // The pending fix request is dropped along with the walk
    tokio::time::timeout(Duration::from_secs(1), gate.closed()).await.unwrap();
    assert!(gate.send(Ok(sample(40.0, -73.0, 0))).is_err());
    assert_eq!(h.provider.subscribed(), 0);
}

#[tokio::test]
async fn second_start_while_waiting_is_rejected() {
    let h = Harness::new();
    let gate = h.provider.push_gated_fix();

    let (first, second) = tokio::join!(h.tracker.start("pet-1"), async {
        h.provider.fix_requested.notified().await;
        let second = h.tracker.start("pet-2").await;
        let _ = gate.send(Ok(sample(40.0, -73.0, 0)));
        second
    });

    first.unwrap();
    assert!(matches!(second, Err(SessionError::InvalidStateTransition { state: SessionState::Idle, action: Action::Start })));
    assert_eq!(h.tracker.snapshot().await.unwrap().sample_count, 1);
}

#[tokio::test]
async fn stop_releases_the_subscription() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    h.tracker.pause().await.unwrap();

    h.tracker.stop().await.unwrap();
    assert_eq!(h.provider.unsubscribed(), 1);
    assert!(!h.provider.send(Ok(sample(41.0, -73.0, 1_000))));
    assert_eq!(h.tracker.snapshot().await.unwrap().sample_count, 1);
}

#[tokio::test]
async fn abandon_releases_the_subscription() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();

    h.tracker.abandon().await;
    assert_eq!(h.provider.subscribed(), 1);
    assert_eq!(h.provider.unsubscribed(), 1);
    assert!(h.store.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn location_errors_do_not_end_the_walk() {
    let h = Harness::new();
    let mut events = h.tracker.subscribe();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), WalkEvent::Started { .. }));

    h.provider.send(Err(LocationError::Timeout));
    h.provider.send(Ok(sample(40.001, -73.0, 2_000)));

    let progress = h.tracker.snapshot().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), WalkEvent::Error(ErrorKind::LocationUnavailable));
    assert_eq!(progress.state, SessionState::Active);
    assert_eq!(progress.sample_count, 2);
}

#[tokio::test]
async fn closed_update_stream_keeps_the_walk() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();

    h.provider.close_updates();
    h.clock.set_millis(4_000);
    h.tracker.stop().await.unwrap();

    let saved = h.tracker.finalize().await.unwrap();
    assert_eq!(saved.payload.duration_seconds, 4);
    assert_eq!(h.provider.unsubscribed(), 1);
}

#[tokio::test]
async fn finalize_twice() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    h.clock.set_millis(2_000);
    h.tracker.stop().await.unwrap();

    let first = h.tracker.finalize().await.unwrap();
    assert!(matches!(h.tracker.finalize().await, Err(SessionError::AlreadyFinalized)));

    assert_eq!(first.payload.duration_seconds, 2);
    assert_eq!(h.store.sessions.lock().unwrap().len(), 1);
    assert_eq!(h.store.sessions.lock().unwrap()[0], *first.payload);
}

#[tokio::test]
async fn finalize_before_stop_is_rejected() {
    let h = Harness::new();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();

    assert!(matches!(
        h.tracker.finalize().await,
        Err(SessionError::InvalidStateTransition { state: SessionState::Active, action: Action::Finalize })
    ));
    h.tracker.stop().await.unwrap();
    h.tracker.finalize().await.unwrap();
}

#[tokio::test]
async fn store_failure_returns_the_payload() {
    let h = Harness::new();
    let mut events = h.tracker.subscribe();
    h.store.fail_sessions.store(true, Ordering::SeqCst);
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    h.tracker
        .set_details(WalkDetails {
            title: "Evening loop".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    h.tracker.stop().await.unwrap();

    let Err(SessionError::Persistence { source, payload }) = h.tracker.finalize().await else {
        panic!("expected a persistence error");
    };
    assert_eq!(source.0, "database is offline");
    assert_eq!(payload.details.title, "Evening loop");
    assert_eq!(payload.samples.len(), 1);

    assert!(matches!(h.tracker.finalize().await, Err(SessionError::AlreadyFinalized)));

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WalkEvent::Error(kind) = event {
            kinds.push(kind);
        }
    }
    assert_eq!(kinds, vec![ErrorKind::Persistence, ErrorKind::AlreadyFinalized]);
}

#[tokio::test]
async fn sample_store_failure_is_surfaced() {
    let h = Harness::new();
    h.store.fail_samples.store(true, Ordering::SeqCst);
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    h.tracker.stop().await.unwrap();

    let err = h.tracker.finalize().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(h.store.sessions.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_ticks_while_walking() {
    let h = Harness::with_config(TrackerConfig {
        tick_interval: Duration::from_secs(1),
        ..TrackerConfig::default()
    });
    let mut events = h.tracker.subscribe();
    h.provider.push_fix(Ok(sample(40.0, -73.0, 0)));
    h.tracker.start("pet-1").await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), WalkEvent::Started { .. }));

    h.clock.set_millis(7_000);
    let WalkEvent::Progress(progress) = events.recv().await.unwrap() else {
        panic!("expected progress");
    };
    assert_eq!(progress.duration_millis, 7_000);
    assert_eq!(progress.sample_count, 1);

    h.tracker.stop().await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), WalkEvent::Stopped { .. }));

    // The timer is gone once the walk has stopped
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(events.try_recv().is_err());
}
