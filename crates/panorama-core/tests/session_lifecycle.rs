//! Lifecycle tests for a mounted map session.
//!
//! Each test drives a real session driver against the in-memory fakes in
//! `support`, on a paused Tokio clock so every timer fires at an exact,
//! reproducible instant.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::too_many_lines
)]

mod support;

use std::time::Duration;

use panorama_core::engine::{ControlKind, ControlPosition, EngineEvent, FrameId};
use panorama_core::rotation::RotationPhase;
use panorama_core::session::{BootstrapFailure, SessionStage};
use panorama_types::{
    AnimationOptions, BootstrapOptions, Dimensions, MapOptions, PointOfInterest, RotationOptions,
    StepScheduler, UiOptions,
};
use support::{EngineCall, Observed, eventually, keyed, lake, mount, mount_with, settle};
use tokio::time::Instant;

fn rotating(scheduler: StepScheduler) -> MapOptions {
    keyed(MapOptions {
        rotation: Some(RotationOptions {
            enabled: Some(true),
            speed: Some(30.0),
            step_duration: Some(1_000.0),
            initial_bearing: Some(-90.0),
            scheduler: Some(scheduler),
        }),
        ..MapOptions::default()
    })
}

// =========================================================================
// Bootstrap ordering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn bootstrap_reaches_ready_without_rotation() {
    let mut h = mount(&keyed(MapOptions::default()));
    assert_eq!(h.handle.status().stage, SessionStage::LoadingRuntime);

    h.bootstrap().await;
    assert_eq!(h.world.lock().inserted.len(), 2);

    let status = h.handle.status();
    assert!(status.ready);
    assert!(h.handle.is_ready());
    assert_eq!(status.stage, SessionStage::Ready);
    assert_eq!(status.rotation, RotationPhase::Idle);
    assert_eq!(status.rotation_steps, 0);
    assert!(h.world.eases().is_empty());

    h.world.emit(EngineEvent::MoveEnd);
    settle().await;
    assert_eq!(h.handle.status().rotation_steps, 0);

    let calls = h.world.calls();
    assert!(matches!(calls[0], EngineCall::Construct(ref o) if o.container == "map"));
    assert_eq!(calls[1], EngineCall::AddSource("terrainSource".to_owned()));
    assert!(matches!(calls[2], EngineCall::SetTerrain(ref t) if t.source == "terrainSource"));
    assert_eq!(
        calls[3],
        EngineCall::AddControl(
            ControlKind::Navigation {
                visualize_pitch: true
            },
            ControlPosition::TopRight
        )
    );
    assert!(matches!(calls[4], EngineCall::AddMarker(ref m) if m.popup.html.contains("Lake")));
}

#[tokio::test(start_paused = true)]
async fn construct_options_carry_bounds_and_style() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.world.complete_script().await;
    h.wait_for(|s| s.stage == SessionStage::AwaitingStyle).await;

    let calls = h.world.calls();
    let EngineCall::Construct(options) = &calls[0] else {
        panic!("first call should construct the engine");
    };
    assert!(options.style_url.contains("key=test-key"));
    assert!(options.max_bounds.contains(options.center));
    assert!(options.terrain.is_some());
}

#[tokio::test(start_paused = true)]
async fn features_wait_for_style_load() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.world.complete_script().await;
    h.wait_for(|s| s.stage == SessionStage::AwaitingStyle).await;

    h.world.emit(EngineEvent::Idle);
    settle().await;
    assert_eq!(h.world.calls().len(), 1);
    assert!(!h.handle.is_ready());

    h.world.emit(EngineEvent::Load);
    h.wait_for(|s| s.stage == SessionStage::AwaitingIdle).await;
    assert_eq!(h.world.count(|c| matches!(c, EngineCall::AddMarker(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn ready_fires_exactly_once() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.bootstrap().await;

    h.world.emit(EngineEvent::Idle);
    h.world.emit(EngineEvent::Load);
    settle().await;

    let seen = h.drain_observed();
    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0], Observed::Ready(_)));
    assert_eq!(h.world.count(|c| matches!(c, EngineCall::AddMarker(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_size_target_is_polled_until_measurable() {
    let mut h = mount_with(&keyed(MapOptions::default()), Dimensions::default());
    h.world.complete_script().await;
    h.wait_for(|s| s.stage == SessionStage::AwaitingLayout).await;

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(h.world.calls().is_empty());

    h.world.set_dimensions(Dimensions::new(640.0, 480.0));
    h.wait_for(|s| s.stage == SessionStage::AwaitingStyle).await;
    assert_eq!(
        h.world.count(|c| matches!(c, EngineCall::Construct(_))),
        1
    );
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn missing_api_key_starts_nothing() {
    let mut h = mount(&MapOptions::default());
    assert_eq!(h.handle.status().stage, SessionStage::MissingApiKey);
    assert!(h.world.lock().inserted.is_empty());
    assert!(!h.handle.go_to(lake(), 0));
    assert!(!h.handle.toggle_list());

    h.handle.teardown().await;
    assert!(h.world.lock().removed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_script_never_becomes_ready() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.world.fail_script("404").await;

    let status = h
        .wait_for(|s| matches!(s.stage, SessionStage::Failed(_)))
        .await;
    let SessionStage::Failed(BootstrapFailure::ResourceLoad(reason)) = status.stage else {
        panic!("expected a resource load failure");
    };
    assert!(reason.contains("404"));
    assert!(!status.ready);

    settle().await;
    assert!(h.drain_observed().is_empty());
    assert!(h.world.calls().is_empty());

    h.handle.teardown().await;
    assert_eq!(h.world.lock().removed.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn layout_polling_gives_up() {
    let options = keyed(MapOptions {
        bootstrap: Some(BootstrapOptions {
            max_layout_attempts: Some(3),
            ..BootstrapOptions::default()
        }),
        ..MapOptions::default()
    });
    let mut h = mount_with(&options, Dimensions::default());
    h.world.complete_script().await;

    let status = h
        .wait_for(|s| matches!(s.stage, SessionStage::Failed(_)))
        .await;
    assert_eq!(
        status.stage,
        SessionStage::Failed(BootstrapFailure::LayoutTimeout { attempts: 3 })
    );
    assert!(h.world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn construct_failure_is_reported() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.world.lock().construct_error = Some("no webgl".to_owned());
    h.world.complete_script().await;

    let status = h
        .wait_for(|s| matches!(s.stage, SessionStage::Failed(_)))
        .await;
    assert!(matches!(
        status.stage,
        SessionStage::Failed(BootstrapFailure::EngineConstruct(ref r)) if r.contains("no webgl")
    ));

    h.handle.teardown().await;
    assert_eq!(h.world.count(|c| *c == EngineCall::Remove), 0);
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn teardown_before_load_constructs_nothing() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.handle.teardown().await;

    assert_eq!(h.handle.status().stage, SessionStage::TornDown);
    assert_eq!(h.world.lock().removed.len(), 2);
    assert!(h.world.script_abandoned());

    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert!(h.world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_during_layout_polling_stops_the_poll() {
    let mut h = mount_with(&keyed(MapOptions::default()), Dimensions::default());
    h.world.complete_script().await;
    h.wait_for(|s| s.stage == SessionStage::AwaitingLayout).await;

    h.handle.teardown().await;
    h.world.set_dimensions(Dimensions::new(800.0, 600.0));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(h.world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_twice_removes_engine_once() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.bootstrap().await;

    h.handle.teardown().await;
    h.handle.teardown().await;

    assert_eq!(h.world.count(|c| *c == EngineCall::Remove), 1);
    assert_eq!(h.world.lock().removed.len(), 2);
    assert!(!h.handle.go_to(lake(), 0));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_tears_down() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.bootstrap().await;
    let world = h.world.clone();
    drop(h);

    eventually(|| world.count(|c| *c == EngineCall::Remove) == 1).await;
    assert_eq!(world.lock().removed.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pending_selection_is_dropped_on_teardown() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.bootstrap().await;
    h.drain_observed();

    assert!(h.handle.go_to(lake(), 0));
    settle().await;
    h.handle.teardown().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.drain_observed().is_empty());
}

// =========================================================================
// Rotation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn twelve_steps_return_to_initial_bearing() {
    let mut h = mount(&rotating(StepScheduler::Timeout));
    h.bootstrap().await;
    assert_eq!(h.handle.status().rotation, RotationPhase::Stepping);
    assert_eq!(h.world.eases().len(), 1);

    for completed in 1..=12_u64 {
        h.world.emit(EngineEvent::MoveEnd);
        h.wait_for(|s| s.rotation_steps == completed).await;
        let expected = usize::try_from(completed).unwrap() + 1;
        eventually(|| h.world.eases().len() == expected).await;
    }

    let eases = h.world.eases();
    assert!((eases[0].bearing - 300.0).abs() < 1e-9);
    assert!((eases[11].bearing - 270.0).abs() < 1e-9);
    for ease in &eases {
        assert!((0.0..360.0).contains(&ease.bearing));
        assert_eq!(ease.center, eases[0].center);
        assert!((ease.duration_ms - 1_000.0).abs() < 1e-12);
    }
}

#[tokio::test(start_paused = true)]
async fn user_input_stops_rotation_for_good() {
    let mut h = mount(&rotating(StepScheduler::Timeout));
    h.bootstrap().await;

    h.world.emit(EngineEvent::Wheel);
    h.wait_for(|s| s.rotation == RotationPhase::Stopped).await;

    h.world.emit(EngineEvent::MoveEnd);
    h.world.emit(EngineEvent::MouseDown);
    h.world.emit(EngineEvent::Idle);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(h.world.eases().len(), 1);
    let status = h.handle.status();
    assert_eq!(status.rotation, RotationPhase::Stopped);
    assert_eq!(status.rotation_steps, 0);
}

#[tokio::test(start_paused = true)]
async fn animation_frame_steps_are_cancelled_on_teardown() {
    let mut h = mount(&rotating(StepScheduler::AnimationFrame));
    h.bootstrap().await;

    h.world.emit(EngineEvent::MoveEnd);
    eventually(|| h.world.position(&EngineCall::RequestFrame(FrameId(1))).is_some()).await;

    h.world.emit(EngineEvent::AnimationFrame(FrameId(1)));
    eventually(|| h.world.eases().len() == 2).await;

    h.world.emit(EngineEvent::MoveEnd);
    eventually(|| h.world.position(&EngineCall::RequestFrame(FrameId(2))).is_some()).await;

    h.handle.teardown().await;

    let cancel = h.world.position(&EngineCall::CancelFrame(FrameId(2))).unwrap();
    let remove = h.world.position(&EngineCall::Remove).unwrap();
    assert!(cancel < remove);
    assert_eq!(h.world.eases().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_animation_frame_is_ignored() {
    let mut h = mount(&rotating(StepScheduler::AnimationFrame));
    h.bootstrap().await;

    h.world.emit(EngineEvent::AnimationFrame(FrameId(42)));
    settle().await;
    assert_eq!(h.world.eases().len(), 1);
}

// =========================================================================
// Navigation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn selection_notice_fires_at_2200ms() {
    let options = keyed(MapOptions {
        animation: Some(AnimationOptions {
            fly_to_duration: Some(2_400.0),
            ..AnimationOptions::default()
        }),
        ..MapOptions::default()
    });
    let mut h = mount(&options);
    h.bootstrap().await;
    h.drain_observed();

    let point = PointOfInterest::new(46.7, 8.8, "Summit");
    let started = Instant::now();
    assert!(h.handle.go_to(point.clone(), 3));

    let seen = h.observed.recv().await.unwrap();
    let Observed::Click { index, title, at } = seen else {
        panic!("expected a selection notice");
    };
    assert_eq!(index, 3);
    assert_eq!(title, "Summit");
    assert_eq!(at.duration_since(started), Duration::from_millis(2_200));

    let fly = h
        .world
        .calls()
        .into_iter()
        .find_map(|c| match c {
            EngineCall::FlyTo(fly) => Some(fly),
            _ => None,
        })
        .unwrap();
    assert_eq!(fly.center, point.position());
    assert!((fly.zoom - 16.0).abs() < 1e-12);
    assert!((fly.duration_ms - 2_400.0).abs() < 1e-12);
}

#[tokio::test(start_paused = true)]
async fn overlapping_flights_each_notify() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.bootstrap().await;
    h.drain_observed();

    assert!(h.handle.go_to(lake(), 0));
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(h.handle.go_to(PointOfInterest::new(1.0, 2.0, "Other"), 1));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let indices: Vec<usize> = h
        .drain_observed()
        .into_iter()
        .filter_map(|o| match o {
            Observed::Click { index, .. } => Some(index),
            Observed::Ready(_) => None,
        })
        .collect();
    assert_eq!(indices, [0, 1]);
    assert_eq!(h.world.count(|c| matches!(c, EngineCall::FlyTo(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn go_to_before_engine_is_ignored() {
    let mut h = mount(&keyed(MapOptions::default()));
    assert!(h.handle.go_to(lake(), 0));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(h.drain_observed().is_empty());
    assert!(h.world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn go_to_stops_rotation() {
    let mut h = mount(&rotating(StepScheduler::Timeout));
    h.bootstrap().await;

    assert!(h.handle.go_to(lake(), 0));
    h.wait_for(|s| s.rotation == RotationPhase::Stopped).await;

    h.world.emit(EngineEvent::MoveEnd);
    settle().await;
    assert_eq!(h.world.eases().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn list_toggles_and_closes_on_navigation() {
    let mut h = mount(&keyed(MapOptions::default()));
    h.bootstrap().await;

    assert!(h.handle.toggle_list());
    h.wait_for(|s| s.list_open).await;

    assert!(h.handle.go_to(lake(), 0));
    h.wait_for(|s| !s.list_open).await;
}

#[tokio::test(start_paused = true)]
async fn pinned_list_ignores_toggle() {
    let options = keyed(MapOptions {
        ui: Some(UiOptions {
            list_always_visible: Some(true),
            ..UiOptions::default()
        }),
        ..MapOptions::default()
    });
    let mut h = mount(&options);
    h.bootstrap().await;

    assert!(h.handle.toggle_list());
    settle().await;
    assert!(!h.handle.status().list_open);
}
