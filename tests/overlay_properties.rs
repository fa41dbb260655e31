//! End-to-end behavior of the overlay core
//!
//! Everything runs on tokio's paused clock against a recording surface, so
//! timeouts and fades complete instantly and deterministically.
//!
//! ```bash
//! cargo test --test overlay_properties
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use keydisplay_lib::effects::{
    control_channel, run_control_loop, LoopExit, OverlayEffectRunner,
};
use keydisplay_lib::locks::{FixedLockSource, LockKey, LockStates};
use keydisplay_lib::overlay::{
    DirIconStore, DisplayDispatcher, DisplayOutcome, FixedScreen, IconKey, IconStore,
    OverlayController, OverlayTiming, RecordingSurface, ScreenSize, StaticIconStore, SurfaceOp,
};
use keydisplay_lib::state_machine::ControlEvent;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_millis(1000);

fn timing() -> OverlayTiming {
    OverlayTiming {
        timeout: TIMEOUT,
        fade_interval: Duration::from_millis(40),
    }
}

/// Time for one display to run all the way to hidden, with slack.
fn settle() -> Duration {
    timing().timeout + timing().fade_duration() + Duration::from_millis(100)
}

fn overlay() -> (Arc<OverlayController>, Arc<RecordingSurface>) {
    let surface = Arc::new(RecordingSurface::new());
    let controller = Arc::new(OverlayController::new(
        surface.clone(),
        Arc::new(FixedScreen(ScreenSize::new(2560, 1440))),
        Arc::new(StaticIconStore::uniform(256, 256)),
        timing(),
    ));
    (controller, surface)
}

fn bundled_assets() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

// ============================================================================
// Overlay ownership
// ============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_requests_settles_on_the_last_one() {
    let (controller, surface) = overlay();
    let dispatcher = DisplayDispatcher::start(controller, 4);

    let keys = [
        IconKey::CapsLockOn,
        IconKey::NumLockOn,
        IconKey::CapsLockOff,
        IconKey::ScrollLockOn,
        IconKey::NumLockOff,
        IconKey::ScrollLockOff,
    ];
    for (i, key) in keys.iter().enumerate() {
        dispatcher.request(*key).await.unwrap();
        // Irregular gaps: some inside the timeout, some inside the fade
        tokio::time::sleep(Duration::from_millis(150 * i as u64)).await;
    }

    tokio::time::sleep(settle()).await;

    let snap = surface.snapshot();
    assert_eq!(snap.image, Some(IconKey::ScrollLockOff));
    assert!(!snap.visible);
    assert_eq!(snap.size, (256, 256));
    assert_eq!(snap.position, (2560 - 256 - 60, 60));

    // Nothing drew after the last request's image went up
    let ops = surface.ops();
    let last_image = ops
        .iter()
        .rposition(|op| matches!(op, SurfaceOp::SetImage(_)))
        .unwrap();
    assert_eq!(ops[last_image], SurfaceOp::SetImage(IconKey::ScrollLockOff));
}

#[tokio::test(start_paused = true)]
async fn superseded_request_does_not_hide() {
    let (controller, surface) = overlay();

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.display(IconKey::CapsLockOn).await })
    };
    tokio::time::sleep(TIMEOUT / 2).await;

    let second = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.display(IconKey::CapsLockOff).await })
    };

    assert_eq!(first.await.unwrap().unwrap(), DisplayOutcome::Superseded);
    assert_eq!(surface.count(SurfaceOp::Hide), 0);
    assert!(surface.snapshot().visible);

    assert_eq!(second.await.unwrap().unwrap(), DisplayOutcome::Hidden);
    assert_eq!(surface.count(SurfaceOp::Hide), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_fade_ends_at_four_percent_then_hides() {
    let (controller, surface) = overlay();

    let start = Instant::now();
    let outcome = controller.display(IconKey::NumLockOn).await.unwrap();
    assert_eq!(outcome, DisplayOutcome::Hidden);
    assert!(start.elapsed() >= TIMEOUT + timing().fade_duration());

    let ops = surface.ops();
    assert_eq!(ops.last(), Some(&SurfaceOp::Hide));
    assert_eq!(ops[ops.len() - 2], SurfaceOp::Opacity(4));
    assert!(!surface.opacities().contains(&0));

    let fade: Vec<u8> = surface.opacities().into_iter().skip(2).collect();
    assert_eq!(fade.len(), 25);
    assert!(fade.windows(2).all(|w| w[0] - w[1] == 4));
}

// ============================================================================
// Lock diffing through the poller
// ============================================================================

#[tokio::test(start_paused = true)]
async fn two_locks_flipping_in_one_tick_emit_two_requests() {
    let source = Arc::new(FixedLockSource::new(LockStates::default()));
    let (dispatcher, mut rx) = DisplayDispatcher::channel();
    let _poller = keydisplay_lib::locks::KeyPoller::start(
        source.clone(),
        dispatcher,
        Duration::from_millis(5),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    source.set_all(LockStates::new(true, false, true));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut keys = Vec::new();
    while let Ok(request) = rx.try_recv() {
        keys.push(request.key);
    }
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&IconKey::CapsLockOn));
    assert!(keys.contains(&IconKey::ScrollLockOn));
    assert!(!keys
        .iter()
        .any(|k| matches!(k, IconKey::NumLockOn | IconKey::NumLockOff)));
}

// ============================================================================
// Control loop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn toggle_alternates_overlay_and_polling() {
    let source = Arc::new(FixedLockSource::default());
    let (dispatcher, mut requests) = DisplayDispatcher::channel();
    let runner = OverlayEffectRunner::new(dispatcher, source.clone(), Duration::from_millis(5));
    let (control, rx) = control_channel();
    let loop_task = tokio::spawn(run_control_loop(rx, runner.clone(), TIMEOUT));

    // First toggle: on, polling
    control.send(ControlEvent::Toggle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(requests.try_recv().unwrap().key, IconKey::OverlayOn);
    assert!(runner.is_polling());

    source.set(LockKey::CapsLock, true);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(requests.try_recv().unwrap().key, IconKey::CapsLockOn);

    // Second toggle: off, no polling
    control.send(ControlEvent::Toggle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(requests.try_recv().unwrap().key, IconKey::OverlayOff);
    assert!(!runner.is_polling());

    source.set(LockKey::CapsLock, false);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(requests.try_recv().is_err());

    // Third toggle: on again, back-to-back with no gap before the check
    control.send(ControlEvent::Toggle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(requests.try_recv().unwrap().key, IconKey::OverlayOn);
    assert!(runner.is_polling());

    drop(control);
    assert_eq!(loop_task.await.unwrap(), LoopExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn quit_shows_off_icon_and_waits_out_the_timeout() {
    let (controller, surface) = overlay();
    let dispatcher = DisplayDispatcher::start(controller, 16);
    let runner = OverlayEffectRunner::new(
        dispatcher,
        Arc::new(FixedLockSource::default()),
        Duration::from_millis(5),
    );
    let (control, rx) = control_channel();

    control.send(ControlEvent::Quit).await.unwrap();
    let start = Instant::now();
    let exit = run_control_loop(rx, runner.clone(), TIMEOUT).await;

    assert_eq!(exit, LoopExit::Quit);
    assert!(start.elapsed() >= TIMEOUT);
    assert!(!runner.is_polling());
    assert_eq!(surface.snapshot().image, Some(IconKey::OverlayOff));
}

#[tokio::test(start_paused = true)]
async fn quick_double_toggle_converges_on_off_icon() {
    let (controller, surface) = overlay();
    let dispatcher = DisplayDispatcher::start(controller, 16);
    let runner = OverlayEffectRunner::new(
        dispatcher,
        Arc::new(FixedLockSource::default()),
        Duration::from_millis(5),
    );
    let (control, rx) = control_channel();
    let loop_task = tokio::spawn(run_control_loop(rx, runner, TIMEOUT));

    control.send(ControlEvent::Startup).await.unwrap();
    control.send(ControlEvent::Toggle).await.unwrap();
    tokio::time::sleep(settle()).await;

    let snap = surface.snapshot();
    assert_eq!(snap.image, Some(IconKey::OverlayOff));
    assert!(!snap.visible);

    drop(control);
    loop_task.await.unwrap();
}

// ============================================================================
// Bundled assets
// ============================================================================

#[test]
fn every_bundled_icon_loads() {
    let store = DirIconStore::new(bundled_assets());
    assert!(store.missing().is_empty(), "missing: {:?}", store.missing());

    for key in IconKey::ALL {
        let icon = store.load_scaled(key, 192).unwrap();
        assert_eq!((icon.width, icon.height), (192, 192), "{}", key);
        assert!(!icon.png.is_empty());
    }
}
