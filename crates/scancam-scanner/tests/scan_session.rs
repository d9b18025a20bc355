//! Integration tests for ScanSession
//!
//! These run a full session against the mock camera: host events in, frames
//! pushed through the capture callback, one outcome out.

mod common;

use common::{ScriptedDecoder, fast_config, frame, init_tracing, mock_backend, wait_until};
use scancam_core::{Rotation, Symbol, SymbolType};
use scancam_hardware::DisplayTarget;
use scancam_hardware::mock::{CameraCall, MockCameraControl, MockOperation};
use scancam_scanner::{
    CancelReason, CoordinatorState, EventSender, ScanOutcome, ScanSession, ScanSessionHandle,
    SessionEvent,
};
use std::time::Duration;
use tokio::time::timeout;

async fn bring_up(events: &EventSender) {
    events.send(SessionEvent::Foreground).await.unwrap();
    events
        .send(SessionEvent::SurfaceCreated(DisplayTarget::new(3)))
        .await
        .unwrap();
    events
        .send(SessionEvent::SurfaceChanged {
            width: 540,
            height: 960,
            format: 4,
        })
        .await
        .unwrap();
}

async fn wait_for_frames(session: &ScanSessionHandle, control: &MockCameraControl) {
    let coordinator = session.coordinator();
    wait_until(|| control.is_previewing() && coordinator.frames_flowing()).await;
}

async fn outcome(session: &mut ScanSessionHandle) -> ScanOutcome {
    timeout(Duration::from_secs(2), session.outcome())
        .await
        .expect("Session outcome timeout")
        .expect("Session ended without an outcome")
}

#[tokio::test]
async fn test_first_symbol_wins_and_later_frames_are_not_decoded() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, log) = ScriptedDecoder::new(vec![
        vec![],
        vec![Symbol::new("4006381333931", SymbolType::Ean13)],
        vec![Symbol::new("late", SymbolType::QrCode)],
    ]);
    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    bring_up(&session.events()).await;
    wait_for_frames(&session, &control).await;

    let size = control.preview_size().unwrap();
    for fill in 1..=3u8 {
        control.deliver_frame(&frame(size, fill));
    }

    let ScanOutcome::Decoded(result) = outcome(&mut session).await else {
        panic!("Expected a decoded result");
    };
    assert_eq!(result.data, "4006381333931");
    assert_eq!(result.symbol_type, SymbolType::Ean13);

    {
        let log = log.lock().unwrap();
        assert_eq!(log.calls(), 2);
        assert_eq!(log.frames[1], (2, size.width, size.height));
    }
    assert_eq!(session.frames_decoded(), 2);

    // The preview is paused once the result is in.
    wait_until(|| !control.is_previewing()).await;
    assert!(!control.deliver_frame(&frame(size, 4)));

    session.shutdown().await.unwrap();
    assert!(!control.is_in_use());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_frames_deliver_one_result() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, log) = ScriptedDecoder::always("racy");
    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    bring_up(&session.events()).await;
    wait_for_frames(&session, &control).await;

    let size = control.preview_size().unwrap();
    let data = frame(size, 9);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    control.deliver_frame(&data);
                }
            });
        }
    });

    let ScanOutcome::Decoded(result) = outcome(&mut session).await else {
        panic!("Expected a decoded result");
    };
    assert_eq!(result.data, "racy");
    assert_eq!(log.lock().unwrap().calls(), 1);

    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_surface_change_after_decision_keeps_preview_paused() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, _log) =
        ScriptedDecoder::new(vec![vec![Symbol::new("final", SymbolType::Code128)]]);
    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    let events = session.events();
    bring_up(&events).await;
    wait_for_frames(&session, &control).await;

    control.deliver_frame(&frame(control.preview_size().unwrap(), 5));
    for width in [600, 720, 540] {
        events
            .send(SessionEvent::SurfaceChanged {
                width,
                height: 960,
                format: 4,
            })
            .await
            .unwrap();
    }

    let ScanOutcome::Decoded(result) = outcome(&mut session).await else {
        panic!("Expected a decoded result");
    };
    assert_eq!(result.data, "final");

    // Give queued surface changes time to reach the pump.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!control.is_previewing());
    assert!(!session.coordinator().frames_flowing());
    assert_eq!(
        session.coordinator().state().await,
        CoordinatorState::Idle
    );

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_occupied_camera_cancels_session() {
    init_tracing();
    let (backend, control) = mock_backend();
    control.occupy();
    let (decoder, log) = ScriptedDecoder::always("never");
    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    session.events().send(SessionEvent::Foreground).await.unwrap();

    assert!(matches!(
        outcome(&mut session).await,
        ScanOutcome::Cancelled(CancelReason::DeviceUnavailable(_))
    ));
    assert_eq!(session.coordinator().state().await, CoordinatorState::Closed);
    assert_eq!(log.lock().unwrap().calls(), 0);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_no_camera_cancels_immediately() {
    init_tracing();
    let (backend, control) = mock_backend();
    control.set_present(false);
    let (decoder, _log) = ScriptedDecoder::always("never");

    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    assert_eq!(
        outcome(&mut session).await,
        ScanOutcome::Cancelled(CancelReason::NoCamera)
    );
    session.shutdown().await.unwrap();
    assert!(control.calls().is_empty());
}

#[tokio::test]
async fn test_display_attach_failure_cancels_and_releases() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, _log) = ScriptedDecoder::always("never");
    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    let events = session.events();
    events.send(SessionEvent::Foreground).await.unwrap();
    wait_until(|| control.is_in_use()).await;
    control.fail_next(MockOperation::SetPreviewDisplay);
    events
        .send(SessionEvent::SurfaceCreated(DisplayTarget::new(1)))
        .await
        .unwrap();

    assert!(matches!(
        outcome(&mut session).await,
        ScanOutcome::Cancelled(CancelReason::DisplayAttach(_))
    ));
    wait_until(|| !control.is_in_use()).await;
    assert!(!control.calls().contains(&CameraCall::StartPreview));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_only_teardown_events_after_outcome() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, _log) = ScriptedDecoder::always("done");
    let mut session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    let events = session.events();
    bring_up(&events).await;
    wait_for_frames(&session, &control).await;
    control.deliver_frame(&frame(control.preview_size().unwrap(), 0));
    assert!(matches!(outcome(&mut session).await, ScanOutcome::Decoded(_)));
    wait_until(|| !control.is_previewing()).await;
    control.clear_calls();

    events
        .send(SessionEvent::OrientationChanged(Rotation::Deg90))
        .await
        .unwrap();
    events.send(SessionEvent::Foreground).await.unwrap();
    events.send(SessionEvent::Background).await.unwrap();
    wait_until(|| !control.is_in_use()).await;

    let calls = control.calls();
    assert!(!calls.iter().any(|c| matches!(c, CameraCall::SetDisplayOrientation(_))));
    assert!(!calls.contains(&CameraCall::StartPreview));
    assert_eq!(control.count(&CameraCall::Release), 1);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_background_and_foreground_cycle_reacquires() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, _log) = ScriptedDecoder::new(Vec::new());
    let session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    let events = session.events();
    bring_up(&events).await;
    wait_for_frames(&session, &control).await;

    events.send(SessionEvent::Background).await.unwrap();
    wait_until(|| !control.is_in_use()).await;
    assert!(!session.coordinator().frames_flowing());

    // Surface is still bound: foreground alone restarts the preview.
    events.send(SessionEvent::Foreground).await.unwrap();
    wait_for_frames(&session, &control).await;
    assert_eq!(
        session.coordinator().state().await,
        CoordinatorState::Previewing
    );

    session.shutdown().await.unwrap();
    assert!(!control.is_in_use());
}

#[tokio::test]
async fn test_decoder_receives_configured_scan_modes() {
    init_tracing();
    let (backend, _control) = mock_backend();
    let (decoder, log) = ScriptedDecoder::new(Vec::new());
    let config = fast_config()
        .with_scan_modes([SymbolType::QrCode, SymbolType::Code128])
        .with_density(1, 2);

    let session = ScanSession::start(backend, decoder, config).unwrap();

    let applied = log.lock().unwrap().config.clone().unwrap();
    assert_eq!(
        applied.scan_modes,
        vec![i32::from(SymbolType::QrCode), i32::from(SymbolType::Code128)]
    );
    assert_eq!((applied.x_density, applied.y_density), (1, 2));
    assert_eq!(applied.format, "Y800");

    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_from_platform_thread() {
    init_tracing();
    let (backend, control) = mock_backend();
    let (decoder, _log) = ScriptedDecoder::new(Vec::new());
    let session = ScanSession::start(backend, decoder, fast_config()).unwrap();

    let events = session.events();
    tokio::task::spawn_blocking(move || {
        events.blocking_send(SessionEvent::Foreground).unwrap();
        events
            .blocking_send(SessionEvent::OrientationChanged(Rotation::Deg180))
            .unwrap();
    })
    .await
    .unwrap();

    // Rear sensor at 90 with the device upside down.
    wait_until(|| control.display_orientation() == 270).await;

    session.shutdown().await.unwrap();
}
