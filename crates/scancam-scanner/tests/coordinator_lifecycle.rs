//! Integration tests for the camera resource coordinator.
//!
//! These drive the coordinator against the mock camera and check the exact
//! driver calls issued across open, reconfiguration and release.

mod common;

use common::{fast_config, frame, init_tracing, mock_backend, wait_until};
use scancam_core::{Error, PreviewSize, Rotation, SurfaceState};
use scancam_hardware::DisplayTarget;
use scancam_hardware::mock::{CameraCall, MockCameraControl, MockOperation};
use scancam_scanner::{Coordinator, CoordinatorState, FrameSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

async fn previewing() -> (Coordinator, MockCameraControl) {
    init_tracing();
    let (backend, control) = mock_backend();
    let coordinator = Coordinator::new(backend, fast_config()).unwrap();

    coordinator.open().await.unwrap();
    coordinator.bind_surface(DisplayTarget::new(7)).await.unwrap();
    coordinator.surface_changed(540, 960, 4).await.unwrap();

    assert_eq!(coordinator.state().await, CoordinatorState::Previewing);
    (coordinator, control)
}

fn counting_sink() -> (FrameSink, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let sink: FrameSink = Arc::new(move |_data: &[u8], _width: u32, _height: u32| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (sink, count)
}

#[tokio::test]
async fn test_repeated_rotation_reports_apply_once() {
    let (coordinator, control) = previewing().await;
    control.clear_calls();

    assert!(coordinator.orientation_changed(Rotation::Deg90).await.unwrap());
    assert!(!coordinator.orientation_changed(Rotation::Deg90).await.unwrap());
    assert!(!coordinator.orientation_changed(Rotation::Deg90).await.unwrap());

    let orientation_calls = control
        .calls()
        .iter()
        .filter(|call| matches!(call, CameraCall::SetDisplayOrientation(_)))
        .count();
    assert_eq!(orientation_calls, 1);
    assert_eq!(control.count(&CameraCall::StopPreview), 1);
    assert_eq!(control.count(&CameraCall::StartPreview), 1);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_rotation_mid_stream_runs_one_stop_apply_start_cycle() {
    let (coordinator, control) = previewing().await;
    control.clear_calls();

    coordinator.orientation_changed(Rotation::Deg270).await.unwrap();

    let calls: Vec<CameraCall> = control
        .calls()
        .into_iter()
        .filter(|call| !matches!(call, CameraCall::AutoFocus | CameraCall::CancelAutoFocus))
        .collect();

    let stop = calls.iter().position(|c| *c == CameraCall::StopPreview).unwrap();
    let orient = calls
        .iter()
        .position(|c| matches!(c, CameraCall::SetDisplayOrientation(_)))
        .unwrap();
    let start = calls.iter().position(|c| *c == CameraCall::StartPreview).unwrap();
    assert!(stop < orient && orient < start);

    // Rear sensor at 90 with the device at 270: (90 - 270 + 360) % 360.
    assert_eq!(control.display_orientation(), 180);
    assert_eq!(coordinator.state().await, CoordinatorState::Previewing);
    assert!(coordinator.frames_flowing());
    assert!(coordinator.is_autofocus_armed().await);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_rotation_reselects_preview_size() {
    let (coordinator, control) = previewing().await;
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let sink: FrameSink = Arc::new(move |_data: &[u8], width: u32, height: u32| {
        record.lock().unwrap().push(PreviewSize::new(width, height));
    });
    coordinator.register_frame_callback(Some(sink)).await;

    // Surface 540x960 at scale 2: target 1080x1920, shown rotated.
    assert_eq!(
        coordinator.preview_size().await,
        Some(PreviewSize::new(1920, 1080))
    );

    coordinator.orientation_changed(Rotation::Deg90).await.unwrap();

    // Landscape: nothing covers 1080x1920, the closest size wins.
    let landscape_size = PreviewSize::new(1280, 720);
    assert_eq!(coordinator.preview_size().await, Some(landscape_size));
    assert_eq!(control.preview_size(), Some(landscape_size));
    assert!(control.deliver_frame(&frame(landscape_size, 0)));
    assert_eq!(*seen.lock().unwrap(), vec![landscape_size]);

    coordinator.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_streamed_frames_match_size_across_rotations() {
    let (coordinator, control) = previewing().await;
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let sink: FrameSink = Arc::new(move |data: &[u8], width: u32, height: u32| {
        record.lock().unwrap().push((width, height, data.len()));
    });
    coordinator.register_frame_callback(Some(sink)).await;

    let streaming = Arc::new(AtomicBool::new(true));
    let producer = {
        let control = control.clone();
        let streaming = Arc::clone(&streaming);
        std::thread::spawn(move || {
            let mut fill = 0u8;
            while streaming.load(Ordering::SeqCst) {
                control.deliver_preview_frame(fill);
                fill = fill.wrapping_add(1);
                std::thread::yield_now();
            }
        })
    };

    for turn in 0..20 {
        let rotation = if turn % 2 == 0 { Rotation::Deg90 } else { Rotation::Deg0 };
        coordinator.orientation_changed(rotation).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    streaming.store(false, Ordering::SeqCst);
    producer.join().unwrap();

    let portrait = (1920, 1080);
    let landscape = (1280, 720);
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    for &(width, height, len) in seen.iter() {
        assert!(
            (width, height) == portrait || (width, height) == landscape,
            "unexpected frame size {width}x{height}"
        );
        assert_eq!(len, width as usize * height as usize);
    }
    drop(seen);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_operations_after_release_touch_no_hardware() {
    let (coordinator, control) = previewing().await;

    coordinator.release().await;
    assert_eq!(coordinator.state().await, CoordinatorState::Closed);
    assert!(!control.is_in_use());
    control.clear_calls();

    coordinator.request_preview().await.unwrap();
    assert!(!coordinator
        .set_target_size(PreviewSize::new(320, 240))
        .await
        .unwrap());
    assert!(!coordinator.orientation_changed(Rotation::Deg180).await.unwrap());
    coordinator.pause().await;
    coordinator.release().await;

    assert!(control.calls().is_empty());
    assert_eq!(coordinator.state().await, CoordinatorState::Closed);
    assert!(!coordinator.frames_flowing());
    // The target survives release for the next open.
    assert_eq!(
        coordinator.target_size().await,
        Some(PreviewSize::new(320, 240))
    );
}

#[tokio::test]
async fn test_reopen_applies_rotation_reported_while_closed() {
    let (coordinator, control) = previewing().await;
    coordinator.release().await;

    coordinator.orientation_changed(Rotation::Deg90).await.unwrap();
    coordinator.open().await.unwrap();
    coordinator.request_preview().await.unwrap();

    assert_eq!(control.display_orientation(), 0);
    assert_eq!(coordinator.state().await, CoordinatorState::Previewing);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_release_is_ordered_and_idempotent() {
    let (coordinator, control) = previewing().await;
    control.clear_calls();

    coordinator.release().await;
    coordinator.release().await;

    let calls = control.calls();
    assert_eq!(calls.last(), Some(&CameraCall::Release));
    assert_eq!(control.count(&CameraCall::Release), 1);
    let stop = calls.iter().position(|c| *c == CameraCall::StopPreview).unwrap();
    let release = calls.iter().position(|c| *c == CameraCall::Release).unwrap();
    assert!(stop < release);
    assert!(!control.has_frame_callback());
}

#[tokio::test]
async fn test_frames_reach_sink_only_while_previewing() {
    let (coordinator, control) = previewing().await;
    let (sink, count) = counting_sink();
    coordinator.register_frame_callback(Some(sink)).await;

    let size = coordinator.preview_size().await.unwrap();
    assert!(control.deliver_frame(&frame(size, 1)));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    coordinator.pause().await;
    assert!(!control.deliver_frame(&frame(size, 2)));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    coordinator.request_preview().await.unwrap();
    assert!(control.deliver_frame(&frame(size, 3)));
    assert_eq!(count.load(Ordering::SeqCst), 2);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_occupied_camera_stays_closed() {
    init_tracing();
    let (backend, control) = mock_backend();
    control.occupy();
    let coordinator = Coordinator::new(backend, fast_config()).unwrap();

    let result = coordinator.open().await;

    assert!(matches!(result, Err(Error::DeviceUnavailable { .. })));
    assert_eq!(coordinator.state().await, CoordinatorState::Closed);
    assert!(!control.calls().contains(&CameraCall::StartPreview));
}

#[tokio::test]
async fn test_start_fault_leaves_camera_idle() {
    init_tracing();
    let (backend, control) = mock_backend();
    let coordinator = Coordinator::new(backend, fast_config()).unwrap();
    coordinator.open().await.unwrap();
    coordinator.bind_surface(DisplayTarget::new(1)).await.unwrap();

    control.fail_next(MockOperation::StartPreview);
    let result = coordinator.surface_changed(540, 960, 4).await;

    assert!(matches!(result, Err(Error::TransientHardwareFault { .. })));
    assert_eq!(coordinator.state().await, CoordinatorState::Idle);
    assert!(!coordinator.frames_flowing());

    // The next request succeeds.
    coordinator.request_preview().await.unwrap();
    assert_eq!(coordinator.state().await, CoordinatorState::Previewing);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_surface_destroyed_stops_preview() {
    let (coordinator, control) = previewing().await;

    coordinator.unbind_surface().await;

    assert_eq!(coordinator.state().await, CoordinatorState::Idle);
    assert_eq!(coordinator.surface_state().await, SurfaceState::Destroyed);
    assert!(!control.is_previewing());
    assert_eq!(control.display_target(), None);

    // No surface, no preview.
    coordinator.request_preview().await.unwrap();
    assert_eq!(coordinator.state().await, CoordinatorState::Idle);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_autofocus_cycles_while_previewing() {
    let (coordinator, control) = previewing().await;

    wait_until(|| control.count(&CameraCall::AutoFocus) >= 3).await;
    coordinator.pause().await;
    assert!(!coordinator.is_autofocus_armed().await);

    let after_pause = control.count(&CameraCall::AutoFocus);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(control.count(&CameraCall::AutoFocus), after_pause);

    coordinator.shutdown().await;
}
