//! Mock camera implementation for testing and development.
//!
//! This module provides a simulated camera service that can be controlled
//! programmatically: its supported sizes and sensor description are scripted,
//! every driver call is recorded, failures can be injected per operation and
//! frames can be pushed into the preview callback as if a capture thread
//! produced them.
//!
//! The mock is deliberately strict where real drivers are fragile: starting a
//! running preview, or reconfiguring size or orientation on a live stream,
//! fails with a driver fault. Like a real driver, stopping or releasing the
//! camera waits for a frame callback that is already running.

use crate::error::{HardwareError, Result};
use crate::traits::{CameraBackend, CameraDevice};
use crate::types::{CameraInfo, DisplayTarget, FocusCompletion, FocusNotifier, FrameCallback};
use scancam_core::{DisplayTransform, Facing, PreviewSize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A driver call recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraCall {
    Open(u32),
    SetPreviewSize(PreviewSize),
    SetDisplayOrientation(u16),
    /// Attach (`Some(target id)`) or detach (`None`).
    SetPreviewDisplay(Option<u64>),
    StartPreview,
    StopPreview,
    AutoFocus,
    CancelAutoFocus,
    /// Callback installed (`true`) or removed (`false`).
    SetFrameCallback(bool),
    Release,
}

/// Driver operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Open,
    SetPreviewSize,
    SetDisplayOrientation,
    SetPreviewDisplay,
    StartPreview,
    StopPreview,
    AutoFocus,
    CancelAutoFocus,
    Release,
}

impl MockOperation {
    fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::SetPreviewSize => "set_preview_size",
            Self::SetDisplayOrientation => "set_display_orientation",
            Self::SetPreviewDisplay => "set_preview_display",
            Self::StartPreview => "start_preview",
            Self::StopPreview => "stop_preview",
            Self::AutoFocus => "auto_focus",
            Self::CancelAutoFocus => "cancel_auto_focus",
            Self::Release => "release",
        }
    }
}

struct MockState {
    info: CameraInfo,
    present: bool,
    in_use: bool,
    supported_sizes: Vec<PreviewSize>,
    preview_size: Option<PreviewSize>,
    display_orientation: u16,
    display_target: Option<u64>,
    previewing: bool,
    frame_callback: Option<FrameCallback>,
    calls: Vec<CameraCall>,
    fail_next: HashSet<MockOperation>,
    auto_complete_focus: bool,
    focus_success: bool,
    pending_focus: Vec<FocusNotifier>,
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockState")
            .field("info", &self.info)
            .field("present", &self.present)
            .field("in_use", &self.in_use)
            .field("preview_size", &self.preview_size)
            .field("display_orientation", &self.display_orientation)
            .field("previewing", &self.previewing)
            .field("has_frame_callback", &self.frame_callback.is_some())
            .field("calls", &self.calls.len())
            .finish_non_exhaustive()
    }
}

impl MockState {
    fn new(name: String) -> Self {
        Self {
            info: CameraInfo::new(0, Facing::Back, 90).with_name(name),
            present: true,
            in_use: false,
            supported_sizes: vec![
                PreviewSize::new(1920, 1080),
                PreviewSize::new(1280, 720),
                PreviewSize::new(800, 600),
                PreviewSize::new(640, 480),
                PreviewSize::new(320, 240),
            ],
            preview_size: None,
            display_orientation: 0,
            display_target: None,
            previewing: false,
            frame_callback: None,
            calls: Vec::new(),
            fail_next: HashSet::new(),
            auto_complete_focus: true,
            focus_success: true,
            pending_focus: Vec::new(),
        }
    }

    /// Consume an injected failure for `operation`, if one is armed.
    fn check(&mut self, operation: MockOperation) -> Result<()> {
        if self.fail_next.remove(&operation) {
            return Err(HardwareError::fault(operation.name(), "injected failure"));
        }
        Ok(())
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Held while a frame callback runs. Always taken before the state lock.
type DeliveryLock = Arc<Mutex<()>>;

fn hold(delivery: &DeliveryLock) -> MutexGuard<'_, ()> {
    delivery.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock camera service.
///
/// # Examples
///
/// ```
/// use scancam_hardware::mock::{CameraCall, MockCameraBackend};
/// use scancam_hardware::traits::{CameraBackend, CameraDevice};
///
/// #[tokio::main]
/// async fn main() -> scancam_hardware::Result<()> {
///     let (backend, control) = MockCameraBackend::new();
///
///     let mut camera = backend.open(0).await?;
///     camera.start_preview().await?;
///     camera.release().await?;
///
///     assert_eq!(control.calls().last(), Some(&CameraCall::Release));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockCameraBackend {
    state: SharedState,
    delivery: DeliveryLock,
}

impl MockCameraBackend {
    /// Create a new mock camera service with one rear camera.
    ///
    /// Returns a tuple of (MockCameraBackend, MockCameraControl) where the
    /// control can script the camera and inspect the calls it received.
    pub fn new() -> (Self, MockCameraControl) {
        Self::with_name("Mock Camera".to_string())
    }

    /// Create a new mock camera service with a custom sensor name.
    pub fn with_name(name: String) -> (Self, MockCameraControl) {
        let state = Arc::new(Mutex::new(MockState::new(name)));
        let delivery = DeliveryLock::default();
        (
            Self {
                state: Arc::clone(&state),
                delivery: Arc::clone(&delivery),
            },
            MockCameraControl { state, delivery },
        )
    }
}

impl CameraBackend for MockCameraBackend {
    type Device = MockCamera;

    fn camera_count(&self) -> u32 {
        u32::from(lock(&self.state).present)
    }

    async fn open(&self, camera_id: u32) -> Result<MockCamera> {
        let mut state = lock(&self.state);
        state.calls.push(CameraCall::Open(camera_id));

        if !state.present || camera_id != state.info.camera_id {
            return Err(HardwareError::unavailable(camera_id, "no such camera"));
        }
        if state.in_use {
            return Err(HardwareError::unavailable(camera_id, "camera in use"));
        }
        if state.fail_next.remove(&MockOperation::Open) {
            return Err(HardwareError::unavailable(camera_id, "injected failure"));
        }

        state.in_use = true;
        Ok(MockCamera {
            state: Arc::clone(&self.state),
            delivery: Arc::clone(&self.delivery),
            released: false,
        })
    }
}

/// An opened mock camera.
#[derive(Debug)]
pub struct MockCamera {
    state: SharedState,
    delivery: DeliveryLock,
    released: bool,
}

impl MockCamera {
    fn state(&self) -> Result<MutexGuard<'_, MockState>> {
        if self.released {
            return Err(HardwareError::Closed);
        }
        Ok(lock(&self.state))
    }
}

impl CameraDevice for MockCamera {
    async fn get_info(&self) -> Result<CameraInfo> {
        Ok(self.state()?.info.clone())
    }

    async fn supported_preview_sizes(&self) -> Result<Vec<PreviewSize>> {
        Ok(self.state()?.supported_sizes.clone())
    }

    async fn set_preview_size(&mut self, size: PreviewSize) -> Result<()> {
        let mut state = self.state()?;
        state.calls.push(CameraCall::SetPreviewSize(size));
        state.check(MockOperation::SetPreviewSize)?;
        if state.previewing {
            return Err(HardwareError::fault(
                "set_preview_size",
                "cannot resize a running preview",
            ));
        }
        if !state.supported_sizes.contains(&size) {
            return Err(HardwareError::invalid_data(format!(
                "preview size {size} not supported"
            )));
        }
        state.preview_size = Some(size);
        Ok(())
    }

    async fn set_display_orientation(&mut self, transform: DisplayTransform) -> Result<()> {
        let mut state = self.state()?;
        state
            .calls
            .push(CameraCall::SetDisplayOrientation(transform.degrees()));
        state.check(MockOperation::SetDisplayOrientation)?;
        if state.previewing {
            return Err(HardwareError::fault(
                "set_display_orientation",
                "cannot rotate a running preview",
            ));
        }
        state.display_orientation = transform.degrees();
        Ok(())
    }

    async fn set_preview_display(&mut self, target: Option<&DisplayTarget>) -> Result<()> {
        let mut state = self.state()?;
        let id = target.map(DisplayTarget::id);
        state.calls.push(CameraCall::SetPreviewDisplay(id));
        if state.fail_next.remove(&MockOperation::SetPreviewDisplay) {
            return Err(HardwareError::display_attach("injected failure"));
        }
        state.display_target = id;
        Ok(())
    }

    async fn start_preview(&mut self) -> Result<()> {
        let mut state = self.state()?;
        state.calls.push(CameraCall::StartPreview);
        state.check(MockOperation::StartPreview)?;
        if state.previewing {
            return Err(HardwareError::fault(
                "start_preview",
                "preview already running",
            ));
        }
        state.previewing = true;
        Ok(())
    }

    async fn stop_preview(&mut self) -> Result<()> {
        let _delivery = hold(&self.delivery);
        let mut state = self.state()?;
        state.calls.push(CameraCall::StopPreview);
        state.check(MockOperation::StopPreview)?;
        state.previewing = false;
        // Stopping the stream aborts any focus cycle in flight.
        state.pending_focus.clear();
        Ok(())
    }

    async fn auto_focus(&mut self) -> Result<FocusCompletion> {
        let mut state = self.state()?;
        state.calls.push(CameraCall::AutoFocus);
        state.check(MockOperation::AutoFocus)?;
        if !state.previewing {
            return Err(HardwareError::fault("auto_focus", "preview not running"));
        }
        if state.auto_complete_focus {
            return Ok(FocusCompletion::ready(state.focus_success));
        }
        let (notifier, completion) = FocusCompletion::pending();
        state.pending_focus.push(notifier);
        Ok(completion)
    }

    async fn cancel_auto_focus(&mut self) -> Result<()> {
        let mut state = self.state()?;
        state.calls.push(CameraCall::CancelAutoFocus);
        state.check(MockOperation::CancelAutoFocus)?;
        state.pending_focus.clear();
        Ok(())
    }

    fn set_frame_callback(&mut self, callback: Option<FrameCallback>) {
        if let Ok(mut state) = self.state() {
            state
                .calls
                .push(CameraCall::SetFrameCallback(callback.is_some()));
            state.frame_callback = callback;
        }
    }

    async fn release(&mut self) -> Result<()> {
        let delivery = hold(&self.delivery);
        let mut state = self.state()?;
        state.calls.push(CameraCall::Release);
        // The platform reclaims the camera even when release reports an error.
        state.in_use = false;
        state.previewing = false;
        state.frame_callback = None;
        state.display_target = None;
        state.pending_focus.clear();
        let outcome = state.check(MockOperation::Release);
        drop(state);
        drop(delivery);
        self.released = true;
        outcome
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        if !self.released {
            let mut state = lock(&self.state);
            state.in_use = false;
            state.previewing = false;
            state.frame_callback = None;
        }
    }
}

/// Handle for scripting and inspecting a mock camera service.
///
/// # Examples
///
/// ```
/// use scancam_hardware::mock::{MockCameraBackend, MockOperation};
/// use scancam_core::PreviewSize;
///
/// let (_backend, control) = MockCameraBackend::new();
///
/// control.set_supported_sizes(vec![PreviewSize::new(640, 480)]);
/// control.fail_next(MockOperation::StartPreview);
/// assert!(control.calls().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MockCameraControl {
    state: SharedState,
    delivery: DeliveryLock,
}

impl MockCameraControl {
    /// Replace the sensor description reported by `get_info`.
    pub fn set_info(&self, info: CameraInfo) {
        lock(&self.state).info = info;
    }

    /// Replace the advertised preview sizes (enumeration order is kept).
    pub fn set_supported_sizes(&self, sizes: Vec<PreviewSize>) {
        lock(&self.state).supported_sizes = sizes;
    }

    /// Make the camera appear (`true`) or disappear (`false`).
    pub fn set_present(&self, present: bool) {
        lock(&self.state).present = present;
    }

    /// Simulate another session holding the camera.
    pub fn occupy(&self) {
        lock(&self.state).in_use = true;
    }

    /// Whether the camera is currently held open.
    pub fn is_in_use(&self) -> bool {
        lock(&self.state).in_use
    }

    /// Make the next call of `operation` fail.
    pub fn fail_next(&self, operation: MockOperation) {
        lock(&self.state).fail_next.insert(operation);
    }

    /// Resolve autofocus cycles immediately (`true`, default) or leave them
    /// pending until [`complete_focus`](Self::complete_focus).
    pub fn set_auto_complete_focus(&self, enabled: bool) {
        lock(&self.state).auto_complete_focus = enabled;
    }

    /// Outcome reported by immediately completed focus cycles.
    pub fn set_focus_success(&self, success: bool) {
        lock(&self.state).focus_success = success;
    }

    /// Resolve every pending focus cycle. Returns how many were resolved.
    pub fn complete_focus(&self, success: bool) -> usize {
        let pending: Vec<_> = lock(&self.state).pending_focus.drain(..).collect();
        let count = pending.len();
        for notifier in pending {
            notifier.notify(success);
        }
        count
    }

    /// Push one frame through the preview callback, as the capture thread
    /// would.
    ///
    /// Returns `false` (frame dropped) when no preview is running or no
    /// callback is installed. The callback runs without the mock's state
    /// lock held; `stop_preview` and `release` wait for it to return.
    pub fn deliver_frame(&self, data: &[u8]) -> bool {
        let _delivery = hold(&self.delivery);
        let Some((callback, _)) = self.live_stream() else {
            return false;
        };
        callback(data);
        true
    }

    /// Push one luminance frame of the currently programmed preview size,
    /// every byte set to `fill`.
    ///
    /// Returns `false` when no preview is running, no callback is installed
    /// or no size was programmed.
    pub fn deliver_preview_frame(&self, fill: u8) -> bool {
        let _delivery = hold(&self.delivery);
        let Some((callback, Some(size))) = self.live_stream() else {
            return false;
        };
        callback(&vec![fill; size.pixel_count()]);
        true
    }

    fn live_stream(&self) -> Option<(FrameCallback, Option<PreviewSize>)> {
        let state = lock(&self.state);
        if !state.previewing {
            return None;
        }
        state
            .frame_callback
            .clone()
            .map(|callback| (callback, state.preview_size))
    }

    /// All driver calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<CameraCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &CameraCall) -> usize {
        lock(&self.state).calls.iter().filter(|c| *c == call).count()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn is_previewing(&self) -> bool {
        lock(&self.state).previewing
    }

    pub fn preview_size(&self) -> Option<PreviewSize> {
        lock(&self.state).preview_size
    }

    pub fn display_orientation(&self) -> u16 {
        lock(&self.state).display_orientation
    }

    /// Id of the attached display target, if any.
    pub fn display_target(&self) -> Option<u64> {
        lock(&self.state).display_target
    }

    pub fn has_frame_callback(&self) -> bool {
        lock(&self.state).frame_callback.is_some()
    }
}
