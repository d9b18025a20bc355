//! Camera resource coordinator.
//!
//! The [`Coordinator`] owns the [`CameraHandle`] and every piece of state
//! derived from it (orientation, preview geometry, surface binding). All of
//! it sits behind one async mutex; each public operation holds that lock for
//! the whole transition, so events from the orientation sensor, the display
//! surface, the layout pass and the autofocus loop never interleave.
//!
//! ```text
//!  Closed ──open──► Opening ──► Idle ──request_preview──► Previewing
//!    ▲                 │         ▲  ◄──pause/unbind_surface──┘
//!    └─────────────────┴─release─┴────────────────────────────┘
//! ```
//!
//! Frames never take the lock. The coordinator publishes "preview live" and
//! the frame size through a [`FrameGate`]; the gate is closed across every
//! stop/apply/start cycle so no frame is attributed to a superseded
//! configuration.
//!
//! # Examples
//!
//! ```
//! use scancam_core::{PreviewSize, Rotation};
//! use scancam_hardware::{AnyCameraBackend, DisplayTarget};
//! use scancam_hardware::mock::MockCameraBackend;
//! use scancam_scanner::{Coordinator, CoordinatorState, ScannerConfig};
//!
//! #[tokio::main]
//! async fn main() -> scancam_core::Result<()> {
//!     let (backend, control) = MockCameraBackend::new();
//!     let coordinator = Coordinator::new(AnyCameraBackend::Mock(backend), ScannerConfig::default())?;
//!
//!     coordinator.open().await?;
//!     coordinator.bind_surface(DisplayTarget::new(1)).await?;
//!     coordinator.set_target_size(PreviewSize::new(480, 640)).await?;
//!     coordinator.request_preview().await?;
//!     assert_eq!(coordinator.state().await, CoordinatorState::Previewing);
//!
//!     coordinator.orientation_changed(Rotation::Deg90).await?;
//!     coordinator.release().await;
//!     assert!(!control.is_in_use());
//!     Ok(())
//! }
//! ```

use crate::config::ScannerConfig;
use crate::dispatch::FrameSink;
use crate::gate::FrameGate;
use crate::state::{CoordinatorState, StateMachine, StateTransition};
use scancam_core::{
    DisplayTransform, Error, LayoutRect, OrientationState, PreviewGeometry, PreviewSize, Result,
    Rotation, SurfaceState, fit_preview,
};
use scancam_hardware::{
    AnyCameraBackend, CameraBackend, CameraHandle, DisplayTarget, FrameCallback, HardwareError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

/// State guarded by the resource lock.
struct Inner {
    handle: CameraHandle,
    machine: StateMachine,
    orientation: OrientationState,
    /// Most recent device rotation reported, applied or not.
    rotation: Rotation,
    geometry: PreviewGeometry,
    surface: SurfaceState,
    display: Option<DisplayTarget>,
    display_attached: bool,
    frame_sink: Option<FrameSink>,
    autofocus: Option<CancellationToken>,
    gate: Arc<FrameGate>,
}

impl Inner {
    fn new(camera_id: u32, gate: Arc<FrameGate>) -> Self {
        Self {
            handle: CameraHandle::closed(camera_id),
            machine: StateMachine::new(),
            orientation: OrientationState::default(),
            rotation: Rotation::default(),
            geometry: PreviewGeometry::new(),
            surface: SurfaceState::default(),
            display: None,
            display_attached: false,
            frame_sink: None,
            autofocus: None,
            gate,
        }
    }

    fn state(&self) -> CoordinatorState {
        *self.machine.current_state()
    }

    fn transition(&mut self, to: CoordinatorState) {
        let camera_id = self.handle.camera_id();
        match self.machine.transition_to(to) {
            Ok(t) => debug!(camera_id, from = %t.from, to = %t.to, "State transition"),
            Err(e) => warn!(camera_id, error = %e, "Rejected state transition"),
        }
    }

    fn stop_autofocus_loop(&mut self) {
        if let Some(token) = self.autofocus.take() {
            token.cancel();
        }
    }

    /// Wrap the registered sink so frames are only forwarded while the gate
    /// is open, tagged with the published frame size.
    fn install_frame_callback(&mut self) {
        let callback = self.frame_sink.as_ref().map(|sink| {
            let sink = Arc::clone(sink);
            let gate = Arc::clone(&self.gate);
            let callback: FrameCallback = Arc::new(move |data: &[u8]| {
                if let Some(size) = gate.frame_size() {
                    sink(data, size.width, size.height);
                }
            });
            callback
        });
        self.handle.register_frame_callback(callback);
    }

    async fn attach_display(&mut self) -> Result<()> {
        if self.display_attached || !self.handle.is_open() {
            return Ok(());
        }
        let Some(target) = self.display.clone() else {
            return Ok(());
        };

        match self.handle.attach_display(Some(&target)).await {
            Ok(()) => {
                self.display_attached = true;
                debug!(camera_id = self.handle.camera_id(), %target, "Display attached");
                Ok(())
            }
            Err(e) => {
                warn!(camera_id = self.handle.camera_id(), %target, error = %e, "Display attach failed");
                Err(e.into())
            }
        }
    }

    async fn detach_display(&mut self) {
        if !self.display_attached {
            return;
        }
        self.display_attached = false;
        if let Err(e) = self.handle.attach_display(None).await {
            warn!(camera_id = self.handle.camera_id(), error = %e, "Display detach failed");
        }
    }

    /// Disarm autofocus and stop the stream. Never fails.
    async fn halt_preview(&mut self) {
        let camera_id = self.handle.camera_id();
        self.stop_autofocus_loop();
        self.gate.close();

        if self.handle.is_autofocus_armed() || self.handle.is_preview_running() {
            if let Err(e) = self.handle.cancel_auto_focus().await {
                warn!(camera_id, error = %e, "Cancel autofocus failed");
            }
        }
        if let Err(e) = self.handle.stop().await {
            warn!(camera_id, error = %e, "Stop preview failed");
        }
        if self.state() == CoordinatorState::Previewing {
            self.transition(CoordinatorState::Idle);
        }
    }

    /// Re-query supported sizes and re-run selection.
    ///
    /// Returns the newly chosen size when it differs from the previous one.
    async fn refresh_geometry(&mut self) -> Result<Option<PreviewSize>> {
        let supported = self.handle.supported_preview_sizes().await?;
        let changed = self
            .geometry
            .refresh(supported, self.orientation.transform());
        Ok(if changed { self.geometry.chosen() } else { None })
    }

    async fn apply_settings(
        &mut self,
        transform: Option<DisplayTransform>,
        size: Option<PreviewSize>,
    ) -> std::result::Result<(), HardwareError> {
        if let Some(transform) = transform {
            self.handle.set_display_transform(transform).await?;
        }
        if let Some(size) = size {
            self.handle.configure(size).await?;
            self.gate.set_size(Some(size));
        }
        Ok(())
    }

    /// Push a new transform and/or size to the hardware.
    ///
    /// A running preview is taken through exactly one stop/apply/start cycle
    /// with the frame gate closed. A fault in that cycle leaves the
    /// coordinator `Idle`. On any fault the rotation memory and chosen size
    /// are forgotten so the next event applies them again.
    async fn apply(
        &mut self,
        transform: Option<DisplayTransform>,
        size: Option<PreviewSize>,
    ) -> Result<()> {
        if transform.is_none() && size.is_none() {
            return Ok(());
        }
        let outcome = self.apply_cycle(transform, size).await;
        if outcome.is_err() {
            self.orientation.reset();
            self.geometry.clear_hardware();
        }
        outcome
    }

    async fn apply_cycle(
        &mut self,
        transform: Option<DisplayTransform>,
        size: Option<PreviewSize>,
    ) -> Result<()> {
        let live = self.state() == CoordinatorState::Previewing;
        if live {
            self.gate.close();
            if let Err(e) = self.handle.cancel_auto_focus().await {
                warn!(camera_id = self.handle.camera_id(), error = %e, "Cancel autofocus failed");
            }
            if let Err(e) = self.handle.stop().await {
                return Err(self.fall_back_to_idle("stop_preview", e));
            }
        }

        if let Err(e) = self.apply_settings(transform, size).await {
            if live {
                return Err(self.fall_back_to_idle("reconfigure", e));
            }
            warn!(camera_id = self.handle.camera_id(), error = %e, "Reconfigure failed");
            return Err(e.into());
        }

        if live {
            if let Err(e) = self.handle.start().await {
                return Err(self.fall_back_to_idle("start_preview", e));
            }
            self.handle.arm_autofocus();
            self.gate.open();
            debug!(
                camera_id = self.handle.camera_id(),
                transform = ?transform,
                size = ?size,
                "Live preview reconfigured"
            );
        }
        Ok(())
    }

    fn fall_back_to_idle(&mut self, stage: &str, error: HardwareError) -> Error {
        warn!(
            camera_id = self.handle.camera_id(),
            stage,
            error = %error,
            "Hardware fault, falling back to idle"
        );
        self.stop_autofocus_loop();
        self.gate.close();
        self.handle.disarm_autofocus();
        if self.state() == CoordinatorState::Previewing {
            self.transition(CoordinatorState::Idle);
        }
        error.into()
    }
}

/// Serializes every operation on the camera resource.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Coordinator {
    backend: AnyCameraBackend,
    config: ScannerConfig,
    inner: Arc<Mutex<Inner>>,
    gate: Arc<FrameGate>,
    tasks: TaskTracker,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("camera_id", &self.config.camera_id)
            .field("frames_flowing", &self.gate.is_open())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator for `config.camera_id`. The camera is not opened.
    ///
    /// # Errors
    ///
    /// `Error::Config` when `config` does not validate.
    pub fn new(backend: AnyCameraBackend, config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        let gate = Arc::new(FrameGate::new());
        let inner = Inner::new(config.camera_id, Arc::clone(&gate));
        Ok(Self {
            backend,
            config,
            inner: Arc::new(Mutex::new(inner)),
            gate,
            tasks: TaskTracker::new(),
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Acquire the camera: `Closed → Idle`.
    ///
    /// Resolves the display transform and preview size from scratch and
    /// attaches the surface if one is already bound. No-op unless `Closed`.
    ///
    /// # Errors
    ///
    /// `Error::DeviceUnavailable` when the camera is absent or in use; the
    /// coordinator stays `Closed`. `Error::DisplayAttachFailure` when the
    /// bound surface cannot be attached; the coordinator is `Idle`.
    pub async fn open(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state() != CoordinatorState::Closed {
            return Ok(());
        }

        let camera_id = self.config.camera_id;
        inner.transition(CoordinatorState::Opening);

        let opened = if self.backend.camera_count() == 0 {
            Err(HardwareError::unavailable(camera_id, "no camera present"))
        } else {
            CameraHandle::open(&self.backend, camera_id).await
        };
        let handle = match opened {
            Ok(handle) => handle,
            Err(e) => {
                warn!(camera_id, error = %e, "Camera unavailable");
                inner.transition(CoordinatorState::Closed);
                return Err(e.into());
            }
        };

        if let Some(info) = handle.info() {
            inner.orientation.set_sensor(info.facing, info.orientation);
        }
        inner.handle = handle;
        inner.install_frame_callback();
        inner.transition(CoordinatorState::Idle);

        let rotation = inner.rotation;
        let transform = inner.orientation.update(rotation);
        let size = match inner.refresh_geometry().await {
            Ok(size) => size,
            Err(e) => {
                warn!(camera_id, error = %e, "Could not query preview sizes");
                None
            }
        };
        if let Err(e) = inner.apply(transform, size).await {
            // Idle camera with default parameters is still usable.
            debug!(camera_id, error = %e, "Initial configuration incomplete");
        }

        if inner.surface.is_available() {
            inner.attach_display().await?;
        }
        Ok(())
    }

    /// The display surface was created.
    ///
    /// Attaches it right away when the camera is `Idle`; otherwise it is
    /// attached on the next open or preview request. Does not start preview.
    pub async fn bind_surface(&self, target: DisplayTarget) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.surface = SurfaceState::Created;

        if inner.state() == CoordinatorState::Previewing {
            debug!(%target, "Surface bound while previewing, keeping current target");
            inner.display = Some(target);
            return Ok(());
        }

        inner.display = Some(target);
        inner.display_attached = false;
        if inner.state() == CoordinatorState::Idle {
            inner.attach_display().await?;
        }
        Ok(())
    }

    /// Record the size the surface wants to show.
    ///
    /// With the camera open the supported sizes are re-queried and selection
    /// re-run; the hardware is reconfigured only if a different size was
    /// chosen. Returns whether that happened.
    pub async fn set_target_size(&self, size: PreviewSize) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        self.set_target_locked(&mut inner, size).await
    }

    async fn set_target_locked(&self, inner: &mut Inner, size: PreviewSize) -> Result<bool> {
        inner.geometry.set_target(size);
        if !inner.state().is_open() {
            return Ok(false);
        }

        let Some(chosen) = inner.refresh_geometry().await? else {
            return Ok(false);
        };
        debug!(camera_id = self.config.camera_id, target = %size, %chosen, "Preview size selected");
        inner.apply(None, Some(chosen)).await?;
        Ok(true)
    }

    /// Start the preview: `Idle → Previewing`.
    ///
    /// Requires a bound surface; without one, or when not `Idle`, this is a
    /// no-op. Arms autofocus and runs the first focus cycle immediately.
    ///
    /// # Errors
    ///
    /// `Error::DisplayAttachFailure` or `Error::TransientHardwareFault`; the
    /// coordinator stays `Idle`.
    pub async fn request_preview(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.request_preview_locked(&mut inner).await
    }

    async fn request_preview_locked(&self, inner: &mut Inner) -> Result<()> {
        if inner.state() != CoordinatorState::Idle {
            return Ok(());
        }
        if !inner.surface.is_available() {
            debug!(camera_id = self.config.camera_id, "No surface bound, preview deferred");
            return Ok(());
        }

        inner.attach_display().await?;
        if let Err(e) = inner.handle.start().await {
            warn!(camera_id = self.config.camera_id, error = %e, "Start preview failed");
            return Err(e.into());
        }

        inner.transition(CoordinatorState::Previewing);
        inner.handle.arm_autofocus();
        inner.gate.open();
        self.spawn_autofocus(inner);
        Ok(())
    }

    /// The surface changed size: request `(width, height) * preview_scale`
    /// and start the preview.
    pub async fn surface_changed(&self, width: u32, height: u32, format: i32) -> Result<()> {
        let scale = self.config.preview_scale;
        let target = PreviewSize::new(width.saturating_mul(scale), height.saturating_mul(scale));
        trace!(width, height, format, %target, "Surface changed");

        let mut inner = self.inner.lock().await;
        self.set_target_locked(&mut inner, target).await?;
        self.request_preview_locked(&mut inner).await
    }

    /// The device rotation changed.
    ///
    /// The rotation is remembered even while closed. When it differs from the
    /// last applied one, the new transform (and a re-selected size, if the
    /// portrait/landscape sense flipped) is applied; a running preview goes
    /// through one stop/apply/start cycle. Returns whether the hardware was
    /// touched.
    pub async fn orientation_changed(&self, rotation: Rotation) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.rotation = rotation;
        if !inner.state().is_open() {
            return Ok(false);
        }

        let Some(transform) = inner.orientation.update(rotation) else {
            trace!(camera_id = self.config.camera_id, %rotation, "Rotation unchanged");
            return Ok(false);
        };
        let size = match inner.refresh_geometry().await {
            Ok(size) => size,
            Err(e) => {
                warn!(camera_id = self.config.camera_id, error = %e, "Could not query preview sizes");
                None
            }
        };

        inner.apply(Some(transform), size).await?;
        debug!(camera_id = self.config.camera_id, %rotation, %transform, "Orientation applied");
        Ok(true)
    }

    /// The display surface was destroyed: stop the preview and detach.
    pub async fn unbind_surface(&self) {
        let mut inner = self.inner.lock().await;
        inner.surface = SurfaceState::Destroyed;
        inner.halt_preview().await;
        inner.detach_display().await;
        inner.display = None;
    }

    /// Stop the preview, cancel autofocus and detach the display. Never fails.
    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        inner.halt_preview().await;
        inner.detach_display().await;
    }

    /// Give the camera back: any state → `Closed`. Idempotent.
    ///
    /// Clears the rotation memory and everything learned from the hardware;
    /// the target size and surface binding survive for the next open.
    pub async fn release(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state() == CoordinatorState::Closed {
            return;
        }

        inner.halt_preview().await;
        inner.detach_display().await;
        if let Err(e) = inner.handle.close().await {
            warn!(camera_id = self.config.camera_id, error = %e, "Camera release reported an error");
        }
        inner.handle = CameraHandle::closed(self.config.camera_id);
        inner.orientation.reset();
        inner.geometry.clear_hardware();
        inner.gate.set_size(None);

        if let Some(t) = inner.machine.close() {
            debug!(camera_id = self.config.camera_id, from = %t.from, to = %t.to, "State transition");
        }
    }

    /// Install (`Some`) or remove (`None`) the frame consumer.
    ///
    /// Survives release; it is installed on every open.
    pub async fn register_frame_callback(&self, sink: Option<FrameSink>) {
        let mut inner = self.inner.lock().await;
        inner.frame_sink = sink;
        inner.install_frame_callback();
    }

    /// Release the camera and wait for background tasks to finish.
    pub async fn shutdown(&self) {
        self.release().await;
        self.tasks.close();
        self.tasks.wait().await;
    }

    fn spawn_autofocus(&self, inner: &mut Inner) {
        inner.stop_autofocus_loop();
        let token = CancellationToken::new();
        inner.autofocus = Some(token.clone());

        self.tasks.spawn(autofocus_loop(
            Arc::clone(&self.inner),
            token,
            self.config.autofocus_interval(),
            self.config.camera_id,
        ));
    }

    pub async fn state(&self) -> CoordinatorState {
        self.inner.lock().await.state()
    }

    /// Chosen preview size, if any.
    pub async fn preview_size(&self) -> Option<PreviewSize> {
        self.inner.lock().await.geometry.chosen()
    }

    pub async fn target_size(&self) -> Option<PreviewSize> {
        self.inner.lock().await.geometry.target()
    }

    /// Display transform currently applied, `None` while closed.
    pub async fn display_transform(&self) -> Option<DisplayTransform> {
        let inner = self.inner.lock().await;
        inner
            .orientation
            .last_applied()
            .map(|_| inner.orientation.transform())
    }

    pub async fn surface_state(&self) -> SurfaceState {
        self.inner.lock().await.surface
    }

    pub async fn is_autofocus_armed(&self) -> bool {
        self.inner.lock().await.handle.is_autofocus_armed()
    }

    /// Recent state transitions, oldest first.
    pub async fn transitions(&self) -> Vec<StateTransition> {
        self.inner.lock().await.machine.history().iter().cloned().collect()
    }

    /// Where the preview should be drawn inside a container of the given
    /// size.
    pub async fn preview_layout(&self, container_width: u32, container_height: u32) -> LayoutRect {
        let inner = self.inner.lock().await;
        fit_preview(
            container_width,
            container_height,
            inner.geometry.chosen(),
            inner.orientation.transform(),
        )
    }

    /// Whether frames are currently forwarded. Lock-free.
    pub fn frames_flowing(&self) -> bool {
        self.gate.is_open()
    }
}

/// Continuous autofocus: one cycle, wait for it, pause, repeat, for as long
/// as the token is live and the handle stays armed.
async fn autofocus_loop(
    inner: Arc<Mutex<Inner>>,
    token: CancellationToken,
    interval: Duration,
    camera_id: u32,
) {
    loop {
        let completion = {
            let mut guard = tokio::select! {
                _ = token.cancelled() => break,
                guard = inner.lock() => guard,
            };
            if token.is_cancelled() || !guard.handle.is_autofocus_armed() {
                break;
            }
            match guard.handle.auto_focus().await {
                Ok(completion) => completion,
                Err(e) => {
                    warn!(camera_id, error = %e, "Autofocus request failed");
                    None
                }
            }
        };

        if let Some(completion) = completion {
            tokio::select! {
                _ = token.cancelled() => break,
                focused = completion.wait() => trace!(camera_id, ?focused, "Autofocus cycle finished"),
            }
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    trace!(camera_id, "Autofocus loop stopped");
}
