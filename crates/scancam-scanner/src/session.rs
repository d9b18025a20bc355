//! Host-facing scan session.
//!
//! A [`ScanSession`] turns the independent push notifications of the host
//! (lifecycle, display surface, orientation sensor) into one serialized event
//! queue applied to the [`Coordinator`], and reports the single outcome of the
//! scan. The decode result is handled by the same pump, so the teardown that
//! follows a result never interleaves with a host event.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐
//! │ Lifecycle  │──┐
//! └────────────┘  │    ┌──────────────┐      ┌─────────────┐
//! ┌────────────┐  ├───►│ Event queue  │─────►│             │──► Coordinator
//! │ Surface    │──┤    │ (mpsc)       │      │ Event pump  │        │
//! └────────────┘  │    └──────────────┘      │             │        │ frames
//! ┌────────────┐  │                          │             │        ▼
//! │ Orientation│──┘    ┌──────────────┐      │             │  FrameDispatch
//! └────────────┘       │ Outcome      │◄─────│             │◄───────┘
//!                      └──────────────┘      └─────────────┘   result
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use scancam_core::Symbol;
//! use scancam_hardware::{AnyCameraBackend, DisplayTarget};
//! use scancam_hardware::mock::MockCameraBackend;
//! use scancam_scanner::{Decoder, ScanOutcome, ScanSession, ScannerConfig, SessionEvent};
//!
//! struct NullDecoder;
//!
//! impl Decoder for NullDecoder {
//!     fn decode(&mut self, _data: &[u8], _width: u32, _height: u32) -> Vec<Symbol> {
//!         Vec::new()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> scancam_core::Result<()> {
//!     let (backend, _control) = MockCameraBackend::new();
//!     let mut session = ScanSession::start(
//!         AnyCameraBackend::Mock(backend),
//!         NullDecoder,
//!         ScannerConfig::default(),
//!     )?;
//!
//!     let events = session.events();
//!     events.send(SessionEvent::Foreground).await?;
//!     events.send(SessionEvent::SurfaceCreated(DisplayTarget::new(1))).await?;
//!     events
//!         .send(SessionEvent::SurfaceChanged { width: 1080, height: 1920, format: 4 })
//!         .await?;
//!
//!     if let Some(ScanOutcome::Decoded(result)) = session.outcome().await {
//!         println!("{}: {}", result.symbol_type, result.data);
//!     }
//!
//!     session.shutdown().await
//! }
//! ```

use crate::config::ScannerConfig;
use crate::coordinator::Coordinator;
use crate::dispatch::{Decoder, DecoderConfig, FrameDispatch};
use scancam_core::{DecodeResult, Error, Result, Rotation};
use scancam_hardware::{AnyCameraBackend, CameraBackend, DisplayTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEvent {
    /// Scanner screen came to the foreground: open the camera and, if a
    /// surface is bound, start the preview.
    Foreground,

    /// Scanner screen left the foreground: stop and release the camera.
    Background,

    /// The display surface exists and can be drawn into. Preview starts on
    /// the following `SurfaceChanged`.
    SurfaceCreated(DisplayTarget),

    /// The display surface was measured or resized.
    SurfaceChanged { width: u32, height: u32, format: i32 },

    /// The display surface is gone.
    SurfaceDestroyed,

    /// The device rotation changed.
    OrientationChanged(Rotation),
}

/// Why a session ended without a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The device has no camera.
    NoCamera,

    /// The camera is absent or held by another session.
    DeviceUnavailable(String),

    /// The display surface could not be attached.
    DisplayAttach(String),

    /// A driver call failed.
    HardwareFault(String),
}

impl CancelReason {
    fn from_error(error: &Error) -> Option<Self> {
        if !error.is_cancellation() {
            return None;
        }
        let reason = match error {
            Error::DeviceUnavailable { reason, .. } => Self::DeviceUnavailable(reason.clone()),
            Error::DisplayAttachFailure(message) => Self::DisplayAttach(message.clone()),
            _ => Self::HardwareFault(error.to_string()),
        };
        Some(reason)
    }
}

/// The single outcome of a scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOutcome {
    Decoded(DecodeResult),
    Cancelled(CancelReason),
}

/// Delivers at most one outcome.
#[derive(Debug)]
struct OutcomeSlot {
    finished: AtomicBool,
    tx: mpsc::Sender<ScanOutcome>,
}

impl OutcomeSlot {
    fn emit(&self, outcome: ScanOutcome) -> bool {
        if self.finished.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Capacity 1 and a single sender call: never full.
        self.tx.try_send(outcome).is_ok()
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Cloneable sender for host notifications.
///
/// Usable from async code ([`send`](Self::send)) and from plain platform
/// callback threads ([`blocking_send`](Self::blocking_send)).
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSender {
    /// Queue an event.
    ///
    /// # Errors
    ///
    /// `Error::SessionClosed` once the event pump has stopped.
    pub async fn send(&self, event: SessionEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::SessionClosed)
    }

    /// Queue an event from a thread outside the async runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_send(&self, event: SessionEvent) -> Result<()> {
        self.tx.blocking_send(event).map_err(|_| Error::SessionClosed)
    }
}

/// Entry point for starting scan sessions.
#[derive(Debug)]
pub struct ScanSession;

impl ScanSession {
    /// Start a session: wire the decoder to the camera and spawn the event
    /// pump. Must be called within a Tokio runtime.
    ///
    /// When the device has no camera at all the session is cancelled with
    /// [`CancelReason::NoCamera`] straight away.
    ///
    /// # Errors
    ///
    /// `Error::Config` when `config` does not validate.
    pub fn start<D>(backend: AnyCameraBackend, decoder: D, config: ScannerConfig) -> Result<ScanSessionHandle>
    where
        D: Decoder + 'static,
    {
        let id = Uuid::new_v4();
        let span = info_span!("scan_session", session_id = %id, camera_id = config.camera_id);
        let no_camera = backend.camera_count() == 0;

        let decoder_config = DecoderConfig::from(&config);
        let event_capacity = config.event_capacity;
        let coordinator = Arc::new(Coordinator::new(backend, config)?);
        let (dispatch, results_rx) = FrameDispatch::new(decoder, decoder_config);
        let (event_tx, event_rx) = mpsc::channel(event_capacity);
        let (outcome_tx, outcome_rx) = mpsc::channel(1);
        let outcome = Arc::new(OutcomeSlot {
            finished: AtomicBool::new(false),
            tx: outcome_tx,
        });
        let cancel = CancellationToken::new();

        if no_camera {
            span.in_scope(|| warn!("No camera present, cancelling scan"));
            outcome.emit(ScanOutcome::Cancelled(CancelReason::NoCamera));
        }

        let mut tasks = JoinSet::new();
        tasks.spawn(
            run_event_pump(
                Arc::clone(&coordinator),
                Arc::clone(&dispatch),
                event_rx,
                results_rx,
                Arc::clone(&outcome),
                cancel.clone(),
            )
            .instrument(span.clone()),
        );

        span.in_scope(|| debug!("Scan session started"));

        Ok(ScanSessionHandle {
            id,
            events: EventSender { tx: event_tx },
            outcome_rx,
            coordinator,
            dispatch,
            tasks,
            cancel,
        })
    }
}

/// Handle to a running scan session.
pub struct ScanSessionHandle {
    id: Uuid,
    events: EventSender,
    outcome_rx: mpsc::Receiver<ScanOutcome>,
    coordinator: Arc<Coordinator>,
    dispatch: Arc<FrameDispatch>,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ScanSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSessionHandle")
            .field("id", &self.id)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

impl ScanSessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sender for host notifications.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Wait for the outcome of the scan.
    ///
    /// Returns `None` once the outcome has been taken or the session stopped
    /// without one.
    pub async fn outcome(&mut self) -> Option<ScanOutcome> {
        self.outcome_rx.recv().await
    }

    /// The coordinator driving the camera, for inspection.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Number of frames handed to the decoder so far.
    pub fn frames_decoded(&self) -> u64 {
        self.dispatch.frames_decoded()
    }

    /// Stop the session: release the camera and wait for every task.
    ///
    /// Task failures are logged, not returned.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                warn!(session_id = %self.id, "Session task panicked");
            }
        }

        self.coordinator.shutdown().await;
        debug!(session_id = %self.id, "Scan session stopped");
        Ok(())
    }
}

async fn run_event_pump(
    coordinator: Arc<Coordinator>,
    dispatch: Arc<FrameDispatch>,
    mut events: mpsc::Receiver<SessionEvent>,
    mut results: mpsc::UnboundedReceiver<DecodeResult>,
    outcome: Arc<OutcomeSlot>,
    cancel: CancellationToken,
) {
    coordinator.register_frame_callback(Some(dispatch.sink())).await;
    let mut awaiting_result = true;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = results.recv(), if awaiting_result => {
                awaiting_result = false;
                if let Some(result) = result {
                    finish_with_result(&coordinator, &outcome, result).await;
                }
                continue;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        // After the outcome only teardown events are honoured.
        if outcome.is_finished()
            && !matches!(event, SessionEvent::Background | SessionEvent::SurfaceDestroyed)
        {
            debug!(?event, "Session finished, ignoring event");
            continue;
        }

        if let Err(e) = apply_event(&coordinator, event).await {
            match CancelReason::from_error(&e) {
                Some(reason) => {
                    warn!(error = %e, "Scan cancelled");
                    coordinator.release().await;
                    outcome.emit(ScanOutcome::Cancelled(reason));
                }
                None => warn!(error = %e, "Session event failed"),
            }
        }
    }
}

/// Stop the preview and drop the frame consumer, then report the result.
async fn finish_with_result(coordinator: &Coordinator, outcome: &OutcomeSlot, result: DecodeResult) {
    if outcome.is_finished() {
        debug!("Session already finished, dropping decode result");
        return;
    }
    coordinator.pause().await;
    coordinator.register_frame_callback(None).await;
    info!(symbol_type = %result.symbol_type, len = result.data.len(), "Scan complete");
    outcome.emit(ScanOutcome::Decoded(result));
}

async fn apply_event(coordinator: &Coordinator, event: SessionEvent) -> Result<()> {
    debug!(?event, "Session event");
    match event {
        SessionEvent::Foreground => {
            coordinator.open().await?;
            coordinator.request_preview().await
        }
        SessionEvent::Background => {
            coordinator.pause().await;
            coordinator.release().await;
            Ok(())
        }
        SessionEvent::SurfaceCreated(target) => coordinator.bind_surface(target).await,
        SessionEvent::SurfaceChanged { width, height, format } => {
            coordinator.surface_changed(width, height, format).await
        }
        SessionEvent::SurfaceDestroyed => {
            coordinator.unbind_surface().await;
            Ok(())
        }
        SessionEvent::OrientationChanged(rotation) => {
            coordinator.orientation_changed(rotation).await.map(|_| ())
        }
    }
}
