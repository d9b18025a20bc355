//! Camera resource coordination and barcode scan sessions.
//!
//! This crate is the stateful half of scancam. It owns the camera for the
//! duration of a scan, keeps the preview configured for the current device
//! rotation and surface size, runs continuous autofocus and forwards preview
//! frames to a decoder until the first symbol is found.
//!
//! # Components
//!
//! - [`Coordinator`]: the camera resource state machine. Every operation is
//!   serialized on one lock and never leaves the hardware started while it
//!   is being reconfigured.
//! - [`FrameDispatch`]: feeds frames to a [`Decoder`] and reports at most
//!   one result.
//! - [`ScanSession`]: host-facing entry point that serializes lifecycle,
//!   surface and orientation events and yields one [`ScanOutcome`].
//! - [`ScannerConfig`]: session settings.
//!
//! # Example
//!
//! ```no_run
//! use scancam_core::Symbol;
//! use scancam_hardware::AnyCameraBackend;
//! use scancam_hardware::mock::MockCameraBackend;
//! use scancam_scanner::{Decoder, ScanSession, ScannerConfig, SessionEvent};
//!
//! struct MyDecoder;
//!
//! impl Decoder for MyDecoder {
//!     fn decode(&mut self, data: &[u8], width: u32, height: u32) -> Vec<Symbol> {
//!         // hand the luminance plane to a barcode library here
//!         let _ = (data, width, height);
//!         Vec::new()
//!     }
//! }
//!
//! # async fn example() -> scancam_core::Result<()> {
//! let (backend, _control) = MockCameraBackend::new();
//! let mut session = ScanSession::start(
//!     AnyCameraBackend::Mock(backend),
//!     MyDecoder,
//!     ScannerConfig::default(),
//! )?;
//!
//! session.events().send(SessionEvent::Foreground).await?;
//! let outcome = session.outcome().await;
//! session.shutdown().await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod gate;
pub mod session;
pub mod state;

pub use config::ScannerConfig;
pub use coordinator::Coordinator;
pub use dispatch::{Decoder, DecoderConfig, FrameDispatch, FrameOutcome, FrameSink};
pub use gate::FrameGate;
pub use session::{CancelReason, EventSender, ScanOutcome, ScanSession, ScanSessionHandle, SessionEvent};
pub use state::{CoordinatorState, StateMachine, StateTransition};
