//! Common types shared between camera drivers and their callers.
//!
//! This module defines the static description of a camera sensor, the opaque
//! display target a preview is drawn into, and the callback/completion types
//! drivers use to hand frames and autofocus results back to the caller.

use scancam_core::Facing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Static description of a camera sensor.
///
/// Contains the logical index, which way the sensor faces and the angle it is
/// mounted at relative to the device's natural orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Logical camera index.
    pub camera_id: u32,

    /// Which way the sensor faces.
    pub facing: Facing,

    /// Mount angle in degrees (0, 90, 180 or 270).
    pub orientation: u16,

    /// Optional driver-reported name.
    pub name: Option<String>,
}

impl CameraInfo {
    /// Create a new CameraInfo with required fields.
    pub fn new(camera_id: u32, facing: Facing, orientation: u16) -> Self {
        Self {
            camera_id,
            facing,
            orientation: orientation % 360,
            name: None,
        }
    }

    /// Set the driver-reported name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Opaque handle to the surface a preview is drawn into.
///
/// The core never draws into the surface itself; it only hands the target to
/// the camera driver (attach) or withdraws it (detach).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayTarget {
    id: u64,
    label: String,
}

impl DisplayTarget {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            label: format!("surface-{id}"),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for DisplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Callback invoked by the driver's capture thread with each preview frame
/// (a luminance plane of the current preview size).
pub type FrameCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Pending result of a single autofocus cycle.
///
/// Resolves to `Some(success)` when the cycle finishes, or `None` when the
/// driver dropped the cycle (autofocus cancelled, preview stopped, camera
/// released).
#[derive(Debug)]
pub struct FocusCompletion {
    rx: oneshot::Receiver<bool>,
}

impl FocusCompletion {
    /// Create a pending completion and the sender the driver resolves it with.
    pub fn pending() -> (FocusNotifier, Self) {
        let (tx, rx) = oneshot::channel();
        (FocusNotifier { tx }, Self { rx })
    }

    /// A completion that is already resolved.
    pub fn ready(success: bool) -> Self {
        let (notifier, completion) = Self::pending();
        notifier.notify(success);
        completion
    }

    /// Wait for the cycle to finish.
    pub async fn wait(self) -> Option<bool> {
        self.rx.await.ok()
    }
}

/// Driver side of a [`FocusCompletion`].
#[derive(Debug)]
pub struct FocusNotifier {
    tx: oneshot::Sender<bool>,
}

impl FocusNotifier {
    /// Report the outcome of the focus cycle. Ignored if nobody waits anymore.
    pub fn notify(self, success: bool) {
        let _ = self.tx.send(success);
    }
}
