//! Device rotation and camera display transform resolution.
//!
//! A camera sensor is mounted at a fixed angle relative to the device's
//! natural orientation. To show an upright preview, the preview stream must be
//! rotated by an angle that depends on how the device is currently held, on
//! the mount angle and on whether the sensor faces the user (in which case
//! the preview is mirrored).
//!
//! [`resolve`] is the pure mapping; [`OrientationState`] adds the debouncing
//! the coordinator relies on so that repeated rotation events with the same
//! value never touch the hardware twice.
//!
//! # Examples
//!
//! ```
//! use scancam_core::{Facing, Rotation, orientation::resolve};
//!
//! // Typical phone: rear sensor mounted at 90 degrees, device upright.
//! assert_eq!(resolve(Rotation::Deg0, Facing::Back, 90).degrees(), 90);
//!
//! // Front sensor mounted at 270 degrees, device upright (mirrored).
//! assert_eq!(resolve(Rotation::Deg0, Facing::Front, 270).degrees(), 90);
//! ```

use crate::constants::{ORIENTATION_UNKNOWN, PORTRAIT_TRANSFORMS};
use crate::{Facing, Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete rotation of the display relative to the device's natural
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation in degrees (0, 90, 180 or 270).
    #[must_use]
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Parse an exact quarter-turn value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRotation` for anything other than 0, 90, 180 or
    /// 270 (after normalising negative and > 360 values).
    ///
    /// # Examples
    ///
    /// ```
    /// use scancam_core::Rotation;
    ///
    /// assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
    /// assert!(Rotation::from_degrees(45).is_err());
    /// ```
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(Error::InvalidRotation(degrees)),
        }
    }

    /// Snap a raw orientation-sensor reading to the nearest quarter turn.
    ///
    /// Returns `None` for [`ORIENTATION_UNKNOWN`] (device lying flat) and for
    /// any other negative reading.
    ///
    /// # Examples
    ///
    /// ```
    /// use scancam_core::Rotation;
    ///
    /// assert_eq!(Rotation::from_sensor_degrees(84), Some(Rotation::Deg90));
    /// assert_eq!(Rotation::from_sensor_degrees(350), Some(Rotation::Deg0));
    /// assert_eq!(Rotation::from_sensor_degrees(-1), None);
    /// ```
    #[must_use]
    pub fn from_sensor_degrees(degrees: i32) -> Option<Self> {
        if degrees == ORIENTATION_UNKNOWN || degrees < 0 {
            return None;
        }
        let snapped = ((degrees + 45) / 90 * 90) % 360;
        Self::from_degrees(snapped).ok()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Clockwise rotation applied to the preview stream, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DisplayTransform(u16);

impl DisplayTransform {
    /// Create a transform, normalising the angle into `0..360`.
    #[must_use]
    pub const fn new(degrees: u16) -> Self {
        Self(degrees % 360)
    }

    #[must_use]
    pub fn degrees(&self) -> u16 {
        self.0
    }

    /// Portrait-like transforms (90/270) swap the preview's width and height
    /// on screen.
    #[must_use]
    pub fn is_portrait(&self) -> bool {
        PORTRAIT_TRANSFORMS.contains(&self.0)
    }
}

impl fmt::Display for DisplayTransform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Map a device rotation to the display transform for a given sensor.
///
/// Front-facing sensors are mirrored, so the rotation is compensated in the
/// opposite direction.
#[must_use]
pub fn resolve(rotation: Rotation, facing: Facing, mount_angle: u16) -> DisplayTransform {
    let raw = u32::from(rotation.degrees());
    let mount = u32::from(mount_angle) % 360;

    let degrees = match facing {
        Facing::Front => (360 - (mount + raw) % 360) % 360,
        Facing::Back | Facing::External => (mount + 360 - raw) % 360,
    };

    // Always < 360, fits in u16.
    DisplayTransform::new(degrees as u16)
}

/// Orientation bookkeeping owned by the coordinator.
///
/// `last_applied` is the raw rotation whose transform was last pushed to the
/// hardware; `None` forces the next update through (fresh open).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientationState {
    last_applied: Option<Rotation>,
    facing: Facing,
    mount_angle: u16,
    transform: DisplayTransform,
}

impl OrientationState {
    pub fn new(facing: Facing, mount_angle: u16) -> Self {
        Self {
            last_applied: None,
            facing,
            mount_angle: mount_angle % 360,
            transform: DisplayTransform::default(),
        }
    }

    /// Replace the sensor description (a different camera was opened).
    ///
    /// Clears the rotation memory so the next update is applied.
    pub fn set_sensor(&mut self, facing: Facing, mount_angle: u16) {
        self.facing = facing;
        self.mount_angle = mount_angle % 360;
        self.last_applied = None;
    }

    /// Record a new device rotation.
    ///
    /// Returns the freshly resolved transform, or `None` when `rotation`
    /// equals the last applied rotation and nothing needs to be done.
    pub fn update(&mut self, rotation: Rotation) -> Option<DisplayTransform> {
        if self.last_applied == Some(rotation) {
            return None;
        }
        self.last_applied = Some(rotation);
        self.transform = resolve(rotation, self.facing, self.mount_angle);
        Some(self.transform)
    }

    /// Forget the last applied rotation.
    pub fn reset(&mut self) {
        self.last_applied = None;
    }

    pub fn last_applied(&self) -> Option<Rotation> {
        self.last_applied
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn mount_angle(&self) -> u16 {
        self.mount_angle
    }

    /// Current display transform.
    pub fn transform(&self) -> DisplayTransform {
        self.transform
    }
}

impl Default for OrientationState {
    fn default() -> Self {
        Self::new(Facing::Back, 0)
    }
}
