//! Preview size selection and preview layout.
//!
//! Cameras only stream at a fixed set of sizes. [`select_preview_size`] picks
//! the size that best serves a consumer surface, preferring to scale a larger
//! capture down over scaling a smaller one up. [`PreviewGeometry`] keeps the
//! selection consistent with the currently advertised size set, and
//! [`fit_preview`] centres the chosen preview inside its container.
//!
//! # Selection rules
//!
//! Portrait transforms (90/270) compare against the swapped hardware size,
//! since the sensor reports landscape-native sizes:
//!
//! 1. Among sizes with `height >= target.width` and `width >= target.height`,
//!    minimise `height - target.width`.
//! 2. Otherwise minimise `|height - target.width|` over all sizes.
//!
//! Landscape transforms (0/180):
//!
//! 1. An exact match wins.
//! 2. Among sizes at least as large as the target in both dimensions,
//!    minimise the summed excess.
//! 3. Otherwise minimise the summed absolute difference.
//!
//! Ties go to the first size in enumeration order.

use crate::orientation::DisplayTransform;
use crate::types::PreviewSize;
use serde::{Deserialize, Serialize};

/// Pick the supported size that best matches `target` for the given
/// display transform.
///
/// Returns `None` only when `supported` is empty.
///
/// # Examples
///
/// ```
/// use scancam_core::{DisplayTransform, PreviewSize, select_preview_size};
///
/// let supported = [PreviewSize::new(800, 600), PreviewSize::new(1024, 768)];
/// let chosen = select_preview_size(PreviewSize::new(640, 480), &supported, DisplayTransform::new(0));
/// assert_eq!(chosen, Some(PreviewSize::new(800, 600)));
/// ```
#[must_use]
pub fn select_preview_size(
    target: PreviewSize,
    supported: &[PreviewSize],
    transform: DisplayTransform,
) -> Option<PreviewSize> {
    if transform.is_portrait() {
        select_portrait(target, supported)
    } else {
        select_landscape(target, supported)
    }
}

fn select_portrait(target: PreviewSize, supported: &[PreviewSize]) -> Option<PreviewSize> {
    let target_width = i64::from(target.width);
    let target_height = i64::from(target.height);

    // Width is the only thing compared: the swapped height is much larger anyway.
    let larger = min_by_strict(
        supported.iter().filter(|size| {
            i64::from(size.height) >= target_width && i64::from(size.width) >= target_height
        }),
        |size| i64::from(size.height) - target_width,
    );

    larger.or_else(|| {
        min_by_strict(supported.iter(), |size| {
            (i64::from(size.height) - target_width).abs()
        })
    })
}

fn select_landscape(target: PreviewSize, supported: &[PreviewSize]) -> Option<PreviewSize> {
    if supported.contains(&target) {
        return Some(target);
    }

    let target_width = i64::from(target.width);
    let target_height = i64::from(target.height);

    let larger = min_by_strict(
        supported.iter().filter(|size| {
            i64::from(size.width) >= target_width && i64::from(size.height) >= target_height
        }),
        |size| (i64::from(size.height) - target_height) + (i64::from(size.width) - target_width),
    );

    larger.or_else(|| {
        min_by_strict(supported.iter(), |size| {
            (i64::from(size.height) - target_height).abs()
                + (i64::from(size.width) - target_width).abs()
        })
    })
}

/// Minimum by key where the first of several equal keys wins.
fn min_by_strict<'a, I, F>(sizes: I, key: F) -> Option<PreviewSize>
where
    I: Iterator<Item = &'a PreviewSize>,
    F: Fn(&PreviewSize) -> i64,
{
    let mut best: Option<(i64, PreviewSize)> = None;
    for size in sizes {
        let diff = key(size);
        match best {
            Some((min, _)) if diff >= min => {}
            _ => best = Some((diff, *size)),
        }
    }
    best.map(|(_, size)| size)
}

/// Preview geometry negotiated between the consumer surface and the camera.
///
/// # Invariant
///
/// `chosen`, when set, is a member of `supported` as of the last refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewGeometry {
    target: Option<PreviewSize>,
    supported: Vec<PreviewSize>,
    chosen: Option<PreviewSize>,
}

impl PreviewGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size the consumer surface wants to show.
    ///
    /// Empty sizes (a zero dimension) clear the target.
    pub fn set_target(&mut self, target: PreviewSize) {
        self.target = (!target.is_empty()).then_some(target);
    }

    /// Replace the supported size set and re-run selection.
    ///
    /// Returns `true` when a different size was chosen and the hardware has
    /// to be reconfigured with it.
    pub fn refresh(&mut self, supported: Vec<PreviewSize>, transform: DisplayTransform) -> bool {
        self.supported = supported;

        if self
            .chosen
            .is_some_and(|chosen| !self.supported.contains(&chosen))
        {
            self.chosen = None;
        }

        let Some(target) = self.target else {
            return false;
        };

        let selected = select_preview_size(target, &self.supported, transform);
        if selected == self.chosen {
            return false;
        }
        self.chosen = selected;
        self.chosen.is_some()
    }

    /// Forget everything learned from the hardware, keeping the target.
    pub fn clear_hardware(&mut self) {
        self.supported.clear();
        self.chosen = None;
    }

    pub fn target(&self) -> Option<PreviewSize> {
        self.target
    }

    pub fn supported(&self) -> &[PreviewSize] {
        &self.supported
    }

    pub fn chosen(&self) -> Option<PreviewSize> {
        self.chosen
    }
}

/// Rectangle in container coordinates (left/top inclusive, right/bottom
/// exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl LayoutRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Centre a preview inside a `container_width x container_height` container
/// without distorting it.
///
/// Portrait transforms show the preview with its dimensions swapped. Without a
/// chosen preview the container is filled.
///
/// # Examples
///
/// ```
/// use scancam_core::{DisplayTransform, PreviewSize, fit_preview};
///
/// // 4:3 preview in a 16:9 landscape container: pillarboxed.
/// let rect = fit_preview(1600, 900, Some(PreviewSize::new(640, 480)), DisplayTransform::new(0));
/// assert_eq!((rect.left, rect.right), (200, 1400));
/// assert_eq!((rect.top, rect.bottom), (0, 900));
/// ```
#[must_use]
pub fn fit_preview(
    container_width: u32,
    container_height: u32,
    preview: Option<PreviewSize>,
    transform: DisplayTransform,
) -> LayoutRect {
    let full = LayoutRect {
        left: 0,
        top: 0,
        right: container_width,
        bottom: container_height,
    };

    let Some(preview) = preview.filter(|p| !p.is_empty()) else {
        return full;
    };
    let shown = if transform.is_portrait() {
        preview.swapped()
    } else {
        preview
    };

    let width = u64::from(container_width);
    let height = u64::from(container_height);
    let preview_width = u64::from(shown.width);
    let preview_height = u64::from(shown.height);

    // Scaled extents never exceed the container, so they fit back into u32.
    if width * preview_height > height * preview_width {
        let scaled_width = preview_width * height / preview_height;
        LayoutRect {
            left: ((width - scaled_width) / 2) as u32,
            top: 0,
            right: ((width + scaled_width) / 2) as u32,
            bottom: container_height,
        }
    } else {
        let scaled_height = preview_height * width / preview_width;
        LayoutRect {
            left: 0,
            top: ((height - scaled_height) / 2) as u32,
            right: container_width,
            bottom: ((height + scaled_height) / 2) as u32,
        }
    }
}
