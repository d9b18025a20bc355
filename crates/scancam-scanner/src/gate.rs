//! Lock-free frame gate.
//!
//! The capture thread must not wait on the resource lock, so the coordinator
//! publishes the two things a frame needs to know (is a preview live, and at
//! what size) through atomics. The gate is closed for the whole of a
//! stop/apply/start cycle.

use scancam_core::PreviewSize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct FrameGate {
    active: AtomicBool,
    // width in the high half, height in the low half; 0 when unknown
    size: AtomicU64,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the frame size of the running preview.
    pub fn set_size(&self, size: Option<PreviewSize>) {
        let packed = size.map_or(0, |s| (u64::from(s.width) << 32) | u64::from(s.height));
        self.size.store(packed, Ordering::Release);
    }

    pub fn open(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Size of frames currently flowing, or `None` when frames must be
    /// dropped (gate closed or size unknown).
    pub fn frame_size(&self) -> Option<PreviewSize> {
        if !self.is_open() {
            return None;
        }
        let packed = self.size.load(Ordering::Acquire);
        let size = PreviewSize::new((packed >> 32) as u32, packed as u32);
        (!size.is_empty()).then_some(size)
    }
}
