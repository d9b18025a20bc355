//! Frame dispatch: hands preview frames to the decoder and reports the first
//! decoded symbol exactly once.
//!
//! Frames arrive on the capture thread. [`FrameDispatch::on_frame`] decodes
//! synchronously on that thread; the result leaves through an unbounded
//! channel so the capture thread never blocks on the consumer.
//!
//! # Examples
//!
//! ```
//! use scancam_core::{Symbol, SymbolType};
//! use scancam_scanner::dispatch::{Decoder, DecoderConfig, FrameDispatch, FrameOutcome};
//!
//! struct FirstByte;
//!
//! impl Decoder for FirstByte {
//!     fn decode(&mut self, data: &[u8], _width: u32, _height: u32) -> Vec<Symbol> {
//!         match data.first() {
//!             Some(b) if *b > 0 => vec![Symbol::new(b.to_string(), SymbolType::QrCode)],
//!             _ => Vec::new(),
//!         }
//!     }
//! }
//!
//! let (dispatch, mut results) = FrameDispatch::new(FirstByte, DecoderConfig::default());
//!
//! assert_eq!(dispatch.on_frame(&[0; 4], 2, 2), FrameOutcome::NoSymbol);
//! assert_eq!(dispatch.on_frame(&[7; 4], 2, 2), FrameOutcome::Delivered);
//! assert_eq!(dispatch.on_frame(&[9; 4], 2, 2), FrameOutcome::Dropped);
//!
//! assert_eq!(results.try_recv().unwrap().data, "7");
//! ```

use crate::config::ScannerConfig;
use scancam_core::constants::{DEFAULT_X_DENSITY, DEFAULT_Y_DENSITY, LUMINANCE_FORMAT};
use scancam_core::{DecodeResult, Symbol};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Callback receiving a frame together with its dimensions.
pub type FrameSink = Arc<dyn Fn(&[u8], u32, u32) + Send + Sync>;

/// Image decoder collaborator.
///
/// Implementations accept a grey luminance plane and return every symbol
/// found in it, in the order the decoder reports them.
pub trait Decoder: Send {
    /// Apply the scanner's decoder settings. Called once, before any frame.
    fn configure(&mut self, _config: &DecoderConfig) {}

    fn decode(&mut self, data: &[u8], width: u32, height: u32) -> Vec<Symbol>;
}

/// Settings handed to the decoder at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Enabled symbol-type codes; empty enables all.
    pub scan_modes: Vec<i32>,
    pub x_density: u32,
    pub y_density: u32,
    /// Image format name of the frames (always grey luminance).
    pub format: String,
}

impl DecoderConfig {
    /// Whether symbols of `code` should be reported.
    pub fn is_enabled(&self, code: i32) -> bool {
        self.scan_modes.is_empty() || self.scan_modes.contains(&code)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            scan_modes: Vec::new(),
            x_density: DEFAULT_X_DENSITY,
            y_density: DEFAULT_Y_DENSITY,
            format: LUMINANCE_FORMAT.to_string(),
        }
    }
}

impl From<&ScannerConfig> for DecoderConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            scan_modes: config.scan_modes.clone(),
            x_density: config.x_density,
            y_density: config.y_density,
            format: LUMINANCE_FORMAT.to_string(),
        }
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not decoded: a result was already delivered or the buffer was too
    /// short for the stated size.
    Dropped,

    /// Decoded without finding a usable symbol.
    NoSymbol,

    /// This frame produced the session's result.
    Delivered,
}

/// Forwards frames to a [`Decoder`] until the first symbol is found.
pub struct FrameDispatch {
    decoder: Mutex<Box<dyn Decoder>>,
    delivered: AtomicBool,
    frames_decoded: AtomicU64,
    results: mpsc::UnboundedSender<DecodeResult>,
}

impl std::fmt::Debug for FrameDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDispatch")
            .field("delivered", &self.is_delivered())
            .field("frames_decoded", &self.frames_decoded())
            .finish_non_exhaustive()
    }
}

impl FrameDispatch {
    /// Configure `decoder` and wrap it. Returns the dispatch and the receiver
    /// the single result is sent on.
    pub fn new<D>(mut decoder: D, config: DecoderConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<DecodeResult>)
    where
        D: Decoder + 'static,
    {
        decoder.configure(&config);
        debug!(
            scan_modes = ?config.scan_modes,
            x_density = config.x_density,
            y_density = config.y_density,
            format = %config.format,
            "Decoder configured"
        );

        let (results, rx) = mpsc::unbounded_channel();
        let dispatch = Arc::new(Self {
            decoder: Mutex::new(Box::new(decoder)),
            delivered: AtomicBool::new(false),
            frames_decoded: AtomicU64::new(0),
            results,
        });
        (dispatch, rx)
    }

    /// Decode one frame.
    ///
    /// Frames are serialized on the decoder; once a result has been
    /// delivered no further frame reaches the decoder.
    pub fn on_frame(&self, data: &[u8], width: u32, height: u32) -> FrameOutcome {
        if self.is_delivered() {
            return FrameOutcome::Dropped;
        }

        let needed = width as usize * height as usize;
        if needed == 0 || data.len() < needed {
            trace!(len = data.len(), width, height, "Dropping short frame");
            return FrameOutcome::Dropped;
        }

        let mut decoder = self.decoder.lock().unwrap_or_else(PoisonError::into_inner);
        // Re-check under the decoder lock; another frame may have won.
        if self.is_delivered() {
            return FrameOutcome::Dropped;
        }

        let symbols = decoder.decode(&data[..needed], width, height);
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);

        let Some(symbol) = symbols.into_iter().find(|s| !s.data.is_empty()) else {
            return FrameOutcome::NoSymbol;
        };

        self.delivered.store(true, Ordering::Release);
        drop(decoder);

        info!(
            symbol_type = %symbol.symbol_type,
            len = symbol.data.len(),
            "Symbol decoded"
        );
        if self.results.send(DecodeResult::from(symbol)).is_err() {
            debug!("Result receiver gone, dropping decode result");
        }
        FrameOutcome::Delivered
    }

    /// A callback feeding frames into this dispatch.
    pub fn sink(self: &Arc<Self>) -> FrameSink {
        let dispatch = Arc::clone(self);
        Arc::new(move |data: &[u8], width: u32, height: u32| {
            dispatch.on_frame(data, width, height);
        })
    }

    /// Accept frames again for a new scan.
    pub fn rearm(&self) {
        self.delivered.store(false, Ordering::Release);
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }

    /// Number of frames handed to the decoder so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded.load(Ordering::Relaxed)
    }
}
