use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete preview size as advertised by the camera (width x height).
///
/// Hardware reports sizes in the sensor's native landscape orientation, so
/// `width` is normally the larger dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl PreviewSize {
    /// Create a new preview size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The same size with width and height exchanged.
    #[must_use]
    pub const fn swapped(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Number of pixels in one luminance plane of this size.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether either dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for PreviewSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::InvalidSize(format!("expected WIDTHxHEIGHT, got {s}")))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| Error::InvalidSize(format!("invalid width in {s}")))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| Error::InvalidSize(format!("invalid height in {s}")))?;
        Ok(Self::new(width, height))
    }
}

/// Which way the camera sensor faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Rear camera.
    Back,

    /// Selfie camera; its preview is mirrored.
    Front,

    /// Externally attached camera. Treated like a rear camera.
    External,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Facing::Back => write!(f, "back"),
            Facing::Front => write!(f, "front"),
            Facing::External => write!(f, "external"),
        }
    }
}

/// Lifecycle of the display surface the preview is drawn into.
///
/// Only the display-surface callbacks change this value; the coordinator reads
/// it to decide whether a preview may be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    /// No surface has been created yet.
    #[default]
    NotCreated,

    /// The surface exists and can be bound as the preview target.
    Created,

    /// The surface was torn down by the compositor.
    Destroyed,
}

impl SurfaceState {
    /// Whether a preview may currently be drawn into the surface.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, SurfaceState::Created)
    }
}

impl fmt::Display for SurfaceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SurfaceState::NotCreated => "NotCreated",
            SurfaceState::Created => "Created",
            SurfaceState::Destroyed => "Destroyed",
        };
        write!(f, "{s}")
    }
}

/// Barcode symbology reported by the decoder.
///
/// Codes match the integer identifiers of the decoding library, so values can
/// be passed through the scanner configuration unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SymbolType {
    None,
    Partial,
    Ean8,
    UpcE,
    Isbn10,
    UpcA,
    Ean13,
    Isbn13,
    I25,
    Databar,
    DatabarExp,
    Codabar,
    Code39,
    Pdf417,
    QrCode,
    Code93,
    Code128,
    /// Any code the decoder reports that is not listed above.
    Unknown(i32),
}

impl SymbolType {
    /// Map a raw decoder code to a symbol type.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Partial,
            8 => Self::Ean8,
            9 => Self::UpcE,
            10 => Self::Isbn10,
            12 => Self::UpcA,
            13 => Self::Ean13,
            14 => Self::Isbn13,
            25 => Self::I25,
            34 => Self::Databar,
            35 => Self::DatabarExp,
            38 => Self::Codabar,
            39 => Self::Code39,
            57 => Self::Pdf417,
            64 => Self::QrCode,
            93 => Self::Code93,
            128 => Self::Code128,
            other => Self::Unknown(other),
        }
    }

    /// The raw decoder code.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Partial => 1,
            Self::Ean8 => 8,
            Self::UpcE => 9,
            Self::Isbn10 => 10,
            Self::UpcA => 12,
            Self::Ean13 => 13,
            Self::Isbn13 => 14,
            Self::I25 => 25,
            Self::Databar => 34,
            Self::DatabarExp => 35,
            Self::Codabar => 38,
            Self::Code39 => 39,
            Self::Pdf417 => 57,
            Self::QrCode => 64,
            Self::Code93 => 93,
            Self::Code128 => 128,
            Self::Unknown(code) => *code,
        }
    }

    /// Human readable symbology name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Partial => "PARTIAL",
            Self::Ean8 => "EAN-8",
            Self::UpcE => "UPC-E",
            Self::Isbn10 => "ISBN-10",
            Self::UpcA => "UPC-A",
            Self::Ean13 => "EAN-13",
            Self::Isbn13 => "ISBN-13",
            Self::I25 => "I2/5",
            Self::Databar => "DataBar",
            Self::DatabarExp => "DataBar-Exp",
            Self::Codabar => "Codabar",
            Self::Code39 => "CODE-39",
            Self::Pdf417 => "PDF417",
            Self::QrCode => "QR-Code",
            Self::Code93 => "CODE-93",
            Self::Code128 => "CODE-128",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<i32> for SymbolType {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<SymbolType> for i32 {
    fn from(symbol: SymbolType) -> Self {
        symbol.code()
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One candidate symbol returned by the decoder for a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub data: String,
    pub symbol_type: SymbolType,
}

impl Symbol {
    pub fn new(data: impl Into<String>, symbol_type: impl Into<SymbolType>) -> Self {
        Self {
            data: data.into(),
            symbol_type: symbol_type.into(),
        }
    }
}

/// The single result of a scan session.
///
/// Produced at most once per session by frame dispatch and handed to the
/// result listener by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
    /// Decoded symbol payload.
    pub data: String,

    /// Symbology of the decoded symbol.
    pub symbol_type: SymbolType,

    /// When the frame carrying the symbol was decoded.
    pub decoded_at: DateTime<Utc>,
}

impl DecodeResult {
    /// Create a result stamped with the current time.
    pub fn new(data: impl Into<String>, symbol_type: SymbolType) -> Self {
        Self {
            data: data.into(),
            symbol_type,
            decoded_at: Utc::now(),
        }
    }
}

impl From<Symbol> for DecodeResult {
    fn from(symbol: Symbol) -> Self {
        Self::new(symbol.data, symbol.symbol_type)
    }
}
