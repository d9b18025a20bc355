//! Common test utilities for integration tests.

#![allow(dead_code)]

use scancam_core::{PreviewSize, Symbol, SymbolType};
use scancam_hardware::AnyCameraBackend;
use scancam_hardware::mock::{MockCameraBackend, MockCameraControl};
use scancam_scanner::{Decoder, DecoderConfig, ScannerConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with a short autofocus interval so tests do not wait on it.
pub fn fast_config() -> ScannerConfig {
    ScannerConfig::default().with_autofocus_interval(Duration::from_millis(10))
}

pub fn mock_backend() -> (AnyCameraBackend, MockCameraControl) {
    let (backend, control) = MockCameraBackend::new();
    (AnyCameraBackend::Mock(backend), control)
}

/// What a [`ScriptedDecoder`] saw.
#[derive(Debug, Default)]
pub struct DecoderLog {
    /// First byte and dimensions of every decoded frame, in order.
    pub frames: Vec<(u8, u32, u32)>,
    pub config: Option<DecoderConfig>,
}

impl DecoderLog {
    pub fn calls(&self) -> usize {
        self.frames.len()
    }
}

/// Decoder returning a scripted symbol list per call; empty once the script
/// runs out.
pub struct ScriptedDecoder {
    script: VecDeque<Vec<Symbol>>,
    log: Arc<Mutex<DecoderLog>>,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<Vec<Symbol>>) -> (Self, Arc<Mutex<DecoderLog>>) {
        let log = Arc::new(Mutex::new(DecoderLog::default()));
        let decoder = Self {
            script: script.into(),
            log: Arc::clone(&log),
        };
        (decoder, log)
    }

    /// Always finds `data` as a QR code.
    pub fn always(data: &str) -> (Self, Arc<Mutex<DecoderLog>>) {
        let (mut decoder, log) = Self::new(Vec::new());
        decoder.script = std::iter::repeat_n(vec![Symbol::new(data, SymbolType::QrCode)], 1024).collect();
        (decoder, log)
    }
}

impl Decoder for ScriptedDecoder {
    fn configure(&mut self, config: &DecoderConfig) {
        self.log.lock().unwrap().config = Some(config.clone());
    }

    fn decode(&mut self, data: &[u8], width: u32, height: u32) -> Vec<Symbol> {
        self.log
            .lock()
            .unwrap()
            .frames
            .push((data.first().copied().unwrap_or(0), width, height));
        self.script.pop_front().unwrap_or_default()
    }
}

/// A luminance frame of `size` filled with `fill`.
pub fn frame(size: PreviewSize, fill: u8) -> Vec<u8> {
    vec![fill; size.pixel_count()]
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}
