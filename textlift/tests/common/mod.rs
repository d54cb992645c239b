// Common test utilities for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use textlift::engine::{EngineFactory, EngineParam, EngineSession, RawRecognition};
use textlift::language::LanguageSet;
use textlift::preprocess::ImagePreprocessor;
use textlift::{ImageAsset, PipelineError, Result};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub recognitions: AtomicUsize,
    /// Init parameter names passed to the most recent `open`.
    pub init_params: Mutex<Vec<&'static str>>,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn recognitions(&self) -> usize {
        self.recognitions.load(Ordering::SeqCst)
    }

    pub fn init_params(&self) -> Vec<&'static str> {
        self.init_params.lock().unwrap().clone()
    }
}

/// Where a [`FakeEngine`] should fail, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailAt {
    #[default]
    Nowhere,
    Open,
    Configure,
    Recognize,
}

/// Engine factory that counts lifecycle calls and returns canned text.
pub struct FakeEngine {
    pub counters: Arc<Counters>,
    pub text: String,
    pub confidence: f32,
    pub fail_at: FailAt,
    /// Sleep inside recognition, to exercise timeout and cancellation.
    pub delay: Option<Duration>,
}

impl FakeEngine {
    pub fn returning(text: &str) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            text: text.to_string(),
            confidence: 87.5,
            fail_at: FailAt::Nowhere,
            delay: None,
        }
    }

    pub fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            ..Self::returning("unused")
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning("slow")
        }
    }
}

struct FakeSession {
    counters: Arc<Counters>,
    text: String,
    confidence: f32,
    fail_at: FailAt,
    delay: Option<Duration>,
}

impl EngineFactory for FakeEngine {
    fn open(
        &self,
        _languages: &LanguageSet,
        init_params: &[(EngineParam, &str)],
    ) -> Result<Box<dyn EngineSession>> {
        *self.counters.init_params.lock().unwrap() =
            init_params.iter().map(|(param, _)| param.name()).collect();
        if self.fail_at == FailAt::Open {
            return Err(PipelineError::Recognition(
                "traineddata not found".to_string(),
            ));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            counters: Arc::clone(&self.counters),
            text: self.text.clone(),
            confidence: self.confidence,
            fail_at: self.fail_at,
            delay: self.delay,
        }))
    }
}

impl EngineSession for FakeSession {
    fn set_param(&mut self, param: EngineParam, _value: &str) -> Result<()> {
        if self.fail_at == FailAt::Configure && param == EngineParam::PageSegMode {
            return Err(PipelineError::EngineConfig {
                param: param.name(),
                reason: "value out of range".to_string(),
            });
        }
        Ok(())
    }

    fn recognize(&mut self, _image: &[u8], progress: &mut dyn FnMut(u8)) -> Result<RawRecognition> {
        self.counters.recognitions.fetch_add(1, Ordering::SeqCst);
        progress(25);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_at == FailAt::Recognize {
            return Err(PipelineError::Recognition("engine crashed".to_string()));
        }
        progress(75);
        Ok(RawRecognition {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }

    fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Preprocessor that counts calls and either passes the image through or fails.
#[derive(Default)]
pub struct CountingPreprocessor {
    pub calls: AtomicUsize,
    pub fail: bool,
    /// Engine counters to sample on each call.
    pub engine: Option<Arc<Counters>>,
    /// Engine opens seen at the time of each call.
    pub opens_seen: Mutex<Vec<usize>>,
}

impl CountingPreprocessor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Records how many engines `counters` had opened whenever it runs.
    pub fn watching(counters: Arc<Counters>) -> Self {
        Self {
            engine: Some(counters),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn opens_seen(&self) -> Vec<usize> {
        self.opens_seen.lock().unwrap().clone()
    }
}

impl ImagePreprocessor for CountingPreprocessor {
    fn preprocess(&self, image: &ImageAsset, _contrast_boost: f32) -> Result<ImageAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(counters) = &self.engine {
            self.opens_seen.lock().unwrap().push(counters.opens());
        }
        if self.fail {
            return Err(PipelineError::Decode("corrupt image data".to_string()));
        }
        Ok(image.clone())
    }
}

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

// 5x7 bitmaps, one row per byte, high bit on the left.
fn glyph(c: char) -> [u8; 7] {
    match c {
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        _ => [0; 7],
    }
}

/// Renders uppercase `text` as black block letters on white, encoded as PNG.
pub fn render_text_png(text: &str, scale: u32) -> Vec<u8> {
    let margin = 4 * scale;
    let advance = (GLYPH_WIDTH + 1) * scale;
    let count = text.chars().count() as u32;
    let width = margin * 2 + advance * count;
    let height = margin * 2 + GLYPH_HEIGHT * scale;

    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (i, c) in text.chars().enumerate() {
        let origin_x = margin + advance * i as u32;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = origin_x + col * scale + dx;
                        let y = margin + row as u32 * scale + dy;
                        img.put_pixel(x, y, Rgb([0, 0, 0]));
                    }
                }
            }
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    buffer.into_inner()
}

pub fn png_asset(text: &str) -> ImageAsset {
    ImageAsset::new(render_text_png(text, 4), "image/png").with_name("hello.png")
}
