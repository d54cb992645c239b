//! Single-image OCR: optional contrast preprocessing, a Tesseract engine
//! opened and closed per invocation, ordered progress events, and cleanup of
//! common character confusions in the recognized text.
//!
//! ```rust,ignore
//! let pipeline = OcrPipeline::new(&config.ocr);
//! let image = ImageAsset::new(bytes, "image/png");
//! let result = pipeline.run(image, &OcrSettings::default(), |event| {
//!     tracing::info!(stage = %event.stage.label(), percent = event.percent, "progress");
//! }).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod language;
pub mod media;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod progress;
pub mod settings;

pub use config::{Config, OcrConfig};
pub use error::{PipelineError, Result};
pub use export::{extracted_file_name, write_extracted};
pub use language::LanguageSet;
pub use media::{ImageAsset, MediaType};
pub use pipeline::{OcrPipeline, PipelineUpdate, RecognitionResult};
pub use progress::{ProgressEvent, Stage};
pub use settings::{OcrSettings, PageSegMode};
