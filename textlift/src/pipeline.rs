use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::engine::{EngineFactory, EngineHandle, RawRecognition, TesseractFactory};
use crate::error::{PipelineError, Result};
use crate::media::ImageAsset;
use crate::postprocess::finalize_text;
use crate::preprocess::{ContrastPreprocessor, ImagePreprocessor};
use crate::progress::{ProgressEvent, ProgressReporter, Stage};
use crate::settings::OcrSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub text: String,
    /// Mean engine confidence in `[0, 100]`.
    pub confidence: f32,
    pub elapsed_millis: u64,
    /// Non-fatal notices, such as a preprocessing fallback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Item of [`OcrPipeline::stream`].
#[derive(Debug)]
pub enum PipelineUpdate {
    Progress(ProgressEvent),
    Finished(Result<RecognitionResult>),
}

struct Recognized {
    raw: RawRecognition,
    warnings: Vec<String>,
}

/// Validates input, runs preprocessing and recognition on the blocking pool,
/// and cleans up the text.
///
/// Every call opens its own engine; clones share only the factory and
/// preprocessor.
#[derive(Clone)]
pub struct OcrPipeline {
    engine: Arc<dyn EngineFactory>,
    preprocessor: Arc<dyn ImagePreprocessor>,
    timeout: Option<Duration>,
}

impl OcrPipeline {
    pub fn new(config: &OcrConfig) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self {
            engine: Arc::new(TesseractFactory::new(config.tessdata_path.clone())),
            preprocessor: Arc::new(ContrastPreprocessor::new(config.max_image_dimension)),
            timeout,
        }
    }

    pub fn with_components(
        engine: Arc<dyn EngineFactory>,
        preprocessor: Arc<dyn ImagePreprocessor>,
    ) -> Self {
        Self {
            engine,
            preprocessor,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run<F>(
        &self,
        image: ImageAsset,
        settings: &OcrSettings,
        on_progress: F,
    ) -> Result<RecognitionResult>
    where
        F: FnMut(ProgressEvent),
    {
        self.run_with_cancel(image, settings, CancellationToken::new(), on_progress)
            .await
    }

    /// Like [`run`](Self::run), abandoning the invocation when `cancel` fires.
    ///
    /// Recognition cannot be interrupted; an abandoned engine is closed as
    /// soon as its in-flight call returns.
    pub async fn run_with_cancel<F>(
        &self,
        image: ImageAsset,
        settings: &OcrSettings,
        cancel: CancellationToken,
        mut on_progress: F,
    ) -> Result<RecognitionResult>
    where
        F: FnMut(ProgressEvent),
    {
        let started = Instant::now();

        let media_type = image.media_type()?;
        settings.check()?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        debug!(
            media_type = %media_type,
            bytes = image.bytes().len(),
            languages = %settings.languages,
            psm = %settings.page_segmentation_mode,
            preprocessing = settings.enable_preprocessing,
            "Starting OCR"
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let preprocessor = Arc::clone(&self.preprocessor);
        let task_settings = settings.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut progress = ProgressReporter::new(tx);
            recognize_blocking(
                engine.as_ref(),
                preprocessor.as_ref(),
                image,
                &task_settings,
                &mut progress,
            )
        });

        let work = async {
            while let Some(event) = rx.recv().await {
                on_progress(event);
            }
            match task.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::Recognition(format!("OCR task panicked: {e}"))),
            }
        };

        let outcome = match self.timeout {
            Some(limit) => tokio::select! {
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                result = tokio::time::timeout(limit, work) => match result {
                    Ok(inner) => inner,
                    Err(_) => Err(PipelineError::Timeout(limit)),
                },
            },
            None => tokio::select! {
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                result = work => result,
            },
        };

        let recognized = match outcome {
            Ok(recognized) => recognized,
            Err(e) => {
                warn!(error = %e, "OCR failed");
                return Err(e);
            }
        };
        let elapsed_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let text = finalize_text(&recognized.raw.text);
        on_progress(ProgressEvent::new(Stage::Done, 100));

        info!(
            chars = text.len(),
            confidence = recognized.raw.confidence,
            elapsed_millis,
            "OCR finished"
        );

        Ok(RecognitionResult {
            text,
            confidence: recognized.raw.confidence,
            elapsed_millis,
            warnings: recognized.warnings,
        })
    }

    /// Runs the pipeline as a stream of progress updates ending in one
    /// `Finished` item.
    pub fn stream(
        &self,
        image: ImageAsset,
        settings: OcrSettings,
    ) -> impl Stream<Item = PipelineUpdate> {
        let pipeline = self.clone();
        async_stream::stream! {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let run = pipeline.run(image, &settings, move |event| {
                let _ = tx.send(event);
            });
            tokio::pin!(run);

            loop {
                let update = tokio::select! {
                    biased;
                    Some(event) = rx.recv() => PipelineUpdate::Progress(event),
                    result = &mut run => PipelineUpdate::Finished(result),
                };
                if let PipelineUpdate::Finished(_) = &update {
                    while let Ok(event) = rx.try_recv() {
                        yield PipelineUpdate::Progress(event);
                    }
                    yield update;
                    break;
                }
                yield update;
            }
        }
    }
}

// `initializing` is announced up front so stages stay ordered while the
// engine itself is only opened once the image is ready. The handle is closed
// explicitly on the normal path and by `Drop` on unwinding.
fn recognize_blocking(
    engine: &dyn EngineFactory,
    preprocessor: &dyn ImagePreprocessor,
    image: ImageAsset,
    settings: &OcrSettings,
    progress: &mut ProgressReporter,
) -> Result<Recognized> {
    progress.report(Stage::Initializing, 0);
    let mut warnings = Vec::new();

    let image = if settings.enable_preprocessing {
        progress.report(Stage::Preprocessing, 0);
        match preprocessor.preprocess(&image, settings.contrast_boost) {
            Ok(processed) => {
                progress.report(Stage::Preprocessing, 100);
                processed
            }
            Err(e) => {
                warn!(error = %e, "Preprocessing failed, using original image");
                warnings.push(format!("Preprocessing failed, using the original image: {e}"));
                image
            }
        }
    } else {
        image
    };

    let mut handle = EngineHandle::open(engine, &settings.languages, progress)?;
    let outcome = handle
        .configure(settings)
        .and_then(|_| handle.recognize(image.bytes(), progress));
    handle.close()?;

    Ok(Recognized {
        raw: outcome?,
        warnings,
    })
}
