//! Recognition engine adapter
//!
//! Owns one OCR engine instance per pipeline invocation and walks it through
//! `Unopened -> Opening -> Configured -> Recognizing -> Closed`.
//!
//! # Architecture
//!
//! - `EngineFactory` loads language models, applying init-only parameters
//!   such as the dictionary switches, and hands out an `EngineSession`
//! - `EngineSession` is the raw engine: set parameters, recognize, close
//! - `EngineHandle` enforces the state machine and guarantees the session is
//!   closed exactly once, including on error paths and unwinding (`Drop`)
//! - `TesseractFactory` is the leptess-backed implementation
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut handle = EngineHandle::open(&factory, &settings.languages, &mut reporter)?;
//! handle.configure(&settings)?;
//! let recognition = handle.recognize(image.bytes(), &mut reporter)?;
//! handle.close()?;
//! ```

mod params;
mod tesseract;

pub use params::{user_params, EngineParam, INIT_BATTERY, RUNTIME_BATTERY};
pub use tesseract::TesseractFactory;

use std::fmt;

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::language::LanguageSet;
use crate::progress::{ProgressReporter, Stage};
use crate::settings::OcrSettings;

/// Text and mean confidence as reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecognition {
    pub text: String,
    pub confidence: f32,
}

/// Loads models for a language set and returns a live engine.
pub trait EngineFactory: Send + Sync {
    /// `init_params` must be in effect before models are loaded; the engine
    /// ignores them once open.
    fn open(
        &self,
        languages: &LanguageSet,
        init_params: &[(EngineParam, &str)],
    ) -> Result<Box<dyn EngineSession>>;
}

/// A live engine instance.
pub trait EngineSession: Send {
    fn set_param(&mut self, param: EngineParam, value: &str) -> Result<()>;

    /// Runs recognition, calling `progress` with non-decreasing percentages.
    fn recognize(&mut self, image: &[u8], progress: &mut dyn FnMut(u8)) -> Result<RawRecognition>;

    /// Releases engine resources. Called at most once.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unopened,
    /// Models loaded, not yet configured.
    Opening,
    Configured,
    Recognizing,
    Closed,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Unopened => "unopened",
            EngineState::Opening => "opening",
            EngineState::Configured => "configured",
            EngineState::Recognizing => "recognizing",
            EngineState::Closed => "closed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct EngineHandle {
    session: Option<Box<dyn EngineSession>>,
    state: EngineState,
    languages: Option<LanguageSet>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self {
            session: None,
            state: EngineState::Unopened,
            languages: None,
        }
    }

    /// Creates a handle and opens it.
    pub fn open(
        factory: &dyn EngineFactory,
        languages: &LanguageSet,
        progress: &mut ProgressReporter,
    ) -> Result<Self> {
        let mut handle = Self::new();
        handle.open_with(factory, languages, progress)?;
        Ok(handle)
    }

    /// Loads models for every requested language.
    ///
    /// Codes outside the catalog fail before the factory is consulted. On
    /// failure the handle stays `Unopened`.
    pub fn open_with(
        &mut self,
        factory: &dyn EngineFactory,
        languages: &LanguageSet,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        if self.state != EngineState::Unopened {
            return Err(self.invalid("open"));
        }

        let unknown = languages.unknown_codes();
        if !unknown.is_empty() {
            return Err(PipelineError::EngineInit {
                languages: languages.to_tesseract_string(),
                reason: format!("unsupported language code(s): {}", unknown.join(", ")),
            });
        }

        progress.report(Stage::Initializing, 0);
        self.state = EngineState::Opening;
        match factory.open(languages, INIT_BATTERY) {
            Ok(session) => {
                self.session = Some(session);
                self.languages = Some(languages.clone());
                progress.report(Stage::Initializing, 100);
                debug!(languages = %languages, "Engine opened");
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Unopened;
                Err(match e {
                    PipelineError::EngineInit { .. } => e,
                    other => PipelineError::EngineInit {
                        languages: languages.to_tesseract_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Applies user settings and the runtime half of the accuracy battery.
    ///
    /// A refused user setting fails with `EngineConfig`. Battery parameters
    /// the engine refuses are logged and skipped.
    pub fn configure(&mut self, settings: &OcrSettings) -> Result<()> {
        if self.state != EngineState::Opening && self.state != EngineState::Configured {
            return Err(self.invalid("configure"));
        }
        let filters = settings.char_filters()?;
        let session = self.session_mut("configure")?;

        for (param, value) in user_params(settings.page_segmentation_mode, &filters) {
            session.set_param(param, &value).map_err(|e| match e {
                PipelineError::EngineConfig { .. } | PipelineError::InvalidSettings(_) => e,
                other => PipelineError::EngineConfig {
                    param: param.name(),
                    reason: other.to_string(),
                },
            })?;
        }
        for (param, value) in RUNTIME_BATTERY {
            if let Err(e) = session.set_param(*param, value) {
                warn!(param = param.name(), value, error = %e, "Engine ignored accuracy parameter");
            }
        }

        self.state = EngineState::Configured;
        Ok(())
    }

    /// Runs recognition. Confidence is clamped to `[0, 100]`.
    pub fn recognize(
        &mut self,
        image: &[u8],
        progress: &mut ProgressReporter,
    ) -> Result<RawRecognition> {
        if self.state != EngineState::Configured {
            return Err(self.invalid("recognize"));
        }
        self.state = EngineState::Recognizing;

        progress.report(Stage::Recognizing, 0);
        let session = self.session_mut("recognize")?;
        let outcome = session.recognize(image, &mut |percent: u8| {
            progress.report(Stage::Recognizing, percent)
        });
        self.state = EngineState::Configured;

        let raw = outcome.map_err(|e| match e {
            PipelineError::Recognition(_) => e,
            other => PipelineError::Recognition(other.to_string()),
        })?;
        progress.report(Stage::Recognizing, 100);

        Ok(RawRecognition {
            confidence: normalize_confidence(raw.confidence),
            text: raw.text,
        })
    }

    /// Releases the engine. A second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            EngineState::Unopened => Err(self.invalid("close")),
            EngineState::Closed => Ok(()),
            _ => {
                self.release();
                Ok(())
            }
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn languages(&self) -> Option<&LanguageSet> {
        self.languages.as_ref()
    }

    fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            debug!("Engine closed");
        }
        self.state = EngineState::Closed;
    }

    fn session_mut(&mut self, operation: &'static str) -> Result<&mut Box<dyn EngineSession>> {
        let state = self.state.as_str();
        self.session
            .as_mut()
            .ok_or(PipelineError::InvalidState { operation, state })
    }

    fn invalid(&self, operation: &'static str) -> PipelineError {
        PipelineError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.release();
        }
    }
}

fn normalize_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 100.0)
    }
}
