use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported media type: {media_type}")]
    UnsupportedType { media_type: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("Failed to initialize OCR engine for '{languages}': {reason}")]
    EngineInit { languages: String, reason: String },

    #[error("Invalid engine state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("OCR engine rejected {param}: {reason}")]
    EngineConfig { param: &'static str, reason: String },

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("OCR operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("OCR operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Message suitable for showing to the person who uploaded the image.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::UnsupportedType { media_type } => {
                let shown = if media_type.is_empty() {
                    "unknown"
                } else {
                    media_type.as_str()
                };
                format!(
                    "File type {shown} is not supported. Please upload an image file (PNG, JPG, GIF, BMP, TIFF, WebP)."
                )
            }
            PipelineError::InvalidSettings(msg) => format!("Invalid OCR settings: {msg}"),
            PipelineError::Decode(_) | PipelineError::Encode(_) => {
                "The image could not be read. Please try a different file.".to_string()
            }
            PipelineError::EngineInit { languages, .. } => format!(
                "Could not load OCR language data for '{languages}'. Please choose a different language."
            ),
            PipelineError::InvalidState { .. } => {
                "Internal error while running OCR. Please try again.".to_string()
            }
            PipelineError::Recognition(_) => {
                "Failed to extract text from image. Please try with a clearer image.".to_string()
            }
            PipelineError::EngineConfig { param, .. } => format!(
                "The OCR engine did not accept the '{param}' setting. Please adjust the OCR settings."
            ),
            PipelineError::Timeout(limit) => {
                format!("Text extraction took longer than {limit:?} and was stopped.")
            }
            PipelineError::Cancelled => "Text extraction was cancelled.".to_string(),
            PipelineError::Io(e) => format!("Could not save the extracted text: {e}"),
        }
    }

    /// Whether the invocation must end with this error.
    ///
    /// Codec errors are absorbed by falling back to the original image.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Decode(_) | PipelineError::Encode(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_names_offending_type() {
        let err = PipelineError::UnsupportedType {
            media_type: "text/plain".to_string(),
        };
        assert!(err.to_string().contains("text/plain"));
        assert!(err.user_message().contains("text/plain"));
    }

    #[test]
    fn test_unsupported_type_without_type_says_unknown() {
        let err = PipelineError::UnsupportedType {
            media_type: String::new(),
        };
        assert!(err.user_message().contains("unknown"));
    }

    #[test]
    fn test_engine_init_names_languages() {
        let err = PipelineError::EngineInit {
            languages: "eng+xyz".to_string(),
            reason: "missing traineddata".to_string(),
        };
        assert!(err.to_string().contains("eng+xyz"));
        assert!(err.user_message().contains("eng+xyz"));
    }

    #[test]
    fn test_codec_errors_are_not_fatal() {
        assert!(!PipelineError::Decode("bad".into()).is_fatal());
        assert!(!PipelineError::Encode("bad".into()).is_fatal());
        assert!(PipelineError::Recognition("bad".into()).is_fatal());
        assert!(PipelineError::Cancelled.is_fatal());
    }

    #[test]
    fn test_timeout_keeps_sub_second_limits() {
        let err = PipelineError::Timeout(Duration::from_millis(50));
        assert_eq!(err.to_string(), "OCR operation timed out after 50ms");
        assert!(err.user_message().contains("50ms"));
        assert!(PipelineError::Timeout(Duration::from_secs(60))
            .user_message()
            .contains("60s"));
    }

    #[test]
    fn test_engine_config_message_points_at_settings() {
        let err = PipelineError::EngineConfig {
            param: "tessedit_pageseg_mode",
            reason: "value refused".to_string(),
        };
        assert!(err.to_string().contains("tessedit_pageseg_mode"));
        assert!(err.user_message().contains("OCR settings"));
        assert!(!err.user_message().contains("clearer image"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = PipelineError::InvalidState {
            operation: "recognize",
            state: "closed",
        };
        assert_eq!(
            err.to_string(),
            "Invalid engine state: cannot recognize while closed"
        );
    }
}
