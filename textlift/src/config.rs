use std::env;

use crate::language::LanguageSet;
use crate::settings::{OcrSettings, PageSegMode};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) if !val.is_empty() => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrConfig,
}

/// Process-wide OCR defaults. Per-call settings start from these.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub languages: LanguageSet,
    pub page_segmentation_mode: PageSegMode,
    pub enable_preprocessing: bool,
    pub contrast_boost: f32,
    pub whitelist_chars: String,
    pub blacklist_chars: String,
    /// Tessdata directory; `None` lets Tesseract search its default locations.
    pub tessdata_path: Option<String>,
    /// Whole-run timeout. Zero disables it.
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: LanguageSet::default(),
            page_segmentation_mode: PageSegMode::default(),
            enable_preprocessing: true,
            contrast_boost: 1.0,
            whitelist_chars: String::new(),
            blacklist_chars: String::new(),
            tessdata_path: None,
            timeout_secs: 60,
            max_image_dimension: 4096,
        }
    }
}

impl OcrConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            languages: parse_env_or("OCR_LANGUAGES", defaults.languages),
            page_segmentation_mode: parse_env_or(
                "OCR_PAGE_SEG_MODE",
                defaults.page_segmentation_mode,
            ),
            enable_preprocessing: parse_env_or("OCR_PREPROCESS", defaults.enable_preprocessing),
            contrast_boost: parse_env_or("OCR_CONTRAST_BOOST", defaults.contrast_boost),
            whitelist_chars: env::var("OCR_WHITELIST").unwrap_or_default(),
            blacklist_chars: env::var("OCR_BLACKLIST").unwrap_or_default(),
            tessdata_path: parse_env_opt("OCR_TESSDATA_PATH"),
            timeout_secs: parse_env_or("OCR_TIMEOUT", defaults.timeout_secs),
            max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", defaults.max_image_dimension),
        }
    }

    /// Settings used when a caller supplies none.
    pub fn default_settings(&self) -> OcrSettings {
        OcrSettings {
            languages: self.languages.clone(),
            page_segmentation_mode: self.page_segmentation_mode,
            enable_preprocessing: self.enable_preprocessing,
            contrast_boost: self.contrast_boost,
            blacklist_chars: self.blacklist_chars.clone(),
            whitelist_chars: self.whitelist_chars.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::from_env(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn default_settings(&self) -> OcrSettings {
        self.ocr.default_settings()
    }
}
