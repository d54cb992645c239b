use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{PipelineError, Result};
use crate::language::LanguageSet;

pub const MIN_CONTRAST_BOOST: f32 = 0.5;
pub const MAX_CONTRAST_BOOST: f32 = 3.0;

/// Layout assumption handed to the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation, no orientation detection.
    #[default]
    Auto,
    /// A single uniform block of text.
    SingleBlock,
    /// A single column of text of variable sizes.
    SingleColumn,
    SingleWord,
    SingleLine,
    SingleChar,
    /// As much text as possible in no particular order.
    SparseText,
    /// Sparse text with orientation and script detection.
    SparseTextOsd,
}

impl PageSegMode {
    pub const ALL: [PageSegMode; 8] = [
        PageSegMode::Auto,
        PageSegMode::SingleBlock,
        PageSegMode::SingleColumn,
        PageSegMode::SingleWord,
        PageSegMode::SingleLine,
        PageSegMode::SingleChar,
        PageSegMode::SparseText,
        PageSegMode::SparseTextOsd,
    ];

    /// Tesseract's numeric `tessedit_pageseg_mode` value.
    pub fn tesseract_value(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleColumn => 4,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SingleWord => 8,
            PageSegMode::SingleChar => 10,
            PageSegMode::SparseText => 11,
            PageSegMode::SparseTextOsd => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSegMode::Auto => "auto",
            PageSegMode::SingleBlock => "single-block",
            PageSegMode::SingleColumn => "single-column",
            PageSegMode::SingleWord => "single-word",
            PageSegMode::SingleLine => "single-line",
            PageSegMode::SingleChar => "single-char",
            PageSegMode::SparseText => "sparse-text",
            PageSegMode::SparseTextOsd => "sparse-text-osd",
        }
    }
}

impl fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageSegMode {
    type Err = PipelineError;

    /// Accepts the kebab-case name, its snake_case spelling, or the Tesseract number.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        PageSegMode::ALL
            .into_iter()
            .find(|mode| {
                mode.as_str() == normalized || mode.tesseract_value().to_string() == normalized
            })
            .ok_or_else(|| {
                PipelineError::InvalidSettings(format!("unknown page segmentation mode '{s}'"))
            })
    }
}

/// Per-invocation recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrSettings {
    pub languages: LanguageSet,
    pub page_segmentation_mode: PageSegMode,
    pub enable_preprocessing: bool,
    #[validate(range(min = 0.5, max = 3.0))]
    pub contrast_boost: f32,
    /// Characters never emitted. Wins over `whitelist_chars`.
    pub blacklist_chars: String,
    /// If non-empty, the only characters the engine may emit.
    pub whitelist_chars: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            languages: LanguageSet::default(),
            page_segmentation_mode: PageSegMode::default(),
            enable_preprocessing: true,
            contrast_boost: 1.0,
            blacklist_chars: String::new(),
            whitelist_chars: String::new(),
        }
    }
}

/// Character filters after applying blacklist precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharFilters {
    pub whitelist: Option<String>,
    pub blacklist: Option<String>,
}

impl OcrSettings {
    /// Checks every field against its domain.
    pub fn check(&self) -> Result<()> {
        if !self.contrast_boost.is_finite() {
            return Err(PipelineError::InvalidSettings(
                "contrast boost must be a finite number".to_string(),
            ));
        }
        self.validate().map_err(|e| {
            PipelineError::InvalidSettings(format!(
                "contrast boost must be between {MIN_CONTRAST_BOOST} and {MAX_CONTRAST_BOOST}: {e}"
            ))
        })?;
        if self.languages.is_empty() {
            return Err(PipelineError::InvalidSettings(
                "at least one language must be selected".to_string(),
            ));
        }
        self.char_filters().map(|_| ())
    }

    /// Resolves whitelist/blacklist so that blacklisted characters are removed
    /// from the whitelist. Duplicates are dropped, first occurrence kept.
    pub fn char_filters(&self) -> Result<CharFilters> {
        let blacklist = dedup_chars(&self.blacklist_chars, |_| true);
        let whitelist = dedup_chars(&self.whitelist_chars, |c| !blacklist.contains(c));

        if !self.whitelist_chars.is_empty() && whitelist.is_empty() {
            return Err(PipelineError::InvalidSettings(
                "every whitelisted character is also blacklisted".to_string(),
            ));
        }

        Ok(CharFilters {
            whitelist: (!whitelist.is_empty()).then_some(whitelist),
            blacklist: (!blacklist.is_empty()).then_some(blacklist),
        })
    }
}

fn dedup_chars(input: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    for c in input.chars() {
        if keep(c) && !out.contains(c) {
            out.push(c);
        }
    }
    out
}
