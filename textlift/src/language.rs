use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Languages with Tesseract traineddata we offer, as (code, display name).
pub const LANGUAGE_CATALOG: &[(&str, &str)] = &[
    ("eng", "English"),
    ("spa", "Spanish"),
    ("fra", "French"),
    ("deu", "German"),
    ("ita", "Italian"),
    ("por", "Portuguese"),
    ("nld", "Dutch"),
    ("rus", "Russian"),
    ("ukr", "Ukrainian"),
    ("pol", "Polish"),
    ("ces", "Czech"),
    ("swe", "Swedish"),
    ("dan", "Danish"),
    ("nor", "Norwegian"),
    ("fin", "Finnish"),
    ("ell", "Greek"),
    ("tur", "Turkish"),
    ("ara", "Arabic"),
    ("heb", "Hebrew"),
    ("hin", "Hindi"),
    ("tha", "Thai"),
    ("vie", "Vietnamese"),
    ("ind", "Indonesian"),
    ("chi_sim", "Chinese (Simplified)"),
    ("chi_tra", "Chinese (Traditional)"),
    ("jpn", "Japanese"),
    ("kor", "Korean"),
];

/// Composite selecting the five most commonly used Latin-script languages.
pub const RECOMMENDED_PRESET: &str = "recommended";
/// Composite selecting every language in the catalog.
pub const ALL_PRESET: &str = "all";

const RECOMMENDED_LANGUAGES: &[&str] = &["eng", "spa", "fra", "deu", "ita"];

pub fn is_known_language(code: &str) -> bool {
    LANGUAGE_CATALOG.iter().any(|(c, _)| *c == code)
}

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGE_CATALOG
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Ordered, de-duplicated, non-empty set of language codes.
///
/// Parses `"eng"`, `"eng+fra"`, and the `recommended` / `all` composites.
/// Unknown codes are kept so the engine can report them with the rest of the
/// selection; see [`LanguageSet::unknown_codes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageSet(Vec<String>);

impl LanguageSet {
    pub fn new<I, S>(codes: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim();
            if code.is_empty() {
                continue;
            }
            let expanded: Vec<&str> = match code {
                RECOMMENDED_PRESET => RECOMMENDED_LANGUAGES.to_vec(),
                ALL_PRESET => LANGUAGE_CATALOG.iter().map(|(c, _)| *c).collect(),
                other => vec![other],
            };
            for c in expanded {
                if !out.iter().any(|existing| existing == c) {
                    out.push(c.to_string());
                }
            }
        }

        if out.is_empty() {
            return Err(PipelineError::InvalidSettings(
                "at least one language must be selected".to_string(),
            ));
        }
        Ok(Self(out))
    }

    pub fn recommended() -> Self {
        Self(RECOMMENDED_LANGUAGES.iter().map(|c| c.to_string()).collect())
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn unknown_codes(&self) -> Vec<&str> {
        self.0
            .iter()
            .map(String::as_str)
            .filter(|c| !is_known_language(c))
            .collect()
    }

    /// The `+`-joined form Tesseract expects.
    pub fn to_tesseract_string(&self) -> String {
        self.0.join("+")
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self(vec!["eng".to_string()])
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tesseract_string())
    }
}

impl FromStr for LanguageSet {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split(['+', ',']))
    }
}

impl TryFrom<String> for LanguageSet {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageSet> for String {
    fn from(value: LanguageSet) -> Self {
        value.to_tesseract_string()
    }
}
