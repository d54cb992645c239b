use crate::settings::{CharFilters, PageSegMode};

/// Engine parameters the adapter knows how to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineParam {
    PageSegMode,
    CharWhitelist,
    CharBlacklist,
    LoadSystemDawg,
    LoadFreqDawg,
    LoadUnambigDawg,
    LoadPuncDawg,
    LoadNumberDawg,
    LoadBigramDawg,
    ClassifyEnableLearning,
    LanguageModelPenaltyNonDictWord,
    LanguageModelPenaltyNonFreqDictWord,
    SegmentPenaltyDictNonword,
    SegmentPenaltyGarbage,
}

impl EngineParam {
    /// Tesseract's name for the parameter.
    pub fn name(self) -> &'static str {
        match self {
            EngineParam::PageSegMode => "tessedit_pageseg_mode",
            EngineParam::CharWhitelist => "tessedit_char_whitelist",
            EngineParam::CharBlacklist => "tessedit_char_blacklist",
            EngineParam::LoadSystemDawg => "load_system_dawg",
            EngineParam::LoadFreqDawg => "load_freq_dawg",
            EngineParam::LoadUnambigDawg => "load_unambig_dawg",
            EngineParam::LoadPuncDawg => "load_punc_dawg",
            EngineParam::LoadNumberDawg => "load_number_dawg",
            EngineParam::LoadBigramDawg => "load_bigram_dawg",
            EngineParam::ClassifyEnableLearning => "classify_enable_learning",
            EngineParam::LanguageModelPenaltyNonDictWord => "language_model_penalty_non_dict_word",
            EngineParam::LanguageModelPenaltyNonFreqDictWord => {
                "language_model_penalty_non_freq_dict_word"
            }
            EngineParam::SegmentPenaltyDictNonword => "segment_penalty_dict_nonword",
            EngineParam::SegmentPenaltyGarbage => "segment_penalty_garbage",
        }
    }

    /// Whether the engine only honours this parameter while loading models.
    pub fn is_init_only(self) -> bool {
        matches!(
            self,
            EngineParam::LoadSystemDawg
                | EngineParam::LoadFreqDawg
                | EngineParam::LoadUnambigDawg
                | EngineParam::LoadPuncDawg
                | EngineParam::LoadNumberDawg
                | EngineParam::LoadBigramDawg
        )
    }
}

/// Dictionary switches. Tesseract only reads these while loading models, so
/// they are handed to the factory at open time.
pub const INIT_BATTERY: &[(EngineParam, &str)] = &[
    (EngineParam::LoadSystemDawg, "0"),
    (EngineParam::LoadFreqDawg, "0"),
    (EngineParam::LoadUnambigDawg, "0"),
    (EngineParam::LoadPuncDawg, "0"),
    (EngineParam::LoadNumberDawg, "0"),
    (EngineParam::LoadBigramDawg, "0"),
];

/// Classifier and penalty tuning applied after open. Together with
/// [`INIT_BATTERY`] this favours literal character recognition over
/// language-model correction, independent of user settings.
pub const RUNTIME_BATTERY: &[(EngineParam, &str)] = &[
    (EngineParam::ClassifyEnableLearning, "0"),
    (EngineParam::LanguageModelPenaltyNonDictWord, "0.1"),
    (EngineParam::LanguageModelPenaltyNonFreqDictWord, "0.05"),
    (EngineParam::SegmentPenaltyDictNonword, "1.0"),
    (EngineParam::SegmentPenaltyGarbage, "1.25"),
];

/// Parameters derived from user settings. The engine must accept all of them.
pub fn user_params(mode: PageSegMode, filters: &CharFilters) -> Vec<(EngineParam, String)> {
    let mut params = vec![(EngineParam::PageSegMode, mode.tesseract_value().to_string())];
    if let Some(whitelist) = &filters.whitelist {
        params.push((EngineParam::CharWhitelist, whitelist.clone()));
    }
    if let Some(blacklist) = &filters.blacklist {
        params.push((EngineParam::CharBlacklist, blacklist.clone()));
    }
    params
}
