//! # Supported Languages and Detection
//!
//! This module defines the fixed set of output languages the pipeline can
//! produce, and wraps the whatlang language-identification library so the
//! rest of the code only ever deals with two-letter codes.
//!
//! ## Key Rust Concepts Used:
//! - **enum with unit variants**: A closed set of values checked at compile time
//! - **FromStr / Display**: Parsing and formatting the enum from/to its name
//! - **match**: Exhaustive handling of every supported language
//!
//! ## Why two-letter codes:
//! The summarization stage compares "what language is this text in?" against
//! "what language did the user ask for?". Both sides of that comparison use
//! ISO 639-1 two-letter codes, so the comparison is a plain string equality.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// The five output languages supported by the summarization and quiz stages.
///
/// ## Serialization:
/// Serialized by English name ("Turkish", "Arabic", ...) because that is the
/// value the UI dropdown sends and the value the prompt templates are keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Turkish,
    Arabic,
    Kurdish,
    Japanese,
    English,
}

/// All supported languages in dropdown order (Turkish is the UI default).
pub const SUPPORTED_LANGUAGES: [Language; 5] = [
    Language::Turkish,
    Language::Arabic,
    Language::Kurdish,
    Language::Japanese,
    Language::English,
];

impl Language {
    /// The registered ISO 639-1 two-letter code for this language.
    ///
    /// This is the code the summarization stage compares against the
    /// detected code of the source text to decide whether translation
    /// is needed.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Turkish => "tr",
            Language::Arabic => "ar",
            Language::Kurdish => "ku",
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }

    /// The English name of this language, used in translation prompts
    /// and as the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Turkish => "Turkish",
            Language::Arabic => "Arabic",
            Language::Kurdish => "Kurdish",
            Language::Japanese => "Japanese",
            Language::English => "English",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Turkish
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Language {
    type Err = AppError;

    /// Parse a language from its English name or two-letter code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "turkish" | "tr" => Ok(Language::Turkish),
            "arabic" | "ar" => Ok(Language::Arabic),
            "kurdish" | "ku" => Ok(Language::Kurdish),
            "japanese" | "ja" => Ok(Language::Japanese),
            "english" | "en" => Ok(Language::English),
            _ => Err(AppError::ValidationError(format!(
                "Unsupported language: {}",
                s
            ))),
        }
    }
}

/// Detect the dominant language of a piece of text as a two-letter code.
///
/// ## How it works:
/// whatlang classifies the text and reports an ISO 639-3 (three-letter)
/// language. We fold that down to the ISO 639-1 two-letter code for the
/// languages whatlang commonly detects; anything without a two-letter
/// mapping keeps its three-letter code, which by construction never equals
/// any registered target code and therefore always triggers translation.
///
/// ## Failure:
/// Very short or degenerate text gives the classifier nothing to work with.
/// That surfaces as a `ValidationError` to the caller; there is no retry or
/// fallback guess.
///
/// ## Note on Kurdish:
/// whatlang cannot detect Kurdish, so Kurdish source text is always routed
/// through translation.
pub fn detect_code(text: &str) -> Result<String, AppError> {
    let info = whatlang::detect(text).ok_or_else(|| {
        AppError::ValidationError(
            "Could not detect the language of the provided text".to_string(),
        )
    })?;

    Ok(two_letter_code(info.lang()).to_string())
}

/// Map a whatlang language to its ISO 639-1 code where one exists.
///
/// whatlang covers far more languages than the five this service outputs;
/// the mapping below covers the detectable targets plus the languages most
/// likely to show up in uploaded audio. Everything else falls back to the
/// ISO 639-3 code whatlang reports.
fn two_letter_code(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;
    match lang {
        Lang::Eng => "en",
        Lang::Tur => "tr",
        Lang::Ara => "ar",
        Lang::Jpn => "ja",
        Lang::Deu => "de",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Nld => "nl",
        Lang::Pol => "pl",
        Lang::Swe => "sv",
        Lang::Fin => "fi",
        Lang::Dan => "da",
        Lang::Ces => "cs",
        Lang::Hun => "hu",
        Lang::Ron => "ro",
        Lang::Bul => "bg",
        Lang::Ell => "el",
        Lang::Heb => "he",
        Lang::Hin => "hi",
        Lang::Urd => "ur",
        Lang::Pes => "fa",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        Lang::Tha => "th",
        Lang::Vie => "vi",
        Lang::Ind => "id",
        Lang::Aze => "az",
        Lang::Uzb => "uz",
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::Turkish.code(), "tr");
        assert_eq!(Language::Arabic.code(), "ar");
        assert_eq!(Language::Kurdish.code(), "ku");
        assert_eq!(Language::Japanese.code(), "ja");
        assert_eq!(Language::English.code(), "en");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!(Language::from_str("Turkish").unwrap(), Language::Turkish);
        assert_eq!(Language::from_str("english").unwrap(), Language::English);
        assert_eq!(Language::from_str("ja").unwrap(), Language::Japanese);
        assert!(Language::from_str("klingon").is_err());
    }

    #[test]
    fn test_default_language_is_turkish() {
        assert_eq!(Language::default(), Language::Turkish);
    }

    #[test]
    fn test_detect_english_text() {
        let code = detect_code(
            "The quick brown fox jumps over the lazy dog, and the dog does not mind at all.",
        )
        .unwrap();
        assert_eq!(code, "en");
    }

    #[test]
    fn test_detect_turkish_text() {
        let code = detect_code(
            "Bugün hava çok güzel ve parkta yürüyüş yapmak istiyorum, belki arkadaşlarım da gelir.",
        )
        .unwrap();
        assert_eq!(code, "tr");
    }

    #[test]
    fn test_detect_empty_text_fails() {
        assert!(detect_code("").is_err());
    }

    #[test]
    fn test_serde_round_trip_uses_names() {
        let json = serde_json::to_string(&Language::Kurdish).unwrap();
        assert_eq!(json, "\"Kurdish\"");
        let parsed: Language = serde_json::from_str("\"Japanese\"").unwrap();
        assert_eq!(parsed, Language::Japanese);
    }
}
