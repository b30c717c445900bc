//! # Prompt Template Registry
//!
//! Static per-language instruction templates for the summarization and quiz
//! stages, each written natively in the language it targets. The wording of
//! these templates is part of the product: a Turkish summary request is
//! phrased in Turkish, an Arabic one in Arabic, and so on.
//!
//! ## Template Contract:
//! - Every supported language has exactly one summary template and one quiz
//!   template.
//! - Every template contains exactly one `{text}` substitution point.
//! - `validate_templates()` enforces both rules at startup so a bad edit to
//!   this file fails fast instead of producing broken prompts at request time.

use crate::error::AppError;
use crate::language::{Language, SUPPORTED_LANGUAGES};

/// The substitution marker each template must contain exactly once.
pub const PLACEHOLDER: &str = "{text}";

/// Summarization instruction for the given output language.
pub fn summary_template(language: Language) -> &'static str {
    match language {
        Language::Turkish => {
            "Lütfen aşağıdaki metni açık ve öz bir şekilde özetle:\n\n{text}"
        }
        Language::Arabic => {
            "يرجى تلخيص النص التالي بطريقة واضحة وموجزة:\n\n{text}"
        }
        Language::Kurdish => {
            "Ji kerema xwe nivîsa jêr bi awayekê zelal û kurt re kurt bike:\n\n{text}"
        }
        Language::Japanese => "以下の文章を簡潔に要約してください：\n\n{text}",
        Language::English => {
            "Please summarize the following text clearly and briefly:\n\n{text}"
        }
    }
}

/// Quiz-generation instruction for the given output language.
///
/// Each template asks for exactly 2 multiple-choice questions with 4 options
/// apiece. The returned quiz is free-form text; nothing downstream parses it.
pub fn quiz_template(language: Language) -> &'static str {
    match language {
        Language::Turkish => {
            "Aşağıdaki özetten yola çıkarak 2 adet çoktan seçmeli soru üret (her biri 4 şıklı):\n\n{text}"
        }
        Language::Arabic => {
            "استنادًا إلى الملخص التالي، أنشئ سؤالين من نوع الاختيار من متعدد (لكل منهما 4 خيارات):\n\n{text}"
        }
        Language::Kurdish => {
            "Ji bo vê kurtkirinê, 2 pirsyarên bijartinê (her yek bi 4 vebijêrk) binivîse. Her pirsyar divê bi awayekê zelal were nivîsîn û vebijêrkên wê bi (a), (b), (c), (d) were nîşandan. Vebijêrkên rast û çewt li hev biguherînin.\nEv kurtkirinê:\n{text}"
        }
        Language::Japanese => {
            "以下の要約に基づいて、4つの選択肢を持つ選択式の質問を2つ作成してください：\n\n{text}"
        }
        Language::English => {
            "Based on the following summary, generate 2 multiple choice questions (each with 4 options):\n\n{text}"
        }
    }
}

/// Build the translation instruction for arbitrary text.
///
/// Unlike the summary/quiz templates this one is always phrased in English:
/// it names the target language rather than being written in it.
pub fn translation_prompt(text: &str, target: Language) -> String {
    format!(
        "Translate the following text into {}:\n\n{}",
        target.name(),
        text
    )
}

/// Substitute the subject text into a template.
pub fn render(template: &str, text: &str) -> String {
    template.replace(PLACEHOLDER, text)
}

/// Verify the registry is complete and well-formed.
///
/// Called once at startup. Checks that every supported language has a
/// non-empty summary and quiz template, and that each template carries
/// exactly one `{text}` placeholder.
pub fn validate_templates() -> Result<(), AppError> {
    for language in SUPPORTED_LANGUAGES {
        for (kind, template) in [
            ("summary", summary_template(language)),
            ("quiz", quiz_template(language)),
        ] {
            if template.trim().is_empty() {
                return Err(AppError::ConfigError(format!(
                    "Empty {} template for {}",
                    kind, language
                )));
            }

            let placeholders = template.matches(PLACEHOLDER).count();
            if placeholders != 1 {
                return Err(AppError::ConfigError(format!(
                    "{} template for {} has {} '{}' placeholders, expected exactly 1",
                    kind, language, placeholders, PLACEHOLDER
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_complete() {
        assert!(validate_templates().is_ok());
    }

    #[test]
    fn test_every_template_has_one_placeholder() {
        for language in SUPPORTED_LANGUAGES {
            assert_eq!(summary_template(language).matches(PLACEHOLDER).count(), 1);
            assert_eq!(quiz_template(language).matches(PLACEHOLDER).count(), 1);
        }
    }

    #[test]
    fn test_render_substitutes_fully() {
        for language in SUPPORTED_LANGUAGES {
            let rendered = render(summary_template(language), "subject text");
            assert!(rendered.contains("subject text"));
            assert!(!rendered.contains(PLACEHOLDER));
        }
    }

    #[test]
    fn test_translation_prompt_names_target_language() {
        let prompt = translation_prompt("Hello world", Language::Turkish);
        assert!(prompt.contains("Turkish"));
        assert!(prompt.contains("Hello world"));
    }
}
