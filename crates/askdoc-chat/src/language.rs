//! Language detection and translation
//!
//! Questions can arrive in any language while the indexed content is in one
//! target language (English by default). The normalizer detects the
//! question's language with a confidence-scored classifier chain, translates
//! non-target questions before retrieval, and translates the final answer
//! back. Translation is best-effort: if the translation capability is down
//! the pipeline answers untranslated instead of failing the request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use askdoc_core::{AskdocError, Result, TranslateConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};

// ============================================================================
// Detection
// ============================================================================

/// A scored language classification
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO 639-1 tag where one exists (falls back to the detector's code)
    pub lang: String,

    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

/// Confidence-scored language classifier.
///
/// Detectors are chained: a primary statistical classifier first, then
/// narrower fallback rules for inputs the primary misreads (short text,
/// romanized transliteration).
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<Detection>;
}

/// Statistical language identification via whatlang
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<Detection> {
        let info = whatlang::detect(text)?;
        Some(Detection {
            lang: iso639_1(info.lang()).to_string(),
            confidence: info.confidence(),
        })
    }
}

/// Keyword rule for romanized Hindi written in Latin script, which
/// statistical detectors routinely misread as English or another
/// Latin-script language.
pub struct RomanizedHindiRule {
    keywords: &'static [&'static str],
}

impl RomanizedHindiRule {
    pub fn new() -> Self {
        Self {
            keywords: &["kaise", "hai", "kya", "bhi", "kar", "hoga", "iski"],
        }
    }
}

impl Default for RomanizedHindiRule {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for RomanizedHindiRule {
    fn detect(&self, text: &str) -> Option<Detection> {
        let lowered = text.to_lowercase();
        let hit = lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| self.keywords.contains(&word));

        hit.then(|| Detection {
            lang: "hi".to_string(),
            confidence: 0.6,
        })
    }
}

fn iso639_1(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;
    match lang {
        Lang::Eng => "en",
        Lang::Hin => "hi",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Rus => "ru",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        Lang::Ara => "ar",
        Lang::Ben => "bn",
        Lang::Urd => "ur",
        Lang::Tam => "ta",
        Lang::Tel => "te",
        Lang::Mar => "mr",
        Lang::Guj => "gu",
        Lang::Kan => "kn",
        Lang::Mal => "ml",
        Lang::Pan => "pa",
        Lang::Nep => "ne",
        Lang::Vie => "vi",
        Lang::Tur => "tr",
        Lang::Nld => "nl",
        Lang::Pol => "pl",
        Lang::Ukr => "uk",
        other => other.code(),
    }
}

// ============================================================================
// Translation
// ============================================================================

/// Capability boundary for text translation
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `from` to `to` (ISO 639-1 tags)
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;
}

/// Client for a LibreTranslate-compatible translation endpoint
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AskdocError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            source: from,
            target: to,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| AskdocError::TranslationUnavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AskdocError::TranslationUnavailable(format!(
                "translation error: {error_text}"
            )));
        }

        let result: TranslateResponse = response.json().await.map_err(|e| {
            AskdocError::TranslationUnavailable(format!("failed to parse response: {e}"))
        })?;

        Ok(result.translated_text)
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Detects the question's language and routes it through translation.
pub struct LanguageNormalizer {
    primary: Box<dyn LanguageDetector>,
    fallback: Vec<Box<dyn LanguageDetector>>,
    translator: Arc<dyn Translator>,
    target: String,
    min_confidence: f64,
}

impl LanguageNormalizer {
    /// Normalizer with the default detector chain: whatlang primary plus
    /// the romanized-Hindi keyword rule as fallback.
    pub fn new(translator: Arc<dyn Translator>, target: impl Into<String>, min_confidence: f64) -> Self {
        Self {
            primary: Box::new(WhatlangDetector),
            fallback: vec![Box::new(RomanizedHindiRule::new())],
            translator,
            target: target.into(),
            min_confidence,
        }
    }

    /// Build from config; `None` when no translation endpoint is set.
    pub fn from_config(config: &TranslateConfig, timeout_secs: u64) -> Result<Option<Self>> {
        let Some(endpoint) = &config.endpoint else {
            return Ok(None);
        };
        let translator = HttpTranslator::new(endpoint.clone(), config.api_key.clone(), timeout_secs)?;
        Ok(Some(Self::new(
            Arc::new(translator),
            config.target_lang.clone(),
            config.min_confidence,
        )))
    }

    /// Add another fallback rule after the built-in ones
    pub fn with_fallback_rule(mut self, rule: Box<dyn LanguageDetector>) -> Self {
        self.fallback.push(rule);
        self
    }

    /// Classify the question. Returns `None` when it already is in the
    /// target language or no detector is confident enough.
    pub fn classify(&self, text: &str) -> Option<Detection> {
        if let Some(detection) = self.primary.detect(text) {
            if detection.lang != self.target && detection.confidence >= self.min_confidence {
                return Some(detection);
            }
        }

        self.fallback
            .iter()
            .find_map(|rule| rule.detect(text))
            .filter(|detection| detection.lang != self.target)
    }

    /// Translate a non-target-language question to the target language.
    ///
    /// Returns the text to retrieve with and the detected source tag. On
    /// translation failure, falls back to the original text and reports no
    /// source language so the answer stays untranslated too.
    pub async fn normalize(&self, question: &str) -> (String, Option<String>) {
        let Some(detection) = self.classify(question) else {
            return (question.to_string(), None);
        };

        tracing::debug!(
            lang = %detection.lang,
            confidence = detection.confidence,
            "translating question to target language"
        );

        match self
            .translator
            .translate(question, &detection.lang, &self.target)
            .await
        {
            Ok(translated) => (translated, Some(detection.lang)),
            Err(e) => {
                tracing::warn!(error = %e, "question translation failed, proceeding untranslated");
                (question.to_string(), None)
            }
        }
    }

    /// Translate an answer back to the question's language, falling back to
    /// the untranslated answer when the capability is down.
    pub async fn localize(&self, answer: &str, lang: &str) -> String {
        match self.translator.translate(answer, &self.target, lang).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, "answer translation failed, returning untranslated");
                answer.to_string()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingTranslator, MockTranslator};

    #[test]
    fn test_whatlang_detects_devanagari_hindi() {
        let detection = WhatlangDetector
            .detect("फ्रांस की राजधानी क्या है? मुझे विस्तार से बताइए।")
            .unwrap();
        assert_eq!(detection.lang, "hi");
        assert!(detection.confidence > 0.0);
    }

    #[test]
    fn test_hinglish_rule_matches_keywords() {
        let rule = RomanizedHindiRule::new();
        assert!(rule.detect("france ki rajdhani kya hai").is_some());
        assert!(rule.detect("aap kaise hain").is_some());
        assert!(rule.detect("what is the capital of france").is_none());
    }

    #[test]
    fn test_hinglish_rule_requires_whole_words() {
        let rule = RomanizedHindiRule::new();
        // "karma" must not trigger the "kar" keyword
        assert!(rule.detect("karma is a concept").is_none());
    }

    #[tokio::test]
    async fn test_classify_skips_target_language() {
        let normalizer = LanguageNormalizer::new(Arc::new(MockTranslator::new()), "en", 0.5);
        assert!(normalizer
            .classify("This is a plain English sentence about nothing in particular.")
            .is_none());
    }

    #[tokio::test]
    async fn test_classify_falls_back_to_keyword_rule() {
        // threshold above any reachable confidence: the primary classifier
        // never qualifies, so romanized Hindi must come from the fallback
        let normalizer = LanguageNormalizer::new(Arc::new(MockTranslator::new()), "en", 1.1);
        let detection = normalizer.classify("yeh kaise hoga bhai").unwrap();
        assert_eq!(detection.lang, "hi");
        assert_eq!(detection.confidence, 0.6);
    }

    #[tokio::test]
    async fn test_normalize_translates_question() {
        let question = "Bonjour tout le monde, quelle est la capitale de la France aujourd'hui?";
        let translator = MockTranslator::new().with_phrase(question, "What is the capital of France?");
        let normalizer = LanguageNormalizer::new(Arc::new(translator), "en", 0.1);

        let (text, lang) = normalizer.normalize(question).await;
        assert_eq!(text, "What is the capital of France?");
        assert_eq!(lang.as_deref(), Some("fr"));
    }

    #[tokio::test]
    async fn test_normalize_survives_translator_outage() {
        let normalizer = LanguageNormalizer::new(Arc::new(FailingTranslator), "en", 0.1);

        let question = "फ्रांस की राजधानी क्या है?";
        let (text, lang) = normalizer.normalize(question).await;
        assert_eq!(text, question);
        assert!(lang.is_none());
    }

    #[tokio::test]
    async fn test_localize_survives_translator_outage() {
        let normalizer = LanguageNormalizer::new(Arc::new(FailingTranslator), "en", 0.1);
        let answer = normalizer.localize("The capital is Paris.", "hi").await;
        assert_eq!(answer, "The capital is Paris.");
    }

    #[test]
    fn test_iso_mapping_covers_common_languages() {
        assert_eq!(iso639_1(whatlang::Lang::Eng), "en");
        assert_eq!(iso639_1(whatlang::Lang::Hin), "hi");
        assert_eq!(iso639_1(whatlang::Lang::Fra), "fr");
    }
}
