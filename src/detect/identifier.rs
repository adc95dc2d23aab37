//! whatlang-backed language identifier.
//! Trigram detection, mapped to ISO 639-1 codes where one exists.

use async_trait::async_trait;
use whatlang::{Detector, Lang};

use super::{ClassifierResult, ClassifierSignal, IdentifyError, LanguageIdentifier};

/// Which signal shape the identifier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalMode {
    /// whatlang's `is_reliable()` flag.
    #[default]
    Reliability,
    /// whatlang's confidence as a single-entry score map.
    Confidence,
}

pub struct WhatlangIdentifier {
    detector: Detector,
    mode: SignalMode,
}

impl WhatlangIdentifier {
    pub fn new() -> Self {
        tracing::info!("initializing whatlang language identifier");
        Self {
            detector: Detector::new(),
            mode: SignalMode::default(),
        }
    }

    pub fn with_mode(mode: SignalMode) -> Self {
        Self {
            mode,
            ..Self::new()
        }
    }

    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    fn detect(&self, text: &str) -> ClassifierResult {
        let Some(info) = self.detector.detect(text) else {
            return ClassifierResult::undetermined();
        };
        let code = lang_to_code(info.lang());
        let signal = match self.mode {
            SignalMode::Reliability => ClassifierSignal::Reliability(info.is_reliable()),
            SignalMode::Confidence => {
                ClassifierSignal::Scores([(code.to_string(), info.confidence() as f32)].into())
            }
        };
        ClassifierResult {
            language: Some(code.to_string()),
            signal,
        }
    }
}

impl Default for WhatlangIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageIdentifier for WhatlangIdentifier {
    async fn identify(&self, text: &str) -> Result<ClassifierResult, IdentifyError> {
        Ok(self.detect(text))
    }
}

fn lang_to_code(lang: Lang) -> &'static str {
    use whatlang::Lang::*;
    match lang {
        Eng => "en",
        Cmn => "zh",
        Jpn => "ja",
        Kor => "ko",
        Fra => "fr",
        Deu => "de",
        Spa => "es",
        Rus => "ru",
        Por => "pt",
        Ita => "it",
        Ara => "ar",
        Hin => "hi",
        Tur => "tr",
        Vie => "vi",
        Tha => "th",
        Nld => "nl",
        Pol => "pl",
        Ukr => "uk",
        Bul => "bg",
        Srp => "sr",
        Ell => "el",
        Heb => "he",
        Pes => "fa",
        Urd => "ur",
        Mar => "mr",
        Ben => "bn",
        Tam => "ta",
        Tel => "te",
        Hye => "hy",
        Kat => "ka",
        Swe => "sv",
        // No two-letter mapping: keep whatlang's three-letter code.
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_english_sentence() {
        let id = WhatlangIdentifier::new();
        let result = id
            .identify("this is a longer english sentence to ensure correct detection")
            .await
            .unwrap();
        assert_eq!(result.language.as_deref(), Some("en"));
        assert!(matches!(result.signal, ClassifierSignal::Reliability(_)));
    }

    #[tokio::test]
    async fn confidence_mode_reports_scores() {
        let id = WhatlangIdentifier::with_mode(SignalMode::Confidence);
        let result = id
            .identify("der schnelle braune fuchs springt über den faulen hund")
            .await
            .unwrap();
        assert_eq!(result.language.as_deref(), Some("de"));
        match result.signal {
            ClassifierSignal::Scores(scores) => {
                let score = scores["de"];
                assert!((0.0..=1.0).contains(&score));
            }
            other => panic!("expected scores, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_text_is_undetermined() {
        let id = WhatlangIdentifier::new();
        let result = id.identify("").await.unwrap();
        assert_eq!(result, ClassifierResult::undetermined());
    }

    #[test]
    fn maps_known_languages() {
        assert_eq!(lang_to_code(Lang::Tur), "tr");
        assert_eq!(lang_to_code(Lang::Cmn), "zh");
        assert_eq!(lang_to_code(Lang::Epo), "epo");
    }
}
