use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{AnalysisKind, AnalysisResult};
use crate::llm::extract_json;

/// Read model output as the shape belonging to `kind`
///
/// Never fails: anything unreadable becomes [`AnalysisResult::Raw`] holding
/// the original text.
pub fn parse_analysis(text: &str, kind: AnalysisKind) -> AnalysisResult {
    let Some(value) = extract_json(text) else {
        debug!(kind = %kind, "Analysis reply is not JSON");
        return raw(text);
    };

    let parsed = match kind {
        AnalysisKind::Sentiment => shape(value).map(AnalysisResult::Sentiment),
        AnalysisKind::Keywords => shape(value).map(AnalysisResult::Keywords),
        AnalysisKind::Seo => shape(value).map(AnalysisResult::Seo),
        AnalysisKind::Market => shape(value).map(AnalysisResult::Market),
        AnalysisKind::Brand => shape(value).map(AnalysisResult::Brand),
    };

    parsed.unwrap_or_else(|| {
        debug!(kind = %kind, "Analysis reply does not match the expected shape");
        raw(text)
    })
}

fn shape<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

fn raw(text: &str) -> AnalysisResult {
    AnalysisResult::Raw {
        raw: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{KeywordAnalysis, SentimentAnalysis};

    #[test]
    fn test_fenced_sentiment() {
        let text = "```json\n{\"score\": 0.8, \"explanation\": \"Warm and inviting\"}\n```";
        assert_eq!(
            parse_analysis(text, AnalysisKind::Sentiment),
            AnalysisResult::Sentiment(SentimentAnalysis {
                score: 0.8,
                explanation: "Warm and inviting".to_string(),
            })
        );
    }

    #[test]
    fn test_keywords() {
        let text = r#"{"keywords": ["coffee", "fresh"], "summary": "About coffee"}"#;
        let result = parse_analysis(text, AnalysisKind::Keywords);
        assert_eq!(
            result,
            AnalysisResult::Keywords(KeywordAnalysis {
                keywords: vec!["coffee".to_string(), "fresh".to_string()],
                summary: "About coffee".to_string(),
            })
        );
    }

    #[test]
    fn test_not_json_is_raw() {
        let result = parse_analysis("The tone is positive overall.", AnalysisKind::Sentiment);
        assert_eq!(
            result,
            AnalysisResult::Raw {
                raw: "The tone is positive overall.".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_shape_is_raw() {
        // Valid JSON, but keywords were requested
        let text = r#"{"score": 0.1, "explanation": "meh"}"#;
        assert!(parse_analysis(text, AnalysisKind::Keywords).is_raw());
    }

    #[test]
    fn test_market_shape() {
        let text = r#"{"targetAudience": ["remote workers"], "competitiveAdvantages": ["wifi"], "opportunities": []}"#;
        let result = parse_analysis(text, AnalysisKind::Market);
        assert_eq!(result.kind(), Some(AnalysisKind::Market));
    }
}
