//! Structured marketing analysis
//!
//! Each [`AnalysisKind`] has a prompt template asking the model for a JSON
//! object of a fixed shape. Replies that are not valid JSON, or do not fit
//! the requested shape, come back as [`AnalysisResult::Raw`].

mod parse;
mod prompts;
mod service;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub use parse::parse_analysis;
pub use prompts::analysis_prompt;
pub use service::{
    AnalysisOutcome, AnalysisRequest, AnalysisResponse, AnalysisService, BatchAnalysisItem,
    BatchAnalysisResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Sentiment,
    Keywords,
    Seo,
    Market,
    Brand,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::Sentiment,
        AnalysisKind::Keywords,
        AnalysisKind::Seo,
        AnalysisKind::Market,
        AnalysisKind::Brand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Sentiment => "sentiment",
            AnalysisKind::Keywords => "keywords",
            AnalysisKind::Seo => "seo",
            AnalysisKind::Market => "market",
            AnalysisKind::Brand => "brand",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                GatewayError::validation(format!(
                    "unsupported analysis type '{s}'; expected one of sentiment, keywords, seo, market, brand"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    /// -1.0 (negative) to 1.0 (positive)
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub keywords: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoAnalysis {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub target_audience: Vec<String>,
    pub competitive_advantages: Vec<String>,
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAnalysis {
    pub attributes: Vec<String>,
    pub values: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Parsed model reply; serializes as the bare inner shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Sentiment(SentimentAnalysis),
    Keywords(KeywordAnalysis),
    Seo(SeoAnalysis),
    Market(MarketAnalysis),
    Brand(BrandAnalysis),
    /// Reply text that could not be read as the requested shape
    Raw { raw: String },
}

impl AnalysisResult {
    pub fn kind(&self) -> Option<AnalysisKind> {
        match self {
            AnalysisResult::Sentiment(_) => Some(AnalysisKind::Sentiment),
            AnalysisResult::Keywords(_) => Some(AnalysisKind::Keywords),
            AnalysisResult::Seo(_) => Some(AnalysisKind::Seo),
            AnalysisResult::Market(_) => Some(AnalysisKind::Market),
            AnalysisResult::Brand(_) => Some(AnalysisKind::Brand),
            AnalysisResult::Raw { .. } => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, AnalysisResult::Raw { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("seo".parse::<AnalysisKind>().unwrap(), AnalysisKind::Seo);
        assert_eq!(" Brand ".parse::<AnalysisKind>().unwrap(), AnalysisKind::Brand);
        assert!(matches!(
            "vibes".parse::<AnalysisKind>(),
            Err(GatewayError::Validation(_))
        ));
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_value(AnalysisKind::Market).unwrap(), json!("market"));
        let kind: AnalysisKind = serde_json::from_value(json!("keywords")).unwrap();
        assert_eq!(kind, AnalysisKind::Keywords);
    }

    #[test]
    fn test_result_serializes_bare() {
        let result = AnalysisResult::Sentiment(SentimentAnalysis {
            score: 0.5,
            explanation: "upbeat".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"score": 0.5, "explanation": "upbeat"})
        );

        let raw = AnalysisResult::Raw { raw: "text".to_string() };
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!({"raw": "text"}));
        assert!(raw.is_raw());
        assert_eq!(raw.kind(), None);
    }

    #[test]
    fn test_market_field_names() {
        let result = AnalysisResult::Market(MarketAnalysis {
            target_audience: vec!["students".to_string()],
            competitive_advantages: vec![],
            opportunities: vec!["campus".to_string()],
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["targetAudience"][0], "students");
        assert!(json["competitiveAdvantages"].as_array().unwrap().is_empty());
    }
}
