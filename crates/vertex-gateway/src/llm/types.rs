//! Wire types of the upstream predict API
//!
//! Request: `{instances: [{prompt}], parameters: {temperature, maxOutputTokens, topP, topK}}`
//! Response: `{predictions: [{content | text}]}`

use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

pub const DEFAULT_TOP_P: f64 = 0.8;
pub const DEFAULT_TOP_K: u32 = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    pub top_k: u32,
}

impl PredictParameters {
    pub fn new(temperature: f64, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub instances: Vec<Instance>,
    pub parameters: PredictParameters,
}

impl PredictRequest {
    /// Single-prompt request
    pub fn new(prompt: impl Into<String>, temperature: f64, max_output_tokens: u32) -> Self {
        Self {
            instances: vec![Instance {
                prompt: prompt.into(),
            }],
            parameters: PredictParameters::new(temperature, max_output_tokens),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

impl PredictResponse {
    /// Build a response holding one `content` prediction
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            predictions: vec![Prediction {
                content: Some(content.into()),
                text: None,
            }],
        }
    }

    /// Text of the first prediction: `content`, then `text`
    ///
    /// Empty strings fall through to the next field. No predictions, or a
    /// first prediction with neither field set, is `EmptyPrediction`.
    pub fn text(&self) -> Result<String, UpstreamError> {
        let first = self.predictions.first().ok_or(UpstreamError::EmptyPrediction)?;
        first
            .content
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| first.text.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .ok_or(UpstreamError::EmptyPrediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = PredictRequest::new("Write a tagline", 0.7, 50);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            json!({
                "instances": [{"prompt": "Write a tagline"}],
                "parameters": {
                    "temperature": 0.7,
                    "maxOutputTokens": 50,
                    "topP": 0.8,
                    "topK": 40
                }
            })
        );
    }

    #[test]
    fn test_text_prefers_content() {
        let response: PredictResponse = serde_json::from_value(json!({
            "predictions": [{"content": "from content", "text": "from text"}]
        }))
        .unwrap();
        assert_eq!(response.text().unwrap(), "from content");
    }

    #[test]
    fn test_text_falls_back_to_text_field() {
        let response: PredictResponse = serde_json::from_value(json!({
            "predictions": [{"content": "", "text": "from text"}]
        }))
        .unwrap();
        assert_eq!(response.text().unwrap(), "from text");
    }

    #[test]
    fn test_text_empty_predictions() {
        let response: PredictResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text(), Err(UpstreamError::EmptyPrediction));

        let blank: PredictResponse =
            serde_json::from_value(json!({"predictions": [{"safetyAttributes": {}}]})).unwrap();
        assert_eq!(blank.text(), Err(UpstreamError::EmptyPrediction));
    }
}
