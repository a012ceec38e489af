//! Upstream settings
//!
//! Reads credentials, project and region for the Vertex AI predict API.
//! Settings are read once at startup and shared read-only afterwards.
//!
//! # Environment Variables
//!
//! | Variable | Purpose | Required |
//! |----------|---------|----------|
//! | `VERTEX_AI_ACCESS_TOKEN` | Bearer token for the predict API | Yes |
//! | `GOOGLE_CLOUD_PROJECT` | Cloud project id | Yes |
//! | `GOOGLE_CLOUD_LOCATION` | Region (default `us-central1`) | No |
//! | `VERTEX_AI_ENDPOINT` | Base URL override | No |
//! | `VERTEX_AI_TIMEOUT_SECS` | Upstream request timeout | No |
//! | `ADMIN_KEY` | Key for cache management endpoints | No |

use std::time::Duration;

use crate::error::GatewayError;

pub const DEFAULT_LOCATION: &str = "us-central1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-wide upstream configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub access_token: String,
    pub project_id: String,
    pub location: String,
    /// Base URL; derived from the location when not overridden
    pub api_endpoint: String,
    pub admin_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            project_id: String::new(),
            location: DEFAULT_LOCATION.to_string(),
            api_endpoint: default_endpoint(DEFAULT_LOCATION),
            admin_key: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn default_endpoint(location: &str) -> String {
    format!("https://{}-aiplatform.googleapis.com", location)
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let location = get("GOOGLE_CLOUD_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let api_endpoint = get("VERTEX_AI_ENDPOINT")
            .map(|e| e.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_endpoint(&location));
        let request_timeout = get("VERTEX_AI_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            access_token: get("VERTEX_AI_ACCESS_TOKEN").unwrap_or_default(),
            project_id: get("GOOGLE_CLOUD_PROJECT").unwrap_or_default(),
            location,
            api_endpoint,
            admin_key: get("ADMIN_KEY"),
            request_timeout,
        }
    }

    /// Build settings directly (tests, embedding applications)
    pub fn new(
        access_token: impl Into<String>,
        project_id: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            access_token: access_token.into(),
            project_id: project_id.into(),
            api_endpoint: default_endpoint(&location),
            location,
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// True iff both the token and the project id are present
    pub fn is_configured(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.project_id.trim().is_empty()
    }

    /// Gate for every service entry point
    pub fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(GatewayError::NotConfigured)
        }
    }

    /// Constant-shape comparison of a presented admin key
    pub fn admin_key_matches(&self, presented: Option<&str>) -> bool {
        match (self.admin_key.as_deref(), presented) {
            (Some(expected), Some(given)) => {
                expected.len() == given.len()
                    && expected
                        .bytes()
                        .zip(given.bytes())
                        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                        == 0
            }
            _ => false,
        }
    }

    /// Full predict URL for a model
    ///
    /// Path segments are percent-encoded so a model id can never add
    /// segments or a query string.
    pub fn predict_url(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.api_endpoint,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(&self.location),
            urlencoding::encode(model)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_location() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.location, "us-central1");
        assert_eq!(settings.api_endpoint, "https://us-central1-aiplatform.googleapis.com");
        assert!(!settings.is_configured());
    }

    #[test]
    fn test_configured_requires_token_and_project() {
        let only_token = Settings::from_lookup(lookup(&[("VERTEX_AI_ACCESS_TOKEN", "tok")]));
        assert!(!only_token.is_configured());
        assert!(matches!(only_token.ensure_configured(), Err(GatewayError::NotConfigured)));

        let both = Settings::from_lookup(lookup(&[
            ("VERTEX_AI_ACCESS_TOKEN", "tok"),
            ("GOOGLE_CLOUD_PROJECT", "proj"),
        ]));
        assert!(both.is_configured());
        assert!(both.ensure_configured().is_ok());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings::from_lookup(lookup(&[
            ("VERTEX_AI_ACCESS_TOKEN", "   "),
            ("GOOGLE_CLOUD_PROJECT", "proj"),
            ("GOOGLE_CLOUD_LOCATION", ""),
        ]));
        assert!(!settings.is_configured());
        assert_eq!(settings.location, DEFAULT_LOCATION);
    }

    #[test]
    fn test_endpoint_override_and_predict_url() {
        let settings = Settings::from_lookup(lookup(&[
            ("GOOGLE_CLOUD_PROJECT", "acme"),
            ("GOOGLE_CLOUD_LOCATION", "europe-west4"),
            ("VERTEX_AI_ENDPOINT", "http://localhost:9000/"),
        ]));
        assert_eq!(
            settings.predict_url("text-bison"),
            "http://localhost:9000/v1/projects/acme/locations/europe-west4/publishers/google/models/text-bison:predict"
        );
    }

    #[test]
    fn test_predict_url_encodes_model_segment() {
        let settings = Settings::new("t", "acme", "us-central1").with_endpoint("http://upstream");
        let url = settings.predict_url("../../other?x=");

        assert_eq!(
            url,
            "http://upstream/v1/projects/acme/locations/us-central1/publishers/google/models/..%2F..%2Fother%3Fx%3D:predict"
        );
        assert!(!url.contains('?'));
    }

    #[test]
    fn test_admin_key_matching() {
        let settings = Settings::new("t", "p", "us-central1").with_admin_key("secret");
        assert!(settings.admin_key_matches(Some("secret")));
        assert!(!settings.admin_key_matches(Some("secreT")));
        assert!(!settings.admin_key_matches(Some("secret-longer")));
        assert!(!settings.admin_key_matches(None));

        let no_key = Settings::new("t", "p", "us-central1");
        assert!(!no_key.admin_key_matches(Some("")));
    }

    #[test]
    fn test_timeout_parse() {
        let settings = Settings::from_lookup(lookup(&[("VERTEX_AI_TIMEOUT_SECS", "5")]));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));

        let bad = Settings::from_lookup(lookup(&[("VERTEX_AI_TIMEOUT_SECS", "soon")]));
        assert_eq!(bad.request_timeout, Duration::from_secs(30));
    }
}
