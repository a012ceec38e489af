//! Upstream text-model abstraction
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Generation / Analysis / Workflow        │
//! └───────────────────┬──────────────────────┘
//!                     │ uses
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │  TextModel (trait)                       │
//! │  - predict(model, request)               │
//! └───────────────────┬──────────────────────┘
//!                     │ implemented by
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │  VertexClient (reqwest, :predict)        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Swapping providers means implementing `TextModel` with the same
//! request/response shape, or adapting to it.

mod output;
mod types;
mod vertex;

use async_trait::async_trait;

use crate::error::UpstreamError;

pub use output::{extract_json, extract_json_object};
pub use types::{
    Instance, PredictParameters, PredictRequest, PredictResponse, Prediction, DEFAULT_TOP_K,
    DEFAULT_TOP_P,
};
pub use vertex::VertexClient;

/// A generative text backend
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Run one prediction against `model`
    async fn predict(
        &self,
        model: &str,
        request: &PredictRequest,
    ) -> Result<PredictResponse, UpstreamError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
