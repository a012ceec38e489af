//! vertex-gateway: resilient access to Vertex AI text models
//!
//! This crate is the AI integration layer of a marketing platform. It wraps
//! the Vertex AI `:predict` API with:
//!
//! - **Response cache**: TTL-bounded store keyed by normalized request content
//! - **Request executor**: cache lookup, retry with exponential backoff, timing
//! - **Generation**: single prompts and windowed batches
//! - **Analysis**: structured sentiment/keyword/SEO/market/brand analysis
//! - **Workflows**: breadth-first execution of node/edge graphs
//! - **HTTP surface**: axum router exposing all of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use vertex_gateway::{Gateway, Settings, DEFAULT_TTL};
//!
//! let gateway = Gateway::from_settings(Settings::from_env(), DEFAULT_TTL);
//! let app = vertex_gateway::http::router(vertex_gateway::http::AppState::new(gateway));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod analysis;
pub mod batch;
pub mod cache;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod generation;
pub mod http;
pub mod llm;
pub mod models;
pub mod operations;
pub mod settings;
pub mod testing;
pub mod workflow;

pub use analysis::{AnalysisKind, AnalysisRequest, AnalysisResult, AnalysisService};
pub use cache::{CacheStats, CacheStore, MemoryCacheStore, DEFAULT_TTL};
pub use error::{GatewayError, UpstreamError};
pub use executor::{ExecutionFailure, Executed, RequestExecutor, RetryPolicy};
pub use gateway::{Gateway, ModelParams};
pub use generation::{GenerationRequest, GenerationService};
pub use llm::{PredictRequest, PredictResponse, TextModel, VertexClient};
pub use operations::{OperationRecord, OperationStatus, OperationTracker};
pub use settings::Settings;
pub use workflow::{WorkflowDefinition, WorkflowEngine, WorkflowRequest, WorkflowService};

