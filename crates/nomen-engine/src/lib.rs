//! Generation side of nomen: prompt tables, the provider seam, and the
//! pipeline that turns a [`UserInput`] into an [`AnalysisResult`].
//!
//! [`UserInput`]: nomen_contracts::input::UserInput
//! [`AnalysisResult`]: nomen_contracts::analysis::AnalysisResult

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod provider;

pub use config::PipelineConfig;
pub use error::GenerateError;
pub use pipeline::ResultPipeline;
pub use provider::{GeminiClient, GenerativeClient};
