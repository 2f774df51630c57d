//! codeforge: a pipeline of LLM-backed agents for software requests.
//!
//! Turns one natural-language request into:
//! - structured requirements (with ambiguity detection and clarifying questions)
//! - generated code
//! - review comments, documentation, unit tests and deployment notes
//!
//! Follow-up requests carry a [`context::PipelineContext`] so they refine the
//! previous run instead of starting over.

pub mod ambiguity;
pub mod config;
pub mod context;
pub mod error;
pub mod invoker;
pub mod llm;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod stages;
pub mod workspace;

pub use ambiguity::AmbiguityVerdict;
pub use config::Settings;
pub use context::PipelineContext;
pub use error::{InvocationError, StageError, StageErrorKind};
pub use invoker::ResilientInvoker;
pub use llm::{CompletionConfig, CompletionRequest, CompletionService, LlmClient};
pub use pipeline::{Phase, Pipeline, PipelineReport};
pub use stages::{DeploymentConfig, RequirementSet, StageKind};
