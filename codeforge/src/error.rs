//! Error types surfaced by the pipeline.
//!
//! Parsing problems are not errors here: they degrade to defaults and are
//! reported through [`crate::parser::ParseOutcome`].

use crate::stages::StageKind;

/// The completion service failed on every attempt.
#[derive(Debug, thiserror::Error)]
#[error("completion failed after {attempts} attempt(s): {cause}")]
pub struct InvocationError {
    pub attempts: u32,
    /// Last observed cause (service error, timeout, or empty reply).
    pub cause: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StageErrorKind {
    #[error(transparent)]
    Invocation(#[from] InvocationError),
    #[error("model returned no usable content")]
    EmptyOutput,
    #[error("instruction is empty")]
    EmptyInput,
}

/// A stage that could not produce its artifact.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {kind}")]
pub struct StageError {
    pub stage: StageKind,
    #[source]
    pub kind: StageErrorKind,
}

impl StageError {
    pub fn new(stage: StageKind, kind: impl Into<StageErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    pub fn invocation(stage: StageKind, err: InvocationError) -> Self {
        Self::new(stage, StageErrorKind::Invocation(err))
    }

    pub fn empty_output(stage: StageKind) -> Self {
        Self::new(stage, StageErrorKind::EmptyOutput)
    }
}
