//! Pipeline orchestrator: runs the stages in order and owns the context.
//!
//! ```text
//! instruction ─▶ requirements ─▶ coding ─┬─▶ review
//!                                        ├─▶ documentation
//!                                        ├─▶ tests
//!                                        └─▶ deployment
//! ```
//!
//! The four trailing stages only read (code, requirements) and run
//! concurrently. The context is updated once the whole run is over.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ambiguity::{self, AmbiguityVerdict};
use crate::config::Settings;
use crate::context::PipelineContext;
use crate::error::{StageError, StageErrorKind};
use crate::invoker::ResilientInvoker;
use crate::llm::CompletionService;
use crate::parser::ParseDegradation;
use crate::stages::{
    DeploymentConfig, Parsed, RequirementSet, Runner, StageKind, coding, deployment,
    documentation, requirements, review, testgen,
};

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Analyzing,
    Coding,
    Finishing,
    Complete,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Analyzing => write!(f, "analyzing"),
            Phase::Coding => write!(f, "coding"),
            Phase::Finishing => write!(f, "finishing"),
            Phase::Complete => write!(f, "complete"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

impl Phase {
    /// Move to `next`, logging the transition.
    fn advance(&mut self, next: Phase) {
        tracing::debug!(from = %self, to = %next, "Phase change");
        *self = next;
    }
}

/// Everything one run produced. Slots stay `None` for stages that failed
/// or never ran; completed stages are kept even when others fail.
#[derive(Debug)]
pub struct PipelineReport {
    pub instruction: String,
    pub started_at: DateTime<Utc>,
    pub ambiguity: AmbiguityVerdict,
    pub requirements: Option<RequirementSet>,
    pub code: Option<String>,
    pub review: Option<String>,
    pub documentation: Option<String>,
    pub tests: Option<String>,
    pub deployment: Option<DeploymentConfig>,
    pub degradations: Vec<ParseDegradation>,
    pub failures: Vec<StageError>,
}

impl PipelineReport {
    fn new(instruction: &str, ambiguity: AmbiguityVerdict) -> Self {
        Self {
            instruction: instruction.to_string(),
            started_at: Utc::now(),
            ambiguity,
            requirements: None,
            code: None,
            review: None,
            documentation: None,
            tests: None,
            deployment: None,
            degradations: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The first stage that failed, if any.
    pub fn failed_stage(&self) -> Option<StageKind> {
        self.failures.first().map(|e| e.stage)
    }

    pub fn has_output(&self, stage: StageKind) -> bool {
        match stage {
            StageKind::Requirements => self.requirements.is_some(),
            StageKind::Coding => self.code.is_some(),
            StageKind::Review => self.review.is_some(),
            StageKind::Documentation => self.documentation.is_some(),
            StageKind::Tests => self.tests.is_some(),
            StageKind::Deployment => self.deployment.is_some(),
        }
    }

    fn fail(&mut self, err: StageError) {
        tracing::error!(stage = %err.stage, error = %err.kind, "Stage failed");
        self.failures.push(err);
    }

    fn take_parsed<T>(&mut self, parsed: Parsed<T>) -> T {
        if let Some(d) = parsed.degradation {
            self.degradations.push(d);
        }
        parsed.value
    }
}

/// The multi-agent pipeline for one user session.
pub struct Pipeline {
    invoker: ResilientInvoker,
    settings: Settings,
    context: PipelineContext,
    phase: Phase,
}

impl Pipeline {
    pub fn new(service: Arc<dyn CompletionService>, settings: Settings) -> Self {
        let invoker = ResilientInvoker::new(service)
            .with_max_retries(settings.max_retries)
            .with_backoff_unit(settings.backoff_unit());
        Self {
            invoker,
            settings,
            context: PipelineContext::new(),
            phase: Phase::Idle,
        }
    }

    /// Resume a session from a saved context.
    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn set_follow_up(&mut self, active: bool) {
        self.context.set_active(active);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start a new session: forget previous runs.
    pub fn reset(&mut self) {
        self.context.clear();
        self.phase.advance(Phase::Idle);
        tracing::info!("Session context cleared");
    }

    /// Run every stage for one instruction.
    ///
    /// Never returns an error: failures are recorded in the report together
    /// with whatever the earlier stages produced.
    pub async fn run(&mut self, instruction: &str) -> PipelineReport {
        self.phase.advance(Phase::Analyzing);

        let verdict = ambiguity::detect(instruction);
        tracing::info!(
            ambiguous = verdict.is_ambiguous,
            vague_terms = verdict.vague_terms_found,
            missing_specs = verdict.missing_specifications,
            input_length = verdict.input_length,
            follow_up = self.context.summary().is_some(),
            "Pipeline run started"
        );
        let mut report = PipelineReport::new(instruction, verdict);

        if instruction.trim().is_empty() {
            report.fail(StageError::new(StageKind::Requirements, StageErrorKind::EmptyInput));
            self.phase.advance(Phase::Failed);
            return report;
        }

        let runner = Runner::new(&self.invoker, &self.settings);

        let analyzed = requirements::analyze(&runner, instruction, &verdict, &self.context).await;
        let reqs = match analyzed {
            Ok(parsed) => report.take_parsed(parsed),
            Err(e) => {
                report.fail(e);
                self.phase.advance(Phase::Failed);
                return report;
            }
        };
        report.requirements = Some(reqs.clone());

        self.phase.advance(Phase::Coding);
        let code = match coding::generate(&runner, instruction, &reqs).await {
            Ok(code) => code,
            Err(e) => {
                report.fail(e);
                self.phase.advance(Phase::Failed);
                return report;
            }
        };
        report.code = Some(code.clone());

        self.phase.advance(Phase::Finishing);
        let (review, docs, tests, deploy) = tokio::join!(
            review::review(&runner, &code, &reqs),
            documentation::document(&runner, &code, &reqs),
            testgen::generate(&runner, &code, &reqs),
            deployment::configure(&runner, &code, &reqs),
        );

        match review {
            Ok(text) => report.review = Some(text),
            Err(e) => report.fail(e),
        }
        match docs {
            Ok(text) => report.documentation = Some(text),
            Err(e) => report.fail(e),
        }
        match tests {
            Ok(text) => report.tests = Some(text),
            Err(e) => report.fail(e),
        }
        match deploy {
            Ok(parsed) => {
                let config = report.take_parsed(parsed);
                report.deployment = Some(config);
            }
            Err(e) => report.fail(e),
        }

        self.context.record_run(instruction, reqs, code);

        let phase = if report.is_success() {
            Phase::Complete
        } else {
            Phase::Failed
        };
        self.phase.advance(phase);
        tracing::info!(
            phase = %phase,
            failures = report.failures.len(),
            degradations = report.degradations.len(),
            "Pipeline run finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_advances_and_displays() {
        let mut phase = Phase::Idle;
        for next in [Phase::Analyzing, Phase::Coding, Phase::Finishing, Phase::Failed] {
            phase.advance(next);
            assert_eq!(phase, next);
        }
        assert_eq!(phase.to_string(), "failed");
    }
}
