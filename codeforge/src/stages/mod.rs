//! Pipeline stages.
//!
//! Each stage is a static [`StageSpec`] (role preamble) plus a stateless
//! function that composes a prompt, calls the model through the
//! [`ResilientInvoker`], and shapes the reply:
//! - requirements: structured, parsed with defaults
//! - coding: first fenced code block
//! - review, documentation: free-form Markdown
//! - tests: first fenced code block
//! - deployment: structured, parsed with canned defaults

pub mod coding;
pub mod deployment;
pub mod documentation;
pub mod prompts;
pub mod requirements;
pub mod review;
pub mod testgen;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::StageError;
use crate::invoker::ResilientInvoker;
use crate::parser::ParseDegradation;

pub use deployment::DeploymentConfig;
pub use requirements::RequirementSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Requirements,
    Coding,
    Review,
    Documentation,
    Tests,
    Deployment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Requirements => write!(f, "requirements"),
            StageKind::Coding => write!(f, "coding"),
            StageKind::Review => write!(f, "review"),
            StageKind::Documentation => write!(f, "documentation"),
            StageKind::Tests => write!(f, "tests"),
            StageKind::Deployment => write!(f, "deployment"),
        }
    }
}

/// Static description of a stage.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    pub kind: StageKind,
    /// Agent role shown in reports.
    pub role: &'static str,
    /// System message sent with every call.
    pub preamble: &'static str,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::Requirements,
        StageKind::Coding,
        StageKind::Review,
        StageKind::Documentation,
        StageKind::Tests,
        StageKind::Deployment,
    ];

    pub fn spec(self) -> StageSpec {
        let (role, preamble) = match self {
            StageKind::Requirements => ("analyst", prompts::REQUIREMENTS_SYSTEM),
            StageKind::Coding => ("builder", prompts::CODING_SYSTEM),
            StageKind::Review => ("reviewer", prompts::REVIEW_SYSTEM),
            StageKind::Documentation => ("writer", prompts::DOCUMENTATION_SYSTEM),
            StageKind::Tests => ("qa", prompts::TESTS_SYSTEM),
            StageKind::Deployment => ("deploy", prompts::DEPLOYMENT_SYSTEM),
        };
        StageSpec {
            kind: self,
            role,
            preamble,
        }
    }
}

/// A structured stage result with any parse degradation noted alongside.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub degradation: Option<ParseDegradation>,
}

/// Shared plumbing for running one stage call.
pub struct Runner<'a> {
    invoker: &'a ResilientInvoker,
    settings: &'a Settings,
}

impl<'a> Runner<'a> {
    pub fn new(invoker: &'a ResilientInvoker, settings: &'a Settings) -> Self {
        Self { invoker, settings }
    }

    /// Send `prompt` with the stage's preamble and timeout.
    pub async fn complete(&self, stage: StageKind, prompt: &str) -> Result<String, StageError> {
        let spec = stage.spec();
        let config = self.settings.completion_config(stage);
        tracing::info!(stage = %stage, prompt_len = prompt.len(), "Stage started");

        let text = self
            .invoker
            .invoke(spec.preamble, prompt, &config)
            .await
            .map_err(|e| StageError::invocation(stage, e))?;

        tracing::info!(stage = %stage, response_len = text.len(), "Stage finished");
        Ok(text)
    }
}

/// Render the requirement lists every downstream prompt carries.
pub fn format_requirements(reqs: &RequirementSet) -> String {
    let mut text = String::from("FUNCTIONAL REQUIREMENTS:\n");
    push_bullets(&mut text, &reqs.functional_requirements);
    text.push_str("\nNON-FUNCTIONAL REQUIREMENTS:\n");
    push_bullets(&mut text, &reqs.non_functional_requirements);
    text
}

pub(crate) fn push_bullets(text: &mut String, items: &[String]) {
    if items.is_empty() {
        text.push_str("- (none)\n");
    }
    for item in items {
        text.push_str("- ");
        text.push_str(item);
        text.push('\n');
    }
}

/// Language tag at the start of a single-line fenced block.
static INLINE_LANG_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:python3?|py|rust|rs|bash|sh|shell|json|toml|ya?ml|text|markdown|md)\s+")
        .expect("static pattern")
});

/// Body of the first fenced block, or the trimmed text when there is none.
///
/// The language tag after the opening fence is skipped. An unterminated
/// fence runs to the end of the text. A block with no line break before
/// its closing fence keeps everything between the fences.
pub fn extract_code_block(content: &str) -> String {
    let Some(open) = content.find("```") else {
        return content.trim().to_string();
    };
    let after_fence = &content[open + 3..];
    let close = after_fence.find("```");
    match after_fence.find('\n') {
        Some(nl) if close.is_none_or(|c| nl < c) => {
            let body = &after_fence[nl + 1..];
            let body = match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            };
            body.trim().to_string()
        }
        _ => {
            let inline = after_fence[..close.unwrap_or(after_fence.len())].trim();
            INLINE_LANG_TAG.replace(inline, "").trim().to_string()
        }
    }
}

/// Unwrap a reply only when one fence encloses all of it.
///
/// Prose stages emit Markdown that legitimately contains code examples, so
/// inner fences are left alone.
pub fn unwrap_enclosing_fence(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 6 {
        let inner = extract_code_block(trimmed);
        if trimmed.matches("```").count() == 2 {
            return inner;
        }
    }
    trimmed.to_string()
}

/// Free-form output must not be blank.
pub(crate) fn non_empty(stage: StageKind, text: String) -> Result<String, StageError> {
    if text.trim().is_empty() {
        tracing::warn!(stage = %stage, "Stage produced no usable content");
        return Err(StageError::empty_output(stage));
    }
    Ok(text)
}
