//! Conversation state carried between pipeline runs.
//!
//! Only the orchestrator mutates a [`PipelineContext`], and only after every
//! stage of a run has finished. Stages read it through [`PipelineContext::summary`].

use serde::{Deserialize, Serialize};

use crate::stages::RequirementSet;

/// How many previous functional requirements the summary quotes.
const SUMMARY_REQUIREMENTS: usize = 3;
/// Characters of previous code quoted in the summary.
const SUMMARY_CODE_CHARS: usize = 200;

/// Outputs of the last successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousResults {
    pub requirements: RequirementSet,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Follow-up mode. When off, runs ignore history.
    pub is_active: bool,
    pub previous_prompts: Vec<String>,
    pub previous_results: Option<PreviousResults>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    /// Fresh session context with follow-up mode on.
    pub fn new() -> Self {
        Self {
            is_active: true,
            previous_prompts: Vec::new(),
            previous_results: None,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn has_history(&self) -> bool {
        !self.previous_prompts.is_empty() || self.previous_results.is_some()
    }

    /// Remember a finished run: append its prompt and replace the results.
    pub fn record_run(&mut self, prompt: &str, requirements: RequirementSet, code: String) {
        self.previous_prompts.push(prompt.to_string());
        self.previous_results = Some(PreviousResults { requirements, code });
    }

    /// Forget all history, keeping the follow-up setting.
    pub fn clear(&mut self) {
        self.previous_prompts.clear();
        self.previous_results = None;
    }

    /// Text block describing the previous run, if follow-up applies.
    pub fn summary(&self) -> Option<String> {
        if !self.is_active || !self.has_history() {
            return None;
        }

        let mut text = String::new();
        if let Some(last) = self.previous_prompts.last() {
            text.push_str(&format!("Previous prompt: {last}\n"));
        }
        if let Some(results) = &self.previous_results {
            let reqs: Vec<&str> = results
                .requirements
                .functional_requirements
                .iter()
                .take(SUMMARY_REQUIREMENTS)
                .map(String::as_str)
                .collect();
            if !reqs.is_empty() {
                text.push_str(&format!(
                    "Previous functional requirements: {}\n",
                    reqs.join(", ")
                ));
            }
            if !results.code.is_empty() {
                text.push_str(&format!("Previous code summary: {}\n", truncate(&results.code)));
            }
        }
        text.push_str(
            "\nThis is a follow-up request. Update or modify the requirements based on the new \
             input while staying consistent with the previous context.\n",
        );
        Some(text)
    }
}

fn truncate(code: &str) -> String {
    if code.chars().count() <= SUMMARY_CODE_CHARS {
        return code.to_string();
    }
    let head: String = code.chars().take(SUMMARY_CODE_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reqs(items: &[&str]) -> RequirementSet {
        RequirementSet {
            functional_requirements: items.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_context_has_no_summary() {
        let ctx = PipelineContext::new();
        assert!(ctx.is_active);
        assert!(!ctx.has_history());
        assert_eq!(ctx.summary(), None);
    }

    #[test]
    fn inactive_context_has_no_summary() {
        let mut ctx = PipelineContext::new();
        ctx.record_run("first", reqs(&["a"]), "code".into());
        ctx.set_active(false);
        assert_eq!(ctx.summary(), None);
    }

    #[test]
    fn record_run_appends_prompt_and_replaces_results() {
        let mut ctx = PipelineContext::new();
        ctx.record_run("first", reqs(&["a"]), "one".into());
        ctx.record_run("second", reqs(&["b"]), "two".into());
        assert_eq!(ctx.previous_prompts, vec!["first", "second"]);
        let results = ctx.previous_results.as_ref().unwrap();
        assert_eq!(results.code, "two");
        assert_eq!(results.requirements.functional_requirements, vec!["b"]);

        let summary = ctx.summary().unwrap();
        assert!(summary.contains("Previous prompt: second"));
        assert!(!summary.contains("first"));
    }

    #[test]
    fn summary_quotes_three_requirements_and_truncates_code() {
        let mut ctx = PipelineContext::new();
        let code = "x".repeat(250);
        ctx.record_run("calc", reqs(&["add", "sub", "mul", "div"]), code);
        let summary = ctx.summary().unwrap();
        assert!(summary.contains("Previous functional requirements: add, sub, mul\n"));
        assert!(summary.contains(&format!("Previous code summary: {}...", "x".repeat(200))));
        assert!(!summary.contains(&"x".repeat(201)));
    }

    #[test]
    fn clear_keeps_follow_up_setting() {
        let mut ctx = PipelineContext::new();
        ctx.set_active(false);
        ctx.record_run("p", reqs(&[]), String::new());
        ctx.clear();
        assert!(!ctx.has_history());
        assert!(!ctx.is_active);
    }
}
