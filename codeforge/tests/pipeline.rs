//! End-to-end pipeline runs against a scripted completion service.
//!
//! Tests cover:
//! - A full run filling every artifact slot
//! - Context carry-over into the follow-up requirement prompt
//! - Partial results when a trailing stage fails
//! - Early stop (and untouched context) when requirements fail
//! - Deployment defaults for missing sections
//! - Empty instructions and empty code output

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use codeforge::stages::deployment::DEFAULT_HOSTING;
use codeforge::{
    CompletionRequest, CompletionService, Phase, Pipeline, PipelineContext, RequirementSet,
    Settings, StageErrorKind, StageKind,
};

/// Replies keyed by stage; prompts recorded per stage.
#[derive(Default)]
struct StageScript {
    replies: Mutex<HashMap<StageKind, VecDeque<Option<String>>>>,
    prompts: Mutex<HashMap<StageKind, Vec<String>>>,
}

impl StageScript {
    fn new() -> Self {
        Self::default()
    }

    /// Queue a reply. `None` makes the call fail.
    fn reply(self, stage: StageKind, text: Option<&str>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(text.map(str::to_string));
        self
    }

    /// Make every call for `stage` fail.
    fn failing(self, stage: StageKind) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(stage, VecDeque::from([None]));
        self
    }

    fn happy_path(self) -> Self {
        self.reply(
            StageKind::Requirements,
            Some(r#"{"functional_requirements": ["Add two integers"], "ambiguity_detected": false}"#),
        )
        .reply(
            StageKind::Coding,
            Some("```python\ndef add(a: int, b: int) -> int:\n    return a + b\n```"),
        )
        .reply(StageKind::Review, Some("Looks correct. No issues found."))
        .reply(
            StageKind::Documentation,
            Some("## Code Overview\nAdds numbers.\n\n## Usage Examples\n```python\nadd(1, 2)\n```"),
        )
        .reply(
            StageKind::Tests,
            Some("```python\ndef test_add():\n    assert add(1, 2) == 3\n```"),
        )
        .reply(
            StageKind::Deployment,
            Some("[REQUIREMENTS]\npytest>=7.4\n[SETUP_INSTRUCTIONS]\npip install -r requirements.txt\n[GITHUB_PUSH]\ngit push\n"),
        )
    }

    fn prompts(&self, stage: StageKind) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .get(&stage)
            .cloned()
            .unwrap_or_default()
    }

    fn calls(&self, stage: StageKind) -> usize {
        self.prompts(stage).len()
    }
}

fn stage_of(system: &str) -> StageKind {
    StageKind::ALL
        .into_iter()
        .find(|s| s.spec().preamble == system)
        .expect("unknown preamble")
}

#[async_trait]
impl CompletionService for StageScript {
    async fn complete(&self, req: &CompletionRequest<'_>) -> anyhow::Result<Option<String>> {
        let stage = stage_of(req.system);
        self.prompts
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push(req.prompt.to_string());

        let next = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&stage)
            .and_then(|q| if q.len() > 1 { q.pop_front() } else { q.front().cloned() });
        match next {
            Some(Some(text)) => Ok(Some(text)),
            _ => anyhow::bail!("{stage} backend down"),
        }
    }
}

fn pipeline(script: &Arc<StageScript>) -> Pipeline {
    Pipeline::new(script.clone(), Settings::default())
}

#[tokio::test(start_paused = true)]
async fn full_run_fills_every_slot() {
    let script = Arc::new(StageScript::new().happy_path());
    let mut p = pipeline(&script);

    let report = p.run("Build a function that adds two numbers").await;

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(p.phase(), Phase::Complete);
    assert!(report.ambiguity.is_ambiguous);

    let reqs = report.requirements.as_ref().unwrap();
    assert_eq!(reqs.functional_requirements, vec!["Add two integers"]);
    assert!(!reqs.ambiguity_detected);
    assert!(reqs.assumptions.is_empty());

    assert_eq!(
        report.code.as_deref(),
        Some("def add(a: int, b: int) -> int:\n    return a + b")
    );
    assert_eq!(report.review.as_deref(), Some("Looks correct. No issues found."));
    assert!(report.documentation.as_deref().unwrap().contains("```python\nadd(1, 2)\n```"));
    assert_eq!(
        report.tests.as_deref(),
        Some("def test_add():\n    assert add(1, 2) == 3")
    );

    let deploy = report.deployment.as_ref().unwrap();
    assert_eq!(deploy.requirements, "pytest>=7.4");
    assert_eq!(deploy.github_push, "git push");
    assert_eq!(deploy.hosting_platforms, DEFAULT_HOSTING);

    // Requirements defaulted five fields; deployment defaulted hosting.
    assert_eq!(report.degradations.len(), 2);

    for stage in StageKind::ALL {
        assert_eq!(script.calls(stage), 1, "{stage}");
    }
    let review_prompts = script.prompts(StageKind::Review);
    assert!(review_prompts[0].contains("def add(a: int, b: int)"));
    assert!(review_prompts[0].contains("- Add two integers"));
}

#[tokio::test(start_paused = true)]
async fn follow_up_run_carries_previous_context() {
    let script = Arc::new(StageScript::new().happy_path());
    let mut p = pipeline(&script);

    let first = "Build a function that adds two numbers";
    p.run(first).await;
    assert_eq!(p.context().previous_prompts, vec![first]);

    let second = "Now make it handle invalid input with a clear error";
    let report = p.run(second).await;
    assert!(report.is_success());

    let prompts = script.prompts(StageKind::Requirements);
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("PREVIOUS CONTEXT"));
    assert!(prompts[1].contains("PREVIOUS CONTEXT"));
    assert!(prompts[1].contains(first));
    assert!(prompts[1].contains("Previous functional requirements: Add two integers"));
    assert!(prompts[1].contains("def add(a: int, b: int)"));
    assert!(prompts[1].contains(second));

    assert_eq!(p.context().previous_prompts, vec![first, second]);
}

#[tokio::test(start_paused = true)]
async fn follow_up_disabled_or_reset_drops_context() {
    let script = Arc::new(StageScript::new().happy_path());
    let mut p = pipeline(&script);

    p.run("Build a function that adds two numbers").await;
    p.set_follow_up(false);
    p.run("Second request").await;
    p.set_follow_up(true);
    p.reset();
    p.run("Third request").await;

    let prompts = script.prompts(StageKind::Requirements);
    assert!(prompts.iter().all(|p| !p.contains("PREVIOUS CONTEXT")));
    assert_eq!(p.context().previous_prompts, vec!["Third request"]);
}

#[tokio::test(start_paused = true)]
async fn resumed_context_feeds_first_run() {
    let mut saved = PipelineContext::new();
    saved.record_run(
        "Parse a CSV file",
        RequirementSet {
            functional_requirements: vec!["Read rows".into(), "Skip header".into()],
            ..Default::default()
        },
        "import csv".into(),
    );
    let script = Arc::new(StageScript::new().happy_path());
    let mut p = pipeline(&script).with_context(saved);

    p.run("Also write the rows out as JSON").await;

    let prompt = &script.prompts(StageKind::Requirements)[0];
    assert!(prompt.contains("Previous prompt: Parse a CSV file"));
    assert!(prompt.contains("Previous functional requirements: Read rows, Skip header"));
    assert!(prompt.contains("Previous code summary: import csv"));
}

#[tokio::test(start_paused = true)]
async fn failing_review_keeps_other_results() {
    let script = Arc::new(StageScript::new().happy_path().failing(StageKind::Review));
    let mut p = pipeline(&script);

    let report = p.run("Build a function that adds two numbers").await;

    assert!(!report.is_success());
    assert_eq!(p.phase(), Phase::Failed);
    assert_eq!(report.failed_stage(), Some(StageKind::Review));
    assert_eq!(report.failures.len(), 1);
    let err = &report.failures[0];
    assert!(matches!(&err.kind, StageErrorKind::Invocation(e) if e.attempts == 3));
    assert!(err.to_string().contains("review stage failed"));
    assert!(err.to_string().contains("review backend down"));

    assert_eq!(script.calls(StageKind::Review), 3);
    assert!(report.review.is_none());
    assert!(report.requirements.is_some());
    assert!(report.code.is_some());
    assert!(report.documentation.is_some());
    assert!(report.tests.is_some());
    assert!(report.deployment.is_some());

    // Requirements and code exist, so the run still counts as context.
    assert_eq!(p.context().previous_prompts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_requirements_stop_the_run() {
    let script = Arc::new(StageScript::new());
    let mut p = pipeline(&script);

    let report = p.run("Build a function that adds two numbers").await;

    assert_eq!(report.failed_stage(), Some(StageKind::Requirements));
    assert_eq!(p.phase(), Phase::Failed);
    assert!(report.requirements.is_none());
    assert_eq!(script.calls(StageKind::Requirements), 3);
    assert_eq!(script.calls(StageKind::Coding), 0);
    assert!(!p.context().has_history());
}

#[tokio::test(start_paused = true)]
async fn garbage_requirements_still_reach_coding() {
    let script = Arc::new(
        StageScript::new()
            .reply(StageKind::Requirements, Some("Sure, I'll just add them."))
            .reply(StageKind::Coding, Some("def add(a, b): return a + b"))
            .reply(StageKind::Review, Some("ok"))
            .reply(StageKind::Documentation, Some("## Code Overview"))
            .reply(StageKind::Tests, Some("def test_add(): pass"))
            .reply(StageKind::Deployment, Some("nothing useful")),
    );
    let mut p = pipeline(&script);

    let report = p.run("Build a function that adds two numbers").await;

    assert!(report.is_success(), "{:?}", report.failures);
    let reqs = report.requirements.unwrap();
    assert_eq!(reqs.functional_requirements, vec!["Sure, I'll just add them."]);
    assert!(reqs.ambiguity_detected);
    assert_eq!(report.code.as_deref(), Some("def add(a, b): return a + b"));
    assert_eq!(report.deployment.unwrap(), Default::default());
}

#[tokio::test(start_paused = true)]
async fn empty_code_block_fails_coding() {
    let script = Arc::new(
        StageScript::new()
            .reply(StageKind::Requirements, Some(r#"{"functional_requirements": ["x"]}"#))
            .reply(StageKind::Coding, Some("```python\n```")),
    );
    let mut p = pipeline(&script);

    let report = p.run("Build a function that adds two numbers").await;

    assert_eq!(report.failed_stage(), Some(StageKind::Coding));
    assert_eq!(p.phase(), Phase::Failed);
    assert!(matches!(report.failures[0].kind, StageErrorKind::EmptyOutput));
    assert!(report.requirements.is_some());
    assert!(report.code.is_none());
    assert_eq!(script.calls(StageKind::Review), 0);
    assert!(!p.context().has_history());
}

#[tokio::test]
async fn empty_instruction_runs_nothing() {
    let script = Arc::new(StageScript::new().happy_path());
    let mut p = pipeline(&script);

    let report = p.run("   ").await;

    assert!(matches!(report.failures[0].kind, StageErrorKind::EmptyInput));
    assert!(report.ambiguity.is_ambiguous);
    assert_eq!(script.calls(StageKind::Requirements), 0);
}
