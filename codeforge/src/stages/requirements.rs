//! Requirement analysis stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ambiguity::AmbiguityVerdict;
use crate::context::PipelineContext;
use crate::error::StageError;
use crate::parser::{self, FieldSpec, ParseOutcome, Record, Schema};

use super::{Parsed, Runner, StageKind};

/// Structured requirements. Every field is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementSet {
    pub functional_requirements: Vec<String>,
    pub non_functional_requirements: Vec<String>,
    pub assumptions: Vec<String>,
    pub constraints: Vec<String>,
    pub clarifying_questions: Vec<String>,
    pub ambiguity_detected: bool,
    pub ambiguity_notes: String,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::list("functional_requirements", "[FUNCTIONAL_REQUIREMENTS]"),
    FieldSpec::list("non_functional_requirements", "[NON_FUNCTIONAL_REQUIREMENTS]"),
    FieldSpec::list("assumptions", "[ASSUMPTIONS]"),
    FieldSpec::list("constraints", "[CONSTRAINTS]"),
    FieldSpec::list("clarifying_questions", "[CLARIFYING_QUESTIONS]"),
    FieldSpec::flag("ambiguity_detected", "[AMBIGUITY_DETECTED]"),
    FieldSpec::text("ambiguity_notes", "[AMBIGUITY_NOTES]", ""),
];

pub const SCHEMA: Schema = Schema {
    name: "requirements",
    fields: FIELDS,
    fallback: Some(raw_fallback),
};

/// Last resort: keep the raw reply as the single functional requirement.
fn raw_fallback(raw: &str) -> Record {
    let mut rec = Record::new();
    let text = raw.trim();
    if !text.is_empty() {
        rec.insert(
            "functional_requirements".into(),
            Value::Array(vec![Value::String(text.to_string())]),
        );
    }
    rec.insert(
        "assumptions".into(),
        Value::Array(vec![Value::String(
            "Could not parse structured requirements - using raw input".into(),
        )]),
    );
    rec.insert("ambiguity_detected".into(), Value::Bool(true));
    rec.insert(
        "ambiguity_notes".into(),
        Value::String("Structured parsing failed - requirements may be incomplete".into()),
    );
    rec
}

impl RequirementSet {
    pub fn from_outcome(out: &ParseOutcome) -> Self {
        Self {
            functional_requirements: out.list("functional_requirements"),
            non_functional_requirements: out.list("non_functional_requirements"),
            assumptions: out.list("assumptions"),
            constraints: out.list("constraints"),
            clarifying_questions: out.list("clarifying_questions"),
            ambiguity_detected: out.flag("ambiguity_detected"),
            ambiguity_notes: out.text("ambiguity_notes"),
        }
    }
}

/// Parse a model reply into a [`RequirementSet`]. Never fails.
pub fn parse_response(raw: &str) -> Parsed<RequirementSet> {
    let out = parser::parse(raw, &SCHEMA);
    Parsed {
        value: RequirementSet::from_outcome(&out),
        degradation: out.degradation(),
    }
}

/// Compose the analysis prompt.
pub fn build_prompt(input: &str, verdict: &AmbiguityVerdict, context: &PipelineContext) -> String {
    let mut prompt = String::from(
        "Analyze the following user requirement and convert it into structured, actionable software requirements.\n",
    );

    if let Some(summary) = context.summary() {
        prompt.push_str("\nPREVIOUS CONTEXT:\n");
        prompt.push_str(&summary);
    }

    prompt.push_str("\nUSER REQUIREMENT:\n");
    prompt.push_str(input.trim());
    prompt.push('\n');

    if verdict.is_ambiguous {
        prompt.push_str(&format!(
            "\nNOTE: automated screening flagged this request as likely underspecified \
             ({} vague term group(s), {} of 4 expected topics missing: input/output, error handling, platform, performance). \
             Generate clarifying questions and document the assumptions you make.\n",
            verdict.vague_terms_found, verdict.missing_specifications
        ));
    }

    prompt.push_str(
        r#"
TASK:
1. Detect ambiguity: vague terms, missing details, unclear specifications.
2. Generate specific clarifying questions (answer them yourself with reasonable assumptions).
3. Convert the request into clear, testable requirements.

Respond with one JSON object:
{
    "functional_requirements": ["..."],
    "non_functional_requirements": ["..."],
    "assumptions": ["..."],
    "constraints": ["..."],
    "clarifying_questions": ["..."],
    "ambiguity_detected": true,
    "ambiguity_notes": "..."
}"#,
    );
    prompt
}

/// Run the requirement stage. Only an exhausted invocation fails it.
pub async fn analyze(
    runner: &Runner<'_>,
    input: &str,
    verdict: &AmbiguityVerdict,
    context: &PipelineContext,
) -> Result<Parsed<RequirementSet>, StageError> {
    let prompt = build_prompt(input, verdict, context);
    let raw = runner.complete(StageKind::Requirements, &prompt).await?;
    let parsed = parse_response(&raw);

    let reqs = &parsed.value;
    if reqs.ambiguity_detected {
        tracing::info!(
            questions = reqs.clarifying_questions.len(),
            assumptions = reqs.assumptions.len(),
            "Ambiguity detected"
        );
    }
    Ok(parsed)
}
