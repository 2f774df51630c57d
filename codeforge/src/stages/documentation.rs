//! Documentation stage. No canned default: failures propagate.

use crate::error::StageError;

use super::{
    RequirementSet, Runner, StageKind, format_requirements, non_empty, unwrap_enclosing_fence,
};

/// Headings the documentation must contain.
pub const MANDATORY_SECTIONS: [&str; 5] = [
    "Code Overview",
    "Module Explanation",
    "Function Definitions",
    "Parameters and Return Types",
    "Usage Examples",
];

pub fn build_prompt(code: &str, reqs: &RequirementSet) -> String {
    let mut prompt = format!(
        "Generate clear, structured Markdown documentation for the following Python code.\n\n\
         ORIGINAL REQUIREMENTS:\n{}\n\
         GENERATED CODE:\n```python\n{}\n```\n\n\
         MANDATORY SECTIONS (use these exact headings):\n",
        format_requirements(reqs),
        code
    );
    for (i, section) in MANDATORY_SECTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. ## {section}\n", i + 1));
    }
    prompt.push_str(
        "\nFunction documentation must include parameter and return types. \
         Usage examples must be runnable. Setup instructions, if any, cover local setup only.",
    );
    prompt
}

/// Mandatory headings absent from `doc` (case-insensitive).
pub fn missing_sections(doc: &str) -> Vec<&'static str> {
    let lower = doc.to_lowercase();
    MANDATORY_SECTIONS
        .iter()
        .copied()
        .filter(|s| !lower.contains(&s.to_lowercase()))
        .collect()
}

pub async fn document(
    runner: &Runner<'_>,
    code: &str,
    reqs: &RequirementSet,
) -> Result<String, StageError> {
    let raw = runner
        .complete(StageKind::Documentation, &build_prompt(code, reqs))
        .await?;
    let doc = non_empty(StageKind::Documentation, unwrap_enclosing_fence(&raw))?;

    let missing = missing_sections(&doc);
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Documentation lacks mandatory sections");
    }
    Ok(doc)
}
