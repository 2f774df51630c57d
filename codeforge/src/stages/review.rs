//! Code review stage. No canned default: failures propagate.

use crate::error::StageError;

use super::{
    RequirementSet, Runner, StageKind, format_requirements, non_empty, unwrap_enclosing_fence,
};

pub fn build_prompt(code: &str, reqs: &RequirementSet) -> String {
    format!(
        "Review the following Python code against its requirements.\n\n\
         ORIGINAL REQUIREMENTS:\n{}\n\
         CODE UNDER REVIEW:\n```python\n{}\n```\n\n\
         Report whether every functional requirement is met, then list concrete issues and fixes.",
        format_requirements(reqs),
        code
    )
}

pub async fn review(
    runner: &Runner<'_>,
    code: &str,
    reqs: &RequirementSet,
) -> Result<String, StageError> {
    let raw = runner.complete(StageKind::Review, &build_prompt(code, reqs)).await?;
    non_empty(StageKind::Review, unwrap_enclosing_fence(&raw))
}
