//! Code generation stage.

use crate::error::StageError;

use super::{
    RequirementSet, Runner, StageKind, extract_code_block, format_requirements, non_empty,
    push_bullets,
};

pub fn build_prompt(request: &str, reqs: &RequirementSet) -> String {
    let mut prompt = format!(
        "Implement the following request in Python.\n\nUSER REQUEST:\n{}\n\n{}",
        request.trim(),
        format_requirements(reqs)
    );
    if !reqs.assumptions.is_empty() {
        prompt.push_str("\nASSUMPTIONS:\n");
        push_bullets(&mut prompt, &reqs.assumptions);
    }
    if !reqs.constraints.is_empty() {
        prompt.push_str("\nCONSTRAINTS:\n");
        push_bullets(&mut prompt, &reqs.constraints);
    }
    prompt.push_str(
        "\nWrite complete, runnable code that satisfies every functional requirement. \
         Output only the code in one ```python fenced block.",
    );
    prompt
}

/// Generate code for the analyzed requirements.
pub async fn generate(
    runner: &Runner<'_>,
    request: &str,
    reqs: &RequirementSet,
) -> Result<String, StageError> {
    let raw = runner.complete(StageKind::Coding, &build_prompt(request, reqs)).await?;
    non_empty(StageKind::Coding, extract_code_block(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_assumptions_and_constraints() {
        let reqs = RequirementSet {
            functional_requirements: vec!["Add two integers".into()],
            assumptions: vec!["Integers only".into()],
            constraints: vec!["No third-party packages".into()],
            ..Default::default()
        };
        let prompt = build_prompt("adder", &reqs);
        assert!(prompt.contains("USER REQUEST:\nadder"));
        assert!(prompt.contains("- Add two integers"));
        assert!(prompt.contains("ASSUMPTIONS:\n- Integers only"));
        assert!(prompt.contains("CONSTRAINTS:\n- No third-party packages"));
    }

    #[test]
    fn empty_lists_are_omitted() {
        let prompt = build_prompt("adder", &RequirementSet::default());
        assert!(!prompt.contains("ASSUMPTIONS"));
        assert!(!prompt.contains("CONSTRAINTS"));
    }
}
