//! Unit test generation stage.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::StageError;

use super::{
    RequirementSet, Runner, StageKind, extract_code_block, format_requirements, non_empty,
};

static CLASS_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^class\s+(\w+)").expect("static pattern"));
static FUNCTION_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:async\s+)?def\s+(\w+)\s*\(").expect("static pattern"));
static FILE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#+\s*File:\s*([^\n]+\.py)").expect("static pattern"));

/// Top-level classes, functions and file markers found in `code`.
pub fn inventory(code: &str) -> String {
    let mut lines = Vec::new();

    let classes = captures(&CLASS_DEF, code);
    if !classes.is_empty() {
        lines.push(format!("Classes found: {}", classes.join(", ")));
    }
    let functions = captures(&FUNCTION_DEF, code);
    if !functions.is_empty() {
        lines.push(format!("Top-level functions found: {}", functions.join(", ")));
    }
    let files = captures(&FILE_MARKER, code);
    if !files.is_empty() {
        lines.push(format!("Files found: {}", files.join(", ")));
    }

    if lines.is_empty() {
        "Single module detected (no explicit classes or multiple files found)".to_string()
    } else {
        lines.join("\n")
    }
}

fn captures<'a>(re: &Regex, code: &'a str) -> Vec<&'a str> {
    re.captures_iter(code)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

pub fn build_prompt(code: &str, reqs: &RequirementSet) -> String {
    format!(
        "Generate pytest unit tests for the following Python code. \
         Tests must be executable without modification.\n\n\
         ORIGINAL REQUIREMENTS:\n{}\n\
         CODE TO TEST:\n```python\n{}\n```\n\n\
         IDENTIFIED MODULES/CLASSES/FUNCTIONS:\n{}\n\n\
         Write at least one test for each item identified above, covering normal, edge and error cases. \
         Output only the test code in one ```python fenced block.",
        format_requirements(reqs),
        code,
        inventory(code)
    )
}

pub async fn generate(
    runner: &Runner<'_>,
    code: &str,
    reqs: &RequirementSet,
) -> Result<String, StageError> {
    let raw = runner.complete(StageKind::Tests, &build_prompt(code, reqs)).await?;
    non_empty(StageKind::Tests, extract_code_block(&raw))
}
