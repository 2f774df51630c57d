//! Terminal rendering of pipeline reports.
//!
//! Each stage speaks as its agent role (`[analyst]`, `[builder]`, ...), with
//! a one-line status per stage followed by a preview of its artifact.

use std::fmt::Write;

use crate::pipeline::PipelineReport;
use crate::stages::StageKind;

const LINE_WIDTH: usize = 100;

/// Append a message with the agent role prefix, wrapping long lines.
pub fn say(out: &mut String, role: &str, text: &str) {
    for line in wrap_lines(text, LINE_WIDTH) {
        let _ = writeln!(out, "[{role}] {line}");
    }
}

/// Append a brief one-line status.
pub fn status(out: &mut String, role: &str, emoji: &str, text: &str) {
    let _ = writeln!(out, "[{role}] {emoji} {text}");
}

/// Append a code preview, truncated to `max_lines`.
pub fn code(out: &mut String, role: &str, filename: &str, content: &str, max_lines: usize) {
    let lines: Vec<&str> = content.lines().collect();
    status(out, role, "📄", &format!("{filename} ({} lines)", lines.len()));
    for line in lines.iter().take(max_lines) {
        let _ = writeln!(out, "  {line}");
    }
    if lines.len() > max_lines {
        let _ = writeln!(out, "  ... ({} more lines)", lines.len() - max_lines);
    }
}

pub fn error(out: &mut String, role: &str, text: &str) {
    status(out, role, "❌", text);
}

fn list(out: &mut String, role: &str, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    say(out, role, &format!("{title}:"));
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

/// Render a whole report. `preview_lines` bounds each artifact preview.
pub fn render_report(report: &PipelineReport, preview_lines: usize) -> String {
    let mut out = String::new();
    let analyst = StageKind::Requirements.spec().role;

    let verdict = &report.ambiguity;
    if verdict.is_ambiguous {
        status(
            &mut out,
            analyst,
            "❓",
            &format!(
                "Request looks underspecified ({} vague term group(s), {} missing topic(s))",
                verdict.vague_terms_found, verdict.missing_specifications
            ),
        );
    }

    if let Some(reqs) = &report.requirements {
        status(
            &mut out,
            analyst,
            "📋",
            &format!("{} functional requirement(s)", reqs.functional_requirements.len()),
        );
        list(&mut out, analyst, "Functional", &reqs.functional_requirements);
        list(&mut out, analyst, "Non-functional", &reqs.non_functional_requirements);
        list(&mut out, analyst, "Assumptions", &reqs.assumptions);
        list(&mut out, analyst, "Constraints", &reqs.constraints);
        list(&mut out, analyst, "Clarifying questions", &reqs.clarifying_questions);
        if reqs.ambiguity_detected && !reqs.ambiguity_notes.is_empty() {
            say(&mut out, analyst, &reqs.ambiguity_notes);
        }
    }

    let artifacts = [
        (StageKind::Coding, "main.py", report.code.as_deref()),
        (StageKind::Review, "review.md", report.review.as_deref()),
        (StageKind::Documentation, "README.md", report.documentation.as_deref()),
        (StageKind::Tests, "test_main.py", report.tests.as_deref()),
        (
            StageKind::Deployment,
            "requirements.txt",
            report.deployment.as_ref().map(|d| d.requirements.as_str()),
        ),
    ];
    for (stage, filename, content) in artifacts {
        if let Some(content) = content {
            code(&mut out, stage.spec().role, filename, content, preview_lines);
        }
    }

    for d in &report.degradations {
        status(
            &mut out,
            "system",
            "⚠️",
            &format!(
                "{} output parsed via {:?}; defaulted: {}",
                d.schema,
                d.strategy,
                d.defaulted.join(", ")
            ),
        );
    }

    for failure in &report.failures {
        error(&mut out, failure.stage.spec().role, &failure.to_string());
    }

    if report.is_success() {
        status(&mut out, "system", "✅", "Pipeline complete");
    } else {
        let done: Vec<String> = StageKind::ALL
            .iter()
            .filter(|s| report.has_output(**s))
            .map(|s| s.to_string())
            .collect();
        let kept = if done.is_empty() {
            "none".to_string()
        } else {
            done.join(", ")
        };
        status(
            &mut out,
            "system",
            "⛔",
            &format!("Pipeline failed; kept results from: {kept}"),
        );
    }
    out
}

/// Wrap text into lines of max_len, breaking on word boundaries.
fn wrap_lines(text: &str, max_len: usize) -> Vec<String> {
    let mut result = Vec::new();
    for line in text.lines() {
        if line.chars().count() <= max_len {
            result.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_len {
                result.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_lines("aaa bbb ccc ddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn wrap_keeps_short_lines_and_long_words() {
        assert_eq!(wrap_lines("short\nline", 10), vec!["short", "line"]);
        assert_eq!(
            wrap_lines("x averyveryverylongword y", 5),
            vec!["x", "averyveryverylongword", "y"]
        );
    }

    #[test]
    fn code_preview_is_truncated() {
        let mut out = String::new();
        code(&mut out, "builder", "main.py", "a\nb\nc\nd", 2);
        assert!(out.contains("[builder] 📄 main.py (4 lines)"));
        assert!(out.contains("  a\n  b\n"));
        assert!(out.contains("... (2 more lines)"));
        assert!(!out.contains("  c\n"));
    }
}
