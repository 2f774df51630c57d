//! Heuristic check for underspecified requests.
//!
//! The verdict is advisory. It shapes the requirement prompt but never stops
//! the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Inputs shorter than this (after trimming) are always ambiguous.
pub const MIN_SPECIFIC_LENGTH: usize = 50;

/// More matches than this in either category marks the input ambiguous.
const THRESHOLD: usize = 2;

static VAGUE_TERMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\b(user-friendly|user friendly)\b",
        r"\b(fast|quick|quickly)\b",
        r"\b(good|better|best)\b",
        r"\b(easy|simple|easily)\b",
        r"\b(nice|nice-looking|pretty)\b",
        r"\b(some|various|multiple|several)\b",
        r"\b(should|could|might|may)\b",
    ])
});

static EXPECTED_TOPICS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\b(input|output)\b",
        r"\b(error|exception|handle)\b",
        r"\b(platform|os|operating system)\b",
        r"\b(performance|speed|time)\b",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern"))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityVerdict {
    pub is_ambiguous: bool,
    /// Number of vague-language patterns that matched at least once.
    pub vague_terms_found: usize,
    /// Number of expected topics (I/O, errors, platform, performance) never mentioned.
    pub missing_specifications: usize,
    /// Character count of the raw input.
    pub input_length: usize,
}

/// Scan a request for vague wording and missing specifications.
pub fn detect(text: &str) -> AmbiguityVerdict {
    let vague = VAGUE_TERMS.iter().filter(|re| re.is_match(text)).count();
    let missing = EXPECTED_TOPICS.iter().filter(|re| !re.is_match(text)).count();
    let too_short = text.trim().chars().count() < MIN_SPECIFIC_LENGTH;

    AmbiguityVerdict {
        is_ambiguous: vague > THRESHOLD || missing > THRESHOLD || too_short,
        vague_terms_found: vague,
        missing_specifications: missing,
        input_length: text.chars().count(),
    }
}
