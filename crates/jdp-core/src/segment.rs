//! Pick the line of a sanitized extract that actually defines the term.
//!
//! Wiki extracts usually open with review metadata, a "What is X?" heading,
//! and only then the definition. The walk below skips the noise and returns
//! a single representative line (or a short concatenation when that line is
//! too terse to stand on its own).

use regex::Regex;
use std::sync::LazyLock;

pub const FALLBACK_MESSAGE: &str = "Definition content not available.";

const MIN_LINE_CHARS: usize = 10;
const MIN_ANSWER_CHARS: usize = 15;
const MIN_WORDS: usize = 4;
const MAX_COMBINED_CHARS: usize = 200;
const MAX_EXTRA_LINES: usize = 2;

static METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Content on this page has been reviewed|Reviewed by:|Last updated:|Reviewed !)")
        .expect("metadata regex")
});
static NAV_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Table of contents|Contents|Navigation|References|See also)$")
        .expect("nav header regex")
});
static SINGLE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+$").expect("single word regex"));
static QUESTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^What is").expect("question heading regex"));
static REVIEWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Reviewed").expect("reviewed regex"));

/// Kind of a candidate line, as seen by the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Too short, a navigation header, or a lone capitalized word.
    Skip,
    /// "What is X" / "What is X?".
    Question,
    Content,
}

pub fn is_metadata(line: &str) -> bool {
    METADATA.is_match(line)
}

pub fn is_nav_header(line: &str) -> bool {
    NAV_HEADER.is_match(line)
}

pub fn is_question_heading(line: &str) -> bool {
    QUESTION_HEADING.is_match(line)
}

pub fn classify(line: &str) -> LineKind {
    let n = line.chars().count();
    if n < MIN_LINE_CHARS || is_nav_header(line) || (SINGLE_WORD.is_match(line) && n < 20) {
        LineKind::Skip
    } else if is_question_heading(line) {
        LineKind::Question
    } else {
        LineKind::Content
    }
}

/// Trimmed, non-empty, non-metadata lines.
pub fn candidate_lines(sanitized: &str) -> Vec<&str> {
    sanitized
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_metadata(l))
        .collect()
}

/// The query term does not steer selection: the walk is purely positional.
/// It is accepted so callers can log or extend the heuristic per term.
pub fn select_content_line(sanitized: &str, _query_term: &str) -> String {
    let lines = candidate_lines(sanitized);
    let Some(first) = lines.first() else {
        return FALLBACK_MESSAGE.to_string();
    };

    let (idx, selected) = find_selected(&lines).unwrap_or((0, *first));
    ensure_min_words(selected, &lines[idx + 1..])
}

fn find_selected<'a>(lines: &[&'a str]) -> Option<(usize, &'a str)> {
    for (i, line) in lines.iter().enumerate() {
        match classify(line) {
            LineKind::Skip => continue,
            LineKind::Content => return Some((i, *line)),
            LineKind::Question => {
                let answer = lines
                    .iter()
                    .enumerate()
                    .skip(i + 1)
                    .find(|(_, l)| is_answer_line(l));
                if let Some((j, l)) = answer {
                    return Some((j, *l));
                }
            }
        }
    }
    None
}

fn is_answer_line(line: &str) -> bool {
    line.chars().count() >= MIN_ANSWER_CHARS
        && !is_nav_header(line)
        && !is_question_heading(line)
        && !REVIEWED.is_match(line)
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Append up to two following substantial lines when `selected` is too terse.
fn ensure_min_words(selected: &str, following: &[&str]) -> String {
    if word_count(selected) >= MIN_WORDS {
        return selected.to_string();
    }
    let mut combined = selected.to_string();
    let extra = following
        .iter()
        .filter(|l| l.chars().count() >= MIN_LINE_CHARS)
        .take(MAX_EXTRA_LINES);
    for line in extra {
        combined.push(' ');
        combined.push_str(line);
        if combined.chars().count() >= MAX_COMBINED_CHARS {
            combined = combined.chars().take(MAX_COMBINED_CHARS).collect();
            combined.push(crate::excerpt::ELLIPSIS);
            break;
        }
        if word_count(&combined) >= MIN_WORDS {
            break;
        }
    }
    if word_count(&combined) >= MIN_WORDS {
        combined
    } else {
        selected.to_string()
    }
}
