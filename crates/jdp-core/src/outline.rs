//! Structure a full page extract into headings, questions and paragraphs.
//!
//! Used for the "read more" view: the excerpt pipeline picks one line, this
//! keeps all of them but groups them into display blocks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    Question,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionBlock {
    pub kind: BlockKind,
    pub text: String,
}

const QUESTION_PREFIXES: &[&str] = &["What is", "Who is", "How", "Why", "When", "Where"];

fn is_heading(line: &str) -> bool {
    let n = line.chars().count();
    if n >= 100 {
        return false;
    }
    let all_caps = line == line.to_uppercase() && n > 3;
    line.ends_with(':') || all_caps
}

fn is_question(line: &str) -> bool {
    QUESTION_PREFIXES.iter().any(|p| line.starts_with(p))
}

pub fn classify_line(line: &str) -> BlockKind {
    if is_heading(line) {
        BlockKind::Heading
    } else if is_question(line) {
        BlockKind::Question
    } else {
        BlockKind::Paragraph
    }
}

/// Group `content` into blocks; consecutive paragraph lines are joined.
pub fn outline(content: &str) -> Vec<DefinitionBlock> {
    let mut out: Vec<DefinitionBlock> = Vec::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let kind = classify_line(line);
        match (kind, out.last_mut()) {
            (BlockKind::Paragraph, Some(last)) if last.kind == BlockKind::Paragraph => {
                last.text.push(' ');
                last.text.push_str(line);
            }
            _ => out.push(DefinitionBlock {
                kind,
                text: line.to_string(),
            }),
        }
    }
    out
}

/// Plain-text rendering: blank line between blocks, headings underlined.
pub fn render_text(blocks: &[DefinitionBlock]) -> String {
    let mut parts = Vec::with_capacity(blocks.len());
    for b in blocks {
        let s = match b.kind {
            BlockKind::Heading => {
                let rule = "-".repeat(b.text.chars().count().min(60));
                format!("{}\n{rule}", b.text)
            }
            BlockKind::Question => format!("> {}", b.text),
            BlockKind::Paragraph => b.text.clone(),
        };
        parts.push(s);
    }
    parts.join("\n\n")
}
