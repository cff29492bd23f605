//! Display excerpt selection.
//!
//! Preference order: a sentence boundary inside `max`, then a sentence
//! boundary inside `extended`, then (only when the `max` window is too few
//! words to read) a word boundary inside `max_extended`, then a hard cut.
//! All lengths and positions are in characters.

use serde::{Deserialize, Serialize};

pub const ELLIPSIS: char = '…';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcerptLimits {
    pub max: usize,
    pub extended: usize,
    pub max_extended: usize,
    pub min_words: usize,
}

impl Default for ExcerptLimits {
    fn default() -> Self {
        Self {
            max: 140,
            extended: 200,
            max_extended: 250,
            min_words: 4,
        }
    }
}

impl ExcerptLimits {
    /// Enforce `max <= extended <= max_extended`.
    pub fn normalized(self) -> Self {
        let extended = self.extended.max(self.max);
        Self {
            max: self.max,
            extended,
            max_extended: self.max_extended.max(extended),
            min_words: self.min_words,
        }
    }
}

pub fn to_excerpt(text: &str, limits: &ExcerptLimits) -> String {
    let limits = limits.normalized();
    if text.chars().count() <= limits.max {
        return text.to_string();
    }

    let max_b = byte_at_char(text, limits.max);
    let truncated = &text[..max_b];
    if truncated.ends_with('.') {
        return truncated.to_string();
    }

    // Back off to the last complete sentence.
    if let Some(p) = truncated.rfind('.') {
        if p > 0 {
            return text[..=p].to_string();
        }
    }

    // Run forward to the next sentence end, within `extended`.
    let ext_b = byte_at_char(text, limits.extended);
    if let Some(q) = text[max_b..ext_b].find('.') {
        return text[..=max_b + q].to_string();
    }

    if truncated.split_whitespace().count() < limits.min_words {
        let wide_b = byte_at_char(text, limits.max_extended);
        if let Some(s) = text[max_b..wide_b].find(' ') {
            let s = max_b + s;
            if s > 0 {
                return format!("{}{ELLIPSIS}", &text[..s]);
            }
        }
    }

    format!("{truncated}{ELLIPSIS}")
}

/// Byte offset of the `n`th char, or `text.len()` past the end.
fn byte_at_char(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lim() -> ExcerptLimits {
        ExcerptLimits::default()
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        assert_eq!(to_excerpt("Short text.", &lim()), "Short text.");
        assert_eq!(to_excerpt("", &lim()), "");
    }

    #[test]
    fn backs_off_to_sentence_inside_window() {
        // First period at index 90, 300 chars total.
        let mut text = "a".repeat(90);
        text.push('.');
        text.push_str(&" word".repeat(42));
        text.truncate(300);
        assert_eq!(text.len(), 300);
        assert_eq!(to_excerpt(&text, &lim()), &text[..91]);
    }

    #[test]
    fn window_ending_on_period_is_kept_as_is() {
        let mut text = "b".repeat(139);
        text.push('.');
        text.push_str(&"c".repeat(60));
        assert_eq!(to_excerpt(&text, &lim()), &text[..140]);
    }

    #[test]
    fn runs_forward_to_next_period_within_extended() {
        let mut text = "word ".repeat(34); // 170 chars, no period
        text.insert(170, '.');
        text.push_str(&"tail ".repeat(20));
        assert_eq!(to_excerpt(&text, &lim()), &text[..171]);
    }

    #[test]
    fn few_words_extends_to_next_space() {
        // No periods; first 140 chars are one "word"; first space at 155.
        let mut text = "x".repeat(155);
        text.push(' ');
        text.push_str(&"y".repeat(144));
        assert_eq!(text.len(), 300);
        assert_eq!(to_excerpt(&text, &lim()), format!("{}…", &text[..155]));
    }

    #[test]
    fn enough_words_gets_hard_cut_with_ellipsis() {
        let text = "word ".repeat(60);
        let out = to_excerpt(&text, &lim());
        assert_eq!(out, format!("{}…", &text[..140]));
    }

    #[test]
    fn few_words_without_space_in_wide_window_falls_back_to_hard_cut() {
        let text = "z".repeat(300);
        assert_eq!(to_excerpt(&text, &lim()), format!("{}…", "z".repeat(140)));
    }

    #[test]
    fn leading_period_only_does_not_count_as_sentence() {
        let mut text = String::from(".");
        text.push_str(&"q".repeat(299));
        assert_eq!(to_excerpt(&text, &lim()), format!("{}…", &text[..140]));
    }

    #[test]
    fn counts_chars_not_bytes() {
        let text = "é".repeat(141);
        let out = to_excerpt(&text, &lim());
        assert_eq!(out.chars().count(), 141);
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn normalized_orders_limits() {
        let l = ExcerptLimits {
            max: 100,
            extended: 50,
            max_extended: 10,
            min_words: 2,
        }
        .normalized();
        assert_eq!((l.max, l.extended, l.max_extended), (100, 100, 100));
    }

    proptest! {
        #[test]
        fn excerpt_never_exceeds_max_extended_plus_ellipsis(text in "[a-z .]{0,400}") {
            let l = lim();
            let out = to_excerpt(&text, &l);
            prop_assert!(out.chars().count() <= l.max_extended + 1);
        }

        #[test]
        fn text_within_max_is_a_fixed_point(text in "\\PC{0,140}") {
            prop_assert_eq!(to_excerpt(&text, &lim()), text);
        }

        #[test]
        fn sentence_terminated_excerpts_are_idempotent(text in "[a-z .]{0,400}") {
            let l = lim();
            let once = to_excerpt(&text, &l);
            if !once.ends_with(ELLIPSIS) {
                prop_assert_eq!(to_excerpt(&once, &l), once);
            }
        }

        #[test]
        fn excerpt_is_a_prefix_of_the_input(text in "\\PC{0,400}") {
            let out = to_excerpt(&text, &lim());
            let body = out.strip_suffix(ELLIPSIS).unwrap_or(&out);
            prop_assert!(text.starts_with(body));
        }
    }
}
