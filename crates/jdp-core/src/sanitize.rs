//! Raw API text -> sanitized text.
//!
//! Input is either a search snippet (HTML with `<span class="searchmatch">`)
//! or a plain-text page extract. Output has no HTML, no wiki markup, and no
//! lines that look non-English; lines are joined with `\n`.

use crate::languages;
use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z!/][^<>]*>").expect("html tag regex"));
static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\]\n]+\]\]").expect("wiki link regex"));
static WIKI_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}\n]+\}\}").expect("wiki template regex"));
static WIKI_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==+[^=\n]*==+").expect("wiki heading regex"));
static HTML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("html entity regex")
});
static EQ_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"={2,}").expect("eq run regex"));

pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    if looks_like_html(raw) {
        return sanitize_snippet(raw);
    }
    let text = if HTML_ENTITY.is_match(raw) {
        raw.lines().map(html_text).collect::<Vec<_>>().join("\n")
    } else {
        raw.to_string()
    };
    let text = strip_wiki_markup(&text);
    let text = text.lines().map(collapse_ws).collect::<Vec<_>>().join("\n");
    filter_english(text.trim())
}

/// Search snippets are always escaped HTML, tags or not: decode, then one line.
pub fn sanitize_snippet(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let text = strip_wiki_markup(&html_text(raw));
    filter_english(&collapse_ws(&text))
}

/// Best-effort: does this string contain at least one HTML tag?
pub fn looks_like_html(s: &str) -> bool {
    HTML_TAG.is_match(s)
}

/// Text content of an HTML fragment (entities decoded, tags dropped).
pub fn html_text(html: &str) -> String {
    let frag = html_scraper::Html::parse_fragment(html);
    frag.root_element().text().collect::<String>()
}

/// Remove `[[...]]`, `{{...}}` and `==...==`, then any unpaired leftovers.
///
/// Repeats until stable: removing one sequence can join two halves of
/// another (e.g. `[{{x}}[`).
pub fn strip_wiki_markup(s: &str) -> String {
    let mut cur = s.to_string();
    loop {
        let next = WIKI_LINK.replace_all(&cur, "");
        let next = WIKI_TEMPLATE.replace_all(&next, "");
        let next = WIKI_HEADING.replace_all(&next, "");
        let next = EQ_RUN.replace_all(&next, "");
        let next = next
            .replace("[[", "")
            .replace("]]", "")
            .replace("{{", "")
            .replace("}}", "");
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only lines that look English; trimmed, non-empty, `\n`-joined.
pub fn filter_english(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !languages::is_non_english_line(l))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_and_blank_inputs_sanitize_to_empty() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n\t "), "");
    }

    #[test]
    fn drops_devanagari_line_and_keeps_english_line() {
        let raw = "Prayer के बारे में जानकारी\nPrayer is a formal request to a court.";
        assert_eq!(sanitize(raw), "Prayer is a formal request to a court.");
    }

    #[test]
    fn drops_cyrillic_and_cjk_only_lines() {
        let raw = "Судебный приказ\nA writ is a formal written order.\n法院命令";
        assert_eq!(sanitize(raw), "A writ is a formal written order.");
    }

    #[test]
    fn snippet_html_becomes_one_clean_line() {
        let raw = "<span class=\"searchmatch\">Bail</span> is the   release\nof an &quot;accused&quot; person [[Category:Criminal law]]";
        assert_eq!(sanitize(raw), "Bail is the release of an \"accused\" person");
    }

    #[test]
    fn plain_extract_keeps_line_boundaries() {
        let raw = "== Overview ==\nWhat is Bail?\n  Bail   is the conditional   release.  \n\n{{Infobox}}See also";
        assert_eq!(
            sanitize(raw),
            "What is Bail?\nBail is the conditional release.\nSee also"
        );
    }

    #[test]
    fn markup_never_pairs_across_lines() {
        let raw = "Where x == y the rule applies to every accused person.\n\
                   Bail is the conditional release of an accused person.\n\
                   == See also ==";
        assert_eq!(
            sanitize(raw),
            "Where x y the rule applies to every accused person.\n\
             Bail is the conditional release of an accused person."
        );

        let raw = "A [[stray opener\nBail is a surety.]] tail\n{{ open\nWrit is an order.}}";
        let out = sanitize(raw);
        assert_eq!(out.lines().count(), 4, "{out}");
        assert!(out.contains("Bail is a surety."));
        assert!(out.contains("Writ is an order."));
    }

    #[test]
    fn snippet_without_tags_is_still_decoded() {
        let raw = "A &quot;bail bond&quot; is an undertaking &amp; surety";
        assert_eq!(
            sanitize_snippet(raw),
            "A \"bail bond\" is an undertaking & surety"
        );
        assert_eq!(sanitize(raw), "A \"bail bond\" is an undertaking & surety");
    }

    #[test]
    fn snippet_is_always_one_line() {
        let raw = "Bail is the release\nof an &#39;accused&#39; person";
        assert_eq!(sanitize_snippet(raw), "Bail is the release of an 'accused' person");
        assert_eq!(sanitize_snippet("  "), "");
    }

    #[test]
    fn extract_entities_are_decoded_per_line() {
        let raw = "Bail &amp; surety\nA bond is an undertaking to pay.";
        assert_eq!(sanitize(raw), "Bail & surety\nA bond is an undertaking to pay.");
    }

    #[test]
    fn unpaired_markup_is_removed_too() {
        let out = strip_wiki_markup("a [{{x}}[ b == c }} d");
        assert!(!out.contains("[["));
        assert!(!out.contains("{{"));
        assert!(!out.contains("}}"));
        assert!(!out.contains("=="));
    }

    #[test]
    fn language_marker_lines_are_dropped() {
        let raw = "Click to view in Hindi\nAffidavit means a sworn written statement.";
        assert_eq!(sanitize(raw), "Affidavit means a sworn written statement.");
    }

    proptest! {
        #[test]
        fn sanitized_output_has_no_markup_sequences(
            prefix in ".{0,40}",
            x in "[a-z ]{1,10}",
            y in "[a-z ]{1,10}",
            z in "[a-z ]{1,10}",
            suffix in ".{0,40}",
        ) {
            let raw = format!("{prefix}[[{x}]] {{{{{y}}}}} =={z}== {suffix}");
            let out = sanitize(&raw);
            prop_assert!(!out.contains("[["));
            prop_assert!(!out.contains("{{"));
            prop_assert!(!out.contains("=="));
            let link = format!("[[{x}]]");
            let template = format!("{{{{{y}}}}}");
            let heading = format!("=={z}==");
            prop_assert!(!out.contains(&link));
            prop_assert!(!out.contains(&template));
            prop_assert!(!out.contains(&heading));
        }

        #[test]
        fn sanitize_is_total_and_never_yields_foreign_lines(s in "\\PC{0,200}") {
            let out = sanitize(&s);
            for line in out.lines() {
                prop_assert!(!languages::is_non_english_line(line));
                prop_assert_eq!(line, line.trim());
                prop_assert!(!line.is_empty());
            }
        }
    }
}
