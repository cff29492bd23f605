//! Language markers and script detection for the English-only line filter.
//!
//! The wiki mirrors some pages in other languages and links to them with
//! lines like "हिंदी में देखने के लिए क्लिक करें". Those lines are noise for an
//! English excerpt, so the sanitizer drops them. Two independent signals:
//!
//! - the line contains a letter outside ASCII (Latin Extended, Cyrillic,
//!   Greek, CJK, Indic, Arabic, Hebrew, ...), or
//! - the line names a language from [`LANGUAGE_MARKERS`].
//!
//! Typographic punctuation (curly quotes, dashes, `§`, `…`) is not a letter
//! and does not trigger the script test.

/// Language names and "view in ..." phrases, lower-case.
///
/// ASCII entries match as whole words so that e.g. "sama" does not hit
/// "Good Samaritan". Non-ASCII entries match as substrings (they are also
/// caught by the script test; they stay here so the table is complete).
pub const LANGUAGE_MARKERS: &[&str] = &[
    "हिंदी में देखने के लिए क्लिक करें",
    "हिंदी",
    "click to view in hindi",
    "ver en español",
    "voir en français",
    "auf deutsch",
    "中文",
    "日本語",
    "한국어",
    "русский",
    "العربية",
    "עברית",
    "ελληνικά",
    "português",
    "italiano",
    "nederlands",
    "svenska",
    "norsk",
    "dansk",
    "suomi",
    "polski",
    "čeština",
    "magyar",
    "română",
    "български",
    "hrvatski",
    "slovenščina",
    "slovenský",
    "eesti",
    "latviešu",
    "lietuvių",
    "türkçe",
    "فارسی",
    "اردو",
    "বাংলা",
    "தமிழ்",
    "తెలుగు",
    "मराठी",
    "ગુજરાતી",
    "ಕನ್ನಡ",
    "മലയാളം",
    "ଓଡ଼ିଆ",
    "ਪੰਜਾਬੀ",
    "অসমীয়া",
    "नेपाली",
    "සිංහල",
    "မြန်မာ",
    "ខ្មែរ",
    "ລາວ",
    "ไทย",
    "tiếng việt",
    "bahasa indonesia",
    "bahasa melayu",
    "filipino",
    "tagalog",
    "cebuano",
    "ilokano",
    "hiligaynon",
    "waray",
    "kapampangan",
    "pangasinan",
    "bikol",
    "chavacano",
    "maguindanao",
    "maranao",
    "tausug",
    "yakan",
    "sama",
    "badjao",
];

/// True for letters outside ASCII.
pub fn is_foreign_script_char(ch: char) -> bool {
    !ch.is_ascii() && ch.is_alphabetic()
}

pub fn contains_foreign_script(line: &str) -> bool {
    line.chars().any(is_foreign_script_char)
}

/// First marker from [`LANGUAGE_MARKERS`] found in `line` (case-insensitive).
pub fn matching_marker(line: &str) -> Option<&'static str> {
    let lc = line.to_lowercase();
    LANGUAGE_MARKERS
        .iter()
        .copied()
        .find(|m| contains_marker(&lc, m))
}

pub fn is_non_english_line(line: &str) -> bool {
    contains_foreign_script(line) || matching_marker(line).is_some()
}

fn contains_marker(haystack_lc: &str, marker: &str) -> bool {
    if !marker.is_ascii() {
        return haystack_lc.contains(marker);
    }
    // Whole-word match for Latin-script names.
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric());
    let mut from = 0usize;
    while let Some(rel) = haystack_lc[from..].find(marker) {
        let start = from + rel;
        let end = start + marker.len();
        let before = haystack_lc[..start].chars().next_back();
        let after = haystack_lc[end..].chars().next();
        if !is_word(before) && !is_word(after) {
            return true;
        }
        // Markers are ASCII, so start+1 is a char boundary.
        from = start + 1;
    }
    false
}
