//! Terminal display width.
//!
//! A single authoritative pair of functions decides how many terminal cells
//! a glyph occupies; no other module consults `unicode-width` directly.
//! The rules, on top of the crate's East-Asian-Width tables:
//!
//! - combining marks, zero-width joiners and variation selectors are width 0,
//! - East-Asian Wide/Fullwidth code points are width 2,
//! - emoji presentation is width 2, including ZWJ sequences which count as
//!   one two-cell glyph rather than the sum of their parts.
//!
//! String width is computed per grapheme cluster so that `"👨‍👩‍👧"` measures 2,
//! not 6. Over-estimating a width costs a blank cell; under-estimating makes
//! every following glyph on the row drift, so ambiguous cases round up.
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

const ZWJ: char = '\u{200D}';
const VS15: char = '\u{FE0E}';
const VS16: char = '\u{FE0F}';

/// Extended-pictographic heuristic covering the primary emoji blocks and
/// the legacy symbols commonly rendered as emoji.
fn is_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

/// Display width of a single code point: 0, 1 or 2.
pub fn char_width(c: char) -> usize {
    if c == ZWJ || c == VS15 || c == VS16 {
        return 0;
    }
    if ('\u{1F300}'..='\u{1FAFF}').contains(&c) {
        return 2;
    }

    // Combining marks and other zero-width code points report `Some(0)`;
    // control characters report `None` and are likewise given no cell.
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Display width of one grapheme cluster.
pub fn cluster_width(cluster: &str) -> usize {
    let mut chars = cluster.chars();
    let Some(first) = chars.next() else { return 0 };

    if chars.clone().next().is_none() {
        return char_width(first);
    }

    // Multi-scalar cluster: ZWJ sequences and emoji-presentation sequences
    // occupy a single double cell.
    let has_zwj = cluster.chars().any(|c| c == ZWJ);
    let has_vs16 = cluster.chars().any(|c| c == VS16);

    if has_zwj || (has_vs16 && is_pictographic(first)) {
        return 2;
    }

    cluster.chars().map(char_width).sum()
}

/// Display width of a string in terminal cells.
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(cluster_width).sum()
}

/// Longest prefix of `s` whose display width does not exceed `max`,
/// cut at a grapheme boundary. A wide glyph that would straddle the limit
/// is dropped entirely.
pub fn truncate(s: &str, max: usize) -> &str {
    let mut used = 0;
    let mut end = 0;

    for (offset, cluster) in s.grapheme_indices(true) {
        let w = cluster_width(cluster);
        if used + w > max {
            break;
        }

        used += w;
        end = offset + cluster.len();
    }

    &s[..end]
}

/// Truncates to `max` cells, marking a cut with `..`.
///
/// Strings that already fit are returned unchanged; `max < 2` yields an
/// empty string because the marker itself would not fit.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }
    if max < 2 {
        return String::new();
    }

    let mut out = truncate(s, max - 2).to_string();
    out.push_str("..");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(display_width("hello"), 5);
    }

    #[test]
    fn cjk_wide() {
        assert_eq!(char_width('你'), 2);
        assert_eq!(char_width('界'), 2);
        assert_eq!(display_width("Hi你好"), 6);
    }

    #[test]
    fn zero_width_combiners() {
        assert_eq!(char_width('\u{0301}'), 0);
        assert_eq!(char_width(ZWJ), 0);
        assert_eq!(display_width("e\u{0301}"), 1);
    }

    #[test]
    fn emoji_basic() {
        assert_eq!(char_width('😀'), 2);
        assert_eq!(display_width("😀"), 2);
    }

    #[test]
    fn emoji_zwj_sequence_is_one_glyph() {
        assert_eq!(display_width("👨\u{200D}👩\u{200D}👧"), 2);
    }

    #[test]
    fn emoji_presentation_selector() {
        assert_eq!(display_width("✈\u{FE0F}"), 2);
    }

    #[test]
    fn truncate_at_boundaries() {
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("你好", 3), "你");
        assert_eq!(truncate("你好", 4), "你好");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn truncate_ellipsis() {
        assert_eq!(truncate_with_ellipsis("request", 5), "req..");
        assert_eq!(truncate_with_ellipsis("req", 5), "req");
        assert_eq!(truncate_with_ellipsis("request", 1), "");
    }
}
