//! Title/author extraction from invoice line descriptions.
//!
//! # Responsibility
//! - Split a free-text description into a best-guess `(title, author)` pair.
//! - Decide which captured part is the personal name.
//!
//! # Invariants
//! - Never fails; unmatched input degrades to `title = input.trim()`.
//! - Patterns are tried in declaration order and the first match wins.
//! - Each pattern's first group is lazy, so the split falls at the first
//!   separator occurrence.

use crate::model::attribution::AttributionResult;
use once_cell::sync::Lazy;
use regex::Regex;

static ATTRIBUTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)LIBRO:\s*(.+?)\s+-\s+(.+)$",
        r"(?is)^(.+?)\s+por\s+(.+)$",
        r"(?s)^(.+?)\s+/\s+(.+)$",
        r"(?s)^(.+?),\s*(.+)$",
        r"(?s)^(.+?)\s+-\s+(.+)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid attribution regex"))
    .collect()
});

static NAME_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Lu}\p{Ll}+$").expect("valid name token regex"));

const NAME_MIN_TOKENS: usize = 2;
const NAME_MAX_TOKENS: usize = 4;

/// Extracts a best-guess title and author from an invoice line description.
///
/// The part that looks like a personal name becomes the author only when the
/// other part does not; any other combination keeps the first part as title.
pub fn extract_title_and_author(description: &str) -> AttributionResult {
    for pattern in ATTRIBUTION_PATTERNS.iter() {
        let Some(caps) = pattern.captures(description) else {
            continue;
        };
        let (Some(first), Some(second)) = (caps.get(1), caps.get(2)) else {
            continue;
        };

        let part1 = first.as_str().trim();
        let part2 = second.as_str().trim();
        if looks_like_person_name(part1) && !looks_like_person_name(part2) {
            return AttributionResult::with_author(part2, part1);
        }
        return AttributionResult::with_author(part1, part2);
    }

    AttributionResult::title_only(description.trim())
}

/// Returns whether `value` reads like `Nombre Apellido`.
///
/// Splits on single spaces; 2 to 4 tokens, each one uppercase letter followed
/// by lowercase letters only.
pub fn looks_like_person_name(value: &str) -> bool {
    let tokens: Vec<&str> = value.split(' ').collect();
    (NAME_MIN_TOKENS..=NAME_MAX_TOKENS).contains(&tokens.len())
        && tokens.iter().all(|token| NAME_TOKEN_RE.is_match(token))
}
