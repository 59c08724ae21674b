//! Shared patterns for predicate checking.
//!
//! The denylist mirrors the tokens that would let a predicate escape into
//! arbitrary code when predicates are stored as plain strings. The temporal
//! literal patterns decide when a quoted literal is compared as a date.

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // DENYLIST
    // =========================================================================

    /// Banned word tokens, matched case-insensitively on word boundaries.
    static ref BANNED_WORDS: Vec<Regex> = [
        "system", "eval", "parse", "source", "load", "save", "library", "require",
        "return", "function", "for", "while", "repeat", "if",
    ]
    .iter()
    .map(|w| Regex::new(&format!(r"(?i)\b{}\b", w)).unwrap())
    .collect();

    /// Banned punctuation: module-private access, blocks, list indexing, member access.
    static ref BANNED_SYMBOLS: Vec<Regex> = [":::", "{", "}", "[[", "$"]
        .iter()
        .map(|s| Regex::new(&regex::escape(s)).unwrap())
        .collect();

    // =========================================================================
    // TEMPORAL LITERALS
    // =========================================================================

    /// `YYYY-MM-DD`
    pub static ref DATE_PATTERN: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();

    /// `YYYY-MM-DD HH:MM:SS`
    pub static ref DATETIME_PATTERN: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
}

/// Return the first banned pattern found in `predicate`, as it appears there.
pub fn find_banned(predicate: &str) -> Option<String> {
    BANNED_WORDS
        .iter()
        .chain(BANNED_SYMBOLS.iter())
        .find_map(|re| re.find(predicate).map(|m| m.as_str().to_string()))
}

pub fn is_date_literal(s: &str) -> bool {
    DATE_PATTERN.is_match(s)
}

pub fn is_datetime_literal(s: &str) -> bool {
    DATETIME_PATTERN.is_match(s)
}

/// True when `s` has the shape of a date or date-time literal.
pub fn is_temporal_literal(s: &str) -> bool {
    is_date_literal(s) || is_datetime_literal(s)
}

/// Parse a date or date-time string to a timestamp (dates become midnight).
///
/// Accepts the literal shapes above plus an ISO `T` separator, which is how
/// some exports write date-time cells.
pub fn parse_temporal(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
