//! Isolates the JSON payload inside raw model output.
//!
//! Remote chat models are trusted to answer with the bare object. Local models
//! tend to wrap it in code fences, add prose, or echo the schema from the
//! prompt before the real answer, so their output is cleaned aggressively.
//! The cleaning never fails: when nothing usable is found the cleaned text is
//! handed to the parser, which reports a precise error.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::layout::parser::excerpt;

static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```json\s*").expect("valid regex"));
static CLOSING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)```\s*$").expect("valid regex"));
// A schema echo names the field without a concrete boolean.
static SUCCESS_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""success"\s*:\s*(true|false)"#).expect("valid regex"));

const LOG_EXCERPT_CHARS: usize = 200;

pub fn extract_json(raw: &str, wraps_output: bool) -> String {
    if !wraps_output {
        return raw.trim().to_string();
    }

    let without_opening = OPENING_FENCE.replace_all(raw, "");
    let cleaned = CLOSING_FENCE.replace_all(&without_opening, "");
    let cleaned = cleaned.trim();

    if let Some(found) = SUCCESS_VALUE.find(cleaned) {
        return match anchored_span(cleaned, found.start()) {
            Some(span) => {
                info!("extracted model JSON anchored on success flag: {}", excerpt(span, LOG_EXCERPT_CHARS));
                span.to_string()
            }
            // Truncated answer: a nested object must not stand in for it.
            None => {
                warn!("object around success flag never closes, passing cleaned text through");
                cleaned.to_string()
            }
        };
    }

    // Known approximation: an unrelated long brace structure in prose, or a
    // schema echo longer than the answer, wins here.
    if let Some(span) = longest_balanced_span(cleaned) {
        warn!("extracted model JSON via longest-object fallback: {}", excerpt(span, LOG_EXCERPT_CHARS));
        return span.to_string();
    }

    warn!("no balanced JSON object in model output, passing cleaned text through");
    cleaned.to_string()
}

/// The object enclosing the `"success": true|false` found at `flag`.
fn anchored_span(text: &str, flag: usize) -> Option<&str> {
    let start = text[..flag].rfind('{')?;
    balanced_span(text, start)
}

fn longest_balanced_span(text: &str) -> Option<&str> {
    let mut longest: Option<(&str, usize)> = None;
    for (start, _) in text.match_indices('{') {
        if let Some(span) = balanced_span(text, start) {
            let length = span.chars().count();
            if longest.map_or(true, |(_, best)| length > best) {
                longest = Some((span, length));
            }
        }
    }
    longest.map(|(span, _)| span)
}

/// Braces are ASCII, so every index visited is a char boundary.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
