//! Theme extraction from free-form model text
//!
//! Model output is rarely pure JSON: it gets wrapped in prose or code fences,
//! autoformatted with smart quotes, or written with bare keys. Extraction is
//! an ordered list of strategies, each a pure function returning an optional
//! theme; the first one that yields a theme wins.

use crate::models::ThemeConfig;
use serde_json::{Map, Value};

type Strategy = fn(&str) -> Option<ThemeConfig>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("brace candidates", from_brace_candidates),
    ("first/last brace span", from_outer_span),
];

const VALID_ESCAPES: &[char] = &['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// Pull a theme object out of one block of model text.
pub fn extract(text: &str) -> Option<ThemeConfig> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let theme = strategy(text)?;
        tracing::debug!("Extracted theme '{}' using {}", theme.name, name);
        Some(theme)
    })
}

/// Try each text part on its own, then all of them joined, for models that
/// split one object across parts.
pub fn extract_from_parts(parts: &[String]) -> Option<ThemeConfig> {
    parts.iter().find_map(|p| extract(p)).or_else(|| {
        if parts.len() > 1 {
            extract(&parts.join("\n"))
        } else {
            None
        }
    })
}

fn from_brace_candidates(text: &str) -> Option<ThemeConfig> {
    brace_candidates(text).into_iter().find_map(|candidate| {
        parse_strict(candidate).or_else(|| parse_strict(&repair(candidate)))
    })
}

/// Last resort: the repaired outer span, with a blank name tolerated.
fn from_outer_span(text: &str) -> Option<ThemeConfig> {
    let span = outer_span(text)?;
    let value: Value = serde_json::from_str(&repair(span)).ok()?;
    let object = value.as_object()?;
    if !has_colors(object) {
        return None;
    }
    ThemeConfig::from_json_object(object.clone())
}

/// Span from the first `{` to the last `}`.
fn outer_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Every balanced `{...}` span, whichever `{` it opens at, plus the greedy
/// outer span, de-duplicated, longest first. A stray `{` that never closes
/// only loses its own span. Braces inside string literals don't count.
fn brace_candidates(text: &str) -> Vec<&str> {
    let mut spans: Vec<&str> = text
        .char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(start, _)| balanced_span(text, start))
        .collect();

    spans.extend(outer_span(text));
    spans.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let mut unique: Vec<&str> = Vec::with_capacity(spans.len());
    for span in spans {
        if !unique.contains(&span) {
            unique.push(span);
        }
    }
    unique
}

/// The span from the `{` at `start` to its matching `}`, if it closes.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn non_empty_str(object: &Map<String, Value>, key: &str) -> bool {
    object
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn has_colors(object: &Map<String, Value>) -> bool {
    non_empty_str(object, "background_color") && non_empty_str(object, "text_color")
}

fn has_identifying_fields(object: &Map<String, Value>) -> bool {
    (non_empty_str(object, "theme_name") || non_empty_str(object, "name")) && has_colors(object)
}

/// Parses `candidate` and accepts it only if it carries the fields that
/// identify a theme; partial objects fall through to the next candidate.
fn parse_strict(candidate: &str) -> Option<ThemeConfig> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let Value::Object(object) = value else {
        return None;
    };
    if !has_identifying_fields(&object) {
        return None;
    }
    ThemeConfig::from_json_object(object)
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{FF02}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect()
}

fn is_key_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '$')
}

fn expects_key(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from..].iter().copied().find(|c| !c.is_whitespace())
}

/// Fixes the malformations models commonly produce:
/// smart quotes, single-quoted strings, bare keys, invalid escapes,
/// raw control characters inside strings and trailing commas.
pub fn repair(candidate: &str) -> String {
    let chars: Vec<char> = normalize_quotes(candidate).chars().collect();
    let mut out = String::with_capacity(chars.len() + 16);
    // Delimiter of the string we're inside, if any.
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(delim) = quote {
            match c {
                '\\' => match chars.get(i + 1).copied() {
                    Some('\'') => {
                        out.push('\'');
                        i += 1;
                    }
                    Some(next) if VALID_ESCAPES.contains(&next) => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                    _ => out.push_str("\\\\"),
                },
                c if c == delim => {
                    out.push('"');
                    quote = None;
                }
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push('"');
            }
            ',' if matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) => {}
            c if is_key_start(c) && expects_key(&out) => {
                let end = chars[i..]
                    .iter()
                    .position(|&k| !is_key_char(k))
                    .map_or(chars.len(), |offset| i + offset);
                let key: String = chars[i..end].iter().collect();
                if next_significant(&chars, end) == Some(':') {
                    out.push('"');
                    out.push_str(&key);
                    out.push('"');
                } else {
                    out.push_str(&key);
                }
                i = end;
                continue;
            }
            c => out.push(c),
        }
        i += 1;
    }

    out
}
