use chrono::NaiveDate;
use serde_json::Value;

/// Characters stripped outright before any other cleaning. These show up in
/// exports that passed through spreadsheets or web clipboards.
const ZERO_WIDTH_CHARS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

const FULL_WIDTH_SPACE: char = '\u{3000}';

const TRUTHY_TOKENS: [&str; 5] = ["true", "yes", "y", "1", "是"];
const FALSY_TOKENS: [&str; 5] = ["false", "no", "n", "0", "否"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Canonicalizes a text value in a single pass: drops zero-width characters,
/// converts full-width spaces to ASCII spaces, collapses whitespace runs to a
/// single space and trims both ends. Running it twice yields the same result.
///
/// # Examples
/// - "  成都\u{3000}\u{3000}分公司  " becomes "成都 分公司"
/// - "\u{FEFF}fleet\u{200B}" becomes "fleet"
pub fn clean_text(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.chars() {
        if ZERO_WIDTH_CHARS.contains(&ch) {
            continue;
        }
        let ch = if ch == FULL_WIDTH_SPACE { ' ' } else { ch };

        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !cleaned.is_empty() {
                cleaned.push(' ');
            }
            pending_space = false;
            cleaned.push(ch);
        }
    }

    cleaned
}

/// Extracts a cleaned text dimension, treating anything that is not a string
/// or number as absent. Numeric organization codes and the like are kept as
/// their decimal representation.
pub fn text_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => clean_text(s),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Like [`text_or_empty`] but keeps absence observable: blank or missing
/// values become `None` instead of an empty string.
pub fn optional_text(value: Option<&Value>) -> Option<String> {
    let text = text_or_empty(value);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn numeric_value(value: Option<&Value>) -> Option<f64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let cleaned = clean_text(s).replace(',', "");
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };

    parsed.filter(|v| v.is_finite())
}

/// Parses a monetary or numeric field, accepting JSON numbers and strings
/// with thousands separators. Missing, unparsable or non-finite values fall
/// back to `default`.
pub fn parse_f64_or(value: Option<&Value>, default: f64) -> f64 {
    numeric_value(value).unwrap_or(default)
}

/// Parses an integer field through the same numeric path as [`parse_f64_or`],
/// truncating any fractional part. Used for fields that are validated against
/// a range afterwards, so out-of-range values survive parsing intact.
pub fn parse_i64_or(value: Option<&Value>, default: i64) -> i64 {
    match numeric_value(value) {
        Some(v) => v as i64,
        None => default,
    }
}

/// Parses a count field. Negative or unparsable values fall back to `default`.
pub fn parse_u32_or(value: Option<&Value>, default: u32) -> u32 {
    match numeric_value(value) {
        Some(v) if v >= 0.0 => v as u32,
        _ => default,
    }
}

/// Parses a boolean flag from the vocabulary used across upstream exports:
/// native booleans, numbers (non-zero is true), and the case-insensitive
/// tokens true/false, yes/no, y/n, 1/0 plus their localized equivalents.
/// Anything outside the vocabulary falls back to `default`.
pub fn parse_bool_or(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(default),
        Some(Value::String(s)) => {
            let token = clean_text(s).to_lowercase();
            if TRUTHY_TOKENS.contains(&token.as_str()) {
                true
            } else if FALSY_TOKENS.contains(&token.as_str()) {
                false
            } else {
                default
            }
        }
        _ => default,
    }
}

/// Normalizes a date string to YYYY-MM-DD. Accepts dashed, slashed and dotted
/// variants, with or without zero padding. Returns `None` for anything that
/// does not parse as a real calendar date.
pub fn normalize_date_string(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    None
}

/// Extracts a normalized date field. Non-string values and unparsable dates
/// become an empty string, never an error.
pub fn date_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => normalize_date_string(s).unwrap_or_default(),
        _ => String::new(),
    }
}
