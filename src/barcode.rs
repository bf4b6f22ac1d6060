//! Barcode canonicalization and price formatting
//!
//! Spreadsheet engines like to store numeric-looking barcodes as floats
//! (`123.0`) and pad them with invisible characters, so every barcode that
//! enters the system goes through [`clean_barcode`] first.

const ZERO_WIDTH_SPACE: char = '\u{200B}';
const NO_BREAK_SPACE: char = '\u{00A0}';

/// Canonicalize a raw barcode value.
///
/// Strips zero-width and no-break spaces, trims whitespace, and collapses any
/// finite number to its integer text (`"00123"` and `"123.0"` both become
/// `"123"`). Anything else passes through trimmed.
pub fn clean_barcode(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| *c != ZERO_WIDTH_SPACE && *c != NO_BREAK_SPACE)
        .collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(digits) = integer_digits(trimmed) {
        return digits;
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            let truncated = value.trunc();
            if truncated == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", truncated)
            }
        }
        _ => trimmed.to_string(),
    }
}

/// Integer literals are normalized textually so long barcodes keep every digit.
fn integer_digits(s: &str) -> Option<String> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = body.trim_start_matches('0');
    if digits.is_empty() {
        return Some("0".to_string());
    }
    if negative {
        Some(format!("-{}", digits))
    } else {
        Some(digits.to_string())
    }
}

/// Remove the currency sign from a price cell
pub fn strip_rrp(raw: &str) -> String {
    raw.replace('$', "").trim().to_string()
}

/// Format a price cell as `$X.XX`, falling back to `$0.00`
pub fn format_rrp(raw: &str) -> String {
    match strip_rrp(raw).parse::<f64>() {
        Ok(value) if value.is_finite() => format!("${:.2}", value),
        _ => "$0.00".to_string(),
    }
}
