//! Price and currency parsing shared by sorting, enrichment, and totals.

use regex::Regex;
use std::sync::OnceLock;

/// A parsed monetary amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    /// Numeric value with `.` as the decimal point
    pub amount: f64,
    /// ISO 4217 code, when a symbol or code was present
    pub currency: Option<&'static str>,
}

/// Symbols and codes, longest first so `US$` wins over `$`.
const CURRENCY_MARKERS: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("CA$", "CAD"),
    ("AU$", "AUD"),
    ("A$", "AUD"),
    ("NZ$", "NZD"),
    ("R$", "BRL"),
    ("MX$", "MXN"),
    ("EUR", "EUR"),
    ("GBP", "GBP"),
    ("USD", "USD"),
    ("CAD", "CAD"),
    ("AUD", "AUD"),
    ("JPY", "JPY"),
    ("CHF", "CHF"),
    ("SEK", "SEK"),
    ("NOK", "NOK"),
    ("DKK", "DKK"),
    ("PLN", "PLN"),
    ("CZK", "CZK"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("$", "USD"),
];

/// Currency used by buyers in a country, for amounts shown without a symbol.
#[must_use]
pub fn currency_for_country(code: &str) -> Option<&'static str> {
    let currency = match code.to_ascii_uppercase().as_str() {
        "DE" | "FR" | "IT" | "ES" | "NL" | "BE" | "AT" | "IE" | "PT" | "FI" | "GR" | "LU"
        | "SK" | "SI" | "EE" | "LV" | "LT" | "MT" | "CY" | "HR" => "EUR",
        "GB" | "UK" => "GBP",
        "US" => "USD",
        "CA" => "CAD",
        "AU" => "AUD",
        "NZ" => "NZD",
        "JP" => "JPY",
        "CH" => "CHF",
        "SE" => "SEK",
        "NO" => "NOK",
        "DK" => "DKK",
        "PL" => "PLN",
        "CZ" => "CZK",
        "BR" => "BRL",
        "MX" => "MXN",
        _ => return None,
    };
    Some(currency)
}

/// Display prefix for a currency code.
#[must_use]
pub fn currency_symbol(code: &str) -> String {
    match code {
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "USD" => "$".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{other} "),
    }
}

/// Currency named anywhere in `text`.
#[must_use]
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    CURRENCY_MARKERS
        .iter()
        .find(|(marker, _)| contains_marker(&upper, marker))
        .map(|(_, code)| *code)
}

/// Letter codes must stand alone so words like "cadence" do not match.
fn contains_marker(haystack: &str, marker: &str) -> bool {
    if !marker.chars().all(|c| c.is_ascii_alphabetic()) {
        return haystack.contains(marker);
    }
    haystack.match_indices(marker).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + marker.len()..].chars().next();
        !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Space separators only group whole three-digit runs before the decimals
    RE.get_or_init(|| {
        Regex::new(r"\d{1,3}(?:[ \u{a0}\u{202f}]\d{3}\b)+(?:[.,]\d+)?|\d+(?:[.,]\d+)*")
            .expect("valid number regex")
    })
}

/// Normalize a numeric token written with any common separator style.
///
/// The last separator is the decimal point when both `.` and `,` occur. A
/// lone separator followed by exactly three digits groups thousands;
/// otherwise it is the decimal point.
fn normalize_number(token: &str) -> Option<f64> {
    let token: String = token.chars().filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}')).collect();
    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            let (decimal, group) = if dot > comma { ('.', ',') } else { (',', '.') };
            token
                .replace(group, "")
                .replace(decimal, ".")
        }
        (Some(_), None) | (None, Some(_)) => {
            let sep = if last_dot.is_some() { '.' } else { ',' };
            let parts: Vec<&str> = token.split(sep).collect();
            let groups_thousands = parts.len() > 2
                || parts.last().is_some_and(|tail| tail.len() == 3);
            if groups_thousands {
                parts.concat()
            } else {
                parts.join(".")
            }
        }
        (None, None) => token,
    };
    normalized.parse().ok()
}

/// First amount in `text`, e.g. `2,50`, `1.234,56`, or `1,234.56`.
#[must_use]
pub fn parse_amount(text: &str) -> Option<f64> {
    number_re()
        .find(text)
        .and_then(|m| normalize_number(m.as_str()))
}

/// Amount and currency of a displayed price such as `€12.50` or `12,50 EUR`.
#[must_use]
pub fn parse_price(text: &str) -> Option<Money> {
    let amount = parse_amount(text)?;
    Some(Money {
        amount,
        currency: detect_currency(text),
    })
}

/// Round to cents.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
