//! Shipping-text parsing.
//!
//! Detail pages show shipping in many languages and formats. Only text that
//! is recognisably about shipping yields a cost; a bare price is not
//! mistaken for one.

use crate::price::{currency_for_country, currency_symbol, detect_currency, parse_amount, round_cents};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Cost label for free shipping.
pub const FREE: &str = "Free";

/// Cost label when no shipping cost could be read.
pub const UNKNOWN: &str = "Unknown";

/// Words that mark a text as being about shipping.
const SHIPPING_KEYWORDS: &[&str] = &[
    "shipping",
    "postage",
    "delivery",
    "versand",
    "porto",
    "envío",
    "envio",
    "livraison",
    "frais de port",
    "spedizione",
    "verzending",
    "frakt",
];

/// A parsed shipping cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCost {
    /// Display value: `"Free"`, `"Unknown"`, or symbol plus amount
    pub cost: String,
    /// Numeric cost, `0.0` for free and unknown
    pub amount: f64,
    /// ISO currency, absent for free and unknown
    pub currency: Option<String>,
}

impl ShippingCost {
    /// Free shipping.
    #[must_use]
    pub fn free() -> Self {
        Self {
            cost: FREE.to_string(),
            amount: 0.0,
            currency: None,
        }
    }

    /// No cost could be read.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            cost: UNKNOWN.to_string(),
            amount: 0.0,
            currency: None,
        }
    }

    /// True unless this is the unknown marker.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.cost != UNKNOWN
    }
}

/// Free-shipping phrases that need no context.
fn free_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:kostenloser versand|(?:free|kostenlos|gratis)\s+(?:shipping|postage|delivery|versand))\b")
            .expect("valid free-shipping regex")
    })
}

/// A bare free word standing alone or right after a shipping label, as in
/// "Versand: gratis" or "Shipping to Japan: free".
fn labelled_free_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let keywords = SHIPPING_KEYWORDS
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(
            r"(?i)^\s*\+?\s*(?:free|kostenlos|gratis)\s*$|(?:{keywords})(?:\s+(?:to|nach|en|a|in)\s+[\p{{L}} ]{{2,30}}?)?\s*[:\-]?\s*(?:free|kostenlos|gratis)\b"
        ))
        .expect("valid labelled free-shipping regex")
    })
}

fn is_free(lower: &str) -> bool {
    free_phrase_re().is_match(lower) || labelled_free_re().is_match(lower)
}

fn is_shipping_text(lower: &str) -> bool {
    lower.trim_start().starts_with('+') || SHIPPING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Parse one shipping text for a buyer in `country` (ISO alpha-2).
///
/// Free phrases short-circuit to [`ShippingCost::free`]; a bare "free" only
/// counts on its own or right after a shipping label. Otherwise the text
/// must mention shipping or start with `+`, and must contain an amount.
/// The currency comes from the matched symbol, else from the country.
#[must_use]
pub fn parse_shipping(text: &str, country: Option<&str>) -> ShippingCost {
    let lower = text.to_lowercase();
    if is_free(&lower) {
        return ShippingCost::free();
    }
    if !is_shipping_text(&lower) {
        return ShippingCost::unknown();
    }

    let Some(amount) = parse_amount(text) else {
        return ShippingCost::unknown();
    };
    let amount = round_cents(amount);
    let currency = detect_currency(text).or_else(|| country.and_then(currency_for_country));

    let cost = match currency {
        Some(code) => format!("{}{amount:.2}", currency_symbol(code)),
        None => format!("{amount:.2}"),
    };
    ShippingCost {
        cost,
        amount,
        currency: currency.map(str::to_string),
    }
}
