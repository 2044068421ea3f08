//! Helpers shared by the HTML-scraping providers.

use crate::error::{Result, SearchError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Markers of a captcha or challenge page served instead of results.
const BOT_WALL_MARKERS: &[&str] = &[
    "g-recaptcha",
    "h-captcha",
    "cf-challenge",
    "challenge-platform",
    "are you a robot",
    "verify you are human",
];

/// Fail when the page is a bot wall rather than a result page.
pub fn ensure_not_bot_wall(provider: &str, html: &str) -> Result<()> {
    let lower = html.to_lowercase();
    if BOT_WALL_MARKERS.iter().any(|m| lower.contains(m)) {
        return Err(SearchError::BotBlocked(provider.to_string()));
    }
    Ok(())
}

/// Parse a CSS selector that is known at compile time.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

/// Elements matched by the first selector in `chain` that matches anything.
pub fn select_rows<'a>(document: &'a Html, chain: &[&str]) -> Vec<ElementRef<'a>> {
    for css in chain {
        let rows: Vec<_> = document.select(&selector(css)).collect();
        if !rows.is_empty() {
            return rows;
        }
    }
    Vec::new()
}

/// Trimmed, whitespace-collapsed text of an element.
pub fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first non-empty match in `chain`.
pub fn first_text(element: &ElementRef, chain: &[&str]) -> Option<String> {
    chain.iter().find_map(|css| {
        element
            .select(&selector(css))
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    })
}

/// Value of `attr` on the first match in `chain` that carries it.
pub fn first_attr(element: &ElementRef, chain: &[&str], attr: &str) -> Option<String> {
    chain.iter().find_map(|css| {
        element
            .select(&selector(css))
            .find_map(|el| el.value().attr(attr))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Resolve a possibly relative link against the page origin.
pub fn absolutize(base: &Url, href: &str) -> String {
    base.join(href)
        .map_or_else(|_| href.to_string(), |u| u.to_string())
}
