//! Reading availability and shipping from one offer detail page.

use crate::availability::is_unavailable;
use crate::selectors::{element_text, DetailSelectors};
use crate::shipping::{parse_shipping, ShippingCost};
use scraper::Html;

/// What a detail page says about an offer for one buyer.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailFinding {
    /// The seller does not sell to the buyer's country
    Unavailable,
    /// Shipping cost found
    Shipping(ShippingCost),
    /// Available, but no region stated a shipping cost
    NoShipping,
}

/// Inspect a detail page for a buyer in `country`.
#[must_use]
pub fn inspect_detail(html: &str, country: &str, selectors: &DetailSelectors) -> DetailFinding {
    let document = Html::parse_document(html);
    let page_text = element_text(&document.root_element());

    if is_unavailable(&page_text, country) {
        return DetailFinding::Unavailable;
    }

    extract_shipping(&document, country, selectors)
        .map_or(DetailFinding::NoShipping, DetailFinding::Shipping)
}

/// First known shipping cost, searching regions from most to least specific.
fn extract_shipping(
    document: &Html,
    country: &str,
    selectors: &DetailSelectors,
) -> Option<ShippingCost> {
    let root = document.root_element();
    let regions = [
        ("price-adjacent", &selectors.price_adjacent),
        ("price-table", &selectors.price_table),
        ("pricing-info", &selectors.pricing_info),
        ("offer-action", &selectors.offer_action),
    ];

    for (region, chain) in regions {
        for text in chain.texts(&root) {
            let cost = parse_shipping(&text, Some(country));
            if cost.is_known() {
                tracing::trace!(region, cost = %cost.cost, "shipping found");
                return Some(cost);
            }
        }
    }

    let container = selectors.fallback.first(&root)?;
    let fragments: Vec<&str> = container
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    scan_fragments(&fragments, country)
}

/// Broad scan over text fragments. A label without digits such as
/// "Shipping:" is joined with the fragment after it.
fn scan_fragments(fragments: &[&str], country: &str) -> Option<ShippingCost> {
    for (i, fragment) in fragments.iter().enumerate() {
        let cost = parse_shipping(fragment, Some(country));
        if cost.is_known() {
            return Some(cost);
        }

        let is_label = !fragment.chars().any(|c| c.is_ascii_digit());
        if let (true, Some(next)) = (is_label, fragments.get(i + 1)) {
            let cost = parse_shipping(&format!("{fragment} {next}"), Some(country));
            if cost.is_known() {
                return Some(cost);
            }
        }
    }
    None
}
