//! Ordered selector-fallback chains.
//!
//! Marketplace markup changes often and differs between page variants, so
//! every field is located by a list of CSS selectors tried in order; the
//! first non-empty match wins. Chains are plain data: they can be logged,
//! serialized, and replaced per field from configuration.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// An ordered list of CSS selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain(Vec<String>);

impl SelectorChain {
    /// Chain trying `selectors` in order.
    #[must_use]
    pub fn new(selectors: &[&str]) -> Self {
        Self(selectors.iter().map(|s| (*s).to_string()).collect())
    }

    /// The CSS selectors, in the order they are tried.
    #[must_use]
    pub fn selectors(&self) -> &[String] {
        &self.0
    }

    /// Parsed selectors; invalid entries are skipped.
    fn parsed(&self) -> impl Iterator<Item = Selector> + '_ {
        self.0.iter().filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::debug!("skipping invalid selector {:?}: {}", css, e);
                None
            }
        })
    }

    /// Every element matched by the first selector that matches anything.
    #[must_use]
    pub fn select_all<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in self.parsed() {
            let found: Vec<_> = document.select(&selector).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// First element under `scope` matched by the chain.
    #[must_use]
    pub fn first<'a>(&self, scope: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.parsed().find_map(|selector| scope.select(&selector).next())
    }

    /// Text of the first non-empty match under `scope`.
    #[must_use]
    pub fn text(&self, scope: &ElementRef) -> Option<String> {
        self.parsed().find_map(|selector| {
            scope
                .select(&selector)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty())
        })
    }

    /// Texts of every match of every selector under `scope`, in chain order.
    #[must_use]
    pub fn texts(&self, scope: &ElementRef) -> Vec<String> {
        self.parsed()
            .flat_map(|selector| {
                scope
                    .select(&selector)
                    .map(|el| element_text(&el))
                    .collect::<Vec<_>>()
            })
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Whitespace-collapsed text content of an element.
#[must_use]
pub fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Chains for the release listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Element holding the offer rows
    pub container: SelectorChain,
    /// One element per offer
    pub rows: SelectorChain,
    /// Item price within a row
    pub price: SelectorChain,
    /// Media condition within a row
    pub condition: SelectorChain,
    /// Seller name within a row
    pub seller: SelectorChain,
    /// Shipping cost within a row, when the listing shows it
    pub shipping: SelectorChain,
    /// Seller's ships-from country
    pub country: SelectorChain,
    /// Add-to-cart control carrying the listing item id
    pub cart_button: SelectorChain,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: SelectorChain::new(&[
                "table.mpitems",
                "[data-testid='listings']",
                ".marketplace-listings",
            ]),
            rows: SelectorChain::new(&[
                "table.mpitems tbody tr.shortcut_navigable",
                "table.mpitems tbody tr",
                "[data-testid='listing-row']",
                ".marketplace-listing",
            ]),
            price: SelectorChain::new(&[
                "td.item_price span.price",
                ".item_price .price",
                "[data-testid='listing-price']",
                ".price",
            ]),
            condition: SelectorChain::new(&[
                ".item_condition .condition-label-desktop + span",
                ".item_condition span.item_media_condition",
                "[data-testid='listing-condition']",
                ".item_condition",
            ]),
            seller: SelectorChain::new(&[
                ".seller_info .seller_block strong a",
                ".seller_info a[href*='/seller/']",
                "[data-testid='listing-seller']",
                ".seller_info strong",
            ]),
            shipping: SelectorChain::new(&[
                "td.item_price span.item_shipping",
                ".item_shipping",
                "[data-testid='listing-shipping']",
            ]),
            country: SelectorChain::new(&[
                ".seller_info .ships_from",
                "[data-testid='listing-ships-from']",
            ]),
            cart_button: SelectorChain::new(&[
                "button.add-to-cart[data-item-id]",
                "a.cta_button[data-item-id]",
                "[data-item-id]",
            ]),
        }
    }
}

/// Chains for the regions of an offer detail page that may state shipping,
/// in the order they are searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    /// Element right next to the item price
    pub price_adjacent: SelectorChain,
    /// Shipping cell of the price table
    pub price_table: SelectorChain,
    /// Pricing information paragraph
    pub pricing_info: SelectorChain,
    /// Buy / add-to-cart section
    pub offer_action: SelectorChain,
    /// Containers scanned line by line when nothing else matched
    pub fallback: SelectorChain,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            price_adjacent: SelectorChain::new(&[
                ".price + .shipping",
                ".price ~ .item_shipping",
                "#page_content .price_and_shipping .shipping",
            ]),
            price_table: SelectorChain::new(&[
                "table.price_table td.shipping",
                "table#pricing td.shipping",
                "table td.item_shipping",
            ]),
            pricing_info: SelectorChain::new(&[
                "p.pricing-info",
                ".pricing_info p",
                "#pricing_info",
            ]),
            offer_action: SelectorChain::new(&[
                "#offer_actions",
                ".offer_actions",
                ".item-actions",
                "form.add_to_cart",
            ]),
            fallback: SelectorChain::new(&["#page_content", "main", "body"]),
        }
    }
}
