mod common;

use common::{detail_page, unavailable_page, FakeBrowser, FakeSessions, Page};
use digger_core::{
    CountryCode, EnrichmentConfig, EnrichmentStrategy, ErrorKind, ErrorLog, Offer,
    UNKNOWN_SHIPPING,
};
use digger_market::{EnrichmentEngine, ScrapingGate};
use std::sync::Arc;
use std::time::Duration;

fn item_url(n: u32) -> String {
    format!("https://market.test/sell/item/{n}")
}

fn unknown_offer(n: u32, price: &str) -> Offer {
    Offer::new(format!("seller{n}"), "VG+", price, UNKNOWN_SHIPPING, item_url(n))
}

fn config(strategy: EnrichmentStrategy) -> EnrichmentConfig {
    EnrichmentConfig {
        strategy,
        workers: 3,
        early_exit_after: 5,
        page_timeout_secs: 1,
        extended_timeout_secs: 2,
    }
}

fn engine(
    browser: &Arc<FakeBrowser>,
    config: EnrichmentConfig,
) -> (EnrichmentEngine, Arc<ScrapingGate>, Arc<ErrorLog>) {
    let gate = Arc::new(ScrapingGate::new());
    let log = Arc::new(ErrorLog::in_memory());
    let engine = EnrichmentEngine::new(
        config,
        Arc::new(FakeSessions(Arc::clone(browser))),
        Arc::clone(&gate),
        Arc::clone(&log),
    );
    (engine, gate, log)
}

fn de() -> CountryCode {
    CountryCode::new("DE").expect("valid country")
}

/// Ten offers priced 14 down to 5, listed most expensive first.
fn ten_offers(browser: &FakeBrowser) -> Vec<Offer> {
    (5..=14u32)
        .rev()
        .map(|n| {
            let page = detail_page(&format!("€{n}.00"), "+ €3,00 Versand");
            browser.serve(item_url(n), Page::Html(page));
            unknown_offer(n, &format!("€{n}.00"))
        })
        .collect()
}

fn enriched_sellers(offers: &[Offer]) -> Vec<String> {
    let mut sellers: Vec<_> = offers
        .iter()
        .filter(|o| !o.needs_enrichment())
        .map(|o| o.seller.clone())
        .collect();
    sellers.sort();
    sellers
}

#[tokio::test]
async fn test_pre_shipped_offers_pass_through_without_calls() {
    let browser = FakeBrowser::new();
    let (engine, _, _) = engine(&browser, config(EnrichmentStrategy::Parallel));
    let offers = vec![
        Offer::new("a", "NM", "€10.00", "+€4.00 shipping", item_url(1)),
        Offer::new("b", "VG", "€8.00", "Free", item_url(2)),
    ];

    let result = engine.enrich(offers.clone(), &de()).await;
    assert_eq!(result, offers);
    assert_eq!(browser.opened(), 0);
    assert_eq!(browser.navigations(), 0);
}

#[tokio::test]
async fn test_sequential_early_exit_enriches_exactly_the_cheapest() {
    let browser = FakeBrowser::new();
    let offers = ten_offers(&browser);
    let (engine, _, _) = engine(&browser, config(EnrichmentStrategy::Sequential));

    let result = engine.enrich(offers, &de()).await;

    assert_eq!(result.len(), 10, "abandoned offers are kept, not dropped");
    assert_eq!(
        enriched_sellers(&result),
        ["seller5", "seller6", "seller7", "seller8", "seller9"]
    );
    assert_eq!(browser.navigations(), 5);
    assert_eq!(browser.opened(), 1);
    assert_eq!(browser.closed(), 1);

    // Input order is preserved
    let sellers: Vec<_> = result.iter().map(|o| o.seller.as_str()).collect();
    assert_eq!(sellers[0], "seller14");
    assert_eq!(sellers[9], "seller5");

    let cheapest = result.iter().find(|o| o.seller == "seller5").expect("cheapest offer");
    assert_eq!(cheapest.shipping, "€3.00");
    assert_eq!(cheapest.shipping_amount, Some(3.0));
    assert_eq!(cheapest.price_amount, Some(5.0));
    assert_eq!(cheapest.price_currency.as_deref(), Some("EUR"));
    assert_eq!(cheapest.total_amount, Some(8.0));
}

#[tokio::test]
async fn test_parallel_early_exit_guarantees_the_cheapest() {
    let browser = FakeBrowser::new();
    let offers = ten_offers(&browser);
    let (engine, _, _) = engine(&browser, config(EnrichmentStrategy::Parallel));

    let result = engine.enrich(offers, &de()).await;

    assert_eq!(result.len(), 10);
    let enriched = enriched_sellers(&result);
    for seller in ["seller5", "seller6", "seller7", "seller8", "seller9"] {
        assert!(enriched.iter().any(|s| s == seller), "{seller} must be enriched");
    }
    // At most one in-flight offer per extra worker finishes past the threshold
    assert!(enriched.len() <= 5 + 2, "enriched {enriched:?}");
    assert!(browser.opened() <= 3);
    assert_eq!(browser.opened(), browser.closed());
}

#[tokio::test]
async fn test_parallel_abandons_slow_offers_after_early_exit() {
    let browser = FakeBrowser::new();
    let mut offers = Vec::new();
    for n in 1..=5u32 {
        browser.serve(item_url(n), Page::Html(detail_page("€1.00", "+ €2.00 shipping")));
        offers.push(unknown_offer(n, &format!("€{n}.00")));
    }
    // Pricier offers load slowly and lose the race against early exit
    for n in 6..=8u32 {
        browser.serve(
            item_url(n),
            Page::Delayed(Duration::from_millis(500), detail_page("€1.00", "+ €2.00 shipping")),
        );
        offers.push(unknown_offer(n, &format!("€{n}.00")));
    }
    let (engine, _, _) = engine(
        &browser,
        EnrichmentConfig {
            page_timeout_secs: 5,
            ..config(EnrichmentStrategy::Parallel)
        },
    );

    let result = engine.enrich(offers, &de()).await;
    assert_eq!(result.len(), 8);
    for offer in &result[..5] {
        assert!(!offer.needs_enrichment(), "{} must be enriched", offer.seller);
    }
    for offer in &result[5..] {
        assert!(offer.needs_enrichment(), "{} must be left as listed", offer.seller);
    }
    assert_eq!(browser.opened(), browser.closed());
}

#[tokio::test]
async fn test_unavailable_offer_is_dropped_silently() {
    let browser = FakeBrowser::new();
    browser.serve(item_url(1), Page::Html(unavailable_page("Germany")));
    browser.serve(item_url(2), Page::Html(detail_page("€9.00", "+ €4,50 Versand")));
    let (engine, _, log) = engine(&browser, config(EnrichmentStrategy::Sequential));

    let offers = vec![
        unknown_offer(1, "€7.00"),
        unknown_offer(2, "€9.00"),
        Offer::new("listed", "VG", "€12.00", "+€5.00", item_url(3)),
    ];
    let result = engine.enrich(offers, &de()).await;

    let sellers: Vec<_> = result.iter().map(|o| o.seller.as_str()).collect();
    assert_eq!(sellers, ["seller2", "listed"]);
    assert_eq!(result[0].shipping, "€4.50");
    assert!(log.is_empty(), "dropping an unavailable offer is not an error");
}

#[tokio::test]
async fn test_unavailable_phrase_for_other_country_keeps_offer() {
    let browser = FakeBrowser::new();
    browser.serve(
        item_url(1),
        Page::Html(format!(
            "{}<p>Unavailable in Japan</p>",
            detail_page("€9.00", "+ €4.00 shipping")
        )),
    );
    let (engine, _, _) = engine(&browser, config(EnrichmentStrategy::Sequential));

    let result = engine.enrich(vec![unknown_offer(1, "€9.00")], &de()).await;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].shipping, "€4.00");
}

#[tokio::test]
async fn test_timeout_retries_once_then_keeps_offer() {
    let browser = FakeBrowser::new();
    browser.serve(item_url(1), Page::Timeout);
    browser.serve(item_url(2), Page::SlowThen(1, detail_page("€6.00", "+ €2.00 shipping")));
    let (engine, _, log) = engine(&browser, config(EnrichmentStrategy::Sequential));

    let offers = vec![unknown_offer(1, "€5.00"), unknown_offer(2, "€6.00")];
    let result = engine.enrich(offers.clone(), &de()).await;

    assert_eq!(result.len(), 2);
    assert_eq!(result[0], offers[0], "twice timed-out offer is returned unmodified");
    assert_eq!(result[1].shipping, "€2.00");
    assert_eq!(browser.loads_of(&item_url(1)), 2);
    assert_eq!(browser.loads_of(&item_url(2)), 2);
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_navigation_failure_keeps_offer_and_records_error() {
    let browser = FakeBrowser::new();
    let (engine, _, log) = engine(&browser, config(EnrichmentStrategy::Sequential));

    // No page served: the fake reports a DNS failure
    let offers = vec![unknown_offer(1, "€5.00")];
    let result = engine.enrich(offers.clone(), &de()).await;

    assert_eq!(result, offers);
    assert_eq!(log.len(), 1);
    assert_eq!(
        log.recent(1)[0].details.get("offer_url").map(String::as_str),
        Some(item_url(1).as_str())
    );
}

#[tokio::test]
async fn test_offers_without_url_are_not_visited() {
    let browser = FakeBrowser::new();
    let (engine, _, _) = engine(&browser, config(EnrichmentStrategy::Parallel));

    let offers = vec![Offer::new("a", "VG", "€5.00", UNKNOWN_SHIPPING, "")];
    let result = engine.enrich(offers.clone(), &de()).await;
    assert_eq!(result, offers);
    assert_eq!(browser.opened(), 0);
}

#[tokio::test]
async fn test_missing_browser_disables_enrichment() {
    let browser = FakeBrowser::missing();
    let (engine, gate, log) = engine(&browser, config(EnrichmentStrategy::Parallel));

    let offers = vec![unknown_offer(1, "€5.00"), unknown_offer(2, "€6.00")];
    let result = engine.enrich(offers.clone(), &de()).await;

    assert_eq!(result, offers);
    assert!(!gate.is_open());
    let records = log.recent(10);
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.kind == ErrorKind::MissingDependency));

    // Closed gate: later calls return immediately
    let again = engine.enrich(offers.clone(), &de()).await;
    assert_eq!(again, offers);
    assert_eq!(log.len(), records.len());
}
