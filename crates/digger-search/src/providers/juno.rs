//! Juno Records site search (HTML).

use super::common::{absolutize, ensure_not_bot_wall, first_attr, first_text, select_rows};
use crate::error::Result;
use crate::fetch::FetchRequest;
use crate::provider::SearchContext;
use digger_core::{ResultEnvelope, SearchCriteria};
use scraper::Html;
use url::Url;

pub(crate) const NAME: &str = "Juno";

const ROWS: &[&str] = &[".jd-listing-item", ".dv-item", ".product-list .product"];
const TITLE: &[&str] = &["a.juno-title", ".juno-title", ".vi-title"];
const ARTIST: &[&str] = &["a.juno-artist", ".juno-artist", ".vi-artist"];
const LABEL: &[&str] = &["a.juno-label", ".juno-label", ".vi-label"];
const CATALOG: &[&str] = &[".juno-catno", ".vi-catno"];
const PRICE: &[&str] = &[".pl-big-price", ".price_lrg", ".price"];
const LINK: &[&str] = &["a.juno-title", "a.product-link", "a[href*='/products/']"];
const IMAGE: &[&str] = &["img"];

pub(crate) fn build_url(base: &str, criteria: &SearchCriteria) -> Result<Url> {
    let mut url = Url::parse(base)?.join("/search/")?;
    url.query_pairs_mut()
        .append_pair("q[all][]", &criteria.free_text())
        .append_pair("solrorder", "relevancy")
        .append_pair("show_out_of_stock", "1");
    Ok(url)
}

pub(crate) fn parse(html: &str, base: &Url) -> Result<Vec<ResultEnvelope>> {
    ensure_not_bot_wall(NAME, html)?;
    let document = Html::parse_document(html);

    let mut results = Vec::new();
    for row in select_rows(&document, ROWS) {
        let Some(title) = first_text(&row, TITLE) else {
            continue;
        };
        let mut envelope = ResultEnvelope::found(NAME, title);

        if let Some(artist) = first_text(&row, ARTIST) {
            envelope = envelope.with_artist(artist);
        }
        if let Some(label) = first_text(&row, LABEL) {
            envelope = envelope.with_label(label);
        }
        if let Some(price) = first_text(&row, PRICE) {
            envelope = envelope.with_price(price);
        }
        if let Some(href) = first_attr(&row, LINK, "href") {
            envelope = envelope.with_url(absolutize(base, &href));
        }
        if let Some(src) = first_attr(&row, IMAGE, "data-src").or_else(|| first_attr(&row, IMAGE, "src")) {
            envelope = envelope.with_cover_url(absolutize(base, &src));
        }
        if let Some(catalog) = first_text(&row, CATALOG) {
            envelope = envelope.with_extra("catalog", catalog);
        }
        results.push(envelope);
    }
    Ok(results)
}

pub(crate) async fn search(ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
    let url = build_url(&ctx.providers.juno_url, criteria)?;
    let html = ctx.fetcher.fetch(FetchRequest::get(url.clone())).await?;
    parse(&html, &url)
}
