//! Revibed rare-vinyl catalogue search (HTML).
//!
//! Revibed's search is loose and returns many near misses, so results are
//! passed through the strict word filter before scoring.

use super::common::{absolutize, ensure_not_bot_wall, first_attr, first_text, select_rows};
use crate::error::Result;
use crate::fetch::FetchRequest;
use crate::provider::SearchContext;
use digger_core::{ResultEnvelope, SearchCriteria};
use scraper::Html;
use url::Url;

pub(crate) const NAME: &str = "Revibed";

const ROWS: &[&str] = &[".release-card", ".product-card", "[data-release-id]", "article.goods"];
const TITLE: &[&str] = &[".release-card__title", ".product-card__title", ".title", "h3"];
const ARTIST: &[&str] = &[".release-card__artist", ".product-card__artist", ".artist"];
const LABEL: &[&str] = &[".release-card__label", ".label"];
const PRICE: &[&str] = &[".release-card__price", ".product-card__price", ".price"];
const LINK: &[&str] = &["a[href*='/release']", "a[href*='/goods']", "a"];
const IMAGE: &[&str] = &["img"];

pub(crate) fn build_url(base: &str, criteria: &SearchCriteria) -> Result<Url> {
    let term = [criteria.artist(), criteria.album()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let mut url = Url::parse(base)?.join("/search")?;
    url.query_pairs_mut().append_pair("query", &term);
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
        let mut envelope = ResultEnvelope::found(NAME, title.clone()).with_album(title);

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
        if let Some(src) = first_attr(&row, IMAGE, "src") {
            envelope = envelope.with_cover_url(absolutize(base, &src));
        }
        if let Some(id) = row.value().attr("data-release-id") {
            envelope = envelope.with_extra("release_id", id.to_string());
        }
        results.push(envelope);
    }
    Ok(results)
}

pub(crate) async fn search(ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
    let url = build_url(&ctx.providers.revibed_url, criteria)?;
    let html = ctx.fetcher.fetch(FetchRequest::get(url.clone())).await?;
    parse(&html, &url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_uses_artist_and_album_only() {
        let criteria = SearchCriteria::new(Some("Archangel"), Some("Burial"), Some("Untrue"), Some("HDBCD002"));
        let url = build_url("https://revibed.com", &criteria).expect("build url");
        assert_eq!(url.query(), Some("query=Burial+Untrue"));
    }

    #[test]
    fn test_parse_cards() {
        let page = r#"
            <div class="release-card" data-release-id="88">
              <a href="/release/88"><img src="/covers/88.jpg"></a>
              <div class="release-card__title">Untrue</div>
              <div class="release-card__artist">Burial</div>
              <div class="release-card__price">€45.00</div>
            </div>"#;
        let base = Url::parse("https://revibed.com/search").expect("valid url");
        let results = parse(page, &base).expect("parse page");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Untrue");
        assert_eq!(results[0].artist.as_deref(), Some("Burial"));
        assert_eq!(results[0].url.as_deref(), Some("https://revibed.com/release/88"));
        assert_eq!(results[0].extra["release_id"], serde_json::json!("88"));
    }
}
