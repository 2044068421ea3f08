//! Bandcamp site search (HTML).

use super::common::{absolutize, ensure_not_bot_wall, first_attr, first_text, select_rows};
use crate::error::Result;
use crate::fetch::FetchRequest;
use crate::provider::SearchContext;
use digger_core::{ResultEnvelope, SearchCriteria};
use scraper::Html;
use url::Url;

pub(crate) const NAME: &str = "Bandcamp";

const ROWS: &[&str] = &["li.searchresult", ".result-items > li", ".searchresult"];
const HEADING: &[&str] = &[".heading a", ".heading"];
const SUBHEAD: &[&str] = &[".subhead"];
const LINK: &[&str] = &[".itemurl a", ".heading a"];
const ART: &[&str] = &[".art img"];
const KIND: &[&str] = &[".itemtype"];
const RELEASED: &[&str] = &[".released"];

pub(crate) fn build_url(base: &str, criteria: &SearchCriteria) -> Result<Url> {
    let mut url = Url::parse(base)?.join("/search")?;
    let item_type = if criteria.title().is_some() { "t" } else { "a" };
    url.query_pairs_mut()
        .append_pair("q", &criteria.free_text())
        .append_pair("item_type", item_type);
    Ok(url)
}

/// Split a subhead such as "from Untrue by Burial" into album and artist.
fn parse_subhead(subhead: &str) -> (Option<String>, Option<String>) {
    let (head, artist) = match subhead.rsplit_once("by ") {
        Some((head, artist)) => (head.trim(), Some(artist.trim().to_string())),
        None => (subhead.trim(), None),
    };
    let album = head
        .strip_prefix("from ")
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());
    (album, artist.filter(|a| !a.is_empty()))
}

pub(crate) fn parse(html: &str, base: &Url) -> Result<Vec<ResultEnvelope>> {
    ensure_not_bot_wall(NAME, html)?;
    let document = Html::parse_document(html);

    let mut results = Vec::new();
    for row in select_rows(&document, ROWS) {
        let Some(title) = first_text(&row, HEADING) else {
            continue;
        };
        let mut envelope = ResultEnvelope::found(NAME, title);

        if let Some(subhead) = first_text(&row, SUBHEAD) {
            let (album, artist) = parse_subhead(&subhead);
            if let Some(artist) = artist {
                envelope = envelope.with_artist(artist);
            }
            if let Some(album) = album {
                envelope = envelope.with_album(album);
            }
        }
        if let Some(href) = first_attr(&row, LINK, "href") {
            // Search links carry tracking parameters
            let clean = href.split('?').next().unwrap_or(&href).to_string();
            envelope = envelope.with_url(absolutize(base, &clean));
        }
        if let Some(src) = first_attr(&row, ART, "src") {
            envelope = envelope.with_cover_url(src);
        }
        if let Some(kind) = first_text(&row, KIND) {
            envelope = envelope.with_extra("item_type", kind.to_lowercase());
        }
        if let Some(released) = first_text(&row, RELEASED) {
            envelope = envelope.with_extra("released", released.trim_start_matches("released ").to_string());
        }
        results.push(envelope);
    }
    Ok(results)
}

pub(crate) async fn search(ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
    let url = build_url(&ctx.providers.bandcamp_url, criteria)?;
    let html = ctx.fetcher.fetch(FetchRequest::get(url.clone())).await?;
    parse(&html, &url)
}
