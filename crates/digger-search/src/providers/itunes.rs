//! iTunes Search API.

use crate::error::Result;
use crate::fetch::{fetch_json, FetchRequest};
use crate::provider::SearchContext;
use digger_core::{ResultEnvelope, SearchCriteria};
use serde::Deserialize;
use url::Url;

pub(crate) const NAME: &str = "iTunes";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    collection_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    track_price: Option<f64>,
    #[serde(default)]
    collection_price: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    artwork_url100: Option<String>,
    #[serde(default)]
    track_view_url: Option<String>,
    #[serde(default)]
    collection_view_url: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
}

pub(crate) fn build_request(base: &str, country: &str, criteria: &SearchCriteria) -> Result<FetchRequest> {
    let mut url = Url::parse(base)?.join("/search")?;
    let entity = if criteria.title().is_some() { "song" } else { "album" };
    let term = [criteria.artist(), criteria.title().or(criteria.album())]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    url.query_pairs_mut()
        .append_pair("term", &term)
        .append_pair("media", "music")
        .append_pair("entity", entity)
        .append_pair("limit", "10")
        .append_pair("country", country);
    Ok(FetchRequest::get(url))
}

fn format_price(amount: f64, currency: Option<&str>) -> String {
    match currency {
        Some(code) => format!("{amount:.2} {code}"),
        None => format!("{amount:.2}"),
    }
}

fn into_envelope(item: Item) -> Option<ResultEnvelope> {
    let title = item.track_name.clone().or_else(|| item.collection_name.clone())?;
    let mut envelope = ResultEnvelope::found(NAME, title);

    if let Some(artist) = item.artist_name {
        envelope = envelope.with_artist(artist);
    }
    if let Some(album) = item.collection_name {
        envelope = envelope.with_album(album);
    }
    if let Some(price) = item.track_price.or(item.collection_price).filter(|p| *p >= 0.0) {
        envelope = envelope.with_price(format_price(price, item.currency.as_deref()));
    }
    if let Some(art) = item.artwork_url100 {
        envelope = envelope.with_cover_url(art);
    }
    if let Some(url) = item.track_view_url.or(item.collection_view_url) {
        envelope = envelope.with_url(url);
    }
    if let Some(date) = item.release_date {
        envelope = envelope.with_extra("release_date", date);
    }
    Some(envelope)
}

pub(crate) async fn search(ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
    let request = build_request(&ctx.providers.itunes_url, &ctx.providers.itunes_country, criteria)?;
    let response: SearchResponse = fetch_json(ctx.fetcher.as_ref(), request, NAME).await?;
    Ok(response.results.into_iter().filter_map(into_envelope).collect())
}
