//! Discogs database search (JSON API).

use crate::error::{Result, SearchError};
use crate::fetch::FetchRequest;
use crate::provider::SearchContext;
use digger_core::{ResultEnvelope, SearchCriteria};
use serde::Deserialize;
use url::Url;

pub(crate) const NAME: &str = "Discogs";

/// Web origin for result links; the API returns site-relative URIs.
const SITE_URL: &str = "https://www.discogs.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    title: String,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    label: Vec<String>,
    #[serde(default)]
    catno: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    format: Vec<String>,
    #[serde(default)]
    cover_image: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

pub(crate) fn build_request(
    api_url: &str,
    token: &str,
    criteria: &SearchCriteria,
) -> Result<FetchRequest> {
    let mut url = Url::parse(api_url)?.join("/database/search")?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("type", "release");
        query.append_pair("per_page", "10");
        if let Some(artist) = criteria.artist() {
            query.append_pair("artist", artist);
        }
        if let Some(title) = criteria.title() {
            query.append_pair("track", title);
        }
        if let Some(album) = criteria.album() {
            query.append_pair("release_title", album);
        }
        if let Some(catalog) = criteria.catalog() {
            query.append_pair("catno", catalog);
        }
    }

    Ok(FetchRequest::get(url).with_header("Authorization", format!("Discogs token={token}")))
}

/// Split Discogs' combined "Artist - Title" into its parts.
fn split_title(combined: &str) -> (Option<&str>, &str) {
    match combined.split_once(" - ") {
        Some((artist, title)) => (Some(artist.trim()), title.trim()),
        None => (None, combined.trim()),
    }
}

fn into_envelope(result: SearchResult) -> ResultEnvelope {
    let (artist, title) = split_title(&result.title);
    let mut envelope = ResultEnvelope::found(NAME, title)
        .with_album(title)
        .with_extra("release_id", result.id);
    if let Some(artist) = artist {
        envelope = envelope.with_artist(artist);
    }
    if let Some(label) = result.label.first() {
        envelope = envelope.with_label(label.clone());
    }
    if let Some(cover) = result.cover_image.filter(|c| !c.is_empty()) {
        envelope = envelope.with_cover_url(cover);
    }
    if let Some(uri) = result.uri {
        envelope = envelope.with_url(format!("{SITE_URL}{uri}"));
    }
    if let Some(catno) = result.catno.filter(|c| !c.is_empty()) {
        envelope = envelope.with_extra("catalog", catno);
    }
    if let Some(year) = result.year {
        envelope = envelope.with_extra("year", year);
    }
    if let Some(country) = result.country {
        envelope = envelope.with_extra("country", country);
    }
    if !result.format.is_empty() {
        envelope = envelope.with_extra("format", result.format.join(", "));
    }
    envelope
}

pub(crate) fn parse(body: &str) -> Result<Vec<ResultEnvelope>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::parse(NAME, e))?;
    Ok(response.results.into_iter().map(into_envelope).collect())
}

pub(crate) async fn search(ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
    let token = ctx
        .providers
        .discogs_token
        .as_deref()
        .ok_or_else(|| SearchError::MissingToken(NAME.to_string()))?;
    let request = build_request(&ctx.providers.discogs_api_url, token, criteria)?;
    let body = ctx.fetcher.fetch(request).await?;
    parse(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "pagination": {"items": 1},
        "results": [{
            "id": 249504,
            "title": "Aphex Twin - Windowlicker",
            "year": "1999",
            "label": ["Warp Records"],
            "catno": "WAP105",
            "country": "UK",
            "format": ["Vinyl", "12\""],
            "cover_image": "https://i.discogs.com/cover.jpg",
            "uri": "/release/249504-Aphex-Twin-Windowlicker"
        }]
    }"#;

    #[test]
    fn test_build_request() {
        let criteria = SearchCriteria::new(None, Some("Aphex Twin"), None, Some("WAP105"));
        let request = build_request("https://api.discogs.com", "secret", &criteria)
            .expect("build request");

        assert_eq!(request.url.path(), "/database/search");
        let query = request.url.query().unwrap_or_default();
        assert!(query.contains("artist=Aphex+Twin"));
        assert!(query.contains("catno=WAP105"));
        assert!(!query.contains("track="));
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Discogs token=secret".to_string())]
        );
    }

    #[test]
    fn test_parse_results() {
        let results = parse(BODY).expect("parse body");
        assert_eq!(results.len(), 1);

        let release = &results[0];
        assert_eq!(release.title, "Windowlicker");
        assert_eq!(release.artist.as_deref(), Some("Aphex Twin"));
        assert_eq!(release.label.as_deref(), Some("Warp Records"));
        assert_eq!(
            release.url.as_deref(),
            Some("https://www.discogs.com/release/249504-Aphex-Twin-Windowlicker")
        );
        assert_eq!(release.extra["release_id"], serde_json::json!(249504));
        assert_eq!(release.extra["catalog"], serde_json::json!("WAP105"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse("<html>"), Err(SearchError::Parse { .. })));
    }
}
