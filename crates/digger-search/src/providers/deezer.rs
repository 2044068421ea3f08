//! Deezer public search API.

use crate::error::Result;
use crate::fetch::{fetch_json, FetchRequest};
use crate::provider::SearchContext;
use digger_core::{ResultEnvelope, SearchCriteria};
use serde::Deserialize;
use url::Url;

pub(crate) const NAME: &str = "Deezer";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Item>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    artist: Option<Named>,
    #[serde(default)]
    album: Option<AlbumRef>,
    #[serde(default)]
    cover_medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    title: String,
    #[serde(default)]
    cover_medium: Option<String>,
}

/// Track search when a title is known, album search otherwise.
///
/// Uses Deezer's advanced query syntax so each field only matches its own
/// attribute.
pub(crate) fn build_request(base: &str, criteria: &SearchCriteria) -> Result<FetchRequest> {
    let (path, mut parts) = if let Some(title) = criteria.title() {
        ("/search", vec![format!("track:\"{title}\"")])
    } else {
        ("/search/album", Vec::new())
    };
    if let Some(artist) = criteria.artist() {
        parts.push(format!("artist:\"{artist}\""));
    }
    if let Some(album) = criteria.album() {
        parts.push(format!("album:\"{album}\""));
    }

    let mut url = Url::parse(base)?.join(path)?;
    url.query_pairs_mut()
        .append_pair("q", &parts.join(" "))
        .append_pair("limit", "10");
    Ok(FetchRequest::get(url))
}

fn into_envelope(item: Item) -> ResultEnvelope {
    let mut envelope = ResultEnvelope::found(NAME, item.title);
    if let Some(artist) = item.artist {
        envelope = envelope.with_artist(artist.name);
    }
    let mut cover = item.cover_medium;
    if let Some(album) = item.album {
        cover = cover.or(album.cover_medium);
        envelope = envelope.with_album(album.title);
    }
    if let Some(cover) = cover {
        envelope = envelope.with_cover_url(cover);
    }
    if let Some(link) = item.link {
        envelope = envelope.with_url(link);
    }
    envelope
}

pub(crate) async fn search(ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
    let request = build_request(&ctx.providers.deezer_url, criteria)?;
    let response: SearchResponse = fetch_json(ctx.fetcher.as_ref(), request, NAME).await?;
    if let Some(error) = response.error {
        return Err(crate::error::SearchError::parse(NAME, error.message));
    }
    Ok(response.data.into_iter().map(into_envelope).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_query() {
        let criteria = SearchCriteria::new(Some("Archangel"), Some("Burial"), None, None);
        let request = build_request("https://api.deezer.com", &criteria).expect("build request");
        assert_eq!(request.url.path(), "/search");
        let q: Vec<_> = request.url.query_pairs().filter(|(k, _)| k == "q").collect();
        assert_eq!(q[0].1, "track:\"Archangel\" artist:\"Burial\"");
    }

    #[test]
    fn test_album_query() {
        let criteria = SearchCriteria::new(None, Some("Burial"), Some("Untrue"), None);
        let request = build_request("https://api.deezer.com", &criteria).expect("build request");
        assert_eq!(request.url.path(), "/search/album");
    }

    #[test]
    fn test_item_conversion() {
        let body = r#"{"data": [{"title": "Archangel", "link": "https://www.deezer.com/track/1",
            "artist": {"name": "Burial"}, "album": {"title": "Untrue", "cover_medium": "https://c/1.jpg"}}],
            "total": 1}"#;
        let response: SearchResponse = serde_json::from_str(body).expect("parse body");
        let envelope = into_envelope(response.data.into_iter().next().expect("one item"));

        assert_eq!(envelope.artist.as_deref(), Some("Burial"));
        assert_eq!(envelope.album.as_deref(), Some("Untrue"));
        assert_eq!(envelope.cover_url.as_deref(), Some("https://c/1.jpg"));
    }
}
