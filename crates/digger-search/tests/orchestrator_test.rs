use async_trait::async_trait;
use digger_core::{
    EnvelopeStatus, ErrorKind, ErrorLog, ProviderConfig, ScoringWeights, SearchConfig,
    SearchCriteria,
};
use digger_search::{
    FetchRequest, Fetcher, Provider, Result, SearchContext, SearchError, SearchOrchestrator,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// What the fake network does for one host.
#[derive(Clone)]
enum Reply {
    Body(&'static str),
    Status(u16),
    Hang,
    Panic,
}

struct FakeFetcher {
    replies: HashMap<&'static str, Reply>,
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<String> {
        let host = request.url.host_str().unwrap_or_default().to_string();
        match self.replies.get(host.as_str()).cloned() {
            Some(Reply::Body(body)) => Ok(body.to_string()),
            Some(Reply::Status(status)) => Err(SearchError::Status {
                status,
                url: request.url.to_string(),
            }),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            }
            Some(Reply::Panic) => panic!("fake transport exploded"),
            None => Err(SearchError::Status {
                status: 404,
                url: request.url.to_string(),
            }),
        }
    }
}

const DISCOGS: &str = r#"{"results": [{"id": 249504, "title": "Aphex Twin - Windowlicker",
    "label": ["Warp Records"], "catno": "WAP105", "uri": "/release/249504"}]}"#;
const ITUNES: &str = r#"{"results": [{"trackName": "Windowlicker", "artistName": "Aphex Twin",
    "trackPrice": 1.29, "currency": "USD"}]}"#;
const DEEZER: &str = r#"{"data": [{"title": "Windowlicker", "artist": {"name": "Aphex Twin"}}]}"#;
const DEEZER_UNRELATED: &str = r#"{"data": [{"title": "Roygbiv", "artist": {"name": "Boards of Canada"}}]}"#;
const BANDCAMP: &str = r#"<ul><li class="searchresult"><div class="heading"><a href="/t/1">Windowlicker</a></div>
    <div class="subhead">by Aphex Twin</div></li></ul>"#;
const JUNO: &str = r#"<div class="dv-item"><a class="juno-artist">Aphex Twin</a>
    <a class="juno-title" href="/products/1/">Windowlicker</a></div>"#;
const REVIBED: &str = r#"<div class="release-card"><div class="release-card__title">Windowlicker</div>
    <div class="release-card__artist">Aphex Twin</div></div>"#;

fn provider_config() -> ProviderConfig {
    ProviderConfig {
        discogs_token: Some("token".to_string()),
        discogs_api_url: "http://discogs.test".to_string(),
        revibed_url: "http://revibed.test".to_string(),
        bandcamp_url: "http://bandcamp.test".to_string(),
        juno_url: "http://juno.test".to_string(),
        itunes_url: "http://itunes.test".to_string(),
        itunes_country: "US".to_string(),
        deezer_url: "http://deezer.test".to_string(),
    }
}

fn healthy() -> HashMap<&'static str, Reply> {
    HashMap::from([
        ("discogs.test", Reply::Body(DISCOGS)),
        ("revibed.test", Reply::Body(REVIBED)),
        ("bandcamp.test", Reply::Body(BANDCAMP)),
        ("juno.test", Reply::Body(JUNO)),
        ("itunes.test", Reply::Body(ITUNES)),
        ("deezer.test", Reply::Body(DEEZER)),
    ])
}

fn orchestrator(replies: HashMap<&'static str, Reply>) -> (SearchOrchestrator, Arc<ErrorLog>) {
    let error_log = Arc::new(ErrorLog::in_memory());
    let config = SearchConfig::default();
    let ctx = SearchContext::new(
        Arc::new(FakeFetcher { replies }),
        &config,
        ScoringWeights::default(),
        provider_config(),
        Arc::clone(&error_log),
    );
    let orchestrator = SearchOrchestrator::new(ctx, &config)
        .with_timeouts(Duration::from_millis(300), Duration::from_secs(2));
    (orchestrator, error_log)
}

fn full_criteria() -> SearchCriteria {
    SearchCriteria::new(Some("Windowlicker"), Some("Aphex Twin"), None, None)
}

#[tokio::test]
async fn test_all_providers_found() {
    let (orchestrator, error_log) = orchestrator(healthy());
    let envelopes = orchestrator.search(&full_criteria()).await;

    assert_eq!(envelopes.len(), 6);
    assert!(envelopes.iter().all(|e| e.status == EnvelopeStatus::Found));
    assert!(error_log.is_empty());
}

#[tokio::test]
async fn test_one_failing_provider_yields_one_error_envelope() {
    let mut replies = healthy();
    replies.insert("juno.test", Reply::Status(503));
    let (orchestrator, error_log) = orchestrator(replies);

    let envelopes = orchestrator.search(&full_criteria()).await;

    assert_eq!(envelopes.len(), 6);
    let errors: Vec<_> = envelopes.iter().filter(|e| e.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].platform, "Juno");
    assert!(matches!(
        errors[0].status,
        EnvelopeStatus::Error { kind: ErrorKind::ApiMaintenance, .. }
    ));
    assert_eq!(error_log.len(), 1);
}

#[tokio::test]
async fn test_irrelevant_results_are_no_match_not_error() {
    let mut replies = healthy();
    replies.insert("deezer.test", Reply::Body(DEEZER_UNRELATED));
    let (orchestrator, _) = orchestrator(replies);

    let envelopes = orchestrator.search(&full_criteria()).await;
    let deezer = envelopes
        .iter()
        .find(|e| e.platform == "Deezer")
        .expect("deezer envelope");

    assert!(deezer.is_no_match());
    assert!(!deezer.is_error());
}

#[tokio::test]
async fn test_only_capable_providers_run() {
    let (orchestrator, _) = orchestrator(healthy());
    let criteria = SearchCriteria::new(None, Some("Aphex Twin"), None, None);

    assert_eq!(orchestrator.capable(&criteria), vec![Provider::Revibed]);
    let envelopes = orchestrator.search(&criteria).await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].platform, "Revibed");
}

#[tokio::test]
async fn test_catalog_only_search_finds_discogs_release() {
    let (orchestrator, error_log) = orchestrator(healthy());
    let criteria = SearchCriteria::new(None, None, None, Some("WAP105"));

    assert_eq!(orchestrator.capable(&criteria), vec![Provider::Discogs]);
    let envelopes = orchestrator.search(&criteria).await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].status, EnvelopeStatus::Found);
    assert_eq!(envelopes[0].title, "Windowlicker");
    assert_eq!(envelopes[0].extra["catalog"], serde_json::json!("WAP105"));
    assert!(error_log.is_empty());
}

#[tokio::test]
async fn test_no_capable_provider_returns_empty() {
    let (orchestrator, _) = orchestrator(healthy());
    let criteria = SearchCriteria::new(Some("Windowlicker"), None, None, None);
    assert!(orchestrator.search(&criteria).await.is_empty());
}

#[tokio::test]
async fn test_hanging_provider_times_out() {
    let mut replies = healthy();
    replies.insert("itunes.test", Reply::Hang);
    let (orchestrator, _) = orchestrator(replies);

    let envelopes = orchestrator.search(&full_criteria()).await;

    assert_eq!(envelopes.len(), 6);
    let itunes = envelopes
        .iter()
        .find(|e| e.platform == "iTunes")
        .expect("itunes envelope");
    assert!(matches!(
        itunes.status,
        EnvelopeStatus::Error { kind: ErrorKind::ReadTimeout, .. }
    ));
}

#[tokio::test]
async fn test_overall_timeout_fills_abandoned_providers() {
    let mut replies = healthy();
    replies.insert("discogs.test", Reply::Hang);
    replies.insert("deezer.test", Reply::Hang);
    let (orchestrator, _) = orchestrator(replies);
    let orchestrator =
        orchestrator.with_timeouts(Duration::from_secs(30), Duration::from_millis(300));

    let envelopes = orchestrator.search(&full_criteria()).await;

    assert_eq!(envelopes.len(), 6);
    let abandoned: Vec<_> = envelopes
        .iter()
        .filter(|e| e.is_error())
        .map(|e| e.platform.as_str())
        .collect();
    assert_eq!(abandoned.len(), 2);
    assert!(abandoned.contains(&"Discogs"));
    assert!(abandoned.contains(&"Deezer"));
}

#[tokio::test]
async fn test_panicking_provider_is_contained() {
    let mut replies = healthy();
    replies.insert("bandcamp.test", Reply::Panic);
    let (orchestrator, _) = orchestrator(replies);

    let envelopes = orchestrator.search(&full_criteria()).await;

    assert_eq!(envelopes.len(), 6);
    let bandcamp = envelopes
        .iter()
        .find(|e| e.platform == "Bandcamp")
        .expect("bandcamp envelope");
    assert!(matches!(
        bandcamp.status,
        EnvelopeStatus::Error { kind: ErrorKind::Unknown, .. }
    ));
}

#[tokio::test]
async fn test_missing_discogs_token_is_bad_key() {
    let error_log = Arc::new(ErrorLog::in_memory());
    let config = SearchConfig::default();
    let mut providers = provider_config();
    providers.discogs_token = None;
    let ctx = SearchContext::new(
        Arc::new(FakeFetcher { replies: healthy() }),
        &config,
        ScoringWeights::default(),
        providers,
        Arc::clone(&error_log),
    );
    let orchestrator = SearchOrchestrator::new(ctx, &config).with_providers(vec![Provider::Discogs]);

    let envelopes = orchestrator.search(&full_criteria()).await;
    assert!(matches!(
        envelopes[0].status,
        EnvelopeStatus::Error { kind: ErrorKind::ApiBadKey, .. }
    ));
}

#[tokio::test]
async fn test_streaming_delivers_every_envelope() {
    let (orchestrator, _) = orchestrator(healthy());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let envelopes = orchestrator.search_streaming(&full_criteria(), tx).await;

    let mut streamed = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        streamed.push(envelope);
    }
    assert_eq!(streamed, envelopes);
}

#[tokio::test]
async fn test_single_worker_still_completes() {
    let (orchestrator, _) = orchestrator(healthy());
    let orchestrator = orchestrator.with_workers(1);
    assert_eq!(orchestrator.search(&full_criteria()).await.len(), 6);
}
