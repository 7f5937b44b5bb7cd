use crate::config::ApiConfig;
use crate::provider::{RecommendationProvider, SimilarTracksProvider, TrackSearchProvider};
use crate::{RecommendError, Result, Track};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// LastFmApiClient
// =============================================================================

/// Track search, similarity and recommendation lookups against the Last.fm REST API.
///
/// The client holds no per-call state and can be shared by every session of a
/// server. Each call is a single attempt bounded by [`ApiConfig::timeout`].
#[derive(Clone)]
pub struct LastFmApiClient {
    client: Arc<dyn HttpClient + Send + Sync>,
    config: ApiConfig,
}

impl LastFmApiClient {
    pub fn new(client: Box<dyn HttpClient + Send + Sync>, config: ApiConfig) -> Self {
        Self {
            client: Arc::from(client),
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn method_url(&self, method: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}?method={method}", self.config.base_url);
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url.push_str("&api_key=");
        url.push_str(&urlencoding::encode(&self.config.api_key));
        url.push_str("&format=json");
        url
    }

    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<String> {
        let url = self.method_url(method, params);
        let mut request = Request::new(
            Method::Get,
            url.parse::<Url>()
                .map_err(|e| RecommendError::Http(format!("invalid URL: {e}")))?,
        );
        request.insert_header("User-Agent", USER_AGENT);
        request.insert_header("Accept", "application/json");

        log::debug!("Calling Last.fm {method}");
        let request_start = std::time::Instant::now();

        let exchange = async {
            let mut response = self
                .client
                .send(request)
                .await
                .map_err(|e| RecommendError::Http(e.to_string()))?;
            let status = response.status();
            let body = response
                .body_string()
                .await
                .map_err(|e| RecommendError::Http(e.to_string()))?;
            Ok::<_, RecommendError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| RecommendError::Timeout(self.config.timeout))??;

        log::debug!(
            "Last.fm {method} answered {status} in {}ms",
            request_start.elapsed().as_millis()
        );

        // Last.fm puts its own error payload in non-2xx bodies; let the parser report it.
        if !status.is_success() && serde_json::from_str::<Value>(&body).is_err() {
            return Err(RecommendError::Http(format!("{method} returned HTTP {status}")));
        }

        Ok(body)
    }
}

#[async_trait]
impl TrackSearchProvider for LastFmApiClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let body = self
            .call(
                "track.search",
                &[("track", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        parse_search_response(&body)
    }
}

#[async_trait]
impl SimilarTracksProvider for LastFmApiClient {
    async fn similar(&self, track_name: &str, artist_name: &str, count: u32) -> Result<Vec<Track>> {
        let body = self
            .call(
                "track.getSimilar",
                &[
                    ("artist", artist_name.to_string()),
                    ("track", track_name.to_string()),
                    ("limit", count.to_string()),
                ],
            )
            .await?;
        parse_similar_response(&body)
    }
}

#[async_trait]
impl RecommendationProvider for LastFmApiClient {
    /// Last.fm identifies tracks by MusicBrainz id; only the first seed is used.
    async fn recommend_by_ids(&self, seed_ids: &[String], count: u32) -> Result<Vec<Track>> {
        let Some(seed_id) = seed_ids.first() else {
            log::debug!("No seed ids, skipping Last.fm recommendation lookup");
            return Ok(Vec::new());
        };
        let body = self
            .call(
                "track.getSimilar",
                &[("mbid", seed_id.clone()), ("limit", count.to_string())],
            )
            .await?;
        parse_similar_response(&body)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Last.fm returns a bare object instead of an array when there is exactly one result.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Numbers arrive as JSON strings in most Last.fm payloads.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    /// Unparseable and non-finite values (`"NaN"`, `"inf"`) read as 0.
    fn as_f64(&self) -> f64 {
        let value = match self {
            NumberOrString::Number(n) => *n,
            NumberOrString::Text(text) => text.trim().parse().unwrap_or(0.0),
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    fn as_u64(&self) -> u64 {
        match self {
            NumberOrString::Number(n) if *n >= 0.0 => *n as u64,
            NumberOrString::Number(_) => 0,
            NumberOrString::Text(text) => text.trim().parse().unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApiArtist {
    Name(String),
    Object { name: String },
}

#[derive(Deserialize)]
struct ApiImage {
    #[serde(rename = "#text", default)]
    url: String,
    #[serde(default)]
    size: String,
}

#[derive(Deserialize)]
struct ApiTrack {
    name: String,
    artist: ApiArtist,
    url: Option<String>,
    listeners: Option<NumberOrString>,
    mbid: Option<String>,
    #[serde(rename = "match")]
    match_score: Option<NumberOrString>,
    #[serde(default)]
    image: Vec<ApiImage>,
}

impl From<ApiTrack> for Track {
    fn from(api: ApiTrack) -> Self {
        let artist = match api.artist {
            ApiArtist::Name(name) | ApiArtist::Object { name } => name,
        };
        let mut track = Track::new(api.name, artist);
        track.url = api.url.filter(|url| !url.is_empty());
        track.listeners = api.listeners.as_ref().map_or(0, NumberOrString::as_u64);
        track.mbid = api.mbid.filter(|mbid| !mbid.is_empty());
        track.image_url = pick_image(&api.image);
        if let Some(score) = &api.match_score {
            track = track.with_match_score(score.as_f64());
        }
        track
    }
}

/// First non-empty medium or large image.
fn pick_image(images: &[ApiImage]) -> Option<String> {
    images
        .iter()
        .find(|img| matches!(img.size.as_str(), "medium" | "large") && !img.url.is_empty())
        .map(|img| img.url.clone())
}

/// Parse a `track.search` response.
pub fn parse_search_response(json: &str) -> Result<Vec<Track>> {
    parse_track_list(json, "/results/trackmatches/track")
}

/// Parse a `track.getSimilar` response.
pub fn parse_similar_response(json: &str) -> Result<Vec<Track>> {
    parse_track_list(json, "/similartracks/track")
}

fn parse_track_list(json: &str, pointer: &str) -> Result<Vec<Track>> {
    let mut root: Value =
        serde_json::from_str(json).map_err(|e| RecommendError::Parse(e.to_string()))?;

    if let Some(code) = root.get("error") {
        let message = root
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(RecommendError::Provider(format!("{message} (code {code})")));
    }

    let tracks = match root.pointer_mut(pointer).map(Value::take) {
        // A missing container, or Last.fm's whitespace placeholder for "no results".
        None | Some(Value::Null) | Some(Value::String(_)) => return Ok(Vec::new()),
        Some(tracks) => tracks,
    };

    let tracks: OneOrMany<ApiTrack> =
        serde_json::from_value(tracks).map_err(|e| RecommendError::Parse(e.to_string()))?;

    Ok(tracks.into_vec().into_iter().map(Track::from).collect())
}
