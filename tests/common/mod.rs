#![allow(dead_code)]
use async_trait::async_trait;
use lastfm_recommend::{
    ConnectorConfig, Providers, RecommendError, RecommendationProvider, Result, ServerConfig,
    SessionServer, ShutdownHandle, SimilarTracksProvider, Track, TrackSearchProvider,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// In-memory catalog standing in for Last.fm.
#[derive(Default)]
pub struct StaticCatalog {
    pub tracks: Vec<Track>,
    pub similar: Vec<Track>,
    pub calls: AtomicUsize,
}

impl StaticCatalog {
    pub fn owl_city() -> Self {
        Self {
            tracks: vec![
                Track::new("Fireflies", "Owl City")
                    .with_listeners(1_342_520)
                    .with_mbid("fireflies-mbid")
                    .with_url("https://www.last.fm/music/Owl+City/_/Fireflies"),
                Track::new("Vanilla Twilight", "Owl City").with_listeners(600_000),
                Track::new("Good Time", "Owl City & Carly Rae Jepsen").with_listeners(900_000),
            ],
            similar: vec![
                Track::new("Hello Seattle", "Owl City").with_match_score(1.0),
                Track::new("The Saltwater Room", "Owl City").with_match_score(0.82),
                Track::new("Strawberry Avalanche", "Owl City").with_match_score(0.6),
            ],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackSearchProvider for StaticCatalog {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query = query.to_lowercase();
        Ok(self
            .tracks
            .iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&query) || t.artist.to_lowercase().contains(&query)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SimilarTracksProvider for StaticCatalog {
    async fn similar(&self, track_name: &str, _artist_name: &str, count: u32) -> Result<Vec<Track>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if track_name == "Unknown Track" {
            return Err(RecommendError::Provider("Track not found (code 6)".to_string()));
        }
        Ok(self.similar.iter().take(count as usize).cloned().collect())
    }
}

#[async_trait]
impl RecommendationProvider for StaticCatalog {
    async fn recommend_by_ids(&self, seed_ids: &[String], count: u32) -> Result<Vec<Track>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if seed_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut tracks = self.tracks.clone();
        tracks.sort_by(|a, b| b.listeners.cmp(&a.listeners));
        tracks.truncate(count as usize);
        Ok(tracks)
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    pub handle: JoinHandle<Result<()>>,
    pub catalog: Arc<StaticCatalog>,
}

impl TestServer {
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig::new()
            .with_host("127.0.0.1")
            .with_port(self.addr.port())
    }
}

pub async fn start_server(catalog: StaticCatalog) -> TestServer {
    start_server_with(catalog, ServerConfig::new()).await
}

pub async fn start_server_with(catalog: StaticCatalog, config: ServerConfig) -> TestServer {
    let catalog = Arc::new(catalog);
    let server = SessionServer::bind(
        config.with_host("127.0.0.1").with_port(0),
        Providers::from_shared(catalog.clone()),
    )
    .await
    .expect("failed to bind test server");

    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(server.run());

    TestServer {
        addr,
        shutdown,
        handle,
        catalog,
    }
}
