use crate::{Result, Track};
use async_trait::async_trait;
use std::sync::Arc;

/// Free-text track search against an external catalog.
///
/// Providers are shared by every session on the server, so implementations
/// must be stateless or internally synchronised.
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockTrackSearchProvider`
/// that implements this trait using the `mockall` library. The same goes for the
/// other provider traits in this module.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait TrackSearchProvider: Send + Sync {
    /// Search the catalog for up to `limit` tracks matching `query`.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>>;
}

/// Tracks that sound like a given track.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SimilarTracksProvider: Send + Sync {
    /// Up to `count` tracks similar to `track_name` by `artist_name`, each with its match score.
    async fn similar(&self, track_name: &str, artist_name: &str, count: u32)
        -> Result<Vec<Track>>;
}

/// Recommendations seeded by external track identifiers.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Up to `count` tracks recommended from the given seed ids.
    async fn recommend_by_ids(&self, seed_ids: &[String], count: u32) -> Result<Vec<Track>>;
}

/// The set of external providers a server hands to each of its sessions.
///
/// Cloning is cheap: every capability sits behind an [`Arc`].
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn TrackSearchProvider>,
    pub similar: Arc<dyn SimilarTracksProvider>,
    pub recommend: Arc<dyn RecommendationProvider>,
}

impl Providers {
    pub fn new(
        search: Arc<dyn TrackSearchProvider>,
        similar: Arc<dyn SimilarTracksProvider>,
        recommend: Arc<dyn RecommendationProvider>,
    ) -> Self {
        Self {
            search,
            similar,
            recommend,
        }
    }

    /// Use one client for all three capabilities.
    pub fn from_shared<P>(provider: Arc<P>) -> Self
    where
        P: TrackSearchProvider + SimilarTracksProvider + RecommendationProvider + 'static,
    {
        Self {
            search: provider.clone(),
            similar: provider.clone(),
            recommend: provider,
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}
