use crate::provider::{Providers, RecommendationProvider, SimilarTracksProvider};
use crate::{RecommendError, Result, Track};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The names of the available recommendation strategies.
///
/// Parsing is case-insensitive:
///
/// ```rust
/// use lastfm_recommend::StrategyKind;
///
/// assert_eq!("Random".parse::<StrategyKind>()?, StrategyKind::Random);
/// assert!("loudness".parse::<StrategyKind>().is_err());
/// # Ok::<(), lastfm_recommend::RecommendError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    #[default]
    Similarity,
    Popularity,
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Similarity,
        StrategyKind::Popularity,
        StrategyKind::Random,
    ];

    /// Canonical lower-case name, as accepted by `SET_STRATEGY`.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Similarity => "similarity",
            StrategyKind::Popularity => "popularity",
            StrategyKind::Random => "random",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::Similarity => "Similarity-Based Recommendations (Last.fm)",
            StrategyKind::Popularity => "Popularity-Based Recommendations",
            StrategyKind::Random => "Random Recommendation",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RecommendError::UnknownStrategy(s.to_string()))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recommendation algorithm together with the provider it delegates to.
#[derive(Clone)]
pub enum RecommendationStrategy {
    /// Tracks similar to the first seed, scored by the provider.
    Similarity(Arc<dyn SimilarTracksProvider>),
    /// Provider recommendations seeded by the first seed's external id.
    Popularity(Arc<dyn RecommendationProvider>),
    /// A uniform sample of the session's history; seeds are ignored.
    Random,
}

impl RecommendationStrategy {
    pub fn from_kind(kind: StrategyKind, providers: &Providers) -> Self {
        match kind {
            StrategyKind::Similarity => {
                RecommendationStrategy::Similarity(providers.similar.clone())
            }
            StrategyKind::Popularity => {
                RecommendationStrategy::Popularity(providers.recommend.clone())
            }
            StrategyKind::Random => RecommendationStrategy::Random,
        }
    }

    /// Build a strategy from its name, ignoring case.
    pub fn from_name(name: &str, providers: &Providers) -> Result<Self> {
        Ok(Self::from_kind(name.parse()?, providers))
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            RecommendationStrategy::Similarity(_) => StrategyKind::Similarity,
            RecommendationStrategy::Popularity(_) => StrategyKind::Popularity,
            RecommendationStrategy::Random => StrategyKind::Random,
        }
    }

    /// Produce up to `count` recommendations.
    ///
    /// `pool` is the calling session's track history; only [`Random`](Self::Random)
    /// looks at it. Provider failures are returned as-is.
    pub async fn recommend(&self, seeds: &[Track], pool: &[Track], count: u32) -> Result<Vec<Track>> {
        match self {
            RecommendationStrategy::Similarity(provider) => {
                let Some(seed) = seeds.first() else {
                    return Ok(Vec::new());
                };
                log::debug!(
                    "Similarity recommendations for '{}' by '{}' (count {count})",
                    seed.name,
                    seed.artist
                );
                provider.similar(&seed.name, &seed.artist, count).await
            }
            RecommendationStrategy::Popularity(provider) => {
                let Some(seed) = seeds.first() else {
                    return Ok(Vec::new());
                };
                let seed_ids: Vec<String> = seed.mbid.iter().cloned().collect();
                log::debug!("Popularity recommendations from seed ids {seed_ids:?} (count {count})");
                provider.recommend_by_ids(&seed_ids, count).await
            }
            RecommendationStrategy::Random => {
                Ok(random_sample(pool, count as usize, &mut rand::thread_rng()))
            }
        }
    }
}

impl fmt::Debug for RecommendationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecommendationStrategy")
            .field(&self.kind())
            .finish()
    }
}

/// Shuffle a copy of `pool` and keep the first `min(count, pool.len())` tracks.
///
/// Match scores are reset to 0 on the way out: they describe similarity to some
/// earlier seed and mean nothing for a random pick.
pub fn random_sample<R: Rng + ?Sized>(pool: &[Track], count: usize, rng: &mut R) -> Vec<Track> {
    let mut tracks = pool.to_vec();
    tracks.shuffle(rng);
    tracks.truncate(count.min(pool.len()));
    for track in &mut tracks {
        track.match_score = 0.0;
    }
    tracks
}
