use crate::strategy::{RecommendationStrategy, StrategyKind};
use crate::{Result, Track};

/// Holds the active recommendation strategy of one session.
///
/// The engine adds nothing on top of the strategy: no retries, no fallback.
/// Whatever the strategy returns, including its errors, is what the caller gets.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    strategy: RecommendationStrategy,
}

impl RecommendationEngine {
    pub fn new(strategy: RecommendationStrategy) -> Self {
        Self { strategy }
    }

    /// Replace the active strategy. Takes effect for the next call to [`recommend`](Self::recommend).
    pub fn set_strategy(&mut self, strategy: RecommendationStrategy) {
        log::debug!(
            "Switching strategy {} -> {}",
            self.strategy.kind(),
            strategy.kind()
        );
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub async fn recommend(&self, seeds: &[Track], pool: &[Track], count: u32) -> Result<Vec<Track>> {
        self.strategy.recommend(seeds, pool, count).await
    }
}
