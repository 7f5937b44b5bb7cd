//! # lastfm-recommend
//!
//! A music recommendation server backed by the Last.fm catalog, and the client
//! that talks to it.
//!
//! Clients exchange one JSON object per line with the server. Each connection
//! gets its own [`ConnectionSession`] holding a track history and an active
//! [`RecommendationStrategy`]; `SEARCH` results feed the history, `RECOMMEND`
//! runs the strategy and `SET_STRATEGY` swaps it.
//!
//! ## Server
//!
//! ```rust,no_run
//! use lastfm_recommend::{ApiConfig, LastFmApiClient, Providers, ServerConfig, SessionServer};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let api = LastFmApiClient::new(
//!     Box::new(http_client::native::NativeClient::new()),
//!     ApiConfig::from_env()?,
//! );
//! let server = SessionServer::bind(ServerConfig::default(), Providers::from_shared(Arc::new(api))).await?;
//! server.run().await?;
//! # Ok::<(), lastfm_recommend::RecommendError>(())
//! # });
//! ```
//!
//! ## Client
//!
//! ```rust,no_run
//! use lastfm_recommend::{Connector, ConnectorConfig};
//!
//! # tokio_test::block_on(async {
//! let mut connector = Connector::new(ConnectorConfig::new().with_host("127.0.0.1"));
//! connector.connect().await?;
//!
//! connector.search_tracks("Fireflies", 1).await?;
//! connector.set_strategy("random").await?;
//! for track in connector.recommend("Fireflies", "Owl City", 5).await? {
//!     println!("{track}");
//! }
//! # Ok::<(), lastfm_recommend::RecommendError>(())
//! # });
//! ```

pub mod api;
pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod request_log;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod strategy;
pub mod track;

pub use api::LastFmApiClient;
pub use config::{ApiConfig, ConnectorConfig, ServerConfig};
pub use connector::Connector;
pub use engine::RecommendationEngine;
pub use error::RecommendError;
pub use protocol::{Request, Response, Status};
pub use provider::{Providers, RecommendationProvider, SimilarTracksProvider, TrackSearchProvider};
#[cfg(feature = "mock")]
pub use provider::{MockRecommendationProvider, MockSimilarTracksProvider, MockTrackSearchProvider};
pub use request_log::RequestLog;
pub use server::SessionServer;
pub use session::{ConnectionSession, SessionState};
pub use shutdown::ShutdownHandle;
pub use strategy::{RecommendationStrategy, StrategyKind};
pub use track::Track;

pub type Result<T> = std::result::Result<T, RecommendError>;
