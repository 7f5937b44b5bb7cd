use std::time::Duration;
use thiserror::Error;

/// Error types for the recommendation server, its providers and the client connector.
///
/// Per-request failures (`Protocol`, `UnknownAction`, `UnknownStrategy` and the
/// provider family) are turned into error envelopes by the session that hit them.
/// Transport failures are the only ones that end a session or make the
/// [`Connector`](crate::Connector) reconnect.
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use lastfm_recommend::{Connector, ConnectorConfig, RecommendError};
///
/// #[tokio::main]
/// async fn main() {
///     let mut connector = Connector::new(ConnectorConfig::default());
///
///     match connector.search_tracks("Fireflies", 5).await {
///         Ok(tracks) => println!("Found {} tracks", tracks.len()),
///         Err(RecommendError::Server(msg)) => eprintln!("Server rejected request: {}", msg),
///         Err(e) if e.is_transport() => eprintln!("Server unreachable: {}", e),
///         Err(e) => eprintln!("Other error: {}", e),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The request envelope was malformed or missing a required field.
    #[error("Invalid request: {0}")]
    Protocol(String),

    /// JSON could not be decoded into an envelope.
    #[error("Invalid request: {0}")]
    Json(#[from] serde_json::Error),

    /// The `action` field named something the server does not handle.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// A strategy switch named an unknown strategy.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// The upstream catalog answered with an error payload.
    ///
    /// Last.fm reports failures such as an invalid API key or an unknown track
    /// as a JSON body with `error` and `message` fields.
    #[error("Provider error: {0}")]
    Provider(String),

    /// HTTP/network errors talking to the upstream catalog.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The upstream catalog returned a body that could not be parsed.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The upstream catalog did not answer within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection before a full response line arrived.
    #[error("The server disconnected")]
    Disconnected,

    /// A request was attempted before a connection was opened.
    #[error("Not connected to server")]
    NotConnected,

    /// The server answered a request with an error envelope.
    #[error("Server error: {0}")]
    Server(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecommendError {
    /// Whether this error came from the socket rather than from the content of a message.
    ///
    /// Only transport errors are worth a reconnect: a bad request or an error
    /// envelope would fail the same way on a fresh connection.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RecommendError::Io(_) | RecommendError::Disconnected | RecommendError::NotConnected
        )
    }
}
