use crate::config::ConnectorConfig;
use crate::protocol::{Request, Response};
use crate::{RecommendError, Result, Track};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Client side of the recommendation protocol.
///
/// A connector sends one request line and waits for exactly one response line.
/// The protocol has no request ids, so requests on one connector are strictly
/// sequential; `request` takes `&mut self` to make that impossible to get wrong.
///
/// On a transport failure the connector reconnects once and resends the same
/// request once. A second failure is returned to the caller.
///
/// # Examples
///
/// ```rust,no_run
/// use lastfm_recommend::{Connector, ConnectorConfig};
///
/// # tokio_test::block_on(async {
/// let mut connector = Connector::new(ConnectorConfig::default());
/// connector.connect().await?;
///
/// for track in connector.search_tracks("Fireflies", 5).await? {
///     println!("{track}");
/// }
///
/// connector.set_strategy("random").await?;
/// let picks = connector.recommend("Fireflies", "Owl City", 3).await?;
/// # Ok::<(), lastfm_recommend::RecommendError>(())
/// # });
/// ```
#[derive(Debug)]
pub struct Connector {
    config: ConnectorConfig,
    connection: Option<Connection>,
}

#[derive(Debug)]
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Open a connection to the server, replacing any existing one.
    pub async fn connect(&mut self) -> Result<()> {
        let addr = self.config.addr();
        let stream =
            match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr)).await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    log::warn!("Server connection to {addr} failed: {e}");
                    return Err(e.into());
                }
                Err(_) => {
                    log::warn!("Server connection to {addr} timed out");
                    return Err(RecommendError::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connecting to {addr} timed out"),
                    )));
                }
            };
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        self.connection = Some(Connection {
            reader: BufReader::new(reader),
            writer,
        });
        log::info!("Connected to server at {addr}");
        Ok(())
    }

    /// Drop the current connection and connect again.
    pub async fn retry_connect(&mut self) -> Result<()> {
        self.connection = None;
        match self.connect().await {
            Ok(()) => {
                log::info!("Successfully reconnected");
                Ok(())
            }
            Err(e) => {
                log::warn!("Reconnection failed: {e}");
                Err(e)
            }
        }
    }

    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            log::info!("Disconnected from server");
        }
    }

    /// Whether a connection is open. A peer that went away is only noticed on the next request.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Send `request` and wait for its response.
    ///
    /// Transport failures (including the server closing the connection before
    /// answering) trigger one reconnect and one resend. Error envelopes and
    /// malformed responses are returned without retrying.
    pub async fn request(&mut self, request: &Request) -> Result<Response> {
        let line = request.to_line()?;

        match self.round_trip(&line).await {
            Err(e) if e.is_transport() => {
                log::warn!("Server connection got interrupted: {e}");
                self.retry_connect().await?;
                self.round_trip(&line).await
            }
            result => result,
        }
    }

    /// Search the catalog through the server.
    pub async fn search_tracks(&mut self, query: &str, limit: u32) -> Result<Vec<Track>> {
        self.request(&Request::search(query, Some(limit)))
            .await?
            .into_tracks()
    }

    /// Ask the server for recommendations using this connection's active strategy.
    pub async fn recommend(&mut self, track_name: &str, artist_name: &str, count: u32) -> Result<Vec<Track>> {
        self.request(&Request::recommend(track_name, artist_name, Some(count)))
            .await?
            .into_tracks()
    }

    /// Switch this connection's strategy, returning the server's confirmation.
    ///
    /// Strategies are per connection: a reconnect starts over with the default.
    pub async fn set_strategy(&mut self, strategy: &str) -> Result<String> {
        self.request(&Request::set_strategy(strategy))
            .await?
            .into_message()
    }

    async fn round_trip(&mut self, line: &str) -> Result<Response> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(RecommendError::NotConnected)?;

        let response_line = match connection.exchange(line).await {
            Ok(response_line) => response_line,
            Err(e) => {
                if e.is_transport() {
                    self.connection = None;
                }
                return Err(e);
            }
        };

        Response::from_line(&response_line)
    }
}

impl Connection {
    async fn exchange(&mut self, line: &str) -> Result<String> {
        let mut out = String::with_capacity(line.len() + 1);
        out.push_str(line);
        out.push('\n');
        self.writer.write_all(out.as_bytes()).await?;
        self.writer.flush().await?;

        let mut response = String::new();
        let read = self.reader.read_line(&mut response).await?;
        // A line cut off by end of stream is as good as no line.
        if read == 0 || !response.ends_with('\n') {
            return Err(RecommendError::Disconnected);
        }

        Ok(response.trim_end_matches(['\r', '\n']).to_string())
    }
}
