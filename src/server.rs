use crate::config::ServerConfig;
use crate::provider::Providers;
use crate::request_log::RequestLog;
use crate::session::ConnectionSession;
use crate::shutdown::ShutdownHandle;
use crate::Result;
use std::io;
use std::net::SocketAddr;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections and runs one [`ConnectionSession`] per connection.
///
/// Sessions run as independent tasks and share nothing but the providers, so a
/// client disconnecting or failing only ever ends its own session.
///
/// # Examples
///
/// ```rust,no_run
/// use lastfm_recommend::{LastFmApiClient, ApiConfig, Providers, ServerConfig, SessionServer};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> lastfm_recommend::Result<()> {
///     let api = LastFmApiClient::new(
///         Box::new(http_client::native::NativeClient::new()),
///         ApiConfig::from_env()?,
///     );
///     let server = SessionServer::bind(ServerConfig::default(), Providers::from_shared(Arc::new(api))).await?;
///     server.run().await
/// }
/// ```
pub struct SessionServer {
    listener: TcpListener,
    providers: Providers,
    request_log: Option<RequestLog>,
    shutdown: ShutdownHandle,
}

impl SessionServer {
    /// Bind the listening socket and open the request log, if configured.
    pub async fn bind(config: ServerConfig, providers: Providers) -> Result<Self> {
        let listener = TcpListener::bind(config.addr()).await?;
        let request_log = match &config.request_log {
            Some(path) => Some(RequestLog::open(path).await?),
            None => None,
        };

        log::info!("Recommendation server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            providers,
            request_log,
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle that stops [`run`](Self::run) from any task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept connections until shut down or the listener fails.
    ///
    /// The loop only hands connections off; it never waits on session work.
    pub async fn run(self) -> Result<()> {
        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.wait() => {
                    log::info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => self.spawn_session(stream, addr),
                Err(e) if is_transient_accept_error(&e) => {
                    log::warn!("Failed to accept connection: {e}");
                }
                Err(e) => {
                    log::error!("Listener failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        log::info!("New client connected: {addr}");

        let mut session = ConnectionSession::new(addr.to_string(), self.providers.clone());
        if let Some(request_log) = &self.request_log {
            session = session.with_request_log(request_log.clone());
        }

        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            match session.run(BufReader::new(reader), writer).await {
                Ok(served) => log::info!("Client {addr} disconnected after {served} requests"),
                Err(e) => log::warn!("Session for {addr} ended with error: {e}"),
            }
        });
    }
}

/// Errors that concern one pending connection rather than the listener itself.
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
