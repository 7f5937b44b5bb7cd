use crate::engine::RecommendationEngine;
use crate::protocol::{Request, Response, DEFAULT_RECOMMEND_COUNT, DEFAULT_SEARCH_LIMIT};
use crate::provider::Providers;
use crate::request_log::RequestLog;
use crate::strategy::{RecommendationStrategy, StrategyKind};
use crate::{RecommendError, Result, Track};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Where a session is in its read/dispatch/respond cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next request line.
    Reading,
    /// Parsing a line and running the request.
    Dispatching,
    /// Writing the single response line.
    Responding,
    /// End of stream or transport failure; the session will not be used again.
    Closed,
}

/// State and request handling for one client connection.
///
/// A session owns its track history and its recommendation engine outright.
/// Nothing else can reach them, so no locking is involved. Sessions are created
/// per connection and consumed by [`run`](Self::run).
pub struct ConnectionSession {
    peer: String,
    providers: Providers,
    engine: RecommendationEngine,
    history: Vec<Track>,
    request_log: Option<RequestLog>,
    state: SessionState,
    requests_served: u64,
}

impl ConnectionSession {
    /// Create a session for `peer` using the default (similarity) strategy.
    pub fn new(peer: impl Into<String>, providers: Providers) -> Self {
        let engine = RecommendationEngine::new(RecommendationStrategy::from_kind(
            StrategyKind::default(),
            &providers,
        ));
        Self {
            peer: peer.into(),
            providers,
            engine,
            history: Vec::new(),
            request_log: None,
            state: SessionState::Reading,
            requests_served: 0,
        }
    }

    pub fn with_request_log(mut self, request_log: RequestLog) -> Self {
        self.request_log = Some(request_log);
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every track this session has returned from a search or a recommendation, oldest first.
    pub fn history(&self) -> &[Track] {
        &self.history
    }

    pub fn strategy(&self) -> StrategyKind {
        self.engine.strategy()
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served
    }

    /// Serve requests until the client closes the stream.
    ///
    /// Each line gets exactly one response line before the next line is read.
    /// Returns the number of requests served on a clean end of stream; a read or
    /// write failure ends the session with that error.
    pub async fn run<R, W>(mut self, mut reader: R, mut writer: W) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            self.transition(SessionState::Reading);
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    self.transition(SessionState::Closed);
                    return Err(e.into());
                }
            }

            let response = match decode_line(&buf) {
                Ok(line) => self.handle_line(line).await,
                Err(e) => {
                    log::debug!("[{}] Rejected request: {e}", self.peer);
                    Response::error(e.to_string())
                }
            };

            self.transition(SessionState::Responding);
            if let Err(e) = write_response(&mut writer, &response).await {
                self.transition(SessionState::Closed);
                return Err(e);
            }
            self.requests_served += 1;
        }

        self.transition(SessionState::Closed);
        Ok(self.requests_served)
    }

    /// Turn one request line into its response.
    ///
    /// Never fails: malformed lines and failed requests become error envelopes.
    pub async fn handle_line(&mut self, line: &str) -> Response {
        self.transition(SessionState::Dispatching);
        log::debug!("[{}] Received request: {line}", self.peer);

        if let Some(request_log) = &self.request_log {
            if let Err(e) = request_log.append(line) {
                log::warn!(
                    "Dropped request log entry for {}: {e}",
                    request_log.path().display()
                );
            }
        }

        match Request::from_line(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                log::debug!("[{}] Rejected request: {e}", self.peer);
                Response::error(e.to_string())
            }
        }
    }

    /// Run a parsed request against this session's state.
    pub async fn dispatch(&mut self, request: Request) -> Response {
        let action = request.action();

        let result = match request {
            Request::Search { query, limit } => self
                .search(&query, limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
                .await
                .map(|tracks| Response::tracks(action, tracks))
                .map_err(|e| format!("Search failed: {e}")),
            Request::Recommend {
                track_name,
                artist_name,
                count,
            } => self
                .recommend(
                    &track_name,
                    &artist_name,
                    count.unwrap_or(DEFAULT_RECOMMEND_COUNT),
                )
                .await
                .map(|tracks| Response::tracks(action, tracks))
                .map_err(|e| format!("Recommendation failed: {e}")),
            Request::SetStrategy { strategy } => self
                .set_strategy(&strategy)
                .map(|message| Response::confirmation(action, message))
                .map_err(|e| e.to_string()),
        };

        result.unwrap_or_else(|message| {
            log::debug!("[{}] {action} failed: {message}", self.peer);
            Response::error(message)
        })
    }

    async fn search(&mut self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let tracks = self.providers.search.search(query, limit).await?;
        log::debug!(
            "[{}] Search '{query}' returned {} tracks",
            self.peer,
            tracks.len()
        );
        self.history.extend(tracks.iter().cloned());
        Ok(tracks)
    }

    async fn recommend(&mut self, track_name: &str, artist_name: &str, count: u32) -> Result<Vec<Track>> {
        let seeds = vec![self.seed_track(track_name, artist_name)];
        let tracks = self.engine.recommend(&seeds, &self.history, count).await?;
        log::debug!(
            "[{}] {} strategy returned {} tracks for '{track_name}' by '{artist_name}'",
            self.peer,
            self.engine.strategy(),
            tracks.len()
        );
        self.history.extend(tracks.iter().cloned());
        Ok(tracks)
    }

    fn set_strategy(&mut self, name: &str) -> Result<String> {
        let strategy = RecommendationStrategy::from_name(name, &self.providers)?;
        let kind = strategy.kind();
        self.engine.set_strategy(strategy);
        log::info!("[{}] Strategy set to {kind}", self.peer);
        Ok(format!("Strategy set to {}", kind.description()))
    }

    /// The seed for a recommendation, carrying the external id of the same
    /// song if this session has already seen it.
    fn seed_track(&self, track_name: &str, artist_name: &str) -> Track {
        let mut seed = Track::new(track_name, artist_name);
        seed.mbid = self
            .history
            .iter()
            .rev()
            .filter(|t| t.is_same_song(track_name, artist_name))
            .find_map(|t| t.mbid.clone());
        seed
    }

    fn transition(&mut self, next: SessionState) {
        log::trace!("[{}] {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }
}

/// Strip the line terminator and decode. Bytes that are not UTF-8 are a bad
/// request, not a transport failure.
fn decode_line(buf: &[u8]) -> Result<&str> {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line).map_err(|e| RecommendError::Protocol(format!("request is not UTF-8: {e}")))
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = response.to_line()?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;
    use crate::provider::{
        MockRecommendationProvider, MockSimilarTracksProvider, MockTrackSearchProvider,
    };
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn fireflies() -> Track {
        Track::new("Fireflies", "Owl City")
            .with_listeners(1_200_000)
            .with_mbid("fireflies-mbid")
            .with_match_score(0.6)
    }

    fn session_with(
        search: MockTrackSearchProvider,
        similar: MockSimilarTracksProvider,
        recommend: MockRecommendationProvider,
    ) -> ConnectionSession {
        ConnectionSession::new(
            "test-peer",
            Providers::new(Arc::new(search), Arc::new(similar), Arc::new(recommend)),
        )
    }

    fn search_returning(tracks: Vec<Track>) -> MockTrackSearchProvider {
        let mut search = MockTrackSearchProvider::new();
        search
            .expect_search()
            .returning(move |_, _| Ok(tracks.clone()));
        search
    }

    #[tokio::test]
    async fn test_search_defaults_and_records_history() {
        let mut search = MockTrackSearchProvider::new();
        search
            .expect_search()
            .withf(|query, limit| query == "Fireflies" && *limit == 10)
            .times(1)
            .returning(|_, _| Ok(vec![fireflies()]));
        let mut session = session_with(
            search,
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );

        let response = session
            .handle_line(r#"{"action":"SEARCH","query":"Fireflies"}"#)
            .await;

        assert_eq!(response, Response::tracks("SEARCH", vec![fireflies()]));
        assert_eq!(session.history(), &[fireflies()]);
        assert_eq!(session.state(), SessionState::Dispatching);
    }

    #[tokio::test]
    async fn test_recommend_uses_similarity_by_default() {
        let mut similar = MockSimilarTracksProvider::new();
        similar
            .expect_similar()
            .withf(|track, artist, count| {
                track == "Fireflies" && artist == "Owl City" && *count == 5
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![Track::new("Vanilla Twilight", "Owl City").with_match_score(0.9)]));
        let mut session = session_with(
            MockTrackSearchProvider::new(),
            similar,
            MockRecommendationProvider::new(),
        );

        let response = session
            .handle_line(r#"{"action":"RECOMMEND","trackName":"Fireflies","artistName":"Owl City"}"#)
            .await;

        assert!(response.is_success());
        assert_eq!(response.action.as_deref(), Some("RECOMMEND"));
        let data = response.data.unwrap();
        assert_eq!(data[0].name, "Vanilla Twilight");
        assert_eq!(data[0].match_score, 0.9);
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_random_with_empty_history_is_empty_success() {
        let mut session = session_with(
            MockTrackSearchProvider::new(),
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );

        let switched = session
            .handle_line(r#"{"action":"SET_STRATEGY","strategy":"random"}"#)
            .await;
        assert_eq!(
            switched,
            Response::confirmation("SET_STRATEGY", "Strategy set to Random Recommendation")
        );

        let response = session
            .handle_line(r#"{"action":"RECOMMEND","trackName":"a","artistName":"b","count":3}"#)
            .await;
        assert_eq!(response, Response::tracks("RECOMMEND", vec![]));
    }

    #[tokio::test]
    async fn test_random_draws_from_history_with_zero_scores() {
        let pool: Vec<Track> = (0..4)
            .map(|i| Track::new(format!("Song {i}"), "Owl City").with_match_score(0.75))
            .collect();
        let mut session = session_with(
            search_returning(pool),
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );

        session
            .handle_line(r#"{"action":"SEARCH","query":"Owl City","limit":4}"#)
            .await;
        session
            .handle_line(r#"{"action":"SET_STRATEGY","strategy":"RANDOM"}"#)
            .await;

        // Each recommendation joins the history, so the pool grows from 4 to 6.
        for (count, expected) in [(2, 2), (10, 6)] {
            let line = format!(
                r#"{{"action":"RECOMMEND","trackName":"x","artistName":"y","count":{count}}}"#
            );
            let data = session.handle_line(&line).await.data.unwrap();
            assert_eq!(data.len(), expected);
            assert!(data.iter().all(|t| t.match_score == 0.0));
        }
    }

    #[tokio::test]
    async fn test_unknown_action_keeps_session_usable() {
        let mut session = session_with(
            search_returning(vec![fireflies()]),
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );

        let response = session.handle_line(r#"{"action":"PLAY","query":"x"}"#).await;
        assert_eq!(response.status, Status::Error);
        assert!(response.message.unwrap().contains("PLAY"));

        let response = session
            .handle_line(r#"{"action":"SEARCH","query":"Fireflies"}"#)
            .await;
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_unknown_strategy_leaves_previous_active() {
        let mut similar = MockSimilarTracksProvider::new();
        similar
            .expect_similar()
            .times(1)
            .returning(|_, _, _| Ok(vec![Track::new("Vanilla Twilight", "Owl City")]));
        let mut session = session_with(
            MockTrackSearchProvider::new(),
            similar,
            MockRecommendationProvider::new(),
        );

        let response = session
            .handle_line(r#"{"action":"SET_STRATEGY","strategy":"loudness"}"#)
            .await;
        assert_eq!(response, Response::error("Unknown strategy: loudness"));
        assert_eq!(session.strategy(), StrategyKind::Similarity);

        let response = session
            .handle_line(r#"{"action":"RECOMMEND","trackName":"Fireflies","artistName":"Owl City"}"#)
            .await;
        assert_eq!(response.data.unwrap()[0].name, "Vanilla Twilight");
    }

    #[tokio::test]
    async fn test_malformed_requests_become_errors() {
        let mut session = session_with(
            MockTrackSearchProvider::new(),
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );

        for line in [
            "SEARCH:Test Song 1",
            r#"{"action":"SEARCH"}"#,
            r#"{"action":"SEARCH","query":"x","limit":"ten"}"#,
            r#"{"query":"x"}"#,
        ] {
            let response = session.handle_line(line).await;
            assert_eq!(response.status, Status::Error, "line: {line}");
            assert!(response.message.unwrap().starts_with("Invalid request"));
        }
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_response() {
        let mut search = MockTrackSearchProvider::new();
        search
            .expect_search()
            .returning(|_, _| Err(RecommendError::Provider("Invalid API key".to_string())));
        let mut session = session_with(
            search,
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );

        let response = session
            .handle_line(r#"{"action":"SEARCH","query":"Fireflies"}"#)
            .await;
        assert_eq!(
            response,
            Response::error("Search failed: Provider error: Invalid API key")
        );
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_popularity_reuses_known_external_id() {
        let mut recommend = MockRecommendationProvider::new();
        recommend
            .expect_recommend_by_ids()
            .withf(|ids, count| ids == ["fireflies-mbid".to_string()] && *count == 2)
            .times(1)
            .returning(|_, _| Ok(vec![Track::new("Hello Seattle", "Owl City")]));
        let mut session = session_with(
            search_returning(vec![fireflies()]),
            MockSimilarTracksProvider::new(),
            recommend,
        );

        session
            .handle_line(r#"{"action":"SEARCH","query":"Fireflies"}"#)
            .await;
        session
            .handle_line(r#"{"action":"SET_STRATEGY","strategy":"Popularity"}"#)
            .await;
        let response = session
            .handle_line(r#"{"action":"RECOMMEND","trackName":"fireflies","artistName":"owl city","count":2}"#)
            .await;

        assert_eq!(response.data.unwrap()[0].name, "Hello Seattle");
    }

    #[tokio::test]
    async fn test_run_over_stream() {
        let session = session_with(
            search_returning(vec![fireflies()]),
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(session.run(BufReader::new(server_read), server_write));

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut responses = BufReader::new(client_read).lines();

        client_write
            .write_all(b"{\"action\":\"SEARCH\",\"query\":\"Fireflies\",\"limit\":1}\n")
            .await
            .unwrap();
        let line = responses.next_line().await.unwrap().unwrap();
        let response = Response::from_line(&line).unwrap();
        assert_eq!(response.action.as_deref(), Some("SEARCH"));
        let data = response.data.unwrap();
        assert_eq!(data[0].name, "Fireflies");
        assert_eq!(data[0].artist, "Owl City");

        client_write
            .write_all(b"{\"action\":\"SET_STRATEGY\",\"strategy\":\"random\"}\n")
            .await
            .unwrap();
        responses.next_line().await.unwrap().unwrap();

        client_write
            .write_all(b"{\"action\":\"RECOMMEND\",\"trackName\":\"a\",\"artistName\":\"b\"}\n")
            .await
            .unwrap();
        let line = responses.next_line().await.unwrap().unwrap();
        let data = Response::from_line(&line).unwrap().into_tracks().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].name, "Fireflies");
        assert_eq!(data[0].match_score, 0.0);

        drop(client_write);
        drop(responses);
        assert_eq!(task.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_gets_error_and_session_continues() {
        let session = session_with(
            search_returning(vec![fireflies()]),
            MockSimilarTracksProvider::new(),
            MockRecommendationProvider::new(),
        );
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(session.run(BufReader::new(server_read), server_write));

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut responses = BufReader::new(client_read).lines();

        client_write
            .write_all(b"{\"action\":\"SEARCH\",\"query\":\"\xff\xfe\"}\n")
            .await
            .unwrap();
        let line = responses.next_line().await.unwrap().unwrap();
        let response = Response::from_line(&line).unwrap();
        assert_eq!(response.status, Status::Error);
        assert!(response.message.unwrap().starts_with("Invalid request"));

        client_write
            .write_all(b"{\"action\":\"SEARCH\",\"query\":\"Fireflies\"}\r\n")
            .await
            .unwrap();
        let line = responses.next_line().await.unwrap().unwrap();
        let data = Response::from_line(&line).unwrap().into_tracks().unwrap();
        assert_eq!(data, vec![fireflies()]);

        drop(client_write);
        drop(responses);
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"SEARCH\r\n").unwrap(), "SEARCH");
        assert_eq!(decode_line(b"tail").unwrap(), "tail");
        assert!(matches!(
            decode_line(b"\xff\n"),
            Err(RecommendError::Protocol(_))
        ));
    }
}
