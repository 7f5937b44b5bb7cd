//! Request and response envelopes for the line-delimited JSON protocol.
//!
//! Every message is a single JSON object on its own line, in both directions.
//! Requests are tagged by their `action` field; responses carry a `status` of
//! either `success` or `error`.

use crate::{RecommendError, Result, Track};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of results returned by `SEARCH` when no `limit` is given.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Number of results returned by `RECOMMEND` when no `count` is given.
pub const DEFAULT_RECOMMEND_COUNT: u32 = 5;

/// A client request.
///
/// # Examples
///
/// ```rust
/// use lastfm_recommend::Request;
///
/// let request = Request::from_line(r#"{"action":"SEARCH","query":"Fireflies","limit":1}"#)?;
/// assert_eq!(request, Request::search("Fireflies", Some(1)));
/// assert_eq!(request.action(), "SEARCH");
/// # Ok::<(), lastfm_recommend::RecommendError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    Search {
        query: String,
        #[serde(
            default,
            deserialize_with = "deserialize_count",
            skip_serializing_if = "Option::is_none"
        )]
        limit: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Recommend {
        track_name: String,
        artist_name: String,
        #[serde(
            default,
            deserialize_with = "deserialize_count",
            skip_serializing_if = "Option::is_none"
        )]
        count: Option<u32>,
    },
    SetStrategy {
        strategy: String,
    },
}

impl Request {
    /// Action names the server dispatches on.
    pub const ACTIONS: [&'static str; 3] = ["SEARCH", "RECOMMEND", "SET_STRATEGY"];

    pub fn search(query: impl Into<String>, limit: Option<u32>) -> Self {
        Request::Search {
            query: query.into(),
            limit,
        }
    }

    pub fn recommend(
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
        count: Option<u32>,
    ) -> Self {
        Request::Recommend {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            count,
        }
    }

    pub fn set_strategy(strategy: impl Into<String>) -> Self {
        Request::SetStrategy {
            strategy: strategy.into(),
        }
    }

    /// The wire name of this request's action.
    pub fn action(&self) -> &'static str {
        match self {
            Request::Search { .. } => "SEARCH",
            Request::Recommend { .. } => "RECOMMEND",
            Request::SetStrategy { .. } => "SET_STRATEGY",
        }
    }

    /// Parse one request line.
    ///
    /// The `action` field is checked before anything else, so an unrecognised
    /// action is reported as [`RecommendError::UnknownAction`] even when the
    /// rest of the envelope would not have parsed either.
    pub fn from_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;

        let action = match value.get("action") {
            Some(Value::String(action)) => action.clone(),
            Some(other) => {
                return Err(RecommendError::Protocol(format!(
                    "field `action` must be a string, got {other}"
                )))
            }
            None => {
                return Err(RecommendError::Protocol(
                    "missing field `action`".to_string(),
                ))
            }
        };

        if !Self::ACTIONS.contains(&action.as_str()) {
            return Err(RecommendError::UnknownAction(action));
        }

        serde_json::from_value(value).map_err(|e| RecommendError::Protocol(e.to_string()))
    }

    /// Serialize to a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Accepts a non-negative integer or a string holding one.
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a non-negative integer, got \"{text}\""))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// A server response.
///
/// Successful `SEARCH` and `RECOMMEND` responses always carry `data`, even when
/// it is empty. `SET_STRATEGY` confirmations carry `message` instead, and
/// errors carry only `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Track>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// A success response carrying a track list.
    pub fn tracks(action: &str, data: Vec<Track>) -> Self {
        Self {
            status: Status::Success,
            action: Some(action.to_string()),
            data: Some(data),
            message: None,
        }
    }

    /// A success response carrying a confirmation message.
    pub fn confirmation(action: &str, message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            action: Some(action.to_string()),
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            action: None,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Parse one response line.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| RecommendError::Protocol(format!("malformed response: {e}")))
    }

    /// Serialize to a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Extract the track list.
    ///
    /// A success envelope with a missing or `null` `data` field yields an empty
    /// list. An error envelope becomes [`RecommendError::Server`].
    pub fn into_tracks(self) -> Result<Vec<Track>> {
        match self.status {
            Status::Success => Ok(self.data.unwrap_or_default()),
            Status::Error => Err(self.into_server_error()),
        }
    }

    /// Extract the confirmation message of a success envelope.
    pub fn into_message(self) -> Result<String> {
        match self.status {
            Status::Success => Ok(self.message.unwrap_or_default()),
            Status::Error => Err(self.into_server_error()),
        }
    }

    fn into_server_error(self) -> RecommendError {
        RecommendError::Server(
            self.message
                .unwrap_or_else(|| "no error message provided".to_string()),
        )
    }
}
