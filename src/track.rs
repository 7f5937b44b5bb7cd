use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a music track as exchanged between client, server and providers.
///
/// Only `name` and `artist` are required on the wire; every other field falls
/// back to its default when absent. Two tracks with the same name and artist are
/// still distinct values, nothing deduplicates them.
///
/// # Examples
///
/// ```rust
/// use lastfm_recommend::Track;
///
/// let track = Track::new("Fireflies", "Owl City")
///     .with_listeners(1_234_567)
///     .with_match_score(0.87);
///
/// assert_eq!(track.to_string(), "Owl City - Fireflies (Match: 0.87)");
/// assert_eq!(track.formatted_listeners(), "1,234,567");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// The track name/title
    pub name: String,
    /// The artist name
    pub artist: String,
    /// Canonical catalog page for the track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Number of distinct listeners reported by the catalog
    #[serde(default)]
    pub listeners: u64,
    /// Artwork URL, when the catalog has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// External (MusicBrainz) identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
    /// Similarity to the seed track in `[0, 1]`.
    ///
    /// Only similarity-derived results carry a meaningful score; everything
    /// else reports 0.
    #[serde(default)]
    pub match_score: f64,
}

impl Track {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_listeners(mut self, listeners: u64) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_mbid(mut self, mbid: impl Into<String>) -> Self {
        self.mbid = Some(mbid.into());
        self
    }

    /// Set the match score, clamped into `[0, 1]`. NaN becomes 0.
    pub fn with_match_score(mut self, match_score: f64) -> Self {
        self.match_score = if match_score.is_nan() {
            0.0
        } else {
            match_score.clamp(0.0, 1.0)
        };
        self
    }

    /// Whether this track is the same song as `name` by `artist`, ignoring case.
    pub fn is_same_song(&self, name: &str, artist: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.artist.eq_ignore_ascii_case(artist)
    }

    /// Listener count with thousands separators, e.g. `1,234,567`.
    pub fn formatted_listeners(&self) -> String {
        let digits = self.listeners.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.match_score > 0.0 {
            write!(
                f,
                "{} - {} (Match: {:.2})",
                self.artist, self.name, self.match_score
            )
        } else {
            write!(f, "{} - {}", self.artist, self.name)
        }
    }
}
