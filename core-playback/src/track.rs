//! Track value object and clock-style duration helpers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque catalog identifier; also the entitlement key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A playable catalog item. Read-only once handed to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_name: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Catalog duration. May be missing or wrong; the media's own value wins.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Streamable URI, resolved lazily through the media source when absent.
    #[serde(default)]
    pub media_uri: Option<String>,
    #[serde(default)]
    pub video_uri: Option<String>,
    #[serde(default)]
    pub thumbnail_uri: Option<String>,
    /// Price in the store currency; `0` means freely playable.
    #[serde(default)]
    pub price: f64,
}

impl Track {
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            album: None,
            duration_secs: None,
            media_uri: None,
            video_uri: None,
            thumbnail_uri: None,
            price: 0.0,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_media_uri(mut self, uri: impl Into<String>) -> Self {
        self.media_uri = Some(uri.into());
        self
    }

    pub fn with_video_uri(mut self, uri: impl Into<String>) -> Self {
        self.video_uri = Some(uri.into());
        self
    }

    pub fn with_thumbnail_uri(mut self, uri: impl Into<String>) -> Self {
        self.thumbnail_uri = Some(uri.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Whether playback must pass the entitlement check first. Only a
    /// price of zero or below is free; NaN counts as priced.
    pub fn requires_entitlement(&self) -> bool {
        self.price.is_nan() || self.price > 0.0
    }

    /// Catalog duration, if it is a usable positive number.
    pub(crate) fn known_duration(&self) -> Option<f64> {
        self.duration_secs.filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// Parse `m:ss` or `h:mm:ss` into seconds.
///
/// Returns `None` for anything else, including negative parts or seconds
/// and minutes fields of 60 or more after the leading field.
pub fn parse_clock_duration(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    let mut total: u64 = 0;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let field: u64 = part.parse().ok()?;
        if index > 0 && field >= 60 {
            return None;
        }
        total = total.checked_mul(60)?.checked_add(field)?;
    }

    Some(total as f64)
}

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up.
///
/// Negative and non-finite values format as `0:00`.
pub fn format_clock(secs: f64) -> String {
    let whole = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };

    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = whole % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_duration() {
        assert_eq!(parse_clock_duration("5:55"), Some(355.0));
        assert_eq!(parse_clock_duration("0:07"), Some(7.0));
        assert_eq!(parse_clock_duration("1:02:03"), Some(3723.0));
        assert_eq!(parse_clock_duration(" 3:00 "), Some(180.0));
    }

    #[test]
    fn test_parse_clock_duration_rejects_garbage() {
        assert_eq!(parse_clock_duration(""), None);
        assert_eq!(parse_clock_duration("355"), None);
        assert_eq!(parse_clock_duration("5:75"), None);
        assert_eq!(parse_clock_duration("-1:00"), None);
        assert_eq!(parse_clock_duration("1:2:3:4"), None);
        assert_eq!(parse_clock_duration("a:bc"), None);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(355.0), "5:55");
        assert_eq!(format_clock(59.9), "0:59");
        assert_eq!(format_clock(3723.0), "1:02:03");
        assert_eq!(format_clock(-4.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }

    #[test]
    fn test_requires_entitlement() {
        assert!(!Track::new("1", "Free", "A").requires_entitlement());
        assert!(Track::new("2", "Paid", "B")
            .with_price(1.99)
            .requires_entitlement());
    }

    #[test]
    fn test_unreadable_price_requires_entitlement() {
        let track = Track::new("3", "Odd", "C");
        assert!(track.clone().with_price(f64::NAN).requires_entitlement());
        assert!(track.clone().with_price(f64::INFINITY).requires_entitlement());
        assert!(!track.clone().with_price(0.0).requires_entitlement());
        assert!(!track.with_price(-1.0).requires_entitlement());
    }

    #[test]
    fn test_known_duration_ignores_nonsense() {
        assert_eq!(Track::new("1", "t", "a").known_duration(), None);
        assert_eq!(
            Track::new("1", "t", "a").with_duration_secs(0.0).known_duration(),
            None
        );
        assert_eq!(
            Track::new("1", "t", "a").with_duration_secs(180.0).known_duration(),
            Some(180.0)
        );
    }

    #[test]
    fn test_deserialize_minimal_track() {
        let track: Track =
            serde_json::from_str(r#"{ "id": "42", "title": "Naima", "artist_name": "Coltrane" }"#)
                .unwrap();
        assert_eq!(track.id, TrackId::new("42"));
        assert_eq!(track.price, 0.0);
        assert!(track.media_uri.is_none());
    }
}
