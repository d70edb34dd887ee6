use serde::{Deserialize, Serialize};

use crate::domain::{EpisodeRef, Quality};

/// Opaque locator for one content page. Produced by search/listing,
/// consumed by `load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub url: String,
}

impl ContentRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Movie,
    TvSeries,
    Anime,
    AnimeMovie,
    Ova,
    AsianDrama,
}

impl MediaKind {
    pub fn is_series(&self) -> bool {
        matches!(self, Self::TvSeries | Self::Anime | Self::AsianDrama)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowStatus {
    Ongoing,
    Completed,
}

impl ShowStatus {
    /// Map a site's free-text status label onto the enum. Unrecognized
    /// labels default to `Completed`, matching the source sites.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("ongoing") || label.eq_ignore_ascii_case("sedang tayang") {
            Self::Ongoing
        } else {
            Self::Completed
        }
    }
}

/// One entry on a listing/search page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub content: ContentRef,
    pub kind: MediaKind,
    pub poster: Option<String>,
    /// Quality badge shown on movie cards.
    pub quality: Option<Quality>,
    /// Latest-episode badge shown on series cards.
    pub latest_episode: Option<u32>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            title: title.into(),
            content: ContentRef::new(url),
            kind,
            poster: None,
            quality: None,
            latest_episode: None,
        }
    }
}

/// Everything `load` extracts from one content page.
///
/// `origin` is the post-redirect `scheme://host` of the page and travels
/// with the detail so downstream link resolution never reads shared state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetail {
    pub title: String,
    pub kind: MediaKind,
    pub origin: String,
    pub poster: Option<String>,
    pub plot: Option<String>,
    pub year: Option<u32>,
    pub tags: Vec<String>,
    /// Rating on a 0..=100 scale ("7.2" parses to 72).
    pub rating: Option<u32>,
    pub actors: Vec<String>,
    pub trailer: Option<String>,
    pub status: Option<ShowStatus>,
    pub recommendations: Vec<SearchResult>,
    /// Ascending playback targets. Movies carry a single entry pointing
    /// back at the content page itself.
    pub episodes: Vec<EpisodeRef>,
}

impl MediaDetail {
    pub fn new(title: impl Into<String>, kind: MediaKind, origin: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            origin: origin.into(),
            poster: None,
            plot: None,
            year: None,
            tags: Vec::new(),
            rating: None,
            actors: Vec::new(),
            trailer: None,
            status: None,
            recommendations: Vec::new(),
            episodes: Vec::new(),
        }
    }
}

/// Parse a "7.2"-style rating into the 0..=100 scale.
pub fn parse_rating(text: &str) -> Option<u32> {
    let value: f32 = text.trim().parse().ok()?;
    if !(0.0..=10.0).contains(&value) {
        return None;
    }
    Some((value * 10.0).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_label() {
        assert_eq!(ShowStatus::from_label("Ongoing"), ShowStatus::Ongoing);
        assert_eq!(ShowStatus::from_label("Sedang Tayang"), ShowStatus::Ongoing);
        assert_eq!(ShowStatus::from_label("Completed"), ShowStatus::Completed);
        assert_eq!(ShowStatus::from_label("Selesai Tayang"), ShowStatus::Completed);
        assert_eq!(ShowStatus::from_label("whatever"), ShowStatus::Completed);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("7.2"), Some(72));
        assert_eq!(parse_rating(" 9 "), Some(90));
        assert_eq!(parse_rating("11.0"), None);
        assert_eq!(parse_rating("N/A"), None);
    }

    #[test]
    fn test_kind_is_series() {
        assert!(MediaKind::TvSeries.is_series());
        assert!(MediaKind::AsianDrama.is_series());
        assert!(!MediaKind::Movie.is_series());
        assert!(!MediaKind::AnimeMovie.is_series());
    }
}
