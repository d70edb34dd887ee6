use serde::{Deserialize, Serialize};

use crate::domain::ContentRef;

/// A playback target: the page to resolve links from, plus optional
/// ordinal attributes. Several of these belong to one `ContentRef`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub content: ContentRef,
    pub name: String,
    pub episode: Option<u32>,
    pub season: Option<u32>,
}

impl EpisodeRef {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            content: ContentRef::new(url),
            name: name.into(),
            episode: None,
            season: None,
        }
    }

    pub fn with_numbers(mut self, episode: Option<u32>, season: Option<u32>) -> Self {
        self.episode = episode;
        self.season = season;
        self
    }
}
