use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Normalized quality ranking, inferred from free-text labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    P240,
    P144,
    Hd,
    Sd,
    Cam,
    Unknown,
}

/// Fixed label vocabulary, longest token first so that e.g. "HDCam"
/// matches `Cam` before the shorter "hd" token gets a chance.
static QUALITY_VOCABULARY: Lazy<Vec<(&'static str, Quality)>> = Lazy::new(|| {
    let mut vocab = vec![
        ("2160p", Quality::P2160),
        ("2160", Quality::P2160),
        ("1440p", Quality::P1440),
        ("1440", Quality::P1440),
        ("1080p", Quality::P1080),
        ("1080", Quality::P1080),
        ("720p", Quality::P720),
        ("720", Quality::P720),
        ("480p", Quality::P480),
        ("480", Quality::P480),
        ("360p", Quality::P360),
        ("360", Quality::P360),
        ("240p", Quality::P240),
        ("240", Quality::P240),
        ("144p", Quality::P144),
        ("144", Quality::P144),
        ("4k", Quality::P2160),
        ("uhd", Quality::P2160),
        ("fhd", Quality::P1080),
        ("hdcam", Quality::Cam),
        ("cam", Quality::Cam),
        ("hd", Quality::Hd),
        ("sd", Quality::Sd),
    ];
    vocab.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    vocab
});

impl Quality {
    /// Longest-match inference against the fixed vocabulary. Pure and
    /// deterministic; unrecognized labels yield `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        for (token, quality) in QUALITY_VOCABULARY.iter() {
            if label.contains(token) {
                return *quality;
            }
        }
        Self::Unknown
    }

    /// Approximate pixel height used for ranking.
    pub fn rank(&self) -> u32 {
        match self {
            Self::P2160 => 2160,
            Self::P1440 => 1440,
            Self::P1080 => 1080,
            Self::P720 => 720,
            Self::P480 => 480,
            Self::P360 => 360,
            Self::P240 => 240,
            Self::P144 => 144,
            Self::Hd => 720,
            Self::Sd => 480,
            Self::Cam => 240,
            Self::Unknown => 0,
        }
    }
}

/// A resolved URL ending in `.m3u8` is an adaptive manifest; the query
/// string does not participate in the decision.
pub fn is_manifest_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".m3u8")
}

/// Terminal output of the pipeline. Ownership passes to the caller's
/// callback at emission; nothing is stored beyond the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Site the stream came from.
    pub source: String,
    /// Server/mirror label.
    pub label: String,
    pub url: String,
    pub referer: Option<String>,
    pub quality: Quality,
    pub is_manifest: bool,
}

impl StreamDescriptor {
    pub fn new(
        source: impl Into<String>,
        label: impl Into<String>,
        url: impl Into<String>,
        referer: Option<String>,
    ) -> Self {
        let label = label.into();
        let url = url.into();
        let quality = Quality::from_label(&label);
        let is_manifest = is_manifest_url(&url);
        Self {
            source: source.into(),
            label,
            url,
            referer,
            quality,
            is_manifest,
        }
    }

    /// Headers a player must send to fetch this stream.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.referer
            .iter()
            .map(|r| ("Referer".to_string(), r.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleDescriptor {
    pub language: String,
    pub url: String,
}

impl SubtitleDescriptor {
    pub fn new(language: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_from_resolution_label() {
        assert_eq!(Quality::from_label("720p"), Quality::P720);
        assert_eq!(Quality::from_label("WEB-DL 1080p"), Quality::P1080);
        assert_eq!(Quality::from_label("360"), Quality::P360);
    }

    #[test]
    fn test_quality_from_tier_label() {
        assert_eq!(Quality::from_label("HD"), Quality::Hd);
        assert_eq!(Quality::from_label("CAM"), Quality::Cam);
        assert_eq!(Quality::from_label("HDCam"), Quality::Cam);
        assert_eq!(Quality::from_label("4K UHD"), Quality::P2160);
    }

    #[test]
    fn test_quality_unknown_fallback() {
        assert_eq!(Quality::from_label("Server Alpha"), Quality::Unknown);
        assert_eq!(Quality::from_label(""), Quality::Unknown);
    }

    #[test]
    fn test_quality_is_deterministic() {
        for label in ["720p", "HD", "garbage", "HDCam 480"] {
            assert_eq!(Quality::from_label(label), Quality::from_label(label));
        }
    }

    #[test]
    fn test_manifest_detection() {
        assert!(is_manifest_url("https://cdn.example/playlist.m3u8"));
        assert!(is_manifest_url("https://cdn.example/playlist.M3U8?token=x"));
        assert!(!is_manifest_url("https://cdn.example/video.mp4"));
        assert!(!is_manifest_url("https://cdn.example/video.mp4?fake=.m3u8"));
    }

    #[test]
    fn test_descriptor_infers_quality_and_manifest() {
        let d = StreamDescriptor::new("site", "720p", "https://c/x.m3u8", None);
        assert_eq!(d.quality, Quality::P720);
        assert!(d.is_manifest);

        let d = StreamDescriptor::new("site", "mirror", "https://c/x.mp4", None);
        assert_eq!(d.quality, Quality::Unknown);
        assert!(!d.is_manifest);
    }

    #[test]
    fn test_descriptor_headers() {
        let d = StreamDescriptor::new("s", "l", "u", Some("https://ref/".into()));
        assert_eq!(d.headers(), vec![("Referer".to_string(), "https://ref/".to_string())]);
        let d = StreamDescriptor::new("s", "l", "u", None);
        assert!(d.headers().is_empty());
    }
}
