pub mod candidate;
pub mod episode;
pub mod media;
pub mod stream;

pub use candidate::{CandidateKind, SourceCandidate};
pub use episode::EpisodeRef;
pub use media::{ContentRef, MediaDetail, MediaKind, SearchResult, ShowStatus};
pub use stream::{is_manifest_url, Quality, StreamDescriptor, SubtitleDescriptor};
