use std::sync::{Arc, Mutex};

use crate::domain::{StreamDescriptor, SubtitleDescriptor};

pub type StreamCallback = Arc<dyn Fn(StreamDescriptor) + Send + Sync>;
pub type SubtitleCallback = Arc<dyn Fn(SubtitleDescriptor) + Send + Sync>;

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLinks {
    pub streams: Vec<StreamDescriptor>,
    pub subtitles: Vec<SubtitleDescriptor>,
}

impl ResolvedLinks {
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.subtitles.is_empty()
    }
}

/// Delivery point for resolved sources: builds the descriptor (quality
/// inference, manifest flag), hands it to the caller's callback and keeps
/// a copy in the collected result set. Emission order across concurrent
/// candidates is unspecified; the host aggregates by set, not sequence.
pub struct EmitSink {
    site: String,
    on_stream: Option<StreamCallback>,
    on_subtitle: Option<SubtitleCallback>,
    links: Mutex<ResolvedLinks>,
}

impl EmitSink {
    pub fn new(
        site: impl Into<String>,
        on_stream: Option<StreamCallback>,
        on_subtitle: Option<SubtitleCallback>,
    ) -> Self {
        Self {
            site: site.into(),
            on_stream,
            on_subtitle,
            links: Mutex::new(ResolvedLinks::default()),
        }
    }

    /// Collect-only sink, used by tests and the CLI.
    pub fn collecting(site: impl Into<String>) -> Self {
        Self::new(site, None, None)
    }

    pub fn stream(&self, label: &str, url: &str, referer: Option<String>) {
        let descriptor = StreamDescriptor::new(&self.site, label, url, referer);
        tracing::debug!(site = %self.site, label, url, "emitting stream");
        if let Some(callback) = &self.on_stream {
            callback(descriptor.clone());
        }
        self.links
            .lock()
            .expect("emit sink poisoned")
            .streams
            .push(descriptor);
    }

    pub fn subtitle(&self, language: &str, url: &str) {
        let descriptor = SubtitleDescriptor::new(language, url);
        if let Some(callback) = &self.on_subtitle {
            callback(descriptor.clone());
        }
        self.links
            .lock()
            .expect("emit sink poisoned")
            .subtitles
            .push(descriptor);
    }

    pub fn stream_count(&self) -> usize {
        self.links.lock().expect("emit sink poisoned").streams.len()
    }

    pub fn collected(&self) -> ResolvedLinks {
        self.links.lock().expect("emit sink poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quality;

    #[test]
    fn test_sink_collects_and_calls_back() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let on_stream: StreamCallback = Arc::new(move |d| {
            seen_cb.lock().unwrap().push(d.url);
        });

        let sink = EmitSink::new("demo", Some(on_stream), None);
        sink.stream("720p", "https://c/a.m3u8", None);
        sink.stream("Alpha", "https://c/b.mp4", Some("https://r/".into()));
        sink.subtitle("Indonesian", "https://c/sub.vtt");

        let links = sink.collected();
        assert_eq!(links.streams.len(), 2);
        assert_eq!(links.subtitles.len(), 1);
        assert_eq!(links.streams[0].quality, Quality::P720);
        assert!(links.streams[0].is_manifest);
        assert_eq!(links.streams[0].source, "demo");
        assert_eq!(*seen.lock().unwrap(), vec!["https://c/a.m3u8", "https://c/b.mp4"]);
        assert_eq!(sink.stream_count(), 2);
    }
}
