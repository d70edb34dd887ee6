//! Known video-host extractor registry.
//!
//! When a resolved reference points at a recognized third-party video
//! host rather than a site-specific sub-API, the matching extractor turns
//! it into playable streams. The registry is the fallback of last resort
//! for every adapter; embedders extend it with their own extractors.

use async_trait::async_trait;

use crate::app::Result;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::pipeline::EmitSink;
use crate::resolve::parse_sources_script;

#[async_trait]
pub trait HostExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, url: &str) -> bool;

    /// Emit streams/subtitles for `url`. Returns whether anything was
    /// emitted.
    async fn extract(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        referer: Option<&str>,
        sink: &EmitSink,
    ) -> Result<bool>;
}

pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn HostExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with the built-in extractors.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DirectFileHost));
        registry.register(Box::new(ScriptSourcesHost::default()));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn HostExtractor>) {
        self.extractors.push(extractor);
    }

    /// First matching extractor wins. A failing extractor drops the
    /// reference silently; the pipeline's candidate isolation applies
    /// here too.
    pub async fn resolve_known_host(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        referer: Option<&str>,
        sink: &EmitSink,
    ) -> bool {
        for extractor in &self.extractors {
            if !extractor.can_handle(url) {
                continue;
            }
            return match extractor.extract(fetcher, url, referer, sink).await {
                Ok(emitted) => emitted,
                Err(err) => {
                    tracing::debug!(host = extractor.name(), url, %err, "extractor failed");
                    false
                }
            };
        }
        false
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

const DIRECT_EXTENSIONS: &[&str] = &[".m3u8", ".mp4", ".mkv", ".webm", ".avi", ".mov"];

/// URLs that already point at a media file or manifest need no host page
/// at all.
pub struct DirectFileHost;

#[async_trait]
impl HostExtractor for DirectFileHost {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn can_handle(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        DIRECT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    async fn extract(
        &self,
        _fetcher: &dyn Fetcher,
        url: &str,
        referer: Option<&str>,
        sink: &EmitSink,
    ) -> Result<bool> {
        // The file name is the only quality hint a bare URL carries.
        let label = url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("Direct");
        sink.stream(label, url, referer.map(String::from));
        Ok(true)
    }
}

/// Mirror family whose player pages embed a `sources: [...]` script
/// (bk21/lkc21 and friends).
pub struct ScriptSourcesHost {
    hosts: Vec<String>,
}

impl ScriptSourcesHost {
    pub fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }
}

impl Default for ScriptSourcesHost {
    fn default() -> Self {
        Self::new(vec!["bk21.net".into(), "lkc21.net".into()])
    }
}

#[async_trait]
impl HostExtractor for ScriptSourcesHost {
    fn name(&self) -> &'static str {
        "script-sources"
    }

    fn can_handle(&self, url: &str) -> bool {
        self.hosts.iter().any(|host| url.contains(host.as_str()))
    }

    async fn extract(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        referer: Option<&str>,
        sink: &EmitSink,
    ) -> Result<bool> {
        let mut request = FetchRequest::get(url);
        if let Some(referer) = referer {
            request = request.with_referer(referer);
        }
        let response = fetcher.fetch(request).await?;

        let entries = parse_sources_script(&response.body);
        for (file, label) in &entries {
            sink.stream(
                label.as_deref().unwrap_or(self.name()),
                file,
                referer.map(String::from),
            );
        }
        Ok(!entries.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;

    #[tokio::test]
    async fn test_direct_file_host() {
        let fetcher = StaticFetcher::new();
        let registry = ExtractorRegistry::builtin();
        let sink = EmitSink::collecting("test");

        let handled = registry
            .resolve_known_host(&fetcher, "https://cdn/x.m3u8?t=1", Some("https://r/"), &sink)
            .await;
        assert!(handled);
        let links = sink.collected();
        assert_eq!(links.streams.len(), 1);
        assert!(links.streams[0].is_manifest);
        assert_eq!(links.streams[0].label, "x.m3u8");
        assert_eq!(links.streams[0].referer.as_deref(), Some("https://r/"));
    }

    #[tokio::test]
    async fn test_script_sources_host() {
        let fetcher = StaticFetcher::new().page(
            "https://bk21.net/embed/9",
            r#"<script>jwplayer().setup({sources: [{"file":"https://cdn/720.mp4","label":"720p"}]})</script>"#,
        );
        let registry = ExtractorRegistry::builtin();
        let sink = EmitSink::collecting("test");

        let handled = registry
            .resolve_known_host(&fetcher, "https://bk21.net/embed/9", None, &sink)
            .await;
        assert!(handled);
        assert_eq!(sink.stream_count(), 1);
        assert_eq!(sink.collected().streams[0].label, "720p");
    }

    #[tokio::test]
    async fn test_unknown_host_is_not_handled() {
        let fetcher = StaticFetcher::new();
        let registry = ExtractorRegistry::builtin();
        let sink = EmitSink::collecting("test");

        let handled = registry
            .resolve_known_host(&fetcher, "https://mystery.example/page", None, &sink)
            .await;
        assert!(!handled);
        assert!(sink.collected().is_empty());
    }

    #[tokio::test]
    async fn test_failing_extractor_emits_nothing() {
        let fetcher = StaticFetcher::new().failing("https://bk21.net/embed/dead");
        let registry = ExtractorRegistry::builtin();
        let sink = EmitSink::collecting("test");

        let handled = registry
            .resolve_known_host(&fetcher, "https://bk21.net/embed/dead", None, &sink)
            .await;
        assert!(!handled);
        assert!(sink.collected().is_empty());
    }
}
