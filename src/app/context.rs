use std::path::Path;
use std::sync::Arc;

use crate::app::{Result, TributaryError};
use crate::config::Config;
use crate::domain::EpisodeRef;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::hosts::ExtractorRegistry;
use crate::pipeline::{
    Orchestrator, PipelineContext, ResolvedLinks, StreamCallback, SubtitleCallback,
};
use crate::sites::{Adapter, SiteRegistry};

/// Wires config → fetcher → extractor registry → site registry →
/// orchestrator. This is the embedding surface for a host application.
pub struct AppContext {
    pub config: Config,
    pub sites: SiteRegistry,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path)?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        let user_agent = config.fetch.user_agent.clone();
        let fetcher: Arc<dyn Fetcher> = match user_agent {
            Some(ua) => Arc::new(HttpFetcher::with_options(&ua, config.fetch.timeout())),
            None => Arc::new(HttpFetcher::new()),
        };
        Self::with_fetcher(config, fetcher)
    }

    /// Entry point for tests and embedders with their own transport.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let cx = PipelineContext {
            fetcher,
            hosts: Arc::new(ExtractorRegistry::builtin()),
        };
        let orchestrator = Orchestrator::with_workers(cx, config.pipeline.workers);
        let sites = SiteRegistry::with_config(&config);
        Self {
            config,
            sites,
            orchestrator,
        }
    }

    pub fn adapter(&self, name: &str) -> Result<Arc<dyn Adapter>> {
        self.sites
            .get(name)
            .ok_or_else(|| TributaryError::UnknownSite(name.to_string()))
    }

    pub fn pipeline_context(&self) -> &PipelineContext {
        self.orchestrator.context()
    }

    /// Host-facing link resolution: delivers every resolved stream and
    /// subtitle through the callbacks and returns how many streams were
    /// emitted. Zero is a valid outcome, not an error.
    pub async fn load_links(
        &self,
        site: &str,
        url: &str,
        on_stream: StreamCallback,
        on_subtitle: SubtitleCallback,
    ) -> Result<usize> {
        let adapter = self.adapter(site)?;
        let target = EpisodeRef::new(url, url);
        let links = self
            .orchestrator
            .resolve_all(adapter, &target, Some(on_stream), Some(on_subtitle))
            .await?;
        Ok(links.streams.len())
    }

    /// Collecting variant of [`load_links`](Self::load_links).
    pub async fn resolve_links(&self, site: &str, url: &str) -> Result<ResolvedLinks> {
        let adapter = self.adapter(site)?;
        let target = EpisodeRef::new(url, url);
        self.orchestrator.resolve_all(adapter, &target, None, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;

    #[test]
    fn test_unknown_site_is_an_error() {
        let ctx = AppContext::with_fetcher(Config::default(), Arc::new(StaticFetcher::new()));
        assert!(matches!(
            ctx.adapter("nope"),
            Err(TributaryError::UnknownSite(_))
        ));
        assert!(ctx.adapter("dramaid").is_ok());
    }
}
