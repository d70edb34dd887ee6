//! DutaMovie: same muvipro engine as Gomov behind a different domain,
//! section set and metadata markup. Its search endpoint is notoriously
//! slow, hence the long per-call timeout.

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::config::SiteOverride;
use crate::domain::{MediaKind, SearchResult};
use crate::fetcher::FetchRequest;
use crate::pipeline::{PipelineContext, PlayPage};
use crate::sites::gomov::{
    muvipro_discover, muvipro_episodes, muvipro_listing, muvipro_recommendations,
};
use crate::sites::{generic, Adapter, DetailRules, FieldSpec, LinkPlan, Section, SeriesDetect, SiteSpec};

const DEFAULT_BASE: &str = "https://www.pfblawyers.com";

/// Observed worst case for this site's search endpoint.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(50);

pub struct DutaMovie {
    spec: SiteSpec,
}

impl DutaMovie {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let sections = [
            ("category/box-office", "Box Office"),
            ("category/serial-tv", "Serial TV"),
            ("category/animation", "Animasi"),
            ("country/korea", "Serial TV Korea"),
            ("country/indonesia", "Serial TV Indonesia"),
        ]
        .into_iter()
        .map(|(path, label)| Section::new(format!("{base}/{path}/page/{{page}}/"), label))
        .collect();

        let spec = SiteSpec {
            kinds: vec![
                MediaKind::Movie,
                MediaKind::TvSeries,
                MediaKind::Anime,
                MediaKind::AsianDrama,
            ],
            sections,
            search_url: format!("{base}/?s={{query}}&post_type[]=post&post_type[]=tv"),
            listing: muvipro_listing(),
            detail: DetailRules {
                title: FieldSpec::text("h1.entry-title"),
                title_strip: vec!["Season".into(), "Episode".into()],
                poster: Some(FieldSpec::image("figure.pull-left > img")),
                plot: Some(FieldSpec::text("div[itemprop=description] > p")),
                year: Some(
                    FieldSpec::text("div.gmr-moviedata strong")
                        .containing("Year:")
                        .then("a"),
                ),
                tags: Some(
                    FieldSpec::text("div.gmr-moviedata strong")
                        .containing("Genre:")
                        .then("a"),
                ),
                rating: Some(FieldSpec::text(
                    "div.gmr-meta-rating > span[itemprop=ratingValue]",
                )),
                actors: Some(FieldSpec::text("span[itemprop=actors] a")),
                trailer: Some(FieldSpec::attr(
                    "ul.gmr-player-nav li a.gmr-trailer-popup",
                    "href",
                )),
                recommendations: Some(muvipro_recommendations()),
                series: SeriesDetect::UrlContains("/tv/".into()),
                episodes: Some(muvipro_episodes()),
                ..Default::default()
            },
            ..SiteSpec::minimal("dutamovie", &base)
        };
        Self { spec }
    }
}

#[async_trait]
impl Adapter for DutaMovie {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    async fn search(&self, cx: &PipelineContext, query: &str) -> Result<Vec<SearchResult>> {
        let encoded = urlencoding::encode(query);
        let url = self.spec.search_url.replace("{query}", &encoded);
        let response = cx
            .fetcher
            .fetch(FetchRequest::get(url).with_timeout(SEARCH_TIMEOUT))
            .await?;
        generic::parse_listing(&self.spec, &self.spec.listing, &response.final_url, &response.body)
    }

    async fn discover(&self, _cx: &PipelineContext, play: &PlayPage) -> Result<LinkPlan> {
        muvipro_discover(play)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::hosts::ExtractorRegistry;

    #[tokio::test]
    async fn test_search_uses_long_timeout() {
        let url = "https://www.pfblawyers.com/?s=duka&post_type[]=post&post_type[]=tv";
        let fetcher = Arc::new(StaticFetcher::new().page(url, "<html></html>"));
        let cx = PipelineContext {
            fetcher: fetcher.clone(),
            hosts: Arc::new(ExtractorRegistry::builtin()),
        };
        let site = DutaMovie::new(SiteOverride::default());
        site.search(&cx, "duka").await.unwrap();

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].timeout, Some(Duration::from_secs(50)));
    }
}
