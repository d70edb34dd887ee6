//! LayarKaca: movies live on the LK21 domain, series on a separate
//! "nontondrama" domain. Movie pages sometimes bounce to the series
//! domain through an interstitial, so loading first canonicalizes the
//! link. Providers sit behind one embed page each.

use async_trait::async_trait;

use crate::app::Result;
use crate::config::SiteOverride;
use crate::domain::{CandidateKind, ContentRef, MediaDetail, MediaKind};
use crate::extract;
use crate::fetcher::FetchRequest;
use crate::pipeline::PipelineContext;
use crate::resolve::{FollowRule, ResolveRules, TerminalRule};
use crate::sites::{
    generic, Adapter, CandidateRules, DetailRules, EpisodeRules, FieldSpec, KindRule, ListRules,
    Section, SeriesDetect, SiteSpec, ValueFrom,
};

const DEFAULT_BASE: &str = "https://tv5.lk21official.cc";
const DEFAULT_SERIES: &str = "https://tv14.nontondrama.click";
const PLAYER_REFERER: &str = "https://nganunganu.sbs";

pub struct LayarKaca {
    spec: SiteSpec,
    series_url: String,
}

impl LayarKaca {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let series = overrides.extra("series_url", DEFAULT_SERIES);

        let sections = vec![
            Section::new(format!("{base}/populer/page/{{page}}"), "Film Terpopuler"),
            Section::new(
                format!("{base}/rating/page/{{page}}"),
                "Film Berdasarkan IMDb Rating",
            ),
            Section::new(
                format!("{base}/most-commented/page/{{page}}"),
                "Film Dengan Komentar Terbanyak",
            ),
            Section::new(format!("{base}/latest/page/{{page}}"), "Film Upload Terbaru"),
            Section::new(
                format!("{series}/country/south-korea/page/{{page}}"),
                "Drama Korea",
            ),
            Section::new(format!("{series}/country/china/page/{{page}}"), "Series China"),
            Section::new(format!("{series}/series/west/page/{{page}}"), "Series West"),
            Section::new(format!("{series}/populer/page/{{page}}"), "Series Terpopuler"),
            Section::new(
                format!("{series}/latest-series/page/{{page}}"),
                "Series Terbaru",
            ),
        ];

        let listing = ListRules {
            poster: Some(FieldSpec::attr("img", "src")),
            quality: Some(FieldSpec::text("div.quality")),
            episode_badge: Some(FieldSpec::text("div.last-episode span")),
            ..ListRules::new(
                "article.mega-item",
                FieldSpec::own_text("h1.grid-title > a"),
                FieldSpec::attr("a", "href"),
                KindRule::Marker {
                    css: "div.last-episode".into(),
                    series: MediaKind::TvSeries,
                    movie: MediaKind::Movie,
                },
            )
        };

        let search = ListRules {
            poster: Some(FieldSpec::attr("img.img-thumbnail", "src")),
            ..ListRules::new(
                "div.search-item",
                FieldSpec::attr("a", "title"),
                FieldSpec::attr("a", "href"),
                KindRule::Fixed(MediaKind::TvSeries),
            )
        };

        let spec = SiteSpec {
            kinds: vec![MediaKind::Movie, MediaKind::TvSeries, MediaKind::AsianDrama],
            sections,
            search_url: format!("{series}/search.php?s={{query}}"),
            listing,
            search: Some(search),
            detail: DetailRules {
                title: FieldSpec::text("li.last > span[itemprop=name]"),
                poster: Some(FieldSpec::attr("img.img-thumbnail", "src")),
                plot: Some(FieldSpec::text("div.content > blockquote")),
                year: Some(FieldSpec::text("div.content > div:nth-child(7) > h3")),
                year_pattern: Some(r"\d, (\d+)".into()),
                tags: Some(FieldSpec::text("div.content > div:nth-child(5) > h3 > a")),
                rating: Some(FieldSpec::text("div.content > div:nth-child(6) > h3")),
                actors: Some(FieldSpec::text(
                    "div.col-xs-9.content > div:nth-child(3) > h3 > a",
                )),
                trailer: Some(FieldSpec::attr("div.action-player li > a.fancybox", "href")),
                recommendations: Some(ListRules {
                    poster: Some(FieldSpec::attr(".poster-media > a > img", "src")),
                    ..ListRules::new(
                        "div.row.item-media",
                        FieldSpec::text("h3"),
                        FieldSpec::attr(".content-media > a", "href"),
                        KindRule::Fixed(MediaKind::TvSeries),
                    )
                }),
                series: SeriesDetect::Selector("div.serial-wrapper".into()),
                episodes: Some(EpisodeRules {
                    item: "div.episode-list > a".into(),
                    episode_pattern: None,
                    season_pattern: Some(r"season-(\d+)-".into()),
                    season_from_link: true,
                    newest_first: true,
                    ..Default::default()
                }),
                ..Default::default()
            },
            candidates: Some(CandidateRules {
                selector: "ul#loadProviders > li a".into(),
                value: ValueFrom::Attr("href".into()),
                kind: CandidateKind::IframeEmbed,
                server: Some(ValueFrom::Text),
                refine: None,
                absolute: true,
            }),
            rules: ResolveRules {
                follow: Some(FollowRule::get().with_referer(format!("{series}/"))),
                terminal: TerminalRule::Frame {
                    selector: "div.embed iframe".into(),
                    attrs: vec!["src".into()],
                },
                rewrites: Vec::new(),
                stream_referer: Some(PLAYER_REFERER.into()),
            },
            ..SiteSpec::minimal("layarkaca", &base)
        };

        Self {
            spec,
            series_url: series,
        }
    }

    /// Movie URLs may be interstitials pointing at the series domain;
    /// follow them to the canonical page before parsing.
    async fn proper_link(&self, cx: &PipelineContext, url: &str) -> Result<String> {
        if url.starts_with(&self.series_url) {
            return Ok(url.to_string());
        }
        let response = cx.fetcher.fetch(FetchRequest::get(url)).await?;
        let canonical = {
            let doc = extract::parse(&response.body);
            let title = extract::select_first(&doc, "title")?
                .map(extract::text)
                .unwrap_or_default();
            if title.to_lowercase().contains("- nontondrama") {
                let link = extract::select_first(&doc, "div#content a")?
                    .and_then(|el| extract::attr(el, "href"));
                Some(extract::required(link, "canonical series link")?)
            } else {
                None
            }
        };
        Ok(canonical.unwrap_or_else(|| url.to_string()))
    }
}

#[async_trait]
impl Adapter for LayarKaca {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    async fn load(&self, cx: &PipelineContext, content: &ContentRef) -> Result<MediaDetail> {
        let proper = self.proper_link(cx, &content.url).await?;
        generic::load(&self.spec, cx, &ContentRef::new(proper)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::Quality;
    use crate::fetcher::testing::StaticFetcher;
    use crate::hosts::ExtractorRegistry;

    fn site() -> LayarKaca {
        LayarKaca::new(SiteOverride::default())
    }

    fn context(fetcher: StaticFetcher) -> PipelineContext {
        PipelineContext {
            fetcher: Arc::new(fetcher),
            hosts: Arc::new(ExtractorRegistry::builtin()),
        }
    }

    const LISTING: &str = r#"
      <article class="mega-item">
        <h1 class="grid-title"><a href="/film/contoh">Contoh <span>x</span></a></h1>
        <a href="/film/contoh"><img src="https://cdn/contoh.jpg"></a>
        <div class="quality">CAM</div>
      </article>
      <article class="mega-item">
        <h1 class="grid-title"><a href="/drama/seri">Seri</a></h1>
        <a href="/drama/seri"><img src="https://cdn/seri.jpg"></a>
        <div class="last-episode"><span>Episode 9</span></div>
      </article>
    "#;

    #[test]
    fn test_listing_marker_kind() {
        let site = site();
        let results = generic::parse_listing(
            &site.spec,
            &site.spec.listing,
            "https://tv5.lk21official.cc/populer/page/1",
            LISTING,
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, MediaKind::Movie);
        assert_eq!(results[0].quality, Some(Quality::Cam));
        // own_text drops the nested span.
        assert_eq!(results[0].title, "Contoh");
        assert_eq!(results[1].kind, MediaKind::TvSeries);
        assert_eq!(results[1].latest_episode, Some(9));
    }

    #[tokio::test]
    async fn test_search_hits_series_domain() {
        let fetcher = Arc::new(
            StaticFetcher::new().page(
                "https://tv14.nontondrama.click/search.php?s=drama",
                r#"<div class="search-item"><a href="/drama/x" title="Drama X"><img class="img-thumbnail" src="/p.jpg"></a></div>"#,
            ),
        );
        let cx = PipelineContext {
            fetcher: fetcher.clone(),
            hosts: Arc::new(ExtractorRegistry::builtin()),
        };
        let results = site().search(&cx, "drama").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Drama X");
        assert_eq!(
            results[0].content.url,
            "https://tv14.nontondrama.click/drama/x"
        );
    }

    #[tokio::test]
    async fn test_proper_link_follows_interstitial() {
        let fetcher = StaticFetcher::new().page(
            "https://tv5.lk21official.cc/film/moved",
            r#"<html><head><title>Moved - Nontondrama</title></head>
               <body><div id="content"><a href="https://tv14.nontondrama.click/drama/moved">go</a></div></body></html>"#,
        );
        let cx = context(fetcher);
        let proper = site()
            .proper_link(&cx, "https://tv5.lk21official.cc/film/moved")
            .await
            .unwrap();
        assert_eq!(proper, "https://tv14.nontondrama.click/drama/moved");
    }

    #[tokio::test]
    async fn test_proper_link_passthrough_for_series_domain() {
        let cx = context(StaticFetcher::new());
        let url = "https://tv14.nontondrama.click/drama/x";
        // No fetch happens: an unmapped URL would error otherwise.
        assert_eq!(site().proper_link(&cx, url).await.unwrap(), url);
    }

    #[test]
    fn test_episode_season_from_link() {
        let site = site();
        let body = r#"
          <li class="last"><span itemprop="name">Seri Keren</span></li>
          <div class="serial-wrapper"></div>
          <div class="episode-list">
            <a href="https://tv14.nontondrama.click/seri-season-2-episode-2">2</a>
            <a href="https://tv14.nontondrama.click/seri-season-2-episode-1">1</a>
          </div>
        "#;
        let detail = generic::parse_detail(
            &site.spec,
            "https://tv14.nontondrama.click/drama/seri",
            "https://tv14.nontondrama.click",
            body,
        )
        .unwrap();

        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[0].episode, Some(1));
        assert_eq!(detail.episodes[0].season, Some(2));
    }
}
