//! Anoboy: listing and search are JSON ajax endpoints gated on the
//! `X-Requested-With` header. The player iframe carries a token after
//! `html#` that resolves through the gomunimes sub-provider API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::{Result, TributaryError};
use crate::config::SiteOverride;
use crate::domain::{CandidateKind, MediaKind, SearchResult};
use crate::fetcher::FetchRequest;
use crate::pipeline::PipelineContext;
use crate::resolve::{FollowRule, ResolveRules, TerminalRule};
use crate::sites::{
    Adapter, CandidateRules, DetailRules, FieldSpec, Section, SiteSpec, ValueFrom,
};

const DEFAULT_BASE: &str = "https://ww3.anoboy.app";
const DEFAULT_IMAGE: &str = "https://ww25.upload.anoboy.life";
const STREAM_API: &str = "https://gomunimes.com/stream?id={ref}";

fn map_kind(label: &str, _is_series: bool) -> MediaKind {
    let label = label.to_lowercase();
    if label.contains("ova") || label.contains("special") {
        MediaKind::Ova
    } else if label.contains("movie") {
        MediaKind::AnimeMovie
    } else {
        MediaKind::Anime
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    post_title: Option<String>,
    post_name: Option<String>,
    image: Option<String>,
    total_episode: Option<String>,
}

pub struct Anoboy {
    spec: SiteSpec,
    image_url: String,
}

impl Anoboy {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let image_url = overrides.extra("image_url", DEFAULT_IMAGE);
        let sections = [
            ("", "Latest Release"),
            ("&category=anime-movie", "Anime Movie"),
            ("&category=live-action-movie", "Live Action Movie"),
            ("&category=anime", "Anime"),
        ]
        .into_iter()
        .map(|(params, label)| Section::new(format!("{base}/my-ajax?page={{page}}{params}"), label))
        .collect();

        let spec = SiteSpec {
            kinds: vec![MediaKind::Anime, MediaKind::AnimeMovie, MediaKind::Ova],
            sections,
            search_url: format!(
                "{base}/my-ajax?page=1&limit=10&action=load_search_movie&keyword={{query}}"
            ),
            detail: DetailRules {
                title: FieldSpec::text(".entry-title"),
                poster: Some(FieldSpec::attr(".thumbposter > img", "src")),
                plot: Some(FieldSpec::text("div[itemprop=description] > p")),
                year: Some(FieldSpec::own_text("div.info-content .spe span.split")),
                year_pattern: Some(r"\d, (\d+)".into()),
                tags: Some(FieldSpec::text(".genxed > a")),
                status: Some(FieldSpec::own_text(".spe > span")),
                kind_text: Some(FieldSpec::own_text("div.info-content .spe span:last-child")),
                kind_map: Some(map_kind),
                series_kind: MediaKind::Anime,
                ..Default::default()
            },
            candidates: Some(CandidateRules {
                selector: "div.player-container iframe".into(),
                value: ValueFrom::Attr("src".into()),
                kind: CandidateKind::DirectApi,
                server: None,
                refine: Some(r"html#(.+)$".into()),
                absolute: false,
            }),
            rules: ResolveRules {
                follow: Some(FollowRule::get().with_url(STREAM_API)),
                terminal: TerminalRule::JsonPath(vec![
                    "server".into(),
                    "streamsb".into(),
                    "link".into(),
                ]),
                rewrites: vec![("vidgomunimesb.xyz".into(), "watchsb.com".into())],
                stream_referer: Some(base.clone()),
            },
            ..SiteSpec::minimal("anoboy", &base)
        };
        Self { spec, image_url }
    }

    fn entries_to_results(&self, listing: Listing) -> Vec<SearchResult> {
        listing
            .data
            .into_iter()
            .filter_map(|entry| {
                let title = entry.post_title?;
                let slug = entry.post_name?;
                let mut result = SearchResult::new(
                    title,
                    format!("{}/anime/{slug}", self.spec.base_url),
                    MediaKind::Anime,
                );
                result.poster = entry
                    .image
                    .map(|image| format!("{}/{image}", self.image_url));
                result.latest_episode = entry.total_episode.and_then(|t| t.parse().ok());
                Some(result)
            })
            .collect()
    }

    fn parse_listing_json(&self, body: &str) -> Result<Vec<SearchResult>> {
        let listing: Listing = serde_json::from_str(body)
            .map_err(|e| TributaryError::Parse(format!("invalid ajax listing: {e}")))?;
        Ok(self.entries_to_results(listing))
    }
}

#[async_trait]
impl Adapter for Anoboy {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    async fn main_page(
        &self,
        cx: &PipelineContext,
        section: &Section,
        page: u32,
    ) -> Result<Vec<SearchResult>> {
        let url = section.url.replace("{page}", &page.to_string());
        let response = cx
            .fetcher
            .fetch(FetchRequest::get(url).xml_http_request())
            .await?;
        self.parse_listing_json(&response.body)
    }

    async fn search(&self, cx: &PipelineContext, query: &str) -> Result<Vec<SearchResult>> {
        let encoded = urlencoding::encode(query);
        let url = self.spec.search_url.replace("{query}", &encoded);
        let referer = format!("{}/search/?keyword={encoded}", self.spec.base_url);
        let response = cx
            .fetcher
            .fetch(FetchRequest::get(url).with_referer(referer).xml_http_request())
            .await?;
        self.parse_listing_json(&response.body)
    }
}
