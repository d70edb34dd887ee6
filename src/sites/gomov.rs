//! Gomov: WordPress "muvipro" theme. Link resolution has two modes:
//! newer pages expose per-server tab pages wrapping an embed iframe,
//! older ones an ajax player endpoint keyed by the page's post id. The
//! same engine backs DutaMovie.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::Result;
use crate::config::SiteOverride;
use crate::domain::{CandidateKind, MediaKind, SourceCandidate};
use crate::extract;
use crate::pipeline::{PipelineContext, PlayPage};
use crate::resolve::{FollowRule, ResolveRules, TerminalRule};
use crate::sites::{
    Adapter, DetailRules, EpisodeRules, FieldSpec, KindRule, LinkPlan, ListRules, Section,
    SeriesDetect, SiteSpec,
};

const DEFAULT_BASE: &str = "https://gomov.top";

static RESIZE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d+x\d+").expect("resize suffix regex"));

/// Posters come through the thumbnailer with a `-300x450` style suffix;
/// the original file has none.
pub(super) fn strip_resize_suffix(url: String) -> String {
    RESIZE_SUFFIX_RE.replace(&url, "").into_owned()
}

/// Listing card layout shared by the muvipro family.
pub(super) fn muvipro_listing() -> ListRules {
    ListRules {
        poster: Some(FieldSpec::image("a > img")),
        quality: Some(FieldSpec::text("div.gmr-qual, div.gmr-quality-item > a")),
        episode_badge: Some(FieldSpec::text("div.gmr-numbeps > span")),
        poster_fix: Some(strip_resize_suffix),
        ..ListRules::new(
            "article.item",
            FieldSpec::text("h2.entry-title > a"),
            FieldSpec::attr("a", "href"),
            KindRule::QualityBadge {
                series: MediaKind::TvSeries,
                movie: MediaKind::Movie,
            },
        )
    }
}

pub(super) fn muvipro_recommendations() -> ListRules {
    ListRules {
        poster: Some(FieldSpec::image("a > img")),
        poster_fix: Some(strip_resize_suffix),
        ..ListRules::new(
            "div.idmuvi-rp ul li",
            FieldSpec::text("a > span.idmuvi-rp-title"),
            FieldSpec::attr("a", "href"),
            KindRule::Fixed(MediaKind::Movie),
        )
    }
}

pub(super) fn muvipro_episodes() -> EpisodeRules {
    EpisodeRules {
        item: "div.vid-episodes a, div.gmr-listseries a".into(),
        episode_pattern: Some(r"(\d+)\s*$".into()),
        season_pattern: Some(r"^\D*(\d+)".into()),
        require_number: true,
        newest_first: false,
        ..Default::default()
    }
}

/// Candidate discovery for muvipro pages: ajax mode when the player
/// content id is present, per-server tab pages otherwise. The page's
/// post-redirect origin is baked into the rules here, per run.
pub(super) fn muvipro_discover(play: &PlayPage) -> Result<LinkPlan> {
    let doc = extract::parse(&play.body);
    let post_id = extract::select_first(&doc, "div#muvipro_player_content_id")?
        .and_then(|el| extract::attr(el, "data-id"));

    if let Some(post_id) = post_id {
        let candidates = extract::select_all(&doc, "div.tab-content-ajax")?
            .into_iter()
            .filter_map(|el| extract::attr(el, "id"))
            .map(|tab| SourceCandidate::new(tab, CandidateKind::AjaxToken))
            .collect();
        return Ok(LinkPlan {
            candidates,
            rules: ResolveRules {
                follow: Some(FollowRule {
                    url_template: Some(format!("{}/wp-admin/admin-ajax.php", play.origin)),
                    referer: Some(format!("{}/", play.origin)),
                    form: vec![
                        ("action".into(), "muvipro_player_content".into()),
                        ("tab".into(), "{ref}".into()),
                        ("post_id".into(), post_id),
                    ],
                    xml_http: false,
                    timeout: None,
                }),
                terminal: TerminalRule::Frame {
                    selector: "iframe".into(),
                    attrs: vec!["src".into()],
                },
                rewrites: Vec::new(),
                stream_referer: Some(format!("{}/", play.origin)),
            },
        });
    }

    let candidates = extract::select_all(&doc, "ul.muvipro-player-tabs li a")?
        .into_iter()
        .filter_map(|el| {
            let href = extract::attr(el, "href")?;
            let url = extract::fix_url(&play.final_url, &href)?;
            Some(SourceCandidate::new(url, CandidateKind::IframeEmbed).with_server(extract::text(el)))
        })
        .collect();
    Ok(LinkPlan {
        candidates,
        rules: ResolveRules {
            follow: Some(FollowRule::get()),
            terminal: TerminalRule::Frame {
                selector: "div.gmr-embed-responsive iframe".into(),
                attrs: vec!["data-litespeed-src".into(), "src".into()],
            },
            rewrites: Vec::new(),
            stream_referer: Some(format!("{}/", play.origin)),
        },
    })
}

pub struct Gomov {
    spec: SiteSpec,
}

impl Gomov {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let sections = [
            ("best-rating", "Best Rating"),
            ("tv", "TV Series"),
            ("category/asia", "Asia"),
            ("category/korean", "Korean"),
            ("category/india", "Indian"),
            ("category/western", "Western"),
            ("category/western-series", "Western Series"),
            ("category/korean-series", "Korean Series"),
            ("category/chinese-series", "Chinese Series"),
            ("category/india-series", "India Series"),
        ]
        .into_iter()
        .map(|(path, label)| Section::new(format!("{base}/{path}/page/{{page}}/"), label))
        .collect();

        let spec = SiteSpec {
            kinds: vec![MediaKind::Movie, MediaKind::TvSeries, MediaKind::AsianDrama],
            sections,
            search_url: format!("{base}/?s={{query}}&post_type[]=post&post_type[]=tv"),
            listing: muvipro_listing(),
            detail: DetailRules {
                title: FieldSpec::text("h1.entry-title"),
                title_strip: vec!["Season".into(), "Episode".into()],
                poster: Some(FieldSpec::image("figure.pull-left > img")),
                plot: Some(FieldSpec::text("div[itemprop=description] > p")),
                year: Some(FieldSpec {
                    contains: Some("Year:".into()),
                    then: Some("a".into()),
                    ..FieldSpec::text("span.gmr-movie-genre")
                }),
                tags: Some(FieldSpec {
                    contains: Some("Genre:".into()),
                    then: Some("a".into()),
                    ..FieldSpec::text("span.gmr-movie-genre")
                }),
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
            ..SiteSpec::minimal("gomov", &base)
        };
        Self { spec }
    }
}

#[async_trait]
impl Adapter for Gomov {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    async fn discover(&self, _cx: &PipelineContext, play: &PlayPage) -> Result<LinkPlan> {
        muvipro_discover(play)
    }
}
