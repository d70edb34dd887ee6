//! Rebahin: the play page embeds an iframe on a separate player host;
//! following it lands on a player whose script lists every quality as a
//! sources entry. KitaNonton runs the identical engine on its own
//! domains, so both adapters come out of one parameterized builder.

use async_trait::async_trait;

use crate::config::SiteOverride;
use crate::domain::{CandidateKind, MediaKind};
use crate::resolve::{FollowRule, ResolveRules, TerminalRule};
use crate::sites::{
    Adapter, CandidateRules, DetailRules, EpisodeRules, FieldSpec, KindRule, ListRules, Section,
    SeriesDetect, SiteSpec, ValueFrom,
};

const DEFAULT_BASE: &str = "http://104.237.198.194";
const DEFAULT_SERVER: &str = "http://103.145.232.246";

const KITANONTON_BASE: &str = "https://kitanonton2.pics";

pub struct Rebahin {
    spec: SiteSpec,
}

struct Variant {
    name: &'static str,
    base: String,
    main_server: String,
    listing_item: &'static str,
    sections: Vec<(String, &'static str)>,
}

impl Rebahin {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let main_server = overrides.extra("main_server", DEFAULT_SERVER);
        let sections = [
            ("genre/populer", "Populer Movies"),
            ("latest-movies", "New Movies"),
            ("genre/westseries", "West TV Series"),
            ("genre/drama-korea", "Drama Korea"),
            ("genre/animation", "Anime"),
        ]
        .into_iter()
        .map(|(path, label)| (format!("{base}/{path}/page/{{page}}"), label))
        .collect();

        Self::build(Variant {
            name: "rebahin",
            base,
            main_server,
            listing_item: "div.ml-item",
            sections,
        })
    }

    /// KitaNonton: same engine, its own domains and front-page rows.
    pub fn kitanonton(overrides: SiteOverride) -> Self {
        let base = overrides.base(KITANONTON_BASE);
        let main_server = overrides.extra("main_server", &base);
        let sections = [
            ("genre/populer", "Populer Movies"),
            ("movies", "New Movies"),
            ("genre/westseries", "West TV Series"),
            ("genre/drama-korea", "Drama Korea"),
            ("genre/animation", "Anime"),
            ("genre/series-indonesia", "Drama Indonesia"),
            ("genre/drama-jepang", "Drama Jepang"),
            ("genre/drama-china", "Drama China"),
            ("genre/thailand-series", "Drama Thailand"),
        ]
        .into_iter()
        .map(|(path, label)| (format!("{base}/{path}/page/{{page}}"), label))
        .collect();

        Self::build(Variant {
            name: "kitanonton",
            base,
            main_server,
            listing_item: "div#featured div.ml-item",
            sections,
        })
    }

    fn build(variant: Variant) -> Self {
        let Variant {
            name,
            base,
            main_server,
            listing_item,
            sections,
        } = variant;

        let card = |item: &str| ListRules {
            poster: Some(FieldSpec::image("img.mli-thumb")),
            quality: Some(FieldSpec::text("span.mli-quality")),
            episode_badge: Some(FieldSpec::text("span.mli-eps")),
            ..ListRules::new(
                item,
                FieldSpec::text("span.mli-info > h2"),
                FieldSpec::attr("a", "href"),
                KindRule::QualityBadge {
                    series: MediaKind::TvSeries,
                    movie: MediaKind::Movie,
                },
            )
        };

        let spec = SiteSpec {
            name,
            kinds: vec![MediaKind::Movie, MediaKind::TvSeries, MediaKind::AsianDrama],
            sections: sections
                .into_iter()
                .map(|(url, label)| Section::new(url, label))
                .collect(),
            search_url: format!("{base}/?s={{query}}"),
            listing: card(listing_item),
            search: Some(card("div.ml-item")),
            detail: DetailRules {
                title: FieldSpec::text("div.mvic-desc h3"),
                poster: Some(FieldSpec::image("div.mvic-thumb img")),
                plot: Some(FieldSpec::text("div.desc p")),
                year: Some(
                    FieldSpec::text("div.mvici-right p")
                        .containing("Release:")
                        .then("a"),
                ),
                tags: Some(
                    FieldSpec::text("div.mvici-left p")
                        .containing("Genre:")
                        .then("a"),
                ),
                rating: Some(FieldSpec::text("span[itemprop=ratingValue]")),
                actors: Some(FieldSpec::text("span[itemprop=actors] a")),
                series: SeriesDetect::Selector("div.les-content".into()),
                episodes: Some(EpisodeRules {
                    item: "div.les-content a".into(),
                    newest_first: false,
                    ..Default::default()
                }),
                ..Default::default()
            },
            candidates: Some(CandidateRules {
                selector: "div.pframe iframe, div#media-player iframe".into(),
                value: ValueFrom::Attr("src".into()),
                kind: CandidateKind::IframeEmbed,
                server: None,
                refine: None,
                absolute: true,
            }),
            rules: ResolveRules {
                follow: Some(FollowRule::get().with_referer(format!("{base}/"))),
                terminal: TerminalRule::SourcesScript,
                rewrites: Vec::new(),
                stream_referer: Some(format!("{main_server}/")),
            },
            ..SiteSpec::minimal("rebahin", &base)
        };
        Self { spec }
    }
}

#[async_trait]
impl Adapter for Rebahin {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }
}
