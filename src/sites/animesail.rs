//! AnimeSail: the same encoded-option mirror menu as DramaId, on an
//! anime catalog. Most mirrors decode straight to a third-party embed;
//! the "wibufile" mirror is its own player page whose script lists the
//! files, and it only answers with the site referer attached.

use async_trait::async_trait;

use crate::config::SiteOverride;
use crate::domain::{CandidateKind, MediaKind, SourceCandidate};
use crate::pipeline::{PipelineContext, PlayPage};
use crate::resolve::{
    decode_blob, FollowRule, ResolveRules, Resolver, Terminal, TerminalRule,
};
use crate::sites::{
    Adapter, CandidateRules, DetailRules, FieldSpec, KindRule, ListRules, Section, SeriesDetect,
    SiteSpec, ValueFrom,
};

const DEFAULT_BASE: &str = "https://animesail.in";

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

pub struct AnimeSail {
    spec: SiteSpec,
    /// Rules for the wibufile player mirror.
    wibufile_rules: ResolveRules,
}

impl AnimeSail {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let sections = [
            ("&order=update", "Rilisan Terbaru"),
            ("&order=latest", "Baru Ditambahkan"),
            ("&status=ongoing&order=update", "Sedang Tayang"),
            ("&order=popular", "Populer"),
        ]
        .into_iter()
        .map(|(params, label)| {
            Section::new(format!("{base}/anime/?page={{page}}{params}"), label)
        })
        .collect();

        let listing = ListRules {
            poster: Some(FieldSpec::image("img")),
            episode_badge: Some(FieldSpec::text("div.epx")),
            ..ListRules::new(
                "article[itemscope=itemscope]",
                FieldSpec::text("h2[itemprop=headline]"),
                FieldSpec::attr("a.tip", "href"),
                KindRule::Fixed(MediaKind::Anime),
            )
        };

        let spec = SiteSpec {
            kinds: vec![MediaKind::Anime, MediaKind::AnimeMovie, MediaKind::Ova],
            sections,
            search_url: format!("{base}/?s={{query}}"),
            listing,
            detail: DetailRules {
                title: FieldSpec::text("h1.entry-title"),
                poster: Some(FieldSpec::image("div.thumb img")),
                plot: Some(FieldSpec::text(".entry-content > p")),
                year: Some(FieldSpec::text(".info-content > .spe > span > time")),
                year_pattern: Some(r"\d, (\d+)".into()),
                tags: Some(FieldSpec::text(".genxed > a")),
                status: Some(FieldSpec::text(".info-content > .spe > span:nth-child(1)")),
                kind_text: Some(
                    FieldSpec::own_text(".info-content .spe span").containing("Tipe:"),
                ),
                kind_map: Some(map_kind),
                series: SeriesDetect::Always,
                series_kind: MediaKind::Anime,
                ..Default::default()
            },
            candidates: Some(CandidateRules {
                selector: ".mobius > .mirror > option".into(),
                value: ValueFrom::Attr("value".into()),
                kind: CandidateKind::EncodedBlob,
                server: Some(ValueFrom::Text),
                refine: None,
                absolute: false,
            }),
            rules: ResolveRules {
                stream_referer: Some(format!("{base}/")),
                ..Default::default()
            },
            ..SiteSpec::minimal("animesail", &base)
        };

        let wibufile_rules = ResolveRules {
            follow: Some(FollowRule::get().with_referer(format!("{base}/"))),
            terminal: TerminalRule::SourcesScript,
            rewrites: Vec::new(),
            stream_referer: Some(format!("{base}/")),
        };

        Self {
            spec,
            wibufile_rules,
        }
    }
}

#[async_trait]
impl Adapter for AnimeSail {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    async fn resolve_candidate(
        &self,
        cx: &PipelineContext,
        _play: &PlayPage,
        rules: &ResolveRules,
        candidate: SourceCandidate,
    ) -> Terminal {
        // wibufile blobs decode to a player page, not an embed; they get
        // the referer-gated follow + sources-script strategy instead.
        if let Ok(decoded) = decode_blob(&candidate.raw) {
            if decoded.contains("wibufile") {
                return Resolver::new(cx.fetcher.as_ref(), &self.wibufile_rules)
                    .resolve(candidate)
                    .await;
            }
        }
        Resolver::new(cx.fetcher.as_ref(), rules).resolve(candidate).await
    }
}
