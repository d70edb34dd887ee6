//! DramaId: WordPress drama site. Mirror options carry base64-encoded
//! iframe blobs; one mirror ("drive") hosts its own player whose script
//! embeds both sources and subtitle tracks.

use async_trait::async_trait;

use crate::app::Result;
use crate::config::SiteOverride;
use crate::domain::{CandidateKind, MediaKind, SourceCandidate, SubtitleDescriptor};
use crate::extract;
use crate::fetcher::FetchRequest;
use crate::pipeline::{PipelineContext, PlayPage};
use crate::resolve::{
    decode_blob, parse_script_objects, parse_sources_script, DropReason, HopBudget, ResolveRules,
    ResolvedSource, Resolver, Terminal,
};
use crate::sites::{
    Adapter, CandidateRules, DetailRules, FieldSpec, KindRule, ListRules, Section, SeriesDetect,
    SiteSpec, ValueFrom,
};

const DEFAULT_BASE: &str = "https://dramaid.nl";
const DRIVE_REFERER: &str = "https://motonews.club/";

fn map_kind(label: &str, _is_series: bool) -> MediaKind {
    let label = label.to_lowercase();
    if label.contains("movie") {
        MediaKind::Movie
    } else if label.contains("anime") {
        MediaKind::Anime
    } else {
        MediaKind::AsianDrama
    }
}

/// Listing hrefs sometimes point at an episode page; canonicalize to the
/// series page.
fn proper_drama_link(spec: &SiteSpec, url: String) -> String {
    if !url.contains("-episode-") {
        return url;
    }
    let pattern = format!("{}/(.+)-ep.+", regex::escape(&spec.base_url));
    match extract::capture(&pattern, &url) {
        Ok(Some(slug)) => format!("{}/series/{slug}", spec.base_url),
        _ => url,
    }
}

pub struct Dramaid {
    spec: SiteSpec,
}

impl Dramaid {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let sections = [
            ("&status=&type=&order=update", "Drama Terbaru"),
            ("&order=latest", "Baru Ditambahkan"),
            ("&status=&type=&order=popular", "Drama Popular"),
        ]
        .into_iter()
        .map(|(params, label)| {
            Section::new(format!("{base}/series/?page={{page}}{params}"), label)
        })
        .collect();

        let listing = ListRules {
            poster: Some(FieldSpec::attr("img:last-child", "src")),
            link_fix: Some(proper_drama_link),
            ..ListRules::new(
                "article[itemscope=itemscope]",
                FieldSpec::text("h2[itemprop=headline]"),
                FieldSpec::attr("a.tip", "href"),
                KindRule::Fixed(MediaKind::AsianDrama),
            )
        };

        let spec = SiteSpec {
            kinds: vec![MediaKind::AsianDrama],
            sections,
            search_url: format!("{base}/?s={{query}}"),
            listing,
            detail: DetailRules {
                title: FieldSpec::text("h1.entry-title"),
                poster: Some(FieldSpec::attr("div.thumb img:last-child", "src")),
                plot: Some(FieldSpec::text(".entry-content > p")),
                year: Some(FieldSpec::text(".info-content > .spe > span > time")),
                year_pattern: Some(r"\d, (\d+)".into()),
                tags: Some(FieldSpec::text(".genxed > a")),
                status: Some(FieldSpec::text(".info-content > .spe > span:nth-child(1)")),
                kind_text: Some(
                    FieldSpec::own_text(".info-content .spe span").containing("Tipe:"),
                ),
                kind_map: Some(map_kind),
                recommendations: Some(ListRules {
                    poster: Some(FieldSpec::attr("img:last-child", "src")),
                    link_fix: Some(proper_drama_link),
                    ..ListRules::new(
                        ".listupd > article[itemscope=itemscope]",
                        FieldSpec::text("h2[itemprop=headline]"),
                        FieldSpec::attr("a.tip", "href"),
                        KindRule::Fixed(MediaKind::AsianDrama),
                    )
                }),
                series: SeriesDetect::Always,
                series_kind: MediaKind::AsianDrama,
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
                rewrites: vec![("https://ndrama.xyz".into(), "https://www.fembed.com".into())],
                stream_referer: Some(format!("{base}/")),
                ..Default::default()
            },
            ..SiteSpec::minimal("dramaid", &base)
        };
        Self { spec }
    }

    /// The drive mirror's page holds a picasa-style player whose script
    /// carries both the stream sources and the subtitle tracks.
    async fn drive_source(&self, cx: &PipelineContext, url: String, label: String) -> Result<Terminal> {
        let mut budget = HopBudget::new();
        budget.take()?;
        let response = cx.fetcher.fetch(FetchRequest::get(&url)).await?;

        let script = {
            let doc = extract::parse(&response.body);
            let marker = extract::select_first(&doc, ".picasa")?;
            let script = marker
                .and_then(|el| {
                    el.next_siblings()
                        .find_map(scraper::ElementRef::wrap)
                        .map(extract::text)
                })
                .filter(|s| !s.is_empty());
            extract::required(script, "drive player script")?
        };

        let sources: Vec<ResolvedSource> = parse_sources_script(&script)
            .into_iter()
            .filter_map(|(file, source_label)| {
                let url = extract::fix_url(&response.final_url, &file)?;
                Some(ResolvedSource {
                    url,
                    label: source_label.unwrap_or_else(|| label.clone()),
                    referer: Some(DRIVE_REFERER.into()),
                    direct: true,
                })
            })
            .collect();

        let subtitles = parse_script_objects(&script, "tracks")
            .into_iter()
            .filter_map(|track| {
                let file = track.get("file")?.as_str()?.to_string();
                let label = track.get("label")?.as_str()?.to_string();
                // The site labels its Indonesian track "Indonesia".
                let language = if label.contains("Indonesia") {
                    format!("{label}n")
                } else {
                    label
                };
                Some(SubtitleDescriptor::new(language, file))
            })
            .collect();

        Ok(Terminal::Resolved { sources, subtitles })
    }
}

#[async_trait]
impl Adapter for Dramaid {
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
        // Peek at the decoded reference to route the drive mirror; every
        // other mirror goes through the shared resolver.
        if let Ok(decoded) = decode_blob(&candidate.raw) {
            if decoded.contains("motonews") {
                let label = candidate.label().to_string();
                return match self.drive_source(cx, decoded, label).await {
                    Ok(terminal) => terminal,
                    Err(err) => Terminal::Dropped(DropReason::from(err)),
                };
            }
        }
        Resolver::new(cx.fetcher.as_ref(), rules).resolve(candidate).await
    }
}
