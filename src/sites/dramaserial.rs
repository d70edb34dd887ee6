//! DramaSerial: the play page wraps a "juraganfilm" iframe whose mirror
//! list encodes each server in an `onclick="frame('…')"` handler. The
//! getbk mirror answers with a sources script; the gdrive mirrors need
//! one more hop through their embed page to a token that keys an HLS
//! playlist. This is the deepest chain in the collection.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::{Result, TributaryError};
use crate::config::SiteOverride;
use crate::domain::{CandidateKind, MediaKind, SourceCandidate};
use crate::extract;
use crate::fetcher::FetchRequest;
use crate::pipeline::{PipelineContext, PlayPage};
use crate::resolve::{
    parse_sources_script, DropReason, HopBudget, ResolveRules, ResolvedSource, Terminal,
};
use crate::sites::{
    Adapter, DetailRules, EpisodeRules, FieldSpec, KindRule, LinkPlan, ListRules, Section,
    SeriesDetect, SiteSpec,
};

const DEFAULT_BASE: &str = "https://tv4.dramaserial.id";

static FRAME_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frame\('([^']+)'\)").expect("frame call regex"));

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub struct DramaSerial {
    spec: SiteSpec,
}

impl DramaSerial {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let sections = [
            ("page", "Latest Movie"),
            ("Genre/ongoing/page", "Ongoing"),
            ("Genre/drama-serial-korea/page", "Drama Serial Korea"),
            ("Genre/drama-serial-jepang/page", "Drama Serial Jepang"),
            ("Genre/drama-serial-mandarin/page", "Drama Serial Mandarin"),
            ("Genre/drama-serial-filipina/page", "Drama Serial Filipina"),
            ("Genre/drama-serial-india/page", "Drama Serial India"),
        ]
        .into_iter()
        .map(|(path, label)| Section::new(format!("{base}/{path}/{{page}}"), label))
        .collect();

        let listing = ListRules {
            poster: Some(FieldSpec::attr("img", "src")),
            episode_badge: Some(FieldSpec::text("div.gmr-episode-item")),
            ..ListRules::new(
                "main#main article",
                FieldSpec::text("h2.entry-title a"),
                FieldSpec::attr("a", "href"),
                KindRule::Fixed(MediaKind::AsianDrama),
            )
        };

        let spec = SiteSpec {
            kinds: vec![MediaKind::AsianDrama],
            sections,
            search_url: format!("{base}/?s={{query}}&post_type[]=post&post_type[]=tv"),
            listing,
            detail: DetailRules {
                title: FieldSpec::text("h1.entry-title"),
                poster: Some(FieldSpec::attr("figure.pull-left img", "src")),
                plot: Some(FieldSpec::text(
                    "div.entry-content.entry-content-single div.entry-content.entry-content-single",
                )),
                year: Some(
                    FieldSpec::text("div.gmr-movie-innermeta span")
                        .containing("Year:")
                        .then("a"),
                ),
                tags: Some(
                    FieldSpec::text("div.gmr-movie-innermeta span")
                        .containing("Genre:")
                        .then("a"),
                ),
                series: SeriesDetect::Selector("div.page-links".into()),
                series_kind: MediaKind::AsianDrama,
                episodes: Some(EpisodeRules {
                    item: "div.page-links a".into(),
                    name: Some(FieldSpec::text("span.page-link-number")),
                    episode_pattern: None,
                    require_number: true,
                    newest_first: false,
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..SiteSpec::minimal("dramaserial", &base)
        };
        Self { spec }
    }

    async fn getbk_source(
        &self,
        cx: &PipelineContext,
        server_url: &str,
        movie: &str,
        label: &str,
        budget: &mut HopBudget,
    ) -> Result<Terminal> {
        budget.take()?;
        let url = format!("{server_url}/stream/getbk.php?movie={movie}");
        let response = cx
            .fetcher
            .fetch(FetchRequest::get(url).with_referer(format!("{server_url}/")))
            .await?;

        let sources: Vec<ResolvedSource> = parse_sources_script(&response.body)
            .into_iter()
            .map(|(file, source_label)| ResolvedSource {
                url: file,
                label: source_label.unwrap_or_else(|| label.to_string()),
                referer: Some(format!("{server_url}/")),
                direct: true,
            })
            .collect();
        if sources.is_empty() {
            return Err(TributaryError::NoStreamFound(
                "getbk answered without sources".into(),
            ));
        }
        Ok(Terminal::direct(sources))
    }

    async fn gdrive_source(
        &self,
        cx: &PipelineContext,
        link: &str,
        server_url: &str,
        label: &str,
        budget: &mut HopBudget,
    ) -> Result<Terminal> {
        budget.take()?;
        let response = cx
            .fetcher
            .fetch(FetchRequest::get(link).with_referer(format!("{server_url}/")))
            .await?;
        let embed = {
            let doc = extract::parse(&response.body);
            let src = extract::select_first(&doc, "iframe")?
                .and_then(|el| extract::attr(el, "src"))
                .and_then(|src| extract::fix_url(&response.final_url, &src));
            extract::required(src, "gdrive embed frame")?
        };

        budget.take()?;
        let embed_page = cx.fetcher.fetch(FetchRequest::get(&embed)).await?;
        let token = {
            let doc = extract::parse(&embed_page.body);
            let token = extract::select_first(&doc, "div#token")?
                .map(extract::text)
                .filter(|t| !t.is_empty());
            token.ok_or_else(|| TributaryError::NoStreamFound("gdrive token missing".into()))?
        };
        let host = extract::origin_of(&embed)?;

        Ok(Terminal::direct(vec![ResolvedSource {
            url: format!("{host}/hlsplaylist.php?idhls={}.m3u8", token.trim()),
            label: label.to_string(),
            referer: Some(format!("{host}/")),
            direct: true,
        }]))
    }
}

#[async_trait]
impl Adapter for DramaSerial {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    /// The candidate list lives one hop away, inside the juraganfilm
    /// mirror menu.
    async fn discover(&self, cx: &PipelineContext, play: &PlayPage) -> Result<LinkPlan> {
        let frame_url = {
            let doc = extract::parse(&play.body);
            extract::select_first(&doc, "iframe[name=juraganfilm]")?
                .and_then(|el| extract::attr(el, "src"))
                .and_then(|src| extract::fix_url(&play.final_url, &src))
        };
        let Some(frame_url) = frame_url else {
            return Ok(LinkPlan {
                candidates: Vec::new(),
                rules: ResolveRules::default(),
            });
        };

        let menu = cx
            .fetcher
            .fetch(
                FetchRequest::get(frame_url)
                    .with_referer(format!("{}/", self.spec.base_url)),
            )
            .await?;

        let doc = extract::parse(&menu.body);
        let candidates = extract::select_all(&doc, "div#header-slider ul li")?
            .into_iter()
            .filter_map(|el| {
                let onclick = extract::attr(el, "onclick")?;
                let link = extract::capture_with(&FRAME_CALL_RE, &onclick)?;
                let server = query_param(&link, "iframe").map(|s| capitalize(&s));
                let mut candidate = SourceCandidate::new(link, CandidateKind::DirectApi);
                if let Some(server) = server {
                    candidate = candidate.with_server(server);
                }
                Some(candidate)
            })
            .collect();

        Ok(LinkPlan {
            candidates,
            rules: ResolveRules::default(),
        })
    }

    /// Mirror dispatch: the `iframe` query parameter names the handler.
    async fn resolve_candidate(
        &self,
        cx: &PipelineContext,
        _play: &PlayPage,
        _rules: &ResolveRules,
        candidate: SourceCandidate,
    ) -> Terminal {
        let link = candidate.raw.clone();
        let label = candidate.label().to_string();
        let mut budget = HopBudget::new();

        let outcome = async {
            let server_url = extract::origin_of(&link)?;
            let handler = query_param(&link, "iframe").unwrap_or_default();
            match handler.as_str() {
                "getbk" => {
                    let movie = query_param(&link, "movie").ok_or_else(|| {
                        TributaryError::NoStreamFound("mirror link without movie id".into())
                    })?;
                    self.getbk_source(cx, &server_url, &movie, &label, &mut budget)
                        .await
                }
                "gdrivehls" | "gdriveplayer" => {
                    self.gdrive_source(cx, &link, &server_url, &label, &mut budget)
                        .await
                }
                other => Err(TributaryError::NoStreamFound(format!(
                    "unhandled mirror {other:?}"
                ))),
            }
        }
        .await;

        match outcome {
            Ok(terminal) => terminal,
            Err(err) => Terminal::Dropped(DropReason::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::hosts::ExtractorRegistry;

    fn site() -> DramaSerial {
        DramaSerial::new(SiteOverride::default())
    }

    fn context(fetcher: Arc<StaticFetcher>) -> PipelineContext {
        PipelineContext {
            fetcher,
            hosts: Arc::new(ExtractorRegistry::builtin()),
        }
    }

    const MENU: &str = r#"
      <div id="header-slider"><ul>
        <li onclick="frame('https://tv23.juragan.film/stream/player.php?movie=abc&iframe=getbk')">BK</li>
        <li onclick="frame('https://tv23.juragan.film/gdrive.php?movie=abc&iframe=gdrivehls')">GD</li>
        <li class="ads">no handler here</li>
      </ul></div>
    "#;

    #[tokio::test]
    async fn test_discover_parses_mirror_menu() {
        let fetcher = Arc::new(
            StaticFetcher::new().page("https://tv23.juragan.film/embed/ep1", MENU),
        );
        let play = PlayPage {
            requested_url: "https://tv4.dramaserial.id/drama-x-episode-1".into(),
            final_url: "https://tv4.dramaserial.id/drama-x-episode-1".into(),
            origin: "https://tv4.dramaserial.id".into(),
            body: r#"<iframe name="juraganfilm" src="https://tv23.juragan.film/embed/ep1"></iframe>"#
                .into(),
        };

        let plan = site().discover(&context(fetcher.clone()), &play).await.unwrap();
        assert_eq!(plan.candidates.len(), 2);
        assert_eq!(plan.candidates[0].server.as_deref(), Some("Getbk"));
        assert!(plan.candidates[0].raw.contains("iframe=getbk"));
        // The menu fetch carried the site referer.
        assert_eq!(
            fetcher.requests()[0].referer.as_deref(),
            Some("https://tv4.dramaserial.id/")
        );
    }

    #[tokio::test]
    async fn test_getbk_mirror_resolves_sources() {
        let fetcher = Arc::new(StaticFetcher::new().page(
            "https://tv23.juragan.film/stream/getbk.php?movie=abc",
            r#"<script>sources: [{"file":"https://cdn/720.m3u8","label":"720p"},{"file":"https://cdn/480.m3u8","label":"480p"}]</script>"#,
        ));
        let candidate = SourceCandidate::new(
            "https://tv23.juragan.film/stream/player.php?movie=abc&iframe=getbk",
            CandidateKind::DirectApi,
        )
        .with_server("Getbk");
        let play = PlayPage {
            requested_url: String::new(),
            final_url: "https://tv4.dramaserial.id/x".into(),
            origin: "https://tv4.dramaserial.id".into(),
            body: String::new(),
        };

        let terminal = site()
            .resolve_candidate(
                &context(fetcher),
                &play,
                &ResolveRules::default(),
                candidate,
            )
            .await;

        match terminal {
            Terminal::Resolved { sources, .. } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(sources[0].label, "720p");
                assert!(sources[0].direct);
                assert_eq!(
                    sources[0].referer.as_deref(),
                    Some("https://tv23.juragan.film/")
                );
            }
            other => panic!("expected resolved terminal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gdrive_mirror_builds_hls_url() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(
                    "https://tv23.juragan.film/gdrive.php?movie=abc&iframe=gdrivehls",
                    r#"<iframe src="https://gdplayer.example/e/42"></iframe>"#,
                )
                .page(
                    "https://gdplayer.example/e/42",
                    r#"<div id="token"> tok42 </div>"#,
                ),
        );
        let candidate = SourceCandidate::new(
            "https://tv23.juragan.film/gdrive.php?movie=abc&iframe=gdrivehls",
            CandidateKind::DirectApi,
        );
        let play = PlayPage {
            requested_url: String::new(),
            final_url: "https://tv4.dramaserial.id/x".into(),
            origin: "https://tv4.dramaserial.id".into(),
            body: String::new(),
        };

        let terminal = site()
            .resolve_candidate(
                &context(fetcher),
                &play,
                &ResolveRules::default(),
                candidate,
            )
            .await;

        match terminal {
            Terminal::Resolved { sources, .. } => {
                assert_eq!(sources.len(), 1);
                assert_eq!(
                    sources[0].url,
                    "https://gdplayer.example/hlsplaylist.php?idhls=tok42.m3u8"
                );
            }
            other => panic!("expected resolved terminal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_mirror_drops() {
        let candidate = SourceCandidate::new(
            "https://tv23.juragan.film/x.php?movie=abc&iframe=mystery",
            CandidateKind::DirectApi,
        );
        let play = PlayPage {
            requested_url: String::new(),
            final_url: "https://tv4.dramaserial.id/x".into(),
            origin: "https://tv4.dramaserial.id".into(),
            body: String::new(),
        };
        let terminal = site()
            .resolve_candidate(
                &context(Arc::new(StaticFetcher::new())),
                &play,
                &ResolveRules::default(),
                candidate,
            )
            .await;
        assert!(matches!(
            terminal,
            Terminal::Dropped(DropReason::NoStream(_))
        ));
    }
}
