//! Kuramanime: the episode list lives in an HTML blob stashed in a
//! `data-content` attribute and is paginated behind `?page=N`, so `load`
//! walks pages until one comes back empty. The site exposes no
//! resolvable players, mirroring the source behavior.

use async_trait::async_trait;

use crate::app::Result;
use crate::config::SiteOverride;
use crate::domain::{ContentRef, EpisodeRef, MediaDetail, MediaKind};
use crate::extract;
use crate::fetcher::FetchRequest;
use crate::pipeline::PipelineContext;
use crate::sites::{
    generic, Adapter, DetailRules, FieldSpec, KindRule, ListRules, Section, SeriesDetect, SiteSpec,
};

const DEFAULT_BASE: &str = "https://v8.kuramanime.run";

/// The episode blob never paginates past this in practice.
const MAX_EPISODE_PAGES: u32 = 10;

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

/// Listing hrefs may point at an episode; canonicalize to the anime page.
fn proper_anime_link(_spec: &SiteSpec, url: String) -> String {
    if !url.contains("/episode") {
        return url;
    }
    match extract::capture(r"(.*)/episode/.+", &url) {
        Ok(Some(base)) => format!("{base}/"),
        _ => url,
    }
}

pub struct Kuramanime {
    spec: SiteSpec,
}

impl Kuramanime {
    pub fn new(overrides: SiteOverride) -> Self {
        let base = overrides.base(DEFAULT_BASE);
        let sections = [
            ("anime/ongoing?order_by=updated", "Sedang Tayang"),
            ("anime/finished?order_by=updated", "Selesai Tayang"),
            (
                "properties/season/summer-2022?order_by=most_viewed",
                "Dilihat Terbanyak Musim Ini",
            ),
            ("anime/movie?order_by=updated", "Film Layar Lebar"),
        ]
        .into_iter()
        .map(|(path, label)| Section::new(format!("{base}/{path}&page={{page}}"), label))
        .collect();

        let card = |item: &str| ListRules {
            poster: Some(FieldSpec::attr("div.product__item__pic.set-bg", "data-setbg")),
            episode_badge: Some(FieldSpec::text("div.ep span")),
            episode_badge_pattern: Some(r"Ep\s*(\d+)\s*/".into()),
            link_fix: Some(proper_anime_link),
            ..ListRules::new(
                item,
                FieldSpec::text("h5 a"),
                FieldSpec::attr("a", "href"),
                KindRule::Fixed(MediaKind::Anime),
            )
        };

        let spec = SiteSpec {
            kinds: vec![MediaKind::Anime, MediaKind::AnimeMovie, MediaKind::Ova],
            sections,
            search_url: format!("{base}/anime?search={{query}}&order_by=latest"),
            listing: card("div.col-lg-4.col-md-6.col-sm-6"),
            search: Some(card("div#animeList div.product__item")),
            detail: DetailRules {
                title: FieldSpec::text(".anime__details__title > h3"),
                poster: Some(FieldSpec::attr(".anime__details__pic", "data-setbg")),
                plot: Some(FieldSpec::text(".anime__details__text > p")),
                year: Some(
                    FieldSpec::text("div.anime__details__widget ul li").containing("Musim:"),
                ),
                tags: Some(
                    FieldSpec::text("div.anime__details__widget ul li")
                        .containing("Genre:")
                        .then("a"),
                ),
                status: Some(
                    FieldSpec::text("div.anime__details__widget ul li").containing("Status:"),
                ),
                kind_text: Some(
                    FieldSpec::text("div.col-lg-6.col-md-6 ul li")
                        .containing("Tipe:")
                        .then("a"),
                ),
                kind_map: Some(map_kind),
                recommendations: Some(ListRules {
                    poster: Some(FieldSpec::attr(
                        ".product__sidebar__view__item.set-bg",
                        "data-setbg",
                    )),
                    ..ListRules::new(
                        "div#randomList > a",
                        FieldSpec::text("h5.sidebar-title-h5"),
                        FieldSpec::self_attr("href"),
                        KindRule::Fixed(MediaKind::Anime),
                    )
                }),
                series: SeriesDetect::Always,
                series_kind: MediaKind::Anime,
                // Episodes come from the paginated blob in `load`.
                episodes: None,
                ..Default::default()
            },
            ..SiteSpec::minimal("kuramanime", &base)
        };
        Self { spec }
    }
}

/// Episodes inside one page's `#episodeLists[data-content]` blob.
fn parse_episode_blob(body: &str) -> Result<Vec<EpisodeRef>> {
    let blob = {
        let doc = extract::parse(body);
        match extract::select_first(&doc, "#episodeLists")? {
            Some(el) => extract::attr(el, "data-content"),
            None => None,
        }
    };
    let Some(blob) = blob else {
        return Ok(Vec::new());
    };

    let inner = extract::parse(&blob);
    let mut episodes = Vec::new();
    for anchor in extract::select_all(&inner, "a.btn.btn-sm.btn-danger")? {
        let Some(href) = extract::attr(anchor, "href") else {
            continue;
        };
        let name = extract::text(anchor);
        let number = extract::capture(r"(\d+)", &name)?
            .as_deref()
            .and_then(extract::digits);
        episodes.push(EpisodeRef::new(href, name).with_numbers(number, None));
    }
    Ok(episodes)
}

#[async_trait]
impl Adapter for Kuramanime {
    fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    async fn load(&self, cx: &PipelineContext, content: &ContentRef) -> Result<MediaDetail> {
        let response = cx.fetcher.fetch(FetchRequest::get(&content.url)).await?;
        let origin = response.origin()?;
        let mut detail =
            generic::parse_detail(&self.spec, &response.final_url, &origin, &response.body)?;

        let mut episodes = Vec::new();
        for page in 1..=MAX_EPISODE_PAGES {
            let paged = cx
                .fetcher
                .fetch(FetchRequest::get(format!("{}?page={page}", response.final_url)))
                .await?;
            let batch = parse_episode_blob(&paged.body)?;
            if batch.is_empty() {
                break;
            }
            episodes.extend(batch);
        }
        detail.episodes = episodes;
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::hosts::ExtractorRegistry;
    use crate::pipeline::PlayPage;

    fn site() -> Kuramanime {
        Kuramanime::new(SiteOverride::default())
    }

    #[test]
    fn test_proper_anime_link() {
        assert_eq!(
            proper_anime_link(
                &site().spec,
                "https://v8.kuramanime.run/anime/1/judul/episode/5".into()
            ),
            "https://v8.kuramanime.run/anime/1/judul/"
        );
        assert_eq!(
            proper_anime_link(&site().spec, "https://v8.kuramanime.run/anime/1/judul".into()),
            "https://v8.kuramanime.run/anime/1/judul"
        );
    }

    fn blob_page(entries: &[(u32, &str)]) -> String {
        let anchors: String = entries
            .iter()
            .map(|(n, href)| {
                format!(r#"<a class='btn btn-sm btn-danger' href='{href}'>Ep {n}</a>"#)
            })
            .collect();
        format!(
            r#"<div id="episodeLists" data-content="{}"></div>"#,
            anchors.replace('"', "&quot;")
        )
    }

    #[test]
    fn test_parse_episode_blob() {
        let body = blob_page(&[
            (1, "https://v8.kuramanime.run/anime/1/judul/episode/1"),
            (2, "https://v8.kuramanime.run/anime/1/judul/episode/2"),
        ]);
        let episodes = parse_episode_blob(&body).unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].episode, Some(1));
        assert_eq!(
            episodes[1].content.url,
            "https://v8.kuramanime.run/anime/1/judul/episode/2"
        );
    }

    #[tokio::test]
    async fn test_load_walks_episode_pages() {
        let detail_page = r#"
          <div class="anime__details__title"><h3>Judul Anime</h3></div>
          <div class="anime__details__text"><p>Sinopsis.</p></div>
        "#;
        let show = "https://v8.kuramanime.run/anime/1/judul";
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(show, detail_page)
                .page(
                    format!("{show}?page=1"),
                    blob_page(&[(1, "https://v8.kuramanime.run/anime/1/judul/episode/1")]),
                )
                .page(
                    format!("{show}?page=2"),
                    blob_page(&[(2, "https://v8.kuramanime.run/anime/1/judul/episode/2")]),
                )
                .page(format!("{show}?page=3"), "<div id=\"episodeLists\"></div>"),
        );
        let cx = PipelineContext {
            fetcher: fetcher.clone(),
            hosts: Arc::new(ExtractorRegistry::builtin()),
        };

        let detail = site()
            .load(&cx, &ContentRef::new(show))
            .await
            .unwrap();

        assert_eq!(detail.title, "Judul Anime");
        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[1].episode, Some(2));
        // Pagination stopped at the first empty page.
        assert_eq!(fetcher.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_discover_yields_no_candidates() {
        let play = PlayPage {
            requested_url: "https://v8.kuramanime.run/anime/1/judul/episode/1".into(),
            final_url: "https://v8.kuramanime.run/anime/1/judul/episode/1".into(),
            origin: "https://v8.kuramanime.run".into(),
            body: "<html><video></video></html>".into(),
        };
        let cx = PipelineContext {
            fetcher: Arc::new(StaticFetcher::new()),
            hosts: Arc::new(ExtractorRegistry::builtin()),
        };
        let plan = site().discover(&cx, &play).await.unwrap();
        assert!(plan.candidates.is_empty());
    }
}
