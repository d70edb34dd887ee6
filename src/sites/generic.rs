//! The one implementation behind every descriptor-driven adapter
//! default: listing/search parsing, detail loading, candidate discovery.

use scraper::{ElementRef, Html};

use crate::app::Result;
use crate::domain::media::parse_rating;
use crate::domain::{
    ContentRef, EpisodeRef, MediaDetail, Quality, SearchResult, ShowStatus, SourceCandidate,
};
use crate::extract;
use crate::fetcher::FetchRequest;
use crate::pipeline::{PipelineContext, PlayPage};
use crate::resolve::ResolveRules;
use crate::sites::{
    EpisodeRules, FieldSpec, KindRule, LinkPlan, ListRules, Section, SeriesDetect, SiteSpec,
    ValueFrom,
};

pub async fn main_page(
    spec: &SiteSpec,
    cx: &PipelineContext,
    section: &Section,
    page: u32,
) -> Result<Vec<SearchResult>> {
    let url = section.url.replace("{page}", &page.to_string());
    let response = cx.fetcher.fetch(FetchRequest::get(url)).await?;
    parse_listing(spec, &spec.listing, &response.final_url, &response.body)
}

pub async fn search(
    spec: &SiteSpec,
    cx: &PipelineContext,
    query: &str,
) -> Result<Vec<SearchResult>> {
    let encoded = urlencoding::encode(query);
    let url = spec.search_url.replace("{query}", &encoded);
    let response = cx.fetcher.fetch(FetchRequest::get(url)).await?;
    let rules = spec.search.as_ref().unwrap_or(&spec.listing);
    parse_listing(spec, rules, &response.final_url, &response.body)
}

pub async fn load(spec: &SiteSpec, cx: &PipelineContext, content: &ContentRef) -> Result<MediaDetail> {
    let response = cx.fetcher.fetch(FetchRequest::get(&content.url)).await?;
    let origin = response.origin()?;
    parse_detail(spec, &response.final_url, &origin, &response.body)
}

/// Parse one listing/search page. Cards missing their title or link are
/// skipped, not errors; sparse listings are normal.
pub fn parse_listing(
    spec: &SiteSpec,
    rules: &ListRules,
    page_url: &str,
    body: &str,
) -> Result<Vec<SearchResult>> {
    let doc = extract::parse(body);
    let mut results = Vec::new();
    for item in extract::select_all(&doc, &rules.item)? {
        if let Some(result) = parse_card(spec, rules, page_url, item)? {
            results.push(result);
        }
    }
    Ok(results)
}

fn parse_card(
    spec: &SiteSpec,
    rules: &ListRules,
    page_url: &str,
    item: ElementRef<'_>,
) -> Result<Option<SearchResult>> {
    let Some(title) = field(item, &rules.title)? else {
        return Ok(None);
    };
    let Some(href) = field(item, &rules.link)? else {
        return Ok(None);
    };
    let Some(mut url) = extract::fix_url(page_url, &href) else {
        return Ok(None);
    };
    if let Some(fix) = rules.link_fix {
        url = fix(spec, url);
    }

    let quality_label = match &rules.quality {
        Some(spec) => field(item, spec)?.filter(|q| !q.is_empty()),
        None => None,
    };
    let kind = match &rules.kind {
        KindRule::Fixed(kind) => *kind,
        KindRule::Marker { css, series, movie } => {
            if extract::select_in_first(item, css)?.is_some() {
                *series
            } else {
                *movie
            }
        }
        KindRule::QualityBadge { series, movie } => {
            if quality_label.is_some() {
                *movie
            } else {
                *series
            }
        }
    };

    let mut result = SearchResult::new(title, url, kind);
    if let Some(poster_spec) = &rules.poster {
        result.poster = field(item, poster_spec)?
            .and_then(|src| extract::fix_url(page_url, &src))
            .map(|p| match rules.poster_fix {
                Some(fix) => fix(p),
                None => p,
            });
    }
    if kind.is_series() {
        if let Some(badge) = &rules.episode_badge {
            result.latest_episode = field(item, badge)?.and_then(|text| {
                match &rules.episode_badge_pattern {
                    Some(pattern) => extract::capture(pattern, &text)
                        .ok()
                        .flatten()
                        .as_deref()
                        .and_then(extract::digits),
                    None => extract::digits(&text),
                }
            });
        }
    } else if let Some(label) = quality_label {
        result.quality = Some(Quality::from_label(&label));
    }
    Ok(Some(result))
}

/// Parse one detail page. The title is the page's one required field;
/// everything else degrades to `None`/empty.
pub fn parse_detail(
    spec: &SiteSpec,
    page_url: &str,
    origin: &str,
    body: &str,
) -> Result<MediaDetail> {
    let doc = extract::parse(body);
    let rules = &spec.detail;

    let mut title = extract::required(doc_field(&doc, &rules.title)?, "title")?;
    for marker in &rules.title_strip {
        if let Some(index) = title.find(marker.as_str()) {
            title.truncate(index);
        }
    }
    let title = title.trim().to_string();

    let is_series = match &rules.series {
        SeriesDetect::Selector(css) => extract::select_first(&doc, css)?.is_some(),
        SeriesDetect::UrlContains(fragment) => page_url.contains(fragment.as_str()),
        SeriesDetect::Always => true,
    };
    let mut kind = if is_series {
        rules.series_kind
    } else {
        rules.movie_kind
    };
    if let (Some(field_spec), Some(map)) = (&rules.kind_text, rules.kind_map) {
        let label = doc_field(&doc, field_spec)?.unwrap_or_default();
        kind = map(&label, is_series);
    }

    let mut detail = MediaDetail::new(title.clone(), kind, origin);

    if let Some(poster_spec) = &rules.poster {
        detail.poster = doc_field(&doc, poster_spec)?
            .and_then(|src| extract::fix_url(page_url, &src));
    }
    if let Some(plot_spec) = &rules.plot {
        detail.plot = doc_field(&doc, plot_spec)?;
    }
    if let Some(year_spec) = &rules.year {
        detail.year = doc_field(&doc, year_spec)?.and_then(|text| {
            let raw = match &rules.year_pattern {
                Some(pattern) => extract::capture(pattern, &text).ok().flatten(),
                None => Some(text),
            }?;
            extract::digits(&raw).filter(|y| (1900..=2100).contains(y))
        });
    }
    if let Some(tags_spec) = &rules.tags {
        detail.tags = doc_fields(&doc, tags_spec)?;
    }
    if let Some(status_spec) = &rules.status {
        detail.status = doc_field(&doc, status_spec)?
            .map(|label| ShowStatus::from_label(label.trim_start_matches("Status:").trim()));
    }
    if let Some(rating_spec) = &rules.rating {
        detail.rating = doc_field(&doc, rating_spec)?.as_deref().and_then(parse_rating);
    }
    if let Some(actors_spec) = &rules.actors {
        detail.actors = doc_fields(&doc, actors_spec)?;
    }
    if let Some(trailer_spec) = &rules.trailer {
        detail.trailer = doc_field(&doc, trailer_spec)?;
    }
    if let Some(rec_rules) = &rules.recommendations {
        detail.recommendations = parse_listing(spec, rec_rules, page_url, body)?;
    }

    detail.episodes = if is_series {
        match &rules.episodes {
            Some(episode_rules) => parse_episodes(episode_rules, page_url, &doc)?,
            None => Vec::new(),
        }
    } else {
        vec![EpisodeRef::new(page_url, title)]
    };

    Ok(detail)
}

fn parse_episodes(e: &EpisodeRules, page_url: &str, doc: &Html) -> Result<Vec<EpisodeRef>> {
    let mut episodes = Vec::new();

    for item in extract::select_all(doc, &e.item)? {
        let href = match &e.link {
            Some(spec) => field(item, spec)?,
            None => match extract::attr(item, "href") {
                Some(href) => Some(href),
                None => extract::select_in_first(item, "a")?.and_then(|a| extract::attr(a, "href")),
            },
        };
        let Some(href) = href else { continue };
        let Some(url) = extract::fix_url(page_url, &href) else {
            continue;
        };

        let name = match &e.name {
            Some(spec) => field(item, spec)?,
            None => None,
        }
        .unwrap_or_else(|| extract::text(item));

        let episode = match &e.episode_pattern {
            Some(pattern) => extract::capture(pattern, &name)?
                .as_deref()
                .and_then(extract::digits),
            None => extract::digits(&name),
        };
        if e.require_number && episode.is_none() {
            continue;
        }

        let season = match &e.season_pattern {
            Some(pattern) => {
                let haystack = if e.season_from_link { url.as_str() } else { name.as_str() };
                extract::capture(pattern, haystack)?
                    .as_deref()
                    .and_then(extract::digits)
            }
            None => None,
        };

        episodes.push(EpisodeRef::new(url, name).with_numbers(episode, season));
    }

    if e.newest_first {
        episodes.reverse();
    }
    Ok(episodes)
}

/// Default candidate discovery: one selector pass over the play page.
pub fn discover(spec: &SiteSpec, play: &PlayPage) -> Result<LinkPlan> {
    let rules = instantiate_rules(&spec.rules, &play.origin);
    let Some(cr) = &spec.candidates else {
        return Ok(LinkPlan {
            candidates: Vec::new(),
            rules,
        });
    };

    let doc = extract::parse(&play.body);
    let mut candidates = Vec::new();
    for element in extract::select_all(&doc, &cr.selector)? {
        let Some(mut raw) = value_from(element, &cr.value) else {
            continue;
        };
        if let Some(pattern) = &cr.refine {
            match extract::capture(pattern, &raw)? {
                Some(refined) => raw = refined,
                None => continue,
            }
        }
        if cr.absolute {
            match extract::fix_url(&play.final_url, &raw) {
                Some(absolute) => raw = absolute,
                None => continue,
            }
        }
        let mut candidate = SourceCandidate::new(raw, cr.kind);
        if let Some(server_spec) = &cr.server {
            if let Some(server) = value_from(element, server_spec) {
                candidate = candidate.with_server(server);
            }
        }
        candidates.push(candidate);
    }

    Ok(LinkPlan { candidates, rules })
}

/// Substitute `{origin}` placeholders with this run's page origin.
pub fn instantiate_rules(rules: &ResolveRules, origin: &str) -> ResolveRules {
    let mut rules = rules.clone();
    if let Some(follow) = &mut rules.follow {
        if let Some(template) = &mut follow.url_template {
            *template = template.replace("{origin}", origin);
        }
        if let Some(referer) = &mut follow.referer {
            *referer = referer.replace("{origin}", origin);
        }
    }
    if let Some(referer) = &mut rules.stream_referer {
        *referer = referer.replace("{origin}", origin);
    }
    rules
}

/// Narrow a selection per the field spec's `contains` filter and `then`
/// descent.
fn refine_selection<'a>(
    elements: Vec<ElementRef<'a>>,
    spec: &FieldSpec,
) -> Result<Vec<ElementRef<'a>>> {
    let mut elements = elements;
    if let Some(needle) = &spec.contains {
        elements.retain(|el| extract::text(*el).contains(needle.as_str()));
    }
    if let Some(then_css) = &spec.then {
        let mut descended = Vec::new();
        for element in elements {
            descended.extend(extract::select_in(element, then_css)?);
        }
        elements = descended;
    }
    Ok(elements)
}

/// Extract one field relative to `element` per its spec. An empty CSS
/// selector reads from the element itself.
pub fn field(element: ElementRef<'_>, spec: &FieldSpec) -> Result<Option<String>> {
    let base = if spec.css.is_empty() {
        vec![element]
    } else {
        extract::select_in(element, &spec.css)?
    };
    Ok(refine_selection(base, spec)?
        .into_iter()
        .find_map(|el| value_from(el, &spec.from)))
}

fn doc_field(doc: &Html, spec: &FieldSpec) -> Result<Option<String>> {
    Ok(doc_fields(doc, spec)?.into_iter().next())
}

/// All values a spec matches on the page (tags, actor lists).
fn doc_fields(doc: &Html, spec: &FieldSpec) -> Result<Vec<String>> {
    let base = extract::select_all(doc, &spec.css)?;
    Ok(refine_selection(base, spec)?
        .into_iter()
        .filter_map(|el| value_from(el, &spec.from))
        .collect())
}

fn value_from(element: ElementRef<'_>, from: &ValueFrom) -> Option<String> {
    match from {
        ValueFrom::Text => Some(extract::text(element)).filter(|t| !t.is_empty()),
        ValueFrom::OwnText => Some(extract::own_text(element)).filter(|t| !t.is_empty()),
        ValueFrom::Attr(name) => extract::attr(element, name),
        ValueFrom::ImageAttr => extract::image_attr(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateKind, MediaKind};
    use crate::sites::{CandidateRules, DetailRules};

    fn fixture_spec() -> SiteSpec {
        let mut spec = SiteSpec::minimal("fixture", "https://fixture.example");
        spec.listing = ListRules {
            poster: Some(FieldSpec::image("img")),
            quality: Some(FieldSpec::text("div.quality")),
            episode_badge: Some(FieldSpec::text("div.last-episode span")),
            kind: KindRule::QualityBadge {
                series: MediaKind::TvSeries,
                movie: MediaKind::Movie,
            },
            ..ListRules::new(
                "article.item",
                FieldSpec::text("h2 > a"),
                FieldSpec::attr("a", "href"),
                KindRule::Fixed(MediaKind::Movie),
            )
        };
        spec.detail = DetailRules {
            title: FieldSpec::text("h1.entry-title"),
            poster: Some(FieldSpec::image("div.thumb img")),
            plot: Some(FieldSpec::text("div.entry-content > p")),
            year: Some(FieldSpec::text("span.year")),
            year_pattern: Some(r"(\d{4})".into()),
            tags: Some(FieldSpec::text("div.genres > a")),
            status: Some(FieldSpec::text("span.status")),
            series: SeriesDetect::Selector("div.eplister".into()),
            episodes: Some(EpisodeRules {
                item: "div.eplister ul li a".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        spec.candidates = Some(CandidateRules {
            selector: "select.mirror option".into(),
            value: ValueFrom::Attr("value".into()),
            kind: CandidateKind::EncodedBlob,
            server: Some(ValueFrom::Text),
            refine: None,
            absolute: false,
        });
        spec
    }

    const LISTING: &str = r#"
      <article class="item">
        <h2><a href="/movie/alpha">Alpha</a></h2>
        <a href="/movie/alpha"><img data-src="/img/alpha.jpg"></a>
        <div class="quality">HD</div>
      </article>
      <article class="item">
        <h2><a href="/series/beta">Beta</a></h2>
        <a href="/series/beta"><img src="https://cdn/beta.jpg"></a>
        <div class="last-episode"><span>Eps 8</span></div>
      </article>
      <article class="item"><p>broken card, no title</p></article>
    "#;

    const DETAIL_SERIES: &str = r#"
      <h1 class="entry-title">Beta Show</h1>
      <div class="thumb"><img src="/img/beta.jpg"></div>
      <div class="entry-content"><p>A show about tests.</p></div>
      <span class="year">Released: 2021</span>
      <div class="genres"><a>Drama</a><a>Action</a></div>
      <span class="status">Status: Ongoing</span>
      <div class="eplister"><ul>
        <li><a href="/series/beta-episode-3">Episode 3</a></li>
        <li><a href="/series/beta-episode-2">Episode 2</a></li>
        <li><a href="/series/beta-episode-1">Episode 1</a></li>
      </ul></div>
    "#;

    const DETAIL_MOVIE: &str = r#"
      <h1 class="entry-title">Alpha</h1>
      <span class="year">2019</span>
    "#;

    #[test]
    fn test_parse_listing_cards() {
        let spec = fixture_spec();
        let results =
            parse_listing(&spec, &spec.listing, "https://fixture.example/populer", LISTING)
                .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Alpha");
        assert_eq!(results[0].kind, MediaKind::Movie);
        assert_eq!(results[0].quality, Some(Quality::Hd));
        assert_eq!(
            results[0].content.url,
            "https://fixture.example/movie/alpha"
        );
        assert_eq!(
            results[0].poster.as_deref(),
            Some("https://fixture.example/img/alpha.jpg")
        );

        assert_eq!(results[1].kind, MediaKind::TvSeries);
        assert_eq!(results[1].latest_episode, Some(8));
        assert_eq!(results[1].quality, None);
    }

    #[test]
    fn test_parse_detail_series() {
        let spec = fixture_spec();
        let detail = parse_detail(
            &spec,
            "https://fixture.example/series/beta",
            "https://fixture.example",
            DETAIL_SERIES,
        )
        .unwrap();

        assert_eq!(detail.title, "Beta Show");
        assert_eq!(detail.kind, MediaKind::TvSeries);
        assert_eq!(detail.year, Some(2021));
        assert_eq!(detail.tags, vec!["Drama", "Action"]);
        assert_eq!(detail.status, Some(ShowStatus::Ongoing));
        assert_eq!(detail.origin, "https://fixture.example");

        // Source order (newest first) normalized to ascending.
        let numbers: Vec<_> = detail.episodes.iter().map(|e| e.episode).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(
            detail.episodes[0].content.url,
            "https://fixture.example/series/beta-episode-1"
        );
    }

    #[test]
    fn test_parse_detail_movie_play_target() {
        let spec = fixture_spec();
        let detail = parse_detail(
            &spec,
            "https://fixture.example/movie/alpha",
            "https://fixture.example",
            DETAIL_MOVIE,
        )
        .unwrap();

        assert_eq!(detail.kind, MediaKind::Movie);
        assert_eq!(detail.year, Some(2019));
        assert_eq!(detail.episodes.len(), 1);
        assert_eq!(
            detail.episodes[0].content.url,
            "https://fixture.example/movie/alpha"
        );
    }

    #[test]
    fn test_missing_title_is_parse_error() {
        let spec = fixture_spec();
        let err = parse_detail(
            &spec,
            "https://fixture.example/x",
            "https://fixture.example",
            "<html><p>empty</p></html>",
        );
        assert!(matches!(
            err,
            Err(crate::app::TributaryError::Parse(_))
        ));
    }

    #[test]
    fn test_discover_candidates() {
        let spec = fixture_spec();
        let play = PlayPage {
            requested_url: "https://fixture.example/watch/1".into(),
            final_url: "https://fixture.example/watch/1".into(),
            origin: "https://fixture.example".into(),
            body: r#"
              <select class="mirror">
                <option value="">Choose server</option>
                <option value="YmxvYg==">Server A</option>
                <option value="YmxvYjI=">Server B</option>
              </select>
            "#
            .into(),
        };
        let plan = discover(&spec, &play).unwrap();
        assert_eq!(plan.candidates.len(), 2);
        assert_eq!(plan.candidates[0].raw, "YmxvYg==");
        assert_eq!(plan.candidates[0].server.as_deref(), Some("Server A"));
        assert_eq!(plan.candidates[0].kind, CandidateKind::EncodedBlob);
    }

    #[test]
    fn test_instantiate_rules_substitutes_origin() {
        use crate::resolve::FollowRule;
        let rules = ResolveRules {
            follow: Some(
                FollowRule::get()
                    .with_url("{origin}/wp-admin/admin-ajax.php")
                    .with_referer("{origin}/"),
            ),
            stream_referer: Some("{origin}/".into()),
            ..Default::default()
        };
        let rules = instantiate_rules(&rules, "https://live.example");
        let follow = rules.follow.unwrap();
        assert_eq!(
            follow.url_template.as_deref(),
            Some("https://live.example/wp-admin/admin-ajax.php")
        );
        assert_eq!(follow.referer.as_deref(), Some("https://live.example/"));
        assert_eq!(rules.stream_referer.as_deref(), Some("https://live.example/"));
    }
}
