//! Site adapters.
//!
//! Each supported site is one module holding a declarative [`SiteSpec`]
//! (sections, selectors, resolution rules; data, not code) plus trait
//! overrides only where a site's behavior cannot be expressed as data.
//! One generic implementation (`generic`) drives listing, search, detail
//! loading and candidate discovery for everyone.

pub mod generic;

mod animesail;
mod anoboy;
mod dramaid;
mod dramaserial;
mod dutamovie;
mod gomov;
mod kuramanime;
mod layarkaca;
mod rebahin;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::config::Config;
use crate::domain::{
    CandidateKind, ContentRef, MediaDetail, MediaKind, SearchResult, SourceCandidate,
};
use crate::pipeline::{PipelineContext, PlayPage};
use crate::resolve::{ResolveRules, Resolver, Terminal};

/// Where a field's value comes from within a selected element.
#[derive(Debug, Clone)]
pub enum ValueFrom {
    Text,
    OwnText,
    Attr(String),
    /// Lazy-image attribute fallback chain.
    ImageAttr,
}

/// One extractable field: a CSS selector relative to the current element
/// (empty selector = the element itself) plus a value source.
///
/// `contains` narrows the matched elements to those whose text holds the
/// needle, and `then` descends further. Together they cover the
/// `label:contains(Genre:) > a` shapes these sites are full of.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub css: String,
    pub from: ValueFrom,
    pub contains: Option<String>,
    pub then: Option<String>,
}

impl FieldSpec {
    pub fn text(css: &str) -> Self {
        Self {
            css: css.into(),
            from: ValueFrom::Text,
            contains: None,
            then: None,
        }
    }

    pub fn own_text(css: &str) -> Self {
        Self {
            from: ValueFrom::OwnText,
            ..Self::text(css)
        }
    }

    pub fn attr(css: &str, name: &str) -> Self {
        Self {
            from: ValueFrom::Attr(name.into()),
            ..Self::text(css)
        }
    }

    pub fn image(css: &str) -> Self {
        Self {
            from: ValueFrom::ImageAttr,
            ..Self::text(css)
        }
    }

    /// Value taken from the selected element itself.
    pub fn self_attr(name: &str) -> Self {
        Self {
            from: ValueFrom::Attr(name.into()),
            ..Self::text("")
        }
    }

    pub fn containing(mut self, needle: &str) -> Self {
        self.contains = Some(needle.into());
        self
    }

    pub fn then(mut self, css: &str) -> Self {
        self.then = Some(css.into());
        self
    }
}

/// How a listing card decides between movie and series.
#[derive(Debug, Clone)]
pub enum KindRule {
    Fixed(MediaKind),
    /// Presence of the marker element means series.
    Marker {
        css: String,
        series: MediaKind,
        movie: MediaKind,
    },
    /// A non-empty quality badge means movie.
    QualityBadge {
        series: MediaKind,
        movie: MediaKind,
    },
}

/// Selectors for one listing/search page layout.
#[derive(Debug, Clone)]
pub struct ListRules {
    pub item: String,
    pub title: FieldSpec,
    pub link: FieldSpec,
    pub poster: Option<FieldSpec>,
    pub quality: Option<FieldSpec>,
    pub episode_badge: Option<FieldSpec>,
    /// Regex (group 1) isolating the episode number in the badge text.
    pub episode_badge_pattern: Option<String>,
    pub kind: KindRule,
    /// Canonicalize hrefs that point at an episode page instead of the
    /// show page.
    pub link_fix: Option<fn(&SiteSpec, String) -> String>,
    /// Clean up poster URLs (e.g. strip resize suffixes).
    pub poster_fix: Option<fn(String) -> String>,
}

impl ListRules {
    pub fn new(item: &str, title: FieldSpec, link: FieldSpec, kind: KindRule) -> Self {
        Self {
            item: item.into(),
            title,
            link,
            poster: None,
            quality: None,
            episode_badge: None,
            episode_badge_pattern: None,
            kind,
            link_fix: None,
            poster_fix: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SeriesDetect {
    /// Element present on the detail page means series.
    Selector(String),
    /// Substring of the page URL means series.
    UrlContains(String),
    Always,
}

#[derive(Debug, Clone)]
pub struct EpisodeRules {
    pub item: String,
    /// Episode display name; defaults to the item's anchor text.
    pub name: Option<FieldSpec>,
    /// Link to the episode page; defaults to the item's (or its first
    /// anchor's) `href`.
    pub link: Option<FieldSpec>,
    /// Regex (group 1) for the episode number, applied to the name.
    pub episode_pattern: Option<String>,
    /// Regex (group 1) for the season number.
    pub season_pattern: Option<String>,
    /// Apply `season_pattern` to the episode link instead of the name.
    pub season_from_link: bool,
    /// Skip entries without a parsed episode number.
    pub require_number: bool,
    /// Source lists newest first; reverse to ascending.
    pub newest_first: bool,
}

impl Default for EpisodeRules {
    fn default() -> Self {
        Self {
            item: ".eplister > ul > li".into(),
            name: None,
            link: None,
            episode_pattern: Some(r"(?i)(?:Episode|Eps)\s*(\d+)".into()),
            season_pattern: None,
            season_from_link: false,
            require_number: false,
            newest_first: true,
        }
    }
}

/// Detail-page selectors.
#[derive(Debug, Clone)]
pub struct DetailRules {
    pub title: FieldSpec,
    /// Substrings that cut the title short ("Season", "Episode").
    pub title_strip: Vec<String>,
    pub poster: Option<FieldSpec>,
    pub plot: Option<FieldSpec>,
    pub year: Option<FieldSpec>,
    /// Regex (group 1) isolating the year inside the year field's text.
    pub year_pattern: Option<String>,
    pub tags: Option<FieldSpec>,
    pub status: Option<FieldSpec>,
    pub rating: Option<FieldSpec>,
    pub actors: Option<FieldSpec>,
    pub trailer: Option<FieldSpec>,
    pub recommendations: Option<ListRules>,
    pub series: SeriesDetect,
    pub series_kind: MediaKind,
    pub movie_kind: MediaKind,
    /// Free-text type label refining the kind (OVA/Movie/…), mapped by
    /// `kind_map`.
    pub kind_text: Option<FieldSpec>,
    pub kind_map: Option<fn(&str, bool) -> MediaKind>,
    /// `None` when the adapter builds its episode list itself.
    pub episodes: Option<EpisodeRules>,
}

impl Default for DetailRules {
    fn default() -> Self {
        Self {
            title: FieldSpec::text("h1.entry-title"),
            title_strip: Vec::new(),
            poster: None,
            plot: None,
            year: None,
            year_pattern: None,
            tags: None,
            status: None,
            rating: None,
            actors: None,
            trailer: None,
            recommendations: None,
            series: SeriesDetect::Always,
            series_kind: MediaKind::TvSeries,
            movie_kind: MediaKind::Movie,
            kind_text: None,
            kind_map: None,
            episodes: Some(EpisodeRules::default()),
        }
    }
}

/// How the play page's source candidates are enumerated.
#[derive(Debug, Clone)]
pub struct CandidateRules {
    pub selector: String,
    pub value: ValueFrom,
    pub kind: CandidateKind,
    pub server: Option<ValueFrom>,
    /// Regex (group 1) refining the raw reference.
    pub refine: Option<String>,
    /// Make the reference absolute against the play page URL.
    pub absolute: bool,
}

/// One main-page row: a URL template with `{page}` plus its label.
#[derive(Debug, Clone)]
pub struct Section {
    pub url: String,
    pub label: String,
}

impl Section {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

/// The declarative descriptor one generic implementation runs a site
/// from. Base URLs are baked in at construction (config overrides
/// included) and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SiteSpec {
    pub name: &'static str,
    pub lang: &'static str,
    pub base_url: String,
    pub kinds: Vec<MediaKind>,
    pub sections: Vec<Section>,
    /// Search URL template with `{query}` (already urlencoded).
    pub search_url: String,
    pub listing: ListRules,
    /// Search layout when it differs from the listing layout.
    pub search: Option<ListRules>,
    pub detail: DetailRules,
    /// `None` when the site overrides discovery (or has no sources).
    pub candidates: Option<CandidateRules>,
    /// Static resolution rules; `{origin}` placeholders are substituted
    /// per run with the play page's post-redirect origin.
    pub rules: ResolveRules,
}

impl SiteSpec {
    /// Bare spec for adapters (and tests) that override everything.
    pub fn minimal(name: &'static str, base_url: &str) -> Self {
        Self {
            name,
            lang: "id",
            base_url: base_url.into(),
            kinds: vec![MediaKind::Movie, MediaKind::TvSeries],
            sections: Vec::new(),
            search_url: format!("{base_url}/?s={{query}}"),
            listing: ListRules::new(
                "article",
                FieldSpec::text("h2 a"),
                FieldSpec::attr("a", "href"),
                KindRule::Fixed(MediaKind::Movie),
            ),
            search: None,
            detail: DetailRules::default(),
            candidates: None,
            rules: ResolveRules::default(),
        }
    }

    pub fn section(&self, label: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
    }
}

/// Discovery output for one play page: the candidate set plus the rules
/// their chains run under.
#[derive(Debug)]
pub struct LinkPlan {
    pub candidates: Vec<SourceCandidate>,
    pub rules: ResolveRules,
}

/// One site adapter. Defaults drive everything off the descriptor;
/// override only what the site genuinely does differently.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn spec(&self) -> &SiteSpec;

    fn name(&self) -> &'static str {
        self.spec().name
    }

    async fn main_page(
        &self,
        cx: &PipelineContext,
        section: &Section,
        page: u32,
    ) -> Result<Vec<SearchResult>> {
        generic::main_page(self.spec(), cx, section, page).await
    }

    async fn search(&self, cx: &PipelineContext, query: &str) -> Result<Vec<SearchResult>> {
        generic::search(self.spec(), cx, query).await
    }

    async fn load(&self, cx: &PipelineContext, content: &ContentRef) -> Result<MediaDetail> {
        generic::load(self.spec(), cx, content).await
    }

    async fn discover(&self, _cx: &PipelineContext, play: &PlayPage) -> Result<LinkPlan> {
        generic::discover(self.spec(), play)
    }

    async fn resolve_candidate(
        &self,
        cx: &PipelineContext,
        _play: &PlayPage,
        rules: &ResolveRules,
        candidate: SourceCandidate,
    ) -> Terminal {
        Resolver::new(cx.fetcher.as_ref(), rules).resolve(candidate).await
    }
}

/// All adapters this build knows about, with config overrides applied.
pub struct SiteRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl SiteRegistry {
    pub fn with_config(config: &Config) -> Self {
        let adapters: Vec<Arc<dyn Adapter>> = vec![
            Arc::new(layarkaca::LayarKaca::new(config.site("layarkaca"))),
            Arc::new(dramaid::Dramaid::new(config.site("dramaid"))),
            Arc::new(gomov::Gomov::new(config.site("gomov"))),
            Arc::new(dutamovie::DutaMovie::new(config.site("dutamovie"))),
            Arc::new(anoboy::Anoboy::new(config.site("anoboy"))),
            Arc::new(kuramanime::Kuramanime::new(config.site("kuramanime"))),
            Arc::new(dramaserial::DramaSerial::new(config.site("dramaserial"))),
            Arc::new(rebahin::Rebahin::new(config.site("rebahin"))),
            Arc::new(rebahin::Rebahin::kitanonton(config.site("kitanonton"))),
            Arc::new(animesail::AnimeSail::new(config.site("animesail"))),
        ];
        Self { adapters }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.adapters.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_all_sites() {
        let registry = SiteRegistry::with_config(&Config::default());
        let names = registry.names();
        for expected in [
            "layarkaca",
            "dramaid",
            "gomov",
            "dutamovie",
            "anoboy",
            "kuramanime",
            "dramaserial",
            "rebahin",
            "kitanonton",
            "animesail",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = SiteRegistry::with_config(&Config::default());
        assert!(registry.get("GoMov").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_base_url_override_applies() {
        let mut config = Config::default();
        config
            .sites
            .entry("gomov".into())
            .or_default()
            .base_url = Some("https://gomov.example".into());

        let registry = SiteRegistry::with_config(&config);
        let gomov = registry.get("gomov").unwrap();
        assert_eq!(gomov.spec().base_url, "https://gomov.example");
    }
}
