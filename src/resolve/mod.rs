//! Redirect resolution: one `SourceCandidate` in, one `Terminal` out.
//!
//! A candidate walks `Raw → Decoded → Followed → Terminal`, driven by the
//! declarative [`ResolveRules`] its site built for the current page. Any
//! failure along the way drops that candidate alone; the pipeline keeps
//! going with its siblings, and nothing is ever retried.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::app::{Result, TributaryError};
use crate::domain::{CandidateKind, SourceCandidate, SubtitleDescriptor};
use crate::extract;
use crate::fetcher::{FetchRequest, Fetcher};

/// Chains are at most three fetches deep (play page → embed → sub-API).
/// Termination is by construction; the budget makes the bound explicit
/// for adapters that drive their own fetch sequences.
pub const MAX_HOPS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct HopBudget {
    left: usize,
}

impl HopBudget {
    pub fn new() -> Self {
        Self { left: MAX_HOPS }
    }

    /// Spend one hop; fails the candidate when the budget is exhausted.
    pub fn take(&mut self) -> Result<()> {
        if self.left == 0 {
            return Err(TributaryError::NoStreamFound("hop budget exhausted".into()));
        }
        self.left -= 1;
        Ok(())
    }
}

impl Default for HopBudget {
    fn default() -> Self {
        Self::new()
    }
}

/// How to reach the next hop from a decoded reference.
#[derive(Debug, Clone)]
pub struct FollowRule {
    /// URL to fetch, with `{ref}` substituted by the current reference.
    /// `None` fetches the reference itself.
    pub url_template: Option<String>,
    pub referer: Option<String>,
    /// Form fields POSTed urlencoded; `{ref}` substituted in values.
    /// Empty means GET.
    pub form: Vec<(String, String)>,
    pub xml_http: bool,
    pub timeout: Option<Duration>,
}

impl FollowRule {
    pub fn get() -> Self {
        Self {
            url_template: None,
            referer: None,
            form: Vec::new(),
            xml_http: false,
            timeout: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_url(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How the final playable reference is pulled out of the last hop.
#[derive(Debug, Clone, Default)]
pub enum TerminalRule {
    /// The current reference already is the provider/stream URL.
    #[default]
    Reference,
    /// The followed body embeds the provider in an iframe.
    Frame {
        selector: String,
        attrs: Vec<String>,
    },
    /// The followed body is JSON; the string at this path is the provider.
    JsonPath(Vec<String>),
    /// The followed body carries a `sources: [...]` player script whose
    /// entries are emitted directly with their own quality labels.
    SourcesScript,
}

/// Per-site resolution strategy, instantiated per pipeline run so the
/// page origin is threaded through rather than read from shared state.
#[derive(Debug, Clone, Default)]
pub struct ResolveRules {
    pub follow: Option<FollowRule>,
    pub terminal: TerminalRule,
    /// Host substitutions applied to references and terminal URLs.
    pub rewrites: Vec<(String, String)>,
    /// Referer attached to resolved sources for the player / extractor.
    pub stream_referer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub url: String,
    pub label: String,
    pub referer: Option<String>,
    /// Direct sources are emitted as-is; the rest go through the
    /// known-host extractor registry first.
    pub direct: bool,
}

#[derive(Debug)]
pub enum DropReason {
    Decode(String),
    Network(String),
    NoStream(String),
}

impl From<TributaryError> for DropReason {
    fn from(err: TributaryError) -> Self {
        match err {
            TributaryError::Decode(msg) => Self::Decode(msg),
            TributaryError::Http(e) => Self::Network(e.to_string()),
            TributaryError::Network(msg) => Self::Network(msg),
            other => Self::NoStream(other.to_string()),
        }
    }
}

/// Terminal state of one candidate. Only `Resolved` reaches the emitter;
/// `Dropped` is logged and forgotten.
#[derive(Debug)]
pub enum Terminal {
    Resolved {
        sources: Vec<ResolvedSource>,
        subtitles: Vec<SubtitleDescriptor>,
    },
    Dropped(DropReason),
}

impl Terminal {
    pub fn provider(url: String, label: String, referer: Option<String>) -> Self {
        Self::Resolved {
            sources: vec![ResolvedSource {
                url,
                label,
                referer,
                direct: false,
            }],
            subtitles: Vec::new(),
        }
    }

    pub fn direct(sources: Vec<ResolvedSource>) -> Self {
        Self::Resolved {
            sources,
            subtitles: Vec::new(),
        }
    }
}

pub struct Resolver<'a> {
    fetcher: &'a dyn Fetcher,
    rules: &'a ResolveRules,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, rules: &'a ResolveRules) -> Self {
        Self { fetcher, rules }
    }

    pub async fn resolve(&self, candidate: SourceCandidate) -> Terminal {
        match self.run(candidate).await {
            Ok(terminal) => terminal,
            Err(err) => Terminal::Dropped(DropReason::from(err)),
        }
    }

    async fn run(&self, candidate: SourceCandidate) -> Result<Terminal> {
        let label = candidate.label().to_string();
        let mut budget = HopBudget::new();

        // Raw → Decoded
        let reference = match candidate.kind {
            CandidateKind::EncodedBlob => decode_blob(&candidate.raw)?,
            _ => candidate.raw,
        };
        let reference = self.rewrite(&reference);

        // Decoded → Followed
        let Some(follow) = &self.rules.follow else {
            // No follow hop configured: the reference is terminal.
            return Ok(Terminal::provider(
                reference,
                label,
                self.rules.stream_referer.clone(),
            ));
        };
        budget.take()?;
        let url = match &follow.url_template {
            Some(template) => template.replace("{ref}", &reference),
            None => reference.clone(),
        };
        let mut request = if follow.form.is_empty() {
            FetchRequest::get(url)
        } else {
            let form = follow
                .form
                .iter()
                .map(|(k, v)| (k.clone(), v.replace("{ref}", &reference)))
                .collect();
            FetchRequest::post_form(url, form)
        };
        if let Some(referer) = &follow.referer {
            request = request.with_referer(referer.clone());
        }
        if follow.xml_http {
            request = request.xml_http_request();
        }
        if let Some(timeout) = follow.timeout {
            request = request.with_timeout(timeout);
        }
        let response = self.fetcher.fetch(request).await?;

        // Followed → Terminal
        match &self.rules.terminal {
            TerminalRule::Reference => Ok(Terminal::provider(
                reference,
                label,
                self.rules.stream_referer.clone(),
            )),
            TerminalRule::Frame { selector, attrs } => {
                let frame = frame_source(&response.body, selector, attrs)?;
                let url = extract::fix_url(&response.final_url, &frame).ok_or_else(|| {
                    TributaryError::NoStreamFound(format!("unusable frame source {frame:?}"))
                })?;
                Ok(Terminal::provider(
                    self.rewrite(&url),
                    label,
                    self.rules.stream_referer.clone(),
                ))
            }
            TerminalRule::JsonPath(path) => {
                let url = json_path(&response.body, path)?;
                Ok(Terminal::provider(
                    self.rewrite(&url),
                    label,
                    self.rules.stream_referer.clone(),
                ))
            }
            TerminalRule::SourcesScript => {
                let entries = parse_sources_script(&response.body);
                if entries.is_empty() {
                    return Err(TributaryError::NoStreamFound(
                        "no sources script in followed body".into(),
                    ));
                }
                let referer = self.rules.stream_referer.clone();
                Ok(Terminal::direct(
                    entries
                        .into_iter()
                        .map(|(file, entry_label)| ResolvedSource {
                            url: self.rewrite(&file),
                            label: entry_label.unwrap_or_else(|| label.clone()),
                            referer: referer.clone(),
                            direct: true,
                        })
                        .collect(),
                ))
            }
        }
    }

    fn rewrite(&self, url: &str) -> String {
        let mut url = url.to_string();
        for (from, to) in &self.rules.rewrites {
            url = url.replace(from, to);
        }
        url
    }
}

/// Decode a base64 HTML blob and pull the embedded iframe source out of
/// it. Anything wrong here counts as a decode failure.
pub fn decode_blob(raw: &str) -> Result<String> {
    let blob = extract::decode_base64(raw)?;
    let doc = extract::parse(&blob);
    extract::select_first(&doc, "iframe")?
        .and_then(|el| extract::attr(el, "src"))
        .ok_or_else(|| TributaryError::Decode("decoded blob holds no iframe".into()))
}

fn frame_source(body: &str, selector: &str, attrs: &[String]) -> Result<String> {
    let doc = extract::parse(body);
    let Some(frame) = extract::select_first(&doc, selector)? else {
        return Err(TributaryError::NoStreamFound(format!(
            "no frame matching {selector:?}"
        )));
    };
    attrs
        .iter()
        .find_map(|attr| extract::attr(frame, attr))
        .ok_or_else(|| TributaryError::NoStreamFound("frame has no usable source attr".into()))
}

fn json_path(body: &str, path: &[String]) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TributaryError::NoStreamFound(format!("sub-API body not JSON: {e}")))?;
    let mut current = &value;
    for key in path {
        current = current
            .get(key)
            .ok_or_else(|| TributaryError::NoStreamFound(format!("missing JSON field {key:?}")))?;
    }
    current
        .as_str()
        .map(String::from)
        .ok_or_else(|| TributaryError::NoStreamFound("JSON field is not a string".into()))
}

#[derive(Debug, Deserialize)]
struct ScriptSource {
    file: String,
    label: Option<String>,
}

static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,]\s*)(\w+)\s*:"#).expect("bare key regex"));

/// Objects of a `<key>: [{…}, …]` array embedded in a player script.
/// Player pages routinely use bare keys and single quotes, so a relaxed
/// second parse quotes them before giving up. Returns an empty list when
/// no usable array is present.
pub fn parse_script_objects(body: &str, key: &str) -> Vec<serde_json::Value> {
    let Ok(re) = Regex::new(&format!(r"{}\s*:\s*\[([^\]]*)\]", regex::escape(key))) else {
        return Vec::new();
    };
    let Some(captures) = re.captures(body) else {
        return Vec::new();
    };
    let raw = format!("[{}]", &captures[1]);

    serde_json::from_str(&raw)
        .ok()
        .or_else(|| {
            let quoted = BARE_KEY_RE.replace_all(&raw, "$1\"$2\":").replace('\'', "\"");
            serde_json::from_str(&quoted).ok()
        })
        .unwrap_or_default()
}

/// Entries of a `sources: [{file: …, label: …}, …]` player script.
pub fn parse_sources_script(body: &str) -> Vec<(String, Option<String>)> {
    parse_script_objects(body, "sources")
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ScriptSource>(value).ok())
        .map(|s| (s.file, s.label))
        .collect()
}
