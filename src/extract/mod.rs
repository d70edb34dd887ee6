//! Field extraction over fetched bodies: CSS-selector queries, regex
//! capture groups, base64 blobs, and URL fixup.
//!
//! Extraction never fails on "no match": it returns empty/`None` and the
//! caller decides whether that means end-of-data or a missing required
//! field (promoted to a parse error via [`required`]). Every call re-runs
//! its query; nothing is cached between calls.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use html_escape::decode_html_entities;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::app::{Result, TributaryError};

pub fn parse(body: &str) -> Html {
    Html::parse_document(body)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| TributaryError::Parse(format!("bad selector {css:?}: {e}")))
}

pub fn select_all<'a>(doc: &'a Html, css: &str) -> Result<Vec<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(doc.select(&selector).collect())
}

pub fn select_first<'a>(doc: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(doc.select(&selector).next())
}

pub fn select_in<'a>(element: ElementRef<'a>, css: &str) -> Result<Vec<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(element.select(&selector).collect())
}

pub fn select_in_first<'a>(element: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(element.select(&selector).next())
}

/// Full text of the element and its descendants, entity-decoded and trimmed.
pub fn text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    decode_html_entities(raw.trim()).into_owned()
}

/// Text of the element's direct text nodes only (children excluded).
pub fn own_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for child in element.children() {
        if let scraper::Node::Text(t) = child.value() {
            raw.push_str(&t.text);
        }
    }
    decode_html_entities(raw.trim()).into_owned()
}

pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// First present attribute from the list.
pub fn first_attr(element: ElementRef<'_>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| attr(element, *name))
}

/// Poster images hide behind lazy-loading attributes on several sites;
/// `srcset` entries carry a width suffix that gets cut off.
pub fn image_attr(element: ElementRef<'_>) -> Option<String> {
    attr(element, "data-src")
        .or_else(|| attr(element, "data-lazy-src"))
        .or_else(|| attr(element, "data-original"))
        .or_else(|| {
            attr(element, "srcset")
                .and_then(|s| s.split_whitespace().next().map(String::from))
        })
        .or_else(|| attr(element, "src"))
}

/// Group 1 of `pattern` in `haystack`. The pattern comes from adapter
/// descriptors, so compilation failures are parse errors, not panics.
pub fn capture(pattern: &str, haystack: &str) -> Result<Option<String>> {
    let re = Regex::new(pattern)
        .map_err(|e| TributaryError::Parse(format!("bad pattern {pattern:?}: {e}")))?;
    Ok(capture_with(&re, haystack))
}

/// Group 1 via an already-compiled regex.
pub fn capture_with(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The digits of `text` as a number, if any.
pub fn digits(text: &str) -> Option<u32> {
    let filtered: String = text.chars().filter(char::is_ascii_digit).collect();
    filtered.parse().ok()
}

pub fn decode_base64(encoded: &str) -> Result<String> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| TributaryError::Decode(format!("base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| TributaryError::Decode(format!("base64 utf-8: {e}")))
}

pub fn encode_base64(plain: &str) -> String {
    BASE64.encode(plain.as_bytes())
}

/// Make a scraped href absolute against `base`. Empty hrefs are `None`.
pub fn fix_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = Url::parse(base).ok()?;
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("{}://{}", base.scheme(), rest));
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// `scheme://host` of a URL.
pub fn origin_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| TributaryError::Parse(format!("no host in {url}")))?;
    Ok(format!("{}://{}", parsed.scheme(), host))
}

/// Promote a missing required field to a parse error.
pub fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| TributaryError::Parse(format!("missing required field: {what}")))
}
