//! End-to-end resolution through the public surface: config → context →
//! adapter → pipeline → emitted descriptors, with a fixture transport
//! plugged in behind the `Fetcher` trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tributary::app::{AppContext, Result, TributaryError};
use tributary::config::Config;
use tributary::domain::{Quality, StreamDescriptor};
use tributary::extract::encode_base64;
use tributary::fetcher::{FetchRequest, FetchResponse, Fetcher};
use tributary::pipeline::{StreamCallback, SubtitleCallback};

struct FixtureFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        match self.pages.get(&request.url) {
            Some(body) => Ok(FetchResponse {
                final_url: request.url,
                body: body.clone(),
            }),
            None => Err(TributaryError::Network(format!(
                "status 404 for {}",
                request.url
            ))),
        }
    }
}

fn context_with_page(url: &str, body: String) -> AppContext {
    let mut pages = HashMap::new();
    pages.insert(url.to_string(), body);
    AppContext::with_fetcher(Config::default(), Arc::new(FixtureFetcher { pages }))
}

fn mirror_page(options: &[&str]) -> String {
    let options: String = options
        .iter()
        .enumerate()
        .map(|(i, value)| format!(r#"<option value="{value}">Mirror {i}</option>"#))
        .collect();
    format!(r#"<div class="mobius"><select class="mirror">{options}</select></div>"#)
}

#[tokio::test]
async fn resolves_direct_file_mirrors_and_drops_broken_ones() {
    let good = encode_base64(r#"<iframe src="https://cdn.example/contoh-ep1-720p.mp4"></iframe>"#);
    let play_url = "https://dramaid.nl/contoh-episode-1";
    let ctx = context_with_page(play_url, mirror_page(&[&good, "%%broken-blob%%"]));

    let links = ctx.resolve_links("dramaid", play_url).await.unwrap();

    // The decodable mirror came through; the broken one vanished without
    // taking the page down with it.
    assert_eq!(links.streams.len(), 1);
    let stream = &links.streams[0];
    assert_eq!(stream.url, "https://cdn.example/contoh-ep1-720p.mp4");
    assert_eq!(stream.source, "dramaid");
    assert_eq!(stream.quality, Quality::P720);
    assert!(!stream.is_manifest);
    assert_eq!(stream.referer.as_deref(), Some("https://dramaid.nl/"));
}

#[tokio::test]
async fn load_links_reports_the_emitted_count() {
    let good = encode_base64(r#"<iframe src="https://cdn.example/contoh.m3u8"></iframe>"#);
    let play_url = "https://dramaid.nl/contoh-episode-2";
    let ctx = context_with_page(play_url, mirror_page(&[&good]));

    let seen: Arc<Mutex<Vec<StreamDescriptor>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = seen.clone();
    let on_stream: StreamCallback = Arc::new(move |d| seen_cb.lock().unwrap().push(d));

    let on_subtitle: SubtitleCallback = Arc::new(|_| {});
    let count = ctx
        .load_links("dramaid", play_url, on_stream, on_subtitle)
        .await
        .unwrap();

    assert_eq!(count, 1);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_manifest);
}

#[tokio::test]
async fn a_page_without_mirrors_is_empty_not_an_error() {
    let play_url = "https://dramaid.nl/contoh-episode-3";
    let ctx = context_with_page(play_url, "<html><p>maintenance</p></html>".into());

    let links = ctx.resolve_links("dramaid", play_url).await.unwrap();
    assert!(links.is_empty());
}

#[tokio::test]
async fn unknown_sites_are_rejected() {
    let ctx = context_with_page("https://x/", String::new());
    assert!(matches!(
        ctx.resolve_links("notasite", "https://x/").await,
        Err(TributaryError::UnknownSite(_))
    ));
}
