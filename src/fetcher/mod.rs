pub mod http_fetcher;

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// Default per-request timeout. Individual requests may override it
/// (one site's player host needs up to 50 s), but every fetch is finite.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing page request. Target sites gate responses on the
/// `Referer` and `X-Requested-With` headers, so both are first-class.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub referer: Option<String>,
    /// Form fields sent urlencoded on POST.
    pub form: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            referer: None,
            form: Vec::new(),
            timeout: None,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            headers: Vec::new(),
            referer: None,
            form,
            timeout: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Mark the request as an ajax call the way browsers do.
    pub fn xml_http_request(self) -> Self {
        self.with_header("X-Requested-With", "XMLHttpRequest")
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL after redirects; the origin of this is threaded forward so
    /// later hops never consult shared state.
    pub final_url: String,
    pub body: String,
}

impl FetchResponse {
    /// `scheme://host` of the final URL.
    pub fn origin(&self) -> Result<String> {
        crate::extract::origin_of(&self.final_url)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::app::TributaryError;

    /// In-memory `Fetcher` for tests: canned bodies per URL, plus URLs
    /// that fail to simulate timeouts. Records every request it sees.
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        failing: Vec<String>,
        seen: Mutex<Vec<FetchRequest>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.pages.insert(url.into(), body.into());
            self
        }

        pub fn failing(mut self, url: impl Into<String>) -> Self {
            self.failing.push(url.into());
            self
        }

        pub fn requests(&self) -> Vec<FetchRequest> {
            self.seen.lock().expect("request log poisoned").clone()
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            self.seen
                .lock()
                .expect("request log poisoned")
                .push(request.clone());
            if self.failing.iter().any(|u| *u == request.url) {
                return Err(TributaryError::Network(format!(
                    "timed out fetching {}",
                    request.url
                )));
            }
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

    #[test]
    fn test_request_builders() {
        let req = FetchRequest::get("https://example.com/")
            .with_referer("https://ref/")
            .xml_http_request()
            .with_timeout(Duration::from_secs(50));

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.referer.as_deref(), Some("https://ref/"));
        assert_eq!(req.timeout, Some(Duration::from_secs(50)));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "X-Requested-With" && v == "XMLHttpRequest"));
    }

    #[test]
    fn test_static_fetcher_round_trip() {
        let fetcher = StaticFetcher::new()
            .page("https://a/", "<html></html>")
            .failing("https://b/");

        tokio_test::block_on(async {
            let ok = fetcher.fetch(FetchRequest::get("https://a/")).await.unwrap();
            assert_eq!(ok.body, "<html></html>");
            assert_eq!(ok.final_url, "https://a/");

            let err = fetcher.fetch(FetchRequest::get("https://b/")).await;
            assert!(matches!(err, Err(TributaryError::Network(_))));
        });
        assert_eq!(fetcher.requests().len(), 2);
    }
}
