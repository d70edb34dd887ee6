//! The resolution pipeline: play page → candidates → concurrent
//! resolution chains → emitted stream descriptors.
//!
//! Every candidate chain is independent: it owns its fetched bodies and
//! reference strings, and a failed chain is dropped without touching its
//! siblings. The only shared values are read-only (context, rules, play
//! page), so candidate fan-out needs no locks beyond the emit sink.

pub mod emit;

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::Result;
use crate::domain::EpisodeRef;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::hosts::ExtractorRegistry;
use crate::resolve::Terminal;
use crate::sites::Adapter;

pub use emit::{EmitSink, ResolvedLinks, StreamCallback, SubtitleCallback};

pub const DEFAULT_WORKERS: usize = 8;

/// Read-only dependencies handed to adapters and resolution chains.
#[derive(Clone)]
pub struct PipelineContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub hosts: Arc<ExtractorRegistry>,
}

/// A fetched play page plus its post-redirect origin. The origin rides
/// along here instead of living in mutable adapter state, so concurrent
/// chains can never race on it.
#[derive(Debug, Clone)]
pub struct PlayPage {
    pub requested_url: String,
    pub final_url: String,
    pub origin: String,
    pub body: String,
}

pub struct Orchestrator {
    cx: PipelineContext,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(cx: PipelineContext) -> Self {
        Self::with_workers(cx, DEFAULT_WORKERS)
    }

    pub fn with_workers(cx: PipelineContext, workers: usize) -> Self {
        Self {
            cx,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.cx
    }

    /// Resolve every stream source reachable from `target`'s play page.
    ///
    /// All discovered candidates are driven to a terminal state; no
    /// early exit on first success, the host wants every viable source.
    /// Candidate failures are dropped silently; only the play-page fetch
    /// itself can fail this call. Zero candidates is an empty result,
    /// not an error.
    pub async fn resolve_all(
        &self,
        adapter: Arc<dyn Adapter>,
        target: &EpisodeRef,
        on_stream: Option<StreamCallback>,
        on_subtitle: Option<SubtitleCallback>,
    ) -> Result<ResolvedLinks> {
        let response = self
            .cx
            .fetcher
            .fetch(FetchRequest::get(&target.content.url))
            .await?;
        let origin = response.origin()?;
        let play = Arc::new(PlayPage {
            requested_url: target.content.url.clone(),
            final_url: response.final_url,
            origin,
            body: response.body,
        });

        let plan = adapter.discover(&self.cx, &play).await?;
        let rules = Arc::new(plan.rules);
        let sink = Arc::new(EmitSink::new(adapter.name(), on_stream, on_subtitle));

        tracing::debug!(
            site = adapter.name(),
            candidates = plan.candidates.len(),
            url = %play.final_url,
            "dispatching resolution chains"
        );

        let mut handles = Vec::new();
        for candidate in plan.candidates {
            let cx = self.cx.clone();
            let adapter = adapter.clone();
            let play = play.clone();
            let rules = rules.clone();
            let sink = sink.clone();
            let semaphore = self.semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let label = candidate.label().to_string();
                let terminal = adapter.resolve_candidate(&cx, &play, &rules, candidate).await;
                deliver(&cx, &sink, &label, terminal).await;
            }));
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!("Task join error: {}", e);
            }
        }

        Ok(sink.collected())
    }
}

/// Push one terminal state into the sink. Provider URLs go through the
/// known-host registry; direct sources are emitted as-is.
async fn deliver(cx: &PipelineContext, sink: &EmitSink, candidate_label: &str, terminal: Terminal) {
    match terminal {
        Terminal::Resolved { sources, subtitles } => {
            for subtitle in &subtitles {
                sink.subtitle(&subtitle.language, &subtitle.url);
            }
            for source in sources {
                if source.direct {
                    sink.stream(&source.label, &source.url, source.referer.clone());
                } else {
                    let handled = cx
                        .hosts
                        .resolve_known_host(
                            cx.fetcher.as_ref(),
                            &source.url,
                            source.referer.as_deref(),
                            sink,
                        )
                        .await;
                    if !handled {
                        tracing::debug!(url = %source.url, "no extractor for provider");
                    }
                }
            }
        }
        Terminal::Dropped(reason) => {
            tracing::debug!(candidate = candidate_label, ?reason, "candidate dropped");
        }
    }
}
