//! # Tributary
//!
//! Site adapters for a media-aggregation host, plus the shared
//! link-resolution pipeline they all feed.
//!
//! ## Architecture
//!
//! ```text
//! Adapter (descriptor) → Fetcher → Extractor → Resolver → Emitter
//!                          └────── Orchestrator fan-out ──────┘
//! ```
//!
//! Each supported site is a declarative [`sites::SiteSpec`] (sections,
//! selectors, resolution rules) driven by one generic implementation.
//! Resolving a play page fans out over every discovered source
//! candidate concurrently; failed candidates are dropped silently and
//! the survivors are emitted as [`domain::StreamDescriptor`]s through
//! caller-supplied callbacks.
//!
//! ## Quick start
//!
//! ```bash
//! # What's on a site's front page
//! tributary browse dramaid "Drama Terbaru"
//!
//! # Find a show
//! tributary search gomov "one piece"
//!
//! # Episodes for a show page
//! tributary show gomov https://gomov.top/tv/one-piece/
//!
//! # Playable links for an episode page
//! tributary links gomov https://gomov.top/one-piece-episode-1/
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together config, fetcher,
/// extractor registry, site registry and orchestrator; it is the
/// embedding surface for a host application.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration: fetch defaults, fan-out width, per-site base-URL
/// overrides (the sites rotate domains constantly).
pub mod config;

/// Core domain models.
///
/// - [`ContentRef`](domain::ContentRef) / [`EpisodeRef`](domain::EpisodeRef): page locators
/// - [`SourceCandidate`](domain::SourceCandidate): one discovered source reference
/// - [`StreamDescriptor`](domain::StreamDescriptor) / [`SubtitleDescriptor`](domain::SubtitleDescriptor): terminal outputs
/// - [`Quality`](domain::Quality): longest-match label inference
pub mod domain;

/// Field extraction over fetched bodies: CSS selectors, regex captures,
/// base64 blobs, URL fixup.
pub mod extract;

/// HTTP fetching behind the [`Fetcher`](fetcher::Fetcher) trait:
/// referer/ajax headers and per-call timeouts, with post-redirect URL
/// reporting.
pub mod fetcher;

/// Known video-host extractor registry, the fallback for resolved
/// references that point at recognized third-party hosts.
pub mod hosts;

/// The resolution pipeline: orchestrator fan-out over candidates and
/// the emit sink.
pub mod pipeline;

/// Redirect resolution: the `Raw → Decoded → Followed → Terminal`
/// state machine over one candidate, with bounded hop depth.
pub mod resolve;

/// Site adapters and their declarative descriptors.
pub mod sites;
