use serde::{Deserialize, Serialize};

/// How a raw reference found on a play page gets resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    /// URL of an embed/provider page; followed (or handed off) as-is.
    IframeEmbed,
    /// Base64-encoded HTML blob wrapping the real embed reference.
    EncodedBlob,
    /// Token posted to the site's ajax player endpoint.
    AjaxToken,
    /// Token substituted into a sub-provider API URL.
    DirectApi,
}

/// An intermediate resolution unit discovered on one play page.
/// Created and consumed within a single pipeline run, never persisted.
#[derive(Debug, Clone)]
pub struct SourceCandidate {
    pub raw: String,
    pub kind: CandidateKind,
    /// Server/mirror label hint shown next to the reference, if any.
    pub server: Option<String>,
}

impl SourceCandidate {
    pub fn new(raw: impl Into<String>, kind: CandidateKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
            server: None,
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Label used on the emitted stream when the site gave no server name.
    pub fn label(&self) -> &str {
        self.server.as_deref().unwrap_or("mirror")
    }
}
