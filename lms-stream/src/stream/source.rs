//! Source classification and text extraction
//!
//! Module content arrives either as inline text or as a reference to an
//! uploaded file / external URL. Classification happens once per ingestion
//! and yields a [`SourceText`] variant; each variant has its own extraction
//! rule, after which chunking no longer cares where the text came from.

use regex::Regex;
use std::sync::OnceLock;

/// Stand-in text for content that cannot be streamed word by word
pub const FALLBACK_TEXT: &str = "This module contains a visual presentation or external document. Please refer to the content area below.";

/// Classified module content, decided once at ingestion time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceText {
    /// Plain text, used verbatim
    PlainText(String),
    /// HTML without embedded frames; markup is stripped
    HtmlToStrip(String),
    /// External presentation or framed HTML; replaced by [`FALLBACK_TEXT`]
    ExternalFallback,
}

impl SourceText {
    /// Extract the text that will be split into chunks
    pub fn extract(&self) -> String {
        match self {
            SourceText::PlainText(text) => text.clone(),
            SourceText::HtmlToStrip(html) => strip_html(html),
            SourceText::ExternalFallback => FALLBACK_TEXT.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SourceText::ExternalFallback)
    }
}

/// Raw content obtained from the content source resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub text: String,
    pub is_html: bool,
}

/// Host patterns identifying external presentation providers
///
/// A pattern matches its exact host and every subdomain of it, so
/// `gamma.app` matches `gamma.app` and `www.gamma.app` but not `notgamma.app`.
#[derive(Debug, Clone)]
pub struct PresentationHosts {
    patterns: Vec<String>,
}

impl PresentationHosts {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Does `reference` point at a known presentation provider?
    pub fn matches(&self, reference: &str) -> bool {
        let Some(host) = url_host(reference) else {
            return false;
        };

        self.patterns.iter().any(|pattern| {
            host == *pattern
                || host
                    .strip_suffix(pattern.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl Default for PresentationHosts {
    fn default() -> Self {
        Self::new(["gamma.app"])
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*https?://(?:[^@/?#]*@)?([^/:?#]+)").expect("valid url regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A trailing unterminated tag is stripped too
    RE.get_or_init(|| Regex::new(r"<[^>]*>?").expect("valid tag regex"))
}

fn frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<\s*(iframe|embed|object)\b").expect("valid frame regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Lowercased host of an `http(s)` URL
pub fn url_host(reference: &str) -> Option<String> {
    url_regex()
        .captures(reference)
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str().to_ascii_lowercase())
}

/// Is `reference` an absolute `http(s)` URL?
pub fn is_http_url(reference: &str) -> bool {
    url_host(reference).is_some()
}

/// Does the HTML embed a frame or object?
pub fn has_embedded_frame(html: &str) -> bool {
    frame_regex().is_match(html)
}

/// Replace every tag with a space, collapse whitespace runs and trim
pub fn strip_html(html: &str) -> String {
    let without_tags = tag_regex().replace_all(html, " ");
    whitespace_regex()
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Classify inline text supplied directly by a caller
///
/// Inline text that is itself an absolute URL (the bulk-import case, where
/// the source column holds a link) cannot be streamed and falls back.
pub fn classify_inline(text: &str) -> SourceText {
    if is_http_url(text.trim()) {
        SourceText::ExternalFallback
    } else {
        SourceText::PlainText(text.to_string())
    }
}

/// Classify a content reference and whatever the resolver found for it
///
/// `resolved` is `None` when the reference could not be read; that yields
/// empty plain text, which ingestion rejects as empty content.
pub fn classify_reference(
    reference: &str,
    resolved: Option<ResolvedContent>,
    hosts: &PresentationHosts,
) -> SourceText {
    if hosts.matches(reference) {
        return SourceText::ExternalFallback;
    }

    match resolved {
        Some(content) if content.is_html && has_embedded_frame(&content.text) => {
            SourceText::ExternalFallback
        }
        Some(content) if content.is_html => SourceText::HtmlToStrip(content.text),
        Some(content) => SourceText::PlainText(content.text),
        None => SourceText::PlainText(String::new()),
    }
}
