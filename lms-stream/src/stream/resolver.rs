//! Content source resolver for previously uploaded module files
//!
//! Upload references arrive either as absolute URLs
//! (`http://host/uploads/notes%20v2.html`) or as paths (`/uploads/notes.txt`).
//! The file is looked up by basename in the uploads directory first and then,
//! for uploads stored before the uploads directory existed, relative to the
//! legacy root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::source::{is_http_url, ResolvedContent};
use super::StreamResult;

#[derive(Debug, Clone)]
pub struct ContentResolver {
    uploads_dir: PathBuf,
    legacy_root: PathBuf,
}

impl ContentResolver {
    pub fn new(uploads_dir: PathBuf, legacy_root: PathBuf) -> Self {
        Self {
            uploads_dir,
            legacy_root,
        }
    }

    /// Read the content a reference points at
    ///
    /// Returns `Ok(None)` when no candidate file exists.
    pub async fn resolve(&self, reference: &str) -> StreamResult<Option<ResolvedContent>> {
        let path = reference_path(reference);
        let is_html = is_html_path(reference) || is_html_path(&path);

        for candidate in self.candidates(&path) {
            match tokio::fs::read(&candidate).await {
                Ok(bytes) => {
                    debug!("Resolved {} to {}", reference, candidate.display());
                    return Ok(Some(ResolvedContent {
                        text: String::from_utf8_lossy(&bytes).into_owned(),
                        is_html,
                    }));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        debug!("No uploaded file found for {}", reference);
        Ok(None)
    }

    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(file_name) = Path::new(path).file_name() {
            candidates.push(self.uploads_dir.join(file_name));
        }

        // Legacy layout: path relative to the legacy root, never escaping it
        let relative = Path::new(path.trim_start_matches('/'));
        let stays_inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if stays_inside && relative.components().next().is_some() {
            candidates.push(self.legacy_root.join(relative));
        }

        candidates
    }
}

/// Path portion of a reference, percent-decoded
fn reference_path(reference: &str) -> String {
    let reference = reference.trim();
    let path = if is_http_url(reference) {
        let after_scheme = reference.split_once("://").map_or(reference, |(_, rest)| rest);
        after_scheme.find('/').map_or("", |idx| &after_scheme[idx..])
    } else {
        reference
    };

    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    percent_decode(path)
}

fn is_html_path(path: &str) -> bool {
    let lower = path.trim().to_ascii_lowercase();
    let lower = lower.split(['?', '#']).next().unwrap_or_default();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
