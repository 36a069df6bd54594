use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

use super::media_library::{AttachmentLookup, MediaMetadataProvider, MediaReference};

fn pdf_url_regex() -> &'static Regex {
    static PDF_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^https?://.+\.pdf$").expect("Failed to create pdf_url_regex")
    });
    &PDF_URL_REGEX
}

pub fn is_pdf_url(candidate: &str) -> bool {
    pdf_url_regex().is_match(candidate)
}

/// A trimmed line that is a single PDF URL. Lines with inner whitespace are
/// prose, never a URL.
pub fn is_standalone_pdf_url(line: &str) -> bool {
    !line.contains(char::is_whitespace) && is_pdf_url(line)
}

/// Lines of `text` that consist of nothing but a PDF URL. Surrounding
/// whitespace is trimmed from the returned candidates.
pub fn find_candidates(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_standalone_pdf_url(line))
        .collect()
}

/// Resolves bare PDF URLs to library media, or to an external reference when
/// the library does not know the URL.
#[derive(Clone)]
pub struct UrlEmbedMatcher {
    lookup: Arc<dyn AttachmentLookup>,
    metadata: Arc<dyn MediaMetadataProvider>,
}

impl UrlEmbedMatcher {
    pub fn new(lookup: Arc<dyn AttachmentLookup>, metadata: Arc<dyn MediaMetadataProvider>) -> Self {
        Self { lookup, metadata }
    }

    pub fn match_url(&self, candidate: &str) -> Option<MediaReference> {
        let candidate = candidate.trim();
        if !is_pdf_url(candidate) {
            return None;
        }
        Some(self.resolve(candidate))
    }

    /// Lookup failures count as misses.
    pub fn resolve(&self, url: &str) -> MediaReference {
        let id = match self.lookup.lookup_by_url(url) {
            Ok(id) => id,
            Err(e) => {
                warn!("Attachment lookup failed for {}: {}", url, e);
                None
            }
        };

        let stored = id.and_then(|id| match self.metadata.media(id) {
            Ok(Some(media)) => Some(media),
            Ok(None) => {
                warn!("Attachment {} for {} has no metadata", id, url);
                None
            }
            Err(e) => {
                warn!("Failed to load metadata for attachment {}: {}", id, e);
                None
            }
        });

        match stored {
            Some(media) => {
                debug!("Resolved {} from the media library", url);
                media
            }
            None => {
                debug!("Treating {} as an external PDF", url);
                MediaReference::external(url)
            }
        }
    }
}
