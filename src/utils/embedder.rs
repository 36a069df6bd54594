use std::sync::Arc;
use tracing::{debug, info};

use super::attributes::AttributeOverrides;
use super::block_editor::{BlockAttributes, PdfBlock};
use super::embed_html::{wrap_figure, EmbedBuilder};
use super::media_library::{AttachmentId, AttachmentLookup, MediaLibrary, MediaMetadataProvider};
use super::url_matcher::{find_candidates, is_standalone_pdf_url, UrlEmbedMatcher};

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedOutcome {
    pub html: String,
    pub embedded: usize,
}

/// Embedding service shared by every tool. Built once at startup; holds no
/// per-request state.
#[derive(Clone)]
pub struct PdfEmbedder {
    matcher: UrlEmbedMatcher,
    metadata: Arc<dyn MediaMetadataProvider>,
    builder: EmbedBuilder,
}

impl PdfEmbedder {
    pub fn new(
        lookup: Arc<dyn AttachmentLookup>,
        metadata: Arc<dyn MediaMetadataProvider>,
        builder: EmbedBuilder,
    ) -> Self {
        Self {
            matcher: UrlEmbedMatcher::new(lookup, metadata.clone()),
            metadata,
            builder,
        }
    }

    pub fn with_library(library: MediaLibrary, builder: EmbedBuilder) -> Self {
        let library = Arc::new(library);
        Self::new(library.clone(), library, builder)
    }

    /// Figure-wrapped embed for a single URL, or `None` when the URL is not a
    /// PDF candidate or resolves to non-PDF media.
    pub fn embed_url(&self, url: &str, overrides: AttributeOverrides) -> Option<String> {
        let media = self.matcher.match_url(url)?;
        let fragment = self.builder.render(&media, overrides).html();
        if fragment.is_none() {
            debug!("{} resolved to {}, left as is", url, media.mime_type);
        }
        fragment.map(|fragment| wrap_figure(&fragment, None))
    }

    /// Replaces every line holding only a PDF URL with its embed.
    pub fn embed_text(&self, text: &str, overrides: &AttributeOverrides) -> EmbedOutcome {
        let candidates = find_candidates(text);
        if candidates.is_empty() {
            debug!("No standalone PDF URLs found");
            return EmbedOutcome {
                html: text.to_string(),
                embedded: 0,
            };
        }
        debug!("Found {} embed candidate(s)", candidates.len());

        let mut html = String::with_capacity(text.len());
        let mut embedded = 0;

        for line in text.split_inclusive('\n') {
            let (content, ending) = split_line_ending(line);
            let candidate = content.trim();

            let replacement = if is_standalone_pdf_url(candidate) {
                self.embed_url(candidate, overrides.clone())
            } else {
                None
            };

            match replacement {
                Some(embed) => {
                    embedded += 1;
                    html.push_str(&embed);
                }
                None => html.push_str(content),
            }
            html.push_str(ending);
        }

        info!("Embedded {} PDF(s)", embedded);
        EmbedOutcome { html, embedded }
    }

    pub fn block(&self, attributes: BlockAttributes) -> PdfBlock {
        PdfBlock::new(attributes, self.builder.clone())
    }

    /// Text inserted into the editor for a library attachment: PDFs become
    /// their bare URL followed by a blank line so the auto-embed picks them up.
    /// Anything else keeps the `html` the media dialog produced.
    pub fn media_insert(&self, id: AttachmentId, html: &str) -> String {
        match self.metadata.media(id) {
            Ok(Some(media)) if media.is_pdf() => format!("{}\n\n", media.guid),
            Ok(_) => html.to_string(),
            Err(e) => {
                debug!("Metadata lookup for attachment {} failed: {}", id, e);
                html.to_string()
            }
        }
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::block_editor::BlockView;

    const LIBRARY_JSON: &str = r#"[
        {"id": 5, "guid": "https://cdn.example.org/paper.pdf", "mimeType": "application/pdf",
         "title": "Stored paper", "content": "From the library", "name": "paper"},
        {"id": 6, "guid": "https://cdn.example.org/cover.png", "mimeType": "image/png",
         "title": "Cover", "name": "cover"},
        {"id": 9, "guid": "https://cdn.example.org/fake.pdf", "mimeType": "application/zip",
         "name": "fake"}
    ]"#;

    fn embedder(json: &str) -> PdfEmbedder {
        PdfEmbedder::with_library(
            MediaLibrary::from_json(json).unwrap(),
            EmbedBuilder::default(),
        )
    }

    #[test]
    fn external_url_on_its_own_line_is_embedded() {
        let outcome = embedder("[]").embed_text(
            "Please read:\nhttps://cdn.example.org/paper.pdf\nThanks.",
            &AttributeOverrides::default(),
        );

        assert_eq!(outcome.embedded, 1);
        assert!(outcome.html.starts_with("Please read:\n<figure><object"));
        assert!(outcome.html.ends_with("</a></p></figure>\nThanks."));
        assert!(outcome.html.contains(">Paper</a>"));
        assert!(outcome.html.contains("height=500 width=800"));
    }

    #[test]
    fn library_hit_uses_stored_metadata() {
        let html = embedder(LIBRARY_JSON)
            .embed_url("https://cdn.example.org/paper.pdf", AttributeOverrides::default())
            .unwrap();

        assert!(html.contains(">Stored Paper</a>"));
        assert!(html.contains("title=\"From the library\""));
        assert!(html.contains("height=500 width=800"));
    }

    #[test]
    fn caller_dimensions_are_applied_with_halved_height() {
        let overrides = AttributeOverrides {
            width: Some(600.0),
            height: Some(900.0),
            ..Default::default()
        };
        let html = embedder(LIBRARY_JSON)
            .embed_url("https://cdn.example.org/paper.pdf", overrides)
            .unwrap();
        assert!(html.contains("height=450 width=600"));
    }

    #[test]
    fn inline_urls_and_non_pdf_media_are_left_alone() {
        let text = "See https://cdn.example.org/paper.pdf inline.\r\nhttps://cdn.example.org/fake.pdf\r\n";
        let outcome = embedder(LIBRARY_JSON).embed_text(text, &AttributeOverrides::default());
        assert_eq!(outcome.embedded, 0);
        assert_eq!(outcome.html, text);
    }

    #[test]
    fn prose_starting_with_a_url_is_not_embedded() {
        let text = "https://example.com has moved, the new handbook is handbook.pdf";
        let outcome = embedder("[]").embed_text(text, &AttributeOverrides::default());
        assert_eq!(outcome.embedded, 0);
        assert_eq!(outcome.html, text);
    }

    #[test]
    fn crlf_line_endings_are_preserved() {
        let outcome = embedder("[]").embed_text(
            "a\r\n  https://x.example/doc.pdf  \r\nb",
            &AttributeOverrides::default(),
        );
        assert_eq!(outcome.embedded, 1);
        assert!(outcome.html.starts_with("a\r\n<figure>"));
        assert!(outcome.html.ends_with("</figure>\r\nb"));
    }

    #[test]
    fn media_insert_returns_guid_for_pdf() {
        let embedder = embedder(LIBRARY_JSON);
        assert_eq!(
            embedder.media_insert(5, "<a href=\"x\">paper</a>"),
            "https://cdn.example.org/paper.pdf\n\n"
        );
        assert_eq!(
            embedder.media_insert(6, "<img src=\"cover.png\">"),
            "<img src=\"cover.png\">"
        );
        assert_eq!(embedder.media_insert(404, "<a>gone</a>"), "<a>gone</a>");
    }

    #[test]
    fn block_uses_configured_class() {
        let embedder = PdfEmbedder::with_library(MediaLibrary::default(), EmbedBuilder::new("docs"));
        let block = embedder.block(BlockAttributes {
            url: Some("https://x.example/doc.pdf".to_string()),
            ..Default::default()
        });
        match block.render().unwrap() {
            BlockView::Embed(html) => assert!(html.contains("class=\"docs\"")),
            other => panic!("unexpected view {:?}", other),
        }
    }
}
