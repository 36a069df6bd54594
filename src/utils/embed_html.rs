use tracing::debug;

use super::attributes::{normalize, AttributeOverrides, EmbedAttributes, Normalized};
use super::block_editor::Align;
use super::media_library::MediaReference;

pub const DEFAULT_CSS_CLASS: &str = "pdf-embedder";
pub const GOOGLE_VIEWER_URL: &str = "https://docs.google.com/viewer?url=";
pub const BLOCK_WRAPPER_CLASS: &str = "wp-block-pdf-embedder-pdf__content-wrapper";

/// Result of rendering: markup for PDF media, or the caller's input handed
/// back untouched when the media is something else.
#[derive(Debug, Clone, PartialEq)]
pub enum Embed<T> {
    Html(String),
    PassThrough(T),
}

impl<T> Embed<T> {
    pub fn html(self) -> Option<String> {
        match self {
            Embed::Html(html) => Some(html),
            Embed::PassThrough(_) => None,
        }
    }
}

/// Builds the object viewer, the Google Docs iframe fallback and the caption
/// link for one PDF.
#[derive(Debug, Clone)]
pub struct EmbedBuilder {
    css_class: String,
}

impl Default for EmbedBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CSS_CLASS)
    }
}

impl EmbedBuilder {
    pub fn new(css_class: impl Into<String>) -> Self {
        Self {
            css_class: css_class.into(),
        }
    }

    /// Normalizes `overrides` against `media` and builds the fragment.
    pub fn render(
        &self,
        media: &MediaReference,
        overrides: AttributeOverrides,
    ) -> Embed<AttributeOverrides> {
        match normalize(media, overrides) {
            Normalized::Attributes(attrs) => Embed::Html(self.fragment(media, &attrs)),
            Normalized::PassThrough(overrides) => Embed::PassThrough(overrides),
        }
    }

    /// The fragment is not wrapped; see [`wrap_figure`].
    pub fn build(&self, media: &MediaReference, attrs: EmbedAttributes) -> Embed<EmbedAttributes> {
        if !media.is_pdf() {
            debug!(
                "Skipping embed for {} with mime type {}",
                media.guid, media.mime_type
            );
            return Embed::PassThrough(attrs);
        }

        Embed::Html(self.fragment(media, &attrs))
    }

    fn fragment(&self, media: &MediaReference, attrs: &EmbedAttributes) -> String {
        let class = escape_html(&self.css_class);
        let guid = escape_html(&media.guid);
        let title = escape_html(&attrs.title);
        let description = escape_html(&attrs.description);

        let object = format!(
            "<object class=\"{class}\" data=\"{guid}#scrollbar=1&toolbar=1\" type=\"application/pdf\" height={height} width={width} title=\"{description}\"> </object>",
            class = class,
            guid = guid,
            height = attrs.height,
            width = attrs.width,
            description = description,
        );

        let iframe = format!(
            "<iframe class=\"{class}\" src=\"{src}\" frameborder=\"0\" style=\"height:{height}px;width:{width}px;\" title=\"{description}\"></iframe>\n",
            class = class,
            src = google_viewer_src(&media.guid),
            height = attrs.height,
            width = attrs.width,
            description = description,
        );

        let caption = format!(
            "<p><a href=\"{guid}\" title=\"{description}\">{title}</a></p>",
            guid = guid,
            description = description,
            title = title,
        );

        let mut html = String::with_capacity(object.len() + iframe.len() + caption.len());
        html.push_str(&object);
        html.push_str(&iframe);
        html.push_str(&caption);
        html
    }
}

/// Google Docs viewer URL with the document URL percent-encoded per RFC 3986.
pub fn google_viewer_src(guid: &str) -> String {
    format!(
        "{}{}&embedded=true",
        GOOGLE_VIEWER_URL,
        urlencoding::encode(guid)
    )
}

/// The single place an embed fragment gets its `<figure>`. Text embeds pass
/// `None`; blocks pass their alignment.
pub fn wrap_figure(fragment: &str, align: Option<Align>) -> String {
    match align {
        Some(align) => format!(
            "<figure class=\"{} align{}\">{}</figure>",
            BLOCK_WRAPPER_CLASS,
            align.as_str(),
            fragment
        ),
        None => format!("<figure>{}</figure>", fragment),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
