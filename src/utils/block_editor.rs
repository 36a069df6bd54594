use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use super::attributes::{finalize, EmbedAttributes};
use super::embed_html::{wrap_figure, Embed, EmbedBuilder};
use super::media_library::{AttachmentId, MediaReference, PDF_MIME_TYPE};

pub const MIN_WIDTH: f64 = 20.0;
pub const MIN_HEIGHT: f64 = 1.0;
pub const PLACEHOLDER_INSTRUCTIONS: &str =
    "Drag a PDF, upload a new one or select a PDF from your library.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("{field} must be a number, got {value:?}")]
    InvalidDimension { field: &'static str, value: String },

    #[error("{field} must be at least {min}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
    },

    #[error("Invalid PDF URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{field} is too large to resize")]
    Overflow { field: &'static str },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// Attributes stored with a PDF block. Width and height are strings, as the
/// editor stores them, and accept plain numbers on input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockAttributes {
    #[serde(default)]
    pub id: Option<AttachmentId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_dimension", deserialize_with = "string_or_number")]
    pub width: String,
    #[serde(default = "default_dimension", deserialize_with = "string_or_number")]
    pub height: String,
    #[serde(default)]
    pub align: Align,
}

impl Default for BlockAttributes {
    fn default() -> Self {
        Self {
            id: None,
            title: None,
            description: String::new(),
            url: None,
            width: default_dimension(),
            height: default_dimension(),
            align: Align::default(),
        }
    }
}

fn default_dimension() -> String {
    "600".to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Dimension {
        Text(String),
        Number(f64),
    }

    Ok(match Dimension::deserialize(deserializer)? {
        Dimension::Text(text) => text,
        Dimension::Number(number) => number.to_string(),
    })
}

impl BlockAttributes {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    /// A URL that was typed in rather than picked from the library.
    pub fn is_external(&self) -> bool {
        match self.url() {
            Some(url) => self.id.is_none() && !url.starts_with("blob:"),
            None => false,
        }
    }
}

/// What the block shows: the upload prompt, or the rendered embed.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockView {
    Placeholder {
        accept: &'static str,
        instructions: &'static str,
    },
    Embed(String),
}

impl BlockView {
    fn placeholder() -> Self {
        BlockView::Placeholder {
            accept: PDF_MIME_TYPE,
            instructions: PLACEHOLDER_INSTRUCTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeUpdate {
    Description(String),
    Width(String),
    Height(String),
    Align(Align),
    Url(String),
}

/// A media item picked in the library dialog.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaSelection {
    pub id: Option<AttachmentId>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeHandles {
    pub left: bool,
    pub right: bool,
}

pub type BlockObserver = Box<dyn Fn(&Result<BlockView, BlockError>) + Send + Sync>;

/// View model behind the PDF block. Every attribute change produces a new
/// attribute value and re-renders for each subscribed observer.
pub struct PdfBlock {
    attributes: BlockAttributes,
    builder: EmbedBuilder,
    is_editing: bool,
    has_error: bool,
    observers: Vec<BlockObserver>,
}

impl PdfBlock {
    pub fn new(attributes: BlockAttributes, builder: EmbedBuilder) -> Self {
        Self {
            attributes,
            builder,
            is_editing: false,
            has_error: false,
            observers: Vec::new(),
        }
    }

    pub fn attributes(&self) -> &BlockAttributes {
        &self.attributes
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    pub fn subscribe(&mut self, observer: BlockObserver) {
        self.observers.push(observer);
    }

    pub fn set_attribute(&mut self, update: AttributeUpdate) {
        let mut next = self.attributes.clone();
        match update {
            AttributeUpdate::Description(description) => next.description = description,
            AttributeUpdate::Width(width) => next.width = width,
            AttributeUpdate::Height(height) => next.height = height,
            AttributeUpdate::Align(align) => next.align = align,
            AttributeUpdate::Url(url) => next.url = Some(url),
        }
        self.replace(next);
    }

    /// Selections without a URL are ignored.
    pub fn select_media(&mut self, selection: MediaSelection) {
        let url = match selection.url {
            Some(url) if !url.is_empty() => url,
            _ => return,
        };

        self.has_error = false;
        let next = BlockAttributes {
            url: Some(url),
            id: selection.id,
            title: selection.title,
            description: selection.description.unwrap_or_default(),
            ..self.attributes.clone()
        };
        self.replace(next);
    }

    pub fn toggle_editing(&mut self) {
        self.is_editing = !self.is_editing;
        self.notify();
    }

    pub fn set_error(&mut self) {
        self.has_error = true;
        self.notify();
    }

    pub fn is_external(&self) -> bool {
        self.attributes.is_external()
    }

    /// Centered blocks resize from both sides; otherwise only the side away
    /// from the alignment edge is enabled.
    pub fn resize_handles(&self, is_rtl: bool) -> ResizeHandles {
        match (self.attributes.align, is_rtl) {
            (Align::Center, _) => ResizeHandles {
                left: true,
                right: true,
            },
            (Align::Left, true) => ResizeHandles {
                left: false,
                right: true,
            },
            (_, true) => ResizeHandles {
                left: true,
                right: false,
            },
            (Align::Right, false) => ResizeHandles {
                left: true,
                right: false,
            },
            (_, false) => ResizeHandles {
                left: false,
                right: true,
            },
        }
    }

    pub fn resize(&mut self, delta_width: i64, delta_height: i64) -> Result<(), BlockError> {
        let width = parse_int_prefix(&self.attributes.width).ok_or_else(|| {
            BlockError::InvalidDimension {
                field: "width",
                value: self.attributes.width.clone(),
            }
        })?;
        let height = parse_int_prefix(&self.attributes.height).ok_or_else(|| {
            BlockError::InvalidDimension {
                field: "height",
                value: self.attributes.height.clone(),
            }
        })?;

        let width = width
            .checked_add(delta_width)
            .ok_or(BlockError::Overflow { field: "width" })?;
        let height = height
            .checked_add(delta_height)
            .ok_or(BlockError::Overflow { field: "height" })?;

        let next = BlockAttributes {
            width: width.to_string(),
            height: height.to_string(),
            ..self.attributes.clone()
        };
        self.replace(next);
        Ok(())
    }

    pub fn render(&self) -> Result<BlockView, BlockError> {
        if self.is_editing || self.has_error {
            return Ok(BlockView::placeholder());
        }
        render_block(&self.builder, &self.attributes)
    }

    /// Saved markup. Identical to the preview for the same attributes.
    pub fn save(&self) -> Result<Option<String>, BlockError> {
        saved_markup(&self.builder, &self.attributes)
    }

    fn replace(&mut self, next: BlockAttributes) {
        debug!("Block attributes changed: {:?}", next);
        self.attributes = next;
        self.notify();
    }

    fn notify(&self) {
        if self.observers.is_empty() {
            return;
        }
        let view = self.render();
        for observer in &self.observers {
            observer(&view);
        }
    }
}

/// Preview view. The embed markup is the same string `PdfBlock::save` returns.
pub fn render_block(
    builder: &EmbedBuilder,
    attributes: &BlockAttributes,
) -> Result<BlockView, BlockError> {
    Ok(match saved_markup(builder, attributes)? {
        Some(html) => BlockView::Embed(html),
        None => BlockView::placeholder(),
    })
}

fn saved_markup(
    builder: &EmbedBuilder,
    attributes: &BlockAttributes,
) -> Result<Option<String>, BlockError> {
    let url = match attributes.url() {
        Some(url) => url,
        None => return Ok(None),
    };

    if !url.starts_with("blob:") {
        url::Url::parse(url).map_err(|e| BlockError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    }

    let width = parse_dimension("width", &attributes.width, MIN_WIDTH)?;
    let height = parse_dimension("height", &attributes.height, MIN_HEIGHT)?;

    let media = MediaReference {
        title: attributes.title.clone().unwrap_or_default(),
        text_body: attributes.description.clone(),
        ..MediaReference::external(url)
    };
    let attrs = finalize(
        &media,
        EmbedAttributes {
            height,
            width,
            title: media.title.clone(),
            description: media.text_body.clone(),
        },
    );

    Ok(match builder.build(&media, attrs) {
        Embed::Html(fragment) => Some(wrap_figure(&fragment, Some(attributes.align))),
        Embed::PassThrough(_) => None,
    })
}

fn parse_dimension(field: &'static str, raw: &str, min: f64) -> Result<f64, BlockError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| BlockError::InvalidDimension {
            field,
            value: raw.to_string(),
        })?;

    if value < min {
        return Err(BlockError::OutOfRange { field, value, min });
    }
    Ok(value)
}

/// Leading integer of `raw`, ignoring leading whitespace and any trailing
/// garbage (`"640px"` is 640).
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
