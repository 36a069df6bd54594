use serde::Deserialize;

use super::media_library::MediaReference;

pub const DEFAULT_HEIGHT: f64 = 500.0;
pub const DEFAULT_WIDTH: f64 = 800.0;

/// Caller-supplied attributes. Any field left out falls back to the default
/// derived from the media item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttributeOverrides {
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Complete attribute set for one embed. After normalization `title` and
/// `description` are never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedAttributes {
    pub height: f64,
    pub width: f64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Attributes(EmbedAttributes),
    /// Media is not a PDF; the overrides are returned untouched.
    PassThrough(AttributeOverrides),
}

/// Merges `overrides` over the defaults for `media`.
///
/// An explicit height is halved before the merge. Callers historically pass
/// the full height of a two-column layout, so `height: 750` renders at 375 and
/// `height: 301` at 150.5.
pub fn normalize(media: &MediaReference, overrides: AttributeOverrides) -> Normalized {
    if !media.is_pdf() {
        return Normalized::PassThrough(overrides);
    }

    let merged = EmbedAttributes {
        height: overrides.height.map(|h| h / 2.0).unwrap_or(DEFAULT_HEIGHT),
        width: overrides.width.unwrap_or(DEFAULT_WIDTH),
        title: overrides.title.unwrap_or_else(|| media.title.clone()),
        description: overrides
            .description
            .unwrap_or_else(|| media.text_body.clone()),
    };

    Normalized::Attributes(finalize(media, merged))
}

/// Fills in title and description.
///
/// The title is always passed through [`title_case`], including titles the
/// caller supplied. An empty title is derived from the media name instead.
pub fn finalize(media: &MediaReference, mut attrs: EmbedAttributes) -> EmbedAttributes {
    attrs.title = if attrs.title.is_empty() {
        title_case(&media.name)
    } else {
        title_case(&attrs.title)
    };

    if attrs.description.is_empty() {
        attrs.description = attrs.title.clone();
    }

    attrs
}

/// Replaces `-` and `_` with spaces and upper-cases the first letter of every
/// word. Only ASCII letters are upper-cased and the rest of each word keeps
/// its case.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut word_start = true;

    for ch in raw.chars() {
        let ch = if ch == '-' || ch == '_' { ' ' } else { ch };
        if word_start {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        word_start = is_word_delimiter(ch);
    }

    out
}

fn is_word_delimiter(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c')
}
