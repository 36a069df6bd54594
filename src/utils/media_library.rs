use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const PDF_MIME_TYPE: &str = "application/pdf";

pub type AttachmentId = u64;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Failed to read media library: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid media library JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate attachment id {0}")]
    DuplicateId(AttachmentId),
}

/// Resolved description of a media file, either from the library or
/// synthesized for a URL outside of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub guid: String,
    pub mime_type: String,
    pub title: String,
    pub text_body: String,
    pub name: String,
}

impl MediaReference {
    /// Reference for a PDF that lives outside of the media library.
    /// The name is the file name with a trailing `.pdf` removed.
    pub fn external(url: &str) -> Self {
        let basename = url.rsplit('/').next().unwrap_or(url);
        let name = basename.strip_suffix(".pdf").unwrap_or(basename);

        Self {
            guid: url.to_string(),
            mime_type: PDF_MIME_TYPE.to_string(),
            title: String::new(),
            text_body: String::new(),
            name: name.to_string(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }
}

/// Exact-match query from a canonical URL to a stored attachment.
pub trait AttachmentLookup: Send + Sync {
    fn lookup_by_url(&self, url: &str) -> Result<Option<AttachmentId>, LibraryError>;
}

pub trait MediaMetadataProvider: Send + Sync {
    fn media(&self, id: AttachmentId) -> Result<Option<MediaReference>, LibraryError>;
}

/// One stored attachment as it appears in the library file.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    pub id: AttachmentId,
    pub guid: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub name: String,
}

impl From<&MediaItem> for MediaReference {
    fn from(item: &MediaItem) -> Self {
        Self {
            guid: item.guid.clone(),
            mime_type: item.mime_type.clone(),
            title: item.title.clone(),
            text_body: item.content.clone(),
            name: item.name.clone(),
        }
    }
}

/// Read-only media library held in memory. Loaded once at startup and shared
/// between requests.
#[derive(Debug, Default)]
pub struct MediaLibrary {
    items: HashMap<AttachmentId, MediaItem>,
    by_guid: HashMap<String, AttachmentId>,
}

impl MediaLibrary {
    pub fn new(items: Vec<MediaItem>) -> Result<Self, LibraryError> {
        let mut library = Self::default();

        for item in items {
            if library.items.contains_key(&item.id) {
                return Err(LibraryError::DuplicateId(item.id));
            }
            // First item wins for a repeated guid, like the first row of a
            // `SELECT ID ... WHERE guid = ?`
            library.by_guid.entry(item.guid.clone()).or_insert(item.id);
            library.items.insert(item.id, item);
        }

        Ok(library)
    }

    pub fn from_json(json: &str) -> Result<Self, LibraryError> {
        let items: Vec<MediaItem> = serde_json::from_str(json)?;
        Self::new(items)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let library = Self::from_json(&json)?;
        info!(
            "Loaded {} media items from {}",
            library.len(),
            path.display()
        );
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl AttachmentLookup for MediaLibrary {
    fn lookup_by_url(&self, url: &str) -> Result<Option<AttachmentId>, LibraryError> {
        let id = self.by_guid.get(url).copied();
        debug!("Attachment lookup for {}: {:?}", url, id);
        Ok(id)
    }
}

impl MediaMetadataProvider for MediaLibrary {
    fn media(&self, id: AttachmentId) -> Result<Option<MediaReference>, LibraryError> {
        Ok(self.items.get(&id).map(MediaReference::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY_JSON: &str = r#"[
        {"id": 7, "guid": "https://blog.example.com/uploads/handbook.pdf", "mimeType": "application/pdf",
         "title": "Employee handbook", "content": "Policies for 2024", "name": "handbook"},
        {"id": 8, "guid": "https://blog.example.com/uploads/logo.png", "mimeType": "image/png"}
    ]"#;

    #[test]
    fn external_reference_strips_pdf_extension() {
        let media = MediaReference::external("https://cdn.example.org/papers/paper.pdf");
        assert_eq!(media.guid, "https://cdn.example.org/papers/paper.pdf");
        assert_eq!(media.mime_type, PDF_MIME_TYPE);
        assert_eq!(media.name, "paper");
        assert!(media.title.is_empty());
        assert!(media.text_body.is_empty());
    }

    #[test]
    fn external_reference_keeps_uppercase_extension() {
        let media = MediaReference::external("http://example.org/SCAN.PDF");
        assert_eq!(media.name, "SCAN.PDF");
    }

    #[test]
    fn lookup_finds_item_by_exact_guid() {
        let library = MediaLibrary::from_json(LIBRARY_JSON).expect("library should load");
        assert_eq!(library.len(), 2);

        let id = library
            .lookup_by_url("https://blog.example.com/uploads/handbook.pdf")
            .unwrap();
        assert_eq!(id, Some(7));

        let media = library.media(7).unwrap().expect("item 7 should exist");
        assert_eq!(media.title, "Employee handbook");
        assert_eq!(media.text_body, "Policies for 2024");
        assert!(media.is_pdf());
    }

    #[test]
    fn lookup_misses_on_different_url() {
        let library = MediaLibrary::from_json(LIBRARY_JSON).unwrap();
        let id = library
            .lookup_by_url("https://blog.example.com/uploads/HANDBOOK.pdf")
            .unwrap();
        assert_eq!(id, None);
        assert!(library.media(99).unwrap().is_none());
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let library = MediaLibrary::from_json(LIBRARY_JSON).unwrap();
        let media = library.media(8).unwrap().unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert!(media.title.is_empty());
        assert!(media.name.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[
            {"id": 1, "guid": "https://a.example/a.pdf", "mimeType": "application/pdf"},
            {"id": 1, "guid": "https://a.example/b.pdf", "mimeType": "application/pdf"}
        ]"#;
        match MediaLibrary::from_json(json) {
            Err(LibraryError::DuplicateId(1)) => {}
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            MediaLibrary::from_json("{not json"),
            Err(LibraryError::Parse(_))
        ));
    }
}
