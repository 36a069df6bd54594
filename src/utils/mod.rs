pub mod attributes;
pub mod block_editor;
pub mod embed_html;
pub mod embedder;
pub mod media_library;
pub mod url_matcher;
