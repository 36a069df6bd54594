//! # mcp-pdf-embedder
//!
//! Embeds PDF files into post content. A PDF URL standing alone on a line is
//! resolved against the media library (or treated as an external file) and
//! replaced by a `<figure>` holding:
//!
//! 1. an `<object>` viewer pointing at the file,
//! 2. a Google Docs viewer `<iframe>` fallback,
//! 3. a caption paragraph linking to the file.
//!
//! The PDF block of the editor renders through the same builder, so the
//! preview and the saved markup are identical.
//!
//! ```
//! use mcp_pdf_embedder::utils::attributes::AttributeOverrides;
//! use mcp_pdf_embedder::utils::embed_html::EmbedBuilder;
//! use mcp_pdf_embedder::utils::embedder::PdfEmbedder;
//! use mcp_pdf_embedder::utils::media_library::MediaLibrary;
//!
//! let embedder = PdfEmbedder::with_library(MediaLibrary::default(), EmbedBuilder::default());
//! let outcome = embedder.embed_text(
//!     "https://cdn.example.org/annual-report.pdf",
//!     &AttributeOverrides::default(),
//! );
//! assert_eq!(outcome.embedded, 1);
//! assert!(outcome.html.contains(">Annual Report</a>"));
//! ```
//!
//! The binary serves these operations as MCP tools over stdio.

pub mod mcp;
pub mod tools;
pub mod utils;
