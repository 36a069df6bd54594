use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::block_editor::{BlockAttributes, BlockView};
use crate::utils::embedder::PdfEmbedder;

pub static PDF_BLOCK_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "pdf-block".to_string(),
    description: "Render the saved markup of a PDF block from its attributes. The same markup is used for the editor preview".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "id": {
                "type": "integer",
                "description": "Media library attachment ID, absent for external PDFs"
            },
            "title": {
                "type": "string",
                "description": "Caption link text (default: derived from the file name)"
            },
            "description": {
                "type": "string",
                "description": "Long description used for the title attribute",
                "default": ""
            },
            "url": {
                "type": "string",
                "description": "URL of the PDF"
            },
            "width": {
                "type": "string",
                "description": "Viewer width in pixels, at least 20",
                "default": "600"
            },
            "height": {
                "type": "string",
                "description": "Viewer height in pixels, at least 1",
                "default": "600"
            },
            "align": {
                "type": "string",
                "enum": ["left", "center", "right"],
                "default": "center"
            }
        }
    }),
    annotations: Some(ToolAnnotations {
        title: Some("PDF Block".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(false),
    }),
});

pub struct PdfBlockTool {
    embedder: Arc<PdfEmbedder>,
}

impl PdfBlockTool {
    pub fn new(embedder: Arc<PdfEmbedder>) -> Self {
        Self { embedder }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let attributes =
            match serde_json::from_value::<BlockAttributes>(arguments.unwrap_or_else(|| json!({}))) {
                Ok(attributes) => attributes,
                Err(e) => {
                    error!("Invalid pdf-block attributes: {}", e);
                    return CallToolResult::error(format!("Invalid parameters: {}", e));
                }
            };

        let block = self.embedder.block(attributes);
        info!(
            "Rendering PDF block (external: {}, align: {})",
            block.is_external(),
            block.attributes().align.as_str()
        );

        match block.render() {
            Ok(BlockView::Embed(html)) => CallToolResult::success(html),
            Ok(BlockView::Placeholder {
                accept,
                instructions,
            }) => CallToolResult::success(format!(
                "No PDF selected. {} (accepts {})",
                instructions, accept
            )),
            Err(e) => {
                error!("Failed to render PDF block: {}", e);
                CallToolResult::error(format!("Invalid block attributes: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::embed_html::EmbedBuilder;
    use crate::utils::media_library::MediaLibrary;

    fn tool() -> PdfBlockTool {
        PdfBlockTool::new(Arc::new(PdfEmbedder::with_library(
            MediaLibrary::default(),
            EmbedBuilder::default(),
        )))
    }

    #[tokio::test]
    async fn renders_block_markup() {
        let result = tool()
            .execute(Some(json!({
                "url": "https://example.com/menu.pdf",
                "width": 400,
                "height": "300",
                "align": "right",
                "description": "Weekly menu"
            })))
            .await;

        assert!(result.is_error.is_none());
        let html = &result.content[0].text;
        assert!(html.contains("alignright"));
        assert!(html.contains("height=300 width=400"));
        assert!(html.contains("title=\"Weekly menu\""));
    }

    #[tokio::test]
    async fn missing_url_reports_placeholder() {
        let result = tool().execute(None).await;
        assert!(result.is_error.is_none());
        assert!(result.content[0].text.starts_with("No PDF selected."));
    }

    #[tokio::test]
    async fn invalid_alignment_is_rejected() {
        let result = tool()
            .execute(Some(json!({ "url": "https://example.com/a.pdf", "align": "justify" })))
            .await;
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn too_narrow_block_is_rejected() {
        let result = tool()
            .execute(Some(json!({ "url": "https://example.com/a.pdf", "width": "5" })))
            .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains("width"));
    }
}
