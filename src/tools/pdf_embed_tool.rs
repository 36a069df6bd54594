use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::attributes::AttributeOverrides;
use crate::utils::embedder::PdfEmbedder;

pub static PDF_EMBED_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "pdf-embed".to_string(),
    description: "Replace PDF URLs that stand alone on a line with an embedded PDF viewer (object tag, Google Docs fallback and caption link)".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "text": {
                "type": "string",
                "description": "Post content containing PDF URLs on their own lines"
            },
            "width": {
                "type": "number",
                "description": "Viewer width in pixels (default: 800)"
            },
            "height": {
                "type": "number",
                "description": "Full layout height in pixels; the viewer uses half of it (default viewer height: 500)"
            },
            "title": {
                "type": "string",
                "description": "Caption link text (default: the media title or file name)"
            },
            "description": {
                "type": "string",
                "description": "Accessible title attribute (default: the media description or title)"
            }
        },
        "required": ["text"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("PDF Embed".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(false),
    }),
});

#[derive(Debug, Deserialize)]
struct PdfEmbedParams {
    text: String,
    #[serde(flatten)]
    overrides: AttributeOverrides,
}

pub struct PdfEmbedTool {
    embedder: Arc<PdfEmbedder>,
}

impl PdfEmbedTool {
    pub fn new(embedder: Arc<PdfEmbedder>) -> Self {
        Self { embedder }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match arguments {
            Some(args) => match serde_json::from_value::<PdfEmbedParams>(args) {
                Ok(params) => params,
                Err(e) => {
                    error!("Invalid pdf-embed parameters: {}", e);
                    return CallToolResult::error(format!("Invalid parameters: {}", e));
                }
            },
            None => {
                return CallToolResult::error("Missing required parameters");
            }
        };

        for (name, value) in [
            ("width", params.overrides.width),
            ("height", params.overrides.height),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return CallToolResult::error(format!("{} must be a positive number", name));
                }
            }
        }

        info!("Embedding PDFs in {} bytes of text", params.text.len());

        let outcome = self.embedder.embed_text(&params.text, &params.overrides);
        CallToolResult::success(outcome.html)
    }
}
