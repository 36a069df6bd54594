use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::embedder::PdfEmbedder;
use crate::utils::media_library::AttachmentId;

pub static MEDIA_INSERT_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "pdf-media-insert".to_string(),
    description: "Text to insert into the editor for a media library attachment. PDFs become their URL on its own line so they are embedded; other media keep the given HTML".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "attachmentId": {
                "type": "integer",
                "description": "Media library attachment ID"
            },
            "html": {
                "type": "string",
                "description": "Markup the media dialog would insert for this attachment",
                "default": ""
            }
        },
        "required": ["attachmentId"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("PDF Media Insert".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(false),
    }),
});

#[derive(Debug, Deserialize)]
struct MediaInsertParams {
    #[serde(rename = "attachmentId")]
    attachment_id: AttachmentId,
    #[serde(default)]
    html: String,
}

pub struct MediaInsertTool {
    embedder: Arc<PdfEmbedder>,
}

impl MediaInsertTool {
    pub fn new(embedder: Arc<PdfEmbedder>) -> Self {
        Self { embedder }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match arguments {
            Some(args) => match serde_json::from_value::<MediaInsertParams>(args) {
                Ok(params) => params,
                Err(e) => {
                    error!("Invalid media insert parameters: {}", e);
                    return CallToolResult::error(format!("Invalid parameters: {}", e));
                }
            },
            None => {
                return CallToolResult::error("Missing required parameters");
            }
        };

        info!("Preparing editor text for attachment {}", params.attachment_id);

        CallToolResult::success(
            self.embedder
                .media_insert(params.attachment_id, &params.html),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::embed_html::EmbedBuilder;
    use crate::utils::media_library::MediaLibrary;

    fn tool() -> MediaInsertTool {
        let library = MediaLibrary::from_json(
            r#"[{"id": 21, "guid": "https://blog.example.com/uploads/terms.pdf", "mimeType": "application/pdf"}]"#,
        )
        .unwrap();
        MediaInsertTool::new(Arc::new(PdfEmbedder::with_library(
            library,
            EmbedBuilder::default(),
        )))
    }

    #[tokio::test]
    async fn pdf_attachment_becomes_bare_url() {
        let result = tool()
            .execute(Some(json!({ "attachmentId": 21, "html": "<a>terms</a>" })))
            .await;
        assert_eq!(
            result.content[0].text,
            "https://blog.example.com/uploads/terms.pdf\n\n"
        );
    }

    #[tokio::test]
    async fn unknown_attachment_keeps_html() {
        let result = tool()
            .execute(Some(json!({ "attachmentId": 22, "html": "<a>other</a>" })))
            .await;
        assert_eq!(result.content[0].text, "<a>other</a>");
    }

    #[tokio::test]
    async fn attachment_id_is_required() {
        let result = tool().execute(Some(json!({ "html": "x" }))).await;
        assert_eq!(result.is_error, Some(true));
    }
}
