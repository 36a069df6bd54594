use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::transport::LineTransport;
use super::types::*;
use crate::tools::{
    media_insert_tool::{MediaInsertTool, MEDIA_INSERT_TOOL_DEFINITION},
    pdf_block_tool::{PdfBlockTool, PDF_BLOCK_TOOL_DEFINITION},
    pdf_embed_tool::{PdfEmbedTool, PDF_EMBED_TOOL_DEFINITION},
};
use crate::utils::embedder::PdfEmbedder;

pub struct McpServer<R, W> {
    transport: LineTransport<R, W>,
    embedder: Arc<PdfEmbedder>,
}

impl<R, W> McpServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(transport: LineTransport<R, W>, embedder: Arc<PdfEmbedder>) -> Self {
        Self {
            transport,
            embedder,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("MCP server started and listening on stdio");

        loop {
            match self.transport.read_message().await? {
                Some(message) => match message {
                    McpMessage::Request(request) => {
                        let response = self.handle_request(request).await;
                        self.transport.write_response(response).await?;
                    }
                    McpMessage::Notification(notification) => {
                        self.handle_notification(notification).await;
                    }
                    McpMessage::Malformed { id, code, message } => {
                        warn!("Rejected malformed message: {}", message);
                        self.transport
                            .write_response(McpResponse::error(id, code, message))
                            .await?;
                    }
                },
                None => {
                    info!("Client disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_request(&mut self, request: McpRequest) -> McpResponse {
        let id = ensure_valid_id(request.id.clone());

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "ping" => McpResponse::result(id, serde_json::json!({})),
            _ => McpResponse::error(id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    async fn handle_notification(&self, notification: McpNotification) {
        debug!("Received notification: {}", notification.method);

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialization completed");
            }
            "notifications/cancelled" => {
                debug!("Request cancelled notification received");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    fn handle_initialize(
        &mut self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(params) => params,
            None => return McpResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        match serde_json::from_value::<InitializeParams>(params) {
            Ok(init_params) => {
                info!(
                    "Initializing for {} {}",
                    init_params.client_info.name, init_params.client_info.version
                );
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    server_info: ServerInfo {
                        name: "PDF Embedder MCP".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        description: Some(env!("CARGO_PKG_DESCRIPTION").to_string()),
                    },
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability {
                            list_changed: Some(false),
                        }),
                        logging: Some(serde_json::json!({})),
                    },
                };
                McpResponse::from_serializable(id, &result)
            }
            Err(e) => McpResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    fn handle_list_tools(&self, id: serde_json::Value) -> McpResponse {
        let result = ListToolsResult {
            tools: vec![
                PDF_EMBED_TOOL_DEFINITION.clone(),
                PDF_BLOCK_TOOL_DEFINITION.clone(),
                MEDIA_INSERT_TOOL_DEFINITION.clone(),
            ],
        };
        McpResponse::from_serializable(id, &result)
    }

    async fn handle_call_tool(
        &self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(params) => params,
            None => return McpResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        match serde_json::from_value::<CallToolParams>(params) {
            Ok(call_params) => {
                let result = self.execute_tool(call_params).await;
                McpResponse::from_serializable(id, &result)
            }
            Err(e) => McpResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    async fn execute_tool(&self, params: CallToolParams) -> CallToolResult {
        let embedder = self.embedder.clone();
        match params.name.as_str() {
            "pdf-embed" => PdfEmbedTool::new(embedder).execute(params.arguments).await,
            "pdf-block" => PdfBlockTool::new(embedder).execute(params.arguments).await,
            "pdf-media-insert" => MediaInsertTool::new(embedder).execute(params.arguments).await,
            _ => CallToolResult::error(format!("Tool not found: {}", params.name)),
        }
    }
}

fn ensure_valid_id(id: Option<serde_json::Value>) -> serde_json::Value {
    match id {
        Some(serde_json::Value::Null) | None => serde_json::Value::String("0".to_string()),
        Some(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::embed_html::EmbedBuilder;
    use crate::utils::media_library::MediaLibrary;
    use serde_json::{json, Value};

    async fn run(lines: &[Value]) -> Vec<Value> {
        let input = lines
            .iter()
            .map(|line| format!("{}\n", line))
            .collect::<String>();
        run_raw(&input).await
    }

    async fn run_raw(input: &str) -> Vec<Value> {
        let mut output = Vec::new();

        {
            let transport = LineTransport::new(input.as_bytes(), &mut output);
            let embedder = Arc::new(PdfEmbedder::with_library(
                MediaLibrary::default(),
                EmbedBuilder::default(),
            ));
            let mut server = McpServer::new(transport, embedder);
            server.start().await.unwrap();
        }

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn initialize_then_list_tools() {
        let responses = run(&[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": "2024-11-05",
                "clientInfo": {"name": "test-client", "version": "0.1"}
            }}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        ])
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], json!("2024-11-05"));

        let names: Vec<&str> = responses[1]["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["pdf-embed", "pdf-block", "pdf-media-insert"]);
    }

    #[tokio::test]
    async fn call_tool_returns_embed() {
        let responses = run(&[json!({
            "jsonrpc": "2.0", "id": "a", "method": "tools/call",
            "params": {"name": "pdf-embed", "arguments": {"text": "https://x.example/annual-report.pdf"}}
        })])
        .await;

        assert_eq!(responses[0]["id"], json!("a"));
        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains(">Annual Report</a>"));
    }

    #[tokio::test]
    async fn unknown_method_and_tool() {
        let responses = run(&[
            json!({"jsonrpc": "2.0", "id": null, "method": "resources/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "web-search"}}),
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call"}),
        ])
        .await;

        assert_eq!(responses[0]["id"], json!("0"));
        assert_eq!(responses[0]["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(responses[1]["result"]["isError"], json!(true));
        assert_eq!(responses[2]["error"]["code"], json!(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn malformed_lines_get_an_error_and_the_session_continues() {
        let input = format!(
            "not json\n{}\n{}\n",
            json!({"jsonrpc": "2.0", "id": 8, "params": {}}),
            json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}),
        );
        let responses = run_raw(&input).await;

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], json!(INVALID_REQUEST));
        assert_eq!(responses[1]["id"], json!(8));
        assert_eq!(responses[2]["id"], json!(9));
        assert_eq!(responses[2]["result"], json!({}));
    }
}
