use anyhow::Result;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, BufReader, Stdin, Stdout};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error};

use super::types::{
    McpMessage, McpNotification, McpRequest, McpResponse, INVALID_REQUEST, PARSE_ERROR,
};

/// Newline-delimited JSON-RPC over a reader/writer pair.
pub struct LineTransport<R, W> {
    reader: FramedRead<BufReader<R>, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(BufReader::new(reader), LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// `Ok(None)` on end of input. Blank lines are skipped. Only I/O and
    /// framing failures are errors; unparseable lines are returned as
    /// [`McpMessage::Malformed`].
    pub async fn read_message(&mut self) -> Result<Option<McpMessage>> {
        loop {
            match self.reader.next().await {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    debug!("Received: {}", line);
                    return Ok(Some(parse_message(&line)));
                }
                Some(Err(e)) => {
                    error!("Error reading from input: {}", e);
                    return Err(anyhow::anyhow!("Transport error: {}", e));
                }
                None => {
                    debug!("EOF reached");
                    return Ok(None);
                }
            }
        }
    }

    pub async fn write_response(&mut self, response: McpResponse) -> Result<()> {
        let json = serde_json::to_string(&response)?;
        debug!("Sending: {}", json);

        self.writer.send(json).await?;

        Ok(())
    }
}

/// Messages carrying an `id` are requests, the rest are notifications.
/// Lines that fail to parse come back as [`McpMessage::Malformed`] so the
/// server can answer them and keep reading.
fn parse_message(line: &str) -> McpMessage {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse JSON: {}", e);
            return malformed(serde_json::Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
        }
    };

    let id = match value.as_object() {
        Some(obj) => obj.get("id").cloned(),
        None => {
            error!("Invalid JSON-RPC message structure");
            return malformed(
                serde_json::Value::Null,
                INVALID_REQUEST,
                "Invalid Request: expected a JSON object",
            );
        }
    };

    match id {
        Some(id) => match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => McpMessage::Request(request),
            Err(e) => {
                error!("Failed to parse request: {}", e);
                malformed(id, INVALID_REQUEST, format!("Invalid Request: {}", e))
            }
        },
        None => match serde_json::from_value::<McpNotification>(value) {
            Ok(notification) => McpMessage::Notification(notification),
            Err(e) => {
                error!("Failed to parse notification: {}", e);
                malformed(
                    serde_json::Value::Null,
                    INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                )
            }
        },
    }
}

fn malformed(id: serde_json::Value, code: i32, message: impl Into<String>) -> McpMessage {
    McpMessage::Malformed {
        id,
        code,
        message: message.into(),
    }
}
