use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::use_aws::{AwsCliProcess, AwsCliRunner, UseAws, UseAwsRequest, UseAwsResponse};

pub const TOOL_NAME: &str = "call_aws";
const PROTOCOL_VERSION: &str = "2024-11-05";
const TOOLS_SCHEMA: &str = include_str!("../schema.json");

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const TOOL_EXECUTION_ERROR: i32 = -32000;

/// JSON-RPC message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: serde_json::Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// MCP server speaking newline delimited JSON-RPC.
pub struct AwsMcpServer {
    config: ServerConfig,
    runner: Arc<dyn AwsCliRunner>,
}

impl AwsMcpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_runner(config, Arc::new(AwsCliProcess))
    }

    pub fn with_runner(config: ServerConfig, runner: Arc<dyn AwsCliRunner>) -> Self {
        Self { config, runner }
    }

    /// Serves stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcMessage>(&line) {
                Ok(message) => self.handle_message(message).await?,
                Err(e) => {
                    tracing::warn!("Failed to parse message: {}", e);
                    Some(JsonRpcResponse::failure(
                        serde_json::Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                writer.write_all(response_str.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    pub async fn handle_message(&self, message: JsonRpcMessage) -> Result<Option<JsonRpcResponse>> {
        match message {
            JsonRpcMessage::Request(request) => {
                let response = self.handle_request(request).await?;
                Ok(Some(response))
            }
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification);
                Ok(None)
            }
            JsonRpcMessage::Response(_) => {
                // We don't send requests, so we shouldn't receive responses
                Ok(None)
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "handling request");
        match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize(request)),
            "ping" => Ok(JsonRpcResponse::success(request.id, serde_json::json!({}))),
            "tools/call" => self.handle_tool_call(request).await,
            "tools/list" => Ok(self.handle_tools_list(request)),
            _ => Ok(JsonRpcResponse::failure(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
            )),
        }
    }

    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let capabilities = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": "aws-api-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": format!(
                "Local file access mode is {}. Relative paths resolve against {}.",
                self.config.file_access.mode(),
                self.config.file_access.working_dir().display()
            )
        });

        JsonRpcResponse::success(request.id, capabilities)
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools_json = match serde_json::from_str::<serde_json::Value>(TOOLS_SCHEMA) {
            Ok(json) => json,
            Err(e) => {
                return JsonRpcResponse::failure(
                    request.id,
                    INTERNAL_ERROR,
                    format!("Failed to parse tools schema: {}", e),
                )
            }
        };

        // The MCP client expects the result to be { "tools": [...] }
        match tools_json.get("tools") {
            Some(tools) => JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools })),
            None => JsonRpcResponse::failure(
                request.id,
                INTERNAL_ERROR,
                "Tools schema does not contain a 'tools' key",
            ),
        }
    }

    async fn handle_tool_call(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let Some(params) = request.params else {
            return Ok(JsonRpcResponse::failure(
                request.id,
                INVALID_PARAMS,
                "Missing params for tools/call",
            ));
        };

        let tool_call: ToolCall = match serde_json::from_value(params) {
            Ok(tool_call) => tool_call,
            Err(e) => {
                return Ok(JsonRpcResponse::failure(
                    request.id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                ))
            }
        };

        if tool_call.name != TOOL_NAME {
            return Ok(JsonRpcResponse::failure(
                request.id,
                METHOD_NOT_FOUND,
                format!("Tool '{}' not found", tool_call.name),
            ));
        }

        let use_aws_request: UseAwsRequest = match serde_json::from_value(tool_call.arguments) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(JsonRpcResponse::failure(
                    request.id,
                    INVALID_PARAMS,
                    format!("Invalid arguments for {}: {}", TOOL_NAME, e),
                ))
            }
        };

        let mut use_aws = UseAws::from(use_aws_request);
        if let Err(e) = use_aws.validate(&self.config) {
            tracing::warn!(
                service = %use_aws.service_name,
                operation = %use_aws.operation_name,
                "command rejected: {}",
                e
            );
            return Ok(JsonRpcResponse::success(
                request.id,
                tool_result(format!("Command rejected: {}", e), true),
            ));
        }

        // Generate a human-readable description of the command
        let mut description_output = Vec::new();
        if let Err(e) = use_aws.queue_description(&mut description_output) {
            tracing::warn!("Failed to generate command description: {}", e);
        }

        match use_aws.invoke(self.runner.as_ref()).await {
            Ok(invoke_output) => {
                let response: UseAwsResponse = invoke_output.into();
                let description = String::from_utf8(description_output).unwrap_or_default();
                let text = format!("{}\n\nResult:\n{}", description, serde_json::to_string(&response)?);
                Ok(JsonRpcResponse::success(request.id, tool_result(text, false)))
            }
            Err(e) => Ok(JsonRpcResponse::failure(
                request.id,
                TOOL_EXECUTION_ERROR,
                format!("Tool execution failed: {}", e),
            )),
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            other => tracing::debug!(method = %other, "ignoring notification"),
        }
    }

}

fn tool_result(text: String, is_error: bool) -> serde_json::Value {
    serde_json::json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "isError": is_error
    })
}
