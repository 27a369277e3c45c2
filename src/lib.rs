pub mod cli_args;
pub mod config;
pub mod error;
pub mod file_access;
pub mod mcp_server;
pub mod use_aws;

pub use config::ServerConfig;
pub use error::McpError;
pub use file_access::{FileAccessMode, FileAccessPolicy};
pub use mcp_server::AwsMcpServer;
pub use use_aws::{AwsCliProcess, AwsCliRunner, UseAws, UseAwsRequest, UseAwsResponse};

/// Maximum size for tool response output
pub const MAX_TOOL_RESPONSE_SIZE: usize = 100_000;

/// Output kind for tool responses
#[derive(Debug, Clone)]
pub enum OutputKind {
    Text(String),
    Json(serde_json::Value),
}

impl Default for OutputKind {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Tool invocation output
#[derive(Debug, Default)]
pub struct InvokeOutput {
    pub output: OutputKind,
}
