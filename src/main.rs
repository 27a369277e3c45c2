use aws_api_mcp::config::ServerConfig;
use aws_api_mcp::error::Result;
use aws_api_mcp::mcp_server::AwsMcpServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging. stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aws_api_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting aws-api-mcp server...");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        mode = %config.file_access.mode(),
        working_dir = %config.file_access.working_dir().display(),
        read_only = config.read_operations_only,
        "file access configured"
    );

    let server = AwsMcpServer::new(config);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
