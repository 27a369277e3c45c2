use aws_api_mcp::config::{SecurityPolicy, ServerConfig};
use aws_api_mcp::file_access::{FileAccessMode, FileAccessPolicy};
use aws_api_mcp::use_aws::UseAws;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let working_dir = std::env::temp_dir().join("aws-api-mcp-demo");
    std::fs::create_dir_all(&working_dir)?;
    let config = ServerConfig {
        file_access: FileAccessPolicy::new(FileAccessMode::Workdir, &working_dir)?,
        default_region: "us-west-2".to_string(),
        read_operations_only: false,
        security_policy: SecurityPolicy::default(),
    };

    // Download an object into the working directory
    let mut cmd: UseAws = serde_json::from_value(serde_json::json!({
        "service_name": "s3api",
        "operation_name": "get-object",
        "parameters": { "bucket": "my-bucket", "key": "reports/2024.csv" },
        "arguments": ["reports/2024.csv"],
        "profile_name": "development",
        "label": "Download the 2024 report"
    }))?;
    cmd.validate(&config)?;

    // Generate and display the human-readable description
    let mut output = Vec::new();
    cmd.queue_description(&mut output)?;

    let description = String::from_utf8(output)?;
    println!("{}", description);

    // Show whether this command requires user acceptance
    if cmd.requires_acceptance() {
        println!("\n⚠️  This command requires user acceptance (write operation)");
    } else {
        println!("\n✅ This command is read-only (no acceptance required)");
    }

    // The same download aimed outside the working directory is refused
    let mut escape = cmd.clone();
    escape.arguments = vec!["../../etc/cron.d/job".to_string()];
    if let Err(e) = escape.validate(&config) {
        println!("Rejected: {}", e);
    }

    Ok(())
}
