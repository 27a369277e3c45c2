use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bstr::ByteSlice;
use crossterm::{
    queue,
    style,
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli_args::{self, FileDirection, ValidatedPath};
use crate::config::{ServerConfig, DEFAULT_REGION};
use crate::file_access::FileAccessError;
use crate::{InvokeOutput, MAX_TOOL_RESPONSE_SIZE, OutputKind};

const READONLY_OPS: [&str; 7] = ["get", "describe", "list", "ls", "search", "batch-get", "batch_get"];

/// The environment variable name where we set additional metadata for the AWS CLI user agent.
const USER_AGENT_ENV_VAR: &str = "AWS_EXECUTION_ENV";
const USER_AGENT_APP_NAME: &str = "UseAws-MCP-Server";
const USER_AGENT_VERSION_KEY: &str = "Version";
const USER_AGENT_VERSION_VALUE: &str = env!("CARGO_PKG_VERSION");

const TRUNCATED_MARKER: &str = " ... truncated";

/// Reasons a command is refused before the CLI is spawned.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("'{0}' must not be empty")]
    MissingField(&'static str),

    #[error("Invalid {field} '{value}'")]
    InvalidName { field: &'static str, value: String },

    #[error("Positional argument '{0}' looks like an option, pass options through 'parameters' instead")]
    OptionAsArgument(String),

    #[error("Operation '{0}' is not read-only and the server only allows read operations")]
    ReadOnly(String),

    #[error("Command 'aws {service} {operation}' is denied by the security policy")]
    Denied { service: String, operation: String },

    #[error(transparent)]
    FileAccess(#[from] FileAccessError),
}

/// The main UseAws struct that handles AWS CLI operations
#[derive(Debug, Clone, Deserialize)]
pub struct UseAws {
    pub service_name: String,
    pub operation_name: String,
    pub parameters: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub region: Option<String>,
    pub profile_name: Option<String>,
    pub label: Option<String>,
    /// Local files referenced by the command, filled in by [`UseAws::validate`].
    #[serde(skip)]
    pub local_files: Vec<ValidatedPath>,
    /// Directory the CLI runs in so relative paths match what was validated.
    #[serde(skip)]
    pub working_dir: Option<PathBuf>,
}

/// Request structure for MCP tool calls
#[derive(Debug, Clone, Deserialize)]
pub struct UseAwsRequest {
    pub service_name: String,
    pub operation_name: String,
    pub parameters: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub region: Option<String>,
    pub profile_name: Option<String>,
    pub label: Option<String>,
}

/// Response structure for MCP tool calls
#[derive(Debug, Serialize)]
pub struct UseAwsResponse {
    pub exit_status: String,
    pub stdout: String,
    pub stderr: String,
}

/// A fully assembled `aws` invocation.
#[derive(Debug, Clone)]
pub struct CliInvocation {
    pub args: Vec<String>,
    pub envs: HashMap<String, String>,
    pub current_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs the AWS CLI. Implemented by [`AwsCliProcess`]; tests substitute their own.
#[async_trait]
pub trait AwsCliRunner: Send + Sync {
    async fn run(&self, invocation: CliInvocation) -> std::io::Result<CliOutput>;
}

/// Spawns the `aws` binary found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct AwsCliProcess;

#[async_trait]
impl AwsCliRunner for AwsCliProcess {
    async fn run(&self, invocation: CliInvocation) -> std::io::Result<CliOutput> {
        let mut command = tokio::process::Command::new("aws");
        command.envs(invocation.envs).args(invocation.args);
        if let Some(dir) = invocation.current_dir {
            command.current_dir(dir);
        }
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?
            .wait_with_output()
            .await?;
        Ok(CliOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl UseAws {
    pub fn requires_acceptance(&self) -> bool {
        !READONLY_OPS.iter().any(|op| self.operation_name.starts_with(op))
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Checks the command against the server configuration and records the
    /// local files it touches. Fills in the default region when none was given.
    pub fn validate(&mut self, config: &ServerConfig) -> std::result::Result<(), ValidationError> {
        check_word("service_name", &self.service_name)?;
        check_word("operation_name", &self.operation_name)?;

        if self.region.as_deref().map_or(true, |r| r.trim().is_empty()) {
            self.region = Some(config.default_region.clone());
        }
        check_word("region", self.region())?;
        if let Some(profile_name) = self.profile_name.as_deref() {
            check_word("profile_name", profile_name)?;
        }

        if let Some(parameters) = &self.parameters {
            for name in parameters.keys() {
                check_word("parameter name", name.trim_start_matches("--"))?;
            }
        }
        if let Some(arg) = self.arguments.iter().find(|a| a.starts_with('-') && a.as_str() != "-") {
            return Err(ValidationError::OptionAsArgument(arg.clone()));
        }

        if config.read_operations_only && self.requires_acceptance() {
            return Err(ValidationError::ReadOnly(self.operation_name.clone()));
        }
        if config.security_policy.denies(&self.service_name, &self.operation_name) {
            return Err(ValidationError::Denied {
                service: self.service_name.clone(),
                operation: self.operation_name.clone(),
            });
        }

        let file_arguments = cli_args::classify(
            &self.service_name,
            &self.operation_name,
            self.parameters.as_ref(),
            &self.arguments,
        );
        self.local_files = cli_args::validate_arguments(&config.file_access, file_arguments)?;
        self.working_dir = Some(config.file_access.working_dir().to_path_buf());
        Ok(())
    }

    pub async fn invoke(&self, runner: &dyn AwsCliRunner) -> Result<InvokeOutput> {
        let invocation = CliInvocation {
            args: self.cli_args(),
            envs: cli_environment(std::env::vars()),
            current_dir: self.working_dir.clone(),
        };
        tracing::info!(
            service = %self.service_name,
            operation = %self.operation_name,
            region = %self.region(),
            "running aws cli"
        );

        let output = runner
            .run(invocation)
            .await
            .wrap_err_with(|| format!("Unable to spawn command '{:?}'", self))?;
        let status = output.status.unwrap_or(-1).to_string();
        let stdout = truncate_output(&output.stdout.to_str_lossy());
        let stderr = truncate_output(&output.stderr.to_str_lossy());

        if status.eq("0") {
            Ok(InvokeOutput {
                output: OutputKind::Json(serde_json::json!({
                    "exit_status": status,
                    "stdout": stdout,
                    "stderr": stderr.clone()
                })),
            })
        } else {
            tracing::debug!(%status, "aws cli exited with failure");
            Err(eyre::eyre!(stderr))
        }
    }

    pub fn queue_description(&self, updates: &mut impl Write) -> Result<()> {
        queue!(
            updates,
            style::Print("Running aws cli command:\n\n"),
            style::Print(format!("Service name: {}\n", self.service_name)),
            style::Print(format!("Operation name: {}\n", self.operation_name)),
        )?;
        if let Some(parameters) = &self.parameters {
            queue!(updates, style::Print("Parameters: \n".to_string()))?;
            let mut parameters: Vec<_> = parameters.iter().collect();
            parameters.sort_by(|a, b| a.0.cmp(b.0));
            for (name, value) in parameters {
                match value {
                    serde_json::Value::String(s) if s.is_empty() => {
                        queue!(updates, style::Print(format!("- {}\n", name)))?;
                    },
                    _ => {
                        queue!(updates, style::Print(format!("- {}: {}\n", name, value)))?;
                    },
                }
            }
        }

        if !self.arguments.is_empty() {
            queue!(updates, style::Print(format!("Arguments: {}\n", self.arguments.join(" "))))?;
        }

        if !self.local_files.is_empty() {
            queue!(updates, style::Print("Local files: \n".to_string()))?;
            for file in &self.local_files {
                let access = match file.argument.direction {
                    FileDirection::Read => "read",
                    FileDirection::Write => "write",
                };
                queue!(
                    updates,
                    style::Print(format!(
                        "- {} ({}): {}\n",
                        file.argument.origin,
                        access,
                        file.resolved.display()
                    ))
                )?;
            }
        }

        if let Some(ref profile_name) = self.profile_name {
            queue!(updates, style::Print(format!("Profile name: {}\n", profile_name)))?;
        } else {
            queue!(updates, style::Print("Profile name: default\n".to_string()))?;
        }

        queue!(updates, style::Print(format!("Region: {}", self.region())))?;

        if let Some(ref label) = self.label {
            queue!(updates, style::Print(format!("\nLabel: {}", label)))?;
        }
        Ok(())
    }

    /// Everything after `aws` on the command line.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = vec!["--region".to_string(), self.region().to_string()];
        if let Some(profile_name) = self.profile_name.as_deref() {
            args.push("--profile".to_string());
            args.push(profile_name.to_string());
        }
        args.push(self.service_name.clone());
        args.push(self.operation_name.clone());
        if let Some(parameters) = self.cli_parameters() {
            for (name, val) in parameters {
                args.push(name);
                if !val.is_empty() {
                    args.push(val);
                }
            }
        }
        args.extend(self.arguments.iter().cloned());
        args
    }

    /// Returns the CLI arguments properly formatted as kebab case if parameters is
    /// [Option::Some], otherwise None
    fn cli_parameters(&self) -> Option<Vec<(String, String)>> {
        if let Some(parameters) = &self.parameters {
            let mut params = vec![];
            for (param_name, val) in parameters {
                let param_name = format!("--{}", cli_args::cli_parameter_name(param_name));
                let param_val = val.as_str().map(|s| s.to_string()).unwrap_or(val.to_string());
                params.push((param_name, param_val));
            }
            params.sort();
            Some(params)
        } else {
            None
        }
    }
}

/// The inherited environment plus this server's marker in the CLI user agent.
fn cli_environment(base: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    let mut env_vars: HashMap<String, String> = base.collect();

    let user_agent_metadata_value = format!(
        "{} {}/{}",
        USER_AGENT_APP_NAME, USER_AGENT_VERSION_KEY, USER_AGENT_VERSION_VALUE
    );

    // If the user agent metadata env var already exists, append to it, otherwise set it
    let value = match env_vars.get(USER_AGENT_ENV_VAR) {
        Some(existing_value) if !existing_value.is_empty() => {
            format!("{} {}", existing_value, user_agent_metadata_value)
        }
        _ => user_agent_metadata_value,
    };
    env_vars.insert(USER_AGENT_ENV_VAR.to_string(), value);
    env_vars
}

fn truncate_output(text: &str) -> String {
    let limit = MAX_TOOL_RESPONSE_SIZE / 3;
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATED_MARKER)
}

fn check_word(field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    let valid = value.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

impl From<UseAwsRequest> for UseAws {
    fn from(request: UseAwsRequest) -> Self {
        Self {
            service_name: request.service_name,
            operation_name: request.operation_name,
            parameters: request.parameters,
            arguments: request.arguments,
            region: request.region,
            profile_name: request.profile_name,
            label: request.label,
            local_files: Vec::new(),
            working_dir: None,
        }
    }
}

impl From<InvokeOutput> for UseAwsResponse {
    fn from(output: InvokeOutput) -> Self {
        match output.output {
            OutputKind::Json(json) => {
                let exit_status = json.get("exit_status").and_then(|v| v.as_str()).unwrap_or("0").to_string();
                let stdout = json.get("stdout").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let stderr = json.get("stderr").and_then(|v| v.as_str()).unwrap_or("").to_string();
                Self {
                    exit_status,
                    stdout,
                    stderr,
                }
            }
            OutputKind::Text(text) => Self {
                exit_status: "0".to_string(),
                stdout: text,
                stderr: "".to_string(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::config::SecurityPolicy;
    use crate::file_access::{FileAccessMode, FileAccessPolicy};

    macro_rules! use_aws {
        ($value:tt) => {
            serde_json::from_value::<UseAws>(serde_json::json!($value)).unwrap()
        };
    }

    /// Records invocations and answers with a canned output.
    #[derive(Default)]
    pub(crate) struct FakeRunner {
        pub output: CliOutput,
        pub calls: Mutex<Vec<CliInvocation>>,
    }

    #[async_trait]
    impl AwsCliRunner for FakeRunner {
        async fn run(&self, invocation: CliInvocation) -> std::io::Result<CliOutput> {
            self.calls.lock().unwrap().push(invocation);
            Ok(self.output.clone())
        }
    }

    pub(crate) fn test_config(dir: &std::path::Path, mode: FileAccessMode) -> ServerConfig {
        ServerConfig {
            file_access: FileAccessPolicy::with_home(mode, dir, None).unwrap(),
            default_region: "us-west-2".to_string(),
            read_operations_only: false,
            security_policy: SecurityPolicy::default(),
        }
    }

    #[test]
    fn test_requires_acceptance() {
        let cmd = use_aws! {{
            "service_name": "ecs",
            "operation_name": "list-task-definitions",
            "region": "us-west-2",
            "profile_name": "default",
            "label": ""
        }};
        assert!(!cmd.requires_acceptance());
        let cmd = use_aws! {{
            "service_name": "dynamodb",
            "operation_name": "batch-get-item",
            "region": "us-west-2"
        }};
        assert!(!cmd.requires_acceptance());
        let cmd = use_aws! {{
            "service_name": "s3",
            "operation_name": "put-object",
            "region": "us-west-2",
            "profile_name": "default",
            "label": ""
        }};
        assert!(cmd.requires_acceptance());
    }

    #[test]
    fn test_use_aws_deser() {
        let cmd = use_aws! {{
            "service_name": "dynamodb",
            "operation_name": "query",
            "parameters": {
                "TableName": "table-name",
                "KeyConditionExpression": "PartitionKey = :pkValue"
            },
            "region": "us-west-2",
            "profile_name": "default",
            "label": ""
        }};
        let params = cmd.cli_parameters().unwrap();
        assert!(
            params.iter().any(|p| p.0 == "--table-name" && p.1 == "table-name"),
            "not found in {:?}",
            params
        );
        assert!(
            params
                .iter()
                .any(|p| p.0 == "--key-condition-expression" && p.1 == "PartitionKey = :pkValue"),
            "not found in {:?}",
            params
        );
    }

    #[test]
    fn test_cli_args_order() {
        let cmd = use_aws! {{
            "service_name": "s3",
            "operation_name": "cp",
            "parameters": { "recursive": "", "max-concurrent-requests": 4 },
            "arguments": ["./out", "s3://bucket/prefix"],
            "region": "eu-central-1",
            "profile_name": "dev"
        }};
        assert_eq!(
            cmd.cli_args(),
            vec![
                "--region",
                "eu-central-1",
                "--profile",
                "dev",
                "s3",
                "cp",
                "--max-concurrent-requests",
                "4",
                "--recursive",
                "./out",
                "s3://bucket/prefix",
            ]
        );
    }

    #[test]
    fn test_queue_description() {
        let cmd = use_aws! {{
            "service_name": "s3",
            "operation_name": "list-buckets",
            "parameters": {
                "max-items": "10"
            },
            "region": "us-west-2",
            "profile_name": "development",
            "label": "List S3 buckets"
        }};

        let mut output = Vec::new();
        cmd.queue_description(&mut output).unwrap();
        let output_str = String::from_utf8(output).unwrap();

        assert!(output_str.contains("Running aws cli command:"));
        assert!(output_str.contains("Service name: s3"));
        assert!(output_str.contains("Operation name: list-buckets"));
        assert!(output_str.contains("Parameters:"));
        assert!(output_str.contains("- max-items: \"10\""));
        assert!(output_str.contains("Profile name: development"));
        assert!(output_str.contains("Region: us-west-2"));
        assert!(output_str.contains("Label: List S3 buckets"));
    }

    #[test]
    fn test_queue_description_empty_parameters() {
        let cmd = use_aws! {{
            "service_name": "ec2",
            "operation_name": "describe-instances",
            "region": "us-east-1"
        }};

        let mut output = Vec::new();
        cmd.queue_description(&mut output).unwrap();
        let output_str = String::from_utf8(output).unwrap();

        assert!(output_str.contains("Service name: ec2"));
        assert!(output_str.contains("Profile name: default"));
        assert!(output_str.contains("Region: us-east-1"));
        assert!(!output_str.contains("Parameters:"));
        assert!(!output_str.contains("Local files:"));
    }

    #[test]
    fn test_validate_fills_region_and_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), FileAccessMode::Workdir);
        let mut cmd = use_aws! {{
            "service_name": "s3api",
            "operation_name": "get-object",
            "parameters": { "bucket": "b", "key": "k" },
            "arguments": ["downloads/k.bin"]
        }};

        cmd.validate(&config).unwrap();
        assert_eq!(cmd.region(), "us-west-2");
        assert_eq!(cmd.local_files.len(), 1);
        assert_eq!(
            cmd.local_files[0].resolved,
            config.file_access.working_dir().join("downloads/k.bin")
        );

        let mut output = Vec::new();
        cmd.queue_description(&mut output).unwrap();
        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("Local files:"));
        assert!(output_str.contains("positional argument 1 (write)"));
    }

    #[test]
    fn test_validate_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), FileAccessMode::Workdir);
        let mut cmd = use_aws! {{
            "service_name": "cloudformation",
            "operation_name": "deploy",
            "parameters": { "template-file": "/etc/passwd", "stack-name": "s" }
        }};
        let err = cmd.validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::FileAccess(FileAccessError::OutsideWorkdir { .. })));

        let config = test_config(dir.path(), FileAccessMode::NoAccess);
        let mut cmd = use_aws! {{
            "service_name": "lambda",
            "operation_name": "update-function-code",
            "parameters": { "function-name": "f", "zip-file": "fileb://f.zip" }
        }};
        let err = cmd.validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::FileAccess(FileAccessError::NoAccess { .. })));
    }

    #[test]
    fn test_validate_rejects_smuggled_options() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), FileAccessMode::Workdir);

        let mut cmd = use_aws! {{
            "service_name": "cloudformation",
            "operation_name": "deploy",
            "arguments": ["--template-file", "/etc/passwd"]
        }};
        assert!(matches!(
            cmd.validate(&config).unwrap_err(),
            ValidationError::OptionAsArgument(_)
        ));

        let mut cmd = use_aws! {{
            "service_name": "--endpoint-url",
            "operation_name": "list-buckets"
        }};
        assert!(matches!(
            cmd.validate(&config).unwrap_err(),
            ValidationError::InvalidName { .. }
        ));

        let mut cmd = use_aws! {{
            "service_name": "s3api",
            "operation_name": "list-buckets",
            "parameters": { "query=x --debug": "" }
        }};
        assert!(matches!(
            cmd.validate(&config).unwrap_err(),
            ValidationError::InvalidName { .. }
        ));

        let mut cmd = use_aws! {{
            "service_name": "",
            "operation_name": "list-buckets"
        }};
        assert!(matches!(
            cmd.validate(&config).unwrap_err(),
            ValidationError::MissingField("service_name")
        ));
    }

    #[test]
    fn test_validate_read_only_and_deny_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), FileAccessMode::Workdir);
        config.read_operations_only = true;
        config.security_policy.deny_list = vec!["aws iam list-access-keys".to_string()];

        let mut cmd = use_aws! {{ "service_name": "s3api", "operation_name": "delete-bucket" }};
        assert!(matches!(cmd.validate(&config).unwrap_err(), ValidationError::ReadOnly(_)));

        let mut cmd = use_aws! {{ "service_name": "iam", "operation_name": "list-access-keys" }};
        assert!(matches!(cmd.validate(&config).unwrap_err(), ValidationError::Denied { .. }));

        let mut cmd = use_aws! {{ "service_name": "iam", "operation_name": "list-users" }};
        assert!(cmd.validate(&config).is_ok());
    }

    #[test]
    fn test_cli_environment_user_agent() {
        let env = cli_environment(vec![("PATH".to_string(), "/bin".to_string())].into_iter());
        assert_eq!(env.get("PATH").map(String::as_str), Some("/bin"));
        let agent = env.get(USER_AGENT_ENV_VAR).unwrap();
        assert!(agent.starts_with("UseAws-MCP-Server Version/"), "{}", agent);

        let env = cli_environment(vec![(USER_AGENT_ENV_VAR.to_string(), "AWS_Lambda".to_string())].into_iter());
        assert!(env[USER_AGENT_ENV_VAR].starts_with("AWS_Lambda UseAws-MCP-Server"));
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("short"), "short");
        let long = "é".repeat(MAX_TOOL_RESPONSE_SIZE);
        let truncated = truncate_output(&long);
        assert!(truncated.ends_with(TRUNCATED_MARKER));
        assert!(truncated.len() <= MAX_TOOL_RESPONSE_SIZE / 3 + TRUNCATED_MARKER.len());
    }

    #[tokio::test]
    async fn test_invoke_success_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), FileAccessMode::Workdir);
        let runner = FakeRunner {
            output: CliOutput {
                status: Some(0),
                stdout: br#"{"Account": "123456789012"}"#.to_vec(),
                stderr: Vec::new(),
            },
            ..Default::default()
        };

        let mut cmd = use_aws! {{ "service_name": "sts", "operation_name": "get-caller-identity" }};
        cmd.validate(&config).unwrap();
        let response: UseAwsResponse = cmd.invoke(&runner).await.unwrap().into();
        assert_eq!(response.exit_status, "0");
        assert!(response.stdout.contains("123456789012"));

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args[..4], ["--region", "us-west-2", "sts", "get-caller-identity"]);
        assert_eq!(calls[0].current_dir.as_deref(), Some(config.file_access.working_dir()));
    }

    #[test]
    fn test_invoke_failure_carries_stderr() {
        let runner = FakeRunner {
            output: CliOutput {
                status: Some(255),
                stdout: Vec::new(),
                stderr: b"An error occurred (AccessDenied)".to_vec(),
            },
            ..Default::default()
        };
        let cmd = use_aws! {{ "service_name": "s3api", "operation_name": "list-buckets", "region": "us-east-1" }};
        let err = tokio_test::block_on(cmd.invoke(&runner)).unwrap_err();
        assert!(err.to_string().contains("AccessDenied"));
    }
}
