use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::file_access::{FileAccessError, FileAccessMode, FileAccessPolicy};

pub const FILE_ACCESS_ENV_VAR: &str = "AWS_API_MCP_FILE_ACCESS";
pub const WORKING_DIR_ENV_VAR: &str = "AWS_API_MCP_WORKING_DIR";
pub const SECURITY_POLICY_ENV_VAR: &str = "AWS_API_MCP_SECURITY_POLICY";
pub const READ_ONLY_ENV_VAR: &str = "READ_OPERATIONS_ONLY";
pub const REGION_ENV_VAR: &str = "AWS_REGION";

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    FileAccess(#[from] FileAccessError),

    #[error("Unable to prepare working directory '{}': {source}", .path.display())]
    WorkingDir { path: PathBuf, source: std::io::Error },

    #[error("Unable to read security policy '{}': {source}", .path.display())]
    PolicyRead { path: PathBuf, source: std::io::Error },

    #[error("Malformed security policy '{}': {source}", .path.display())]
    PolicyParse { path: PathBuf, source: serde_json::Error },
}

/// Commands that are refused regardless of file access, e.g. `"aws s3 rb"`.
///
/// An entry with only a service name denies every operation of that service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicy {
    #[serde(default)]
    pub deny_list: Vec<String>,
}

impl SecurityPolicy {
    /// Loads the policy file. A missing file is an empty policy.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no security policy file, continuing without one");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::PolicyRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| ConfigError::PolicyParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn denies(&self, service: &str, operation: &str) -> bool {
        let service = service.to_ascii_lowercase();
        let operation = operation.to_ascii_lowercase();
        self.deny_list.iter().any(|entry| {
            let mut words = entry
                .split_whitespace()
                .map(|w| w.to_ascii_lowercase())
                .skip_while(|w| w == "aws");
            match (words.next(), words.next()) {
                (Some(s), None) => s == service,
                (Some(s), Some(o)) => s == service && o == operation,
                _ => false,
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub file_access: FileAccessPolicy,
    pub default_region: String,
    pub read_operations_only: bool,
    pub security_policy: SecurityPolicy,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match var(FILE_ACCESS_ENV_VAR) {
            Some(value) => value.parse::<FileAccessMode>()?,
            None => FileAccessMode::default(),
        };

        let working_dir = var(WORKING_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_working_dir);
        std::fs::create_dir_all(&working_dir).map_err(|source| ConfigError::WorkingDir {
            path: working_dir.clone(),
            source,
        })?;
        let file_access = FileAccessPolicy::new(mode, working_dir)?;

        let security_policy = match var(SECURITY_POLICY_ENV_VAR) {
            Some(path) => SecurityPolicy::load(Path::new(&path))?,
            None => SecurityPolicy::default(),
        };

        Ok(Self {
            file_access,
            default_region: var(REGION_ENV_VAR).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            read_operations_only: var(READ_ONLY_ENV_VAR).map(|v| parse_bool(&v)).unwrap_or(false),
            security_policy,
        })
    }
}

pub fn default_working_dir() -> PathBuf {
    std::env::temp_dir().join("aws-api-mcp").join("workdir")
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
