//! Finds the CLI arguments that name local files.
//!
//! The AWS CLI reads or writes local files in a handful of ways: outfile
//! positionals of streaming operations, `file://`/`fileb://` parameter values,
//! streaming blob parameters that take a bare path, a few per-service path
//! options and the local side of `s3 cp`/`mv`/`sync`. Each of these is turned
//! into a [`FileArgument`] so the policy can check it.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use convert_case::{Case, Casing};

use crate::file_access::{is_local_path, FileAccessError, FileAccessPolicy};

/// Operations whose positional argument is the file the response body is written to.
const OUTFILE_OPERATIONS: &[(&str, &str)] = &[
    ("s3api", "get-object"),
    ("s3api", "get-object-torrent"),
    ("lambda", "invoke"),
    ("polly", "synthesize-speech"),
    ("kinesis-video-media", "get-media"),
    ("kinesis-video-archived-media", "get-clip"),
    ("lex-runtime", "post-content"),
    ("lexv2-runtime", "recognize-utterance"),
    ("sagemaker-runtime", "invoke-endpoint"),
    ("mediastore-data", "get-object"),
    ("glacier", "get-job-output"),
    ("ebs", "get-snapshot-block"),
    ("bedrock-runtime", "invoke-model"),
];

/// Parameters that take a bare local path for a streaming request body.
const STREAMING_BLOB_PARAMETERS: &[(&str, &str, &str)] = &[
    ("s3api", "put-object", "body"),
    ("s3api", "upload-part", "body"),
    ("glacier", "upload-archive", "body"),
    ("glacier", "upload-multipart-part", "body"),
    ("mediastore-data", "put-object", "body"),
    ("ebs", "put-snapshot-block", "block-data"),
    ("lex-runtime", "post-content", "input-stream"),
    ("lexv2-runtime", "recognize-utterance", "input-stream"),
];

/// Service specific options that name local files.
const CUSTOM_PATH_PARAMETERS: &[(&str, &str, &str, FileDirection)] = &[
    ("cloudformation", "package", "template-file", FileDirection::Read),
    ("cloudformation", "package", "output-template-file", FileDirection::Write),
    ("cloudformation", "deploy", "template-file", FileDirection::Read),
    ("ec2", "get-password-data", "priv-launch-key", FileDirection::Read),
    ("emr", "ssh", "key-pair-file", FileDirection::Read),
    ("emr", "socks", "key-pair-file", FileDirection::Read),
    ("emr", "put", "key-pair-file", FileDirection::Read),
    ("emr", "put", "src", FileDirection::Read),
    ("emr", "get", "key-pair-file", FileDirection::Read),
    ("emr", "get", "dest", FileDirection::Write),
];

/// Options accepted by every command that name local files.
const GLOBAL_PATH_PARAMETERS: &[(&str, FileDirection)] = &[("ca-bundle", FileDirection::Read)];

const LOCAL_TRANSFER_COMMANDS: &[(&str, &str)] = &[("s3", "cp"), ("s3", "mv"), ("s3", "sync")];

const BLOB_PREFIXES: [&str; 2] = ["fileb://", "file://"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDirection {
    Read,
    Write,
}

/// How a file argument was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileArgKind {
    Outfile,
    BlobUri,
    StreamingBlob,
    CustomPath,
    LocalTransfer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgOrigin {
    Positional(usize),
    Parameter(String),
}

impl fmt::Display for ArgOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(index) => write!(f, "positional argument {}", index + 1),
            Self::Parameter(name) => write!(f, "--{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArgument {
    pub kind: FileArgKind,
    pub origin: ArgOrigin,
    /// Path text with any `file://`/`fileb://` prefix removed.
    pub raw: String,
    pub direction: FileDirection,
}

#[derive(Debug, Clone)]
pub struct ValidatedPath {
    pub argument: FileArgument,
    pub resolved: PathBuf,
}

/// Normalizes a user supplied parameter name the way it is passed to the CLI:
/// no leading dashes, kebab case. Names already in kebab case are kept as is
/// so digits stay attached (`s3-bucket`).
pub fn cli_parameter_name(name: &str) -> String {
    let name = name.trim_start_matches("--");
    if name.chars().any(|c| c.is_ascii_uppercase() || c == '_') {
        name.to_case(Case::Kebab)
    } else {
        name.to_string()
    }
}

pub fn strip_blob_prefix(value: &str) -> Option<&str> {
    BLOB_PREFIXES.iter().find_map(|prefix| {
        match value.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&value[prefix.len()..]),
            _ => None,
        }
    })
}

pub fn is_outfile_operation(service: &str, operation: &str) -> bool {
    let (service, operation) = (service.to_ascii_lowercase(), operation.to_ascii_lowercase());
    OUTFILE_OPERATIONS
        .iter()
        .any(|(s, o)| *s == service && *o == operation)
}

/// Lists every argument of the command that refers to a local file.
pub fn classify(
    service: &str,
    operation: &str,
    parameters: Option<&HashMap<String, serde_json::Value>>,
    positionals: &[String],
) -> Vec<FileArgument> {
    let service = service.to_ascii_lowercase();
    let operation = operation.to_ascii_lowercase();
    let mut found = Vec::new();

    if let Some(parameters) = parameters {
        let mut names: Vec<_> = parameters.keys().collect();
        names.sort();
        for name in names {
            let Some(value) = parameters[name].as_str() else {
                continue;
            };
            let name = cli_parameter_name(name);
            found.extend(classify_parameter(&service, &operation, &name, value));
        }
    }

    let transfer = LOCAL_TRANSFER_COMMANDS
        .iter()
        .any(|(s, o)| *s == service && *o == operation);
    let outfile = is_outfile_operation(&service, &operation);

    // outfiles and transfer operands are opened as written, never as file:// values
    for (index, value) in positionals.iter().enumerate() {
        let origin = ArgOrigin::Positional(index);
        if outfile {
            if value != "-" {
                found.push(FileArgument {
                    kind: FileArgKind::Outfile,
                    origin,
                    raw: value.clone(),
                    direction: FileDirection::Write,
                });
            }
        } else if transfer {
            if is_local_path(value) {
                found.push(FileArgument {
                    kind: FileArgKind::LocalTransfer,
                    origin,
                    raw: value.clone(),
                    direction: if index == 0 {
                        FileDirection::Read
                    } else {
                        FileDirection::Write
                    },
                });
            }
        } else if let Some(path) = strip_blob_prefix(value) {
            found.push(FileArgument {
                kind: FileArgKind::BlobUri,
                origin,
                raw: path.to_string(),
                direction: FileDirection::Read,
            });
        }
    }

    found
}

/// A parameter can yield two arguments: the `file://` target the CLI loads
/// and, for path options, the literal value.
fn classify_parameter(service: &str, operation: &str, name: &str, value: &str) -> Vec<FileArgument> {
    let mut found = Vec::new();

    if let Some(path) = strip_blob_prefix(value) {
        found.push(FileArgument {
            kind: FileArgKind::BlobUri,
            origin: ArgOrigin::Parameter(name.to_string()),
            raw: path.to_string(),
            direction: FileDirection::Read,
        });
    }

    let streaming = STREAMING_BLOB_PARAMETERS
        .iter()
        .any(|(s, o, p)| *s == service && *o == operation && *p == name);
    let custom = CUSTOM_PATH_PARAMETERS
        .iter()
        .find(|(s, o, p, _)| *s == service && *o == operation && *p == name)
        .map(|(_, _, _, direction)| *direction)
        .or_else(|| {
            GLOBAL_PATH_PARAMETERS
                .iter()
                .find(|(p, _)| *p == name)
                .map(|(_, direction)| *direction)
        });

    // an empty value is a bare flag and `-` is stdin, neither is a file
    if value.is_empty() || value == "-" {
        return found;
    }
    let literal = if streaming {
        Some((FileArgKind::StreamingBlob, FileDirection::Read))
    } else {
        custom.map(|direction| (FileArgKind::CustomPath, direction))
    };
    if let Some((kind, direction)) = literal {
        found.push(FileArgument {
            kind,
            origin: ArgOrigin::Parameter(name.to_string()),
            raw: value.to_string(),
            direction,
        });
    }

    found
}

/// Validates every file argument, stopping at the first one the policy rejects.
pub fn validate_arguments(
    policy: &FileAccessPolicy,
    arguments: Vec<FileArgument>,
) -> Result<Vec<ValidatedPath>, FileAccessError> {
    arguments
        .into_iter()
        .map(|argument| -> Result<ValidatedPath, FileAccessError> {
            let resolved = match argument.kind {
                FileArgKind::BlobUri => policy.validate_blob_uri(&argument.raw)?,
                _ => policy.validate(&argument.raw)?,
            };
            tracing::debug!(
                origin = %argument.origin,
                kind = ?argument.kind,
                path = %resolved.display(),
                "file argument allowed"
            );
            Ok(ValidatedPath { argument, resolved })
        })
        .collect()
}
