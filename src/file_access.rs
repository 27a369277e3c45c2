//! Local file access policy for paths found in AWS CLI arguments.
//!
//! Every path an agent hands to the CLI (outfiles, `file://` blobs, template
//! files, `s3 cp` sources) goes through [`FileAccessPolicy::validate`] before
//! the command is spawned.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileAccessError {
    #[error("Local file access is disabled (file access mode is no-access), refusing path '{path}'")]
    NoAccess { path: String },

    #[error(
        "Path '{}' is outside the allowed working directory '{}'",
        .path.display(),
        .working_dir.display()
    )]
    OutsideWorkdir { path: PathBuf, working_dir: PathBuf },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cannot expand '~': {0}")]
    HomeUnavailable(String),

    #[error("Unknown file access mode '{0}', expected one of: workdir, unrestricted, no-access")]
    UnknownMode(String),
}

/// Where local files referenced by CLI arguments may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileAccessMode {
    /// Only paths under the working directory.
    #[default]
    Workdir,
    /// Any path the server process can reach.
    Unrestricted,
    /// No local file arguments at all.
    NoAccess,
}

impl FromStr for FileAccessMode {
    type Err = FileAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workdir" => Ok(Self::Workdir),
            "unrestricted" => Ok(Self::Unrestricted),
            "no-access" | "no_access" | "noaccess" => Ok(Self::NoAccess),
            _ => Err(FileAccessError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for FileAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Workdir => "workdir",
            Self::Unrestricted => "unrestricted",
            Self::NoAccess => "no-access",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct FileAccessPolicy {
    mode: FileAccessMode,
    working_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl FileAccessPolicy {
    pub fn new(mode: FileAccessMode, working_dir: impl Into<PathBuf>) -> Result<Self, FileAccessError> {
        Self::with_home(mode, working_dir, dirs::home_dir())
    }

    /// Same as [`FileAccessPolicy::new`] with an explicit home directory for `~` expansion.
    pub fn with_home(
        mode: FileAccessMode,
        working_dir: impl Into<PathBuf>,
        home_dir: Option<PathBuf>,
    ) -> Result<Self, FileAccessError> {
        let working_dir = working_dir.into();
        let working_dir = if working_dir.is_absolute() {
            working_dir
        } else {
            std::env::current_dir()
                .map_err(|e| FileAccessError::InvalidPath(format!("cannot read current directory: {}", e)))?
                .join(working_dir)
        };
        let working_dir = resolve_components(&working_dir)?;

        Ok(Self {
            mode,
            working_dir,
            home_dir,
        })
    }

    pub fn mode(&self) -> FileAccessMode {
        self.mode
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Turns a user supplied path into an absolute, symlink-resolved path.
    ///
    /// Relative paths are taken relative to the working directory. The file
    /// itself does not need to exist. Components are walked in order the way
    /// the kernel does, so `..` applies to the target of a symlink rather than
    /// to the link's own parent.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, FileAccessError> {
        check_raw(raw)?;
        let expanded = self.expand_home(raw)?;
        self.resolve_expanded(expanded)
    }

    /// Checks a path against the current mode and returns its resolved form.
    pub fn validate(&self, raw: &str) -> Result<PathBuf, FileAccessError> {
        if self.mode == FileAccessMode::NoAccess {
            return Err(FileAccessError::NoAccess { path: raw.to_string() });
        }
        let resolved = self.resolve(raw)?;
        self.check_contained(resolved)
    }

    /// Checks the path part of a `file://`/`fileb://` value.
    ///
    /// The CLI expands `~` and then `$VAR`/`${VAR}` in these before opening
    /// the file, so the same expansion happens here first. `~user` is refused.
    pub fn validate_blob_uri(&self, raw: &str) -> Result<PathBuf, FileAccessError> {
        self.validate_blob_uri_with(raw, |name| std::env::var(name).ok())
    }

    fn validate_blob_uri_with(
        &self,
        raw: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<PathBuf, FileAccessError> {
        if self.mode == FileAccessMode::NoAccess {
            return Err(FileAccessError::NoAccess { path: raw.to_string() });
        }
        check_raw(raw)?;

        let home_expanded = match raw.strip_prefix('~') {
            Some(rest) if !(rest.is_empty() || rest.starts_with('/')) => {
                return Err(FileAccessError::InvalidPath(format!(
                    "'{}' refers to another user's home directory",
                    raw
                )))
            }
            Some(_) => self.expand_home(raw)?.to_string_lossy().into_owned(),
            None => raw.to_string(),
        };
        let expanded = expand_env_vars(&home_expanded, lookup);
        check_raw(&expanded)?;

        let resolved = self.resolve_expanded(PathBuf::from(expanded))?;
        self.check_contained(resolved)
    }

    fn resolve_expanded(&self, expanded: PathBuf) -> Result<PathBuf, FileAccessError> {
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.working_dir.join(expanded)
        };
        resolve_components(&absolute)
    }

    fn check_contained(&self, resolved: PathBuf) -> Result<PathBuf, FileAccessError> {
        if self.mode != FileAccessMode::Workdir || resolved.starts_with(&self.working_dir) {
            return Ok(resolved);
        }
        tracing::warn!(path = %resolved.display(), "rejected path outside working directory");
        Err(FileAccessError::OutsideWorkdir {
            path: resolved,
            working_dir: self.working_dir.clone(),
        })
    }

    fn expand_home(&self, raw: &str) -> Result<PathBuf, FileAccessError> {
        let rest = match raw.strip_prefix('~') {
            Some("") => "",
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
            // `~user` and plain names starting with '~' are left alone
            _ => return Ok(PathBuf::from(raw)),
        };

        let home = self
            .home_dir
            .as_ref()
            .ok_or_else(|| FileAccessError::HomeUnavailable("home directory is unknown".to_string()))?;
        Ok(if rest.is_empty() { home.clone() } else { home.join(rest) })
    }
}

/// Whether a `s3 cp`/`mv`/`sync` operand is on the local side of the transfer.
///
/// The CLI treats every operand that does not start with `s3://` as a local
/// path, and `-` as stdin/stdout. Other kinds of path arguments are opened
/// literally and must not use this.
pub fn is_local_path(raw: &str) -> bool {
    raw != "-" && !raw.starts_with("s3://")
}

fn check_raw(raw: &str) -> Result<(), FileAccessError> {
    if raw.is_empty() {
        return Err(FileAccessError::InvalidPath("path is empty".to_string()));
    }
    if raw.contains('\0') {
        return Err(FileAccessError::InvalidPath("path contains null byte".to_string()));
    }
    Ok(())
}

/// `$NAME` and `${NAME}` substitution. Unknown variables are left as written.
fn expand_env_vars(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        if consumed == 0 {
            out.push('$');
        } else {
            match lookup(name) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[pos..pos + 1 + consumed]),
            }
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

/// Walks an absolute path one component at a time. Existing components are
/// canonicalized as they are reached, so a later `..` pops the symlink target.
/// Components past the first missing one are applied lexically.
fn resolve_components(path: &Path) -> Result<PathBuf, FileAccessError> {
    let mut resolved = PathBuf::new();
    let mut missing_depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                missing_depth = missing_depth.saturating_sub(1);
            }
            Component::Normal(name) => {
                resolved.push(name);
                if missing_depth > 0 {
                    missing_depth += 1;
                    continue;
                }
                match resolved.symlink_metadata() {
                    Ok(_) => {
                        resolved = resolved.canonicalize().map_err(|e| {
                            FileAccessError::InvalidPath(format!(
                                "'{}' cannot be resolved: {}",
                                resolved.display(),
                                e
                            ))
                        })?;
                    }
                    Err(_) => missing_depth = 1,
                }
            }
        }
    }

    Ok(resolved)
}
