use std::path::{Path, PathBuf};

use egp_protocol::duration::DurationError;
use thiserror::Error;

/// Why a revocation rule set could not be installed.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("no revocation rules at {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read revocation rules at {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a revocation rule set: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
    #[error("revocation rule `{id}` is defined more than once")]
    DuplicateRule { id: String },
    #[error("revocation rule `{id}` has an empty condition")]
    EmptyCondition { id: String },
    #[error("revocation rule `{id}` has an unusable check frequency")]
    InvalidFrequency {
        id: String,
        #[source]
        source: DurationError,
    },
}

impl RuleError {
    pub(crate) fn unreadable(path: &Path, source: std::io::Error) -> Self {
        RuleError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}
