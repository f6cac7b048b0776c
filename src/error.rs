use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    /// Descriptor or settings file malformed.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// A native format codec rejected its input.
    #[error("failed to decode {}: {message}", .path.display())]
    Codec { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("descriptor declares no <name>, cannot locate the iOS project")]
    MissingProjectName,

    #[error("aborted on platform '{platform}': {source}")]
    Aborted {
        platform: String,
        #[source]
        source: Box<MergeError>,
    },
}

impl MergeError {
    pub fn parse(path: impl AsRef<Path>, message: impl ToString) -> Self {
        MergeError::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn codec(path: impl AsRef<Path>, message: impl ToString) -> Self {
        MergeError::Codec {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        MergeError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
