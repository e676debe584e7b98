//! Error types for the splitter.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    /// The master document could not be opened or read.
    #[error("cannot read master document {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A section file could not be created, written or flushed.
    #[error("cannot write section file {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SplitError {
    pub(crate) fn input(path: &Path, source: io::Error) -> Self {
        SplitError::Input {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn output(path: &Path, source: io::Error) -> Self {
        SplitError::Output {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
