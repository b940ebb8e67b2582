use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// Various error types produced by the build orchestrator.
///
/// Per-project failures (parse errors, type errors, missing inputs) are *not*
/// errors in this sense: they are recorded as statuses and diagnostics and
/// stay local to the project. `BuildError` covers host IO, malformed
/// persisted state, and cancellation.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The persisted build-info artifact could not be read or understood.
    #[error("error reading build info: {0}")]
    BuildInfo(String),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Semver(#[from] semver::Error),
    #[error(transparent)]
    Io(#[from] BuildIoError),
    /// A cancellation token was observed mid-build.
    #[error("build was cancelled")]
    Cancelled,
    /// The requested sub-project is not part of the build graph.
    #[error("invalid project: {0}")]
    InvalidProject(String),
    /// General purpose message.
    #[error("{0}")]
    Message(String),
}

impl BuildError {
    pub fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        BuildIoError::new(err, path).into()
    }

    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// An IO error annotated with the path that produced it.
#[derive(Debug, Error)]
#[error("\"{}\": {io}", self.path.display())]
pub struct BuildIoError {
    io: io::Error,
    path: PathBuf,
}

impl BuildIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }

    /// The path at which the error occurred.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying `io::Error`.
    pub fn source(&self) -> &io::Error {
        &self.io
    }
}

impl From<BuildIoError> for io::Error {
    fn from(err: BuildIoError) -> Self {
        err.io
    }
}
