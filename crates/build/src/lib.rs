//! Orchestrates incremental builds across a graph of referenced projects.
//!
//! A *project* is a configuration file enumerating input sources, compiler
//! options and references to other projects. Building a set of root projects
//! is performed in several steps.
//!
//! First the transitive reference graph is resolved through the
//! [config cache](crate::config) and ordered leaves-first by the
//! [graph builder](crate::graph); reference cycles are reported once and do
//! not abort the walk.
//!
//! At this point we check for every project whether its on-disk outputs can
//! be reused. A project does not need to be rebuilt if:
//!     - every output is newer than every input
//!     - its configuration (and everything it extends) predates the outputs
//!     - no upstream project produced newer declaration content
//!     - its persisted build-info was written by the current compiler
//!
//! The evaluator folds these checks into an
//! [`UpToDateStatus`]; anything short of up to date is turned by the
//! invalidated-project factory into one of three actions: a full
//! [`Build`](InvalidatedProjectKind::Build), a bundle-only
//! [`UpdateBundle`](InvalidatedProjectKind::UpdateBundle) driven by persisted
//! build-info, or a timestamp-only
//! [`UpdateOutputFileStamps`](InvalidatedProjectKind::UpdateOutputFileStamps)
//! when upstream declaration contents did not change.
//!
//! The final step is the [`SolutionBuilder`] draining the pending queue
//! in build order, delegating actual compilation to the host's
//! [`Program`](crate::host::Program) and propagating consequences to
//! downstream projects. In watch mode the watcher wiring re-enqueues
//! projects on file events and re-enters the driver through a debounced
//! host timer.
//!
//! The engine is strictly sequential and single-threaded; all state lives in
//! one [`SolutionBuilder`] passed by reference into every operation.

#[macro_use]
extern crate tracing;

mod builder;
mod cache;
pub mod config;
pub mod graph;
pub mod host;
mod invalidated;
pub mod report;
mod status;
mod watch;

pub use builder::{BuildResultFlags, BuildStep, ExitStatus, SolutionBuilder};
pub use cache::ModuleResolutionCache;
pub use config::{BuildOptions, ProjectKey, ResolvedConfigPath};
pub use graph::BuildOrder;
pub use host::{
    BuildHost, CancellationToken, EmitResult, EmittedFile, Program, ProgramDescription, TimerId,
    WatchHost, WatcherId,
};
pub use invalidated::{InvalidatedProject, InvalidatedProjectKind, ReloadLevel};
pub use report::{ConsoleReporter, ReportSink};
pub use status::{UpToDateDetail, UpToDateStatus};

pub use tsbuild_artifacts as artifacts;
pub use tsbuild_core::error::{BuildError, Result};
