//! The seam between the orchestrator and its environment: file system,
//! clock, config parser and the compiler pipeline.
//!
//! File-system methods have default bodies over `std::fs`, so a production
//! host only has to supply the compiler front end. Test hosts override
//! everything and run against an in-memory tree.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};
use tsbuild_artifacts::{CompilerOptions, Diagnostic, ParsedConfig, ProjectReference};
use tsbuild_core::{
    error::{BuildError, Result},
    utils,
};

/// Everything the engine needs from its environment.
pub trait BuildHost {
    /// The compiler-side program produced by [`create_program`](Self::create_program).
    type Program: Program;

    /// Version of the compiler behind this host; gates reuse of persisted
    /// build-info.
    fn compiler_version(&self) -> semver::Version;

    /// Parses a project configuration file, applying `base` options
    /// underneath the file's own. Returns the first unrecoverable diagnostic
    /// when the file cannot be used at all.
    fn parse_config_file(
        &self,
        path: &Path,
        base: &CompilerOptions,
    ) -> std::result::Result<ParsedConfig, Diagnostic>;

    /// Creates a program for one project. `old_program` is the retained
    /// program from the previous watch-mode build of the same project.
    fn create_program(
        &mut self,
        description: ProgramDescription<'_>,
        old_program: Option<Self::Program>,
    ) -> Self::Program;

    /// Regenerates the non-declaration outputs of a project from its
    /// persisted build-info, without creating a program. Returns `None` when
    /// the build-info is missing or unreadable; the caller falls back to a
    /// full build.
    fn emit_using_build_info(
        &mut self,
        config: &ParsedConfig,
        config_path: &Path,
    ) -> Option<EmitResult>;

    fn use_case_sensitive_file_names(&self) -> bool {
        !cfg!(windows)
    }

    fn current_directory(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_default()
    }

    /// The clock used for output timestamps. Injectable so tests can verify
    /// `set_modified_time` behavior deterministically.
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|err| BuildError::io(err, path))
    }

    fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).map_err(|err| BuildError::io(err, path))
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|err| BuildError::io(err, path))
    }

    fn modified_time(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok()?.modified().ok()
    }

    fn set_modified_time(&self, path: &Path, time: SystemTime) -> Result<()> {
        let file = fs::OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|err| BuildError::io(err, path))?;
        file.set_modified(time).map_err(|err| BuildError::io(err, path))
    }

    /// Enumerates the source files under `dir`, used to re-expand wildcard
    /// inputs on a `Partial` reload.
    fn read_directory(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        let mut walker = walkdir::WalkDir::new(dir);
        if !recursive {
            walker = walker.max_depth(1);
        }
        walker
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| utils::is_source_file(path))
            .collect()
    }
}

/// The inputs handed to the compiler for one project.
#[derive(Clone, Copy, Debug)]
pub struct ProgramDescription<'a> {
    /// Resolved path of the project's configuration file.
    pub project: &'a Path,
    pub root_names: &'a [PathBuf],
    pub options: &'a CompilerOptions,
    /// Recoverable diagnostics recorded while the configuration was parsed.
    pub config_errors: &'a [Diagnostic],
    pub references: &'a [ProjectReference],
}

/// A compiled (or partially compiled) project, owned by the compiler side.
///
/// Diagnostics are polled in stages; the driver stops at the first non-empty
/// stage. `backup_state`/`restore_state` bracket declaration emit so a failed
/// emit leaves no trace; programs whose emit is idempotent may implement both
/// as no-ops.
pub trait Program {
    fn config_file_diagnostics(&self) -> Vec<Diagnostic>;
    fn options_diagnostics(&self) -> Vec<Diagnostic>;
    fn global_diagnostics(&self) -> Vec<Diagnostic>;
    fn syntactic_diagnostics(&self) -> Vec<Diagnostic>;
    fn semantic_diagnostics(
        &mut self,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>>;

    fn backup_state(&mut self) {}
    fn restore_state(&mut self) {}

    /// Emits every output into an in-memory list. Nothing is written to disk
    /// here; the driver owns the write-or-skip decision per file.
    fn emit(&mut self, cancellation: Option<&CancellationToken>) -> Result<EmitResult>;

    /// Drops expensive internal state once the engine no longer needs the
    /// program.
    fn release(&mut self) {}
}

/// In-memory result of emitting a program.
#[derive(Clone, Debug, Default)]
pub struct EmitResult {
    pub files: Vec<EmittedFile>,
    /// Diagnostics produced while generating declaration outputs.
    pub declaration_diagnostics: Vec<Diagnostic>,
    /// Diagnostics produced by the emitter itself.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug)]
pub struct EmittedFile {
    pub path: PathBuf,
    pub text: String,
}

impl EmittedFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self { path: path.into(), text: text.into() }
    }
}

/// Host capabilities needed only in watch mode.
///
/// The host owns the actual watcher primitive and the timer; it reports
/// events back by calling [`SolutionBuilder::file_changed`] and
/// [`SolutionBuilder::timeout_fired`] on the same thread.
///
/// [`SolutionBuilder::file_changed`]: crate::SolutionBuilder::file_changed
/// [`SolutionBuilder::timeout_fired`]: crate::SolutionBuilder::timeout_fired
pub trait WatchHost: BuildHost {
    fn watch_file(&mut self, path: &Path) -> WatcherId;
    fn watch_directory(&mut self, path: &Path, recursive: bool) -> WatcherId;
    fn unwatch(&mut self, id: WatcherId);

    fn set_timeout(&mut self, delay: Duration) -> TimerId;
    fn clear_timeout(&mut self, id: TimerId);
}

/// Opaque handle for an installed watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatcherId(pub u64);

/// Opaque handle for a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Cooperative cancellation signal polled between projects and inside the
/// compiler. Observing a cancelled token surfaces as
/// [`BuildError::Cancelled`] and unwinds the current entry point; engine
/// state stays valid for a later retry.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FsOnlyHost;

    struct InertProgram;

    impl Program for InertProgram {
        fn config_file_diagnostics(&self) -> Vec<Diagnostic> {
            Vec::new()
        }

        fn options_diagnostics(&self) -> Vec<Diagnostic> {
            Vec::new()
        }

        fn global_diagnostics(&self) -> Vec<Diagnostic> {
            Vec::new()
        }

        fn syntactic_diagnostics(&self) -> Vec<Diagnostic> {
            Vec::new()
        }

        fn semantic_diagnostics(
            &mut self,
            _cancellation: Option<&CancellationToken>,
        ) -> Result<Vec<Diagnostic>> {
            Ok(Vec::new())
        }

        fn emit(&mut self, _cancellation: Option<&CancellationToken>) -> Result<EmitResult> {
            Ok(EmitResult::default())
        }
    }

    impl BuildHost for FsOnlyHost {
        type Program = InertProgram;

        fn compiler_version(&self) -> semver::Version {
            semver::Version::new(1, 0, 0)
        }

        fn parse_config_file(
            &self,
            path: &Path,
            _base: &CompilerOptions,
        ) -> std::result::Result<ParsedConfig, Diagnostic> {
            Err(Diagnostic::error_at(path, 0, "no parser in this host"))
        }

        fn create_program(
            &mut self,
            _description: ProgramDescription<'_>,
            _old_program: Option<InertProgram>,
        ) -> InertProgram {
            InertProgram
        }

        fn emit_using_build_info(
            &mut self,
            _config: &ParsedConfig,
            _config_path: &Path,
        ) -> Option<EmitResult> {
            None
        }
    }

    #[test]
    fn default_fs_methods_use_the_real_file_system() {
        let host = FsOnlyHost;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");

        host.write_file(&file, "export {};\n").unwrap();
        assert!(host.file_exists(&file));
        assert!(host.directory_exists(dir.path()));
        assert_eq!(host.read_file(&file).as_deref(), Some("export {};\n"));
        assert_eq!(host.read_directory(dir.path(), true), vec![file.clone()]);

        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        host.set_modified_time(&file, stamp).unwrap();
        assert_eq!(host.modified_time(&file), Some(stamp));

        host.delete_file(&file).unwrap();
        assert!(!host.file_exists(&file));
    }

    #[test]
    fn cancellation_token_reports_through_check() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(BuildError::Cancelled)));
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
