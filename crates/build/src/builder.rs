//! The build driver.
//!
//! [`SolutionBuilder`] owns every piece of engine state and drives the
//! per-project actions in build order: it drains the pending queue through
//! the invalidated-project factory, executes builds/bundle updates/timestamp
//! bumps, and propagates the consequences of a finished build to the
//! projects that reference it. Errors stay local to their project; the
//! overall exit status only reflects whether any project failed.

use crate::{
    cache::{CachedHost, ModuleResolutionCache},
    config::{BuildOptions, ConfigCache, ConfigEntry, ProjectKey, ResolvedConfigPath},
    graph::BuildOrder,
    host::{BuildHost, CancellationToken, Program, ProgramDescription},
    invalidated::ReloadLevel,
    report::{ConsoleReporter, ReportSink, Reporter},
    status::{UpToDateDetail, UpToDateStatus},
    watch::WatchState,
};
use std::{
    collections::{HashMap, HashSet},
    ops::{BitOr, BitOrAssign},
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tsbuild_artifacts::{output, CompilerOptions, Diagnostic, ParsedConfig};
use tsbuild_core::{
    error::{BuildError, Result},
    utils,
};

/// Bit set describing how a per-project action finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildResultFlags(u16);

impl BuildResultFlags {
    pub const NONE: Self = Self(0);
    /// The action ran to completion and its outputs are on disk.
    pub const SUCCESS: Self = Self(1 << 0);
    /// Declaration outputs are byte-identical to the previous build.
    pub const DECLARATION_OUTPUT_UNCHANGED: Self = Self(1 << 1);
    pub const CONFIG_FILE_ERRORS: Self = Self(1 << 2);
    pub const SYNTAX_ERRORS: Self = Self(1 << 3);
    pub const TYPE_ERRORS: Self = Self(1 << 4);
    pub const DECLARATION_EMIT_ERRORS: Self = Self(1 << 5);
    pub const EMIT_ERRORS: Self = Self(1 << 6);

    const ANY_ERRORS: Self = Self(
        Self::CONFIG_FILE_ERRORS.0
            | Self::SYNTAX_ERRORS.0
            | Self::TYPE_ERRORS.0
            | Self::DECLARATION_EMIT_ERRORS.0
            | Self::EMIT_ERRORS.0,
    );

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn has_errors(self) -> bool {
        self.0 & Self::ANY_ERRORS.0 != 0
    }
}

impl BitOr for BuildResultFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BuildResultFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Overall outcome of a `build` or `clean` invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Some projects failed and none produced outputs.
    DiagnosticsPresentOutputsSkipped,
    /// Some projects failed but others produced outputs.
    DiagnosticsPresentOutputsGenerated,
    /// The requested sub-project is not part of the build graph.
    InvalidProjectOutputsSkipped,
}

/// Outcome of a single driver step.
#[derive(Clone, Debug)]
pub struct BuildStep {
    pub project: ResolvedConfigPath,
    pub result: BuildResultFlags,
}

/// Drives incremental builds over a graph of referenced projects.
///
/// All engine state lives here and is mutated from a single thread; watcher
/// and timer callbacks re-enter through [`file_changed`] and
/// [`timeout_fired`] between driver steps, never during one.
///
/// [`file_changed`]: Self::file_changed
/// [`timeout_fired`]: Self::timeout_fired
pub struct SolutionBuilder<H: BuildHost> {
    pub(crate) host: CachedHost<H>,
    pub(crate) options: BuildOptions,
    pub(crate) base_options: CompilerOptions,
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) cwd: PathBuf,
    pub(crate) reporter: Reporter,
    pub(crate) configs: ConfigCache,
    pub(crate) statuses: HashMap<ProjectKey, UpToDateStatus>,
    pub(crate) pending: HashMap<ProjectKey, ReloadLevel>,
    /// Memoized full build order; cleared by `Full` invalidations.
    pub(crate) order: Option<Arc<BuildOrder>>,
    /// Sub-order of the in-flight `build()` invocation.
    pub(crate) current: Option<Arc<BuildOrder>>,
    /// Every project still awaits its initial enqueue.
    pub(crate) initial_build_pending: bool,
    pub(crate) build_info_checked: HashSet<ProjectKey>,
    /// Programs retained between watch-mode builds of the same project.
    pub(crate) programs: HashMap<ProjectKey, H::Program>,
    pub(crate) resolution_cache: ModuleResolutionCache,
    pub(crate) watch: WatchState,
}

impl<H: BuildHost> SolutionBuilder<H> {
    pub fn new(
        host: H,
        roots: impl IntoIterator<Item = impl Into<PathBuf>>,
        options: BuildOptions,
        base_options: CompilerOptions,
    ) -> Self {
        let sink = Box::new(ConsoleReporter::new(options.pretty));
        Self::with_reporter(host, roots, options, base_options, sink)
    }

    pub fn with_reporter(
        host: H,
        roots: impl IntoIterator<Item = impl Into<PathBuf>>,
        options: BuildOptions,
        base_options: CompilerOptions,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        let cwd = host.current_directory();
        let case_sensitive = host.use_case_sensitive_file_names();
        Self {
            host: CachedHost::new(host),
            reporter: Reporter::new(sink, options.verbose),
            options,
            base_options,
            roots: roots.into_iter().map(Into::into).collect(),
            cwd,
            configs: ConfigCache::new(case_sensitive),
            statuses: HashMap::new(),
            pending: HashMap::new(),
            order: None,
            current: None,
            initial_build_pending: true,
            build_info_checked: HashSet::new(),
            programs: HashMap::new(),
            resolution_cache: ModuleResolutionCache::default(),
            watch: WatchState::default(),
        }
    }

    pub fn host(&self) -> &H {
        self.host.inner()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.host.inner_mut()
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn resolution_cache(&self) -> &ModuleResolutionCache {
        &self.resolution_cache
    }

    pub fn has_pending_work(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Builds the requested sub-project (or every root) in dependency order.
    ///
    /// Returns `Err` only for host IO failures and cancellation; per-project
    /// compile errors are reported, stored and reflected in the exit status.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build(
        &mut self,
        project: Option<&Path>,
        cancellation: Option<&CancellationToken>,
    ) -> Result<ExitStatus> {
        let order = match self.build_order_for(project) {
            Ok(order) => order,
            Err(BuildError::InvalidProject(name)) => {
                self.reporter
                    .report_status(&format!("Project '{name}' is not part of the build graph"));
                return Ok(ExitStatus::InvalidProjectOutputsSkipped);
            }
            Err(err) => return Err(err),
        };
        if let Some(token) = cancellation {
            token.check()?;
        }
        self.current = Some(order.clone());
        self.host.enable_cache();
        self.seed_initial_build();

        let mut any_succeeded = false;
        let mut any_failed = false;
        loop {
            let Some(invalidated) = self.get_next_invalidated_project() else { break };
            let result = invalidated.done(cancellation)?;
            if result.has_errors() {
                any_failed = true;
            } else if result.contains(BuildResultFlags::SUCCESS) {
                any_succeeded = true;
            }
        }

        self.current = None;
        self.host.disable_cache();
        self.resolution_cache.clear();

        let projects: Vec<_> =
            order.projects().iter().map(|p| (p.clone(), self.configs.key(p))).collect();
        let errors = self.reporter.summary(&projects, self.options.watch);
        self.watch.needs_summary = false;

        Ok(if any_failed || errors > 0 {
            if any_succeeded {
                ExitStatus::DiagnosticsPresentOutputsGenerated
            } else {
                ExitStatus::DiagnosticsPresentOutputsSkipped
            }
        } else {
            ExitStatus::Success
        })
    }

    /// Runs a single driver step: dequeues the next invalidated project and
    /// performs its action. Returns `None` when nothing is pending.
    pub fn build_next_project(
        &mut self,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<BuildStep>> {
        let Some(invalidated) = self.get_next_invalidated_project() else { return Ok(None) };
        let project = invalidated.project().clone();
        let result = invalidated.done(cancellation)?;
        Ok(Some(BuildStep { project, result }))
    }

    /// Deletes every enumerable output of the reachable projects, or lists
    /// them under `dry`. Cleaned projects are left pending so a subsequent
    /// build rebuilds them.
    pub fn clean(&mut self, project: Option<&Path>) -> Result<ExitStatus> {
        let order = match self.build_order_for(project) {
            Ok(order) => order,
            Err(BuildError::InvalidProject(name)) => {
                self.reporter
                    .report_status(&format!("Project '{name}' is not part of the build graph"));
                return Ok(ExitStatus::InvalidProjectOutputsSkipped);
            }
            Err(err) => return Err(err),
        };

        let mut listed = Vec::new();
        for project in order.projects() {
            let key = self.configs.key(project);
            let ConfigEntry::Parsed(config) = self.parsed_config(project) else { continue };
            let mut cleaned_any = false;
            for output in output::project_outputs(&config, project.as_path()) {
                if !self.host.file_exists(&output) {
                    continue;
                }
                if self.options.dry {
                    listed.push(output);
                } else {
                    trace!(file = %output.display(), "deleting output");
                    self.host.delete_file(&output)?;
                    cleaned_any = true;
                }
            }
            if cleaned_any {
                self.statuses.remove(&key);
                self.enqueue(key, ReloadLevel::None);
            }
        }

        if self.options.dry && !listed.is_empty() {
            let files = listed.iter().map(|f| format!("\r\n * {}", f.display())).collect::<String>();
            self.reporter
                .report_status(&format!("A non-dry build would delete the following files:{files}"));
        }
        Ok(ExitStatus::Success)
    }

    /// Seeds every project's pending entry once per builder lifetime; later
    /// passes only see what invalidation re-enqueued.
    pub(crate) fn seed_initial_build(&mut self) {
        if !self.initial_build_pending {
            return;
        }
        self.initial_build_pending = false;
        let order = self.build_order();
        for project in order.projects() {
            let key = self.configs.key(project);
            self.enqueue(key, ReloadLevel::None);
        }
    }

    /// Resolves a project name the way `build` does.
    pub fn resolve_project(&self, name: &Path) -> ResolvedConfigPath {
        self.configs.resolve(name, &self.cwd)
    }

    /// The canonical key of a project, as used by the engine's maps.
    pub fn project_key(&mut self, name: &Path) -> ProjectKey {
        let resolved = self.resolve_project(name);
        self.configs.key(&resolved)
    }

    /// Parses (or recalls) the configuration of `project`.
    pub(crate) fn parsed_config(&mut self, project: &ResolvedConfigPath) -> ConfigEntry {
        let key = self.configs.key(project);
        if let Some(entry) = self.configs.get(&key) {
            return entry;
        }
        let entry = match self.host.inner().parse_config_file(project.as_path(), &self.base_options)
        {
            Ok(parsed) => ConfigEntry::Parsed(Arc::new(parsed)),
            Err(diagnostic) => ConfigEntry::Failed(Arc::new(diagnostic)),
        };
        trace!(project = %project, "parsed project configuration");
        self.configs.insert(key, entry.clone());
        entry
    }

    /// The order the driver currently walks: the in-flight sub-order during
    /// `build()`, the full order otherwise.
    pub(crate) fn current_order(&mut self) -> Arc<BuildOrder> {
        match &self.current {
            Some(order) => order.clone(),
            None => self.build_order(),
        }
    }

    pub(crate) fn canonical(&self, path: &Path) -> String {
        utils::canonical_key(&utils::normalize_path(path), self.configs.case_sensitive())
    }

    /// Clears the cached status and schedules the project for
    /// re-processing; the reload level only ever rises.
    pub fn invalidate_project(&mut self, key: &ProjectKey, level: ReloadLevel) {
        debug!(%key, ?level, "invalidating project");
        self.statuses.remove(key);
        if level == ReloadLevel::Full {
            self.order = None;
        }
        self.watch.needs_summary = true;
        self.watch.announced = false;
        self.enqueue(key.clone(), level);
    }

    /// Runs the full compiler pipeline for one project.
    #[tracing::instrument(level = "debug", skip_all, fields(project = %project))]
    pub(crate) fn build_project(
        &mut self,
        project: &ResolvedConfigPath,
        key: &ProjectKey,
        config: &Arc<ParsedConfig>,
        cancellation: Option<&CancellationToken>,
    ) -> Result<BuildResultFlags> {
        if config.file_names.is_empty() {
            self.pending.remove(key);
            return Ok(BuildResultFlags::NONE);
        }
        self.reporter.verbose_status(&format!("Building project '{project}'..."));

        self.resolution_cache.install_options(&config.options);
        self.resolution_cache.begin_project(key);

        let old_program = self.programs.remove(key);
        let description = ProgramDescription {
            project: project.as_path(),
            root_names: &config.file_names,
            options: &config.options,
            config_errors: &config.errors,
            references: &config.references,
        };
        let mut program = self.host.inner_mut().create_program(description, old_program);

        if self.options.list_files {
            for file in &config.file_names {
                self.reporter.report_status(&file.display().to_string());
            }
        }

        // Diagnostics are staged; the first non-empty stage aborts the build.
        let config_diagnostics = program.config_file_diagnostics();
        let has_config_errors = !config_diagnostics.is_empty() || config.has_errors();
        let mut first_stage = config_diagnostics;
        first_stage.extend(program.options_diagnostics());
        first_stage.extend(program.global_diagnostics());
        first_stage.extend(program.syntactic_diagnostics());
        if !first_stage.is_empty() {
            let flags = if has_config_errors {
                BuildResultFlags::CONFIG_FILE_ERRORS | BuildResultFlags::SYNTAX_ERRORS
            } else {
                BuildResultFlags::SYNTAX_ERRORS
            };
            return self.build_failed(key, program, first_stage, flags, "syntactic errors");
        }

        let semantic = program.semantic_diagnostics(cancellation)?;
        if !semantic.is_empty() {
            return self.build_failed(
                key,
                program,
                semantic,
                BuildResultFlags::TYPE_ERRORS,
                "semantic errors",
            );
        }

        // Emit in memory; a failed declaration emit must leave no trace in
        // the program.
        program.backup_state();
        let emit = program.emit(cancellation)?;
        if !emit.declaration_diagnostics.is_empty() {
            program.restore_state();
            return self.build_failed(
                key,
                program,
                emit.declaration_diagnostics,
                BuildResultFlags::DECLARATION_EMIT_ERRORS,
                "declaration file errors",
            );
        }

        let outputs = output::project_outputs(config, project.as_path());
        let first_output = outputs.first().cloned();

        let mut newest_declaration_change_time = None;
        let mut declaration_changed = false;
        let mut emitted = HashSet::new();
        for file in &emit.files {
            let is_declaration = utils::is_declaration_file(&file.path);
            if is_declaration {
                if let Some(existing) = self.host.read_file(&file.path) {
                    if existing.as_str() == file.text {
                        // identical declaration output, keep its timestamp
                        if let Some(time) = self.host.modified_time(&file.path) {
                            newest_declaration_change_time =
                                newer(newest_declaration_change_time, time);
                        }
                        emitted.insert(self.canonical(&file.path));
                        continue;
                    }
                }
                declaration_changed = true;
            }
            if let Some(parent) = file.path.parent() {
                if !self.host.directory_exists(parent) {
                    self.host.create_directory(parent)?;
                }
            }
            self.host.write_file(&file.path, &file.text)?;
            if self.options.list_emitted_files {
                self.reporter.report_status(&format!("TSFILE: {}", file.path.display()));
            }
            emitted.insert(self.canonical(&file.path));
        }

        if !emit.diagnostics.is_empty() {
            return self.build_failed(
                key,
                program,
                emit.diagnostics,
                BuildResultFlags::EMIT_ERRORS,
                "emit errors",
            );
        }

        // Outputs the emitter skipped still move forward in time.
        let now = self.host.now();
        for output in &outputs {
            if emitted.contains(&self.canonical(output)) {
                continue;
            }
            if !self.host.file_exists(output) {
                continue;
            }
            if utils::is_declaration_file(output) {
                if let Some(time) = self.host.modified_time(output) {
                    newest_declaration_change_time = newer(newest_declaration_change_time, time);
                }
            }
            self.host.set_modified_time(output, now)?;
        }

        let mut result = BuildResultFlags::SUCCESS;
        if !declaration_changed {
            result |= BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED;
        }
        // Changed declaration content must force downstream bundles to
        // rebuild, whatever their output times say.
        let newest_declaration_change_time = if declaration_changed {
            Some(utils::maximum_date())
        } else {
            newest_declaration_change_time
        };
        self.statuses.insert(
            key.clone(),
            UpToDateStatus::UpToDate(UpToDateDetail {
                newest_input_time: None,
                newest_input: None,
                newest_declaration_change_time,
                oldest_output: first_output,
                newest_output: None,
                newest_output_time: None,
            }),
        );
        self.reporter.clear(key);
        self.pending.remove(key);
        self.retain_or_release(key, program);
        Ok(result)
    }

    /// Regenerates the non-declaration outputs from persisted build-info;
    /// falls back to a full build when the build-info is unusable.
    #[tracing::instrument(level = "debug", skip_all, fields(project = %project))]
    pub(crate) fn update_bundle(
        &mut self,
        project: &ResolvedConfigPath,
        key: &ProjectKey,
        config: &Arc<ParsedConfig>,
        cancellation: Option<&CancellationToken>,
    ) -> Result<BuildResultFlags> {
        self.resolution_cache.install_options(&config.options);
        self.resolution_cache.begin_project(key);

        let Some(emit) = self.host.inner_mut().emit_using_build_info(config, project.as_path())
        else {
            debug!(project = %project, "build info unusable, falling back to a full build");
            return self.build_project(project, key, config, cancellation);
        };

        let mut emitted = HashSet::new();
        for file in &emit.files {
            // bundle updates never touch declarations
            if utils::is_declaration_file(&file.path) {
                continue;
            }
            if let Some(parent) = file.path.parent() {
                if !self.host.directory_exists(parent) {
                    self.host.create_directory(parent)?;
                }
            }
            self.host.write_file(&file.path, &file.text)?;
            if self.options.list_emitted_files {
                self.reporter.report_status(&format!("TSFILE: {}", file.path.display()));
            }
            emitted.insert(self.canonical(&file.path));
        }

        if !emit.diagnostics.is_empty() {
            self.reporter.store_and_report(key, emit.diagnostics);
            self.statuses
                .insert(key.clone(), UpToDateStatus::Unbuildable { reason: "emit errors".into() });
            self.pending.remove(key);
            return Ok(BuildResultFlags::EMIT_ERRORS);
        }

        let outputs = output::project_outputs(config, project.as_path());
        let first_output = outputs.first().cloned();
        let now = self.host.now();
        let mut newest_declaration_change_time = None;
        for output in &outputs {
            if utils::is_declaration_file(output) {
                if let Some(time) = self.host.modified_time(output) {
                    newest_declaration_change_time = newer(newest_declaration_change_time, time);
                }
                continue;
            }
            if emitted.contains(&self.canonical(output)) {
                continue;
            }
            if self.host.file_exists(output) {
                self.host.set_modified_time(output, now)?;
            }
        }

        self.statuses.insert(
            key.clone(),
            UpToDateStatus::UpToDate(UpToDateDetail {
                newest_input_time: None,
                newest_input: None,
                newest_declaration_change_time,
                oldest_output: first_output,
                newest_output: None,
                newest_output_time: None,
            }),
        );
        self.reporter.clear(key);
        self.pending.remove(key);
        Ok(BuildResultFlags::SUCCESS | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED)
    }

    /// Touches every existing output to `now`; used when upstream types did
    /// not actually change.
    pub(crate) fn update_output_timestamps(
        &mut self,
        project: &ResolvedConfigPath,
        key: &ProjectKey,
        config: &Arc<ParsedConfig>,
    ) -> Result<BuildResultFlags> {
        self.reporter
            .verbose_status(&format!("Updating output timestamps of project '{project}'..."));
        let outputs = output::project_outputs(config, project.as_path());
        let now = self.host.now();
        let mut newest_declaration_change_time = None;
        for output in &outputs {
            if utils::is_declaration_file(output) {
                if let Some(time) = self.host.modified_time(output) {
                    newest_declaration_change_time = newer(newest_declaration_change_time, time);
                }
            }
            if self.host.file_exists(output) {
                self.host.set_modified_time(output, now)?;
            }
        }
        self.statuses.insert(
            key.clone(),
            UpToDateStatus::UpToDate(UpToDateDetail {
                newest_input_time: None,
                newest_input: None,
                newest_declaration_change_time,
                oldest_output: outputs.first().cloned(),
                newest_output: None,
                newest_output_time: None,
            }),
        );
        self.reporter.clear(key);
        self.pending.remove(key);
        Ok(BuildResultFlags::SUCCESS | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED)
    }

    /// Re-enqueues the composite projects that reference the just-built one,
    /// adjusting their cached statuses to reflect what the build changed.
    /// Only called when the build finished without errors.
    pub(crate) fn queue_referencing_projects(
        &mut self,
        project: &ResolvedConfigPath,
        key: &ProjectKey,
        result: BuildResultFlags,
    ) {
        let declaration_unchanged = result.contains(BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED);
        let order = self.current_order();
        let mut seen_built = false;
        for downstream in order.projects() {
            let downstream_key = self.configs.key(downstream);
            if !seen_built {
                if downstream_key == *key {
                    seen_built = true;
                }
                continue;
            }
            let ConfigEntry::Parsed(config) = self.parsed_config(downstream) else { continue };
            if !config.options.is_composite() {
                continue;
            }
            for reference in &config.references {
                let upstream = self.resolve_reference(downstream, &reference.path);
                if self.configs.key(&upstream) != *key {
                    continue;
                }
                match self.statuses.get(&downstream_key).cloned() {
                    Some(UpToDateStatus::UpToDate(detail)) if declaration_unchanged => {
                        let status = if reference.prepend {
                            UpToDateStatus::OutOfDateWithPrepend {
                                out_of_date_output: detail.oldest_output.unwrap_or_default(),
                                newer_project: project.clone(),
                            }
                        } else {
                            UpToDateStatus::UpToDateWithUpstreamTypes(detail)
                        };
                        self.statuses.insert(downstream_key.clone(), status);
                    }
                    Some(UpToDateStatus::UpToDate(detail))
                    | Some(UpToDateStatus::UpToDateWithUpstreamTypes(detail))
                        if !declaration_unchanged =>
                    {
                        self.statuses.insert(
                            downstream_key.clone(),
                            UpToDateStatus::OutOfDateWithUpstream {
                                out_of_date_output: detail.oldest_output.unwrap_or_default(),
                                newer_project: project.clone(),
                            },
                        );
                    }
                    Some(UpToDateStatus::OutOfDateWithPrepend { out_of_date_output, .. })
                        if !declaration_unchanged =>
                    {
                        self.statuses.insert(
                            downstream_key.clone(),
                            UpToDateStatus::OutOfDateWithUpstream {
                                out_of_date_output,
                                newer_project: project.clone(),
                            },
                        );
                    }
                    Some(UpToDateStatus::UpstreamBlocked { upstream_project }) => {
                        if self.configs.key(&upstream_project) == *key {
                            self.statuses.remove(&downstream_key);
                        }
                    }
                    _ => {}
                }
                debug!(downstream = %downstream, "queueing downstream project");
                self.enqueue(downstream_key.clone(), ReloadLevel::None);
                break;
            }
        }
    }

    fn build_failed(
        &mut self,
        key: &ProjectKey,
        program: H::Program,
        diagnostics: Vec<Diagnostic>,
        flags: BuildResultFlags,
        reason: &str,
    ) -> Result<BuildResultFlags> {
        self.reporter.store_and_report(key, diagnostics);
        self.statuses
            .insert(key.clone(), UpToDateStatus::Unbuildable { reason: reason.to_owned() });
        self.pending.remove(key);
        self.retain_or_release(key, program);
        Ok(flags)
    }

    fn retain_or_release(&mut self, key: &ProjectKey, mut program: H::Program) {
        if self.options.watch {
            self.programs.insert(key.clone(), program);
        } else {
            program.release();
        }
    }
}

fn newer(current: Option<SystemTime>, candidate: SystemTime) -> Option<SystemTime> {
    Some(current.map_or(candidate, |time| time.max(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_classify() {
        let flags = BuildResultFlags::SUCCESS | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED;
        assert!(flags.contains(BuildResultFlags::SUCCESS));
        assert!(!flags.has_errors());

        let mut failed = BuildResultFlags::NONE;
        failed |= BuildResultFlags::TYPE_ERRORS;
        assert!(failed.has_errors());
        assert!(!failed.contains(BuildResultFlags::SUCCESS));
    }
}
