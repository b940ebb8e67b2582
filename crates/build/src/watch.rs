//! Watch-mode wiring: per-project watchers, event classification and the
//! debounced re-entry into the driver.
//!
//! Three watcher sets exist per project: the configuration file (`Full`
//! reload on change), its wildcard directories (`Partial` reload, after
//! filtering out outputs and non-source files) and its input files (plain
//! invalidation). Events coalesce through a single host timer re-armed on
//! every invalidation; when it fires, one invalidated project is drained and
//! the timer re-arms until the queue runs dry.

use crate::{
    builder::SolutionBuilder,
    config::{ConfigEntry, ProjectKey, ResolvedConfigPath},
    host::{BuildHost, CancellationToken, TimerId, WatchHost, WatcherId},
    invalidated::ReloadLevel,
    ExitStatus,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};
use tsbuild_artifacts::{ParsedConfig, WildcardDirectory};
use tsbuild_core::error::Result;

const BUILD_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
pub(crate) struct WatchState {
    pub(crate) started: bool,
    pub(crate) watchers: HashMap<ProjectKey, ProjectWatchers>,
    /// Projects whose watchers must be rewired once the current drain step
    /// finishes (set when a reload level was applied).
    pub(crate) pending_rewire: HashMap<ProjectKey, ReloadLevel>,
    pub(crate) timer: Option<TimerId>,
    pub(crate) needs_summary: bool,
    /// Whether the "compilation starting" line went out for the current
    /// batch of invalidations.
    pub(crate) announced: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ProjectWatchers {
    pub(crate) config: Option<(PathBuf, WatcherId)>,
    pub(crate) wildcards: Vec<(WildcardDirectory, WatcherId)>,
    pub(crate) inputs: Vec<(PathBuf, WatcherId)>,
}

impl<H: BuildHost> SolutionBuilder<H> {
    /// Records that a project's watchers must be rebuilt after its reload
    /// level was applied. No-op until watching has started.
    pub(crate) fn request_watcher_rewire(&mut self, key: &ProjectKey, level: ReloadLevel) {
        if !self.watch.started {
            return;
        }
        let entry = self.watch.pending_rewire.entry(key.clone()).or_insert(level);
        if *entry < level {
            *entry = level;
        }
    }

    /// Classifies a wildcard-directory event: outputs and files the
    /// compiler would never read cannot invalidate the project.
    fn is_ignored_wildcard_candidate(&self, key: &ProjectKey, path: &Path) -> bool {
        let name = path.to_string_lossy();
        let source_like = name.ends_with(".ts") || name.ends_with(".tsx");
        if !source_like {
            return true;
        }
        match self.configs.get(key) {
            Some(ConfigEntry::Parsed(config)) => self.is_output_file(&config, path),
            _ => false,
        }
    }

    /// Whether `path` is an output of the project. Emit is always enabled
    /// for the projects this engine drives, so the check is purely
    /// structural: bundle targets, the declaration/output directories, and
    /// anything that is not a known input.
    fn is_output_file(&self, config: &ParsedConfig, path: &Path) -> bool {
        if tsbuild_core::utils::is_source_file(path) {
            return false;
        }
        let options = &config.options;
        let changed = self.canonical(path);
        if let Some(out_file) = &options.out_file {
            if changed == self.canonical(out_file)
                || changed == self.canonical(&out_file.with_extension("d.ts"))
            {
                return true;
            }
        }
        if options.declaration_dir.as_ref().is_some_and(|dir| path.starts_with(dir)) {
            return true;
        }
        if options.out_dir.as_ref().is_some_and(|dir| path.starts_with(dir)) {
            return true;
        }
        !config.file_names.iter().any(|input| self.canonical(input) == changed)
    }
}

impl<H: WatchHost> SolutionBuilder<H> {
    /// Runs a one-shot build, then installs watchers and keeps rebuilding on
    /// file events. The entry point for watch mode.
    pub fn build_and_watch(
        &mut self,
        cancellation: Option<&CancellationToken>,
    ) -> Result<ExitStatus> {
        self.reporter.report_watch_status("Starting compilation in watch mode...");
        let status = self.build(None, cancellation)?;
        if status != ExitStatus::InvalidProjectOutputsSkipped {
            self.start_watching();
        }
        Ok(status)
    }

    /// Installs config, wildcard-directory and input watchers for every
    /// project in the build order.
    pub fn start_watching(&mut self) {
        let order = self.build_order();
        for project in order.projects() {
            self.watch_project(project);
        }
        self.watch.started = true;
        self.watch.announced = true;
        debug!(projects = order.projects().len(), "watching for file changes");
    }

    /// Tears down every watcher and the pending timer.
    pub fn stop_watching(&mut self) {
        let keys: Vec<_> = self.watch.watchers.keys().cloned().collect();
        for key in keys {
            self.unwatch_project(&key);
        }
        if let Some(timer) = self.watch.timer.take() {
            self.host.inner_mut().clear_timeout(timer);
        }
        self.watch.started = false;
    }

    /// Entry point for host file events; classifies the path against every
    /// project's watcher sets, raises reload levels and arms the debounce
    /// timer.
    pub fn file_changed(&mut self, path: &Path) {
        if !self.watch.started {
            return;
        }
        let changed = self.canonical(path);
        let mut invalidations: Vec<(ProjectKey, ReloadLevel)> = Vec::new();
        for (key, watchers) in &self.watch.watchers {
            if watchers
                .config
                .as_ref()
                .is_some_and(|(config_path, _)| self.canonical(config_path) == changed)
            {
                invalidations.push((key.clone(), ReloadLevel::Full));
                continue;
            }
            if watchers.inputs.iter().any(|(input, _)| self.canonical(input) == changed) {
                invalidations.push((key.clone(), ReloadLevel::None));
                continue;
            }
            for (wildcard, _) in &watchers.wildcards {
                let contained = if wildcard.recursive {
                    path.starts_with(&wildcard.path)
                } else {
                    path.parent() == Some(wildcard.path.as_path())
                };
                if !contained || self.is_ignored_wildcard_candidate(key, path) {
                    continue;
                }
                invalidations.push((key.clone(), ReloadLevel::Partial));
                break;
            }
        }
        if invalidations.is_empty() {
            return;
        }
        trace!(path = %path.display(), projects = invalidations.len(), "file event");
        for (key, level) in invalidations {
            self.invalidate_project(&key, level);
        }
        self.schedule_build_invalidated();
    }

    /// Entry point for the host's timer callback. Drains one invalidated
    /// project; re-arms while work remains, then emits the watch summary.
    pub fn timeout_fired(&mut self, id: TimerId) -> Result<()> {
        if self.watch.timer != Some(id) {
            return Ok(());
        }
        self.watch.timer = None;

        if !self.watch.announced {
            self.watch.announced = true;
            if !self.options.preserve_watch_output {
                self.reporter.clear_screen();
            }
            self.reporter
                .report_watch_status("File change detected. Starting incremental compilation...");
        }

        self.host.enable_cache();
        let step = self.build_next_project(None)?;
        self.apply_pending_rewires();
        match step {
            Some(step) => {
                trace!(project = %step.project, "drained invalidated project");
                self.schedule_build_invalidated();
            }
            None => {
                self.host.disable_cache();
                self.resolution_cache.clear();
                if self.watch.needs_summary {
                    self.watch.needs_summary = false;
                    let order = self.build_order();
                    let projects: Vec<_> = order
                        .projects()
                        .iter()
                        .map(|project| (project.clone(), self.configs.key(project)))
                        .collect();
                    self.reporter.summary(&projects, true);
                }
            }
        }
        Ok(())
    }

    fn schedule_build_invalidated(&mut self) {
        if let Some(timer) = self.watch.timer.take() {
            self.host.inner_mut().clear_timeout(timer);
        }
        let timer = self.host.inner_mut().set_timeout(BUILD_DEBOUNCE);
        trace!(?timer, "scheduled invalidated-project build");
        self.watch.timer = Some(timer);
    }

    fn watch_project(&mut self, project: &ResolvedConfigPath) {
        let key = self.configs.key(project);
        self.unwatch_project(&key);
        let mut watchers = ProjectWatchers::default();
        let config_path = project.as_path().to_path_buf();
        let id = self.host.inner_mut().watch_file(&config_path);
        watchers.config = Some((config_path, id));
        if let ConfigEntry::Parsed(config) = self.parsed_config(project) {
            for wildcard in &config.wildcard_directories {
                let id = self.host.inner_mut().watch_directory(&wildcard.path, wildcard.recursive);
                watchers.wildcards.push((wildcard.clone(), id));
            }
            for input in &config.file_names {
                let id = self.host.inner_mut().watch_file(input);
                watchers.inputs.push((input.clone(), id));
            }
        }
        trace!(project = %project, "installed project watchers");
        self.watch.watchers.insert(key, watchers);
    }

    fn rewire_input_watchers(&mut self, project: &ResolvedConfigPath, key: &ProjectKey) {
        let old_inputs = self
            .watch
            .watchers
            .get_mut(key)
            .map(|watchers| std::mem::take(&mut watchers.inputs))
            .unwrap_or_default();
        for (_, id) in old_inputs {
            self.host.inner_mut().unwatch(id);
        }
        if let ConfigEntry::Parsed(config) = self.parsed_config(project) {
            let mut inputs = Vec::with_capacity(config.file_names.len());
            for input in &config.file_names {
                inputs.push((input.clone(), self.host.inner_mut().watch_file(input)));
            }
            if let Some(watchers) = self.watch.watchers.get_mut(key) {
                watchers.inputs = inputs;
            }
        }
    }

    fn unwatch_project(&mut self, key: &ProjectKey) {
        let Some(watchers) = self.watch.watchers.remove(key) else { return };
        if let Some((_, id)) = watchers.config {
            self.host.inner_mut().unwatch(id);
        }
        for (_, id) in watchers.wildcards {
            self.host.inner_mut().unwatch(id);
        }
        for (_, id) in watchers.inputs {
            self.host.inner_mut().unwatch(id);
        }
    }

    fn apply_pending_rewires(&mut self) {
        if self.watch.pending_rewire.is_empty() {
            return;
        }
        let rewires = std::mem::take(&mut self.watch.pending_rewire);
        let order = self.build_order();
        for project in order.projects() {
            let key = self.configs.key(project);
            match rewires.get(&key) {
                Some(ReloadLevel::Full) => self.watch_project(project),
                Some(ReloadLevel::Partial) => self.rewire_input_watchers(project, &key),
                _ => {}
            }
        }
    }
}
