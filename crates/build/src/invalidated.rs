//! The pending-build queue and the actions taken on invalidated projects.
//!
//! The queue is a set with a level: each key maps to the highest
//! [`ReloadLevel`] ever requested for it, and re-enqueueing only ever raises
//! the level. The factory walks the build order, picks the first pending
//! project, applies its reload level, evaluates its status and either skips
//! it or hands out a one-shot [`InvalidatedProject`] action handle.

use crate::{
    builder::{BuildResultFlags, SolutionBuilder},
    config::{ConfigEntry, ProjectKey, ResolvedConfigPath},
    host::{BuildHost, CancellationToken},
    status::UpToDateStatus,
};
use std::{collections::BTreeSet, sync::Arc};
use tsbuild_artifacts::ParsedConfig;
use tsbuild_core::error::Result;

/// How much of a project's configuration must be re-processed before its
/// next build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReloadLevel {
    /// Re-evaluate the cached status only.
    #[default]
    None,
    /// Re-expand wildcard inputs and rewire input watchers.
    Partial,
    /// Re-read the configuration file and rewire every watcher.
    Full,
}

/// The kind of work a pending project needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidatedProjectKind {
    /// Run the full compiler pipeline.
    Build,
    /// Regenerate non-declaration outputs from persisted build-info.
    UpdateBundle,
    /// Touch existing outputs; nothing is recompiled.
    UpdateOutputFileStamps,
}

/// One-shot handle for the work a project needs; consumed by
/// [`done`](Self::done).
pub struct InvalidatedProject<'a, H: BuildHost> {
    kind: InvalidatedProjectKind,
    project: ResolvedConfigPath,
    key: ProjectKey,
    config: Arc<ParsedConfig>,
    builder: &'a mut SolutionBuilder<H>,
}

impl<H: BuildHost> InvalidatedProject<'_, H> {
    pub fn kind(&self) -> InvalidatedProjectKind {
        self.kind
    }

    pub fn project(&self) -> &ResolvedConfigPath {
        &self.project
    }

    /// Performs the action and clears the project's pending entry.
    ///
    /// A bundle update that finds its build-info unusable transparently
    /// converts into a full build. Downstream projects are re-enqueued only
    /// when the action finished without any error bit set.
    pub fn done(self, cancellation: Option<&CancellationToken>) -> Result<BuildResultFlags> {
        let Self { kind, project, key, config, builder } = self;
        if builder.options.dry {
            let action = match kind {
                InvalidatedProjectKind::Build => "build project",
                InvalidatedProjectKind::UpdateBundle => "update the bundle of project",
                InvalidatedProjectKind::UpdateOutputFileStamps => {
                    "update timestamps of project"
                }
            };
            builder.reporter.report_status(&format!("A non-dry build would {action} '{project}'"));
            builder.pending.remove(&key);
            return Ok(BuildResultFlags::SUCCESS);
        }
        let result = match kind {
            InvalidatedProjectKind::Build => {
                builder.build_project(&project, &key, &config, cancellation)?
            }
            InvalidatedProjectKind::UpdateBundle => {
                builder.update_bundle(&project, &key, &config, cancellation)?
            }
            InvalidatedProjectKind::UpdateOutputFileStamps => {
                let result = builder.update_output_timestamps(&project, &key, &config)?;
                return Ok(result);
            }
        };
        if result.contains(BuildResultFlags::SUCCESS) && !result.has_errors() {
            builder.queue_referencing_projects(&project, &key, result);
        }
        Ok(result)
    }
}

impl<H: BuildHost> SolutionBuilder<H> {
    /// Raises the pending level for `key`; levels never decrease.
    pub(crate) fn enqueue(&mut self, key: ProjectKey, level: ReloadLevel) {
        let entry = self.pending.entry(key).or_insert(level);
        if *entry < level {
            *entry = level;
        }
    }

    /// Walks the current build order and returns an action handle for the
    /// first pending project that actually needs work, clearing the entries
    /// of projects that turn out to be skippable.
    pub fn get_next_invalidated_project(&mut self) -> Option<InvalidatedProject<'_, H>> {
        self.seed_initial_build();
        let order = self.current_order();
        for project in order.projects() {
            let key = self.configs.key(project);
            let Some(&level) = self.pending.get(&key) else { continue };
            self.apply_reload_level(project, &key, level);

            let config = match self.parsed_config(project) {
                ConfigEntry::Parsed(config) => config,
                ConfigEntry::Failed(diagnostic) => {
                    // Unparseable config: report, store, skip. Downstream
                    // projects will see `UpstreamBlocked`.
                    self.reporter.store_and_report(&key, vec![(*diagnostic).clone()]);
                    self.pending.remove(&key);
                    continue;
                }
            };

            let status = self.project_status(project);
            self.reporter.report_project_status(project, &status);
            match &status {
                UpToDateStatus::UpToDate(_) if !self.options.force => {
                    self.reporter.report_errors_once(&key);
                    self.pending.remove(&key);
                    if self.options.dry {
                        self.reporter
                            .report_status(&format!("Project '{project}' is up to date"));
                    }
                    continue;
                }
                UpToDateStatus::UpToDateWithUpstreamTypes(_) if !self.options.force => {
                    return Some(InvalidatedProject {
                        kind: InvalidatedProjectKind::UpdateOutputFileStamps,
                        project: project.clone(),
                        key,
                        config,
                        builder: self,
                    });
                }
                UpToDateStatus::UpstreamBlocked { upstream_project } => {
                    self.reporter.verbose_status(&format!(
                        "Skipping build of project '{project}' because its dependency '{upstream_project}' has errors"
                    ));
                    self.pending.remove(&key);
                    continue;
                }
                UpToDateStatus::ContainerOnly => {
                    self.reporter.report_errors_once(&key);
                    self.pending.remove(&key);
                    continue;
                }
                _ => {}
            }

            let kind = if self.needs_build(&status, &config) {
                InvalidatedProjectKind::Build
            } else {
                InvalidatedProjectKind::UpdateBundle
            };
            return Some(InvalidatedProject {
                kind,
                project: project.clone(),
                key,
                config,
                builder: self,
            });
        }
        None
    }

    /// Only an error-free, incremental, prepend-invalidated project with a
    /// non-empty input list qualifies for a bundle-only update; everything
    /// else gets a full build.
    fn needs_build(&self, status: &UpToDateStatus, config: &ParsedConfig) -> bool {
        self.options.force
            || !matches!(status, UpToDateStatus::OutOfDateWithPrepend { .. })
            || config.file_names.is_empty()
            || config.has_errors()
            || !config.options.is_incremental()
    }

    fn apply_reload_level(&mut self, project: &ResolvedConfigPath, key: &ProjectKey, level: ReloadLevel) {
        match level {
            ReloadLevel::None => {}
            ReloadLevel::Partial => {
                if let ConfigEntry::Parsed(config) = self.parsed_config(project) {
                    let mut updated = (*config).clone();
                    updated.file_names = self.expand_inputs(&config);
                    trace!(project = %project, files = updated.file_names.len(), "re-expanded wildcard inputs");
                    self.configs.insert(key.clone(), ConfigEntry::Parsed(Arc::new(updated)));
                }
                self.request_watcher_rewire(key, ReloadLevel::Partial);
            }
            ReloadLevel::Full => {
                self.configs.evict(key);
                self.statuses.remove(key);
                let _ = self.parsed_config(project);
                self.request_watcher_rewire(key, ReloadLevel::Full);
            }
        }
        self.pending.insert(key.clone(), ReloadLevel::None);
    }

    /// Re-expands the input file list from the config's wildcard
    /// directories, keeping explicit inputs that still exist.
    fn expand_inputs(&mut self, config: &ParsedConfig) -> Vec<std::path::PathBuf> {
        let mut files = BTreeSet::new();
        for input in &config.file_names {
            if self.host.file_exists(input) {
                files.insert(input.clone());
            }
        }
        for wildcard in &config.wildcard_directories {
            for file in self.host.inner().read_directory(&wildcard.path, wildcard.recursive) {
                files.insert(file);
            }
        }
        files.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_levels_are_ordered() {
        assert!(ReloadLevel::None < ReloadLevel::Partial);
        assert!(ReloadLevel::Partial < ReloadLevel::Full);
    }
}
