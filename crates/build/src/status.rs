//! The up-to-date status algebra and its evaluator.
//!
//! A project's status is derived from input/output modification times, the
//! statuses of its upstream references and the persisted build-info. Results
//! are memoized in the driver's status map and cleared on invalidation; a
//! cached entry short-circuits the whole computation.
//!
//! The evaluator recurses into upstream projects, so a malformed graph could
//! re-enter the same key; a [`ComputingUpstream`](UpToDateStatus::ComputingUpstream)
//! sentinel is written into the map before recursing and treated as "ignore
//! this edge". It is always overwritten with the real status on return.

use crate::{
    builder::SolutionBuilder,
    config::{ConfigEntry, ProjectKey, ResolvedConfigPath},
    host::BuildHost,
};
use std::{
    path::PathBuf,
    sync::Arc,
    time::SystemTime,
};
use tsbuild_artifacts::{output, BuildInfo, ParsedConfig};
use tsbuild_core::utils;

/// Timestamp bookkeeping shared by the two up-to-date variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpToDateDetail {
    /// Newest input modification time; `None` right after a build, when the
    /// inputs have not been re-walked.
    pub newest_input_time: Option<SystemTime>,
    pub newest_input: Option<PathBuf>,
    /// Most recent time declaration *content* changed. Comparing against a
    /// downstream project's oldest output decides between a real rebuild and
    /// a timestamp-only update.
    pub newest_declaration_change_time: Option<SystemTime>,
    pub oldest_output: Option<PathBuf>,
    pub newest_output: Option<PathBuf>,
    pub newest_output_time: Option<SystemTime>,
}

/// Result of evaluating whether a project's outputs can be reused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpToDateStatus {
    /// Configuration unparseable or an input file is missing.
    Unbuildable { reason: String },
    /// No inputs and no outputs; the project exists to aggregate references.
    ContainerOnly,
    UpToDate(UpToDateDetail),
    /// Up to date for this project's own inputs, but upstream `.d.ts`
    /// timestamps moved (content did not); eligible for a timestamp-only
    /// update.
    UpToDateWithUpstreamTypes(UpToDateDetail),
    /// An upstream bundle that is prepended into this project's output
    /// changed; the bundle must be regenerated even though types did not
    /// change.
    OutOfDateWithPrepend { out_of_date_output: PathBuf, newer_project: ResolvedConfigPath },
    OutputMissing { missing_output: PathBuf },
    OutOfDateWithSelf { out_of_date_output: PathBuf, newer_input: PathBuf },
    OutOfDateWithUpstream { out_of_date_output: PathBuf, newer_project: ResolvedConfigPath },
    UpstreamOutOfDate { upstream_project: ResolvedConfigPath },
    UpstreamBlocked { upstream_project: ResolvedConfigPath },
    /// Marker used while upstream statuses are being evaluated; never
    /// observable outside the evaluator.
    ComputingUpstream,
    /// The persisted build-info was produced by a different compiler version.
    CompilerVersionMismatch { version: String },
}

impl UpToDateStatus {
    /// Whether the project's own outputs need no regeneration.
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate(_) | Self::UpToDateWithUpstreamTypes(_))
    }
}

impl<H: BuildHost> SolutionBuilder<H> {
    /// Computes (and memoizes) the up-to-date status of `project`.
    pub fn project_status(&mut self, project: &ResolvedConfigPath) -> UpToDateStatus {
        let key = self.configs.key(project);
        if let Some(status) = self.statuses.get(&key) {
            return status.clone();
        }
        let status = match self.parsed_config(project) {
            ConfigEntry::Failed(_) => UpToDateStatus::Unbuildable {
                reason: "configuration file parse failed".to_owned(),
            },
            ConfigEntry::Parsed(config) => self.check_up_to_date(&config, project, &key),
        };
        debug!(project = %project, ?status, "computed project status");
        self.statuses.insert(key, status.clone());
        status
    }

    /// The normative order of checks; the first decisive condition wins, but
    /// upstream evaluation runs even when a missing or stale output has
    /// already been found, since an upstream failure outranks both.
    fn check_up_to_date(
        &mut self,
        config: &Arc<ParsedConfig>,
        project: &ResolvedConfigPath,
        key: &ProjectKey,
    ) -> UpToDateStatus {
        // Inputs must exist; track the newest.
        let mut newest_input_time = utils::minimum_date();
        let mut newest_input = None;
        for input in &config.file_names {
            let Some(time) = self.host.modified_time(input) else {
                return UpToDateStatus::Unbuildable {
                    reason: format!("{} does not exist", input.display()),
                };
            };
            if time > newest_input_time {
                newest_input_time = time;
                newest_input = Some(input.clone());
            }
        }

        if config.is_container() {
            return UpToDateStatus::ContainerOnly;
        }

        // Walk the expected outputs tracking the extremes. A missing or
        // stale output stops the walk but not the evaluation: upstream may
        // still override the tentative result.
        let outputs = output::project_outputs(config, project.as_path());
        let mut oldest_output_time = utils::maximum_date();
        let mut oldest_output = None;
        let mut newest_output_time = utils::minimum_date();
        let mut newest_output = None;
        let mut newest_declaration_change_time: Option<SystemTime> = None;
        let mut missing_output = None;
        let mut stale_output = None;
        for output in &outputs {
            let Some(time) = self.host.modified_time(output) else {
                missing_output = Some(output.clone());
                break;
            };
            if time < oldest_output_time {
                oldest_output_time = time;
                oldest_output = Some(output.clone());
            }
            if time > newest_output_time {
                newest_output_time = time;
                newest_output = Some(output.clone());
            }
            if utils::is_declaration_file(output) {
                newest_declaration_change_time =
                    Some(newest_declaration_change_time.map_or(time, |seen| seen.max(time)));
            }
            if time < newest_input_time {
                stale_output = Some(output.clone());
                break;
            }
        }

        // Upstream statuses, guarded against reference cycles.
        let mut pseudo_up_to_date = false;
        let mut uses_prepend = false;
        let mut upstream_changed: Option<ResolvedConfigPath> = None;
        if !config.references.is_empty() {
            self.statuses.insert(key.clone(), UpToDateStatus::ComputingUpstream);
            for reference in &config.references {
                uses_prepend |= reference.prepend;
                let upstream = self.resolve_reference(project, &reference.path);
                match self.project_status(&upstream) {
                    UpToDateStatus::ComputingUpstream | UpToDateStatus::ContainerOnly => {}
                    UpToDateStatus::Unbuildable { .. } | UpToDateStatus::UpstreamBlocked { .. } => {
                        return UpToDateStatus::UpstreamBlocked { upstream_project: upstream };
                    }
                    UpToDateStatus::UpToDate(detail)
                    | UpToDateStatus::UpToDateWithUpstreamTypes(detail) => {
                        if missing_output.is_some() {
                            continue;
                        }
                        if detail
                            .newest_input_time
                            .is_some_and(|time| time <= oldest_output_time)
                        {
                            continue;
                        }
                        if let Some(changed) = detail.newest_declaration_change_time {
                            if changed <= oldest_output_time {
                                pseudo_up_to_date = true;
                                upstream_changed = Some(upstream);
                                continue;
                            }
                        }
                        return UpToDateStatus::OutOfDateWithUpstream {
                            out_of_date_output: oldest_output.clone().unwrap_or_default(),
                            newer_project: upstream,
                        };
                    }
                    _ => {
                        return UpToDateStatus::UpstreamOutOfDate { upstream_project: upstream };
                    }
                }
            }
        }

        if let Some(missing) = missing_output {
            return UpToDateStatus::OutputMissing { missing_output: missing };
        }
        if let Some(stale) = stale_output {
            return UpToDateStatus::OutOfDateWithSelf {
                out_of_date_output: stale,
                newer_input: newest_input.unwrap_or_default(),
            };
        }

        // The configuration itself, and everything it extends, must predate
        // the outputs.
        let config_files =
            std::iter::once(project.as_path().to_path_buf()).chain(config.extended_configs.clone());
        for config_file in config_files {
            let time = self
                .host
                .modified_time(&config_file)
                .unwrap_or_else(utils::missing_file_modified_time);
            if time >= oldest_output_time {
                return UpToDateStatus::OutOfDateWithSelf {
                    out_of_date_output: oldest_output.unwrap_or_default(),
                    newer_input: config_file,
                };
            }
        }

        // Once per project lifetime: persisted build-info from another
        // compiler version invalidates everything.
        if self.build_info_checked.insert(key.clone()) {
            if let Some(info_path) = output::build_info_path(&config.options, project.as_path()) {
                if let Some(text) = self.host.read_file(&info_path) {
                    if let Ok(info) = BuildInfo::parse(&text) {
                        if info.version != self.host.inner().compiler_version().to_string() {
                            return UpToDateStatus::CompilerVersionMismatch {
                                version: info.version,
                            };
                        }
                    }
                }
            }
        }

        if uses_prepend && pseudo_up_to_date {
            if let Some(newer_project) = upstream_changed {
                return UpToDateStatus::OutOfDateWithPrepend {
                    out_of_date_output: oldest_output.unwrap_or_default(),
                    newer_project,
                };
            }
        }

        let detail = UpToDateDetail {
            newest_input_time: Some(newest_input_time),
            newest_input,
            newest_declaration_change_time,
            oldest_output,
            newest_output,
            newest_output_time: Some(newest_output_time),
        };
        if pseudo_up_to_date {
            UpToDateStatus::UpToDateWithUpstreamTypes(detail)
        } else {
            UpToDateStatus::UpToDate(detail)
        }
    }
}
