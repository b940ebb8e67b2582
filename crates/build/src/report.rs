//! Diagnostic storage and status narration.
//!
//! The engine-owned [`Reporter`] stores diagnostics per project, tracks
//! which projects already had their errors printed, formats verbose status
//! lines from [`UpToDateStatus`] variants and produces the final summary.
//! Everything leaves the engine through a [`ReportSink`], so embedders can
//! swap the console for anything else.

use crate::{
    config::{ProjectKey, ResolvedConfigPath},
    status::UpToDateStatus,
};
use std::collections::{HashMap, HashSet};
use tsbuild_artifacts::Diagnostic;
use yansi::Paint;

/// Destination for diagnostics, status lines and summaries.
#[auto_impl::auto_impl(&mut, Box)]
pub trait ReportSink {
    fn report_diagnostic(&mut self, diagnostic: &Diagnostic);

    /// Informational per-project status lines.
    fn report_status(&mut self, message: &str);

    /// Watch-mode lifecycle messages.
    fn report_watch_status(&mut self, message: &str) {
        self.report_status(message);
    }

    /// Final error count of a completed pass.
    fn report_summary(&mut self, errors: usize) {
        let _ = errors;
    }

    /// Called before a watch-mode recompilation starts, unless the embedder
    /// asked to preserve output.
    fn clear_screen(&mut self) {}
}

/// Prints diagnostics to stderr and status lines to stdout, with optional
/// color.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleReporter {
    pretty: bool,
}

impl ConsoleReporter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ReportSink for ConsoleReporter {
    fn report_diagnostic(&mut self, diagnostic: &Diagnostic) {
        if self.pretty && diagnostic.is_error() {
            eprintln!("{}", diagnostic.red());
        } else {
            eprintln!("{diagnostic}");
        }
    }

    fn report_status(&mut self, message: &str) {
        println!("{message}");
    }

    fn report_summary(&mut self, errors: usize) {
        let message = match errors {
            0 => return,
            1 => "Found 1 error.".to_owned(),
            n => format!("Found {n} errors."),
        };
        if self.pretty {
            println!("{}", message.red().bold());
        } else {
            println!("{message}");
        }
    }

    fn clear_screen(&mut self) {
        if self.pretty {
            print!("\x1B[2J\x1B[3J\x1B[H");
        }
    }
}

/// Per-project diagnostic storage plus the rendering rules.
pub(crate) struct Reporter {
    sink: Box<dyn ReportSink>,
    verbose: bool,
    diagnostics: HashMap<ProjectKey, Vec<Diagnostic>>,
    /// Projects whose stored diagnostics were already printed.
    reported: HashSet<ProjectKey>,
}

impl Reporter {
    pub(crate) fn new(sink: Box<dyn ReportSink>, verbose: bool) -> Self {
        Self { sink, verbose, diagnostics: HashMap::new(), reported: HashSet::new() }
    }

    pub(crate) fn report_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.sink.report_diagnostic(diagnostic);
    }

    pub(crate) fn report_status(&mut self, message: &str) {
        self.sink.report_status(message);
    }

    pub(crate) fn report_watch_status(&mut self, message: &str) {
        self.sink.report_watch_status(message);
    }

    pub(crate) fn clear_screen(&mut self) {
        self.sink.clear_screen();
    }

    pub(crate) fn verbose_status(&mut self, message: &str) {
        if self.verbose {
            self.sink.report_status(message);
        }
    }

    /// Stores the project's diagnostics and prints them immediately.
    pub(crate) fn store_and_report(&mut self, key: &ProjectKey, diagnostics: Vec<Diagnostic>) {
        for diagnostic in &diagnostics {
            self.sink.report_diagnostic(diagnostic);
        }
        self.reported.insert(key.clone());
        self.diagnostics.insert(key.clone(), diagnostics);
    }

    /// Prints the stored diagnostics unless they already went out.
    pub(crate) fn report_errors_once(&mut self, key: &ProjectKey) {
        if self.reported.contains(key) {
            return;
        }
        if let Some(diagnostics) = self.diagnostics.get(key) {
            if diagnostics.is_empty() {
                return;
            }
            for diagnostic in diagnostics.clone() {
                self.sink.report_diagnostic(&diagnostic);
            }
            self.reported.insert(key.clone());
        }
    }

    pub(crate) fn clear(&mut self, key: &ProjectKey) {
        self.diagnostics.remove(key);
        self.reported.remove(key);
    }

    pub(crate) fn errored(&self, key: &ProjectKey) -> bool {
        self.diagnostics.get(key).is_some_and(|diagnostics| !diagnostics.is_empty())
    }

    /// Verbose narration of a status decision.
    pub(crate) fn report_project_status(
        &mut self,
        project: &ResolvedConfigPath,
        status: &UpToDateStatus,
    ) {
        if !self.verbose {
            return;
        }
        let message = status_message(project, status);
        self.sink.report_status(&message);
    }

    /// Walks the build order, prints any diagnostics that have not been
    /// printed yet, and emits the closing summary. Returns the error count.
    pub(crate) fn summary(
        &mut self,
        projects: &[(ResolvedConfigPath, ProjectKey)],
        watch: bool,
    ) -> usize {
        let mut errors = 0;
        for (_, key) in projects {
            self.report_errors_once(key);
            if self.errored(key) {
                errors +=
                    self.diagnostics[key].iter().filter(|diagnostic| diagnostic.is_error()).count();
            }
        }
        if watch {
            let message = match errors {
                1 => "Found 1 error. Watching for file changes.".to_owned(),
                n => format!("Found {n} errors. Watching for file changes."),
            };
            self.sink.report_watch_status(&message);
        } else {
            self.sink.report_summary(errors);
        }
        errors
    }
}

fn status_message(project: &ResolvedConfigPath, status: &UpToDateStatus) -> String {
    match status {
        UpToDateStatus::Unbuildable { reason } => {
            format!("Project '{project}' can't be built: {reason}")
        }
        UpToDateStatus::ContainerOnly => {
            format!("Project '{project}' only references other projects")
        }
        UpToDateStatus::UpToDate(detail) => match (&detail.newest_input, &detail.oldest_output) {
            (Some(input), Some(output)) => format!(
                "Project '{project}' is up to date because newest input '{}' is older than oldest output '{}'",
                input.display(),
                output.display()
            ),
            _ => format!("Project '{project}' is up to date"),
        },
        UpToDateStatus::UpToDateWithUpstreamTypes(_) => {
            format!("Project '{project}' is up to date with .d.ts files from its dependencies")
        }
        UpToDateStatus::OutOfDateWithPrepend { newer_project, .. } => format!(
            "Project '{project}' is out of date because bundled output of its dependency '{newer_project}' has changed"
        ),
        UpToDateStatus::OutputMissing { missing_output } => format!(
            "Project '{project}' is out of date because output file '{}' does not exist",
            missing_output.display()
        ),
        UpToDateStatus::OutOfDateWithSelf { out_of_date_output, newer_input } => format!(
            "Project '{project}' is out of date because output '{}' is older than input '{}'",
            out_of_date_output.display(),
            newer_input.display()
        ),
        UpToDateStatus::OutOfDateWithUpstream { newer_project, .. } => format!(
            "Project '{project}' is out of date because output of its dependency '{newer_project}' has changed"
        ),
        UpToDateStatus::UpstreamOutOfDate { upstream_project } => format!(
            "Project '{project}' is out of date because its dependency '{upstream_project}' is out of date"
        ),
        UpToDateStatus::UpstreamBlocked { upstream_project } => format!(
            "Project '{project}' can't be built because its dependency '{upstream_project}' has errors"
        ),
        UpToDateStatus::ComputingUpstream => {
            format!("Upstream status of project '{project}' is being computed")
        }
        UpToDateStatus::CompilerVersionMismatch { version } => format!(
            "Project '{project}' is out of date because its outputs were generated by compiler version '{version}'"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingSink {
        diagnostics: Vec<String>,
        statuses: Vec<String>,
    }

    impl ReportSink for RecordingSink {
        fn report_diagnostic(&mut self, diagnostic: &Diagnostic) {
            self.diagnostics.push(diagnostic.to_string());
        }

        fn report_status(&mut self, message: &str) {
            self.statuses.push(message.to_owned());
        }
    }

    fn key(text: &str) -> ProjectKey {
        let mut cache = crate::config::ConfigCache::new(true);
        cache.key(&crate::config::ResolvedConfigPath::new(PathBuf::from(text)))
    }

    #[test]
    fn stored_errors_are_printed_once() {
        let mut reporter = Reporter::new(Box::new(RecordingSink::default()), false);
        let key = key("/proj/a.json");
        reporter.store_and_report(&key, vec![Diagnostic::error(1, "boom")]);
        // a later summary must not print them again
        reporter.report_errors_once(&key);
        assert!(reporter.errored(&key));

        Reporter::clear(&mut reporter, &key);
        assert!(!reporter.errored(&key));
    }

    #[test]
    fn summary_counts_errors_across_projects() {
        let mut reporter = Reporter::new(Box::new(RecordingSink::default()), false);
        let a = key("/proj/a.json");
        let b = key("/proj/b.json");
        reporter.store_and_report(&a, vec![Diagnostic::error(1, "one"), Diagnostic::error(2, "two")]);
        let projects = vec![
            (crate::config::ResolvedConfigPath::new(PathBuf::from("/proj/a.json")), a),
            (crate::config::ResolvedConfigPath::new(PathBuf::from("/proj/b.json")), b),
        ];
        assert_eq!(reporter.summary(&projects, false), 2);
    }
}
