//! Build-order construction over the project reference graph.
//!
//! A three-color depth-first walk from each root produces a leaves-first
//! total order, so iterating it builds every dependency before its
//! dependents. Reference cycles are reported once, listing the offending
//! stack, and the walk simply terminates; edges the author flagged
//! `circular` suppress the diagnostic. Unresolvable references are treated
//! as leaves.

use crate::{
    builder::SolutionBuilder,
    config::{ConfigEntry, ProjectKey, ResolvedConfigPath},
    host::BuildHost,
};
use itertools::Itertools;
use std::{
    collections::HashSet,
    path::Path,
    sync::Arc,
};
use tsbuild_artifacts::{codes, Diagnostic};
use tsbuild_core::error::{BuildError, Result};

/// A topological, leaves-first ordering of the projects reachable from the
/// roots, plus the circularity diagnostics discovered on the way.
#[derive(Clone, Debug, Default)]
pub struct BuildOrder {
    projects: Vec<ResolvedConfigPath>,
    diagnostics: Vec<Diagnostic>,
}

impl BuildOrder {
    pub fn projects(&self) -> &[ResolvedConfigPath] {
        &self.projects
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

struct Visit {
    temporary: HashSet<ProjectKey>,
    permanent: HashSet<ProjectKey>,
    stack: Vec<ResolvedConfigPath>,
    order: Vec<ResolvedConfigPath>,
    diagnostics: Vec<Diagnostic>,
}

impl<H: BuildHost> SolutionBuilder<H> {
    /// The full build order from the configured roots, memoized until a
    /// `Full` invalidation clears it. Circularity diagnostics are reported
    /// once, when the order is computed.
    pub fn build_order(&mut self) -> Arc<BuildOrder> {
        if let Some(order) = &self.order {
            return order.clone();
        }
        let roots: Vec<ResolvedConfigPath> =
            self.roots.iter().map(|root| self.configs.resolve(root, &self.cwd)).collect();
        let order = Arc::new(self.create_build_order(&roots));
        trace!(projects = order.projects().len(), "computed build order");
        for diagnostic in order.diagnostics() {
            self.reporter.report_diagnostic(diagnostic);
        }
        self.order = Some(order.clone());
        order
    }

    /// The build order restricted to the transitive closure of `project`, or
    /// the full order when no sub-project is requested.
    ///
    /// Errors when the requested project is not part of the full graph.
    pub fn build_order_for(&mut self, project: Option<&Path>) -> Result<Arc<BuildOrder>> {
        let full = self.build_order();
        let Some(name) = project else { return Ok(full) };

        let resolved = self.configs.resolve(name, &self.cwd);
        let key = self.configs.key(&resolved);
        let in_graph = full.projects().iter().any(|candidate| self.configs.key(candidate) == key);
        if !in_graph {
            return Err(BuildError::InvalidProject(resolved.to_string()));
        }
        let mut restricted = self.create_build_order(std::slice::from_ref(&resolved));
        // cycles were already reported for the full order
        restricted.diagnostics.clear();
        Ok(Arc::new(restricted))
    }

    fn create_build_order(&mut self, roots: &[ResolvedConfigPath]) -> BuildOrder {
        let mut visit = Visit {
            temporary: HashSet::new(),
            permanent: HashSet::new(),
            stack: Vec::new(),
            order: Vec::new(),
            diagnostics: Vec::new(),
        };
        for root in roots {
            self.visit_project(root.clone(), false, &mut visit);
        }
        BuildOrder { projects: visit.order, diagnostics: visit.diagnostics }
    }

    fn visit_project(&mut self, project: ResolvedConfigPath, in_circular: bool, visit: &mut Visit) {
        let key = self.configs.key(&project);
        if visit.permanent.contains(&key) {
            return;
        }
        if visit.temporary.contains(&key) {
            if !in_circular {
                let cycle = visit
                    .stack
                    .iter()
                    .chain(std::iter::once(&project))
                    .map(ToString::to_string)
                    .join("\r\n");
                visit.diagnostics.push(Diagnostic::error(
                    codes::PROJECT_REFERENCE_CYCLE,
                    format!(
                        "Project references may not form a circular graph. Cycle detected: {cycle}"
                    ),
                ));
            }
            return;
        }

        visit.temporary.insert(key.clone());
        visit.stack.push(project.clone());
        if let ConfigEntry::Parsed(config) = self.parsed_config(&project) {
            for reference in &config.references {
                let upstream = self.resolve_reference(&project, &reference.path);
                self.visit_project(upstream, in_circular || reference.circular, visit);
            }
        }
        visit.stack.pop();
        visit.permanent.insert(key);
        visit.order.push(project);
    }

    /// Resolves a reference path against the referencing project's directory.
    pub(crate) fn resolve_reference(
        &mut self,
        from: &ResolvedConfigPath,
        path: &Path,
    ) -> ResolvedConfigPath {
        self.configs.resolve(path, from.directory())
    }
}
