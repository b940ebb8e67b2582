//! Project identity and the configuration cache.
//!
//! A project is named by the path of its configuration file. The engine
//! carries two forms: the [`ResolvedConfigPath`] (absolute, normalized, with
//! the configuration extension) and the [`ProjectKey`] (case-folded where the
//! file system is) used for every map lookup. Both mappings are memoized
//! here, together with parse results; a failed parse stores the parser's
//! first unrecoverable diagnostic in place of a configuration.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use tsbuild_artifacts::{Diagnostic, ParsedConfig};
use tsbuild_core::utils;

/// Engine-visible build options.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildOptions {
    /// Report what would be built without writing anything.
    pub dry: bool,
    /// Disable all up-to-date short-circuiting.
    pub force: bool,
    /// Narrate per-project status decisions.
    pub verbose: bool,
    /// Keep programs alive between builds and rebuild on file events.
    pub watch: bool,
    /// Do not clear the screen between watch-mode recompilations.
    pub preserve_watch_output: bool,
    pub list_emitted_files: bool,
    pub list_files: bool,
    pub pretty: bool,
    /// Default the projects to incremental builds.
    pub incremental: bool,
    pub trace_resolution: bool,
    pub diagnostics: bool,
    pub extended_diagnostics: bool,
}

/// Absolute, normalized path of a project configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedConfigPath(PathBuf);

impl ResolvedConfigPath {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Directory the project's relative references resolve against.
    pub fn directory(&self) -> &Path {
        self.0.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl AsRef<Path> for ResolvedConfigPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ResolvedConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// Case-folded lookup key of a resolved project path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey(String);

impl ProjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A cached parse result: a configuration, or the diagnostic that killed the
/// parse.
#[derive(Clone, Debug)]
pub(crate) enum ConfigEntry {
    Parsed(Arc<ParsedConfig>),
    Failed(Arc<Diagnostic>),
}

/// Memoizes path resolution, key folding and parse results.
///
/// Populated lazily; entries are evicted only by an explicit `Full`
/// invalidation of the project.
#[derive(Debug)]
pub(crate) struct ConfigCache {
    case_sensitive: bool,
    keys: HashMap<PathBuf, ProjectKey>,
    entries: HashMap<ProjectKey, ConfigEntry>,
}

impl ConfigCache {
    pub(crate) fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive, keys: HashMap::new(), entries: HashMap::new() }
    }

    pub(crate) fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Resolves a project name against `base`, appending the configuration
    /// extension when absent.
    pub(crate) fn resolve(&self, name: &Path, base: &Path) -> ResolvedConfigPath {
        ResolvedConfigPath(utils::resolve_config_path(name, base))
    }

    /// The canonical key for a resolved project path, memoized.
    pub(crate) fn key(&mut self, project: &ResolvedConfigPath) -> ProjectKey {
        if let Some(key) = self.keys.get(project.as_path()) {
            return key.clone();
        }
        let key = ProjectKey(utils::canonical_key(project.as_path(), self.case_sensitive));
        self.keys.insert(project.as_path().to_path_buf(), key.clone());
        key
    }

    pub(crate) fn get(&self, key: &ProjectKey) -> Option<ConfigEntry> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn insert(&mut self, key: ProjectKey, entry: ConfigEntry) {
        self.entries.insert(key, entry);
    }

    /// Drops the parse result; the next lookup re-reads the file.
    pub(crate) fn evict(&mut self, key: &ProjectKey) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_memoized_and_folded() {
        let mut cache = ConfigCache::new(false);
        let project = ResolvedConfigPath::new(PathBuf::from("/Work/App.json"));
        let first = cache.key(&project);
        let second = cache.key(&project);
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "/work/app.json");
    }

    #[test]
    fn eviction_drops_parse_results_only() {
        let mut cache = ConfigCache::new(true);
        let project = ResolvedConfigPath::new(PathBuf::from("/work/app.json"));
        let key = cache.key(&project);
        cache.insert(key.clone(), ConfigEntry::Parsed(Arc::new(ParsedConfig::default())));
        assert!(cache.get(&key).is_some());
        cache.evict(&key);
        assert!(cache.get(&key).is_none());
        // the key memo survives
        assert_eq!(cache.key(&project), key);
    }
}
