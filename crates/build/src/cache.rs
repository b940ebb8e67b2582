//! Scoped caches shared across one build pass.
//!
//! [`CachedHost`] wraps the host's `read_file`, `file_exists`,
//! `directory_exists`, `create_directory` and `write_file` behind a content
//! cache that is enabled for the duration of a build pass (and between
//! events in watch mode). Enabling twice is a no-op until the cache has been
//! disabled; disabling restores pass-through behavior. Modification times
//! are never cached.
//!
//! [`ModuleResolutionCache`] is wiring only: the engine controls its
//! lifetime and redirect roots while the contents belong to the compiler.

use crate::{config::ProjectKey, host::BuildHost};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tsbuild_artifacts::CompilerOptions;
use tsbuild_core::error::Result;

#[derive(Debug, Default)]
struct FsCache {
    files: HashMap<PathBuf, Option<Arc<String>>>,
    exists: HashMap<PathBuf, bool>,
    dirs: HashMap<PathBuf, bool>,
}

/// The host plus the scoped file-content cache.
pub(crate) struct CachedHost<H> {
    inner: H,
    cache: Option<FsCache>,
}

impl<H: BuildHost> CachedHost<H> {
    pub(crate) fn new(inner: H) -> Self {
        Self { inner, cache: None }
    }

    pub(crate) fn inner(&self) -> &H {
        &self.inner
    }

    pub(crate) fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub(crate) fn enable_cache(&mut self) {
        if self.cache.is_none() {
            trace!("enabling file content cache");
            self.cache = Some(FsCache::default());
        }
    }

    /// Returns whether the cache was enabled.
    pub(crate) fn disable_cache(&mut self) -> bool {
        let was_enabled = self.cache.take().is_some();
        if was_enabled {
            trace!("disabled file content cache");
        }
        was_enabled
    }

    pub(crate) fn read_file(&mut self, path: &Path) -> Option<Arc<String>> {
        if let Some(cache) = &mut self.cache {
            if let Some(hit) = cache.files.get(path) {
                return hit.clone();
            }
            let value = self.inner.read_file(path).map(Arc::new);
            cache.files.insert(path.to_path_buf(), value.clone());
            value
        } else {
            self.inner.read_file(path).map(Arc::new)
        }
    }

    pub(crate) fn file_exists(&mut self, path: &Path) -> bool {
        if let Some(cache) = &mut self.cache {
            if let Some(&hit) = cache.exists.get(path) {
                return hit;
            }
            let value = self.inner.file_exists(path);
            cache.exists.insert(path.to_path_buf(), value);
            value
        } else {
            self.inner.file_exists(path)
        }
    }

    pub(crate) fn directory_exists(&mut self, path: &Path) -> bool {
        if let Some(cache) = &mut self.cache {
            if let Some(&hit) = cache.dirs.get(path) {
                return hit;
            }
            let value = self.inner.directory_exists(path);
            cache.dirs.insert(path.to_path_buf(), value);
            value
        } else {
            self.inner.directory_exists(path)
        }
    }

    pub(crate) fn create_directory(&mut self, path: &Path) -> Result<()> {
        self.inner.create_directory(path)?;
        if let Some(cache) = &mut self.cache {
            cache.dirs.insert(path.to_path_buf(), true);
        }
        Ok(())
    }

    pub(crate) fn write_file(&mut self, path: &Path, text: &str) -> Result<()> {
        self.inner.write_file(path, text)?;
        if let Some(cache) = &mut self.cache {
            cache.files.insert(path.to_path_buf(), Some(Arc::new(text.to_owned())));
            cache.exists.insert(path.to_path_buf(), true);
        }
        Ok(())
    }

    pub(crate) fn delete_file(&mut self, path: &Path) -> Result<()> {
        self.inner.delete_file(path)?;
        if let Some(cache) = &mut self.cache {
            cache.files.insert(path.to_path_buf(), None);
            cache.exists.insert(path.to_path_buf(), false);
        }
        Ok(())
    }

    pub(crate) fn modified_time(&self, path: &Path) -> Option<SystemTime> {
        self.inner.modified_time(path)
    }

    pub(crate) fn set_modified_time(&mut self, path: &Path, time: SystemTime) -> Result<()> {
        self.inner.set_modified_time(path, time)
    }

    pub(crate) fn now(&self) -> SystemTime {
        self.inner.now()
    }
}

/// Wiring for the compiler's module-resolution cache.
///
/// During a build pass the first compiled project's own maps become the
/// redirect root; every subsequent project pushes a redirect entry keyed by
/// its canonical path. Cleared when the file-content cache is disabled.
#[derive(Clone, Debug, Default)]
pub struct ModuleResolutionCache {
    active_options: Option<CompilerOptions>,
    redirect_root: Option<ProjectKey>,
    redirects: Vec<ProjectKey>,
}

impl ModuleResolutionCache {
    /// Installs the options of the project about to be compiled.
    pub(crate) fn install_options(&mut self, options: &CompilerOptions) {
        self.active_options = Some(options.clone());
    }

    /// Marks the start of a project's compilation within the current pass.
    pub(crate) fn begin_project(&mut self, key: &ProjectKey) {
        if self.redirect_root.is_none() {
            self.redirect_root = Some(key.clone());
        } else if self.redirect_root.as_ref() != Some(key) && !self.redirects.contains(key) {
            self.redirects.push(key.clone());
        }
    }

    pub(crate) fn clear(&mut self) {
        trace!("clearing module resolution cache");
        self.active_options = None;
        self.redirect_root = None;
        self.redirects.clear();
    }

    pub fn redirect_root(&self) -> Option<&ProjectKey> {
        self.redirect_root.as_ref()
    }

    pub fn active_options(&self) -> Option<&CompilerOptions> {
        self.active_options.as_ref()
    }
}
