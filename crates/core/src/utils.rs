//! Utility functions: paths, canonical keys and the modification-time lattice.

use crate::error::{BuildIoError, Result};
use std::{
    path::{Component, Path, PathBuf},
    time::{Duration, SystemTime},
};

/// Extension of project configuration files.
pub const CONFIG_EXTENSION: &str = "json";

/// Extension of declaration outputs.
pub const DECLARATION_EXTENSION: &str = ".d.ts";

/// Returns the path to the same file with all intermediate `.`/`..`
/// components resolved lexically, without touching the file system.
///
/// Used to derive resolved project names for files that may not exist yet.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            component => normalized.push(component),
        }
    }
    normalized
}

/// Canonicalize the path, platform agnostic.
///
/// On windows this will ensure the path only consists of `/` separators and
/// does not carry the extended length prefix.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf, BuildIoError> {
    let path = path.as_ref();
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            let res = dunce::canonicalize(path).map(|p| {
                use path_slash::PathBufExt;
                PathBuf::from(p.to_slash_lossy().as_ref())
            });
        } else {
            let res = dunce::canonicalize(path);
        }
    }
    res.map_err(|err| BuildIoError::new(err, path))
}

/// Folds a resolved path into the key used for all engine map lookups.
///
/// Separators are normalized and, when the host file system is
/// case-insensitive, the path is lowercased.
pub fn canonical_key(path: &Path, case_sensitive: bool) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if case_sensitive {
        text
    } else {
        text.to_lowercase()
    }
}

/// Resolves a user-supplied project name to the configuration file it names.
///
/// Appends the standard configuration extension when absent; the result is
/// lexically normalized and absolute relative to `cwd`.
pub fn resolve_config_path(name: &Path, cwd: &Path) -> PathBuf {
    let mut path = if name.is_absolute() { name.to_path_buf() } else { cwd.join(name) };
    let has_extension =
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(CONFIG_EXTENSION));
    if !has_extension {
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".");
        file_name.push(CONFIG_EXTENSION);
        path.set_file_name(file_name);
    }
    normalize_path(&path)
}

/// Whether the path names a declaration output (`.d.ts`).
pub fn is_declaration_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(DECLARATION_EXTENSION)
}

/// Whether the path names a compilable source file (`.ts`/`.tsx`, but not a
/// declaration file).
pub fn is_source_file(path: &Path) -> bool {
    if is_declaration_file(path) {
        return false;
    }
    let name = path.to_string_lossy();
    name.ends_with(".ts") || name.ends_with(".tsx")
}

/// Lower bound of the modification-time lattice.
pub fn minimum_date() -> SystemTime {
    SystemTime::UNIX_EPOCH
}

/// Upper bound of the modification-time lattice, later than any real
/// modification time.
pub fn maximum_date() -> SystemTime {
    // Fri, 31 Dec 9999; far enough for any file system stamp.
    SystemTime::UNIX_EPOCH + Duration::from_secs(253_402_300_799)
}

/// The modification time reported for files that do not exist: earlier than
/// any real time.
pub fn missing_file_modified_time() -> SystemTime {
    minimum_date()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_lexically() {
        let path = Path::new("/a/b/../c/./d.json");
        assert_eq!(normalize_path(path), PathBuf::from("/a/c/d.json"));
    }

    #[test]
    fn resolves_config_names() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_config_path(Path::new("app"), cwd), PathBuf::from("/work/app.json"));
        assert_eq!(
            resolve_config_path(Path::new("/work/app.json"), cwd),
            PathBuf::from("/work/app.json")
        );
        assert_eq!(
            resolve_config_path(Path::new("sub/project.v2"), cwd),
            PathBuf::from("/work/sub/project.v2.json")
        );
    }

    #[test]
    fn canonical_keys_fold_case_when_insensitive() {
        let path = Path::new("/Work/App.json");
        assert_eq!(canonical_key(path, true), "/Work/App.json");
        assert_eq!(canonical_key(path, false), "/work/app.json");
    }

    #[test]
    fn declaration_and_source_predicates() {
        assert!(is_declaration_file(Path::new("/out/a.d.ts")));
        assert!(!is_source_file(Path::new("/out/a.d.ts")));
        assert!(is_source_file(Path::new("/src/a.ts")));
        assert!(is_source_file(Path::new("/src/view.tsx")));
        assert!(!is_source_file(Path::new("/src/a.js")));
    }

    #[test]
    fn time_lattice_is_ordered() {
        assert!(minimum_date() < maximum_date());
        assert_eq!(missing_file_modified_time(), minimum_date());
        assert!(SystemTime::now() < maximum_date());
    }

    #[test]
    fn canonicalizes_real_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("project.json");
        std::fs::write(&file, "{}").unwrap();
        let canonical = canonicalize(&file).unwrap();
        assert!(canonical.ends_with("project.json"));
    }
}
