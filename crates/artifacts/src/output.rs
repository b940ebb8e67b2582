//! Expected-output enumeration.
//!
//! Given a parsed configuration, lists every file a build of the project is
//! expected to leave on disk. The up-to-date evaluator walks this list, the
//! timestamp updater touches it, and `clean` deletes it, so the policy lives
//! in one place: `outFile` bundles map to a fixed set next to the bundle,
//! multi-file projects rebase each source from `rootDir` into `outDir`
//! (declarations into `declarationDir` when set), and incremental projects
//! append their build-info artifact.

use crate::{CompilerOptions, ParsedConfig, BUILD_INFO_EXTENSION};
use std::path::{Path, PathBuf};
use tsbuild_core::utils;

/// Returns every output the project is expected to produce.
///
/// JavaScript outputs precede their source maps and declarations; the
/// build-info artifact, if any, comes last.
pub fn project_outputs(config: &ParsedConfig, config_path: &Path) -> Vec<PathBuf> {
    let options = &config.options;
    let mut outputs = Vec::new();

    if let Some(out_file) = &options.out_file {
        outputs.push(out_file.clone());
        if options.source_map.unwrap_or(false) {
            outputs.push(appended(out_file, ".map"));
        }
        if options.declaration_enabled() {
            let declaration = out_file.with_extension("d.ts");
            outputs.push(declaration);
        }
    } else {
        for source in &config.file_names {
            if !utils::is_source_file(source) {
                continue;
            }
            let js = output_file_for_source(source, options, config_path);
            outputs.push(js.clone());
            if options.source_map.unwrap_or(false) {
                outputs.push(appended(&js, ".map"));
            }
            if options.declaration_enabled() {
                outputs.push(declaration_file_for_source(source, options, config_path));
            }
        }
    }

    if let Some(info) = build_info_path(options, config_path) {
        outputs.push(info);
    }
    outputs
}

/// The JavaScript output emitted for `source`.
pub fn output_file_for_source(
    source: &Path,
    options: &CompilerOptions,
    config_path: &Path,
) -> PathBuf {
    rebased(source, options, options.out_dir.as_deref(), config_path).with_extension("js")
}

/// The declaration output emitted for `source`.
pub fn declaration_file_for_source(
    source: &Path,
    options: &CompilerOptions,
    config_path: &Path,
) -> PathBuf {
    let target = options.declaration_dir.as_deref().or(options.out_dir.as_deref());
    rebased(source, options, target, config_path).with_extension("d.ts")
}

/// Location of the persisted build-info artifact, when the project keeps one.
pub fn build_info_path(options: &CompilerOptions, config_path: &Path) -> Option<PathBuf> {
    if let Some(path) = &options.ts_build_info_file {
        return Some(path.clone());
    }
    options.is_incremental().then(|| config_path.with_extension(BUILD_INFO_EXTENSION))
}

fn rebased(
    source: &Path,
    options: &CompilerOptions,
    target: Option<&Path>,
    config_path: &Path,
) -> PathBuf {
    let Some(target) = target else { return source.to_path_buf() };
    let root = options
        .root_dir
        .clone()
        .or_else(|| config_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    match source.strip_prefix(&root) {
        Ok(relative) => target.join(relative),
        // Source outside the root directory; emit flat into the target.
        Err(_) => target.join(source.file_name().unwrap_or_default()),
    }
}

fn appended(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParsedConfig;
    use similar_asserts::assert_eq;

    fn config(options: CompilerOptions, files: &[&str]) -> ParsedConfig {
        ParsedConfig {
            options,
            file_names: files.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn multi_file_outputs_rebase_into_out_dir() {
        let config = config(
            CompilerOptions {
                out_dir: Some("/proj/dist".into()),
                composite: Some(true),
                ..Default::default()
            },
            &["/proj/src/a.ts", "/proj/src/nested/b.tsx"],
        );
        let outputs = project_outputs(&config, Path::new("/proj/tsconfig.json"));
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("/proj/dist/src/a.js"),
                PathBuf::from("/proj/dist/src/a.d.ts"),
                PathBuf::from("/proj/dist/src/nested/b.js"),
                PathBuf::from("/proj/dist/src/nested/b.d.ts"),
                PathBuf::from("/proj/tsconfig.tsbuildinfo"),
            ]
        );
    }

    #[test]
    fn root_dir_controls_the_rebase() {
        let options = CompilerOptions {
            out_dir: Some("/proj/dist".into()),
            root_dir: Some("/proj/src".into()),
            ..Default::default()
        };
        assert_eq!(
            output_file_for_source(
                Path::new("/proj/src/nested/b.ts"),
                &options,
                Path::new("/proj/tsconfig.json")
            ),
            PathBuf::from("/proj/dist/nested/b.js")
        );
    }

    #[test]
    fn bundle_outputs() {
        let config = config(
            CompilerOptions {
                out_file: Some("/proj/dist/bundle.js".into()),
                declaration: Some(true),
                source_map: Some(true),
                incremental: Some(true),
                ..Default::default()
            },
            &["/proj/src/a.ts"],
        );
        let outputs = project_outputs(&config, Path::new("/proj/tsconfig.json"));
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("/proj/dist/bundle.js"),
                PathBuf::from("/proj/dist/bundle.js.map"),
                PathBuf::from("/proj/dist/bundle.d.ts"),
                PathBuf::from("/proj/tsconfig.tsbuildinfo"),
            ]
        );
    }

    #[test]
    fn declaration_inputs_produce_no_outputs() {
        let config = config(
            CompilerOptions { out_dir: Some("/proj/dist".into()), ..Default::default() },
            &["/proj/src/a.ts", "/proj/src/env.d.ts"],
        );
        let outputs = project_outputs(&config, Path::new("/proj/tsconfig.json"));
        assert_eq!(outputs, vec![PathBuf::from("/proj/dist/src/a.js")]);
    }

    #[test]
    fn explicit_build_info_location_wins() {
        let options = CompilerOptions {
            incremental: Some(true),
            ts_build_info_file: Some("/proj/.cache/info.tsbuildinfo".into()),
            ..Default::default()
        };
        assert_eq!(
            build_info_path(&options, Path::new("/proj/tsconfig.json")),
            Some(PathBuf::from("/proj/.cache/info.tsbuildinfo"))
        );
        assert_eq!(build_info_path(&CompilerOptions::default(), Path::new("/p/t.json")), None);
    }
}
