use crate::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The subset of compiler options the build orchestrator inspects.
///
/// Unknown options are the compiler's business; the parser carries them past
/// this struct. All paths are absolute and normalized by the parser.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    /// Bundle all outputs into a single file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_file: Option<PathBuf>,
    /// Directory for emitted JavaScript outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    /// Root of the input tree; inputs are rebased from here into `out_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,
    /// Directory for emitted declaration outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<bool>,
    /// The project may be referenced by other projects; implies declaration
    /// outputs and build-info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,
    /// Explicit location for the persisted build-info artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_build_info_file: Option<PathBuf>,
}

impl CompilerOptions {
    /// Whether declaration outputs are emitted.
    pub fn declaration_enabled(&self) -> bool {
        self.declaration.unwrap_or(false) || self.is_composite()
    }

    /// Whether the project persists build-info between runs.
    pub fn is_incremental(&self) -> bool {
        self.incremental.unwrap_or(false) || self.is_composite()
    }

    pub fn is_composite(&self) -> bool {
        self.composite.unwrap_or(false)
    }

    /// Overlays `self` onto `base`, field by field.
    pub fn with_base(&self, base: &Self) -> Self {
        macro_rules! pick {
            ($field:ident) => {
                self.$field.clone().or_else(|| base.$field.clone())
            };
        }
        Self {
            out_file: pick!(out_file),
            out_dir: pick!(out_dir),
            root_dir: pick!(root_dir),
            declaration_dir: pick!(declaration_dir),
            declaration: pick!(declaration),
            source_map: pick!(source_map),
            composite: pick!(composite),
            incremental: pick!(incremental),
            ts_build_info_file: pick!(ts_build_info_file),
        }
    }
}

/// A directed edge to another project this one depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    /// Path to the referenced project's configuration file.
    pub path: PathBuf,
    /// The upstream bundle output is concatenated into this project's bundle.
    #[serde(default)]
    pub prepend: bool,
    /// The author expects this edge to participate in a cycle; suppresses the
    /// circularity diagnostic.
    #[serde(default)]
    pub circular: bool,
}

impl ProjectReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), prepend: false, circular: false }
    }
}

/// A wildcard directory named by the configuration's include patterns;
/// watched in watch mode and re-expanded on `Partial` reloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WildcardDirectory {
    pub path: PathBuf,
    #[serde(default)]
    pub recursive: bool,
}

/// A successfully parsed project configuration, as handed over by the
/// external config parser.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedConfig {
    pub options: CompilerOptions,
    /// Expanded input file list, absolute and normalized.
    pub file_names: Vec<PathBuf>,
    pub references: Vec<ProjectReference>,
    pub wildcard_directories: Vec<WildcardDirectory>,
    /// The configuration files this one transitively extends.
    pub extended_configs: Vec<PathBuf>,
    /// Recoverable diagnostics produced while parsing.
    pub errors: Vec<Diagnostic>,
    /// The raw config demanded explicit inputs, so an empty file list is an
    /// error rather than a container project.
    pub errors_on_no_inputs: bool,
}

impl ParsedConfig {
    /// A project with no inputs of its own, aggregating references only.
    pub fn is_container(&self) -> bool {
        self.file_names.is_empty() && !self.errors_on_no_inputs
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|d| d.is_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_camel_case() {
        let options: CompilerOptions = serde_json::from_str(
            r#"{"outDir": "/proj/dist", "composite": true, "tsBuildInfoFile": "/proj/cache.tsbuildinfo"}"#,
        )
        .unwrap();
        assert_eq!(options.out_dir, Some(PathBuf::from("/proj/dist")));
        assert!(options.is_composite());
        assert!(options.declaration_enabled());
        assert!(options.is_incremental());
        assert_eq!(options.ts_build_info_file, Some(PathBuf::from("/proj/cache.tsbuildinfo")));
    }

    #[test]
    fn base_options_fill_gaps_only() {
        let base = CompilerOptions {
            declaration: Some(true),
            out_dir: Some("/base/out".into()),
            ..Default::default()
        };
        let own = CompilerOptions { out_dir: Some("/proj/out".into()), ..Default::default() };
        let merged = own.with_base(&base);
        assert_eq!(merged.out_dir, Some(PathBuf::from("/proj/out")));
        assert_eq!(merged.declaration, Some(true));
    }

    #[test]
    fn container_detection_respects_no_input_errors() {
        let container = ParsedConfig::default();
        assert!(container.is_container());

        let strict = ParsedConfig { errors_on_no_inputs: true, ..Default::default() };
        assert!(!strict.is_container());

        let with_files =
            ParsedConfig { file_names: vec!["/proj/a.ts".into()], ..Default::default() };
        assert!(!with_files.is_container());
    }
}
