//! Persisted per-project build metadata.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Write as _, path::PathBuf};
use tsbuild_core::error::Result;

/// File extension of the persisted build-info artifact.
pub const BUILD_INFO_EXTENSION: &str = "tsbuildinfo";

/// Build metadata persisted next to a project's outputs after a successful
/// build of an incremental project.
///
/// The schema is owned by the compiler; the orchestrator reads only
/// [`version`](Self::version) to decide whether persisted state from an
/// earlier compiler release may be reused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Version of the compiler that produced this file.
    pub version: String,
    /// Content signatures of the emitted outputs, keyed by output path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signatures: BTreeMap<PathBuf, String>,
    /// Opaque program snapshot used for bundle-only updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<serde_json::Value>,
}

impl BuildInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into(), signatures: BTreeMap::new(), program: None }
    }

    /// Parses a persisted build-info file.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The recorded compiler version, when it is well-formed semver.
    pub fn semver_version(&self) -> Result<semver::Version> {
        Ok(semver::Version::parse(&self.version)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Content signature recorded for emitted outputs.
    pub fn signature(content: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_and_tolerates_unknown_program_payload() {
        let info = BuildInfo::parse(
            r#"{"version": "5.1.0", "program": {"fileInfos": [], "options": {}}}"#,
        )
        .unwrap();
        assert_eq!(info.version, "5.1.0");
        assert!(info.program.is_some());
        assert!(info.signatures.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(BuildInfo::parse("not json").is_err());
    }

    #[test]
    fn signatures_are_stable_and_content_sensitive() {
        let a = BuildInfo::signature("export declare const x: number;\n");
        let b = BuildInfo::signature("export declare const x: number;\n");
        let c = BuildInfo::signature("export declare const x: string;\n");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
