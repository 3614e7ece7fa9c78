//! Data pack layout and the build summary.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Name of the summary file at the output root.
pub const SUMMARY_FILE: &str = "mcfc-build.json";

pub const PACK_META_FILE: &str = "pack.mcmeta";

pub const PROCEDURE_EXTENSION: &str = "mcfunction";

/// One file of the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub contents: String,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Data pack format number for a game version (`major*100 + minor`).
pub fn pack_format(version: u32) -> u32 {
    match version {
        ..=1202 => 18,
        1203..=1204 => 26,
        1205..=1209 => 41,
        1210..=1211 => 48,
        1212..=1213 => 57,
        _ => 61,
    }
}

pub fn pack_meta(namespace: &str, version: u32) -> OutputFile {
    let meta = json!({
        "pack": {
            "pack_format": pack_format(version),
            "description": format!("{namespace} (generated by mcfc)"),
        }
    });
    OutputFile::new(PACK_META_FILE, pretty(&meta))
}

/// `data/<ns>/<function dir>/<path>.mcfunction`.
pub fn procedure_file(namespace: &str, function_dir: &str, path: &str, lines: &[String]) -> OutputFile {
    let mut contents = lines.join("\n");
    contents.push('\n');
    OutputFile::new(
        format!("data/{namespace}/{function_dir}/{path}.{PROCEDURE_EXTENSION}"),
        contents,
    )
}

/// The `minecraft:load` tag running `init` on every reload.
pub fn load_tag(function_dir: &str, init: &str) -> OutputFile {
    let tag = json!({ "values": [init] });
    OutputFile::new(format!("data/minecraft/tags/{function_dir}/load.json"), pretty(&tag))
}

fn pretty(value: &serde_json::Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_default();
    text.push('\n');
    text
}

/// SHA-256 over every file's path and contents, in output order.
pub fn fingerprint(files: &[OutputFile]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.path.as_bytes());
        hasher.update([0]);
        hasher.update(file.contents.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

/// Contents of `mcfc-build.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub namespace: String,
    pub version: u32,
    pub pack_format: u32,
    /// Signatures of the entry points.
    pub entries: Vec<String>,
    /// Signature of the initialization procedure.
    pub init: String,
    /// Number of generated procedures.
    pub procedures: usize,
    /// Components in link order.
    pub components: Vec<String>,
    pub library_procedures: usize,
    pub resources: usize,
    pub warnings: usize,
    /// Values still allocated when generation finished.
    pub leaked: Vec<String>,
    /// SHA-256 of every other output file.
    pub fingerprint: String,
}

impl BuildSummary {
    pub fn to_file(&self) -> OutputFile {
        let mut text = serde_json::to_string_pretty(self).unwrap_or_default();
        text.push('\n');
        OutputFile::new(SUMMARY_FILE, text)
    }
}
