use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, path::PathBuf};

use crate::constants::CHUNK_CHARACTERISTICS_KEY;

/// One application's `share-usage.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageReport {
    #[serde(rename = "treeShake", default)]
    pub tree_shake: BTreeMap<String, LibraryUsage>,
}

/// Usage of a single shared library as seen by one application build.
///
/// The telemetry stores export flags and the reserved `chunk_characteristics`
/// entry side by side in one JSON object. They are split apart on load so the
/// metadata can never end up in an OR-merge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub struct LibraryUsage {
    pub exports: BTreeMap<String, bool>,
    pub chunk_characteristics: Option<ChunkCharacteristics>,
}

impl From<Value> for LibraryUsage {
    fn from(value: Value) -> Self {
        let Value::Object(entries) = value else {
            return LibraryUsage::default();
        };

        let mut usage = LibraryUsage::default();
        for (key, value) in entries {
            if key == CHUNK_CHARACTERISTICS_KEY {
                if let Value::Object(map) = value {
                    usage.chunk_characteristics = Some(ChunkCharacteristics(map));
                }
                continue;
            }
            usage.exports.insert(key, is_truthy(&value));
        }
        usage
    }
}

/// Build metadata describing how one application emitted one library.
///
/// Kept as the raw JSON object: the pruning engine receives it verbatim, including
/// any fields this tool does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkCharacteristics(Map<String, Value>);

impl ChunkCharacteristics {
    pub fn new(entry_module_id: &str, chunk_files: &[&str]) -> Self {
        let mut map = Map::new();
        map.insert("entry_module_id".to_string(), Value::from(entry_module_id));
        map.insert("chunk_files".to_string(), Value::from(chunk_files.to_vec()));
        ChunkCharacteristics(map)
    }

    /// The entry module id, if present and non-empty. Numeric ids are accepted.
    ///
    /// Stricter than plain JavaScript truthiness: `true`, arrays and objects are
    /// not module ids and count as missing, so such a chunk is never pruned.
    pub fn entry_module_id(&self) -> Option<String> {
        match self.0.get("entry_module_id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(v @ Value::Number(_)) if is_truthy(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Chunk file names in build order, or `None` when the list is missing or not an array.
    /// Non-string entries are dropped.
    pub fn chunk_files(&self) -> Option<Vec<&str>> {
        let files = self.0.get("chunk_files")?.as_array()?;
        Some(files.iter().filter_map(|f| f.as_str()).collect())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// An application whose build output should be inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub name: String,
    pub output_dir: PathBuf,
}

impl AppTarget {
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), output_dir: output_dir.into() }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub app: String,
    pub report: UsageReport,
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
}

/// Export flags OR-merged across every application, keyed by library then export.
#[derive(Debug, Clone, Serialize)]
pub struct MergedUsage {
    #[serde(rename = "treeShake")]
    pub tree_shake: BTreeMap<String, BTreeMap<String, bool>>,
    pub metadata: MergeMetadata,
}

impl MergedUsage {
    pub fn library_flags(&self, library: &str) -> Option<&BTreeMap<String, bool>> {
        self.tree_shake.get(library)
    }
}

/// Traceability data only. Nothing downstream reads it to make a decision.
#[derive(Debug, Clone, Serialize)]
pub struct MergeMetadata {
    pub timestamp: String,
    pub apps: Vec<String>,
    #[serde(rename = "modules")]
    pub libraries: Vec<String>,
}

/// A chunk file on disk, attributed to one library of one application.
#[derive(Debug, Clone)]
pub struct PhysicalChunk {
    pub path: PathBuf,
    pub map_path: PathBuf,
    pub app: String,
    pub file_name: String,
    pub library: String,
    /// The characteristics this application's build recorded for the library.
    pub characteristics: ChunkCharacteristics,
}

/// JavaScript truthiness, which is what the build tool means by a usage flag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_usage_splits_characteristics_from_flags() {
        let usage: LibraryUsage = serde_json::from_value(json!({
            "a": true,
            "b": false,
            "chunk_characteristics": { "entry_module_id": "m1", "chunk_files": ["libX.js"] }
        }))
        .unwrap();

        assert_eq!(usage.exports.len(), 2);
        assert_eq!(usage.exports.get("a"), Some(&true));
        assert_eq!(usage.exports.get("b"), Some(&false));
        assert!(!usage.exports.contains_key("chunk_characteristics"));

        let cc = usage.chunk_characteristics.unwrap();
        assert_eq!(cc.entry_module_id().as_deref(), Some("m1"));
        assert_eq!(cc.chunk_files(), Some(vec!["libX.js"]));
    }

    #[test]
    fn test_non_boolean_flags_are_coerced() {
        let usage: LibraryUsage =
            serde_json::from_value(json!({ "one": 1, "zero": 0, "s": "yes", "empty": "", "n": null }))
                .unwrap();
        assert_eq!(usage.exports.get("one"), Some(&true));
        assert_eq!(usage.exports.get("zero"), Some(&false));
        assert_eq!(usage.exports.get("s"), Some(&true));
        assert_eq!(usage.exports.get("empty"), Some(&false));
        assert_eq!(usage.exports.get("n"), Some(&false));
    }

    #[test]
    fn test_non_object_library_entry_is_empty() {
        let usage: LibraryUsage = serde_json::from_value(json!("garbage")).unwrap();
        assert!(usage.exports.is_empty());
        assert!(usage.chunk_characteristics.is_none());
    }

    #[test]
    fn test_malformed_chunk_files() {
        let cc: ChunkCharacteristics =
            serde_json::from_value(json!({ "entry_module_id": "m1", "chunk_files": "libX.js" }))
                .unwrap();
        assert_eq!(cc.chunk_files(), None);

        let cc: ChunkCharacteristics =
            serde_json::from_value(json!({ "chunk_files": ["a.js", 3, null, "b.js"] })).unwrap();
        assert_eq!(cc.chunk_files(), Some(vec!["a.js", "b.js"]));
        assert_eq!(cc.entry_module_id(), None);
    }

    #[test]
    fn test_entry_module_id_variants() {
        let numeric: ChunkCharacteristics =
            serde_json::from_value(json!({ "entry_module_id": 42 })).unwrap();
        assert_eq!(numeric.entry_module_id().as_deref(), Some("42"));

        let empty: ChunkCharacteristics =
            serde_json::from_value(json!({ "entry_module_id": "" })).unwrap();
        assert_eq!(empty.entry_module_id(), None);

        for value in [json!(true), json!({ "id": "m1" }), json!(["m1"]), json!(0)] {
            let cc: ChunkCharacteristics =
                serde_json::from_value(json!({ "entry_module_id": value })).unwrap();
            assert_eq!(cc.entry_module_id(), None);
        }
    }

    #[test]
    fn test_usage_report_without_tree_shake() {
        let report: UsageReport = serde_json::from_str("{}").unwrap();
        assert!(report.tree_shake.is_empty());
    }

    #[test]
    fn test_characteristics_round_trip_verbatim() {
        let raw = json!({ "entry_module_id": "m1", "chunk_files": ["x.js"], "shared_key": "k" });
        let cc: ChunkCharacteristics = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&cc).unwrap(), raw);
    }
}
