//! Values handling: format-dispatched loading and deep merge
//!
//! All three source formats normalize into the same tree shape (string,
//! number, boolean, mapping, sequence, null); each format's own scalar
//! typing is preserved, with no cross-format coercion.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

/// A decoder for one serialization format.
type Decoder = fn(&str) -> std::result::Result<Values, String>;

/// Extension registry: which decoder handles which file extension.
const DECODERS: &[(&str, Decoder)] = &[
    ("toml", decode_toml),
    ("yaml", decode_yaml),
    ("yml", decode_yaml),
    ("json", decode_json),
];

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a file, dispatching the decoder on extension.
    ///
    /// `.toml` is TOML, `.yaml`/`.yml` YAML, `.json` JSON; any other
    /// extension fails with `UnsupportedValueFormat`. Malformed content
    /// fails with `ValueParse` carrying the offending path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let decoder = DECODERS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, decoder)| *decoder)
            .ok_or_else(|| EngineError::UnsupportedValueFormat {
                path: path.to_path_buf(),
            })?;

        let content = std::fs::read_to_string(path)?;
        decoder(&content).map_err(|message| EngineError::ValueParse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        decode_yaml(yaml).map_err(|message| EngineError::ValueParse {
            path: "<yaml>".into(),
            message,
        })
    }

    /// Parse values from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        decode_json(json).map_err(|message| EngineError::ValueParse {
            path: "<json>".into(),
            message,
        })
    }

    /// Parse values from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self> {
        decode_toml(toml).map_err(|message| EngineError::ValueParse {
            path: "<toml>".into(),
            message,
        })
    }

    /// Encode to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.0).map_err(|e| EngineError::ValueEncode {
            message: e.to_string(),
        })
    }

    /// Encode to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.0).map_err(|e| EngineError::ValueEncode {
            message: e.to_string(),
        })
    }

    /// Encode to TOML; the root must be a mapping
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(&self.0).map_err(|e| EngineError::ValueEncode {
            message: e.to_string(),
        })
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Mappings: recursive merge
    /// - Sequences: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Merge multiple values in order; later entries win
    pub fn merge_all(values: Vec<Values>) -> Self {
        let mut result = Values::new();
        for v in values {
            result.merge(&v);
        }
        result
    }

    /// Get a value by dotted path (e.g. "image.tag")
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let mut current = &self.0;
        for key in path.split('.') {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Get the inner value tree
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to the inner value tree
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

fn decode_yaml(content: &str) -> std::result::Result<Values, String> {
    serde_yaml::from_str::<JsonValue>(content)
        .map(Values)
        .map_err(|e| e.to_string())
}

fn decode_json(content: &str) -> std::result::Result<Values, String> {
    serde_json::from_str::<JsonValue>(content)
        .map(Values)
        .map_err(|e| e.to_string())
}

fn decode_toml(content: &str) -> std::result::Result<Values, String> {
    toml::from_str::<JsonValue>(content)
        .map(Values)
        .map_err(|e| e.to_string())
}

/// Deep merge two value trees
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(
            r#"
image:
  repository: nginx
  tag: "1.0"
replicas: 1
"#,
        )
        .unwrap();

        let overlay = Values::from_yaml(
            r#"
image:
  tag: "2.0"
  pullPolicy: Always
replicas: 3
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("image.repository").unwrap(), "nginx");
        assert_eq!(base.get("image.tag").unwrap(), "2.0");
        assert_eq!(base.get("image.pullPolicy").unwrap(), "Always");
        assert_eq!(base.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_merge_replaces_sequences() {
        let mut base = Values::from_yaml("items: [a, b, c]").unwrap();
        let overlay = Values::from_yaml("items: [d]").unwrap();
        base.merge(&overlay);

        assert_eq!(base.get("items").unwrap(), &serde_json::json!(["d"]));
    }

    #[test]
    fn test_merge_all_later_wins() {
        let merged = Values::merge_all(vec![
            Values::from_yaml("a: 1\nb: 1").unwrap(),
            Values::from_yaml("b: 2\nc: 2").unwrap(),
            Values::from_yaml("c: 3").unwrap(),
        ]);

        assert_eq!(merged.get("a").unwrap(), 1);
        assert_eq!(merged.get("b").unwrap(), 2);
        assert_eq!(merged.get("c").unwrap(), 3);
    }

    #[test]
    fn test_extension_dispatch() {
        let temp = TempDir::new().unwrap();

        let toml_path = temp.path().join("v.toml");
        std::fs::write(&toml_path, "Namespace = \"goldie\"\n[image]\ntag = \"v1\"\n").unwrap();
        let yaml_path = temp.path().join("v.yaml");
        std::fs::write(&yaml_path, "Namespace: goldie\nimage:\n  tag: v1\n").unwrap();
        let json_path = temp.path().join("v.json");
        std::fs::write(&json_path, r#"{"Namespace": "goldie", "image": {"tag": "v1"}}"#).unwrap();

        for path in [&toml_path, &yaml_path, &json_path] {
            let values = Values::from_file(path).unwrap();
            assert_eq!(values.get("Namespace").unwrap(), "goldie");
            assert_eq!(values.get("image.tag").unwrap(), "v1");
        }
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("v.ini");
        std::fs::write(&path, "a = 1").unwrap();

        let result = Values::from_file(&path);
        assert!(matches!(
            result,
            Err(EngineError::UnsupportedValueFormat { .. })
        ));
    }

    #[test]
    fn test_missing_extension_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("values");
        std::fs::write(&path, "a: 1").unwrap();

        assert!(matches!(
            Values::from_file(&path),
            Err(EngineError::UnsupportedValueFormat { .. })
        ));
    }

    #[test]
    fn test_malformed_content_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        match Values::from_file(&path) {
            Err(EngineError::ValueParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected ValueParse, got {other:?}"),
        }
    }

    #[test]
    fn test_native_types_preserved() {
        let values = Values::from_toml(
            "count = 3\nratio = 0.5\nenabled = true\nname = \"x\"\nitems = [1, 2]\n",
        )
        .unwrap();

        assert_eq!(values.get("count").unwrap(), 3);
        assert_eq!(values.get("ratio").unwrap(), 0.5);
        assert_eq!(values.get("enabled").unwrap(), true);
        assert_eq!(values.get("name").unwrap(), "x");
        assert_eq!(values.get("items").unwrap(), &serde_json::json!([1, 2]));
    }

    #[test]
    fn test_round_trip_all_formats() {
        let original = Values::from_yaml(
            r#"
name: app
replicas: 3
enabled: true
labels:
  tier: web
items:
  - a
  - b
"#,
        )
        .unwrap();

        let from_yaml = Values::from_yaml(&original.to_yaml().unwrap()).unwrap();
        assert_eq!(from_yaml, original);

        let from_json = Values::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(from_json, original);

        let from_toml = Values::from_toml(&original.to_toml().unwrap()).unwrap();
        assert_eq!(from_toml, original);
    }
}
