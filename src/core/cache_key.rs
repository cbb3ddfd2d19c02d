use crate::utils::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_NAMESPACE: &str = "comexstat";

/// 產生與欄位順序無關的快取 key: `<namespace>:<kind>:<canonical json>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyCodec {
    namespace: String,
}

impl Default for CacheKeyCodec {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl CacheKeyCodec {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn encode<P: Serialize + ?Sized>(&self, kind: &str, payload: &P) -> Result<String> {
        let value = serde_json::to_value(payload)?;
        let canonical = serde_json::to_string(&normalize(value))?;
        Ok(format!("{}:{}:{}", self.namespace, kind, canonical))
    }
}

/// 物件 key 排序並移除值為 null 的欄位；陣列維持原順序
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(object) => {
            let mut entries: Vec<(String, Value)> = object
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, value);
            }
            Value::Object(sorted)
        }
        other => other,
    }
}
