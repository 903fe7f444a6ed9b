//! Branded instances
//!
//! An [`Instance`] is an envelope: the validated data plus the metadata of the
//! definition that produced it. Metadata is only reachable through
//! [`Instance::meta`]; it never shows up among the data's keys and is dropped
//! on serialization.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::checksum::Checksum;
use crate::schema::Schema;
use crate::value::{record_to_json, Record, Value};

/// Out-of-band tags of an instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMeta {
    /// Id of the definition that created the instance
    pub definition_id: String,
    /// Id migration edges are keyed by
    pub lineage: String,
    pub version: u32,
    /// Schema snapshot at creation time
    pub schema: Arc<Schema>,
    pub checksum: Checksum,
}

/// Immutable, validated data tagged with its definition
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    data: Arc<Record>,
    meta: Arc<InstanceMeta>,
}

impl Instance {
    pub(crate) fn new(data: Record, meta: InstanceMeta) -> Self {
        Self {
            data: Arc::new(data),
            meta: Arc::new(meta),
        }
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn meta(&self) -> &InstanceMeta {
        &self.meta
    }

    pub fn definition_id(&self) -> &str {
        &self.meta.definition_id
    }

    pub fn lineage(&self) -> &str {
        &self.meta.lineage
    }

    pub fn version(&self) -> u32 {
        self.meta.version
    }

    pub fn schema(&self) -> &Schema {
        &self.meta.schema
    }

    /// Plain data with the tags stripped
    pub fn into_data(self) -> Record {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        record_to_json(&self.data)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.data.as_ref().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use serde_json::json;

    fn sample() -> Instance {
        let schema = Schema::new().field("name", FieldDescriptor::string());
        let checksum = schema.checksum().unwrap();
        let data = match Value::from(json!({"name": "Alice"})) {
            Value::Object(record) => record,
            _ => unreachable!(),
        };
        Instance::new(
            data,
            InstanceMeta {
                definition_id: "User".to_string(),
                lineage: "User".to_string(),
                version: 1,
                schema: Arc::new(schema),
                checksum,
            },
        )
    }

    #[test]
    fn test_meta_is_out_of_band() {
        let instance = sample();
        assert_eq!(instance.field_names().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(instance.definition_id(), "User");
        assert_eq!(instance.version(), 1);
        assert!(instance.schema().contains("name"));
    }

    #[test]
    fn test_serialize_unwraps_data() {
        let instance = sample();
        assert_eq!(serde_json::to_value(&instance).unwrap(), json!({"name": "Alice"}));
        assert_eq!(instance.to_json(), json!({"name": "Alice"}));
    }

    #[test]
    fn test_into_data_when_shared() {
        let instance = sample();
        let copy = instance.clone();
        let data = instance.into_data();
        assert_eq!(data.get("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(copy.get("name").and_then(Value::as_str), Some("Alice"));
    }
}
