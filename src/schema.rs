//! Schema types and structures

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::checksum::Checksum;
use crate::error::Result;
use crate::value::{Value, ValueKind};

/// Type of a schema field
///
/// Payloads exist only on the variants that use them: `items` for arrays and
/// the referenced definition id for the three ref kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<FieldDescriptor>>,
    },
    EnumRef {
        #[serde(rename = "ref")]
        reference: String,
    },
    InterfaceRef {
        #[serde(rename = "ref")]
        reference: String,
    },
    PrimitiveRef {
        #[serde(rename = "ref")]
        reference: String,
    },
}

/// Payload-free tag of a [`FieldType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    EnumRef,
    InterfaceRef,
    PrimitiveRef,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::EnumRef => "enum-ref",
            FieldKind::InterfaceRef => "interface-ref",
            FieldKind::PrimitiveRef => "primitive-ref",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FieldType {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::String => FieldKind::String,
            FieldType::Number => FieldKind::Number,
            FieldType::Boolean => FieldKind::Boolean,
            FieldType::Object => FieldKind::Object,
            FieldType::Array { .. } => FieldKind::Array,
            FieldType::EnumRef { .. } => FieldKind::EnumRef,
            FieldType::InterfaceRef { .. } => FieldKind::InterfaceRef,
            FieldType::PrimitiveRef { .. } => FieldKind::PrimitiveRef,
        }
    }

    /// Referenced definition id, for ref kinds
    pub fn reference(&self) -> Option<&str> {
        match self {
            FieldType::EnumRef { reference }
            | FieldType::InterfaceRef { reference }
            | FieldType::PrimitiveRef { reference } => Some(reference),
            _ => None,
        }
    }

    /// Same type tag and, for ref kinds, the same referenced id.
    ///
    /// Array item descriptors are not compared.
    pub fn same_type(&self, other: &FieldType) -> bool {
        self.kind() == other.kind() && self.reference() == other.reference()
    }

    /// Human-readable signature used in error messages (`interface-ref<User>`)
    pub fn signature(&self) -> String {
        match self.reference() {
            Some(reference) => format!("{}<{}>", self.kind(), reference),
            None => self.kind().to_string(),
        }
    }
}

/// A named side predicate run after a field's type check
#[derive(Clone)]
pub struct Predicate {
    name: String,
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new(name: impl Into<String>, check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Predicate accepting strings that match `pattern`
    pub fn pattern(name: impl Into<String>, pattern: Regex) -> Self {
        Self::new(name, move |value| {
            value.as_str().map(|s| pattern.is_match(s)).unwrap_or(false)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

// Compared by name
impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// Description of one schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(flatten)]
    pub ty: FieldType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub nullable: bool,
    /// Serialized by name only; never read back
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Predicate>,
}

impl FieldDescriptor {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            optional: false,
            nullable: false,
            validate: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    /// Array without element validation
    pub fn array() -> Self {
        Self::new(FieldType::Array { items: None })
    }

    pub fn array_of(items: FieldDescriptor) -> Self {
        Self::new(FieldType::Array {
            items: Some(Box::new(items)),
        })
    }

    pub fn enum_ref(reference: impl Into<String>) -> Self {
        Self::new(FieldType::EnumRef {
            reference: reference.into(),
        })
    }

    pub fn interface_ref(reference: impl Into<String>) -> Self {
        Self::new(FieldType::InterfaceRef {
            reference: reference.into(),
        })
    }

    pub fn primitive_ref(reference: impl Into<String>) -> Self {
        Self::new(FieldType::PrimitiveRef {
            reference: reference.into(),
        })
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_validator(mut self, predicate: Predicate) -> Self {
        self.validate = Some(predicate);
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.ty.kind()
    }

    /// Infer a descriptor from a runtime value.
    ///
    /// Lossy: a null says nothing about the type, so it becomes an optional,
    /// nullable placeholder tagged `object`. Arrays carry no item type and
    /// nested records collapse to `object`.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => Self::object().optional().nullable(),
            Value::Bool(_) => Self::boolean(),
            Value::Number(_) => Self::number(),
            Value::String(_) => Self::string(),
            Value::Array(_) => Self::array(),
            Value::Object(_) => Self::object(),
            Value::Instance(instance) => Self::interface_ref(instance.definition_id()),
        }
    }
}

/// Base type of a primitive refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    String,
    Number,
    Boolean,
}

impl BaseType {
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value.kind()),
            (BaseType::String, ValueKind::String)
                | (BaseType::Number, ValueKind::Number)
                | (BaseType::Boolean, ValueKind::Boolean)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::String => "string",
            BaseType::Number => "number",
            BaseType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to descriptor mapping of an interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), descriptor);
        self
    }

    /// Insert a field, returning the descriptor it replaced
    pub fn insert(&mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Option<FieldDescriptor> {
        self.fields.insert(name.into(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldDescriptor> {
        self.fields.iter()
    }

    /// Compute the checksum of this schema's canonical JSON form
    pub fn checksum(&self) -> Result<Checksum> {
        Ok(Checksum::from_json(&serde_json::to_value(self)?))
    }
}

impl FromIterator<(String, FieldDescriptor)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, FieldDescriptor)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Schema {
    type Item = (String, FieldDescriptor);
    type IntoIter = btree_map::IntoIter<String, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = (&'a String, &'a FieldDescriptor);
    type IntoIter = btree_map::Iter<'a, String, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
