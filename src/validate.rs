//! Field and schema validation
//!
//! Checks a [`Record`] against a [`Schema`], resolving ref-typed fields
//! through the [`Registry`]. `interface-ref` fields only inspect the tag of an
//! already created instance, so schemas may reference themselves or each other
//! without the validator recursing through the cycle.
//!
//! [`validate_schema`] stops at the first violation (fields are visited in
//! name order). [`collect_schema_errors`] is the accumulating twin.

use crate::error::{Result, SchemaError};
use crate::registry::Registry;
use crate::schema::{FieldDescriptor, FieldType, Schema};
use crate::value::{Record, Value, ValueKind};

/// Validate one field value.
///
/// `value` is `None` when the field is absent from the record.
pub fn validate_field(
    registry: &Registry,
    name: &str,
    value: Option<&Value>,
    descriptor: &FieldDescriptor,
    owner: &str,
) -> Result<()> {
    if descriptor.ty.reference() == Some("") {
        return Err(SchemaError::MalformedDescriptor {
            owner: owner.to_string(),
            field: name.to_string(),
            reason: format!("{} without a ref", descriptor.kind()),
        });
    }

    let Some(value) = value else {
        if descriptor.optional {
            return Ok(());
        }
        return Err(SchemaError::MissingField {
            owner: owner.to_string(),
            field: name.to_string(),
        });
    };

    if value.is_null() {
        if descriptor.nullable {
            return Ok(());
        }
        return Err(mismatch(owner, name, descriptor.ty.signature(), value));
    }

    check_type(registry, name, value, &descriptor.ty, owner)?;

    if let Some(predicate) = &descriptor.validate {
        if !predicate.test(value) {
            return Err(SchemaError::CustomPredicateFailed {
                owner: owner.to_string(),
                field: name.to_string(),
                predicate: predicate.name().to_string(),
            });
        }
    }

    Ok(())
}

/// Validate a record against a schema, failing on the first violation
pub fn validate_schema(registry: &Registry, data: &Record, schema: &Schema, owner: &str) -> Result<()> {
    for (name, descriptor) in schema {
        validate_field(registry, name, data.get(name), descriptor, owner)?;
    }
    Ok(())
}

/// Validate a record against a schema, returning every field's first violation
pub fn collect_schema_errors(registry: &Registry, data: &Record, schema: &Schema, owner: &str) -> Vec<SchemaError> {
    schema
        .iter()
        .filter_map(|(name, descriptor)| validate_field(registry, name, data.get(name), descriptor, owner).err())
        .collect()
}

fn check_type(registry: &Registry, name: &str, value: &Value, ty: &FieldType, owner: &str) -> Result<()> {
    let kind = value.kind();
    match ty {
        FieldType::String | FieldType::Number | FieldType::Boolean => {
            let expected = match ty {
                FieldType::String => ValueKind::String,
                FieldType::Number => ValueKind::Number,
                _ => ValueKind::Boolean,
            };
            if kind != expected {
                return Err(mismatch(owner, name, ty.signature(), value));
            }
        }
        FieldType::Object => {
            if !matches!(kind, ValueKind::Object | ValueKind::Instance) {
                return Err(mismatch(owner, name, ty.signature(), value));
            }
        }
        FieldType::Array { items } => {
            let Value::Array(elements) = value else {
                return Err(mismatch(owner, name, ty.signature(), value));
            };
            if let Some(items) = items {
                for (i, element) in elements.iter().enumerate() {
                    validate_field(registry, &format!("{}[{}]", name, i), Some(element), items, owner)?;
                }
            }
        }
        FieldType::EnumRef { reference } => {
            let Some(set) = registry.enums().lookup_enum(reference) else {
                return Err(unresolved(owner, name, "enum", reference));
            };
            if !set.contains(value) {
                return Err(SchemaError::TypeMismatch {
                    owner: owner.to_string(),
                    field: name.to_string(),
                    expected: format!("member of {}", reference),
                    found: value.to_json().to_string(),
                });
            }
        }
        FieldType::InterfaceRef { reference } => {
            if registry.interface(reference).is_none() {
                return Err(unresolved(owner, name, "interface", reference));
            }
            let tagged = value
                .as_instance()
                .map(|instance| instance.definition_id() == reference)
                .unwrap_or(false);
            if !tagged {
                return Err(mismatch(owner, name, format!("instance<{}>", reference), value));
            }
        }
        FieldType::PrimitiveRef { reference } => {
            let Some(primitive) = registry.primitive(reference) else {
                return Err(unresolved(owner, name, "primitive", reference));
            };
            if !primitive.validate(value) {
                return Err(mismatch(owner, name, ty.signature(), value));
            }
        }
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    match value {
        Value::Instance(instance) => format!("instance<{}>", instance.definition_id()),
        other => other.kind().to_string(),
    }
}

fn mismatch(owner: &str, field: &str, expected: String, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        owner: owner.to_string(),
        field: field.to_string(),
        expected,
        found: describe(value),
    }
}

fn unresolved(owner: &str, field: &str, kind: &'static str, reference: &str) -> SchemaError {
    SchemaError::RefNotRegistered {
        owner: owner.to_string(),
        field: field.to_string(),
        kind,
        reference: reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{create_interface_definition, create_primitive_definition};
    use crate::registry::EnumSets;
    use crate::schema::{BaseType, Predicate};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match Value::from(value) {
            Value::Object(record) => record,
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_and_optional() {
        let registry = Registry::new();
        let required = FieldDescriptor::string();
        let optional = FieldDescriptor::string().optional();

        assert!(validate_field(&registry, "name", None, &optional, "User").is_ok());
        let err = validate_field(&registry, "name", None, &required, "User").unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { ref field, ref owner } if field == "name" && owner == "User"));
    }

    #[test]
    fn test_null_handling() {
        let registry = Registry::new();
        let null = Value::Null;

        assert!(validate_field(&registry, "n", Some(&null), &FieldDescriptor::number().nullable(), "T").is_ok());
        let err = validate_field(&registry, "n", Some(&null), &FieldDescriptor::number(), "T").unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
        // optional does not imply nullable
        let err = validate_field(&registry, "n", Some(&null), &FieldDescriptor::number().optional(), "T").unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_primitive_tags_do_not_coerce() {
        let registry = Registry::new();
        let number = Value::from(1);
        let text = Value::from("1");

        assert!(validate_field(&registry, "x", Some(&number), &FieldDescriptor::number(), "T").is_ok());
        assert!(validate_field(&registry, "x", Some(&text), &FieldDescriptor::number(), "T").is_err());
        assert!(validate_field(&registry, "x", Some(&number), &FieldDescriptor::string(), "T").is_err());
        assert!(validate_field(&registry, "x", Some(&Value::Bool(true)), &FieldDescriptor::boolean(), "T").is_ok());
    }

    #[test]
    fn test_object_rejects_array() {
        let registry = Registry::new();
        let obj = Value::from(json!({"a": 1}));
        let arr = Value::from(json!([1]));

        assert!(validate_field(&registry, "o", Some(&obj), &FieldDescriptor::object(), "T").is_ok());
        assert!(validate_field(&registry, "o", Some(&arr), &FieldDescriptor::object(), "T").is_err());
    }

    #[test]
    fn test_array_items_indexed_errors() {
        let registry = Registry::new();
        let descriptor = FieldDescriptor::array_of(FieldDescriptor::number());
        let good = Value::from(json!([1, 2, 3]));
        let bad = Value::from(json!([1, "two", 3]));

        assert!(validate_field(&registry, "scores", Some(&good), &descriptor, "T").is_ok());
        let err = validate_field(&registry, "scores", Some(&bad), &descriptor, "T").unwrap_err();
        assert_eq!(err.field(), Some("scores[1]"));

        // untyped arrays accept anything
        assert!(validate_field(&registry, "any", Some(&bad), &FieldDescriptor::array(), "T").is_ok());
    }

    #[test]
    fn test_nested_array_paths() {
        let registry = Registry::new();
        let descriptor = FieldDescriptor::array_of(FieldDescriptor::array_of(FieldDescriptor::boolean()));
        let bad = Value::from(json!([[true], [false, 0]]));

        let err = validate_field(&registry, "grid", Some(&bad), &descriptor, "T").unwrap_err();
        assert_eq!(err.field(), Some("grid[1][1]"));
    }

    #[test]
    fn test_enum_ref() {
        let mut sets = EnumSets::new();
        sets.define("Role", [Value::from("admin"), Value::from("guest")]);
        let registry = Registry::new().with_enum_lookup(sets);

        let descriptor = FieldDescriptor::enum_ref("Role");
        assert!(validate_field(&registry, "role", Some(&Value::from("admin")), &descriptor, "T").is_ok());
        let err = validate_field(&registry, "role", Some(&Value::from("root")), &descriptor, "T").unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));

        let missing = FieldDescriptor::enum_ref("Nope");
        let err = validate_field(&registry, "role", Some(&Value::from("admin")), &missing, "T").unwrap_err();
        assert!(matches!(err, SchemaError::RefNotRegistered { kind: "enum", .. }));
    }

    #[test]
    fn test_interface_ref_requires_tag() {
        let mut registry = Registry::new();
        let user = create_interface_definition(
            &mut registry,
            "User",
            Schema::new().field("name", FieldDescriptor::string()),
        )
        .unwrap();
        let alice = user.create(&registry, json!({"name": "Alice"})).unwrap();

        let descriptor = FieldDescriptor::interface_ref("User");
        let tagged = Value::from(alice);
        let untagged = Value::from(json!({"name": "Alice"}));

        assert!(validate_field(&registry, "owner", Some(&tagged), &descriptor, "Doc").is_ok());
        let err = validate_field(&registry, "owner", Some(&untagged), &descriptor, "Doc").unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref found, .. } if found == "object"));

        let missing = FieldDescriptor::interface_ref("Ghost");
        let err = validate_field(&registry, "owner", Some(&tagged), &missing, "Doc").unwrap_err();
        assert!(matches!(err, SchemaError::RefNotRegistered { kind: "interface", .. }));
    }

    #[test]
    fn test_primitive_ref_uses_predicate() {
        let mut registry = Registry::new();
        create_primitive_definition(
            &mut registry,
            "Positive",
            BaseType::Number,
            Some(Predicate::new("positive", |v| v.as_f64().map(|n| n > 0.0).unwrap_or(false))),
        )
        .unwrap();

        let descriptor = FieldDescriptor::primitive_ref("Positive");
        assert!(validate_field(&registry, "n", Some(&Value::from(5)), &descriptor, "T").is_ok());
        assert!(validate_field(&registry, "n", Some(&Value::from(-5)), &descriptor, "T").is_err());
        assert!(validate_field(&registry, "n", Some(&Value::from("5")), &descriptor, "T").is_err());
    }

    #[test]
    fn test_malformed_ref_fails_even_when_absent() {
        let registry = Registry::new();
        let descriptor = FieldDescriptor::interface_ref("").optional();
        let err = validate_field(&registry, "owner", None, &descriptor, "T").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_custom_predicate_runs_last() {
        let registry = Registry::new();
        let descriptor = FieldDescriptor::string()
            .with_validator(Predicate::new("non_empty", |v| v.as_str().map(|s| !s.is_empty()).unwrap_or(false)));

        assert!(validate_field(&registry, "s", Some(&Value::from("x")), &descriptor, "T").is_ok());
        let err = validate_field(&registry, "s", Some(&Value::from("")), &descriptor, "T").unwrap_err();
        assert!(matches!(err, SchemaError::CustomPredicateFailed { ref predicate, .. } if predicate == "non_empty"));

        // type check wins over the predicate
        let err = validate_field(&registry, "s", Some(&Value::from(3)), &descriptor, "T").unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_fail_fast_vs_collect() {
        let registry = Registry::new();
        let schema = Schema::new()
            .field("a", FieldDescriptor::string())
            .field("b", FieldDescriptor::number())
            .field("c", FieldDescriptor::boolean());
        let data = record(json!({"a": 1, "c": true}));

        let err = validate_schema(&registry, &data, &schema, "T").unwrap_err();
        assert_eq!(err.field(), Some("a"));

        let errors = collect_schema_errors(&registry, &data, &schema, "T");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].field(), Some("b"));
    }
}
