//! Definitions and the factory that registers them
//!
//! Factory calls are idempotent per id: asking for an id that is already
//! registered with the same kind returns the stored definition unchanged,
//! which keeps re-entrant initialization code safe. Asking for it with a
//! different kind is a registry collision.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::instance::{Instance, InstanceMeta};
use crate::registry::{DefinitionKind, RegisteredDefinition, Registry, RegistryEntry};
use crate::schema::{BaseType, Predicate, Schema};
use crate::validate::{collect_schema_errors, validate_schema};
use crate::value::{Record, Value};

/// Common surface of every registered definition
pub trait Definition: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> DefinitionKind;

    fn version(&self) -> u32;

    /// Field schema, for interface definitions
    fn schema(&self) -> Option<&Schema> {
        None
    }

    /// Non-failing check
    fn accepts(&self, registry: &Registry, value: &Value) -> bool;

    /// Validate and brand a value
    fn create_value(&self, registry: &Registry, value: Value) -> Result<Value>;
}

// =============================================================================
// Interface definitions
// =============================================================================

/// A named record shape
#[derive(Debug)]
pub struct InterfaceDefinition {
    id: String,
    lineage: String,
    schema: Arc<Schema>,
    version: u32,
    checksum: Checksum,
    synthesized: bool,
}

impl InterfaceDefinition {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id migration edges for this definition are keyed by
    pub fn lineage(&self) -> &str {
        &self.lineage
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// True for migration targets whose schema was inferred rather than declared
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Validate `data` and wrap it in an [`Instance`].
    ///
    /// Non-record input is rejected before any field is looked at; the first
    /// field violation is returned as is.
    pub fn create(&self, registry: &Registry, data: impl Into<Value>) -> Result<Instance> {
        let record = self.to_record(data.into())?;
        validate_schema(registry, &record, &self.schema, &self.id)?;
        Ok(self.brand(record))
    }

    /// Same checks as [`create`](Self::create), reduced to a boolean
    pub fn validate(&self, registry: &Registry, data: &Value) -> bool {
        match data.as_record() {
            Some(record) => validate_schema(registry, record, &self.schema, &self.id).is_ok(),
            None => false,
        }
    }

    /// Every field violation instead of the first one
    pub fn check(&self, registry: &Registry, data: &Value) -> Vec<SchemaError> {
        match data.as_record() {
            Some(record) => collect_schema_errors(registry, record, &self.schema, &self.id),
            None => vec![self.not_a_record(data)],
        }
    }

    pub(crate) fn brand(&self, record: Record) -> Instance {
        Instance::new(
            record,
            InstanceMeta {
                definition_id: self.id.clone(),
                lineage: self.lineage.clone(),
                version: self.version,
                schema: self.schema.clone(),
                checksum: self.checksum.clone(),
            },
        )
    }

    fn to_record(&self, value: Value) -> Result<Record> {
        match value {
            Value::Object(record) => Ok(record),
            Value::Instance(instance) => Ok(instance.into_data()),
            other => Err(self.not_a_record(&other)),
        }
    }

    fn not_a_record(&self, value: &Value) -> SchemaError {
        SchemaError::NotARecord {
            owner: self.id.clone(),
            found: value.kind().to_string(),
        }
    }
}

impl Definition for InterfaceDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DefinitionKind {
        DefinitionKind::Interface
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    fn accepts(&self, registry: &Registry, value: &Value) -> bool {
        self.validate(registry, value)
    }

    fn create_value(&self, registry: &Registry, value: Value) -> Result<Value> {
        self.create(registry, value).map(Value::Instance)
    }
}

// =============================================================================
// Primitive definitions
// =============================================================================

/// A refinement of a primitive base type
#[derive(Debug)]
pub struct PrimitiveDefinition {
    id: String,
    base: BaseType,
    predicate: Option<Predicate>,
    version: u32,
}

impl PrimitiveDefinition {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_type(&self) -> BaseType {
        self.base
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Check the base type, then the predicate
    pub fn create(&self, value: impl Into<Value>) -> Result<Value> {
        let value = value.into();
        if !self.base.matches(&value) {
            return Err(SchemaError::TypeMismatch {
                owner: self.id.clone(),
                field: "value".to_string(),
                expected: self.base.to_string(),
                found: value.kind().to_string(),
            });
        }
        if let Some(predicate) = &self.predicate {
            if !predicate.test(&value) {
                return Err(SchemaError::PredicateFailed {
                    owner: self.id.clone(),
                    predicate: predicate.name().to_string(),
                });
            }
        }
        Ok(value)
    }

    pub fn validate(&self, value: &Value) -> bool {
        self.base.matches(value) && self.predicate.as_ref().map(|p| p.test(value)).unwrap_or(true)
    }
}

impl Definition for PrimitiveDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DefinitionKind {
        DefinitionKind::Primitive
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn accepts(&self, _registry: &Registry, value: &Value) -> bool {
        self.validate(value)
    }

    fn create_value(&self, _registry: &Registry, value: Value) -> Result<Value> {
        self.create(value)
    }
}

// =============================================================================
// Opaque definitions
// =============================================================================

/// Registry presence of an opaque wrapper type; only the base type is checked
#[derive(Debug)]
pub struct OpaqueDefinition {
    id: String,
    base: BaseType,
    version: u32,
}

impl OpaqueDefinition {
    pub fn base_type(&self) -> BaseType {
        self.base
    }
}

impl Definition for OpaqueDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DefinitionKind {
        DefinitionKind::Opaque
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn accepts(&self, _registry: &Registry, value: &Value) -> bool {
        self.base.matches(value)
    }

    fn create_value(&self, _registry: &Registry, value: Value) -> Result<Value> {
        if self.base.matches(&value) {
            Ok(value)
        } else {
            Err(SchemaError::TypeMismatch {
                owner: self.id.clone(),
                field: "value".to_string(),
                expected: self.base.to_string(),
                found: value.kind().to_string(),
            })
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Options for [`create_interface_definition_with`]
#[derive(Debug, Clone, Default)]
pub struct DefinitionOptions {
    /// Defaults to the registry's configured default version
    pub version: Option<u32>,
}

impl DefinitionOptions {
    pub fn version(version: u32) -> Self {
        Self { version: Some(version) }
    }
}

/// Define (or fetch) an interface at the default version
pub fn create_interface_definition(
    registry: &mut Registry,
    id: impl Into<String>,
    schema: Schema,
) -> Result<Arc<InterfaceDefinition>> {
    create_interface_definition_with(registry, id, schema, DefinitionOptions::default())
}

/// Define (or fetch) an interface.
///
/// A repeat call for a registered interface id returns the original
/// definition and ignores `schema` and `options`.
pub fn create_interface_definition_with(
    registry: &mut Registry,
    id: impl Into<String>,
    schema: Schema,
    options: DefinitionOptions,
) -> Result<Arc<InterfaceDefinition>> {
    let id = id.into();
    let version = options.version.unwrap_or(registry.config().default_version);
    register_interface(registry, id.clone(), id, schema, version, false)
}

/// Define the explicit target of a migration: `<lineage><sep><version>`.
///
/// The new definition shares `base`'s lineage, so migration edges registered
/// against `base` keep applying to its instances.
pub fn create_version_definition(
    registry: &mut Registry,
    base: &InterfaceDefinition,
    version: u32,
    schema: Schema,
) -> Result<Arc<InterfaceDefinition>> {
    let id = registry.version_id(base.lineage(), version);
    register_interface(registry, id, base.lineage().to_string(), schema, version, false)
}

pub(crate) fn register_interface(
    registry: &mut Registry,
    id: String,
    lineage: String,
    schema: Schema,
    version: u32,
    synthesized: bool,
) -> Result<Arc<InterfaceDefinition>> {
    let checksum = schema.checksum()?;

    if let Some(entry) = registry.get_by_id(&id) {
        return match entry.definition() {
            RegisteredDefinition::Interface(existing) => {
                if existing.checksum != checksum {
                    warn!(
                        id = %id,
                        registered = existing.checksum.short(),
                        ignored = checksum.short(),
                        "interface already registered, ignoring new schema"
                    );
                }
                Ok(existing.clone())
            }
            other => Err(SchemaError::RegistryCollision {
                id,
                existing: other.kind(),
                requested: DefinitionKind::Interface,
            }),
        };
    }

    let definition = Arc::new(InterfaceDefinition {
        id,
        lineage,
        schema: Arc::new(schema),
        version,
        checksum,
        synthesized,
    });
    registry.register(RegistryEntry::new(RegisteredDefinition::Interface(definition.clone())))?;
    debug!(
        id = %definition.id,
        version = definition.version,
        fields = definition.schema.len(),
        "defined interface"
    );
    Ok(definition)
}

/// Define (or fetch) a primitive refinement
pub fn create_primitive_definition(
    registry: &mut Registry,
    id: impl Into<String>,
    base: BaseType,
    predicate: Option<Predicate>,
) -> Result<Arc<PrimitiveDefinition>> {
    let id = id.into();
    if let Some(entry) = registry.get_by_id(&id) {
        return match entry.definition() {
            RegisteredDefinition::Primitive(existing) => Ok(existing.clone()),
            other => Err(SchemaError::RegistryCollision {
                id,
                existing: other.kind(),
                requested: DefinitionKind::Primitive,
            }),
        };
    }

    let definition = Arc::new(PrimitiveDefinition {
        id,
        base,
        predicate,
        version: registry.config().default_version,
    });
    registry.register(RegistryEntry::new(RegisteredDefinition::Primitive(definition.clone())))?;
    debug!(id = %definition.id, base = %base, "defined primitive");
    Ok(definition)
}

/// Register an opaque wrapper type's id
pub fn create_opaque_definition(
    registry: &mut Registry,
    id: impl Into<String>,
    base: BaseType,
) -> Result<Arc<OpaqueDefinition>> {
    let id = id.into();
    if let Some(entry) = registry.get_by_id(&id) {
        return match entry.definition() {
            RegisteredDefinition::Opaque(existing) => Ok(existing.clone()),
            other => Err(SchemaError::RegistryCollision {
                id,
                existing: other.kind(),
                requested: DefinitionKind::Opaque,
            }),
        };
    }

    let definition = Arc::new(OpaqueDefinition {
        id,
        base,
        version: registry.config().default_version,
    });
    registry.register(RegistryEntry::new(RegisteredDefinition::Opaque(definition.clone())))?;
    debug!(id = %definition.id, base = %base, "defined opaque type");
    Ok(definition)
}
