//! Definition Registry
//!
//! An explicit id → definition store. Every factory, composition and
//! migration call takes the registry it operates on; there is no global
//! instance. Ids share one flat namespace across kinds, and reusing an id for
//! a different kind is a [`SchemaError::RegistryCollision`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::definition::{Definition, InterfaceDefinition, OpaqueDefinition, PrimitiveDefinition};
use crate::error::{Result, SchemaError};
use crate::value::Value;

/// Kind of a registered definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Interface,
    Primitive,
    Opaque,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefinitionKind::Interface => "interface",
            DefinitionKind::Primitive => "primitive",
            DefinitionKind::Opaque => "opaque",
        })
    }
}

/// The canonical, shared handle to a registered definition
#[derive(Debug, Clone)]
pub enum RegisteredDefinition {
    Interface(Arc<InterfaceDefinition>),
    Primitive(Arc<PrimitiveDefinition>),
    Opaque(Arc<OpaqueDefinition>),
}

impl RegisteredDefinition {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            RegisteredDefinition::Interface(_) => DefinitionKind::Interface,
            RegisteredDefinition::Primitive(_) => DefinitionKind::Primitive,
            RegisteredDefinition::Opaque(_) => DefinitionKind::Opaque,
        }
    }

    pub fn id(&self) -> &str {
        self.as_definition().id()
    }

    pub fn as_definition(&self) -> &dyn Definition {
        match self {
            RegisteredDefinition::Interface(def) => def.as_ref() as &dyn Definition,
            RegisteredDefinition::Primitive(def) => def.as_ref() as &dyn Definition,
            RegisteredDefinition::Opaque(def) => def.as_ref() as &dyn Definition,
        }
    }

    /// Owned trait-object handle, for consumers like the codec pipeline
    pub fn to_shared(&self) -> Arc<dyn Definition> {
        match self {
            RegisteredDefinition::Interface(def) => def.clone() as Arc<dyn Definition>,
            RegisteredDefinition::Primitive(def) => def.clone() as Arc<dyn Definition>,
            RegisteredDefinition::Opaque(def) => def.clone() as Arc<dyn Definition>,
        }
    }
}

/// A registry record
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    id: String,
    kind: DefinitionKind,
    definition: RegisteredDefinition,
    registered_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn new(definition: RegisteredDefinition) -> Self {
        Self {
            id: definition.id().to_string(),
            kind: definition.kind(),
            definition,
            registered_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    pub fn definition(&self) -> &RegisteredDefinition {
        &self.definition
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

// =============================================================================
// Enum lookup seam
// =============================================================================

/// The set of values an enum brand admits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumValueSet {
    values: Vec<Value>,
}

impl EnumValueSet {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Membership test. Numbers compare by value, so `1.0` is a member of `{1, 2}`.
    pub fn contains(&self, value: &Value) -> bool {
        self.values.iter().any(|member| same_member(member, value))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

fn same_member(member: &Value, value: &Value) -> bool {
    match (member, value) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => match (a.as_u64(), b.as_u64()) {
                (Some(a), Some(b)) => a == b,
                _ => a.as_f64().zip(b.as_f64()).map(|(a, b)| a == b).unwrap_or(false),
            },
        },
        _ => member == value,
    }
}

/// Resolves `enum-ref` targets.
///
/// The enum-branding facility lives outside this crate; validation only needs
/// to ask it for a value set by id.
pub trait EnumLookup: Send + Sync {
    fn lookup_enum(&self, id: &str) -> Option<&EnumValueSet>;
}

/// In-memory enum value sets
#[derive(Debug, Clone, Default)]
pub struct EnumSets {
    sets: HashMap<String, EnumValueSet>,
}

impl EnumSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or replace) a value set
    pub fn define(&mut self, id: impl Into<String>, values: impl IntoIterator<Item = Value>) -> &mut Self {
        self.sets.insert(id.into(), EnumValueSet::new(values));
        self
    }
}

impl EnumLookup for EnumSets {
    fn lookup_enum(&self, id: &str) -> Option<&EnumValueSet> {
        self.sets.get(id)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Fuzzy id search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub kind: DefinitionKind,
    pub score: i64,
}

/// The definition store
pub struct Registry {
    entries: HashMap<String, RegistryEntry>,
    enums: Arc<dyn EnumLookup>,
    config: RegistryConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Registry {
    /// Create an empty registry with an empty enum store
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: HashMap::new(),
            enums: Arc::new(EnumSets::new()),
            config,
        }
    }

    /// Replace the enum lookup used by `enum-ref` validation
    pub fn with_enum_lookup(mut self, enums: impl EnumLookup + 'static) -> Self {
        self.enums = Arc::new(enums);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn enums(&self) -> &dyn EnumLookup {
        self.enums.as_ref()
    }

    /// Id of the definition holding `version` of `lineage` (`User__v2`)
    pub fn version_id(&self, lineage: &str, version: u32) -> String {
        format!("{}{}{}", lineage, self.config.version_separator, version)
    }

    /// Register an entry.
    ///
    /// Re-registering an id with the same kind is a no-op that returns the
    /// entry already stored; a different kind is a collision.
    pub fn register(&mut self, entry: RegistryEntry) -> Result<&RegistryEntry> {
        match self.entries.entry(entry.id.clone()) {
            Entry::Occupied(occupied) => {
                let existing = occupied.get();
                if existing.kind != entry.kind {
                    warn!(id = %entry.id, existing = %existing.kind, requested = %entry.kind, "registry collision");
                    return Err(SchemaError::RegistryCollision {
                        id: entry.id,
                        existing: existing.kind,
                        requested: entry.kind,
                    });
                }
                debug!(id = %entry.id, kind = %entry.kind, "already registered");
                Ok(occupied.into_mut())
            }
            Entry::Vacant(vacant) => {
                debug!(id = %entry.id, kind = %entry.kind, "registered definition");
                Ok(vacant.insert(entry))
            }
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Interface definition registered under `id`
    pub fn interface(&self, id: &str) -> Option<&Arc<InterfaceDefinition>> {
        match self.entries.get(id).map(RegistryEntry::definition) {
            Some(RegisteredDefinition::Interface(def)) => Some(def),
            _ => None,
        }
    }

    /// Primitive definition registered under `id`
    pub fn primitive(&self, id: &str) -> Option<&Arc<PrimitiveDefinition>> {
        match self.entries.get(id).map(RegistryEntry::definition) {
            Some(RegisteredDefinition::Primitive(def)) => Some(def),
            _ => None,
        }
    }

    /// All registered ids, sorted
    pub fn get_all_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of one kind, sorted
    pub fn ids_by_kind(&self, kind: DefinitionKind) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .entries
            .values()
            .filter(|e| e.kind == kind)
            .map(|e| e.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search ids (fuzzy), best match first
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let matcher = SkimMatcherV2::default();
        let mut hits: Vec<SearchHit> = self
            .entries
            .values()
            .filter_map(|entry| {
                matcher.fuzzy_match(&entry.id, query).map(|score| SearchHit {
                    id: entry.id.clone(),
                    kind: entry.kind,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        hits
    }

    /// Drop every entry. The enum lookup is left untouched.
    pub fn reset(&mut self) {
        info!(cleared = self.entries.len(), "registry reset");
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{create_interface_definition, create_primitive_definition};
    use crate::schema::{BaseType, FieldDescriptor, Schema};

    fn user_schema() -> Schema {
        Schema::new().field("name", FieldDescriptor::string())
    }

    #[test]
    fn test_create_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.get_all_ids().is_empty());
    }

    #[test]
    fn test_same_kind_is_idempotent() {
        let mut registry = Registry::new();
        let def = create_interface_definition(&mut registry, "User", user_schema()).unwrap();

        let entry = RegistryEntry::new(RegisteredDefinition::Interface(def.clone()));
        let stored = registry.register(entry).unwrap();
        assert_eq!(stored.kind(), DefinitionKind::Interface);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cross_kind_collision() {
        let mut registry = Registry::new();
        create_interface_definition(&mut registry, "Email", user_schema()).unwrap();

        let err = create_primitive_definition(&mut registry, "Email", BaseType::String, None).unwrap_err();
        match err {
            SchemaError::RegistryCollision { id, existing, requested } => {
                assert_eq!(id, "Email");
                assert_eq!(existing, DefinitionKind::Interface);
                assert_eq!(requested, DefinitionKind::Primitive);
            }
            other => panic!("Expected RegistryCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_ids_and_lookup() {
        let mut registry = Registry::new();
        create_interface_definition(&mut registry, "User", user_schema()).unwrap();
        create_primitive_definition(&mut registry, "Age", BaseType::Number, None).unwrap();

        assert_eq!(registry.get_all_ids(), vec!["Age".to_string(), "User".to_string()]);
        assert_eq!(registry.ids_by_kind(DefinitionKind::Primitive), vec!["Age"]);
        assert!(registry.interface("User").is_some());
        assert!(registry.interface("Age").is_none());
        assert!(registry.primitive("Age").is_some());
        assert_eq!(registry.get_by_id("Age").unwrap().kind(), DefinitionKind::Primitive);
    }

    #[test]
    fn test_reset() {
        let mut registry = Registry::new();
        create_interface_definition(&mut registry, "User", user_schema()).unwrap();
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.get_by_id("User").is_none());
    }

    #[test]
    fn test_search() {
        let mut registry = Registry::new();
        create_interface_definition(&mut registry, "UserProfile", user_schema()).unwrap();
        create_interface_definition(&mut registry, "Invoice", user_schema()).unwrap();

        let hits = registry.search("usrprof", 5);
        assert_eq!(hits.first().map(|h| h.id.as_str()), Some("UserProfile"));
        assert!(hits.iter().all(|h| h.id != "Invoice"));
    }

    #[test]
    fn test_enum_sets() {
        let mut sets = EnumSets::new();
        sets.define("Role", [Value::from("admin"), Value::from("guest")]);
        let registry = Registry::new().with_enum_lookup(sets);

        let roles = registry.enums().lookup_enum("Role").unwrap();
        assert!(roles.contains(&Value::from("admin")));
        assert!(!roles.contains(&Value::from("root")));
        assert!(registry.enums().lookup_enum("Missing").is_none());
    }

    #[test]
    fn test_numeric_enum_members_compare_by_value() {
        let levels = EnumValueSet::new([Value::from(1i64), Value::from(2i64)]);
        assert!(levels.contains(&Value::from(serde_json::json!(1.0))));
        assert!(levels.contains(&Value::from(2i64)));
        assert!(!levels.contains(&Value::from(serde_json::json!(1.5))));
        assert!(!levels.contains(&Value::from("1")));

        let mut sets = EnumSets::new();
        sets.define("Level", [Value::from(1i64), Value::from(2i64)]);
        let mut registry = Registry::new().with_enum_lookup(sets);
        let doc = create_interface_definition(
            &mut registry,
            "Doc",
            Schema::new().field("level", FieldDescriptor::enum_ref("Level")),
        )
        .unwrap();
        assert!(doc.create(&registry, serde_json::json!({"level": 1.0})).is_ok());
        assert!(doc.create(&registry, serde_json::json!({"level": 3.0})).is_err());
    }
}
