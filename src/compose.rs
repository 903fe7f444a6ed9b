//! Composition algebra over interface definitions
//!
//! Every derivation copies descriptors into a fresh [`Schema`] and registers
//! it through the factory under a new id, so derived shapes are ordinary
//! registered definitions. Source definitions are never modified.
//!
//! Type comparisons use [`FieldType::same_type`]: the type tag plus, for ref
//! kinds, the referenced id.

use std::collections::BTreeSet;
use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::definition::{create_interface_definition, InterfaceDefinition};
use crate::error::{Result, SchemaError};
use crate::registry::Registry;
use crate::schema::{FieldType, Schema};

/// Union of several definitions.
///
/// A field name present in more than one source is a [`SchemaError::DuplicateField`]
/// naming the two sources.
pub fn compose(
    registry: &mut Registry,
    new_id: impl Into<String>,
    sources: &[&InterfaceDefinition],
) -> Result<Arc<InterfaceDefinition>> {
    let mut schema = Schema::new();
    let mut origin: Vec<(&str, &str)> = Vec::new();

    for source in sources {
        for (name, descriptor) in source.schema() {
            if let Some((_, first)) = origin.iter().find(|(field, _)| *field == name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    field: name.clone(),
                    first: first.to_string(),
                    second: source.id().to_string(),
                });
            }
            origin.push((name.as_str(), source.id()));
            schema.insert(name.clone(), descriptor.clone());
        }
    }

    let new_id = new_id.into();
    debug!(id = %new_id, sources = sources.len(), fields = schema.len(), "composed interface");
    create_interface_definition(registry, new_id, schema)
}

/// `base` plus `extra` fields; redefining a base field is a [`SchemaError::FieldConflict`]
pub fn extend(
    registry: &mut Registry,
    base: &InterfaceDefinition,
    new_id: impl Into<String>,
    extra: Schema,
) -> Result<Arc<InterfaceDefinition>> {
    let mut schema = base.schema().clone();
    for (name, descriptor) in extra {
        if schema.contains(&name) {
            return Err(SchemaError::FieldConflict {
                field: name,
                base: base.id().to_string(),
            });
        }
        schema.insert(name, descriptor);
    }

    create_interface_definition(registry, new_id, schema)
}

/// Same fields, all optional
pub fn partial(
    registry: &mut Registry,
    def: &InterfaceDefinition,
    new_id: impl Into<String>,
) -> Result<Arc<InterfaceDefinition>> {
    let schema = def
        .schema()
        .iter()
        .map(|(name, descriptor)| (name.clone(), descriptor.clone().optional()))
        .collect();

    create_interface_definition(registry, new_id, schema)
}

/// Keep only `names`
pub fn pick(
    registry: &mut Registry,
    def: &InterfaceDefinition,
    new_id: impl Into<String>,
    names: &[&str],
) -> Result<Arc<InterfaceDefinition>> {
    ensure_known(def, names)?;
    let schema = def
        .schema()
        .iter()
        .filter(|(name, _)| names.contains(&name.as_str()))
        .map(|(name, descriptor)| (name.clone(), descriptor.clone()))
        .collect();

    create_interface_definition(registry, new_id, schema)
}

/// Drop `names`
pub fn omit(
    registry: &mut Registry,
    def: &InterfaceDefinition,
    new_id: impl Into<String>,
    names: &[&str],
) -> Result<Arc<InterfaceDefinition>> {
    ensure_known(def, names)?;
    let schema = def
        .schema()
        .iter()
        .filter(|(name, _)| !names.contains(&name.as_str()))
        .map(|(name, descriptor)| (name.clone(), descriptor.clone()))
        .collect();

    create_interface_definition(registry, new_id, schema)
}

fn ensure_known(def: &InterfaceDefinition, names: &[&str]) -> Result<()> {
    match names.iter().find(|name| !def.schema().contains(name)) {
        Some(unknown) => Err(SchemaError::UnknownField {
            field: unknown.to_string(),
            owner: def.id().to_string(),
            suggestion: closest_field(def.schema(), unknown),
        }),
        None => Ok(()),
    }
}

fn closest_field(schema: &Schema, query: &str) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    schema
        .names()
        .filter_map(|name| matcher.fuzzy_match(name, query).map(|score| (score, name)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, name)| name.to_string())
}

// =============================================================================
// Diff / intersect / subtype
// =============================================================================

/// Field-level difference between two definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub only_in_a: BTreeSet<String>,
    pub only_in_b: BTreeSet<String>,
    /// Shared fields with the same type
    pub same_type: BTreeSet<String>,
    /// Shared fields whose types differ
    pub different_type: BTreeSet<String>,
}

impl SchemaDiff {
    /// True when both schemas have the same fields with the same types
    pub fn is_identical(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.different_type.is_empty()
    }
}

pub fn diff(a: &InterfaceDefinition, b: &InterfaceDefinition) -> SchemaDiff {
    let mut result = SchemaDiff::default();

    for (name, descriptor) in a.schema() {
        match b.schema().get(name) {
            Some(other) if descriptor.ty.same_type(&other.ty) => {
                result.same_type.insert(name.clone());
            }
            Some(_) => {
                result.different_type.insert(name.clone());
            }
            None => {
                result.only_in_a.insert(name.clone());
            }
        }
    }
    result.only_in_b = b
        .schema()
        .names()
        .filter(|name| !a.schema().contains(name))
        .map(str::to_string)
        .collect();

    result
}

/// A shared field excluded from an intersection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConflict {
    pub field: String,
    pub left: FieldType,
    pub right: FieldType,
}

/// Result of [`intersect`]
#[derive(Debug, Clone)]
pub struct Intersection {
    pub definition: Arc<InterfaceDefinition>,
    pub conflicts: Vec<TypeConflict>,
}

/// Shared fields with identical types.
///
/// Shared fields with different types are reported in `conflicts` rather than
/// failing the call. Descriptors (modifiers and validators) come from `a`.
pub fn intersect(
    registry: &mut Registry,
    a: &InterfaceDefinition,
    b: &InterfaceDefinition,
    new_id: impl Into<String>,
) -> Result<Intersection> {
    let mut schema = Schema::new();
    let mut conflicts = Vec::new();

    for (name, descriptor) in a.schema() {
        let Some(other) = b.schema().get(name) else {
            continue;
        };
        if descriptor.ty.same_type(&other.ty) {
            schema.insert(name.clone(), descriptor.clone());
        } else {
            conflicts.push(TypeConflict {
                field: name.clone(),
                left: descriptor.ty.clone(),
                right: other.ty.clone(),
            });
        }
    }

    let definition = create_interface_definition(registry, new_id, schema)?;
    if !conflicts.is_empty() {
        debug!(id = %definition.id(), conflicts = conflicts.len(), "intersection dropped conflicting fields");
    }
    Ok(Intersection { definition, conflicts })
}

/// Width subtyping: every supertype field exists on `candidate` with the same type.
///
/// Modifiers (`optional`, `nullable`) and array item types are not compared.
pub fn is_subtype(candidate: &InterfaceDefinition, supertype: &InterfaceDefinition) -> bool {
    supertype.schema().iter().all(|(name, descriptor)| {
        candidate
            .schema()
            .get(name)
            .map(|own| own.ty.same_type(&descriptor.ty))
            .unwrap_or(false)
    })
}
