//! Version migration
//!
//! Edges are stored per lineage, in registration order. [`MigrationRegistry::migrate`]
//! finds the shortest chain of edges from an instance's version to the target
//! with [`VersionGraph`], runs the transforms over the instance's plain data
//! and re-brands the result at the target version.
//!
//! # Example
//!
//! ```ignore
//! let mut migrations = MigrationRegistry::new();
//! migrations.add_migration(&user, 1, 2, |mut data| {
//!     data.insert("updated".into(), Value::Bool(true));
//!     data
//! });
//! let migrated = migrations.migrate(&mut registry, &alice, 2)?;
//! ```

pub mod graph;

pub use graph::VersionGraph;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MigrationConfig;
use crate::definition::{register_interface, InterfaceDefinition};
use crate::error::{Result, SchemaError};
use crate::instance::Instance;
use crate::registry::Registry;
use crate::schema::{FieldDescriptor, Schema};
use crate::validate::validate_field;
use crate::value::Record;

/// Data transform carried by a migration edge
pub type Transform = Arc<dyn Fn(Record) -> Record + Send + Sync>;

/// One registered `from -> to` step
#[derive(Clone)]
pub struct MigrationEdge {
    pub from_version: u32,
    pub to_version: u32,
    transform: Transform,
}

impl MigrationEdge {
    pub fn new(
        from_version: u32,
        to_version: u32,
        transform: impl Fn(Record) -> Record + Send + Sync + 'static,
    ) -> Self {
        Self {
            from_version,
            to_version,
            transform: Arc::new(transform),
        }
    }

    pub fn apply(&self, data: Record) -> Record {
        (self.transform)(data)
    }
}

impl fmt::Debug for MigrationEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationEdge")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .finish_non_exhaustive()
    }
}

/// Store of migration edges, keyed by lineage
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    edges: HashMap<String, Vec<MigrationEdge>>,
    config: MigrationConfig,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MigrationConfig) -> Self {
        Self {
            edges: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Append an edge to `definition`'s lineage.
    ///
    /// Reachability is not checked here; an unusable edge only shows up as a
    /// missing path at migrate time.
    pub fn add_migration(
        &mut self,
        definition: &InterfaceDefinition,
        from_version: u32,
        to_version: u32,
        transform: impl Fn(Record) -> Record + Send + Sync + 'static,
    ) -> &mut Self {
        debug!(
            lineage = %definition.lineage(),
            from = from_version,
            to = to_version,
            "added migration"
        );
        self.edges
            .entry(definition.lineage().to_string())
            .or_default()
            .push(MigrationEdge::new(from_version, to_version, transform));
        self
    }

    /// Edges of a lineage, in registration order
    pub fn edges(&self, lineage: &str) -> &[MigrationEdge] {
        self.edges.get(lineage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop every registered edge
    pub fn reset(&mut self) {
        let count: usize = self.edges.values().map(Vec::len).sum();
        self.edges.clear();
        info!(edges = count, "migration registry reset");
    }

    pub fn graph(&self, lineage: &str) -> VersionGraph {
        VersionGraph::from_edges(self.edges(lineage))
    }

    /// Fewest-edge chain from `from` to `to`, or `None` when unreachable
    pub fn find_path(&self, lineage: &str, from: u32, to: u32) -> Option<Vec<&MigrationEdge>> {
        let edges = self.edges(lineage);
        self.graph(lineage)
            .shortest_path(from, to)
            .map(|positions| positions.into_iter().map(|position| &edges[position]).collect())
    }

    pub fn to_dot(&self, lineage: &str) -> String {
        self.graph(lineage).to_dot(lineage)
    }

    /// Move `instance` to `target` version.
    ///
    /// The result is branded by the interface registered at the lineage's
    /// version id for `target` (validated through its `create`). Without
    /// one, a schema is inferred from the source definition and the migrated
    /// data and registered there as a synthesized target, unless inference is
    /// switched off in [`MigrationConfig`]. Later migrations into a
    /// synthesized target are branded without re-validation.
    pub fn migrate(&self, registry: &mut Registry, instance: &Instance, target: u32) -> Result<Instance> {
        let definition = registry
            .interface(instance.definition_id())
            .cloned()
            .ok_or_else(|| SchemaError::DefinitionNotFound {
                id: instance.definition_id().to_string(),
            })?;

        let current = definition.version();
        if current == target {
            return Ok(instance.clone());
        }

        let lineage = definition.lineage();
        let path = self
            .find_path(lineage, current, target)
            .ok_or_else(|| SchemaError::NoMigrationPath {
                id: lineage.to_string(),
                from: current,
                to: target,
            })?;
        debug!(lineage = %lineage, from = current, to = target, steps = path.len(), "migration path");

        let data = path
            .into_iter()
            .fold(instance.data().clone(), |data, edge| edge.apply(data));

        self.rebrand(registry, &definition, target, data)
    }

    fn rebrand(&self, registry: &mut Registry, source: &InterfaceDefinition, target: u32, data: Record) -> Result<Instance> {
        let lineage = source.lineage();

        // The lineage root itself may already sit at the target version
        if let Some(root) = registry.interface(lineage).filter(|root| root.version() == target).cloned() {
            return root.create(registry, data);
        }

        let target_id = registry.version_id(lineage, target);
        if let Some(existing) = registry.interface(&target_id).cloned() {
            if existing.version() != target {
                return Err(SchemaError::TargetVersionMismatch {
                    id: target_id,
                    expected: target,
                    found: existing.version(),
                });
            }
            // An inferred target only describes the data that first reached it
            if existing.is_synthesized() {
                return Ok(existing.brand(data));
            }
            return existing.create(registry, data);
        }

        if !self.config.infer_target_schema {
            return Err(SchemaError::MissingTargetDefinition {
                id: target_id,
                version: target,
            });
        }

        let schema = infer_target_schema(registry, source, &data, &target_id);
        info!(id = %target_id, fields = schema.len(), "inferred schema for migration target");
        let inferred = register_interface(registry, target_id, lineage.to_string(), schema, target, true)?;
        Ok(inferred.brand(data))
    }
}

/// Schema for a synthesized migration target.
///
/// A field that survived the transforms keeps its source descriptor, modifiers
/// included, as long as the migrated value still satisfies it. Everything else
/// is inferred from the value. Optional source fields absent from this data
/// stay optional.
fn infer_target_schema(registry: &Registry, source: &InterfaceDefinition, data: &Record, target_id: &str) -> Schema {
    let mut schema: Schema = data
        .iter()
        .map(|(name, value)| {
            let descriptor = source
                .schema()
                .get(name)
                .filter(|declared| validate_field(registry, name, Some(value), declared, target_id).is_ok())
                .cloned()
                .unwrap_or_else(|| FieldDescriptor::infer(value));
            (name.clone(), descriptor)
        })
        .collect();

    for (name, descriptor) in source.schema() {
        if descriptor.optional && !schema.contains(name) {
            schema.insert(name.clone(), descriptor.clone());
        }
    }
    schema
}
