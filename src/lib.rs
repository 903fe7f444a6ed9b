//! Branded Schemas
//!
//! Runtime definition, validation, composition and migration of nominally
//! tagged record types ("branded interfaces") and primitive refinements.
//!
//! ## Features
//!
//! - **Registry**: one explicit id → definition store per engine, with
//!   idempotent re-definition and cross-kind collision checks
//! - **Validation**: recursive field checks including self- and
//!   cross-referencing interface fields, enum membership and custom predicates
//! - **Composition**: compose/extend/partial/pick/omit/diff/intersect and
//!   structural subtyping
//! - **Migration**: per-lineage edge graphs, shortest-path application and
//!   re-branding at the target version
//! - **Codecs**: immutable, short-circuiting pipelines seeded by `create`
//!
//! ## Example
//!
//! ```ignore
//! use branded_schemas::{create_interface_definition, FieldDescriptor, Registry, Schema};
//!
//! let mut registry = Registry::new();
//! let user = create_interface_definition(
//!     &mut registry,
//!     "User",
//!     Schema::new()
//!         .field("name", FieldDescriptor::string())
//!         .field("manager", FieldDescriptor::interface_ref("User").optional()),
//! )?;
//! let alice = user.create(&registry, serde_json::json!({"name": "Alice"}))?;
//! ```

pub mod checksum;
pub mod codec;
pub mod compose;
pub mod config;
pub mod definition;
pub mod error;
pub mod instance;
pub mod migration;
pub mod registry;
pub mod schema;
pub mod validate;
pub mod value;

pub use checksum::Checksum;
pub use codec::{Codec, CodecResult};
pub use compose::{compose, diff, extend, intersect, is_subtype, omit, partial, pick, Intersection, SchemaDiff, TypeConflict};
pub use config::{EngineConfig, MigrationConfig, RegistryConfig};
pub use definition::{
    create_interface_definition, create_interface_definition_with, create_opaque_definition,
    create_primitive_definition, create_version_definition, Definition, DefinitionOptions,
    InterfaceDefinition, OpaqueDefinition, PrimitiveDefinition,
};
pub use error::{ErrorKind, Result, SchemaError};
pub use instance::{Instance, InstanceMeta};
pub use migration::{MigrationEdge, MigrationRegistry};
pub use registry::{DefinitionKind, EnumLookup, EnumSets, EnumValueSet, Registry, RegistryEntry};
pub use schema::{BaseType, FieldDescriptor, FieldKind, FieldType, Predicate, Schema};
pub use value::{Record, Value, ValueKind};
