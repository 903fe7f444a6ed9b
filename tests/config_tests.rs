//! Configuration loading from files

use branded_schemas::{
    create_interface_definition, EngineConfig, FieldDescriptor, MigrationConfig, MigrationRegistry, Registry,
    RegistryConfig, Schema, SchemaError,
};
use serde_json::json;
use std::sync::Mutex;
use tempfile::TempDir;

// Loading reads BRANDED__* from the process environment
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_load_explicit_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("branded.toml");
    std::fs::write(
        &path,
        "[registry]\ndefault_version = 3\nversion_separator = \"@v\"\n\n[migration]\ninfer_target_schema = false\n",
    )
    .unwrap();

    let config = EngineConfig::load_from(Some(path.as_path())).unwrap();
    assert_eq!(config.registry.default_version, 3);
    assert_eq!(config.registry.version_separator, "@v");
    assert!(!config.migration.infer_target_schema);
}

#[test]
fn test_save_then_load() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.toml");

    let config = EngineConfig {
        registry: RegistryConfig {
            default_version: 7,
            ..RegistryConfig::default()
        },
        migration: MigrationConfig::default(),
    };
    config.save(&path).unwrap();

    let loaded = EngineConfig::load_from(Some(path.as_path())).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.toml");
    let err = EngineConfig::load_from(Some(absent.as_path())).unwrap_err();
    assert!(matches!(err, SchemaError::Config(_)));
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("branded.toml");
    std::fs::write(&path, "[registry]\ndefault_version = 3\nversion_separator = \"@v\"\n").unwrap();

    std::env::set_var("BRANDED__REGISTRY__DEFAULT_VERSION", "5");
    let loaded = EngineConfig::load_from(Some(path.as_path()));
    std::env::remove_var("BRANDED__REGISTRY__DEFAULT_VERSION");

    let config = loaded.unwrap();
    assert_eq!(config.registry.default_version, 5);
    assert_eq!(config.registry.version_separator, "@v");
    assert!(config.migration.infer_target_schema);
}

#[test]
fn test_config_drives_engine() {
    let config = EngineConfig {
        registry: RegistryConfig {
            default_version: 2,
            version_separator: "@".to_string(),
        },
        migration: MigrationConfig {
            infer_target_schema: true,
        },
    };
    let mut registry = Registry::with_config(config.registry.clone());
    let user = create_interface_definition(
        &mut registry,
        "User",
        Schema::new().field("name", FieldDescriptor::string()),
    )
    .unwrap();
    assert_eq!(user.version(), 2);

    let mut migrations = MigrationRegistry::with_config(config.migration);
    migrations.add_migration(&user, 2, 3, |data| data);
    let alice = user.create(&registry, json!({"name": "Alice"})).unwrap();
    let migrated = migrations.migrate(&mut registry, &alice, 3).unwrap();
    assert_eq!(migrated.definition_id(), "User@3");
}
