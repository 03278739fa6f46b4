//! Schema Registry - Loads and Indexes Schemas
//!
//! The built-in tables are embedded JSON, parsed once per process. Lookups
//! never fail: a miss is `None`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;

use crate::schema::{Category, DefinitionKind, Property, Schema};
use crate::ENGINE_VERSION;

const EMBEDDED_SCHEMAS: [(DefinitionKind, &str); 4] = [
    (DefinitionKind::Character, include_str!("../schemas/character.json")),
    (DefinitionKind::Scene, include_str!("../schemas/scene.json")),
    (DefinitionKind::Style, include_str!("../schemas/style.json")),
    (
        DefinitionKind::ReferenceConstraint,
        include_str!("../schemas/reference_constraint.json"),
    ),
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid schema for {0}: {1}")]
    InvalidSchema(String, serde_json::Error),

    #[error("Schema {0} expects kind {1}, found {2}")]
    KindMismatch(String, DefinitionKind, DefinitionKind),

    #[error("Schema {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),
}

/// Schema registry - holds one schema per kind with keyed indexes
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<DefinitionKind, Schema>,
    categories: HashMap<(DefinitionKind, String), usize>,
    properties: HashMap<(DefinitionKind, String, String), (usize, usize)>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry built from the embedded tables.
    ///
    /// A table that fails to parse is logged and left out; lookups against
    /// that kind then miss.
    pub fn builtin() -> &'static SchemaRegistry {
        static BUILTIN: OnceLock<SchemaRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut registry = Self::new();
            for (kind, source) in EMBEDDED_SCHEMAS {
                match parse_schema(kind.as_str(), source, Some(kind)) {
                    Ok(schema) => registry.register(schema),
                    Err(err) => tracing::error!(%kind, error = %err, "embedded schema failed to load"),
                }
            }
            registry
        })
    }

    /// Parse all embedded tables, failing on the first bad one.
    pub fn load_embedded() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (kind, source) in EMBEDDED_SCHEMAS {
            registry.register(parse_schema(kind.as_str(), source, Some(kind))?);
        }
        Ok(registry)
    }

    /// Embedded tables overridden by any `*.json` schema files in `dir`.
    ///
    /// Unparseable files are skipped with a warning. A file requiring a newer
    /// engine is an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::load_embedded()?;
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "schema directory not found, using embedded schemas");
            return Ok(registry);
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |e| e == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            let name = path.display().to_string();
            let schema = match parse_schema(&name, &content, None) {
                Ok(schema) => schema,
                Err(err) => {
                    tracing::warn!(file = %name, error = %err, "skipping schema file");
                    continue;
                }
            };
            check_engine_version(&name, &schema)?;
            tracing::debug!(file = %name, kind = %schema.kind, "schema override loaded");
            registry.register(schema);
        }
        Ok(registry)
    }

    /// Insert or replace the schema for its kind and rebuild that kind's indexes.
    pub fn register(&mut self, mut schema: Schema) {
        schema.sort_categories();
        let kind = schema.kind;

        self.categories.retain(|(k, _), _| *k != kind);
        self.properties.retain(|(k, _, _), _| *k != kind);
        for (ci, category) in schema.categories.iter().enumerate() {
            self.categories.insert((kind, category.key.clone()), ci);
            for (pi, property) in category.properties.iter().enumerate() {
                self.properties
                    .insert((kind, category.key.clone(), property.key.clone()), (ci, pi));
            }
        }
        self.schemas.insert(kind, schema);
    }

    pub fn schema(&self, kind: DefinitionKind) -> Option<&Schema> {
        self.schemas.get(&kind)
    }

    /// Categories of `kind` in compile order; empty when the kind is unknown.
    pub fn categories(&self, kind: DefinitionKind) -> &[Category] {
        self.schemas
            .get(&kind)
            .map(|s| s.categories.as_slice())
            .unwrap_or(&[])
    }

    pub fn category(&self, kind: DefinitionKind, category: &str) -> Option<&Category> {
        let index = *self.categories.get(&(kind, category.to_string()))?;
        self.schemas.get(&kind)?.categories.get(index)
    }

    pub fn property(
        &self,
        kind: DefinitionKind,
        category: &str,
        property: &str,
    ) -> Option<&Property> {
        let (ci, pi) = *self
            .properties
            .get(&(kind, category.to_string(), property.to_string()))?;
        self.schemas.get(&kind)?.categories.get(ci)?.properties.get(pi)
    }

    /// Schema version per registered kind, for manifests.
    pub fn versions(&self) -> Vec<(DefinitionKind, String)> {
        let mut versions: Vec<_> = self
            .schemas
            .values()
            .map(|s| (s.kind, s.schema_version.clone()))
            .collect();
        versions.sort();
        versions
    }
}

fn parse_schema(
    name: &str,
    source: &str,
    expected: Option<DefinitionKind>,
) -> Result<Schema, RegistryError> {
    let schema: Schema = serde_json::from_str(source)
        .map_err(|e| RegistryError::InvalidSchema(name.to_string(), e))?;
    if let Some(expected) = expected {
        if schema.kind != expected {
            return Err(RegistryError::KindMismatch(name.to_string(), expected, schema.kind));
        }
    }
    Ok(schema)
}

fn check_engine_version(name: &str, schema: &Schema) -> Result<(), RegistryError> {
    let engine_ver = semver::Version::parse(ENGINE_VERSION)?;
    let min_ver = semver::Version::parse(&schema.engine_min_version)?;

    if engine_ver < min_ver {
        return Err(RegistryError::EngineVersionMismatch(
            name.to_string(),
            schema.engine_min_version.clone(),
            ENGINE_VERSION.to_string(),
        ));
    }

    Ok(())
}
