//! Asset-Reference Resolver
//!
//! Walks the binding table against each definition's metadata and collects
//! the uploaded-asset ids it references. Malformed metadata never raises;
//! it only produces fewer refs.

use serde::{Deserialize, Serialize};

use crate::bindings::{AssetBinding, BindingTable};
use crate::metadata::{Definition, MetadataValue, Scalar};
use crate::schema::DefinitionKind;

/// Rendering role a set of referenced assets plays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Character,
    Scene,
    Style,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectedAssetRef {
    pub scope: Scope,
    pub definition_id: String,
    pub definition_name: String,
    pub binding: AssetBinding,
    pub asset_ids: Vec<String>,
}

/// Ordered pair of storage slots for one binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueSource<'a> {
    pub primary: Option<&'a MetadataValue>,
    pub legacy: Option<&'a MetadataValue>,
}

impl<'a> ValueSource<'a> {
    /// Primary wins whenever it is set, even if it holds an empty list.
    pub fn select(&self) -> Option<&'a MetadataValue> {
        self.primary.or(self.legacy)
    }
}

/// Flatten a stored value into trimmed, non-empty, deduplicated ids in
/// first-seen order.
pub fn normalize_asset_ids(value: &MetadataValue) -> Vec<String> {
    let candidates: Vec<String> = match value {
        MetadataValue::Scalar(scalar) => vec![scalar.to_string()],
        MetadataValue::List(items) => items.iter().map(Scalar::to_string).collect(),
        MetadataValue::Nested(_) => vec![],
    };

    let mut ids: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() && !ids.iter().any(|id| id == trimmed) {
            ids.push(trimmed.to_string());
        }
    }
    ids
}

/// Definitions participating in one render, as seen by the resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(default)]
    pub characters: Vec<Definition>,
    #[serde(default)]
    pub style: Option<Definition>,
    #[serde(default)]
    pub scene: Option<Definition>,
    #[serde(default)]
    pub reference_constraint: Option<Definition>,
}

/// Resolver output, in request order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ResolvedAssets {
    pub refs: Vec<CollectedAssetRef>,
}

impl ResolvedAssets {
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn for_scope(&self, scope: Scope) -> impl Iterator<Item = &CollectedAssetRef> {
        self.refs.iter().filter(move |r| r.scope == scope)
    }

    /// Union of asset ids reported under `scope`, first-seen order.
    pub fn asset_ids(&self, scope: Scope) -> Vec<&str> {
        let mut ids: Vec<&str> = vec![];
        for id in self.for_scope(scope).flat_map(|r| r.asset_ids.iter()) {
            if !ids.contains(&id.as_str()) {
                ids.push(id.as_str());
            }
        }
        ids
    }
}

pub struct AssetResolver<'t> {
    bindings: &'t BindingTable,
}

impl<'t> AssetResolver<'t> {
    pub fn new(bindings: &'t BindingTable) -> Self {
        Self { bindings }
    }

    /// Resolve every definition in the request: characters first, then style,
    /// scene and reference constraint.
    pub fn resolve(&self, request: &ResolveRequest) -> ResolvedAssets {
        let mut refs = vec![];
        for character in &request.characters {
            refs.extend(self.resolve_definition(DefinitionKind::Character, character));
        }
        if let Some(style) = &request.style {
            refs.extend(self.resolve_definition(DefinitionKind::Style, style));
        }
        if let Some(scene) = &request.scene {
            refs.extend(self.resolve_definition(DefinitionKind::Scene, scene));
        }
        if let Some(constraint) = &request.reference_constraint {
            refs.extend(self.resolve_definition(DefinitionKind::ReferenceConstraint, constraint));
        }
        tracing::debug!(refs = refs.len(), "asset references resolved");
        ResolvedAssets { refs }
    }

    pub fn resolve_definition(
        &self,
        kind: DefinitionKind,
        definition: &Definition,
    ) -> Vec<CollectedAssetRef> {
        self.bindings
            .for_kind(kind)
            .filter_map(|binding| resolve_binding(binding, definition))
            .collect()
    }
}

impl Default for AssetResolver<'static> {
    fn default() -> Self {
        Self::new(BindingTable::builtin())
    }
}

fn resolve_binding(binding: &AssetBinding, definition: &Definition) -> Option<CollectedAssetRef> {
    let Some(slots) = definition.metadata.category(binding.metadata_category_key) else {
        tracing::trace!(
            definition = %definition.id,
            category = binding.metadata_category_key,
            "binding category absent"
        );
        return None;
    };

    let source = ValueSource {
        primary: slots.get(binding.metadata_property_key),
        legacy: binding
            .legacy_metadata_property_key
            .and_then(|key| slots.get(key)),
    };

    let asset_ids = normalize_asset_ids(source.select()?);
    if asset_ids.is_empty() {
        return None;
    }

    Some(CollectedAssetRef {
        scope: binding.scope(),
        definition_id: definition.id.clone(),
        definition_name: definition.name.clone(),
        binding: binding.clone(),
        asset_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn character(metadata: serde_json::Value) -> Definition {
        Definition::new("c1", "Mira", metadata)
    }

    #[test]
    fn test_value_source_primary_wins_when_set() {
        let primary = MetadataValue::List(vec![]);
        let legacy = MetadataValue::from("old");
        let source = ValueSource { primary: Some(&primary), legacy: Some(&legacy) };
        assert_eq!(source.select(), Some(&primary));

        let source = ValueSource { primary: None, legacy: Some(&legacy) };
        assert_eq!(source.select(), Some(&legacy));

        let source = ValueSource { primary: None, legacy: None };
        assert_eq!(source.select(), None);
    }

    #[test]
    fn test_normalize_trims_drops_and_dedups() {
        let value = MetadataValue::from_json(&json!([" a ", "", "b", "a", 7, "  "])).unwrap();
        assert_eq!(normalize_asset_ids(&value), vec!["a", "b", "7"]);

        let scalar = MetadataValue::from(" x ");
        assert_eq!(normalize_asset_ids(&scalar), vec!["x"]);

        let nested = MetadataValue::from_json(&json!({"id": "x"})).unwrap();
        assert!(normalize_asset_ids(&nested).is_empty());
    }

    #[test]
    fn test_legacy_scalar_only() {
        let def = character(json!({"reference_images": {"face_reference_id": "asset-1"}}));
        let refs = AssetResolver::default().resolve_definition(DefinitionKind::Character, &def);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].asset_ids, vec!["asset-1"]);
        assert_eq!(refs[0].scope, Scope::Character);
        assert_eq!(refs[0].definition_name, "Mira");
    }

    #[test]
    fn test_primary_array_shadows_legacy() {
        let def = character(json!({"reference_images": {
            "face_reference_ids": ["a", "b"],
            "face_reference_id": "legacy"
        }}));
        let refs = AssetResolver::default().resolve_definition(DefinitionKind::Character, &def);
        assert_eq!(refs[0].asset_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_primary_suppresses_legacy() {
        let def = character(json!({"reference_images": {
            "face_reference_ids": [],
            "face_reference_id": "legacy"
        }}));
        let refs = AssetResolver::default().resolve_definition(DefinitionKind::Character, &def);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_null_primary_falls_back_to_legacy() {
        let def = character(json!({"reference_images": {
            "face_reference_ids": null,
            "face_reference_id": "legacy"
        }}));
        let refs = AssetResolver::default().resolve_definition(DefinitionKind::Character, &def);
        assert_eq!(refs[0].asset_ids, vec!["legacy"]);
    }

    #[test]
    fn test_malformed_metadata_yields_nothing() {
        for metadata in [
            json!(null),
            json!("garbage"),
            json!({"reference_images": ["a"]}),
            json!({"reference_images": {"face_reference_ids": {"nested": true}}}),
            json!({"reference_images": {"face_reference_ids": [null, "", "  "]}}),
        ] {
            let def = character(metadata);
            assert!(AssetResolver::default()
                .resolve_definition(DefinitionKind::Character, &def)
                .is_empty());
        }
    }

    #[test]
    fn test_binding_category_may_differ_from_schema() {
        let def = character(json!({"outfit": {"outfit_reference_ids": ["o1"]}}));
        let refs = AssetResolver::default().resolve_definition(DefinitionKind::Character, &def);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].binding.category_key, "reference_images");
        assert_eq!(refs[0].asset_ids, vec!["o1"]);
    }

    #[test]
    fn test_reference_constraint_scopes() {
        let request = ResolveRequest {
            reference_constraint: Some(Definition::new(
                "rc1",
                "Refs",
                json!({"references": {
                    "character_asset_ids": ["c"],
                    "scene_asset_ids": ["s"],
                    "style_asset_ids": ["y", "y"]
                }}),
            )),
            ..Default::default()
        };
        let resolved = AssetResolver::default().resolve(&request);
        assert_eq!(resolved.asset_ids(Scope::Character), vec!["c"]);
        assert_eq!(resolved.asset_ids(Scope::Scene), vec!["s"]);
        assert_eq!(resolved.asset_ids(Scope::Style), vec!["y"]);
    }

    #[test]
    fn test_resolve_order_and_scope_union() {
        let request = ResolveRequest {
            characters: vec![
                Definition::new("c1", "A", json!({"reference_images": {"face_reference_ids": ["f1"]}})),
                Definition::new("c2", "B", json!({"reference_images": {"face_reference_ids": ["f1", "f2"]}})),
            ],
            style: Some(Definition::new("st", "S", json!({"reference": {"style_reference_id": "s1"}}))),
            scene: Some(Definition::new("sc", "Sc", json!({"environment": {"location_reference_ids": ["l1"]}}))),
            reference_constraint: None,
        };
        let resolved = AssetResolver::default().resolve(&request);
        let ids: Vec<_> = resolved.refs.iter().map(|r| r.definition_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "st", "sc"]);
        assert_eq!(resolved.asset_ids(Scope::Character), vec!["f1", "f2"]);
        assert_eq!(resolved.for_scope(Scope::Scene).count(), 1);
    }
}
