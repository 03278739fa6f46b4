//! Asset Bindings - Where Uploaded Asset Ids Live in Metadata
//!
//! A binding ties a schema attribute to its storage slot inside metadata,
//! which may be a plural `*_ids` key with an older singular `*_id` key
//! kept for definitions written before multi-asset support.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::resolver::Scope;
use crate::schema::DefinitionKind;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    CharacterFace,
    CharacterBody,
    CharacterOutfit,
    CharacterReference,
    SceneReference,
    StyleReference,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::CharacterFace => "character_face",
            AssetType::CharacterBody => "character_body",
            AssetType::CharacterOutfit => "character_outfit",
            AssetType::CharacterReference => "character_reference",
            AssetType::SceneReference => "scene_reference",
            AssetType::StyleReference => "style_reference",
        }
    }

    /// Rendering role implied by the asset type alone.
    pub fn scope(&self) -> Scope {
        match self {
            AssetType::SceneReference => Scope::Scene,
            AssetType::StyleReference => Scope::Style,
            _ => Scope::Character,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetBinding {
    pub definition_kind: DefinitionKind,
    pub category_key: &'static str,
    pub property_key: &'static str,
    pub metadata_category_key: &'static str,
    pub metadata_property_key: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_metadata_property_key: Option<&'static str>,
    pub asset_type: AssetType,
}

impl AssetBinding {
    /// Scope a ref produced by this binding is reported under.
    ///
    /// Reference constraints do not belong to a rendering role themselves,
    /// so their bindings report under the scope of their asset type.
    pub fn scope(&self) -> Scope {
        match self.definition_kind {
            DefinitionKind::Character => Scope::Character,
            DefinitionKind::Scene => Scope::Scene,
            DefinitionKind::Style => Scope::Style,
            DefinitionKind::ReferenceConstraint => self.asset_type.scope(),
        }
    }
}

pub const BUILTIN_BINDINGS: &[AssetBinding] = &[
    AssetBinding {
        definition_kind: DefinitionKind::Character,
        category_key: "reference_images",
        property_key: "face_reference",
        metadata_category_key: "reference_images",
        metadata_property_key: "face_reference_ids",
        legacy_metadata_property_key: Some("face_reference_id"),
        asset_type: AssetType::CharacterFace,
    },
    AssetBinding {
        definition_kind: DefinitionKind::Character,
        category_key: "reference_images",
        property_key: "body_reference",
        metadata_category_key: "reference_images",
        metadata_property_key: "body_reference_ids",
        legacy_metadata_property_key: Some("body_reference_id"),
        asset_type: AssetType::CharacterBody,
    },
    AssetBinding {
        definition_kind: DefinitionKind::Character,
        category_key: "reference_images",
        property_key: "outfit_reference",
        metadata_category_key: "outfit",
        metadata_property_key: "outfit_reference_ids",
        legacy_metadata_property_key: Some("outfit_reference_id"),
        asset_type: AssetType::CharacterOutfit,
    },
    AssetBinding {
        definition_kind: DefinitionKind::Scene,
        category_key: "environment",
        property_key: "location_reference",
        metadata_category_key: "environment",
        metadata_property_key: "location_reference_ids",
        legacy_metadata_property_key: Some("location_reference_id"),
        asset_type: AssetType::SceneReference,
    },
    AssetBinding {
        definition_kind: DefinitionKind::Style,
        category_key: "reference",
        property_key: "style_reference",
        metadata_category_key: "reference",
        metadata_property_key: "style_reference_ids",
        legacy_metadata_property_key: Some("style_reference_id"),
        asset_type: AssetType::StyleReference,
    },
    AssetBinding {
        definition_kind: DefinitionKind::ReferenceConstraint,
        category_key: "references",
        property_key: "character_images",
        metadata_category_key: "references",
        metadata_property_key: "character_asset_ids",
        legacy_metadata_property_key: None,
        asset_type: AssetType::CharacterReference,
    },
    AssetBinding {
        definition_kind: DefinitionKind::ReferenceConstraint,
        category_key: "references",
        property_key: "scene_images",
        metadata_category_key: "references",
        metadata_property_key: "scene_asset_ids",
        legacy_metadata_property_key: None,
        asset_type: AssetType::SceneReference,
    },
    AssetBinding {
        definition_kind: DefinitionKind::ReferenceConstraint,
        category_key: "references",
        property_key: "style_images",
        metadata_category_key: "references",
        metadata_property_key: "style_asset_ids",
        legacy_metadata_property_key: None,
        asset_type: AssetType::StyleReference,
    },
];

/// Binding table indexed by definition kind, preserving declaration order.
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: Vec<AssetBinding>,
    by_kind: HashMap<DefinitionKind, Vec<usize>>,
}

impl BindingTable {
    pub fn new(bindings: Vec<AssetBinding>) -> Self {
        let mut by_kind: HashMap<DefinitionKind, Vec<usize>> = HashMap::new();
        for (index, binding) in bindings.iter().enumerate() {
            by_kind.entry(binding.definition_kind).or_default().push(index);
        }
        Self { bindings, by_kind }
    }

    pub fn builtin() -> &'static BindingTable {
        static BUILTIN: OnceLock<BindingTable> = OnceLock::new();
        BUILTIN.get_or_init(|| Self::new(BUILTIN_BINDINGS.to_vec()))
    }

    pub fn for_kind(&self, kind: DefinitionKind) -> impl Iterator<Item = &AssetBinding> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.bindings.get(index))
    }

    pub fn all(&self) -> &[AssetBinding] {
        &self.bindings
    }
}
