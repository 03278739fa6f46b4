//! Schema System - Declarative Attribute Contracts
//!
//! Each definition kind (character, scene, style, reference constraint) owns
//! one ordered list of categories, each an ordered list of properties.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Character,
    Scene,
    Style,
    ReferenceConstraint,
}

impl DefinitionKind {
    pub const ALL: [DefinitionKind; 4] = [
        DefinitionKind::Character,
        DefinitionKind::Scene,
        DefinitionKind::Style,
        DefinitionKind::ReferenceConstraint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Character => "character",
            DefinitionKind::Scene => "scene",
            DefinitionKind::Style => "style",
            DefinitionKind::ReferenceConstraint => "reference_constraint",
        }
    }

    /// Whether prompt rendering walks this kind's categories in schema order.
    /// Scene metadata is an untyped bag and is walked by key instead.
    pub fn has_canonical_order(&self) -> bool {
        matches!(self, DefinitionKind::Character | DefinitionKind::Style)
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Text,
    Select,
    Tags,
    Number,
    Boolean,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default)]
    pub options: Vec<PropertyOption>,
    #[serde(default)]
    pub allow_custom: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

impl Property {
    /// Label of the option whose value matches, if any.
    pub fn option_label(&self, value: &str) -> Option<&str> {
        option_label(&self.options, value)
    }
}

/// Find the label for `value` among `options`. Custom or unrecognized
/// values yield `None`.
pub fn option_label<'a>(options: &'a [PropertyOption], value: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label.as_str())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub key: String,
    pub label: String,
    pub order: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Category {
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }
}

/// The full category list for one definition kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub kind: DefinitionKind,
    pub schema_version: String,
    pub engine_min_version: String,
    pub categories: Vec<Category>,
}

impl Schema {
    pub fn empty(kind: DefinitionKind) -> Self {
        Self {
            kind,
            schema_version: "0.0.0".to_string(),
            engine_min_version: crate::MIN_ENGINE_VERSION.to_string(),
            categories: vec![],
        }
    }

    /// Sort categories into compile order: `order`, then key.
    pub(crate) fn sort_categories(&mut self) {
        self.categories
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.key.cmp(&b.key)));
    }
}
