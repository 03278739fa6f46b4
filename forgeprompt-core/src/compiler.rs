//! Prompt Compiler - Definitions to Prompt Text
//!
//! Walks each definition's metadata in schema order and emits labeled
//! attribute lines. Unknown categories and properties are still rendered,
//! with humanized labels, after the known ones and in key order.

use crate::format::{format_value, humanize_key};
use crate::metadata::{CategoryValues, Definition, Metadata, MetadataValue};
use crate::prompt::{Prompt, Section, SectionKind, NO_IMAGE_REFERENCES, NO_TASK, NO_TEXT_ELEMENTS};
use crate::registry::SchemaRegistry;
use crate::schema::{Category, DefinitionKind};

pub const IDENTITY_CATEGORY: &str = "core_identity";
pub const NAME_PROPERTY: &str = "name";
pub const DEFAULT_CHARACTER_NAME: &str = "Character";

pub struct PromptCompiler<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> PromptCompiler<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Compile the full prompt. Style and scene are omitted when they render
    /// to nothing; image references, task and text elements are always present.
    pub fn compile(
        &self,
        task: &str,
        characters: &[Definition],
        style: Option<&Metadata>,
        scene: Option<&Metadata>,
    ) -> Prompt {
        let mut prompt = Prompt::default();
        prompt.push(Section::new(SectionKind::ImageReferences, NO_IMAGE_REFERENCES));

        if let Some(body) = style.and_then(|meta| self.render_body(DefinitionKind::Style, meta)) {
            prompt.push(Section::new(SectionKind::Style, body));
        }

        if !characters.is_empty() {
            let blocks: Vec<String> = characters
                .iter()
                .map(|character| self.render_character(character))
                .collect();
            prompt.push(Section::new(SectionKind::Characters, blocks.join("\n\n")));
        }

        if let Some(body) = scene.and_then(|meta| self.render_body(DefinitionKind::Scene, meta)) {
            prompt.push(Section::new(SectionKind::Scene, body));
        }

        let task = task.trim();
        let task = if task.is_empty() { NO_TASK } else { task };
        prompt.push(Section::new(SectionKind::Task, task));
        prompt.push(Section::new(SectionKind::TextElements, NO_TEXT_ELEMENTS));

        tracing::debug!(
            characters = characters.len(),
            sections = prompt.sections().len(),
            "prompt compiled"
        );
        prompt
    }

    /// One character block: header line, then its attribute groups.
    pub fn render_character(&self, character: &Definition) -> String {
        let mut lines = vec![format!("CHARACTER — {}", character_name(character))];
        lines.extend(self.render_categories(DefinitionKind::Character, &character.metadata));
        lines.join("\n")
    }

    fn render_body(&self, kind: DefinitionKind, metadata: &Metadata) -> Option<String> {
        let lines = self.render_categories(kind, metadata);
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Attribute lines for every category of `metadata` that has something
    /// to show: a `Label:` header followed by `- Label: value` lines.
    pub fn render_categories(&self, kind: DefinitionKind, metadata: &Metadata) -> Vec<String> {
        let mut lines = vec![];
        for category_key in self.category_order(kind, metadata) {
            let Some(values) = metadata.category(category_key) else {
                continue;
            };
            let schema_category = self.registry.category(kind, category_key);
            let property_lines = self.render_properties(kind, category_key, schema_category, values);
            if property_lines.is_empty() {
                continue;
            }
            let label = schema_category
                .map(|c| c.label.clone())
                .unwrap_or_else(|| humanize_key(category_key));
            lines.push(format!("{}:", label));
            lines.extend(property_lines);
        }
        lines
    }

    /// Canonical schema order for kinds that have one, then the remaining
    /// metadata categories by key.
    fn category_order<'m>(&self, kind: DefinitionKind, metadata: &'m Metadata) -> Vec<&'m str> {
        if !kind.has_canonical_order() {
            return metadata.category_keys().collect();
        }

        let canonical = self.registry.categories(kind);
        let mut order: Vec<&'m str> = vec![];
        for category in canonical {
            if let Some(key) = metadata.category_keys().find(|k| *k == category.key) {
                order.push(key);
            }
        }
        order.extend(
            metadata
                .category_keys()
                .filter(|k| !canonical.iter().any(|c| c.key == *k)),
        );
        order
    }

    fn render_properties(
        &self,
        kind: DefinitionKind,
        category_key: &str,
        schema_category: Option<&Category>,
        values: &CategoryValues,
    ) -> Vec<String> {
        let known = schema_category.map(|c| c.properties.as_slice()).unwrap_or(&[]);

        let mut ordered: Vec<(&str, &MetadataValue)> = known
            .iter()
            .filter_map(|p| values.get_key_value(p.key.as_str()))
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        ordered.extend(
            values
                .iter()
                .filter(|(k, _)| !known.iter().any(|p| p.key == **k))
                .map(|(k, v)| (k.as_str(), v)),
        );

        ordered
            .into_iter()
            .filter(|(key, _)| {
                !(kind == DefinitionKind::Character
                    && category_key == IDENTITY_CATEGORY
                    && *key == NAME_PROPERTY)
            })
            .filter_map(|(key, value)| {
                let property = schema_category.and_then(|c| c.property(key));
                let options = property.map(|p| p.options.as_slice()).unwrap_or(&[]);
                let formatted = format_value(value, options)?;
                let label = property
                    .map(|p| p.label.clone())
                    .unwrap_or_else(|| humanize_key(key));
                Some(format!("- {}: {}", label, formatted))
            })
            .collect()
    }
}

impl Default for PromptCompiler<'static> {
    fn default() -> Self {
        Self::new(SchemaRegistry::builtin())
    }
}

/// Display name, else the identity `name` attribute, else "Character".
pub fn character_name(character: &Definition) -> String {
    let display = character.name.trim();
    if !display.is_empty() {
        return display.to_string();
    }
    character
        .metadata
        .value(IDENTITY_CATEGORY, NAME_PROPERTY)
        .and_then(|value| format_value(value, &[]))
        .unwrap_or_else(|| DEFAULT_CHARACTER_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compiler() -> PromptCompiler<'static> {
        PromptCompiler::default()
    }

    #[test]
    fn test_character_without_metadata_is_header_only() {
        let block = compiler().render_character(&Definition::new("c", "Mira", json!(null)));
        assert_eq!(block, "CHARACTER — Mira");
    }

    #[test]
    fn test_character_name_fallbacks() {
        let from_meta = Definition::new("c", "  ", json!({"core_identity": {"name": "Ada"}}));
        assert_eq!(character_name(&from_meta), "Ada");
        assert_eq!(character_name(&Definition::default()), "Character");
    }

    #[test]
    fn test_identity_name_not_rendered_as_property() {
        let def = Definition::new("c", "", json!({"core_identity": {"name": "Ada"}}));
        assert_eq!(compiler().render_character(&def), "CHARACTER — Ada");
    }

    #[test]
    fn test_canonical_category_order_then_extras_by_key() {
        let meta = Metadata::from_json(&json!({
            "zeta_extra": {"x": "1"},
            "hair": {"hair_color": "blue"},
            "alpha_extra": {"y": "2"},
            "core_identity": {"age_range": "mid_20s"}
        }));
        let lines = compiler().render_categories(DefinitionKind::Character, &meta);
        let headers: Vec<_> = lines.iter().filter(|l| !l.starts_with("- ")).cloned().collect();
        assert_eq!(headers, vec!["Core Identity:", "Hair:", "Alpha extra:", "Zeta extra:"]);
    }

    #[test]
    fn test_properties_schema_order_then_unknown_by_key() {
        let meta = Metadata::from_json(&json!({
            "hair": {"zz_custom": "x", "hair_style": "bob", "hair_color": "blue", "aa_custom": "y"}
        }));
        let lines = compiler().render_categories(DefinitionKind::Character, &meta);
        assert_eq!(
            lines,
            vec![
                "Hair:",
                "- Hair color: Blue",
                "- Hair style: Bob cut",
                "- Aa custom: y",
                "- Zz custom: x",
            ]
        );
    }

    #[test]
    fn test_category_with_only_empty_values_is_skipped() {
        let meta = Metadata::from_json(&json!({
            "hair": {"hair_color": "", "hair_style": []},
            "face": {"eye_color": "green"}
        }));
        let lines = compiler().render_categories(DefinitionKind::Character, &meta);
        assert_eq!(lines, vec!["Face:", "- Eye color: Green"]);
    }

    #[test]
    fn test_scene_categories_by_key() {
        let meta = Metadata::from_json(&json!({
            "time_weather": {"time_of_day": "dusk"},
            "environment": {"setting": "rooftop garden"}
        }));
        let lines = compiler().render_categories(DefinitionKind::Scene, &meta);
        assert_eq!(
            lines,
            vec![
                "Environment:",
                "- Setting description: rooftop garden",
                "Time & Weather:",
                "- Time of day: Dusk",
            ]
        );
    }

    #[test]
    fn test_style_section_omitted_when_empty() {
        let style = Metadata::from_json(&json!({"medium": {"medium": "  "}}));
        let prompt = compiler().compile("x", &[], Some(&style), None);
        assert!(prompt.section(SectionKind::Style).is_none());
    }

    #[test]
    fn test_style_tags_and_custom_values() {
        let style = Metadata::from_json(&json!({
            "medium": {"medium": "anime"},
            "influences": {"keywords": ["ukiyo-e", "vaporwave"]}
        }));
        let prompt = compiler().compile("x", &[], Some(&style), None);
        assert_eq!(
            prompt.section(SectionKind::Style).unwrap().body,
            "Medium:\n- Medium: Anime\nInfluences:\n- Style keywords: ukiyo-e, vaporwave"
        );
    }

    #[test]
    fn test_characters_joined_by_blank_line() {
        let characters = vec![
            Definition::new("a", "A", json!({})),
            Definition::new("b", "B", json!({"hair": {"hair_color": "teal"}})),
        ];
        let prompt = compiler().compile("", &characters, None, None);
        assert_eq!(
            prompt.section(SectionKind::Characters).unwrap().body,
            "CHARACTER — A\n\nCHARACTER — B\nHair:\n- Hair color: teal"
        );
    }

    #[test]
    fn test_missing_registry_falls_back_to_humanized_labels() {
        let empty = SchemaRegistry::new();
        let meta = Metadata::from_json(&json!({"hair": {"hair_color": "blue"}}));
        let lines = PromptCompiler::new(&empty).render_categories(DefinitionKind::Character, &meta);
        assert_eq!(lines, vec!["Hair:", "- Hair color: blue"]);
    }
}
