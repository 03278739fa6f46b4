//! Prompt Model - Fixed Section Skeleton
//!
//! A prompt is an ordered list of sections. Rendering is deterministic:
//! each section is `HEADER\nbody`, sections are separated by one blank line.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const NO_IMAGE_REFERENCES: &str = "No image reference constraints provided.";
pub const NO_TASK: &str = "No explicit task prompt provided.";
pub const NO_TEXT_ELEMENTS: &str = "No speech or thought bubbles.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ImageReferences,
    Style,
    Characters,
    Scene,
    Task,
    TextElements,
}

impl SectionKind {
    pub fn header(&self) -> &'static str {
        match self {
            SectionKind::ImageReferences => "IMAGE REFERENCES",
            SectionKind::Style => "STYLE",
            SectionKind::Characters => "CHARACTERS",
            SectionKind::Scene => "SCENE",
            SectionKind::Task => "TASK",
            SectionKind::TextElements => "TEXT ELEMENTS",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub body: String,
}

impl Section {
    pub fn new(kind: SectionKind, body: impl Into<String>) -> Self {
        Self { kind, body: body.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    sections: Vec<Section>,
}

impl Prompt {
    /// Sections are kept in `SectionKind` order regardless of push order.
    pub fn push(&mut self, section: Section) {
        let at = self
            .sections
            .partition_point(|existing| existing.kind <= section.kind);
        self.sections.insert(at, section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{}\n{}", section.kind.header(), section.body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_kind_order() {
        let mut prompt = Prompt::default();
        prompt.push(Section::new(SectionKind::Task, "t"));
        prompt.push(Section::new(SectionKind::ImageReferences, "i"));
        prompt.push(Section::new(SectionKind::Style, "s"));
        let kinds: Vec<_> = prompt.sections().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SectionKind::ImageReferences, SectionKind::Style, SectionKind::Task]
        );
    }

    #[test]
    fn test_render_separates_with_blank_line() {
        let mut prompt = Prompt::default();
        prompt.push(Section::new(SectionKind::Task, "draw"));
        prompt.push(Section::new(SectionKind::TextElements, NO_TEXT_ELEMENTS));
        assert_eq!(
            prompt.render(),
            "TASK\ndraw\n\nTEXT ELEMENTS\nNo speech or thought bubbles."
        );
    }
}
