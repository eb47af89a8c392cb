//! Section grouping and navigation.
//!
//! Section fields partition the schema: every field belongs to the most recent
//! Section marker before it. Fields that appear before the first marker form a
//! preamble that is always shown.

use serde::{Deserialize, Serialize};

use crate::model::{FieldDescriptor, FieldType};

/// How sections are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionMode {
    /// Every section is shown as an always-open group under its header.
    Accordion,
    /// Section markers become a menu and only the selected section is shown.
    #[default]
    Navigation,
}

impl std::str::FromStr for SectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accordion" => Ok(SectionMode::Accordion),
            "navigation" | "nav" => Ok(SectionMode::Navigation),
            other => Err(format!("unknown section mode {other:?}")),
        }
    }
}

/// One section and the fields that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Name of the Section field that opened this group
    pub name: String,
    pub label: String,
    /// Member field names in schema order, excluding the marker itself
    pub fields: Vec<String>,
}

/// Partition of the schema into a preamble and sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionLayout {
    /// Every field name in schema order, markers included
    order: Vec<String>,
    /// Fields before the first Section marker
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl SectionLayout {
    /// Group descriptors by the Section markers between them.
    pub fn from_descriptors(fields: &[FieldDescriptor]) -> Self {
        let mut layout = SectionLayout::default();

        for field in fields {
            layout.order.push(field.name.clone());

            if field.field_type == FieldType::Section {
                layout.sections.push(Section {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    fields: Vec::new(),
                });
                continue;
            }

            match layout.sections.last_mut() {
                Some(section) => section.fields.push(field.name.clone()),
                None => layout.preamble.push(field.name.clone()),
            }
        }

        layout
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    /// Field names to render, in order, for the given mode and navigation.
    ///
    /// In accordion mode this is the full schema, markers included. In
    /// navigation mode markers are dropped and only the preamble plus the
    /// selected section remain.
    pub fn visible_fields(&self, mode: SectionMode, nav: &NavigationState) -> Vec<&str> {
        match mode {
            SectionMode::Accordion => self.order.iter().map(String::as_str).collect(),
            SectionMode::Navigation => {
                let mut visible: Vec<&str> = self.preamble.iter().map(String::as_str).collect();
                if let Some(section) = self.sections.get(nav.selected()) {
                    visible.extend(section.fields.iter().map(String::as_str));
                }
                visible
            }
        }
    }
}

/// Which section the navigation menu has selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationState {
    selected: usize,
}

impl NavigationState {
    /// Navigation with the first section selected.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Select a section, clamped to the last one.
    pub fn select(&mut self, index: usize, layout: &SectionLayout) {
        let count = layout.sections().len();
        self.selected = if count == 0 { 0 } else { index.min(count - 1) };
    }

    pub fn next(&mut self, layout: &SectionLayout) {
        let count = layout.sections().len();
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn previous(&mut self, layout: &SectionLayout) {
        let count = layout.sections().len();
        if count > 0 {
            self.selected = (self.selected + count - 1) % count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("title", "LED Control", FieldType::Title),
            FieldDescriptor::new("power", "On/Off", FieldType::Boolean),
            FieldDescriptor::new("S_basic", "Basic", FieldType::Section),
            FieldDescriptor::new("brightness", "Brightness", FieldType::Number),
            FieldDescriptor::new("effect", "Effect", FieldType::Select),
            FieldDescriptor::new("S_color", "Color", FieldType::Section),
            FieldDescriptor::new("solidColor", "Color", FieldType::Color),
        ]
    }

    #[test]
    fn test_fields_belong_to_preceding_section() {
        let layout = SectionLayout::from_descriptors(&schema());

        assert_eq!(layout.preamble(), ["title", "power"]);
        assert_eq!(layout.sections().len(), 2);
        assert_eq!(layout.sections()[0].fields, ["brightness", "effect"]);
        assert_eq!(layout.sections()[1].fields, ["solidColor"]);
        assert_eq!(layout.sections()[1].name, "S_color");
    }

    #[test]
    fn test_first_section_visible_by_default() {
        let layout = SectionLayout::from_descriptors(&schema());
        let nav = NavigationState::new();

        assert_eq!(
            layout.visible_fields(SectionMode::Navigation, &nav),
            ["title", "power", "brightness", "effect"]
        );
    }

    #[test]
    fn test_navigation_switches_visible_fields() {
        let layout = SectionLayout::from_descriptors(&schema());
        let mut nav = NavigationState::new();

        nav.next(&layout);
        assert_eq!(
            layout.visible_fields(SectionMode::Navigation, &nav),
            ["title", "power", "solidColor"]
        );

        nav.next(&layout);
        assert_eq!(nav.selected(), 0);

        nav.previous(&layout);
        assert_eq!(nav.selected(), 1);

        nav.select(99, &layout);
        assert_eq!(nav.selected(), 1);
    }

    #[test]
    fn test_accordion_shows_everything() {
        let layout = SectionLayout::from_descriptors(&schema());
        let visible = layout.visible_fields(SectionMode::Accordion, &NavigationState::new());
        assert_eq!(visible.len(), 7);
        assert_eq!(visible[2], "S_basic");
    }

    #[test]
    fn test_no_sections() {
        let fields = vec![FieldDescriptor::new("power", "On/Off", FieldType::Boolean)];
        let layout = SectionLayout::from_descriptors(&fields);
        let mut nav = NavigationState::new();
        nav.next(&layout);

        assert_eq!(nav.selected(), 0);
        assert_eq!(layout.visible_fields(SectionMode::Navigation, &nav), ["power"]);
    }

    #[test]
    fn test_section_mode_from_str() {
        assert_eq!("Accordion".parse::<SectionMode>(), Ok(SectionMode::Accordion));
        assert_eq!("nav".parse::<SectionMode>(), Ok(SectionMode::Navigation));
        assert!("tabs".parse::<SectionMode>().is_err());
    }
}
