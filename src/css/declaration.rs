//! Ordered inline style of an inert element.

use super::{parse_declarations, Declaration, Priority};
use serde::Serialize;

/// Inline style declarations in insertion order.
///
/// Overwriting a property keeps its original position, the way
/// `CSSStyleDeclaration.setProperty` behaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StyleDeclaration {
    properties: Vec<Declaration>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut style = Self::new();
        style.set_css_text(text);
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    pub fn priority(&self, name: &str) -> Priority {
        self.properties
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.priority)
            .unwrap_or_default()
    }

    /// Set a property; an empty value removes it.
    pub fn set_property(&mut self, name: &str, value: &str, priority: Priority) {
        if value.is_empty() {
            self.remove_property(name);
            return;
        }
        match self.properties.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.priority = priority;
            }
            None => self.properties.push(Declaration::new(name, value, priority)),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        let pos = self.properties.iter().position(|d| d.name == name)?;
        Some(self.properties.remove(pos).value)
    }

    /// Replace every declaration with the ones parsed from `text`.
    pub fn set_css_text(&mut self, text: &str) {
        self.properties.clear();
        for decl in parse_declarations(text) {
            self.set_property(&decl.name, &decl.value, decl.priority);
        }
    }

    pub fn css_text(&self) -> String {
        self.properties
            .iter()
            .map(Declaration::to_css)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
