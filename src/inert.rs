//! Inert snapshot tree
//!
//! The cloner's output: plain owned nodes with no live state attached.
//! Element styles are kept as a [`StyleDeclaration`] separate from the other
//! attributes and merged back into a `style` attribute on serialization.

use crate::css::StyleDeclaration;
use serde::Serialize;

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InertNode {
    Element(InertElement),
    Text { text: String },
    Comment { text: String },
}

impl InertNode {
    pub fn text(text: impl Into<String>) -> Self {
        InertNode::Text { text: text.into() }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        InertNode::Comment { text: text.into() }
    }

    pub fn as_element(&self) -> Option<&InertElement> {
        match self {
            InertNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut InertElement> {
        match self {
            InertNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        match self {
            InertNode::Element(el) => el.node_count(),
            _ => 1,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            InertNode::Element(el) => el.text_content(),
            InertNode::Text { text } => text.clone(),
            InertNode::Comment { .. } => String::new(),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            InertNode::Element(el) => el.write_html(out),
            InertNode::Text { text } => out.push_str(&escape(text, false)),
            InertNode::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
}

impl From<InertElement> for InertNode {
    fn from(el: InertElement) -> Self {
        InertNode::Element(el)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InertElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub style: StyleDeclaration,
    pub children: Vec<InertNode>,
}

impl InertElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Element with the given attributes; a `style` attribute is parsed into
    /// the style declaration.
    pub fn with_attrs(tag: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        let mut el = Self::new(tag);
        for (name, value) in attrs {
            el.set_attr(&name, &value);
        }
        el
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if name == "style" {
            self.style.set_css_text(value);
            return;
        }
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn append_child(&mut self, child: impl Into<InertNode>) {
        self.children.push(child.into());
    }

    pub fn prepend_child(&mut self, child: impl Into<InertNode>) {
        self.children.insert(0, child.into());
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.to_ascii_lowercase().as_str())
    }

    /// Depth-first search of descendants (not including `self`).
    pub fn find(&self, pred: &dyn Fn(&InertElement) -> bool) -> Option<&InertElement> {
        self.children
            .iter()
            .filter_map(InertNode::as_element)
            .find_map(|child| {
                if pred(child) {
                    Some(child)
                } else {
                    child.find(pred)
                }
            })
    }

    pub fn find_by_id(&self, id: &str) -> Option<&InertElement> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.find(&|el: &InertElement| el.attr("id") == Some(id))
    }

    /// Descendant elements with `tag`, document order.
    pub fn elements_by_tag<'a>(&'a self, tag: &str) -> Vec<&'a InertElement> {
        let mut found = Vec::new();
        self.collect_by_tag(tag, &mut found);
        found
    }

    fn collect_by_tag<'a>(&'a self, tag: &str, found: &mut Vec<&'a InertElement>) {
        for child in self.children.iter().filter_map(InertNode::as_element) {
            if child.tag.eq_ignore_ascii_case(tag) {
                found.push(child);
            }
            child.collect_by_tag(tag, found);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(InertNode::node_count).sum::<usize>()
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(InertNode::text_content).collect()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
        }
        if !self.style.is_empty() {
            out.push_str(&format!(" style=\"{}\"", escape(&self.style.css_text(), true)));
        }
        out.push('>');
        if self.is_void() {
            return;
        }
        let raw_text = matches!(self.tag.as_str(), "style" | "script");
        for child in &self.children {
            match child {
                // raw text must not contain `</`
                InertNode::Text { text } if raw_text => {
                    out.push_str(&text.replace("</", "<\\/"))
                }
                _ => child.write_html(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InertElement {
        let mut div = InertElement::with_attrs(
            "div",
            vec![
                ("id".into(), "root".into()),
                ("style".into(), "color: red".into()),
            ],
        );
        let mut p = InertElement::new("p");
        p.append_child(InertNode::text("a < b"));
        div.append_child(p);
        div.append_child(InertElement::new("img"));
        div
    }

    #[test]
    fn style_attribute_lives_in_declaration() {
        let div = sample();
        assert_eq!(div.attr("style"), None);
        assert_eq!(div.style.get("color"), Some("red"));
    }

    #[test]
    fn serializes_with_escaping_and_void_elements() {
        assert_eq!(
            sample().to_html(),
            r#"<div id="root" style="color: red;"><p>a &lt; b</p><img></div>"#
        );
    }

    #[test]
    fn raw_text_cannot_close_its_element() {
        let mut style = InertElement::new("style");
        style.append_child(InertNode::text(r#"p::after { content: "</style><b>"; }"#));
        assert_eq!(
            style.to_html(),
            r#"<style>p::after { content: "<\/style><b>"; }</style>"#
        );
    }

    #[test]
    fn counts_and_searches() {
        let div = sample();
        assert_eq!(div.node_count(), 4);
        assert_eq!(div.elements_by_tag("img").len(), 1);
        assert!(div.find_by_id("root").is_some());
        assert_eq!(div.text_content(), "a < b");
    }

    #[test]
    fn prepend_puts_child_first() {
        let mut div = sample();
        div.prepend_child(InertElement::new("style"));
        assert_eq!(div.children[0].as_element().unwrap().tag, "style");
    }
}
