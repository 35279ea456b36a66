//! Style resolution for live nodes
//!
//! A small cascade: initial values, user agent `display`, inherited
//! properties from the parent (a shadow root inherits from its host), then
//! matching style sheet rules and the inline `style` attribute. Normal
//! declarations apply before important ones; later ones win within a tier.

use super::{graft, Document, NodeId};
use crate::css::computed::{self, format_px, normalize_font_weight, resolve_font_size};
use crate::css::{parse_declarations, ComputedStyle, Declaration, Priority};
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};

const PROBE_MARKUP: &str = r#"<div style="all: revert"></div>"#;

/// A temporary element with every authored declaration reverted.
///
/// Inserted next to a source node so that its computed style equals the
/// defaults an element in that position would get. Detached on drop. The
/// tree arena never frees nodes, so a document keeps one detached probe
/// and moves it around instead of grafting a new one each time.
pub struct Probe<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl Probe<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn computed_style(&self) -> ComputedStyle {
        self.doc.computed_style(self.id)
    }
}

impl Drop for Probe<'_> {
    fn drop(&mut self) {
        match self.doc.html.try_borrow_mut() {
            Ok(mut html) => {
                if let Some(mut node) = html.tree.get_mut(self.id) {
                    node.detach();
                }
            }
            Err(_) => log::warn!("default-style probe {:?} left in the tree", self.id),
        }
        if let Ok(mut cache) = self.doc.style_cache.try_borrow_mut() {
            cache.remove(&self.id);
        }
    }
}

impl Document {
    /// Computed style of a node. Non-element nodes get inherited values only.
    pub fn computed_style(&self, id: NodeId) -> ComputedStyle {
        let html = self.html.borrow();
        self.computed_style_in(&html, id)
    }

    /// Insert a default-style probe right after `next_to`.
    pub fn insert_probe(&self, next_to: NodeId) -> Probe<'_> {
        let mut html = self.html.borrow_mut();
        let idle = self
            .probe
            .get()
            .filter(|id| html.tree.get(*id).is_some_and(|node| node.parent().is_none()));
        let probe = match idle {
            Some(id) => id,
            None => {
                let template = Html::parse_fragment(PROBE_MARKUP);
                let id = match template.root_element().first_child() {
                    Some(div) => graft(&mut html.tree, div),
                    None => html.tree.orphan(Node::Fragment).id(),
                };
                self.probe.set(Some(id));
                id
            }
        };

        let anchor = html.tree.get(next_to);
        let next_sibling = anchor.and_then(|n| n.next_sibling()).map(|n| n.id());
        let parent = anchor.and_then(|n| n.parent()).map(|n| n.id());
        match (next_sibling, parent) {
            (Some(sibling), _) => {
                if let Some(mut sibling) = html.tree.get_mut(sibling) {
                    sibling.insert_id_before(probe);
                }
            }
            (None, Some(parent)) => {
                if let Some(mut parent) = html.tree.get_mut(parent) {
                    parent.append_id(probe);
                }
            }
            (None, None) => {}
        }

        Probe { doc: self, id: probe }
    }

    #[cfg(test)]
    pub(crate) fn cached_styles(&self) -> usize {
        self.style_cache.borrow().len()
    }

    fn computed_style_in(&self, html: &Html, id: NodeId) -> ComputedStyle {
        if let Some(style) = self.style_cache.borrow().get(&id) {
            return style.clone();
        }
        let style = self.cascade(html, id);
        self.style_cache.borrow_mut().insert(id, style.clone());
        style
    }

    fn style_parent(&self, node: NodeRef<'_, Node>) -> Option<NodeId> {
        let parent = node.parent()?;
        match parent.value() {
            Node::Element(_) => Some(parent.id()),
            Node::Fragment => self.shadow_hosts.get(&parent.id()).copied(),
            _ => None,
        }
    }

    fn cascade(&self, html: &Html, id: NodeId) -> ComputedStyle {
        let mut style = ComputedStyle::initial();
        let Some(node) = html.tree.get(id) else {
            return style;
        };

        let parent_style = self
            .style_parent(node)
            .map(|parent| self.computed_style_in(html, parent));
        let parent_px = parent_style
            .as_ref()
            .map_or(computed::DEFAULT_FONT_SIZE_PX, ComputedStyle::font_size_px);
        if let Some(parent_style) = &parent_style {
            for decl in parent_style
                .iter()
                .filter(|decl| computed::is_inherited(&decl.name))
            {
                style.set(&decl.name, &decl.value, Priority::Normal);
            }
        }

        let Some(element) = ElementRef::wrap(node) else {
            return style;
        };
        if let Some(display) = computed::ua_display(element.value().name()) {
            style.set("display", display, Priority::Normal);
        }

        let inline = element
            .value()
            .attr("style")
            .map(parse_declarations)
            .unwrap_or_default();
        let reverted = inline
            .iter()
            .any(|decl| decl.name == "all" && decl.value.eq_ignore_ascii_case("revert"));

        if !reverted {
            for priority in [Priority::Normal, Priority::Important] {
                for rule in self.style_sheets.iter().flat_map(|sheet| sheet.style_rules()) {
                    if !rule.selector().is_some_and(|sel| sel.matches(&element)) {
                        continue;
                    }
                    for decl in rule.declarations.iter().filter(|d| d.priority == priority) {
                        apply(&mut style, decl, parent_style.as_ref(), parent_px);
                    }
                }
                for decl in inline.iter().filter(|d| d.priority == priority) {
                    apply(&mut style, decl, parent_style.as_ref(), parent_px);
                }
            }
        }

        if self.expose_css_text {
            style.expose_css_text();
        }
        style
    }
}

fn apply(style: &mut ComputedStyle, decl: &Declaration, parent: Option<&ComputedStyle>, parent_px: f64) {
    if decl.name == "all" {
        return;
    }
    let value = match decl.value.to_ascii_lowercase().as_str() {
        "inherit" => parent
            .and_then(|p| p.get(&decl.name))
            .or_else(|| computed::initial_value(&decl.name))
            .map(str::to_string),
        "initial" => computed::initial_value(&decl.name).map(str::to_string),
        _ => Some(decl.value.clone()),
    };
    let Some(mut value) = value else {
        return;
    };

    match decl.name.as_str() {
        "font-size" => {
            if let Some(px) = resolve_font_size(&value, parent_px) {
                value = format_px(px);
            }
        }
        "font-weight" => value = normalize_font_weight(&value),
        _ => {}
    }
    style.set(&decl.name, &value, decl.priority);
}

#[cfg(test)]
mod tests {
    use crate::css::{Priority, StyleSheet};
    use crate::Document;

    #[test]
    fn inherits_and_resolves_relative_sizes() {
        let doc = Document::parse(
            r#"<div style="font-size: 20px; color: red; margin: 4px"><p id="t" style="font-size: 1.5em">x</p></div>"#,
        );
        let style = doc.computed_style(doc.element_by_id("t").unwrap());
        assert_eq!(style.get("font-size"), Some("30px"));
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.get("margin"), None);
        assert_eq!(style.get("display"), Some("block"));
    }

    #[test]
    fn important_beats_later_normal() {
        let mut doc = Document::parse(r#"<p id="t" style="color: blue">x</p>"#);
        doc.add_style_sheet(StyleSheet::parse("#t { color: green !important }"));
        let style = doc.computed_style(doc.element_by_id("t").unwrap());
        assert_eq!(style.get("color"), Some("green"));
        assert_eq!(style.priority("color"), Priority::Important);
    }

    #[test]
    fn shadow_content_inherits_from_host() {
        let mut doc = Document::parse(r#"<div id="host" style="font-weight: bold"></div>"#);
        let host = doc.element_by_id("host").unwrap();
        let root = doc.attach_shadow(host, "<span>s</span>").unwrap();
        let span = doc.child_nodes(root)[0];
        assert_eq!(doc.computed_style(span).get("font-weight"), Some("700"));
    }

    #[test]
    fn probe_reports_defaults_and_detaches() {
        let doc = Document::parse(
            r#"<style>div { color: red }</style><section style="color: blue"><div id="t">x</div></section>"#,
        );
        let target = doc.element_by_id("t").unwrap();
        let section = doc.parent(target).unwrap();
        let before = doc.child_nodes(section).len();
        {
            let probe = doc.insert_probe(target);
            assert_eq!(doc.child_nodes(section).len(), before + 1);
            let defaults = probe.computed_style();
            assert_eq!(defaults.get("color"), Some("blue"));
            assert_eq!(defaults.get("display"), Some("block"));
        }
        assert_eq!(doc.child_nodes(section).len(), before);
    }

    #[test]
    fn probe_node_is_reused_across_captures() {
        let doc = Document::parse(
            r#"<section style="color: blue"><p id="a">a</p></section><aside style="color: green"><p id="b">b</p></aside>"#,
        );
        let a = doc.element_by_id("a").unwrap();
        let b = doc.element_by_id("b").unwrap();

        let (first, first_color) = {
            let probe = doc.insert_probe(a);
            (probe.id(), probe.computed_style().get("color").map(str::to_string))
        };
        let (second, second_color) = {
            let probe = doc.insert_probe(b);
            (probe.id(), probe.computed_style().get("color").map(str::to_string))
        };
        assert_eq!(first, second);
        assert_eq!(first_color.as_deref(), Some("blue"));
        assert_eq!(second_color.as_deref(), Some("green"));
    }

    #[test]
    fn css_text_is_exposed_on_request() {
        let mut doc = Document::parse(r#"<p id="t">x</p>"#);
        let p = doc.element_by_id("t").unwrap();
        assert!(doc.computed_style(p).css_text().is_none());
        doc.set_expose_css_text(true);
        assert!(doc.computed_style(p).css_text().unwrap().contains("display: block;"));
    }
}
