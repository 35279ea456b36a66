//! Live render tree
//!
//! A [`Document`] couples a parsed HTML tree (`scraper::Html`) with the live
//! state that markup alone does not carry: shadow roots, slot assignments,
//! canvas pixels, video playback, embedded frame documents and form values.
//! Everything the snapshot cloner reads from the "live page" goes through
//! this module.

pub mod media;
mod style;

pub use ego_tree::NodeId;
pub use media::{Raster, VideoState, EMPTY_DATA_URL};
pub use style::Probe;

use crate::css::{ComputedStyle, FontFaceRule, StyleSheet};
use crate::{Error, Result};
use ego_tree::{NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use url::Url;

/// Element kinds whose visual state needs more than a structural copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Canvas,
    Video,
    Frame,
    Slot,
    TextArea,
    Input,
    Select,
    Generic,
}

impl VisualKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "canvas" => VisualKind::Canvas,
            "video" => VisualKind::Video,
            "iframe" => VisualKind::Frame,
            "slot" => VisualKind::Slot,
            "textarea" => VisualKind::TextArea,
            "input" => VisualKind::Input,
            "select" => VisualKind::Select,
            _ => VisualKind::Generic,
        }
    }
}

/// Owned view of a single node, without its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    /// Document, fragment, doctype or processing instruction
    Container,
}

/// Content of an embedded frame
#[derive(Debug, Clone)]
pub enum FrameContent {
    Loaded(Rc<Document>),
    /// Content exists but belongs to another origin
    CrossOrigin { url: String },
}

/// A live document.
pub struct Document {
    html: RefCell<Html>,
    base_url: Option<Url>,
    shadow_roots: HashMap<NodeId, NodeId>,
    shadow_hosts: HashMap<NodeId, NodeId>,
    slots: HashMap<NodeId, Vec<NodeId>>,
    canvases: HashMap<NodeId, Raster>,
    videos: HashMap<NodeId, VideoState>,
    frames: HashMap<NodeId, FrameContent>,
    values: HashMap<NodeId, String>,
    client_sizes: HashMap<NodeId, (u32, u32)>,
    style_sheets: Vec<StyleSheet>,
    font_faces: Vec<FontFaceRule>,
    expose_css_text: bool,
    style_cache: RefCell<HashMap<NodeId, ComputedStyle>>,
    probe: Cell<Option<NodeId>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("shadow_roots", &self.shadow_roots.len())
            .field("frames", &self.frames.len())
            .field("style_sheets", &self.style_sheets.len())
            .field("font_faces", &self.font_faces.len())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Parse markup into a live document.
    ///
    /// `<style>` elements and `<link rel="stylesheet">` elements become the
    /// initial style sheet list, in document order. Linked sheets stay
    /// unreadable until their text is supplied with
    /// [`Document::load_style_sheet`]. The `@font-face` rules of readable
    /// sheets are the initial font set.
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let style_sheets: Vec<StyleSheet> = html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|el| match el.value().name() {
                "style" => Some(StyleSheet::parse(&el.text().collect::<String>())),
                "link" if is_stylesheet_link(&el) => {
                    el.value().attr("href").map(StyleSheet::cross_origin)
                }
                _ => None,
            })
            .collect();
        let font_faces = style_sheets
            .iter()
            .flat_map(|sheet| sheet.font_faces().cloned())
            .collect();

        Self {
            html: RefCell::new(html),
            base_url: None,
            shadow_roots: HashMap::new(),
            shadow_hosts: HashMap::new(),
            slots: HashMap::new(),
            canvases: HashMap::new(),
            videos: HashMap::new(),
            frames: HashMap::new(),
            values: HashMap::new(),
            client_sizes: HashMap::new(),
            style_sheets,
            font_faces,
            expose_css_text: false,
            style_cache: RefCell::new(HashMap::new()),
            probe: Cell::new(None),
        }
    }

    /// Set the base URL. Linked sheet hrefs are resolved against it.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        self.base_url = Some(Url::parse(base)?);
        let sheets = std::mem::take(&mut self.style_sheets);
        self.style_sheets = sheets
            .into_iter()
            .map(|sheet| {
                let resolved = sheet.href().map(|href| self.resolve_url(href));
                match resolved {
                    Some(href) => sheet.with_href(href),
                    None => sheet,
                }
            })
            .collect();
        Ok(self)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve `href` against the base URL when one is set.
    pub fn resolve_url(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    pub fn node(&self, id: NodeId) -> LiveNode<'_> {
        LiveNode { doc: self, id }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.html.borrow().tree.root().id()
    }

    pub fn root_element(&self) -> Option<NodeId> {
        let html = self.html.borrow();
        let root = html.tree.root();
        root.children()
            .find(|child| child.value().is_element())
            .map(|child| child.id())
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element(|el| el.value().name() == "body")
    }

    /// First element matching `selector` in the light tree, document order.
    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        let selector = parse_selector(selector)?;
        Ok(self.find_element(|el| selector.matches(el)))
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_element(|el| el.value().id() == Some(id))
    }

    fn find_element(&self, pred: impl Fn(&ElementRef<'_>) -> bool) -> Option<NodeId> {
        let html = self.html.borrow();
        let found = html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| pred(el))
            .map(|el| el.id());
        found
    }

    fn with_node<R>(&self, id: NodeId, f: impl FnOnce(NodeRef<'_, Node>) -> R) -> Option<R> {
        let html = self.html.borrow();
        let result = html.tree.get(id).map(f);
        result
    }

    pub fn node_data(&self, id: NodeId) -> Option<NodeData> {
        self.with_node(id, |node| match node.value() {
            Node::Element(el) => NodeData::Element {
                tag: el.name().to_string(),
                attrs: el
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            },
            Node::Text(text) => NodeData::Text(String::from(&**text)),
            Node::Comment(comment) => NodeData::Comment(String::from(&**comment)),
            _ => NodeData::Container,
        })
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        self.with_node(id, |node| node.value().as_element().map(|el| el.name().to_string()))
            .flatten()
    }

    /// Attribute by local name, regardless of namespace (`xlink:href` is `href`).
    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.with_node(id, |node| {
            node.value().as_element().and_then(|el| {
                el.attrs()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.to_string())
            })
        })
        .flatten()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.with_node(id, |node| node.parent().map(|p| p.id())).flatten()
    }

    /// Element, text and comment children in tree order.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.with_node(id, |node| {
            node.children()
                .filter(|child| {
                    matches!(child.value(), Node::Element(_) | Node::Text(_) | Node::Comment(_))
                })
                .map(|child| child.id())
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.shadow_roots.get(&host).copied()
    }

    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        self.shadow_hosts.get(&root).copied()
    }

    /// Nodes distributed into a slot; empty when nothing is assigned.
    pub fn assigned_nodes(&self, slot: NodeId) -> Vec<NodeId> {
        self.slots.get(&slot).cloned().unwrap_or_default()
    }

    /// Concatenated text of the node's own text children.
    pub fn text_content(&self, id: NodeId) -> String {
        self.with_node(id, |node| {
            if let Node::Text(text) = node.value() {
                return String::from(&**text);
            }
            node.children()
                .filter_map(|child| match child.value() {
                    Node::Text(text) => Some(String::from(&**text)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Text of every descendant text node.
    pub fn deep_text(&self, id: NodeId) -> String {
        self.with_node(id, |node| {
            node.descendants()
                .filter_map(|n| match n.value() {
                    Node::Text(text) => Some(String::from(&**text)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Live value of a form control.
    ///
    /// Falls back to what the markup implies when no live value was set:
    /// the `value` attribute of an input, the text of a textarea, the
    /// selected (else first) option of a select.
    pub fn value(&self, id: NodeId) -> Option<String> {
        if let Some(value) = self.values.get(&id) {
            return Some(value.clone());
        }
        match self.node(id).visual_kind() {
            VisualKind::Input => Some(self.attr(id, "value").unwrap_or_default()),
            VisualKind::TextArea => Some(self.deep_text(id)),
            VisualKind::Select => {
                let options = self.descendant_elements(id, "option");
                options
                    .iter()
                    .find(|option| self.attr(**option, "selected").is_some())
                    .or_else(|| options.first())
                    .map(|option| self.option_value(*option))
            }
            _ => None,
        }
    }

    pub fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value")
            .unwrap_or_else(|| self.deep_text(option).trim().to_string())
    }

    /// Descendant elements with the given tag, excluding `root` itself.
    pub fn descendant_elements(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.with_node(root, |node| {
            node.descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .filter(|el| el.value().name() == tag)
                .map(|el| el.id())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Committed pixels of a canvas; `None` when it was never painted.
    pub fn canvas(&self, id: NodeId) -> Option<&Raster> {
        self.canvases.get(&id)
    }

    pub fn video(&self, id: NodeId) -> Option<&VideoState> {
        self.videos.get(&id)
    }

    /// Content document of an embedded frame.
    ///
    /// `Ok(None)` when the frame has no document loaded, an error when the
    /// content exists but cannot be accessed.
    pub fn frame_document(&self, id: NodeId) -> Result<Option<&Document>> {
        match self.frames.get(&id) {
            None => Ok(None),
            Some(FrameContent::Loaded(doc)) => Ok(Some(doc.as_ref())),
            Some(FrameContent::CrossOrigin { url }) => Err(Error::FrameAccess(url.clone())),
        }
    }

    /// Size of the element's layout box.
    pub fn client_size(&self, id: NodeId) -> (u32, u32) {
        if let Some(size) = self.client_sizes.get(&id) {
            return *size;
        }
        let dim = |name: &str, default: u32| {
            self.attr(id, name)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
                .unwrap_or(default)
        };
        (dim("width", 300), dim("height", 150))
    }

    pub fn style_sheets(&self) -> &[StyleSheet] {
        &self.style_sheets
    }

    pub fn font_faces(&self) -> &[FontFaceRule] {
        &self.font_faces
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.with_node(id, |node| ElementRef::wrap(node).is_some_and(|el| selector.matches(&el)))
            .unwrap_or(false)
    }

    /// Whether `selector` matches `root` or any element below it.
    pub fn subtree_matches(&self, root: NodeId, selector: &Selector) -> bool {
        self.with_node(root, |node| {
            node.descendants()
                .filter_map(ElementRef::wrap)
                .any(|el| selector.matches(&el))
        })
        .unwrap_or(false)
    }

    // --- Live state builders ---

    /// Attach a shadow tree parsed from `markup` to `host`.
    pub fn attach_shadow(&mut self, host: NodeId, markup: &str) -> Result<NodeId> {
        if self.tag(host).is_none() {
            return Err(Error::NodeNotFound(format!("shadow host {:?}", host)));
        }
        if self.shadow_roots.contains_key(&host) {
            return Err(Error::ConfigError(format!(
                "shadow root already attached to {:?}",
                host
            )));
        }

        let fragment = Html::parse_fragment(markup);
        let html = self.html.get_mut();
        let root = html.tree.orphan(Node::Fragment).id();
        for child in fragment.root_element().children() {
            let id = graft(&mut html.tree, child);
            if let Some(mut root) = html.tree.get_mut(root) {
                root.append_id(id);
            }
        }

        self.shadow_roots.insert(host, root);
        self.shadow_hosts.insert(root, host);
        self.invalidate_styles();
        Ok(root)
    }

    pub fn assign_slot(&mut self, slot: NodeId, nodes: Vec<NodeId>) -> Result<()> {
        self.ensure_node(slot)?;
        for node in &nodes {
            self.ensure_node(*node)?;
        }
        self.slots.insert(slot, nodes);
        Ok(())
    }

    pub fn paint_canvas(&mut self, canvas: NodeId, raster: Raster) -> Result<()> {
        self.ensure_node(canvas)?;
        self.canvases.insert(canvas, raster);
        Ok(())
    }

    pub fn set_video(&mut self, video: NodeId, state: VideoState) -> Result<()> {
        self.ensure_node(video)?;
        self.videos.insert(video, state);
        Ok(())
    }

    pub fn set_frame(&mut self, frame: NodeId, content: FrameContent) -> Result<()> {
        self.ensure_node(frame)?;
        self.frames.insert(frame, content);
        Ok(())
    }

    pub fn set_value(&mut self, control: NodeId, value: impl Into<String>) -> Result<()> {
        self.ensure_node(control)?;
        self.values.insert(control, value.into());
        Ok(())
    }

    pub fn set_client_size(&mut self, node: NodeId, width: u32, height: u32) -> Result<()> {
        self.ensure_node(node)?;
        self.client_sizes.insert(node, (width, height));
        Ok(())
    }

    pub fn add_style_sheet(&mut self, sheet: StyleSheet) {
        self.font_faces.extend(sheet.font_faces().cloned());
        self.style_sheets.push(sheet);
        self.invalidate_styles();
    }

    /// Supply the text of a linked sheet, keeping its place in the sheet
    /// list. Returns `false` when no unread sheet has that href.
    pub fn load_style_sheet(&mut self, href: &str, css: &str) -> bool {
        let href = self.resolve_url(href);
        let Some(slot) = self
            .style_sheets
            .iter_mut()
            .find(|sheet| sheet.href() == Some(href.as_str()) && sheet.rules().is_err())
        else {
            return false;
        };
        *slot = StyleSheet::parse(css).with_href(href);
        self.font_faces.extend(slot.font_faces().cloned());
        self.invalidate_styles();
        true
    }

    pub fn add_font_face(&mut self, face: FontFaceRule) {
        self.font_faces.push(face);
    }

    /// Make computed styles carry a serialized text form.
    pub fn set_expose_css_text(&mut self, expose: bool) {
        self.expose_css_text = expose;
        self.invalidate_styles();
    }

    fn ensure_node(&self, id: NodeId) -> Result<()> {
        self.with_node(id, |_| ())
            .ok_or_else(|| Error::NodeNotFound(format!("{:?}", id)))
    }

    fn invalidate_styles(&mut self) {
        self.style_cache.get_mut().clear();
    }
}

/// Copy `source` and its subtree into `tree` as a detached node.
fn graft(tree: &mut Tree<Node>, source: NodeRef<'_, Node>) -> NodeId {
    let id = tree.orphan(source.value().clone()).id();
    for child in source.children() {
        let child_id = graft(tree, child);
        if let Some(mut parent) = tree.get_mut(id) {
            parent.append_id(child_id);
        }
    }
    id
}

fn is_stylesheet_link(el: &ElementRef<'_>) -> bool {
    el.value().attr("rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}

pub(crate) fn parse_selector(text: &str) -> Result<Selector> {
    Selector::parse(text).map_err(|_| Error::InvalidSelector(text.to_string()))
}

/// A node of a live document, handed to filters and to the cloner.
#[derive(Clone, Copy)]
pub struct LiveNode<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> LiveNode<'d> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn data(&self) -> Option<NodeData> {
        self.doc.node_data(self.id)
    }

    pub fn tag(&self) -> Option<String> {
        self.doc.tag(self.id)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.doc.attr(self.id, name)
    }

    pub fn is_element(&self) -> bool {
        self.tag().is_some()
    }

    pub fn visual_kind(&self) -> VisualKind {
        self.tag()
            .map(|tag| VisualKind::from_tag(&tag))
            .unwrap_or(VisualKind::Generic)
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        self.doc.matches(self.id, selector)
    }
}

impl PartialEq for LiveNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for LiveNode<'_> {}

impl fmt::Debug for LiveNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveNode")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_collects_style_sheets_and_fonts() {
        let doc = Document::parse(
            r#"<html><head><style>p { color: red } @font-face { font-family: A }</style></head>
            <body><p id="p">hi</p></body></html>"#,
        );
        assert_eq!(doc.style_sheets().len(), 1);
        assert_eq!(doc.font_faces().len(), 1);
        assert!(doc.body().is_some());
        assert_eq!(doc.query("#p").unwrap(), doc.element_by_id("p"));
    }

    #[test]
    fn linked_sheets_keep_document_order_until_loaded() {
        let mut doc = Document::parse(
            r#"<head><style>a { color: red }</style>
            <link rel="preload" href="font.woff2">
            <link rel="Alternate StyleSheet" href="/css/site.css">
            <style>b { color: blue }</style></head><body></body>"#,
        )
        .with_base_url("https://example.com/page/")
        .unwrap();

        let sheets = doc.style_sheets();
        assert_eq!(sheets.len(), 3);
        assert_eq!(sheets[1].href(), Some("https://example.com/css/site.css"));
        assert!(sheets[1].rules().is_err());

        assert!(!doc.load_style_sheet("/css/other.css", "p { }"));
        assert!(doc.load_style_sheet(
            "/css/site.css",
            "i { color: green } @font-face { font-family: B }"
        ));
        let sheets = doc.style_sheets();
        assert_eq!(sheets.len(), 3);
        assert_eq!(sheets[1].style_rules().next().unwrap().selector_text, "i");
        assert_eq!(doc.font_faces().len(), 1);
        assert!(!doc.load_style_sheet("/css/site.css", "p { }"));
    }

    #[test]
    fn child_nodes_skip_non_content_nodes() {
        let doc = Document::parse("<div id=a>x<!--c--><b></b></div>");
        let a = doc.element_by_id("a").unwrap();
        let kids: Vec<_> = doc
            .child_nodes(a)
            .into_iter()
            .map(|id| doc.node_data(id).unwrap())
            .collect();
        assert_eq!(kids.len(), 3);
        assert_eq!(kids[0], NodeData::Text("x".into()));
        assert_eq!(kids[1], NodeData::Comment("c".into()));
        assert!(matches!(kids[2], NodeData::Element { ref tag, .. } if tag == "b"));
    }

    #[test]
    fn shadow_tree_is_detached_from_light_tree() {
        let mut doc = Document::parse(r#"<div id="host"><span id="light"></span></div>"#);
        let host = doc.element_by_id("host").unwrap();
        let root = doc.attach_shadow(host, r#"<em id="inner">a</em><slot></slot>"#).unwrap();

        assert_eq!(doc.shadow_root(host), Some(root));
        assert_eq!(doc.shadow_host(root), Some(host));
        assert_eq!(doc.child_nodes(root).len(), 2);
        assert_eq!(doc.element_by_id("inner"), None);
        assert!(doc.attach_shadow(host, "<i></i>").is_err());
    }

    #[test]
    fn form_values_fall_back_to_markup() {
        let mut doc = Document::parse(
            r#"<input id="i" value="a"><textarea id="t">draft</textarea>
            <select id="s"><option value="x">X</option><option selected>Why</option></select>"#,
        );
        let input = doc.element_by_id("i").unwrap();
        let select = doc.element_by_id("s").unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("a"));
        assert_eq!(doc.value(doc.element_by_id("t").unwrap()).as_deref(), Some("draft"));
        assert_eq!(doc.value(select).as_deref(), Some("Why"));

        doc.set_value(input, "typed").unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("typed"));
    }

    #[test]
    fn cross_origin_frame_is_an_error() {
        let mut doc = Document::parse(r#"<iframe id="f"></iframe><iframe id="g"></iframe>"#);
        let f = doc.element_by_id("f").unwrap();
        let g = doc.element_by_id("g").unwrap();
        doc.set_frame(f, FrameContent::CrossOrigin { url: "https://other.example/".into() })
            .unwrap();
        assert!(matches!(doc.frame_document(f), Err(Error::FrameAccess(_))));
        assert!(matches!(doc.frame_document(g), Ok(None)));
    }

    #[test]
    fn client_size_prefers_layout_then_attributes() {
        let mut doc = Document::parse(r#"<video id="v" width="64" height="32"></video><video id="w"></video>"#);
        let v = doc.element_by_id("v").unwrap();
        assert_eq!(doc.client_size(v), (64, 32));
        assert_eq!(doc.client_size(doc.element_by_id("w").unwrap()), (300, 150));
        doc.set_client_size(v, 10, 5).unwrap();
        assert_eq!(doc.client_size(v), (10, 5));
    }

    #[test]
    fn resolves_relative_urls_against_base() {
        let doc = Document::parse("<p></p>")
            .with_base_url("https://example.com/a/page.html")
            .unwrap();
        assert_eq!(doc.resolve_url("poster.png"), "https://example.com/a/poster.png");
        assert_eq!(Document::parse("").resolve_url("x.png"), "x.png");
    }
}
