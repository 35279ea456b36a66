use crate::diagnostics::Diagnostics;
use crate::dom::{Document, LiveNode, NodeId};
use crate::fonts::FontRegistry;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// State shared by every node visit of one snapshot.
///
/// Read-only during traversal except for the font `used` flags, the
/// diagnostics sink and the set of symbol ids being resolved.
pub struct CloneContext<'d> {
    document: &'d Document,
    root: NodeId,
    fonts: Rc<FontRegistry>,
    diagnostics: Rc<Diagnostics>,
    resolving: RefCell<HashSet<String>>,
}

impl<'d> CloneContext<'d> {
    /// Context for a snapshot rooted at `root`, with the document's fonts.
    pub fn new(document: &'d Document, root: NodeId) -> Self {
        let diagnostics = Diagnostics::new();
        let fonts = FontRegistry::collect(document.font_faces(), &diagnostics);
        log::debug!("collected {} font faces", fonts.iter().count());
        Self {
            document,
            root,
            fonts: Rc::new(fonts),
            diagnostics: Rc::new(diagnostics),
            resolving: RefCell::new(HashSet::new()),
        }
    }

    /// Context for the body of an embedded frame. Fonts and diagnostics are
    /// shared with `self`; the frame body is its own style root.
    pub fn for_frame<'f>(&self, frame_document: &'f Document, body: NodeId) -> CloneContext<'f> {
        CloneContext {
            document: frame_document,
            root: body,
            fonts: Rc::clone(&self.fonts),
            diagnostics: Rc::clone(&self.diagnostics),
            resolving: RefCell::new(HashSet::new()),
        }
    }

    pub fn document(&self) -> &'d Document {
        self.document
    }

    pub fn root(&self) -> LiveNode<'d> {
        self.document.node(self.root)
    }

    /// Whether `node` is the style root of this context.
    pub fn is_root(&self, node: LiveNode<'_>) -> bool {
        std::ptr::eq(node.document(), self.document) && node.id() == self.root
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Mark `id` as being resolved; false if it already is.
    pub(crate) fn begin_symbol(&self, id: &str) -> bool {
        self.resolving.borrow_mut().insert(id.to_string())
    }

    pub(crate) fn end_symbol(&self, id: &str) {
        self.resolving.borrow_mut().remove(id);
    }

    pub(crate) fn into_parts(self) -> (Rc<FontRegistry>, Rc<Diagnostics>) {
        (self.fonts, self.diagnostics)
    }
}
