//! Recursive snapshot cloner
//!
//! Walks a live tree depth-first and produces an inert copy. Each node is
//! duplicated shallow-first (with canvas, video and frame special cases),
//! then its effective children are cloned one at a time in source order,
//! then it is decorated with captured style and form state. The root call
//! additionally resolves symbol references and prepends the matching style
//! sheet rules.

mod context;
mod special;
mod style;
mod stylesheet;
mod symbols;

pub use context::CloneContext;
pub use stylesheet::{matching_rules, style_element, MatchedRule};

use crate::dom::{LiveNode, NodeId, VisualKind};
use crate::inert::InertNode;
use crate::resource::ResourceResolver;
use crate::Result;
use futures::future::{FutureExt, LocalBoxFuture};
use std::fmt;
use std::rc::Rc;

/// Inclusion filter: `false` prunes a node and its subtree.
pub type NodeFilter = Rc<dyn Fn(LiveNode<'_>) -> bool>;

/// Options for a snapshot.
#[derive(Clone)]
pub struct CloneOptions {
    /// Called once per non-root node before it is cloned
    pub filter: Option<NodeFilter>,
    /// Resolves video poster images to data URIs
    pub resolver: Option<Rc<dyn ResourceResolver>>,
    /// Prepend matching style sheet rules to the root clone
    pub match_style_sheets: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            filter: None,
            resolver: None,
            match_style_sheets: true,
        }
    }
}

impl fmt::Debug for CloneOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneOptions")
            .field("filter", &self.filter.is_some())
            .field("resolver", &self.resolver.is_some())
            .field("match_style_sheets", &self.match_style_sheets)
            .finish()
    }
}

impl CloneOptions {
    pub fn with_filter(mut self, filter: impl Fn(LiveNode<'_>) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    pub fn with_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    pub fn without_style_sheets(mut self) -> Self {
        self.match_style_sheets = false;
        self
    }
}

/// Clone `node` into an inert tree.
///
/// Returns `None` when a non-root node is rejected by the filter. The root
/// is always cloned. Frame access failures degrade to a structural copy;
/// every other failure aborts the whole clone.
pub fn clone_node<'a>(
    node: LiveNode<'a>,
    options: &'a CloneOptions,
    ctx: &'a CloneContext<'a>,
    is_root: bool,
) -> LocalBoxFuture<'a, Result<Option<InertNode>>> {
    async move {
        if !is_root && options.filter.as_ref().is_some_and(|keep| !keep(node)) {
            return Ok(None);
        }

        let kind = node.visual_kind();
        let mut clone = special::shallow(node, kind, options, ctx).await?;

        // One child at a time: each subtree completes before the next starts.
        for child in effective_children(node, kind) {
            let cloned = clone_node(node.document().node(child), options, ctx, false).await?;
            if let (Some(cloned), InertNode::Element(el)) = (cloned, &mut clone) {
                el.append_child(cloned);
            }
        }

        if let InertNode::Element(el) = &mut clone {
            style::apply(node, kind, el, ctx);
            special::transfer_form_state(node, kind, el);

            if is_root {
                symbols::resolve(el, options, ctx).await?;
                if options.match_style_sheets && !el.is_void() {
                    let rules = matching_rules(ctx.document(), node.id(), ctx.diagnostics());
                    el.prepend_child(style_element(&rules));
                }
            }
        }

        Ok(Some(clone))
    }
    .boxed_local()
}

/// Children as rendered: slot assignments, else shadow content, else the
/// node's own children. Videos and frames never clone children.
fn effective_children(node: LiveNode<'_>, kind: VisualKind) -> Vec<NodeId> {
    let doc = node.document();
    match kind {
        VisualKind::Video | VisualKind::Frame => Vec::new(),
        VisualKind::Slot => doc.assigned_nodes(node.id()),
        _ => match doc.shadow_root(node.id()) {
            Some(root) => doc.child_nodes(root),
            None => doc.child_nodes(node.id()),
        },
    }
}
