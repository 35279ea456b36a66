//! RFox Snapshot
//!
//! Produces inert, fully-styled snapshots of live render trees, ready to be
//! serialized into a vector document or rasterized.
//!
//! # Features
//!
//! - **Faithful structure**: shadow trees, slot assignments and embedded
//!   frames are cloned the way they render, in source order
//! - **Frozen surfaces**: painted canvases and playing videos become images
//! - **Font accounting**: only the font faces that cover rendered text are
//!   flagged for embedding
//! - **Degradable failures**: unreadable style sheets, unknown fonts and
//!   inaccessible frames are reported as diagnostics, never as errors
//!
//! # Example
//!
//! ```no_run
//! use rfsnapshot::{snapshot, CloneOptions, Document};
//!
//! # async fn run() -> rfsnapshot::Result<()> {
//! let doc = Document::parse(r#"<body><p id="greeting">Hello</p><p class="ad">Buy</p></body>"#);
//! let root = doc.body().expect("parsed documents have a body");
//!
//! let options = CloneOptions::default()
//!     .with_filter(|node| node.attr("class").as_deref() != Some("ad"));
//! let snap = snapshot(&doc, root, &options).await?;
//! println!("{}", snap.to_html());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod clone;
pub mod css;
pub mod diagnostics;
pub mod dom;
pub mod fonts;
pub mod inert;
pub mod resource;

pub use clone::{clone_node, CloneContext, CloneOptions, MatchedRule, NodeFilter};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use dom::{Document, FrameContent, LiveNode, NodeId, Raster, VideoState, VisualKind};
pub use fonts::{FontFace, FontRegistry};
pub use inert::{InertElement, InertNode};
#[cfg(feature = "fetch")]
pub use resource::FetchResolver;
pub use resource::{ResourceResolver, StaticResolver};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// The result of one snapshot
///
/// Holds the inert tree, the document's font faces with their `used` flags
/// settled, and every diagnostic reported while cloning.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: InertNode,
    pub fonts: FontRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

impl Snapshot {
    /// Faces that cover at least one rendered character
    pub fn used_font_faces(&self) -> impl Iterator<Item = &FontFace> {
        self.fonts.used_faces()
    }

    pub fn to_html(&self) -> String {
        self.tree.to_html()
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// SHA-256 of the serialized markup, hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.to_html().as_bytes()))
    }

    /// Summary suitable for JSON output
    pub fn report(&self) -> SnapshotReport<'_> {
        SnapshotReport {
            html: self.to_html(),
            node_count: self.node_count(),
            used_font_faces: self
                .used_font_faces()
                .map(|face| UsedFontFace {
                    family: &face.family,
                    weight: &face.weight,
                    style: &face.style,
                    src: face.src.as_deref(),
                })
                .collect(),
            diagnostics: &self.diagnostics,
            digest: self.digest(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotReport<'a> {
    pub html: String,
    pub node_count: usize,
    pub used_font_faces: Vec<UsedFontFace<'a>>,
    pub diagnostics: &'a [Diagnostic],
    pub digest: String,
}

#[derive(Debug, Serialize)]
pub struct UsedFontFace<'a> {
    pub family: &'a str,
    pub weight: &'a str,
    pub style: &'a str,
    pub src: Option<&'a str>,
}

/// Snapshot the subtree rooted at `root`.
///
/// Runs the cloner once with `root` as the style root. The root itself is
/// never filtered.
pub async fn snapshot(document: &Document, root: NodeId, options: &CloneOptions) -> Result<Snapshot> {
    let ctx = CloneContext::new(document, root);
    let tree = clone_node(document.node(root), options, &ctx, true)
        .await?
        .ok_or_else(|| Error::NodeNotFound(format!("snapshot root {:?}", root)))?;

    let (fonts, diagnostics) = ctx.into_parts();
    let fonts = std::rc::Rc::try_unwrap(fonts).unwrap_or_else(|shared| (*shared).clone());
    let snap = Snapshot {
        tree,
        fonts,
        diagnostics: diagnostics.snapshot(),
    };
    log::info!(
        "snapshot complete: {} nodes, {} used font faces, {} diagnostics",
        snap.node_count(),
        snap.used_font_faces().count(),
        snap.diagnostics.len()
    );
    Ok(snap)
}
