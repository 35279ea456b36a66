//! Shallow duplication with per-kind special cases, and form state transfer.

use super::{clone_node, CloneContext, CloneOptions};
use crate::diagnostics::Diagnostic;
use crate::dom::{LiveNode, NodeData, Raster, VisualKind, EMPTY_DATA_URL};
use crate::inert::{InertElement, InertNode};
use crate::resource::mime_type;
use crate::{Error, Result};

pub(super) async fn shallow<'a>(
    node: LiveNode<'a>,
    kind: VisualKind,
    options: &'a CloneOptions,
    ctx: &'a CloneContext<'a>,
) -> Result<InertNode> {
    match kind {
        VisualKind::Canvas => freeze_canvas(node),
        VisualKind::Video => freeze_video(node, options).await,
        VisualKind::Frame => clone_frame(node, options, ctx).await,
        _ => duplicate(node),
    }
}

/// Tag and attributes only.
pub(super) fn duplicate(node: LiveNode<'_>) -> Result<InertNode> {
    match node.data() {
        Some(NodeData::Element { tag, attrs }) => Ok(InertElement::with_attrs(tag, attrs).into()),
        Some(NodeData::Text(text)) => Ok(InertNode::text(text)),
        Some(NodeData::Comment(text)) => Ok(InertNode::comment(text)),
        Some(NodeData::Container) => Err(Error::UnsupportedNode(format!("{:?}", node))),
        None => Err(Error::NodeNotFound(format!("{:?}", node.id()))),
    }
}

fn image(src: &str) -> InertNode {
    let mut img = InertElement::new("img");
    img.set_attr("src", src);
    img.into()
}

fn freeze_canvas(node: LiveNode<'_>) -> Result<InertNode> {
    let data_url = match node.document().canvas(node.id()) {
        Some(raster) => raster.to_data_url()?,
        None => EMPTY_DATA_URL.to_string(),
    };
    if data_url == EMPTY_DATA_URL {
        return duplicate(node);
    }
    Ok(image(&data_url))
}

async fn freeze_video(node: LiveNode<'_>, options: &CloneOptions) -> Result<InertNode> {
    let doc = node.document();
    if let Some(state) = doc.video(node.id()).filter(|state| state.is_loaded()) {
        let (width, height) = doc.client_size(node.id());
        let mut surface = Raster::new(width, height);
        if let Some(frame) = &state.frame {
            surface.draw_scaled(frame);
        }
        return Ok(image(&surface.to_data_url()?));
    }

    let Some(poster) = node.attr("poster").filter(|p| !p.trim().is_empty()) else {
        return Ok(image(EMPTY_DATA_URL));
    };
    let url = doc.resolve_url(poster.trim());
    let resolver = options.resolver.as_ref().ok_or_else(|| {
        Error::ConfigError(format!("no resource resolver configured for poster {}", url))
    })?;
    let data_url = resolver.resolve(&url, mime_type(&url)).await?;
    Ok(image(&data_url))
}

async fn clone_frame<'a>(
    node: LiveNode<'a>,
    options: &'a CloneOptions,
    ctx: &'a CloneContext<'a>,
) -> Result<InertNode> {
    match frame_body(node, options, ctx).await {
        Ok(Some(body)) => return Ok(body),
        Ok(None) => {}
        Err(err) => ctx.diagnostics().report(Diagnostic::FrameFallback {
            reason: err.to_string(),
        }),
    }
    duplicate(node)
}

/// Clone the frame's body as its own style root.
async fn frame_body<'a>(
    node: LiveNode<'a>,
    options: &'a CloneOptions,
    ctx: &'a CloneContext<'a>,
) -> Result<Option<InertNode>> {
    let Some(frame_doc) = node.document().frame_document(node.id())? else {
        return Ok(None);
    };
    let Some(body) = frame_doc.body() else {
        return Ok(None);
    };
    let frame_ctx = ctx.for_frame(frame_doc, body);
    clone_node(frame_doc.node(body), options, &frame_ctx, true).await
}

/// Copy live form values onto the clone.
pub(super) fn transfer_form_state(node: LiveNode<'_>, kind: VisualKind, clone: &mut InertElement) {
    let doc = node.document();
    match kind {
        VisualKind::TextArea => {
            let value = doc.value(node.id()).unwrap_or_default();
            clone.children.clear();
            if !value.is_empty() {
                clone.append_child(InertNode::text(value));
            }
        }
        VisualKind::Input => {
            let value = doc.value(node.id()).unwrap_or_default();
            clone.set_attr("value", &value);
        }
        VisualKind::Select => {
            if let Some(value) = doc.value(node.id()) {
                mark_selected(clone, &value);
            }
        }
        _ => {}
    }
}

fn mark_selected(select: &mut InertElement, value: &str) {
    let mut options = Vec::new();
    collect_options(select, &mut options);
    let Some(pos) = options.iter().position(|option| option_value(option) == value) else {
        return;
    };
    for (i, option) in options.into_iter().enumerate() {
        if i == pos {
            option.set_attr("selected", "");
        } else {
            option.remove_attr("selected");
        }
    }
}

fn collect_options<'a>(el: &'a mut InertElement, out: &mut Vec<&'a mut InertElement>) {
    for child in el.children.iter_mut().filter_map(InertNode::as_element_mut) {
        if child.tag.eq_ignore_ascii_case("option") {
            out.push(child);
        } else {
            collect_options(child, out);
        }
    }
}

fn option_value(option: &InertElement) -> String {
    option
        .attr("value")
        .map(str::to_string)
        .unwrap_or_else(|| option.text_content().trim().to_string())
}
