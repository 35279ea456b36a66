//! Symbol reference resolution (`<use href="#id">`).

use super::{clone_node, CloneContext, CloneOptions};
use crate::css::Priority;
use crate::inert::InertElement;
use crate::Result;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

const HIDDEN: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("width", "0"),
    ("height", "0"),
    ("overflow", "hidden"),
    ("display", "none"),
];

/// Clone every definition referenced from `clone` but missing from it, once
/// per id, and append them in a hidden `<svg><defs>` container.
pub(super) async fn resolve<'a>(
    clone: &mut InertElement,
    options: &'a CloneOptions,
    ctx: &'a CloneContext<'a>,
) -> Result<()> {
    let doc = ctx.document();
    let mut definitions = Vec::new();

    for id in referenced_ids(clone) {
        if clone.find_by_id(&id).is_some() {
            continue;
        }
        let Some(definition) = doc.element_by_id(&id) else {
            log::debug!("symbol #{} has no definition", id);
            continue;
        };
        // A definition that references itself is already being cloned.
        if !ctx.begin_symbol(&id) {
            continue;
        }
        let cloned = clone_node(doc.node(definition), options, ctx, true).await;
        ctx.end_symbol(&id);
        if let Some(node) = cloned? {
            definitions.push(node);
        }
    }

    if definitions.is_empty() {
        return Ok(());
    }

    let mut defs = InertElement::new("defs");
    defs.children = definitions;
    let mut svg = InertElement::new("svg");
    svg.set_attr("xmlns", SVG_NS);
    for (name, value) in HIDDEN {
        svg.style.set_property(name, value, Priority::Normal);
    }
    svg.append_child(defs);
    clone.append_child(svg);
    Ok(())
}

/// Fragment ids referenced by `use` elements, first encounter order.
fn referenced_ids(clone: &InertElement) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for el in clone.elements_by_tag("use") {
        let href = el.attr("xlink:href").or_else(|| el.attr("href"));
        let Some(id) = href.and_then(|h| h.trim().strip_prefix('#')) else {
            continue;
        };
        if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inert::InertNode;

    #[test]
    fn ids_are_deduplicated_in_order() {
        let mut root = InertElement::new("svg");
        for href in ["#b", "#a", "#b", "other.svg#c"] {
            root.append_child(InertNode::Element(InertElement::with_attrs(
                "use",
                vec![("href".into(), href.into())],
            )));
        }
        assert_eq!(referenced_ids(&root), vec!["b".to_string(), "a".to_string()]);
    }
}
