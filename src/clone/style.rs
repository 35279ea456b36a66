//! Style capture for cloned elements.

use super::CloneContext;
use crate::css::computed::format_px;
use crate::dom::{LiveNode, VisualKind};
use crate::inert::InertElement;

/// Account the node's text against the font registry and, for the context
/// root, copy its computed style onto the clone.
///
/// Without a serialized computed style only properties that differ from
/// the ambient defaults (measured with a scoped probe next to the node)
/// are written.
pub(super) fn apply(node: LiveNode<'_>, kind: VisualKind, clone: &mut InertElement, ctx: &CloneContext<'_>) {
    let doc = node.document();
    let is_root = ctx.is_root(node);
    let text = doc.text_content(node.id());
    if text.is_empty() && !is_root {
        return;
    }

    let style = doc.computed_style(node.id());
    ctx.fonts().account(&text, &style, ctx.diagnostics());
    if !is_root {
        return;
    }

    if let Some(css_text) = style.css_text() {
        clone.style.set_css_text(css_text);
        if let Some(origin) = style.get("transform-origin") {
            clone
                .style
                .set_property("transform-origin", origin, style.priority("transform-origin"));
        }
        return;
    }

    let defaults = {
        let probe = doc.insert_probe(node.id());
        probe.computed_style()
    };

    let path_data = clone
        .attr("d")
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    for decl in style.iter() {
        if defaults.get(&decl.name) == Some(decl.value.as_str()) {
            continue;
        }
        let value = match decl.name.as_str() {
            "font-size" => shrink_font_size(&decl.value).unwrap_or_else(|| decl.value.clone()),
            "display" if kind == VisualKind::Frame && decl.value == "inline" => "block".to_string(),
            "d" => match &path_data {
                Some(d) => format!("path(\"{}\")", d),
                None => decl.value.clone(),
            },
            _ => decl.value.clone(),
        };
        clone.style.set_property(&decl.name, &value, decl.priority);
    }
}

/// `20px` becomes `19.9px`: floor, then back off a tenth of a pixel.
fn shrink_font_size(value: &str) -> Option<String> {
    let px: f64 = value.strip_suffix("px")?.trim().parse().ok()?;
    let reduced = ((px.floor() - 0.1) * 10.0).round() / 10.0;
    Some(format_px(reduced))
}

#[cfg(test)]
mod tests {
    use super::{apply, shrink_font_size};
    use crate::clone::CloneContext;
    use crate::dom::Document;
    use crate::inert::InertElement;

    #[test]
    fn font_size_backs_off() {
        assert_eq!(shrink_font_size("20px").as_deref(), Some("19.9px"));
        assert_eq!(shrink_font_size("13.7px").as_deref(), Some("12.9px"));
        assert_eq!(shrink_font_size("1em"), None);
    }

    #[test]
    fn only_text_and_root_nodes_are_resolved() {
        let doc = Document::parse(
            r#"<div id="r"><section id="s"><img></section><p id="p">x</p></div>"#,
        );
        let root = doc.element_by_id("r").unwrap();
        let ctx = CloneContext::new(&doc, root);

        let section = doc.node(doc.element_by_id("s").unwrap());
        apply(section, section.visual_kind(), &mut InertElement::new("section"), &ctx);
        assert_eq!(doc.cached_styles(), 0);

        let p = doc.node(doc.element_by_id("p").unwrap());
        apply(p, p.visual_kind(), &mut InertElement::new("p"), &ctx);
        assert!(doc.cached_styles() > 0);
    }
}
