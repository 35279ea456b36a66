//! Computed style values and the property tables the cascade starts from.

use super::{Declaration, Priority, StyleDeclaration};

/// Default font size in pixels (`medium`)
pub const DEFAULT_FONT_SIZE_PX: f64 = 16.0;

/// Properties that inherit from the parent element.
pub const INHERITED: &[&str] = &[
    "color",
    "cursor",
    "direction",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "letter-spacing",
    "line-height",
    "list-style-type",
    "text-align",
    "text-indent",
    "text-transform",
    "visibility",
    "white-space",
    "word-spacing",
];

/// Initial values, in the order computed styles enumerate them.
pub const INITIAL_VALUES: &[(&str, &str)] = &[
    ("display", "inline"),
    ("position", "static"),
    ("top", "auto"),
    ("right", "auto"),
    ("bottom", "auto"),
    ("left", "auto"),
    ("width", "auto"),
    ("height", "auto"),
    ("margin-top", "0px"),
    ("margin-right", "0px"),
    ("margin-bottom", "0px"),
    ("margin-left", "0px"),
    ("padding-top", "0px"),
    ("padding-right", "0px"),
    ("padding-bottom", "0px"),
    ("padding-left", "0px"),
    ("box-sizing", "content-box"),
    ("overflow", "visible"),
    ("z-index", "auto"),
    ("opacity", "1"),
    ("visibility", "visible"),
    ("color", "rgb(0, 0, 0)"),
    ("background-color", "rgba(0, 0, 0, 0)"),
    ("background-image", "none"),
    ("border-style", "none"),
    ("border-width", "0px"),
    ("border-color", "rgb(0, 0, 0)"),
    ("border-radius", "0px"),
    ("font-family", "serif"),
    ("font-size", "16px"),
    ("font-style", "normal"),
    ("font-variant", "normal"),
    ("font-weight", "400"),
    ("line-height", "normal"),
    ("letter-spacing", "normal"),
    ("word-spacing", "0px"),
    ("text-align", "start"),
    ("text-indent", "0px"),
    ("text-decoration", "none"),
    ("text-transform", "none"),
    ("white-space", "normal"),
    ("direction", "ltr"),
    ("list-style-type", "disc"),
    ("cursor", "auto"),
    ("transform", "none"),
    ("transform-origin", "50% 50%"),
];

pub fn is_inherited(name: &str) -> bool {
    name.starts_with("--") || INHERITED.contains(&name)
}

pub fn initial_value(name: &str) -> Option<&'static str> {
    INITIAL_VALUES
        .iter()
        .find(|(prop, _)| *prop == name)
        .map(|(_, value)| *value)
}

/// User-agent `display` for elements that are not inline by default.
pub fn ua_display(tag: &str) -> Option<&'static str> {
    let display = match tag {
        "html" | "body" | "div" | "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol"
        | "dl" | "dd" | "dt" | "section" | "article" | "aside" | "header" | "footer" | "nav"
        | "main" | "form" | "fieldset" | "figure" | "figcaption" | "blockquote" | "pre"
        | "address" | "hr" | "details" | "summary" => "block",
        "li" => "list-item",
        "table" => "table",
        "tr" => "table-row",
        "td" | "th" => "table-cell",
        "thead" => "table-header-group",
        "tbody" => "table-row-group",
        "tfoot" => "table-footer-group",
        "img" | "canvas" | "video" | "input" | "select" | "textarea" | "button" => "inline-block",
        "head" | "script" | "style" | "template" | "title" | "meta" | "link" => "none",
        "slot" => "contents",
        _ => return None,
    };
    Some(display)
}

/// Resolve a `font-size` value to pixels against the parent size.
pub fn resolve_font_size(value: &str, parent_px: f64) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let keyword = match value.as_str() {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(DEFAULT_FONT_SIZE_PX),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent_px / 1.2),
        "larger" => Some(parent_px * 1.2),
        _ => None,
    };
    if keyword.is_some() {
        return keyword.map(round_px);
    }

    let number = |suffix: &str| -> Option<f64> { value.strip_suffix(suffix)?.trim().parse().ok() };
    let px = if let Some(n) = number("px") {
        n
    } else if let Some(n) = number("rem") {
        n * DEFAULT_FONT_SIZE_PX
    } else if let Some(n) = number("em") {
        n * parent_px
    } else if let Some(n) = number("%") {
        n * parent_px / 100.0
    } else if let Some(n) = number("pt") {
        n * 4.0 / 3.0
    } else {
        return None;
    };
    Some(round_px(px))
}

fn round_px(px: f64) -> f64 {
    (px * 10_000.0).round() / 10_000.0
}

pub fn format_px(px: f64) -> String {
    format!("{}px", px)
}

/// Map weight keywords onto their numeric form.
pub fn normalize_font_weight(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "normal" => "400".to_string(),
        "bold" => "700".to_string(),
        other => other.to_string(),
    }
}

/// The resolved style of a node, as the cascade produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    declarations: StyleDeclaration,
    css_text: Option<String>,
}

impl ComputedStyle {
    pub fn initial() -> Self {
        let mut style = Self::default();
        for (name, value) in INITIAL_VALUES {
            style.set(name, value, Priority::Normal);
        }
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations.get(name)
    }

    pub fn priority(&self, name: &str) -> Priority {
        self.declarations.priority(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialized form, only present when the engine exposes one.
    pub fn css_text(&self) -> Option<&str> {
        self.css_text.as_deref()
    }

    pub fn font_family(&self) -> &str {
        self.get("font-family").unwrap_or_default()
    }

    pub fn font_weight(&self) -> &str {
        self.get("font-weight").unwrap_or_default()
    }

    pub fn font_style(&self) -> &str {
        self.get("font-style").unwrap_or_default()
    }

    pub fn font_size_px(&self) -> f64 {
        self.get("font-size")
            .and_then(|v| resolve_font_size(v, DEFAULT_FONT_SIZE_PX))
            .unwrap_or(DEFAULT_FONT_SIZE_PX)
    }

    pub(crate) fn set(&mut self, name: &str, value: &str, priority: Priority) {
        self.declarations.set_property(name, value, priority);
    }

    pub(crate) fn expose_css_text(&mut self) {
        self.css_text = Some(self.declarations.css_text());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_units() {
        assert_eq!(resolve_font_size("20px", 16.0), Some(20.0));
        assert_eq!(resolve_font_size("1.5em", 20.0), Some(30.0));
        assert_eq!(resolve_font_size("2rem", 20.0), Some(32.0));
        assert_eq!(resolve_font_size("50%", 20.0), Some(10.0));
        assert_eq!(resolve_font_size("large", 20.0), Some(18.0));
        assert_eq!(resolve_font_size("1.2em", 16.0), Some(19.2));
        assert_eq!(resolve_font_size("calc(1em + 2px)", 16.0), None);
        assert_eq!(format_px(24.0), "24px");
    }

    #[test]
    fn initial_style_enumerates_in_table_order() {
        let style = ComputedStyle::initial();
        assert_eq!(style.len(), INITIAL_VALUES.len());
        assert_eq!(style.iter().next().map(|d| d.name.as_str()), Some("display"));
        assert_eq!(style.font_size_px(), 16.0);
        assert!(style.css_text().is_none());
    }

    #[test]
    fn weight_keywords() {
        assert_eq!(normalize_font_weight("bold"), "700");
        assert_eq!(normalize_font_weight("Normal"), "400");
        assert_eq!(normalize_font_weight("300"), "300");
    }
}
