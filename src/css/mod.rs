//! Minimal CSS model: style sheets, rules and declaration blocks.
//!
//! Rules and declarations are read with `cssparser`; selector parsing and
//! matching is delegated to `scraper::Selector`. Rule text is
//! re-serialized in the normalized `selector { name: value; }` form so that
//! matched rules can be concatenated into a single style block.

pub mod computed;
pub mod declaration;

pub use computed::ComputedStyle;
pub use declaration::StyleDeclaration;

use crate::{Error, Result};
use cssparser::{parse_important, Delimiter, ParseError, Parser, ParserInput, Token};
use scraper::Selector;
use serde::Serialize;

type ParseResult<'i, T> = std::result::Result<T, ParseError<'i, ()>>;

/// Declaration priority (`!important` or not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Important,
}

impl Priority {
    /// The CSSOM spelling: empty string or `"important"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "",
            Priority::Important => "important",
        }
    }
}

/// A single `name: value` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub priority: Priority,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            priority,
        }
    }

    pub fn to_css(&self) -> String {
        match self.priority {
            Priority::Normal => format!("{}: {};", self.name, self.value),
            Priority::Important => format!("{}: {} !important;", self.name, self.value),
        }
    }
}

/// A qualified rule: selector list plus declaration block.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector_text: String,
    pub declarations: Vec<Declaration>,
    selector: Option<Selector>,
}

impl StyleRule {
    pub fn new(selector_text: &str, declarations: Vec<Declaration>) -> Self {
        let selector_text = selector_text.trim().to_string();
        let selector = Selector::parse(&selector_text).ok();
        Self {
            selector_text,
            declarations,
            selector,
        }
    }

    /// Parsed selector, `None` when the selector text is not understood.
    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    pub fn css_text(&self) -> String {
        if self.declarations.is_empty() {
            return format!("{} {{ }}", self.selector_text);
        }
        let body = self
            .declarations
            .iter()
            .map(Declaration::to_css)
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {{ {} }}", self.selector_text, body)
    }
}

/// An `@font-face` declaration as authored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFaceRule {
    pub family: String,
    pub weight: String,
    pub style: String,
    pub unicode_range: String,
    pub src: Option<String>,
}

impl FontFaceRule {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            weight: "normal".to_string(),
            style: "normal".to_string(),
            unicode_range: "U+0-10FFFF".to_string(),
            src: None,
        }
    }

    pub fn weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = weight.into();
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn unicode_range(mut self, range: impl Into<String>) -> Self {
        self.unicode_range = range.into();
        self
    }

    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    fn from_declarations(declarations: &[Declaration]) -> Option<Self> {
        let mut face = FontFaceRule::new("");
        for decl in declarations {
            match decl.name.as_str() {
                "font-family" => face.family = unquote(&decl.value).to_string(),
                "font-weight" => face.weight = decl.value.clone(),
                "font-style" => face.style = decl.value.clone(),
                "unicode-range" => face.unicode_range = decl.value.clone(),
                "src" => face.src = Some(decl.value.clone()),
                _ => {}
            }
        }
        if face.family.is_empty() {
            return None;
        }
        Some(face)
    }
}

#[derive(Debug, Clone)]
pub enum CssRule {
    Style(StyleRule),
    FontFace(FontFaceRule),
    /// Any other at-rule, kept verbatim
    Other(String),
}

/// A style sheet reachable from a document.
///
/// Cross-origin sheets exist in the sheet list but refuse access to their
/// rules, mirroring what a browser exposes through CSSOM.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    href: Option<String>,
    rules: Option<Vec<CssRule>>,
}

impl StyleSheet {
    pub fn parse(text: &str) -> Self {
        Self {
            href: None,
            rules: Some(parse_rules(text)),
        }
    }

    pub fn cross_origin(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            rules: None,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn rules(&self) -> Result<&[CssRule]> {
        self.rules.as_deref().ok_or_else(|| {
            Error::StyleSheetAccess(self.href.clone().unwrap_or_else(|| "<inline>".to_string()))
        })
    }

    /// Style rules of a readable sheet; empty for cross-origin sheets.
    pub fn style_rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.rules.iter().flatten().filter_map(|rule| match rule {
            CssRule::Style(style) => Some(style),
            _ => None,
        })
    }

    pub fn font_faces(&self) -> impl Iterator<Item = &FontFaceRule> {
        self.rules.iter().flatten().filter_map(|rule| match rule {
            CssRule::FontFace(face) => Some(face),
            _ => None,
        })
    }
}

/// Parse a declaration block (`color: red; margin: 0 !important`).
///
/// Invalid declarations are dropped, the rest of the block is kept.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(block);
    let mut parser = Parser::new(&mut input);
    parse_declaration_list(&mut parser)
}

fn parse_declaration_list(parser: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    while !parser.is_exhausted() {
        match parser.parse_until_after(Delimiter::Semicolon, parse_declaration) {
            Ok(decl) => declarations.push(decl),
            Err(err) => log::debug!(
                "dropping invalid declaration at {}:{}",
                err.location.line,
                err.location.column
            ),
        }
    }
    declarations
}

fn parse_declaration<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, Declaration> {
    let name = parser.expect_ident_cloned()?;
    parser.expect_colon()?;
    let name = if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    };

    parser.skip_whitespace();
    let start = parser.position();
    let mut end = start;
    let mut priority = Priority::Normal;
    while !parser.is_exhausted() {
        if parser.try_parse(parse_important).is_ok() {
            priority = Priority::Important;
            break;
        }
        skip_component(parser)?;
        end = parser.position();
    }

    let value = parser.slice(start..end).trim();
    if value.is_empty() {
        return Err(parser.new_custom_error(()));
    }
    Ok(Declaration::new(name, value, priority))
}

/// Consume one component value, including the whole of a nested block.
fn skip_component<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, ()> {
    let opens_block = matches!(
        parser.next()?,
        Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock
    );
    if opens_block {
        parser.parse_nested_block(skip_rest)?;
    }
    Ok(())
}

fn skip_rest<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, ()> {
    while parser.next().is_ok() {}
    Ok(())
}

fn parse_rules(text: &str) -> Vec<CssRule> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut rules = Vec::new();
    while !parser.is_exhausted() {
        match parse_rule(&mut parser) {
            Ok(Some(rule)) => rules.push(rule),
            Ok(None) => {}
            Err(err) => log::debug!(
                "ignoring css rule at {}:{}",
                err.location.line,
                err.location.column
            ),
        }
    }
    rules
}

/// Read one top-level rule: a prelude ended by `;` or a `{}` block.
fn parse_rule<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, Option<CssRule>> {
    parser.skip_whitespace();
    let start = parser.position();
    loop {
        let token = parser.next()?.clone();
        match token {
            Token::Semicolon => {
                let prelude = parser.slice_from(start).trim_end_matches(';').trim();
                return Ok((!prelude.is_empty()).then(|| CssRule::Other(format!("{};", prelude))));
            }
            Token::CurlyBracketBlock => break,
            _ => {}
        }
    }
    let prelude = parser.slice_from(start).trim_end_matches('{').trim();

    let body_start = parser.position();
    parser.parse_nested_block(skip_rest)?;
    let body = parser.slice_from(body_start);
    let body = body.strip_suffix('}').unwrap_or(body);
    Ok(Some(build_rule(prelude, body)))
}

fn build_rule(prelude: &str, body: &str) -> CssRule {
    if let Some(at) = prelude.strip_prefix('@') {
        let name = at
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if name == "font-face" {
            if let Some(face) = FontFaceRule::from_declarations(&parse_declarations(body)) {
                return CssRule::FontFace(face);
            }
        }
        return CssRule::Other(format!("{} {{{}}}", prelude, body));
    }
    CssRule::Style(StyleRule::new(prelude, parse_declarations(body)))
}

pub(crate) fn unquote(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_style_and_font_face_rules() {
        let sheet = StyleSheet::parse(
            r#"
            /* header */
            @import url("x.css");
            .a, .b > p { color: red; margin: 0 !important }
            @font-face { font-family: "Inter"; font-weight: 700; unicode-range: U+0-7F; src: url(inter.woff2) }
            @media (max-width: 600px) { .a { color: blue } }
            "#,
        );
        let rules = sheet.rules().unwrap();
        assert_eq!(rules.len(), 4);
        assert!(matches!(rules[0], CssRule::Other(_)));

        let style: Vec<_> = sheet.style_rules().collect();
        assert_eq!(style.len(), 1);
        assert_eq!(style[0].selector_text, ".a, .b > p");
        assert!(style[0].selector().is_some());
        assert_eq!(style[0].css_text(), ".a, .b > p { color: red; margin: 0 !important; }");

        let faces: Vec<_> = sheet.font_faces().collect();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].family, "Inter");
        assert_eq!(faces[0].weight, "700");
        assert_eq!(faces[0].style, "normal");
        assert_eq!(faces[0].unicode_range, "U+0-7F");
        assert_eq!(faces[0].src.as_deref(), Some("url(inter.woff2)"));
    }

    #[test]
    fn declarations_respect_quotes_and_parens() {
        let decls = parse_declarations(
            r#"background: url("a;b.png"); content: ";"; width: calc(100% - 2px) ! IMPORTANT; bogus"#,
        );
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].value, r#"url("a;b.png")"#);
        assert_eq!(decls[1].value, r#"";""#);
        assert_eq!(decls[2].name, "width");
        assert_eq!(decls[2].value, "calc(100% - 2px)");
        assert_eq!(decls[2].priority, Priority::Important);
    }

    #[test]
    fn nested_blocks_comments_and_unterminated_rules() {
        let sheet = StyleSheet::parse(
            "@media print { .a { color: blue } } /* c */ .b { color: /* x */ red; } .c { width: 1px",
        );
        let rules = sheet.rules().unwrap();
        assert_eq!(rules.len(), 3);
        match &rules[0] {
            CssRule::Other(text) => assert_eq!(text, "@media print { .a { color: blue } }"),
            other => panic!("unexpected rule: {:?}", other),
        }
        let style: Vec<_> = sheet.style_rules().collect();
        assert_eq!(style[0].css_text(), ".b { color: red; }");
        assert_eq!(style[1].css_text(), ".c { width: 1px; }");
    }

    #[test]
    fn misplaced_important_drops_the_declaration() {
        let decls = parse_declarations("color: red !important blue; margin: 0; padding:");
        assert_eq!(decls, vec![Declaration::new("margin", "0", Priority::Normal)]);
    }

    #[test]
    fn invalid_selector_is_kept_without_matcher() {
        let sheet = StyleSheet::parse("##bad { color: red }");
        let rule = sheet.style_rules().next().unwrap();
        assert!(rule.selector().is_none());
        assert_eq!(rule.selector_text, "##bad");
    }

    #[test]
    fn cross_origin_sheet_refuses_rules() {
        let sheet = StyleSheet::cross_origin("https://cdn.example/site.css");
        match sheet.rules() {
            Err(Error::StyleSheetAccess(href)) => assert_eq!(href, "https://cdn.example/site.css"),
            other => panic!("unexpected: {:?}", other.map(|r| r.len())),
        }
        assert_eq!(sheet.style_rules().count(), 0);
    }
}
