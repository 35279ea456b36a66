//! Style sheet rule matching for the snapshot root.

use crate::css::CssRule;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::dom::{Document, NodeId};
use crate::inert::{InertElement, InertNode};
use serde::Serialize;

/// A style rule whose selector matched inside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRule {
    pub selector: String,
    pub css_text: String,
}

/// Rules of every readable sheet, in sheet then rule order, whose selector
/// matches `root` or an element below it.
///
/// Unreadable sheets and unparseable selectors are reported and skipped.
pub fn matching_rules(document: &Document, root: NodeId, diagnostics: &Diagnostics) -> Vec<MatchedRule> {
    let mut matched = Vec::new();
    for sheet in document.style_sheets() {
        let rules = match sheet.rules() {
            Ok(rules) => rules,
            Err(_) => {
                diagnostics.report(Diagnostic::UnreadableStyleSheet {
                    href: sheet.href().map(str::to_string),
                });
                continue;
            }
        };

        for rule in rules {
            let CssRule::Style(rule) = rule else {
                continue;
            };
            match rule.selector() {
                Some(selector) => {
                    if document.subtree_matches(root, selector) {
                        matched.push(MatchedRule {
                            selector: rule.selector_text.clone(),
                            css_text: rule.css_text(),
                        });
                    }
                }
                None => diagnostics.report(Diagnostic::InvalidSelector {
                    selector: rule.selector_text.clone(),
                }),
            }
        }
    }
    matched
}

/// A `<style>` element holding the rules' text, concatenated in order.
pub fn style_element(rules: &[MatchedRule]) -> InertElement {
    let mut style = InertElement::new("style");
    let text: String = rules.iter().map(|rule| rule.css_text.as_str()).collect();
    if !text.is_empty() {
        style.append_child(InertNode::text(text));
    }
    style
}
