//! Font face descriptors and usage tracking.
//!
//! The registry indexes a document's font faces by family. While the
//! cloner walks the tree it accounts every text run against the registry,
//! flagging the faces that actually cover rendered characters so that only
//! those get embedded later.

pub mod unicode_range;

pub use unicode_range::UnicodeRange;

use crate::css::computed::normalize_font_weight;
use crate::css::{unquote, ComputedStyle, FontFaceRule};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::Result;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};

/// One declared (family, weight, style, coverage) combination.
#[derive(Debug, Clone)]
pub struct FontFace {
    pub family: String,
    pub weight: String,
    pub style: String,
    pub unicode_range: UnicodeRange,
    pub src: Option<String>,
    used: Cell<bool>,
}

impl FontFace {
    pub fn from_rule(rule: &FontFaceRule) -> Result<Self> {
        Ok(Self {
            family: unquote(&rule.family).to_string(),
            weight: normalize_font_weight(&rule.weight),
            style: rule.style.trim().to_ascii_lowercase(),
            unicode_range: UnicodeRange::parse(&rule.unicode_range)?,
            src: rule.src.clone(),
            used: Cell::new(false),
        })
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn covers(&self, ch: char) -> bool {
        self.unicode_range.contains(ch)
    }

    // Monotonic: never reset once set.
    fn mark_used(&self) {
        self.used.set(true);
    }
}

/// Font faces of one document, keyed by family name.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    families: HashMap<String, Vec<FontFace>>,
    order: Vec<String>,
}

impl FontRegistry {
    /// Registry of every usable face; faces with bad descriptors are
    /// reported and skipped.
    pub fn collect<'a>(
        rules: impl IntoIterator<Item = &'a FontFaceRule>,
        diagnostics: &Diagnostics,
    ) -> Self {
        let mut registry = Self::default();
        for rule in rules {
            match FontFace::from_rule(rule) {
                Ok(face) => registry.insert(face),
                Err(err) => diagnostics.report(Diagnostic::InvalidFontFace {
                    family: unquote(&rule.family).to_string(),
                    reason: err.to_string(),
                }),
            }
        }
        registry
    }

    pub fn insert(&mut self, face: FontFace) {
        if !self.families.contains_key(&face.family) {
            self.order.push(face.family.clone());
        }
        self.families.entry(face.family.clone()).or_default().push(face);
    }

    pub fn faces(&self, family: &str) -> Option<&[FontFace]> {
        self.families.get(family).map(Vec::as_slice)
    }

    /// All faces, families in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FontFace> {
        self.order
            .iter()
            .filter_map(|family| self.families.get(family))
            .flatten()
    }

    pub fn used_faces(&self) -> impl Iterator<Item = &FontFace> {
        self.iter().filter(|face| face.is_used())
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Flag the faces that render `text` under `style`.
    pub fn account(&self, text: &str, style: &ComputedStyle, diagnostics: &Diagnostics) {
        if text.is_empty() {
            return;
        }

        let family_list = style.font_family();
        let Some((family, faces)) = family_list
            .split(',')
            .map(unquote)
            .find_map(|family| self.families.get(family).map(|faces| (family, faces)))
        else {
            diagnostics.report(Diagnostic::UnknownFont {
                family: family_list.to_string(),
            });
            return;
        };

        let weight = normalize_font_weight(style.font_weight());
        let font_style = style.font_style().to_ascii_lowercase();
        let eligible: Vec<&FontFace> = faces
            .iter()
            .filter(|face| face.weight == weight && face.style == font_style)
            .collect();

        let chars: BTreeSet<char> = text.chars().collect();
        for ch in chars {
            match eligible.iter().find(|face| face.covers(ch)) {
                Some(face) => face.mark_used(),
                None => diagnostics.report(Diagnostic::MissingGlyph {
                    family: family.to_string(),
                    weight: weight.clone(),
                    style: font_style.clone(),
                    character: ch,
                }),
            }
        }
    }
}
