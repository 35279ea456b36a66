//! `unicode-range` descriptor parsing

use crate::{Error, Result};
use cssparser::{ParseError, Parser, ParserInput};
use std::ops::RangeInclusive;
use std::str::FromStr;

const MAX_CODE_POINT: u32 = char::MAX as u32;

/// Code-point coverage of a font face, as a predicate over characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicodeRange {
    spans: Vec<RangeInclusive<u32>>,
}

impl UnicodeRange {
    /// The whole code space (`U+0-10FFFF`).
    pub fn all() -> Self {
        Self {
            spans: vec![0..=MAX_CODE_POINT],
        }
    }

    /// Parse a comma separated list of `U+` tokens.
    ///
    /// Accepts single code points (`U+26`), intervals (`U+0-7F`) and
    /// wildcards (`U+4??`). Empty input covers everything.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::all());
        }
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let spans = parser
            .parse_entirely(|parser| parser.parse_comma_separated(parse_span))
            .map_err(|_| Error::UnicodeRange(text.trim().to_string()))?;
        Ok(Self { spans })
    }

    pub fn contains(&self, ch: char) -> bool {
        let cp = ch as u32;
        self.spans.iter().any(|span| span.contains(&cp))
    }

    pub fn spans(&self) -> &[RangeInclusive<u32>] {
        &self.spans
    }
}

impl FromStr for UnicodeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_span<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> std::result::Result<RangeInclusive<u32>, ParseError<'i, ()>> {
    let range = cssparser::UnicodeRange::parse(parser)?;
    Ok(range.start..=range.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points_intervals_and_wildcards() {
        let range = UnicodeRange::parse("U+0000-00FF, U+0131, u+4??").unwrap();
        assert!(range.contains('A'));
        assert!(range.contains('\u{131}'));
        assert!(!range.contains('\u{130}'));
        assert!(range.contains('\u{400}'));
        assert!(range.contains('\u{4FF}'));
        assert!(!range.contains('\u{500}'));
    }

    #[test]
    fn empty_covers_everything() {
        let range: UnicodeRange = "".parse().unwrap();
        assert_eq!(range, UnicodeRange::all());
        assert!(range.contains('\u{1F600}'));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(UnicodeRange::parse("0041").is_err());
        assert!(UnicodeRange::parse("U+zz").is_err());
        assert!(UnicodeRange::parse("U+100-50").is_err());
        assert!(UnicodeRange::parse("U+110000").is_err());
    }
}
