use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::arrayparser::parse_range_tokens;

/// One comma separated item of an array expression.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    Single(u32),
    /// Inclusive bounds. `start > end` is allowed and expands to nothing.
    Span { start: u32, end: u32 },
}

impl RangeToken {
    /// Number of indices produced by this token.
    pub fn len(&self) -> u64 {
        match *self {
            RangeToken::Single(_) => 1,
            RangeToken::Span { start, end } if start <= end => (end - start) as u64 + 1,
            RangeToken::Span { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `offset`-th index of this token, if it has one.
    pub fn nth(&self, offset: u64) -> Option<u32> {
        if offset >= self.len() {
            return None;
        }
        match *self {
            RangeToken::Single(value) => Some(value),
            RangeToken::Span { start, .. } => Some(start + offset as u32),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        let (start, end) = match *self {
            RangeToken::Single(value) => (value, Some(value)),
            RangeToken::Span { start, end } if start <= end => (start, Some(end)),
            RangeToken::Span { start, .. } => (start, None),
        };
        end.into_iter().flat_map(move |end| start..=end)
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeToken::Single(value) => write!(f, "{value}"),
            RangeToken::Span { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
enum Parsed {
    Tokens(Vec<RangeToken>),
    Malformed(String),
}

/// Result of parsing an array index expression such as `1-10,15,20-22`.
///
/// Parsing never fails: a malformed expression is kept together with the
/// parser diagnostic, reports itself as invalid and expands to nothing.
/// Expansion keeps the order of the expression, without sorting or
/// removing duplicates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RangeExpansion {
    expression: String,
    parsed: Parsed,
}

impl RangeExpansion {
    pub fn parse(expression: &str) -> RangeExpansion {
        let parsed = match parse_range_tokens(expression) {
            Ok(tokens) => Parsed::Tokens(tokens),
            Err(error) => Parsed::Malformed(error.to_string()),
        };
        RangeExpansion {
            expression: expression.to_string(),
            parsed,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self.parsed, Parsed::Tokens(_))
    }

    /// Parser diagnostic of a malformed expression.
    pub fn error(&self) -> Option<&str> {
        match &self.parsed {
            Parsed::Tokens(_) => None,
            Parsed::Malformed(error) => Some(error),
        }
    }

    pub fn tokens(&self) -> &[RangeToken] {
        match &self.parsed {
            Parsed::Tokens(tokens) => tokens,
            Parsed::Malformed(_) => &[],
        }
    }

    /// Number of indices in the expansion, computed without expanding it.
    #[inline]
    pub fn len(&self) -> u64 {
        self.tokens().iter().map(RangeToken::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.tokens().iter().flat_map(|token| token.iter())
    }

    pub fn expand(&self) -> Vec<u32> {
        self.iter().collect()
    }

    pub fn cursor(&self) -> RangeCursor {
        RangeCursor::default()
    }
}

impl fmt::Display for RangeExpansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Position inside a [`RangeExpansion`].
///
/// The cursor does not borrow the expansion, so it can be stored next to the
/// owner of the expansion and advanced one index at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeCursor {
    token: usize,
    offset: u64,
    consumed: u64,
}

impl RangeCursor {
    /// Returns the next index of `range` and moves past it.
    pub fn advance(&mut self, range: &RangeExpansion) -> Option<u32> {
        let tokens = range.tokens();
        while let Some(token) = tokens.get(self.token) {
            if let Some(index) = token.nth(self.offset) {
                self.offset += 1;
                self.consumed += 1;
                return Some(index);
            }
            self.token += 1;
            self.offset = 0;
        }
        None
    }

    /// How many indices were returned so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::{RangeExpansion, RangeToken};

    fn expand(expression: &str) -> Vec<u32> {
        let range = RangeExpansion::parse(expression);
        assert!(range.is_valid(), "{expression} should be valid");
        range.expand()
    }

    #[test]
    fn expand_single_value() {
        assert_eq!(expand("1"), vec![1]);
    }

    #[test]
    fn expand_keeps_list_order() {
        assert_eq!(expand("1,2,3,6,7,10,12,4"), vec![1, 2, 3, 6, 7, 10, 12, 4]);
    }

    #[test]
    fn expand_dashed_range() {
        assert_eq!(expand("1-10"), (1..=10).collect::<Vec<_>>());
        assert_eq!(expand("101-101"), vec![101]);
    }

    #[test]
    fn inverted_range_is_valid_and_empty() {
        let range = RangeExpansion::parse("10-1");
        assert!(range.is_valid());
        assert!(range.expand().is_empty());
        assert_eq!(range.len(), 0);
    }

    #[test]
    fn expand_multiple_ranges_without_sorting() {
        assert_eq!(expand("8-10,1-4"), vec![8, 9, 10, 1, 2, 3, 4]);
    }

    #[test]
    fn expand_keeps_duplicates() {
        assert_eq!(expand("1-3,2,2"), vec![1, 2, 3, 2, 2]);
    }

    #[test]
    fn len_is_sum_of_tokens() {
        for expression in ["1", "1-10", "10-1,3", "8-10,1-4", "0,0,0-2"] {
            let range = RangeExpansion::parse(expression);
            let sum: u64 = range.tokens().iter().map(RangeToken::len).sum();
            assert_eq!(range.len(), sum);
            assert_eq!(range.expand().len() as u64, sum);
        }
    }

    #[test]
    fn malformed_expressions_are_invalid() {
        for expression in [
            "", "a", "1-", "-1", "1--2", "1-2-3", "1,", ",1", "1, 2", " 1", "1;2", "1-a", "1:2",
        ] {
            let range = RangeExpansion::parse(expression);
            assert!(!range.is_valid(), "{expression:?} should be invalid");
            assert!(range.error().is_some());
            assert!(range.expand().is_empty());
        }
    }

    #[test]
    fn cursor_walks_expansion_in_order() {
        let range = RangeExpansion::parse("5,10-8,1-3");
        let mut cursor = range.cursor();
        let mut indices = Vec::new();
        while let Some(index) = cursor.advance(&range) {
            indices.push(index);
        }
        assert_eq!(indices, vec![5, 1, 2, 3]);
        assert_eq!(cursor.consumed(), 4);
        assert_eq!(cursor.advance(&range), None);
    }

    #[test]
    fn cursor_on_malformed_range_is_exhausted() {
        let range = RangeExpansion::parse("x");
        assert_eq!(range.cursor().advance(&range), None);
    }

    #[test]
    fn display_keeps_expression() {
        assert_eq!(RangeExpansion::parse("8-10,1-4").to_string(), "8-10,1-4");
        assert_eq!(RangeToken::Span { start: 3, end: 1 }.to_string(), "3-1");
    }
}
