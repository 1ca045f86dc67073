use chumsky::Parser;
use chumsky::primitive::just;

use crate::common::arraydef::RangeToken;
use crate::common::parser::{CharParser, all_consuming, parse_u32};

/// Parse an array token in the format n[-end].
///
/// A descending pair is accepted here, it simply describes no indices.
fn parse_token() -> impl CharParser<RangeToken> {
    let start = parse_u32().labelled("start");
    let end = just('-').ignore_then(parse_u32().labelled("end")).or_not();

    start
        .then(end)
        .map(|(start, end)| match end {
            None => RangeToken::Single(start),
            Some(end) => RangeToken::Span { start, end },
        })
        .labelled("array index")
}

/// Parses array tokens separated by commas. Whitespace is not allowed.
fn parse_tokens() -> impl CharParser<Vec<RangeToken>> {
    parse_token().separated_by(just(',')).at_least(1)
}

fn parse_range_inner() -> impl CharParser<Vec<RangeToken>> {
    all_consuming(parse_tokens())
}

/// Parses an array expression into its tokens, in the order they were written.
pub fn parse_range_tokens(input: &str) -> anyhow::Result<Vec<RangeToken>> {
    parse_range_inner().parse_text(input)
}
