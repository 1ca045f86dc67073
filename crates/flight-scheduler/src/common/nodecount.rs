use chumsky::Parser;
use chumsky::error::Simple;
use chumsky::primitive::{choice, just};

use crate::common::parser::{CharParser, all_consuming, parse_u64};

const KILO: u64 = 1024;
const MEGA: u64 = 1024 * 1024;

/// Parses a node count in the format `<int>`, `<int>k` or `<int>m`.
fn parse_node_count_inner() -> impl CharParser<u64> {
    let multiplier = choice((just('k').to(KILO), just('m').to(MEGA)))
        .labelled("suffix")
        .or_not();

    all_consuming(parse_u64().then(multiplier).try_map(|(count, multiplier), span| {
        count
            .checked_mul(multiplier.unwrap_or(1))
            .ok_or_else(|| Simple::custom(span, "Node count is too large"))
    }))
}

/// Decodes a node count, returning `None` when the input is not a count.
pub fn parse_node_count(input: &str) -> Option<u64> {
    parse_node_count_inner().parse_text(input).ok()
}
