use std::fmt::Write;

use anyhow::anyhow;
use chumsky::Parser;
use chumsky::error::{Simple, SimpleReason};
use chumsky::primitive::end;
use colored::Color;

// Parsing infrastructure
pub trait CharParser<T>: Parser<char, T, Error = Simple<char>> + Sized {
    fn parse_text(&self, input: &str) -> anyhow::Result<T> {
        self.parse(input)
            .map_err(|errors| anyhow!("{}", format_errors_cli(input, errors)))
    }
}
impl<T, P> CharParser<T> for P where P: Parser<char, T, Error = Simple<char>> {}

#[cfg(not(test))]
fn color_string<S: AsRef<str>>(string: S, color: Color) -> colored::ColoredString {
    use colored::Colorize;
    string.as_ref().color(color)
}

#[cfg(test)]
fn color_string<S: AsRef<str>>(string: S, _color: Color) -> String {
    string.as_ref().to_string()
}

fn describe_expected(error: &Simple<char>) -> String {
    let mut expected: Vec<String> = error
        .expected()
        .map(|expected| match expected {
            Some(c) => format!("`{c}`"),
            None => "<end of input>".to_string(),
        })
        .collect();
    if expected.is_empty() {
        return "something else".to_string();
    }
    expected.sort_unstable();
    expected
        .into_iter()
        .map(|item| color_string(item, Color::Blue).to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Formats the first `chumsky` error into a user-visible (optionally colored) string
/// that points at the offending part of the input.
pub fn format_errors_cli(input: &str, errors: Vec<Simple<char>>) -> String {
    const ERROR_COLOR: Color = Color::Red;

    let Some(error) = errors.into_iter().next() else {
        return format!("cannot parse `{input}`");
    };

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} found{}, expected {}:",
        if error.found().is_some() {
            "Unexpected token"
        } else {
            "Unexpected end of input"
        },
        error
            .label()
            .map(|label| format!(
                " while attempting to parse {}",
                color_string(label, Color::Yellow)
            ))
            .unwrap_or_default(),
        describe_expected(&error),
    );

    if input.is_empty() {
        output.push_str("(the input was empty)");
        return output;
    }

    let span = error.span();
    let before: String = input.chars().take(span.start).collect();
    let marked: String = input
        .chars()
        .skip(span.start)
        .take(span.end.saturating_sub(span.start))
        .collect();
    let after: String = input.chars().skip(span.end).collect();
    let _ = writeln!(
        output,
        "  {before}{}{after}",
        color_string(marked, ERROR_COLOR)
    );

    let spaces = " ".repeat(2 + span.start);
    let note = match error.reason() {
        SimpleReason::Custom(msg) => msg.clone(),
        _ => match error.found() {
            Some(c) => format!("Unexpected token `{c}`"),
            None => "Unexpected end of input".to_string(),
        },
    };
    let _ = writeln!(output, "{spaces}{}", color_string("|", ERROR_COLOR));
    let _ = writeln!(
        output,
        "{spaces}{}{}",
        color_string("--- ", ERROR_COLOR),
        color_string(note, ERROR_COLOR)
    );
    output
}

/// Parses a plain decimal number. Signs, separators and whitespace are rejected.
fn parse_digits() -> impl CharParser<String> {
    chumsky::text::digits(10).labelled("number")
}

/// Parse 4-byte integer.
pub fn parse_u32() -> impl CharParser<u32> {
    parse_digits().try_map(|digits, span| {
        digits
            .parse::<u32>()
            .map_err(|_| Simple::custom(span, "Cannot parse as 4-byte unsigned integer"))
    })
}

/// Parse 8-byte integer.
pub fn parse_u64() -> impl CharParser<u64> {
    parse_digits().try_map(|digits, span| {
        digits
            .parse::<u64>()
            .map_err(|_| Simple::custom(span, "Cannot parse as 8-byte unsigned integer"))
    })
}

/// Return a parser that will fail if there is any input following the text parsed by the
/// provided parser.
pub fn all_consuming<T>(parser: impl CharParser<T>) -> impl CharParser<T> {
    parser.then_ignore(end())
}
