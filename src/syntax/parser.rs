//! LighTeX Parser
//!
//! Converts preprocessed LighTeX source into a [`Program`] with source location tracking.
//! The parser is purely syntactic: macro names are not resolved and `\begin`/`\end` name
//! mismatches are left for the evaluator to reject.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::diagnostics::SourceArc;
use crate::err_ctx;
use crate::syntax::{
    Argument, ArgumentRef, Command, CommandMacro, Environment, EnvironmentMacro, InlineNode,
    MathText, Paragraph, PlainText, Program, ProgramNode, Span, UnescapedCommand,
    VerbatimEnvironment,
};
use crate::LightexError;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct LightexParser;

/// Maximum number of characters of source quoted in a syntax error.
pub const FAILED_SNIPPET_LENGTH: usize = 30;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse LighTeX source into a [`Program`].
///
/// `source` is only used for diagnostics; it must hold the same text as `input`.
pub fn parse(input: &str, source: &SourceArc) -> Result<Program, LightexError> {
    let mut pairs = LightexParser::parse(Rule::program, input)
        .map_err(|e| convert_parse_error(e, input, source))?;

    let program = pairs
        .next()
        .ok_or_else(|| err_ctx!(Parse, "empty parse result", source, Span::default()))?;
    let span = get_span(&program);
    let body = program
        .into_inner()
        .find(|p| p.as_rule() == Rule::body)
        .ok_or_else(|| err_ctx!(Parse, "missing program body", source, span))?;

    let mut parsed = build_program(body, source)?;
    parsed.span = span;
    Ok(parsed)
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_program(pair: Pair<Rule>, source: &SourceArc) -> Result<Program, LightexError> {
    let span = get_span(&pair);
    let nodes = pair
        .into_inner()
        .map(|p| build_program_node(p, source))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Program { nodes, span })
}

fn build_program_node(pair: Pair<Rule>, source: &SourceArc) -> Result<ProgramNode, LightexError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::paragraph_breaker => Ok(ProgramNode::ParagraphBreaker(span)),

        Rule::paragraph => {
            let nodes = build_inline_nodes(pair, source)?;
            Ok(ProgramNode::Paragraph(Paragraph { nodes, span }))
        }

        Rule::display_math => Ok(ProgramNode::MathText(build_math(pair))),

        Rule::verbatim_environment => {
            let content = pair
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(ProgramNode::VerbatimEnvironment(VerbatimEnvironment {
                content,
                span,
            }))
        }

        Rule::environment => Ok(ProgramNode::Environment(Box::new(build_environment(
            pair, source,
        )?))),

        Rule::command_macro => Ok(ProgramNode::CommandMacro(Box::new(build_command_macro(
            pair, source,
        )?))),

        Rule::environment_macro => Ok(ProgramNode::EnvironmentMacro(Box::new(
            build_environment_macro(pair, source)?,
        ))),

        Rule::argument_ref => Ok(ProgramNode::ArgumentRef(build_argument_ref(pair, source)?)),

        Rule::outer_argument_ref => Ok(ProgramNode::OuterArgumentRef(build_argument_ref(
            pair, source,
        )?)),

        rule => Err(unexpected_rule(rule, source, span)),
    }
}

fn build_inline_nodes(pair: Pair<Rule>, source: &SourceArc) -> Result<Vec<InlineNode>, LightexError> {
    pair.into_inner()
        .map(|p| build_inline_node(p, source))
        .collect()
}

fn build_inline_node(pair: Pair<Rule>, source: &SourceArc) -> Result<InlineNode, LightexError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::plain_text => Ok(InlineNode::PlainText(build_plain_text(pair, source)?)),

        Rule::inline_math => Ok(InlineNode::InlinedMathText(build_math(pair))),

        Rule::command => Ok(InlineNode::Command(build_command(pair, source)?)),

        Rule::unescaped_command => {
            let body = match pair.into_inner().next() {
                Some(argument) => build_argument(argument, source)?,
                None => Argument::default(),
            };
            Ok(InlineNode::UnescapedCommand(UnescapedCommand { body, span }))
        }

        Rule::argument_ref => Ok(InlineNode::ArgumentRef(build_argument_ref(pair, source)?)),

        Rule::outer_argument_ref => Ok(InlineNode::OuterArgumentRef(build_argument_ref(
            pair, source,
        )?)),

        rule => Err(unexpected_rule(rule, source, span)),
    }
}

fn build_plain_text(pair: Pair<Rule>, source: &SourceArc) -> Result<PlainText, LightexError> {
    let span = get_span(&pair);
    let mut text = String::with_capacity(pair.as_str().len());

    for piece in pair.into_inner() {
        match piece.as_rule() {
            Rule::literal => text.push_str(piece.as_str()),
            // "\&" -> "&"
            Rule::escaped_symbol => text.push_str(&piece.as_str()[1..]),
            Rule::entity => text.push(decode_entity(&piece, source)?),
            rule => return Err(unexpected_rule(rule, source, get_span(&piece))),
        }
    }

    Ok(PlainText { text, span })
}

fn build_math(pair: Pair<Rule>) -> MathText {
    let span = get_span(&pair);
    let text = pair
        .into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    MathText { text, span }
}

fn build_argument(pair: Pair<Rule>, source: &SourceArc) -> Result<Argument, LightexError> {
    let span = get_span(&pair);
    let nodes = build_inline_nodes(pair, source)?;
    Ok(Argument { nodes, span })
}

/// Unwraps a `bracket_group` or `brace_group` into its argument.
fn build_group(pair: Pair<Rule>, source: &SourceArc) -> Result<Argument, LightexError> {
    let span = get_span(&pair);
    match pair.into_inner().next() {
        Some(argument) => build_argument(argument, source),
        None => Ok(Argument {
            nodes: vec![],
            span,
        }),
    }
}

fn build_argument_ref(pair: Pair<Rule>, source: &SourceArc) -> Result<ArgumentRef, LightexError> {
    let span = get_span(&pair);
    let digits = pair
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();
    let id = parse_count(digits, source, span)?;
    Ok(ArgumentRef { id, span })
}

fn build_command(pair: Pair<Rule>, source: &SourceArc) -> Result<Command, LightexError> {
    let span = get_span(&pair);
    let mut name = String::new();
    let mut default_arguments = Vec::new();
    let mut arguments = Vec::new();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::command_identifier => name = identifier_name(&item),
            Rule::bracket_group => default_arguments.push(build_group(item, source)?),
            Rule::brace_group => arguments.push(build_group(item, source)?),
            rule => return Err(unexpected_rule(rule, source, get_span(&item))),
        }
    }

    Ok(Command {
        name,
        default_arguments,
        arguments,
        span,
    })
}

fn build_command_macro(pair: Pair<Rule>, source: &SourceArc) -> Result<CommandMacro, LightexError> {
    let span = get_span(&pair);
    let mut name = String::new();
    let mut arity = None;
    let mut default_arguments = Vec::new();
    let mut body = Argument::default();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::command_identifier => name = identifier_name(&item),
            Rule::arity => arity = Some(build_arity(item, source)?),
            Rule::bracket_group => default_arguments.push(build_group(item, source)?),
            Rule::argument => body = build_argument(item, source)?,
            rule => return Err(unexpected_rule(rule, source, get_span(&item))),
        }
    }

    Ok(CommandMacro {
        name,
        arity,
        default_arguments,
        body,
        span,
    })
}

fn build_environment_macro(
    pair: Pair<Rule>,
    source: &SourceArc,
) -> Result<EnvironmentMacro, LightexError> {
    let span = get_span(&pair);
    let mut name = String::new();
    let mut arity = None;
    let mut default_arguments = Vec::new();
    let mut pre_program = Program::default();
    let mut post_program = Program::default();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::environment_name => name = item.as_str().to_string(),
            Rule::arity => arity = Some(build_arity(item, source)?),
            Rule::bracket_group => default_arguments.push(build_group(item, source)?),
            Rule::pre_program => pre_program = build_wrapped_program(item, source)?,
            Rule::post_program => post_program = build_wrapped_program(item, source)?,
            rule => return Err(unexpected_rule(rule, source, get_span(&item))),
        }
    }

    Ok(EnvironmentMacro {
        name,
        arity,
        default_arguments,
        pre_program,
        post_program,
        span,
    })
}

fn build_environment(pair: Pair<Rule>, source: &SourceArc) -> Result<Environment, LightexError> {
    let span = get_span(&pair);
    let mut name = String::new();
    let mut end_name = String::new();
    let mut default_arguments = Vec::new();
    let mut arguments = Vec::new();
    let mut program = Program::default();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::environment_name => name = item.as_str().to_string(),
            Rule::environment_end_name => end_name = item.as_str().to_string(),
            Rule::bracket_group => default_arguments.push(build_group(item, source)?),
            Rule::brace_group => arguments.push(build_group(item, source)?),
            Rule::body => program = build_program(item, source)?,
            rule => return Err(unexpected_rule(rule, source, get_span(&item))),
        }
    }

    Ok(Environment {
        name,
        default_arguments,
        arguments,
        program,
        end_name,
        span,
    })
}

/// Unwraps `pre_program` / `post_program` into the body they enclose.
fn build_wrapped_program(pair: Pair<Rule>, source: &SourceArc) -> Result<Program, LightexError> {
    let span = get_span(&pair);
    match pair.into_inner().next() {
        Some(body) => build_program(body, source),
        None => Ok(Program {
            nodes: vec![],
            span,
        }),
    }
}

fn build_arity(pair: Pair<Rule>, source: &SourceArc) -> Result<usize, LightexError> {
    let span = get_span(&pair);
    let digits = pair
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();
    parse_count(digits, source, span)
}

// ============================================================================
// LEXEMES
// ============================================================================

static NAMED_ENTITIES: Lazy<HashMap<&'static str, char>> = Lazy::new(|| {
    HashMap::from([
        ("amp", '&'),
        ("lt", '<'),
        ("gt", '>'),
        ("quot", '"'),
        ("apos", '\''),
        ("nbsp", '\u{a0}'),
        ("ensp", '\u{2002}'),
        ("emsp", '\u{2003}'),
        ("thinsp", '\u{2009}'),
        ("shy", '\u{ad}'),
        ("ndash", '\u{2013}'),
        ("mdash", '\u{2014}'),
        ("lsquo", '\u{2018}'),
        ("rsquo", '\u{2019}'),
        ("ldquo", '\u{201c}'),
        ("rdquo", '\u{201d}'),
        ("laquo", '\u{ab}'),
        ("raquo", '\u{bb}'),
        ("hellip", '\u{2026}'),
        ("bull", '\u{2022}'),
        ("middot", '\u{b7}'),
        ("sect", '\u{a7}'),
        ("para", '\u{b6}'),
        ("copy", '\u{a9}'),
        ("reg", '\u{ae}'),
        ("trade", '\u{2122}'),
        ("deg", '\u{b0}'),
        ("plusmn", '\u{b1}'),
        ("times", '\u{d7}'),
        ("divide", '\u{f7}'),
        ("euro", '\u{20ac}'),
        ("pound", '\u{a3}'),
        ("yen", '\u{a5}'),
        ("cent", '\u{a2}'),
        ("larr", '\u{2190}'),
        ("uarr", '\u{2191}'),
        ("rarr", '\u{2192}'),
        ("darr", '\u{2193}'),
        ("harr", '\u{2194}'),
    ])
});

/// Decodes `&name;`, `&#NNN;` or `&#xHHH;`.
fn decode_entity(pair: &Pair<Rule>, source: &SourceArc) -> Result<char, LightexError> {
    let span = get_span(pair);
    let text = pair.as_str();
    let inner = &text[1..text.len() - 1];

    let decoded = if let Some(number) = inner.strip_prefix('#') {
        let hex = number
            .strip_prefix('x')
            .or_else(|| number.strip_prefix('X'));
        let code = match hex {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
    } else {
        NAMED_ENTITIES.get(inner).copied()
    };

    decoded.ok_or_else(|| {
        err_ctx!(
            Parse,
            format!("unknown character entity '{}'", text),
            source,
            span,
            "escape a literal ampersand as \\&"
        )
    })
}

/// `\foo` -> `foo`
fn identifier_name(pair: &Pair<Rule>) -> String {
    pair.as_str().trim_start_matches('\\').to_string()
}

fn parse_count(digits: &str, source: &SourceArc, span: Span) -> Result<usize, LightexError> {
    digits.parse::<usize>().map_err(|_| {
        err_ctx!(
            Parse,
            format!("invalid number '{}'", digits),
            source,
            span
        )
    })
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

/// Returns at most [`FAILED_SNIPPET_LENGTH`] characters of `input` from `offset`, with a
/// trailing `...` when the input goes on.
pub fn failed_snippet(input: &str, offset: usize) -> String {
    let rest = input.get(offset..).unwrap_or_default();
    let mut chars = rest.chars();
    let mut snippet: String = chars.by_ref().take(FAILED_SNIPPET_LENGTH).collect();
    if chars.next().is_some() {
        snippet.push_str("...");
    }
    snippet
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn unexpected_rule(rule: Rule, source: &SourceArc, span: Span) -> LightexError {
    err_ctx!(
        Parse,
        format!("unexpected grammar rule {:?}", rule),
        source,
        span
    )
}

fn convert_parse_error(error: Error<Rule>, input: &str, source: &SourceArc) -> LightexError {
    let offset = match error.location {
        pest::error::InputLocation::Pos(pos) => pos,
        pest::error::InputLocation::Span((start, _)) => start,
    };
    let span = Span::new(offset, offset);

    let snippet = failed_snippet(input, offset);
    let message = if snippet.is_empty() {
        format!("failed at offset {} (end of input)", offset)
    } else {
        format!(
            "failed at offset {} on the following snippet: {}",
            offset, snippet
        )
    };

    let help = match input.get(offset..).and_then(|rest| rest.chars().next()) {
        Some('&') => "a literal ampersand must be escaped as \\&",
        Some('\\') => "a backslash must start a command or escape a special symbol",
        Some('{') | Some('}') | Some('[') | Some(']') => "check that every group is closed",
        _ => "special symbols \\ { } $ & # ^ _ % ~ [ ] must be escaped with a backslash",
    };

    err_ctx!(Parse, message, source, span, help)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::to_error_source;

    fn parse_str(input: &str) -> Result<Program, LightexError> {
        parse(input, &to_error_source("test", input))
    }

    fn single_paragraph(input: &str) -> Vec<InlineNode> {
        let program = parse_str(input).unwrap();
        assert_eq!(program.nodes.len(), 1, "expected one node in {:?}", program);
        match &program.nodes[0] {
            ProgramNode::Paragraph(paragraph) => paragraph.nodes.clone(),
            other => panic!("Expected a paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_str("").unwrap().nodes.is_empty());
    }

    #[test]
    fn test_plain_text_keeps_inner_spaces() {
        let nodes = single_paragraph("hello  world");
        assert!(matches!(&nodes[..], [InlineNode::PlainText(t)] if t.text == "hello  world"));
    }

    #[test]
    fn test_escaped_symbols_and_entities_are_decoded() {
        let nodes = single_paragraph("\\& \\\\ &amp; &#955; &#x3bb;");
        assert!(matches!(&nodes[..], [InlineNode::PlainText(t)] if t.text == "& \\ & \u{3bb} \u{3bb}"));
    }

    #[test]
    fn test_single_newline_is_not_a_node() {
        let nodes = single_paragraph("a\nb");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_paragraph_breaker_between_paragraphs() {
        let program = parse_str("hello\n \t\n\nworld").unwrap();
        assert!(matches!(
            &program.nodes[..],
            [
                ProgramNode::Paragraph(_),
                ProgramNode::ParagraphBreaker(_),
                ProgramNode::Paragraph(_)
            ]
        ));
    }

    #[test]
    fn test_command_with_groups() {
        let nodes = single_paragraph("\\foo[a][b]{c} {d}");
        match &nodes[..] {
            [InlineNode::Command(command)] => {
                assert_eq!(command.name, "foo");
                assert_eq!(command.default_arguments.len(), 2);
                assert_eq!(command.arguments.len(), 2);
            }
            other => panic!("Expected a single command, got {:?}", other),
        }
    }

    #[test]
    fn test_command_does_not_swallow_following_text() {
        let nodes = single_paragraph("\\foo bar");
        assert!(matches!(
            &nodes[..],
            [InlineNode::Command(c), InlineNode::PlainText(t)] if c.arguments.is_empty() && t.text == " bar"
        ));
    }

    #[test]
    fn test_argument_group_after_line_break() {
        let nodes = single_paragraph("\\foo\n{b}");
        assert!(matches!(
            &nodes[..],
            [InlineNode::Command(c)] if c.arguments.len() == 1
        ));
        let nodes = single_paragraph("\\foo\nbar");
        assert!(matches!(
            &nodes[..],
            [InlineNode::Command(c), InlineNode::PlainText(t)] if c.arguments.is_empty() && t.text == "bar"
        ));
    }

    #[test]
    fn test_command_macro_definition() {
        let program = parse_str("\\newcommand{\\greet}[2][World]{Hello #1 and #2}").unwrap();
        match &program.nodes[..] {
            [ProgramNode::CommandMacro(m)] => {
                assert_eq!(m.name, "greet");
                assert_eq!(m.arity, Some(2));
                assert_eq!(m.default_arguments.len(), 1);
                assert!(matches!(
                    &m.body.nodes[..],
                    [
                        InlineNode::PlainText(_),
                        InlineNode::ArgumentRef(ArgumentRef { id: 1, .. }),
                        InlineNode::PlainText(_),
                        InlineNode::ArgumentRef(ArgumentRef { id: 2, .. })
                    ]
                ));
            }
            other => panic!("Expected a command macro, got {:?}", other),
        }
    }

    #[test]
    fn test_environment_macro_definition() {
        let program =
            parse_str("\\newenvironment{box}[1]{\\unescaped{<div>}##1}{\\unescaped{</div>}}")
                .unwrap();
        match &program.nodes[..] {
            [ProgramNode::EnvironmentMacro(m)] => {
                assert_eq!(m.name, "box");
                assert_eq!(m.arity, Some(1));
                assert!(matches!(
                    &m.pre_program.nodes[..],
                    [ProgramNode::Paragraph(_), ProgramNode::OuterArgumentRef(ArgumentRef { id: 1, .. })]
                ));
                assert_eq!(m.post_program.nodes.len(), 1);
            }
            other => panic!("Expected an environment macro, got {:?}", other),
        }
    }

    #[test]
    fn test_environment_names_may_differ() {
        let program = parse_str("\\begin{foo}text\\end{bar}").unwrap();
        match &program.nodes[..] {
            [ProgramNode::Environment(env)] => {
                assert_eq!(env.name, "foo");
                assert_eq!(env.end_name, "bar");
                assert_eq!(env.program.nodes.len(), 1);
            }
            other => panic!("Expected an environment, got {:?}", other),
        }
    }

    #[test]
    fn test_verbatim_is_not_reparsed() {
        let program = parse_str("\\begin{verbatim}\\foo{ & $ }\\end{verbatim}").unwrap();
        assert!(matches!(
            &program.nodes[..],
            [ProgramNode::VerbatimEnvironment(v)] if v.content == "\\foo{ & $ }"
        ));
    }

    #[test]
    fn test_math() {
        let program = parse_str("$$x^2$$ and $y_1$").unwrap();
        assert!(matches!(&program.nodes[0], ProgramNode::MathText(m) if m.text == "x^2"));
        match &program.nodes[1] {
            ProgramNode::Paragraph(p) => assert!(matches!(
                &p.nodes[..],
                [InlineNode::PlainText(_), InlineNode::InlinedMathText(m)] if m.text == "y_1"
            )),
            other => panic!("Expected a paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_words_are_not_commands() {
        assert!(parse_str("\\end").is_err());
        assert!(parse_str("\\beginning").is_ok());
    }

    #[test]
    fn test_failures() {
        assert!(parse_str("&").is_err());
        assert!(parse_str("\\").is_err());
        assert!(parse_str("&bogus;").is_err());
        assert!(parse_str("a\n\nb}").is_err());
        assert!(parse_str("\\foo{a\n\nb}").is_err());
    }

    #[test]
    fn test_error_reports_offset_and_snippet() {
        let err = parse_str("hello & world").unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Parse);
        assert!(err.message().contains("& world"), "{}", err.message());
        assert_eq!(err.span().map(|s| s.start), Some(6));
    }

    #[test]
    fn test_failed_snippet_is_bounded() {
        let long = "x".repeat(100);
        let snippet = failed_snippet(&long, 10);
        assert_eq!(snippet, format!("{}...", "x".repeat(FAILED_SNIPPET_LENGTH)));
        assert_eq!(failed_snippet("abc", 1), "bc");
        assert_eq!(failed_snippet("abc", 3), "");
    }
}
