//! Syntax module for the LighTeX markup language
//!
//! This module provides the syntax tree produced by [`parser::parse`]. Every node owns its
//! children and carries the byte span it was parsed from.

use serde::Serialize;

pub mod parser;

pub use parser::parse;

/// Represents a span in the (preprocessed) source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A whole document, or the body of an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Program {
    pub nodes: Vec<ProgramNode>,
    pub span: Span,
}

/// Top-level node of a [`Program`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgramNode {
    ParagraphBreaker(Span),
    Paragraph(Paragraph),
    MathText(MathText),
    VerbatimEnvironment(VerbatimEnvironment),
    Environment(Box<Environment>),
    CommandMacro(Box<CommandMacro>),
    EnvironmentMacro(Box<EnvironmentMacro>),
    ArgumentRef(ArgumentRef),
    OuterArgumentRef(ArgumentRef),
}

/// Node allowed inside paragraphs and arguments.
///
/// Argument references only appear inside [`Argument`]s; the grammar keeps them out of
/// paragraphs, where they are parsed as program nodes instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InlineNode {
    PlainText(PlainText),
    InlinedMathText(MathText),
    Command(Command),
    UnescapedCommand(UnescapedCommand),
    ArgumentRef(ArgumentRef),
    OuterArgumentRef(ArgumentRef),
}

/// Literal text with escapes and entities already decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlainText {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    pub nodes: Vec<InlineNode>,
    pub span: Span,
}

/// A bracket or brace group, a macro default, or a command macro body.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Argument {
    pub nodes: Vec<InlineNode>,
    pub span: Span,
}

/// `#k` (or `##k` when wrapped in [`ProgramNode::OuterArgumentRef`]). The id is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArgumentRef {
    pub id: usize,
    pub span: Span,
}

/// Raw formula source of `$...$` or `$$...$$`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MathText {
    pub text: String,
    pub span: Span,
}

/// `\newcommand{\name}[arity][default]...{body}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandMacro {
    pub name: String,
    pub arity: Option<usize>,
    pub default_arguments: Vec<Argument>,
    pub body: Argument,
    pub span: Span,
}

/// `\newenvironment{name}[arity][default]...{pre}{post}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentMacro {
    pub name: String,
    pub arity: Option<usize>,
    pub default_arguments: Vec<Argument>,
    pub pre_program: Program,
    pub post_program: Program,
    pub span: Span,
}

/// `\name[opt]...{arg}...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub name: String,
    pub default_arguments: Vec<Argument>,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

/// `\unescaped{body}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnescapedCommand {
    pub body: Argument,
    pub span: Span,
}

/// `\begin{name}[opt]...{arg}... program \end{end_name}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub name: String,
    pub default_arguments: Vec<Argument>,
    pub arguments: Vec<Argument>,
    pub program: Program,
    pub end_name: String,
    pub span: Span,
}

/// `\begin{verbatim}...\end{verbatim}`, captured as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerbatimEnvironment {
    pub content: String,
    pub span: Span,
}

impl ProgramNode {
    /// Returns the span of this node.
    pub fn span(&self) -> Span {
        use ProgramNode::*;
        match self {
            ParagraphBreaker(span) => *span,
            Paragraph(paragraph) => paragraph.span,
            MathText(math) => math.span,
            VerbatimEnvironment(verbatim) => verbatim.span,
            Environment(environment) => environment.span,
            CommandMacro(command_macro) => command_macro.span,
            EnvironmentMacro(environment_macro) => environment_macro.span,
            ArgumentRef(argument_ref) | OuterArgumentRef(argument_ref) => argument_ref.span,
        }
    }
}

impl InlineNode {
    /// Returns the span of this node.
    pub fn span(&self) -> Span {
        use InlineNode::*;
        match self {
            PlainText(text) => text.span,
            InlinedMathText(math) => math.span,
            Command(command) => command.span,
            UnescapedCommand(unescaped) => unescaped.span,
            ArgumentRef(argument_ref) | OuterArgumentRef(argument_ref) => argument_ref.span,
        }
    }
}
