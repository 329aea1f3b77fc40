//! Unified, `miette`-based diagnostics for LighTeX.
//!
//! Every failure of the pipeline (syntax analysis, evaluation, file access) is a
//! [`LightexError`]. Construct errors through the macros rather than by hand:
//!
//! - `err_msg!(Eval, "command {} is not defined yet", name)` for message-only errors.
//! - `err_ctx!(Eval, message, &source, span)` when a source and span are at hand.
//! - `err_ctx!(Eval, message, &source, span, help)` to attach a help line.
//!
//! A failed call never returns partial output: callers treat any error as "no usable
//! result".

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification, mirroring the [`LightexError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// The grammar could not consume the whole input.
    Parse,
    /// Undefined macros, arity mismatches, bad argument references and friends.
    Eval,
    /// Style or input files that could not be read.
    Io,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Parse => "Parse",
            ErrorType::Eval => "Eval",
            ErrorType::Io => "Io",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source the span points into (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }
}

/// Unified error type for all LighTeX failure modes.
#[derive(Debug, Error)]
pub enum LightexError {
    #[error("Syntax error: {message}")]
    Parse {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Evaluation error: {message}")]
    Eval {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl LightexError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            LightexError::Parse { ctx, .. }
            | LightexError::Eval { ctx, .. }
            | LightexError::Io { ctx, .. } => ctx,
        }
    }

    /// The human-readable message, without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            LightexError::Parse { message, .. }
            | LightexError::Eval { message, .. }
            | LightexError::Io { message, .. } => message,
        }
    }

    /// The primary span of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        self.get_ctx().span
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            LightexError::Parse { .. } => ErrorType::Parse,
            LightexError::Eval { .. } => ErrorType::Eval,
            LightexError::Io { .. } => ErrorType::Io,
        }
    }

    /// Wraps an I/O failure on `path`.
    pub fn io(path: &std::path::Path, error: std::io::Error) -> Self {
        LightexError::Io {
            message: format!("failed to read '{}': {}", path.display(), error),
            ctx: ErrorContext::none(),
            source: Some(Box::new(error)),
        }
    }
}

impl Diagnostic for LightexError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            LightexError::Parse { .. } => "lightex::parse",
            LightexError::Eval { .. } => "lightex::eval",
            LightexError::Io { .. } => "lightex::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        // A label without source code cannot be rendered.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.message().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a named source string into an `Arc<NamedSource<String>>` for error contexts.
pub fn to_error_source(name: impl AsRef<str>, source: impl Into<String>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), source.into()))
}

/// Constructs a [`LightexError`] variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($arg:tt)+) => {
        $crate::LightexError::$variant {
            message: format!($($arg)+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a [`LightexError`] variant with a message, a source, a span and an
/// optional help line.
#[macro_export]
macro_rules! err_ctx {
    // Message, src, span, help
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::LightexError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
            },
            source: None,
        }
    };
    // Message, src, span
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::LightexError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
}

/// Prints an error as a full `miette` report on stderr.
pub fn print_error(error: LightexError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
