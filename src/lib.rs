//! LighTeX: a macro-extensible, LaTeX-like markup language that compiles to HTML.
//!
//! The pipeline runs [`preprocess`] over the raw text, parses it with [`syntax::parse`],
//! then walks the tree with one of the [`render`] backends. [`workspace`] ties the stages
//! together and keeps macro definitions alive between calls.

pub use crate::diagnostics::{ErrorContext, ErrorType, LightexError};
pub use crate::syntax::Span;
pub use crate::workspace::{
    make_dot_workspace, make_html_workspace, parse_program_to_html,
    preload_style_into_workspace, Workspace,
};

pub mod cli;
pub mod diagnostics;
pub mod logging;
pub mod preprocess;
pub mod render;
pub mod syntax;
pub mod workspace;
