//! Tree-walking backends over the syntax tree.
//!
//! - [`html`] evaluates macros and renders an HTML fragment.
//! - [`dot`] prints the tree as a Graphviz graph for debugging the parser.

pub mod dot;
pub mod html;

pub use html::{HtmlRenderer, MacroTable, Rendered};
