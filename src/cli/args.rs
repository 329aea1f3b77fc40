//! Defines the command-line arguments and subcommands for the LighTeX CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "lightex",
    version,
    about = "Compile LighTeX markup to HTML."
)]
pub struct LightexArgs {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a document to HTML.
    Html {
        /// The LighTeX document to render.
        #[arg(required = true)]
        input: PathBuf,
        /// Write the result here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Style file to load before the document; may be repeated.
        #[arg(short, long = "style")]
        styles: Vec<PathBuf>,
        /// Emit only the rendered body, without the surrounding HTML document.
        #[arg(long)]
        fragment: bool,
    },
    /// Print the syntax tree as a Graphviz graph.
    Dot {
        /// The LighTeX document to parse.
        #[arg(required = true)]
        input: PathBuf,
        /// Write the result here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the syntax tree as JSON.
    Ast {
        /// The LighTeX document to parse.
        #[arg(required = true)]
        input: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_arguments() {
        let args = LightexArgs::try_parse_from([
            "lightex", "-vv", "html", "doc.tex", "-s", "a.sty", "--style", "b.sty", "-o",
            "out.html",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Html {
                input,
                output,
                styles,
                fragment,
            } => {
                assert_eq!(input, PathBuf::from("doc.tex"));
                assert_eq!(output, Some(PathBuf::from("out.html")));
                assert_eq!(styles, vec![PathBuf::from("a.sty"), PathBuf::from("b.sty")]);
                assert!(!fragment);
            }
            other => panic!("Expected html, got {:?}", other),
        }
    }

    #[test]
    fn test_input_is_required() {
        assert!(LightexArgs::try_parse_from(["lightex", "dot"]).is_err());
    }
}
