//! The LighTeX Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::fs;
use std::path::Path;
use std::process;

use clap::Parser;
use log::info;

use crate::cli::args::{Command, LightexArgs};
use crate::cli::output::{emit, print_status, to_json};
use crate::diagnostics::{print_error, to_error_source};
use crate::logging::{init_logging, LoggingConfig};
use crate::preprocess::preprocess_for_html;
use crate::render::html::wrap_document;
use crate::syntax::parse;
use crate::workspace::{make_dot_workspace, HtmlWorkspace, Workspace};
use crate::LightexError;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = LightexArgs::parse();
    init_logging(LoggingConfig::from_verbosity(args.verbose));

    if let Err(e) = dispatch(args.command) {
        print_error(e);
        process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<(), LightexError> {
    match command {
        Command::Html {
            input,
            output,
            styles,
            fragment,
        } => {
            let workspace = HtmlWorkspace::new();
            for style in &styles {
                workspace.load_style(style)?;
                info!("loaded style {}", style.display());
            }
            let body =
                workspace.render_source(&input.display().to_string(), &read_file(&input)?)?;
            let html = if fragment { body } else { wrap_document(&body) };
            emit(&html, output.as_deref())
        }

        Command::Dot { input, output } => {
            let graph = make_dot_workspace().parse_program(&read_file(&input)?)?;
            emit(&graph, output.as_deref())
        }

        Command::Ast { input } => {
            let text = preprocess_for_html(&read_file(&input)?);
            let source = to_error_source(input.display().to_string(), text.as_str());
            let program = parse(&text, &source)?;
            let mut json = to_json(&program)?;
            json.push('\n');
            emit(&json, None)?;
            print_status("Parsed", &format!("{} top-level node(s)", program.nodes.len()));
            Ok(())
        }
    }
}

fn read_file(path: &Path) -> Result<String, LightexError> {
    fs::read_to_string(path).map_err(|e| LightexError::io(path, e))
}
