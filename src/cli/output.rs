//! Handles all user-facing output for the CLI.
//!
//! Rendered documents go to stdout or to a file; status lines and diagnostics go to
//! stderr so that piping the output stays clean.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::{ErrorContext, LightexError};

/// Writes `text` to `path`, or to stdout when no path is given.
pub fn emit(text: &str, path: Option<&Path>) -> Result<(), LightexError> {
    match path {
        Some(path) => {
            fs::write(path, text).map_err(|e| LightexError::Io {
                message: format!("failed to write '{}': {}", path.display(), e),
                ctx: ErrorContext::none(),
                source: Some(Box::new(e)),
            })?;
            print_status("Wrote", &path.display().to_string());
            Ok(())
        }
        None => write_stdout(&mut std::io::stdout().lock(), text),
    }
}

/// Writes `text` to an already opened stdout handle.
fn write_stdout<W: Write>(writer: &mut W, text: &str) -> Result<(), LightexError> {
    match writer.write_all(text.as_bytes()).and_then(|()| writer.flush()) {
        // The reader went away; nobody is left to see the rest.
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(LightexError::Io {
            message: format!("failed to write to stdout: {}", e),
            ctx: ErrorContext::none(),
            source: Some(Box::new(e)),
        }),
        Ok(()) => Ok(()),
    }
}

/// Serializes a syntax tree as pretty-printed JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, LightexError> {
    serde_json::to_string_pretty(value).map_err(|e| LightexError::Eval {
        message: format!("cannot serialize syntax tree: {}", e),
        ctx: ErrorContext::none(),
        source: Some(Box::new(e)),
    })
}

/// Prints a right-aligned, bold green label followed by a message on stderr.
pub fn print_status(label: &str, message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = write!(stderr, "{:>12}", label);
    let _ = stderr.reset();
    let _ = writeln!(stderr, " {}", message);
}
