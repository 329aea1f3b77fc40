// Regression tests for the `lightex` binary.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

/// A scratch file under the target directory, removed when dropped.
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn new(name: &str, content: &str) -> Self {
        let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        Self(path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn style_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("styles")
        .join("lightex.sty")
}

#[test]
fn cli_renders_a_full_document() {
    let input = ScratchFile::new("cli_document.tex", "Hello\n\nworld");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("html").arg(&input.0);
    cmd.assert()
        .success()
        .stdout(contains("<!DOCTYPE html>").and(contains("<p>Hello</p><p>world</p>")));
}

#[test]
fn cli_renders_fragments_with_styles() {
    let input = ScratchFile::new("cli_fragment.tex", "\\textbf{bold}");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("html")
        .arg(&input.0)
        .arg("--style")
        .arg(style_path())
        .arg("--fragment");
    cmd.assert()
        .success()
        .stdout(contains("<p><b>bold</b></p>").and(contains("DOCTYPE").not()));
}

#[test]
fn cli_writes_output_file() {
    let input = ScratchFile::new("cli_output.tex", "text");
    let output = ScratchFile::new("cli_output.html", "");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("html")
        .arg(&input.0)
        .arg("--fragment")
        .arg("-o")
        .arg(&output.0);
    cmd.assert().success();
    assert_eq!(fs::read_to_string(&output.0).unwrap(), "<p>text</p>");
}

#[test]
fn cli_reports_miette_diagnostics_on_error() {
    let input = ScratchFile::new("cli_bad.tex", "fish & chips");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("html").arg(&input.0);
    cmd.assert()
        .failure()
        .stderr(contains("lightex::parse").and(contains("help")));
}

#[test]
fn cli_reports_undefined_commands() {
    let input = ScratchFile::new("cli_undefined.tex", "\\nowhere");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("html").arg(&input.0);
    cmd.assert()
        .failure()
        .stderr(contains("lightex::eval").and(contains("not defined yet")));
}

#[test]
fn cli_reports_missing_input() {
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("html").arg("definitely/not/here.tex");
    cmd.assert().failure().stderr(contains("lightex::io"));
}

#[test]
fn cli_prints_dot_graph() {
    let input = ScratchFile::new("cli_graph.tex", "\\foo{bar}");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("dot").arg(&input.0);
    cmd.assert()
        .success()
        .stdout(contains("digraph d {").and(contains("COMMAND = <name=foo>")));
}

#[test]
fn cli_prints_ast_json() {
    let input = ScratchFile::new("cli_ast.tex", "\\newcommand{\\x}{y}");
    let mut cmd = Command::cargo_bin("lightex").unwrap();
    cmd.arg("ast").arg(&input.0);
    cmd.assert()
        .success()
        .stdout(contains("\"CommandMacro\"").and(contains("\"name\": \"x\"")));
}
