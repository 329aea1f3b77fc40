#![allow(dead_code)]

//! # LighTeX Fixture Loader
//!
//! Every `*.tex` file under `tests/fixtures` is a test case; the sibling `*.html` file holds
//! the expected HTML fragment.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A single fixture: an input document and the fragment it must render to.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub name: String,
    pub input: String,
    pub expected: String,
}

pub fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// The style file every fixture is rendered with.
pub fn default_style() -> PathBuf {
    crate_root().join("styles").join("lightex.sty")
}

/// Discovers all fixtures below `dir`, sorted by path.
pub fn load_fixtures(dir: &Path) -> Vec<Fixture> {
    let mut fixtures = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "tex") {
            continue;
        }
        let expected_path = path.with_extension("html");
        let input = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("cannot read fixture '{}': {e}", path.display()));
        let expected = std::fs::read_to_string(&expected_path).unwrap_or_else(|e| {
            panic!(
                "fixture '{}' has no expected output '{}': {e}",
                path.display(),
                expected_path.display()
            )
        });
        fixtures.push(Fixture {
            name: path.display().to_string(),
            input,
            expected,
        });
    }
    fixtures
}
