mod common;

use common::{crate_root, default_style, load_fixtures};
use lightex::workspace::HtmlWorkspace;
use lightex::Workspace;

#[test]
fn fixtures_render_to_expected_html() {
    let fixtures = load_fixtures(&crate_root().join("tests").join("fixtures"));
    assert!(!fixtures.is_empty(), "no fixtures found");

    let mut failures = Vec::new();
    for fixture in &fixtures {
        let workspace = HtmlWorkspace::new();
        workspace.load_style(&default_style()).unwrap();
        match workspace.render_source(&fixture.name, &fixture.input) {
            Ok(actual) if actual.trim_end() == fixture.expected.trim_end() => {}
            Ok(actual) => failures.push(format!(
                "{}\n  expected: {:?}\n  actual:   {:?}",
                fixture.name,
                fixture.expected.trim_end(),
                actual.trim_end()
            )),
            Err(e) => failures.push(format!("{}\n  error: {}", fixture.name, e)),
        }
    }

    assert!(failures.is_empty(), "fixture failures:\n{}", failures.join("\n"));
}
