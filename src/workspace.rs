//! Workspaces: long-lived compilation contexts.
//!
//! A workspace owns a macro table. Style files loaded with [`Workspace::load_style`] add
//! their definitions to it permanently; documents rendered with
//! [`Workspace::parse_program`] see those definitions but cannot change them.
//!
//! The [`WorkspaceRegistry`] hands out shared HTML workspaces by id, so a style file can be
//! preloaded once and reused by every later render under the same id.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use once_cell::sync::Lazy;

use crate::diagnostics::{to_error_source, SourceArc};
use crate::err_msg;
use crate::preprocess::{preprocess_for_html, remove_comments};
use crate::render::html::wrap_document;
use crate::render::{dot, HtmlRenderer, MacroTable};
use crate::syntax::parse;
use crate::LightexError;

/// Name used in diagnostics for text passed to [`Workspace::parse_program`].
pub const INPUT_SOURCE_NAME: &str = "<input>";

pub trait Workspace: Send + Sync {
    /// Evaluates the style file at `path`, keeping its macro definitions on success.
    fn load_style(&self, path: &Path) -> Result<(), LightexError> {
        let text = std::fs::read_to_string(path).map_err(|e| LightexError::io(path, e))?;
        self.load_style_source(&path.display().to_string(), &text)
    }

    /// Evaluates in-memory style text; `name` labels diagnostics.
    fn load_style_source(&self, name: &str, text: &str) -> Result<(), LightexError>;

    /// Renders `text` against the current definitions. Definitions made by `text` are
    /// dropped when the call returns.
    fn parse_program(&self, text: &str) -> Result<String, LightexError>;
}

// ============================================================================
// HTML
// ============================================================================

#[derive(Default)]
pub struct HtmlWorkspace {
    macros: Mutex<MacroTable>,
}

impl HtmlWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the committed definitions.
    pub fn macros(&self) -> MacroTable {
        self.lock().clone()
    }

    /// Like [`Workspace::parse_program`], with diagnostics labelled `name`.
    pub fn render_source(&self, name: &str, text: &str) -> Result<String, LightexError> {
        let snapshot = self.macros();
        let (html, _) = render_html(text, name, snapshot)?;
        Ok(html)
    }

    fn lock(&self) -> MutexGuard<'_, MacroTable> {
        // Commits are a single assignment, so a poisoned table is still consistent.
        self.macros.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn render_html(
    text: &str,
    source_name: &str,
    macros: MacroTable,
) -> Result<(String, MacroTable), LightexError> {
    let text = preprocess_for_html(text);
    let source: SourceArc = to_error_source(source_name, text.as_str());
    let program = parse(&text, &source)?;
    let mut renderer = HtmlRenderer::new(macros, source);
    let rendered = renderer.render(&program)?;
    Ok((rendered.escaped, renderer.into_macros()))
}

impl Workspace for HtmlWorkspace {
    fn load_style_source(&self, name: &str, text: &str) -> Result<(), LightexError> {
        let mut macros = self.lock();
        let (_, updated) = render_html(text, name, macros.clone())?;
        debug!(
            "committed style '{}': {} command(s), {} environment(s)",
            name,
            updated.command_count(),
            updated.environment_count()
        );
        *macros = updated;
        Ok(())
    }

    fn parse_program(&self, text: &str) -> Result<String, LightexError> {
        self.render_source(INPUT_SOURCE_NAME, text)
    }
}

// ============================================================================
// DOT
// ============================================================================

/// Prints the syntax tree instead of evaluating it.
#[derive(Default)]
pub struct DotWorkspace;

impl Workspace for DotWorkspace {
    fn load_style(&self, path: &Path) -> Result<(), LightexError> {
        Err(err_msg!(
            Eval,
            "cannot load style '{}': dot workspaces do not evaluate macros",
            path.display()
        ))
    }

    fn load_style_source(&self, name: &str, _text: &str) -> Result<(), LightexError> {
        Err(err_msg!(
            Eval,
            "cannot load style '{}': dot workspaces do not evaluate macros",
            name
        ))
    }

    fn parse_program(&self, text: &str) -> Result<String, LightexError> {
        let text = remove_comments(text);
        let source = to_error_source(INPUT_SOURCE_NAME, text.as_str());
        let program = parse(&text, &source)?;
        Ok(dot::render(&program))
    }
}

pub fn make_html_workspace() -> Arc<dyn Workspace> {
    Arc::new(HtmlWorkspace::new())
}

pub fn make_dot_workspace() -> Arc<dyn Workspace> {
    Arc::new(DotWorkspace)
}

// ============================================================================
// REGISTRY
// ============================================================================

/// HTML workspaces shared by id, created on first use.
#[derive(Default)]
pub struct WorkspaceRegistry {
    workspaces: Mutex<HashMap<String, Arc<HtmlWorkspace>>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, id: &str) -> Arc<HtmlWorkspace> {
        let mut workspaces = self
            .workspaces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        workspaces
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!("created workspace '{}'", id);
                Arc::new(HtmlWorkspace::new())
            })
            .clone()
    }

    pub fn preload_style(&self, id: &str, path: &Path) -> Result<(), LightexError> {
        self.get_or_create(id).load_style(path)
    }

    /// Renders `text` in workspace `id` and wraps it in a complete HTML document.
    pub fn parse_program_to_html(&self, text: &str, id: &str) -> Result<String, LightexError> {
        let body = self.get_or_create(id).parse_program(text)?;
        Ok(wrap_document(&body))
    }
}

static REGISTRY: Lazy<WorkspaceRegistry> = Lazy::new(WorkspaceRegistry::new);

/// Loads a style file into the process-wide workspace `id`.
pub fn preload_style_into_workspace(id: &str, path: &Path) -> Result<(), LightexError> {
    REGISTRY.preload_style(id, path)
}

/// Renders `text` as a full HTML document in the process-wide workspace `id`.
pub fn parse_program_to_html(text: &str, id: &str) -> Result<String, LightexError> {
    REGISTRY.parse_program_to_html(text, id)
}
