//! HTML backend: macro evaluation and rendering.
//!
//! Every node renders to a [`Rendered`] pair. The `escaped` half is what ends up in the
//! document; the `unescaped` half lets `\unescaped{...}` surface literal markup from
//! inside nested macro expansions without escaping it a second time.
//!
//! Macro definitions live in a [`MacroTable`], an append-only pair of persistent vectors
//! that is cheap to clone. Workspaces render against a clone and only keep it when the
//! whole render succeeds.

use std::sync::Arc;

use im::Vector;
use log::{debug, trace};

use crate::diagnostics::SourceArc;
use crate::err_ctx;
use crate::syntax::{
    Argument, ArgumentRef, Command, CommandMacro, Environment, EnvironmentMacro, InlineNode,
    MathText, Paragraph, PlainText, Program, ProgramNode, Span, UnescapedCommand,
    VerbatimEnvironment,
};
use crate::LightexError;

/// Prefix of the element ids generated for math spans.
pub const MATH_ID_PREFIX: &str = "lightex-math-";

// ============================================================================
// MACRO TABLE
// ============================================================================

/// A macro definition together with the source it was defined in.
#[derive(Debug, Clone)]
pub struct Defined<T> {
    pub definition: Arc<T>,
    pub source: SourceArc,
}

/// Command and environment macros in definition order.
///
/// Lookups search the most recent definition first, so a later `\newcommand` of the same
/// name shadows the earlier one from that point on.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    commands: Vector<Defined<CommandMacro>>,
    environments: Vector<Defined<EnvironmentMacro>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&self, name: &str) -> Option<&Defined<CommandMacro>> {
        self.commands
            .iter()
            .rev()
            .find(|defined| defined.definition.name == name)
    }

    pub fn environment(&self, name: &str) -> Option<&Defined<EnvironmentMacro>> {
        self.environments
            .iter()
            .rev()
            .find(|defined| defined.definition.name == name)
    }

    pub fn define_command(&mut self, definition: CommandMacro, source: SourceArc) {
        self.commands.push_back(Defined {
            definition: Arc::new(definition),
            source,
        });
    }

    pub fn define_environment(&mut self, definition: EnvironmentMacro, source: SourceArc) {
        self.environments.push_back(Defined {
            definition: Arc::new(definition),
            source,
        });
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn environment_count(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.environments.is_empty()
    }

    /// Forgets every definition made after the table had the given sizes.
    fn truncate(&mut self, commands: usize, environments: usize) {
        self.commands.truncate(commands);
        self.environments.truncate(environments);
    }
}

// ============================================================================
// RENDER RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub escaped: String,
    pub unescaped: String,
}

impl Rendered {
    /// Markup that needs no escaping: both halves are identical.
    fn markup(html: String) -> Self {
        Self {
            escaped: html.clone(),
            unescaped: html,
        }
    }

    fn append(&mut self, other: Rendered) {
        self.escaped.push_str(&other.escaped);
        self.unescaped.push_str(&other.unescaped);
    }
}

/// What a macro declares about its parameters.
struct Signature<'a> {
    label: String,
    arity: Option<usize>,
    default_arguments: &'a [Argument],
    source: &'a SourceArc,
}

// ============================================================================
// RENDERER
// ============================================================================

/// Depth-first HTML renderer.
pub struct HtmlRenderer {
    macros: MacroTable,
    source: SourceArc,
    argument_frames: Vec<Vec<Rendered>>,
    environment_definition_depth: usize,
    math_spans: usize,
}

impl HtmlRenderer {
    /// Creates a renderer for a program parsed from `source`, starting from `macros`.
    pub fn new(macros: MacroTable, source: SourceArc) -> Self {
        Self {
            macros,
            source,
            argument_frames: Vec::new(),
            environment_definition_depth: 0,
            math_spans: 0,
        }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Consumes the renderer, returning the table with every definition made so far.
    pub fn into_macros(self) -> MacroTable {
        self.macros
    }

    pub fn render(&mut self, program: &Program) -> Result<Rendered, LightexError> {
        self.render_program(program)
    }

    fn render_program(&mut self, program: &Program) -> Result<Rendered, LightexError> {
        let mut rendered = Rendered::default();
        for node in &program.nodes {
            rendered.append(self.render_program_node(node)?);
        }
        Ok(rendered)
    }

    fn render_program_node(&mut self, node: &ProgramNode) -> Result<Rendered, LightexError> {
        match node {
            ProgramNode::ParagraphBreaker(_) => Ok(Rendered::default()),
            ProgramNode::Paragraph(paragraph) => self.render_paragraph(paragraph),
            ProgramNode::MathText(math) => self.render_math(math, true),
            ProgramNode::VerbatimEnvironment(verbatim) => Ok(render_verbatim(verbatim)),
            ProgramNode::Environment(environment) => self.render_environment(environment),
            ProgramNode::CommandMacro(command_macro) => self.define_command(command_macro),
            ProgramNode::EnvironmentMacro(environment_macro) => {
                self.define_environment(environment_macro)
            }
            ProgramNode::ArgumentRef(argument_ref) => self.resolve_argument(argument_ref, false),
            ProgramNode::OuterArgumentRef(argument_ref) => {
                self.resolve_argument(argument_ref, true)
            }
        }
    }

    fn render_inline_nodes(&mut self, nodes: &[InlineNode]) -> Result<Rendered, LightexError> {
        let mut rendered = Rendered::default();
        for node in nodes {
            rendered.append(self.render_inline_node(node)?);
        }
        Ok(rendered)
    }

    fn render_inline_node(&mut self, node: &InlineNode) -> Result<Rendered, LightexError> {
        match node {
            InlineNode::PlainText(text) => Ok(render_plain_text(text)),
            InlineNode::InlinedMathText(math) => self.render_math(math, false),
            InlineNode::Command(command) => self.render_command(command),
            InlineNode::UnescapedCommand(unescaped) => self.render_unescaped(unescaped),
            InlineNode::ArgumentRef(argument_ref) => self.resolve_argument(argument_ref, false),
            InlineNode::OuterArgumentRef(argument_ref) => {
                self.resolve_argument(argument_ref, true)
            }
        }
    }

    fn render_argument(&mut self, argument: &Argument) -> Result<Rendered, LightexError> {
        self.render_inline_nodes(&argument.nodes)
    }

    fn render_paragraph(&mut self, paragraph: &Paragraph) -> Result<Rendered, LightexError> {
        let content = self.render_inline_nodes(&paragraph.nodes)?;
        // Macro scaffolding merges with the caller's content instead of opening paragraphs.
        if self.environment_definition_depth > 0 {
            return Ok(content);
        }
        Ok(Rendered {
            escaped: format!("<p>{}</p>", content.escaped),
            unescaped: format!("<p>{}</p>", content.unescaped),
        })
    }

    fn render_unescaped(&mut self, unescaped: &UnescapedCommand) -> Result<Rendered, LightexError> {
        let body = self.render_argument(&unescaped.body)?;
        Ok(Rendered::markup(body.unescaped))
    }

    fn render_math(&mut self, math: &MathText, display: bool) -> Result<Rendered, LightexError> {
        let id = format!("{}{}", MATH_ID_PREFIX, self.math_spans);
        self.math_spans += 1;

        let formula = serde_json::to_string(&math.text).map_err(|e| {
            err_ctx!(
                Eval,
                format!("cannot encode formula: {}", e),
                &self.source,
                math.span
            )
        })?;
        // Keep "</script>" inside the formula from closing the script element.
        let formula = formula.replace("</", "<\\/");

        let tag = if display { "div" } else { "span" };
        Ok(Rendered::markup(format!(
            "<{tag} id=\"{id}\"></{tag}><script>katex.render({formula}, \
             document.getElementById(\"{id}\"), {{displayMode: {display}}});</script>"
        )))
    }

    fn resolve_argument(
        &self,
        argument_ref: &ArgumentRef,
        outer: bool,
    ) -> Result<Rendered, LightexError> {
        let (marker, frames_up) = if outer { ("##", 2) } else { ("#", 1) };
        let frame = self
            .argument_frames
            .len()
            .checked_sub(frames_up)
            .and_then(|index| self.argument_frames.get(index));
        let value = frame.and_then(|frame| {
            argument_ref
                .id
                .checked_sub(1)
                .and_then(|index| frame.get(index))
        });

        if let Some(value) = value {
            return Ok(value.clone());
        }

        let help = match frame {
            Some(frame) => format!("the enclosing macro binds {} argument(s)", frame.len()),
            None if outer => "##k is only valid inside a macro invoked from a macro body".into(),
            None => "#k is only valid inside a macro body".into(),
        };
        Err(err_ctx!(
            Eval,
            format!("invalid argument reference {}{}", marker, argument_ref.id),
            &self.source,
            argument_ref.span,
            help
        ))
    }

    // ------------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------------

    fn define_command(&mut self, command_macro: &CommandMacro) -> Result<Rendered, LightexError> {
        self.check_declared_defaults(
            &format!("command \\{}", command_macro.name),
            command_macro.arity,
            command_macro.default_arguments.len(),
            command_macro.span,
        )?;

        debug!(
            "defined command \\{} (arity {})",
            command_macro.name,
            command_macro.arity.unwrap_or(0)
        );
        self.macros
            .define_command(command_macro.clone(), self.source.clone());
        Ok(Rendered::default())
    }

    fn define_environment(
        &mut self,
        environment_macro: &EnvironmentMacro,
    ) -> Result<Rendered, LightexError> {
        if self.environment_definition_depth != 0 {
            return Err(err_ctx!(
                Eval,
                format!(
                    "environment {} cannot be defined inside another environment definition",
                    environment_macro.name
                ),
                &self.source,
                environment_macro.span,
                "move the \\newenvironment to the top level"
            ));
        }
        self.check_declared_defaults(
            &format!("environment {}", environment_macro.name),
            environment_macro.arity,
            environment_macro.default_arguments.len(),
            environment_macro.span,
        )?;

        debug!(
            "defined environment {} (arity {})",
            environment_macro.name,
            environment_macro.arity.unwrap_or(0)
        );
        self.macros
            .define_environment(environment_macro.clone(), self.source.clone());
        Ok(Rendered::default())
    }

    fn check_declared_defaults(
        &self,
        label: &str,
        arity: Option<usize>,
        defaults: usize,
        span: Span,
    ) -> Result<(), LightexError> {
        let arity = arity.unwrap_or(0);
        if defaults > arity {
            return Err(err_ctx!(
                Eval,
                format!(
                    "{} declares {} default argument(s) but only {} argument(s)",
                    label, defaults, arity
                ),
                &self.source,
                span
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Invocations
    // ------------------------------------------------------------------------

    fn render_command(&mut self, command: &Command) -> Result<Rendered, LightexError> {
        let defined = self.macros.command(&command.name).cloned().ok_or_else(|| {
            err_ctx!(
                Eval,
                format!("command \\{} is not defined yet", command.name),
                &self.source,
                command.span,
                "define it with \\newcommand before its first use"
            )
        })?;
        let definition = &defined.definition;

        let frame = self.bind_arguments(
            Signature {
                label: format!("command \\{}", command.name),
                arity: definition.arity,
                default_arguments: &definition.default_arguments,
                source: &defined.source,
            },
            &command.default_arguments,
            &command.arguments,
            command.span,
        )?;
        trace!("expanding \\{} with {} argument(s)", command.name, frame.len());

        self.argument_frames.push(frame);
        let result = self.with_source(defined.source.clone(), |renderer| {
            renderer.render_argument(&definition.body)
        });
        self.argument_frames.pop();
        result
    }

    fn render_environment(&mut self, environment: &Environment) -> Result<Rendered, LightexError> {
        if environment.name != environment.end_name {
            return Err(err_ctx!(
                Eval,
                format!(
                    "\\begin{{{}}} is closed by \\end{{{}}}",
                    environment.name, environment.end_name
                ),
                &self.source,
                environment.span,
                format!("close it with \\end{{{}}}", environment.name)
            ));
        }

        let defined = self
            .macros
            .environment(&environment.name)
            .cloned()
            .ok_or_else(|| {
                err_ctx!(
                    Eval,
                    format!("environment {} is not defined yet", environment.name),
                    &self.source,
                    environment.span,
                    "define it with \\newenvironment before its first use"
                )
            })?;

        let saved_commands = self.macros.command_count();
        let saved_environments = self.macros.environment_count();
        let saved_frames = self.argument_frames.len();
        let saved_depth = self.environment_definition_depth;

        let result = self.render_environment_parts(&defined, environment);

        self.argument_frames.truncate(saved_frames);
        self.environment_definition_depth = saved_depth;
        if result.is_err() {
            self.macros.truncate(saved_commands, saved_environments);
        }
        result
    }

    /// Renders pre-program, body and post-program with one shared argument frame.
    fn render_environment_parts(
        &mut self,
        defined: &Defined<EnvironmentMacro>,
        environment: &Environment,
    ) -> Result<Rendered, LightexError> {
        let definition = &defined.definition;
        let frame = self.bind_arguments(
            Signature {
                label: format!("environment {}", environment.name),
                arity: definition.arity,
                default_arguments: &definition.default_arguments,
                source: &defined.source,
            },
            &environment.default_arguments,
            &environment.arguments,
            environment.span,
        )?;
        trace!(
            "expanding environment {} with {} argument(s)",
            environment.name,
            frame.len()
        );
        self.argument_frames.push(frame);

        let mut rendered = Rendered::default();

        self.environment_definition_depth += 1;
        rendered.append(self.with_source(defined.source.clone(), |renderer| {
            renderer.render_program(&definition.pre_program)
        })?);
        self.environment_definition_depth -= 1;

        rendered.append(self.render_program(&environment.program)?);

        self.environment_definition_depth += 1;
        rendered.append(self.with_source(defined.source.clone(), |renderer| {
            renderer.render_program(&definition.post_program)
        })?);
        self.environment_definition_depth -= 1;

        Ok(rendered)
    }

    /// Validates an invocation against its macro and renders the bound arguments.
    ///
    /// Slot `i` takes the caller's bracket argument when one was given, then the macro's
    /// own default, then the caller's brace arguments in order.
    fn bind_arguments(
        &mut self,
        signature: Signature<'_>,
        default_arguments: &[Argument],
        arguments: &[Argument],
        span: Span,
    ) -> Result<Vec<Rendered>, LightexError> {
        let declared_defaults = signature.default_arguments.len();
        let declared_arity = signature.arity.unwrap_or(0);
        let override_defaults = default_arguments.len();

        if override_defaults > declared_defaults {
            return Err(err_ctx!(
                Eval,
                format!(
                    "{} accepts at most {} optional argument(s), got {}",
                    signature.label, declared_defaults, override_defaults
                ),
                &self.source,
                span
            ));
        }

        let total_bound = declared_defaults + arguments.len();
        if total_bound != declared_arity {
            return Err(err_ctx!(
                Eval,
                format!(
                    "{} expects {} argument(s) in braces, got {}",
                    signature.label,
                    declared_arity.saturating_sub(declared_defaults),
                    arguments.len()
                ),
                &self.source,
                span
            ));
        }

        let mut frame = Vec::with_capacity(total_bound);
        for i in 0..total_bound {
            let rendered = if i < override_defaults {
                self.render_argument(&default_arguments[i])?
            } else if i < declared_defaults {
                let default = &signature.default_arguments[i];
                self.with_source(signature.source.clone(), |renderer| {
                    renderer.render_argument(default)
                })?
            } else {
                self.render_argument(&arguments[i - declared_defaults])?
            };
            frame.push(rendered);
        }
        Ok(frame)
    }

    /// Runs `f` with diagnostics pointing into `source`.
    fn with_source<R>(&mut self, source: SourceArc, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.source, source);
        let result = f(self);
        self.source = previous;
        result
    }
}

// ============================================================================
// LEAF RENDERING
// ============================================================================

fn render_plain_text(text: &PlainText) -> Rendered {
    let collapsed = collapse_whitespace(&text.text);
    Rendered {
        escaped: escape_html(&collapsed),
        unescaped: collapsed,
    }
}

fn render_verbatim(verbatim: &VerbatimEnvironment) -> Rendered {
    Rendered::markup(format!("<pre>{}</pre>", verbatim.content))
}

/// Replaces every run of ASCII whitespace with a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_whitespace {
                result.push(' ');
            }
            in_whitespace = true;
        } else {
            result.push(c);
            in_whitespace = false;
        }
    }
    result
}

pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Wraps a rendered fragment in a complete HTML document that loads KaTeX.
pub fn wrap_document(body: &str) -> String {
    let mut document = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"><title>LighTeX</title>\n\
         <style>.tex-center p {text-align: center;}</style>\n\
         <link rel=\"stylesheet\" href=\"https://cdnjs.cloudflare.com/ajax/libs/KaTeX/0.7.1/katex.min.css\" \
         integrity=\"sha384-wITovz90syo1dJWVh32uuETPVEtGigN07tkttEqPv+uR2SE/mbQcG7ATL28aI9H0\" \
         crossorigin=\"anonymous\">\n\
         <script src=\"https://cdnjs.cloudflare.com/ajax/libs/KaTeX/0.7.1/katex.min.js\" \
         integrity=\"sha384-/y1Nn9+QQAipbNQWU65krzJralCnuOasHncUFXGkdwntGeSvQicrYkiUBwsgUqc1\" \
         crossorigin=\"anonymous\"></script>\n</head>\n<body>\n",
    );
    document.push_str(body);
    document.push_str("</body></html>");
    document
}
