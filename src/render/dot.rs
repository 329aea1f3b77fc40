//! Graphviz export of the syntax tree.
//!
//! Prints one vertex per node and one edge per parent/child link. Default-argument edges
//! are dotted; the pre- and post-programs of an environment macro hang off red and blue
//! edges respectively.

use std::fmt::Write;

use crate::syntax::{
    Argument, Command, CommandMacro, Environment, EnvironmentMacro, InlineNode, Program,
    ProgramNode,
};

/// Renders `program` as a `digraph`.
pub fn render(program: &Program) -> String {
    let mut printer = DotPrinter::default();
    printer.output.push_str("digraph d {\n");
    printer.program(program);
    printer.output.push_str("}\n");
    printer.output
}

#[derive(Default)]
struct DotPrinter {
    output: String,
    next_id: usize,
}

impl DotPrinter {
    fn vertex(&mut self, label: &str) -> String {
        let id = format!("node_{}", self.next_id);
        self.next_id += 1;
        // Writing to a String cannot fail.
        let _ = writeln!(self.output, "  {} [label=\"{}\"];", id, escape_label(label));
        id
    }

    fn edge(&mut self, from: &str, to: &str, style: Option<&str>) {
        let _ = match style {
            Some(style) => writeln!(self.output, "  {} -> {} [{}];", from, to, style),
            None => writeln!(self.output, "  {} -> {};", from, to),
        };
    }

    fn program(&mut self, program: &Program) -> String {
        let id = self.vertex("PROGRAM");
        for node in &program.nodes {
            let child = self.program_node(node);
            self.edge(&id, &child, None);
        }
        id
    }

    fn program_node(&mut self, node: &ProgramNode) -> String {
        match node {
            ProgramNode::ParagraphBreaker(_) => self.vertex("PARAGRAPH_BREAKER"),
            ProgramNode::Paragraph(paragraph) => {
                let id = self.vertex("PARAGRAPH");
                self.children(&id, &paragraph.nodes);
                id
            }
            ProgramNode::MathText(math) => self.vertex(&format!("MATH_TEXT = <{}>", math.text)),
            ProgramNode::VerbatimEnvironment(verbatim) => {
                self.vertex(&format!("VERBATIM = <{}>", verbatim.content))
            }
            ProgramNode::Environment(environment) => self.environment(environment),
            ProgramNode::CommandMacro(command_macro) => self.command_macro(command_macro),
            ProgramNode::EnvironmentMacro(environment_macro) => {
                self.environment_macro(environment_macro)
            }
            ProgramNode::ArgumentRef(argument_ref) => {
                self.vertex(&format!("ARGUMENT_REF = <argument_id={}>", argument_ref.id))
            }
            ProgramNode::OuterArgumentRef(argument_ref) => self.vertex(&format!(
                "OUTER_ARGUMENT_REF = <argument_id={}>",
                argument_ref.id
            )),
        }
    }

    fn inline_node(&mut self, node: &InlineNode) -> String {
        match node {
            InlineNode::PlainText(text) => self.vertex(&format!("PLAIN_TEXT = <{}>", text.text)),
            InlineNode::InlinedMathText(math) => {
                self.vertex(&format!("INLINED_MATH_TEXT = <{}>", math.text))
            }
            InlineNode::Command(command) => self.command(command),
            InlineNode::UnescapedCommand(unescaped) => {
                let id = self.vertex("UNESCAPED_COMMAND");
                let body = self.argument(&unescaped.body);
                self.edge(&id, &body, None);
                id
            }
            InlineNode::ArgumentRef(argument_ref) => {
                self.vertex(&format!("ARGUMENT_REF = <argument_id={}>", argument_ref.id))
            }
            InlineNode::OuterArgumentRef(argument_ref) => self.vertex(&format!(
                "OUTER_ARGUMENT_REF = <argument_id={}>",
                argument_ref.id
            )),
        }
    }

    fn children(&mut self, parent: &str, nodes: &[InlineNode]) {
        for node in nodes {
            let child = self.inline_node(node);
            self.edge(parent, &child, None);
        }
    }

    fn argument(&mut self, argument: &Argument) -> String {
        let id = self.vertex("ARGUMENT");
        self.children(&id, &argument.nodes);
        id
    }

    fn arguments(&mut self, parent: &str, arguments: &[Argument], style: Option<&str>) {
        for argument in arguments {
            let child = self.argument(argument);
            self.edge(parent, &child, style);
        }
    }

    fn command(&mut self, command: &Command) -> String {
        let id = self.vertex(&format!("COMMAND = <name={}>", command.name));
        self.arguments(&id, &command.default_arguments, Some("style=dotted"));
        self.arguments(&id, &command.arguments, None);
        id
    }

    fn command_macro(&mut self, command_macro: &CommandMacro) -> String {
        let id = self.vertex(&format!(
            "COMMAND_MACRO = <name={} argument={}>",
            command_macro.name,
            command_macro.arity.unwrap_or(0)
        ));
        self.arguments(&id, &command_macro.default_arguments, Some("style=dotted"));
        let body = self.argument(&command_macro.body);
        self.edge(&id, &body, None);
        id
    }

    fn environment_macro(&mut self, environment_macro: &EnvironmentMacro) -> String {
        let id = self.vertex(&format!(
            "ENVIRONMENT_MACRO = <name={} argument={}>",
            environment_macro.name,
            environment_macro.arity.unwrap_or(0)
        ));
        self.arguments(&id, &environment_macro.default_arguments, Some("style=dotted"));
        let pre = self.program(&environment_macro.pre_program);
        self.edge(&id, &pre, Some("color=red"));
        let post = self.program(&environment_macro.post_program);
        self.edge(&id, &post, Some("color=blue"));
        id
    }

    fn environment(&mut self, environment: &Environment) -> String {
        let id = self.vertex(&format!(
            "ENVIRONMENT = <name={} end_name={}>",
            environment.name, environment.end_name
        ));
        self.arguments(&id, &environment.default_arguments, Some("style=dotted"));
        self.arguments(&id, &environment.arguments, None);
        let body = self.program(&environment.program);
        self.edge(&id, &body, None);
        id
    }
}

fn escape_label(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::to_error_source;
    use crate::syntax::parse;

    fn dot(input: &str) -> String {
        render(&parse(input, &to_error_source("test", input)).unwrap())
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(dot(""), "digraph d {\n  node_0 [label=\"PROGRAM\"];\n}\n");
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(
            dot("hi"),
            "digraph d {\n  node_0 [label=\"PROGRAM\"];\n  node_1 [label=\"PARAGRAPH\"];\n  \
             node_2 [label=\"PLAIN_TEXT = <hi>\"];\n  node_1 -> node_2;\n  node_0 -> node_1;\n}\n"
        );
    }

    #[test]
    fn test_default_arguments_are_dotted() {
        let graph = dot("\\foo[a]{b}");
        assert!(graph.contains("[label=\"COMMAND = <name=foo>\"]"));
        assert!(graph.contains("node_2 -> node_3 [style=dotted];"));
        assert!(graph.contains("node_2 -> node_5;"));
    }

    #[test]
    fn test_environment_macro_edges() {
        let graph = dot("\\newenvironment{box}[1]{#1}{x}");
        assert!(graph.contains("ENVIRONMENT_MACRO = <name=box argument=1>"));
        assert!(graph.contains("ARGUMENT_REF = <argument_id=1>"));
        assert!(graph.contains("[color=red];"));
        assert!(graph.contains("[color=blue];"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let graph = dot("\\\\ \"quoted\"");
        assert!(graph.contains("PLAIN_TEXT = <\\\\ \\\"quoted\\\">"));
    }

    #[test]
    fn test_environment_names() {
        let graph = dot("\\begin{foo}x\\end{bar}");
        assert!(graph.contains("ENVIRONMENT = <name=foo end_name=bar>"));
    }
}
