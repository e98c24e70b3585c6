//! Python source parsing on top of tree-sitter.
//!
//! Only the shapes the annotator cares about are lifted out of the syntax
//! tree: function signatures (where the return annotation lives or would be
//! inserted), the direct `return` statements of each body, and top-level
//! alias assignments. Everything else stays as raw source bytes so a rewrite
//! never disturbs it.

use std::ops::Range;

use anyhow::{bail, Context, Result};
use tree_sitter::{Node, Parser, Tree};

pub struct PythonSource {
    source: String,
    tree: Tree,
}

/// One `def` found in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSite {
    pub name: String,
    pub is_async: bool,
    /// Byte range of the existing `-> X` annotation expression.
    pub annotation: Option<Range<usize>>,
    /// Byte offset right after the parameter list, where ` -> X` goes when
    /// there is no annotation yet.
    pub insert_at: usize,
    /// Direct `return` statements of the body, in source order.
    pub returns: Vec<ReturnShape>,
    /// The first or second body statement is a `raise`.
    pub leading_raise: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    /// `return <expr>.execute_command(<first>, ...)`
    ExecuteCommand(CommandArg),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Literal(String),
    /// `args` or `*args`
    Args,
    Other(String),
}

/// A top-level `Name = <type expression>` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasAssignment {
    pub name: String,
    pub value: String,
}

impl PythonSource {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .context("failed to load the Python grammar")?;
        let tree = parser
            .parse(&source, None)
            .context("tree-sitter returned no tree")?;
        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map(|n| n.start_position().row + 1);
            match line {
                Some(line) => bail!("source is not valid Python (syntax error near line {line})"),
                None => bail!("source is not valid Python"),
            }
        }
        Ok(Self { source, tree })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every function definition in document order, methods and nested
    /// functions included.
    pub fn functions(&self) -> Vec<FunctionSite> {
        let mut out = Vec::new();
        self.collect_functions(self.tree.root_node(), &mut out);
        out
    }

    /// Source text of the function's current return annotation.
    pub fn annotation_text(&self, site: &FunctionSite) -> Option<&str> {
        site.annotation
            .as_ref()
            .map(|range| &self.source[range.clone()])
    }

    pub fn aliases(&self) -> Vec<AliasAssignment> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let mut out = Vec::new();
        for stmt in root.named_children(&mut cursor) {
            if stmt.kind() != "expression_statement" {
                continue;
            }
            let Some(assignment) = stmt.named_child(0).filter(|n| n.kind() == "assignment") else {
                continue;
            };
            let (Some(left), Some(right)) = (
                assignment.child_by_field_name("left"),
                assignment.child_by_field_name("right"),
            ) else {
                continue;
            };
            if left.kind() != "identifier" {
                continue;
            }
            if !matches!(
                right.kind(),
                "identifier" | "attribute" | "subscript" | "none" | "string"
            ) {
                continue;
            }
            out.push(AliasAssignment {
                name: self.text(left).to_string(),
                value: self.text(right).to_string(),
            });
        }
        out
    }

    fn collect_functions(&self, node: Node<'_>, out: &mut Vec<FunctionSite>) {
        if node.kind() == "function_definition" {
            if let Some(site) = self.function_site(node) {
                out.push(site);
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_functions(child, out);
        }
    }

    fn function_site(&self, node: Node<'_>) -> Option<FunctionSite> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let parameters = node.child_by_field_name("parameters")?;
        let body = node.child_by_field_name("body")?;
        let is_async = node.child(0).is_some_and(|c| c.kind() == "async");

        let statements = statements(body);
        let returns = statements
            .iter()
            .filter(|s| s.kind() == "return_statement")
            .map(|s| self.return_shape(*s))
            .collect();
        let leading_raise = statements
            .iter()
            .take(2)
            .any(|s| s.kind() == "raise_statement");

        Some(FunctionSite {
            name,
            is_async,
            annotation: node.child_by_field_name("return_type").map(|n| n.byte_range()),
            insert_at: parameters.end_byte(),
            returns,
            leading_raise,
        })
    }

    fn return_shape(&self, stmt: Node<'_>) -> ReturnShape {
        let Some(call) = first_named(stmt)
            .map(unparenthesize)
            .filter(|n| n.kind() == "call")
        else {
            return ReturnShape::Other;
        };
        let is_execute_command = call
            .child_by_field_name("function")
            .filter(|f| f.kind() == "attribute")
            .and_then(|f| f.child_by_field_name("attribute"))
            .is_some_and(|attr| self.text(attr) == "execute_command");
        if !is_execute_command {
            return ReturnShape::Other;
        }
        let first = call
            .child_by_field_name("arguments")
            .and_then(first_named);
        ReturnShape::ExecuteCommand(match first {
            Some(arg) => self.command_arg(arg),
            None => CommandArg::Other(String::new()),
        })
    }

    fn command_arg(&self, arg: Node<'_>) -> CommandArg {
        let text = self.text(arg);
        match arg.kind() {
            "string" => match string_literal_value(text) {
                Some(value) => CommandArg::Literal(value),
                None => CommandArg::Other(text.to_string()),
            },
            "identifier" if text == "args" => CommandArg::Args,
            "list_splat" => match first_named(arg) {
                Some(inner) if self.text(inner) == "args" => CommandArg::Args,
                _ => CommandArg::Other(text.to_string()),
            },
            _ => CommandArg::Other(text.to_string()),
        }
    }

    fn text(&self, node: Node<'_>) -> &str {
        &self.source[node.byte_range()]
    }
}

fn statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = block.walk();
    let statements = block
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    statements
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    found
}

/// `(expr)` -> `expr`, through any number of parentheses.
fn unparenthesize(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        match first_named(node) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().filter(|c| c.has_error()).find_map(first_error)
}

/// Value of a plain `str` literal, without escape processing. Bytes and
/// f-strings are not plain strings.
pub fn string_literal_value(text: &str) -> Option<String> {
    let quote_at = text.find(|c: char| c == '"' || c == '\'')?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if !prefix.chars().all(|c| matches!(c, 'r' | 'u')) {
        return None;
    }
    let body = &text[quote_at..];
    ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find(|q| body.len() >= 2 * q.len() && body.starts_with(*q) && body.ends_with(*q))
        .map(|q| body[q.len()..body.len() - q.len()].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literals() {
        assert_eq!(string_literal_value("\"GET\""), Some("GET".to_string()));
        assert_eq!(string_literal_value("'CLIENT LIST'"), Some("CLIENT LIST".to_string()));
        assert_eq!(string_literal_value("r'PING'"), Some("PING".to_string()));
        assert_eq!(string_literal_value("\"\"\"ECHO\"\"\""), Some("ECHO".to_string()));
        assert_eq!(string_literal_value("f\"{cmd}\""), None);
        assert_eq!(string_literal_value("b\"GET\""), None);
        assert_eq!(string_literal_value("rb'GET'"), None);
    }

    fn returns_of(source: &str) -> Vec<ReturnShape> {
        let parsed = PythonSource::parse(source).unwrap();
        parsed.functions().remove(0).returns
    }

    #[test]
    fn parenthesized_return_is_a_command() {
        let shapes = returns_of(
            "def get(self, name):\n    return ((self.execute_command(\"GET\", name)))\n",
        );
        assert_eq!(
            shapes,
            vec![ReturnShape::ExecuteCommand(CommandArg::Literal("GET".into()))]
        );
    }

    #[test]
    fn bytes_command_name_is_not_literal() {
        let shapes = returns_of("def get(self, name):\n    return self.execute_command(b\"GET\", name)\n");
        assert_eq!(
            shapes,
            vec![ReturnShape::ExecuteCommand(CommandArg::Other("b\"GET\"".into()))]
        );
    }
}
