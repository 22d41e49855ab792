//! Template AST: literals, `{{path}}` placeholders and nestable
//! `{{#if path}}...{{/if}}` blocks.
//!
//! Templates are parsed once and rendered in a single pass over the node
//! tree. Placeholders that do not resolve render as [`MISSING_VALUE`]; a
//! block whose path does not resolve to a non-empty value is dropped along
//! with its body.

use crate::error::CoreError;

use super::context::ContextValue;

/// Rendered in place of a placeholder with no value.
pub const MISSING_VALUE: &str = "[Data not available]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Var(String),
    If { path: String, body: Vec<Node> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Var(&'a str),
    OpenIf(&'a str),
    CloseIf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, CoreError> {
        let tokens = tokenize(source)?;
        let mut stack: Vec<(String, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();

        for token in tokens {
            match token {
                Token::Text(text) => current.push(Node::Text(text.to_string())),
                Token::Var(path) => current.push(Node::Var(path.to_string())),
                Token::OpenIf(path) => {
                    stack.push((path.to_string(), std::mem::take(&mut current)));
                }
                Token::CloseIf => {
                    let Some((path, parent)) = stack.pop() else {
                        return Err(CoreError::Validation(
                            "Template has {{/if}} without a matching {{#if}}".into(),
                        ));
                    };
                    let body = std::mem::replace(&mut current, parent);
                    current.push(Node::If { path, body });
                }
            }
        }

        if let Some((path, _)) = stack.last() {
            return Err(CoreError::Validation(format!(
                "Template block {{{{#if {path}}}}} is never closed"
            )));
        }
        Ok(Self { nodes: current })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against `root`, which must be a map for any path to resolve.
    pub fn render(&self, root: &ContextValue) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, root, &mut out);
        out
    }
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, CoreError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            tokens.push(Token::Text(&rest[..open]));
        }
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return Err(CoreError::Validation(
                "Template has an unterminated '{{' tag".into(),
            ));
        };
        let tag = after[..close].trim();
        tokens.push(classify_tag(tag)?);
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn classify_tag(tag: &str) -> Result<Token<'_>, CoreError> {
    if tag == "/if" {
        return Ok(Token::CloseIf);
    }
    if let Some(path) = tag.strip_prefix("#if") {
        let path = path.trim();
        if path.is_empty() || !path.chars().all(is_path_char) {
            return Err(CoreError::Validation(format!(
                "Invalid {{{{#if}}}} condition '{path}'"
            )));
        }
        return Ok(Token::OpenIf(path));
    }
    if tag.is_empty() || !tag.chars().all(is_path_char) {
        return Err(CoreError::Validation(format!(
            "Invalid template placeholder '{tag}'"
        )));
    }
    Ok(Token::Var(tag))
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn render_nodes(nodes: &[Node], root: &ContextValue, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => match root.lookup(path).and_then(ContextValue::render) {
                Some(value) => push_inert(out, &value),
                None => out.push_str(MISSING_VALUE),
            },
            Node::If { path, body } => {
                if root.lookup(path).is_some_and(ContextValue::is_present) {
                    render_nodes(body, root, out);
                }
            }
        }
    }
}

/// Append a substituted value so it can never form a `{{` or `}}` token,
/// even across the boundary with what was already rendered.
fn push_inert(out: &mut String, value: &str) {
    for c in value.chars() {
        if matches!(c, '{' | '}') && out.ends_with(c) {
            out.push(' ');
        }
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn root(pairs: &[(&str, &str)]) -> ContextValue {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            map.insert((*k).to_string(), ContextValue::Text((*v).to_string()));
        }
        ContextValue::Map(map)
    }

    #[test]
    fn parses_nested_blocks() {
        let t = Template::parse("a{{#if x}}b{{#if y}}{{y}}{{/if}}{{/if}}c").unwrap();
        assert_eq!(
            t.nodes(),
            &[
                Node::Text("a".into()),
                Node::If {
                    path: "x".into(),
                    body: vec![
                        Node::Text("b".into()),
                        Node::If {
                            path: "y".into(),
                            body: vec![Node::Var("y".into())],
                        },
                    ],
                },
                Node::Text("c".into()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        assert!(Template::parse("{{#if x}}never closed").is_err());
        assert!(Template::parse("stray {{/if}}").is_err());
        assert!(Template::parse("open {{ tag").is_err());
        assert!(Template::parse("{{}}").is_err());
        assert!(Template::parse("{{bad path!}}").is_err());
    }

    #[test]
    fn renders_placeholders_and_blocks() {
        let t = Template::parse("Hi {{name}}.{{#if mood}} Feeling {{mood}}.{{/if}}").unwrap();
        assert_eq!(t.render(&root(&[("name", "Ada")])), "Hi Ada.");
        assert_eq!(
            t.render(&root(&[("name", "Ada"), ("mood", "calm")])),
            "Hi Ada. Feeling calm."
        );
    }

    #[test]
    fn substituted_values_cannot_form_tags() {
        let t = Template::parse("You are {{name}}{{#if x}}, {{x}}{{/if}}.").unwrap();
        let out = t.render(&root(&[("name", "{{character.secret}}"), ("x", "}}}")]));
        assert_eq!(out, "You are { {character.secret} }, } } }.");
        assert!(!out.contains("{{") && !out.contains("}}"));

        let t = Template::parse("{{a}}{{b}}").unwrap();
        assert_eq!(t.render(&root(&[("a", "x{"), ("b", "{y")])), "x{ {y");
    }

    #[test]
    fn missing_placeholder_uses_sentinel() {
        let t = Template::parse("{{who.name}}").unwrap();
        assert_eq!(t.render(&root(&[])), MISSING_VALUE);
    }

    #[test]
    fn empty_value_does_not_open_block() {
        let t = Template::parse("{{#if x}}shown{{/if}}").unwrap();
        assert_eq!(t.render(&root(&[("x", "  ")])), "");
    }
}
