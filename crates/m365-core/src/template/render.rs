//! Mustache-style template rendering.
//!
//! Supported syntax:
//! - `{{ name }}` / `{{ customer.name }}` substitutes a variable, HTML-escaped.
//! - `{% if name %} ... {% endif %}` keeps its body when the variable is
//!   truthy (present and not null, false, 0, "" or an empty collection).
//!
//! Undefined variables render as the empty string. Anything else between
//! braces is a syntax error, reported when a template is stored.

use crate::error::{AdminError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").unwrap())
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    If { name: String, body: Vec<Node> },
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

fn syntax(msg: impl Into<String>) -> AdminError {
    AdminError::InvalidTemplateSyntax(msg.into())
}

fn check_text(text: &str) -> Result<()> {
    for stray in ["{{", "}}", "{%", "%}"] {
        if text.contains(stray) {
            return Err(syntax(format!("unbalanced '{stray}'")));
        }
    }
    Ok(())
}

fn check_name(name: &str) -> Result<String> {
    if name_re().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(syntax(format!("invalid variable name '{name}'")))
    }
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        // Each frame is (open `if` variable, nodes collected so far).
        let mut stack: Vec<(Option<String>, Vec<Node>)> = vec![(None, Vec::new())];
        let mut last = 0;

        for caps in tag_re().captures_iter(source) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let text = &source[last..whole.start];
            check_text(text)?;
            last = whole.end;

            let frame = stack.len() - 1;
            if !text.is_empty() {
                stack[frame].1.push(Node::Text(text.to_string()));
            }

            if let Some(var) = caps.get(1) {
                let name = check_name(var.as_str().trim())?;
                stack[frame].1.push(Node::Var(name));
                continue;
            }

            let tag = caps.get(2).map_or("", |m| m.as_str()).trim();
            let mut words = tag.split_whitespace();
            match (words.next(), words.next(), words.next()) {
                (Some("if"), Some(name), None) => {
                    let name = check_name(name)?;
                    stack.push((Some(name), Vec::new()));
                }
                (Some("endif"), None, None) => {
                    if stack.len() == 1 {
                        return Err(syntax("'endif' without matching 'if'"));
                    }
                    if let Some((Some(name), body)) = stack.pop() {
                        let parent = stack.len() - 1;
                        stack[parent].1.push(Node::If { name, body });
                    }
                }
                _ => return Err(syntax(format!("unsupported tag '{{% {tag} %}}'"))),
            }
        }

        let tail = &source[last..];
        check_text(tail)?;
        if stack.len() > 1 {
            return Err(syntax("'if' without matching 'endif'"));
        }
        let (_, mut nodes) = stack.pop().unwrap_or((None, Vec::new()));
        if !tail.is_empty() {
            nodes.push(Node::Text(tail.to_string()));
        }
        Ok(Self { nodes })
    }

    pub fn render(&self, vars: &Map<String, Value>) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, vars, &mut out);
        out
    }

    /// Every variable name the template refers to, sorted.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_names(&self.nodes, &mut names);
        names
    }
}

fn render_nodes(nodes: &[Node], vars: &Map<String, Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => {
                if let Some(value) = lookup(vars, name) {
                    escape_into(&display(value), out);
                }
            }
            Node::If { name, body } => {
                if lookup(vars, name).is_some_and(truthy) {
                    render_nodes(body, vars, out);
                }
            }
        }
    }
}

fn collect_names(nodes: &[Node], names: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Var(name) => {
                names.insert(name.clone());
            }
            Node::If { name, body } => {
                names.insert(name.clone());
                collect_names(body, names);
            }
        }
    }
}

fn lookup<'a>(vars: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = vars.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_into(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Check `source` parses without rendering it.
pub fn validate_syntax(source: &str) -> Result<()> {
    Template::parse(source).map(|_| ())
}

/// Parse and render in one step.
pub fn render(source: &str, vars: &Map<String, Value>) -> Result<String> {
    Ok(Template::parse(source)?.render(vars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn substitutes_with_and_without_spaces() {
        let out = render(
            "Order {{order_number}} for {{ customer_name }}",
            &vars(json!({"order_number": 42, "customer_name": "Ana"})),
        )
        .unwrap();
        assert_eq!(out, "Order 42 for Ana");
    }

    #[test]
    fn values_are_html_escaped() {
        let out = render(
            "<p>{{ name }}</p>",
            &vars(json!({"name": "<script>alert('x')</script> & \"co\""})),
        )
        .unwrap();
        assert_eq!(
            out,
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;co&quot;</p>"
        );
    }

    #[test]
    fn undefined_variables_render_empty() {
        let out = render("Hi {{ missing }}!", &Map::new()).unwrap();
        assert_eq!(out, "Hi !");
    }

    #[test]
    fn dotted_names_walk_objects() {
        let out = render(
            "{{ customer.name }} / {{ customer.city.zip }}",
            &vars(json!({"customer": {"name": "Ana"}})),
        )
        .unwrap();
        assert_eq!(out, "Ana / ");
    }

    #[test]
    fn if_blocks_follow_truthiness() {
        let tpl = Template::parse(
            "A{% if action_required %}[{{ action_required }}]{% endif %}B",
        )
        .unwrap();
        assert_eq!(tpl.render(&vars(json!({"action_required": "sign"}))), "A[sign]B");
        assert_eq!(tpl.render(&vars(json!({"action_required": ""}))), "AB");
        assert_eq!(tpl.render(&Map::new()), "AB");
    }

    #[test]
    fn syntax_errors_are_reported() {
        for bad in [
            "Hello {{ name",
            "Hello name }}",
            "{{ 9lives }}",
            "{{ a b }}",
            "{% if x %}open",
            "{% endif %}",
            "{% for x in y %}{% endfor %}",
        ] {
            let err = validate_syntax(bad).unwrap_err();
            assert!(
                matches!(err, AdminError::InvalidTemplateSyntax(_)),
                "{bad} -> {err}"
            );
        }
    }

    #[test]
    fn collects_variable_names() {
        let tpl = Template::parse("{{ b }}{% if a %}{{ c.d }}{% endif %}{{ b }}").unwrap();
        let names: Vec<_> = tpl.variables().into_iter().collect();
        assert_eq!(names, vec!["a", "b", "c.d"]);
    }
}
