//! Conditional templates over the render context
//!
//! A small mustache dialect: `{{path}}` (HTML-escaped), `{{{path}}}` and
//! `{{&path}}` (raw), `{{#path}}..{{/path}}` sections, `{{^path}}..{{/path}}`
//! inverted sections and `{{! comments}}`. Paths are dotted and resolve
//! against a context stack, innermost section first. A template is compiled
//! once per render target and rendered on every pass.

use serde_json::Value;

use crate::error::{CallControlError, CallControlResult};

/// Markup used by render targets that do not supply their own template
///
/// Context fields: `data` (the snapshot), `i18n` (resolved labels) and
/// `by_id.<action>.elementId` (the target's stable element ids).
pub const DEFAULT_TEMPLATE: &str = r#"
<div>
  {{^data.call}}
  {{#data.redial}}
  <button id="{{by_id.redial.elementId}}">
    {{i18n.redial}} ({{data.redial}})
  </button>
  {{/data.redial}}
  {{/data.call}}

  {{#data.call}}
  {{#data.call.progress}}
  {{^data.call.terminating}}
  <button id="{{by_id.cancel.elementId}}">
    {{i18n.cancel}}
  </button>
  {{/data.call.terminating}}
  {{/data.call.progress}}

  {{#data.call.established}}
  <button id="{{by_id.hangup.elementId}}">
    {{i18n.hangup}}
  </button>

  {{^data.call.hold}}
  <button id="{{by_id.hold.elementId}}">
    {{i18n.hold}}
  </button>
  {{/data.call.hold}}

  {{#data.call.hold}}
  <button id="{{by_id.unhold.elementId}}">
    {{i18n.unhold}}
  </button>
  {{/data.call.hold}}

  {{^data.call.muted}}
  <button id="{{by_id.mute.elementId}}">
    {{i18n.mute}}
  </button>
  {{/data.call.muted}}

  {{#data.call.muted}}
  <button id="{{by_id.unmute.elementId}}">
    {{i18n.unmute}}
  </button>
  {{/data.call.muted}}

  <button id="{{by_id.transfer.elementId}}">
    {{i18n.transfer}}
  </button>
  {{/data.call.established}}

  {{#data.call.terminating}}
  {{#data.call.progress}}
  <button id="{{by_id.answer.elementId}}">
    {{i18n.answer}}
  </button>
  {{/data.call.progress}}
  {{/data.call.terminating}}
  {{/data.call}}
</div>
"#;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Variable { path: String, escape: bool },
    Section { path: String, inverted: bool, children: Vec<Node> },
}

/// A compiled template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

struct OpenSection {
    path: String,
    inverted: bool,
    position: usize,
    siblings: Vec<Node>,
}

impl Template {
    /// Compile template source, rejecting unbalanced or malformed tags
    pub fn compile(source: &str) -> CallControlResult<Self> {
        let mut nodes = Vec::new();
        let mut open: Vec<OpenSection> = Vec::new();
        let mut cursor = 0;

        while let Some(offset) = source[cursor..].find("{{") {
            let start = cursor + offset;
            if start > cursor {
                nodes.push(Node::Text(source[cursor..start].to_string()));
            }

            let triple = source[start..].starts_with("{{{");
            let (inner_start, closer) = if triple { (start + 3, "}}}") } else { (start + 2, "}}") };
            let inner_len = source[inner_start..]
                .find(closer)
                .ok_or_else(|| CallControlError::template("unclosed tag", start))?;
            let inner = source[inner_start..inner_start + inner_len].trim();
            cursor = inner_start + inner_len + closer.len();

            if triple {
                nodes.push(Node::Variable { path: tag_path(inner, start)?, escape: false });
                continue;
            }

            match inner.chars().next() {
                Some('!') => {}
                Some('#') | Some('^') => {
                    let path = tag_path(&inner[1..], start)?;
                    open.push(OpenSection {
                        path,
                        inverted: inner.starts_with('^'),
                        position: start,
                        siblings: std::mem::take(&mut nodes),
                    });
                }
                Some('/') => {
                    let path = tag_path(&inner[1..], start)?;
                    let section = open.pop().ok_or_else(|| {
                        CallControlError::template(format!("closing tag '{}' without open section", path), start)
                    })?;
                    if section.path != path {
                        return Err(CallControlError::template(
                            format!("section '{}' closed by '{}'", section.path, path),
                            start,
                        ));
                    }
                    let children = std::mem::replace(&mut nodes, section.siblings);
                    nodes.push(Node::Section {
                        path: section.path,
                        inverted: section.inverted,
                        children,
                    });
                }
                Some('&') => {
                    nodes.push(Node::Variable { path: tag_path(&inner[1..], start)?, escape: false });
                }
                _ => {
                    nodes.push(Node::Variable { path: tag_path(inner, start)?, escape: true });
                }
            }
        }

        if let Some(section) = open.pop() {
            return Err(CallControlError::template(
                format!("section '{}' is never closed", section.path),
                section.position,
            ));
        }

        if cursor < source.len() {
            nodes.push(Node::Text(source[cursor..].to_string()));
        }

        Ok(Self { nodes })
    }

    /// Render against a context value
    pub fn render(&self, context: &Value) -> String {
        let mut out = String::new();
        let mut stack = vec![context];
        render_nodes(&self.nodes, &mut stack, &mut out);
        out
    }
}

fn tag_path(raw: &str, position: usize) -> CallControlResult<String> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(CallControlError::template("empty tag", position));
    }
    if path != "." && path.split('.').any(str::is_empty) {
        return Err(CallControlError::template(format!("malformed path '{}'", path), position));
    }
    Ok(path.to_string())
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable { path, escape } => {
                if let Some(value) = lookup(stack, path) {
                    let text = display(value);
                    if *escape {
                        escape_html(&text, out);
                    } else {
                        out.push_str(&text);
                    }
                }
            }
            Node::Section { path, inverted, children } => {
                let value = lookup(stack, path);
                let truthy = value.map(is_truthy).unwrap_or(false);

                if *inverted {
                    if !truthy {
                        render_nodes(children, stack, out);
                    }
                    continue;
                }

                let Some(value) = value.filter(|_| truthy) else {
                    continue;
                };
                match value {
                    Value::Array(items) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                    _ => {
                        stack.push(value);
                        render_nodes(children, stack, out);
                        stack.pop();
                    }
                }
            }
        }
    }
}

/// Resolve a dotted path; the first segment binds to the innermost frame
/// that has it, the remaining segments resolve within that value.
fn lookup<'a>(stack: &[&'a Value], path: &str) -> Option<&'a Value> {
    if path == "." {
        return stack.last().copied();
    }

    let mut segments = path.split('.');
    let head = segments.next()?;
    let mut value = stack.iter().rev().find_map(|frame| child(frame, head))?;
    for segment in segments {
        value = child(value, segment)?;
    }
    Some(value)
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(ch),
        }
    }
}
