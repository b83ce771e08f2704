//
//  helpers.rs
//  RouteLinter
//

use std::path::Path;

use tree_sitter::Node;

use crate::model::SourceLocation;

/// Get the full text of a node.
pub fn node_text<'s>(node: &Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-based location of a node.
pub fn location(node: &Node, file: &Path) -> SourceLocation {
    let pos = node.start_position();
    SourceLocation::new(file.to_path_buf(), pos.row + 1, pos.column + 1)
}

/// All named children of a node, in source order.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i))
        .collect()
}

/// Strip wrappers that don't change an expression's value:
/// parentheses, `await`, TS `as`/`!`/`satisfies`.
pub fn unwrap_expression<'t>(node: Node<'t>) -> Node<'t> {
    let mut current = node;
    loop {
        match current.kind() {
            "parenthesized_expression"
            | "await_expression"
            | "as_expression"
            | "non_null_expression"
            | "satisfies_expression"
            | "type_assertion" => match named_children(&current).into_iter().find(|c| {
                !matches!(c.kind(), "type_annotation" | "type_arguments")
                    && !c.kind().ends_with("_type")
                    && c.kind() != "type_identifier"
            }) {
                Some(inner) => current = inner,
                None => return current,
            },
            _ => return current,
        }
    }
}

pub fn is_function(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "function"
            | "arrow_function"
            | "method_definition"
            | "generator_function_declaration"
            | "generator_function"
    )
}

/// Value of a `'…'` / `"…"` string node, escapes resolved.
pub fn string_value(node: &Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let text = node_text(node, source);
    if text.len() < 2 {
        return None;
    }
    Some(unescape(&text[1..text.len() - 1]))
}

/// Resolve JS string escapes. Unknown escapes drop the backslash.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Key of an object `pair` (or method) as plain text.
pub fn property_key(node: &Node, source: &[u8]) -> Option<String> {
    let key = node
        .child_by_field_name("key")
        .or_else(|| node.child_by_field_name("name"))?;
    match key.kind() {
        "string" => string_value(&key, source),
        _ => Some(node_text(&key, source).to_string()),
    }
}

/// Find a property in an object literal. Shorthand properties return the
/// identifier itself, so callers can resolve it like any other value.
pub fn object_property<'t>(object: &Node<'t>, name: &str, source: &[u8]) -> Option<Node<'t>> {
    for child in named_children(object) {
        match child.kind() {
            "pair" => {
                if property_key(&child, source).as_deref() == Some(name) {
                    return child.child_by_field_name("value");
                }
            }
            "shorthand_property_identifier" => {
                if node_text(&child, source) == name {
                    return Some(child);
                }
            }
            _ => {}
        }
    }
    None
}

/// Dotted name of a callee: `fetch`, `axios.create`, `express.Router`.
/// `new X()` is reported as `X`. Anything else (calls, subscripts) is `None`.
pub fn callee_path(node: &Node, source: &[u8]) -> Option<String> {
    let node = unwrap_expression(*node);
    match node.kind() {
        "identifier" | "property_identifier" | "this" => Some(node_text(&node, source).to_string()),
        "member_expression" => {
            let object = node.child_by_field_name("object")?;
            let property = node.child_by_field_name("property")?;
            let prefix = callee_path(&object, source)?;
            Some(format!("{prefix}.{}", node_text(&property, source)))
        }
        _ => None,
    }
}

/// Best-effort identifier for an arbitrary expression, used to name path
/// parameters: `user.id` → `id`, `getId()` → `getId`, `ids[0]` → `ids`.
pub fn expression_name(node: &Node, source: &[u8]) -> Option<String> {
    let node = unwrap_expression(*node);
    match node.kind() {
        "identifier" | "property_identifier" | "shorthand_property_identifier" => {
            Some(node_text(&node, source).to_string())
        }
        "member_expression" => node
            .child_by_field_name("property")
            .map(|p| node_text(&p, source).to_string()),
        "subscript_expression" => node
            .child_by_field_name("object")
            .and_then(|o| expression_name(&o, source)),
        "call_expression" => node
            .child_by_field_name("function")
            .and_then(|f| expression_name(&f, source)),
        _ => None,
    }
}
