//
//  mod.rs
//  RouteLinter
//

//! Route and call-site extraction from parsed JS/TS units.
//!
//! Both extractors share the same plumbing: a [`bindings::BindingTable`]
//! built once per unit, and a [`lower::Lowerer`] that turns path arguments
//! into [`PathExpr`](crate::normalize::PathExpr) for the normalizer.

pub mod bindings;
pub mod calls;
pub mod lower;
pub mod routes;

pub use calls::{CallSiteExtractor, UnitCalls};
pub use routes::{RouteExtractor, UnitRoutes};

use tree_sitter::Node;

use crate::parser::helpers::{callee_path, is_function, node_text, property_key};

/// Name of the function, method or object property enclosing `node`.
///
/// Arrow functions and function expressions take the name they are bound
/// to; functions stored in an object literal are named `table.key`.
pub fn scope_name(node: Node, source: &[u8]) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if is_function(n.kind()) {
            if let Some(name) = function_name(n, source) {
                return Some(name);
            }
        }
        current = n.parent();
    }
    None
}

fn function_name(function: Node, source: &[u8]) -> Option<String> {
    if let Some(name) = function.child_by_field_name("name") {
        let name = node_text(&name, source).to_string();
        return Some(match enclosing_binding_name(function, source) {
            Some(owner) if function.kind() == "method_definition" => format!("{owner}.{name}"),
            _ => name,
        });
    }

    let parent = function.parent()?;
    match parent.kind() {
        "variable_declarator" => parent
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string()),
        "assignment_expression" => parent
            .child_by_field_name("left")
            .and_then(|l| callee_path(&l, source)),
        "pair" => {
            let key = property_key(&parent, source)?;
            Some(match enclosing_binding_name(parent, source) {
                Some(table) => format!("{table}.{key}"),
                None => key,
            })
        }
        _ => None,
    }
}

/// Variable or class that owns an object property or method.
fn enclosing_binding_name(node: Node, source: &[u8]) -> Option<String> {
    let container = node.parent()?;
    let owner = container.parent()?;
    match owner.kind() {
        "variable_declarator" | "class_declaration" | "class" => owner
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string()),
        _ => None,
    }
}

/// Dotted name of the factory a value was produced by:
/// `express.Router()` → `express.Router`, `new Hono()` → `Hono`.
pub(crate) fn factory_name(value: Node, source: &[u8]) -> Option<String> {
    match value.kind() {
        "call_expression" => value
            .child_by_field_name("function")
            .and_then(|f| callee_path(&f, source)),
        "new_expression" => value
            .child_by_field_name("constructor")
            .and_then(|c| callee_path(&c, source)),
        _ => None,
    }
}

/// Name of a call receiver for classification: the identifier itself, or the
/// last property of a member chain (`this.http` → `http`).
pub(crate) fn receiver_name(receiver: Node, source: &[u8]) -> Option<String> {
    match receiver.kind() {
        "identifier" | "this" => Some(node_text(&receiver, source).to_string()),
        "member_expression" => receiver
            .child_by_field_name("property")
            .map(|p| node_text(&p, source).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn scope_of_first_fetch(src: &str) -> Option<String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(src, None).unwrap();
        let bytes = src.as_bytes();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "call_expression"
                && node
                    .child_by_field_name("function")
                    .is_some_and(|f| node_text(&f, bytes) == "fetch")
            {
                return scope_name(node, bytes);
            }
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
        panic!("no fetch call in test source");
    }

    #[test]
    fn test_scope_names() {
        assert_eq!(
            scope_of_first_fetch("function loadUsers() { fetch('/a'); }").as_deref(),
            Some("loadUsers")
        );
        assert_eq!(
            scope_of_first_fetch("const createUser = async (d) => { await fetch('/a'); };")
                .as_deref(),
            Some("createUser")
        );
        assert_eq!(
            scope_of_first_fetch("const authAPI = { login: (c) => fetch('/auth/login') };")
                .as_deref(),
            Some("authAPI.login")
        );
        assert_eq!(
            scope_of_first_fetch("class Api { list() { return fetch('/a'); } }").as_deref(),
            Some("Api.list")
        );
        assert_eq!(scope_of_first_fetch("fetch('/top');"), None);
    }
}
