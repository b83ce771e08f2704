//
//  lower.rs
//  RouteLinter
//

//! Lowering of JS/TS expression nodes into [`PathExpr`].

use tree_sitter::Node;

use super::bindings::{BindingTable, Resolution};
use crate::normalize::{PathExpr, TemplatePart};
use crate::parser::helpers::{
    callee_path, expression_name, named_children, node_text, object_property, string_value,
    unescape, unwrap_expression,
};

/// Identifier resolution stops after this many hops.
const MAX_RESOLVE_DEPTH: usize = 8;

/// Calls that pass their argument through unchanged for path purposes.
const TRANSPARENT_CALLS: &[&str] = &["encodeURIComponent", "encodeURI", "String"];

/// Expression lowering for one source unit.
pub struct Lowerer<'a, 't> {
    pub source: &'a [u8],
    pub bindings: &'a BindingTable<'t>,
}

impl<'a, 't> Lowerer<'a, 't> {
    pub fn new(source: &'a [u8], bindings: &'a BindingTable<'t>) -> Self {
        Self { source, bindings }
    }

    /// Lower a path expression.
    pub fn lower(&self, node: Node<'t>) -> PathExpr {
        self.lower_at(node, 0)
    }

    fn lower_at(&self, node: Node<'t>, depth: usize) -> PathExpr {
        let node = unwrap_expression(node);
        if depth > MAX_RESOLVE_DEPTH {
            return self.runtime(node);
        }

        match node.kind() {
            "string" => string_value(&node, self.source)
                .map(PathExpr::Literal)
                .unwrap_or_else(|| self.runtime(node)),
            "template_string" => self.lower_template(node, depth),
            "binary_expression" => {
                let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) else {
                    return self.runtime(node);
                };
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(&op, self.source))
                    .unwrap_or("");
                match operator {
                    // Operands of one `+` chain share the chain's depth.
                    "+" => {
                        let mut items = Vec::new();
                        for operand in self.concat_operands(node) {
                            match self.lower_at(operand, depth) {
                                PathExpr::Concat(inner) => items.extend(inner),
                                other => items.push(other),
                            }
                        }
                        PathExpr::Concat(items)
                    }
                    "||" | "??" => PathExpr::Conditional(vec![
                        self.lower_at(left, depth + 1),
                        self.lower_at(right, depth + 1),
                    ]),
                    _ => self.runtime(node),
                }
            }
            "ternary_expression" => {
                let branches: Vec<PathExpr> = ["consequence", "alternative"]
                    .iter()
                    .filter_map(|field| node.child_by_field_name(field))
                    .map(|branch| self.lower_at(branch, depth + 1))
                    .collect();
                PathExpr::Conditional(branches)
            }
            "identifier" | "shorthand_property_identifier" => self.lower_identifier(node, depth),
            "member_expression" => self
                .member_value(node)
                .map(|value| self.lower_at(value, depth + 1))
                .unwrap_or_else(|| self.runtime(node)),
            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .and_then(|f| callee_path(&f, self.source));
                let first_arg = node
                    .child_by_field_name("arguments")
                    .and_then(|args| named_children(&args).into_iter().next());
                match (callee.as_deref(), first_arg) {
                    (Some(name), Some(arg)) if TRANSPARENT_CALLS.contains(&name) => {
                        PathExpr::runtime(expression_name(&arg, self.source))
                    }
                    _ => self.runtime(node),
                }
            }
            _ => self.runtime(node),
        }
    }

    /// Operands of a `a + b + c` chain, left to right, without recursion.
    fn concat_operands(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut operands = Vec::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            let current = unwrap_expression(current);
            let is_plus = current.kind() == "binary_expression"
                && current
                    .child_by_field_name("operator")
                    .is_some_and(|op| node_text(&op, self.source) == "+");
            match (
                is_plus,
                current.child_by_field_name("left"),
                current.child_by_field_name("right"),
            ) {
                (true, Some(left), Some(right)) => {
                    pending.push(right);
                    pending.push(left);
                }
                _ => operands.push(current),
            }
        }
        operands
    }

    fn runtime(&self, node: Node<'t>) -> PathExpr {
        PathExpr::runtime(expression_name(&node, self.source))
    }

    /// Template text is sliced between substitutions so fragment node names
    /// don't matter.
    fn lower_template(&self, node: Node<'t>, depth: usize) -> PathExpr {
        let mut parts = Vec::new();
        let mut cursor = node.start_byte() + 1;
        let end = node.end_byte().saturating_sub(1);

        for child in named_children(&node) {
            if child.kind() != "template_substitution" {
                continue;
            }
            self.push_text(&mut parts, cursor, child.start_byte());
            if let Some(inner) = named_children(&child).into_iter().next() {
                parts.push(TemplatePart::Expr(self.lower_at(inner, depth + 1)));
            }
            cursor = child.end_byte();
        }
        self.push_text(&mut parts, cursor, end);

        match parts.as_slice() {
            [] => PathExpr::literal(""),
            [TemplatePart::Text(text)] => PathExpr::literal(text.clone()),
            _ => PathExpr::Template(parts),
        }
    }

    fn push_text(&self, parts: &mut Vec<TemplatePart>, from: usize, to: usize) {
        if from >= to {
            return;
        }
        if let Some(raw) = self.source.get(from..to).and_then(|b| std::str::from_utf8(b).ok()) {
            parts.push(TemplatePart::Text(unescape(raw)));
        }
    }

    fn lower_identifier(&self, node: Node<'t>, depth: usize) -> PathExpr {
        let name = node_text(&node, self.source);
        match self.bindings.resolve(name, node, self.source) {
            Resolution::Values(values) if !values.is_empty() => {
                let mut lowered: Vec<PathExpr> = values
                    .into_iter()
                    .map(|v| self.lower_at(v, depth + 1))
                    .collect();
                if lowered.len() == 1 {
                    match lowered.remove(0) {
                        // `const userId = 123` still names the param `userId`.
                        PathExpr::Runtime { name: None } => {
                            PathExpr::runtime(Some(name.to_string()))
                        }
                        other => other,
                    }
                } else {
                    PathExpr::Conditional(lowered)
                }
            }
            _ => PathExpr::runtime(Some(name.to_string())),
        }
    }

    /// `ENDPOINTS.users` where `ENDPOINTS` is a const object literal.
    fn member_value(&self, node: Node<'t>) -> Option<Node<'t>> {
        let object = node.child_by_field_name("object")?;
        let property = node.child_by_field_name("property")?;
        let table = self.resolve_object(object)?;
        object_property(&table, node_text(&property, self.source), self.source)
    }

    // ── Non-path resolution helpers used by the extractors ───────────────

    /// The single value an identifier is bound to, if unambiguous.
    pub fn single_value(&self, node: Node<'t>) -> Option<Node<'t>> {
        let node = unwrap_expression(node);
        if !matches!(node.kind(), "identifier" | "shorthand_property_identifier") {
            return Some(node);
        }
        match self
            .bindings
            .resolve(node_text(&node, self.source), node, self.source)
        {
            Resolution::Values(values) if values.len() == 1 => {
                Some(unwrap_expression(values[0]))
            }
            _ => None,
        }
    }

    /// Object literal behind a node: the literal itself, or a variable
    /// bound to exactly one object literal.
    pub fn resolve_object(&self, node: Node<'t>) -> Option<Node<'t>> {
        let mut current = node;
        for _ in 0..MAX_RESOLVE_DEPTH {
            let value = self.single_value(current)?;
            match value.kind() {
                "object" => return Some(value),
                "identifier" if value.id() != current.id() => current = value,
                _ => return None,
            }
        }
        None
    }

    /// Statically known string behind a node.
    pub fn static_string(&self, node: Node<'t>) -> Option<String> {
        match self.lower(node) {
            PathExpr::Literal(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn lower_first_fetch_arg(src: &str) -> PathExpr {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(src, None).unwrap();
        let bytes = src.as_bytes();
        let table = BindingTable::build(tree.root_node(), bytes);
        let lowerer = Lowerer::new(bytes, &table);
        let call = find_fetch(tree.root_node(), bytes).unwrap();
        let args = call.child_by_field_name("arguments").unwrap();
        lowerer.lower(named_children(&args)[0])
    }

    fn find_fetch<'t>(node: Node<'t>, src: &[u8]) -> Option<Node<'t>> {
        if node.kind() == "call_expression"
            && node
                .child_by_field_name("function")
                .is_some_and(|f| node_text(&f, src) == "fetch")
        {
            return Some(node);
        }
        for i in 0..node.child_count() {
            if let Some(found) = node.child(i).and_then(|c| find_fetch(c, src)) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn test_lower_string_and_template() {
        assert_eq!(
            lower_first_fetch_arg("fetch('/api/users');"),
            PathExpr::literal("/api/users")
        );
        assert_eq!(
            lower_first_fetch_arg("fetch(`/api/static`);"),
            PathExpr::literal("/api/static")
        );
        assert_eq!(
            lower_first_fetch_arg("fetch(`/api/users/${user.id}/posts`);"),
            PathExpr::Template(vec![
                TemplatePart::Text("/api/users/".into()),
                TemplatePart::Expr(PathExpr::runtime(Some("id".into()))),
                TemplatePart::Text("/posts".into()),
            ])
        );
    }

    #[test]
    fn test_lower_concat_and_const() {
        let expr = lower_first_fetch_arg("const BASE = '/api'; fetch(BASE + '/users/' + id);");
        assert_eq!(
            expr,
            PathExpr::Concat(vec![
                PathExpr::literal("/api"),
                PathExpr::literal("/users/"),
                PathExpr::runtime(Some("id".into())),
            ])
        );
    }

    #[test]
    fn test_lower_long_concat_chain_keeps_literals() {
        let parts: Vec<String> = (0..12).map(|i| format!("'/p{i}'")).collect();
        let src = format!("fetch({});", parts.join(" + "));
        let expected: Vec<PathExpr> = (0..12).map(|i| PathExpr::literal(format!("/p{i}"))).collect();
        assert_eq!(lower_first_fetch_arg(&src), PathExpr::Concat(expected));
    }

    #[test]
    fn test_lower_ternary_and_endpoint_table() {
        let expr = lower_first_fetch_arg("fetch(admin ? '/api/admin' : '/api/users');");
        assert_eq!(
            expr,
            PathExpr::Conditional(vec![
                PathExpr::literal("/api/admin"),
                PathExpr::literal("/api/users"),
            ])
        );

        let expr = lower_first_fetch_arg(
            "const ENDPOINTS = { users: '/api/users' };\nfetch(ENDPOINTS.users);",
        );
        assert_eq!(expr, PathExpr::literal("/api/users"));
    }

    #[test]
    fn test_lower_encode_uri_component_keeps_name() {
        let expr = lower_first_fetch_arg("fetch(`/api/items/${encodeURIComponent(itemId)}`);");
        assert_eq!(
            expr,
            PathExpr::Template(vec![
                TemplatePart::Text("/api/items/".into()),
                TemplatePart::Expr(PathExpr::runtime(Some("itemId".into()))),
            ])
        );
    }
}
