//
//  bindings.rs
//  RouteLinter
//

//! Per-unit table of variable bindings.
//!
//! Built in one walk over the tree. Lookups answer "which values can this
//! identifier hold at this point?" without a control-flow graph. An
//! assignment in a block enclosing the use site replaces earlier candidates;
//! assignments in nested branches add candidates.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::parser::helpers::{is_function, named_children, node_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    /// `const x = v`, `let x;`
    Declaration,
    /// `x = v`
    Assignment,
    /// Destructured or compound-assigned: value unknowable.
    Runtime,
}

#[derive(Debug, Clone, Copy)]
struct Binding<'t> {
    kind: BindingKind,
    /// Function (or program) node the binding belongs to.
    scope: usize,
    /// Start byte of the binding site.
    position: usize,
    /// Parent of the binding statement.
    block: Node<'t>,
    value: Option<Node<'t>>,
}

/// What an identifier resolves to at a use site.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'t> {
    /// Candidate value expressions, in source order. Empty when the variable
    /// is declared but never assigned before the use.
    Values(Vec<Node<'t>>),
    /// A parameter, a destructured name, or a compound assignment.
    Runtime,
    /// No binding in any enclosing scope (globals, imports).
    Unbound,
}

/// Variable bindings of one source unit.
pub struct BindingTable<'t> {
    bindings: HashMap<String, Vec<Binding<'t>>>,
}

impl<'t> BindingTable<'t> {
    /// Collect every binding under `root`.
    pub fn build(root: Node<'t>, source: &[u8]) -> Self {
        let mut table = Self {
            bindings: HashMap::new(),
        };
        table.walk(root, source, root.id());
        table
    }

    fn walk(&mut self, node: Node<'t>, source: &[u8], scope: usize) {
        match node.kind() {
            "variable_declarator" => self.record_declarator(node, source, scope),
            "assignment_expression" => {
                if let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    if left.kind() == "identifier" {
                        self.record(
                            node_text(&left, source),
                            BindingKind::Assignment,
                            node,
                            scope,
                            Some(right),
                        );
                    }
                }
            }
            "augmented_assignment_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    if left.kind() == "identifier" {
                        self.record(
                            node_text(&left, source),
                            BindingKind::Runtime,
                            node,
                            scope,
                            None,
                        );
                    }
                }
            }
            _ => {}
        }

        let child_scope = if is_function(node.kind()) {
            node.id()
        } else {
            scope
        };
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.walk(child, source, child_scope);
            }
        }
    }

    fn record_declarator(&mut self, node: Node<'t>, source: &[u8], scope: usize) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        if name.kind() == "identifier" {
            self.record(
                node_text(&name, source),
                BindingKind::Declaration,
                node,
                scope,
                node.child_by_field_name("value"),
            );
        } else {
            // `const { a, b } = obj`, `const [x] = arr`
            for ident in pattern_identifiers(name, source) {
                self.record(&ident, BindingKind::Runtime, node, scope, None);
            }
        }
    }

    fn record(
        &mut self,
        name: &str,
        kind: BindingKind,
        site: Node<'t>,
        scope: usize,
        value: Option<Node<'t>>,
    ) {
        let block = statement_parent(site);
        self.bindings
            .entry(name.to_string())
            .or_default()
            .push(Binding {
                kind,
                scope,
                position: site.start_byte(),
                block,
                value,
            });
    }

    /// Resolve `name` as seen from `use_site`.
    pub fn resolve(&self, name: &str, use_site: Node<'t>, source: &[u8]) -> Resolution<'t> {
        let scopes = enclosing_scopes(use_site);
        let bindings = self.bindings.get(name).map(Vec::as_slice).unwrap_or(&[]);

        for (depth, scope) in scopes.iter().enumerate() {
            let innermost = depth == 0;
            let mut visible: Vec<&Binding<'t>> = bindings
                .iter()
                .filter(|b| b.scope == scope.id())
                // Outer scopes are fully initialised by the time a closure runs.
                .filter(|b| !innermost || b.position < use_site.start_byte())
                .collect();

            if visible.is_empty() {
                if is_function(scope.kind()) && function_params(*scope, source).iter().any(|p| p == name) {
                    return Resolution::Runtime;
                }
                continue;
            }

            visible.sort_by_key(|b| b.position);
            let mut candidates: Vec<Node<'t>> = Vec::new();
            let mut runtime = false;
            for binding in visible {
                if is_ancestor(binding.block, use_site) {
                    candidates.clear();
                    runtime = false;
                }
                match (binding.kind, binding.value) {
                    (BindingKind::Runtime, _) => runtime = true,
                    (_, Some(value)) => candidates.push(value),
                    (_, None) => {}
                }
            }
            if runtime && candidates.is_empty() {
                return Resolution::Runtime;
            }
            return Resolution::Values(candidates);
        }
        Resolution::Unbound
    }

    /// All names bound by a declaration whose value satisfies `pred`,
    /// paired with that value. Used to discover clients and routers.
    pub fn declarations_where<F>(&self, mut pred: F) -> Vec<(String, Node<'t>)>
    where
        F: FnMut(Node<'t>) -> bool,
    {
        let mut found: Vec<(usize, String, Node<'t>)> = self
            .bindings
            .iter()
            .flat_map(|(name, list)| {
                list.iter()
                    .filter(|b| b.kind == BindingKind::Declaration)
                    .filter_map(move |b| b.value.map(|v| (b.position, name.clone(), v)))
            })
            .filter(|(_, _, v)| pred(*v))
            .collect();
        found.sort_by_key(|(pos, _, _)| *pos);
        found.into_iter().map(|(_, name, v)| (name, v)).collect()
    }
}

/// Innermost-first chain of function/program nodes around `node`.
fn enclosing_scopes<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut scopes = Vec::new();
    let mut current = node.parent();
    while let Some(n) = current {
        if is_function(n.kind()) || n.parent().is_none() {
            scopes.push(n);
        }
        current = n.parent();
    }
    scopes
}

/// Parent of the statement containing `node`.
fn statement_parent(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        let is_statement = matches!(
            current.kind(),
            "expression_statement" | "lexical_declaration" | "variable_declaration"
        );
        if is_statement {
            return parent;
        }
        current = parent;
    }
    current
}

fn is_ancestor(ancestor: Node, node: Node) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.id() == ancestor.id() {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Parameter names of a function node.
fn function_params(function: Node, source: &[u8]) -> Vec<String> {
    let params = function
        .child_by_field_name("parameters")
        .or_else(|| function.child_by_field_name("parameter"));
    match params {
        Some(p) if p.kind() == "identifier" => vec![node_text(&p, source).to_string()],
        Some(p) => pattern_identifiers(p, source),
        None => Vec::new(),
    }
}

/// Identifiers bound by a pattern (parameters, destructuring).
/// Default values (`page = 1`) don't bind anything on their right side.
fn pattern_identifiers(node: Node, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    collect_pattern_identifiers(node, source, &mut out);
    out
}

fn collect_pattern_identifiers(node: Node, source: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push(node_text(&node, source).to_string());
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_pattern_identifiers(left, source, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_pattern_identifiers(value, source, out);
            }
        }
        "type_annotation" => {}
        _ => {
            for child in named_children(&node) {
                collect_pattern_identifiers(child, source, out);
            }
        }
    }
}
