//
//  routes.rs
//  RouteLinter
//

//! Route extractor: `<router>.<verb>(path, ...handlers)` registrations.
//!
//! Recognized forms:
//!
//! ```text
//! app.get('/api/users', handler)
//! apiRouter.delete('/api/items/:id', authenticate, handler)
//! router.route('/api/books').get(list).post(create)
//! ```
//!
//! Receivers are not proven to be routers. Ones that look like routers by
//! name or by construction are `Certain`; anything else is `Inferred` and
//! only accepted with a `/`-prefixed literal path.

use std::collections::HashSet;

use tracing::debug;
use tree_sitter::Node;

use super::bindings::BindingTable;
use super::lower::Lowerer;
use super::{factory_name, receiver_name, scope_name};
use crate::config::LinterConfig;
use crate::model::{
    CallTarget, Diagnostic, DiagnosticKind, HttpMethod, RouteConfidence, RoutePattern,
    SourceLocation,
};
use crate::normalize::{normalize, Dialect};
use crate::parser::helpers::{location, named_children, node_text, string_value, unwrap_expression};
use crate::parser::ParsedUnit;

/// Registration methods that exist on routers but never become routes.
const UNSUPPORTED_VERBS: &[&str] = &["all", "use", "head", "options", "connect", "trace"];

/// Routes and diagnostics found in one unit.
#[derive(Debug, Default, Clone)]
pub struct UnitRoutes {
    pub routes: Vec<RoutePattern>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extracts [`RoutePattern`]s from backend units.
#[derive(Debug, Clone)]
pub struct RouteExtractor {
    config: LinterConfig,
}

/// Per-unit state shared by the walk.
struct UnitContext<'a, 't> {
    parsed: &'a ParsedUnit<'a>,
    lowerer: Lowerer<'a, 't>,
    /// Names bound to a router factory call in this unit.
    constructed: HashSet<String>,
    out: UnitRoutes,
}

impl RouteExtractor {
    pub fn new(config: LinterConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, parsed: &ParsedUnit) -> UnitRoutes {
        let root = parsed.tree.root_node();
        let source = parsed.source();
        let bindings = BindingTable::build(root, source);

        let constructed: HashSet<String> = bindings
            .declarations_where(|value| {
                factory_name(unwrap_expression(value), source)
                    .is_some_and(|f| self.config.routes.router_factories.contains(&f))
            })
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        let mut ctx = UnitContext {
            parsed,
            lowerer: Lowerer::new(source, &bindings),
            constructed,
            out: UnitRoutes::default(),
        };
        self.walk_node(root, &mut ctx);

        debug!(
            file = %parsed.path().display(),
            routes = ctx.out.routes.len(),
            diagnostics = ctx.out.diagnostics.len(),
            "extracted routes"
        );
        ctx.out
    }

    fn walk_node<'t>(&self, node: Node<'t>, ctx: &mut UnitContext<'_, 't>) {
        if node.kind() == "call_expression" {
            self.visit_call(node, ctx);
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.walk_node(child, ctx);
            }
        }
    }

    fn visit_call<'t>(&self, call: Node<'t>, ctx: &mut UnitContext<'_, 't>) {
        let parsed = ctx.parsed;
        let source = parsed.source();
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        if function.kind() != "member_expression" {
            return;
        }
        let (Some(receiver), Some(property)) = (
            function.child_by_field_name("object"),
            function.child_by_field_name("property"),
        ) else {
            return;
        };
        let token = node_text(&property, source);
        let args = call_arguments(call);

        // `router.route('/x').get(h)`: the path lives on the `.route()` call
        // and every argument of the verb call is a handler.
        let (router, path_node, handler_count) = match self.route_chain(receiver, source) {
            Some((router, path_node)) => (router, Some(path_node), args.len()),
            None => (receiver, args.first().copied(), args.len().saturating_sub(1)),
        };
        let Some(path_node) = path_node else {
            return;
        };

        let confidence = self.receiver_confidence(router, ctx);
        let loc = || location(&call, parsed.path()).with_scope(scope_name(call, source));

        let Some(method) = self.config.recognized_verb(token) else {
            if confidence == Some(RouteConfidence::Certain)
                && is_unsupported_verb(token)
                && literal_path(path_node, source).is_some()
            {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::UnsupportedMethod,
                    loc(),
                    format!("`{token}` registrations are not analysed"),
                );
                ctx.out.diagnostics.push(diagnostic);
            }
            return;
        };

        let confidence = match confidence {
            Some(RouteConfidence::Certain) => RouteConfidence::Certain,
            Some(RouteConfidence::Inferred)
                if literal_path(path_node, source).is_some_and(|p| p.starts_with('/')) =>
            {
                RouteConfidence::Inferred
            }
            _ => return,
        };

        if handler_count == 0 {
            if confidence == RouteConfidence::Certain {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::MalformedRegistration,
                    loc(),
                    format!("`{token}` call without a handler"),
                );
                ctx.out.diagnostics.push(diagnostic);
            }
            return;
        }

        self.push_routes(method, path_node, handler_count, confidence, loc(), ctx);
    }

    fn push_routes<'t>(
        &self,
        method: HttpMethod,
        path_node: Node<'t>,
        middleware_count: usize,
        confidence: RouteConfidence,
        loc: SourceLocation,
        ctx: &mut UnitContext<'_, 't>,
    ) {
        let parsed = ctx.parsed;
        let source = parsed.source();
        let raw_path = raw_path_text(path_node, source);
        let normalized = normalize(&ctx.lowerer.lower(path_node), Dialect::Route, &[]);
        let branched = normalized.targets.len() > 1;

        for (i, target) in normalized.targets.into_iter().enumerate() {
            let location = loc.clone().with_branch(branched.then_some(i));
            match target {
                CallTarget::Path { segments } => ctx.out.routes.push(RoutePattern {
                    method,
                    segments,
                    raw_path: raw_path.clone(),
                    location,
                    middleware_count,
                    confidence,
                }),
                CallTarget::Unresolved | CallTarget::External { .. } => {
                    ctx.out.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnresolvablePath,
                        location,
                        format!("route path `{raw_path}` has no static structure"),
                    ));
                }
            }
        }
    }

    /// For `<router>.route(path)` (possibly followed by other verb calls),
    /// return the router node and the path argument.
    fn route_chain<'t>(&self, receiver: Node<'t>, source: &[u8]) -> Option<(Node<'t>, Node<'t>)> {
        let mut current = receiver;
        loop {
            if current.kind() != "call_expression" {
                return None;
            }
            let function = current.child_by_field_name("function")?;
            if function.kind() != "member_expression" {
                return None;
            }
            let object = function.child_by_field_name("object")?;
            let property = function.child_by_field_name("property")?;
            let name = node_text(&property, source);
            if name == "route" {
                let path = call_arguments(current).first().copied()?;
                return Some((object, path));
            }
            if self.config.recognized_verb(name).is_none() {
                return None;
            }
            current = object;
        }
    }

    /// `None` when the receiver can't be a router at all (e.g. an HTTP client).
    fn receiver_confidence(&self, receiver: Node, ctx: &UnitContext) -> Option<RouteConfidence> {
        let source = ctx.parsed.source();
        let name = receiver_name(receiver, source)?;
        let routes = &self.config.routes;

        let certain = routes.router_names.contains(&name)
            || routes.router_suffixes.iter().any(|s| name.ends_with(s.as_str()))
            || (receiver.kind() == "identifier" && ctx.constructed.contains(&name));
        if certain {
            return Some(RouteConfidence::Certain);
        }
        if self.config.calls.client_names.contains(&name) {
            return None;
        }
        Some(RouteConfidence::Inferred)
    }
}

/// Call arguments, comments excluded.
pub(crate) fn call_arguments(call: Node) -> Vec<Node> {
    call.child_by_field_name("arguments")
        .map(|args| {
            named_children(&args)
                .into_iter()
                .filter(|a| a.kind() != "comment")
                .collect()
        })
        .unwrap_or_default()
}

/// Path text of a plain string or substitution-free template literal.
fn literal_path(node: Node, source: &[u8]) -> Option<String> {
    let node = unwrap_expression(node);
    match node.kind() {
        "string" => string_value(&node, source).map(|s| s.trim().to_string()),
        "template_string" => {
            let text = node_text(&node, source);
            let inner = text.get(1..text.len().saturating_sub(1))?;
            Some(inner.trim().to_string())
        }
        _ => None,
    }
}

/// Path text as written: string values unquoted, anything else verbatim.
pub(crate) fn raw_path_text(node: Node, source: &[u8]) -> String {
    let node = unwrap_expression(node);
    match node.kind() {
        "string" => string_value(&node, source).unwrap_or_default(),
        _ => node_text(&node, source).to_string(),
    }
}

fn is_unsupported_verb(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    UNSUPPORTED_VERBS.contains(&lower.as_str()) || HttpMethod::parse(token).is_some()
}
