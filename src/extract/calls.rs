//
//  calls.rs
//  RouteLinter
//

//! Call-site extractor: HTTP requests issued by frontend code.
//!
//! Recognized forms:
//!
//! ```text
//! fetch(path)                          GET
//! fetch(path, { method: 'POST' })      method from the options object
//! axios.put(`/api/items/${id}`, body)  method from the property name
//! this.http.get(path)                  member receivers by last property
//! apiClient.post('/orders')            factory client, baseURL prepended
//! axios({ url, method })               config-object form
//! const api = { delete: (id) => fetch(`/api/users/${id}`) }
//!                                      method from the table key
//! ```
//!
//! Use sites of a verb-keyed table (`api.delete(42)`) are only requests when
//! the entry forwards its first parameter as the path (`get: (p) => fetch(p)`).

use std::collections::HashMap;

use tracing::debug;
use tree_sitter::Node;

use super::bindings::BindingTable;
use super::lower::Lowerer;
use super::routes::{call_arguments, raw_path_text};
use super::{factory_name, receiver_name, scope_name};
use crate::config::LinterConfig;
use crate::model::{CallMethod, CallSite, Diagnostic, DiagnosticKind, HttpMethod, SourceLocation};
use crate::normalize::{normalize, Dialect, PathExpr};
use crate::parser::helpers::{
    callee_path, is_function, location, named_children, node_text, object_property, property_key,
    unwrap_expression,
};
use crate::parser::ParsedUnit;

/// Global objects `fetch` may be reached through.
const GLOBAL_OBJECTS: &[&str] = &["window", "globalThis", "self"];

/// Properties of a client config object that carry a base path.
const BASE_URL_KEYS: &[&str] = &["baseURL", "baseUrl", "prefixUrl"];

/// Client methods that look like verbs but are never analysed.
const UNSUPPORTED_CLIENT_VERBS: &[&str] = &["head", "options"];

/// Call sites and diagnostics found in one unit.
#[derive(Debug, Default, Clone)]
pub struct UnitCalls {
    pub call_sites: Vec<CallSite>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extracts [`CallSite`]s from frontend units.
#[derive(Debug, Clone)]
pub struct CallSiteExtractor {
    config: LinterConfig,
}

/// What a call's receiver turned out to be.
#[derive(Clone)]
enum Client<'t> {
    /// A configured client name (`axios`, `this.http`).
    Named,
    /// Built by a client factory; carries the `baseURL` node when known.
    Created(Option<Node<'t>>),
    /// An object literal with verb-keyed functions.
    Table(Vec<TableEntry<'t>>),
}

/// A verb-keyed function of an API client table.
#[derive(Clone, Copy)]
struct TableEntry<'t> {
    method: HttpMethod,
    function: Node<'t>,
}

/// A request whose method and path argument are known.
struct Request<'t> {
    method: CallMethod,
    path: Node<'t>,
    base: Option<Node<'t>>,
}

struct UnitContext<'a, 't> {
    parsed: &'a ParsedUnit<'a>,
    lowerer: Lowerer<'a, 't>,
    /// Identifiers bound to a client factory call, with their base path node.
    created: HashMap<String, Option<Node<'t>>>,
    /// API client tables by binding name, with their verb entries.
    tables: HashMap<String, Vec<TableEntry<'t>>>,
    /// Function node id of every table entry, with the entry's method.
    entries: HashMap<usize, HttpMethod>,
    out: UnitCalls,
}

impl CallSiteExtractor {
    pub fn new(config: LinterConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, parsed: &ParsedUnit) -> UnitCalls {
        let root = parsed.tree.root_node();
        let source = parsed.source();
        let bindings = BindingTable::build(root, source);
        let lowerer = Lowerer::new(source, &bindings);

        let created: HashMap<String, Option<Node>> = bindings
            .declarations_where(|value| {
                factory_name(unwrap_expression(value), source)
                    .is_some_and(|f| self.config.calls.client_factories.contains(&f))
            })
            .into_iter()
            .map(|(name, value)| {
                let base = call_arguments(unwrap_expression(value))
                    .first()
                    .and_then(|config| lowerer.resolve_object(*config))
                    .and_then(|config| base_url(config, source));
                (name, base)
            })
            .collect();

        let tables: HashMap<String, Vec<TableEntry>> = bindings
            .declarations_where(|value| {
                !self.table_entries(unwrap_expression(value), source).is_empty()
            })
            .into_iter()
            .map(|(name, value)| (name, self.table_entries(unwrap_expression(value), source)))
            .collect();
        let entries: HashMap<usize, HttpMethod> = tables
            .values()
            .flatten()
            .map(|entry| (entry.function.id(), entry.method))
            .collect();

        let mut ctx = UnitContext {
            parsed,
            lowerer,
            created,
            tables,
            entries,
            out: UnitCalls::default(),
        };
        self.walk_node(root, &mut ctx);

        debug!(
            file = %parsed.path().display(),
            call_sites = ctx.out.call_sites.len(),
            diagnostics = ctx.out.diagnostics.len(),
            "extracted call sites"
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
        let function = unwrap_expression(function);
        let args = call_arguments(call);
        let loc = location(&call, parsed.path()).with_scope(scope_name(call, source));
        // Inside a table entry the entry's key decides the method.
        let entry_method = enclosing_entry_method(call, &ctx.entries);

        if self.is_fetch(function, source) {
            let Some(&path) = args.first() else {
                return;
            };
            let method = match entry_method {
                Some(method) => Some(CallMethod::Known(method)),
                None => self.fetch_method(args.get(1).copied(), &loc, ctx),
            };
            if let Some(method) = method {
                let request = Request {
                    method,
                    path,
                    base: None,
                };
                self.push_call_sites(request, loc, ctx);
            }
            return;
        }

        match function.kind() {
            // `axios({ url, method })`, `apiClient({ url })`
            "identifier" => {
                if let Some(client) = self.client_kind(function, ctx) {
                    self.config_object_call(client, args.first().copied(), entry_method, loc, ctx);
                }
            }
            "member_expression" => {
                let (Some(receiver), Some(property)) = (
                    function.child_by_field_name("object"),
                    function.child_by_field_name("property"),
                ) else {
                    return;
                };
                let Some(client) = self.client_kind(unwrap_expression(receiver), ctx) else {
                    return;
                };
                let token = node_text(&property, source);

                if let Client::Table(entries) = &client {
                    self.table_call(entries, token, args.first().copied(), loc, ctx);
                } else if token == "request" {
                    self.config_object_call(client, args.first().copied(), entry_method, loc, ctx);
                } else if let Some(method) = self.config.recognized_verb(token) {
                    let Some(&path) = args.first() else {
                        return;
                    };
                    let base = match client {
                        Client::Created(base) => base,
                        _ => None,
                    };
                    let request = Request {
                        method: CallMethod::Known(entry_method.unwrap_or(method)),
                        path,
                        base,
                    };
                    self.push_call_sites(request, loc, ctx);
                } else if HttpMethod::parse(token).is_some()
                    || UNSUPPORTED_CLIENT_VERBS.contains(&token.to_ascii_lowercase().as_str())
                {
                    ctx.out.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnsupportedMethod,
                        loc,
                        format!("client method `{token}` is not analysed"),
                    ));
                }
            }
            _ => {}
        }
    }

    fn is_fetch(&self, function: Node, source: &[u8]) -> bool {
        let Some(callee) = callee_path(&function, source) else {
            return false;
        };
        let name = match callee.split_once('.') {
            Some((global, rest)) if GLOBAL_OBJECTS.contains(&global) => rest,
            Some(_) => return false,
            None => callee.as_str(),
        };
        self.config.calls.fetch_functions.iter().any(|f| f == name)
    }

    /// Method of a fetch-style call from its options argument.
    ///
    /// `None` means the call is skipped (unsupported verb); a diagnostic has
    /// been recorded.
    fn fetch_method<'t>(
        &self,
        options: Option<Node<'t>>,
        loc: &SourceLocation,
        ctx: &mut UnitContext<'_, 't>,
    ) -> Option<CallMethod> {
        let Some(options) = options else {
            return Some(CallMethod::Known(HttpMethod::Get));
        };
        match ctx.lowerer.resolve_object(options) {
            Some(object) => {
                let parsed = ctx.parsed;
                match object_property(&object, "method", parsed.source()) {
                    Some(value) => self.method_value(value, loc, ctx),
                    None => Some(CallMethod::Known(HttpMethod::Get)),
                }
            }
            None => {
                self.unresolved_method(loc, "request options are not statically known", ctx);
                Some(CallMethod::Unresolved)
            }
        }
    }

    /// Interpret a `method:` value.
    fn method_value<'t>(
        &self,
        value: Node<'t>,
        loc: &SourceLocation,
        ctx: &mut UnitContext<'_, 't>,
    ) -> Option<CallMethod> {
        let Some(token) = ctx.lowerer.static_string(value) else {
            self.unresolved_method(loc, "method is not a static string", ctx);
            return Some(CallMethod::Unresolved);
        };
        match self.config.recognized_verb(&token) {
            Some(method) => Some(CallMethod::Known(method)),
            None => {
                ctx.out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnsupportedMethod,
                    loc.clone(),
                    format!("method `{token}` is not analysed"),
                ));
                None
            }
        }
    }

    fn unresolved_method(&self, loc: &SourceLocation, message: &str, ctx: &mut UnitContext) {
        ctx.out.diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnresolvedMethod,
            loc.clone(),
            message,
        ));
    }

    /// `client({ url, method, baseURL })`. Missing `method` means GET.
    fn config_object_call<'t>(
        &self,
        client: Client<'t>,
        config: Option<Node<'t>>,
        entry_method: Option<HttpMethod>,
        loc: SourceLocation,
        ctx: &mut UnitContext<'_, 't>,
    ) {
        let parsed = ctx.parsed;
        let source = parsed.source();
        let Some(object) = config.and_then(|c| ctx.lowerer.resolve_object(c)) else {
            return;
        };
        let Some(path) = object_property(&object, "url", source) else {
            return;
        };
        let method = match (entry_method, object_property(&object, "method", source)) {
            (Some(method), _) => CallMethod::Known(method),
            (None, Some(value)) => match self.method_value(value, &loc, ctx) {
                Some(method) => method,
                None => return,
            },
            (None, None) => CallMethod::Known(HttpMethod::Get),
        };
        let base = base_url(object, source).or(match client {
            Client::Created(base) => base,
            _ => None,
        });
        self.push_call_sites(Request { method, path, base }, loc, ctx);
    }

    /// `table.verb(arg)`: a request only when the entry forwards its first
    /// parameter as the path. Otherwise the calls inside the entry already
    /// describe the request.
    fn table_call<'t>(
        &self,
        entries: &[TableEntry<'t>],
        token: &str,
        path: Option<Node<'t>>,
        loc: SourceLocation,
        ctx: &mut UnitContext<'_, 't>,
    ) {
        let Some(method) = self.config.recognized_verb(token) else {
            return;
        };
        let parsed = ctx.parsed;
        let forwarding = entries
            .iter()
            .any(|e| e.method == method && self.forwards_first_param(e.function, parsed.source()));
        let Some(path) = path.filter(|_| forwarding) else {
            return;
        };
        let request = Request {
            method: CallMethod::Known(method),
            path,
            base: None,
        };
        self.push_call_sites(request, loc, ctx);
    }

    /// True when `function` passes its first parameter unchanged as the path
    /// of a request it makes.
    fn forwards_first_param(&self, function: Node, source: &[u8]) -> bool {
        let param = function.child_by_field_name("parameter").or_else(|| {
            function
                .child_by_field_name("parameters")
                .and_then(|params| named_children(&params).into_iter().next())
        });
        let Some(param) = param.filter(|p| p.kind() == "identifier") else {
            return false;
        };
        let name = node_text(&param, source);
        function
            .child_by_field_name("body")
            .is_some_and(|body| self.has_request_with_path(body, name, source))
    }

    fn has_request_with_path(&self, node: Node, name: &str, source: &[u8]) -> bool {
        if node.kind() == "call_expression" {
            let is_request = node
                .child_by_field_name("function")
                .map(unwrap_expression)
                .is_some_and(|function| {
                    let verb_method = function.kind() == "member_expression"
                        && function
                            .child_by_field_name("property")
                            .and_then(|p| self.config.recognized_verb(node_text(&p, source)))
                            .is_some();
                    verb_method || self.is_fetch(function, source)
                });
            let forwards = call_arguments(node).first().is_some_and(|arg| {
                let arg = unwrap_expression(*arg);
                arg.kind() == "identifier" && node_text(&arg, source) == name
            });
            if is_request && forwards {
                return true;
            }
        }
        (0..node.child_count())
            .filter_map(|i| node.child(i))
            .any(|child| self.has_request_with_path(child, name, source))
    }

    fn push_call_sites<'t>(
        &self,
        request: Request<'t>,
        loc: SourceLocation,
        ctx: &mut UnitContext<'_, 't>,
    ) {
        let parsed = ctx.parsed;
        let source = parsed.source();
        let raw_path = raw_path_text(request.path, source);
        let mut expr = ctx.lowerer.lower(request.path);
        if let Some(base) = request.base {
            if !is_absolute(&expr) {
                expr = PathExpr::Concat(vec![ctx.lowerer.lower(base), expr]);
            }
        }

        let normalized = normalize(&expr, Dialect::Call, &self.config.calls.local_hosts);
        let branched = normalized.targets.len() > 1;
        for (i, target) in normalized.targets.into_iter().enumerate() {
            ctx.out.call_sites.push(CallSite {
                method: request.method,
                target,
                raw_path: raw_path.clone(),
                location: loc.clone().with_branch(branched.then_some(i)),
                confidence: normalized.confidence,
            });
        }
    }

    /// Classify a call receiver as an HTTP client, or `None`.
    fn client_kind<'t>(&self, receiver: Node<'t>, ctx: &UnitContext<'_, 't>) -> Option<Client<'t>> {
        let parsed = ctx.parsed;
        let source = parsed.source();
        if receiver.kind() == "identifier" {
            let name = node_text(&receiver, source);
            if let Some(base) = ctx.created.get(name) {
                return Some(Client::Created(*base));
            }
            if let Some(entries) = ctx.tables.get(name) {
                return Some(Client::Table(entries.clone()));
            }
        }
        let name = receiver_name(receiver, source)?;
        self.config
            .calls
            .client_names
            .contains(&name)
            .then_some(Client::Named)
    }

    /// Verb-keyed function entries of an object literal. Empty for anything
    /// that isn't an API client table.
    fn table_entries<'t>(&self, value: Node<'t>, source: &[u8]) -> Vec<TableEntry<'t>> {
        if value.kind() != "object" {
            return Vec::new();
        }
        named_children(&value)
            .into_iter()
            .filter_map(|entry| {
                let method = property_key(&entry, source)
                    .and_then(|key| self.config.recognized_verb(&key))?;
                let function = match entry.kind() {
                    "method_definition" => entry,
                    "pair" => unwrap_expression(entry.child_by_field_name("value")?),
                    _ => return None,
                };
                is_function(function.kind()).then_some(TableEntry { method, function })
            })
            .collect()
    }
}

/// Method of the innermost API table entry enclosing `call`.
fn enclosing_entry_method(call: Node, entries: &HashMap<usize, HttpMethod>) -> Option<HttpMethod> {
    let mut current = call.parent();
    while let Some(node) = current {
        if let Some(method) = entries.get(&node.id()) {
            return Some(*method);
        }
        current = node.parent();
    }
    None
}

/// The `baseURL` / `prefixUrl` value of a client config object.
fn base_url<'t>(config: Node<'t>, source: &[u8]) -> Option<Node<'t>> {
    BASE_URL_KEYS
        .iter()
        .find_map(|key| object_property(&config, key, source))
}

/// Paths that ignore a client's base URL.
fn is_absolute(expr: &PathExpr) -> bool {
    let first_text = match expr {
        PathExpr::Literal(text) => Some(text.as_str()),
        PathExpr::Template(parts) => match parts.first() {
            Some(crate::normalize::TemplatePart::Text(text)) => Some(text.as_str()),
            _ => None,
        },
        PathExpr::Concat(items) => match items.first() {
            Some(PathExpr::Literal(text)) => Some(text.as_str()),
            _ => None,
        },
        _ => None,
    };
    first_text.is_some_and(|text| {
        let text = text.trim_start().to_ascii_lowercase();
        text.starts_with("http://") || text.starts_with("https://") || text.starts_with("//")
    })
}
