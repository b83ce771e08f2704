//
//  mod.rs
//  RouteLinter
//

//! Path normalizer: raw path expressions → canonical [`Segment`] sequences.
//!
//! Both extractors lower syntax into a [`PathExpr`] first, so this module
//! never sees a syntax tree. Everything here is a pure function.
//!
//! Expansion works in two steps:
//!
//! 1. The expression is flattened into alternatives, each a list of
//!    [`Piece`]s (literal text or a runtime placeholder). Conditionals fan
//!    out into one alternative per branch.
//! 2. Each alternative is cut at the query string (call dialect), checked
//!    for an absolute origin, and split on `/`.

mod segment;

use crate::model::{segments_shape_eq, CallTarget, ResolutionConfidence, Segment};

/// Upper bound on alternatives produced by nested conditionals.
pub const MAX_CANDIDATES: usize = 16;

/// Fallback name for an embedded expression with no usable identifier.
pub const UNKNOWN_PARAM: &str = "?";

/// A path expression, independent of source syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum PathExpr {
    /// A string literal, escapes already resolved.
    Literal(String),
    /// Template string with embedded expressions.
    Template(Vec<TemplatePart>),
    /// `a + b + c`, in source order.
    Concat(Vec<PathExpr>),
    /// Alternative values: ternaries or branch assignments.
    Conditional(Vec<PathExpr>),
    /// A value only known at runtime.
    Runtime { name: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(PathExpr),
}

impl PathExpr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn runtime(name: Option<String>) -> Self {
        Self::Runtime { name }
    }

    /// True when nothing about the expression is structurally known.
    fn is_opaque(&self) -> bool {
        match self {
            Self::Runtime { .. } => true,
            Self::Conditional(alts) => !alts.is_empty() && alts.iter().all(PathExpr::is_opaque),
            _ => false,
        }
    }
}

/// Which path grammar to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Backend declarations: `:id`, `:id?`, `:id(regex)`, `*`.
    Route,
    /// Frontend calls: query string and fragment are cut off first.
    Call,
}

/// Flattened path fragment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Text(String),
    Param(String),
}

/// Result of normalizing one path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPath {
    /// One target per distinct branch, in source order.
    pub targets: Vec<CallTarget>,
    pub confidence: ResolutionConfidence,
}

impl NormalizedPath {
    /// The single target when there is exactly one.
    pub fn single(&self) -> Option<&CallTarget> {
        match self.targets.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Normalize a path expression.
///
/// `local_hosts` lists hosts whose absolute URLs are treated as same-origin
/// paths; any other absolute URL becomes [`CallTarget::External`].
pub fn normalize(expr: &PathExpr, dialect: Dialect, local_hosts: &[String]) -> NormalizedPath {
    let alternatives = expand(expr);
    let is_static = alternatives
        .iter()
        .all(|alt| alt.iter().all(|p| matches!(p, Piece::Text(_))));

    let confidence = if is_static {
        ResolutionConfidence::Static
    } else if expr.is_opaque() {
        ResolutionConfidence::Dynamic
    } else {
        ResolutionConfidence::Templated
    };

    let mut targets: Vec<CallTarget> = Vec::new();
    for alt in alternatives {
        let target = resolve_alternative(merge_text(alt), dialect, local_hosts, is_static);
        let duplicate = targets.iter().any(|t| match (t, &target) {
            (CallTarget::Path { segments: a }, CallTarget::Path { segments: b }) => {
                segments_shape_eq(a, b)
            }
            (a, b) => a == b,
        });
        if !duplicate {
            targets.push(target);
        }
    }

    NormalizedPath {
        targets,
        confidence,
    }
}

/// Normalize a plain path string.
pub fn normalize_str(raw: &str, dialect: Dialect) -> NormalizedPath {
    normalize(&PathExpr::literal(raw), dialect, &[])
}

// ── Expansion ────────────────────────────────────────────────────────────────

fn expand(expr: &PathExpr) -> Vec<Vec<Piece>> {
    match expr {
        PathExpr::Literal(s) => vec![vec![Piece::Text(s.clone())]],
        PathExpr::Runtime { name } => vec![vec![Piece::Param(
            name.clone().unwrap_or_else(|| UNKNOWN_PARAM.to_string()),
        )]],
        PathExpr::Template(parts) => {
            let expanded: Vec<Vec<Vec<Piece>>> = parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(s) => vec![vec![Piece::Text(s.clone())]],
                    TemplatePart::Expr(e) => expand(e),
                })
                .collect();
            product(expanded)
        }
        PathExpr::Concat(items) => product(items.iter().map(expand).collect()),
        PathExpr::Conditional(alts) => {
            let mut out: Vec<Vec<Piece>> = Vec::new();
            for alt in alts {
                for pieces in expand(alt) {
                    if out.len() >= MAX_CANDIDATES {
                        return out;
                    }
                    out.push(pieces);
                }
            }
            if out.is_empty() {
                out.push(vec![Piece::Param(UNKNOWN_PARAM.to_string())]);
            }
            out
        }
    }
}

/// Cartesian product of sequential parts, capped at [`MAX_CANDIDATES`].
fn product(parts: Vec<Vec<Vec<Piece>>>) -> Vec<Vec<Piece>> {
    let mut acc: Vec<Vec<Piece>> = vec![Vec::new()];
    for options in parts {
        let mut next = Vec::with_capacity(acc.len() * options.len().max(1));
        'outer: for prefix in &acc {
            for option in &options {
                if next.len() >= MAX_CANDIDATES {
                    break 'outer;
                }
                let mut joined = prefix.clone();
                joined.extend(option.iter().cloned());
                next.push(joined);
            }
        }
        acc = next;
    }
    acc
}

fn merge_text(pieces: Vec<Piece>) -> Vec<Piece> {
    let mut out: Vec<Piece> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match (out.last_mut(), piece) {
            (Some(Piece::Text(prev)), Piece::Text(next)) => prev.push_str(&next),
            (_, piece) => out.push(piece),
        }
    }
    out
}

// ── Per-alternative resolution ───────────────────────────────────────────────

fn resolve_alternative(
    pieces: Vec<Piece>,
    dialect: Dialect,
    local_hosts: &[String],
    is_static: bool,
) -> CallTarget {
    let mut pieces = trim_outer_whitespace(pieces);

    if let Some(Piece::Text(first)) = pieces.first() {
        if let Some((host, rest)) = split_origin(first) {
            if local_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
                pieces[0] = Piece::Text(rest);
            } else {
                return CallTarget::External {
                    url: render_pieces(&pieces),
                };
            }
        }
    }

    if dialect == Dialect::Call {
        pieces = cut_query(pieces);
    }

    let segments = segment::split_segments(&pieces, dialect);
    if !is_static && !segments.iter().any(Segment::is_literal) {
        return CallTarget::Unresolved;
    }
    CallTarget::Path { segments }
}

fn trim_outer_whitespace(mut pieces: Vec<Piece>) -> Vec<Piece> {
    if let Some(Piece::Text(first)) = pieces.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Piece::Text(last)) = pieces.last_mut() {
        *last = last.trim_end().to_string();
    }
    pieces
}

/// Split `scheme://host[:port]/rest` into (host, `/rest`).
fn split_origin(text: &str) -> Option<(String, String)> {
    let lower = text.to_ascii_lowercase();
    let after_scheme = if lower.starts_with("http://") {
        &text[7..]
    } else if lower.starts_with("https://") {
        &text[8..]
    } else if text.starts_with("//") {
        &text[2..]
    } else {
        return None;
    };
    let end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    let authority = &after_scheme[..end];
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or(authority)
        .split(':')
        .next()
        .unwrap_or("")
        .to_string();
    Some((host, after_scheme[end..].to_string()))
}

/// Drop everything from the first `?` or `#` on, embedded expressions included.
fn cut_query(pieces: Vec<Piece>) -> Vec<Piece> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Text(text) => match text.find(['?', '#']) {
                Some(pos) => {
                    out.push(Piece::Text(text[..pos].to_string()));
                    return out;
                }
                None => out.push(Piece::Text(text)),
            },
            param => out.push(param),
        }
    }
    out
}

fn render_pieces(pieces: &[Piece]) -> String {
    pieces
        .iter()
        .map(|p| match p {
            Piece::Text(t) => t.clone(),
            Piece::Param(name) => format!("${{{name}}}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(target: &CallTarget) -> &[Segment] {
        match target {
            CallTarget::Path { segments } => segments,
            other => panic!("expected a path, got {other:?}"),
        }
    }

    fn runtime(name: &str) -> PathExpr {
        PathExpr::runtime(Some(name.to_string()))
    }

    fn text(s: &str) -> TemplatePart {
        TemplatePart::Text(s.to_string())
    }

    #[test]
    fn test_plain_literals() {
        let n = normalize_str("/api/users/:id", Dialect::Route);
        assert_eq!(n.confidence, ResolutionConfidence::Static);
        assert_eq!(
            segments(n.single().unwrap()),
            &[
                Segment::literal("api"),
                Segment::literal("users"),
                Segment::param("id")
            ]
        );

        let n = normalize_str("/files/:filename?", Dialect::Route);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("files"), Segment::optional("filename")]
        );

        let n = normalize_str("/assets/*", Dialect::Route);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("assets"), Segment::Wildcard]
        );

        let n = normalize_str("/users/:userId(\\d+)", Dialect::Route);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("users"), Segment::pattern("userId", "\\d+")]
        );
    }

    #[test]
    fn test_whitespace_and_slashes_are_ignored() {
        let n = normalize_str("  /spaced//route/  ", Dialect::Route);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("spaced"), Segment::literal("route")]
        );
        let n = normalize_str("api/users", Dialect::Call);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("api"), Segment::literal("users")]
        );
    }

    #[test]
    fn test_root_path_is_static_and_empty() {
        let n = normalize_str("/", Dialect::Route);
        assert_eq!(n.confidence, ResolutionConfidence::Static);
        assert!(segments(n.single().unwrap()).is_empty());
    }

    #[test]
    fn test_mid_path_wildcard_is_literal() {
        let n = normalize_str("/a/*/b", Dialect::Route);
        assert_eq!(
            segments(n.single().unwrap()),
            &[
                Segment::literal("a"),
                Segment::literal("*"),
                Segment::literal("b")
            ]
        );
    }

    #[test]
    fn test_template_params() {
        let expr = PathExpr::Template(vec![
            text("/api/users/"),
            TemplatePart::Expr(runtime("userId")),
            text("/details"),
        ]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(n.confidence, ResolutionConfidence::Templated);
        assert_eq!(
            segments(n.single().unwrap()),
            &[
                Segment::literal("api"),
                Segment::literal("users"),
                Segment::param("userId"),
                Segment::literal("details")
            ]
        );
    }

    #[test]
    fn test_unnamed_expression_falls_back() {
        let expr = PathExpr::Template(vec![text("/items/"), TemplatePart::Expr(PathExpr::runtime(None))]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("items"), Segment::param(UNKNOWN_PARAM)]
        );
    }

    #[test]
    fn test_concat_matches_template() {
        let concat = PathExpr::Concat(vec![
            PathExpr::literal("/api/products/"),
            runtime("id"),
        ]);
        let template = PathExpr::Template(vec![
            text("/api/products/"),
            TemplatePart::Expr(runtime("id")),
        ]);
        assert_eq!(
            normalize(&concat, Dialect::Call, &[]),
            normalize(&template, Dialect::Call, &[])
        );
    }

    #[test]
    fn test_query_string_is_cut() {
        let expr = PathExpr::Template(vec![
            text("/api/products/search?q="),
            TemplatePart::Expr(runtime("query")),
            text("&page="),
            TemplatePart::Expr(runtime("page")),
        ]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(n.confidence, ResolutionConfidence::Templated);
        assert_eq!(
            segments(n.single().unwrap()),
            &[
                Segment::literal("api"),
                Segment::literal("products"),
                Segment::literal("search")
            ]
        );
    }

    #[test]
    fn test_conditional_branches() {
        let expr = PathExpr::Conditional(vec![
            PathExpr::Template(vec![text("/api/users/"), TemplatePart::Expr(runtime("id"))]),
            PathExpr::Template(vec![text("/api/products/"), TemplatePart::Expr(runtime("id"))]),
        ]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(n.targets.len(), 2);
        assert_eq!(n.confidence, ResolutionConfidence::Templated);

        let all_literal = PathExpr::Conditional(vec![
            PathExpr::literal("/api/a"),
            PathExpr::literal("/api/b"),
        ]);
        let n = normalize(&all_literal, Dialect::Call, &[]);
        assert_eq!(n.targets.len(), 2);
        assert_eq!(n.confidence, ResolutionConfidence::Static);
    }

    #[test]
    fn test_equivalent_branches_collapse() {
        // `/orders${qs ? `?${qs}` : ''}`
        let expr = PathExpr::Template(vec![
            text("/api/users/"),
            TemplatePart::Expr(runtime("userId")),
            text("/orders"),
            TemplatePart::Expr(PathExpr::Conditional(vec![
                PathExpr::Template(vec![text("?"), TemplatePart::Expr(runtime("queryString"))]),
                PathExpr::literal(""),
            ])),
        ]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(n.targets.len(), 1);
        assert_eq!(
            segments(&n.targets[0]),
            &[
                Segment::literal("api"),
                Segment::literal("users"),
                Segment::param("userId"),
                Segment::literal("orders")
            ]
        );
    }

    #[test]
    fn test_runtime_only_is_unresolved() {
        let n = normalize(&runtime("endpoint"), Dialect::Call, &[]);
        assert_eq!(n.confidence, ResolutionConfidence::Dynamic);
        assert_eq!(n.single(), Some(&CallTarget::Unresolved));

        let expr = PathExpr::Template(vec![
            TemplatePart::Expr(runtime("a")),
            text("/"),
            TemplatePart::Expr(runtime("b")),
        ]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(n.single(), Some(&CallTarget::Unresolved));
    }

    #[test]
    fn test_runtime_prefix_with_literal_anchor() {
        let expr = PathExpr::Concat(vec![runtime("base"), PathExpr::literal("/users")]);
        let n = normalize(&expr, Dialect::Call, &[]);
        assert_eq!(n.confidence, ResolutionConfidence::Templated);
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::param("base"), Segment::literal("users")]
        );
    }

    #[test]
    fn test_external_and_local_urls() {
        let n = normalize_str("https://external-api.com/data", Dialect::Call);
        assert_eq!(
            n.single(),
            Some(&CallTarget::External {
                url: "https://external-api.com/data".to_string()
            })
        );

        let hosts = vec!["localhost".to_string()];
        let n = normalize(
            &PathExpr::literal("http://localhost:3000/api/users?x=1"),
            Dialect::Call,
            &hosts,
        );
        assert_eq!(
            segments(n.single().unwrap()),
            &[Segment::literal("api"), Segment::literal("users")]
        );
    }

    #[test]
    fn test_candidate_cap() {
        let alts: Vec<PathExpr> = (0..40).map(|i| PathExpr::literal(format!("/p{i}"))).collect();
        let n = normalize(&PathExpr::Conditional(alts), Dialect::Call, &[]);
        assert_eq!(n.targets.len(), MAX_CANDIDATES);
    }
}
