//
//  model.rs
//  RouteLinter
//

//! Record types shared by the extractors, the matcher and the report stage.
//!
//! Every record is created once and never mutated afterwards, so extraction
//! results can be produced on any thread and merged by concatenation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ── HTTP verbs ───────────────────────────────────────────────────────────────

/// HTTP verbs the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    /// Parse a method token case-insensitively (`get`, `Post`, `DELETE`).
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Segments ─────────────────────────────────────────────────────────────────

/// One slash-delimited path component.
///
/// A `Wildcard` is only ever produced as the last segment of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Segment {
    Literal { value: String },
    NamedParam { name: String },
    OptionalParam { name: String },
    PatternParam { name: String, constraint: String },
    Wildcard,
}

impl Segment {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::NamedParam { name: name.into() }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::OptionalParam { name: name.into() }
    }

    pub fn pattern(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::PatternParam {
            name: name.into(),
            constraint: constraint.into(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// Parameter-like segments, wildcard included.
    pub fn is_param(&self) -> bool {
        !self.is_literal()
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Structural equality: kind and constraint count, parameter names don't.
    pub fn shape_eq(&self, other: &Segment) -> bool {
        match (self, other) {
            (Self::Literal { value: a }, Self::Literal { value: b }) => a == b,
            (Self::NamedParam { .. }, Self::NamedParam { .. }) => true,
            (Self::OptionalParam { .. }, Self::OptionalParam { .. }) => true,
            (
                Self::PatternParam { constraint: a, .. },
                Self::PatternParam { constraint: b, .. },
            ) => a == b,
            (Self::Wildcard, Self::Wildcard) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value } => f.write_str(value),
            Self::NamedParam { name } => write!(f, ":{name}"),
            Self::OptionalParam { name } => write!(f, ":{name}?"),
            Self::PatternParam { name, constraint } => write!(f, ":{name}({constraint})"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// Render a segment sequence back into a `/a/:b` path.
pub fn render_path(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().map(|s| format!("/{s}")).collect()
}

/// Structural equality of two segment sequences.
pub fn segments_shape_eq(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.shape_eq(y))
}

// ── Source locations ─────────────────────────────────────────────────────────

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Enclosing function, method or API-table property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Branch tag when one call expression expands into several call sites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<usize>,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            scope: None,
            branch: None,
        }
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_branch(mut self, branch: Option<usize>) -> Self {
        self.branch = branch;
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)?;
        if let Some(branch) = self.branch {
            write!(f, " [branch {branch}]")?;
        }
        Ok(())
    }
}

// ── Routes ───────────────────────────────────────────────────────────────────

/// How sure the route extractor is that the receiver is a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteConfidence {
    Certain,
    Inferred,
}

/// A backend-declared method + path template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePattern {
    pub method: HttpMethod,
    pub segments: Vec<Segment>,
    /// Path text as written in the source.
    pub raw_path: String,
    pub location: SourceLocation,
    /// Arguments after the path, handler included. Informational only.
    pub middleware_count: usize,
    pub confidence: RouteConfidence,
}

impl RoutePattern {
    pub fn path(&self) -> String {
        render_path(&self.segments)
    }

    pub fn param_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_param()).count()
    }

    pub fn ends_with_wildcard(&self) -> bool {
        self.segments.last().is_some_and(Segment::is_wildcard)
    }

    /// Segment count once trailing optional params are dropped.
    pub fn required_len(&self) -> usize {
        let trailing_optional = self
            .segments
            .iter()
            .rev()
            .take_while(|s| matches!(s, Segment::OptionalParam { .. }))
            .count();
        self.segments.len() - trailing_optional
    }

    /// Same method and structurally equal segments.
    pub fn is_duplicate_of(&self, other: &RoutePattern) -> bool {
        self.method == other.method && segments_shape_eq(&self.segments, &other.segments)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

// ── Call sites ───────────────────────────────────────────────────────────────

/// How much of a call site's path was statically determinable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionConfidence {
    Static,
    Templated,
    Dynamic,
}

/// Method of a call site. `Unresolved` matches any route method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallMethod {
    Known(HttpMethod),
    Unresolved,
}

impl CallMethod {
    pub fn is_compatible(&self, method: HttpMethod) -> bool {
        match self {
            Self::Known(m) => *m == method,
            Self::Unresolved => true,
        }
    }
}

impl fmt::Display for CallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(m) => m.fmt(f),
            Self::Unresolved => f.write_str("ANY"),
        }
    }
}

/// What a call site points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CallTarget {
    Path { segments: Vec<Segment> },
    /// Nothing decomposable; kept for the report, never matched.
    Unresolved,
    /// Absolute URL to a foreign host.
    External { url: String },
}

/// A frontend expression that issues an HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    pub method: CallMethod,
    pub target: CallTarget,
    /// Path expression text as written in the source.
    pub raw_path: String,
    pub location: SourceLocation,
    pub confidence: ResolutionConfidence,
}

impl CallSite {
    pub fn segments(&self) -> Option<&[Segment]> {
        match &self.target {
            CallTarget::Path { segments } => Some(segments),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.target, CallTarget::Unresolved)
    }

    pub fn is_external(&self) -> bool {
        matches!(self.target, CallTarget::External { .. })
    }

    /// Path shown in reports.
    pub fn display_path(&self) -> String {
        match &self.target {
            CallTarget::Path { segments } => render_path(segments),
            CallTarget::External { url } => url.clone(),
            CallTarget::Unresolved => self.raw_path.clone(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.display_path())
    }
}

// ── Match results ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Exact,
    MethodMismatch,
    NearMiss,
    Orphan,
    IgnoredExternal,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::MethodMismatch => "method-mismatch",
            Self::NearMiss => "near-miss",
            Self::Orphan => "orphan",
            Self::IgnoredExternal => "ignored-external",
        }
    }

    /// Classifications that point at a likely bug.
    pub fn is_discrepancy(&self) -> bool {
        matches!(self, Self::MethodMismatch | Self::NearMiss | Self::Orphan)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route plus its position in the analysed route list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRef {
    pub index: usize,
    pub route: RoutePattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub call_site: CallSite,
    pub best_route: Option<RouteRef>,
    pub classification: Classification,
    pub score: f64,
}

// ── Diagnostics ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UnsupportedLanguage,
    ParseFailed,
    MalformedRegistration,
    UnsupportedMethod,
    UnresolvablePath,
    UnresolvedMethod,
}

/// A parse-local or resolution-degraded finding. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("Delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse(" PATCH "), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("head"), None);
        assert_eq!(HttpMethod::parse("all"), None);
    }

    #[test]
    fn test_shape_eq_ignores_param_names() {
        assert!(Segment::param("id").shape_eq(&Segment::param("userId")));
        assert!(Segment::pattern("a", "\\d+").shape_eq(&Segment::pattern("b", "\\d+")));
        assert!(!Segment::pattern("a", "\\d+").shape_eq(&Segment::pattern("a", "\\w+")));
        assert!(!Segment::param("id").shape_eq(&Segment::optional("id")));
        assert!(!Segment::literal("users").shape_eq(&Segment::param("users")));
    }

    #[test]
    fn test_render_path() {
        let segments = vec![
            Segment::literal("api"),
            Segment::literal("users"),
            Segment::param("id"),
        ];
        assert_eq!(render_path(&segments), "/api/users/:id");
        assert_eq!(render_path(&[]), "/");
        assert_eq!(
            render_path(&[Segment::literal("files"), Segment::optional("name")]),
            "/files/:name?"
        );
    }

    #[test]
    fn test_required_len_skips_trailing_optionals() {
        let route = RoutePattern {
            method: HttpMethod::Get,
            segments: vec![Segment::literal("files"), Segment::optional("filename")],
            raw_path: "/files/:filename?".into(),
            location: SourceLocation::new("routes.js", 1, 1),
            middleware_count: 1,
            confidence: RouteConfidence::Certain,
        };
        assert_eq!(route.required_len(), 1);
        assert_eq!(route.param_count(), 1);
        assert!(!route.ends_with_wildcard());
    }

    #[test]
    fn test_unresolved_method_is_compatible_with_everything() {
        for method in HttpMethod::ALL {
            assert!(CallMethod::Unresolved.is_compatible(method));
        }
        assert!(!CallMethod::Known(HttpMethod::Put).is_compatible(HttpMethod::Post));
    }

    #[test]
    fn test_location_display_includes_branch() {
        let loc = SourceLocation::new("a.js", 3, 5).with_branch(Some(1));
        assert_eq!(loc.to_string(), "a.js:3:5 [branch 1]");
    }
}
