//! # Route Linter
//!
//! Static consistency checker between backend route declarations and
//! frontend HTTP call sites.
//!
//! Backend JavaScript/TypeScript is scanned for Express-style route
//! registrations, frontend code for `fetch`/axios-style requests. Every call
//! site is then matched against the route set and classified as exact,
//! method-mismatch, near-miss, orphan or ignored-external.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use route_linter::{scan, Analyzer, LinterConfig};
//! use std::path::Path;
//!
//! let backend = scan::collect_units(Path::new("server")).unwrap();
//! let frontend = scan::collect_units(Path::new("web")).unwrap();
//!
//! let report = Analyzer::new(LinterConfig::default())
//!     .analyze(&backend, &frontend)
//!     .unwrap();
//! print!("{}", route_linter::report::render_text(&report));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod scan;

// Re-exports for convenience
pub use config::LinterConfig;
pub use engine::{AnalysisReport, Analyzer, Summary};
pub use error::{LintError, Result};
pub use matcher::{DuplicateRoutes, Matcher};
pub use model::{
    CallMethod, CallSite, CallTarget, Classification, Diagnostic, DiagnosticKind, HttpMethod,
    MatchResult, ResolutionConfidence, RouteConfidence, RoutePattern, RouteRef, Segment,
    SourceLocation,
};
pub use normalize::{normalize, normalize_str, Dialect, NormalizedPath, PathExpr};
pub use parser::{parse_unit, SourceUnit};
