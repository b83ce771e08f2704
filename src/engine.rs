//
//  engine.rs
//  RouteLinter
//

//! Analysis pipeline: parallel extraction, then matching.
//!
//! Backend and frontend units are extracted concurrently. Matching starts
//! only once both sides are complete, because no call site can be
//! classified before the full route set is known.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LinterConfig;
use crate::error::{LintError, Result};
use crate::extract::{CallSiteExtractor, RouteExtractor, UnitCalls, UnitRoutes};
use crate::matcher::{duplicate_routes, unused_routes, DuplicateRoutes, Matcher};
use crate::model::{CallSite, Classification, Diagnostic, MatchResult, RoutePattern, RouteRef};
use crate::parser::{parse_unit, ParseOutcome, SourceUnit};

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub routes: Vec<RoutePattern>,
    /// One result per call site that isn't UNRESOLVED, in extraction order.
    pub results: Vec<MatchResult>,
    /// Routes with no `exact` call site.
    pub unused_routes: Vec<RouteRef>,
    /// Call sites kept for manual review; never matched.
    pub unresolved: Vec<CallSite>,
    pub duplicate_routes: Vec<DuplicateRoutes>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Counts shown at the end of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub routes: usize,
    pub call_sites: usize,
    pub exact: usize,
    pub method_mismatch: usize,
    pub near_miss: usize,
    pub orphan: usize,
    pub ignored_external: usize,
    pub unresolved: usize,
    pub unused_routes: usize,
    pub duplicate_routes: usize,
    pub diagnostics: usize,
}

impl AnalysisReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            routes: self.routes.len(),
            call_sites: self.results.len() + self.unresolved.len(),
            unresolved: self.unresolved.len(),
            unused_routes: self.unused_routes.len(),
            duplicate_routes: self.duplicate_routes.len(),
            diagnostics: self.diagnostics.len(),
            ..Summary::default()
        };
        for result in &self.results {
            match result.classification {
                Classification::Exact => summary.exact += 1,
                Classification::MethodMismatch => summary.method_mismatch += 1,
                Classification::NearMiss => summary.near_miss += 1,
                Classification::Orphan => summary.orphan += 1,
                Classification::IgnoredExternal => summary.ignored_external += 1,
            }
        }
        summary
    }

    /// Results with a likely bug behind them.
    pub fn discrepancies(&self) -> impl Iterator<Item = &MatchResult> {
        self.results
            .iter()
            .filter(|r| r.classification.is_discrepancy())
    }

    pub fn has_discrepancies(&self) -> bool {
        self.discrepancies().next().is_some()
    }

    /// Results with the given classification.
    pub fn classified(&self, classification: Classification) -> impl Iterator<Item = &MatchResult> {
        self.results
            .iter()
            .filter(move |r| r.classification == classification)
    }
}

/// Runs the whole pipeline with one configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    route_extractor: RouteExtractor,
    call_extractor: CallSiteExtractor,
    matcher: Matcher,
}

impl Analyzer {
    pub fn new(config: LinterConfig) -> Self {
        Self {
            matcher: Matcher::new(&config.matching),
            route_extractor: RouteExtractor::new(config.clone()),
            call_extractor: CallSiteExtractor::new(config),
        }
    }

    /// Analyse backend units against frontend units.
    pub fn analyze(&self, backend: &[SourceUnit], frontend: &[SourceUnit]) -> Result<AnalysisReport> {
        validate_units(backend)?;
        validate_units(frontend)?;

        let (routes, calls) = rayon::join(
            || self.extract_routes(backend),
            || self.extract_calls(frontend),
        );
        let routes = routes?;
        let calls = calls?;

        let results = self.matcher.match_calls(&routes.routes, &calls.call_sites);
        let unused_routes = unused_routes(&routes.routes, &results);
        let duplicate_routes = duplicate_routes(&routes.routes);
        let unresolved: Vec<CallSite> = calls
            .call_sites
            .iter()
            .filter(|c| c.is_unresolved())
            .cloned()
            .collect();

        let mut diagnostics = routes.diagnostics;
        diagnostics.extend(calls.diagnostics);

        let report = AnalysisReport {
            routes: routes.routes,
            results,
            unused_routes,
            unresolved,
            duplicate_routes,
            diagnostics,
        };
        info!(
            backend_units = backend.len(),
            frontend_units = frontend.len(),
            routes = report.routes.len(),
            results = report.results.len(),
            "analysis complete"
        );
        Ok(report)
    }

    /// Extract routes from every backend unit, concatenated in unit order.
    pub fn extract_routes(&self, units: &[SourceUnit]) -> Result<UnitRoutes> {
        validate_units(units)?;
        let per_unit: Vec<UnitRoutes> = units
            .par_iter()
            .map(|unit| -> Result<UnitRoutes> {
                match parse_unit(unit)? {
                    ParseOutcome::Parsed(parsed) => Ok(self.route_extractor.extract(&parsed)),
                    ParseOutcome::Skipped(diagnostic) => {
                        warn!(file = %unit.path.display(), reason = %diagnostic.message, "skipping backend unit");
                        Ok(UnitRoutes {
                            routes: Vec::new(),
                            diagnostics: vec![diagnostic],
                        })
                    }
                }
            })
            .collect::<Result<_>>()?;

        let mut merged = UnitRoutes::default();
        for unit in per_unit {
            merged.routes.extend(unit.routes);
            merged.diagnostics.extend(unit.diagnostics);
        }
        debug!(units = units.len(), routes = merged.routes.len(), "backend extraction done");
        Ok(merged)
    }

    /// Extract call sites from every frontend unit, concatenated in unit order.
    pub fn extract_calls(&self, units: &[SourceUnit]) -> Result<UnitCalls> {
        validate_units(units)?;
        let per_unit: Vec<UnitCalls> = units
            .par_iter()
            .map(|unit| -> Result<UnitCalls> {
                match parse_unit(unit)? {
                    ParseOutcome::Parsed(parsed) => Ok(self.call_extractor.extract(&parsed)),
                    ParseOutcome::Skipped(diagnostic) => {
                        warn!(file = %unit.path.display(), reason = %diagnostic.message, "skipping frontend unit");
                        Ok(UnitCalls {
                            call_sites: Vec::new(),
                            diagnostics: vec![diagnostic],
                        })
                    }
                }
            })
            .collect::<Result<_>>()?;

        let mut merged = UnitCalls::default();
        for unit in per_unit {
            merged.call_sites.extend(unit.call_sites);
            merged.diagnostics.extend(unit.diagnostics);
        }
        debug!(
            units = units.len(),
            call_sites = merged.call_sites.len(),
            "frontend extraction done"
        );
        Ok(merged)
    }
}

/// A unit without a path is a caller bug, not a source oddity.
fn validate_units(units: &[SourceUnit]) -> Result<()> {
    match units.iter().position(|u| u.path.as_os_str().is_empty()) {
        Some(index) => Err(LintError::InvalidSourceUnit(index)),
        None => Ok(()),
    }
}
