//
//  matcher.rs
//  RouteLinter
//

//! Similarity matcher: ranks routes against each call site by segment shape.
//!
//! Parameter names never matter. A route parameter accepts any call
//! segment; literal segments are compared with normalized edit distance so
//! one-character typos surface as near-misses instead of orphans.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MatchingConfig;
use crate::model::{
    CallSite, CallTarget, Classification, HttpMethod, MatchResult, RoutePattern, RouteRef, Segment,
};

/// Tolerance for threshold comparisons on mean scores.
const SCORE_EPSILON: f64 = 1e-9;

/// Routes registered more than once with the same method and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRoutes {
    pub method: HttpMethod,
    pub path: String,
    pub routes: Vec<RouteRef>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    score: f64,
    /// Every compared position matched fully.
    exact: bool,
    method_ok: bool,
    params: usize,
}

impl Candidate {
    /// Strictly better, so the first-seen route keeps a full tie.
    ///
    /// Order: exactness, score, fewer params, then method compatibility.
    fn beats(&self, other: &Candidate) -> bool {
        if self.exact != other.exact {
            return self.exact;
        }
        if (self.score - other.score).abs() > SCORE_EPSILON {
            return self.score > other.score;
        }
        if self.params != other.params {
            return self.params < other.params;
        }
        self.method_ok && !other.method_ok
    }
}

/// Matches call sites against the full route set.
#[derive(Debug, Clone)]
pub struct Matcher {
    near_miss_threshold: f64,
    literal_vs_param_credit: f64,
}

impl Matcher {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            near_miss_threshold: config.near_miss_threshold,
            literal_vs_param_credit: config.literal_vs_param_credit,
        }
    }

    /// One result per call site that isn't UNRESOLVED, in input order.
    pub fn match_calls(&self, routes: &[RoutePattern], call_sites: &[CallSite]) -> Vec<MatchResult> {
        let results: Vec<MatchResult> = call_sites
            .par_iter()
            .filter_map(|call| self.match_call(routes, call))
            .collect();
        debug!(
            routes = routes.len(),
            call_sites = call_sites.len(),
            results = results.len(),
            "matched call sites"
        );
        results
    }

    /// Classify a single call site. `None` for UNRESOLVED targets.
    pub fn match_call(&self, routes: &[RoutePattern], call: &CallSite) -> Option<MatchResult> {
        let segments = match &call.target {
            CallTarget::Path { segments } => segments,
            CallTarget::Unresolved => return None,
            CallTarget::External { .. } => {
                return Some(MatchResult {
                    call_site: call.clone(),
                    best_route: None,
                    classification: Classification::IgnoredExternal,
                    score: 0.0,
                })
            }
        };

        let mut best: Option<Candidate> = None;
        for (index, route) in routes.iter().enumerate() {
            let Some((score, exact)) = self.score_route(route, segments) else {
                continue;
            };
            let candidate = Candidate {
                index,
                score,
                exact,
                method_ok: call.method.is_compatible(route.method),
                params: route.param_count(),
            };
            if best.map_or(true, |b| candidate.beats(&b)) {
                best = Some(candidate);
            }
        }

        let Some(best) = best else {
            return Some(MatchResult {
                call_site: call.clone(),
                best_route: None,
                classification: Classification::Orphan,
                score: 0.0,
            });
        };

        let classification = if best.exact && best.method_ok {
            Classification::Exact
        } else if best.exact {
            Classification::MethodMismatch
        } else if best.score + SCORE_EPSILON >= self.near_miss_threshold {
            Classification::NearMiss
        } else {
            Classification::Orphan
        };

        Some(MatchResult {
            call_site: call.clone(),
            best_route: Some(RouteRef {
                index: best.index,
                route: routes[best.index].clone(),
            }),
            classification,
            score: if best.exact { 1.0 } else { best.score },
        })
    }

    /// Mean per-position score of a route against call segments, plus
    /// whether every position matched fully. `None` if the route is filtered
    /// out by segment count.
    fn score_route(&self, route: &RoutePattern, call: &[Segment]) -> Option<(f64, bool)> {
        let pattern = &route.segments;
        let compared: &[Segment] = if route.ends_with_wildcard() {
            // The wildcard absorbs one or more trailing call segments.
            if pattern.len() > call.len() {
                return None;
            }
            &pattern[..pattern.len() - 1]
        } else {
            if call.len() < route.required_len() || call.len() > pattern.len() {
                return None;
            }
            &pattern[..call.len()]
        };

        let mut total = 0.0;
        let mut exact = true;
        for (expected, actual) in compared.iter().zip(call) {
            let contribution = self.segment_score(expected, actual);
            if contribution < 1.0 {
                exact = false;
            }
            total += contribution;
        }

        let mut positions = compared.len();
        if route.ends_with_wildcard() {
            total += 1.0;
            positions += 1;
        }
        if positions == 0 {
            return Some((1.0, true));
        }
        Some((total / positions as f64, exact))
    }

    fn segment_score(&self, expected: &Segment, actual: &Segment) -> f64 {
        match (expected, actual) {
            (Segment::Literal { value: a }, Segment::Literal { value: b }) => literal_similarity(a, b),
            // A runtime value might spell the literal, but that's unknown.
            (Segment::Literal { .. }, _) => self.literal_vs_param_credit,
            _ => 1.0,
        }
    }
}

/// `1 - levenshtein / max_len`, case-sensitive. Equal strings score 1.0.
pub fn literal_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Simple Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[m][n]
}

/// Routes with no `exact` call site anywhere, in route order.
pub fn unused_routes(routes: &[RoutePattern], results: &[MatchResult]) -> Vec<RouteRef> {
    let mut used = vec![false; routes.len()];
    for result in results {
        if result.classification != Classification::Exact {
            continue;
        }
        if let Some(best) = &result.best_route {
            if let Some(flag) = used.get_mut(best.index) {
                *flag = true;
            }
        }
    }
    routes
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(index, route)| RouteRef {
            index,
            route: route.clone(),
        })
        .collect()
}

/// Groups of structurally duplicate routes, ordered by first registration.
pub fn duplicate_routes(routes: &[RoutePattern]) -> Vec<DuplicateRoutes> {
    let mut grouped = vec![false; routes.len()];
    let mut groups = Vec::new();
    for (i, route) in routes.iter().enumerate() {
        if grouped[i] {
            continue;
        }
        let members: Vec<usize> = (i..routes.len())
            .filter(|&j| routes[j].is_duplicate_of(route))
            .collect();
        if members.len() < 2 {
            continue;
        }
        for &j in &members {
            grouped[j] = true;
        }
        groups.push(DuplicateRoutes {
            method: route.method,
            path: route.path(),
            routes: members
                .into_iter()
                .map(|index| RouteRef {
                    index,
                    route: routes[index].clone(),
                })
                .collect(),
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CallMethod, ResolutionConfidence, RouteConfidence, SourceLocation,
    };
    use crate::normalize::{normalize_str, Dialect};

    fn route(method: HttpMethod, path: &str) -> RoutePattern {
        let segments = match normalize_str(path, Dialect::Route).targets.remove(0) {
            CallTarget::Path { segments } => segments,
            other => panic!("bad route path {path}: {other:?}"),
        };
        RoutePattern {
            method,
            segments,
            raw_path: path.to_string(),
            location: SourceLocation::new("routes.js", 1, 1),
            middleware_count: 1,
            confidence: RouteConfidence::Certain,
        }
    }

    fn call(method: CallMethod, path: &str) -> CallSite {
        let normalized = normalize_str(path, Dialect::Call);
        CallSite {
            method,
            target: normalized.targets[0].clone(),
            raw_path: path.to_string(),
            location: SourceLocation::new("api.js", 1, 1),
            confidence: normalized.confidence,
        }
    }

    fn get(path: &str) -> CallSite {
        call(CallMethod::Known(HttpMethod::Get), path)
    }

    fn matcher() -> Matcher {
        Matcher::new(&MatchingConfig::default())
    }

    fn classify(routes: &[RoutePattern], call: CallSite) -> MatchResult {
        matcher().match_call(routes, &call).unwrap()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("users", "usres"), 2);
        assert_eq!(levenshtein("products", "productz"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert!((literal_similarity("products", "productz") - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_exact_match_ignores_param_names() {
        let routes = vec![route(HttpMethod::Get, "/api/users/:id")];
        let result = classify(&routes, get("/api/users/:userId"));
        assert_eq!(result.classification, Classification::Exact);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.best_route.unwrap().index, 0);
    }

    #[test]
    fn test_method_mismatch() {
        let routes = vec![
            route(HttpMethod::Get, "/api/users"),
            route(HttpMethod::Post, "/api/users"),
        ];
        let result = classify(&routes, call(CallMethod::Known(HttpMethod::Put), "/api/users"));
        assert_eq!(result.classification, Classification::MethodMismatch);
        assert_eq!(result.score, 1.0);

        // The method-compatible route wins an equal-score, equal-params tie.
        let result = classify(&routes, call(CallMethod::Known(HttpMethod::Post), "/api/users"));
        assert_eq!(result.classification, Classification::Exact);
        assert_eq!(result.best_route.unwrap().index, 1);

        // Fewer params outranks method compatibility.
        let routes = vec![
            route(HttpMethod::Get, "/api/users/:id"),
            route(HttpMethod::Post, "/api/users/me"),
        ];
        let result = classify(&routes, get("/api/users/me"));
        assert_eq!(result.classification, Classification::MethodMismatch);
        assert_eq!(result.best_route.unwrap().index, 1);
    }

    #[test]
    fn test_near_miss_typos() {
        let routes = vec![
            route(HttpMethod::Get, "/api/users"),
            route(HttpMethod::Get, "/api/products"),
        ];
        let result = classify(&routes, get("/api/usres"));
        assert_eq!(result.classification, Classification::NearMiss);
        assert!(result.score >= 0.8 && result.score < 1.0);
        assert_eq!(result.best_route.unwrap().index, 0);

        let result = classify(&routes, get("/api/productz"));
        assert_eq!(result.classification, Classification::NearMiss);
        assert!(result.score >= 0.8 && result.score < 1.0);
        assert_eq!(result.best_route.unwrap().index, 1);
    }

    #[test]
    fn test_orphans() {
        let routes = vec![
            route(HttpMethod::Get, "/api/users"),
            route(HttpMethod::Get, "/api/products"),
            route(HttpMethod::Get, "/api/users/:id"),
        ];
        let result = classify(&routes, get("/api/orders"));
        assert_eq!(result.classification, Classification::Orphan);
        assert!(result.score < 0.8);

        let result = classify(&[route(HttpMethod::Get, "/api/products")], get("/api/products/all"));
        assert_eq!(result.classification, Classification::Orphan);
        assert!(result.best_route.is_none());

        let result = classify(&routes, get("/api/users/:userId/profile"));
        assert_eq!(result.classification, Classification::Orphan);
    }

    #[test]
    fn test_wildcard_and_optional() {
        let routes = vec![
            route(HttpMethod::Get, "/assets/*"),
            route(HttpMethod::Get, "/files/:filename?"),
        ];
        assert_eq!(
            classify(&routes, get("/assets/css/site.css")).classification,
            Classification::Exact
        );
        assert_eq!(
            classify(&routes, get("/assets/logo.png")).classification,
            Classification::Exact
        );
        assert_eq!(classify(&routes, get("/assets")).classification, Classification::Orphan);
        assert_eq!(classify(&routes, get("/files")).classification, Classification::Exact);
        assert_eq!(
            classify(&routes, get("/files/report.pdf")).classification,
            Classification::Exact
        );
    }

    #[test]
    fn test_specific_route_wins_tie() {
        let routes = vec![
            route(HttpMethod::Get, "/api/users/:id"),
            route(HttpMethod::Get, "/api/users/me"),
        ];
        let result = classify(&routes, get("/api/users/me"));
        assert_eq!(result.classification, Classification::Exact);
        assert_eq!(result.best_route.unwrap().index, 1);
    }

    #[test]
    fn test_literal_route_against_param_call_is_not_exact() {
        let routes = vec![route(HttpMethod::Get, "/api/users/me")];
        let result = classify(&routes, get("/api/users/:id"));
        assert_eq!(result.classification, Classification::NearMiss);
        assert!((result.score - 2.5 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_method_matches_any() {
        let routes = vec![route(HttpMethod::Delete, "/api/users/:id")];
        let result = classify(&routes, call(CallMethod::Unresolved, "/api/users/:id"));
        assert_eq!(result.classification, Classification::Exact);
    }

    #[test]
    fn test_external_and_unresolved_calls() {
        let routes = vec![route(HttpMethod::Get, "/data")];
        let external = get("https://external-api.com/data");
        let unresolved = CallSite {
            method: CallMethod::Known(HttpMethod::Get),
            target: CallTarget::Unresolved,
            raw_path: "endpoint".into(),
            location: SourceLocation::new("api.js", 2, 1),
            confidence: ResolutionConfidence::Dynamic,
        };
        let results = matcher().match_calls(&routes, &[external, unresolved, get("/data")]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].classification, Classification::IgnoredExternal);
        assert!(results[0].best_route.is_none());
        assert_eq!(results[1].classification, Classification::Exact);
    }

    #[test]
    fn test_match_calls_preserves_order_and_is_deterministic() {
        let routes = vec![
            route(HttpMethod::Get, "/api/users"),
            route(HttpMethod::Get, "/api/users/:id"),
        ];
        let calls: Vec<CallSite> = (0..64)
            .map(|i| {
                if i % 2 == 0 {
                    get("/api/users")
                } else {
                    get(&format!("/api/users/{i}"))
                }
            })
            .collect();
        let first = matcher().match_calls(&routes, &calls);
        let second = matcher().match_calls(&routes, &calls);
        assert_eq!(first, second);
        for (i, result) in first.iter().enumerate() {
            assert_eq!(result.call_site, calls[i]);
        }
    }

    #[test]
    fn test_unused_routes() {
        let routes = vec![
            route(HttpMethod::Get, "/api/users"),
            route(HttpMethod::Delete, "/api/users/:id"),
        ];
        let results = matcher().match_calls(&routes, &[get("/api/users")]);
        let unused = unused_routes(&routes, &results);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].index, 1);
        assert_eq!(unused[0].route.method, HttpMethod::Delete);
    }

    #[test]
    fn test_duplicate_routes_first_seen_wins() {
        let routes = vec![
            route(HttpMethod::Get, "/api/items/:id"),
            route(HttpMethod::Get, "/api/other"),
            route(HttpMethod::Get, "/api/items/:itemId"),
        ];
        let groups = duplicate_routes(&routes);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].path, "/api/items/:id");
        let indices: Vec<usize> = groups[0].routes.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);

        let result = classify(&routes, get("/api/items/7"));
        assert_eq!(result.best_route.unwrap().index, 0);
    }
}
