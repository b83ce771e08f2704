//! Plain-text and JSON rendering of an [`AnalysisReport`].

use crate::engine::AnalysisReport;
use crate::error::Result;
use crate::model::{Classification, MatchResult, RouteConfidence};

/// Render the report as JSON.
pub fn render_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render the report as human-readable text: discrepancies first, then
/// review items, then a summary line.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut output = String::new();

    section(
        &mut output,
        "Method mismatches",
        report.classified(Classification::MethodMismatch),
    );
    section(
        &mut output,
        "Near misses (possible typos)",
        report.classified(Classification::NearMiss),
    );
    section(
        &mut output,
        "Orphan calls",
        report.classified(Classification::Orphan),
    );

    if !report.unused_routes.is_empty() {
        output.push_str("Unused routes\n");
        for unused in &report.unused_routes {
            let flag = match unused.route.confidence {
                RouteConfidence::Certain => "",
                RouteConfidence::Inferred => " (inferred router)",
            };
            output.push_str(&format!(
                "  {}  {}{}\n",
                unused.route, unused.route.location, flag
            ));
        }
        output.push('\n');
    }

    if !report.duplicate_routes.is_empty() {
        output.push_str("Duplicate routes\n");
        for group in &report.duplicate_routes {
            output.push_str(&format!("  {} {}\n", group.method, group.path));
            for member in &group.routes {
                output.push_str(&format!("    {}\n", member.route.location));
            }
        }
        output.push('\n');
    }

    if !report.unresolved.is_empty() {
        output.push_str("Needs manual review (unresolved paths)\n");
        for call in &report.unresolved {
            output.push_str(&format!(
                "  {} {}  {}\n",
                call.method, call.raw_path, call.location
            ));
        }
        output.push('\n');
    }

    if !report.diagnostics.is_empty() {
        output.push_str("Diagnostics\n");
        for diagnostic in &report.diagnostics {
            output.push_str(&format!(
                "  {}  {}\n",
                diagnostic.location, diagnostic.message
            ));
        }
        output.push('\n');
    }

    let s = report.summary();
    output.push_str(&format!(
        "{} routes, {} call sites: {} exact, {} method-mismatch, {} near-miss, {} orphan, {} external, {} unresolved, {} unused routes\n",
        s.routes,
        s.call_sites,
        s.exact,
        s.method_mismatch,
        s.near_miss,
        s.orphan,
        s.ignored_external,
        s.unresolved,
        s.unused_routes
    ));
    output
}

fn section<'a>(output: &mut String, title: &str, results: impl Iterator<Item = &'a MatchResult>) {
    let results: Vec<&MatchResult> = results.collect();
    if results.is_empty() {
        return;
    }
    output.push_str(&format!("{title}\n"));
    for result in results {
        output.push_str(&format!(
            "  {}  {}",
            result.call_site, result.call_site.location
        ));
        match &result.best_route {
            Some(best) => {
                output.push_str(&format!(
                    "\n    closest: {} ({:.2})  {}\n",
                    best.route, result.score, best.route.location
                ));
            }
            None => output.push('\n'),
        }
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinterConfig;
    use crate::engine::Analyzer;
    use crate::parser::SourceUnit;

    fn report() -> AnalysisReport {
        let backend = vec![SourceUnit::new(
            "routes.js",
            "router.get('/api/users', h);\nrouter.delete('/api/users/:id', h);",
        )];
        let frontend = vec![SourceUnit::new(
            "api.js",
            "fetch('/api/usres');\nfetch('/api/users');\nfetch(url);",
        )];
        Analyzer::new(LinterConfig::default())
            .analyze(&backend, &frontend)
            .unwrap()
    }

    #[test]
    fn test_render_text_sections() {
        let text = render_text(&report());
        assert!(text.contains("Near misses (possible typos)"));
        assert!(text.contains("GET /api/usres"));
        assert!(text.contains("closest: GET /api/users (0.80)"));
        assert!(text.contains("Unused routes\n  DELETE /api/users/:id"));
        assert!(text.contains("Needs manual review"));
        assert!(!text.contains("Orphan calls"));
        assert!(text.ends_with("1 unused routes\n"));
    }

    #[test]
    fn test_render_json_is_readable_back() {
        let original = report();
        let json = render_json(&original).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][0]["classification"], "near-miss");
        assert_eq!(value["routes"][0]["segments"][0]["kind"], "literal");
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary(), original.summary());
        assert_eq!(parsed.routes, original.routes);
    }
}
