use crate::report::report_model::SuiteReport;

// ============================================================================
// Console reporter
// ============================================================================

/// Format a suite report for terminal output.
///
/// ```text
/// === learn ===
///
/// ✓ PASS  Login (3 steps, 2 new edges)
/// ✗ FAIL  Checkout (0 steps)
///     [ERROR] step 2 (click "Pay"): could not resolve an action: ...
///
/// === Results: 1 passed, 1 failed (2 total) ===
/// ```
pub fn format_console_report(report: &SuiteReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n\n", report.mode));

    for outcome in &report.outcomes {
        let marker = if outcome.passed {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };

        out.push_str(&format!("{}  {} ({} steps", marker, outcome.name, outcome.steps));
        if outcome.edges_recorded > 0 {
            out.push_str(&format!(", {} new edges", outcome.edges_recorded));
        }
        out.push_str(")\n");

        if let Some(ref error) = outcome.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        report.passed, report.failed, report.total
    ));

    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");

    out
}
