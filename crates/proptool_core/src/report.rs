use crate::validate::{Diagnostic, Severity};

/// Render diagnostics as a flat copyable block: errors first with a
/// count, then warnings. The output is what operators paste back into an
/// assistant for iterative repair, so every line carries the field name
/// and the expected/received detail when the rule has one.
pub fn format_report(diagnostics: &[Diagnostic]) -> String {
    let errors = by_severity(diagnostics, Severity::Error);
    let warnings = by_severity(diagnostics, Severity::Warning);

    let mut lines = Vec::new();
    lines.push(count_line(errors.len(), "error"));
    for diagnostic in &errors {
        lines.push(format_line(diagnostic));
    }
    lines.push(String::new());
    lines.push(count_line(warnings.len(), "warning"));
    for diagnostic in &warnings {
        lines.push(format_line(diagnostic));
    }
    lines.join("\n")
}

fn by_severity(diagnostics: &[Diagnostic], severity: Severity) -> Vec<&Diagnostic> {
    diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == severity)
        .collect()
}

fn count_line(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn format_line(diagnostic: &Diagnostic) -> String {
    let mut line = format!("- {}: {}", diagnostic.field, diagnostic.message);
    match (&diagnostic.expected, &diagnostic.received) {
        (Some(expected), Some(received)) => {
            line.push_str(&format!(" (expected: {expected}; received: {received})"));
        }
        (Some(expected), None) => line.push_str(&format!(" (expected: {expected})")),
        (None, Some(received)) => line.push_str(&format!(" (received: {received})")),
        (None, None) => {}
    }
    line
}

#[cfg(test)]
mod tests {
    use super::format_report;
    use crate::validate::Diagnostic;

    #[test]
    fn errors_come_first_with_counts() {
        let diagnostics = vec![
            Diagnostic::warning("extra", "unknown field; it will be ignored on import"),
            Diagnostic::error("title", "required field is missing or blank"),
            Diagnostic::error("title", "exceeds the maximum length")
                .expected("at most 200 characters")
                .received("230 characters"),
        ];
        let report = format_report(&diagnostics);
        let lines = report.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "2 errors");
        assert_eq!(lines[1], "- title: required field is missing or blank");
        assert_eq!(
            lines[2],
            "- title: exceeds the maximum length (expected: at most 200 characters; received: 230 characters)"
        );
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "1 warning");
        assert!(lines[5].starts_with("- extra:"));
    }

    #[test]
    fn clean_run_reports_zero_counts() {
        let report = format_report(&[]);
        assert!(report.starts_with("0 errors"));
        assert!(report.contains("0 warnings"));
    }
}
