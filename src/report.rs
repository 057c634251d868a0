//! Human (Markdown) and JSON renderings of a finished run

use crate::host::MemorySink;
use crate::orchestrator::RunOutcome;
use chrono::Local;
use serde_json::{json, Value};
use std::fmt::Write;
use std::path::Path;

fn rel<'a>(root: &Path, p: &'a Path) -> std::borrow::Cow<'a, str> {
    p.strip_prefix(root).unwrap_or(p).to_string_lossy()
}

pub fn to_json(root: &Path, outcome: &RunOutcome, sink: &MemorySink) -> Value {
    json!({
        "projectRoot": root,
        "generatedAt": Local::now().to_rfc3339(),
        "outcome": outcome,
        "issues": sink.issues,
        "files": sink.files,
    })
}

pub fn to_markdown(root: &Path, outcome: &RunOutcome, sink: &MemorySink) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## TypeScript analysis: {}\n", root.display());
    let _ = writeln!(out, "_{}_\n", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let _ = writeln!(out, "**Config units**: {}", outcome.units.len());
    for unit in &outcome.units {
        let _ = writeln!(out, "- `{}` ({} files)", rel(root, &unit.config_path), unit.files);
    }
    if !outcome.unresolved.is_empty() {
        let _ = writeln!(
            out,
            "\n> [!WARNING]\n> {} files have no config and were not analyzed:",
            outcome.unresolved.len()
        );
        for p in &outcome.unresolved {
            let _ = writeln!(out, "> - `{}`", rel(root, p));
        }
    }

    let _ = writeln!(out, "\n### Issues ({})\n", sink.issues.len());
    for issue in &sink.issues {
        let _ = writeln!(
            out,
            "- `{}:{}:{}` **{}** {}",
            rel(root, &issue.file),
            issue.range.start.line,
            issue.range.start.column,
            issue.rule,
            issue.message.as_deref().unwrap_or("")
        );
    }

    let _ = writeln!(out, "\n### Metrics ({} files)\n", outcome.files_with_metrics);
    for (path, record) in &sink.files {
        let measures: Vec<String> = record
            .measures
            .iter()
            .map(|(m, v)| format!("{:?}={}", m, v))
            .collect();
        let _ = writeln!(
            out,
            "- `{}` {} | highlights={} cpd={}",
            rel(root, path),
            measures.join(" "),
            record.highlights.len(),
            record.cpd_tokens.len()
        );
    }

    if outcome.dropped > 0 {
        let _ = writeln!(
            out,
            "\n_{} failures, highlights or CPD tokens dropped during projection_",
            outcome.dropped
        );
    }

    if !outcome.skipped_metrics.is_empty() {
        let _ = writeln!(out, "\n> [!CAUTION]\n> Metrics skipped:");
        for s in &outcome.skipped_metrics {
            let _ = writeln!(out, "> - `{}`: {}", rel(root, &s.path), s.reason);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostSink, Metric, NewIssue, RuleKey, TextRange};
    use crate::orchestrator::SkippedMetrics;
    use std::path::PathBuf;

    #[test]
    fn test_markdown_lists_issues_and_skips() {
        let root = Path::new("/p");
        let mut sink = MemorySink::new();
        sink.save_issue(NewIssue {
            rule: RuleKey::typescript("S1751"),
            file: PathBuf::from("/p/src/a.ts"),
            range: TextRange::new(6, 5, 6, 6),
            message: Some("Remove this jump".into()),
        });
        sink.save_measure(Path::new("/p/src/a.ts"), Metric::Ncloc, 3);
        let outcome = RunOutcome {
            files_with_metrics: 1,
            skipped_metrics: vec![SkippedMetrics {
                path: PathBuf::from("/p/src/b.ts"),
                reason: "boom".into(),
            }],
            ..Default::default()
        };

        let md = to_markdown(root, &outcome, &sink);
        assert!(md.contains("`src/a.ts:6:5` **typescript:S1751** Remove this jump"));
        assert!(md.contains("Ncloc=3"));
        assert!(md.contains("`src/b.ts`: boom"));
    }

    #[test]
    fn test_json_shape() {
        let v = to_json(Path::new("/p"), &RunOutcome::default(), &MemorySink::new());
        assert_eq!(v["projectRoot"], "/p");
        assert!(v["issues"].as_array().unwrap().is_empty());
        assert_eq!(v["outcome"]["issues"], 0);
    }
}
