// ============================================================================
// ResultProjector - decoded engine output -> host calls
// ============================================================================
//
// Coordinate contract:
// - engine lines are 0-based, host lines 1-based: every Failure, highlight
//   and CPD position gets +1 on the line, columns pass through
// - highlight/CPD spans with end <= start are dropped
// - metric line arrays (ncloc, commentLines, ...) are already host lines
// ============================================================================

use crate::engine::protocol::{Failure, MetricsResponse, Position};
use crate::error::UnmappedRuleKey;
use crate::host::{HostSink, LineDataKey, Metric, NewIssue, TextRange, TypeOfText};
use crate::rules::RuleKeyMapper;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Counters of one projection
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Projected {
    pub emitted: usize,
    pub dropped: usize,
}

impl std::ops::AddAssign for Projected {
    fn add_assign(&mut self, other: Self) {
        self.emitted += other.emitted;
        self.dropped += other.dropped;
    }
}

/// `None` when a line does not fit host coordinates.
fn host_range(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Option<TextRange> {
    Some(TextRange::new(
        start_line.checked_add(1)?,
        start_col,
        end_line.checked_add(1)?,
        end_col,
    ))
}

fn position_range(start: Position, end: Position) -> Option<TextRange> {
    host_range(start.line, start.character, end.line, end.character)
}

/// Failures of one rule-check invocation, resolved but not yet saved
#[derive(Debug, Default)]
pub struct MappedFailures {
    pub issues: Vec<NewIssue>,
    /// Failures on files owned by another config unit of the run
    pub foreign: usize,
    /// Failures with positions outside host coordinates
    pub out_of_range: usize,
    /// Files named by failures but not part of the analyzed set
    pub dangling: Vec<PathBuf>,
}

/// Resolve failures against the analyzed file set without touching the host.
///
/// Only failures on `owned` files become issues. A file of `known` that is
/// not owned belongs to another unit, which reports it itself. Anything else
/// is dangling. An unmapped rule key fails the whole batch.
pub fn map_failures(
    failures: &[Failure],
    mapper: &RuleKeyMapper,
    owned: &HashSet<PathBuf>,
    known: &HashSet<PathBuf>,
) -> Result<MappedFailures, UnmappedRuleKey> {
    debug!("TypeScript analysis raised {} issues", failures.len());
    let mut mapped = MappedFailures::default();
    for failure in failures {
        if !owned.contains(&failure.name) {
            if known.contains(&failure.name) {
                debug!(
                    "Dropping {} failure on {}, owned by another config unit",
                    failure.rule_name,
                    failure.name.display()
                );
                mapped.foreign += 1;
            } else {
                debug!(
                    "Dropping {} failure on unknown file {}",
                    failure.rule_name,
                    failure.name.display()
                );
                mapped.dangling.push(failure.name.clone());
            }
            continue;
        }
        let rule = mapper.to_host_key(&failure.rule_name)?;
        let range = match position_range(failure.start_position, failure.end_position) {
            Some(range) => range,
            None => {
                warn!(
                    "Dropping {} failure with out-of-range position in {}",
                    failure.rule_name,
                    failure.name.display()
                );
                mapped.out_of_range += 1;
                continue;
            }
        };
        mapped.issues.push(NewIssue {
            rule,
            file: failure.name.clone(),
            range,
            message: failure.failure.clone(),
        });
    }
    Ok(mapped)
}

/// Save one issue per mapped failure.
pub fn project_failures(mapped: MappedFailures, sink: &mut dyn HostSink) -> Projected {
    let counts = Projected {
        emitted: mapped.issues.len(),
        dropped: mapped.foreign + mapped.out_of_range + mapped.dangling.len(),
    };
    for issue in mapped.issues {
        sink.save_issue(issue);
    }
    counts
}

pub fn project_highlights(response: &MetricsResponse, file: &Path, sink: &mut dyn HostSink) -> Projected {
    let mut counts = Projected::default();
    for h in &response.highlights {
        let range = match host_range(h.start_line, h.start_col, h.end_line, h.end_col) {
            Some(range) if !range.is_degenerate() => range,
            _ => {
                counts.dropped += 1;
                continue;
            }
        };
        match TypeOfText::from_tag(&h.text_type) {
            Some(kind) => {
                sink.highlight(file, range, kind);
                counts.emitted += 1;
            }
            None => {
                warn!("Unknown highlight type '{}' in {}", h.text_type, file.display());
                counts.dropped += 1;
            }
        }
    }
    counts
}

pub fn project_duplication(response: &MetricsResponse, file: &Path, sink: &mut dyn HostSink) -> Projected {
    let mut counts = Projected::default();
    for t in &response.cpd_tokens {
        let range = match host_range(t.start_line, t.start_col, t.end_line, t.end_col) {
            Some(range) if !range.is_degenerate() => range,
            _ => {
                counts.dropped += 1;
                continue;
            }
        };
        sink.cpd_token(file, range, &t.image);
        counts.emitted += 1;
    }
    counts
}

pub fn project_metrics(response: &MetricsResponse, file: &Path, sink: &mut dyn HostSink) {
    sink.save_measure(file, Metric::Functions, response.functions);
    sink.save_measure(file, Metric::Statements, response.statements);
    sink.save_measure(file, Metric::Classes, response.classes);

    // line measures are cardinalities, never transmitted scalars
    sink.save_measure(file, Metric::Ncloc, response.ncloc.len() as i64);
    sink.save_measure(file, Metric::CommentLines, response.comment_lines.len() as i64);
    sink.save_measure(file, Metric::ExecutableLines, response.executable_lines.len() as i64);

    let no_sonar: BTreeSet<u32> = response.nosonar_lines.iter().copied().collect();
    sink.no_sonar_lines(file, no_sonar);

    for (key, lines) in [
        (LineDataKey::NclocData, &response.ncloc),
        (LineDataKey::CommentLinesData, &response.comment_lines),
        (LineDataKey::ExecutableLinesData, &response.executable_lines),
    ] {
        for line in lines {
            sink.set_line_value(file, key, *line, 1);
        }
    }
}

/// Everything a metrics response carries for one file. Counts cover
/// highlights and CPD tokens.
pub fn project_response(response: &MetricsResponse, file: &Path, sink: &mut dyn HostSink) -> Projected {
    let mut counts = project_highlights(response, file, sink);
    let c = project_duplication(response, file, sink);
    project_metrics(response, file, sink);
    if counts.dropped + c.dropped > 0 {
        debug!(
            "{}: dropped {} highlights and {} CPD tokens",
            file.display(),
            counts.dropped,
            c.dropped
        );
    }
    counts += c;
    counts
}
