//! Analysis orchestrator
//!
//! One run, in order:
//! 1. deploy the bundle and activate the rule set
//! 2. resolve config units (unresolved files are reported, not analyzed)
//! 3. rule check: every invocation failure is fatal for the run, and nothing
//!    reaches the host until every rule-check invocation has succeeded
//! 4. metrics: a failure only skips the unit/file it belongs to
//!
//! Metrics invocations run on the rayon pool. Projection into the host sink
//! happens under a single lock, one whole file at a time.

use crate::config::{AnalysisConfig, MetricsProtocol, RuleCheckScope};
use crate::engine::invoker::{CancelToken, Invoke};
use crate::engine::protocol::{self, MetricsRequest, MetricsResponse};
use crate::engine::{source_globs, ExecutableBundle, ExternalCommand, RuleCheckTarget};
use crate::error::{AnalysisError, AnalysisResult, InvocationError};
use crate::host::{HostSink, SourceFile, LANGUAGE_KEY};
use crate::projector;
use crate::resolver::{ConfigUnit, ConfigUnitResolver};
use crate::rules::RuleKeyMapper;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub config_path: PathBuf,
    pub files: usize,
}

/// A file (or whole unit) whose metrics could not be computed
#[derive(Debug, Clone, Serialize)]
pub struct SkippedMetrics {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunOutcome {
    pub units: Vec<UnitSummary>,
    pub unresolved: Vec<PathBuf>,
    pub issues: usize,
    pub files_with_metrics: usize,
    pub skipped_metrics: Vec<SkippedMetrics>,
    /// Result entries naming files outside the analyzed set, deduplicated
    pub dangling: Vec<PathBuf>,
    /// Failures, highlights and CPD tokens discarded during projection
    pub dropped: usize,
}

enum MetricsEvent {
    Projected(projector::Projected),
    Skipped(SkippedMetrics),
    Dangling(PathBuf),
}

pub struct AnalysisOrchestrator<'a> {
    config: &'a AnalysisConfig,
    mapper: &'a RuleKeyMapper,
    invoker: &'a dyn Invoke,
    cancel: CancelToken,
}

impl<'a> AnalysisOrchestrator<'a> {
    pub fn new(config: &'a AnalysisConfig, mapper: &'a RuleKeyMapper, invoker: &'a dyn Invoke) -> Self {
        Self {
            config,
            mapper,
            invoker,
            cancel: CancelToken::new(),
        }
    }

    /// Observe a host-level cancellation flag. The same token should be
    /// shared with the invoker so in-flight children get killed.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(
        &self,
        files: Vec<SourceFile>,
        project_root: &Path,
        bundle: &dyn ExecutableBundle,
        sink: &mut dyn HostSink,
    ) -> AnalysisResult<RunOutcome> {
        bundle.deploy()?;
        bundle.activate_rules(self.mapper)?;

        let (files, foreign): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| f.language() == LANGUAGE_KEY);
        for file in &foreign {
            debug!("Ignoring {} file {}", file.language(), file.path().display());
        }

        let resolution =
            ConfigUnitResolver::new(&self.config.config_file_name).resolve(files, project_root);
        let mut outcome = RunOutcome::default();
        for file in &resolution.unresolved {
            warn!(
                "No {} found for {}, file excluded from analysis",
                self.config.config_file_name,
                file.path().display()
            );
            outcome.unresolved.push(file.path().to_path_buf());
        }
        outcome.units = resolution
            .units
            .iter()
            .map(|u| UnitSummary {
                config_path: u.config_path.clone(),
                files: u.files.len(),
            })
            .collect();

        let units = resolution.units;
        if units.is_empty() {
            info!("Nothing to analyze");
            return Ok(outcome);
        }
        let known: HashSet<PathBuf> = units
            .iter()
            .flat_map(|u| u.files.iter().map(|f| f.path().to_path_buf()))
            .collect();
        info!("Analyzing {} files in {} config units", known.len(), units.len());

        self.run_rule_check(&units, project_root, bundle, &known, sink, &mut outcome)?;
        self.run_metrics(&units, bundle, sink, &mut outcome)?;
        outcome.dangling.sort();
        outcome.dangling.dedup();

        info!(
            "Analysis done: {} issues, metrics for {} files, {} skipped",
            outcome.issues,
            outcome.files_with_metrics,
            outcome.skipped_metrics.len()
        );
        Ok(outcome)
    }

    // ========================================================================
    // Rule check - fatal on any failure
    // ========================================================================

    fn run_rule_check(
        &self,
        units: &[ConfigUnit],
        project_root: &Path,
        bundle: &dyn ExecutableBundle,
        known: &HashSet<PathBuf>,
        sink: &mut dyn HostSink,
        outcome: &mut RunOutcome,
    ) -> AnalysisResult<()> {
        let globs = source_globs(project_root, &self.config.file_suffixes);
        // each command paired with the files whose failures it reports
        let commands: Vec<(ExternalCommand, HashSet<PathBuf>)> = match self.config.rule_check_scope {
            RuleCheckScope::Project => vec![(
                bundle.rule_check_command(RuleCheckTarget::Project {
                    root: project_root,
                    source_globs: &globs,
                }),
                known.clone(),
            )],
            RuleCheckScope::Unit => units
                .iter()
                .map(|u| {
                    let command = bundle.rule_check_command(RuleCheckTarget::Unit {
                        config_path: &u.config_path,
                    });
                    (command, u.files.iter().map(|f| f.path().to_path_buf()).collect())
                })
                .collect(),
        };

        let mut batches = Vec::with_capacity(commands.len());
        for (command, owned) in &commands {
            self.check_cancelled()?;
            let bytes = self
                .invoker
                .invoke(command, "", self.config.timeout)
                .map_err(fatal)?;
            let failures = protocol::decode_failures(&bytes).map_err(|source| {
                AnalysisError::MalformedRuleCheckResponse {
                    command_line: command.to_command_line(),
                    source,
                }
            })?;
            batches.push(projector::map_failures(&failures, self.mapper, owned, known)?);
        }

        for mapped in batches {
            outcome.dangling.extend(mapped.dangling.iter().cloned());
            let counts = projector::project_failures(mapped, sink);
            outcome.issues += counts.emitted;
            outcome.dropped += counts.dropped;
        }
        Ok(())
    }

    // ========================================================================
    // Metrics - best effort per unit/file
    // ========================================================================

    fn run_metrics(
        &self,
        units: &[ConfigUnit],
        bundle: &dyn ExecutableBundle,
        sink: &mut dyn HostSink,
        outcome: &mut RunOutcome,
    ) -> AnalysisResult<()> {
        self.check_cancelled()?;
        let command = bundle.metrics_command();
        let sink = Mutex::new(sink);

        let events: Vec<MetricsEvent> = match self.config.metrics_protocol {
            MetricsProtocol::Batch => units
                .par_iter()
                .flat_map_iter(|unit| self.metrics_for_unit(&command, unit, &sink))
                .collect(),
            MetricsProtocol::PerFile | MetricsProtocol::Legacy => units
                .iter()
                .flat_map(|u| u.files.iter())
                .collect::<Vec<_>>()
                .par_iter()
                .map(|file| self.metrics_for_file(&command, file, &sink))
                .collect(),
        };
        self.check_cancelled()?;

        for event in events {
            match event {
                MetricsEvent::Projected(counts) => {
                    outcome.files_with_metrics += 1;
                    outcome.dropped += counts.dropped;
                }
                MetricsEvent::Skipped(s) => outcome.skipped_metrics.push(s),
                MetricsEvent::Dangling(p) => outcome.dangling.push(p),
            }
        }
        Ok(())
    }

    fn metrics_for_unit(
        &self,
        command: &ExternalCommand,
        unit: &ConfigUnit,
        sink: &Mutex<&mut dyn HostSink>,
    ) -> Vec<MetricsEvent> {
        let request = MetricsRequest::Batch {
            filepaths: unit
                .files
                .iter()
                .map(|f| f.path().to_string_lossy().to_string())
                .collect(),
        };
        let responses = match self
            .invoke_metrics(command, &request)
            .and_then(|bytes| protocol::decode_batch(&bytes).map_err(|e| e.to_string()))
        {
            Ok(r) => r,
            Err(reason) => {
                error!(
                    "Metrics failed for unit {}, skipping its {} files: {}",
                    unit.config_path.display(),
                    unit.files.len(),
                    reason
                );
                return vec![MetricsEvent::Skipped(SkippedMetrics {
                    path: unit.config_path.clone(),
                    reason,
                })];
            }
        };

        let members: HashSet<&Path> = unit.files.iter().map(|f| f.path()).collect();
        let mut pending = members.clone();
        let mut events = Vec::with_capacity(unit.files.len());
        for response in responses {
            match response.filepath.as_deref() {
                Some(path) if pending.remove(path) => {
                    events.push(MetricsEvent::Projected(project_locked(sink, &response, path)));
                }
                Some(path) if members.contains(path) => {
                    debug!("Dropping repeated metrics entry for {}", path.display());
                }
                Some(path) => {
                    debug!("Dropping metrics for unknown file {}", path.display());
                    events.push(MetricsEvent::Dangling(path.to_path_buf()));
                }
                None => {
                    debug!(
                        "Dropping batch metrics entry without filepath from {}",
                        unit.config_path.display()
                    );
                }
            }
        }

        // keep input order for files the engine never answered for
        for file in unit.files.iter().filter(|f| pending.contains(f.path())) {
            warn!("No metrics returned for {}, skipping", file.path().display());
            events.push(MetricsEvent::Skipped(SkippedMetrics {
                path: file.path().to_path_buf(),
                reason: "missing from batch response".to_string(),
            }));
        }
        events
    }

    fn metrics_for_file(
        &self,
        command: &ExternalCommand,
        file: &SourceFile,
        sink: &Mutex<&mut dyn HostSink>,
    ) -> MetricsEvent {
        let response = file
            .contents()
            .map_err(|e| format!("cannot read file: {}", e))
            .map(|content| match self.config.metrics_protocol {
                MetricsProtocol::Legacy => MetricsRequest::Legacy { file_content: content },
                _ => MetricsRequest::PerFile {
                    file_content: content,
                    filepath: file.path().to_string_lossy().to_string(),
                },
            })
            .and_then(|request| self.invoke_metrics(command, &request))
            .and_then(|bytes| protocol::decode_single(&bytes).map_err(|e| e.to_string()));

        match response {
            Ok(response) => {
                // a per-file response is always about the file it was asked for
                if let Some(other) = response.filepath.as_deref().filter(|p| *p != file.path()) {
                    debug!("Dropping metrics for unexpected file {}", other.display());
                    return MetricsEvent::Dangling(other.to_path_buf());
                }
                MetricsEvent::Projected(project_locked(sink, &response, file.path()))
            }
            Err(reason) => {
                error!("Metrics failed for {}, skipping: {}", file.path().display(), reason);
                MetricsEvent::Skipped(SkippedMetrics {
                    path: file.path().to_path_buf(),
                    reason,
                })
            }
        }
    }

    fn invoke_metrics(&self, command: &ExternalCommand, request: &MetricsRequest) -> Result<Vec<u8>, String> {
        self.invoker
            .invoke(command, &request.to_json(), self.config.timeout)
            .map_err(|e| e.to_string())
    }

    fn check_cancelled(&self) -> AnalysisResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }
}

fn fatal(e: InvocationError) -> AnalysisError {
    match e {
        InvocationError::Cancelled { .. } => AnalysisError::Cancelled,
        other => AnalysisError::RuleCheck(other),
    }
}

fn project_locked(
    sink: &Mutex<&mut dyn HostSink>,
    response: &MetricsResponse,
    file: &Path,
) -> projector::Projected {
    let mut guard = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    projector::project_response(response, file, &mut **guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemorySink, Metric};
    use std::collections::HashMap;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Canned rule-check output (optionally per unit config path) plus
    /// metrics output keyed by request filepath.
    #[derive(Default)]
    struct FakeInvoker {
        rule_check: Option<Result<String, String>>,
        unit_checks: HashMap<String, Result<String, String>>,
        metrics: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl Invoke for FakeInvoker {
        fn invoke(&self, command: &ExternalCommand, body: &str, _: Duration) -> Result<Vec<u8>, InvocationError> {
            self.calls.lock().unwrap().push(command.executable.clone());
            let canned = if command.executable == "tslint" {
                command
                    .args
                    .first()
                    .and_then(|config| self.unit_checks.get(config))
                    .cloned()
                    .or_else(|| self.rule_check.clone())
                    .unwrap_or_else(|| Ok("[]".into()))
            } else {
                let req: serde_json::Value = serde_json::from_str(body).unwrap();
                let key = req["filepath"].as_str().unwrap_or("batch").to_string();
                self.metrics.get(&key).cloned().unwrap_or_else(|| Ok("{}".into()))
            };
            canned.map(String::into_bytes).map_err(|stderr| InvocationError::ToolReportedError {
                command_line: command.to_command_line(),
                stderr,
            })
        }
    }

    struct FakeBundle;

    impl ExecutableBundle for FakeBundle {
        fn rule_check_command(&self, target: RuleCheckTarget<'_>) -> ExternalCommand {
            match target {
                RuleCheckTarget::Unit { config_path } => {
                    ExternalCommand::new("tslint").arg(config_path.to_string_lossy().to_string())
                }
                RuleCheckTarget::Project { .. } => ExternalCommand::new("tslint"),
            }
        }

        fn metrics_command(&self) -> ExternalCommand {
            ExternalCommand::new("tsmetrics")
        }
    }

    fn project(files: &[&str]) -> (TempDir, Vec<SourceFile>) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("tsconfig.json"), "{}").unwrap();
        let files = files
            .iter()
            .map(|rel| {
                let p = tmp.path().join(rel);
                fs::create_dir_all(p.parent().unwrap()).unwrap();
                fs::write(&p, "let x = 1;\n").unwrap();
                SourceFile::new(p)
            })
            .collect();
        (tmp, files)
    }

    fn key(p: &Path) -> String {
        p.to_string_lossy().to_string()
    }

    fn failure_on(file: &Path) -> String {
        format!(
            r#"[{{"startPosition":{{"line":0,"character":0}},"endPosition":{{"line":0,"character":1}},"name":"{}","ruleName":"no-unconditional-jump"}}]"#,
            file.display()
        )
    }

    /// Root unit owning `a.ts`, nested `pkg` unit owning `pkg/b.ts`.
    fn nested_project() -> (TempDir, Vec<SourceFile>) {
        let (tmp, files) = project(&["a.ts", "pkg/b.ts"]);
        fs::write(tmp.path().join("pkg/tsconfig.json"), "{}").unwrap();
        (tmp, files)
    }

    fn per_file_config() -> AnalysisConfig {
        AnalysisConfig {
            metrics_protocol: MetricsProtocol::PerFile,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_rule_check_failure_is_fatal() {
        let (tmp, files) = project(&["a.ts"]);
        let invoker = FakeInvoker {
            rule_check: Some(Err("type-check failed".into())),
            ..Default::default()
        };
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();
        let err = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap_err();

        assert!(matches!(
            err.invocation(),
            Some(InvocationError::ToolReportedError { .. })
        ));
        assert!(sink.issues.is_empty());
        // metrics never ran
        assert!(invoker.calls.lock().unwrap().iter().all(|c| c == "tslint"));
    }

    #[test]
    fn test_metrics_failure_is_isolated() {
        let (tmp, files) = project(&["a.ts", "b.ts", "c.ts"]);
        let path = |rel: &str| tmp.path().join(rel);
        let mut metrics = HashMap::new();
        metrics.insert(path("a.ts").to_string_lossy().to_string(), Ok(r#"{"ncloc":[1]}"#.to_string()));
        metrics.insert(path("b.ts").to_string_lossy().to_string(), Err("crash".to_string()));
        metrics.insert(path("c.ts").to_string_lossy().to_string(), Ok(r#"{"ncloc":[1,2]}"#.to_string()));
        let invoker = FakeInvoker { metrics, ..Default::default() };
        let config = per_file_config();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();

        let outcome = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap();

        assert_eq!(outcome.files_with_metrics, 2);
        assert_eq!(outcome.skipped_metrics.len(), 1);
        assert_eq!(outcome.skipped_metrics[0].path, path("b.ts"));
        assert_eq!(sink.measure(&path("a.ts"), Metric::Ncloc), Some(1));
        assert_eq!(sink.measure(&path("c.ts"), Metric::Ncloc), Some(2));
        assert!(sink.file(&path("b.ts")).is_none());
    }

    #[test]
    fn test_unmapped_rule_in_output_is_fatal() {
        let (tmp, files) = project(&["a.ts"]);
        let failure = format!(
            r#"[{{"startPosition":{{"line":0,"character":0}},"endPosition":{{"line":0,"character":1}},"name":"{}","ruleName":"no-magic-numbers"}}]"#,
            tmp.path().join("a.ts").display()
        );
        let invoker = FakeInvoker {
            rule_check: Some(Ok(failure)),
            ..Default::default()
        };
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::from_active_rules(["S1751"]).unwrap();
        let mut sink = MemorySink::new();
        let err = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnmappedRuleKey(_)));
    }

    #[test]
    fn test_malformed_rule_output_is_fatal() {
        let (tmp, files) = project(&["a.ts"]);
        let invoker = FakeInvoker {
            rule_check: Some(Ok("Segmentation fault".into())),
            ..Default::default()
        };
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();
        let err = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRuleCheckResponse { .. }));
    }

    #[test]
    fn test_unresolved_files_are_reported_and_skipped() {
        let tmp = TempDir::new().unwrap();
        let orphan = tmp.path().join("orphan.ts");
        fs::write(&orphan, "").unwrap();
        let invoker = FakeInvoker::default();
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();

        let outcome = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(vec![SourceFile::new(&orphan)], tmp.path(), &FakeBundle, &mut sink)
            .unwrap();
        assert_eq!(outcome.unresolved, vec![orphan]);
        assert!(outcome.units.is_empty());
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_run_stops_before_invoking() {
        let (tmp, files) = project(&["a.ts"]);
        let invoker = FakeInvoker::default();
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let token = CancelToken::new();
        token.cancel();
        let mut sink = MemorySink::new();
        let err = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .with_cancel(token)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_one_rule_check_per_unit() {
        let (tmp, mut files) = project(&["a.ts"]);
        let nested = tmp.path().join("pkg");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("tsconfig.json"), "{}").unwrap();
        fs::write(nested.join("b.ts"), "").unwrap();
        files.push(SourceFile::new(nested.join("b.ts")));

        let invoker = FakeInvoker::default();
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();
        let outcome = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap();

        assert_eq!(outcome.units.len(), 2);
        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|c| *c == "tslint").count(), 2);
        // batch metrics: one call per unit
        assert_eq!(calls.iter().filter(|c| *c == "tsmetrics").count(), 2);
    }

    #[test]
    fn test_nested_unit_failures_are_reported_once() {
        let (tmp, files) = nested_project();
        let b = tmp.path().join("pkg/b.ts");
        // the outer program also type-checks the nested package
        let mut unit_checks = HashMap::new();
        unit_checks.insert(key(&tmp.path().join("tsconfig.json")), Ok(failure_on(&b)));
        unit_checks.insert(key(&tmp.path().join("pkg/tsconfig.json")), Ok(failure_on(&b)));
        let invoker = FakeInvoker { unit_checks, ..Default::default() };
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();

        let outcome = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap();

        assert_eq!(outcome.issues, 1);
        assert_eq!(sink.issues.len(), 1);
        assert_eq!(sink.issues[0].file, b);
        assert!(outcome.dangling.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_failed_unit_discards_issues_of_earlier_units() {
        let (tmp, files) = nested_project();
        // units run in config path order: pkg/ first, then the root
        let mut unit_checks = HashMap::new();
        unit_checks.insert(
            key(&tmp.path().join("pkg/tsconfig.json")),
            Ok(failure_on(&tmp.path().join("pkg/b.ts"))),
        );
        unit_checks.insert(key(&tmp.path().join("tsconfig.json")), Err("boom".into()));
        let invoker = FakeInvoker { unit_checks, ..Default::default() };
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();

        let err = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap_err();

        assert!(matches!(err, AnalysisError::RuleCheck(InvocationError::ToolReportedError { .. })));
        assert_eq!(invoker.calls.lock().unwrap().iter().filter(|c| *c == "tslint").count(), 2);
        assert!(sink.issues.is_empty());
    }

    #[test]
    fn test_file_missing_from_batch_response_is_skipped() {
        let (tmp, files) = project(&["a.ts", "b.ts"]);
        let a = tmp.path().join("a.ts");
        let mut metrics = HashMap::new();
        metrics.insert(
            "batch".to_string(),
            Ok(format!(r#"[{{"filepath":"{}","ncloc":[1]}}]"#, a.display())),
        );
        let invoker = FakeInvoker { metrics, ..Default::default() };
        let config = AnalysisConfig::default();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();

        let outcome = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap();

        assert_eq!(outcome.files_with_metrics, 1);
        assert_eq!(outcome.skipped_metrics.len(), 1);
        assert_eq!(outcome.skipped_metrics[0].path, tmp.path().join("b.ts"));
        assert_eq!(outcome.skipped_metrics[0].reason, "missing from batch response");
        assert_eq!(sink.measure(&a, Metric::Ncloc), Some(1));
    }

    #[test]
    fn test_files_of_other_languages_are_ignored() {
        let (tmp, mut files) = project(&["a.ts"]);
        let js = tmp.path().join("b.js");
        fs::write(&js, "").unwrap();
        files.push(SourceFile::new(&js).with_language("js"));
        let invoker = FakeInvoker::default();
        let config = per_file_config();
        let mapper = RuleKeyMapper::all();
        let mut sink = MemorySink::new();

        let outcome = AnalysisOrchestrator::new(&config, &mapper, &invoker)
            .run(files, tmp.path(), &FakeBundle, &mut sink)
            .unwrap();

        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].files, 1);
        assert!(outcome.unresolved.is_empty());
        assert!(sink.file(&js).is_none());
    }
}
