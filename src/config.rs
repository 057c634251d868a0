//! Analysis settings with their defaults. The CLI overrides individual fields.

use crate::engine::invoker::DEFAULT_TIMEOUT;
use crate::rules;
use clap::ValueEnum;
use serde_json::Value;
use std::time::Duration;

/// How rule-check invocations are addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleCheckScope {
    /// One global pass over the project root
    Project,
    /// One pass per config unit (`--project <tsconfig>`)
    Unit,
}

/// Request shape of the metrics command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricsProtocol {
    /// `{filepaths}` once per config unit
    Batch,
    /// `{fileContent, filepath}` once per file
    PerFile,
    /// `{file_content}` once per file
    Legacy,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub config_file_name: String,
    pub file_suffixes: Vec<String>,
    pub timeout: Duration,
    pub rule_check_scope: RuleCheckScope,
    pub metrics_protocol: MetricsProtocol,
    /// Host rule keys (`S1751`)
    pub active_rules: Vec<String>,
    /// Host rule key -> tslint options
    pub rule_parameters: Vec<(String, Value)>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            config_file_name: "tsconfig.json".to_string(),
            file_suffixes: vec![".ts".to_string(), ".tsx".to_string()],
            timeout: DEFAULT_TIMEOUT,
            rule_check_scope: RuleCheckScope::Unit,
            metrics_protocol: MetricsProtocol::Batch,
            active_rules: rules::sonar_way_keys(),
            rule_parameters: Vec::new(),
        }
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize suffixes to a leading dot (`ts` -> `.ts`).
pub fn normalize_suffixes(raw: &str) -> Vec<String> {
    parse_list(raw)
        .into_iter()
        .map(|s| if s.starts_with('.') { s } else { format!(".{}", s) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.timeout, Duration::from_millis(600_000));
        assert_eq!(cfg.file_suffixes, vec![".ts", ".tsx"]);
        assert_eq!(cfg.active_rules, vec!["S1751", "S1764", "S2201"]);
    }

    #[test]
    fn test_suffix_normalization() {
        assert_eq!(normalize_suffixes("ts, .tsx,,"), vec![".ts", ".tsx"]);
        assert_eq!(parse_list(" S1751 ,S109"), vec!["S1751", "S109"]);
    }
}
