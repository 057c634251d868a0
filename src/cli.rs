//! Command handlers behind the `tsbridge` binary

use crate::config::{self, AnalysisConfig, MetricsProtocol, RuleCheckScope};
use crate::discovery;
use crate::engine::bundle::DeployedBundle;
use crate::engine::invoker::{CancelToken, ProcessInvoker};
use crate::error::InvocationError;
use crate::host::MemorySink;
use crate::orchestrator::AnalysisOrchestrator;
use crate::report;
use crate::resolver::ConfigUnitResolver;
use crate::rules::{self, RuleKeyMapper, KNOWN_RULES};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the external analyzer over a project
    Scan {
        /// Project root
        #[arg(short, long, default_value = ".")]
        path: String,

        /// Directory the SonarTS bundle was deployed to
        #[arg(short, long)]
        bundle: String,

        /// node executable used to launch the bundle
        #[arg(long, default_value = "node")]
        node: String,

        /// Activated host rule keys, comma separated, or `all`
        /// (default: the Sonar way profile)
        #[arg(long)]
        rules: Option<String>,

        /// tslint options of an activated rule, e.g. `S103=[true,120]` or `S103=120`
        #[arg(long = "rule-param", value_name = "KEY=JSON")]
        rule_params: Vec<String>,

        /// Per-invocation timeout
        #[arg(long, default_value_t = 600_000)]
        timeout_ms: u64,

        #[arg(long, value_enum, default_value_t = RuleCheckScope::Unit)]
        scope: RuleCheckScope,

        #[arg(long, value_enum, default_value_t = MetricsProtocol::Batch)]
        protocol: MetricsProtocol,

        /// File suffixes to analyze
        #[arg(long, default_value = ".ts,.tsx")]
        suffixes: String,

        /// Name of the config file owning a unit
        #[arg(long, default_value = "tsconfig.json")]
        config_file: String,
    },

    /// Show how files group into config units
    Units {
        #[arg(short, long, default_value = ".")]
        path: String,

        #[arg(long, default_value = ".ts,.tsx")]
        suffixes: String,

        #[arg(long, default_value = "tsconfig.json")]
        config_file: String,
    },

    /// List the tslint <-> host rule table
    Rules,
}

pub fn handle_command(command: Command, json_output: bool) -> Result<()> {
    match command {
        Command::Scan {
            path,
            bundle,
            node,
            rules: rule_list,
            rule_params,
            timeout_ms,
            scope,
            protocol,
            suffixes,
            config_file,
        } => {
            let active_rules = match rule_list.as_deref() {
                Some("all") => rules::all_host_keys(),
                Some(raw) => parse_rules(raw)?,
                None => rules::sonar_way_keys(),
            };
            let rule_parameters = rule_params
                .iter()
                .map(|raw| parse_rule_parameter(raw))
                .collect::<Result<Vec<_>>>()?;
            let config = AnalysisConfig {
                config_file_name: config_file,
                file_suffixes: config::normalize_suffixes(&suffixes),
                timeout: Duration::from_millis(timeout_ms),
                rule_check_scope: scope,
                metrics_protocol: protocol,
                active_rules,
                rule_parameters,
            };
            let bundle = DeployedBundle::new(bundle).with_node(node);
            scan(&project_root(&path)?, &config, &bundle, json_output)
        }
        Command::Units {
            path,
            suffixes,
            config_file,
        } => {
            let root = project_root(&path)?;
            let files = discovery::discover(&root, &config::normalize_suffixes(&suffixes));
            let resolution = ConfigUnitResolver::new(config_file).resolve(files, &root);
            if json_output {
                let units: Vec<_> = resolution
                    .units
                    .iter()
                    .map(|u| {
                        json!({
                            "config": u.config_path,
                            "files": u.files.iter().map(|f| f.path()).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let unresolved: Vec<_> = resolution.unresolved.iter().map(|f| f.path()).collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "units": units, "unresolved": unresolved }))?
                );
            } else {
                for unit in &resolution.units {
                    println!("{} ({} files)", unit.config_path.display(), unit.files.len());
                    for f in &unit.files {
                        println!("  {}", f.path().display());
                    }
                }
                for f in &resolution.unresolved {
                    println!("unresolved: {}", f.path().display());
                }
            }
            Ok(())
        }
        Command::Rules => {
            if json_output {
                let table: serde_json::Map<_, _> = KNOWN_RULES
                    .iter()
                    .map(|(e, h)| (e.to_string(), json!(h)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                for (external, host) in KNOWN_RULES {
                    println!("{:<40} {}", external, host);
                }
            }
            Ok(())
        }
    }
}

fn scan(root: &Path, config: &AnalysisConfig, bundle: &DeployedBundle, json_output: bool) -> Result<()> {
    let mut mapper = RuleKeyMapper::from_active_rules(&config.active_rules)?;
    for (key, value) in &config.rule_parameters {
        mapper = mapper
            .with_parameters(key, value.clone())
            .with_context(|| format!("Cannot set parameters of {}: rule is not active", key))?;
    }
    let files = discovery::discover(root, &config.file_suffixes);
    info!("Discovered {} files under {}", files.len(), root.display());

    let cancel = CancelToken::new();
    let invoker = ProcessInvoker::new(cancel.clone());
    let mut sink = MemorySink::new();
    let outcome = match AnalysisOrchestrator::new(config, &mapper, &invoker)
        .with_cancel(cancel)
        .run(files, root, bundle, &mut sink)
    {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(InvocationError::Timeout { .. }) = e.invocation() {
                warn!("Raise --timeout-ms for projects this large");
            }
            return Err(anyhow::Error::new(e).context("TypeScript analysis failed"));
        }
    };

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&report::to_json(root, &outcome, &sink))?
        );
    } else {
        print!("{}", report::to_markdown(root, &outcome, &sink));
    }
    Ok(())
}

fn project_root(path: &str) -> Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("Project path not found: {}", path))
}

/// `S103=[true,120]` -> (`S103`, `[true,120]`)
fn parse_rule_parameter(raw: &str) -> Result<(String, serde_json::Value)> {
    let (key, value) = match raw.split_once('=') {
        Some(pair) => pair,
        None => bail!("Invalid rule parameter '{}': expected KEY=JSON", raw),
    };
    let key = key.trim();
    if !rules::is_host_key(key) {
        bail!("Invalid rule key '{}': expected keys like S103", key);
    }
    let value = serde_json::from_str(value.trim())
        .with_context(|| format!("Invalid JSON in rule parameter '{}'", raw))?;
    Ok((key.to_string(), value))
}

fn parse_rules(raw: &str) -> Result<Vec<String>> {
    let keys = config::parse_list(raw);
    if let Some(bad) = keys.iter().find(|k| !rules::is_host_key(k)) {
        bail!("Invalid rule key '{}': expected keys like S1751", bad);
    }
    Ok(keys)
}
