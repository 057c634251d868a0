//! Deployed SonarTS bundle
//!
//! Layout under the deploy directory:
//!
//! ```text
//! sonarts-core/
//!   tslint.json
//!   node_modules/tslint/bin/tslint
//!   node_modules/tslint-sonarts/bin/tsmetrics
//! ```
//!
//! Archive extraction and permission setup are done by packaging; `deploy`
//! only checks that the entry points are in place.

use super::{ExecutableBundle, ExternalCommand, RuleCheckTarget};
use crate::error::AnalysisError;
use crate::rules::RuleKeyMapper;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CORE_DIR: &str = "sonarts-core";
const TSLINT_BIN: &str = "node_modules/tslint/bin/tslint";
const TSMETRICS_BIN: &str = "node_modules/tslint-sonarts/bin/tsmetrics";
const TSLINT_CONFIG: &str = "tslint.json";

#[derive(Debug, Clone)]
pub struct DeployedBundle {
    deploy_dir: PathBuf,
    node: String,
}

impl DeployedBundle {
    pub fn new(deploy_dir: impl Into<PathBuf>) -> Self {
        Self {
            deploy_dir: deploy_dir.into(),
            node: "node".to_string(),
        }
    }

    /// Use a specific node executable instead of the one on PATH.
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    fn core(&self) -> PathBuf {
        self.deploy_dir.join(CORE_DIR)
    }

    pub fn tslint_path(&self) -> PathBuf {
        self.core().join(TSLINT_BIN)
    }

    pub fn tsmetrics_path(&self) -> PathBuf {
        self.core().join(TSMETRICS_BIN)
    }

    pub fn config_path(&self) -> PathBuf {
        self.core().join(TSLINT_CONFIG)
    }
}

fn display(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

/// `tslint.json` content enabling exactly the activated rules, each with
/// its options.
pub fn tslint_config(mapper: &RuleKeyMapper) -> Value {
    let rules: Map<String, Value> = mapper
        .external_keys()
        .into_iter()
        .map(|k| (k.to_string(), mapper.configuration(k)))
        .collect();
    json!({
        "extends": ["tslint-sonarts"],
        "rules": rules,
    })
}

impl ExecutableBundle for DeployedBundle {
    fn deploy(&self) -> Result<(), AnalysisError> {
        for entry in [self.tslint_path(), self.tsmetrics_path()] {
            if !entry.is_file() {
                return Err(AnalysisError::Deploy(format!(
                    "entry point {} is missing",
                    entry.display()
                )));
            }
        }
        debug!("Bundle ready at {}", self.deploy_dir.display());
        Ok(())
    }

    fn activate_rules(&self, mapper: &RuleKeyMapper) -> Result<(), AnalysisError> {
        let config = tslint_config(mapper);
        let text = serde_json::to_string_pretty(&config)
            .map_err(|e| AnalysisError::Deploy(e.to_string()))?;
        fs::write(self.config_path(), text).map_err(|e| {
            AnalysisError::Deploy(format!("cannot write {}: {}", self.config_path().display(), e))
        })?;
        info!("Activated {} rules", mapper.len());
        Ok(())
    }

    fn rule_check_command(&self, target: RuleCheckTarget<'_>) -> ExternalCommand {
        let base = ExternalCommand::new(self.node.clone())
            .arg(display(&self.tslint_path()))
            .args(["--config".to_string(), display(&self.config_path())])
            .args(["--format", "json"]);
        match target {
            RuleCheckTarget::Project { source_globs, .. } => base.args(source_globs.iter().cloned()),
            RuleCheckTarget::Unit { config_path } => base
                .args(["--type-check", "--project"])
                .arg(display(config_path)),
        }
    }

    fn metrics_command(&self) -> ExternalCommand {
        ExternalCommand::new(self.node.clone()).arg(display(&self.tsmetrics_path()))
    }
}
