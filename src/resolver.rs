//! Config unit resolution
//!
//! Groups source files by their nearest ancestor configuration file
//! (`tsconfig.json` by default). The walk never goes above the project root.

use crate::host::SourceFile;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files sharing one nearest-ancestor configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUnit {
    pub config_path: PathBuf,
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Default)]
pub struct Resolution {
    /// Sorted by config path; member files keep input order.
    pub units: Vec<ConfigUnit>,
    pub unresolved: Vec<SourceFile>,
}

pub struct ConfigUnitResolver {
    config_file_name: String,
}

impl ConfigUnitResolver {
    pub fn new(config_file_name: impl Into<String>) -> Self {
        Self {
            config_file_name: config_file_name.into(),
        }
    }

    pub fn resolve<I>(&self, files: I, project_root: &Path) -> Resolution
    where
        I: IntoIterator<Item = SourceFile>,
    {
        // dir -> config found in exactly that dir
        let mut dir_cache: HashMap<PathBuf, bool> = HashMap::new();
        let mut grouped: BTreeMap<PathBuf, Vec<SourceFile>> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for file in files {
            match self.nearest_config(file.path(), project_root, &mut dir_cache) {
                Some(config) => grouped.entry(config).or_default().push(file),
                None => {
                    debug!("No {} above {}", self.config_file_name, file.path().display());
                    unresolved.push(file);
                }
            }
        }

        Resolution {
            units: grouped
                .into_iter()
                .map(|(config_path, files)| ConfigUnit { config_path, files })
                .collect(),
            unresolved,
        }
    }

    fn nearest_config(
        &self,
        file: &Path,
        project_root: &Path,
        dir_cache: &mut HashMap<PathBuf, bool>,
    ) -> Option<PathBuf> {
        if !file.starts_with(project_root) {
            return None;
        }
        let mut dir = file.parent();
        while let Some(d) = dir {
            if !d.starts_with(project_root) {
                break;
            }
            let candidate = d.join(&self.config_file_name);
            let present = *dir_cache
                .entry(d.to_path_buf())
                .or_insert_with(|| candidate.is_file());
            if present {
                return Some(candidate);
            }
            if d == project_root {
                break;
            }
            dir = d.parent();
        }
        None
    }
}
