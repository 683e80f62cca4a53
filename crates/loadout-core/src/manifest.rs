use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::ManifestError;
use crate::variant::VariantMetadata;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// On-disk record of what was installed for a tool + variant.
///
/// Lives at `<target>/manifest.json` and is the sole source of truth for
/// verification, uninstall and variant changes once the in-process session
/// log is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallManifest {
    pub tool: String,
    pub variant: String,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    pub variant_info: VariantMetadata,
    pub components: ComponentCounts,
    pub installed_files: InstalledFiles,
    pub paths: CategoryPaths,
    pub files: FileTotals,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCounts {
    pub agents: u64,
    pub skills: u64,
    pub resources: u64,
    pub hooks: u64,
}

impl ComponentCounts {
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Agents => self.agents,
            Category::Skills => self.skills,
            Category::Resources => self.resources,
            Category::Hooks => self.hooks,
        }
    }
}

/// Item names recorded per category. Agent names are stored without their
/// `.md` extension; skills are directory names; the rest verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFiles {
    pub agents: Vec<String>,
    pub skills: Vec<String>,
    pub resources: Vec<String>,
    pub hooks: Vec<String>,
}

impl InstalledFiles {
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Agents => &self.agents,
            Category::Skills => &self.skills,
            Category::Resources => &self.resources,
            Category::Hooks => &self.hooks,
        }
    }

    pub fn contains(&self, category: Category, item: &str) -> bool {
        self.get(category).iter().any(|name| name == item)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPaths {
    pub agents: PathBuf,
    pub skills: PathBuf,
    pub resources: PathBuf,
    pub hooks: PathBuf,
}

impl CategoryPaths {
    pub fn for_target(target: &Path) -> Self {
        Self {
            agents: target.join(Category::Agents.dir_name()),
            skills: target.join(Category::Skills.dir_name()),
            resources: target.join(Category::Resources.dir_name()),
            hooks: target.join(Category::Hooks.dir_name()),
        }
    }

    pub fn get(&self, category: Category) -> &Path {
        match category {
            Category::Agents => &self.agents,
            Category::Skills => &self.skills,
            Category::Resources => &self.resources,
            Category::Hooks => &self.hooks,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTotals {
    pub total: u64,
    pub formatted_size: String,
}

impl InstallManifest {
    pub fn path_for(target: &Path) -> PathBuf {
        target.join(MANIFEST_FILE_NAME)
    }

    /// Reads the manifest inside `target`, distinguishing absence from
    /// corruption so callers can pick their failure mode.
    pub fn load(target: &Path) -> Result<Self, ManifestError> {
        let path = Self::path_for(target);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ManifestError::Missing(path));
            }
            Err(err) => return Err(ManifestError::Io { path, source: err }),
        };

        serde_json::from_str(&raw).map_err(|err| ManifestError::Corrupt { path, source: err })
    }

    pub fn write(&self, target: &Path) -> Result<PathBuf> {
        let path = Self::path_for(target);
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        fs::write(&path, payload.as_bytes())
            .with_context(|| format!("failed to write manifest: {}", path.display()))?;
        Ok(path)
    }

    /// Reconstructs the absolute path a manifest item is expected at,
    /// applying the per-category naming rule.
    pub fn expected_item_path(&self, category: Category, item: &str) -> PathBuf {
        self.paths
            .get(category)
            .join(category.installed_file_name(item))
    }
}
