use std::path::PathBuf;

use anyhow::Result;

use crate::category::Category;
use crate::manifest::ComponentCounts;
use crate::variant::VariantMetadata;

/// Resolves which on-disk files belong to a tool's variant.
///
/// The installer never interprets the variant-to-content mapping itself;
/// everything it copies comes through this seam.
pub trait ContentResolver {
    /// Concrete source paths per category for `tool` at `variant`.
    fn resolve(&self, tool: &str, variant: &str) -> Result<ResolvedContent>;

    /// Aggregate content size, with a human-readable rendering.
    fn size(&self, tool: &str, variant: &str) -> Result<ContentSize>;

    /// Structural validation of the variant's content set.
    fn validate(&self, tool: &str, variant: &str) -> Result<ValidationReport>;

    /// Descriptive metadata recorded into the manifest.
    fn metadata(&self, tool: &str, variant: &str) -> Result<VariantMetadata>;
}

/// The resolved content set for one tool + variant.
///
/// Agents, resources and hooks are single files; skills are directories
/// copied recursively. `total_files` is the resolver's own aggregate count
/// and may disagree slightly with what a directory walk finds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedContent {
    pub agents: Vec<PathBuf>,
    pub skills: Vec<PathBuf>,
    pub resources: Vec<PathBuf>,
    pub hooks: Vec<PathBuf>,
    pub total_files: u64,
}

impl ResolvedContent {
    pub fn for_category(&self, category: Category) -> &[PathBuf] {
        match category {
            Category::Agents => &self.agents,
            Category::Skills => &self.skills,
            Category::Resources => &self.resources,
            Category::Hooks => &self.hooks,
        }
    }

    /// Manifest item names per category, via the category naming rule.
    pub fn item_names(&self, category: Category) -> Vec<String> {
        self.for_category(category)
            .iter()
            .filter_map(|path| category.item_name(path))
            .collect()
    }

    pub fn component_counts(&self) -> ComponentCounts {
        ComponentCounts {
            agents: self.agents.len() as u64,
            skills: self.skills.len() as u64,
            resources: self.resources.len() as u64,
            hooks: self.hooks.len() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSize {
    pub bytes: u64,
    pub formatted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
}
