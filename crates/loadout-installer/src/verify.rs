use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use loadout_core::{Category, InstallManifest};

/// Per-category verification tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCheck {
    pub expected: u64,
    pub found: u64,
    pub missing: Vec<String>,
}

/// Outcome of checking an installation against its manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub tool: String,
    pub target_path: PathBuf,
    pub valid: bool,
    pub categories: BTreeMap<Category, CategoryCheck>,
    /// Hard problems: missing items, missing category dirs, no manifest.
    pub issues: Vec<String>,
    /// Soft problems: count mismatches suggesting external tampering.
    pub warnings: Vec<String>,
    pub expected: u64,
    pub found: u64,
    pub missing: u64,
}

/// Checks every manifest-listed item against the filesystem using the same
/// per-category naming rule as rollback. A missing manifest is immediately
/// invalid; component-count mismatches are warnings, not errors.
pub fn verify(tool: &str, target: &Path) -> VerificationReport {
    let mut report = VerificationReport {
        tool: tool.to_string(),
        target_path: target.to_path_buf(),
        valid: false,
        categories: BTreeMap::new(),
        issues: Vec::new(),
        warnings: Vec::new(),
        expected: 0,
        found: 0,
        missing: 0,
    };

    let manifest = match InstallManifest::load(target) {
        Ok(manifest) => manifest,
        Err(err) => {
            report.issues.push(err.to_string());
            return report;
        }
    };

    if manifest.tool != tool {
        report.warnings.push(format!(
            "manifest records tool '{}' but '{}' was requested",
            manifest.tool, tool
        ));
    }

    for category in Category::ALL {
        let dir = manifest.paths.get(category);
        let items = manifest.installed_files.get(category);
        if !dir.exists() && !items.is_empty() {
            report.issues.push(format!(
                "category directory missing: {}",
                dir.display()
            ));
        }

        let mut check = CategoryCheck {
            expected: items.len() as u64,
            ..CategoryCheck::default()
        };
        for item in items {
            let path = manifest.expected_item_path(category, item);
            if path.exists() {
                check.found += 1;
            } else {
                report
                    .issues
                    .push(format!("missing {category} item '{item}': {}", path.display()));
                check.missing.push(item.clone());
            }
        }

        let recorded = manifest.components.get(category);
        if recorded != check.found {
            report.warnings.push(format!(
                "component count mismatch for {category}: manifest records {recorded}, found {}",
                check.found
            ));
        }

        report.expected += check.expected;
        report.found += check.found;
        report.missing += check.missing.len() as u64;
        report.categories.insert(category, check);
    }

    report.valid = report.issues.is_empty();
    report
}
