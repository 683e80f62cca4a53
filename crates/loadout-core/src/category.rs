use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The four content groupings a variant selects from.
///
/// Each category owns its on-disk naming rule: agent names are stored
/// without an extension and materialize as `<name>.md`, skills are whole
/// directories named after the skill, resources and hooks keep their file
/// name verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Agents,
    Skills,
    Resources,
    Hooks,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Agents,
        Category::Skills,
        Category::Resources,
        Category::Hooks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Skills => "skills",
            Self::Resources => "resources",
            Self::Hooks => "hooks",
        }
    }

    /// Name of the category subdirectory inside an installation target.
    pub fn dir_name(&self) -> &'static str {
        self.as_str()
    }

    /// True for categories whose items are directories rather than files.
    pub fn is_directory_item(&self) -> bool {
        matches!(self, Self::Skills)
    }

    /// File or directory name an item materializes as inside the category
    /// directory.
    pub fn installed_file_name(&self, item: &str) -> String {
        match self {
            Self::Agents => format!("{item}.md"),
            _ => item.to_string(),
        }
    }

    /// Item name stored in the manifest for a resolved source path.
    ///
    /// Inverse of [`Category::installed_file_name`]: agents strip their
    /// extension, everything else keeps the final path component.
    pub fn item_name(&self, source: &Path) -> Option<String> {
        let component = match self {
            Self::Agents => source.file_stem(),
            _ => source.file_name(),
        };
        component.map(|name| name.to_string_lossy().into_owned())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
