mod category;
mod error;
mod manifest;
mod path_check;
mod resolver;
mod variant;

pub use category::Category;
pub use error::ManifestError;
pub use manifest::{
    CategoryPaths, ComponentCounts, FileTotals, InstallManifest, InstalledFiles,
    MANIFEST_FILE_NAME,
};
pub use path_check::{ExistingInstall, HomePathValidator, PathValidator};
pub use resolver::{ContentResolver, ContentSize, ResolvedContent, ValidationReport};
pub use variant::VariantMetadata;

#[cfg(test)]
mod tests;
