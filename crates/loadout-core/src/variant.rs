use serde::{Deserialize, Serialize};

/// Human-facing description of a variant, carried verbatim into the
/// installation manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMetadata {
    pub name: String,
    pub description: String,
    pub use_case: String,
    pub target_users: String,
}
