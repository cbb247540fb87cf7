use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Repository name -> record. The backend serializes a map with sorted keys,
/// so a sorted map keeps the backend's order.
pub type RepositoryIndex = BTreeMap<String, RepositoryRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Empty means "no pin".
    #[serde(default)]
    pub pinned_tag: String,
    #[serde(default)]
    pub pinned_tag_value: String,
    #[serde(default)]
    pub auto_deploy: bool,
}

impl RepositoryRecord {
    pub fn is_pinned(&self) -> bool {
        !self.pinned_tag.is_empty()
    }
}

fn null_as_empty<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(de)?.unwrap_or_default())
}
