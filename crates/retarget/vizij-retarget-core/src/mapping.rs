//! Mapping definition: which source joint drives which target joint.
//!
//! JSON shape:
//! ```json
//! {
//!   "targetRoot": "Armature",
//!   "mappings": [ { "source": "mixamorig:Hips", "target": "Hips", "method": "scaled" } ],
//!   "includes": [ "mixamorig:Hips" ],
//!   "chains": [ { "source": { "first": "Spine", "last": "Head" }, "target": { "first": "Spine" } } ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::chain::ChainDefinition;
use crate::config::MatchField;
use crate::error::Result;

/// How a mapped bone's position is derived.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMethod {
    /// Keep the target's own reference position; only rotation is retargeted.
    Inherited,
    /// Follow the source offset, rescaled to the target bone length.
    #[default]
    Scaled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingRow {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<MappingMethod>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl MappingRow {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            method: None,
            enabled: true,
        }
    }

    pub fn with_method(mut self, method: MappingMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn method(&self) -> MappingMethod {
        self.method.unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDefinition {
    /// `/`-separated path from the component node to the target skeleton root.
    #[serde(default)]
    pub target_root: String,
    #[serde(default)]
    pub mappings: Vec<MappingRow>,
    /// Allow-list of source joint names; `None` admits every row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<ChainDefinition>,
}

impl MappingDefinition {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_included(&self, source: &str) -> bool {
        match &self.includes {
            Some(list) => list.iter().any(|s| s == source),
            None => true,
        }
    }

    /// First enabled row whose `field` equals `name`. The include filter is not
    /// applied here; callers decide how to report filtered rows.
    pub fn row_for(&self, name: &str, field: MatchField) -> Option<&MappingRow> {
        self.mappings.iter().filter(|m| m.enabled).find(|m| match field {
            MatchField::Target => m.target == name,
            MatchField::Source => m.source == name,
        })
    }
}
