//! Core configuration for vizij-retarget-core.

use serde::{Deserialize, Serialize};

/// Which pose drives mapped bones. Chosen once at setup.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetargetMode {
    /// Every bone stays at its own reference pose; the source is never read.
    ReferencePose,
    /// Mapped bones follow the source skeleton's bind pose instead of its live pose.
    SourceBindPose,
    /// Mapped bones follow the live source pose.
    #[default]
    SourceAnimated,
}

/// Which side of a mapping row is compared against hierarchy node names while
/// building a bone tree.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// Node names are target joint names (the retarget case).
    #[default]
    Target,
    /// Node names are source joint names (a hierarchy that copies the source).
    Source,
}

/// Setup-time configuration. Keep this minimal; expand without breaking API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub mode: RetargetMode,
    pub match_field: MatchField,
    /// Source bind-local bone lengths below this skip position retargeting.
    pub length_epsilon: f32,
    /// Restricts the debug mirror pass to this joint's ancestor chain.
    pub mirror_copy_from: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: RetargetMode::SourceAnimated,
            match_field: MatchField::Target,
            length_epsilon: 1e-5,
            mirror_copy_from: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "mode": "reference_pose" }"#).unwrap();
        assert_eq!(cfg.mode, RetargetMode::ReferencePose);
        assert_eq!(cfg.match_field, MatchField::Target);
        assert!(cfg.length_epsilon > 0.0);
        assert!(cfg.mirror_copy_from.is_none());
    }
}
