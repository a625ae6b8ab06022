//! Error types for retarget setup and per-tick evaluation.

use thiserror::Error;

/// Errors surfaced by the retarget core.
///
/// Recoverable setup problems (missing bind poses, unknown source joints) are
/// logged and leave the affected bone unmapped; only the cases below are
/// reported to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RetargetError {
    /// A node was asked to accumulate its transform up to a node that is not one
    /// of its ancestors. The hierarchy shape is guaranteed by the caller, so this
    /// is a configuration bug and is never recovered.
    #[error("'{node}' is not a descendant of '{ancestor}'")]
    NotAnAncestor { node: String, ancestor: String },

    /// The configured target root path does not exist below the component node.
    #[error("can not find target root '{path}' starting from '{from}'")]
    TargetRootNotFound { path: String, from: String },

    /// A node handle does not belong to the hierarchy it was used with.
    #[error("node {index} is out of range (hierarchy has {len} nodes)")]
    NodeNotFound { index: u32, len: usize },

    /// Skeleton asset joint list and inverse bind pose list disagree in length.
    #[error("skeleton has {joints} joints but {bind_poses} inverse bind poses")]
    JointCountMismatch { joints: usize, bind_poses: usize },

    /// The debug shadow hierarchy shares nodes with the retarget target.
    #[error("mirror root '{shadow}' overlaps target skeleton '{target}'")]
    MirrorOverlapsTarget { shadow: String, target: String },

    /// Malformed JSON for a skeleton, hierarchy, or mapping record.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RetargetError>;
