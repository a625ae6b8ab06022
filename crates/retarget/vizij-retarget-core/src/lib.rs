//! Vizij Retarget Core (engine-agnostic)
//!
//! Retargets the pose of an animated source skeleton onto a target skeleton with
//! different proportions. Setup resolves joint names into bind poses and builds a
//! bone tree mirroring the target hierarchy; every tick the [`Retargeter`] walks
//! that tree twice (skeleton space top-down, then localization bottom-up) and
//! writes local transforms back onto the target nodes.

pub mod bind_reset;
pub mod chain;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod ids;
pub mod mapping;
pub mod mirror;
pub mod skeleton;
pub mod transform;
pub mod tree;

// Re-exports for consumers (adapters)
pub use bind_reset::reset_as_bind_pose;
pub use chain::{ChainDefinition, ChainImitation, ChainInstance, ChainSpan};
pub use config::{Config, MatchField, RetargetMode};
pub use controller::{ImitationController, SetupContext};
pub use engine::{JointWrite, Outputs, Retargeter};
pub use error::{Result, RetargetError};
pub use hierarchy::{Hierarchy, HierarchyDesc, SceneNode};
pub use ids::{BoneId, JointId, NodeId};
pub use mapping::{MappingDefinition, MappingMethod, MappingRow};
pub use mirror::{build_mirror, MirrorPass};
pub use skeleton::{BindPoseEntry, BindPoseIndex, SkeletonAsset};
pub use transform::Transform;
pub use tree::{BoneNode, BoneTree, SourceLink, TreeInputs};
