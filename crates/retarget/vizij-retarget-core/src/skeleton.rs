//! Skeleton assets and the bind-pose index built from them.
//!
//! A skeleton asset records joints by `/`-separated path relative to the model
//! root (e.g. `Hips/Spine/Chest`) together with one inverse bind matrix per
//! joint. The index inverts those once at setup into skeleton-space (world)
//! and parent-local bind poses and hands out [`JointId`]s, so per-frame code
//! never scans joint names.

use hashbrown::HashMap;
use log::warn;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetargetError};
use crate::ids::JointId;
use crate::transform::Transform;

/// Joint table as stored in a skeleton asset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonAsset {
    pub joints: Vec<String>,
    /// Column-major inverse bind matrices, parallel to `joints`.
    pub inverse_bind_poses: Vec<[f32; 16]>,
}

impl SkeletonAsset {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build an asset from skeleton-space bind poses. Singular poses are stored
    /// as all-zero matrices and will be rejected by [`BindPoseIndex::new`].
    pub fn from_world_poses<'a, I>(poses: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Transform)>,
    {
        let mut asset = SkeletonAsset::default();
        for (path, world) in poses {
            let inverse = world.to_matrix().try_inverse().unwrap_or_else(Matrix4::zeros);
            let mut cols = [0.0f32; 16];
            cols.copy_from_slice(inverse.as_slice());
            asset.joints.push(path.to_string());
            asset.inverse_bind_poses.push(cols);
        }
        asset
    }
}

#[derive(Clone, Debug)]
pub struct BindPoseEntry {
    /// Full joint path as recorded in the asset.
    pub path: String,
    /// Skeleton-space bind pose.
    pub world: Transform,
    /// Bind pose relative to the parent joint (equals `world` for roots).
    pub local: Transform,
    pub parent: Option<JointId>,
}

/// Joint name to bind pose lookup for one skeleton.
#[derive(Clone, Debug, Default)]
pub struct BindPoseIndex {
    entries: Vec<BindPoseEntry>,
    by_path: HashMap<String, JointId>,
}

impl BindPoseIndex {
    pub fn new(asset: &SkeletonAsset) -> Result<Self> {
        if asset.joints.len() != asset.inverse_bind_poses.len() {
            return Err(RetargetError::JointCountMismatch {
                joints: asset.joints.len(),
                bind_poses: asset.inverse_bind_poses.len(),
            });
        }

        let mut index = BindPoseIndex::default();
        for (path, cols) in asset.joints.iter().zip(asset.inverse_bind_poses.iter()) {
            let inverse_bind = Matrix4::from_column_slice(cols);
            let Some(world) = inverse_bind.try_inverse() else {
                warn!("joint '{path}' has a singular inverse bind matrix; treating it as missing");
                continue;
            };
            let world = Transform::from_matrix(&world);

            let id = JointId(index.entries.len() as u32);
            index.by_path.entry(path.clone()).or_insert(id);
            index.entries.push(BindPoseEntry {
                path: path.clone(),
                world,
                local: world,
                parent: None,
            });
        }

        // Parents may be listed after their children, so link once every path is known.
        for i in 0..index.entries.len() {
            let parent = index.entries[i]
                .path
                .rsplit_once('/')
                .and_then(|(parent_path, _)| index.by_path.get(parent_path).copied());
            let Some(parent) = parent else {
                continue;
            };
            let parent_world = index.entries[parent.index()].world;
            let entry = &mut index.entries[i];
            entry.parent = Some(parent);
            if let Some(local) = Transform::local_from(&entry.world, &parent_world) {
                entry.local = local;
            }
        }
        Ok(index)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::new(&SkeletonAsset::from_json(text)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BindPoseEntry] {
        &self.entries
    }

    pub fn entry(&self, id: JointId) -> Option<&BindPoseEntry> {
        self.entries.get(id.index())
    }

    /// Exact path lookup.
    pub fn find_exact(&self, path: &str) -> Option<JointId> {
        self.by_path.get(path).copied()
    }

    /// Resolve a joint name by suffix against the recorded paths.
    ///
    /// The first entry in table order whose path ends with `name` wins, so with
    /// `LeftHand` recorded before `Hand` the name `Hand` resolves to `LeftHand`.
    /// Symmetric rigs must use names that are unique as suffixes.
    pub fn resolve(&self, name: &str) -> Option<JointId> {
        if name.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.path.ends_with(name))
            .map(|i| JointId(i as u32))
    }

    pub fn world_bind_pose(&self, name: &str) -> Option<Transform> {
        self.resolve(name).map(|id| self.entries[id.index()].world)
    }

    pub fn local_bind_pose(&self, name: &str) -> Option<Transform> {
        self.resolve(name).map(|id| self.entries[id.index()].local)
    }
}
