//! Retargeter: the per-tick two-phase traversal of a [`BoneTree`].
//!
//! Phase 1 (pre-order) computes every bone's skeleton-space pose. Mapped bones
//! take the source joint's rotation delta from its bind pose, applied on top of
//! their own bind orientation, and follow the source bone offset rescaled to
//! their own bone length. Phase 2 (post-order) turns those poses back into
//! parent-relative transforms. A bone localizes only after all of its
//! descendants have, so it always reads its parent's skeleton-space value.

use log::debug;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::RetargetMode;
use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::ids::{BoneId, NodeId};
use crate::mapping::MappingMethod;
use crate::transform::Transform;
use crate::tree::{BoneTree, SourceLink, TreeInputs};

/// One local transform written onto a target node this tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JointWrite {
    /// Bone that produced the write; `None` for chain imitation writes.
    pub bone: Option<BoneId>,
    pub node: NodeId,
    pub local: Transform,
}

/// Writes produced by the last tick: bone-tree writes in post-order (children
/// before parents), then chain writes to nodes outside the tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    pub writes: Vec<JointWrite>,
}

impl Outputs {
    pub fn clear(&mut self) {
        self.writes.clear();
    }

    pub fn push(&mut self, write: JointWrite) {
        self.writes.push(write);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&Transform> {
        self.writes.iter().find(|w| w.node == node).map(|w| &w.local)
    }

    /// Replace this tick's write for `node`, or append one if the bone tree
    /// did not touch it.
    pub fn record(&mut self, node: NodeId, local: Transform) {
        match self.writes.iter_mut().find(|w| w.node == node) {
            Some(write) => write.local = local,
            None => self.writes.push(JointWrite {
                bone: None,
                node,
                local,
            }),
        }
    }
}

#[derive(Debug)]
pub struct Retargeter {
    tree: BoneTree,
    outputs: Outputs,
}

impl Retargeter {
    pub fn new(tree: BoneTree) -> Self {
        let outputs = Outputs {
            writes: Vec::with_capacity(tree.len()),
        };
        Self { tree, outputs }
    }

    /// Build the bone tree below `skeleton_root` and wrap it.
    pub fn build(inputs: &TreeInputs<'_>, skeleton_root: NodeId) -> Result<Self> {
        Ok(Self::new(BoneTree::build(inputs, skeleton_root)?))
    }

    pub fn tree(&self) -> &BoneTree {
        &self.tree
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut Outputs {
        &mut self.outputs
    }

    /// Retarget the current source pose onto the target nodes.
    ///
    /// `source_root` defines source skeleton space; every mapped source joint
    /// must be below it or the tick fails with
    /// [`crate::RetargetError::NotAnAncestor`]. On error the target nodes keep
    /// their previous pose.
    pub fn imitate(&mut self, scene: &mut Hierarchy, source_root: NodeId) -> Result<&Outputs> {
        self.outputs.clear();

        for i in 0..self.tree.roots.len() {
            let root = self.tree.roots[i];
            compute_world(&mut self.tree, scene, source_root, root)?;
        }
        for i in 0..self.tree.roots.len() {
            let root = self.tree.roots[i];
            localize(&mut self.tree, scene, &mut self.outputs, root)?;
        }
        Ok(&self.outputs)
    }
}

/// Phase 1: parent before children.
fn compute_world(
    tree: &mut BoneTree,
    scene: &Hierarchy,
    source_root: NodeId,
    id: BoneId,
) -> Result<()> {
    let mode = tree.mode();
    let node = &tree.nodes[id.index()];
    let parent_world = node.parent.map(|p| tree.nodes[p.index()].working_world);

    let mut world = match &parent_world {
        Some(pw) => pw.compose(&node.reference_local),
        None => node.reference_local,
    };
    if let Some(link) = &node.mapping {
        if let Some(sample) = sample_source(scene, source_root, mode, link)? {
            apply_link(&mut world, link, &sample, parent_world.as_ref());
        }
    }
    tree.nodes[id.index()].working_world = world;

    for k in 0..tree.nodes[id.index()].children.len() {
        let child = tree.nodes[id.index()].children[k];
        compute_world(tree, scene, source_root, child)?;
    }
    Ok(())
}

/// Phase 2: children before parent.
fn localize(
    tree: &mut BoneTree,
    scene: &mut Hierarchy,
    outputs: &mut Outputs,
    id: BoneId,
) -> Result<()> {
    for k in 0..tree.nodes[id.index()].children.len() {
        let child = tree.nodes[id.index()].children[k];
        localize(tree, scene, outputs, child)?;
    }

    let node = &tree.nodes[id.index()];
    // Unmapped bones were composed from their reference local in phase 1, so
    // they keep it verbatim and simply follow the parent's retargeted frame.
    let local = match node.parent {
        _ if node.mapping.is_none() => node.reference_local,
        Some(p) => {
            let parent_world = &tree.nodes[p.index()].working_world;
            Transform::local_from(&node.working_world, parent_world).unwrap_or_else(|| {
                debug!("parent of '{}' is singular; keeping reference pose", node.name);
                node.reference_local
            })
        }
        None => node.working_world,
    };
    let target = node.node;
    tree.nodes[id.index()].output_local = local;

    scene.set_local(target, local)?;
    outputs.push(JointWrite {
        bone: Some(id),
        node: target,
        local,
    });
    Ok(())
}

/// Source joint pose as seen by one tick.
struct SourceSample {
    /// Skeleton-space pose of the source joint.
    world: Transform,
    /// Source joint position in its parent's frame.
    offset: Vector3<f32>,
}

fn sample_source(
    scene: &Hierarchy,
    source_root: NodeId,
    mode: RetargetMode,
    link: &SourceLink,
) -> Result<Option<SourceSample>> {
    match mode {
        RetargetMode::ReferencePose => Ok(None),
        RetargetMode::SourceBindPose => Ok(Some(SourceSample {
            world: link.source_bind_world,
            offset: link.source_bind_local.translation,
        })),
        RetargetMode::SourceAnimated => {
            let world = scene.accumulate(link.source_node, source_root)?;
            // Seen from the parent frame the joint position is its local translation.
            let offset = if link.source_node == source_root {
                Vector3::zeros()
            } else {
                scene.local(link.source_node)?.translation
            };
            Ok(Some(SourceSample { world, offset }))
        }
    }
}

fn apply_link(
    world: &mut Transform,
    link: &SourceLink,
    sample: &SourceSample,
    parent_world: Option<&Transform>,
) {
    // Anim_t * inv(Bind_t) = Anim_s * inv(Bind_s), in skeleton space.
    let delta = sample.world.rotation * link.source_bind_world.rotation.inverse();
    let rotation = delta * link.target_bind_world.rotation;
    world.rotation = UnitQuaternion::new_normalize(rotation.into_inner());

    if link.method != MappingMethod::Scaled {
        return;
    }
    let Some(ratio) = link.ratio else {
        return;
    };
    let offset = sample.offset * ratio;
    world.translation = match parent_world {
        Some(pw) => pw.transform_point(&offset),
        None => offset,
    };
}
