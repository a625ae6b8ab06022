//! Bone mapping tree.
//!
//! One [`BoneNode`] per joint below the target skeleton root, stored in an
//! arena and linked by [`BoneId`] in both directions. The shape mirrors the
//! target hierarchy and is fixed once built; only the per-tick scratch
//! (`working_world`) and `output_local` change afterwards.

use log::{debug, error, warn};

use crate::config::{Config, MatchField, RetargetMode};
use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::ids::{BoneId, JointId, NodeId};
use crate::mapping::{MappingDefinition, MappingMethod};
use crate::skeleton::BindPoseIndex;
use crate::transform::Transform;

/// Resolved link from a target bone to the source joint driving it.
#[derive(Clone, Debug)]
pub struct SourceLink {
    pub source_node: NodeId,
    pub source_joint: JointId,
    pub source_bind_world: Transform,
    pub source_bind_local: Transform,
    pub target_joint: JointId,
    pub target_bind_world: Transform,
    pub target_bind_local: Transform,
    pub method: MappingMethod,
    /// `|target bind offset| / |source bind offset|`; `None` when the source
    /// bone has no usable length and position retargeting is skipped.
    pub ratio: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct BoneNode {
    pub name: String,
    /// Target scene node this bone writes to.
    pub node: NodeId,
    pub reference_world: Transform,
    pub reference_local: Transform,
    pub mapping: Option<SourceLink>,
    pub(crate) working_world: Transform,
    pub(crate) output_local: Transform,
    pub(crate) parent: Option<BoneId>,
    pub(crate) children: Vec<BoneId>,
}

impl BoneNode {
    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Skeleton-space pose computed by the last tick. Meaningful only right
    /// after a tick; copy it if it has to outlive the next one.
    pub fn working_world(&self) -> &Transform {
        &self.working_world
    }

    /// Parent-relative pose written by the last tick.
    pub fn output_local(&self) -> &Transform {
        &self.output_local
    }
}

/// Borrowed inputs shared by every step of tree construction.
pub struct TreeInputs<'a> {
    pub scene: &'a Hierarchy,
    pub source_root: NodeId,
    pub definition: &'a MappingDefinition,
    pub source_bind: &'a BindPoseIndex,
    pub target_bind: &'a BindPoseIndex,
    pub config: &'a Config,
}

#[derive(Clone, Debug)]
pub struct BoneTree {
    pub(crate) nodes: Vec<BoneNode>,
    pub(crate) roots: Vec<BoneId>,
    skeleton_root: NodeId,
    mode: RetargetMode,
}

impl BoneTree {
    /// Mirror the hierarchy below `skeleton_root`, resolving each node's mapping.
    ///
    /// Skeleton space is the frame of `skeleton_root`: its children become the
    /// tree roots and the root node itself is never written.
    pub fn build(inputs: &TreeInputs<'_>, skeleton_root: NodeId) -> Result<Self> {
        inputs.scene.node(skeleton_root)?;
        inputs.scene.node(inputs.source_root)?;

        let mut tree = BoneTree {
            nodes: Vec::new(),
            roots: Vec::new(),
            skeleton_root,
            mode: inputs.config.mode,
        };
        for &child in inputs.scene.children(skeleton_root) {
            let id = tree.add_subtree(inputs, child, None)?;
            tree.roots.push(id);
        }
        debug!(
            "bone tree for '{}': {} bones, {} mapped",
            inputs.scene.path_in_hierarchy(skeleton_root),
            tree.len(),
            tree.mapped_count()
        );
        Ok(tree)
    }

    fn add_subtree(
        &mut self,
        inputs: &TreeInputs<'_>,
        scene_node: NodeId,
        parent: Option<BoneId>,
    ) -> Result<BoneId> {
        let node = inputs.scene.node(scene_node)?;
        let reference_local = node.local;
        let reference_world = match parent {
            Some(p) => self.nodes[p.index()].reference_world.compose(&reference_local),
            None => reference_local,
        };
        let mapping = resolve_link(inputs, &node.name);

        let id = BoneId(self.nodes.len() as u32);
        self.nodes.push(BoneNode {
            name: node.name.clone(),
            node: scene_node,
            reference_world,
            reference_local,
            mapping,
            working_world: reference_world,
            output_local: reference_local,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }

        for &child in inputs.scene.children(scene_node) {
            self.add_subtree(inputs, child, Some(id))?;
        }
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[BoneId] {
        &self.roots
    }

    pub fn nodes(&self) -> &[BoneNode] {
        &self.nodes
    }

    pub fn node(&self, id: BoneId) -> Option<&BoneNode> {
        self.nodes.get(id.index())
    }

    /// First bone (in pre-order) with the given name.
    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| BoneId(i as u32))
    }

    pub fn mapped_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_mapped()).count()
    }

    pub fn skeleton_root(&self) -> NodeId {
        self.skeleton_root
    }

    pub fn mode(&self) -> RetargetMode {
        self.mode
    }
}

fn resolve_link(inputs: &TreeInputs<'_>, name: &str) -> Option<SourceLink> {
    let row = inputs.definition.row_for(name, inputs.config.match_field)?;
    if !inputs.definition.is_included(&row.source) {
        debug!("mapping '{}' -> '{}' excluded by includes", row.source, row.target);
        return None;
    }

    let Some(source_node) = inputs.scene.find_by_name(inputs.source_root, &row.source) else {
        error!(
            "can not find source joint '{}' starting from '{}'",
            row.source,
            inputs.scene.path_in_hierarchy(inputs.source_root)
        );
        return None;
    };
    let Some(source_joint) = inputs.source_bind.resolve(&row.source) else {
        warn!("source joint '{}' has no bind pose; '{name}' left unmapped", row.source);
        return None;
    };
    let Some(target_joint) = inputs.target_bind.resolve(name) else {
        warn!("target joint '{name}' has no bind pose; left unmapped");
        return None;
    };
    let (source, target) = match (
        inputs.source_bind.entry(source_joint),
        inputs.target_bind.entry(target_joint),
    ) {
        (Some(s), Some(t)) => (s, t),
        _ => return None,
    };

    let source_len = source.local.translation.norm();
    let ratio = if source_len < inputs.config.length_epsilon {
        None
    } else {
        Some(target.local.translation.norm() / source_len)
    };

    let method = match inputs.config.match_field {
        MatchField::Target => row.method(),
        MatchField::Source => MappingMethod::Inherited,
    };

    Some(SourceLink {
        source_node,
        source_joint,
        source_bind_world: source.world,
        source_bind_local: source.local,
        target_joint,
        target_bind_world: target.world,
        target_bind_local: target.local,
        method,
        ratio,
    })
}
