//! Joint chains imitated by local rotation deltas.
//!
//! A chain is the run of nodes from `first` down to `last`. Each tick, for
//! chains of equal length, the target joint at index `i` takes the source
//! joint's local rotation relative to the source's reference pose, applied on
//! top of its own reference rotation:
//! `target = source * inverse(source_ref) * target_ref`.

use log::error;
use serde::{Deserialize, Serialize};

use crate::engine::Outputs;
use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::ids::NodeId;
use crate::transform::Transform;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSpan {
    #[serde(default)]
    pub first: String,
    /// Defaults to `first` when empty.
    #[serde(default)]
    pub last: String,
}

impl ChainSpan {
    pub fn new(first: &str, last: &str) -> Self {
        Self {
            first: first.to_string(),
            last: last.to_string(),
        }
    }

    fn last_or_first(&self) -> &str {
        if self.last.is_empty() {
            &self.first
        } else {
            &self.last
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainDefinition {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source: ChainSpan,
    pub target: ChainSpan,
}

fn default_enabled() -> bool {
    true
}

/// Resolved chain nodes plus the local transforms they had at setup.
#[derive(Clone, Debug)]
pub struct ChainInstance {
    nodes: Vec<NodeId>,
    reference: Vec<Transform>,
}

impl ChainInstance {
    /// Resolve `span` below `origin`. Failures are logged and yield `None`.
    pub fn instantiate(scene: &Hierarchy, origin: NodeId, span: &ChainSpan) -> Option<Self> {
        if span.first.is_empty() {
            return None;
        }
        let last = span.last_or_first();
        let Some(first_node) = scene.find_by_name(origin, &span.first) else {
            error!(
                "can not find first node {} starting from {}",
                span.first,
                scene.path_in_hierarchy(origin)
            );
            return None;
        };
        let Some(last_node) = scene.find_by_name(origin, last) else {
            error!(
                "can not find last node {last} starting from {}",
                scene.path_in_hierarchy(origin)
            );
            return None;
        };

        let mut nodes = vec![last_node];
        let mut cursor = last_node;
        while cursor != first_node {
            let Some(parent) = scene.parent(cursor) else {
                error!(
                    "{} is not a successor node of {}",
                    scene.path_in_hierarchy(last_node),
                    scene.path_in_hierarchy(first_node)
                );
                return None;
            };
            nodes.push(parent);
            cursor = parent;
        }
        nodes.reverse();

        let reference = nodes
            .iter()
            .filter_map(|&n| scene.get(n).map(|node| node.local))
            .collect();
        Some(Self { nodes, reference })
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn reference(&self) -> &[Transform] {
        &self.reference
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ChainImitation {
    source: ChainInstance,
    target: ChainInstance,
    /// Optional copy of the source chain that receives raw source rotations.
    debugging: Option<ChainInstance>,
}

impl ChainImitation {
    pub fn new(source: ChainInstance, target: ChainInstance) -> Self {
        Self {
            source,
            target,
            debugging: None,
        }
    }

    /// Resolve both chains of `def`. Disabled or unresolvable chains yield `None`.
    pub fn build(
        scene: &Hierarchy,
        source_origin: NodeId,
        target_origin: NodeId,
        def: &ChainDefinition,
        debugging_origin: Option<NodeId>,
    ) -> Option<Self> {
        if !def.enabled {
            return None;
        }
        let source = ChainInstance::instantiate(scene, source_origin, &def.source)?;
        let target = ChainInstance::instantiate(scene, target_origin, &def.target)?;
        let mut imitation = Self::new(source, target);
        imitation.debugging = debugging_origin
            .and_then(|origin| ChainInstance::instantiate(scene, origin, &def.source));
        Some(imitation)
    }

    pub fn source(&self) -> &ChainInstance {
        &self.source
    }

    pub fn target(&self) -> &ChainInstance {
        &self.target
    }

    /// Copy source rotation deltas onto the target chain and record the new
    /// target locals in `outputs`. Chains of different length are left untouched.
    pub fn imitate(&self, scene: &mut Hierarchy, outputs: &mut Outputs) -> Result<()> {
        if self.source.len() != self.target.len() {
            return Ok(());
        }
        for i in 0..self.source.len() {
            let source_rotation = scene.local(self.source.nodes[i])?.rotation;
            let source_ref = &self.source.reference[i];
            let target_ref = &self.target.reference[i];

            let rotation = source_rotation * (source_ref.rotation.inverse() * target_ref.rotation);
            let target = self.target.nodes[i];
            scene.set_rotation(target, rotation)?;
            outputs.record(target, scene.local(target)?);

            if let Some(debugging) = &self.debugging {
                if let Some(&node) = debugging.nodes.get(i) {
                    scene.set_rotation(node, source_rotation)?;
                }
            }
        }
        Ok(())
    }
}
