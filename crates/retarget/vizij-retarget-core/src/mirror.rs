//! Debug mirror pass.
//!
//! A shadow copy of the source hierarchy, placed somewhere else in the scene,
//! receives the source joints' raw local transforms every tick. No retarget
//! math is involved; it exists only to compare the source motion with the
//! retargeted result side by side. The pass never touches the retarget target.

use log::{debug, error};

use crate::config::{Config, MatchField};
use crate::error::{Result, RetargetError};
use crate::hierarchy::Hierarchy;
use crate::ids::NodeId;
use crate::mapping::MappingDefinition;
use crate::skeleton::BindPoseIndex;
use crate::tree::{BoneTree, TreeInputs};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MirrorLink {
    source: NodeId,
    shadow: NodeId,
}

#[derive(Clone, Debug)]
pub struct MirrorPass {
    links: Vec<MirrorLink>,
    rotation_only: bool,
}

impl MirrorPass {
    /// Link shadow nodes below `shadow_root` to their source joints.
    ///
    /// Without `config.mirror_copy_from`, shadow nodes are matched through the
    /// mapping definition's `source` names (source-mirroring mode) and receive
    /// full local transforms. With it, only the named joint and its ancestors up
    /// to the roots are linked, and only their rotations are copied.
    pub fn build(
        inputs: &TreeInputs<'_>,
        shadow_root: NodeId,
        target_skeleton_root: NodeId,
    ) -> Result<Self> {
        let scene = inputs.scene;
        if shadow_root == target_skeleton_root
            || scene.is_ancestor(shadow_root, target_skeleton_root)
            || scene.is_ancestor(target_skeleton_root, shadow_root)
        {
            return Err(RetargetError::MirrorOverlapsTarget {
                shadow: scene.path_in_hierarchy(shadow_root),
                target: scene.path_in_hierarchy(target_skeleton_root),
            });
        }

        let pass = match &inputs.config.mirror_copy_from {
            Some(name) => Self::chain_links(scene, inputs.source_root, shadow_root, name),
            None => Self::mapped_links(inputs, shadow_root)?,
        };
        debug!(
            "mirror pass for '{}': {} links",
            scene.path_in_hierarchy(shadow_root),
            pass.links.len()
        );
        Ok(pass)
    }

    fn mapped_links(inputs: &TreeInputs<'_>, shadow_root: NodeId) -> Result<Self> {
        let config = Config {
            match_field: MatchField::Source,
            ..inputs.config.clone()
        };
        let mirrored = TreeInputs {
            target_bind: inputs.source_bind,
            config: &config,
            ..*inputs
        };
        let tree = BoneTree::build(&mirrored, shadow_root)?;
        let links = tree
            .nodes()
            .iter()
            .filter_map(|bone| {
                bone.mapping.as_ref().map(|link| MirrorLink {
                    source: link.source_node,
                    shadow: bone.node,
                })
            })
            .collect();
        Ok(Self {
            links,
            rotation_only: false,
        })
    }

    fn chain_links(scene: &Hierarchy, source_root: NodeId, shadow_root: NodeId, name: &str) -> Self {
        let mut links = Vec::new();
        match (
            scene.find_by_name(source_root, name),
            scene.find_by_name(shadow_root, name),
        ) {
            (Some(mut source), Some(mut shadow)) => {
                while source != source_root && shadow != shadow_root {
                    links.push(MirrorLink { source, shadow });
                    match (scene.parent(source), scene.parent(shadow)) {
                        (Some(s), Some(d)) => {
                            source = s;
                            shadow = d;
                        }
                        _ => break,
                    }
                }
            }
            _ => error!("can not find mirror joint '{name}' in both source and shadow"),
        }
        Self {
            links,
            rotation_only: true,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Shadow nodes written by this pass.
    pub fn shadow_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links.iter().map(|l| l.shadow)
    }

    /// Copy the current source locals onto the shadow nodes.
    pub fn apply(&self, scene: &mut Hierarchy) -> Result<()> {
        for link in &self.links {
            let local = scene.local(link.source)?;
            if self.rotation_only {
                scene.set_rotation(link.shadow, local.rotation)?;
            } else {
                scene.set_local(link.shadow, local)?;
            }
        }
        Ok(())
    }
}

/// Build a mirror pass whose shadow uses the source skeleton's joint names.
pub fn build_mirror(
    scene: &Hierarchy,
    source_root: NodeId,
    shadow_root: NodeId,
    target_skeleton_root: NodeId,
    definition: &MappingDefinition,
    source_bind: &BindPoseIndex,
    config: &Config,
) -> Result<MirrorPass> {
    let inputs = TreeInputs {
        scene,
        source_root,
        definition,
        source_bind,
        target_bind: source_bind,
        config,
    };
    MirrorPass::build(&inputs, shadow_root, target_skeleton_root)
}
