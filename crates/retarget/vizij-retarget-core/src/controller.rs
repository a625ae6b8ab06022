//! Setup/update façade tying the bone tree, chains and mirror pass together.

use log::{error, info};

use crate::chain::ChainImitation;
use crate::config::Config;
use crate::engine::{Outputs, Retargeter};
use crate::error::{Result, RetargetError};
use crate::hierarchy::Hierarchy;
use crate::ids::NodeId;
use crate::mapping::MappingDefinition;
use crate::mirror::build_mirror;
use crate::mirror::MirrorPass;
use crate::skeleton::BindPoseIndex;
use crate::tree::TreeInputs;

/// Scene nodes and skeletons a controller binds to.
#[derive(Clone, Copy, Debug)]
pub struct SetupContext<'a> {
    /// Node the mapping's `targetRoot` path is resolved from.
    pub component_root: NodeId,
    pub source_root: NodeId,
    pub source_skeleton: &'a BindPoseIndex,
    pub target_skeleton: &'a BindPoseIndex,
    /// Optional copy of the source hierarchy driven by the mirror pass.
    pub shadow_root: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct ImitationController {
    definition: MappingDefinition,
    config: Config,
    source_root: Option<NodeId>,
    retargeter: Option<Retargeter>,
    chains: Vec<ChainImitation>,
    mirror: Option<MirrorPass>,
    idle: Outputs,
}

impl ImitationController {
    pub fn new(definition: MappingDefinition, config: Config) -> Self {
        Self {
            definition,
            config,
            ..Self::default()
        }
    }

    pub fn definition(&self) -> &MappingDefinition {
        &self.definition
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True once setup found the target skeleton root.
    pub fn is_ready(&self) -> bool {
        self.retargeter.is_some()
    }

    pub fn retargeter(&self) -> Option<&Retargeter> {
        self.retargeter.as_ref()
    }

    pub fn chains(&self) -> &[ChainImitation] {
        &self.chains
    }

    pub fn mirror(&self) -> Option<&MirrorPass> {
        self.mirror.as_ref()
    }

    /// Resolve everything against `scene`. Replaces any previous setup.
    ///
    /// A missing target root is logged and leaves the controller idle; it is
    /// not an error. Structural problems (unknown nodes, an overlapping shadow)
    /// are returned.
    pub fn setup(&mut self, scene: &Hierarchy, ctx: &SetupContext<'_>) -> Result<()> {
        self.source_root = None;
        self.retargeter = None;
        self.chains.clear();
        self.mirror = None;

        let Some(target_root) = scene.find_path(ctx.component_root, &self.definition.target_root)
        else {
            error!(
                "{}",
                RetargetError::TargetRootNotFound {
                    path: self.definition.target_root.clone(),
                    from: scene.path_in_hierarchy(ctx.component_root),
                }
            );
            return Ok(());
        };

        let inputs = TreeInputs {
            scene,
            source_root: ctx.source_root,
            definition: &self.definition,
            source_bind: ctx.source_skeleton,
            target_bind: ctx.target_skeleton,
            config: &self.config,
        };
        let retargeter = Retargeter::build(&inputs, target_root)?;

        let chains: Vec<_> = self
            .definition
            .chains
            .iter()
            .filter_map(|def| {
                ChainImitation::build(scene, ctx.source_root, ctx.component_root, def, ctx.shadow_root)
            })
            .collect();

        let mirror = match ctx.shadow_root {
            Some(shadow) => Some(build_mirror(
                scene,
                ctx.source_root,
                shadow,
                target_root,
                &self.definition,
                ctx.source_skeleton,
                &self.config,
            )?),
            None => None,
        };

        info!(
            "imitation ready on '{}': {} bones ({} mapped), {} chains",
            scene.path_in_hierarchy(target_root),
            retargeter.tree().len(),
            retargeter.tree().mapped_count(),
            chains.len()
        );
        self.source_root = Some(ctx.source_root);
        self.retargeter = Some(retargeter);
        self.chains = chains;
        self.mirror = mirror;
        Ok(())
    }

    /// One tick: bone tree, then chains, then the mirror pass.
    ///
    /// Returns the final target locals of this tick: bone-tree writes with any
    /// chain rotations folded in. Mirror writes land on the shadow only. An idle
    /// controller returns empty outputs and touches nothing.
    pub fn update(&mut self, scene: &mut Hierarchy) -> Result<&Outputs> {
        let (Some(retargeter), Some(source_root)) = (self.retargeter.as_mut(), self.source_root)
        else {
            return Ok(&self.idle);
        };
        retargeter.imitate(scene, source_root)?;
        let outputs = retargeter.outputs_mut();
        for chain in &self.chains {
            chain.imitate(scene, outputs)?;
        }
        if let Some(mirror) = &self.mirror {
            mirror.apply(scene)?;
        }
        Ok(retargeter.outputs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainDefinition, ChainSpan};
    use crate::mapping::MappingRow;
    use crate::skeleton::SkeletonAsset;
    use crate::transform::{rotation_eq, Transform};
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn missing_target_root_leaves_controller_idle() {
        let mut scene = Hierarchy::new();
        let source = scene.add_root("Source", Transform::identity());
        let component = scene.add_root("Component", Transform::identity());
        let bone = scene
            .add_child(component, "Bone", Transform::from_translation(Vector3::x()))
            .unwrap();
        let bind = BindPoseIndex::new(&SkeletonAsset::default()).unwrap();

        let mut controller = ImitationController::new(
            MappingDefinition {
                target_root: "Armature".to_string(),
                ..MappingDefinition::default()
            },
            Config::default(),
        );
        let ctx = SetupContext {
            component_root: component,
            source_root: source,
            source_skeleton: &bind,
            target_skeleton: &bind,
            shadow_root: None,
        };
        controller.setup(&scene, &ctx).unwrap();
        assert!(!controller.is_ready());

        let outputs = controller.update(&mut scene).unwrap();
        assert!(outputs.is_empty());
        assert_eq!(
            scene.local(bone).unwrap(),
            Transform::from_translation(Vector3::x())
        );
    }

    #[test]
    fn chain_rotations_are_reflected_in_outputs() {
        let mut scene = Hierarchy::new();
        let source = scene.add_root("Source", Transform::identity());
        let s_hips = scene.add_child(source, "SHips", Transform::identity()).unwrap();
        let component = scene.add_root("Component", Transform::identity());
        let twist = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3);
        let t_hips = scene
            .add_child(component, "Hips", Transform::from_rotation(twist))
            .unwrap();

        let source_bind =
            BindPoseIndex::new(&SkeletonAsset::from_world_poses([("SHips", Transform::identity())]))
                .unwrap();
        let target_bind =
            BindPoseIndex::new(&SkeletonAsset::from_world_poses([("Hips", Transform::identity())]))
                .unwrap();
        let definition = MappingDefinition {
            mappings: vec![MappingRow::new("SHips", "Hips")],
            chains: vec![ChainDefinition {
                enabled: true,
                source: ChainSpan::new("SHips", ""),
                target: ChainSpan::new("Hips", ""),
            }],
            ..MappingDefinition::default()
        };
        let mut controller = ImitationController::new(definition, Config::default());
        let ctx = SetupContext {
            component_root: component,
            source_root: source,
            source_skeleton: &source_bind,
            target_skeleton: &target_bind,
            shadow_root: None,
        };
        controller.setup(&scene, &ctx).unwrap();
        assert_eq!(controller.chains().len(), 1);

        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5);
        scene.set_rotation(s_hips, turn).unwrap();
        let outputs = controller.update(&mut scene).unwrap().clone();

        let local = scene.local(t_hips).unwrap();
        assert!(rotation_eq(&local.rotation, &(turn * twist), 1e-5));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs.get(t_hips), Some(&local));
    }
}
