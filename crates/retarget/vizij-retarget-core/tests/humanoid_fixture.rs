use std::f32::consts::FRAC_PI_2;

use anyhow::{Context, Result};
use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};
use vizij_retarget_core::{
    reset_as_bind_pose, BindPoseIndex, Config, Hierarchy, HierarchyDesc, ImitationController,
    MappingDefinition, NodeId, SetupContext, SkeletonAsset, Transform,
};
use vizij_test_fixtures::{hierarchies, mappings, scenarios, skeletons};

struct Scene {
    scene: Hierarchy,
    source: NodeId,
    target: NodeId,
    shadow: NodeId,
    source_bind: BindPoseIndex,
    target_bind: BindPoseIndex,
    definition: MappingDefinition,
}

fn load_scenario(name: &str) -> Result<Scene> {
    let scenario = scenarios::get(name)?;
    let mut scene = Hierarchy::new();
    let source_desc: HierarchyDesc = hierarchies::load(&scenario.source)?;
    let target_desc: HierarchyDesc = hierarchies::load(&scenario.target)?;
    let source = scene.spawn(&source_desc, None)?;
    let target = scene.spawn(&target_desc, None)?;
    let shadow = scene.instantiate(source, None)?;
    Ok(Scene {
        scene,
        source,
        target,
        shadow,
        source_bind: BindPoseIndex::from_json(&skeletons::json(&scenario.source)?)?,
        target_bind: BindPoseIndex::new(&skeletons::load::<SkeletonAsset>(&scenario.target)?)?,
        definition: mappings::load(&scenario.mapping)?,
    })
}

fn ready_controller(s: &Scene) -> Result<ImitationController> {
    let mut controller = ImitationController::new(s.definition.clone(), Config::default());
    let ctx = SetupContext {
        component_root: s.target,
        source_root: s.source,
        source_skeleton: &s.source_bind,
        target_skeleton: &s.target_bind,
        shadow_root: Some(s.shadow),
    };
    controller.setup(&s.scene, &ctx)?;
    Ok(controller)
}

fn joint(s: &Scene, root: NodeId, name: &str) -> Result<NodeId> {
    s.scene
        .find_by_name(root, name)
        .with_context(|| format!("joint '{name}' missing"))
}

#[test]
fn controller_resolves_fixture_rigs() -> Result<()> {
    let s = load_scenario("mixamo-humanoid")?;
    let controller = ready_controller(&s)?;
    assert!(controller.is_ready());

    let tree = controller.retargeter().context("retargeter")?.tree();
    assert_eq!(tree.len(), 14);
    assert_eq!(tree.mapped_count(), 14);
    assert_eq!(tree.roots().len(), 1);
    // The only chain in the mapping is disabled.
    assert!(controller.chains().is_empty());
    assert_eq!(controller.mirror().map(|m| m.len()), Some(14));
    Ok(())
}

#[test]
fn rest_pose_reproduces_target_bind_pose() -> Result<()> {
    let mut s = load_scenario("mixamo-humanoid")?;
    let mut controller = ready_controller(&s)?;
    let outputs = controller.update(&mut s.scene)?.clone();
    assert_eq!(outputs.len(), 14);

    for entry in s.target_bind.entries() {
        let name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
        let node = joint(&s, s.target, name)?;
        let local = s.scene.local(node)?;
        assert!(
            local.approx_eq(&entry.local, 1e-5),
            "{name}: {local:?} vs {:?}",
            entry.local
        );
    }
    Ok(())
}

#[test]
fn raised_arm_is_retargeted_at_target_scale() -> Result<()> {
    let mut s = load_scenario("mixamo-humanoid")?;
    let mut controller = ready_controller(&s)?;
    let arm = joint(&s, s.source, "mixamorig:LeftArm")?;
    let raise = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
    s.scene.set_rotation(arm, raise)?;

    controller.update(&mut s.scene)?;

    let hand = joint(&s, s.target, "LeftHand")?;
    let world = s.scene.world(hand)?;
    assert_relative_eq!(world.translation, Vector3::new(3.3, 3.0, 0.0), epsilon = 1e-4);
    let fore_arm = joint(&s, s.target, "LeftForeArm")?;
    assert_relative_eq!(
        s.scene.local(fore_arm)?.translation,
        Vector3::new(0.45, 0.0, 0.0),
        epsilon = 1e-5
    );

    // The other side is untouched.
    let right = joint(&s, s.target, "RightHand")?;
    assert_relative_eq!(
        s.scene.world(right)?.translation,
        Vector3::new(3.0 - 1.125, 2.175, 0.0),
        epsilon = 1e-4
    );

    // The shadow copies the raw source pose.
    let shadow_arm = joint(&s, s.shadow, "mixamorig:LeftArm")?;
    assert_eq!(s.scene.local(shadow_arm)?.rotation, raise);
    Ok(())
}

#[test]
fn reset_as_bind_pose_restores_perturbed_target() -> Result<()> {
    let mut s = load_scenario("mixamo-humanoid")?;
    let armature = s
        .scene
        .find_path(s.target, "Armature")
        .context("armature")?;
    let spine = joint(&s, s.target, "Spine")?;
    s.scene.set_local(
        spine,
        Transform::new(
            Vector3::new(1.0, 1.0, 1.0),
            UnitQuaternion::from_euler_angles(0.5, 0.5, 0.5),
            Vector3::repeat(2.0),
        ),
    )?;

    let count = reset_as_bind_pose(&mut s.scene, armature, &s.target_bind)?;
    assert_eq!(count, 14);
    let local = s.scene.local(spine)?;
    assert!(local.approx_eq(&Transform::from_translation(Vector3::new(0.0, 0.3, 0.0)), 1e-5));
    Ok(())
}

#[test]
fn wrong_target_root_keeps_controller_idle() -> Result<()> {
    let mut s = load_scenario("mixamo-humanoid")?;
    s.definition.target_root = "Rig/Armature".to_string();
    let mut controller = ready_controller(&s)?;
    assert!(!controller.is_ready());
    assert!(controller.update(&mut s.scene)?.is_empty());
    Ok(())
}
