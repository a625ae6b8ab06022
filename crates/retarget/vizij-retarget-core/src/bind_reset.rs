//! Pose a model hierarchy at its skeleton's bind pose.

use log::{debug, warn};

use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::ids::NodeId;
use crate::skeleton::BindPoseIndex;

/// Write each joint's local bind pose onto the matching node below `model_root`.
///
/// Nodes are matched by their exact path relative to `model_root`. Nodes with an
/// empty name, or without a recorded joint, are skipped together with their
/// subtree. Returns the number of nodes reset.
pub fn reset_as_bind_pose(
    scene: &mut Hierarchy,
    model_root: NodeId,
    index: &BindPoseIndex,
) -> Result<usize> {
    scene.node(model_root)?;
    let mut count = 0;
    let mut stack: Vec<(NodeId, String)> = scene
        .children(model_root)
        .iter()
        .rev()
        .map(|&c| (c, String::new()))
        .collect();

    while let Some((node, prefix)) = stack.pop() {
        let name = scene.node(node)?.name.clone();
        if name.is_empty() {
            warn!(
                "joint under '{}' has an empty name; skipped",
                scene.path_in_hierarchy(model_root)
            );
            continue;
        }
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let Some(joint) = index.find_exact(&path) else {
            debug!("joint '{path}' has no recorded bind pose; skipped");
            continue;
        };
        if let Some(entry) = index.entry(joint) {
            scene.set_local(node, entry.local)?;
            count += 1;
        }
        for &child in scene.children(node).iter().rev() {
            stack.push((child, path.clone()));
        }
    }
    Ok(count)
}
