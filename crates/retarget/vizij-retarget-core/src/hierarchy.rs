//! Scene hierarchy: an arena of named nodes carrying local transforms.
//!
//! This models the host engine's node tree. The animation system writes the
//! source nodes' local transforms before each tick; the retarget engine reads
//! them and writes the target nodes' local transforms.

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetargetError};
use crate::ids::NodeId;
use crate::transform::Transform;

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub local: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Nested JSON description of a subtree, used to spawn hierarchies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HierarchyDesc {
    pub name: String,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub children: Vec<HierarchyDesc>,
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl HierarchyDesc {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn local(&self) -> Transform {
        Transform::from_arrays(self.translation, self.rotation, self.scale)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    nodes: Vec<SceneNode>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node with no parent.
    pub fn add_root(&mut self, name: &str, local: Transform) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            name: name.to_string(),
            local,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: &str, local: Transform) -> Result<NodeId> {
        self.node(parent)?;
        let id = self.add_root(name, local);
        self.nodes[id.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> Result<&SceneNode> {
        self.nodes.get(id.index()).ok_or(RetargetError::NodeNotFound {
            index: id.0,
            len: self.nodes.len(),
        })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(id.index())
            .ok_or(RetargetError::NodeNotFound { index: id.0, len })
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(|n| n.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn local(&self, id: NodeId) -> Result<Transform> {
        Ok(self.node(id)?.local)
    }

    pub fn set_local(&mut self, id: NodeId, local: Transform) -> Result<()> {
        self.node_mut(id)?.local = local;
        Ok(())
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: UnitQuaternion<f32>) -> Result<()> {
        self.node_mut(id)?.local.rotation = rotation;
        Ok(())
    }

    /// Pre-order depth-first search for `name`, starting with `start` itself.
    pub fn find_by_name(&self, start: NodeId, name: &str) -> Option<NodeId> {
        let node = self.get(start)?;
        if node.name == name {
            return Some(start);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_name(child, name))
    }

    /// Follow a `/`-separated chain of child names below `start`. An empty path
    /// resolves to `start`.
    pub fn find_path(&self, start: NodeId, path: &str) -> Option<NodeId> {
        self.get(start)?;
        path.split('/')
            .filter(|seg| !seg.is_empty())
            .try_fold(start, |cur, seg| {
                self.children(cur)
                    .iter()
                    .copied()
                    .find(|&c| self.name(c) == Some(seg))
            })
    }

    /// Full `/`-joined path from the scene root, for diagnostics.
    pub fn path_in_hierarchy(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            match self.get(cur) {
                Some(node) => {
                    names.push(node.name.as_str());
                    cursor = node.parent;
                }
                None => break,
            }
        }
        names.reverse();
        names.join("/")
    }

    /// True when `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(cur) = cursor {
            if cur == ancestor {
                return true;
            }
            cursor = self.parent(cur);
        }
        false
    }

    /// Transform of `node` expressed in the frame of `ancestor`, composing the
    /// local transforms from `node` up to (not including) `ancestor`.
    pub fn accumulate(&self, node: NodeId, ancestor: NodeId) -> Result<Transform> {
        if node == ancestor {
            return Ok(Transform::identity());
        }
        let first = self.node(node)?;
        let mut acc = first.local;
        let mut cursor = first.parent;
        loop {
            match cursor {
                Some(p) if p == ancestor => return Ok(acc),
                Some(p) => {
                    let n = self.node(p)?;
                    acc = n.local.compose(&acc);
                    cursor = n.parent;
                }
                None => {
                    return Err(RetargetError::NotAnAncestor {
                        node: self.path_in_hierarchy(node),
                        ancestor: self.path_in_hierarchy(ancestor),
                    })
                }
            }
        }
    }

    /// Transform of `node` in scene space (all ancestors included).
    pub fn world(&self, node: NodeId) -> Result<Transform> {
        let mut acc = self.local(node)?;
        let mut cursor = self.parent(node);
        while let Some(p) = cursor {
            let n = self.node(p)?;
            acc = n.local.compose(&acc);
            cursor = n.parent;
        }
        Ok(acc)
    }

    /// Strict descendants of `root` in pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Deep-copy the subtree at `src` under `parent` (or as a new root).
    pub fn instantiate(&mut self, src: NodeId, parent: Option<NodeId>) -> Result<NodeId> {
        let node = self.node(src)?.clone();
        let copy = match parent {
            Some(p) => self.add_child(p, &node.name, node.local)?,
            None => self.add_root(&node.name, node.local),
        };
        for child in node.children {
            self.instantiate(child, Some(copy))?;
        }
        Ok(copy)
    }

    /// Spawn a described subtree under `parent` (or as a new root).
    pub fn spawn(&mut self, desc: &HierarchyDesc, parent: Option<NodeId>) -> Result<NodeId> {
        let id = match parent {
            Some(p) => self.add_child(p, &desc.name, desc.local())?,
            None => self.add_root(&desc.name, desc.local()),
        };
        for child in &desc.children {
            self.spawn(child, Some(id))?;
        }
        Ok(id)
    }
}
