//! Dense index handles for scene nodes, skeleton joints, and bone tree nodes.

use serde::{Deserialize, Serialize};

/// Index of a node inside a [`crate::Hierarchy`] arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index of a joint inside a [`crate::BindPoseIndex`] table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JointId(pub u32);

/// Index of a node inside a [`crate::BoneTree`] arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoneId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl JointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BoneId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_inner_value() {
        assert_eq!(NodeId(3).index(), 3);
        assert_eq!(JointId(0).index(), 0);
        assert_eq!(BoneId(7).index(), 7);
    }
}
