//! Authentication paths (Merkle membership witnesses).

use primitives::{hash_node, Commitment, Digest, PublicInput};
use serde::{Deserialize, Serialize};

/// Sibling digests from the leaf level up to (excluding) the root, plus the
/// leaf index. Bit k of `leaf_index` says whether the running node is the
/// right child at level k.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct AuthenticationPath {
    pub leaf_index: u64,
    pub siblings: Vec<Digest>,
}

impl AuthenticationPath {
    pub fn depth(&self) -> usize { self.siblings.len() }

    /// Address bits, leaf level first. `true` means the node is a right child.
    pub fn address_bits(&self) -> Vec<bool> {
        (0..self.depth()).map(|level| self.is_right_at(level)).collect()
    }

    pub fn is_right_at(&self, level: usize) -> bool {
        level < 64 && (self.leaf_index >> level) & 1 == 1
    }

    /// Fold `leaf` with the siblings to obtain the implied root.
    pub fn compute_root(&self, leaf: &Commitment) -> Digest {
        let mut node: Digest = (*leaf).into();
        for (level, sibling) in self.siblings.iter().enumerate() {
            node = if self.is_right_at(level) {
                hash_node(sibling, &node)
            } else {
                hash_node(&node, sibling)
            };
        }
        node
    }

    /// Check that `leaf` sits at `leaf_index` under `root`. Rejects indices
    /// that do not fit the path's depth.
    pub fn verify(&self, leaf: &Commitment, root: &Digest) -> bool {
        let depth = self.depth();
        if depth < 64 && self.leaf_index >> depth != 0 {
            return false;
        }
        self.compute_root(leaf) == *root
    }

    /// Layout used inside proof public inputs: siblings leaf level first,
    /// followed by the leaf index.
    pub fn to_public_inputs(&self) -> Vec<PublicInput> {
        let mut out: Vec<PublicInput> = self.siblings.iter().map(|s| PublicInput::from(*s)).collect();
        out.push(PublicInput::from_u64(self.leaf_index));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommitmentTree;

    #[test]
    fn address_bits_follow_index() {
        let path = AuthenticationPath { leaf_index: 0b101, siblings: vec![Digest::default(); 3] };
        assert_eq!(path.address_bits(), vec![true, false, true]);
    }

    #[test]
    fn verify_rejects_wrong_leaf_and_oversized_index() {
        let mut tree = CommitmentTree::new(3).unwrap();
        for i in 0..3u8 {
            tree.insert(Commitment([i; 32])).unwrap();
        }
        let mut path = tree.path_for(1).unwrap();
        let root = tree.root();
        assert!(path.verify(&Commitment([1; 32]), &root));
        assert!(!path.verify(&Commitment([2; 32]), &root));

        // Same low bits, but index 9 cannot exist in a depth-3 tree.
        path.leaf_index = 9;
        assert_eq!(path.compute_root(&Commitment([1; 32])), root);
        assert!(!path.verify(&Commitment([1; 32]), &root));
    }

    #[test]
    fn public_input_layout() {
        let tree = CommitmentTree::from_commitments(2, [Commitment([7; 32])]).unwrap();
        let path = tree.path_for(0).unwrap();
        let inputs = path.to_public_inputs();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0], PublicInput::from(path.siblings[0]));
        assert_eq!(inputs[2], PublicInput::from_u64(0));
    }
}
