// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use rayon::prelude::*;

use super::*;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// A layer of the Merkle tree consists of a dense array of hashes at that level of the tree.
#[derive(Clone, Debug)]
pub struct Layer(pub Vec<CryptoHash>);

impl Layer {
    /// Takes a Layer representing some level in the tree, and calculates the next-higher level in the tree.
    /// An odd node at the end of a layer is carried up unchanged.
    pub fn up(&self) -> Self {
        let v = self
            .0
            .par_chunks(2)
            .map(|c| match c {
                [l, r] => node_hash(l, r),
                [single] => *single,
                _ => unreachable!("chunks of two"),
            })
            .collect();

        Layer(v)
    }
}

fn node_hash(l: &CryptoHash, r: &CryptoHash) -> CryptoHash {
    let mut buf = [0; 1 + 2 * HASH_LEN];
    buf[0] = NODE_PREFIX;
    buf[1..=HASH_LEN].copy_from_slice(&l.0);
    buf[1 + HASH_LEN..].copy_from_slice(&r.0);
    hash(&buf)
}

/// Hashes leaf data, domain-separated from inner nodes.
pub fn leaf_hash(data: &[u8]) -> CryptoHash {
    let mut buf = Vec::with_capacity(1 + data.len());
    buf.push(LEAF_PREFIX);
    buf.extend_from_slice(data);
    hash(&buf)
}

/// Merkle tree, represented by layers of nodes (hashes) in the tree at each height.
#[derive(Clone, Debug)]
pub struct Tree {
    /// Levels of the tree from level 0 (leaves) to level h-1 (root).
    pub levels: Vec<Layer>,
}

impl Tree {
    /// Constructs a Merkle tree over raw leaf data.
    pub fn from_leaves<T: AsRef<[u8]>>(leaves: &[T]) -> Self {
        let mut tree = Self {
            levels: vec![Layer(leaves.iter().map(|l| leaf_hash(l.as_ref())).collect())],
        };

        while tree.top_layer().0.len() > 1 {
            let next = tree.top_layer().up();
            tree.levels.push(next);
        }

        tree
    }

    /// Returns the root hash of the Merkle tree.
    pub fn root(&self) -> CryptoHash {
        // Special case: commitment to zero-length array
        if self.levels[0].0.is_empty() {
            return CryptoHash([0; HASH_LEN]);
        }

        self.top_layer().0[0]
    }

    fn top_layer(&self) -> &Layer {
        &self.levels[self.levels.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let leaves: Vec<Vec<u8>> = Vec::new();
        assert!(Tree::from_leaves(&leaves).root().is_zero());
    }

    #[test]
    fn single_leaf() {
        let tree = Tree::from_leaves(&[b"a"]);
        assert_eq!(tree.root(), leaf_hash(b"a"));
        assert_eq!(tree.levels.len(), 1);
    }

    #[test]
    fn odd_leaf_is_promoted() {
        let tree = Tree::from_leaves(&[b"a", b"b", b"c"]);
        let ab = node_hash(&leaf_hash(b"a"), &leaf_hash(b"b"));
        assert_eq!(tree.root(), node_hash(&ab, &leaf_hash(b"c")));
        assert_eq!(tree.levels.len(), 3);
    }

    #[test]
    fn order_matters() {
        let a = Tree::from_leaves(&[b"a", b"b"]).root();
        let b = Tree::from_leaves(&[b"b", b"a"]).root();
        assert_ne!(a, b);
    }
}
