//! Huffman tree construction
//!
//! Nodes are merged lowest weight first. Ties are broken by a sequence
//! number: leaves take their first-seen position in the frequency table,
//! merged nodes take increasing numbers after all leaves. The resulting
//! tree is therefore fully determined by the input.

use crate::frequency::FrequencyTable;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        symbol: char,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn merge(left: Node, right: Node) -> Node {
        Node::Internal {
            weight: left.weight() + right.weight(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(Debug)]
struct HeapEntry {
    order: usize,
    node: Node,
}

impl HeapEntry {
    fn key(&self) -> (u64, usize) {
        (self.node.weight(), self.order)
    }
}

impl Eq for HeapEntry {}
impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key()) // min-heap
    }
}

/// Build the Huffman tree for `frequencies`.
///
/// Returns `None` for an empty table. A table with one symbol yields a
/// single leaf.
pub fn build_tree(frequencies: &FrequencyTable) -> Option<Node> {
    let mut heap: BinaryHeap<HeapEntry> = frequencies
        .iter()
        .enumerate()
        .map(|(order, (symbol, weight))| HeapEntry {
            order,
            node: Node::Leaf { symbol, weight },
        })
        .collect();

    let mut next_order = heap.len();
    while heap.len() > 1 {
        let (Some(left), Some(right)) = (heap.pop(), heap.pop()) else {
            break;
        };
        heap.push(HeapEntry {
            order: next_order,
            node: Node::merge(left.node, right.node),
        });
        next_order += 1;
    }

    let root = heap.pop().map(|entry| entry.node);
    if let Some(ref root) = root {
        tracing::debug!(
            leaves = root.leaf_count(),
            depth = root.depth(),
            weight = root.weight(),
            "built huffman tree"
        );
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> FrequencyTable {
        text.chars().collect()
    }

    fn check_weights(node: &Node) {
        if let Node::Internal { weight, left, right } = node {
            assert_eq!(*weight, left.weight() + right.weight());
            check_weights(left);
            check_weights(right);
        }
    }

    #[test]
    fn test_empty_table() {
        assert!(build_tree(&FrequencyTable::new()).is_none());
    }

    #[test]
    fn test_single_symbol_is_leaf() {
        let root = build_tree(&table("aaaa")).unwrap();
        assert_eq!(
            root,
            Node::Leaf {
                symbol: 'a',
                weight: 4
            }
        );
        assert_eq!(root.depth(), 0);
        assert!(root.is_leaf());
    }

    #[test]
    fn test_abracadabra_shape() {
        let root = build_tree(&table("abracadabra")).unwrap();
        assert_eq!(root.weight(), 11);
        assert!(!root.is_leaf());
        assert_eq!(root.leaf_count(), 5);
        assert_eq!(root.depth(), 3);
        check_weights(&root);

        // ties on weight 1 and 2 resolve by first-seen order
        let Node::Internal { left, right, .. } = &root else {
            panic!("root should be internal");
        };
        assert_eq!(
            **left,
            Node::Leaf {
                symbol: 'a',
                weight: 5
            }
        );
        assert_eq!(right.weight(), 6);
    }

    #[test]
    fn test_deterministic() {
        let text = "the quick brown fox jumps over the lazy dog";
        assert_eq!(build_tree(&table(text)), build_tree(&table(text)));
    }

    #[test]
    fn test_skewed_weights() {
        // fibonacci-like counts give the deepest possible tree
        let mut text = String::new();
        for (symbol, count) in ['a', 'b', 'c', 'd', 'e', 'f'].iter().zip([1, 1, 2, 3, 5, 8]) {
            text.extend(std::iter::repeat(*symbol).take(count));
        }
        let root = build_tree(&table(&text)).unwrap();
        assert_eq!(root.depth(), 5);
        check_weights(&root);
    }
}
