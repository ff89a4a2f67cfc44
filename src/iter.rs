//! Bidirectional iteration over a persistent sequence.
//!
//! [`SequenceCursor`] keeps an explicit path into the tree: a stack of
//! deep-tree frames (which section and digit the path runs through) and a
//! stack of inner-node positions down to the current leaf. Stepping to a
//! neighboring leaf only touches the changed tail of the path, so a full
//! traversal is O(n) and a single step is amortized O(1). The cursor can
//! also be dropped onto an arbitrary position in one O(log n) descent.
//!
//! [`SequenceIterator`] drives two cursors toward each other to provide
//! `Iterator` and `DoubleEndedIterator` over shared elements.

use std::iter::FusedIterator;

use crate::node::{Node, NodeRef};
use crate::tree::Tree;

/// Section of a deep tree a path runs through.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Single,
    Left,
    Middle,
    Right,
}

/// One level of the tree path.
struct TreeFrame<'a, T> {
    tree: &'a Tree<T>,
    section: Section,
    /// Digit index for `Left`/`Right`; unused otherwise.
    index: usize,
}

/// A movable position between the elements of a tree.
///
/// The cursor sits before element `position`; `next` yields that element
/// and moves right, `prev` yields the element before the cursor and moves
/// left. The path stacks are kept pointing at element `position` while one
/// exists and are rebuilt by a single descent otherwise.
pub(crate) struct SequenceCursor<'a, T> {
    root: &'a Tree<T>,
    frames: Vec<TreeFrame<'a, T>>,
    nodes: Vec<(&'a Node<T>, usize)>,
    leaf: Option<&'a T>,
    position: usize,
    synced: bool,
}

impl<'a, T> SequenceCursor<'a, T> {
    pub(crate) fn new(root: &'a Tree<T>, position: usize) -> Self {
        debug_assert!(position <= root.size());
        Self {
            root,
            frames: Vec::new(),
            nodes: Vec::new(),
            leaf: None,
            position,
            synced: false,
        }
    }

    /// Index of the element `next` would yield.
    pub(crate) fn position(&self) -> usize {
        self.position
    }

    /// Yields the element after the cursor and steps right.
    pub(crate) fn next(&mut self) -> Option<&'a T> {
        if self.position >= self.root.size() {
            return None;
        }
        if !self.synced {
            self.seek(self.position);
        }
        let element = self.leaf;
        self.position += 1;
        if self.position < self.root.size() {
            self.advance();
        } else {
            self.desync();
        }
        element
    }

    /// Yields the element before the cursor and steps left.
    pub(crate) fn prev(&mut self) -> Option<&'a T> {
        if self.position == 0 {
            return None;
        }
        if self.synced && self.position < self.root.size() {
            self.retreat();
        } else {
            self.seek(self.position - 1);
        }
        self.position -= 1;
        self.leaf
    }

    fn desync(&mut self) {
        self.frames.clear();
        self.nodes.clear();
        self.leaf = None;
        self.synced = false;
    }

    /// Rebuilds the path stacks to point at element `index`.
    fn seek(&mut self, index: usize) {
        self.frames.clear();
        self.nodes.clear();
        let mut tree = self.root;
        let mut pos = index;
        loop {
            match tree {
                Tree::Empty => unreachable!("seek into an empty tree"),
                Tree::Single(node) => {
                    self.frames.push(TreeFrame {
                        tree,
                        section: Section::Single,
                        index: 0,
                    });
                    self.descend(node, pos);
                    break;
                }
                Tree::Deep {
                    left,
                    left_size,
                    middle,
                    right,
                    ..
                } => {
                    if pos < *left_size {
                        let (digit_index, offset) = locate(left, pos);
                        self.frames.push(TreeFrame {
                            tree,
                            section: Section::Left,
                            index: digit_index,
                        });
                        self.descend(&left[digit_index], offset);
                        break;
                    }
                    pos -= left_size;
                    let mid_size = middle.size();
                    if pos < mid_size {
                        self.frames.push(TreeFrame {
                            tree,
                            section: Section::Middle,
                            index: 0,
                        });
                        tree = middle.as_ref();
                        continue;
                    }
                    let (digit_index, offset) = locate(right, pos - mid_size);
                    self.frames.push(TreeFrame {
                        tree,
                        section: Section::Right,
                        index: digit_index,
                    });
                    self.descend(&right[digit_index], offset);
                    break;
                }
            }
        }
        self.synced = true;
    }

    /// Walks from a digit node down to the leaf at `pos`, recording the
    /// inner-node path.
    fn descend(&mut self, node: &'a NodeRef<T>, pos: usize) {
        let mut current: &'a Node<T> = node.as_ref();
        let mut pos = pos;
        loop {
            match current {
                Node::Leaf(element) => {
                    debug_assert_eq!(pos, 0);
                    self.leaf = Some(element);
                    return;
                }
                Node::Inner { .. } => {
                    let (index, offset) = current.locate(pos);
                    self.nodes.push((current, index));
                    current = current.child(index).as_ref();
                    pos = offset;
                }
            }
        }
    }

    fn descend_last(&mut self, node: &'a NodeRef<T>) {
        self.descend(node, node.size() - 1);
    }

    /// Moves the path to the next leaf; one must exist.
    fn advance(&mut self) {
        while let Some((node, index)) = self.nodes.pop() {
            if index + 1 < node.arity() {
                self.nodes.push((node, index + 1));
                let child = node.child(index + 1);
                self.descend(child, 0);
                return;
            }
        }

        loop {
            let frame = self
                .frames
                .pop()
                .unwrap_or_else(|| unreachable!("advanced past the last element"));
            match frame.section {
                Section::Left => {
                    let Tree::Deep {
                        left,
                        middle,
                        right,
                        ..
                    } = frame.tree
                    else {
                        unreachable!()
                    };
                    if frame.index + 1 < left.len() {
                        self.frames.push(TreeFrame {
                            tree: frame.tree,
                            section: Section::Left,
                            index: frame.index + 1,
                        });
                        self.descend(&left[frame.index + 1], 0);
                        return;
                    }
                    if !middle.is_empty() {
                        self.frames.push(TreeFrame {
                            tree: frame.tree,
                            section: Section::Middle,
                            index: 0,
                        });
                        self.enter_front(middle.as_ref());
                        return;
                    }
                    self.frames.push(TreeFrame {
                        tree: frame.tree,
                        section: Section::Right,
                        index: 0,
                    });
                    self.descend(&right[0], 0);
                    return;
                }
                Section::Middle => {
                    let Tree::Deep { right, .. } = frame.tree else {
                        unreachable!()
                    };
                    self.frames.push(TreeFrame {
                        tree: frame.tree,
                        section: Section::Right,
                        index: 0,
                    });
                    self.descend(&right[0], 0);
                    return;
                }
                Section::Right => {
                    let Tree::Deep { right, .. } = frame.tree else {
                        unreachable!()
                    };
                    if frame.index + 1 < right.len() {
                        self.frames.push(TreeFrame {
                            tree: frame.tree,
                            section: Section::Right,
                            index: frame.index + 1,
                        });
                        self.descend(&right[frame.index + 1], 0);
                        return;
                    }
                    // subtree exhausted, climb further
                }
                Section::Single => {}
            }
        }
    }

    /// Moves the path to the previous leaf; one must exist.
    fn retreat(&mut self) {
        while let Some((node, index)) = self.nodes.pop() {
            if index > 0 {
                self.nodes.push((node, index - 1));
                let child = node.child(index - 1);
                self.descend_last(child);
                return;
            }
        }

        loop {
            let frame = self
                .frames
                .pop()
                .unwrap_or_else(|| unreachable!("retreated before the first element"));
            match frame.section {
                Section::Right => {
                    let Tree::Deep {
                        left,
                        middle,
                        right,
                        ..
                    } = frame.tree
                    else {
                        unreachable!()
                    };
                    if frame.index > 0 {
                        self.frames.push(TreeFrame {
                            tree: frame.tree,
                            section: Section::Right,
                            index: frame.index - 1,
                        });
                        self.descend_last(&right[frame.index - 1]);
                        return;
                    }
                    if !middle.is_empty() {
                        self.frames.push(TreeFrame {
                            tree: frame.tree,
                            section: Section::Middle,
                            index: 0,
                        });
                        self.enter_back(middle.as_ref());
                        return;
                    }
                    self.frames.push(TreeFrame {
                        tree: frame.tree,
                        section: Section::Left,
                        index: left.len() - 1,
                    });
                    self.descend_last(&left[left.len() - 1]);
                    return;
                }
                Section::Middle => {
                    let Tree::Deep { left, .. } = frame.tree else {
                        unreachable!()
                    };
                    self.frames.push(TreeFrame {
                        tree: frame.tree,
                        section: Section::Left,
                        index: left.len() - 1,
                    });
                    self.descend_last(&left[left.len() - 1]);
                    return;
                }
                Section::Left => {
                    let Tree::Deep { left, .. } = frame.tree else {
                        unreachable!()
                    };
                    if frame.index > 0 {
                        self.frames.push(TreeFrame {
                            tree: frame.tree,
                            section: Section::Left,
                            index: frame.index - 1,
                        });
                        self.descend_last(&left[frame.index - 1]);
                        return;
                    }
                    // subtree exhausted, climb further
                }
                Section::Single => {}
            }
        }
    }

    /// Enters a (middle) tree at its first leaf.
    fn enter_front(&mut self, tree: &'a Tree<T>) {
        match tree {
            Tree::Empty => unreachable!("entering an empty tree"),
            Tree::Single(node) => {
                self.frames.push(TreeFrame {
                    tree,
                    section: Section::Single,
                    index: 0,
                });
                self.descend(node, 0);
            }
            Tree::Deep { left, .. } => {
                self.frames.push(TreeFrame {
                    tree,
                    section: Section::Left,
                    index: 0,
                });
                self.descend(&left[0], 0);
            }
        }
    }

    /// Enters a (middle) tree at its last leaf.
    fn enter_back(&mut self, tree: &'a Tree<T>) {
        match tree {
            Tree::Empty => unreachable!("entering an empty tree"),
            Tree::Single(node) => {
                self.frames.push(TreeFrame {
                    tree,
                    section: Section::Single,
                    index: 0,
                });
                self.descend_last(node);
            }
            Tree::Deep { right, .. } => {
                self.frames.push(TreeFrame {
                    tree,
                    section: Section::Right,
                    index: right.len() - 1,
                });
                self.descend_last(&right[right.len() - 1]);
            }
        }
    }
}

/// Locates the digit node containing element offset `pos`.
fn locate<T>(nodes: &[NodeRef<T>], pos: usize) -> (usize, usize) {
    let mut index = 0;
    let mut offset = pos;
    loop {
        let node_size = nodes[index].size();
        if offset < node_size {
            return (index, offset);
        }
        offset -= node_size;
        index += 1;
    }
}

/// Borrowed iterator over a persistent sequence.
///
/// Created by [`crate::PersistentSequence::iter`] and
/// [`crate::PersistentSequence::iter_from`]. Supports iteration from both
/// ends; the two directions meet in the middle.
pub struct SequenceIterator<'a, T> {
    front: SequenceCursor<'a, T>,
    back: SequenceCursor<'a, T>,
}

impl<'a, T> SequenceIterator<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, start: usize) -> Self {
        Self {
            front: SequenceCursor::new(tree, start),
            back: SequenceCursor::new(tree, tree.size()),
        }
    }
}

impl<'a, T> Iterator for SequenceIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front.position() >= self.back.position() {
            return None;
        }
        self.front.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.position() - self.front.position();
        (remaining, Some(remaining))
    }
}

impl<'a, T> DoubleEndedIterator for SequenceIterator<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.front.position() >= self.back.position() {
            return None;
        }
        self.back.prev()
    }
}

impl<T> ExactSizeIterator for SequenceIterator<'_, T> {}

impl<T> FusedIterator for SequenceIterator<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use rstest::rstest;

    fn tree_of(count: i32) -> Tree<i32> {
        let mut tree = Tree::Empty;
        for value in 0..count {
            tree = tree.snoc(Node::leaf(value));
        }
        tree
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    #[case(100)]
    fn test_forward_iteration(#[case] count: i32) {
        let tree = tree_of(count);
        let collected: Vec<i32> = SequenceIterator::new(&tree, 0).copied().collect();
        assert_eq!(collected, (0..count).collect::<Vec<_>>());
    }

    #[rstest]
    #[case(1)]
    #[case(37)]
    #[case(100)]
    fn test_backward_iteration(#[case] count: i32) {
        let tree = tree_of(count);
        let collected: Vec<i32> = SequenceIterator::new(&tree, 0).rev().copied().collect();
        assert_eq!(collected, (0..count).rev().collect::<Vec<_>>());
    }

    #[rstest]
    fn test_iteration_from_offset() {
        let tree = tree_of(60);
        let collected: Vec<i32> = SequenceIterator::new(&tree, 42).copied().collect();
        assert_eq!(collected, (42..60).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_meet_in_the_middle() {
        let tree = tree_of(10);
        let mut iterator = SequenceIterator::new(&tree, 0);
        let mut front = Vec::new();
        let mut back = Vec::new();
        loop {
            match iterator.next() {
                Some(value) => front.push(*value),
                None => break,
            }
            if let Some(value) = iterator.next_back() {
                back.push(*value);
            }
        }
        assert_eq!(front, vec![0, 1, 2, 3, 4]);
        assert_eq!(back, vec![9, 8, 7, 6, 5]);
    }

    #[rstest]
    fn test_exact_size() {
        let tree = tree_of(25);
        let mut iterator = SequenceIterator::new(&tree, 0);
        assert_eq!(iterator.len(), 25);
        iterator.next();
        iterator.next_back();
        assert_eq!(iterator.len(), 23);
    }

    #[rstest]
    fn test_cursor_direction_changes() {
        let tree = tree_of(30);
        let mut cursor = SequenceCursor::new(&tree, 15);
        assert_eq!(cursor.next(), Some(&15));
        assert_eq!(cursor.next(), Some(&16));
        assert_eq!(cursor.prev(), Some(&16));
        assert_eq!(cursor.prev(), Some(&15));
        assert_eq!(cursor.prev(), Some(&14));
        assert_eq!(cursor.next(), Some(&14));
    }

    #[rstest]
    fn test_cursor_walks_whole_tree_both_ways() {
        let tree = tree_of(200);
        let mut cursor = SequenceCursor::new(&tree, 0);
        for expected in 0..200 {
            assert_eq!(cursor.next(), Some(&expected));
        }
        assert_eq!(cursor.next(), None);
        for expected in (0..200).rev() {
            assert_eq!(cursor.prev(), Some(&expected));
        }
        assert_eq!(cursor.prev(), None);
    }
}
