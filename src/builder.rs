//! Amortized O(1) bulk construction of persistent sequences.
//!
//! Building a sequence through [`crate::PersistentSequence::push_back`]
//! pays the persistent structure's cloning cost on every step. The
//! [`SequenceBuilder`] avoids that: each tree level is staged in a mutable
//! ring buffer holding up to one digit's worth of nodes per side, and a
//! full side flushes its [`NODE_SIZE`] innermost nodes as a single inner
//! node into the next level's buffer — the same grouping the tree itself
//! uses, so freezing produces a tree with valid digits at every level.
//!
//! Appending an already-built sequence does not iterate its elements: the
//! staged levels are frozen, the two trees are concatenated in O(log n),
//! and the result is re-opened as a buffer.

use crate::ReferenceCounter;
use crate::cancel::NeverCancel;
use crate::node::{MAX_DIGIT, NODE_SIZE, Node, NodeRef};
use crate::sequence::PersistentSequence;
use crate::tree::Tree;

/// Ring capacity: one full digit per side.
const BUFFER_CAP: usize = 2 * MAX_DIGIT;

/// Middle of a staged level: empty, another staged level, or a tree taken
/// over from a finished sequence.
enum LevelMiddle<T> {
    Empty,
    Level(Box<BufferLevel<T>>),
    Tree(Tree<T>),
}

/// One staged tree level: a ring buffer split into a left and a right run
/// of same-level nodes around a boundary slot.
struct BufferLevel<T> {
    nodes: [Option<NodeRef<T>>; BUFFER_CAP],
    /// Boundary slot: left nodes end here, right nodes start here.
    mid: usize,
    in_left: usize,
    in_right: usize,
    middle: LevelMiddle<T>,
}

impl<T> BufferLevel<T> {
    fn new() -> Self {
        Self {
            nodes: [const { None }; BUFFER_CAP],
            mid: BUFFER_CAP / 2,
            in_left: 0,
            in_right: 0,
            middle: LevelMiddle::Empty,
        }
    }

    fn slot(&self, offset: isize) -> usize {
        (self.mid as isize + offset).rem_euclid(BUFFER_CAP as isize) as usize
    }

    fn take(&mut self, offset: isize) -> NodeRef<T> {
        let slot = self.slot(offset);
        self.nodes[slot].take().unwrap_or_else(|| unreachable!())
    }

    fn put(&mut self, offset: isize, node: NodeRef<T>) {
        let slot = self.slot(offset);
        debug_assert!(self.nodes[slot].is_none());
        self.nodes[slot] = Some(node);
    }

    fn prepend(&mut self, node: NodeRef<T>) {
        if self.in_left < MAX_DIGIT {
            self.put(-(self.in_left as isize) - 1, node);
            self.in_left += 1;
            return;
        }

        // flush the innermost nodes into the next level, keep the outermost
        let mut flushed: [Option<NodeRef<T>>; NODE_SIZE] = [const { None }; NODE_SIZE];
        for (index, slot) in flushed.iter_mut().enumerate() {
            *slot = Some(self.take(index as isize - NODE_SIZE as isize));
        }
        let inner = Node::inner(
            flushed
                .into_iter()
                .map(|slot| slot.unwrap_or_else(|| unreachable!()))
                .collect(),
        );
        let outermost = self.take(-(MAX_DIGIT as isize));
        self.put(-1, outermost);
        self.in_left = 1;
        self.prepend_middle(inner);

        self.put(-2, node);
        self.in_left = 2;
    }

    fn append(&mut self, node: NodeRef<T>) {
        if self.in_right < MAX_DIGIT {
            self.put(self.in_right as isize, node);
            self.in_right += 1;
            return;
        }

        let mut flushed: [Option<NodeRef<T>>; NODE_SIZE] = [const { None }; NODE_SIZE];
        for (index, slot) in flushed.iter_mut().enumerate() {
            *slot = Some(self.take(index as isize));
        }
        let inner = Node::inner(
            flushed
                .into_iter()
                .map(|slot| slot.unwrap_or_else(|| unreachable!()))
                .collect(),
        );
        let outermost = self.take(MAX_DIGIT as isize - 1);
        self.put(0, outermost);
        self.in_right = 1;
        self.append_middle(inner);

        self.put(1, node);
        self.in_right = 2;
    }

    fn prepend_middle(&mut self, node: NodeRef<T>) {
        match &mut self.middle {
            LevelMiddle::Empty => {
                let mut level = Box::new(Self::new());
                level.prepend(node);
                self.middle = LevelMiddle::Level(level);
            }
            LevelMiddle::Level(level) => level.prepend(node),
            LevelMiddle::Tree(tree) => {
                let taken = std::mem::replace(tree, Tree::Empty);
                *tree = taken.cons(node);
            }
        }
    }

    fn append_middle(&mut self, node: NodeRef<T>) {
        match &mut self.middle {
            LevelMiddle::Empty => {
                let mut level = Box::new(Self::new());
                level.append(node);
                self.middle = LevelMiddle::Level(level);
            }
            LevelMiddle::Level(level) => level.append(node),
            LevelMiddle::Tree(tree) => {
                let taken = std::mem::replace(tree, Tree::Empty);
                *tree = taken.snoc(node);
            }
        }
    }

    /// Re-opens a finished tree as a staged level.
    fn from_tree(tree: Tree<T>) -> Self {
        let mut level = Self::new();
        match tree {
            Tree::Empty => {}
            Tree::Single(node) => {
                level.put(0, node);
                level.in_right = 1;
            }
            Tree::Deep {
                left,
                middle,
                right,
                ..
            } => {
                level.in_left = left.len();
                for (index, node) in left.into_iter().enumerate() {
                    let offset = index as isize - level.in_left as isize;
                    level.put(offset, node);
                }
                level.in_right = right.len();
                for (index, node) in right.into_iter().enumerate() {
                    level.put(index as isize, node);
                }
                let middle =
                    ReferenceCounter::try_unwrap(middle).unwrap_or_else(|shared| (*shared).clone());
                if !middle.is_empty() {
                    level.middle = LevelMiddle::Tree(middle);
                }
            }
        }
        level
    }

    /// Builds the immutable tree bottom-up, borrowing digit nodes from the
    /// middle when one side is empty.
    fn freeze(mut self) -> Tree<T> {
        let (in_left, in_right) = (self.in_left, self.in_right);
        let mut left: Vec<NodeRef<T>> = Vec::with_capacity(MAX_DIGIT);
        for index in 0..in_left {
            left.push(self.take(index as isize - in_left as isize));
        }
        let mut right: Vec<NodeRef<T>> = Vec::with_capacity(MAX_DIGIT);
        for index in 0..in_right {
            right.push(self.take(index as isize));
        }

        let mut mid_tree = match std::mem::replace(&mut self.middle, LevelMiddle::Empty) {
            LevelMiddle::Empty => Tree::Empty,
            LevelMiddle::Level(inner) => inner.freeze(),
            LevelMiddle::Tree(tree) => tree,
        };

        if left.is_empty() {
            if mid_tree.is_empty() {
                return line_to_tree(&right);
            }
            let head = mid_tree.head().clone();
            left.extend(head.children().iter().cloned());
            mid_tree = mid_tree.tail();
        }

        if right.is_empty() {
            if mid_tree.is_empty() {
                return line_to_tree(&left);
            }
            let last = mid_tree.last().clone();
            right.extend(last.children().iter().cloned());
            mid_tree = mid_tree.init();
        }

        Tree::deep_of(&left, mid_tree, &right)
    }
}

/// Tree from a short run of same-level nodes without a middle.
fn line_to_tree<T>(nodes: &[NodeRef<T>]) -> Tree<T> {
    let size = nodes.iter().map(|node| node.size()).sum();
    Tree::build_tree(nodes, size)
}

/// Mutable staging area that assembles a [`PersistentSequence`] with
/// amortized O(1) pushes at both ends.
///
/// # Examples
///
/// ```rust
/// use fingerseq::SequenceBuilder;
///
/// let mut builder = SequenceBuilder::new();
/// for value in 0..1000 {
///     builder.push_back(value);
/// }
/// builder.push_front(-1);
///
/// let sequence = builder.freeze();
/// assert_eq!(sequence.len(), 1001);
/// assert_eq!(sequence.get(0), Some(&-1));
/// assert_eq!(sequence.get(1000), Some(&999));
/// ```
pub struct SequenceBuilder<T> {
    root: BufferLevel<T>,
    len: usize,
}

impl<T> SequenceBuilder<T> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: BufferLevel::new(),
            len: 0,
        }
    }

    /// Number of elements staged so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stages `value` before all current elements. Amortized O(1).
    pub fn push_front(&mut self, value: T) {
        self.root.prepend(Node::leaf(value));
        self.len += 1;
    }

    /// Stages `value` after all current elements. Amortized O(1).
    pub fn push_back(&mut self, value: T) {
        self.root.append(Node::leaf(value));
        self.len += 1;
    }

    /// Appends a finished sequence in O(log n), merging its digits and
    /// middle instead of iterating its elements.
    pub fn append_sequence(&mut self, other: &PersistentSequence<T>) {
        if other.is_empty() {
            return;
        }
        let staged = std::mem::replace(&mut self.root, BufferLevel::new()).freeze();
        let joined = staged
            .concat(&[], other.tree(), &NeverCancel)
            .unwrap_or_else(|_| unreachable!());
        self.root = BufferLevel::from_tree(joined);
        self.len += other.len();
    }

    /// Finishes the build and returns the immutable sequence.
    #[must_use]
    pub fn freeze(self) -> PersistentSequence<T> {
        PersistentSequence::from_tree(self.root.freeze())
    }
}

impl<T> Default for SequenceBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for SequenceBuilder<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for SequenceBuilder<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut builder = Self::new();
        builder.extend(iter);
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_is_range(sequence: &PersistentSequence<i32>, range: std::ops::Range<i32>) {
        assert_eq!(sequence.len(), range.len());
        for (index, expected) in range.enumerate() {
            assert_eq!(sequence.get(index), Some(&expected));
        }
        sequence.check_invariants();
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(9)]
    #[case(10)]
    #[case(11)]
    #[case(100)]
    #[case(1000)]
    fn test_push_back_builds_range(#[case] count: i32) {
        let mut builder = SequenceBuilder::new();
        for value in 0..count {
            builder.push_back(value);
        }
        assert_is_range(&builder.freeze(), 0..count);
    }

    #[rstest]
    #[case(1)]
    #[case(5)]
    #[case(42)]
    #[case(500)]
    fn test_push_front_builds_reversed_range(#[case] count: i32) {
        let mut builder = SequenceBuilder::new();
        for value in (0..count).rev() {
            builder.push_front(value);
        }
        assert_is_range(&builder.freeze(), 0..count);
    }

    #[rstest]
    fn test_mixed_pushes() {
        let mut builder = SequenceBuilder::new();
        for value in 50..100 {
            builder.push_back(value);
        }
        for value in (0..50).rev() {
            builder.push_front(value);
        }
        assert_is_range(&builder.freeze(), 0..100);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(0, 25)]
    #[case(25, 0)]
    #[case(3, 200)]
    #[case(200, 77)]
    fn test_append_sequence(#[case] staged: i32, #[case] appended: i32) {
        let mut builder = SequenceBuilder::new();
        for value in 0..staged {
            builder.push_back(value);
        }
        let other: PersistentSequence<i32> = (staged..staged + appended).collect();
        builder.append_sequence(&other);
        assert_is_range(&builder.freeze(), 0..staged + appended);
    }

    #[rstest]
    fn test_push_after_append_sequence() {
        let mut builder = SequenceBuilder::new();
        let other: PersistentSequence<i32> = (0..60).collect();
        builder.append_sequence(&other);
        for value in 60..90 {
            builder.push_back(value);
        }
        builder.push_front(-1);
        let sequence = builder.freeze();
        assert_eq!(sequence.len(), 91);
        assert_eq!(sequence.get(0), Some(&-1));
        assert_eq!(sequence.get(90), Some(&89));
        sequence.check_invariants();
    }

    #[rstest]
    fn test_from_iterator() {
        let builder: SequenceBuilder<i32> = (0..250).collect();
        assert_eq!(builder.len(), 250);
        assert_is_range(&builder.freeze(), 0..250);
    }
}
