//! The size-annotated finger tree behind [`crate::PersistentSequence`].
//!
//! A [`Tree`] is `Empty`, a `Single` node, or `Deep`: a left digit, a middle
//! tree whose digits hold nodes one level higher, and a right digit. Digits
//! are 1–5 nodes wide; the extra slot over the inner-node arity gives the
//! front and back edits their amortized O(1) bound. `Deep` caches the total
//! size and the left digit's size so positional descent decides
//! left/middle/right with two comparisons.
//!
//! Editing operations return fresh trees sharing all untouched nodes.
//! `remove` and `slice` may cut a tree down below the two-children minimum
//! of an inner node; such results travel as [`TreeSlice::Partial`] until an
//! enclosing level folds the fragment into a digit.

use std::fmt;

use smallvec::SmallVec;

use crate::ReferenceCounter;
use crate::cancel::{Cancellation, Cancelled};
use crate::node::{
    Digit, MAX_ARITY, MAX_DIGIT, NODE_SIZE, Node, NodeBuffer, NodeInsert, NodeLike, NodeRef,
    NodeRemove, nodes_size, push_node_like,
};

/// Reference-counted tree pointer used for middle trees.
pub(crate) type TreeRef<T> = ReferenceCounter<Tree<T>>;

/// Result of an operation that may leave fewer nodes than a tree requires.
///
/// `Partial` carries a single node below the digit level of the tree the
/// operation ran on; the caller folds it into a neighboring digit.
pub(crate) enum TreeSlice<T> {
    Tree(Tree<T>),
    Partial(NodeRef<T>),
}

/// A finger tree over reference-counted nodes.
pub(crate) enum Tree<T> {
    /// No elements.
    Empty,
    /// Exactly one node.
    Single(NodeRef<T>),
    /// Two digits around a middle tree one level up.
    Deep {
        left: Digit<T>,
        /// Cached size of the left digit.
        left_size: usize,
        middle: TreeRef<T>,
        right: Digit<T>,
        /// Cached size of the whole tree.
        size: usize,
    },
}

impl<T> Clone for Tree<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Single(node) => Self::Single(node.clone()),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => Self::Deep {
                left: left.clone(),
                left_size: *left_size,
                middle: middle.clone(),
                right: right.clone(),
                size: *size,
            },
        }
    }
}

// =============================================================================
// Digit Helpers
// =============================================================================

/// Collects node references into a digit.
fn digit<T>(nodes: &[NodeRef<T>]) -> Digit<T> {
    debug_assert!((1..=MAX_DIGIT).contains(&nodes.len()));
    nodes.iter().cloned().collect()
}

/// A digit holding one node.
fn digit_one<T>(node: NodeRef<T>) -> Digit<T> {
    let mut digit = Digit::new();
    digit.push(node);
    digit
}

/// Locates the node containing element offset `pos` (strict).
fn digit_locate<T>(nodes: &[NodeRef<T>], pos: usize) -> (usize, usize) {
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

/// Locates the insertion node for element offset `pos`; an offset on a node
/// boundary belongs to the earlier node.
fn digit_locate_inclusive<T>(nodes: &[NodeRef<T>], pos: usize) -> (usize, usize) {
    let mut index = 0;
    let mut offset = pos;
    loop {
        let node_size = nodes[index].size();
        if offset <= node_size {
            return (index, offset);
        }
        offset -= node_size;
        index += 1;
    }
}

fn share<T>(tree: Tree<T>) -> TreeRef<T> {
    ReferenceCounter::new(tree)
}

// =============================================================================
// Construction
// =============================================================================

impl<T> Tree<T> {
    /// Deep tree with a known total size; the left digit size is computed.
    fn deep(left: Digit<T>, middle: TreeRef<T>, right: Digit<T>, size: usize) -> Self {
        let left_size = nodes_size(&left);
        Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        }
    }

    /// Deep tree with all cached sizes supplied by the caller.
    fn deep_sized(
        left: Digit<T>,
        left_size: usize,
        middle: TreeRef<T>,
        right: Digit<T>,
        size: usize,
    ) -> Self {
        debug_assert_eq!(left_size, nodes_size(&left));
        debug_assert_eq!(size, left_size + middle.size() + nodes_size(&right));
        Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        }
    }

    /// Deep tree computing every cached size.
    fn deep_all(left: Digit<T>, middle: TreeRef<T>, right: Digit<T>) -> Self {
        let left_size = nodes_size(&left);
        let size = left_size + middle.size() + nodes_size(&right);
        Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        }
    }

    /// Deep tree assembled from node slices, computing all cached sizes.
    pub(crate) fn deep_of(left: &[NodeRef<T>], middle: Self, right: &[NodeRef<T>]) -> Self {
        Self::deep_all(digit(left), share(middle), digit(right))
    }

    /// Builds a balanced tree from same-level nodes in one pass.
    ///
    /// `size` is the total element count of `nodes`. Up to two digits' worth
    /// of nodes become a flat deep tree; longer inputs keep [`NODE_SIZE`]
    /// nodes per digit and group the rest into evenly sized inner nodes for
    /// the next level.
    pub(crate) fn build_tree(nodes: &[NodeRef<T>], size: usize) -> Self {
        let count = nodes.len();
        if count == 0 {
            return Self::Empty;
        }
        if count == 1 {
            return Self::Single(nodes[0].clone());
        }
        if count <= 2 * MAX_DIGIT {
            let mid = count / 2;
            return Self::deep(
                digit(&nodes[..mid]),
                share(Self::Empty),
                digit(&nodes[mid..]),
                size,
            );
        }

        let left = digit(&nodes[..NODE_SIZE]);
        let right = digit(&nodes[count - NODE_SIZE..]);
        let rest = &nodes[NODE_SIZE..count - NODE_SIZE];
        let groups = rest.len().div_ceil(MAX_ARITY);
        let mut grouped: Vec<NodeRef<T>> = Vec::with_capacity(groups);
        let mut taken = 0;
        for group in 0..groups {
            let remaining_groups = groups - group;
            let width = (rest.len() - taken).div_ceil(remaining_groups);
            grouped.push(Node::inner_from_slice(&rest[taken..taken + width]));
            taken += width;
        }
        let middle = Self::build_tree(&grouped, nodes_size(rest));
        Self::deep(left, share(middle), right, size)
    }
}

// =============================================================================
// Queries
// =============================================================================

impl<T> Tree<T> {
    pub(crate) fn size(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(node) => node.size(),
            Self::Deep { size, .. } => *size,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// First node; the tree must not be empty.
    pub(crate) fn head(&self) -> &NodeRef<T> {
        match self {
            Self::Empty => unreachable!("head of an empty tree"),
            Self::Single(node) => node,
            Self::Deep { left, .. } => &left[0],
        }
    }

    /// Last node; the tree must not be empty.
    pub(crate) fn last(&self) -> &NodeRef<T> {
        match self {
            Self::Empty => unreachable!("last of an empty tree"),
            Self::Single(node) => node,
            Self::Deep { right, .. } => &right[right.len() - 1],
        }
    }

    /// Element at position `pos`; `pos` must be within bounds.
    pub(crate) fn get(&self, pos: usize) -> &T {
        match self {
            Self::Empty => unreachable!("indexing into an empty tree"),
            Self::Single(node) => node.get(pos),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                ..
            } => {
                if pos < *left_size {
                    let (index, offset) = digit_locate(left, pos);
                    return left[index].get(offset);
                }
                let pos = pos - left_size;
                let mid_size = middle.size();
                if pos < mid_size {
                    return middle.get(pos);
                }
                let (index, offset) = digit_locate(right, pos - mid_size);
                right[index].get(offset)
            }
        }
    }
}

// =============================================================================
// Front and Back Edits
// =============================================================================

impl<T> Tree<T> {
    /// Prepends a node. A full left digit first flushes its [`NODE_SIZE`]
    /// oldest nodes as one inner node into the middle.
    pub(crate) fn cons(&self, node: NodeRef<T>) -> Self {
        let node_size = node.size();
        match self {
            Self::Empty => Self::Single(node),
            Self::Single(existing) => {
                let size = node_size + existing.size();
                Self::deep_sized(
                    digit_one(node),
                    node_size,
                    share(Self::Empty),
                    digit_one(existing.clone()),
                    size,
                )
            }
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                if left.len() < MAX_DIGIT {
                    let mut new_left = digit_one(node);
                    new_left.extend(left.iter().cloned());
                    return Self::deep_sized(
                        new_left,
                        left_size + node_size,
                        middle.clone(),
                        right.clone(),
                        size + node_size,
                    );
                }

                let boundary = left.len() - NODE_SIZE;
                let flushed = Node::inner_from_slice(&left[boundary..]);
                let mut new_left = digit_one(node);
                new_left.extend(left[..boundary].iter().cloned());
                Self::deep(
                    new_left,
                    share(middle.cons(flushed)),
                    right.clone(),
                    size + node_size,
                )
            }
        }
    }

    /// Appends a node; mirror image of [`Tree::cons`].
    pub(crate) fn snoc(&self, node: NodeRef<T>) -> Self {
        let node_size = node.size();
        match self {
            Self::Empty => Self::Single(node),
            Self::Single(existing) => {
                let size = node_size + existing.size();
                Self::deep_sized(
                    digit_one(existing.clone()),
                    existing.size(),
                    share(Self::Empty),
                    digit_one(node),
                    size,
                )
            }
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                if right.len() < MAX_DIGIT {
                    let mut new_right = right.clone();
                    new_right.push(node);
                    return Self::deep_sized(
                        left.clone(),
                        *left_size,
                        middle.clone(),
                        new_right,
                        size + node_size,
                    );
                }

                let flushed = Node::inner_from_slice(&right[..NODE_SIZE]);
                let mut new_right = digit(&right[NODE_SIZE..]);
                new_right.push(node);
                Self::deep_sized(
                    left.clone(),
                    *left_size,
                    share(middle.snoc(flushed)),
                    new_right,
                    size + node_size,
                )
            }
        }
    }

    /// Tree without its first node; the tree must not be empty.
    pub(crate) fn tail(&self) -> Self {
        match self {
            Self::Empty => unreachable!("tail of an empty tree"),
            Self::Single(_) => Self::Empty,
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                let first_size = left[0].size();
                let new_size = size - first_size;

                if left.len() > 1 {
                    return Self::deep_sized(
                        digit(&left[1..]),
                        left_size - first_size,
                        middle.clone(),
                        right.clone(),
                        new_size,
                    );
                }

                if middle.is_empty() {
                    if right.len() == 1 {
                        return Self::Single(right[0].clone());
                    }
                    let mid = right.len() / 2;
                    return Self::deep(
                        digit(&right[..mid]),
                        share(Self::Empty),
                        digit(&right[mid..]),
                        new_size,
                    );
                }

                // refill the left digit from the middle
                let head = middle.head().clone();
                Self::deep_sized(
                    digit(head.children()),
                    head.size(),
                    share(middle.tail()),
                    right.clone(),
                    new_size,
                )
            }
        }
    }

    /// Tree without its last node; mirror image of [`Tree::tail`].
    pub(crate) fn init(&self) -> Self {
        match self {
            Self::Empty => unreachable!("init of an empty tree"),
            Self::Single(_) => Self::Empty,
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                let new_size = size - right[right.len() - 1].size();

                if right.len() > 1 {
                    return Self::deep_sized(
                        left.clone(),
                        *left_size,
                        middle.clone(),
                        digit(&right[..right.len() - 1]),
                        new_size,
                    );
                }

                if middle.is_empty() {
                    if left.len() == 1 {
                        return Self::Single(left[0].clone());
                    }
                    let mid = left.len() / 2;
                    return Self::deep(
                        digit(&left[..mid]),
                        share(Self::Empty),
                        digit(&left[mid..]),
                        new_size,
                    );
                }

                // refill the right digit from the middle
                let last = middle.last().clone();
                Self::deep_sized(
                    left.clone(),
                    *left_size,
                    share(middle.init()),
                    digit(last.children()),
                    new_size,
                )
            }
        }
    }

    /// Replaces the first node, adjusting cached sizes for a size change.
    pub(crate) fn replace_head(&self, node: NodeRef<T>) -> Self {
        match self {
            Self::Empty => unreachable!("replacing the head of an empty tree"),
            Self::Single(_) => Self::Single(node),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                let new_size = node.size();
                let old_size = left[0].size();
                let mut new_left = left.clone();
                new_left[0] = node;
                Self::deep_sized(
                    new_left,
                    left_size + new_size - old_size,
                    middle.clone(),
                    right.clone(),
                    size + new_size - old_size,
                )
            }
        }
    }

    /// Replaces the last node, adjusting cached sizes for a size change.
    pub(crate) fn replace_last(&self, node: NodeRef<T>) -> Self {
        match self {
            Self::Empty => unreachable!("replacing the last of an empty tree"),
            Self::Single(_) => Self::Single(node),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                let last = right.len() - 1;
                let new_size = node.size();
                let old_size = right[last].size();
                let mut new_right = right.clone();
                new_right[last] = node;
                Self::deep_sized(
                    left.clone(),
                    *left_size,
                    middle.clone(),
                    new_right,
                    size + new_size - old_size,
                )
            }
        }
    }
}

// =============================================================================
// Positional Edits
// =============================================================================

impl<T> Tree<T> {
    /// Replaces the element at `pos`, sharing everything but the spine.
    pub(crate) fn update(&self, pos: usize, value: T) -> Self {
        match self {
            Self::Empty => unreachable!("updating an empty tree"),
            Self::Single(node) => Self::Single(node.update(pos, value)),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                if pos < *left_size {
                    let (index, offset) = digit_locate(left, pos);
                    let mut new_left = left.clone();
                    new_left[index] = left[index].update(offset, value);
                    return Self::deep_sized(
                        new_left,
                        *left_size,
                        middle.clone(),
                        right.clone(),
                        *size,
                    );
                }
                let pos = pos - left_size;
                let mid_size = middle.size();
                if pos < mid_size {
                    return Self::deep_sized(
                        left.clone(),
                        *left_size,
                        share(middle.update(pos, value)),
                        right.clone(),
                        *size,
                    );
                }
                let (index, offset) = digit_locate(right, pos - mid_size);
                let mut new_right = right.clone();
                new_right[index] = right[index].update(offset, value);
                Self::deep_sized(left.clone(), *left_size, middle.clone(), new_right, *size)
            }
        }
    }

    /// Inserts `value` before position `pos` (`pos` may equal the size).
    pub(crate) fn insert<C: Cancellation>(
        &self,
        pos: usize,
        value: T,
        cancel: &C,
    ) -> Result<Self, Cancelled> {
        cancel.check()?;
        match self {
            Self::Empty => {
                debug_assert_eq!(pos, 0);
                Ok(Self::Single(Node::leaf(value)))
            }
            Self::Single(node) => Ok(match Node::insert_at(node, None, None, pos, value) {
                NodeInsert::Done { node, .. } => Self::Single(node),
                NodeInsert::Split { first, second, .. } => {
                    let size = first.size() + second.size();
                    Self::deep(digit_one(first), share(Self::Empty), digit_one(second), size)
                }
            }),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                if pos <= *left_size {
                    return Ok(self.insert_left(pos, value));
                }
                let pos = pos - left_size;
                let mid_size = middle.size();
                if pos < mid_size {
                    return Ok(Self::deep_sized(
                        left.clone(),
                        *left_size,
                        share(middle.insert(pos, value, cancel)?),
                        right.clone(),
                        size + 1,
                    ));
                }
                Ok(self.insert_right(pos - mid_size, value))
            }
        }
    }

    /// Inserts into the left digit, flushing four nodes into the middle when
    /// the digit overflows.
    fn insert_left(&self, pos: usize, value: T) -> Self {
        let Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        } = self
        else {
            unreachable!()
        };

        let (index, offset) = digit_locate_inclusive(left, pos);
        let sibling_left = index.checked_sub(1).map(|i| &left[i]);
        let sibling_right = left.get(index + 1);

        match Node::insert_at(&left[index], sibling_left, sibling_right, offset, value) {
            NodeInsert::Done {
                left: new_left,
                node,
                right: new_right,
            } => {
                let mut digits = left.clone();
                if let Some(n) = new_left {
                    digits[index - 1] = n;
                }
                digits[index] = node;
                if let Some(n) = new_right {
                    digits[index + 1] = n;
                }
                Self::deep_sized(digits, left_size + 1, middle.clone(), right.clone(), size + 1)
            }
            NodeInsert::Split {
                left: new_left,
                first,
                second,
                right: new_right,
            } => {
                let mut grown: SmallVec<[NodeRef<T>; MAX_DIGIT + 1]> = SmallVec::new();
                for (i, node) in left.iter().enumerate() {
                    if i == index {
                        grown.push(first.clone());
                        grown.push(second.clone());
                    } else {
                        grown.push(node.clone());
                    }
                }
                if let Some(n) = new_left {
                    grown[index - 1] = n;
                }
                if let Some(n) = new_right {
                    grown[index + 2] = n;
                }

                if grown.len() <= MAX_DIGIT {
                    return Self::deep_sized(
                        digit(&grown),
                        left_size + 1,
                        middle.clone(),
                        right.clone(),
                        size + 1,
                    );
                }

                // digit overflow: flush the four innermost nodes
                let boundary = grown.len() - NODE_SIZE;
                let flushed = Node::inner_from_slice(&grown[boundary..]);
                Self::deep(
                    digit(&grown[..boundary]),
                    share(middle.cons(flushed)),
                    right.clone(),
                    size + 1,
                )
            }
        }
    }

    /// Mirror image of [`Tree::insert_left`].
    fn insert_right(&self, pos: usize, value: T) -> Self {
        let Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        } = self
        else {
            unreachable!()
        };

        let (index, offset) = digit_locate_inclusive(right, pos);
        let sibling_left = index.checked_sub(1).map(|i| &right[i]);
        let sibling_right = right.get(index + 1);

        match Node::insert_at(&right[index], sibling_left, sibling_right, offset, value) {
            NodeInsert::Done {
                left: new_left,
                node,
                right: new_right,
            } => {
                let mut digits = right.clone();
                if let Some(n) = new_left {
                    digits[index - 1] = n;
                }
                digits[index] = node;
                if let Some(n) = new_right {
                    digits[index + 1] = n;
                }
                Self::deep_sized(left.clone(), *left_size, middle.clone(), digits, size + 1)
            }
            NodeInsert::Split {
                left: new_left,
                first,
                second,
                right: new_right,
            } => {
                let mut grown: SmallVec<[NodeRef<T>; MAX_DIGIT + 1]> = SmallVec::new();
                for (i, node) in right.iter().enumerate() {
                    if i == index {
                        grown.push(first.clone());
                        grown.push(second.clone());
                    } else {
                        grown.push(node.clone());
                    }
                }
                if let Some(n) = new_left {
                    grown[index - 1] = n;
                }
                if let Some(n) = new_right {
                    grown[index + 2] = n;
                }

                if grown.len() <= MAX_DIGIT {
                    return Self::deep_sized(
                        left.clone(),
                        *left_size,
                        middle.clone(),
                        digit(&grown),
                        size + 1,
                    );
                }

                let flushed = Node::inner_from_slice(&grown[..NODE_SIZE]);
                Self::deep_sized(
                    left.clone(),
                    *left_size,
                    share(middle.snoc(flushed)),
                    digit(&grown[NODE_SIZE..]),
                    size + 1,
                )
            }
        }
    }

    /// Removes the element at `pos`.
    pub(crate) fn remove<C: Cancellation>(
        &self,
        pos: usize,
        cancel: &C,
    ) -> Result<TreeSlice<T>, Cancelled> {
        cancel.check()?;
        match self {
            Self::Empty => unreachable!("removal from an empty tree"),
            Self::Single(node) => Ok(match node.as_ref() {
                Node::Leaf(_) => TreeSlice::Tree(Self::Empty),
                Node::Inner { .. } => match Node::remove_at(node, None, None, pos) {
                    NodeRemove::Kept { node, .. } => TreeSlice::Tree(Self::Single(node)),
                    NodeRemove::Underflow(rest) => TreeSlice::Partial(rest),
                    NodeRemove::Merged { .. } => {
                        unreachable!("a lone node has no neighbor to merge into")
                    }
                },
            }),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                if pos < *left_size {
                    return Ok(TreeSlice::Tree(self.remove_left(pos)));
                }
                let right_start = left_size + middle.size();
                if pos >= right_start {
                    return Ok(TreeSlice::Tree(self.remove_right(pos - right_start)));
                }

                match middle.remove(pos - left_size, cancel)? {
                    TreeSlice::Tree(new_middle) => Ok(TreeSlice::Tree(Self::deep_sized(
                        left.clone(),
                        *left_size,
                        share(new_middle),
                        right.clone(),
                        size - 1,
                    ))),
                    // the middle collapsed to one digit-level node
                    TreeSlice::Partial(node) => {
                        if left.len() < right.len() {
                            // extend the left digit
                            let node_size = node.size();
                            let mut new_left = left.clone();
                            new_left.push(node);
                            return Ok(TreeSlice::Tree(Self::deep_sized(
                                new_left,
                                left_size + node_size,
                                share(Self::Empty),
                                right.clone(),
                                size - 1,
                            )));
                        }
                        if right.len() < MAX_DIGIT {
                            // extend the right digit
                            let mut new_right = digit_one(node);
                            new_right.extend(right.iter().cloned());
                            return Ok(TreeSlice::Tree(Self::deep_sized(
                                left.clone(),
                                *left_size,
                                share(Self::Empty),
                                new_right,
                                size - 1,
                            )));
                        }

                        // both digits full: redistribute around a fresh
                        // single-node middle
                        debug_assert_eq!(left.len(), MAX_DIGIT);
                        debug_assert_eq!(right.len(), MAX_DIGIT);
                        let keep_left = (2 * MAX_DIGIT + 1 - NODE_SIZE) / 2;
                        let in_left = left.len() - keep_left;
                        let in_right = NODE_SIZE - in_left - 1;
                        let mut center: SmallVec<[NodeRef<T>; NODE_SIZE]> = SmallVec::new();
                        center.extend(left[keep_left..].iter().cloned());
                        center.push(node);
                        center.extend(right[..in_right].iter().cloned());
                        let new_middle = Self::Single(Node::inner_from_slice(&center));
                        Ok(TreeSlice::Tree(Self::deep(
                            digit(&left[..keep_left]),
                            share(new_middle),
                            digit(&right[in_right..]),
                            size - 1,
                        )))
                    }
                }
            }
        }
    }

    /// Removes an element inside the left digit.
    fn remove_left(&self, pos: usize) -> Self {
        let Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        } = self
        else {
            unreachable!()
        };

        if left.len() > 1 {
            // the digit cannot underflow, just delete inside it
            return Self::deep_sized(
                remove_from_digit(left, pos),
                left_size - 1,
                middle.clone(),
                right.clone(),
                size - 1,
            );
        }

        let node = &left[0];
        if !middle.is_empty() {
            // balance with the first child of the middle's head
            let head = middle.head().clone();
            let first = head.child(0);
            match Node::remove_at(node, None, Some(first), pos) {
                NodeRemove::Merged {
                    right: merged_first,
                    ..
                } => {
                    let merged_first = merged_first.unwrap_or_else(|| unreachable!());
                    let mut new_left = digit(head.children());
                    new_left[0] = merged_first;
                    Self::deep(new_left, share(middle.tail()), right.clone(), size - 1)
                }
                NodeRemove::Kept {
                    node: new_node,
                    right: new_first,
                    ..
                } => {
                    let new_first = new_first.unwrap_or_else(|| unreachable!());
                    let new_left = digit_one(new_node.clone());
                    if ReferenceCounter::ptr_eq(&new_first, first) {
                        Self::deep_sized(
                            new_left,
                            new_node.size(),
                            middle.clone(),
                            right.clone(),
                            size - 1,
                        )
                    } else {
                        let new_middle = middle.replace_head(head.replace_child(0, new_first));
                        Self::deep_sized(
                            new_left,
                            new_node.size(),
                            share(new_middle),
                            right.clone(),
                            size - 1,
                        )
                    }
                }
                NodeRemove::Underflow(_) => unreachable!("a neighbor was supplied"),
            }
        } else {
            // balance with the right digit
            match Node::remove_at(node, None, Some(&right[0]), pos) {
                NodeRemove::Merged {
                    right: merged_first,
                    ..
                } => {
                    let merged_first = merged_first.unwrap_or_else(|| unreachable!());
                    if right.len() == 1 {
                        return Self::Single(merged_first);
                    }
                    let mid = right.len() / 2;
                    let mut new_left = digit(&right[..mid]);
                    new_left[0] = merged_first;
                    Self::deep(new_left, share(Self::Empty), digit(&right[mid..]), size - 1)
                }
                NodeRemove::Kept {
                    node: new_node,
                    right: new_first,
                    ..
                } => {
                    let new_first = new_first.unwrap_or_else(|| unreachable!());
                    let new_left = digit_one(new_node.clone());
                    if ReferenceCounter::ptr_eq(&new_first, &right[0]) {
                        Self::deep_sized(
                            new_left,
                            new_node.size(),
                            middle.clone(),
                            right.clone(),
                            size - 1,
                        )
                    } else {
                        let mut new_right = right.clone();
                        new_right[0] = new_first;
                        Self::deep_sized(
                            new_left,
                            new_node.size(),
                            middle.clone(),
                            new_right,
                            size - 1,
                        )
                    }
                }
                NodeRemove::Underflow(_) => unreachable!("a neighbor was supplied"),
            }
        }
    }

    /// Removes an element inside the right digit; mirror of
    /// [`Tree::remove_left`].
    fn remove_right(&self, pos: usize) -> Self {
        let Self::Deep {
            left,
            left_size,
            middle,
            right,
            size,
        } = self
        else {
            unreachable!()
        };

        if right.len() > 1 {
            return Self::deep_sized(
                left.clone(),
                *left_size,
                middle.clone(),
                remove_from_digit(right, pos),
                size - 1,
            );
        }

        let node = &right[0];
        if !middle.is_empty() {
            // balance with the last child of the middle's last node
            let last = middle.last().clone();
            let last_child = last.child(last.arity() - 1);
            match Node::remove_at(node, Some(last_child), None, pos) {
                NodeRemove::Merged {
                    left: merged_last, ..
                } => {
                    let merged_last = merged_last.unwrap_or_else(|| unreachable!());
                    let mut new_right = digit(last.children());
                    let end = new_right.len() - 1;
                    new_right[end] = merged_last;
                    Self::deep_sized(
                        left.clone(),
                        *left_size,
                        share(middle.init()),
                        new_right,
                        size - 1,
                    )
                }
                NodeRemove::Kept {
                    node: new_node,
                    left: new_last_child,
                    ..
                } => {
                    let new_last_child = new_last_child.unwrap_or_else(|| unreachable!());
                    let new_right = digit_one(new_node);
                    let new_last = last.replace_child(last.arity() - 1, new_last_child);
                    Self::deep_sized(
                        left.clone(),
                        *left_size,
                        share(middle.replace_last(new_last)),
                        new_right,
                        size - 1,
                    )
                }
                NodeRemove::Underflow(_) => unreachable!("a neighbor was supplied"),
            }
        } else {
            // balance with the left digit
            let last_left = &left[left.len() - 1];
            match Node::remove_at(node, Some(last_left), None, pos) {
                NodeRemove::Merged {
                    left: merged_last, ..
                } => {
                    let merged_last = merged_last.unwrap_or_else(|| unreachable!());
                    if left.len() == 1 {
                        return Self::Single(merged_last);
                    }
                    Self::deep_all(
                        digit(&left[..left.len() - 1]),
                        share(Self::Empty),
                        digit_one(merged_last),
                    )
                }
                NodeRemove::Kept {
                    node: new_node,
                    left: new_last_left,
                    ..
                } => {
                    let new_last_left = new_last_left.unwrap_or_else(|| unreachable!());
                    let new_right = digit_one(new_node);
                    if ReferenceCounter::ptr_eq(&new_last_left, last_left) {
                        Self::deep_sized(
                            left.clone(),
                            *left_size,
                            middle.clone(),
                            new_right,
                            size - 1,
                        )
                    } else {
                        let mut new_left = left.clone();
                        let end = new_left.len() - 1;
                        new_left[end] = new_last_left;
                        Self::deep_all(new_left, middle.clone(), new_right)
                    }
                }
                NodeRemove::Underflow(_) => unreachable!("a neighbor was supplied"),
            }
        }
    }
}

/// Deletes an element from a digit with at least two nodes.
fn remove_from_digit<T>(nodes: &[NodeRef<T>], pos: usize) -> Digit<T> {
    let (index, offset) = digit_locate(nodes, pos);
    let sibling_left = index.checked_sub(1).map(|i| &nodes[i]);
    let sibling_right = nodes.get(index + 1);

    match Node::remove_at(&nodes[index], sibling_left, sibling_right, offset) {
        NodeRemove::Kept { left, node, right } => {
            let mut out = digit(nodes);
            if let Some(n) = left {
                out[index - 1] = n;
            }
            out[index] = node;
            if let Some(n) = right {
                out[index + 1] = n;
            }
            out
        }
        NodeRemove::Merged { left, right } => {
            let mut out = Digit::new();
            out.extend(nodes[..index].iter().cloned());
            out.extend(nodes[index + 1..].iter().cloned());
            if let Some(n) = left {
                out[index - 1] = n;
            }
            if index < nodes.len() - 1
                && let Some(n) = right
            {
                out[index] = n;
            }
            out
        }
        NodeRemove::Underflow(_) => unreachable!("digit nodes always have a neighbor"),
    }
}

// =============================================================================
// Concatenation
// =============================================================================

impl<T> Tree<T> {
    /// Concatenates `self`, the carried same-level nodes `mids`, and `other`.
    ///
    /// The facing digits are regrouped into evenly sized inner nodes and
    /// pushed down one level, recursing on the middles.
    pub(crate) fn concat<C: Cancellation>(
        &self,
        mids: &[NodeRef<T>],
        other: &Self,
        cancel: &C,
    ) -> Result<Self, Cancelled> {
        cancel.check()?;
        match self {
            Self::Empty => Ok(other.add_all(mids, true)),
            Self::Single(node) => Ok(other.add_all(mids, true).cons(node.clone())),
            Self::Deep { .. } => {
                let lft = self.add_all(mids, false);
                match other {
                    Self::Empty => Ok(lft),
                    Self::Single(node) => Ok(lft.snoc(node.clone())),
                    Self::Deep {
                        left: b_left,
                        middle: b_middle,
                        right: b_right,
                        ..
                    } => {
                        let Self::Deep {
                            left: a_left,
                            left_size: a_left_size,
                            middle: a_middle,
                            right: a_right,
                            ..
                        } = &lft
                        else {
                            unreachable!("appending nodes keeps a deep tree deep")
                        };

                        // regroup the facing digits into 2–4 wide nodes
                        let facing: SmallVec<[NodeRef<T>; 2 * MAX_DIGIT]> =
                            a_right.iter().chain(b_left.iter()).cloned().collect();
                        let total = facing.len();
                        let groups = total.div_ceil(MAX_ARITY);
                        let mut carried: SmallVec<[NodeRef<T>; 3]> = SmallVec::new();
                        let mut taken = 0;
                        for group in 0..groups {
                            let remaining_groups = groups - group;
                            let width = (total - taken).div_ceil(remaining_groups);
                            carried.push(Node::inner_from_slice(&facing[taken..taken + width]));
                            taken += width;
                        }

                        let new_middle = a_middle.concat(&carried, b_middle, cancel)?;
                        let size = a_left_size + new_middle.size() + nodes_size(b_right);
                        Ok(Self::deep_sized(
                            a_left.clone(),
                            *a_left_size,
                            share(new_middle),
                            b_right.clone(),
                            size,
                        ))
                    }
                }
            }
        }
    }

    /// Extends one end of the tree by a run of same-level nodes, flushing
    /// surplus groups into the middle.
    fn add_all(&self, nodes: &[NodeRef<T>], prepend: bool) -> Self {
        if nodes.is_empty() {
            return self.clone();
        }
        if nodes.len() == 1 {
            return if prepend {
                self.cons(nodes[0].clone())
            } else {
                self.snoc(nodes[0].clone())
            };
        }

        match self {
            Self::Empty => Self::build_tree(nodes, nodes_size(nodes)),
            Self::Single(node) => {
                let tree = Self::build_tree(nodes, nodes_size(nodes));
                if prepend {
                    tree.snoc(node.clone())
                } else {
                    tree.cons(node.clone())
                }
            }
            Self::Deep {
                left,
                middle,
                right,
                ..
            } => {
                if prepend {
                    let mut extended: SmallVec<[NodeRef<T>; 2 * MAX_DIGIT]> =
                        nodes.iter().chain(left.iter()).cloned().collect();
                    let mut len = extended.len();
                    if len <= MAX_DIGIT {
                        return Self::deep_all(digit(&extended), middle.clone(), right.clone());
                    }
                    let mut new_middle = (**middle).clone();
                    let mut remaining_groups = len.div_ceil(MAX_ARITY);
                    while remaining_groups > 1 {
                        let width = len.div_ceil(remaining_groups);
                        new_middle =
                            new_middle.cons(Node::inner_from_slice(&extended[len - width..len]));
                        len -= width;
                        remaining_groups -= 1;
                    }
                    extended.truncate(len);
                    Self::deep_all(digit(&extended), share(new_middle), right.clone())
                } else {
                    let extended: SmallVec<[NodeRef<T>; 2 * MAX_DIGIT]> =
                        right.iter().chain(nodes.iter()).cloned().collect();
                    let len = extended.len();
                    if len <= MAX_DIGIT {
                        return Self::deep_all(left.clone(), middle.clone(), digit(&extended));
                    }
                    let mut new_middle = (**middle).clone();
                    let mut taken = 0;
                    let mut remaining_groups = len.div_ceil(MAX_ARITY);
                    while remaining_groups > 1 {
                        let width = (len - taken).div_ceil(remaining_groups);
                        new_middle = new_middle
                            .snoc(Node::inner_from_slice(&extended[taken..taken + width]));
                        taken += width;
                        remaining_groups -= 1;
                    }
                    Self::deep_all(left.clone(), share(new_middle), digit(&extended[taken..]))
                }
            }
        }
    }
}

// =============================================================================
// Slicing
// =============================================================================

impl<T> Tree<T> {
    /// Extracts the sub-range `[from, from + len)` as a new tree or a
    /// fragment for the caller to absorb.
    pub(crate) fn slice<C: Cancellation>(
        &self,
        from: usize,
        len: usize,
        cancel: &C,
    ) -> Result<TreeSlice<T>, Cancelled> {
        cancel.check()?;
        if from == 0 && len == self.size() {
            return Ok(TreeSlice::Tree(self.clone()));
        }
        match self {
            Self::Empty => unreachable!("slicing an empty tree"),
            Self::Single(node) => Ok(match node.slice(from, len) {
                NodeLike::Full(full) => TreeSlice::Tree(Self::Single(full)),
                NodeLike::Partial(fragment) => TreeSlice::Partial(fragment),
            }),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                ..
            } => {
                let level = left[0].height();
                let mid_size = middle.size();
                let right_off = left_size + mid_size;

                let in_left = if from + len <= *left_size {
                    len
                } else if from < *left_size {
                    left_size - from
                } else {
                    0
                };
                let in_right = if from >= right_off {
                    len
                } else if from + len > right_off {
                    from + len - right_off
                } else {
                    0
                };

                let mut buffer: NodeBuffer<T> = NodeBuffer::new();
                split_digit(left, from, in_left, &mut buffer, level);
                if in_left == len {
                    return Ok(slice_of_buffer(&buffer, len));
                }

                let in_middle = len - in_left - in_right;
                let mid: Self = if in_middle == 0 {
                    Self::Empty
                } else {
                    let mid_from = if from <= *left_size { 0 } else { from - left_size };
                    match middle.slice(mid_from, in_middle, cancel)? {
                        TreeSlice::Tree(tree) => tree,
                        TreeSlice::Partial(fragment) => {
                            push_node_like(&mut buffer, NodeLike::for_level(fragment, level), level);
                            Self::Empty
                        }
                    }
                };

                let right_from = if from < right_off { 0 } else { from - right_off };
                if mid.is_empty() {
                    split_digit(right, right_from, in_right, &mut buffer, level);
                    return Ok(slice_of_buffer(&buffer, len));
                }

                // turn the buffer into a proper left digit, pulling nodes out
                // of the middle when only a fragment is buffered
                let mid = if buffer.len() > 1 || matches!(buffer.first(), Some(NodeLike::Full(_)))
                {
                    mid
                } else {
                    let head = mid.head().clone();
                    push_node_like(&mut buffer, NodeLike::Full(head.child(0).clone()), level);
                    for child in &head.children()[1..] {
                        buffer.push(NodeLike::Full(child.clone()));
                    }
                    mid.tail()
                };

                if mid.is_empty() {
                    split_digit(right, right_from, in_right, &mut buffer, level);
                    return Ok(slice_of_buffer(&buffer, len));
                }

                let new_left = digits_of_buffer(&buffer);
                buffer.clear();
                split_digit(right, right_from, in_right, &mut buffer, level);

                let (mid, new_right) = if buffer.is_empty() {
                    let last = mid.last().clone();
                    (mid.init(), digit(last.children()))
                } else if buffer.len() > 1 || matches!(buffer.first(), Some(NodeLike::Full(_))) {
                    (mid, digits_of_buffer(&buffer))
                } else {
                    // a lone fragment on the right: fold it into the
                    // middle's last node
                    let Some(NodeLike::Partial(fragment)) = buffer.pop() else {
                        unreachable!()
                    };
                    let last = mid.last().clone();
                    buffer.clear();
                    for child in last.children() {
                        buffer.push(NodeLike::Full(child.clone()));
                    }
                    push_node_like(&mut buffer, NodeLike::Partial(fragment), level);
                    (mid.init(), digits_of_buffer(&buffer))
                };

                Ok(TreeSlice::Tree(Self::deep(new_left, share(mid), new_right, len)))
            }
        }
    }
}

/// Pushes the overlap of a digit with `[from, from + len)` into `buffer`,
/// slicing the boundary nodes.
fn split_digit<T>(
    nodes: &[NodeRef<T>],
    from: usize,
    len: usize,
    buffer: &mut NodeBuffer<T>,
    level: usize,
) {
    if len == 0 {
        return;
    }

    let (mut pos, offset) = digit_locate(nodes, from);
    let first = &nodes[pos];
    let first_size = first.size();
    let in_first = first_size - offset;

    if in_first >= len {
        let part = if len == first_size {
            NodeLike::Full(first.clone())
        } else {
            first.slice(offset, len)
        };
        push_node_like(buffer, part, level);
        return;
    }

    let part = if offset == 0 {
        NodeLike::Full(first.clone())
    } else {
        first.slice(offset, in_first)
    };
    push_node_like(buffer, part, level);

    let mut remaining = len - in_first;
    while remaining > 0 {
        pos += 1;
        let node = &nodes[pos];
        let node_size = node.size();
        let part = if remaining >= node_size {
            NodeLike::Full(node.clone())
        } else {
            node.slice(0, remaining)
        };
        push_node_like(buffer, part, level);
        remaining = remaining.saturating_sub(node_size);
    }
}

/// Builds a tree (or reports a fragment) from a merged node buffer.
fn slice_of_buffer<T>(buffer: &[NodeLike<T>], len: usize) -> TreeSlice<T> {
    match buffer {
        [] => unreachable!("an empty range never reaches the buffer"),
        [NodeLike::Full(node)] => TreeSlice::Tree(Tree::Single(node.clone())),
        [NodeLike::Partial(fragment)] => TreeSlice::Partial(fragment.clone()),
        _ => {
            let nodes: SmallVec<[NodeRef<T>; 2 * MAX_DIGIT + 1]> = buffer
                .iter()
                .map(|entry| match entry {
                    NodeLike::Full(node) => node.clone(),
                    NodeLike::Partial(_) => {
                        unreachable!("fragments merge away in multi-entry buffers")
                    }
                })
                .collect();
            TreeSlice::Tree(Tree::build_tree(&nodes, len))
        }
    }
}

/// Collects a fully merged buffer into a digit.
fn digits_of_buffer<T>(buffer: &[NodeLike<T>]) -> Digit<T> {
    buffer
        .iter()
        .map(|entry| match entry {
            NodeLike::Full(node) => node.clone(),
            NodeLike::Partial(_) => unreachable!("fragments merge away in multi-entry buffers"),
        })
        .collect()
}

// =============================================================================
// Reversal
// =============================================================================

impl<T> Tree<T> {
    /// Rebuilds the whole tree with all elements in reverse order.
    pub(crate) fn reverse<C: Cancellation>(&self, cancel: &C) -> Result<Self, Cancelled> {
        cancel.check()?;
        match self {
            Self::Empty => Ok(Self::Empty),
            Self::Single(node) => Ok(Self::Single(Node::reverse(node))),
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                let new_left: Digit<T> = right.iter().rev().map(Node::reverse).collect();
                let new_right: Digit<T> = left.iter().rev().map(Node::reverse).collect();
                let right_size = size - left_size - middle.size();
                Ok(Self::deep_sized(
                    new_left,
                    right_size,
                    share(middle.reverse(cancel)?),
                    new_right,
                    *size,
                ))
            }
        }
    }
}

// =============================================================================
// Invariant Checking
// =============================================================================

impl<T> Tree<T> {
    /// Recomputes every cached size and bound in the tree, panicking with a
    /// localized message on the first inconsistency. Returns the element
    /// count.
    pub(crate) fn check_invariants(&self) -> usize {
        self.check_level(self.digit_level())
    }

    fn digit_level(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(node) => node.height(),
            Self::Deep { left, .. } => left[0].height(),
        }
    }

    fn check_level(&self, level: usize) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(node) => {
                let (node_size, height) = node.check_invariants();
                assert_eq!(height, level, "wrong node height: {height} vs. {level}");
                node_size
            }
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                assert!(
                    (1..=MAX_DIGIT).contains(&left.len()),
                    "wrong left digit length: {}",
                    left.len()
                );
                let mut total = 0;
                for node in left {
                    let (node_size, height) = node.check_invariants();
                    assert_eq!(
                        height, level,
                        "wrong node height in left digit: {height} vs. {level}"
                    );
                    total += node_size;
                }
                assert_eq!(total, *left_size, "wrong left size: {left_size} vs. {total}");

                total += middle.check_level(level + 1);

                assert!(
                    (1..=MAX_DIGIT).contains(&right.len()),
                    "wrong right digit length: {}",
                    right.len()
                );
                for node in right {
                    let (node_size, height) = node.check_invariants();
                    assert_eq!(
                        height, level,
                        "wrong node height in right digit: {height} vs. {level}"
                    );
                    total += node_size;
                }
                assert_eq!(total, *size, "wrong size: {size} vs. {total}");
                total
            }
        }
    }
}

// =============================================================================
// Structural Formatting
// =============================================================================

impl<T: fmt::Debug> Tree<T> {
    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            Self::Empty => write!(f, "{pad}Empty"),
            Self::Single(node) => {
                writeln!(f, "{pad}Single[")?;
                node.fmt_indent(f, indent + 1)?;
                writeln!(f)?;
                write!(f, "{pad}]")
            }
            Self::Deep {
                left,
                left_size,
                middle,
                right,
                size,
            } => {
                writeln!(f, "{pad}Deep({size})[")?;
                writeln!(f, "{pad}  Left({left_size})[")?;
                for node in left {
                    node.fmt_indent(f, indent + 2)?;
                    writeln!(f)?;
                }
                writeln!(f, "{pad}  ]")?;
                middle.fmt_indent(f, indent + 1)?;
                writeln!(f)?;
                writeln!(f, "{pad}  Right[")?;
                for node in right {
                    node.fmt_indent(f, indent + 2)?;
                    writeln!(f)?;
                }
                writeln!(f, "{pad}  ]")?;
                write!(f, "{pad}]")
            }
        }
    }
}

impl<T: fmt::Debug> Node<T> {
    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            Self::Leaf(element) => write!(f, "{pad}Leaf({element:?})"),
            Self::Inner { children, .. } => {
                writeln!(f, "{pad}Node({})[", self.size())?;
                for child in children {
                    child.fmt_indent(f, indent + 1)?;
                    writeln!(f)?;
                }
                write!(f, "{pad}]")
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
