//! Tree nodes and the split/merge protocol used by structural edits.
//!
//! A [`Node`] is either a leaf wrapping a single element or an inner node
//! wrapping 2–4 children of the next lower level. Inner nodes cache a
//! *bounds array*, the strictly increasing cumulative element count after
//! each child, so positional descent only inspects at most [`MAX_ARITY`]
//! entries per level.
//!
//! Insertion and removal inside a node communicate with the surrounding
//! digit through the [`NodeInsert`] and [`NodeRemove`] result types: a node
//! that overflows first tries to shift a child into a sibling, then splits;
//! a node that underflows first borrows from a sibling, then merges into
//! one, and only reports an [`NodeRemove::Underflow`] when it has no
//! neighbor at all. Sub-range extraction produces [`NodeLike`] values whose
//! `Partial` variant carries a fragment below the surrounding digit level;
//! fragments are folded into their neighbors by [`push_node_like`].

use arrayvec::ArrayVec;
use smallvec::SmallVec;
use static_assertions::const_assert;

use crate::ReferenceCounter;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of children of an inner node.
pub(crate) const MAX_ARITY: usize = 4;

/// Minimum number of children of an inner node.
pub(crate) const MIN_ARITY: usize = 2;

/// Maximum number of nodes in a digit.
pub(crate) const MAX_DIGIT: usize = MAX_ARITY + 1;

/// Number of nodes grouped into one inner node when a digit overflows.
pub(crate) const NODE_SIZE: usize = MAX_ARITY;

const_assert!(MIN_ARITY >= 2);
const_assert!(MAX_ARITY >= MIN_ARITY + 1);
const_assert!(MAX_DIGIT == MAX_ARITY + 1);

/// Reference-counted node pointer.
pub(crate) type NodeRef<T> = ReferenceCounter<Node<T>>;

/// A digit: 1 to [`MAX_DIGIT`] same-level nodes at one end of a deep tree.
pub(crate) type Digit<T> = ArrayVec<NodeRef<T>, MAX_DIGIT>;

/// Transient buffer used while re-packing nodes during slicing.
pub(crate) type NodeBuffer<T> = SmallVec<[NodeLike<T>; 2 * MAX_DIGIT + 1]>;

type Children<T> = ArrayVec<NodeRef<T>, MAX_ARITY>;

// =============================================================================
// Node Definition
// =============================================================================

/// A node of the finger tree.
pub(crate) enum Node<T> {
    /// Leaf wrapping a single element.
    Leaf(T),
    /// Inner node wrapping 2–4 children one level down.
    Inner {
        /// Cumulative element count after each child; the last entry is the
        /// size of the whole node.
        bounds: ArrayVec<usize, MAX_ARITY>,
        /// Child nodes, all of equal height.
        children: Children<T>,
    },
}

impl<T> Node<T> {
    /// Creates an inner node from child references, computing the bounds.
    pub(crate) fn inner(children: Children<T>) -> NodeRef<T> {
        debug_assert!((MIN_ARITY..=MAX_ARITY).contains(&children.len()));
        let mut bounds = ArrayVec::new();
        let mut total = 0;
        for child in &children {
            total += child.size();
            bounds.push(total);
        }
        ReferenceCounter::new(Self::Inner { bounds, children })
    }

    /// Creates an inner node from a slice of child references.
    pub(crate) fn inner_from_slice(children: &[NodeRef<T>]) -> NodeRef<T> {
        Self::inner(children.iter().cloned().collect())
    }

    /// Creates a leaf node.
    pub(crate) fn leaf(element: T) -> NodeRef<T> {
        ReferenceCounter::new(Self::Leaf(element))
    }

    /// Number of elements below this node.
    pub(crate) fn size(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Inner { bounds, .. } => bounds[bounds.len() - 1],
        }
    }

    /// Number of directly addressable children.
    pub(crate) fn arity(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Inner { children, .. } => children.len(),
        }
    }

    /// Height above the leaf level.
    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self;
        while let Self::Inner { children, .. } = node {
            height += 1;
            node = &children[0];
        }
        height
    }

    /// Child at the given index; faults on leaves.
    pub(crate) fn child(&self, index: usize) -> &NodeRef<T> {
        match self {
            Self::Leaf(_) => unreachable!("leaf nodes have no children"),
            Self::Inner { children, .. } => &children[index],
        }
    }

    /// All children of an inner node.
    pub(crate) fn children(&self) -> &[NodeRef<T>] {
        match self {
            Self::Leaf(_) => unreachable!("leaf nodes have no children"),
            Self::Inner { children, .. } => children,
        }
    }

    /// Locates the child containing element offset `pos`.
    ///
    /// Returns the child index and the offset within that child.
    pub(crate) fn locate(&self, pos: usize) -> (usize, usize) {
        match self {
            Self::Leaf(_) => unreachable!("cannot descend into a leaf"),
            Self::Inner { bounds, .. } => {
                let mut index = 0;
                while bounds[index] <= pos {
                    index += 1;
                }
                let offset = if index == 0 { pos } else { pos - bounds[index - 1] };
                (index, offset)
            }
        }
    }

    /// Element at offset `pos` below this node.
    pub(crate) fn get(&self, pos: usize) -> &T {
        let mut node = self;
        let mut pos = pos;
        loop {
            match node {
                Self::Leaf(element) => {
                    debug_assert_eq!(pos, 0);
                    return element;
                }
                Self::Inner { .. } => {
                    let (index, offset) = node.locate(pos);
                    node = node.child(index);
                    pos = offset;
                }
            }
        }
    }

    /// Replaces the element at offset `pos`, sharing all untouched children.
    pub(crate) fn update(&self, pos: usize, value: T) -> NodeRef<T> {
        match self {
            Self::Leaf(_) => {
                debug_assert_eq!(pos, 0);
                Self::leaf(value)
            }
            Self::Inner { children, .. } => {
                let (index, offset) = self.locate(pos);
                let mut new_children: Children<T> = children.clone();
                new_children[index] = children[index].update(offset, value);
                Self::inner(new_children)
            }
        }
    }

    /// Replaces the child at `index`, recomputing the cached bounds.
    pub(crate) fn replace_child(&self, index: usize, node: NodeRef<T>) -> NodeRef<T> {
        match self {
            Self::Leaf(_) => unreachable!("leaf nodes have no children"),
            Self::Inner { children, .. } => {
                let mut new_children: Children<T> = children.clone();
                new_children[index] = node;
                Self::inner(new_children)
            }
        }
    }

    /// Recreates this node with all children in reverse order, recursively.
    pub(crate) fn reverse(self_ref: &NodeRef<T>) -> NodeRef<T> {
        match self_ref.as_ref() {
            Self::Leaf(_) => self_ref.clone(),
            Self::Inner { children, .. } => {
                let new_children: Children<T> =
                    children.iter().rev().map(Self::reverse).collect();
                Self::inner(new_children)
            }
        }
    }

    /// Recomputes every cached size below this node, faulting on the first
    /// inconsistency. Returns the element count and the node height.
    pub(crate) fn check_invariants(&self) -> (usize, usize) {
        match self {
            Self::Leaf(_) => (1, 0),
            Self::Inner { bounds, children } => {
                assert!(
                    (MIN_ARITY..=MAX_ARITY).contains(&children.len()),
                    "inner node arity out of bounds: {}",
                    children.len()
                );
                assert_eq!(
                    bounds.len(),
                    children.len(),
                    "bounds array length {} does not match arity {}",
                    bounds.len(),
                    children.len()
                );
                let mut total = 0;
                let mut height = 0;
                for (index, child) in children.iter().enumerate() {
                    let (child_size, child_height) = child.check_invariants();
                    if index == 0 {
                        height = child_height;
                    } else {
                        assert_eq!(
                            child_height, height,
                            "uneven child heights below an inner node"
                        );
                    }
                    total += child_size;
                    assert_eq!(
                        bounds[index], total,
                        "stale bound at child {index}: cached {} vs. actual {total}",
                        bounds[index]
                    );
                }
                (total, height + 1)
            }
        }
    }
}

// =============================================================================
// Insert Protocol
// =============================================================================

/// Result of inserting an element into a node.
///
/// The `left` and `right` slots return the (possibly rewritten) digit
/// neighbors that were passed in; `None` means the neighbor was absent.
pub(crate) enum NodeInsert<T> {
    /// The node absorbed the insertion, possibly shifting a child into a
    /// sibling.
    Done {
        left: Option<NodeRef<T>>,
        node: NodeRef<T>,
        right: Option<NodeRef<T>>,
    },
    /// The node split in two; the caller's digit grows by one slot.
    Split {
        left: Option<NodeRef<T>>,
        first: NodeRef<T>,
        second: NodeRef<T>,
        right: Option<NodeRef<T>>,
    },
}

impl<T> Node<T> {
    /// Inserts `value` at element offset `pos` below `node`.
    ///
    /// `left` and `right` are the digit neighbors of `node`, used to absorb
    /// an overflowing child before splitting. `pos` may equal the node size,
    /// meaning insertion after the last element. A leaf cannot grow, so it
    /// always splits into two leaves.
    pub(crate) fn insert_at(
        node: &NodeRef<T>,
        left: Option<&NodeRef<T>>,
        right: Option<&NodeRef<T>>,
        pos: usize,
        value: T,
    ) -> NodeInsert<T> {
        match node.as_ref() {
            Self::Leaf(_) => {
                let new_leaf = Self::leaf(value);
                let (first, second) = if pos == 0 {
                    (new_leaf, node.clone())
                } else {
                    (node.clone(), new_leaf)
                };
                NodeInsert::Split {
                    left: left.cloned(),
                    first,
                    second,
                    right: right.cloned(),
                }
            }
            Self::Inner { .. } => node.insert_inner(left, right, pos, value),
        }
    }

    fn insert_inner(
        &self,
        left: Option<&NodeRef<T>>,
        right: Option<&NodeRef<T>>,
        pos: usize,
        value: T,
    ) -> NodeInsert<T> {
        let children = self.children();
        let bounds = match self {
            Self::Inner { bounds, .. } => bounds,
            Self::Leaf(_) => unreachable!(),
        };

        // `pos == bound` inserts at the end of the earlier child.
        let mut index = 0;
        while index + 1 < children.len() && bounds[index] < pos {
            index += 1;
        }
        let offset = if index == 0 { pos } else { pos - bounds[index - 1] };

        let child_left = index.checked_sub(1).map(|i| &children[i]);
        let child_right = children.get(index + 1);

        let result = match children[index].as_ref() {
            Self::Leaf(_) => {
                // Leaves always split; order depends on the offset.
                let new_leaf = Self::leaf(value);
                let (first, second) = if offset == 0 {
                    (new_leaf, children[index].clone())
                } else {
                    (children[index].clone(), new_leaf)
                };
                NodeInsert::Split {
                    left: child_left.cloned(),
                    first,
                    second,
                    right: child_right.cloned(),
                }
            }
            Self::Inner { .. } => {
                children[index].insert_inner(child_left, child_right, offset, value)
            }
        };

        match result {
            NodeInsert::Done {
                left: new_left,
                node,
                right: new_right,
            } => {
                let mut new_children: Children<T> = children.iter().cloned().collect();
                if let Some(n) = new_left {
                    new_children[index - 1] = n;
                }
                new_children[index] = node;
                if let Some(n) = new_right {
                    new_children[index + 1] = n;
                }
                NodeInsert::Done {
                    left: left.cloned(),
                    node: Self::inner(new_children),
                    right: right.cloned(),
                }
            }
            NodeInsert::Split {
                left: new_left,
                first,
                second,
                right: new_right,
            } => {
                let mut grown: SmallVec<[NodeRef<T>; MAX_ARITY + 1]> = SmallVec::new();
                for (i, child) in children.iter().enumerate() {
                    if i == index {
                        grown.push(first.clone());
                        grown.push(second.clone());
                    } else {
                        grown.push(child.clone());
                    }
                }
                if let Some(n) = new_left {
                    grown[index - 1] = n;
                }
                if let Some(n) = new_right {
                    grown[index + 2] = n;
                }
                self.resolve_overflow(left, right, &grown)
            }
        }
    }

    /// Places `MAX_ARITY + 1` children, preferring to shift one into a
    /// sibling with spare capacity over splitting.
    fn resolve_overflow(
        &self,
        left: Option<&NodeRef<T>>,
        right: Option<&NodeRef<T>>,
        grown: &[NodeRef<T>],
    ) -> NodeInsert<T> {
        if grown.len() <= MAX_ARITY {
            return NodeInsert::Done {
                left: left.cloned(),
                node: Self::inner_from_slice(grown),
                right: right.cloned(),
            };
        }
        debug_assert_eq!(grown.len(), MAX_ARITY + 1);

        if let Some(sibling) = left
            && sibling.arity() < MAX_ARITY
        {
            // Shift the first child into the left sibling.
            let mut sibling_children: Children<T> = sibling.children().iter().cloned().collect();
            sibling_children.push(grown[0].clone());
            return NodeInsert::Done {
                left: Some(Self::inner(sibling_children)),
                node: Self::inner_from_slice(&grown[1..]),
                right: right.cloned(),
            };
        }

        if let Some(sibling) = right
            && sibling.arity() < MAX_ARITY
        {
            // Shift the last child into the right sibling.
            let mut sibling_children: Children<T> = Children::new();
            sibling_children.push(grown[grown.len() - 1].clone());
            sibling_children.extend(sibling.children().iter().cloned());
            return NodeInsert::Done {
                left: left.cloned(),
                node: Self::inner_from_slice(&grown[..grown.len() - 1]),
                right: Some(Self::inner(sibling_children)),
            };
        }

        // No sibling capacity: split into two balanced nodes.
        let mid = grown.len() - MIN_ARITY;
        NodeInsert::Split {
            left: left.cloned(),
            first: Self::inner_from_slice(&grown[..mid]),
            second: Self::inner_from_slice(&grown[mid..]),
            right: right.cloned(),
        }
    }
}

// =============================================================================
// Remove Protocol
// =============================================================================

/// Result of removing an element below a node.
pub(crate) enum NodeRemove<T> {
    /// The node survived, possibly after borrowing a child from a sibling.
    Kept {
        left: Option<NodeRef<T>>,
        node: NodeRef<T>,
        right: Option<NodeRef<T>>,
    },
    /// The node was folded into a neighbor; the caller's digit shrinks.
    Merged {
        left: Option<NodeRef<T>>,
        right: Option<NodeRef<T>>,
    },
    /// No neighbor exists and a single child remains; the caller must absorb
    /// the fragment one level up.
    Underflow(NodeRef<T>),
}

impl<T> Node<T> {
    /// Removes the element at offset `pos` below `node`.
    ///
    /// `left` and `right` are the digit neighbors of `node`. Underflow is
    /// resolved by borrowing a child from a neighbor with more than
    /// [`MIN_ARITY`] children, then by merging into a neighbor, and is
    /// reported upward only when the node has no neighbor at all.
    pub(crate) fn remove_at(
        node: &NodeRef<T>,
        left: Option<&NodeRef<T>>,
        right: Option<&NodeRef<T>>,
        pos: usize,
    ) -> NodeRemove<T> {
        match node.as_ref() {
            Self::Leaf(_) => {
                debug_assert_eq!(pos, 0);
                NodeRemove::Merged {
                    left: left.cloned(),
                    right: right.cloned(),
                }
            }
            Self::Inner { .. } => node.remove_inner(left, right, pos),
        }
    }

    fn remove_inner(
        &self,
        left: Option<&NodeRef<T>>,
        right: Option<&NodeRef<T>>,
        pos: usize,
    ) -> NodeRemove<T> {
        let children = self.children();
        let (index, offset) = self.locate(pos);
        let child_left = index.checked_sub(1).map(|i| &children[i]);
        let child_right = children.get(index + 1);

        let result = match children[index].as_ref() {
            Self::Leaf(_) => {
                debug_assert_eq!(offset, 0);
                NodeRemove::Merged {
                    left: child_left.cloned(),
                    right: child_right.cloned(),
                }
            }
            Self::Inner { .. } => {
                children[index].remove_inner(child_left, child_right, offset)
            }
        };

        match result {
            NodeRemove::Kept {
                left: new_left,
                node,
                right: new_right,
            } => {
                let mut new_children: Children<T> = children.iter().cloned().collect();
                if let Some(n) = new_left {
                    new_children[index - 1] = n;
                }
                new_children[index] = node;
                if let Some(n) = new_right {
                    new_children[index + 1] = n;
                }
                NodeRemove::Kept {
                    left: left.cloned(),
                    node: Self::inner(new_children),
                    right: right.cloned(),
                }
            }
            NodeRemove::Merged {
                left: new_left,
                right: new_right,
            } => {
                let mut shrunk: SmallVec<[NodeRef<T>; MAX_ARITY]> = SmallVec::new();
                for (i, child) in children.iter().enumerate() {
                    if i != index {
                        shrunk.push(child.clone());
                    }
                }
                if index > 0
                    && let Some(n) = new_left
                {
                    shrunk[index - 1] = n;
                }
                if index < children.len() - 1
                    && let Some(n) = new_right
                {
                    shrunk[index] = n;
                }
                self.resolve_underflow(left, right, &shrunk)
            }
            NodeRemove::Underflow(_) => {
                unreachable!("a child with siblings never reports underflow")
            }
        }
    }

    /// Rebuilds this node from the surviving children, borrowing from or
    /// merging into a digit neighbor when fewer than [`MIN_ARITY`] remain.
    fn resolve_underflow(
        &self,
        left: Option<&NodeRef<T>>,
        right: Option<&NodeRef<T>>,
        shrunk: &[NodeRef<T>],
    ) -> NodeRemove<T> {
        if shrunk.len() >= MIN_ARITY {
            return NodeRemove::Kept {
                left: left.cloned(),
                node: Self::inner_from_slice(shrunk),
                right: right.cloned(),
            };
        }
        debug_assert_eq!(shrunk.len(), 1);
        let remaining = &shrunk[0];

        if let Some(sibling) = left
            && sibling.arity() > MIN_ARITY
        {
            // Borrow the last child of the left sibling.
            let sibling_children = sibling.children();
            let borrowed = sibling_children[sibling_children.len() - 1].clone();
            let new_sibling = Self::inner_from_slice(&sibling_children[..sibling_children.len() - 1]);
            let mut new_children: Children<T> = Children::new();
            new_children.push(borrowed);
            new_children.push(remaining.clone());
            return NodeRemove::Kept {
                left: Some(new_sibling),
                node: Self::inner(new_children),
                right: right.cloned(),
            };
        }

        if let Some(sibling) = right
            && sibling.arity() > MIN_ARITY
        {
            // Borrow the first child of the right sibling.
            let sibling_children = sibling.children();
            let borrowed = sibling_children[0].clone();
            let new_sibling = Self::inner_from_slice(&sibling_children[1..]);
            let mut new_children: Children<T> = Children::new();
            new_children.push(remaining.clone());
            new_children.push(borrowed);
            return NodeRemove::Kept {
                left: left.cloned(),
                node: Self::inner(new_children),
                right: Some(new_sibling),
            };
        }

        if let Some(sibling) = left {
            // Merge into the left sibling.
            let mut merged: Children<T> = sibling.children().iter().cloned().collect();
            merged.push(remaining.clone());
            return NodeRemove::Merged {
                left: Some(Self::inner(merged)),
                right: right.cloned(),
            };
        }

        if let Some(sibling) = right {
            // Merge into the right sibling.
            let mut merged: Children<T> = Children::new();
            merged.push(remaining.clone());
            merged.extend(sibling.children().iter().cloned());
            return NodeRemove::Merged {
                left: None,
                right: Some(Self::inner(merged)),
            };
        }

        NodeRemove::Underflow(remaining.clone())
    }
}

// =============================================================================
// Slicing and Fragment Merging
// =============================================================================

/// A node or an underfull fragment of one.
///
/// `Partial` carries a single full node at least one level below the digit
/// level it stands in for; it is always folded into a neighbor before a
/// finished tree is returned.
pub(crate) enum NodeLike<T> {
    Full(NodeRef<T>),
    Partial(NodeRef<T>),
}

impl<T> Clone for NodeLike<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Full(node) => Self::Full(node.clone()),
            Self::Partial(node) => Self::Partial(node.clone()),
        }
    }
}

impl<T> NodeLike<T> {
    /// Wraps `node` as full or partial depending on the target digit level.
    pub(crate) fn for_level(node: NodeRef<T>, level: usize) -> Self {
        if node.height() == level {
            Self::Full(node)
        } else {
            debug_assert!(node.height() < level);
            Self::Partial(node)
        }
    }
}

impl<T> Node<T> {
    /// Extracts the sub-range `[offset, offset + len)` below this node.
    ///
    /// The range is a strict sub-range, so the result may be an underfull
    /// fragment for the caller to fold into a neighbor.
    pub(crate) fn slice(&self, offset: usize, len: usize) -> NodeLike<T> {
        debug_assert!(len >= 1 && offset + len <= self.size() && len < self.size());
        match self {
            Self::Leaf(_) => unreachable!("a leaf has no strict sub-range"),
            Self::Inner { children, bounds } => {
                let level = self.height() - 1;
                let mut buffer: SmallVec<[NodeLike<T>; MAX_ARITY + 1]> = SmallVec::new();
                let end = offset + len;
                let mut start = 0;
                for (index, child) in children.iter().enumerate() {
                    let stop = bounds[index];
                    if stop > offset && start < end {
                        let child_from = offset.saturating_sub(start);
                        let child_to = (end - start).min(child.size());
                        let part = if child_from == 0 && child_to == child.size() {
                            NodeLike::Full(child.clone())
                        } else {
                            child.slice(child_from, child_to - child_from)
                        };
                        push_node_like(&mut buffer, part, level);
                    }
                    start = stop;
                    if start >= end {
                        break;
                    }
                }

                if buffer.len() == 1 {
                    match buffer.swap_remove(0) {
                        NodeLike::Full(node) | NodeLike::Partial(node) => NodeLike::Partial(node),
                    }
                } else {
                    let full: Children<T> = buffer
                        .iter()
                        .map(|entry| match entry {
                            NodeLike::Full(node) => node.clone(),
                            NodeLike::Partial(_) => {
                                unreachable!("fragments merge away in multi-entry buffers")
                            }
                        })
                        .collect();
                    NodeLike::Full(Self::inner(full))
                }
            }
        }
    }
}

/// Appends `entry` to `buffer`, folding underfull fragments into their
/// neighbor so that a buffer with two or more entries only holds full nodes
/// of height `level`.
pub(crate) fn push_node_like<T, A>(buffer: &mut SmallVec<A>, entry: NodeLike<T>, level: usize)
where
    A: smallvec::Array<Item = NodeLike<T>>,
{
    match entry {
        NodeLike::Full(node) => match buffer.pop() {
            Some(NodeLike::Partial(fragment)) => {
                let (first, second) = merge_fragment_left(&node, &fragment);
                buffer.push(NodeLike::Full(first));
                if let Some(second) = second {
                    buffer.push(NodeLike::Full(second));
                }
            }
            Some(previous) => {
                buffer.push(previous);
                buffer.push(NodeLike::Full(node));
            }
            None => buffer.push(NodeLike::Full(node)),
        },
        NodeLike::Partial(fragment) => match buffer.pop() {
            Some(NodeLike::Full(node)) => {
                let (first, second) = merge_fragment_right(&node, &fragment);
                buffer.push(NodeLike::Full(first));
                if let Some(second) = second {
                    buffer.push(NodeLike::Full(second));
                }
            }
            Some(NodeLike::Partial(earlier)) => {
                let merged = merge_fragments(&earlier, &fragment);
                buffer.push(NodeLike::for_level(merged, level));
            }
            None => buffer.push(NodeLike::Partial(fragment)),
        },
    }
}

/// Attaches `fragment` (of smaller height) as the rightmost descendant of
/// `node`, splitting on the way up when an inner node overflows. Returns one
/// or two nodes of `node`'s height.
pub(crate) fn merge_fragment_right<T>(
    node: &NodeRef<T>,
    fragment: &NodeRef<T>,
) -> (NodeRef<T>, Option<NodeRef<T>>) {
    let height = node.height();
    let fragment_height = fragment.height();
    debug_assert!(height > fragment_height);

    let children = node.children();
    if fragment_height == height - 1 {
        return split_children(children.iter().cloned().chain([fragment.clone()]));
    }

    let (replaced, extra) = merge_fragment_right(&children[children.len() - 1], fragment);
    let head = children[..children.len() - 1].iter().cloned();
    split_children(head.chain([replaced]).chain(extra))
}

/// Mirror image of [`merge_fragment_right`]: attaches `fragment` as the
/// leftmost descendant of `node`.
pub(crate) fn merge_fragment_left<T>(
    node: &NodeRef<T>,
    fragment: &NodeRef<T>,
) -> (NodeRef<T>, Option<NodeRef<T>>) {
    let height = node.height();
    let fragment_height = fragment.height();
    debug_assert!(height > fragment_height);

    let children = node.children();
    if fragment_height == height - 1 {
        return split_children([fragment.clone()].into_iter().chain(children.iter().cloned()));
    }

    let (replaced, extra) = merge_fragment_left(&children[0], fragment);
    let tail = children[1..].iter().cloned();
    split_children([replaced].into_iter().chain(extra).chain(tail))
}

/// Merges two fragments of arbitrary (possibly differing) heights into a
/// single node, `first` keeping its elements before `second`'s.
pub(crate) fn merge_fragments<T>(first: &NodeRef<T>, second: &NodeRef<T>) -> NodeRef<T> {
    let first_height = first.height();
    let second_height = second.height();
    if first_height == second_height {
        let mut children: Children<T> = Children::new();
        children.push(first.clone());
        children.push(second.clone());
        return Node::inner(children);
    }

    let (a, b) = if first_height > second_height {
        merge_fragment_right(first, second)
    } else {
        merge_fragment_left(second, first)
    };
    match b {
        None => a,
        Some(b) => {
            let mut children: Children<T> = Children::new();
            children.push(a);
            children.push(b);
            Node::inner(children)
        }
    }
}

/// Packs up to `MAX_ARITY + 1` children into one or two inner nodes.
fn split_children<T>(
    children: impl IntoIterator<Item = NodeRef<T>>,
) -> (NodeRef<T>, Option<NodeRef<T>>) {
    let collected: SmallVec<[NodeRef<T>; MAX_ARITY + 1]> = children.into_iter().collect();
    if collected.len() <= MAX_ARITY {
        (Node::inner_from_slice(&collected), None)
    } else {
        debug_assert_eq!(collected.len(), MAX_ARITY + 1);
        let mid = collected.len() - MIN_ARITY;
        (
            Node::inner_from_slice(&collected[..mid]),
            Some(Node::inner_from_slice(&collected[mid..])),
        )
    }
}

/// Sum of node sizes in a digit or node slice.
pub(crate) fn nodes_size<T>(nodes: &[NodeRef<T>]) -> usize {
    nodes.iter().map(|node| node.size()).sum()
}

// =============================================================================
// Tests
// =============================================================================
