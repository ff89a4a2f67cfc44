//! The public persistent sequence type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::ops::Index;

use crate::cancel::{Cancellation, Cancelled, NeverCancel};
use crate::iter::SequenceIterator;
use crate::node::Node;
use crate::tree::{Tree, TreeSlice};

/// An immutable, size-indexed sequence backed by a 2–4 finger tree.
///
/// Every editing operation returns a new sequence and leaves the receiver
/// untouched; the versions share all unchanged structure. Elements are
/// addressed by position, and edits are possible at any position, not just
/// at the ends.
///
/// # Performance
///
/// | Operation | Complexity |
/// |-----------|------------|
/// | `len` | O(1) |
/// | `get`, `update` | O(log n) |
/// | `push_front`, `push_back`, `pop_front`, `pop_back` | amortized O(1) |
/// | `insert`, `remove` | O(log n) |
/// | `concat` | O(log n) |
/// | `slice` | O(log n) |
/// | `reverse` | O(n) |
/// | full iteration | O(n) |
///
/// # Examples
///
/// ```rust
/// use fingerseq::PersistentSequence;
///
/// let sequence: PersistentSequence<i32> = (0..5).collect();
/// let extended = sequence.push_back(5);
///
/// assert_eq!(sequence.len(), 5);
/// assert_eq!(extended.len(), 6);
/// assert_eq!(extended.get(5), Some(&5));
///
/// let spliced = extended.insert(2, 99);
/// assert_eq!(spliced.iter().copied().collect::<Vec<_>>(), vec![0, 1, 99, 2, 3, 4, 5]);
/// ```
pub struct PersistentSequence<T> {
    tree: Tree<T>,
}

impl<T> PersistentSequence<T> {
    /// Creates an empty sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fingerseq::PersistentSequence;
    ///
    /// let sequence: PersistentSequence<i32> = PersistentSequence::new();
    /// assert!(sequence.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self { tree: Tree::Empty }
    }

    /// Creates a sequence holding a single element.
    #[must_use]
    pub fn singleton(value: T) -> Self {
        Self {
            tree: Tree::Single(Node::leaf(value)),
        }
    }

    /// Creates a sequence from a slice, cloning the elements.
    #[must_use]
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone,
    {
        values.iter().cloned().collect()
    }

    pub(crate) fn from_tree(tree: Tree<T>) -> Self {
        Self { tree }
    }

    pub(crate) fn tree(&self) -> &Tree<T> {
        &self.tree
    }

    /// Number of elements. O(1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the sequence holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Element at `index`, or `None` when out of bounds. O(log n).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            Some(self.tree.get(index))
        } else {
            None
        }
    }

    /// First element, or `None` when empty. O(1).
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(self.tree.head().get(0))
        }
    }

    /// Last element, or `None` when empty. O(1).
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            let last = self.tree.last();
            Some(last.get(last.size() - 1))
        }
    }

    /// New sequence with `value` prepended. Amortized O(1).
    #[must_use]
    pub fn push_front(&self, value: T) -> Self {
        Self::from_tree(self.tree.cons(Node::leaf(value)))
    }

    /// New sequence with `value` appended. Amortized O(1).
    #[must_use]
    pub fn push_back(&self, value: T) -> Self {
        Self::from_tree(self.tree.snoc(Node::leaf(value)))
    }

    /// Splits off the first element, or `None` when empty. Amortized O(1).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fingerseq::PersistentSequence;
    ///
    /// let sequence: PersistentSequence<i32> = (0..3).collect();
    /// let (first, rest) = sequence.pop_front().unwrap();
    /// assert_eq!(first, 0);
    /// assert_eq!(rest.len(), 2);
    /// ```
    #[must_use]
    pub fn pop_front(&self) -> Option<(T, Self)>
    where
        T: Clone,
    {
        let first = self.front()?.clone();
        Some((first, Self::from_tree(self.tree.tail())))
    }

    /// Splits off the last element, or `None` when empty. Amortized O(1).
    #[must_use]
    pub fn pop_back(&self) -> Option<(T, Self)>
    where
        T: Clone,
    {
        let last = self.back()?.clone();
        Some((last, Self::from_tree(self.tree.init())))
    }

    /// New sequence with the element at `index` replaced, or `None` when
    /// `index` is out of bounds. O(log n).
    #[must_use]
    pub fn update(&self, index: usize, value: T) -> Option<Self> {
        if index < self.len() {
            Some(Self::from_tree(self.tree.update(index, value)))
        } else {
            None
        }
    }

    /// New sequence with `value` inserted before position `index`;
    /// `index == len` appends. O(log n).
    ///
    /// # Panics
    ///
    /// Panics when `index > len`.
    #[must_use]
    pub fn insert(&self, index: usize, value: T) -> Self {
        match self.try_insert(index, value, &NeverCancel) {
            Ok(sequence) => sequence,
            Err(Cancelled) => unreachable!(),
        }
    }

    /// New sequence without the element at `index`. O(log n).
    ///
    /// # Panics
    ///
    /// Panics when `index >= len`.
    #[must_use]
    pub fn remove(&self, index: usize) -> Self {
        match self.try_remove(index, &NeverCancel) {
            Ok(sequence) => sequence,
            Err(Cancelled) => unreachable!(),
        }
    }

    /// Concatenation of `self` and `other`. O(log n).
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        match self.try_concat(other, &NeverCancel) {
            Ok(sequence) => sequence,
            Err(Cancelled) => unreachable!(),
        }
    }

    /// The sub-sequence of `len` elements starting at `start`. O(log n).
    ///
    /// # Panics
    ///
    /// Panics when `start + len > self.len()`.
    #[must_use]
    pub fn slice(&self, start: usize, len: usize) -> Self {
        match self.try_slice(start, len, &NeverCancel) {
            Ok(sequence) => sequence,
            Err(Cancelled) => unreachable!(),
        }
    }

    /// The sequence with all elements in reverse order. O(n).
    #[must_use]
    pub fn reverse(&self) -> Self {
        match self.try_reverse(&NeverCancel) {
            Ok(sequence) => sequence,
            Err(Cancelled) => unreachable!(),
        }
    }

    /// Cancellable [`PersistentSequence::insert`].
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` reports cancellation; `self`
    /// stays valid and no partial result is observable.
    ///
    /// # Panics
    ///
    /// Panics when `index > len`.
    pub fn try_insert<C: Cancellation>(
        &self,
        index: usize,
        value: T,
        cancel: &C,
    ) -> Result<Self, Cancelled> {
        let len = self.len();
        assert!(index <= len, "insert position {index} out of bounds for length {len}");
        Ok(Self::from_tree(self.tree.insert(index, value, cancel)?))
    }

    /// Cancellable [`PersistentSequence::remove`].
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` reports cancellation.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len`.
    pub fn try_remove<C: Cancellation>(&self, index: usize, cancel: &C) -> Result<Self, Cancelled> {
        let len = self.len();
        assert!(index < len, "remove position {index} out of bounds for length {len}");
        match self.tree.remove(index, cancel)? {
            TreeSlice::Tree(tree) => Ok(Self::from_tree(tree)),
            TreeSlice::Partial(_) => unreachable!("leaf-level removal always yields a tree"),
        }
    }

    /// Cancellable [`PersistentSequence::concat`].
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` reports cancellation.
    pub fn try_concat<C: Cancellation>(&self, other: &Self, cancel: &C) -> Result<Self, Cancelled> {
        Ok(Self::from_tree(self.tree.concat(&[], &other.tree, cancel)?))
    }

    /// Cancellable [`PersistentSequence::slice`].
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` reports cancellation.
    ///
    /// # Panics
    ///
    /// Panics when `start + len > self.len()`.
    pub fn try_slice<C: Cancellation>(
        &self,
        start: usize,
        len: usize,
        cancel: &C,
    ) -> Result<Self, Cancelled> {
        let total = self.len();
        assert!(
            start <= total && len <= total - start,
            "slice of {len} elements at {start} out of bounds for length {total}"
        );
        if len == 0 {
            return Ok(Self::new());
        }
        match self.tree.slice(start, len, cancel)? {
            TreeSlice::Tree(tree) => Ok(Self::from_tree(tree)),
            TreeSlice::Partial(_) => unreachable!("leaf-level slicing always yields a tree"),
        }
    }

    /// Cancellable [`PersistentSequence::reverse`].
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` reports cancellation.
    pub fn try_reverse<C: Cancellation>(&self, cancel: &C) -> Result<Self, Cancelled> {
        Ok(Self::from_tree(self.tree.reverse(cancel)?))
    }

    /// Borrowed iterator over all elements.
    #[must_use]
    pub fn iter(&self) -> SequenceIterator<'_, T> {
        SequenceIterator::new(&self.tree, 0)
    }

    /// Borrowed iterator starting at position `start`.
    ///
    /// # Panics
    ///
    /// Panics when `start > len`.
    #[must_use]
    pub fn iter_from(&self, start: usize) -> SequenceIterator<'_, T> {
        let len = self.len();
        assert!(start <= len, "iterator start {start} out of bounds for length {len}");
        SequenceIterator::new(&self.tree, start)
    }

    /// Recomputes every cached size in the tree and panics with a localized
    /// message on the first inconsistency. Returns the element count.
    /// Intended for tests and debugging.
    pub fn check_invariants(&self) -> usize {
        self.tree.check_invariants()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T> Clone for PersistentSequence<T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<T> Default for PersistentSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for PersistentSequence<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentSequence<T> {}

impl<T: fmt::Debug> fmt::Debug for PersistentSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Hash> Hash for PersistentSequence<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for element in self {
            element.hash(state);
        }
    }
}

impl<T> FromIterator<T> for PersistentSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let builder: crate::SequenceBuilder<T> = iter.into_iter().collect();
        builder.freeze()
    }
}

impl<T> Extend<T> for PersistentSequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut tree = std::mem::replace(&mut self.tree, Tree::Empty);
        for value in iter {
            tree = tree.snoc(Node::leaf(value));
        }
        self.tree = tree;
    }
}

impl<T> Index<usize> for PersistentSequence<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let len = self.len();
        self.get(index)
            .unwrap_or_else(|| panic!("index {index} out of bounds for length {len}"))
    }
}

impl<'a, T> IntoIterator for &'a PersistentSequence<T> {
    type Item = &'a T;
    type IntoIter = SequenceIterator<'a, T>;

    fn into_iter(self) -> SequenceIterator<'a, T> {
        self.iter()
    }
}

/// Owning iterator; clones each element out of the shared tree.
pub struct SequenceIntoIter<T: Clone> {
    sequence: PersistentSequence<T>,
}

impl<T: Clone> Iterator for SequenceIntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let (value, rest) = self.sequence.pop_front()?;
        self.sequence = rest;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sequence.len();
        (remaining, Some(remaining))
    }
}

impl<T: Clone> DoubleEndedIterator for SequenceIntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        let (value, rest) = self.sequence.pop_back()?;
        self.sequence = rest;
        Some(value)
    }
}

impl<T: Clone> ExactSizeIterator for SequenceIntoIter<T> {}

impl<T: Clone> FusedIterator for SequenceIntoIter<T> {}

impl<T: Clone> IntoIterator for PersistentSequence<T> {
    type Item = T;
    type IntoIter = SequenceIntoIter<T>;

    fn into_iter(self) -> SequenceIntoIter<T> {
        SequenceIntoIter { sequence: self }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn range_sequence(range: std::ops::Range<i32>) -> PersistentSequence<i32> {
        range.collect()
    }

    mod construction {
        use super::*;

        #[rstest]
        fn test_new_is_empty() {
            let sequence: PersistentSequence<i32> = PersistentSequence::new();
            assert!(sequence.is_empty());
            assert_eq!(sequence.len(), 0);
            assert_eq!(sequence.front(), None);
            assert_eq!(sequence.back(), None);
        }

        #[rstest]
        fn test_singleton() {
            let sequence = PersistentSequence::singleton(42);
            assert_eq!(sequence.len(), 1);
            assert_eq!(sequence.front(), Some(&42));
            assert_eq!(sequence.back(), Some(&42));
        }

        #[rstest]
        fn test_from_slice() {
            let sequence = PersistentSequence::from_slice(&[1, 2, 3]);
            assert_eq!(sequence, range_sequence(1..4));
        }
    }

    mod access {
        use super::*;

        #[rstest]
        fn test_get_within_and_out_of_bounds() {
            let sequence = range_sequence(0..50);
            for index in 0..50 {
                assert_eq!(sequence.get(index), Some(&(index as i32)));
            }
            assert_eq!(sequence.get(50), None);
        }

        #[rstest]
        fn test_index_operator() {
            let sequence = range_sequence(0..10);
            assert_eq!(sequence[7], 7);
        }

        #[rstest]
        #[should_panic(expected = "out of bounds")]
        fn test_index_operator_panics_out_of_bounds() {
            let sequence = range_sequence(0..10);
            let _ = sequence[10];
        }
    }

    mod persistence {
        use super::*;

        #[rstest]
        fn test_push_leaves_original_untouched() {
            let original = range_sequence(0..20);
            let extended = original.push_back(20).push_front(-1);
            assert_eq!(original.len(), 20);
            assert_eq!(extended.len(), 22);
            assert_eq!(original.front(), Some(&0));
            assert_eq!(extended.front(), Some(&-1));
            original.check_invariants();
            extended.check_invariants();
        }

        #[rstest]
        fn test_old_versions_survive_edits() {
            let v0 = range_sequence(0..100);
            let v1 = v0.remove(50);
            let v2 = v1.insert(10, 1000);
            let v3 = v2.reverse();
            assert_eq!(v0.len(), 100);
            assert_eq!(v1.len(), 99);
            assert_eq!(v2.len(), 100);
            assert_eq!(v3.len(), 100);
            assert_eq!(v0.get(50), Some(&50));
            assert_eq!(v1.get(50), Some(&51));
            assert_eq!(v2.get(10), Some(&1000));
            assert_eq!(v3.front(), v2.back());
            for version in [&v0, &v1, &v2, &v3] {
                version.check_invariants();
            }
        }
    }

    mod edits {
        use super::*;

        #[rstest]
        fn test_pop_front_and_back() {
            let sequence = range_sequence(0..5);
            let (first, rest) = sequence.pop_front().unwrap();
            assert_eq!(first, 0);
            let (last, rest) = rest.pop_back().unwrap();
            assert_eq!(last, 4);
            assert_eq!(rest, range_sequence(1..4));
        }

        #[rstest]
        fn test_update() {
            let sequence = range_sequence(0..30);
            let updated = sequence.update(15, -15).unwrap();
            assert_eq!(updated.get(15), Some(&-15));
            assert_eq!(sequence.get(15), Some(&15));
            assert_eq!(sequence.update(30, 0), None);
            updated.check_invariants();
        }

        #[rstest]
        #[should_panic(expected = "insert position 6 out of bounds")]
        fn test_insert_out_of_bounds_panics() {
            let _ = range_sequence(0..5).insert(6, 0);
        }

        #[rstest]
        #[should_panic(expected = "remove position 5 out of bounds")]
        fn test_remove_out_of_bounds_panics() {
            let _ = range_sequence(0..5).remove(5);
        }

        #[rstest]
        #[should_panic(expected = "out of bounds")]
        fn test_slice_out_of_bounds_panics() {
            let _ = range_sequence(0..5).slice(3, 3);
        }
    }

    mod bulk {
        use super::*;

        #[rstest]
        fn test_concat() {
            let joined = range_sequence(0..40).concat(&range_sequence(40..100));
            assert_eq!(joined, range_sequence(0..100));
            joined.check_invariants();
        }

        #[rstest]
        fn test_concat_identity() {
            let sequence = range_sequence(0..25);
            let empty = PersistentSequence::new();
            assert_eq!(empty.concat(&sequence), sequence);
            assert_eq!(sequence.concat(&empty), sequence);
        }

        #[rstest]
        fn test_slice_and_empty_slice() {
            let sequence = range_sequence(0..100);
            assert_eq!(sequence.slice(20, 30), range_sequence(20..50));
            assert_eq!(sequence.slice(0, 0), PersistentSequence::new());
            assert_eq!(sequence.slice(0, 100), sequence);
        }

        #[rstest]
        fn test_reverse() {
            let sequence = range_sequence(0..64);
            let reversed = sequence.reverse();
            assert_eq!(
                reversed.iter().copied().collect::<Vec<_>>(),
                (0..64).rev().collect::<Vec<_>>()
            );
            assert_eq!(reversed.reverse(), sequence);
            reversed.check_invariants();
        }
    }

    mod cancellation {
        use super::*;
        use crate::cancel::CancelFlag;

        #[rstest]
        fn test_cancelled_reverse_fails_cleanly() {
            let sequence = range_sequence(0..100);
            let flag = CancelFlag::new();
            flag.cancel();
            assert_eq!(sequence.try_reverse(&flag), Err(Cancelled));
            // the input stays fully usable
            assert_eq!(sequence.len(), 100);
            sequence.check_invariants();
        }

        #[rstest]
        fn test_uncancelled_flag_passes_through() {
            let sequence = range_sequence(0..50);
            let flag = CancelFlag::new();
            let reversed = sequence.try_reverse(&flag).unwrap();
            assert_eq!(reversed.front(), Some(&49));
        }

        #[rstest]
        fn test_cancelled_edits_fail_cleanly() {
            let sequence = range_sequence(0..50);
            let flag = CancelFlag::new();
            flag.cancel();
            assert!(sequence.try_insert(25, -1, &flag).is_err());
            assert!(sequence.try_remove(25, &flag).is_err());
            assert!(sequence.try_slice(10, 20, &flag).is_err());
            assert!(sequence.try_concat(&sequence, &flag).is_err());
            sequence.check_invariants();
        }
    }

    mod traits {
        use super::*;
        use std::collections::hash_map::DefaultHasher;

        #[rstest]
        fn test_equality_ignores_structure() {
            let pushed: PersistentSequence<i32> = (0..100).collect();
            let mut consed = PersistentSequence::new();
            for value in (0..100).rev() {
                consed = consed.push_front(value);
            }
            assert_eq!(pushed, consed);
        }

        #[rstest]
        fn test_debug_lists_elements() {
            let sequence = range_sequence(0..3);
            assert_eq!(format!("{sequence:?}"), "[0, 1, 2]");
        }

        #[rstest]
        fn test_hash_agrees_with_equality() {
            fn hash_of(sequence: &PersistentSequence<i32>) -> u64 {
                let mut hasher = DefaultHasher::new();
                sequence.hash(&mut hasher);
                hasher.finish()
            }
            let a = range_sequence(0..60);
            let mut b = PersistentSequence::new();
            for value in (0..60).rev() {
                b = b.push_front(value);
            }
            assert_eq!(hash_of(&a), hash_of(&b));
        }

        #[rstest]
        fn test_extend_and_owning_iterator() {
            let mut sequence = range_sequence(0..5);
            sequence.extend(5..10);
            let collected: Vec<i32> = sequence.clone().into_iter().collect();
            assert_eq!(collected, (0..10).collect::<Vec<_>>());
            let reversed: Vec<i32> = sequence.into_iter().rev().collect();
            assert_eq!(reversed, (0..10).rev().collect::<Vec<_>>());
        }

        #[rstest]
        fn test_iter_from() {
            let sequence = range_sequence(0..30);
            let suffix: Vec<i32> = sequence.iter_from(25).copied().collect();
            assert_eq!(suffix, vec![25, 26, 27, 28, 29]);
        }
    }
}
