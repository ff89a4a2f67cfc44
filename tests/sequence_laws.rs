//! Property-based tests for PersistentSequence laws.
//!
//! Verifies the algebraic laws and structural invariants of the sequence
//! against a plain `Vec<i32>` model using proptest.

use fingerseq::{PersistentSequence, SequenceBuilder};
use proptest::prelude::*;

fn sequence_of(elements: &[i32]) -> PersistentSequence<i32> {
    elements.iter().copied().collect()
}

fn contents(sequence: &PersistentSequence<i32>) -> Vec<i32> {
    sequence.iter().copied().collect()
}

// =============================================================================
// Round-trips and indexing
// =============================================================================

proptest! {
    /// Collecting and iterating is the identity on the element list.
    #[test]
    fn prop_collect_iterate_round_trip(
        elements in prop::collection::vec(any::<i32>(), 0..200)
    ) {
        let sequence = sequence_of(&elements);
        prop_assert_eq!(sequence.len(), elements.len());
        prop_assert_eq!(contents(&sequence), elements);
        prop_assert_eq!(sequence.check_invariants(), sequence.len());
    }

    /// `get` agrees with positional indexing into the source list.
    #[test]
    fn prop_get_matches_model(
        elements in prop::collection::vec(any::<i32>(), 1..100)
    ) {
        let sequence = sequence_of(&elements);
        for (index, element) in elements.iter().enumerate() {
            prop_assert_eq!(sequence.get(index), Some(element));
        }
        prop_assert_eq!(sequence.get(elements.len()), None);
    }

    /// Reverse iteration yields the reversed element list.
    #[test]
    fn prop_reverse_iteration(
        elements in prop::collection::vec(any::<i32>(), 0..100)
    ) {
        let sequence = sequence_of(&elements);
        let backwards: Vec<i32> = sequence.iter().rev().copied().collect();
        let mut expected = elements.clone();
        expected.reverse();
        prop_assert_eq!(backwards, expected);
    }

    /// The builder and repeated `push_back` build equal sequences.
    #[test]
    fn prop_builder_matches_push_back(
        elements in prop::collection::vec(any::<i32>(), 0..150)
    ) {
        let mut builder = SequenceBuilder::new();
        let mut pushed = PersistentSequence::new();
        for &element in &elements {
            builder.push_back(element);
            pushed = pushed.push_back(element);
        }
        let built = builder.freeze();
        prop_assert_eq!(&built, &pushed);
        built.check_invariants();
    }
}

// =============================================================================
// Edit laws
// =============================================================================

proptest! {
    /// Insert-Remove Law: removing a freshly inserted element restores the
    /// original sequence.
    #[test]
    fn prop_insert_remove_inverse(
        elements in prop::collection::vec(any::<i32>(), 0..80),
        position_seed: usize,
        new_element: i32
    ) {
        let sequence = sequence_of(&elements);
        let position = position_seed % (elements.len() + 1);
        let inserted = sequence.insert(position, new_element);
        prop_assert_eq!(inserted.get(position), Some(&new_element));
        prop_assert_eq!(inserted.remove(position), sequence);
        inserted.check_invariants();
    }

    /// Insert agrees with `Vec::insert` on the model.
    #[test]
    fn prop_insert_matches_model(
        elements in prop::collection::vec(any::<i32>(), 0..80),
        position_seed: usize,
        new_element: i32
    ) {
        let position = position_seed % (elements.len() + 1);
        let inserted = sequence_of(&elements).insert(position, new_element);
        let mut model = elements.clone();
        model.insert(position, new_element);
        prop_assert_eq!(contents(&inserted), model);
    }

    /// Remove agrees with `Vec::remove` on the model.
    #[test]
    fn prop_remove_matches_model(
        elements in prop::collection::vec(any::<i32>(), 1..80),
        position_seed: usize
    ) {
        let position = position_seed % elements.len();
        let removed = sequence_of(&elements).remove(position);
        let mut model = elements.clone();
        model.remove(position);
        prop_assert_eq!(contents(&removed), model);
        removed.check_invariants();
    }

    /// Update only touches the targeted index.
    #[test]
    fn prop_update_is_local(
        elements in prop::collection::vec(any::<i32>(), 1..80),
        position_seed: usize,
        new_element: i32
    ) {
        let sequence = sequence_of(&elements);
        let position = position_seed % elements.len();
        let updated = sequence.update(position, new_element).unwrap();
        for index in 0..elements.len() {
            let expected = if index == position { &new_element } else { &elements[index] };
            prop_assert_eq!(updated.get(index), Some(expected));
        }
    }

    /// A long random mix of edits keeps the tree consistent with the model.
    #[test]
    fn prop_random_edit_sequence(
        operations in prop::collection::vec((any::<u8>(), any::<usize>(), any::<i32>()), 0..120)
    ) {
        let mut sequence = PersistentSequence::new();
        let mut model: Vec<i32> = Vec::new();
        for (kind, position_seed, value) in operations {
            match kind % 6 {
                0 => {
                    sequence = sequence.push_back(value);
                    model.push(value);
                }
                1 => {
                    sequence = sequence.push_front(value);
                    model.insert(0, value);
                }
                2 => {
                    let position = position_seed % (model.len() + 1);
                    sequence = sequence.insert(position, value);
                    model.insert(position, value);
                }
                3 if !model.is_empty() => {
                    let position = position_seed % model.len();
                    sequence = sequence.remove(position);
                    model.remove(position);
                }
                4 if !model.is_empty() => {
                    let position = position_seed % model.len();
                    sequence = sequence.update(position, value).unwrap();
                    model[position] = value;
                }
                5 if !model.is_empty() => {
                    let (_, rest) = sequence.pop_front().unwrap();
                    sequence = rest;
                    model.remove(0);
                }
                _ => {}
            }
            prop_assert_eq!(sequence.check_invariants(), model.len());
        }
        prop_assert_eq!(contents(&sequence), model);
    }
}

// =============================================================================
// Bulk-operation laws
// =============================================================================

proptest! {
    /// Concat Identity Law: the empty sequence is a two-sided identity.
    #[test]
    fn prop_concat_identity(
        elements in prop::collection::vec(any::<i32>(), 0..100)
    ) {
        let sequence = sequence_of(&elements);
        let empty = PersistentSequence::new();
        prop_assert_eq!(empty.concat(&sequence), sequence.clone());
        prop_assert_eq!(sequence.concat(&empty), sequence);
    }

    /// Concat Associativity Law: (a ++ b) ++ c == a ++ (b ++ c).
    #[test]
    fn prop_concat_associative(
        a in prop::collection::vec(any::<i32>(), 0..60),
        b in prop::collection::vec(any::<i32>(), 0..60),
        c in prop::collection::vec(any::<i32>(), 0..60)
    ) {
        let (sa, sb, sc) = (sequence_of(&a), sequence_of(&b), sequence_of(&c));
        let left = sa.concat(&sb).concat(&sc);
        let right = sa.concat(&sb.concat(&sc));
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left.check_invariants(), a.len() + b.len() + c.len());
    }

    /// Concat agrees with list concatenation on the model.
    #[test]
    fn prop_concat_matches_model(
        a in prop::collection::vec(any::<i32>(), 0..100),
        b in prop::collection::vec(any::<i32>(), 0..100)
    ) {
        let joined = sequence_of(&a).concat(&sequence_of(&b));
        let mut model = a.clone();
        model.extend_from_slice(&b);
        prop_assert_eq!(contents(&joined), model);
    }

    /// Slice agrees with model slicing for every valid window.
    #[test]
    fn prop_slice_matches_model(
        elements in prop::collection::vec(any::<i32>(), 0..80),
        start_seed: usize,
        len_seed: usize
    ) {
        let sequence = sequence_of(&elements);
        let start = start_seed % (elements.len() + 1);
        let len = len_seed % (elements.len() - start + 1);
        let window = sequence.slice(start, len);
        prop_assert_eq!(contents(&window), elements[start..start + len].to_vec());
        window.check_invariants();
    }

    /// Slice Composition Law: slicing a slice equals one combined slice.
    #[test]
    fn prop_slice_composes(
        elements in prop::collection::vec(any::<i32>(), 0..80),
        seeds in (any::<usize>(), any::<usize>(), any::<usize>(), any::<usize>())
    ) {
        let sequence = sequence_of(&elements);
        let outer_start = seeds.0 % (elements.len() + 1);
        let outer_len = seeds.1 % (elements.len() - outer_start + 1);
        let inner_start = if outer_len == 0 { 0 } else { seeds.2 % (outer_len + 1) };
        let inner_len = seeds.3 % (outer_len - inner_start + 1);

        let twice = sequence.slice(outer_start, outer_len).slice(inner_start, inner_len);
        let once = sequence.slice(outer_start + inner_start, inner_len);
        prop_assert_eq!(twice, once);
    }

    /// Reverse Involution Law: reversing twice is the identity.
    #[test]
    fn prop_reverse_involution(
        elements in prop::collection::vec(any::<i32>(), 0..150)
    ) {
        let sequence = sequence_of(&elements);
        let reversed = sequence.reverse();
        let mut model = elements.clone();
        model.reverse();
        prop_assert_eq!(contents(&reversed), model);
        prop_assert_eq!(reversed.reverse(), sequence);
        reversed.check_invariants();
    }

    /// Reverse distributes over concat with the operands swapped.
    #[test]
    fn prop_reverse_antidistributes_over_concat(
        a in prop::collection::vec(any::<i32>(), 0..60),
        b in prop::collection::vec(any::<i32>(), 0..60)
    ) {
        let (sa, sb) = (sequence_of(&a), sequence_of(&b));
        prop_assert_eq!(sa.concat(&sb).reverse(), sb.reverse().concat(&sa.reverse()));
    }
}
