//! # fingerseq
//!
//! A persistent, size-indexed sequence backed by a 2–4 finger tree.
//!
//! ## Overview
//!
//! [`PersistentSequence`] is an immutable sequence whose editing operations
//! return new versions sharing structure with the old ones. Unlike an
//! ends-only deque, every position supports edits:
//!
//! - **End access**: `push_front`, `push_back`, `pop_front`, `pop_back` in
//!   amortized O(1)
//! - **Positional edits**: `get`, `update`, `insert`, `remove` in O(log n)
//! - **Bulk operations**: `concat`, `slice` in O(log n), `reverse` in O(n)
//! - **Batch construction**: [`SequenceBuilder`] builds a sequence from n
//!   elements in O(n) without intermediate rebalancing
//! - **Cancellation**: `try_*` variants accept a [`Cancellation`] token and
//!   abandon long-running structural operations cleanly
//!
//! ## Feature Flags
//!
//! - `arc`: use `Arc` instead of `Rc` for shared nodes, making sequences
//!   `Send`/`Sync` for types that are
//!
//! ## Example
//!
//! ```rust
//! use fingerseq::PersistentSequence;
//!
//! let sequence: PersistentSequence<i32> = (0..100).collect();
//! let edited = sequence.insert(50, -1).remove(0);
//!
//! assert_eq!(sequence.len(), 100);
//! assert_eq!(edited.len(), 100);
//! assert_eq!(edited.get(49), Some(&-1));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Shared pointer used for tree nodes.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod builder;
mod cancel;
mod iter;
mod node;
mod sequence;
mod tree;

pub use builder::SequenceBuilder;
pub use cancel::{CancelFlag, Cancellation, Cancelled, NeverCancel};
pub use iter::SequenceIterator;
pub use sequence::{PersistentSequence, SequenceIntoIter};
