//! An ordered set implemented with an AVL tree.
//!
//! [`AvlTreeSet`] stores unique values in sorted order and performs
//! lookups, insertions and removals in O(log n) time. Values are kept in
//! a height-balanced binary search tree whose nodes carry parent links,
//! so iteration and [`Cursor`] stepping walk the tree in sorted order
//! without auxiliary storage.
//!
//! ```
//! use avl_set::AvlTreeSet;
//!
//! let mut set = AvlTreeSet::new();
//! set.insert(2);
//! set.insert(0);
//! set.insert(1);
//! assert!(set.contains(&1));
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), [0, 1, 2]);
//!
//! let mut cursor = set.lower_bound(&1);
//! assert_eq!(cursor.get(), Some(&1));
//! cursor.move_prev();
//! assert_eq!(cursor.get(), Some(&0));
//! ```
//!
//! The `consistency_check` feature exposes `AvlTreeSet::check_consistency`,
//! which asserts the structural invariants of the tree.

mod set;
mod tree;

pub use set::{AvlTreeSet, Cursor, Intersection, IntoIter, Iter, Union};
