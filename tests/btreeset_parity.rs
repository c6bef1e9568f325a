use std::collections::BTreeSet;

use proptest::prelude::*;

use avl_set::AvlTreeSet;

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

/// Generates random values in a range narrow enough to ensure collisions.
fn value_strategy() -> impl Strategy<Value = i64> {
    -500i64..500i64
}

#[derive(Debug, Clone)]
enum SetOp {
    Insert(i64),
    Remove(i64),
    Contains(i64),
    LowerBound(i64),
    First,
    Last,
    PopFirst,
    PopLast,
}

fn set_op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        5 => value_strategy().prop_map(SetOp::Insert),
        3 => value_strategy().prop_map(SetOp::Remove),
        2 => value_strategy().prop_map(SetOp::Contains),
        2 => value_strategy().prop_map(SetOp::LowerBound),
        1 => Just(SetOp::First),
        1 => Just(SetOp::Last),
        1 => Just(SetOp::PopFirst),
        1 => Just(SetOp::PopLast),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both AvlTreeSet and
    /// BTreeSet and asserts identical results at every step.
    #[test]
    fn set_ops_match_btreeset(ops in proptest::collection::vec(set_op_strategy(), TEST_SIZE)) {
        let mut avl_set: AvlTreeSet<i64> = AvlTreeSet::new();
        let mut bt_set: BTreeSet<i64> = BTreeSet::new();

        for op in &ops {
            match op {
                SetOp::Insert(v) => {
                    prop_assert_eq!(avl_set.insert(*v), bt_set.insert(*v), "insert({})", v);
                }
                SetOp::Remove(v) => {
                    prop_assert_eq!(avl_set.remove(v), bt_set.remove(v), "remove({})", v);
                }
                SetOp::Contains(v) => {
                    prop_assert_eq!(avl_set.contains(v), bt_set.contains(v), "contains({})", v);
                }
                SetOp::LowerBound(v) => {
                    let ours = avl_set.lower_bound(v).get();
                    let expected = bt_set.range(*v..).next();
                    prop_assert_eq!(ours, expected, "lower_bound({})", v);
                }
                SetOp::First => {
                    prop_assert_eq!(avl_set.first(), bt_set.first());
                }
                SetOp::Last => {
                    prop_assert_eq!(avl_set.last(), bt_set.last());
                }
                SetOp::PopFirst => {
                    prop_assert_eq!(avl_set.pop_first(), bt_set.pop_first());
                }
                SetOp::PopLast => {
                    prop_assert_eq!(avl_set.pop_last(), bt_set.pop_last());
                }
            }
            prop_assert_eq!(avl_set.len(), bt_set.len());
        }

        // Both orders of traversal must agree after the whole sequence.
        prop_assert_eq!(
            avl_set.iter().collect::<Vec<_>>(),
            bt_set.iter().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            avl_set.iter().rev().collect::<Vec<_>>(),
            bt_set.iter().rev().collect::<Vec<_>>()
        );
    }

    /// A forward cursor walk visits exactly the sorted distinct values.
    #[test]
    fn cursor_walk_matches_sorted_values(values in proptest::collection::vec(value_strategy(), 0..200)) {
        let avl_set: AvlTreeSet<i64> = values.iter().copied().collect();
        let sorted: BTreeSet<i64> = values.iter().copied().collect();

        let mut cursor = avl_set.cursor_front();
        for value in &sorted {
            prop_assert_eq!(cursor.get(), Some(value));
            cursor.move_next();
        }
        prop_assert_eq!(cursor.get(), None);

        for value in sorted.iter().rev() {
            cursor.move_prev();
            prop_assert_eq!(cursor.get(), Some(value));
        }
    }
}
