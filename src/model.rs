//! A reference model that replays operations against both an [`AaTree`] and a [`BTreeSet`],
//! asserting that they agree and that the tree's invariants hold after every step.

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use proptest::strategy::Strategy;

use crate::{AaTree, TreeError};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// An index into the values currently held, so that operations hit existing values.
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Add(ItemValue),
    Contains(ItemValue),
    Remove(ItemValue),
    Clear,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Add(item) => FinalOp::Add(get_value(sorted, item)),
            Op::Contains(item) => FinalOp::Contains(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::Clear => FinalOp::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Add(u32),
    Contains(u32),
    Remove(u32),
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    // Clearing is rare so that sequences build up trees of a useful size.
    proptest::prop_oneof![
        10 => value_strategy().prop_map(Op::Add),
        5 => value_strategy().prop_map(Op::Contains),
        8 => value_strategy().prop_map(Op::Remove),
        1 => proptest::strategy::Just(Op::Clear),
    ]
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_values = Vec::with_capacity(ops.len());
    let mut btree = BTreeSet::new();
    let mut tree: AaTree<u32> = AaTree::new();

    fn insert_sorted(v: &mut Vec<u32>, value: u32) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    fn remove_sorted(v: &mut Vec<u32>, value: u32) {
        if let Ok(idx) = v.binary_search(&value) {
            v.remove(idx);
        }
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_values);

        match final_op {
            FinalOp::Add(value) => {
                insert_sorted(&mut sorted_values, value);

                let from_btree = if btree.insert(value) {
                    Ok(())
                } else {
                    Err(TreeError::DuplicateValue)
                };
                let from_tree = tree.add(value);

                assert_eq!(from_btree, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Contains(value) => {
                let from_btree = if btree.is_empty() {
                    Err(TreeError::EmptyTree)
                } else {
                    Ok(btree.contains(&value))
                };
                let from_tree = tree.contains(&value);

                assert_eq!(from_btree, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                remove_sorted(&mut sorted_values, value);

                let from_btree = if btree.is_empty() {
                    Err(TreeError::EmptyTree)
                } else if btree.remove(&value) {
                    Ok(())
                } else {
                    Err(TreeError::ValueNotFound)
                };
                let from_tree = tree.remove(&value);

                assert_eq!(from_btree, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Clear => {
                sorted_values.clear();
                btree.clear();
                tree.clear();
            }
        }

        tree.assert_invariants();
        assert_eq!(btree.len(), tree.len());
        assert!(btree.iter().eq(tree.iter()), "FinalOp #{op_id}: {final_op:?}");
    }
}
