//! Property-based tests for the sequence model.
//!
//! These tests verify the laws the rest of the engine leans on:
//! - Pid ordering is a strict total order (irreflexive, trichotomous,
//!   transitive)
//! - Pids and operations round-trip through their string encodings
//! - Sequence convergence: any delivery order of the same inserts and
//!   deletes (each delete after its insert) yields the same atoms

use cowrite_crdt::{decode_patch, encode_patch, Id, Op, Pid, Sequence};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn id_strategy() -> impl Strategy<Value = Id> {
    (0u32..8, 0u32..4).prop_map(|(position, agent)| Id::new(position, agent))
}

fn pid_strategy() -> impl Strategy<Value = Pid> {
    (prop::collection::vec(id_strategy(), 1..4), 0u32..3)
        .prop_map(|(ids, seq)| Pid::new(ids, seq).expect("non-empty path"))
}

fn wide_pid_strategy() -> impl Strategy<Value = Pid> {
    (
        prop::collection::vec((any::<u32>(), any::<u32>()), 1..5),
        any::<u32>(),
    )
        .prop_map(|(ids, seq)| {
            let ids = ids.into_iter().map(|(p, a)| Id::new(p, a)).collect();
            Pid::new(ids, seq).expect("non-empty path")
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            prop::option::of(wide_pid_strategy()),
            prop::option::of(wide_pid_strategy()),
            any::<String>(),
        )
            .prop_map(|(prev_pid, next_pid, value)| Op::ClientInsert {
                prev_pid,
                next_pid,
                value,
            }),
        (wide_pid_strategy(), any::<char>()).prop_map(|(pid, value)| Op::Insert { pid, value }),
        wide_pid_strategy().prop_map(|pid| Op::Delete { pid }),
    ]
}

/// A set of distinct atoms, which of them get deleted, and random delivery
/// priorities for each insert and delete.
fn history_strategy() -> impl Strategy<Value = (Vec<(Pid, char, bool)>, Vec<(u32, u32)>, Vec<(u32, u32)>)>
{
    prop::collection::btree_set(pid_strategy(), 1..40).prop_flat_map(|pids: BTreeSet<Pid>| {
        let n = pids.len();
        let atoms = (
            Just(pids.into_iter().collect::<Vec<_>>()),
            prop::collection::vec((prop::char::range('a', 'z'), any::<bool>()), n),
        )
            .prop_map(|(pids, extras)| {
                pids.into_iter()
                    .zip(extras)
                    .map(|(pid, (value, deleted))| (pid, value, deleted))
                    .collect::<Vec<_>>()
            });
        (
            atoms,
            prop::collection::vec((0u32..1000, 0u32..1000), n),
            prop::collection::vec((0u32..1000, 0u32..1000), n),
        )
    })
}

/// Orders the history by priority; a delete always sorts after its insert.
fn schedule(atoms: &[(Pid, char, bool)], priorities: &[(u32, u32)]) -> Vec<Op> {
    let mut timed: Vec<(u64, usize, Op)> = Vec::new();
    for (i, ((pid, value, deleted), (insert_at, delete_gap))) in
        atoms.iter().zip(priorities).enumerate()
    {
        let insert_at = u64::from(*insert_at);
        timed.push((
            insert_at,
            2 * i,
            Op::Insert {
                pid: pid.clone(),
                value: *value,
            },
        ));
        if *deleted {
            timed.push((
                insert_at + u64::from(*delete_gap) + 1,
                2 * i + 1,
                Op::Delete { pid: pid.clone() },
            ));
        }
    }
    timed.sort_by_key(|(at, tiebreak, _)| (*at, *tiebreak));
    timed.into_iter().map(|(_, _, op)| op).collect()
}

fn replay(ops: &[Op]) -> Sequence<char> {
    let mut seq = Sequence::new();
    for op in ops {
        match op {
            Op::Insert { pid, value } => {
                seq.apply_insert(pid.clone(), *value);
            }
            Op::Delete { pid } => {
                seq.apply_delete(pid);
            }
            Op::ClientInsert { .. } => unreachable!("histories hold authoritative ops only"),
        }
    }
    seq
}

// =============================================================================
// PID ORDER
// =============================================================================

mod pid_order_properties {
    use super::*;

    proptest! {
        #[test]
        fn irreflexive(a in pid_strategy()) {
            prop_assert!(!(a < a));
            prop_assert_eq!(a.cmp(&a), Ordering::Equal);
        }

        #[test]
        fn trichotomous(a in pid_strategy(), b in pid_strategy()) {
            let relations = [a < b, a == b, a > b];
            prop_assert_eq!(relations.iter().filter(|r| **r).count(), 1);
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }

        #[test]
        fn transitive(a in pid_strategy(), b in pid_strategy(), c in pid_strategy()) {
            if a < b && b < c {
                prop_assert!(a < c);
            }
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
        }

        #[test]
        fn prefix_precedes_extension(a in pid_strategy(), id in id_strategy(), seq in 0u32..3) {
            let child = a.child(id.position, id.agent_id.get(), seq);
            prop_assert!(a < child);
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

mod codec_properties {
    use super::*;

    proptest! {
        #[test]
        fn pid_roundtrip(pid in wide_pid_strategy()) {
            let encoded = pid.encode();
            prop_assert_eq!(Pid::decode(&encoded).unwrap(), pid.clone());
            prop_assert_eq!(Pid::decode(&encoded).unwrap().encode(), encoded);
        }

        #[test]
        fn op_roundtrip(op in op_strategy()) {
            prop_assert_eq!(Op::decode(&op.encode()).unwrap(), op);
        }

        #[test]
        fn patch_roundtrip(ops in prop::collection::vec(op_strategy(), 0..10)) {
            prop_assert_eq!(decode_patch(&encode_patch(&ops)).unwrap(), ops);
        }
    }
}

// =============================================================================
// SEQUENCE CONVERGENCE
// =============================================================================

mod sequence_properties {
    use super::*;

    proptest! {
        #[test]
        fn any_delivery_order_converges((atoms, first, second) in history_strategy()) {
            let a = replay(&schedule(&atoms, &first));
            let b = replay(&schedule(&atoms, &second));
            prop_assert_eq!(&a, &b);

            let expected: String = atoms
                .iter()
                .filter(|(_, _, deleted)| !deleted)
                .map(|(_, value, _)| *value)
                .collect();
            prop_assert_eq!(a.as_string(), expected);
        }

        #[test]
        fn sequence_is_strictly_increasing((atoms, order, _) in history_strategy()) {
            let seq = replay(&schedule(&atoms, &order));
            let pids: Vec<_> = seq.iter().map(|atom| atom.pid.clone()).collect();
            prop_assert!(pids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
