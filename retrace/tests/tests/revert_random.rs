//! Randomized revert soundness.
//!
//! For any tracked notification stream that stays inside tracked scope,
//! applying the stream and reverting must reproduce the tree exactly as
//! it was when tracking began.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retrace_tests::prelude::*;

fn run_trial(rng: &mut StdRng, ops: usize) {
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c", "d", "e", "f"]);
    let mut extras: Vec<NodeId> = Vec::new();

    for step in 0..ops {
        let width = t.children(root).len();
        match rng.gen_range(0..10) {
            // Move an original child somewhere else in the parent.
            0..=5 => {
                let node = kids[rng.gen_range(0..kids.len())];
                if t.tree.parent_of(node).is_some() {
                    let at = rng.gen_range(0..=width.saturating_sub(1));
                    t.insert_at(root, node, at);
                } else {
                    t.insert_at(root, node, rng.gen_range(0..=width));
                }
            }
            // Detach an original child.
            6..=7 => {
                let node = kids[rng.gen_range(0..kids.len())];
                if t.tree.parent_of(node).is_some() {
                    t.remove(node);
                }
            }
            // Insert a brand-new node.
            8 => {
                let node = t.element("fresh");
                extras.push(node);
                t.insert_at(root, node, rng.gen_range(0..=width));
            }
            // Detach a previously inserted node again.
            _ => {
                if let Some(&node) = extras.last() {
                    if t.tree.parent_of(node).is_some() {
                        t.remove(node);
                    }
                }
            }
        }
        assert!(
            t.diff.storage_size() <= kids.len() + extras.len(),
            "step {step}: delta larger than the set of touched nodes"
        );
    }

    let outcome = t.revert().unwrap();
    assert!(outcome.is_complete(), "no group may be skipped in tracked scope");
    assert_eq!(
        t.children(root),
        kids,
        "revert must restore the seed order: {}",
        t.outline(root)
    );
    for node in extras {
        assert!(t.tree.is_detached(node), "inserted node {node} must be gone");
    }
    assert_eq!(t.diff.storage_size(), 0);
    assert!(!t.mutated(None));
}

#[test]
fn random_streams_revert_to_the_seed_tree() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..64 {
        run_trial(&mut rng, 12);
    }
}

#[test]
fn long_random_stream_reverts() {
    let mut rng = StdRng::seed_from_u64(42);
    run_trial(&mut rng, 200);
}

#[test]
fn random_streams_with_synchronize_checkpoints_revert() {
    // Synchronize must be a semantic no-op on a quiescent tracked tree.
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..16 {
        let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c", "d"]);
        for _ in 0..8 {
            let node = kids[rng.gen_range(0..kids.len())];
            let width = t.children(root).len();
            if t.tree.parent_of(node).is_some() {
                let at = rng.gen_range(0..=width.saturating_sub(1));
                t.insert_at(root, node, at);
            } else {
                t.insert_at(root, node, rng.gen_range(0..=width));
            }
            t.synchronize();
        }
        t.revert().unwrap();
        assert_eq!(t.children(root), kids);
    }
}
