//! End-to-end scenarios against the seeded three-child tree.
//!
//! Root with children [a, b, c]; every scenario replays a short stream of
//! observer notifications and checks the tracked delta, the reported
//! range, and reversion.

use retrace_tests::prelude::*;

#[test]
fn cycle_back_reverts_to_seed_order() {
    // GIVEN append(a), prepend(c), prepend(b): tree becomes [b, c, a].
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c"]);
    let (a, b, c) = (kids[0], kids[1], kids[2]);
    t.append(root, a);
    t.prepend(root, c);
    t.prepend(root, b);
    assert_eq!(t.children(root), vec![b, c, a]);

    // THEN the tree reads as mutated and the range brackets the content.
    assert!(t.mutated(Some(root)));
    let range = t.range(Some(root)).unwrap().expect("differences exist");
    for &k in &kids {
        assert!(
            range.covers(k, &t.tree).unwrap(),
            "range must cover {k}: {}",
            t.outline(root)
        );
    }

    // AND revert restores the seed order.
    let outcome = t.revert().unwrap();
    assert!(outcome.is_complete());
    assert_eq!(t.children(root), vec![a, b, c]);
    assert!(!t.mutated(Some(root)));
    assert_eq!(t.diff.storage_size(), 0);
}

#[test]
fn full_rotation_is_not_a_mutation() {
    // GIVEN append(a), append(b), append(c): the order cycles back.
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c"]);
    for &k in &kids {
        t.append(root, k);
    }

    // THEN order is unchanged, nothing floats, nothing to report.
    assert_eq!(t.children(root), kids);
    assert!(!t.mutated(Some(root)));
    assert!(!t.mutated(None));
    assert_eq!(t.range(Some(root)).unwrap(), None);
    assert_eq!(t.diff.storage_size(), 0);
}

#[test]
fn mixed_removal_keeps_one_record() {
    // GIVEN two net no-op appends and one removal.
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c"]);
    let (a, b, c) = (kids[0], kids[1], kids[2]);
    t.append(root, a);
    t.append(root, b);
    t.remove(c);
    assert_eq!(t.children(root), vec![a, b]);

    // THEN exactly the removed node is tracked, with no current side.
    assert_eq!(t.diff.storage_size(), 1);
    let diffs = t.node_diff(DiffFilter::ALL).unwrap();
    let c_diff = &diffs[&c];
    let children = c_diff.children.as_ref().expect("placement delta");
    assert!(children.mutated.is_none(), "c is presently removed");
    let orig = children.original.expect("original placement");
    assert_eq!(orig.prev, Sibling::Node(b));
    assert_eq!(orig.next, Sibling::End);

    // AND revert reinstates it.
    t.revert().unwrap();
    assert_eq!(t.children(root), vec![a, b, c]);
}

#[test]
fn attribute_toggle_and_restore_is_clean() {
    // GIVEN a.class = "x" from before tracking.
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c"]);
    let a = kids[0];
    t.tree.set_attribute(a, "class", None, "x").unwrap();

    // WHEN the attribute is toggled away and back.
    t.set_attr(a, "class", "y");
    assert!(t.mutated(Some(root)));
    t.set_attr(a, "class", "x");

    // THEN nothing is dirty and revert has nothing to do.
    assert!(!t.mutated(Some(root)));
    let outcome = t.revert().unwrap();
    assert_eq!(outcome.properties_reverted, 0);
    assert_eq!(t.tree.attribute(a, "class", None).as_deref(), Some("x"));
}

#[test]
fn character_data_edit_and_restore_is_clean() {
    let mut t = TrackedTree::new();
    let root = t.element("root");
    let text = t.text("hi");
    t.tree.append(root, &[text]).unwrap();

    t.set_data(text, "hello");
    assert!(t.mutated(Some(root)));

    t.set_data(text, "hi");
    assert!(!t.mutated(Some(root)));
    let outcome = t.revert().unwrap();
    assert_eq!(outcome.properties_reverted, 0);
    assert_eq!(t.tree.data(text).as_deref(), Some("hi"));
}

#[test]
fn unknown_sibling_resolves_through_synchronize() {
    // GIVEN root [a]; an untracked node x slips in before a, then a is
    // removed under tracking. The tracker can only anchor a's original
    // placement on what it is shown: x.
    let mut t = TrackedTree::new();
    let root = t.element("root");
    let a = t.element("a");
    t.tree.append(root, &[a]).unwrap();

    let x = t.element("x");
    t.tree.prepend(root, &[x]).unwrap(); // untracked
    t.remove(a);

    t.synchronize();

    // THEN a's original previous sibling is x...
    let diffs = t.node_diff(DiffFilter::ALL).unwrap();
    let orig = diffs[&a]
        .children
        .as_ref()
        .and_then(|c| c.original)
        .expect("original placement");
    assert_eq!(orig.prev, Sibling::Node(x));

    // ...and revert reinserts a after x.
    t.revert().unwrap();
    assert_eq!(t.children(root), vec![x, a]);
}

#[test]
fn untracked_reinsertion_parks_a_promise_until_synchronize() {
    // GIVEN [a, b]: a is removed under tracking, reinserted untracked,
    // then b is removed under tracking. The window for b names a as an
    // edge while the tracker believes a detached, so b's original next
    // stays pending until the tree is declared quiescent.
    let mut t = TrackedTree::new();
    let root = t.element("root");
    let a = t.element("a");
    let b = t.element("b");
    t.tree.append(root, &[a, b]).unwrap();

    t.remove(a);
    t.untracked_insert_at(root, a, 1);
    t.remove(b);

    let diffs = t.node_diff(DiffFilter::ALL).unwrap();
    let orig = diffs[&b]
        .children
        .as_ref()
        .and_then(|c| c.original)
        .expect("original placement");
    assert!(
        matches!(orig.next, Sibling::Pending(_)),
        "b's original next should be pending, got {:?}",
        orig.next
    );

    t.synchronize();
    let diffs = t.node_diff(DiffFilter::ALL).unwrap();
    let orig = diffs[&b]
        .children
        .as_ref()
        .and_then(|c| c.original)
        .expect("original placement");
    assert_eq!(orig.prev, Sibling::Node(a));
    assert_eq!(orig.next, Sibling::End);

    t.revert().unwrap();
    assert_eq!(t.children(root), vec![a, b]);
}

#[test]
fn batched_clear_out_reverts() {
    // GIVEN all children removed in one window.
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c", "d"]);
    t.remove_all_children(root);
    assert!(t.children(root).is_empty());

    // THEN one revert group restores the whole run.
    let outcome = t.revert().unwrap();
    assert_eq!(outcome.groups_moved, 1);
    assert_eq!(t.children(root), kids);
}

#[test]
fn added_nodes_are_removed_on_revert() {
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b"]);
    let extra = t.element("extra");
    t.insert_at(root, extra, 1);
    assert_eq!(t.children(root), vec![kids[0], extra, kids[1]]);

    let outcome = t.revert().unwrap();
    assert_eq!(outcome.nodes_removed, 1);
    assert_eq!(t.children(root), kids);
    assert!(t.tree.is_detached(extra));
}

#[test]
fn cross_parent_moves_revert_everywhere() {
    // GIVEN items shuffled between two lists.
    let mut t = TrackedTree::new();
    let left = t.element("left");
    let right = t.element("right");
    let (x, y, z) = (t.element("x"), t.element("y"), t.element("z"));
    t.tree.append(left, &[x, y]).unwrap();
    t.tree.append(right, &[z]).unwrap();

    t.append(right, x); // left [y], right [z, x]
    t.prepend(left, z); // left [z, y], right [x]
    assert!(t.mutated(Some(left)));
    assert!(t.mutated(Some(right)));
    assert!(!t.mutated(Some(y))); // scoping: y's subtree is untouched

    t.revert().unwrap();
    assert_eq!(t.children(left), vec![x, y]);
    assert_eq!(t.children(right), vec![z]);
}
