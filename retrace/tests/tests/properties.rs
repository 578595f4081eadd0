//! Query-surface behavior: diff filters, ranges, storage accounting.

use retrace_tests::prelude::*;
use retrace_core::Position;

#[test]
fn diff_filter_gates_sides_and_kinds() {
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b"]);
    let a = kids[0];
    t.tree.set_attribute(a, "class", None, "x").unwrap();
    t.set_attr(a, "class", "y");
    t.remove(kids[1]);

    // Attribute-only, original side.
    let diffs = t
        .node_diff(DiffFilter::ORIGINAL | DiffFilter::ATTRIBUTE)
        .unwrap();
    let delta = &diffs[&a].attributes["class"];
    assert_eq!(delta.original, Some(Some("x".to_string())));
    assert_eq!(delta.mutated, None);
    assert!(diffs[&a].children.is_none());
    assert!(!diffs.contains_key(&kids[1]), "children kind filtered out");

    // Children-only, both sides.
    let diffs = t
        .node_diff(DiffFilter::ORIGINAL | DiffFilter::MUTATED | DiffFilter::CHILDREN)
        .unwrap();
    assert!(!diffs.contains_key(&a), "property kinds filtered out");
    let children = diffs[&kids[1]].children.as_ref().unwrap();
    assert_eq!(children.original.map(|p: Position| p.parent), Some(root));
    assert!(children.mutated.is_none());

    // Everything.
    let diffs = t.node_diff(DiffFilter::ALL).unwrap();
    let delta = &diffs[&a].attributes["class"];
    assert_eq!(delta.original, Some(Some("x".to_string())));
    assert_eq!(delta.mutated, Some(Some("y".to_string())));
}

#[test]
fn degenerate_filters_are_rejected() {
    let (t, _root, _kids) = TrackedTree::seeded(&["a"]);
    assert!(matches!(
        t.node_diff(DiffFilter::ORIGINAL),
        Err(DeltaError::InvalidFilter { .. })
    ));
    assert!(matches!(
        t.node_diff(DiffFilter::CHILDREN),
        Err(DeltaError::InvalidFilter { .. })
    ));
}

#[test]
fn custom_properties_round_through_diff_and_revert() {
    let (mut t, _root, kids) = TrackedTree::seeded(&["a"]);
    let a = kids[0];
    t.set_custom(a, "scroll", Value::Int(80), Value::Int(0));
    assert!(t.mutated(None));

    // Mutated side comes from the getter.
    let getter = |_node: NodeId, _key: &str| Value::Int(80);
    let diffs = t.diff.diff(&t.tree, DiffFilter::ALL, Some(&getter)).unwrap();
    let delta = &diffs[&a].custom["scroll"];
    assert_eq!(delta.original, Some(Value::Int(0)));
    assert_eq!(delta.mutated, Some(Value::Int(80)));

    // Revert hands the original to the callback.
    let mut restored = Vec::new();
    let mut on_revert = |node: NodeId, key: &str, original: &Value| {
        restored.push((node, key.to_string(), original.clone()));
    };
    t.diff.revert(&mut t.tree, Some(&mut on_revert)).unwrap();
    assert_eq!(restored, vec![(a, "scroll".to_string(), Value::Int(0))]);
}

#[test]
fn range_collapses_to_the_gap_of_a_plain_removal() {
    // Removing the last child leaves only a one-sided gap anchor.
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c"]);
    let (b, c) = (kids[1], kids[2]);
    t.remove(c);

    let range = t.range(Some(root)).unwrap().expect("a gap remains");
    assert_eq!(range.start().node, b);
    assert_eq!(range.end().node, b);
    assert!(!range.covers(kids[0], &t.tree).unwrap());
}

#[test]
fn range_spanning_disjoint_trees_requires_a_root() {
    let mut t = TrackedTree::new();
    let left = t.element("left");
    let right = t.element("right");
    let (x, y) = (t.element("x"), t.element("y"));
    t.tree.append(left, &[x]).unwrap();
    t.tree.append(right, &[y]).unwrap();
    t.set_attr(x, "class", "moved");
    t.set_attr(y, "class", "moved");

    assert_eq!(t.range(None), Err(DeltaError::DisconnectedRange));
    let scoped = t.range(Some(left)).unwrap().expect("left has a difference");
    assert!(scoped.covers(x, &t.tree).unwrap());
}

#[test]
fn storage_size_counts_props_and_floating() {
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b"]);
    assert_eq!(t.diff.storage_size(), 0);
    assert!(t.diff.is_empty());

    t.set_attr(kids[0], "class", "x");
    t.remove(kids[1]);
    assert_eq!(t.diff.storage_size(), 2);

    // Clear is idempotent.
    t.diff.clear();
    assert_eq!(t.diff.storage_size(), 0);
    t.diff.clear();
    assert_eq!(t.diff.storage_size(), 0);
    assert!(!t.mutated(Some(root)));
}

#[test]
fn synchronize_preserves_diff_and_revert_semantics() {
    // With a quiescent, fully tracked tree, synchronize must not change
    // what diff and revert would do.
    let (mut t, root, kids) = TrackedTree::seeded(&["a", "b", "c"]);
    let (a, b, c) = (kids[0], kids[1], kids[2]);
    t.append(root, a);
    t.prepend(root, c);

    let before = t.node_diff(DiffFilter::ALL).unwrap();
    t.synchronize();
    let after = t.node_diff(DiffFilter::ALL).unwrap();
    assert_eq!(before.len(), after.len());
    for (node, diff) in &before {
        assert_eq!(
            diff.children.as_ref().map(|d| (d.original, d.mutated)),
            after[node].children.as_ref().map(|d| (d.original, d.mutated)),
            "placement delta changed for {node}"
        );
    }

    t.revert().unwrap();
    assert_eq!(t.children(root), vec![a, b, c]);
}

#[test]
fn synchronize_drops_clean_property_entries() {
    let (mut t, _root, kids) = TrackedTree::seeded(&["a"]);
    let a = kids[0];
    t.tree.set_attribute(a, "class", None, "x").unwrap();
    t.set_attr(a, "class", "y");
    t.set_attr(a, "class", "x"); // clean again, entry retained
    assert_eq!(t.diff.storage_size(), 1);

    t.synchronize();
    assert_eq!(t.diff.storage_size(), 0);
}

#[test]
fn mutated_scopes_to_the_given_root() {
    let mut t = TrackedTree::new();
    let top = t.element("top");
    let section = t.element("section");
    let aside = t.element("aside");
    let item = t.element("item");
    t.tree.append(top, &[section, aside]).unwrap();
    t.tree.append(section, &[item]).unwrap();

    t.remove(item);
    assert!(t.mutated(Some(top)));
    assert!(t.mutated(Some(section)));
    assert!(!t.mutated(Some(aside)));
    assert!(t.mutated(None));
}
