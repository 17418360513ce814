#![cfg(feature = "persistent")]
//! Unit tests for the persistent treap.
//!
//! Covers construction, lookups, every write flavour and the structural
//! sharing between versions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use safe_treap::persistent::{
    Link, MissingComparator, NodeRef, PersistentTreap, ReferenceCounter, TreapError, TreapHandle,
    comparator,
};
use std::cmp::Ordering;

type Root = Link<i32, String, u32>;

// =============================================================================
// Helpers
// =============================================================================

fn natural() -> TreapHandle<i32, u32> {
    TreapHandle::natural()
}

fn in_order_keys<V, W>(node: Option<&NodeRef<i32, V, W>>) -> Vec<i32> {
    let mut keys = Vec::new();
    let mut stack = Vec::new();
    let mut current = node;
    while current.is_some() || !stack.is_empty() {
        while let Some(node) = current {
            stack.push(node);
            current = node.left();
        }
        if let Some(node) = stack.pop() {
            keys.push(*node.key());
            current = node.right();
        }
    }
    keys
}

/// Checks the heap property under `compare_weights`.
fn is_heap<V, W>(
    node: Option<&NodeRef<i32, V, W>>,
    compare_weights: &dyn Fn(&W, &W) -> Ordering,
) -> bool {
    node.is_none_or(|node| {
        [node.left(), node.right()].into_iter().flatten().all(|child| {
            compare_weights(child.weight(), node.weight()) != Ordering::Less
                && is_heap(Some(child), compare_weights)
        })
    })
}

fn depth<V, W>(node: Option<&NodeRef<i32, V, W>>) -> usize {
    node.map_or(0, |node| 1 + depth(node.left()).max(depth(node.right())))
}

fn assert_treap(root: &Root) {
    let keys = in_order_keys(root.as_ref());
    assert!(
        keys.windows(2).all(|pair| pair[0] < pair[1]),
        "keys out of order: {keys:?}"
    );
    assert!(is_heap(root.as_ref(), &u32::cmp), "heap order violated");
}

fn build(handle: &TreapHandle<i32, u32>, entries: &[(i32, u32)]) -> Root {
    entries.iter().fold(None, |root, &(key, weight)| {
        handle
            .insert(root.as_ref(), key, format!("v{key}"), weight)
            .0
    })
}

// =============================================================================
// Construction Tests
// =============================================================================

#[rstest]
fn test_builder_with_both_comparators_succeeds() {
    let handle = TreapHandle::<i32, u32>::builder()
        .compare_keys(|left: &i32, right: &i32| left.cmp(right))
        .compare_weights(|left: &u32, right: &u32| left.cmp(right))
        .build();
    assert!(handle.is_ok());
}

#[rstest]
#[case::keys_missing(false, true, MissingComparator::Keys)]
#[case::weights_missing(true, false, MissingComparator::Weights)]
#[case::both_missing(false, false, MissingComparator::Both)]
fn test_try_new_rejects_missing_comparator(
    #[case] with_keys: bool,
    #[case] with_weights: bool,
    #[case] missing: MissingComparator,
) {
    let compare_keys = with_keys.then(|| comparator(|left: &i32, right: &i32| left.cmp(right)));
    let compare_weights =
        with_weights.then(|| comparator(|left: &u32, right: &u32| left.cmp(right)));

    let result = TreapHandle::try_new(compare_keys, compare_weights);

    assert_eq!(
        result.unwrap_err(),
        TreapError::InvalidConfiguration { missing }
    );
}

#[rstest]
fn test_default_builder_fails() {
    let result = TreapHandle::<i32, u32>::builder().build();
    assert!(matches!(
        result,
        Err(TreapError::InvalidConfiguration {
            missing: MissingComparator::Both
        })
    ));
}

#[rstest]
fn test_handle_is_reusable_across_trees() {
    let handle = natural();
    let first = build(&handle, &[(1, 1), (2, 2)]);
    let second = build(&handle, &[(10, 5), (20, 3)]);

    assert_eq!(handle.get(first.as_ref(), &2), Some(&"v2".to_string()));
    assert_eq!(handle.get(second.as_ref(), &20), Some(&"v20".to_string()));
    assert_eq!(handle.get(first.as_ref(), &20), None);
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[rstest]
fn test_get_on_empty_tree() {
    let handle = natural();
    assert_eq!(handle.get::<String>(None, &1), None);
    assert!(handle.get_node::<String>(None, &1).is_none());
    assert!(!handle.contains_key::<String>(None, &1));
}

#[rstest]
fn test_get_node_returns_full_node() {
    let handle = natural();
    let root = build(&handle, &[(3, 30), (1, 10), (2, 20)]);

    let node = handle.get_node(root.as_ref(), &2).unwrap();
    assert_eq!(*node.key(), 2);
    assert_eq!(node.item(), "v2");
    assert_eq!(*node.weight(), 20);
}

#[rstest]
fn test_min_max_on_empty_tree() {
    let root: Root = None;
    assert_eq!(TreapHandle::min(root.as_ref()), None);
    assert_eq!(TreapHandle::max(root.as_ref()), None);
}

#[rstest]
#[case::ascending(&[1, 2, 3, 4])]
#[case::descending(&[4, 3, 2, 1])]
#[case::mixed(&[3, 1, 4, 2])]
fn test_min_max_independent_of_weights(#[case] weights: &[u32]) {
    let handle = natural();
    let keys = [5, 3, 8, 1];
    let entries: Vec<(i32, u32)> = keys.into_iter().zip(weights.iter().copied()).collect();
    let root = build(&handle, &entries);

    assert_eq!(TreapHandle::min(root.as_ref()), Some(&"v1".to_string()));
    assert_eq!(TreapHandle::max(root.as_ref()), Some(&"v8".to_string()));
}

#[rstest]
fn test_custom_key_ordering() {
    let handle = TreapHandle::new(
        |left: &i32, right: &i32| right.cmp(left),
        |left: &u32, right: &u32| left.cmp(right),
    );
    let root = build(&handle, &[(1, 5), (2, 4), (3, 3)]);

    // Reversed key order swaps min and max
    assert_eq!(TreapHandle::min(root.as_ref()), Some(&"v3".to_string()));
    assert_eq!(TreapHandle::max(root.as_ref()), Some(&"v1".to_string()));
}

// =============================================================================
// Insert Tests
// =============================================================================

#[rstest]
fn test_insert_two_keys_rotates_higher_weight_to_root() {
    let handle = TreapHandle::<&str, u32>::max_weight_first();

    let (single, created) = handle.insert(None, "b", 1, 10);
    assert!(created);
    let single_root = single.as_ref().unwrap();
    assert_eq!(*single_root.key(), "b");
    assert!(single_root.left().is_none() && single_root.right().is_none());

    let (pair, created) = handle.insert(single.as_ref(), "a", 2, 20);
    assert!(created);
    let pair_root = pair.as_ref().unwrap();
    assert_eq!(*pair_root.key(), "a");
    assert!(pair_root.left().is_none());
    assert_eq!(pair_root.right().map(|node| *node.key()), Some("b"));
}

#[rstest]
fn test_insert_two_keys_without_rotation() {
    let handle = TreapHandle::<&str, u32>::natural();
    let (root, _) = handle.insert(None, "b", 1, 10);
    let (root, _) = handle.insert(root.as_ref(), "a", 2, 20);

    let root = root.unwrap();
    assert_eq!(*root.key(), "b");
    assert_eq!(root.left().map(|node| *node.key()), Some("a"));
}

#[rstest]
fn test_insert_existing_key_is_noop() {
    let handle = natural();
    let root = build(&handle, &[(2, 2), (1, 1), (3, 3)]);

    let (again, created) = handle.insert(root.as_ref(), 2, "other".to_string(), 0);

    assert!(!created);
    assert!(ReferenceCounter::ptr_eq(
        root.as_ref().unwrap(),
        again.as_ref().unwrap()
    ));
    assert_eq!(handle.get(again.as_ref(), &2), Some(&"v2".to_string()));
}

#[rstest]
fn test_insert_preserves_original_version() {
    let handle = natural();
    let original = build(&handle, &[(5, 50), (2, 20), (8, 80)]);

    let (updated, created) = handle.insert(original.as_ref(), 6, "v6".to_string(), 1);

    assert!(created);
    assert_eq!(handle.get(original.as_ref(), &6), None);
    assert_eq!(in_order_keys(original.as_ref()), vec![2, 5, 8]);
    assert_eq!(in_order_keys(updated.as_ref()), vec![2, 5, 6, 8]);
    assert_treap(&updated);
}

#[rstest]
fn test_insert_shares_subtree_off_search_path() {
    let handle = natural();
    //        50(1)
    //       /     \
    //    25(2)    75(3)
    let root = build(&handle, &[(50, 1), (25, 2), (75, 3), (10, 4), (30, 5)]);
    let left_before = root.as_ref().unwrap().left().unwrap().clone();

    let (updated, _) = handle.insert(root.as_ref(), 80, "v80".to_string(), 9);

    let left_after = updated.as_ref().unwrap().left().unwrap();
    assert!(ReferenceCounter::ptr_eq(&left_before, left_after));
}

// =============================================================================
// Upsert Tests
// =============================================================================

#[rstest]
fn test_upsert_new_key_creates() {
    let handle = natural();
    let (root, created) = handle.upsert(None, 1, "one".to_string(), 1);
    assert!(created);
    assert_eq!(handle.get(root.as_ref(), &1), Some(&"one".to_string()));
}

#[rstest]
fn test_upsert_existing_key_replaces_item_and_weight() {
    let handle = natural();
    let root = build(&handle, &[(1, 10), (2, 20), (3, 30)]);

    let (updated, created) = handle.upsert(root.as_ref(), 3, "three".to_string(), 5);

    assert!(!created);
    let node = handle.get_node(updated.as_ref(), &3).unwrap();
    assert_eq!(node.item(), "three");
    assert_eq!(*node.weight(), 5);
    assert_eq!(*updated.as_ref().unwrap().key(), 3);
    assert_eq!(handle.get(root.as_ref(), &3), Some(&"v3".to_string()));
    assert_treap(&updated);
}

// =============================================================================
// UpdateIf Tests
// =============================================================================

#[rstest]
#[case::accepted(true, 1)]
#[case::rejected(false, 4)]
fn test_update_if_honours_predicate(#[case] accept: bool, #[case] expected_weight: u32) {
    let handle = natural();
    let root = build(&handle, &[(4, 4), (2, 2), (6, 6)]);

    let (updated, changed) =
        handle.update_if(root.as_ref(), 4, "new".to_string(), 1, |_| accept);

    assert_eq!(changed, accept);
    let node = handle.get_node(updated.as_ref(), &4).unwrap();
    assert_eq!(node.item(), "v4");
    assert_eq!(*node.weight(), expected_weight);
    assert_treap(&updated);
}

#[rstest]
fn test_update_if_sees_current_node() {
    let handle = natural();
    let root = build(&handle, &[(1, 7)]);

    let (_, changed) = handle.update_if(root.as_ref(), 1, "x".to_string(), 7, |node| {
        *node.key() == 1 && node.item() == "v1" && *node.weight() == 7
    });

    assert!(changed);
}

#[rstest]
fn test_update_if_absent_key_never_calls_predicate() {
    let handle = natural();
    let root = build(&handle, &[(1, 1)]);
    let calls = std::cell::Cell::new(0);

    let (updated, changed) = handle.update_if(root.as_ref(), 2, "two".to_string(), 0, |_| {
        calls.set(calls.get() + 1);
        true
    });

    assert!(!changed);
    assert_eq!(calls.get(), 0);
    assert_eq!(handle.get(updated.as_ref(), &2), None);
}

// =============================================================================
// SetWeight Tests
// =============================================================================

#[rstest]
fn test_set_weight_sinks_internal_node_to_leaf() {
    let handle = natural();
    //          8(1)
    //        /      \
    //     4(2)      12(3)
    //    /   \      /   \
    //  2(4) 6(5) 10(6) 14(7)
    let root = build(
        &handle,
        &[(8, 1), (4, 2), (12, 3), (2, 4), (6, 5), (10, 6), (14, 7)],
    );

    let (sunk, changed) = handle.set_weight(root.as_ref(), 4, 100);

    assert!(changed);
    assert_treap(&sunk);
    assert_eq!(in_order_keys(sunk.as_ref()), in_order_keys(root.as_ref()));
    let node = handle.get_node(sunk.as_ref(), &4).unwrap();
    assert!(node.left().is_none() && node.right().is_none());
    assert_eq!(node.item(), "v4");
}

#[rstest]
fn test_set_weight_lifts_leaf_to_root() {
    let handle = natural();
    let root = build(&handle, &[(8, 1), (4, 2), (12, 3), (2, 4)]);

    let (lifted, changed) = handle.set_weight(root.as_ref(), 2, 0);

    assert!(changed);
    assert_treap(&lifted);
    assert_eq!(*lifted.as_ref().unwrap().key(), 2);
    // The previous version still has the old shape
    assert_eq!(*root.as_ref().unwrap().key(), 8);
}

#[rstest]
fn test_set_weight_on_root_keeps_children_when_still_ordered() {
    let handle = natural();
    let root = build(&handle, &[(2, 5), (1, 10), (3, 10)]);
    let before = root.as_ref().unwrap();

    let (updated, _) = handle.set_weight(root.as_ref(), 2, 6);
    let after = updated.as_ref().unwrap();

    assert!(ReferenceCounter::ptr_eq(
        before.left().unwrap(),
        after.left().unwrap()
    ));
    assert!(ReferenceCounter::ptr_eq(
        before.right().unwrap(),
        after.right().unwrap()
    ));
}

// =============================================================================
// Balance Tests
// =============================================================================

#[rstest]
fn test_random_weights_keep_depth_logarithmic() {
    let handle = natural();
    let mut rng = StdRng::seed_from_u64(42);
    let mut root: Root = None;
    for key in 0..2_000 {
        root = handle
            .insert(root.as_ref(), key, key.to_string(), rng.r#gen())
            .0;
    }

    assert_treap(&root);
    assert_eq!(in_order_keys(root.as_ref()).len(), 2_000);
    // Expected depth is about 2.99 * ln(n), roughly 23 for n = 2000
    assert!(depth(root.as_ref()) < 60);
}

#[rstest]
fn test_monotonic_weights_degrade_to_list() {
    let handle = natural();
    let entries: Vec<(i32, u32)> = (0..50_i32).map(|key| (key, key.unsigned_abs())).collect();
    let root = build(&handle, &entries);

    assert_treap(&root);
    assert_eq!(depth(root.as_ref()), 50);
}

// =============================================================================
// PersistentTreap Tests
// =============================================================================

#[rstest]
fn test_persistent_treap_tracks_length() {
    let treap = PersistentTreap::new(natural());
    let (treap, _) = treap.insert(1, "one".to_string(), 3);
    let (treap, _) = treap.insert(2, "two".to_string(), 1);
    let (same, created) = treap.insert(2, "dup".to_string(), 1);
    let (upserted, created_by_upsert) = same.upsert(3, "three".to_string(), 2);
    let (reweighted, _) = upserted.set_weight(1, 0);

    assert!(!created);
    assert!(created_by_upsert);
    assert_eq!(treap.len(), 2);
    assert_eq!(same.len(), 2);
    assert_eq!(upserted.len(), 3);
    assert_eq!(reweighted.len(), 3);
    assert_eq!(*reweighted.root().unwrap().key(), 1);
}

#[rstest]
fn test_persistent_treap_versions_are_independent() {
    let base = PersistentTreap::new(natural());
    let (base, _) = base.insert(10, "ten".to_string(), 5);
    let (left, _) = base.insert(5, "five".to_string(), 6);
    let (right, _) = base.insert(15, "fifteen".to_string(), 7);

    assert!(left.contains_key(&5) && !left.contains_key(&15));
    assert!(right.contains_key(&15) && !right.contains_key(&5));
    assert_eq!(base.len(), 1);
    assert_eq!(left.min(), Some(&"five".to_string()));
    assert_eq!(right.max(), Some(&"fifteen".to_string()));
}

#[rstest]
fn test_persistent_treap_update_if() {
    let (treap, _) = PersistentTreap::default().insert("k", 1, 5_u8);
    let (bumped, changed) = treap.update_if("k", 2, 3, |node| *node.weight() == 5);
    let (stale, stale_changed) = bumped.update_if("k", 3, 1, |node| *node.weight() == 5);

    assert!(changed);
    assert!(!stale_changed);
    assert_eq!(bumped.get(&"k"), Some(&1));
    assert_eq!(bumped.get_node(&"k").map(|node| *node.weight()), Some(3));
    assert_eq!(stale.get_node(&"k").map(|node| *node.weight()), Some(3));
    assert_eq!(treap.get_node(&"k").map(|node| *node.weight()), Some(5));
}

#[rstest]
fn test_persistent_treap_clone_shares_root() {
    let (treap, _) = PersistentTreap::new(natural()).insert(1, "one".to_string(), 1);
    let cloned = treap.clone();

    assert!(ReferenceCounter::ptr_eq(
        treap.root().unwrap(),
        cloned.root().unwrap()
    ));
    assert_eq!(cloned.get_node(&1).map(|node| *node.weight()), Some(1));
}

#[rstest]
fn test_persistent_treap_debug() {
    let treap: PersistentTreap<i32, String, u32> = PersistentTreap::new(natural());
    assert_eq!(
        format!("{treap:?}"),
        "PersistentTreap { length: 0, root: None, .. }"
    );
}
