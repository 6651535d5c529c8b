//! Assertions over pipeline outputs and combiner behavior.

use crate::combine_fn::CombineFn;
use crate::window::{BoundedWindow, WindowedValue};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Assert that two collections are equal in order and content.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            a, e,
            "Collection mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}\n  Full actual: {actual:?}"
        );
    }
}

/// Assert that two collections hold the same elements, ignoring order.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );

    let actual_set: HashSet<_> = actual.iter().collect();
    let expected_set: HashSet<_> = expected.iter().collect();
    if actual_set != expected_set {
        let missing: Vec<_> = expected_set.difference(&actual_set).collect();
        let extra: Vec<_> = actual_set.difference(&expected_set).collect();
        panic!(
            "Collection content mismatch:\n  Missing elements: {missing:?}\n  Extra elements: {extra:?}"
        );
    }
}

/// Assert that two key/value collections are equal after sorting by key.
///
/// ```
/// use ironbeam_combine::testing::assert_kv_collections_equal;
///
/// assert_kv_collections_equal(vec![("b", 2), ("a", 1)], vec![("a", 1), ("b", 2)]);
/// ```
///
/// # Panics
///
/// Panics if the collections differ after sorting.
pub fn assert_kv_collections_equal<K, V>(mut actual: Vec<(K, V)>, mut expected: Vec<(K, V)>)
where
    K: Debug + Ord,
    V: Debug + PartialEq,
{
    actual.sort_by(|a, b| a.0.cmp(&b.0));
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_collections_equal(&actual, &expected);
}

/// Assert that every element satisfies `predicate`.
///
/// # Panics
///
/// Panics at the first element that does not satisfy the predicate.
pub fn assert_all<T: Debug>(collection: &[T], predicate: impl Fn(&T) -> bool) {
    for (i, item) in collection.iter().enumerate() {
        assert!(
            predicate(item),
            "Predicate failed for element at index {i}:\n  Element: {item:?}\n  Collection: {collection:?}"
        );
    }
}

/// Assert the values produced for each window, ignoring order within and
/// across windows.
///
/// # Panics
///
/// Panics if any window holds different values than expected, or if
/// windows are missing or unexpected.
pub fn assert_values_per_window<T>(
    actual: &[WindowedValue<T>],
    expected: Vec<(BoundedWindow, Vec<T>)>,
) where
    T: Debug + Ord + Clone,
{
    let mut got: BTreeMap<BoundedWindow, Vec<T>> = BTreeMap::new();
    for wv in actual {
        got.entry(wv.window).or_default().push(wv.value.clone());
    }
    let mut want: BTreeMap<BoundedWindow, Vec<T>> = BTreeMap::new();
    for (w, vs) in expected {
        want.entry(w).or_default().extend(vs);
    }
    for vs in got.values_mut().chain(want.values_mut()) {
        vs.sort();
    }
    assert_eq!(got, want, "Values per window differ");
}

/// Assert that `comb` gives the same output no matter how `inputs` are
/// split across accumulators, merged, or compacted.
///
/// Checks single-pass folding against: every split point into two merged
/// accumulators, one accumulator per input, compaction after every step,
/// and merging with empty accumulators mixed in.
///
/// # Panics
///
/// Panics with the failing arrangement when any output differs.
pub fn assert_combine_fn_consistent<C, I, A, O>(comb: &C, inputs: &[I])
where
    C: CombineFn<I, A, O>,
    I: Clone,
    O: Debug + PartialEq,
{
    let fold = |slice: &[I]| {
        slice
            .iter()
            .cloned()
            .fold(comb.create_accumulator(), |acc, i| comb.add_input(acc, i))
    };
    let expected = comb.extract_output(fold(inputs));

    for split in 0..=inputs.len() {
        let (left, right) = inputs.split_at(split);
        let merged = comb.merge_accumulators(vec![fold(left), fold(right)]);
        let got = comb.extract_output(merged);
        assert_eq!(got, expected, "merge of a split at {split} differs from a single pass");
    }

    let singles: Vec<A> = inputs.iter().map(|i| fold(std::slice::from_ref(i))).collect();
    let got = comb.extract_output(comb.merge_accumulators(singles));
    assert_eq!(got, expected, "merge of one accumulator per input differs");

    let compacted = inputs.iter().cloned().fold(comb.create_accumulator(), |acc, i| {
        comb.compact(comb.add_input(comb.compact(acc), i))
    });
    let got = comb.extract_output(compacted);
    assert_eq!(got, expected, "compaction changed the output");

    let with_empties = comb.merge_accumulators(vec![
        comb.create_accumulator(),
        fold(inputs),
        comb.create_accumulator(),
    ]);
    let got = comb.extract_output(with_empties);
    assert_eq!(got, expected, "merging empty accumulators changed the output");

    let empty = comb.extract_output(comb.merge_accumulators(Vec::new()));
    assert_eq!(
        empty,
        comb.default_value(),
        "merging no accumulators differs from the default value"
    );
}
