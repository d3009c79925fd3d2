// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Patch and diff algebra.

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use cadence_state::{ItemId, ItemsMap, PropsMap};
use hashbrown::{HashMap, HashSet};

use crate::types::{Diff, Patch, contains_id};

/// What happens to one item across two patches.
#[derive(Default)]
struct Merged {
    removed: bool,
    added: bool,
    changes: PropsMap,
}

/// Returns a patch with the same effect as applying `first` then `second`.
///
/// Per item:
/// - an item added by `first` and removed by `second` disappears from both
///   lists, along with its writes;
/// - an item removed by `first` and added by `second` stays in both lists,
///   which resets it to its defaults before `second`'s writes;
/// - otherwise writes are merged with `second`'s values winning, and writes
///   to an item that ends up removed are dropped.
///
/// Ids keep the order in which they first appear, `first` before `second`.
#[must_use]
pub fn combine_two_patches(first: &Patch, second: &Patch) -> Patch {
    let mut out = Patch::new();
    for name in type_names(&[first, second]) {
        let mut merged: HashMap<&str, Merged> = HashMap::new();
        for id in ids_of(first, name) {
            merged.insert(
                id.as_str(),
                Merged {
                    removed: first.removes(name, id),
                    added: first.adds(name, id),
                    changes: first.changes_of(name, id).cloned().unwrap_or_default(),
                },
            );
        }
        let mut seen = HashSet::new();
        for id in ids_of(second, name) {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let entry = merged.entry(id.as_str()).or_default();
            let removes = second.removes(name, id);
            let adds = second.adds(name, id);
            let changes = second.changes_of(name, id);
            if removes {
                // Removing something `first` created leaves no trace.
                entry.removed = !(entry.added && !entry.removed);
                entry.added = adds;
                entry.changes = if adds {
                    changes.cloned().unwrap_or_default()
                } else {
                    PropsMap::new()
                };
            } else if adds && entry.removed && !entry.added {
                entry.added = true;
                entry.changes = changes.cloned().unwrap_or_default();
            } else {
                entry.added |= adds;
                if let Some(changes) = changes {
                    entry.changes.extend(changes.clone());
                }
            }
            if entry.removed && !entry.added {
                entry.changes.clear();
            }
        }

        let removed = ordered(
            [first.removed.get(name), second.removed.get(name)],
            |id| merged.get(id).is_some_and(|m| m.removed),
        );
        let added = ordered(
            [first.added.get(name), second.added.get(name)],
            |id| merged.get(id).is_some_and(|m| m.added),
        );
        if !removed.is_empty() {
            out.removed.insert(name.to_string(), removed);
        }
        if !added.is_empty() {
            out.added.insert(name.to_string(), added);
        }
        let mut changed = ItemsMap::new();
        for id in ids_of(first, name).chain(ids_of(second, name)) {
            if let Some(m) = merged.remove(id.as_str())
                && !m.changes.is_empty()
            {
                changed.insert(id.clone(), m.changes);
            }
        }
        if !changed.is_empty() {
            out.changed.insert(name.to_string(), changed);
        }
    }
    out
}

/// Folds [`combine_two_patches`] over `patches`, oldest first.
#[must_use]
pub fn combine_patches<'a>(patches: impl IntoIterator<Item = &'a Patch>) -> Patch {
    patches
        .into_iter()
        .fold(Patch::new(), |acc, next| combine_two_patches(&acc, next))
}

/// Returns `patch` without the parts that also appear in `to_remove`.
///
/// Ids listed in `to_remove` are dropped from the matching lists, and
/// writes with an identical value are dropped. An item whose addition was
/// dropped loses its writes too, as does an item left with none.
#[must_use]
pub fn remove_partial_patch(patch: &Patch, to_remove: &Patch) -> Patch {
    let mut out = patch.clone();
    for (name, ids) in &mut out.removed {
        ids.retain(|id| !contains_id(&to_remove.removed, name, id));
    }
    out.removed.retain(|_, ids| !ids.is_empty());

    let mut no_longer_added: HashSet<(String, ItemId)> = HashSet::new();
    for (name, ids) in &mut out.added {
        ids.retain(|id| {
            let keep = !contains_id(&to_remove.added, name, id);
            if !keep {
                no_longer_added.insert((name.clone(), id.clone()));
            }
            keep
        });
    }
    out.added.retain(|_, ids| !ids.is_empty());

    for (name, items) in &mut out.changed {
        let Some(removing) = to_remove.changed.get(name) else {
            continue;
        };
        for (id, props) in items.iter_mut() {
            if let Some(remove_props) = removing.get(id) {
                props.retain(|prop, value| remove_props.get(prop) != Some(&*value));
            }
        }
        items.retain(|id, props| {
            !props.is_empty() && !no_longer_added.contains(&(name.clone(), id.clone()))
        });
    }
    out.changed.retain(|_, items| !items.is_empty());
    out
}

/// Builds a diff from a forward patch and its inverse.
///
/// The id lists come from `forward`; `reverse` only contributes its writes.
#[must_use]
pub fn get_diff_from_patches(forward: &Patch, reverse: &Patch) -> Diff {
    Diff {
        changed_next: forward.changed.clone(),
        changed_prev: reverse.changed.clone(),
        added: forward.added.clone(),
        removed: forward.removed.clone(),
    }
}

/// Splits a diff into its forward patch and the patch that undoes it.
#[must_use]
pub fn get_patches_from_diff(diff: &Diff) -> (Patch, Patch) {
    let forward = Patch {
        changed: diff.changed_next.clone(),
        added: diff.added.clone(),
        removed: diff.removed.clone(),
    };
    let reverse = Patch {
        changed: diff.changed_prev.clone(),
        added: diff.removed.clone(),
        removed: diff.added.clone(),
    };
    (forward, reverse)
}

/// Returns a diff with the same effect as `first` then `second`.
///
/// The inverse half is combined in the opposite order, since undoing runs
/// `second`'s inverse before `first`'s.
#[must_use]
pub fn combine_two_diffs(first: &Diff, second: &Diff) -> Diff {
    let (forward_a, reverse_a) = get_patches_from_diff(first);
    let (forward_b, reverse_b) = get_patches_from_diff(second);
    get_diff_from_patches(
        &combine_two_patches(&forward_a, &forward_b),
        &combine_two_patches(&reverse_b, &reverse_a),
    )
}

/// Folds [`combine_two_diffs`] over `diffs`, oldest first.
#[must_use]
pub fn combine_diffs<'a>(diffs: impl IntoIterator<Item = &'a Diff>) -> Diff {
    diffs
        .into_iter()
        .fold(Diff::new(), |acc, next| combine_two_diffs(&acc, next))
}

fn type_names<'a>(patches: &[&'a Patch]) -> BTreeSet<&'a str> {
    let mut names = BTreeSet::new();
    for patch in patches {
        names.extend(patch.removed.keys().map(|k| k.as_str()));
        names.extend(patch.added.keys().map(|k| k.as_str()));
        names.extend(patch.changed.keys().map(|k| k.as_str()));
    }
    names
}

/// Every id a patch mentions for one type, possibly with repeats.
fn ids_of<'a>(patch: &'a Patch, name: &str) -> impl Iterator<Item = &'a ItemId> {
    let removed = patch.removed.get(name).into_iter().flatten();
    let added = patch.added.get(name).into_iter().flatten();
    let changed = patch.changed.get(name).into_iter().flat_map(|items| items.keys());
    removed.chain(added).chain(changed)
}

/// Concatenates id lists without repeats, keeping ids that pass `keep`.
fn ordered<const N: usize>(
    lists: [Option<&Vec<ItemId>>; N],
    keep: impl Fn(&str) -> bool,
) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in lists.into_iter().flatten().flatten() {
        if seen.insert(id.as_str()) && keep(id.as_str()) {
            out.push(id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec;
    use cadence_state::Value;

    fn patch(added: &[&str], removed: &[&str], writes: &[(&str, &str, i64)]) -> Patch {
        let mut p = Patch::new();
        if !added.is_empty() {
            p.added
                .insert("t".into(), added.iter().map(|&id| ItemId::from(id)).collect());
        }
        if !removed.is_empty() {
            p.removed
                .insert("t".into(), removed.iter().map(|&id| ItemId::from(id)).collect());
        }
        for &(id, prop, value) in writes {
            p.set("t", &id.into(), prop, Value::from(value));
        }
        p
    }

    #[test]
    fn added_then_removed_cancels_out() {
        let first = patch(&["a"], &[], &[("a", "x", 1)]);
        let second = patch(&[], &["a"], &[]);
        assert!(combine_two_patches(&first, &second).is_empty());
    }

    #[test]
    fn removed_then_added_is_a_reset() {
        let first = patch(&[], &["a"], &[]);
        let second = patch(&["a"], &[], &[("a", "x", 2)]);
        let combined = combine_two_patches(&first, &second);
        assert!(combined.removes("t", "a"));
        assert!(combined.adds("t", "a"));
        assert_eq!(combined.changed["t"]["a"]["x"], Value::from(2));
    }

    #[test]
    fn later_writes_win_and_ids_keep_first_appearance_order() {
        let first = patch(&["b", "a"], &[], &[("a", "x", 1), ("a", "y", 1)]);
        let second = patch(&["c", "a"], &[], &[("a", "x", 2)]);
        let combined = combine_two_patches(&first, &second);
        assert_eq!(
            combined.added["t"],
            vec![ItemId::from("b"), ItemId::from("a"), ItemId::from("c")]
        );
        assert_eq!(combined.changed["t"]["a"]["x"], Value::from(2));
        assert_eq!(combined.changed["t"]["a"]["y"], Value::from(1));
    }

    #[test]
    fn writes_to_removed_items_are_dropped() {
        let first = patch(&[], &[], &[("a", "x", 1)]);
        let second = patch(&[], &["a"], &[]);
        let combined = combine_two_patches(&first, &second);
        assert!(combined.removes("t", "a"));
        assert!(combined.changed.is_empty());
    }

    #[test]
    fn partial_removal_strips_matching_parts() {
        let full = patch(&["a", "b"], &["c"], &[("a", "x", 1), ("d", "x", 1), ("d", "y", 2)]);
        let part = patch(&["a"], &["c"], &[("d", "x", 1), ("d", "y", 3)]);
        let rest = remove_partial_patch(&full, &part);
        assert_eq!(rest.added["t"], vec![ItemId::from("b")]);
        assert!(rest.removed.is_empty());
        assert!(rest.changes_of("t", "a").is_none());
        assert_eq!(rest.changes_of("t", "d").map(PropsMap::len), Some(1));
    }

    #[test]
    fn diffs_split_and_rejoin() {
        let mut diff = Diff::new();
        diff.added.insert("t".into(), vec!["a".into()]);
        diff.removed.insert("t".into(), vec!["b".into()]);
        diff.changed_next = patch(&[], &[], &[("a", "x", 1)]).changed;
        diff.changed_prev = patch(&[], &[], &[("b", "x", 4)]).changed;
        let (forward, reverse) = get_patches_from_diff(&diff);
        assert!(reverse.adds("t", "b"));
        assert!(reverse.removes("t", "a"));
        assert_eq!(get_diff_from_patches(&forward, &reverse), diff);
    }

    #[test]
    fn combined_diffs_undo_in_reverse_order() {
        let mut first = Diff::new();
        first.changed_next = patch(&[], &[], &[("a", "x", 1)]).changed;
        first.changed_prev = patch(&[], &[], &[("a", "x", 0)]).changed;
        let mut second = Diff::new();
        second.changed_next = patch(&[], &[], &[("a", "x", 2)]).changed;
        second.changed_prev = patch(&[], &[], &[("a", "x", 1)]).changed;

        let combined = combine_diffs([&first, &second]);
        assert_eq!(combined.changed_next["t"]["a"]["x"], Value::from(2));
        assert_eq!(combined.changed_prev["t"]["a"]["x"], Value::from(0));
    }
}
