//! List reconciliation between the displayed list and a newly computed one.
//!
//! Two modes:
//! - keyed patch ([`diff`] / [`apply`]): removes, inserts and moves keyed by
//!   package id, used after a reload or a search pass
//! - full rebind ([`DisplayList::rebind`]): selection state for every row,
//!   order and membership unchanged, used after bulk selection changes
//!
//! Bulk selection changes do not re-sort. Selected-first order is only
//! re-established by the next reload.

use splitroute_types::{CandidateApp, PatchOp, RowState};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

/// Items with a stable identity across list generations
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for CandidateApp {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Compute the ops that turn `old` into `new`.
///
/// Removals come first (descending index), then moves and inserts in
/// ascending target order, then `Change` ops for retained rows whose contents
/// differ. Rows on the longest order-preserving run are never moved, so the
/// number of moves is minimal. Keys must be unique within each list.
pub fn diff<T: Keyed + PartialEq>(old: &[T], new: &[T]) -> Vec<PatchOp> {
    let new_pos: HashMap<&str, usize> = new
        .iter()
        .enumerate()
        .map(|(i, item)| (item.key(), i))
        .collect();

    let mut ops = Vec::new();

    for (index, item) in old.iter().enumerate().rev() {
        if !new_pos.contains_key(item.key()) {
            ops.push(PatchOp::Remove {
                index,
                id: item.key().to_string(),
            });
        }
    }

    let mut current: Vec<&str> = old
        .iter()
        .map(Keyed::key)
        .filter(|key| new_pos.contains_key(key))
        .collect();

    let targets: Vec<usize> = current.iter().map(|key| new_pos[key]).collect();
    let stable: HashSet<&str> = longest_increasing_run(&targets)
        .into_iter()
        .map(|i| current[i])
        .collect();
    let retained: HashSet<&str> = current.iter().copied().collect();

    for (target, item) in new.iter().enumerate() {
        let key = item.key();
        if stable.contains(key) {
            continue;
        }

        let from = if retained.contains(key) {
            current.iter().position(|k| *k == key).map(|f| {
                current.remove(f);
                f
            })
        } else {
            None
        };

        // Place right after the row that precedes it in the new order; that
        // row is either stable or already placed.
        let to = if target == 0 {
            0
        } else {
            let before = new[target - 1].key();
            current
                .iter()
                .position(|k| *k == before)
                .map_or(current.len(), |p| p + 1)
        };
        current.insert(to, key);

        match from {
            Some(from) if from != to => ops.push(PatchOp::Move {
                from,
                to,
                id: key.to_string(),
            }),
            Some(_) => {}
            None => ops.push(PatchOp::Insert {
                index: to,
                id: key.to_string(),
            }),
        }
    }

    debug_assert!(current.iter().copied().eq(new.iter().map(Keyed::key)));

    let old_by_key: HashMap<&str, &T> = old.iter().map(|item| (item.key(), item)).collect();
    for (index, item) in new.iter().enumerate() {
        if let Some(previous) = old_by_key.get(item.key())
            && *previous != item
        {
            ops.push(PatchOp::Change {
                index,
                id: item.key().to_string(),
            });
        }
    }

    ops
}

/// Apply `ops` (from [`diff`]) to `list`. Inserted and changed rows are taken
/// from `new` by key.
pub fn apply<T: Keyed + Clone>(list: &mut Vec<T>, ops: &[PatchOp], new: &[T]) {
    let by_key: HashMap<&str, &T> = new.iter().map(|item| (item.key(), item)).collect();

    for op in ops {
        match op {
            PatchOp::Remove { index, .. } => {
                if *index < list.len() {
                    list.remove(*index);
                }
            }
            PatchOp::Insert { index, id } => {
                if let Some(item) = by_key.get(id.as_str()) {
                    let index = (*index).min(list.len());
                    list.insert(index, (*item).clone());
                }
            }
            PatchOp::Move { from, to, .. } => {
                if *from < list.len() {
                    let item = list.remove(*from);
                    let to = (*to).min(list.len());
                    list.insert(to, item);
                }
            }
            PatchOp::Change { index, id } => {
                if let (Some(slot), Some(item)) = (list.get_mut(*index), by_key.get(id.as_str())) {
                    *slot = (*item).clone();
                }
            }
        }
    }
}

/// Indices (into `seq`) of one longest strictly increasing subsequence
fn longest_increasing_run(seq: &[usize]) -> Vec<usize> {
    // tails[k] = index in seq of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        if slot > 0 {
            prev[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        run.push(i);
        cursor = prev[i];
    }
    run.reverse();
    run
}

/// The ordered list currently shown, with a shareable snapshot for readers
/// on other tasks (the search loop filters this snapshot).
pub struct DisplayList {
    apps: Vec<CandidateApp>,
    snapshots: watch::Sender<Arc<[CandidateApp]>>,
}

impl DisplayList {
    #[must_use]
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Arc::from(Vec::<CandidateApp>::new()));
        Self {
            apps: Vec::new(),
            snapshots,
        }
    }

    #[must_use]
    pub fn apps(&self) -> &[CandidateApp] {
        &self.apps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.apps.iter().map(|app| app.id.as_str())
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.apps.iter().position(|app| app.id == id)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<[CandidateApp]>> {
        self.snapshots.subscribe()
    }

    /// Keyed patch against `new`; the list becomes `new`
    pub fn patch(&mut self, new: Vec<CandidateApp>) -> Vec<PatchOp> {
        let ops = diff(&self.apps, &new);
        if !ops.is_empty() {
            self.snapshots.send_replace(Arc::from(new.clone()));
        }
        self.apps = new;
        ops
    }

    /// Full rebind: selection state for every row, in display order
    #[must_use]
    pub fn rebind(&self, selection: &BTreeSet<String>) -> Vec<RowState> {
        row_states(&self.apps, selection)
    }
}

impl Default for DisplayList {
    fn default() -> Self {
        Self::new()
    }
}

/// Selection state for each row of `apps`
#[must_use]
pub fn row_states(apps: &[CandidateApp], selection: &BTreeSet<String>) -> Vec<RowState> {
    apps.iter()
        .map(|app| RowState {
            id: app.id.clone(),
            selected: selection.contains(&app.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        key: String,
        label: String,
    }

    impl Keyed for Row {
        fn key(&self) -> &str {
            &self.key
        }
    }

    fn rows(keys: &[&str]) -> Vec<Row> {
        keys.iter()
            .map(|k| Row {
                key: (*k).to_string(),
                label: (*k).to_uppercase(),
            })
            .collect()
    }

    fn patched(old: &[Row], new: &[Row]) -> (Vec<PatchOp>, Vec<Row>) {
        let ops = diff(old, new);
        let mut list = old.to_vec();
        apply(&mut list, &ops, new);
        (ops, list)
    }

    fn count_moves(ops: &[PatchOp]) -> usize {
        ops.iter()
            .filter(|op| matches!(op, PatchOp::Move { .. }))
            .count()
    }

    #[test]
    fn test_identical_lists_produce_no_ops() {
        let list = rows(&["a", "b", "c"]);
        assert!(diff(&list, &list).is_empty());
    }

    #[test]
    fn test_empty_to_full_is_inserts() {
        let new = rows(&["a", "b"]);
        let (ops, result) = patched(&[], &new);
        assert_eq!(
            ops,
            vec![
                PatchOp::Insert {
                    index: 0,
                    id: "a".to_string()
                },
                PatchOp::Insert {
                    index: 1,
                    id: "b".to_string()
                },
            ]
        );
        assert_eq!(result, new);
    }

    #[test]
    fn test_removals_use_descending_indices() {
        let old = rows(&["a", "b", "c", "d"]);
        let new = rows(&["b", "d"]);
        let (ops, result) = patched(&old, &new);
        assert_eq!(
            ops,
            vec![
                PatchOp::Remove {
                    index: 2,
                    id: "c".to_string()
                },
                PatchOp::Remove {
                    index: 0,
                    id: "a".to_string()
                },
            ]
        );
        assert_eq!(result, new);
    }

    #[test]
    fn test_rotation_is_a_single_move() {
        let old = rows(&["a", "b", "c", "d"]);
        let new = rows(&["b", "c", "d", "a"]);
        let (ops, result) = patched(&old, &new);
        assert_eq!(
            ops,
            vec![PatchOp::Move {
                from: 0,
                to: 3,
                id: "a".to_string()
            }]
        );
        assert_eq!(result, new);
    }

    #[test]
    fn test_selected_row_bubbles_to_top() {
        let old = rows(&["a", "b", "c", "d"]);
        let new = rows(&["d", "a", "b", "c"]);
        let (ops, result) = patched(&old, &new);
        assert_eq!(count_moves(&ops), 1);
        assert_eq!(result, new);
    }

    #[test]
    fn test_reverse_moves_all_but_one() {
        let old = rows(&["a", "b", "c", "d", "e"]);
        let new = rows(&["e", "d", "c", "b", "a"]);
        let (ops, result) = patched(&old, &new);
        assert_eq!(count_moves(&ops), 4);
        assert_eq!(result, new);
    }

    #[test]
    fn test_mixed_insert_remove_move() {
        let old = rows(&["a", "b", "c", "d"]);
        let new = rows(&["c", "x", "a", "d"]);
        let (ops, result) = patched(&old, &new);
        assert_eq!(result, new);
        assert_eq!(count_moves(&ops), 1);
        assert!(ops.contains(&PatchOp::Remove {
            index: 1,
            id: "b".to_string()
        }));
    }

    #[test]
    fn test_changed_contents_emit_change() {
        let old = rows(&["a", "b"]);
        let mut new = rows(&["b", "a"]);
        new[1].label = "Renamed".to_string();
        let (ops, result) = patched(&old, &new);
        assert_eq!(
            ops.last(),
            Some(&PatchOp::Change {
                index: 1,
                id: "a".to_string()
            })
        );
        assert_eq!(result, new);
    }

    #[test]
    fn test_longest_increasing_run() {
        assert_eq!(longest_increasing_run(&[]), Vec::<usize>::new());
        assert_eq!(longest_increasing_run(&[3, 0, 1, 2]), vec![1, 2, 3]);
        assert_eq!(longest_increasing_run(&[0, 1, 2]).len(), 3);
        assert_eq!(longest_increasing_run(&[4, 3, 2, 1, 0]).len(), 1);
    }

    #[test]
    fn test_display_list_patch_and_position() {
        let mut list = DisplayList::new();
        let mut rx = list.subscribe();
        let apps = crate::tests::fixtures::apps(&[("org.a", "A"), ("org.b", "B")]);

        let ops = list.patch(apps.clone());
        assert_eq!(ops.len(), 2);
        assert_eq!(list.position("org.b"), Some(1));
        assert_eq!(list.ids().collect::<Vec<_>>(), vec!["org.a", "org.b"]);
        assert_eq!(rx.borrow_and_update().len(), 2);

        assert!(list.patch(apps).is_empty());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_display_list_rebind_keeps_order() {
        let mut list = DisplayList::new();
        list.patch(crate::tests::fixtures::apps(&[("org.a", "A"), ("org.b", "B")]));
        let selection: BTreeSet<String> = ["org.b".to_string()].into();

        let rows = list.rebind(&selection);
        assert_eq!(
            rows,
            vec![
                RowState {
                    id: "org.a".to_string(),
                    selected: false
                },
                RowState {
                    id: "org.b".to_string(),
                    selected: true
                },
            ]
        );
    }

    fn arb_keys() -> impl Strategy<Value = Vec<String>> {
        proptest::sample::subsequence((0..12).map(|i| format!("k{i}")).collect::<Vec<_>>(), 0..12)
            .prop_shuffle()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn prop_apply_diff_reaches_target(old in arb_keys(), new in arb_keys()) {
            let old: Vec<&str> = old.iter().map(String::as_str).collect();
            let new: Vec<&str> = new.iter().map(String::as_str).collect();
            let (ops, result) = patched(&rows(&old), &rows(&new));
            prop_assert_eq!(result, rows(&new));

            let retained: Vec<usize> = {
                let pos: HashMap<&str, usize> =
                    new.iter().enumerate().map(|(i, k)| (*k, i)).collect();
                old.iter().filter_map(|k| pos.get(k).copied()).collect()
            };
            let stable = longest_increasing_run(&retained).len();
            prop_assert!(count_moves(&ops) <= retained.len() - stable);
        }
    }
}
