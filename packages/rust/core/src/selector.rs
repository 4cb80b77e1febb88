//! Entity selection and rotation.
//!
//! A rotation is one pass through every known candidate. Within a rotation an
//! identifier is published at most once; when every candidate has been
//! published the history is cleared and a new rotation starts in the same run.

use std::collections::HashSet;

use tracing::info;

use autoniche_shared::{AutoNicheError, Result};
use autoniche_storage::RunState;

/// Up to `limit` identifiers from `all_ids` that are not in `processed`,
/// in the order they appear in `all_ids`.
///
/// An empty result means the rotation is exhausted (or `limit` is zero).
pub fn select_batch<S: AsRef<str>>(
    all_ids: &[String],
    processed: &[S],
    limit: usize,
) -> Vec<String> {
    let seen: HashSet<&str> = processed.iter().map(AsRef::<str>::as_ref).collect();
    all_ids
        .iter()
        .filter(|id| !seen.contains(id.as_str()))
        .take(limit)
        .cloned()
        .collect()
}

/// Whether selecting a batch required starting a new rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Unprocessed candidates remained.
    Continued,
    /// Every candidate had been processed; the history was cleared.
    Restarted,
}

/// The batch chosen for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ids: Vec<String>,
    pub rotation: Rotation,
}

/// Choose the next batch, resetting `state` when the rotation is exhausted.
///
/// Fails with [`AutoNicheError::NoCandidates`] when `all_ids` is empty; that
/// is a broken niche query, not an exhausted rotation. `state` is only
/// mutated by a reset; identifiers are recorded by the caller as each post is
/// written.
pub fn next_batch(all_ids: &[String], state: &mut RunState, limit: usize) -> Result<Selection> {
    if all_ids.is_empty() {
        return Err(AutoNicheError::NoCandidates);
    }

    let ids = select_batch(all_ids, state.processed(), limit);
    if !ids.is_empty() || limit == 0 {
        return Ok(Selection {
            ids,
            rotation: Rotation::Continued,
        });
    }

    info!(
        candidates = all_ids.len(),
        processed = state.len(),
        "all candidates processed, starting a new rotation"
    );
    state.reset();

    Ok(Selection {
        ids: select_batch(all_ids, state.processed(), limit),
        rotation: Rotation::Restarted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn skips_processed_and_keeps_order() {
        assert_eq!(
            select_batch(&ids(&["Q1", "Q2", "Q3"]), &["Q1"], 5),
            ids(&["Q2", "Q3"])
        );
    }

    #[test]
    fn respects_limit() {
        let all = ids(&["Q1", "Q2", "Q3", "Q4"]);
        assert_eq!(select_batch::<&str>(&all, &[], 2), ids(&["Q1", "Q2"]));
        assert!(select_batch::<&str>(&all, &[], 0).is_empty());
    }

    #[test]
    fn exhausted_rotation_selects_nothing() {
        let all = ids(&["Q1", "Q2"]);
        assert!(select_batch(&all, &["Q1", "Q2"], 3).is_empty());
    }

    #[test]
    fn selection_properties_hold_over_many_inputs() {
        let all: Vec<String> = (0..20).map(|i| format!("Q{i}")).collect();
        for mask in 0u32..64 {
            let processed: Vec<String> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << (i % 6)) != 0)
                .map(|(_, q)| q.clone())
                .collect();

            for limit in 0..6 {
                let batch = select_batch(&all, processed.as_slice(), limit);
                assert!(batch.len() <= limit);
                assert!(batch.iter().all(|q| !processed.contains(q)));

                // Order-preserving subsequence of all_ids
                let mut cursor = all.iter();
                assert!(batch.iter().all(|q| cursor.any(|a| a == q)));

                assert_eq!(batch, select_batch(&all, processed.as_slice(), limit));
            }
        }
    }

    #[test]
    fn next_batch_continues_rotation() {
        let mut state = RunState::with_processed(["Q1"]);
        let selection = next_batch(&ids(&["Q1", "Q2", "Q3"]), &mut state, 5).unwrap();

        assert_eq!(selection.ids, ids(&["Q2", "Q3"]));
        assert_eq!(selection.rotation, Rotation::Continued);
        assert_eq!(state.processed(), ["Q1"]);
    }

    #[test]
    fn next_batch_restarts_exhausted_rotation() {
        let mut state = RunState::with_processed(["Q1", "Q2"]);
        let selection = next_batch(&ids(&["Q1", "Q2"]), &mut state, 3).unwrap();

        assert_eq!(selection.ids, ids(&["Q1", "Q2"]));
        assert_eq!(selection.rotation, Rotation::Restarted);
        assert!(state.is_empty());
    }

    #[test]
    fn next_batch_fails_without_candidates() {
        let mut state = RunState::with_processed(["Q1"]);
        let err = next_batch(&[], &mut state, 3).unwrap_err();

        assert!(matches!(err, AutoNicheError::NoCandidates));
        assert_eq!(state.processed(), ["Q1"]);
    }

    #[test]
    fn history_outside_candidates_does_not_block_selection() {
        let mut state = RunState::with_processed(["Q9", "Q8"]);
        let selection = next_batch(&ids(&["Q1"]), &mut state, 1).unwrap();
        assert_eq!(selection.ids, ids(&["Q1"]));
        assert_eq!(selection.rotation, Rotation::Continued);
    }
}
