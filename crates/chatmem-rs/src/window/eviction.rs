//! Sliding eviction: move the oldest active entries to `pending`.
//!
//! Eviction never deletes anything. Entries that fall out of the active set
//! are retagged in place and stay in the window until the long-term backend
//! has accepted them; only then does [`remove_promoted`] drop them. A failed
//! promotion therefore leaves the window exactly as eviction left it, and
//! the next overflowing turn offers the same entries again.

use super::{Entry, EntryTag, Window};
use std::collections::HashSet;

/// Default maximum number of active entries per window.
pub const DEFAULT_CAPACITY: usize = 30;

/// Reclassify the oldest active entries so that at most `capacity` remain
/// active, and return the promotion batch.
///
/// If the window already holds `capacity` or fewer active entries, nothing is
/// touched and the batch is empty. Otherwise the first `active - capacity`
/// active entries (in insertion order) become `pending`, and the returned
/// batch is *every* pending entry in the window, including ones left over
/// from an earlier promotion that failed.
pub fn slide_and_collect_pending(window: &mut Window, capacity: usize) -> Vec<Entry> {
    let active_indices: Vec<usize> = window
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_active())
        .map(|(i, _)| i)
        .collect();

    if active_indices.len() <= capacity {
        return Vec::new();
    }

    let overflow = active_indices.len() - capacity;
    for &idx in &active_indices[..overflow] {
        window.entries[idx].tag = EntryTag::Pending;
    }

    window.pending_entries().cloned().collect()
}

/// Remove every entry whose sequence number appears in `promoted`.
///
/// Returns the number of entries removed. Entries not in the batch, active
/// or pending, are left in place and in order.
pub fn remove_promoted(window: &mut Window, promoted: &[Entry]) -> usize {
    if promoted.is_empty() {
        return 0;
    }
    let seqs: HashSet<u64> = promoted.iter().map(|e| e.seq).collect();
    let before = window.entries.len();
    window.entries.retain(|e| !seqs.contains(&e.seq));
    before - window.entries.len()
}
