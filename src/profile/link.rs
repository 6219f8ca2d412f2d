//! Graph Post-Processor
//!
//! Runs once after the parse pass: resolves every call's callee position
//! against the profiled entry set, allocates shared placeholder entries
//! for callees that were never profiled, populates reverse caller edges
//! and imposes the final hottest-first entry ordering.
//!
//! @module profile/link

use std::collections::HashMap;

use tracing::debug;

use crate::profile::model::{Model, PositionTable};
use crate::profile::parser::RawEntry;
use crate::profile::types::{Call, Cost, Entry, EntryId, PositionId};

pub(crate) fn link(
    events: Vec<String>,
    position_axes: Vec<String>,
    raw_entries: Vec<RawEntry>,
    positions: PositionTable,
    lines_parsed: u64,
) -> Model {
    let mut entries: Vec<Entry> = Vec::with_capacity(raw_entries.len());
    let mut by_position: HashMap<PositionId, EntryId> = HashMap::with_capacity(raw_entries.len());
    let mut pending_calls = Vec::with_capacity(raw_entries.len());

    // Profiled entries keep file order in the arena. Should two entries
    // share a position, the first one is the canonical call target.
    for raw in raw_entries {
        let id = entries.len() as EntryId;
        by_position.entry(raw.position).or_insert(id);
        let mut entry = Entry::new(raw.position);
        entry.costs = raw.costs;
        entries.push(entry);
        pending_calls.push(raw.calls);
    }

    let profiled = entries.len();

    // Resolve callees and populate reverse edges. Unprofiled targets get
    // one placeholder entry per distinct position, appended after the
    // profiled range so they stay off the sorted list.
    let mut placeholders: HashMap<PositionId, EntryId> = HashMap::new();
    for (caller, calls) in pending_calls.into_iter().enumerate() {
        let caller = caller as EntryId;
        for raw in calls {
            let callee = if let Some(&id) = by_position.get(&raw.callee) {
                id
            } else if let Some(&id) = placeholders.get(&raw.callee) {
                id
            } else {
                let id = entries.len() as EntryId;
                entries.push(Entry::new(raw.callee));
                placeholders.insert(raw.callee, id);
                id
            };

            let reverse = &mut entries[callee as usize].callers;
            if !reverse.contains(&caller) {
                reverse.push(caller);
            }

            entries[caller as usize].calls.push(Call {
                ncalls: raw.ncalls,
                sub_positions: raw.sub_positions,
                costs: raw.costs,
                callee,
            });
        }
    }

    // Hottest first by inclusive primary cost; the stable sort keeps file
    // order on ties.
    let n_events = events.len();
    let totals: Vec<Cost> = entries[..profiled]
        .iter()
        .map(|e| e.total_cost(n_events).first().copied().unwrap_or(0))
        .collect();
    let mut order: Vec<EntryId> = (0..profiled as EntryId).collect();
    order.sort_by(|&a, &b| totals[b as usize].cmp(&totals[a as usize]));

    debug!(
        entries = profiled,
        placeholders = entries.len() - profiled,
        "link complete"
    );

    Model {
        events,
        position_axes,
        entries,
        order,
        positions,
        lines_parsed,
    }
}

// =============================================================================
// TESTS
// =============================================================================
