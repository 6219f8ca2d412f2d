//! Core Data Structures for the Profile Model
//!
//! Plain value types shared by the parser, the link pass and the query
//! surface. Entries are owned once by the model arena and referenced
//! everywhere else by id, so call graphs with cycles need no shared
//! ownership.
//!
//! @module profile/types

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A per-axis location value (instruction offset, source line, basic block).
pub type SubPosition = u64;

/// A single event counter value.
pub type Cost = u64;

/// Index of an entry in the model arena.
pub type EntryId = u32;

/// Index of a position in the canonical position table.
pub type PositionId = u32;

// =============================================================================
// POSITION
// =============================================================================

/// A profiled function context: binary object, source file, symbol name.
///
/// Positions are compared structurally; the model interns them so that one
/// canonical instance exists per distinct triple. The `source` field absorbs
/// writes from all of the file axes (`fl`, `fi`, `fe`).
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Binary object (`ob`)
    pub binary: String,
    /// Source file (`fl`/`fi`/`fe`)
    pub source: String,
    /// Function symbol (`fn`)
    pub symbol: String,
}

// =============================================================================
// COST SPEC
// =============================================================================

/// One cost line: a sub-position per declared axis and a cost per declared
/// event. Both lengths are fixed per file by the `positions:` and `events:`
/// headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSpec {
    pub sub_positions: Vec<SubPosition>,
    pub costs: Vec<Cost>,
}

// =============================================================================
// CALL
// =============================================================================

/// An outbound edge from one entry to another: call count, call-site
/// sub-positions within the caller, and the callee self-cost charged to
/// this site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub ncalls: u64,
    pub sub_positions: Vec<SubPosition>,
    pub costs: Vec<CostSpec>,
    /// Canonical entry this call targets; a placeholder entry when the
    /// callee was never profiled itself.
    pub callee: EntryId,
}

impl Call {
    /// Per-event sum over this call's cost specs.
    pub fn total_cost(&self, n_events: usize) -> Vec<Cost> {
        let mut result = vec![0; n_events];
        for spec in &self.costs {
            accumulate(&mut result, spec);
        }
        result
    }
}

// =============================================================================
// ENTRY
// =============================================================================

/// One profiled function context: its canonical position, its own cost
/// specs, its outbound calls and the ids of the entries that call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub position: PositionId,
    pub costs: Vec<CostSpec>,
    pub calls: Vec<Call>,
    /// Reverse edges, deduplicated by id; cyclic call graphs are
    /// representable since no entry owns another.
    pub callers: SmallVec<[EntryId; 8]>,
}

impl Entry {
    pub(crate) fn new(position: PositionId) -> Self {
        Self {
            position,
            costs: Vec::new(),
            calls: Vec::new(),
            callers: SmallVec::new(),
        }
    }

    /// Inclusive cost: the per-event sum of this entry's own cost specs
    /// plus every cost spec of its outbound calls. Always `n_events` long;
    /// all zeros for placeholder entries.
    pub fn total_cost(&self, n_events: usize) -> Vec<Cost> {
        let mut result = vec![0; n_events];
        for spec in &self.costs {
            accumulate(&mut result, spec);
        }
        for call in &self.calls {
            for spec in &call.costs {
                accumulate(&mut result, spec);
            }
        }
        result
    }
}

fn accumulate(acc: &mut [Cost], spec: &CostSpec) {
    for (slot, &cost) in acc.iter_mut().zip(&spec.costs) {
        *slot += cost;
    }
}

// =============================================================================
// TESTS
// =============================================================================
