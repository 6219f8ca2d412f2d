//! The Parsed Profile Model
//!
//! One parse pass plus one link pass produce a `Model`; afterwards it is
//! logically immutable and freely shareable across threads. Entries live
//! once in an arena and are referenced by `EntryId` from call edges and
//! caller lists, which keeps cyclic call graphs trivially representable.
//!
//! @module profile/model

use std::collections::HashMap;

use serde::Serialize;

use crate::profile::types::{Cost, Entry, EntryId, Position, PositionId};

// =============================================================================
// POSITION TABLE
// =============================================================================

/// Content-addressed store of unique positions.
///
/// Every position reachable from the model is interned here, so structural
/// equality and identity coincide: two entries share a `PositionId` iff
/// their position triples are equal.
#[derive(Debug, Default, Serialize)]
pub struct PositionTable {
    positions: Vec<Position>,
    #[serde(skip)]
    lookup: HashMap<Position, PositionId>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a position, returning the id of the canonical instance.
    pub fn intern(&mut self, position: &Position) -> PositionId {
        if let Some(&id) = self.lookup.get(position) {
            return id;
        }
        let id = self.positions.len() as PositionId;
        self.positions.push(position.clone());
        self.lookup.insert(position.clone(), id);
        id
    }

    pub fn get(&self, id: PositionId) -> &Position {
        &self.positions[id as usize]
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// An immutable parsed Callgrind profile.
///
/// `entries()` yields profiled entries only, hottest first. Placeholder
/// entries for callees that were never profiled themselves live in the same
/// arena (reachable through `Call::callee` and [`Model::entry`]) but are
/// kept off the sorted list; they carry empty costs and calls.
#[derive(Debug, Default, Serialize)]
pub struct Model {
    pub(crate) events: Vec<String>,
    pub(crate) position_axes: Vec<String>,
    pub(crate) entries: Vec<Entry>,
    pub(crate) order: Vec<EntryId>,
    pub(crate) positions: PositionTable,
    pub(crate) lines_parsed: u64,
}

impl Model {
    /// Declared event names, in header order.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Declared sub-position axis names, in header order.
    pub fn position_axes(&self) -> &[String] {
        &self.position_axes
    }

    /// Profiled entries sorted by inclusive primary cost descending; ties
    /// preserve file order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &Entry)> + '_ {
        self.order.iter().map(move |&id| (id, &self.entries[id as usize]))
    }

    /// Any arena entry, placeholders included.
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id as usize]
    }

    pub fn position(&self, id: PositionId) -> &Position {
        self.positions.get(id)
    }

    /// The canonical position of an entry.
    pub fn entry_position(&self, id: EntryId) -> &Position {
        self.positions.get(self.entry(id).position)
    }

    /// Inclusive cost of an entry; always `events().len()` long.
    pub fn total_cost(&self, id: EntryId) -> Vec<Cost> {
        self.entry(id).total_cost(self.events.len())
    }

    /// Number of profiled entries (placeholders excluded).
    pub fn entry_count(&self) -> usize {
        self.order.len()
    }

    pub fn unique_position_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of input lines consumed by the parse pass.
    pub fn lines_parsed(&self) -> u64 {
        self.lines_parsed
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            entries: self.order.len(),
            placeholders: self.entries.len() - self.order.len(),
            unique_positions: self.positions.len(),
            events: self.events.len(),
            lines_parsed: self.lines_parsed,
        }
    }
}

// =============================================================================
// MODEL STATISTICS
// =============================================================================

/// Summary counts for a parsed model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelStats {
    pub entries: usize,
    pub placeholders: usize,
    pub unique_positions: usize,
    pub events: usize,
    pub lines_parsed: u64,
}

impl std::fmt::Display for ModelStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Entries:          {:>8}", self.entries)?;
        writeln!(f, "Unique positions: {:>8}", self.unique_positions)?;
        writeln!(f, "Events:           {:>8}", self.events)?;
        writeln!(f, "Lines parsed:     {:>8}", self.lines_parsed)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::parser::parse_str;
    use crate::profile::types::{Call, CostSpec};

    /// A multi-entry fixture exercising compression reuse, relative
    /// sub-positions, an unprofiled callee and a recursion cycle.
    const FIXTURE: &str = "events: Ir Dr\npositions: instr line\n\n\
        ob=(1) /usr/bin/app\n\
        fl=(1) main.c\n\
        fn=(1) main\n\
        100 10 50 5\n\
        +8 +1 25 2\n\
        cfn=(2) work\n\
        calls=2 120 20\n\
        * * 300 30\n\n\
        fl=(1)\n\
        fn=(2)\n\
        200 20 150 15\n\
        cfn=(3) malloc\n\
        calls=4 208 22\n\
        +8 +2 40 4\n\
        cfn=(1)\n\
        calls=1 216 24\n\
        +8 +2 10 1\n\n";

    /// Serializes a model back to Callgrind text using no compression and
    /// only absolute sub-positions.
    fn to_callgrind(model: &Model) -> String {
        let mut out = String::new();
        out.push_str(&format!("events: {}\n", model.events().join(" ")));
        out.push_str(&format!("positions: {}\n\n", model.position_axes().join(" ")));
        for (_, entry) in model.entries() {
            let position = model.position(entry.position);
            if !position.binary.is_empty() {
                out.push_str(&format!("ob={}\n", position.binary));
            }
            out.push_str(&format!("fl={}\n", position.source));
            out.push_str(&format!("fn={}\n", position.symbol));
            for spec in &entry.costs {
                push_cost_line(&mut out, spec);
            }
            for call in &entry.calls {
                let callee = model.position(model.entry(call.callee).position);
                if callee.binary != position.binary {
                    out.push_str(&format!("cob={}\n", callee.binary));
                }
                out.push_str(&format!("cfl={}\n", callee.source));
                out.push_str(&format!("cfn={}\n", callee.symbol));
                let subs: Vec<String> =
                    call.sub_positions.iter().map(|s| s.to_string()).collect();
                out.push_str(&format!("calls={} {}\n", call.ncalls, subs.join(" ")));
                for spec in &call.costs {
                    push_cost_line(&mut out, spec);
                }
            }
            out.push('\n');
        }
        out
    }

    fn push_cost_line(out: &mut String, spec: &CostSpec) {
        let tokens: Vec<String> = spec
            .sub_positions
            .iter()
            .chain(&spec.costs)
            .map(|n| n.to_string())
            .collect();
        out.push_str(&format!("{}\n", tokens.join(" ")));
    }

    /// Structural projection independent of arena ids: per profiled entry
    /// in list order, its position, costs, calls (with callee positions)
    /// and sorted caller positions.
    #[allow(clippy::type_complexity)]
    fn fingerprint(
        model: &Model,
    ) -> Vec<(
        Position,
        Vec<CostSpec>,
        Vec<(u64, Vec<u64>, Vec<CostSpec>, Position)>,
        Vec<Position>,
    )> {
        model
            .entries()
            .map(|(_, entry)| {
                let calls = entry
                    .calls
                    .iter()
                    .map(|c: &Call| {
                        (
                            c.ncalls,
                            c.sub_positions.clone(),
                            c.costs.clone(),
                            model.entry_position(c.callee).clone(),
                        )
                    })
                    .collect();
                let mut callers: Vec<Position> = entry
                    .callers
                    .iter()
                    .map(|&id| model.entry_position(id).clone())
                    .collect();
                callers.sort();
                (
                    model.position(entry.position).clone(),
                    entry.costs.clone(),
                    calls,
                    callers,
                )
            })
            .collect()
    }

    #[test]
    fn test_total_cost_arity_matches_events() {
        let model = parse_str(FIXTURE).unwrap();
        for (id, _) in model.entries() {
            assert_eq!(model.total_cost(id).len(), model.events().len());
        }
    }

    #[test]
    fn test_inclusive_cost_is_sum_of_own_and_call_costs() {
        let model = parse_str(FIXTURE).unwrap();
        for (id, entry) in model.entries() {
            for (k, &total) in model.total_cost(id).iter().enumerate() {
                let own: u64 = entry.costs.iter().map(|s| s.costs[k]).sum();
                let called: u64 = entry
                    .calls
                    .iter()
                    .flat_map(|c| &c.costs)
                    .map(|s| s.costs[k])
                    .sum();
                assert_eq!(total, own + called);
            }
        }
    }

    #[test]
    fn test_positions_are_unique_across_entries() {
        let model = parse_str(FIXTURE).unwrap();
        let ids: Vec<PositionId> = model.entries().map(|(_, e)| e.position).collect();
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_entries_sorted_by_primary_cost_descending() {
        let model = parse_str(FIXTURE).unwrap();
        let totals: Vec<u64> = model
            .entries()
            .map(|(id, _)| model.total_cost(id)[0])
            .collect();
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let first = serde_json::to_string(&parse_str(FIXTURE).unwrap()).unwrap();
        let second = serde_json::to_string(&parse_str(FIXTURE).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_trip_through_uncompressed_serialization() {
        let model = parse_str(FIXTURE).unwrap();
        let rewritten = to_callgrind(&model);
        let reparsed = parse_str(&rewritten).unwrap();

        assert_eq!(model.events(), reparsed.events());
        assert_eq!(model.position_axes(), reparsed.position_axes());
        assert_eq!(fingerprint(&model), fingerprint(&reparsed));
    }

    #[test]
    fn test_position_interning_dedups() {
        let mut table = PositionTable::new();
        let a = Position {
            binary: String::new(),
            source: "a.c".into(),
            symbol: "f".into(),
        };
        let b = Position {
            symbol: "g".into(),
            ..a.clone()
        };

        let id_a = table.intern(&a);
        let id_b = table.intern(&b);
        let id_a2 = table.intern(&a.clone());

        assert_eq!(id_a, id_a2);
        assert_ne!(id_a, id_b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(id_a), &a);
    }

    #[test]
    fn test_empty_model() {
        let model = Model::default();
        assert_eq!(model.entry_count(), 0);
        assert!(model.events().is_empty());
        assert_eq!(model.entries().count(), 0);
    }

    #[test]
    fn test_stats_display() {
        let model = Model::default();
        let text = model.stats().to_string();
        assert!(text.contains("Entries:"));
        assert!(text.contains("Unique positions:"));
    }
}
