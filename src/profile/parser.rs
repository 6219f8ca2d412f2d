//! Stateful Line Parser for Callgrind Profiles
//!
//! A single pass over the input drives a small tagged state machine:
//! headers and blank lines at the top level, a position block then a cost
//! block per entry, call blocks nested inside. The parser owns the
//! compression caches, the sub-position register and the current-position
//! scratch record; the collected entries are handed to the link pass,
//! which stitches call edges and produces the final [`Model`].
//!
//! @module profile/parser

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ParseError, Result};
use crate::profile::compress::CompressionCaches;
use crate::profile::lexer::{self, Header, PositionKind, PositionLine};
use crate::profile::link;
use crate::profile::model::{Model, PositionTable};
use crate::profile::register::SubPositionRegister;
use crate::profile::types::{CostSpec, Position, PositionId, SubPosition};

/// An entry as collected during the parse pass: calls still name their
/// callee by position id, not by entry id.
#[derive(Debug)]
pub(crate) struct RawEntry {
    pub(crate) position: PositionId,
    pub(crate) costs: Vec<CostSpec>,
    pub(crate) calls: Vec<RawCall>,
}

#[derive(Debug)]
pub(crate) struct RawCall {
    pub(crate) ncalls: u64,
    pub(crate) sub_positions: Vec<SubPosition>,
    pub(crate) costs: Vec<CostSpec>,
    pub(crate) callee: PositionId,
}

/// Where in the structural grammar the previous line left us. States that
/// are inside an entry own the partially built records, so an impossible
/// combination cannot be represented.
#[derive(Debug, Default)]
enum State {
    /// Headers, comments and blank lines between entries.
    #[default]
    Idle,
    /// Inside an entry's leading position block; the scratch position is
    /// being updated, no cost line seen yet.
    EntryPositions,
    /// Inside an entry's cost block.
    EntryCosts { entry: RawEntry },
    /// Inside a call position block, before `calls=`.
    CallPositions {
        entry: RawEntry,
        call_position: Position,
    },
    /// Immediately after `calls=`; a cost line is mandatory.
    CallAwaitCost { entry: RawEntry, call: RawCall },
    /// Inside a call's cost block.
    CallCosts { entry: RawEntry, call: RawCall },
}

struct Parser {
    events: Vec<String>,
    axes: Vec<String>,
    caches: CompressionCaches,
    register: SubPositionRegister,
    positions: PositionTable,
    entries: Vec<RawEntry>,
    /// Scratch triple assembled from `ob`/`fl`/`fi`/`fe`/`fn` writes; it
    /// persists across entries, as later entries inherit unwritten axes.
    current_position: Position,
    state: State,
    line_no: u64,
}

/// Parses Callgrind profile text from a buffered reader.
pub fn parse<R: BufRead>(reader: R) -> Result<Model> {
    Parser::new().run(reader)
}

/// Parses a Callgrind profile from a file on disk.
pub fn parse_path<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = File::open(path.as_ref()).map_err(|source| ParseError::Io { line: 0, source })?;
    parse(BufReader::new(file))
}

/// Parses Callgrind profile text held in memory.
pub fn parse_str(input: &str) -> Result<Model> {
    parse(input.as_bytes())
}

impl Parser {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            axes: Vec::new(),
            caches: CompressionCaches::new(),
            register: SubPositionRegister::new(),
            positions: PositionTable::new(),
            entries: Vec::new(),
            current_position: Position::default(),
            state: State::Idle,
            line_no: 0,
        }
    }

    fn run<R: BufRead>(mut self, reader: R) -> Result<Model> {
        for line in reader.lines() {
            self.line_no += 1;
            let line = line.map_err(|source| ParseError::Io {
                line: self.line_no,
                source,
            })?;
            self.feed(&line)?;
        }
        self.finish()
    }

    fn feed(&mut self, line: &str) -> Result<()> {
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            State::Idle => self.feed_idle(line)?,
            State::EntryPositions => self.feed_entry_positions(line)?,
            State::EntryCosts { entry } => self.feed_entry_costs(entry, line)?,
            State::CallPositions {
                entry,
                call_position,
            } => self.feed_call_positions(entry, call_position, line)?,
            State::CallAwaitCost { entry, call } => self.feed_call_await_cost(entry, call, line)?,
            State::CallCosts { entry, call } => self.feed_call_costs(entry, call, line)?,
        };
        Ok(())
    }

    /// End of input: a complete entry is terminated as by a blank line; a
    /// dangling position or call block is the corresponding missing-line
    /// error.
    fn finish(mut self) -> Result<Model> {
        let line = self.line_no;
        match std::mem::take(&mut self.state) {
            State::Idle => {}
            State::EntryCosts { entry } => self.entries.push(entry),
            State::CallCosts { mut entry, call } => {
                entry.calls.push(call);
                self.entries.push(entry);
            }
            State::EntryPositions => return Err(ParseError::MissingCostLine { line }),
            State::CallPositions { .. } => return Err(ParseError::MissingCallLine { line }),
            State::CallAwaitCost { .. } => return Err(ParseError::MissingCostLine { line }),
        }

        info!(
            entries = self.entries.len(),
            positions = self.positions.len(),
            bindings = self.caches.len(),
            lines = self.line_no,
            "parse complete"
        );

        Ok(link::link(
            self.events,
            self.axes,
            self.entries,
            self.positions,
            self.line_no,
        ))
    }

    // -------------------------------------------------------------------------
    // State handlers
    // -------------------------------------------------------------------------

    fn feed_idle(&mut self, line: &str) -> Result<State> {
        if lexer::is_empty_line(line) {
            return Ok(State::Idle);
        }
        if let Some(header) = lexer::header(line, self.line_no) {
            match header? {
                Header::Positions(axes) => {
                    debug!(axes = ?axes, "positions header");
                    self.register.resize(axes.len());
                    self.axes = axes;
                }
                Header::Events(events) => {
                    debug!(events = ?events, "events header");
                    self.events = events;
                }
            }
            return Ok(State::Idle);
        }
        if let Some(spec) = lexer::position_line(line, PositionKind::Cost, self.line_no) {
            debug!(line = self.line_no, "begin entry");
            self.apply_to_current(&spec?)?;
            return Ok(State::EntryPositions);
        }
        // Anything else outside an entry is ignored: version:, cmd:,
        // totals:, creator: and whatever else a tool wrote.
        Ok(State::Idle)
    }

    fn feed_entry_positions(&mut self, line: &str) -> Result<State> {
        if let Some(spec) = lexer::position_line(line, PositionKind::Cost, self.line_no) {
            self.apply_to_current(&spec?)?;
            return Ok(State::EntryPositions);
        }
        if let Some((subs, values)) = lexer::cost_line(line, self.axes.len(), self.events.len()) {
            let position = self.positions.intern(&self.current_position);
            let mut entry = RawEntry {
                position,
                costs: Vec::new(),
                calls: Vec::new(),
            };
            entry.costs.push(self.decode_cost_spec(&subs, &values)?);
            return Ok(State::EntryCosts { entry });
        }
        if let Some(key) = lexer::unknown_axis(line) {
            return Err(ParseError::UnknownPositionAxis {
                line: self.line_no,
                axis: key.to_string(),
            });
        }
        Err(ParseError::MissingCostLine { line: self.line_no })
    }

    fn feed_entry_costs(&mut self, mut entry: RawEntry, line: &str) -> Result<State> {
        if lexer::is_empty_line(line) {
            debug!(line = self.line_no, costs = entry.costs.len(), calls = entry.calls.len(), "end entry");
            self.entries.push(entry);
            return Ok(State::Idle);
        }
        if let Some((subs, values)) = lexer::cost_line(line, self.axes.len(), self.events.len()) {
            entry.costs.push(self.decode_cost_spec(&subs, &values)?);
            return Ok(State::EntryCosts { entry });
        }
        if let Some(spec) = lexer::position_line(line, PositionKind::FileRedirect, self.line_no) {
            self.apply_to_current(&spec?)?;
            return Ok(State::EntryCosts { entry });
        }
        if let Some(spec) = lexer::position_line(line, PositionKind::Call, self.line_no) {
            debug!(line = self.line_no, "begin call");
            let mut call_position = self.current_position.clone();
            self.apply_to(&mut call_position, &spec?)?;
            return Ok(State::CallPositions {
                entry,
                call_position,
            });
        }
        if let Some(key) = lexer::unknown_axis(line) {
            return Err(ParseError::UnknownPositionAxis {
                line: self.line_no,
                axis: key.to_string(),
            });
        }
        Err(self.unexpected(line))
    }

    fn feed_call_positions(
        &mut self,
        entry: RawEntry,
        mut call_position: Position,
        line: &str,
    ) -> Result<State> {
        if let Some(spec) = lexer::position_line(line, PositionKind::Call, self.line_no) {
            self.apply_to(&mut call_position, &spec?)?;
            return Ok(State::CallPositions {
                entry,
                call_position,
            });
        }
        if let Some(call_line) = lexer::call_line(line, self.line_no) {
            let call_line = call_line?;
            if call_line.sub_positions.len() != self.axes.len()
                || !call_line
                    .sub_positions
                    .iter()
                    .all(|t| lexer::is_sub_position_token(t))
            {
                return Err(self.unexpected(line));
            }
            let mut sub_positions = Vec::with_capacity(call_line.sub_positions.len());
            for (i, token) in call_line.sub_positions.iter().enumerate() {
                sub_positions.push(self.register.resolve(i, token, self.line_no)?);
            }
            let callee = self.positions.intern(&call_position);
            let call = RawCall {
                ncalls: call_line.ncalls,
                sub_positions,
                costs: Vec::new(),
                callee,
            };
            return Ok(State::CallAwaitCost { entry, call });
        }
        if let Some(key) = lexer::unknown_axis(line) {
            return Err(ParseError::UnknownPositionAxis {
                line: self.line_no,
                axis: key.to_string(),
            });
        }
        Err(ParseError::MissingCallLine { line: self.line_no })
    }

    fn feed_call_await_cost(
        &mut self,
        entry: RawEntry,
        mut call: RawCall,
        line: &str,
    ) -> Result<State> {
        if let Some((subs, values)) = lexer::cost_line(line, self.axes.len(), self.events.len()) {
            call.costs.push(self.decode_cost_spec(&subs, &values)?);
            return Ok(State::CallCosts { entry, call });
        }
        Err(ParseError::MissingCostLine { line: self.line_no })
    }

    fn feed_call_costs(&mut self, mut entry: RawEntry, mut call: RawCall, line: &str) -> Result<State> {
        if lexer::is_empty_line(line) {
            entry.calls.push(call);
            debug!(line = self.line_no, costs = entry.costs.len(), calls = entry.calls.len(), "end entry");
            self.entries.push(entry);
            return Ok(State::Idle);
        }
        if let Some((subs, values)) = lexer::cost_line(line, self.axes.len(), self.events.len()) {
            call.costs.push(self.decode_cost_spec(&subs, &values)?);
            return Ok(State::CallCosts { entry, call });
        }
        if let Some(spec) = lexer::position_line(line, PositionKind::FileRedirect, self.line_no) {
            self.apply_to_current(&spec?)?;
            return Ok(State::CallCosts { entry, call });
        }
        if let Some(spec) = lexer::position_line(line, PositionKind::Call, self.line_no) {
            debug!(line = self.line_no, "begin call");
            entry.calls.push(call);
            let mut call_position = self.current_position.clone();
            self.apply_to(&mut call_position, &spec?)?;
            return Ok(State::CallPositions {
                entry,
                call_position,
            });
        }
        if let Some(key) = lexer::unknown_axis(line) {
            return Err(ParseError::UnknownPositionAxis {
                line: self.line_no,
                axis: key.to_string(),
            });
        }
        Err(self.unexpected(line))
    }

    // -------------------------------------------------------------------------
    // Shared helpers
    // -------------------------------------------------------------------------

    /// Resolves a position line through the compression caches and writes
    /// it into the current-position scratch.
    fn apply_to_current(&mut self, spec: &PositionLine<'_>) -> Result<()> {
        let value = self
            .caches
            .resolve(spec.axis, spec.index, spec.name, self.line_no)?;
        spec.axis.apply(&mut self.current_position, value);
        Ok(())
    }

    /// Same, targeting a call position under assembly.
    fn apply_to(&mut self, target: &mut Position, spec: &PositionLine<'_>) -> Result<()> {
        let value = self
            .caches
            .resolve(spec.axis, spec.index, spec.name, self.line_no)?;
        spec.axis.apply(target, value);
        Ok(())
    }

    /// Decodes a shape-checked cost line: sub-position tokens through the
    /// register, value tokens as plain numbers.
    fn decode_cost_spec(&mut self, subs: &[&str], values: &[&str]) -> Result<CostSpec> {
        let mut sub_positions = Vec::with_capacity(subs.len());
        for (i, token) in subs.iter().enumerate() {
            sub_positions.push(self.register.resolve(i, token, self.line_no)?);
        }
        let mut costs = Vec::with_capacity(values.len());
        for token in values {
            costs.push(lexer::parse_value(token, self.line_no)?);
        }
        Ok(CostSpec {
            sub_positions,
            costs,
        })
    }

    fn unexpected(&self, line: &str) -> ParseError {
        ParseError::UnexpectedLine {
            line: self.line_no,
            content: line.trim_end().to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
