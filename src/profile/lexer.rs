//! Lexical Recognizers for Callgrind Lines
//!
//! Pure, stateless recognizers over a single input line: empty lines,
//! `positions:`/`events:` headers, the three kinds of position lines,
//! `calls=` lines and cost-line token shapes. Which recognizer runs first
//! depends on the parser state; the priority lives in the parser, not here.
//!
//! @module profile/lexer

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ParseError, Result};
use crate::profile::types::Position;

// =============================================================================
// COMPILED PATTERNS
// =============================================================================

static RE_EMPTY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*$").unwrap());

static RE_POSITIONS_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^positions:\s*(.*)$").unwrap());

static RE_EVENTS_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^events:\s*(.*)$").unwrap());

/// Any `key=` line with a short lowercase key: optional `(N)` compression
/// index, optional name. Whether the key is a recognized axis is decided
/// separately, so unknown keys can be reported as such.
static RE_POSITION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]{2,3})=[ \t]*(?:\((\d+)\))?[ \t]*(.*)$").unwrap());

static RE_CALL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^calls=[ \t]*(\S+)(.*)$").unwrap());

static RE_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());

static RE_SUB_POSITION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\*|[+-]\d+|0[xX][0-9a-fA-F]+|\d+)$").unwrap());

static RE_VALUE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:0[xX][0-9a-fA-F]+|\d+)$").unwrap());

/// Sub-position axis names the `positions:` header may declare.
pub const POSITION_AXES: [&str; 3] = ["instr", "line", "bb"];

// =============================================================================
// POSITION AXES
// =============================================================================

/// Which grammar slot a position line is being matched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    /// `ob` `fl` `fi` `fe` `fn` open or extend an entry position block
    Cost,
    /// `cob` `cfl` `cfi` `cfn` open or extend a call position block
    Call,
    /// `fi` `fe` redirect the source file inside a cost block
    FileRedirect,
}

/// A recognized position-line key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ob,
    Fl,
    Fi,
    Fe,
    Fn,
    Cob,
    Cfl,
    Cfi,
    Cfn,
}

impl Axis {
    pub fn parse(key: &str) -> Option<Axis> {
        match key {
            "ob" => Some(Axis::Ob),
            "fl" => Some(Axis::Fl),
            "fi" => Some(Axis::Fi),
            "fe" => Some(Axis::Fe),
            "fn" => Some(Axis::Fn),
            "cob" => Some(Axis::Cob),
            "cfl" => Some(Axis::Cfl),
            "cfi" => Some(Axis::Cfi),
            "cfn" => Some(Axis::Cfn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Ob => "ob",
            Axis::Fl => "fl",
            Axis::Fi => "fi",
            Axis::Fe => "fe",
            Axis::Fn => "fn",
            Axis::Cob => "cob",
            Axis::Cfl => "cfl",
            Axis::Cfi => "cfi",
            Axis::Cfn => "cfn",
        }
    }

    pub fn in_kind(self, kind: PositionKind) -> bool {
        match kind {
            PositionKind::Cost => matches!(self, Axis::Ob | Axis::Fl | Axis::Fi | Axis::Fe | Axis::Fn),
            PositionKind::Call => matches!(self, Axis::Cob | Axis::Cfl | Axis::Cfi | Axis::Cfn),
            PositionKind::FileRedirect => matches!(self, Axis::Fi | Axis::Fe),
        }
    }

    /// Writes a resolved name into the position field this axis addresses.
    /// Call axes write through to the same fields as their plain forms.
    pub fn apply(self, position: &mut Position, value: String) {
        match self {
            Axis::Ob | Axis::Cob => position.binary = value,
            Axis::Fl | Axis::Fi | Axis::Fe | Axis::Cfl | Axis::Cfi => position.source = value,
            Axis::Fn | Axis::Cfn => position.symbol = value,
        }
    }
}

// =============================================================================
// RECOGNIZERS
// =============================================================================

/// True when the line contains only whitespace.
pub fn is_empty_line(line: &str) -> bool {
    RE_EMPTY.is_match(line)
}

/// A recognized header line.
#[derive(Debug, PartialEq, Eq)]
pub enum Header {
    Positions(Vec<String>),
    Events(Vec<String>),
}

/// Matches `positions:`/`events:` headers. `None` when the prefix does not
/// match; `Err(MalformedHeader)` when the prefix matches but the body does
/// not follow its grammar.
pub fn header(line: &str, line_no: u64) -> Option<Result<Header>> {
    if let Some(caps) = RE_POSITIONS_DEF.captures(line) {
        let axes: Vec<String> = caps[1].split_whitespace().map(str::to_string).collect();
        if axes.is_empty() || axes.iter().any(|a| !POSITION_AXES.contains(&a.as_str())) {
            return Some(Err(malformed(line, line_no)));
        }
        return Some(Ok(Header::Positions(axes)));
    }
    if let Some(caps) = RE_EVENTS_DEF.captures(line) {
        let events: Vec<String> = caps[1].split_whitespace().map(str::to_string).collect();
        if events.is_empty() || events.iter().any(|e| !RE_IDENT.is_match(e)) {
            return Some(Err(malformed(line, line_no)));
        }
        return Some(Ok(Header::Events(events)));
    }
    None
}

fn malformed(line: &str, line_no: u64) -> ParseError {
    ParseError::MalformedHeader {
        line: line_no,
        header: line.trim_end().to_string(),
    }
}

/// A position line split into axis, optional compression index and optional
/// name.
#[derive(Debug, PartialEq, Eq)]
pub struct PositionLine<'a> {
    pub axis: Axis,
    pub index: Option<u64>,
    pub name: Option<&'a str>,
}

/// Matches a position line whose key belongs to `kind`. `None` when the
/// line is not such a position line; `Err` only for an overflowing
/// compression index.
pub fn position_line<'a>(
    line: &'a str,
    kind: PositionKind,
    line_no: u64,
) -> Option<Result<PositionLine<'a>>> {
    let caps = RE_POSITION_LINE.captures(line)?;
    let axis = Axis::parse(caps.get(1)?.as_str())?;
    if !axis.in_kind(kind) {
        return None;
    }

    let index = match caps.get(2) {
        Some(m) => match parse_value(m.as_str(), line_no) {
            Ok(n) => Some(n),
            Err(e) => return Some(Err(e)),
        },
        None => None,
    };

    let name = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|n| !n.is_empty());

    Some(Ok(PositionLine { axis, index, name }))
}

/// The key of a position-shaped line (`xy=` / `cxy=`) that is not a
/// recognized axis, for `UnknownPositionAxis` reporting inside entries.
pub fn unknown_axis(line: &str) -> Option<&str> {
    let caps = RE_POSITION_LINE.captures(line)?;
    let key = caps.get(1)?.as_str();
    match Axis::parse(key) {
        Some(_) => None,
        None => Some(key),
    }
}

/// A `calls=` line: the call count plus the raw sub-position tokens.
#[derive(Debug, PartialEq, Eq)]
pub struct CallLine<'a> {
    pub ncalls: u64,
    pub sub_positions: Vec<&'a str>,
}

/// Matches `calls=<ncalls> <sub-position-list>`. `None` when the prefix
/// does not match; `Err` when the call count is not a decimal number or
/// overflows.
pub fn call_line<'a>(line: &'a str, line_no: u64) -> Option<Result<CallLine<'a>>> {
    let caps = RE_CALL_LINE.captures(line)?;
    let count = caps.get(1)?.as_str();
    if !count.bytes().all(|b| b.is_ascii_digit()) {
        return Some(Err(ParseError::UnexpectedLine {
            line: line_no,
            content: line.trim_end().to_string(),
        }));
    }
    let ncalls = match parse_value(count, line_no) {
        Ok(n) => n,
        Err(e) => return Some(Err(e)),
    };
    let sub_positions = caps
        .get(2)
        .map(|m| m.as_str().split_whitespace().collect())
        .unwrap_or_default();
    Some(Ok(CallLine {
        ncalls,
        sub_positions,
    }))
}

/// True when the token has one of the sub-position shapes
/// (`*`, `+N`, `-N`, decimal, hex).
pub fn is_sub_position_token(token: &str) -> bool {
    RE_SUB_POSITION_TOKEN.is_match(token)
}

/// Splits a candidate cost line into sub-position and value tokens.
/// `None` unless the line is exactly `n_pos` sub-position tokens followed
/// by `n_events` plain value tokens; a numeric-looking line with the wrong
/// arity is not a cost line.
pub fn cost_line(line: &str, n_pos: usize, n_events: usize) -> Option<(Vec<&str>, Vec<&str>)> {
    if n_pos + n_events == 0 {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != n_pos + n_events {
        return None;
    }
    let (subs, values) = tokens.split_at(n_pos);
    if !subs.iter().all(|t| RE_SUB_POSITION_TOKEN.is_match(t)) {
        return None;
    }
    if !values.iter().all(|t| RE_VALUE_TOKEN.is_match(t)) {
        return None;
    }
    Some((subs.to_vec(), values.to_vec()))
}

/// Decodes a decimal or `0x`-prefixed hex literal into u64.
pub fn parse_value(token: &str, line_no: u64) -> Result<u64> {
    let parsed = if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        token.parse::<u64>()
    };
    parsed.map_err(|_| ParseError::NumericOverflow {
        line: line_no,
        token: token.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line() {
        assert!(is_empty_line(""));
        assert!(is_empty_line("   \t"));
        assert!(!is_empty_line(" x "));
    }

    #[test]
    fn test_positions_header() {
        let h = header("positions: instr line", 1).unwrap().unwrap();
        assert_eq!(h, Header::Positions(vec!["instr".into(), "line".into()]));

        let h = header("positions: bb", 1).unwrap().unwrap();
        assert_eq!(h, Header::Positions(vec!["bb".into()]));

        assert!(header("positions: offset", 1).unwrap().is_err());
        assert!(header("positions:", 1).unwrap().is_err());
        assert!(header("version: 1", 1).is_none());
    }

    #[test]
    fn test_events_header() {
        let h = header("events: Ir Dr DLmr", 1).unwrap().unwrap();
        assert_eq!(
            h,
            Header::Events(vec!["Ir".into(), "Dr".into(), "DLmr".into()])
        );

        assert!(header("events:", 1).unwrap().is_err());
        assert!(header("events: a$b", 1).unwrap().is_err());
    }

    #[test]
    fn test_position_line_shapes() {
        let p = position_line("fl=(1) a.c", PositionKind::Cost, 1)
            .unwrap()
            .unwrap();
        assert_eq!(p.axis, Axis::Fl);
        assert_eq!(p.index, Some(1));
        assert_eq!(p.name, Some("a.c"));

        let p = position_line("fn=(0)", PositionKind::Cost, 1)
            .unwrap()
            .unwrap();
        assert_eq!(p.axis, Axis::Fn);
        assert_eq!(p.index, Some(0));
        assert_eq!(p.name, None);

        let p = position_line("ob=/usr/lib/libc.so", PositionKind::Cost, 1)
            .unwrap()
            .unwrap();
        assert_eq!(p.index, None);
        assert_eq!(p.name, Some("/usr/lib/libc.so"));

        let p = position_line("fn=", PositionKind::Cost, 1).unwrap().unwrap();
        assert_eq!(p.index, None);
        assert_eq!(p.name, None);
    }

    #[test]
    fn test_position_line_name_may_contain_parens() {
        let p = position_line("fn=(2) std::map<int, int>::find(int const&)", PositionKind::Cost, 1)
            .unwrap()
            .unwrap();
        assert_eq!(p.index, Some(2));
        assert_eq!(p.name, Some("std::map<int, int>::find(int const&)"));

        let p = position_line("fn=(anonymous namespace)::run", PositionKind::Cost, 1)
            .unwrap()
            .unwrap();
        assert_eq!(p.index, None);
        assert_eq!(p.name, Some("(anonymous namespace)::run"));
    }

    #[test]
    fn test_position_line_kinds_are_disjoint() {
        assert!(position_line("cfn=(1) g", PositionKind::Cost, 1).is_none());
        assert!(position_line("fn=(1) g", PositionKind::Call, 1).is_none());
        assert!(position_line("cfn=(1) g", PositionKind::Call, 1).is_some());

        // Only fi/fe are file redirects.
        assert!(position_line("fi=(2) b.h", PositionKind::FileRedirect, 1).is_some());
        assert!(position_line("fe=(2) b.h", PositionKind::FileRedirect, 1).is_some());
        assert!(position_line("fl=(2) b.h", PositionKind::FileRedirect, 1).is_none());
    }

    #[test]
    fn test_unknown_axis() {
        assert_eq!(unknown_axis("zz= foo"), Some("zz"));
        assert_eq!(unknown_axis("cfe=(1) x"), Some("cfe"));
        assert_eq!(unknown_axis("fl=(1) a.c"), None);
        // Longer keys are not position-shaped at all.
        assert_eq!(unknown_axis("jump=2 13 10"), None);
        assert_eq!(unknown_axis("just text"), None);
    }

    #[test]
    fn test_call_line() {
        let c = call_line("calls=3 20", 1).unwrap().unwrap();
        assert_eq!(c.ncalls, 3);
        assert_eq!(c.sub_positions, vec!["20"]);

        let c = call_line("calls=12 0x10 +4", 1).unwrap().unwrap();
        assert_eq!(c.ncalls, 12);
        assert_eq!(c.sub_positions, vec!["0x10", "+4"]);

        assert!(call_line("10 100", 1).is_none());
        assert!(call_line("calls=x 1", 1).unwrap().is_err());
        assert!(matches!(
            call_line("calls=99999999999999999999 1", 1).unwrap(),
            Err(ParseError::NumericOverflow { .. })
        ));
    }

    #[test]
    fn test_cost_line_arity() {
        assert_eq!(
            cost_line("10 100", 1, 1),
            Some((vec!["10"], vec!["100"]))
        );
        assert_eq!(
            cost_line("+4 +0 1", 2, 1),
            Some((vec!["+4", "+0"], vec!["1"]))
        );
        // Wrong arity is not a cost line.
        assert_eq!(cost_line("10 100", 2, 1), None);
        assert_eq!(cost_line("10", 1, 1), None);
        // Register forms are invalid in the value columns.
        assert_eq!(cost_line("10 *", 1, 1), None);
        assert_eq!(cost_line("10 +5", 1, 1), None);
        // Hex is fine in both.
        assert_eq!(
            cost_line("0x1F 0x1F", 1, 1),
            Some((vec!["0x1F"], vec!["0x1F"]))
        );
        assert_eq!(cost_line("calls=1 5", 1, 1), None);
        // No headers declared yet: nothing is a cost line.
        assert_eq!(cost_line("10 100", 0, 0), None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42", 1).unwrap(), 42);
        assert_eq!(parse_value("0x1F", 1).unwrap(), 31);
        assert_eq!(parse_value("0Xff", 1).unwrap(), 255);
        assert!(matches!(
            parse_value("18446744073709551616", 1),
            Err(ParseError::NumericOverflow { .. })
        ));
    }

    #[test]
    fn test_sub_position_token_shapes() {
        for token in ["*", "+4", "-2", "100", "0x1F"] {
            assert!(is_sub_position_token(token), "{token}");
        }
        for token in ["", "0x", "+-1", "**", "4x"] {
            assert!(!is_sub_position_token(token), "{token}");
        }
    }
}
