//! Compression Caches for Position Names
//!
//! Callgrind shortens repeated names by binding them to integer indices:
//! `fl=(1) a.c` binds, a later `fl=(1)` reuses. The three dictionaries
//! (object, file, symbol) are independent and write-once.
//!
//! @module profile/compress

use std::collections::HashMap;

use crate::error::{ParseError, Result};
use crate::profile::lexer::Axis;

/// Which of the three dictionaries a position axis decodes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Object,
    File,
    Symbol,
}

impl CacheKind {
    /// Cache selection by axis; call axes share the cache of their plain
    /// forms.
    pub fn for_axis(axis: Axis) -> CacheKind {
        match axis {
            Axis::Ob | Axis::Cob => CacheKind::Object,
            Axis::Fl | Axis::Fi | Axis::Fe | Axis::Cfl | Axis::Cfi => CacheKind::File,
            Axis::Fn | Axis::Cfn => CacheKind::Symbol,
        }
    }
}

/// The three index-to-name dictionaries.
#[derive(Debug, Default)]
pub struct CompressionCaches {
    object: HashMap<u64, String>,
    file: HashMap<u64, String>,
    symbol: HashMap<u64, String>,
}

impl CompressionCaches {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self, kind: CacheKind) -> &HashMap<u64, String> {
        match kind {
            CacheKind::Object => &self.object,
            CacheKind::File => &self.file,
            CacheKind::Symbol => &self.symbol,
        }
    }

    fn cache_mut(&mut self, kind: CacheKind) -> &mut HashMap<u64, String> {
        match kind {
            CacheKind::Object => &mut self.object,
            CacheKind::File => &mut self.file,
            CacheKind::Symbol => &mut self.symbol,
        }
    }

    /// Resolves a position-line body to its name.
    ///
    /// `(N) name` binds and yields `name`; `(N)` alone looks the index up;
    /// a bare name passes through. Rebinding a bound index and looking up
    /// an unbound one are fatal, as is a body with neither index nor name.
    pub fn resolve(
        &mut self,
        axis: Axis,
        index: Option<u64>,
        name: Option<&str>,
        line: u64,
    ) -> Result<String> {
        let kind = CacheKind::for_axis(axis);
        match (index, name) {
            (None, Some(name)) => Ok(name.to_string()),
            (Some(index), Some(name)) => {
                let cache = self.cache_mut(kind);
                if cache.contains_key(&index) {
                    return Err(ParseError::DuplicateCompressionEntry { line, index });
                }
                cache.insert(index, name.to_string());
                Ok(name.to_string())
            }
            (Some(index), None) => {
                self.cache(kind)
                    .get(&index)
                    .cloned()
                    .ok_or_else(|| ParseError::MissingCompressionEntry {
                        line,
                        axis: axis.as_str().to_string(),
                        index: Some(index),
                    })
            }
            (None, None) => Err(ParseError::MissingCompressionEntry {
                line,
                axis: axis.as_str().to_string(),
                index: None,
            }),
        }
    }

    /// Distinct bindings across the three dictionaries.
    pub fn len(&self) -> usize {
        self.object.len() + self.file.len() + self.symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
