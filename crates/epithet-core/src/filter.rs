//! Reusable predicate + ordering + slicing over the index set.
//!
//! Several strategies and the settings targeting share this: keep the
//! indexes owned by a set of aliases, sort them by routing key descending,
//! and optionally take a python-style `start:stop` sub-range. Slicing is
//! only meaningful on a sorted sequence, so requesting a slice over indexes
//! that lack routing is a configuration error, not a silent default.

use std::collections::BTreeSet;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::IndexRecord;

/// A parsed `start:stop` slice expression with python negative-index
/// semantics. A bare value without a colon is a start-only slice
/// (`"-1"` ≡ `"-1:"`, i.e. the last element).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceExpr {
    start: Option<i64>,
    stop: Option<i64>,
}

impl SliceExpr {
    /// Parse a slice expression. `context` names the alias or settings group
    /// for error attribution.
    pub fn parse(input: &str, context: &str) -> SchemaResult<Self> {
        let parse_bound = |bound: &str| -> SchemaResult<Option<i64>> {
            if bound.is_empty() {
                return Ok(None);
            }
            bound.parse::<i64>().map(Some).map_err(|_| {
                SchemaError::invalid_config(
                    context,
                    format!("invalid slice bound {bound:?} in {input:?}"),
                )
            })
        };

        match input.split_once(':') {
            Some((start, stop)) => {
                if stop.contains(':') {
                    return Err(SchemaError::invalid_config(
                        context,
                        format!("slice {input:?} has too many ':' separators"),
                    ));
                }
                Ok(Self {
                    start: parse_bound(start)?,
                    stop: parse_bound(stop)?,
                })
            }
            None => Ok(Self {
                start: parse_bound(input)?,
                stop: None,
            }),
        }
    }

    /// Resolve the slice against a sequence of `len` elements, returning the
    /// half-open `[start, stop)` range (possibly empty).
    #[must_use]
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let clamp = |bound: i64| -> usize {
            let resolved = if bound < 0 { bound + len as i64 } else { bound };
            resolved.clamp(0, len as i64) as usize
        };
        let start = self.start.map_or(0, clamp);
        let stop = self.stop.map_or(len, clamp);
        (start, stop.max(start))
    }
}

/// The filter itself: optional owning-alias predicate plus optional slice.
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    aliases: Option<BTreeSet<String>>,
    slice: Option<SliceExpr>,
}

impl IndexFilter {
    /// Build a filter. `context` attributes parse errors.
    pub fn new(
        aliases: Option<&[String]>,
        slice: Option<&str>,
        context: &str,
    ) -> SchemaResult<Self> {
        let slice = match slice {
            Some(expr) => Some(SliceExpr::parse(expr, context)?),
            None => None,
        };
        Ok(Self {
            aliases: aliases.map(|names| names.iter().cloned().collect()),
            slice,
        })
    }

    /// Apply the filter: predicate, then routing-descending sort (skipped if
    /// any survivor lacks routing), then slice.
    pub fn apply(
        &self,
        indexes: &[IndexRecord],
        context: &str,
    ) -> SchemaResult<Vec<IndexRecord>> {
        let mut survivors: Vec<IndexRecord> = indexes
            .iter()
            .filter(|index| match &self.aliases {
                Some(owners) => index
                    .alias
                    .as_deref()
                    .is_some_and(|owner| owners.contains(owner)),
                None => true,
            })
            .cloned()
            .collect();

        let sortable = survivors.iter().all(|index| index.routing.is_some());
        if sortable {
            survivors.sort_by(|a, b| b.routing.cmp(&a.routing));
        }

        if let Some(slice) = &self.slice {
            if !sortable {
                return Err(SchemaError::invalid_config(
                    context,
                    "indexes must use routing to be sliced",
                ));
            }
            let (start, stop) = slice.bounds(survivors.len());
            survivors = survivors[start..stop].to_vec();
        }
        Ok(survivors)
    }
}
