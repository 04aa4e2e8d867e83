//! Column joiner: pull one (key, value) column out of a raw source, coerce and
//! deduplicate it, and merge it into the accumulator.
//!
//! Single-key cohorts match keys exactly, which makes the merge a
//! left-order-preserving inner join. Longitudinal cohorts go through
//! [`resolve`], which may fall back to a baseline session.
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::io::RawTable;
use crate::key::{ColumnRef, KeyRule, RowKey};
use crate::table::Table;
use crate::value::{coerce, is_missing_token, Transform, Value, ValueKind};

/// One variable: which source, which key and value columns, which type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    pub source: String,
    pub key: KeyRule,
    pub column: ColumnRef,
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl VariableSpec {
    pub fn new(name: &str, source: &str, key: KeyRule, column: ColumnRef, kind: ValueKind) -> Self {
        VariableSpec {
            name: name.to_string(),
            source: source.to_string(),
            key,
            column,
            kind,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// How accumulator keys are looked up in a source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatching {
    Exact,
    /// Try the row's own session, then `session` for the same subject.
    SessionFallback { session: String },
}

/// What happens to a session with no value at its own visit or at the
/// fallback session. Only consulted under [`KeyMatching::SessionFallback`];
/// exact matching is always an inner join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// The row stays with an explicit [`Value::Missing`] cell.
    #[default]
    Keep,
    /// The row leaves the accumulator.
    Drop,
}

/// A deduplicated key -> value view of one source column.
#[derive(Debug, Clone, Default)]
pub struct ColumnLookup {
    values: HashMap<RowKey, Value>,
    /// Data rows scanned.
    pub rows_read: usize,
    /// Rows without a key or a usable value.
    pub dropped: usize,
    /// Later rows for an already-seen key.
    pub duplicates: usize,
}

impl ColumnLookup {
    /// Extract `spec` from `raw`. Rows are scanned in file order and the first
    /// usable value for a key wins.
    pub fn extract(raw: &RawTable, spec: &VariableSpec) -> Result<Self> {
        let key_rule = spec.key.bind(&raw.headers, &spec.source)?;
        let value_idx = spec.column.resolve(&raw.headers, &spec.source)?;

        let mut lookup = ColumnLookup::default();
        let mut present = 0usize;
        let mut failed = 0usize;

        for record in &raw.rows {
            lookup.rows_read += 1;
            let Some(key) = key_rule.key(record) else {
                lookup.dropped += 1;
                continue;
            };

            let cell = record.get(value_idx).unwrap_or("");
            if !is_missing_token(cell) {
                present += 1;
            }
            let value = coerce(cell, spec.kind)
                .and_then(|v| match spec.transform {
                    Some(t) => t.apply(v),
                    None => Some(v),
                });
            let Some(value) = value else {
                if !is_missing_token(cell) {
                    failed += 1;
                }
                lookup.dropped += 1;
                continue;
            };

            match lookup.values.entry(key) {
                Entry::Occupied(_) => lookup.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }

        if present > 0 && failed == present {
            return Err(ExtractError::ColumnCoercion {
                source_id: spec.source.clone(),
                column: spec.column.to_string(),
                kind: spec.kind.to_string(),
                failed,
            });
        }

        Ok(lookup)
    }

    /// Build directly from (key, value) pairs, first pair per key wins.
    pub fn from_pairs<I: IntoIterator<Item = (RowKey, Value)>>(pairs: I) -> Self {
        let mut lookup = ColumnLookup::default();
        for (key, value) in pairs {
            lookup.rows_read += 1;
            match lookup.values.entry(key) {
                Entry::Occupied(_) => lookup.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
        lookup
    }

    pub fn get(&self, key: &RowKey) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of looking one accumulator key up.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Direct(Value),
    Fallback(Value),
    Unresolved,
}

impl Resolution {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Direct(v) | Resolution::Fallback(v) => Some(v),
            Resolution::Unresolved => None,
        }
    }
}

/// Value for `key`: its own record first, then the `fallback_session` record
/// of the same subject. Blank cells never reach the lookup, so a blank direct
/// record falls through to the fallback.
pub fn resolve(key: &RowKey, lookup: &ColumnLookup, fallback_session: Option<&str>) -> Resolution {
    if let Some(v) = lookup.get(key) {
        return Resolution::Direct(v.clone());
    }
    fallback_session
        .and_then(|session| key.at_session(session))
        .filter(|fallback| fallback != key)
        .and_then(|fallback| lookup.get(&fallback).cloned())
        .map_or(Resolution::Unresolved, Resolution::Fallback)
}

/// Row counts for one join, in the order joins happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub column: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub dropped_source_rows: usize,
    pub duplicates: usize,
    pub fallbacks: usize,
    /// Sessions with no value at their own visit or the fallback. Always 0
    /// for exact matching, where a miss is ordinary narrowing.
    pub unresolved: usize,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: Table,
    pub step: JoinStep,
}

/// Merge `lookup` into `acc` as column `name`, returning a new table.
/// Exact matching drops every row without a value whatever `policy` says.
pub fn join(
    acc: &Table,
    lookup: &ColumnLookup,
    name: &str,
    matching: &KeyMatching,
    policy: UnresolvedPolicy,
) -> Result<JoinOutcome> {
    let (fallback_session, policy) = match matching {
        KeyMatching::Exact => (None, UnresolvedPolicy::Drop),
        KeyMatching::SessionFallback { session } => (Some(session.as_str()), policy),
    };

    let mut fallbacks = 0usize;
    let mut unresolved = 0usize;
    let cells: Vec<Option<Value>> = acc
        .keys()
        .iter()
        .map(|key| match resolve(key, lookup, fallback_session) {
            Resolution::Direct(v) => Some(v),
            Resolution::Fallback(v) => {
                fallbacks += 1;
                Some(v)
            }
            Resolution::Unresolved => {
                if fallback_session.is_some() {
                    unresolved += 1;
                }
                match policy {
                    UnresolvedPolicy::Drop => None,
                    UnresolvedPolicy::Keep => Some(Value::Missing),
                }
            }
        })
        .collect();

    let table = acc.narrow_with(name, cells)?;
    let step = JoinStep {
        column: name.to_string(),
        rows_before: acc.len(),
        rows_after: table.len(),
        dropped_source_rows: lookup.dropped,
        duplicates: lookup.duplicates,
        fallbacks,
        unresolved,
    };
    Ok(JoinOutcome { table, step })
}
