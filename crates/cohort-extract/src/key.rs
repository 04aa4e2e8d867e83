//! Canonical row keys and the rules that build them from rosters and sources.
use std::fmt;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::io::RawTable;

/// One observation: a subject, or a subject at a given session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowKey {
    Subject(String),
    Session { subject: String, session: String },
}

impl RowKey {
    pub fn subject(id: impl Into<String>) -> Self {
        RowKey::Subject(id.into())
    }

    pub fn session(subject: impl Into<String>, session: impl Into<String>) -> Self {
        RowKey::Session {
            subject: subject.into(),
            session: session.into(),
        }
    }

    /// Same subject at another session. Single-subject keys have no sessions.
    pub fn at_session(&self, session: &str) -> Option<RowKey> {
        match self {
            RowKey::Subject(_) => None,
            RowKey::Session { subject, .. } => Some(RowKey::session(subject.clone(), session)),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowKey::Subject(id) => write!(f, "{}", id),
            RowKey::Session { subject, session } => write!(f, "{}/{}", subject, session),
        }
    }
}

/// A column picked by zero-based position or by header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    /// Resolve against a header row. A column that is not there is a schema
    /// error, never a skipped variable.
    pub fn resolve(&self, headers: &StringRecord, source_id: &str) -> Result<usize> {
        let found = match self {
            ColumnRef::Index(idx) => (*idx < headers.len()).then_some(*idx),
            ColumnRef::Name(name) => headers.iter().position(|h| h.trim() == name),
        };
        found.ok_or_else(|| ExtractError::MissingColumn {
            source_id: source_id.to_string(),
            column: self.to_string(),
            available: headers.len(),
        })
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnRef::Index(idx) => write!(f, "#{}", idx),
            ColumnRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// How a source file spells its row key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRule {
    Subject {
        column: ColumnRef,
    },
    /// Subject and visit codes in separate columns, each given a prefix.
    SubjectSession {
        subject: ColumnRef,
        session: ColumnRef,
        subject_prefix: String,
        session_prefix: String,
    },
}

/// A [`KeyRule`] resolved against one source's header.
#[derive(Debug, Clone)]
pub struct BoundKeyRule<'a> {
    rule: &'a KeyRule,
    subject_idx: usize,
    session_idx: Option<usize>,
}

impl KeyRule {
    pub fn bind(&self, headers: &StringRecord, source_id: &str) -> Result<BoundKeyRule<'_>> {
        let (subject_idx, session_idx) = match self {
            KeyRule::Subject { column } => (column.resolve(headers, source_id)?, None),
            KeyRule::SubjectSession { subject, session, .. } => (
                subject.resolve(headers, source_id)?,
                Some(session.resolve(headers, source_id)?),
            ),
        };
        Ok(BoundKeyRule {
            rule: self,
            subject_idx,
            session_idx,
        })
    }
}

impl BoundKeyRule<'_> {
    /// `None` when any key part is missing on this row.
    pub fn key(&self, record: &StringRecord) -> Option<RowKey> {
        let subject = present(record.get(self.subject_idx))?;
        match (self.rule, self.session_idx) {
            (
                KeyRule::SubjectSession {
                    subject_prefix,
                    session_prefix,
                    ..
                },
                Some(session_idx),
            ) => {
                let session = present(record.get(session_idx))?;
                Some(RowKey::session(
                    format!("{}{}", subject_prefix, subject),
                    format!("{}{}", session_prefix, session),
                ))
            }
            _ => Some(RowKey::subject(subject)),
        }
    }
}

fn present(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| !crate::value::is_missing_token(s))
}

/// Layout of a roster file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterFormat {
    /// Headerless, one subject id per line.
    Plain,
    /// Headerless numeric ids rendered as `Sub<NNNN>_S1`.
    GspNumeric,
    /// Header row, then subject and session in the first two columns.
    SubjectSession,
}

impl RosterFormat {
    pub fn has_header(&self) -> bool {
        matches!(self, RosterFormat::SubjectSession)
    }

    /// Keys in roster order.
    pub fn keys(&self, raw: &RawTable) -> Result<Vec<RowKey>> {
        let mut keys = Vec::with_capacity(raw.rows.len());
        for (row_idx, record) in raw.rows.iter().enumerate() {
            let Some(first) = present(record.get(0)) else {
                continue;
            };
            let key = match self {
                RosterFormat::Plain => RowKey::subject(first),
                RosterFormat::GspNumeric => RowKey::subject(gsp_subject_key(first)),
                RosterFormat::SubjectSession => {
                    let session = present(record.get(1)).ok_or_else(|| {
                        ExtractError::Roster(format!(
                            "row {} has a subject but no session",
                            row_idx + 1
                        ))
                    })?;
                    RowKey::session(first, session)
                }
            };
            keys.push(key);
        }
        if keys.is_empty() {
            return Err(ExtractError::Roster("roster lists no subjects".to_string()));
        }
        Ok(keys)
    }
}

/// `7` -> `Sub0007_S1`; ids already in that form are kept.
pub fn gsp_subject_key(raw: &str) -> String {
    match raw.trim().parse::<u32>() {
        Ok(n) => format!("Sub{:04}_S1", n),
        Err(_) => raw.trim().to_string(),
    }
}
