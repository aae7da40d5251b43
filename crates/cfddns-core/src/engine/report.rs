//! Outcome of one reconciliation pass

use crate::types::{DnsRecord, RecordKey, RecordType};
use serde::Serialize;
use std::fmt;

/// Kind of mutation applied to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
        })
    }
}

/// A mutation that reached the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedAction {
    pub action: Action,
    pub record: DnsRecord,
}

/// Why a group was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// More than one CNAME content requested for one name
    CnameMultiple,
    /// CNAME requested where A/AAAA records exist, or the reverse
    CnameConflict,
    /// CNAME creation requested where a different CNAME already exists
    CnameTaken,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CnameMultiple => f.write_str("only one CNAME record is permitted per name"),
            SkipReason::CnameConflict => {
                f.write_str("a CNAME record cannot coexist with A/AAAA records at the same name")
            }
            SkipReason::CnameTaken => f.write_str("the name already holds a different CNAME record"),
        }
    }
}

/// `(name, type)` group of a pass
///
/// `record_type` is `None` when the group covers a whole name or zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: Option<RecordType>,
}

impl GroupRef {
    pub fn new(name: impl Into<String>, record_type: Option<RecordType>) -> Self {
        Self {
            name: name.into(),
            record_type,
        }
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record_type {
            Some(record_type) => write!(f, "[{}, {}]", self.name, record_type),
            None => write!(f, "[{}]", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGroup {
    pub group: GroupRef,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedGroup {
    pub group: GroupRef,
    pub error: String,
}

/// Everything one pass did, kept, skipped or failed to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub applied: Vec<AppliedAction>,
    pub kept: Vec<RecordKey>,
    pub skipped: Vec<SkippedGroup>,
    pub failed: Vec<FailedGroup>,
}

impl ReconcileReport {
    /// Whether every group completed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of create/update/delete calls that succeeded
    pub fn mutation_count(&self) -> usize {
        self.applied.len()
    }

    /// Records touched by one kind of action
    pub fn records(&self, action: Action) -> impl Iterator<Item = &DnsRecord> {
        self.applied
            .iter()
            .filter(move |applied| applied.action == action)
            .map(|applied| &applied.record)
    }

    pub(crate) fn applied(&mut self, action: Action, record: DnsRecord) {
        self.applied.push(AppliedAction { action, record });
    }

    pub(crate) fn skip(&mut self, group: GroupRef, reason: SkipReason) {
        self.skipped.push(SkippedGroup { group, reason });
    }

    pub(crate) fn fail(&mut self, group: GroupRef, error: &crate::Error) {
        self.failed.push(FailedGroup {
            group,
            error: error.to_string(),
        });
    }
}
