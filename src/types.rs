// Core record types shared across the extraction pipeline and storage.

use serde::{Deserialize, Serialize};

/// Structured output of parsing one request document.
///
/// Every flat field defaults to an empty string when its label is absent
/// from the source text; `approvals` defaults to empty. Consumers never
/// branch on presence vs. absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestRecord {
    pub request_number: String,
    pub requested_for: String,
    pub opened_at: String,
    pub closed_at: String,
    pub updated_to_open: String,
    pub short_description: String,
    pub description: String,
    pub work_notes: String,
    pub state: String,
    pub approvals: Vec<ApprovalEntry>,
}

/// One row of the approval table embedded in the document text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalEntry {
    pub state: String,
    pub approver: String,
    pub item: String,
    pub created: String,
    pub created_original: String,
}

/// Why an approval candidate line produced no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// First marker line; assumed to be the table header row.
    AssumedHeader,
    /// Line falls outside the fixed extraction window.
    OutsideWindow,
    /// No consecutive timestamp pair found after the marker token.
    MissingTimestampPair,
}

/// A candidate approval line that produced no entry, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedApproval {
    pub line: String,
    pub reason: SkipReason,
}

/// Extraction quality signals: which labels never matched, and what
/// happened to each approval candidate line that produced no entry.
///
/// The record shape is unaffected by any of this. Diagnostics exist so a
/// caller can tell "no approvals in document" from "approvals present but
/// unparseable", and can spot template drift that would otherwise just
/// show up as blank fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseDiagnostics {
    pub unmatched_fields: Vec<String>,
    pub skipped_approvals: Vec<SkippedApproval>,
}

impl ParseDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.unmatched_fields.is_empty() && self.skipped_approvals.is_empty()
    }
}

/// Parsed record plus its diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub record: RequestRecord,
    pub diagnostics: ParseDiagnostics,
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid input: document text is empty")]
    EmptyInput,
}
