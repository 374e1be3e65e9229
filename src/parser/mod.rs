// Request-document parsing pipeline
pub mod approvals;
pub mod fields;

pub use approvals::{extract_approvals, ApprovalScan, APPROVAL_MARKER};
pub use fields::extract_fields;

use tracing::{debug, warn};

use crate::types::{ParseDiagnostics, ParseError, ParseOutcome};

/// Parse the text of one request document into a structured record.
///
/// Runs the flat-field pass and the approval-block pass over the same text
/// and assembles the result. A pure function of its input: the same text
/// always produces an identical outcome, and no state is kept between
/// calls. Fails only on empty or whitespace-only input; anything else
/// degrades to default (empty) fields rather than erroring.
pub fn parse_request(text: &str) -> Result<ParseOutcome, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let (mut record, unmatched_fields) = fields::extract_fields(text);
    let scan = approvals::extract_approvals(text);
    record.approvals = scan.entries;

    if !unmatched_fields.is_empty() {
        warn!(fields = ?unmatched_fields, "no label match for some fields");
    }
    for skipped in &scan.skipped {
        debug!(reason = ?skipped.reason, line = %skipped.line, "approval candidate dropped");
    }

    Ok(ParseOutcome {
        record,
        diagnostics: ParseDiagnostics {
            unmatched_fields,
            skipped_approvals: scan.skipped,
        },
    })
}
