// Approval-table extraction: marker-line scan with a fixed row window.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::APPROVAL_WINDOW;
use crate::types::{ApprovalEntry, SkipReason, SkippedApproval};

/// Literal status token that identifies a line as an approval-table row.
pub const APPROVAL_MARKER: &str = "Approved";

// Two consecutive `YYYY-MM-DD HH:MM:SS` timestamps close out an approval row.
static TIMESTAMP_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\s+(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})")
        .unwrap()
});

/// Tagged result of one approval scan: the entries that parsed, in order of
/// appearance, and every candidate line that produced no entry.
#[derive(Debug, Clone, Default)]
pub struct ApprovalScan {
    pub entries: Vec<ApprovalEntry>,
    pub skipped: Vec<SkippedApproval>,
}

/// Scan the document text for approval-table rows.
///
/// Candidate lines are those containing the marker token, trimmed, in
/// document order. The export layout places a header row first, so the scan
/// skips the first candidate and parses the fixed window after it.
/// Candidates beyond the window and candidates without a timestamp pair
/// produce no entry; all of them are reported in `skipped`.
pub fn extract_approvals(text: &str) -> ApprovalScan {
    let candidates: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.contains(APPROVAL_MARKER))
        .collect();

    let mut scan = ApprovalScan::default();

    for (idx, line) in candidates.iter().enumerate() {
        let reason = if idx == 0 {
            Some(SkipReason::AssumedHeader)
        } else if idx > APPROVAL_WINDOW {
            Some(SkipReason::OutsideWindow)
        } else {
            None
        };

        if let Some(reason) = reason {
            scan.skipped.push(SkippedApproval {
                line: line.to_string(),
                reason,
            });
            continue;
        }

        match parse_approval_line(line) {
            Some(entry) => scan.entries.push(entry),
            None => scan.skipped.push(SkippedApproval {
                line: line.to_string(),
                reason: SkipReason::MissingTimestampPair,
            }),
        }
    }

    scan
}

/// Parse one approval row.
///
/// Everything after the marker token is searched for the timestamp pair;
/// the tokens between marker and first timestamp split into approver (first
/// two) and item (the rest).
fn parse_approval_line(line: &str) -> Option<ApprovalEntry> {
    let (_, rest) = line.split_once(APPROVAL_MARKER)?;

    let caps = TIMESTAMP_PAIR.captures(rest)?;
    let pair_start = caps.get(0)?.start();

    let tokens: Vec<&str> = rest[..pair_start].split_whitespace().collect();
    let approver = tokens.iter().take(2).copied().collect::<Vec<_>>().join(" ");
    let item = tokens.iter().skip(2).copied().collect::<Vec<_>>().join(" ");

    Some(ApprovalEntry {
        state: APPROVAL_MARKER.to_string(),
        approver,
        item,
        created: caps[1].to_string(),
        created_original: caps[2].to_string(),
    })
}
