// Flat-field extraction: one fixed label-anchored pattern per field.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::RequestRecord;

/// Request identifiers are a fixed prefix followed by digits.
const REQUEST_NUMBER_PATTERN: &str = r"RITM\d+";

/// Every label recognized in the export format. Free-text captures stop at
/// the start of any of these, so a value never swallows the next field.
/// Superset of the extracted fields ("Company:" is recognized but not kept).
const KNOWN_LABELS: &[&str] = &[
    "Number:",
    "Request Requested for:",
    "Company:",
    "Opened:",
    "Closed:",
    "Updated to open:",
    "Short description:",
    "Description:",
    "Work notes:",
    "State:",
];

type Setter = fn(&mut RequestRecord, String);

struct FieldRule {
    /// Wire name of the field, as it appears in serialized records.
    name: &'static str,
    regex: Regex,
    /// Residual label fragment to strip off the front of a capture when the
    /// label itself leaked into the value (multi-line source formatting).
    residue: Option<&'static str>,
    set: Setter,
}

// Labels must appear verbatim and case-sensitive; only the spacing between
// label words is allowed to vary (line breaks in the source layout).
fn label_pattern(label: &str) -> String {
    label
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn terminator_pattern() -> String {
    let labels = KNOWN_LABELS
        .iter()
        .map(|l| label_pattern(l))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?:{}|\n|$)", labels)
}

fn free_text_rule(name: &'static str, label: &str, residue: Option<&'static str>, set: Setter) -> FieldRule {
    let pattern = format!(
        r"{}\s*(.*?)\s*{}",
        label_pattern(label),
        terminator_pattern()
    );
    FieldRule {
        name,
        regex: Regex::new(&pattern).unwrap(),
        residue,
        set,
    }
}

static FIELD_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule {
            name: "requestNumber",
            regex: Regex::new(&format!(r"Number:\s*({})", REQUEST_NUMBER_PATTERN)).unwrap(),
            residue: None,
            set: |r, v| r.request_number = v,
        },
        free_text_rule(
            "requestedFor",
            "Request Requested for:",
            Some("Requested for:"),
            |r, v| r.requested_for = v,
        ),
        free_text_rule("openedAt", "Opened:", None, |r, v| r.opened_at = v),
        free_text_rule("closedAt", "Closed:", None, |r, v| r.closed_at = v),
        free_text_rule(
            "updatedToOpen",
            "Updated to open:",
            Some("to open:"),
            |r, v| r.updated_to_open = v,
        ),
        free_text_rule(
            "shortDescription",
            "Short description:",
            Some("description:"),
            |r, v| r.short_description = v,
        ),
        free_text_rule("description", "Description:", None, |r, v| r.description = v),
        free_text_rule("workNotes", "Work notes:", Some("notes:"), |r, v| r.work_notes = v),
        free_text_rule("state", "State:", None, |r, v| r.state = v),
    ]
});

/// Apply every field rule to the document text.
///
/// Returns the partially-populated record (approvals left empty) and the
/// wire names of fields whose label never matched. Absence of a match is
/// not an error; the field stays an empty string.
pub fn extract_fields(text: &str) -> (RequestRecord, Vec<String>) {
    let mut record = RequestRecord::default();
    let mut unmatched = Vec::new();

    for rule in FIELD_RULES.iter() {
        match rule.regex.captures(text) {
            Some(caps) => {
                let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                (rule.set)(&mut record, clean_capture(raw, rule.residue));
            }
            None => unmatched.push(rule.name.to_string()),
        }
    }

    (record, unmatched)
}

// Trim, then strip a leaked label fragment off the front if present.
fn clean_capture(raw: &str, residue: Option<&str>) -> String {
    let value = raw.trim();
    let value = match residue {
        Some(fragment) => value
            .strip_prefix(fragment)
            .map(str::trim_start)
            .unwrap_or(value),
        None => value,
    };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn request_number_matched() {
        let (record, _) = extract_fields("Number: RITM0012345");
        assert_eq!(record.request_number, "RITM0012345");
    }

    #[test]
    fn request_number_requires_prefix() {
        let (record, unmatched) = extract_fields("Number: INC0012345");
        assert_eq!(record.request_number, "");
        assert!(unmatched.contains(&"requestNumber".to_string()));
    }

    #[test]
    fn requested_for_stops_before_next_label() {
        let (record, _) = extract_fields("Request Requested for: Jane Doe Company: Acme");
        assert_eq!(record.requested_for, "Jane Doe");
    }

    #[test]
    fn requested_for_stops_at_newline() {
        let (record, _) = extract_fields("Request Requested for: Jane Doe\nsecond page");
        assert_eq!(record.requested_for, "Jane Doe");
    }

    #[test]
    fn leaked_label_fragment_stripped() {
        let (record, _) =
            extract_fields("Request Requested for: Requested for: Jane Doe Company: Acme");
        assert_eq!(record.requested_for, "Jane Doe");
    }

    #[test]
    fn labels_are_case_sensitive() {
        let (record, unmatched) = extract_fields("state: approved");
        assert_eq!(record.state, "");
        assert!(unmatched.contains(&"state".to_string()));
    }

    #[test]
    fn short_description_does_not_leak_into_description() {
        let text = "Short description: Badge access Description: Badge access for contractor State: Approved";
        let (record, _) = extract_fields(text);
        assert_eq!(record.short_description, "Badge access");
        assert_eq!(record.description, "Badge access for contractor");
        assert_eq!(record.state, "Approved");
    }

    #[rstest]
    #[case("Opened: 2024-01-02 08:00:00", "2024-01-02 08:00:00")]
    #[case("Opened: yesterday morning\n", "yesterday morning")]
    fn dates_kept_verbatim(#[case] text: &str, #[case] expected: &str) {
        // No normalization: date strings pass through as they appear.
        let (record, _) = extract_fields(text);
        assert_eq!(record.opened_at, expected);
    }

    #[test]
    fn no_labels_means_all_defaults_and_full_unmatched_list() {
        let (record, unmatched) = extract_fields("nothing recognizable here");
        assert_eq!(record, RequestRecord::default());
        assert_eq!(unmatched.len(), FIELD_RULES.len());
    }

    #[test]
    fn value_at_end_of_text_without_newline() {
        let (record, _) = extract_fields("State: Pending");
        assert_eq!(record.state, "Pending");
    }
}
