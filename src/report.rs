// Report export for stored requests
use anyhow::Result;
use serde::Serialize;

use crate::storage::StoredRequest;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// One report row: the columns the access-request report carries.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRow<'a> {
    request_number: &'a str,
    requested_for: &'a str,
    state: &'a str,
    uploaded_at: &'a str,
    description: &'a str,
    work_notes: &'a str,
}

impl<'a> ExportRow<'a> {
    fn from_stored(stored: &'a StoredRequest) -> Self {
        Self {
            request_number: &stored.record.request_number,
            requested_for: &stored.record.requested_for,
            state: &stored.record.state,
            uploaded_at: &stored.meta.uploaded_at,
            description: &stored.record.description,
            work_notes: &stored.record.work_notes,
        }
    }
}

const CSV_HEADER: &str = "Request Number,Requested For,Status,Uploaded,Description,Work Notes";

/// Render stored requests as a report in the given format.
pub fn render(requests: &[StoredRequest], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => Ok(render_csv(requests)),
        ExportFormat::Json => {
            let rows: Vec<ExportRow> = requests.iter().map(ExportRow::from_stored).collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
    }
}

fn render_csv(requests: &[StoredRequest]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for stored in requests {
        let row = ExportRow::from_stored(stored);
        let cells = [
            row.request_number,
            row.requested_for,
            row.state,
            row.uploaded_at,
            row.description,
            row.work_notes,
        ];
        let line = cells
            .iter()
            .map(|cell| csv_escape(cell))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }

    out
}

// Quote a cell when it contains a delimiter, quote, or line break.
fn csv_escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RequestMeta;
    use crate::types::RequestRecord;

    fn stored(number: &str, description: &str) -> StoredRequest {
        StoredRequest {
            id: 1,
            record: RequestRecord {
                request_number: number.into(),
                requested_for: "Jane Doe".into(),
                state: "Approved".into(),
                description: description.into(),
                ..Default::default()
            },
            meta: RequestMeta {
                uploaded_by: "desk".into(),
                file_name: "r.pdf".into(),
                uploaded_at: "2024-01-10T12:00:00Z".into(),
            },
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let out = render(&[stored("RITM0012345", "Badge access")], ExportFormat::Csv).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("RITM0012345,Jane Doe,Approved,2024-01-10T12:00:00Z,Badge access,")
        );
    }

    #[test]
    fn csv_quotes_delimiters_and_quotes() {
        let out = render(
            &[stored("RITM1", "visitor, with \"escort\"")],
            ExportFormat::Csv,
        )
        .unwrap();
        assert!(out.contains("\"visitor, with \"\"escort\"\"\""));
    }

    #[test]
    fn json_rows_carry_wire_names() {
        let out = render(&[stored("RITM1", "desc")], ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["requestNumber"], "RITM1");
        assert_eq!(value[0]["workNotes"], "");
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let out = render(&[], ExportFormat::Csv).unwrap();
        assert_eq!(out, format!("{}\n", CSV_HEADER));
    }
}
