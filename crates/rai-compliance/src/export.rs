//! # Results Export
//!
//! Comma-separated rendering of a results collection. Column order is
//! fixed. Every text field, the header included, is wrapped in double
//! quotes with embedded quotes doubled, whatever its content; confidence
//! is written bare with two decimals. Rows end in `\n`.
//!
//! Exporting an empty collection produces nothing.

use std::path::Path;

use rai_core::ComplianceResultItem;

use crate::error::ExportError;
use crate::results::ResultsCollection;

/// Header labels in column order.
pub const EXPORT_COLUMNS: [&str; 9] = [
    "Standard",
    "Section",
    "Reference",
    "Question",
    "Status",
    "Confidence",
    "Explanation",
    "Evidence",
    "Suggested Disclosure",
];

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn row(item: &ComplianceResultItem) -> String {
    [
        quote(&item.standard),
        quote(&item.section),
        quote(&item.reference),
        quote(&item.question),
        quote(item.status.as_str()),
        format!("{:.2}", item.confidence),
        quote(&item.explanation),
        quote(&item.evidence),
        quote(&item.suggested_disclosure),
    ]
    .join(",")
}

/// Render the collection, or `None` when it is empty.
pub fn export_csv(results: &ResultsCollection) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    let mut out = EXPORT_COLUMNS.map(quote).join(",");
    out.push('\n');
    for item in results.iter() {
        out.push_str(&row(item));
        out.push('\n');
    }
    Some(out)
}

/// Write the export to `path`. Returns `Ok(false)` without touching the
/// file system when there is nothing to export.
pub fn write_csv(results: &ResultsCollection, path: &Path) -> Result<bool, ExportError> {
    let Some(body) = export_csv(results) else {
        return Ok(false);
    };
    std::fs::write(path, body).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_core::DeterminationStatus;

    fn parse(text: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(text.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn tricky() -> ComplianceResultItem {
        let mut r = ComplianceResultItem::new("q1", "IAS 1", DeterminationStatus::No);
        r.section = "Presentation".into();
        r.reference = "IAS 1.54".into();
        r.question = "Does the entity present \"other\" reserves, separately?".into();
        r.confidence = 0.876;
        r.explanation = "Line one\nline two".into();
        r.evidence = "=SUM(A1)".into();
        r.suggested_disclosure = String::new();
        r
    }

    #[test]
    fn empty_collection_exports_nothing() {
        assert_eq!(export_csv(&ResultsCollection::new()), None);
    }

    #[test]
    fn every_text_field_is_quoted() {
        let plain = ComplianceResultItem::new("q2", "IAS 7", DeterminationStatus::Yes);
        let out = export_csv(&ResultsCollection::from_items([plain])).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "\"Standard\",\"Section\",\"Reference\",\"Question\",\"Status\",\"Confidence\",\"Explanation\",\"Evidence\",\"Suggested Disclosure\""
        );
        assert_eq!(lines[1], "\"IAS 7\",\"\",\"\",\"\",\"YES\",0.00,\"\",\"\",\"\"");
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn reparse_reproduces_rows_and_fields() {
        let items = vec![
            tricky(),
            ComplianceResultItem::new("q2", "IAS 7", DeterminationStatus::NotApplicable),
        ];
        let out = export_csv(&ResultsCollection::from_items(items.clone())).unwrap();
        let rows = parse(&out);
        assert_eq!(rows.len(), items.len() + 1);
        assert_eq!(rows[0], EXPORT_COLUMNS.map(String::from).to_vec());
        let first = &rows[1];
        assert_eq!(first.len(), 9);
        assert_eq!(first[3], items[0].question);
        assert_eq!(first[4], "NO");
        assert_eq!(first[5], "0.88");
        assert_eq!(first[6], items[0].explanation);
        assert_eq!(first[7], "=SUM(A1)");
        assert_eq!(rows[2][4], "N/A");
    }

    #[test]
    fn write_csv_skips_empty_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        assert!(!write_csv(&ResultsCollection::new(), &path).unwrap());
        assert!(!path.exists());

        let results = ResultsCollection::from_items([tricky()]);
        assert!(write_csv(&results, &path).unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Some(written), export_csv(&results));
    }

    #[test]
    fn write_csv_reports_io_errors() {
        let results = ResultsCollection::from_items([tricky()]);
        let err = write_csv(&results, Path::new("/nonexistent/dir/out.csv")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
