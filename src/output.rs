use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::models::{PermitRecord, COLUMNS};

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Writes the final record set as CSV, one row per record, columns exactly
/// the permit record field set. Called only after the full run completes.
pub fn write_csv(path: &Path, records: &[PermitRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    write_row(&mut writer, &header)?;
    for record in records {
        write_row(&mut writer, &record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the `{"records": [...]}` push payload to disk. Always written,
/// even when the push itself is disabled, so the payload can be inspected.
pub fn write_payload(path: &Path, records: &[PermitRecord]) -> Result<()> {
    let payload = json!({ "records": records });
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &payload)
        .with_context(|| format!("Failed to write payload to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_string(row: &[String]) -> String {
        let mut buf = Vec::new();
        write_row(&mut buf, row).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn plain_cells_are_unquoted() {
        let row = vec!["P001".to_string(), "123 Main St".to_string()];
        assert_eq!(row_string(&row), "P001,123 Main St\n");
    }

    #[test]
    fn cells_with_commas_are_quoted() {
        let row = vec!["Smith, Jones & Co".to_string()];
        assert_eq!(row_string(&row), "\"Smith, Jones & Co\"\n");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let row = vec!["the \"Annex\" building".to_string()];
        assert_eq!(row_string(&row), "\"the \"\"Annex\"\" building\"\n");
    }

    #[test]
    fn csv_has_header_plus_one_row_per_record() {
        let dir = std::env::temp_dir().join("permit_harvester_csv_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.csv");

        let record = PermitRecord {
            permit_number: "P001".to_string(),
            address: "123 Main St".to_string(),
            ..Default::default()
        };
        write_csv(&path, &[record]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("permit_number,issue_date,"));
        assert!(lines[1].starts_with("P001,"));
    }

    #[test]
    fn payload_wraps_records_array() {
        let dir = std::env::temp_dir().join("permit_harvester_payload_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("payload.json");

        write_payload(&path, &[PermitRecord::default()]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["records"].as_array().unwrap().len(), 1);
    }
}
