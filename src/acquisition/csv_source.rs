//! Delimited-text dataset loader.
//!
//! Reads the header to learn column names, then parses every field into a
//! [`CellValue`]. Short rows are padded with `Missing` and surplus fields are
//! dropped, so a ragged row surfaces later as a row-level problem instead of
//! failing the batch. Fields are decoded one at a time: bytes that are not
//! UTF-8 become a lossy `Text` cell, which the feature stage rejects for that
//! row only. Only a file that cannot be read as delimited text at all is
//! fatal.

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::Dataset;
use crate::config::defaults;
use crate::error::PipelineError;
use crate::types::{CellValue, Observation};

/// Load a delimited text file with a header row.
pub fn load_csv(path: &Path, delimiter: u8) -> Result<Dataset, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| PipelineError::Dataset(format!("failed to open {}: {e}", path.display())))?;
    let dataset = read_delimited(file, delimiter, &path.display().to_string())?;

    info!(
        file = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns.len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Parse delimited text from any reader. `source` is only used in messages.
pub fn read_delimited<R: std::io::Read>(
    reader: R,
    delimiter: u8,
    source: &str,
) -> Result<Dataset, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| PipelineError::Dataset(format!("failed to read header of {source}: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    if columns.iter().all(String::is_empty) {
        return Err(PipelineError::Dataset(format!("{source} has no header row")));
    }

    let mut seen = HashSet::new();
    for c in &columns {
        if !seen.insert(c.as_str()) {
            warn!(column = %c, "Duplicate column name, last occurrence wins");
        }
    }

    let mut observations = Vec::new();
    let mut ragged = 0usize;

    for (row_idx, record) in rdr.byte_records().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = row_idx + 2;
        let record = record
            .map_err(|e| PipelineError::Dataset(format!("{source} line {line}: {e}")))?;

        if record.iter().all(<[u8]>::is_empty) {
            debug!(line, "Skipping blank line");
            continue;
        }
        if record.len() != columns.len() {
            ragged += 1;
            debug!(line, fields = record.len(), expected = columns.len(), "Ragged row");
        }

        let ordinal = observations.len() + 1;
        let mut obs = Observation::new(ordinal);
        for (idx, column) in columns.iter().enumerate() {
            let value = record.get(idx).map_or(CellValue::Missing, |field| {
                decode_field(field, column == defaults::RUN_ID_COLUMN, line, column)
            });
            obs.insert(column.clone(), value);
        }
        observations.push(obs);
    }

    if ragged > 0 {
        warn!(source = %source, rows = ragged, "Rows with a field count different from the header");
    }

    Ok(Dataset::new(source, columns, observations))
}

fn decode_field(field: &[u8], verbatim: bool, line: usize, column: &str) -> CellValue {
    match std::str::from_utf8(field) {
        Ok(text) if verbatim => CellValue::verbatim(text),
        Ok(text) => CellValue::parse(text),
        Err(_) => {
            warn!(line, column = %column, "Field is not valid UTF-8");
            CellValue::Text(String::from_utf8_lossy(field).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_header_and_rows() {
        let data = "Run_ID,P_0,P_100,A_0,A_100\n1,100000,99980,0.01,0.4\nRun_2,100000,99990,0.02,0.03\n";
        let ds = read_delimited(data.as_bytes(), b',', "mem").expect("parse");

        assert_eq!(ds.columns, ["Run_ID", "P_0", "P_100", "A_0", "A_100"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.observations[0].get("P_100"), &CellValue::Number(99980.0));
        assert_eq!(ds.observations[1].get("Run_ID"), &CellValue::Text("Run_2".into()));
        assert_eq!(ds.observations[1].ordinal, 2);
    }

    #[test]
    fn test_short_row_padded_with_missing() {
        let data = "P_0,P_100,A_0\n1,2\n";
        let ds = read_delimited(data.as_bytes(), b',', "mem").expect("parse");
        assert_eq!(ds.observations[0].get("A_0"), &CellValue::Missing);
    }

    #[test]
    fn test_blank_lines_skipped_and_ordinals_contiguous() {
        let data = "P_0,A_0\n1,0.1\n,\n2,0.2\n";
        let ds = read_delimited(data.as_bytes(), b',', "mem").expect("parse");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.observations[1].ordinal, 2);
    }

    #[test]
    fn test_invalid_utf8_isolated_to_its_row() {
        let data = b"Run_ID,P_0,A_0,A_100\n1,1,0.1,0.2\n2,1,0.1,\xff\n3,1,0.1,0.3\n";
        let ds = read_delimited(&data[..], b',', "mem").expect("parse");

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.observations[0].get("A_100"), &CellValue::Number(0.2));
        assert_eq!(ds.observations[1].get("A_100"), &CellValue::Text("\u{fffd}".into()));
        assert_eq!(ds.observations[2].get("A_100"), &CellValue::Number(0.3));
    }

    #[test]
    fn test_run_id_cells_kept_verbatim() {
        let data = "Run_ID,P_0\n007,1\n1.50,2\n42,3\n";
        let ds = read_delimited(data.as_bytes(), b',', "mem").expect("parse");
        let ids: Vec<String> = ds.observations.iter().map(|o| o.run_id().to_string()).collect();
        assert_eq!(ids, ["007", "1.50", "42"]);
        assert!(ds.find_run("007").is_some());
    }

    #[test]
    fn test_semicolon_delimiter() {
        let data = "P_0;A_0\n1;0.5\n";
        let ds = read_delimited(data.as_bytes(), b';', "mem").expect("parse");
        assert_eq!(ds.observations[0].get("A_0"), &CellValue::Number(0.5));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = load_csv(Path::new("/definitely/not/here.csv"), b',').expect_err("missing");
        assert!(matches!(err, PipelineError::InputNotFound(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "P_0,A_0,Leak_Location").expect("write");
        writeln!(file, "100000,0.3,250").expect("write");

        let ds = load_csv(file.path(), b',').expect("load");
        assert_eq!(ds.observations[0].actual_location(), Some(250.0));
    }
}
