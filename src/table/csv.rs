//! CSV import and export for local tables.

use std::io::Write;
use std::path::Path;

use super::{LocalTable, Value};
use crate::error::{ErrorCode, Result, TableError};

fn csv_error(path: &Path, message: &str, err: ::csv::Error) -> TableError {
    TableError::io_with_code(ErrorCode::IO_CSV, message, Some(path.to_path_buf())).with_source(err)
}

/// Read a CSV file with a header row into a table keyed by `pkey`.
///
/// Cells are typed by [`Value::parse`].
pub fn read_csv<S: AsRef<str>>(path: &Path, pkey: &[S]) -> Result<LocalTable> {
    let mut reader =
        ::csv::Reader::from_path(path).map_err(|e| csv_error(path, "cannot open CSV file", e))?;
    let names: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, "cannot read CSV header", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, "malformed CSV record", e))?;
        rows.push(record.iter().map(|cell| Value::parse(cell.trim())).collect());
    }

    let pkey: Vec<String> = pkey.iter().map(|k| k.as_ref().to_string()).collect();
    LocalTable::from_rows(names.as_slice(), rows, pkey.as_slice())
        .map_err(|e| e.with_context(path.display()))
}

/// Write a table as CSV with a header row.
pub fn write_csv<W: Write>(table: &LocalTable, writer: W) -> std::result::Result<(), ::csv::Error> {
    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(table.schema().names())?;
    for row in table.rows() {
        out.write_record(row.iter().map(|v| v.to_string()))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_csv_types_and_sorts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,price,label").unwrap();
        writeln!(file, "2,1.5,b").unwrap();
        writeln!(file, "1,3,").unwrap();
        file.flush().unwrap();

        let table = read_csv(file.path(), &["id"]).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("id").unwrap(), &[Value::Int(1), Value::Int(2)]);
        assert_eq!(table.column("price").unwrap()[0], Value::Float(3.0));
        assert!(table.column("label").unwrap()[0].is_null());
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("/nonexistent/rows.csv"), &["id"]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IO_CSV);
    }

    #[test]
    fn test_write_csv() {
        let table = LocalTable::from_rows(
            &["id", "v"],
            vec![vec![Value::Int(1), Value::str("x")]],
            &["id"],
        )
        .unwrap();
        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "id,v\n1,x\n");
    }
}
