//! CSV table report adapter.

use crate::domain::error::BandtestError;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::fs::File;
use std::io::Write;

/// Writes a `date` column followed by one column per series. Undefined (NaN)
/// values become empty cells.
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Write the table to any sink, e.g. stdout.
    pub fn write_to<W: Write>(
        &self,
        sink: W,
        dates: &[NaiveDate],
        columns: &[(&str, &[f64])],
    ) -> Result<(), BandtestError> {
        for (name, values) in columns {
            if values.len() != dates.len() {
                return Err(BandtestError::ColumnLength {
                    name: name.to_string(),
                    expected: dates.len(),
                    actual: values.len(),
                });
            }
        }

        let mut wtr = csv::Writer::from_writer(sink);
        let csv_err = |e: csv::Error| BandtestError::Data {
            reason: format!("CSV write error: {}", e),
        };

        let mut header = vec!["date".to_string()];
        header.extend(columns.iter().map(|(name, _)| name.to_string()));
        wtr.write_record(&header).map_err(csv_err)?;

        for (i, date) in dates.iter().enumerate() {
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(date.format("%Y-%m-%d").to_string());
            for (_, values) in columns {
                let v = values[i];
                row.push(if v.is_nan() { String::new() } else { v.to_string() });
            }
            wtr.write_record(&row).map_err(csv_err)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_table(
        &self,
        dates: &[NaiveDate],
        columns: &[(&str, &[f64])],
        output_path: &str,
    ) -> Result<(), BandtestError> {
        let file = File::create(output_path)?;
        self.write_to(file, dates, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dates() -> Vec<NaiveDate> {
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        ]
    }

    #[test]
    fn writes_header_and_rows() {
        let ma = [f64::NAN, 10.5];
        let equity = [1.0, 1.25];
        let mut out = Vec::new();
        CsvReportAdapter::new()
            .write_to(&mut out, &dates(), &[("MA(2)", &ma[..]), ("hold", &equity[..])])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,MA(2),hold");
        assert_eq!(lines[1], "2024-01-02,,1");
        assert_eq!(lines[2], "2024-01-03,10.5,1.25");
    }

    #[test]
    fn rejects_misaligned_column() {
        let short = [1.0];
        let mut out = Vec::new();
        let err = CsvReportAdapter::new()
            .write_to(&mut out, &dates(), &[("x", &short[..])])
            .unwrap_err();
        assert!(matches!(err, BandtestError::ColumnLength { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn write_table_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let values = [1.0, 2.0];
        CsvReportAdapter::new()
            .write_table(&dates(), &[("v", &values[..])], path.to_str().unwrap())
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,v\n"));
        assert_eq!(text.lines().count(), 3);
    }
}
