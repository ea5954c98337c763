//! Report output port trait.

use crate::domain::error::BandtestError;
use chrono::NaiveDate;

/// Port for writing date-aligned series tables (indicator columns, equity
/// curves).
pub trait ReportPort {
    /// Every column must have one value per date. NaN marks an undefined value.
    fn write_table(
        &self,
        dates: &[NaiveDate],
        columns: &[(&str, &[f64])],
        output_path: &str,
    ) -> Result<(), BandtestError>;
}
