//! `;`-delimited CSV export of the history matrix.

use std::borrow::Cow;

use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

use crate::ledger::HistoryMatrix;

pub const DELIMITER: u8 = b';';
pub const DATE_HEADER: &str = "Date";

/// Characters that force a cell to be quoted. Commas are included so the file
/// also survives tools that split on `,`.
const QUOTE_TRIGGERS: [char; 5] = [';', '"', ',', '\n', '\r'];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Quote `cell` when it holds a delimiter, comma, quote or line break,
/// doubling any quotes inside.
pub fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains(QUOTE_TRIGGERS) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

/// Header `Date;<habit>;...`, then one row per date, oldest first.
pub fn to_csv(matrix: &HistoryMatrix) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        // Cells are escaped by `escape_cell`; the writer must not quote again.
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    let header = std::iter::once(DATE_HEADER.to_string())
        .chain(matrix.columns.iter().map(|c| escape_cell(&c.name).into_owned()));
    writer.write_record(header)?;

    for row in &matrix.rows {
        let cells = std::iter::once(row.date.format("%Y-%m-%d").to_string())
            .chain(row.values.iter().map(|v| v.to_string()));
        writer.write_record(cells)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn file_name(today: NaiveDate) -> String {
    format!("habits_history_{}.csv", today.format("%Y-%m-%d"))
}
