use std::io::Write;

use crate::table::{ModelError, Table};

#[derive(Clone, Debug)]
pub struct CsvExportOptions {
    pub delimiter: u8,
    /// Write the column names as the first record.
    pub include_header: bool,
}

impl Default for CsvExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_header: true,
        }
    }
}

/// Write `table` as delimited text, one record per row in table order.
///
/// Null cells become empty fields.
pub fn write_csv<W: Write>(
    table: &Table,
    writer: W,
    options: &CsvExportOptions,
) -> crate::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    if options.include_header {
        csv_writer.write_record(table.column_names())?;
    }

    let mut record = Vec::with_capacity(table.column_count());
    for row in table.rows() {
        record.clear();
        record.extend(row.iter().map(ToString::to_string));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

impl Table {
    /// Export with the default options (comma-separated, header row).
    pub fn to_csv_string(&self) -> crate::Result<String> {
        let mut out = Vec::new();
        write_csv(self, &mut out, &CsvExportOptions::default())?;
        String::from_utf8(out)
            .map_err(|err| ModelError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
    }
}
