//! Writing of result rows to TSV files.

use std::io::Write;
use std::path::Path;

use csv::QuoteStyle;
use indexmap::IndexSet;

use crate::seqvars::query::statement::ResultRow;

/// Header of the output: the union of the columns of all rows, in order of
/// first occurrence.
pub fn header(rows: &[ResultRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.values.keys().cloned())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Write `rows` as TSV to `writer`; absent values are written as `.`.
///
/// Nothing is written if there are no rows.
pub fn write_rows<W: Write>(writer: W, rows: &[ResultRow]) -> Result<(), anyhow::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(writer);

    let header = header(rows);
    if header.is_empty() {
        return Ok(());
    }
    csv_writer.write_record(&header)?;
    for row in rows {
        csv_writer.write_record(
            header
                .iter()
                .map(|column| row.get(column).to_output_string()),
        )?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Write `rows` as TSV to the file at `path`.
pub fn write_tsv(path: &Path, rows: &[ResultRow]) -> Result<(), anyhow::Error> {
    let file = std::fs::File::create(path)
        .map_err(|e| anyhow::anyhow!("could not open {} for writing: {}", path.display(), e))?;
    write_rows(std::io::BufWriter::new(file), rows)
}
