//! Gzip CSV reading and writing shared by the ETL and the accessor.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use polars::frame::DataFrame;
use polars::io::{SerReader, SerWriter};
use polars::prelude::{CsvReadOptions, CsvReader, CsvWriter, SchemaRef};

/// Read a gzip-compressed file fully into memory.
pub(crate) fn read_gzip(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)
        .with_context(|| format!("[io] failed to open {}", path.display()))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .with_context(|| format!("[io] failed to decompress {}", path.display()))?;
    Ok(bytes)
}

/// Read a gzip CSV into a DataFrame, optionally forcing column dtypes.
pub(crate) fn read_csv_gz(path: &Path, schema: Option<SchemaRef>) -> Result<DataFrame> {
    let bytes = read_gzip(path)?;
    let options = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(schema);
    CsvReader::new(Cursor::new(bytes))
        .with_options(options)
        .finish()
        .with_context(|| format!("[io] failed to parse CSV from {}", path.display()))
}

/// Read a raw export: gzip CSV with a banner line ahead of the header,
/// every column as a string.
pub(crate) fn read_raw_export(path: &Path) -> Result<DataFrame> {
    let bytes = read_gzip(path)?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(1)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .with_context(|| format!("[io] failed to parse raw export {}", path.display()))
}

/// Write a DataFrame as a gzip CSV with a header row.
pub(crate) fn write_csv_gz(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io] failed to create {}", path.display()))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    CsvWriter::new(&mut encoder)
        .finish(df)
        .with_context(|| format!("[io] failed to write CSV to {}", path.display()))?;
    encoder
        .finish()
        .and_then(|mut file| file.flush())
        .with_context(|| format!("[io] failed to finish gzip stream {}", path.display()))?;
    Ok(())
}
