use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder};
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// One CSV record as an ordered field-name-to-text mapping.
///
/// Keys keep header order. A record shorter than the header simply lacks the
/// trailing keys; cells beyond the header width are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, String)>,
    extra: Vec<String>,
}

impl Row {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Row { fields, extra: Vec::new() }
    }

    /// Raw text for `key`, if this row has that field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Cells that had no header to name them
    pub fn extra(&self) -> &[String] {
        &self.extra
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered rows parsed from one CSV file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Dataset { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A parsed file together with the name shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub name: String,
    pub dataset: Dataset,
}

/// Parse CSV text with the first record as the header row.
///
/// Parsing is best-effort: ragged records are passed through, invalid UTF-8
/// is decoded lossily and blank lines are skipped. Only I/O failures are
/// reported as errors. A header with no data rows yields an empty dataset.
pub fn read_dataset<R: io::Read>(reader: R) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = match reader.byte_headers() {
        Ok(record) => normalize_headers(record),
        Err(err) if err.is_io_error() => {
            return Err(err).context("Failed to read CSV headers");
        }
        Err(err) => {
            warn!("Unreadable CSV header, treating file as empty: {}", err);
            return Ok(Dataset::default());
        }
    };

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => rows.push(build_row(&headers, &record)),
            Ok(false) => break,
            Err(err) if err.is_io_error() => {
                return Err(err).context("Failed to read CSV record");
            }
            Err(err) => {
                warn!("Skipping malformed CSV record: {}", err);
            }
        }
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV");
    Ok(Dataset { rows })
}

/// Open and parse a CSV file, keeping its file name for display
pub fn read_dataset_from_path(path: &Path) -> Result<LoadedFile> {
    let has_csv_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !has_csv_extension {
        warn!("{} does not have a .csv extension, parsing anyway", path.display());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    let dataset = read_dataset(io::BufReader::new(file))
        .with_context(|| format!("Failed to parse '{}'", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(LoadedFile { name, dataset })
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decode header names, dropping a leading BOM and suffixing repeated names
/// (`value`, `value_1`, ...) so every key in a row stays unique.
fn normalize_headers(record: &ByteRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::with_capacity(record.len());

    for (idx, raw) in record.iter().enumerate() {
        let mut name = decode(raw);
        if idx == 0 {
            if let Some(stripped) = name.strip_prefix('\u{feff}') {
                name = stripped.to_string();
            }
        }

        let mut unique = name.clone();
        let mut suffix = 1;
        while seen.contains(&unique) {
            unique = format!("{}_{}", name, suffix);
            suffix += 1;
        }
        seen.insert(unique.clone());
        headers.push(unique);
    }

    headers
}

fn build_row(headers: &[String], record: &ByteRecord) -> Row {
    let mut fields = Vec::with_capacity(headers.len());
    let mut extra = Vec::new();

    for (idx, cell) in record.iter().enumerate() {
        match headers.get(idx) {
            Some(header) => fields.push((header.clone(), decode(cell))),
            None => extra.push(decode(cell)),
        }
    }

    Row { fields, extra }
}
