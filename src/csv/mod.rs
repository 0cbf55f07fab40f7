//! CSV ingestion.
//!
//! Turns a byte buffer into a table whose columns are LISTs of CHAR vectors.
//! Parsing runs as a small state machine:
//!
//! ```text
//!   Header ──(no data rows)──────────────┐
//!     │                                  v
//!     └──> Rows ──(RowReader ok)──> Done ──> table
//!           │
//!           └──(error)──> arena dropped, error returned
//! ```
//!
//! Row parsing is delegated to a [`RowReader`], normally the engine's, so the
//! header handling and allocation policy stay here while the field grammar
//! can vary.

pub mod arena;
pub mod rows;

use tracing::{error, info, instrument};

use crate::config::{DEFAULT_CSV_SEPARATOR, DEFAULT_MAX_CSV_BYTES, SessionConfig};
use crate::error::{Error, Result};
use crate::interner;
use crate::object::{ObjRef, Vector};

pub use arena::ParseArena;
pub use rows::CsvRowReader;

pub(crate) const EMPTY_INPUT: &str = "CSV length is zero or negative";
pub(crate) const NULL_INPUT: &str = "CSV content is NULL";
pub(crate) const NO_LINES: &str = "CSV has no lines";

/// Where the data rows start and how to split them.
#[derive(Debug, Clone, Copy)]
pub struct RowLayout {
    pub separator: u8,
    /// 1-based line number of the first data row, for error messages.
    pub first_line: usize,
}

/// Parses the data rows of a CSV body into pre-reserved columns. One cell
/// must be pushed to every column per row.
pub trait RowReader {
    fn read_rows(&self, body: &[u8], layout: &RowLayout, columns: &mut [Vec<ObjRef>]) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub separator: u8,
    pub max_bytes: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { separator: DEFAULT_CSV_SEPARATOR, max_bytes: DEFAULT_MAX_CSV_BYTES }
    }
}

impl From<&SessionConfig> for CsvOptions {
    fn from(config: &SessionConfig) -> Self {
        Self { separator: config.csv_separator(), max_bytes: config.max_csv_bytes() }
    }
}

enum State {
    Header,
    Rows { body_start: usize },
    Done,
}

/// Number of lines: one per `\n`, plus a trailing line without one.
fn count_lines(text: &[u8]) -> usize {
    let newlines = text.iter().filter(|&&b| b == b'\n').count();
    newlines + usize::from(text.last().is_some_and(|&b| b != b'\n'))
}

/// Splits the header line into column names.
fn header_names(line: &[u8], separator: u8) -> Vec<i64> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.split(|&b| b == separator)
        .map(|field| {
            let name = String::from_utf8_lossy(field.trim_ascii());
            let name = name
                .strip_prefix('"')
                .and_then(|n| n.strip_suffix('"'))
                .unwrap_or(&*name);
            interner::intern(name)
        })
        .collect()
}

fn fail(message: impl Into<String>) -> Error {
    let message = message.into();
    error!(%message, "CSV parse failed");
    Error::user(message)
}

/// Parses `text` into a table, using `reader` for the data rows.
#[instrument(level = "debug", skip_all, fields(bytes = text.len()))]
pub fn read_csv(text: &[u8], options: &CsvOptions, reader: &dyn RowReader) -> Result<ObjRef> {
    if text.is_empty() {
        return Err(fail(EMPTY_INPUT));
    }
    if text.len() > options.max_bytes {
        return Err(fail(format!(
            "CSV input of {} bytes exceeds the {} byte limit",
            text.len(),
            options.max_bytes
        )));
    }
    info!(bytes = text.len(), "parsing CSV");

    let mut arena = ParseArena::new();
    let mut state = State::Header;
    loop {
        state = match state {
            State::Header => {
                let lines = count_lines(text);
                info!(lines, "counted CSV lines");
                if lines == 0 {
                    return Err(fail(NO_LINES));
                }

                let header_end = text.iter().position(|&b| b == b'\n').unwrap_or(text.len());
                let names = header_names(&text[..header_end], options.separator);
                info!(columns = names.len(), "parsed CSV header");

                let columns = names.len();
                arena.set_names(ObjRef::vector(Vector::symbols(names)));
                arena.reserve_columns(columns, lines - 1).inspect_err(|err| {
                    error!(%err, "CSV column reservation failed");
                })?;

                if lines == 1 {
                    State::Done
                } else {
                    State::Rows { body_start: (header_end + 1).min(text.len()) }
                }
            }
            State::Rows { body_start } => {
                let layout = RowLayout { separator: options.separator, first_line: 2 };
                reader
                    .read_rows(&text[body_start..], &layout, arena.columns_mut())
                    .inspect_err(|err| error!(%err, "CSV row parsing failed"))?;
                State::Done
            }
            State::Done => {
                let table =
                    arena.finish().inspect_err(|err| error!(%err, "CSV table build failed"))?;
                info!(rows = crate::object::table::row_count(&table), "CSV parsed");
                return Ok(table);
            }
        };
    }
}

/// Parses with default options and the bundled row reader. Failures come
/// back as ERROR objects.
pub fn parse(text: &[u8]) -> ObjRef {
    crate::error::into_object(read_csv(text, &CsvOptions::default(), &CsvRowReader))
}
