//! The bundled row reader.
//!
//! Fields are split on the separator. A field that starts with `"` runs to
//! the matching closing quote, may contain separators and newlines, and
//! uses `""` for a literal quote. A `\r` before a line break is dropped.
//! Every cell becomes a CHAR vector.

use crate::config::CSV_QUOTE;
use crate::error::{Error, Result};
use crate::object::{ObjRef, Vector};

use super::{RowLayout, RowReader};

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvRowReader;

/// One record split into raw fields.
struct Record {
    fields: Vec<Vec<u8>>,
    /// True when the record had no bytes at all.
    blank: bool,
}

struct Cursor<'a> {
    body: &'a [u8],
    pos: usize,
    line: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.body.get(self.pos).copied()
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\n'))
    }

    fn record(&mut self, separator: u8) -> Result<Record> {
        let start_line = self.line;
        let start = self.pos;
        let mut fields = Vec::new();
        let mut field = Vec::new();
        let mut quoted = false;

        loop {
            let Some(byte) = self.peek() else { break };
            self.pos += 1;
            match byte {
                CSV_QUOTE if field.is_empty() && !quoted => {
                    quoted = true;
                    self.quoted_field(&mut field, start_line)?;
                }
                b'\r' if self.at_line_end() => {}
                b'\n' => {
                    self.line += 1;
                    break;
                }
                b if b == separator => {
                    fields.push(std::mem::take(&mut field));
                    quoted = false;
                }
                b => field.push(b),
            }
        }
        fields.push(field);

        let consumed = &self.body[start..self.pos];
        let blank = consumed.iter().all(|b| matches!(b, b'\r' | b'\n'));
        Ok(Record { fields, blank })
    }

    fn quoted_field(&mut self, field: &mut Vec<u8>, start_line: usize) -> Result<()> {
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                CSV_QUOTE if self.peek() == Some(CSV_QUOTE) => {
                    self.pos += 1;
                    field.push(CSV_QUOTE);
                }
                CSV_QUOTE => return Ok(()),
                b'\n' => {
                    self.line += 1;
                    field.push(byte);
                }
                _ => field.push(byte),
            }
        }
        Err(Error::user(format!("CSV line {start_line}: unterminated quoted field")))
    }
}

impl RowReader for CsvRowReader {
    fn read_rows(
        &self,
        body: &[u8],
        layout: &RowLayout,
        columns: &mut [Vec<ObjRef>],
    ) -> Result<()> {
        let mut cursor = Cursor { body, pos: 0, line: layout.first_line };

        while cursor.pos < body.len() {
            let line = cursor.line;
            let record = cursor.record(layout.separator)?;
            if record.blank {
                continue;
            }
            if record.fields.len() > columns.len() {
                return Err(Error::user(format!(
                    "CSV line {line}: expected {} fields, found {}",
                    columns.len(),
                    record.fields.len()
                )));
            }

            let mut fields = record.fields.into_iter();
            for column in columns.iter_mut() {
                let cell = fields.next().unwrap_or_default();
                column.push(ObjRef::vector(Vector::chars(cell)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(body: &str, width: usize) -> Result<Vec<Vec<String>>> {
        let mut columns = vec![Vec::new(); width];
        let layout = RowLayout { separator: b',', first_line: 2 };
        CsvRowReader.read_rows(body.as_bytes(), &layout, &mut columns)?;
        Ok(columns
            .iter()
            .map(|col| col.iter().map(|c| c.as_text().unwrap_or_default()).collect())
            .collect())
    }

    #[test]
    fn test_plain_rows() {
        let cols = read("1,2\n3,4\n", 2).unwrap();
        assert_eq!(cols, vec![vec!["1", "3"], vec!["2", "4"]]);
    }

    #[test]
    fn test_crlf() {
        let cols = read("1,2\r\n3,4\r\n", 2).unwrap();
        assert_eq!(cols[1], vec!["2", "4"]);
    }

    #[test]
    fn test_quoted_separator_and_escape() {
        let cols = read("\"a,b\",\"say \"\"hi\"\"\"\n", 2).unwrap();
        assert_eq!(cols[0], vec!["a,b"]);
        assert_eq!(cols[1], vec!["say \"hi\""]);
    }

    #[test]
    fn test_quoted_newline() {
        let cols = read("\"x\ny\",1\n", 2).unwrap();
        assert_eq!(cols[0], vec!["x\ny"]);
    }

    #[test]
    fn test_short_row_is_padded() {
        let cols = read("1\n", 3).unwrap();
        assert_eq!(cols[1], vec![""]);
        assert_eq!(cols[2], vec![""]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let cols = read("1,2\n\n3,4", 2).unwrap();
        assert_eq!(cols[0], vec!["1", "3"]);
    }

    #[test]
    fn test_too_many_fields() {
        let err = read("1,2\n3,4,5\n", 2).unwrap_err();
        assert_eq!(err, Error::user("CSV line 3: expected 2 fields, found 3"));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = read("1,\"open\n", 2).unwrap_err();
        assert_eq!(err, Error::user("CSV line 2: unterminated quoted field"));
    }
}
