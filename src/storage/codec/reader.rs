//! Partition Reader
//!
//! Parses a delimited-text partition image back into rows.

use std::collections::HashSet;

use crate::error::{Result, TableError};
use crate::row::Row;

use super::{Partition, ROW_KEY_COLUMN};

const DELIMITER: u8 = super::DELIMITER as u8;
const QUOTE: u8 = super::QUOTE as u8;
const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Iterator over the records of a delimited-text image
///
/// Blank lines between records are skipped.
pub struct RecordReader<'a> {
    input: &'a str,
    /// Byte offset of the next unread character
    pos: usize,
    /// Line separators consumed so far
    lines: usize,
    /// 1-based line on which the last returned record started
    record_line: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            lines: 0,
            record_line: 0,
        }
    }

    /// Line on which the most recently returned record started
    pub fn record_line(&self) -> usize {
        self.record_line
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn at_line_break(&self) -> Option<usize> {
        match (self.peek(0), self.peek(1)) {
            (Some(LF), _) => Some(1),
            (Some(CR), Some(LF)) => Some(2),
            _ => None,
        }
    }

    fn read_record(&mut self) -> Result<Vec<String>> {
        self.record_line = self.lines + 1;
        let mut fields = Vec::new();

        loop {
            let field = if self.peek(0) == Some(QUOTE) {
                self.read_quoted()?
            } else {
                self.read_plain()?
            };
            fields.push(field);

            if let Some(width) = self.at_line_break() {
                self.pos += width;
                self.lines += 1;
                return Ok(fields);
            }

            match self.peek(0) {
                None => return Ok(fields),
                Some(DELIMITER) => self.pos += 1,
                Some(other) => {
                    return Err(TableError::Format(format!(
                        "line {}: unexpected character {:?} after quoted field",
                        self.lines + 1,
                        other as char
                    )))
                }
            }
        }
    }

    fn read_plain(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(byte) = self.peek(0) {
            if byte == DELIMITER || self.at_line_break().is_some() {
                break;
            }
            if byte == QUOTE {
                return Err(TableError::Format(format!(
                    "line {}: quote inside unquoted field",
                    self.lines + 1
                )));
            }
            self.pos += 1;
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn read_quoted(&mut self) -> Result<String> {
        let opened_on = self.lines + 1;
        self.pos += 1; // opening quote

        let mut out = String::new();
        let mut segment = self.pos;

        loop {
            match self.peek(0) {
                None => {
                    return Err(TableError::Format(format!(
                        "line {}: unterminated quoted field",
                        opened_on
                    )))
                }
                Some(QUOTE) if self.peek(1) == Some(QUOTE) => {
                    // Escaped quote: keep one
                    out.push_str(&self.input[segment..=self.pos]);
                    self.pos += 2;
                    segment = self.pos;
                }
                Some(QUOTE) => {
                    out.push_str(&self.input[segment..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(LF) => {
                    self.lines += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        // Skip blank lines
        while let Some(width) = self.at_line_break() {
            self.pos += width;
            self.lines += 1;
        }

        if self.pos >= self.input.len() {
            return None;
        }

        Some(self.read_record())
    }
}

/// Decode a partition image into a row-key → row mapping
///
/// Returns:
/// - `Ok(None)`: empty image (no partition)
/// - `Ok(Some(map))`: the partition, possibly empty (header only)
/// - `Err(Format)`: invalid UTF-8, bad quoting, bad header, or a record whose
///   field count differs from the header
///
/// With `stop_at_row_key`, reading stops right after the first record carrying
/// that row key. A row key repeated before that point overwrites the earlier
/// record.
pub fn decode(
    data: &[u8],
    partition_key: &str,
    stop_at_row_key: Option<&str>,
) -> Result<Option<Partition>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| TableError::Format(format!("partition is not valid UTF-8: {}", e)))?;
    // Tolerate a UTF-8 byte-order mark
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = RecordReader::new(text);
    let columns = match reader.next() {
        None => return Ok(None),
        Some(header) => header?,
    };
    validate_header(&columns)?;

    let mut partition = Partition::new();
    while let Some(record) = reader.next() {
        let record = record?;
        if record.len() != columns.len() {
            return Err(TableError::Format(format!(
                "line {}: expected {} fields, found {}",
                reader.record_line(),
                columns.len(),
                record.len()
            )));
        }

        let mut fields = record.into_iter();
        let row_key = fields.next().unwrap_or_default();
        let mut row = Row::new(partition_key, row_key.as_str());
        for (column, value) in columns.iter().skip(1).zip(fields) {
            if !value.is_empty() {
                row.set(column.as_str(), value);
            }
        }

        let stop = stop_at_row_key == Some(row_key.as_str());
        partition.insert(row_key, row);
        if stop {
            break;
        }
    }

    Ok(Some(partition))
}

fn validate_header(columns: &[String]) -> Result<()> {
    if columns.first().map(String::as_str) != Some(ROW_KEY_COLUMN) {
        return Err(TableError::Format(format!(
            "line 1: header must start with {}",
            ROW_KEY_COLUMN
        )));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(TableError::Format(format!(
                "line 1: duplicate column {:?}",
                column
            )));
        }
    }

    Ok(())
}
