//! Partition Writer
//!
//! Serializes rows into a delimited-text partition image.

use bytes::{BufMut, Bytes, BytesMut};

use crate::row::Row;

use super::{schema, DELIMITER, QUOTE, RECORD_SEPARATOR};

/// Writes delimited records into an in-memory buffer
pub struct RecordWriter {
    /// Output buffer
    buf: BytesMut,
    /// Number of records written (header included)
    record_count: usize,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            record_count: 0,
        }
    }

    /// Write one record, quoting fields as needed
    pub fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) {
        // A lone empty field would otherwise produce a blank line
        if let [only] = fields {
            if only.as_ref().is_empty() {
                self.buf.put_slice(b"\"\"");
                self.finish_record();
                return;
            }
        }

        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.put_char(DELIMITER);
            }
            self.write_field(field.as_ref());
        }
        self.finish_record();
    }

    /// Number of records written so far
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Finish writing and return the encoded bytes
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn write_field(&mut self, field: &str) {
        if !needs_quoting(field) {
            self.buf.put_slice(field.as_bytes());
            return;
        }

        self.put_char(QUOTE);
        for ch in field.chars() {
            if ch == QUOTE {
                self.put_char(QUOTE);
            }
            self.put_char(ch);
        }
        self.put_char(QUOTE);
    }

    fn finish_record(&mut self) {
        self.put_char(RECORD_SEPARATOR);
        self.record_count += 1;
    }

    fn put_char(&mut self, ch: char) {
        let mut tmp = [0u8; 4];
        self.buf.put_slice(ch.encode_utf8(&mut tmp).as_bytes());
    }
}

impl Default for RecordWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a full partition image: header, then one record per row
///
/// Absent cells become empty fields. Encoding no rows yields a header-only
/// image.
pub fn encode<'a, I>(rows: I) -> Bytes
where
    I: IntoIterator<Item = &'a Row>,
{
    let rows: Vec<&Row> = rows.into_iter().collect();
    let columns = schema(rows.iter().copied());

    let mut writer = RecordWriter::with_capacity(64 * (rows.len() + 1));
    writer.write_record(&columns);

    let mut record: Vec<String> = vec![String::new(); columns.len()];
    for row in rows {
        record[0] = row.row_key().to_string();
        for (slot, column) in record.iter_mut().zip(columns.iter()).skip(1) {
            *slot = row.text(column).unwrap_or_default();
        }
        writer.write_record(&record);
    }

    writer.finish()
}

fn needs_quoting(field: &str) -> bool {
    field
        .chars()
        .any(|c| c == DELIMITER || c == QUOTE || c == '\r' || c == '\n')
}
