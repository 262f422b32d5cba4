use crate::error::{ImportError, ImportResult};
use csv::{Position, ReaderBuilder, StringRecord};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// One data row as read from the file, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based physical line where the row starts.
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRow {
    fn from_record(record: &StringRecord) -> Self {
        Self {
            line: record.position().map_or(0, Position::line),
            fields: record.iter().map(str::to_string).collect(),
        }
    }

    /// Field at `index`, or an empty string for short rows.
    pub fn get(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Streaming, offset-addressable reader over a product CSV source.
pub struct CsvProductReader<R> {
    reader: csv::Reader<R>,
    header_row: StringRecord,
    data_start: Position,
    next_row: u64,
    row_count: u64,
}

impl CsvProductReader<BufReader<File>> {
    /// Opens `path`, reads the header row and counts the data rows.
    pub fn open(path: &Path) -> ImportResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> CsvProductReader<R> {
    /// Wraps any seekable source.
    ///
    /// The whole source is scanned once to fix the row count, which also
    /// surfaces malformed input (e.g. invalid UTF-8) before any row is
    /// processed. Only one record is held in memory during the scan.
    pub fn from_reader(source: R) -> ImportResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);

        let header_row = reader.headers()?.clone();
        if header_row.is_empty() {
            return Err(ImportError::NoRows);
        }
        let data_start = reader.position().clone();

        let mut record = StringRecord::new();
        let mut row_count = 0u64;
        while reader.read_record(&mut record)? {
            row_count += 1;
        }
        reader.seek(data_start.clone())?;
        debug!("csv source holds {} data rows", row_count);

        Ok(Self {
            reader,
            header_row,
            data_start,
            next_row: 0,
            row_count,
        })
    }

    /// Returns a lazy sequence of at most `limit` rows starting at data row
    /// `offset` (0-based, header excluded). The sequence is empty once
    /// `offset` is past the end.
    pub fn read_chunk(&mut self, offset: u64, limit: usize) -> ImportResult<Chunk<'_, R>> {
        self.seek_to(offset)?;
        Ok(Chunk {
            source: self,
            remaining: limit,
        })
    }

    fn seek_to(&mut self, offset: u64) -> ImportResult<()> {
        if offset < self.next_row {
            self.reader.seek(self.data_start.clone())?;
            self.next_row = 0;
        }
        let mut skipped = StringRecord::new();
        while self.next_row < offset {
            if !self.reader.read_record(&mut skipped)? {
                break;
            }
            self.next_row += 1;
        }
        Ok(())
    }
}

impl<R> CsvProductReader<R> {
    pub fn header_row(&self) -> &StringRecord {
        &self.header_row
    }

    /// Physical rows minus the header row.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }
}

/// A bounded, lazily read window of rows. Borrowing the reader keeps chunks
/// strictly sequential.
pub struct Chunk<'a, R> {
    source: &'a mut CsvProductReader<R>,
    remaining: usize,
}

impl<R: Read> Iterator for Chunk<'_, R> {
    type Item = ImportResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let mut record = StringRecord::new();
        match self.source.reader.read_record(&mut record) {
            Ok(true) => {
                self.remaining -= 1;
                self.source.next_row += 1;
                Some(Ok(RawRow::from_record(&record)))
            }
            Ok(false) => {
                self.remaining = 0;
                None
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "code,name,description,stock,price,discontinued\n";

    fn reader_for(body: &str) -> ImportResult<CsvProductReader<Cursor<Vec<u8>>>> {
        CsvProductReader::from_reader(Cursor::new(body.as_bytes().to_vec()))
    }

    fn codes(chunk: Chunk<'_, Cursor<Vec<u8>>>) -> Vec<String> {
        chunk
            .map(|row| row.expect("row parses").get(0).to_string())
            .collect()
    }

    #[test]
    fn counts_rows_without_header() {
        let body = format!("{HEADER}P1,a,b,10,10,\nP2,a,b,10,10,\nP3,a,b,10,10,\n");
        let reader = reader_for(&body).expect("opens");
        assert_eq!(reader.row_count(), 3);
        assert_eq!(reader.header_row().len(), 6);
    }

    #[test]
    fn empty_source_has_no_rows() {
        assert!(matches!(reader_for(""), Err(ImportError::NoRows)));
    }

    #[test]
    fn header_only_source_has_zero_data_rows() {
        let reader = reader_for(HEADER).expect("opens");
        assert_eq!(reader.row_count(), 0);
    }

    #[test]
    fn chunks_cover_every_row_exactly_once() {
        let body = format!(
            "{HEADER}P1,a,b,10,10,\nP2,a,b,10,10,\nP3,a,b,10,10,\nP4,a,b,10,10,\n"
        );
        let mut reader = reader_for(&body).expect("opens");

        let first = codes(reader.read_chunk(0, 2).expect("chunk"));
        let second = codes(reader.read_chunk(2, 2).expect("chunk"));
        let third = codes(reader.read_chunk(4, 2).expect("chunk"));

        assert_eq!(first, vec!["P1", "P2"]);
        assert_eq!(second, vec!["P3", "P4"]);
        assert!(third.is_empty());
    }

    #[test]
    fn earlier_offset_rewinds() {
        let body = format!("{HEADER}P1,a,b,10,10,\nP2,a,b,10,10,\nP3,a,b,10,10,\n");
        let mut reader = reader_for(&body).expect("opens");

        let _ = codes(reader.read_chunk(0, 3).expect("chunk"));
        let again = codes(reader.read_chunk(1, 1).expect("chunk"));
        assert_eq!(again, vec!["P2"]);
    }

    #[test]
    fn short_rows_read_as_empty_fields() {
        let body = format!("{HEADER}P1,TV\n");
        let mut reader = reader_for(&body).expect("opens");
        let row = reader
            .read_chunk(0, 1)
            .expect("chunk")
            .next()
            .expect("one row")
            .expect("row parses");

        assert_eq!(row.line, 2);
        assert_eq!(row.get(1), "TV");
        assert_eq!(row.get(4), "");
    }

    #[test]
    fn invalid_utf8_fails_on_open() {
        let mut body = HEADER.as_bytes().to_vec();
        body.extend_from_slice(b"P1,\xff\xfe,b,10,10,\n");
        let result = CsvProductReader::from_reader(Cursor::new(body));
        assert!(matches!(result, Err(ImportError::Format(_))));
    }
}
