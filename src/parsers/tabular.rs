//! Decodes the fixed-width result sets the DB2 command line prints for queries.
//!
//! ```text
//! TABNAME              CARD
//! -------------------- --------------------
//! SYSTABLES                             120
//!
//!   1 record(s) selected.
//! ```
//!
//! The first line made only of dashes and whitespace fixes the column widths;
//! the line right before it names the columns. Later lines with exactly the
//! rule's length are rows.

use crate::response::ResponseParser;
use anyhow::Result;
use regex::Regex;
use std::io::Write;
use std::sync::LazyLock;

static RULE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-+(\s+-*)*$").expect("rule line pattern is valid"));

/// Destination for decoded rows, for result sets too large to keep in memory.
pub trait RowSink {
    /// Column names, called once before the first row.
    fn write_header(&mut self, _names: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, columns: &[String]) -> Result<()>;
}

impl RowSink for Vec<Vec<String>> {
    fn write_row(&mut self, columns: &[String]) -> Result<()> {
        self.push(columns.to_vec());
        Ok(())
    }
}

impl<W: Write> RowSink for csv::Writer<W> {
    fn write_header(&mut self, names: &[String]) -> Result<()> {
        self.write_record(names)?;
        Ok(())
    }

    fn write_row(&mut self, columns: &[String]) -> Result<()> {
        self.write_record(columns)?;
        Ok(())
    }
}

/// A decoded result set. `rows` stays empty when rows were streamed to a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub names: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
}

impl Table {
    /// First column of the first row, the shape of `values <expr>` results.
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first().map(String::as_str)
    }
}

struct Layout {
    line_len: usize,
    widths: Vec<usize>,
}

impl Layout {
    fn slice(&self, line: &str, trim: bool) -> Vec<String> {
        let chars: Vec<char> = line.chars().collect();
        let mut start = 0;
        self.widths
            .iter()
            .map(|&width| {
                let from = start.min(chars.len());
                let to = (start + width).min(chars.len());
                start += width + 1;
                let col: String = chars[from..to].iter().collect();
                if trim { col.trim().to_string() } else { col }
            })
            .collect()
    }
}

pub struct TabularDecoder<'s> {
    trim: bool,
    sink: Option<&'s mut dyn RowSink>,
    layout: Option<Layout>,
    last_line: Option<String>,
    table: Table,
}

impl Default for TabularDecoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> TabularDecoder<'s> {
    /// Keep all rows in memory.
    pub fn new() -> Self {
        TabularDecoder {
            trim: true,
            sink: None,
            layout: None,
            last_line: None,
            table: Table::default(),
        }
    }

    /// Hand every row to `sink` instead of keeping it.
    pub fn streaming(sink: &'s mut dyn RowSink) -> Self {
        TabularDecoder {
            sink: Some(sink),
            ..Self::new()
        }
    }

    /// Keep the column padding instead of trimming values.
    pub fn keep_padding(mut self) -> Self {
        self.trim = false;
        self
    }

    fn start_table(&mut self, rule: &str) -> Result<()> {
        let layout = Layout {
            line_len: rule.chars().count(),
            widths: rule.split_whitespace().map(|t| t.chars().count()).collect(),
        };

        let names = match self.last_line.take() {
            Some(header) if header.chars().count() == layout.line_len => layout.slice(&header, true),
            Some(header) => header.split_whitespace().map(str::to_string).collect(),
            None => Vec::new(),
        };
        if let Some(sink) = self.sink.as_mut() {
            sink.write_header(&names)?;
        }

        self.table.names = names;
        self.table.widths = layout.widths.clone();
        self.layout = Some(layout);
        Ok(())
    }
}

impl ResponseParser for TabularDecoder<'_> {
    type Output = Table;

    fn on_line(&mut self, line: &str) -> Result<()> {
        let row = match &self.layout {
            None if RULE_LINE.is_match(line) => return self.start_table(line),
            None => {
                self.last_line = Some(line.to_string()).filter(|l| !l.trim().is_empty());
                return Ok(());
            }
            Some(layout) if line.chars().count() != layout.line_len => return Ok(()),
            Some(layout) => layout.slice(line, self.trim),
        };
        match self.sink.as_mut() {
            Some(sink) => sink.write_row(&row)?,
            None => self.table.rows.push(row),
        }
        self.table.row_count += 1;
        Ok(())
    }

    fn finish(self) -> Result<Table> {
        Ok(self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(decoder: TabularDecoder<'_>, lines: &[&str]) -> Table {
        let mut decoder = decoder;
        for line in lines {
            decoder.on_line(line).unwrap();
        }
        decoder.finish().unwrap()
    }

    const OUTPUT: &[&str] = &[
        "",
        "TABNAME    CARD ",
        "---------- -----",
        "SYSTABLES    120",
        "SYSVIEWS       7",
        "",
        "  2 record(s) selected.",
        "",
    ];

    #[test]
    fn test_decode_rows() {
        let table = decode(TabularDecoder::new(), OUTPUT);
        assert_eq!(table.names, vec!["TABNAME", "CARD"]);
        assert_eq!(table.widths, vec![10, 5]);
        assert_eq!(
            table.rows,
            vec![vec!["SYSTABLES", "120"], vec!["SYSVIEWS", "7"]]
        );
        assert_eq!(table.row_count, 2);
        assert_eq!(table.scalar(), Some("SYSTABLES"));
    }

    #[test]
    fn test_keep_padding() {
        let table = decode(TabularDecoder::new().keep_padding(), OUTPUT);
        assert_eq!(table.rows[0], vec!["SYSTABLES ", "  120"]);
    }

    #[test]
    fn test_row_length_must_match_rule() {
        let tight = [
            "NAME CARD",
            "---------- -----",
            "SYSTABLES    120",
        ];
        let padded = [
            "NAME       CARD ",
            "----------   -----",
            "SYSTABLES    120",
        ];
        let a = decode(TabularDecoder::new(), &tight);
        let b = decode(TabularDecoder::new(), &padded);
        assert_eq!(a.widths, b.widths);
        assert_eq!(a.names, b.names);
        assert_eq!(a.rows, vec![vec!["SYSTABLES", "120"]]);
        // Different rule length, so the same data line is not a row here.
        assert!(b.rows.is_empty());
    }

    #[test]
    fn test_same_widths_different_header_padding() {
        let a = decode(
            TabularDecoder::new(),
            &["A          B    ", "---------- -----", "x          y    "],
        );
        let b = decode(
            TabularDecoder::new(),
            &["A B", "---------- -----", "x          y    "],
        );
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.rows, vec![vec!["x", "y"]]);
        assert_eq!(a.names, b.names);
    }

    #[test]
    fn test_header_with_spaces_in_names() {
        let table = decode(
            TabularDecoder::new(),
            &["TABLE NAME ROWS ", "---------- -----", "T1             3"],
        );
        assert_eq!(table.names, vec!["TABLE NAME", "ROWS"]);
    }

    #[test]
    fn test_no_rule_no_rows() {
        let table = decode(
            TabularDecoder::new(),
            &["DB20000I  The SQL command completed successfully."],
        );
        assert_eq!(table, Table::default());
    }

    #[test]
    fn test_streaming_to_sink() {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let table = decode(TabularDecoder::streaming(&mut rows), OUTPUT);
        assert!(table.rows.is_empty());
        assert_eq!(table.row_count, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["SYSVIEWS", "7"]);
    }

    #[test]
    fn test_streaming_to_csv() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        decode(TabularDecoder::streaming(&mut writer), OUTPUT);
        let bytes = writer.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "TABNAME,CARD\nSYSTABLES,120\nSYSVIEWS,7\n"
        );
    }
}
