use std::fmt::{self, Write};

use crate::color::{MaybePaint, HEADER};

pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| cell.contains(|c: char| c.is_whitespace()))
    }

    fn columns(&self) -> usize {
        self.cells.len()
    }
}

impl From<Vec<String>> for Row {
    fn from(value: Vec<String>) -> Self {
        Row { cells: value }
    }
}

impl From<Vec<&str>> for Row {
    fn from(value: Vec<&str>) -> Self {
        let value: Vec<String> = value.into_iter().map(|s| s.to_owned()).collect();

        value.into()
    }
}

/// A plain, whitespace-aligned table. Header cells never contain whitespace so
/// the output splits cleanly with `awk`.
pub(crate) struct Table {
    body: Vec<Row>,
    header: Option<Row>,
    print_header: bool,
}

impl Table {
    pub(crate) fn with_header<R: Into<Row>>(header: R) -> Table {
        let header = header.into();

        debug_assert!(header.is_awk_safe(), "table header contains whitespace");

        Table {
            body: Vec::new(),
            header: Some(header),
            print_header: true,
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn add_row<R: Into<Row>>(&mut self, row: R) {
        let row = row.into();

        debug_assert_eq!(
            Some(row.columns()),
            self.header.as_ref().map(Row::columns),
            "row width does not match the header"
        );

        self.body.push(row);
    }

    fn iter_rows(&self) -> impl Iterator<Item = &Row> {
        self.header.iter().chain(self.body.iter())
    }

    // Widths in characters, so non-ASCII names stay aligned
    fn column_widths(&self) -> Vec<usize> {
        let mut widths = Vec::new();

        for row in self.iter_rows() {
            for (i, cell) in row.cells.iter().enumerate() {
                let width = cell.chars().count();

                match widths.get_mut(i) {
                    Some(w) => *w = width.max(*w),
                    None => widths.push(width),
                }
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        let write_row = |f: &mut fmt::Formatter<'_>, row: &Row, header: bool| -> fmt::Result {
            let last = row.cells.len().saturating_sub(1);

            for (i, cell) in row.cells.iter().enumerate() {
                // The last column is not padded to avoid trailing whitespace
                let padded = if i == last {
                    cell.clone()
                } else {
                    format!("{:<width$}  ", cell, width = widths[i])
                };

                if header {
                    write!(f, "{}", HEADER.maybe_paint(padded.as_str()))?;
                } else {
                    f.write_str(&padded)?;
                }
            }

            f.write_char('\n')
        };

        if self.print_header {
            if let Some(header) = &self.header {
                write_row(f, header, true)?;
            }
        }

        for row in &self.body {
            write_row(f, row, false)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ColorMode;
    use crate::color::configure_color;

    #[test]
    fn test_alignment() {
        configure_color(ColorMode::Off);

        let mut tab = Table::with_header(vec!["MODEL", "PROVIDER"]);

        tab.add_row(vec!["gemini-2.5-pro", "google"]);
        tab.add_row(vec!["m2", "deepseek"]);

        assert_eq!(
            tab.to_string(),
            "MODEL           PROVIDER\ngemini-2.5-pro  google\nm2              deepseek\n"
        );

        tab.print_header(false);

        assert_eq!(
            tab.to_string(),
            "gemini-2.5-pro  google\nm2              deepseek\n"
        );
    }
}
