// ── Workbook serialization ──
//
// Turns sheet specs into a multi-sheet XLSX byte buffer. Degradation
// rules: a sheet whose generation throws is replaced by a single-row
// placeholder and assembly continues; the workbook as a whole fails only
// when no sheet could be produced. Sheets above the styling thresholds
// skip per-cell conditional formatting.

use std::collections::HashSet;

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use tracing::{debug, warn};

use crate::error::CoreError;

/// XLSX limit on worksheet name length.
const SHEET_NAME_MAX: usize = 31;

/// One cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Bool(bool),
    Int(u64),
}

impl Cell {
    /// Approximate rendered width in characters, for column sizing.
    fn display_width(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Bool(_) => 5,
            Self::Int(n) => n.to_string().len(),
        }
    }
}

/// One sheet: a name, a header row, and data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpec {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Tuning knobs for workbook generation.
#[derive(Debug, Clone)]
pub struct WriterLimits {
    /// How many data rows feed the column-width sample.
    pub width_sample_rows: usize,
    /// Column width clamp, in character widths.
    pub min_col_width: f64,
    pub max_col_width: f64,
    /// Above either threshold, per-cell conditional styling is skipped.
    pub style_row_limit: usize,
    pub style_cell_limit: usize,
}

impl Default for WriterLimits {
    fn default() -> Self {
        Self {
            width_sample_rows: 100,
            min_col_width: 10.0,
            max_col_width: 50.0,
            style_row_limit: 500,
            style_cell_limit: 10_000,
        }
    }
}

impl WriterLimits {
    /// Whether a sheet of this size gets per-cell conditional styling.
    fn styled(&self, rows: usize, cols: usize) -> bool {
        rows <= self.style_row_limit && rows.saturating_mul(cols) <= self.style_cell_limit
    }
}

/// Serializes pivot sheets into a multi-sheet XLSX workbook.
pub struct SpreadsheetWriter {
    limits: WriterLimits,
}

impl SpreadsheetWriter {
    pub fn new() -> Self {
        Self {
            limits: WriterLimits::default(),
        }
    }

    pub fn with_limits(limits: WriterLimits) -> Self {
        Self { limits }
    }

    /// Write all sheets and return the finished workbook bytes.
    ///
    /// No partial file is ever returned: either the buffer holds the
    /// complete workbook, or this errors and the caller gets nothing.
    pub fn write_workbook(&self, sheets: &[SheetSpec]) -> Result<Vec<u8>, CoreError> {
        if sheets.is_empty() {
            return Err(CoreError::EmptyExport {
                message: "no sheets to write".into(),
            });
        }

        let mut workbook = Workbook::new();
        let mut taken: HashSet<String> = HashSet::new();
        let mut failures = 0usize;

        for spec in sheets {
            let name = unique_sheet_name(&spec.name, &mut taken);
            match self.build_sheet(&name, spec) {
                Ok(sheet) => {
                    workbook.push_worksheet(sheet);
                }
                Err(e) => {
                    warn!(sheet = %name, error = %e, "sheet generation failed; writing placeholder");
                    failures += 1;
                    workbook.push_worksheet(placeholder_sheet(&name, &e)?);
                }
            }
        }

        if failures == sheets.len() {
            return Err(CoreError::Workbook {
                message: "every sheet failed to generate".into(),
            });
        }

        debug!(sheets = sheets.len(), failures, "workbook assembled");
        workbook.save_to_buffer().map_err(Into::into)
    }

    fn build_sheet(&self, name: &str, spec: &SheetSpec) -> Result<Worksheet, CoreError> {
        let mut sheet = Worksheet::new();
        sheet.set_name(name)?;

        let header_format = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0x1F_4E79))
            .set_font_color(Color::White);

        for (c, title) in spec.header.iter().enumerate() {
            sheet.write_string_with_format(0, col_num(c)?, title.as_str(), &header_format)?;
        }

        let cols = spec.header.len();
        let styled = self.limits.styled(spec.rows.len(), cols);
        let granted_format = Format::new()
            .set_background_color(Color::RGB(0xC6_EFCE))
            .set_font_color(Color::RGB(0x00_6100));

        for (r, row) in spec.rows.iter().enumerate() {
            let row_idx = row_num(r + 1)?;
            for (c, cell) in row.iter().enumerate() {
                let col_idx = col_num(c)?;
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(row_idx, col_idx, s.as_str())?;
                    }
                    Cell::Bool(true) if styled => {
                        sheet.write_boolean_with_format(row_idx, col_idx, true, &granted_format)?;
                    }
                    Cell::Bool(b) => {
                        sheet.write_boolean(row_idx, col_idx, *b)?;
                    }
                    #[allow(clippy::cast_precision_loss)]
                    Cell::Int(n) => {
                        sheet.write_number(row_idx, col_idx, *n as f64)?;
                    }
                }
            }
        }

        for c in 0..cols {
            let width = self.column_width(spec, c);
            sheet.set_column_width(col_num(c)?, width)?;
        }

        sheet.set_freeze_panes(1, 0)?;
        Ok(sheet)
    }

    /// Column width from the header and a bounded sample of data rows.
    fn column_width(&self, spec: &SheetSpec, col: usize) -> f64 {
        let header_width = spec
            .header
            .get(col)
            .map(|h| h.chars().count())
            .unwrap_or_default();

        let data_width = spec
            .rows
            .iter()
            .take(self.limits.width_sample_rows)
            .filter_map(|row| row.get(col))
            .map(Cell::display_width)
            .max()
            .unwrap_or_default();

        #[allow(clippy::cast_precision_loss)]
        let width = header_width.max(data_width) as f64 + 2.0;
        width.clamp(self.limits.min_col_width, self.limits.max_col_width)
    }
}

impl Default for SpreadsheetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a zero-based data row index to an XLSX row number.
fn row_num(r: usize) -> Result<u32, CoreError> {
    u32::try_from(r).map_err(|_| CoreError::Workbook {
        message: "row limit exceeded".into(),
    })
}

/// Convert a zero-based column index to an XLSX column number.
fn col_num(c: usize) -> Result<u16, CoreError> {
    u16::try_from(c).map_err(|_| CoreError::Workbook {
        message: "column limit exceeded".into(),
    })
}

/// Single-row stand-in for a sheet whose generation failed.
fn placeholder_sheet(name: &str, error: &CoreError) -> Result<Worksheet, CoreError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    sheet.write_string(0, 0, format!("generation failed: {error}"))?;
    Ok(sheet)
}

// ── Sheet naming ─────────────────────────────────────────────────────

/// Replace characters XLSX forbids in sheet names and bound the length.
///
/// Names over the 31-character limit are cut to a 28-character prefix
/// plus `...`.
fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');

    if cleaned.is_empty() {
        return "Sheet".into();
    }
    if cleaned.chars().count() <= SHEET_NAME_MAX {
        return cleaned.to_owned();
    }

    let prefix: String = cleaned.chars().take(SHEET_NAME_MAX - 3).collect();
    format!("{prefix}...")
}

/// Sanitized name, made unique within the workbook by numeric suffixing.
///
/// Collision handling is deterministic: the first taker keeps the plain
/// name, later ones get `...2`, `...3`, ... in insertion order. XLSX
/// compares sheet names case-insensitively, so uniqueness does too.
fn unique_sheet_name(raw: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(raw);
    if taken.insert(base.to_lowercase()) {
        return base;
    }

    let mut n: u32 = 2;
    loop {
        let suffix = format!("...{n}");
        let prefix: String = base
            .chars()
            .take(SHEET_NAME_MAX - suffix.chars().count())
            .collect();
        let candidate = format!("{prefix}{suffix}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sheet(name: &str, rows: Vec<Vec<Cell>>) -> SheetSpec {
        SheetSpec {
            name: name.to_owned(),
            header: vec!["Label".into(), "Granted".into()],
            rows,
        }
    }

    // ── Naming ──────────────────────────────────────────────────────

    #[test]
    fn long_names_truncate_with_ellipsis() {
        let long = "A permission label that runs well past the limit";
        let name = sanitize_sheet_name(long);
        assert!(name.chars().count() <= SHEET_NAME_MAX);
        assert!(name.ends_with("..."));
    }

    #[test]
    fn forty_char_label_stays_unique_after_truncation() {
        // Two 40-char labels sharing a 28-char prefix.
        let a = "Manage Encryption Keys And Certificates!";
        let b = "Manage Encryption Keys And Certs Forever";
        assert_eq!(a.chars().count(), 40);
        assert_eq!(b.chars().count(), 40);

        let mut taken = HashSet::new();
        let first = unique_sheet_name(a, &mut taken);
        let second = unique_sheet_name(b, &mut taken);

        assert!(first.chars().count() <= SHEET_NAME_MAX);
        assert!(second.chars().count() <= SHEET_NAME_MAX);
        assert!(first.ends_with("..."));
        assert_ne!(first, second);
    }

    #[test]
    fn collision_suffixing_is_deterministic() {
        let mut taken = HashSet::new();
        let first = unique_sheet_name("Users", &mut taken);
        let second = unique_sheet_name("Users", &mut taken);
        let third = unique_sheet_name("users", &mut taken);

        assert_eq!(first, "Users");
        assert_eq!(second, "Users...2");
        assert_eq!(third, "users...3");
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        let name = sanitize_sheet_name("Q/A: [draft]*?");
        assert_eq!(name, "Q_A_ _draft___");
    }

    // ── Styling thresholds ──────────────────────────────────────────

    #[test]
    fn small_sheets_are_styled_large_ones_not() {
        let limits = WriterLimits::default();
        assert!(limits.styled(100, 20));
        // Row count above the limit.
        assert!(!limits.styled(501, 3));
        // Cell count above the limit.
        assert!(!limits.styled(400, 30));
    }

    // ── Assembly ────────────────────────────────────────────────────

    #[test]
    fn writes_a_workbook_with_xlsx_magic() {
        let writer = SpreadsheetWriter::new();
        let sheets = vec![sheet(
            "Profiles",
            vec![
                vec![Cell::Text("Admin".into()), Cell::Bool(true)],
                vec![Cell::Text("Standard".into()), Cell::Bool(false)],
            ],
        )];

        let bytes = writer.write_workbook(&sheets).unwrap();

        // XLSX is a ZIP container.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn failing_sheet_becomes_placeholder_and_assembly_continues() {
        let writer = SpreadsheetWriter::new();
        // 20k header columns blow the XLSX column limit mid-generation.
        let bad = SheetSpec {
            name: "Broken".into(),
            header: (0..20_000).map(|i| format!("c{i}")).collect(),
            rows: Vec::new(),
        };
        let good = sheet("Profiles", vec![vec![Cell::Text("Admin".into()), Cell::Bool(true)]]);

        let bytes = writer.write_workbook(&[bad, good]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn workbook_fails_only_when_every_sheet_fails() {
        let writer = SpreadsheetWriter::new();
        let bad = SheetSpec {
            name: "Broken".into(),
            header: (0..20_000).map(|i| format!("c{i}")).collect(),
            rows: Vec::new(),
        };

        let result = writer.write_workbook(std::slice::from_ref(&bad));
        assert!(matches!(result, Err(CoreError::Workbook { .. })));
    }

    #[test]
    fn empty_sheet_list_is_rejected() {
        let writer = SpreadsheetWriter::new();
        assert!(matches!(
            writer.write_workbook(&[]),
            Err(CoreError::EmptyExport { .. })
        ));
    }

    #[test]
    fn column_width_is_clamped() {
        let writer = SpreadsheetWriter::new();
        let narrow = sheet("S", vec![vec![Cell::Text("x".into()), Cell::Bool(true)]]);
        assert_eq!(writer.column_width(&narrow, 0), 10.0);

        let wide = sheet(
            "S",
            vec![vec![Cell::Text("y".repeat(200)), Cell::Bool(true)]],
        );
        assert_eq!(writer.column_width(&wide, 0), 50.0);
    }
}
