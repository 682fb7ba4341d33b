use chrono::NaiveDate;
use polars::prelude::{CsvReadOptions, DataFrame, DataType, PolarsError, SerReader};
use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace};

use crate::domain::TDMError;
use crate::store::{Column, ColumnType, Row, Value};

/// Hands out row ids that stay unique for the whole session.
///
/// Starts at the wall clock in milliseconds and counts up, so two imports in
/// the same millisecond still get distinct ids.
#[derive(Debug)]
pub struct RowIdGenerator {
    next: u64,
}

impl RowIdGenerator {
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::starting_at(now)
    }

    pub fn starting_at(next: u64) -> Self {
        RowIdGenerator { next }
    }

    pub fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

impl Default for RowIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse CSV text with a header row into fresh rows.
///
/// Fields are keyed by header name, a header equal to a column label is
/// keyed by that column's id so exports read back in. Cells are read as text
/// and typed by the matching column. Fields without a column only become
/// numbers when the number prints back as the same text. Empty cells are
/// left out of the row, blank lines are skipped. Any parse error fails the
/// whole import.
pub fn import_csv(
    content: &str,
    columns: &[Column],
    ids: &mut RowIdGenerator,
) -> Result<Vec<Row>, TDMError> {
    let start_time = Instant::now();
    let df = read_frame(&skip_blank_lines(content))?;

    let mut rows: Vec<Row> = (0..df.height()).map(|_| Row::new(ids.next_id())).collect();
    for name in df.get_column_names() {
        let name = name.as_str();
        let key = field_key(name, columns);
        let column_type = columns.iter().find(|c| c.id == key).map(|c| c.column_type);
        let values = load_column(&df, name, column_type)?;
        for (row, value) in rows.iter_mut().zip(values) {
            if let Some(value) = value {
                row.fields.insert(key.clone(), value);
            }
        }
    }

    info!(
        "Parsed {} rows with {} columns in {}ms",
        rows.len(),
        df.width(),
        start_time.elapsed().as_millis()
    );
    Ok(rows)
}

/// Read and parse a CSV file from disk, see [`import_csv`].
pub fn import_csv_file(
    path: &Path,
    columns: &[Column],
    ids: &mut RowIdGenerator,
) -> Result<Vec<Row>, TDMError> {
    let metadata = fs::metadata(path).map_err(map_io_error)?;
    if !metadata.is_file() {
        return Err(TDMError::ImportFailed(format!(
            "{} is not a file!",
            path.display()
        )));
    }
    debug!("Importing {} ({} bytes)", path.display(), metadata.len());
    let content = fs::read_to_string(path).map_err(map_io_error)?;
    import_csv(&content, columns, ids)
}

fn field_key(header: &str, columns: &[Column]) -> String {
    if columns.iter().any(|c| c.id == header) {
        return header.to_string();
    }
    columns
        .iter()
        .find(|c| c.label == header)
        .map(|c| c.id.clone())
        .unwrap_or_else(|| header.to_string())
}

fn map_io_error(e: std::io::Error) -> TDMError {
    match e.kind() {
        ErrorKind::NotFound => TDMError::FileNotFound,
        ErrorKind::PermissionDenied => TDMError::PermissionDenied,
        _ => TDMError::IoError(e),
    }
}

/// Every column is read as text, typing happens per cell in `load_column`.
fn read_frame(content: &str) -> Result<DataFrame, PolarsError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(content.as_bytes().to_vec()))
        .finish()
}

/// Drop empty lines that are not inside a quoted field. A record of empty
/// cells such as `,,` is kept.
fn skip_blank_lines(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_quotes = false;
    for line in content.split_inclusive('\n') {
        if !in_quotes && line.trim_end_matches(['\r', '\n']).is_empty() {
            continue;
        }
        if line.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
        out.push_str(line);
    }
    out
}

fn typed_value(raw: &str, column_type: Option<ColumnType>) -> Value {
    match column_type {
        Some(column_type) => column_type.value_from_input(raw),
        None => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n.to_string() == raw => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        },
    }
}

fn load_column(
    df: &DataFrame,
    col_name: &str,
    column_type: Option<ColumnType>,
) -> Result<Vec<Option<Value>>, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;

    let values = series
        .into_iter()
        .map(|value| match value {
            Some(s) if !s.is_empty() => Some(typed_value(s, column_type)),
            _ => None,
        })
        .collect();
    trace!("Loaded column {col_name} as {column_type:?}");
    Ok(values)
}

/// Serialize rows over the given columns. The header holds column labels,
/// the body holds each row's value at each column id.
pub fn export_csv(rows: &[Row], columns: &[&Column]) -> String {
    let mut out = String::new();
    let header = columns
        .iter()
        .map(|c| wrap_cell_content(&c.label))
        .collect::<Vec<String>>();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in rows {
        let line = columns
            .iter()
            .map(|c| wrap_cell_content(&row.display(&c.id)))
            .collect::<Vec<String>>();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = needs_escaping
        || c.chars().any(|c| c == ',' || c == '\n' || c == '\r')
        || c.starts_with(' ')
        || c.ends_with(' ');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("data-export-{}.csv", date.format("%Y-%m-%d"))
}

/// Write an export named after today's local date into `dir`.
pub fn write_export(dir: &Path, rows: &[Row], columns: &[&Column]) -> Result<PathBuf, TDMError> {
    let path = dir.join(export_file_name(chrono::Local::now().date_naive()));
    let content = export_csv(rows, columns);
    fs::write(&path, content)?;
    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ColumnType, TableStore};

    #[test]
    fn id_generator_never_repeats() {
        let mut ids = RowIdGenerator::starting_at(100);
        let a = ids.next_id();
        let b = ids.next_id();
        assert_eq!(a, "100");
        assert_eq!(b, "101");
    }

    #[test]
    fn import_assigns_fresh_ids_across_imports() {
        let mut ids = RowIdGenerator::starting_at(1);
        let content = "name,age\nAda,36\nLinus,28\n";
        let first = import_csv(content, &[], &mut ids).unwrap();
        let second = import_csv(content, &[], &mut ids).unwrap();
        let mut all: Vec<&str> = first.iter().chain(second.iter()).map(|r| r.id.as_str()).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn import_types_values() {
        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv("name,age,score\nAda,36,1.5\nLinus,28,2\n", &[], &mut ids).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("Ada".into())));
        assert_eq!(rows[0].get("age"), Some(&Value::Number(36.0)));
        assert_eq!(rows[1].get("score"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn import_maps_labels_to_column_ids() {
        let store = TableStore::seeded();
        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv("Name,role,Team\nAda,Engineer,Core\n", store.columns(), &mut ids).unwrap();
        assert_eq!(rows[0].display("name"), "Ada");
        assert_eq!(rows[0].display("role"), "Engineer");
        assert_eq!(rows[0].display("Team"), "Core");
    }

    #[test]
    fn import_handles_quoted_fields() {
        let mut ids = RowIdGenerator::starting_at(1);
        let content = "name,note\n\"Doe, John\",\"said \"\"hi\"\"\"\n";
        let rows = import_csv(content, &[], &mut ids).unwrap();
        assert_eq!(rows[0].display("name"), "Doe, John");
        assert_eq!(rows[0].display("note"), "said \"hi\"");
    }

    #[test]
    fn import_keeps_extra_fields_and_skips_empty_cells() {
        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv("name,nickname,role\nAda,,Engineer\n", &[], &mut ids).unwrap();
        assert_eq!(rows[0].get("nickname"), None);
        assert_eq!(rows[0].display("role"), "Engineer");
        assert_eq!(rows[0].display("email"), "");
    }

    #[test]
    fn import_types_cells_past_the_first_hundred_rows() {
        let mut content = String::from("name,code\n");
        for i in 0..150 {
            content.push_str(&format!("row{i},{i}\n"));
        }
        content.push_str("late,abc\n");

        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv(&content, &[], &mut ids).unwrap();
        assert_eq!(rows.len(), 151);
        assert_eq!(rows[7].get("code"), Some(&Value::Number(7.0)));
        assert_eq!(rows[150].get("code"), Some(&Value::Text("abc".into())));
    }

    #[test]
    fn import_keeps_leading_zeros() {
        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv("name,zip\nAda,00123\nBob,1e3\n", &[], &mut ids).unwrap();
        assert_eq!(rows[0].get("zip"), Some(&Value::Text("00123".into())));
        assert_eq!(rows[0].display("zip"), "00123");
        assert_eq!(rows[1].display("zip"), "1e3");
    }

    #[test]
    fn import_types_by_column() {
        let store = TableStore::seeded();
        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv("Name,Age,Role\n007,36,42\n", store.columns(), &mut ids).unwrap();
        assert_eq!(rows[0].get("name"), Some(&Value::Text("007".into())));
        assert_eq!(rows[0].get("age"), Some(&Value::Number(36.0)));
        assert_eq!(rows[0].get("role"), Some(&Value::Text("42".into())));
    }

    #[test]
    fn import_skips_blank_lines_but_keeps_empty_records() {
        let mut ids = RowIdGenerator::starting_at(1);
        let rows = import_csv("a,b\n1,2\n\n,\n\r\n3,4\n", &[], &mut ids).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].fields.is_empty());
        assert_eq!(rows[2].display("a"), "3");
    }

    #[test]
    fn blank_lines_inside_quotes_survive() {
        let content = "name,note\nAda,\"one\n\nthree\"\n\nBob,x\n";
        assert_eq!(
            skip_blank_lines(content),
            "name,note\nAda,\"one\n\nthree\"\nBob,x\n"
        );
    }

    #[test]
    fn import_rejects_ragged_records() {
        let mut ids = RowIdGenerator::starting_at(1);
        let result = import_csv("a,b\n1,2\n1,2,3,4\n", &[], &mut ids);
        assert!(result.is_err());
    }

    #[test]
    fn import_missing_file() {
        let mut ids = RowIdGenerator::starting_at(1);
        let result = import_csv_file(Path::new("/definitely/not/here.csv"), &[], &mut ids);
        assert!(matches!(result, Err(TDMError::FileNotFound)));
    }

    #[test]
    fn export_uses_labels_and_visible_columns() {
        let mut store = TableStore::seeded();
        store.toggle_column_visibility("email");
        let csv = export_csv(store.rows(), &store.visible_columns());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Name,Age,Role"));
        assert_eq!(lines.next(), Some("John Doe,28,Developer"));
        assert!(!csv.contains("example.com"));
        assert_eq!(csv.lines().count(), 13);
    }

    #[test]
    fn export_follows_column_order() {
        let mut store = TableStore::seeded();
        let mut columns = store.columns().to_vec();
        columns.swap(0, 3);
        store.reorder_columns(columns);
        let csv = export_csv(store.rows(), &store.visible_columns());
        assert!(csv.starts_with("Role,Email,Age,Name\nDeveloper,john@example.com,28,John Doe\n"));
    }

    #[test]
    fn export_quotes_when_needed() {
        let rows = vec![Row::new("1").with("a", "x, y").with("b", "say \"hi\"")];
        let a = Column::new("a", "A", ColumnType::String);
        let b = Column::new("b", "B", ColumnType::String);
        let csv = export_csv(&rows, &[&a, &b]);
        assert_eq!(csv, "A,B\n\"x, y\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn seed_round_trip() {
        let store = TableStore::seeded();
        let csv = export_csv(store.rows(), &store.visible_columns());

        let mut ids = RowIdGenerator::starting_at(1_000);
        let imported = import_csv(&csv, store.columns(), &mut ids).unwrap();

        assert_eq!(imported.len(), 12);
        for (original, copy) in store.rows().iter().zip(imported.iter()) {
            assert_ne!(original.id, copy.id);
            for key in ["name", "email", "age", "role"] {
                assert_eq!(original.get(key), copy.get(key), "field {key}");
            }
        }
    }

    #[test]
    fn export_file_name_pattern() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(date), "data-export-2024-03-09.csv");
    }

    #[test]
    fn write_export_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::seeded();
        let path = write_export(dir.path(), store.rows(), &store.visible_columns()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("data-export-") && name.ends_with(".csv"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("Name,Email,Age,Role\n"));
    }
}
