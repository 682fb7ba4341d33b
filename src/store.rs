use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

/// A single cell value. Columns only hint at the type, the value carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub fields: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(id: impl Into<String>) -> Self {
        Row {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Rendered cell content, missing fields render empty.
    pub fn display(&self, key: &str) -> String {
        self.get(key).map(|v| v.to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Email,
}

impl ColumnType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "string" | "text" => Some(ColumnType::String),
            "number" => Some(ColumnType::Number),
            "email" => Some(ColumnType::Email),
            _ => None,
        }
    }

    /// Turn user input into a value for a column of this type.
    /// Number columns keep unparsable input as text.
    pub fn value_from_input(&self, input: &str) -> Value {
        match self {
            ColumnType::Number => match input.trim().parse::<f64>() {
                Ok(n) => Value::Number(n),
                Err(_) => Value::Text(input.to_string()),
            },
            ColumnType::String | ColumnType::Email => Value::Text(input.to_string()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Email => "email",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub label: String,
    pub visible: bool,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(id: &str, label: &str, column_type: ColumnType) -> Self {
        Column {
            id: id.to_string(),
            label: label.to_string(),
            visible: true,
            column_type,
        }
    }

    /// Build a column from a form label, deriving the id from it.
    pub fn from_label(label: &str, column_type: ColumnType) -> Self {
        Column {
            id: column_id_from_label(label),
            label: label.to_string(),
            visible: true,
            column_type,
        }
    }
}

/// Lowercases the label and replaces every whitespace run with `_`.
/// Uniqueness is not checked, "Role" and "role " both map to `role`.
pub fn column_id_from_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join("_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewCursor {
    pub search_query: String,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub current_page: usize,
    pub rows_per_page: usize,
    pub editing_row: Option<String>,
}

impl ViewCursor {
    fn new(rows_per_page: usize) -> Self {
        ViewCursor {
            search_query: String::new(),
            sort_by: None,
            sort_order: SortOrder::Asc,
            current_page: 0,
            rows_per_page: rows_per_page.max(1),
            editing_row: None,
        }
    }
}

/// Single source of truth for rows, columns and the view cursor.
///
/// Every mutation is a named, total operation. Unknown ids are ignored
/// instead of reported, derived views are computed by `pipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStore {
    rows: Vec<Row>,
    columns: Vec<Column>,
    cursor: ViewCursor,
    theme: Theme,
}

impl TableStore {
    pub fn empty(rows_per_page: usize) -> Self {
        TableStore {
            rows: Vec::new(),
            columns: Vec::new(),
            cursor: ViewCursor::new(rows_per_page),
            theme: Theme::Light,
        }
    }

    /// The bundled example dataset, 12 rows over name/email/age/role.
    pub fn seeded() -> Self {
        let mut store = Self::empty(DEFAULT_ROWS_PER_PAGE);
        store.columns = seed_columns();
        store.rows = SEED_ROWS
            .iter()
            .enumerate()
            .map(|(idx, (name, email, age, role))| {
                Row::new((idx + 1).to_string())
                    .with("name", *name)
                    .with("email", *email)
                    .with("age", *age)
                    .with("role", *role)
            })
            .collect();
        store
    }

    // -------------------- Accessors ---------------------- //

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn visible_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.visible).collect()
    }

    pub fn search_query(&self) -> &str {
        &self.cursor.search_query
    }

    pub fn sort_by(&self) -> Option<&str> {
        self.cursor.sort_by.as_deref()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.cursor.sort_order
    }

    pub fn current_page(&self) -> usize {
        self.cursor.current_page
    }

    pub fn rows_per_page(&self) -> usize {
        self.cursor.rows_per_page
    }

    pub fn editing_row(&self) -> Option<&str> {
        self.cursor.editing_row.as_deref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    // -------------------- Mutations ---------------------- //

    pub fn set_sort(&mut self, column_id: &str, order: SortOrder) {
        trace!("set_sort {column_id} {order:?}");
        self.cursor.sort_by = Some(column_id.to_string());
        self.cursor.sort_order = order;
    }

    pub fn set_search_query(&mut self, text: &str) {
        trace!("set_search_query {text:?}");
        self.cursor.search_query = text.to_string();
        self.cursor.current_page = 0;
    }

    pub fn set_current_page(&mut self, page: usize) {
        self.cursor.current_page = page;
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        self.cursor.rows_per_page = rows_per_page.max(1);
        self.cursor.current_page = 0;
    }

    pub fn toggle_column_visibility(&mut self, id: &str) {
        if let Some(column) = self.columns.iter_mut().find(|c| c.id == id) {
            column.visible = !column.visible;
        }
    }

    pub fn add_column(&mut self, column: Column) {
        trace!("add_column {} ({})", column.id, column.column_type);
        self.columns.push(column);
    }

    pub fn remove_column(&mut self, id: &str) {
        self.columns.retain(|c| c.id != id);
    }

    pub fn reorder_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    pub fn set_rows(&mut self, rows: Vec<Row>) {
        trace!("set_rows {} -> {}", self.rows.len(), rows.len());
        self.rows = rows;
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn update_row(&mut self, row: Row) {
        if let Some(existing) = self.rows.iter_mut().find(|r| r.id == row.id) {
            *existing = row;
        }
    }

    pub fn delete_row(&mut self, id: &str) {
        self.rows.retain(|r| r.id != id);
    }

    pub fn set_editing_row(&mut self, id: Option<&str>) {
        self.cursor.editing_row = id.map(str::to_string);
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }
}

fn seed_columns() -> Vec<Column> {
    vec![
        Column::new("name", "Name", ColumnType::String),
        Column::new("email", "Email", ColumnType::Email),
        Column::new("age", "Age", ColumnType::Number),
        Column::new("role", "Role", ColumnType::String),
    ]
}

const SEED_ROWS: [(&str, &str, f64, &str); 12] = [
    ("John Doe", "john@example.com", 28.0, "Developer"),
    ("Jane Smith", "jane@example.com", 34.0, "Designer"),
    ("Bob Johnson", "bob@example.com", 45.0, "Manager"),
    ("Alice Williams", "alice@example.com", 29.0, "Developer"),
    ("Charlie Brown", "charlie@example.com", 38.0, "Analyst"),
    ("Diana Prince", "diana@example.com", 31.0, "Designer"),
    ("Eve Davis", "eve@example.com", 26.0, "Developer"),
    ("Frank Miller", "frank@example.com", 42.0, "Manager"),
    ("Grace Lee", "grace@example.com", 33.0, "Analyst"),
    ("Henry Wilson", "henry@example.com", 35.0, "Developer"),
    ("Ivy Martinez", "ivy@example.com", 27.0, "Designer"),
    ("Jack Taylor", "jack@example.com", 40.0, "Manager"),
];
