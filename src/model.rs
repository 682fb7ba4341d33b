use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::csv_bridge::{self, RowIdGenerator};
use crate::domain::{CMDMode, HELP_TEXT, Message, TDMConfig, TDMError};
use crate::inputter::{InputResult, Inputter};
use crate::pipeline::DerivedView;
use crate::store::{Column, ColumnType, Row, SortOrder, TableStore, Theme};

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

/// Which view currently receives key input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    Table,
    Columns,
    Edit,
    Popup,
    Confirm,
    CmdInput,
}

/// Values typed into the row editor. Nothing reaches the store until save,
/// except the blank row behind `a`, which is dropped again on cancel.
struct EditSession {
    row_id: String,
    is_new: bool,
    values: BTreeMap<String, String>,
    curser_row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub label: String,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub first: usize,
    pub last: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    pub label: String,
    pub id: String,
    pub column_type: ColumnType,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsPanel {
    pub entries: Vec<ColumnEntry>,
    pub selected: usize,
    pub can_remove: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    pub title: String,
    pub fields: Vec<(String, String)>,
    pub selected: usize,
}

/// Everything the ui needs for one frame.
pub struct UIData {
    pub name: String,
    pub theme: Theme,
    pub headers: Vec<HeaderView>,
    pub table: Vec<Vec<String>>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub page: PageInfo,
    pub search_query: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub confirm_message: Option<String>,
    pub columns_panel: Option<ColumnsPanel>,
    pub record: Option<RecordView>,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            theme: Theme::Light,
            headers: Vec::new(),
            table: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            page: PageInfo::default(),
            search_query: String::new(),
            show_popup: false,
            popup_message: String::new(),
            confirm_message: None,
            columns_panel: None,
            record: None,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: TDMConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    store: TableStore,
    ids: RowIdGenerator,
    curser_row: usize,
    curser_column: usize,
    column_curser: usize,
    edit: Option<EditSession>,
    pending_delete: Option<String>,
    popup_message: String,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    uidata: UIData,
}

impl Model {
    pub fn init(config: &TDMConfig, store: TableStore) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            store,
            ids: RowIdGenerator::new(),
            curser_row: 0,
            curser_column: 0,
            column_curser: 0,
            edit: None,
            pending_delete: None,
            popup_message: String::new(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Started tdm!".to_string(),
            uidata: UIData::empty(),
        };
        model.update_uidata();
        model
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    /// Import a CSV file and append its rows. All or nothing.
    pub fn import_file(&mut self, path: PathBuf) -> Result<usize, TDMError> {
        let imported = csv_bridge::import_csv_file(&path, self.store.columns(), &mut self.ids)?;
        let count = imported.len();
        let mut rows = self.store.rows().to_vec();
        rows.extend(imported);
        self.store.set_rows(rows);
        info!("Imported {count} rows from {}", path.display());
        self.update_uidata();
        Ok(count)
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TDMError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::Table => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_table_selection_down(),
                    Message::MoveUp => self.move_table_selection_up(),
                    Message::MoveLeft => self.curser_column = self.curser_column.saturating_sub(1),
                    Message::MoveRight => self.curser_column += 1,
                    Message::NextPage => self.next_page(),
                    Message::PrevPage => self.prev_page(),
                    Message::FirstPage => self.goto_page(0),
                    Message::LastPage => self.last_page(),
                    Message::Sort => self.sort_current_column(),
                    Message::Search => {
                        let query = self.store.search_query().to_string();
                        self.enter_cmd_mode(CMDMode::Search, &query);
                    }
                    Message::ClearSearch => {
                        self.store.set_search_query("");
                        self.curser_row = 0;
                    }
                    Message::Enter | Message::Edit => self.start_edit(),
                    Message::AddRow => self.add_row(),
                    Message::Delete => self.request_delete(),
                    Message::ManageColumns => self.open_column_manager(),
                    Message::Import => self.enter_cmd_mode(CMDMode::ImportPath, ""),
                    Message::Export => self.export(),
                    Message::ToggleTheme => self.store.toggle_theme(),
                    Message::Help => self.show_popup(HELP_TEXT.to_string()),
                    _ => (),
                },
                Modus::Columns => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_column_curser(1),
                    Message::MoveUp => self.move_column_curser(-1),
                    Message::ToggleVisibility => self.toggle_current_column(),
                    Message::MoveColumnUp => self.move_current_column(-1),
                    Message::MoveColumnDown => self.move_current_column(1),
                    Message::Add => self.enter_cmd_mode(CMDMode::AddColumn, ""),
                    Message::Delete => self.remove_current_column(),
                    Message::Help => self.show_popup(HELP_TEXT.to_string()),
                    Message::Exit | Message::ManageColumns => self.exit(),
                    _ => (),
                },
                Modus::Edit => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_edit_curser(1),
                    Message::MoveUp => self.move_edit_curser(-1),
                    Message::Enter | Message::Edit => self.edit_current_field(),
                    Message::Save => self.save_edit(),
                    Message::Exit => self.exit(),
                    _ => (),
                },
                Modus::Popup => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::Confirm => match msg {
                    Message::Quit => self.quit(),
                    Message::Confirm => self.confirm_delete(),
                    Message::Decline | Message::Exit => self.exit(),
                    _ => (),
                },
                Modus::CmdInput => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }

        self.update_uidata();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::Table => {}
            Modus::Columns => {
                self.previous_modus = Modus::Columns;
                self.modus = Modus::Table;
            }
            Modus::Edit => {
                trace!("Cancel edit ...");
                if let Some(edit) = self.edit.take()
                    && edit.is_new
                {
                    debug!("Dropping unsaved row {}", edit.row_id);
                    self.store.delete_row(&edit.row_id);
                }
                self.store.set_editing_row(None);
                self.previous_modus = Modus::Edit;
                self.modus = Modus::Table;
            }
            Modus::Popup => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::Popup;
            }
            Modus::Confirm => {
                trace!("Delete declined");
                self.pending_delete = None;
                self.modus = self.previous_modus;
                self.previous_modus = Modus::Confirm;
            }
            Modus::CmdInput => {}
        }
    }

    fn show_popup(&mut self, message: String) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup_message = message;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode, prefill: &str) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        self.input.set(prefill);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;

        let cmd_mode = self.cmd_mode.take();
        if self.last_input.canceled {
            trace!("Cmd input canceled");
            return;
        }

        let cmd_input = self.last_input.input.clone();
        match cmd_mode {
            Some(CMDMode::Search) => {
                self.store.set_search_query(&cmd_input);
                self.curser_row = 0;
            }
            Some(CMDMode::ImportPath) => self.import_from_input(&cmd_input),
            Some(CMDMode::AddColumn) => self.add_column_from_input(&cmd_input),
            Some(CMDMode::EditField) => self.set_current_field(cmd_input),
            None => info!("Cmd mode is none!"),
        }
    }

    // -------------------- Table ---------------------- //

    fn move_table_selection_up(&mut self) {
        self.curser_row = self.curser_row.saturating_sub(1);
    }

    fn move_table_selection_down(&mut self) {
        let page_len = DerivedView::derive(&self.store).visible_page().len();
        if self.curser_row + 1 < page_len {
            self.curser_row += 1;
        }
    }

    fn goto_page(&mut self, page: usize) {
        self.store.set_current_page(page);
        self.curser_row = 0;
    }

    fn next_page(&mut self) {
        let view = DerivedView::derive(&self.store);
        let page = view.clamped_page();
        if page + 1 < view.total_pages {
            self.goto_page(page + 1);
        }
    }

    fn prev_page(&mut self) {
        let page = DerivedView::derive(&self.store).clamped_page();
        if page > 0 {
            self.goto_page(page - 1);
        }
    }

    fn last_page(&mut self) {
        let total_pages = DerivedView::derive(&self.store).total_pages;
        self.goto_page(total_pages.saturating_sub(1));
    }

    fn selected_column_id(&self) -> Option<String> {
        self.store
            .visible_columns()
            .get(self.curser_column)
            .map(|c| c.id.clone())
    }

    fn selected_row_id(&self) -> Option<String> {
        DerivedView::derive(&self.store)
            .visible_page()
            .get(self.curser_row)
            .map(|r| r.id.clone())
    }

    fn sort_current_column(&mut self) {
        if let Some(column_id) = self.selected_column_id() {
            let order = if self.store.sort_by() == Some(column_id.as_str())
                && self.store.sort_order() == SortOrder::Asc
            {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            };
            self.store.set_sort(&column_id, order);
            self.set_status_message(format!("Sorted by {column_id} ({order:?})"));
        }
    }

    fn add_row(&mut self) {
        let id = self.ids.next_id();
        debug!("Adding row {id}");
        self.store.add_row(Row::new(id.clone()));
        self.begin_edit(id, true);
    }

    fn start_edit(&mut self) {
        if let Some(row_id) = self.selected_row_id() {
            self.begin_edit(row_id, false);
        }
    }

    fn begin_edit(&mut self, row_id: String, is_new: bool) {
        let Some(row) = self.store.row(&row_id) else {
            return;
        };
        let values = self
            .store
            .visible_columns()
            .iter()
            .map(|c| (c.id.clone(), row.display(&c.id)))
            .collect();
        self.store.set_editing_row(Some(&row_id));
        self.edit = Some(EditSession {
            row_id,
            is_new,
            values,
            curser_row: 0,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::Edit;
    }

    fn request_delete(&mut self) {
        if let Some(row_id) = self.selected_row_id() {
            let name = self
                .store
                .visible_columns()
                .first()
                .and_then(|c| self.store.row(&row_id).map(|r| r.display(&c.id)))
                .unwrap_or_default();
            self.pending_delete = Some(row_id);
            self.popup_message = format!("Delete row \"{name}\"? (y/n)");
            self.previous_modus = self.modus;
            self.modus = Modus::Confirm;
        }
    }

    fn confirm_delete(&mut self) {
        if let Some(row_id) = self.pending_delete.take() {
            info!("Deleting row {row_id}");
            self.store.delete_row(&row_id);
            self.set_status_message("Row deleted");
        }
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Confirm;
    }

    fn import_from_input(&mut self, input: &str) {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return;
        }
        let path = match shellexpand::full(trimmed) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                self.show_popup(format!("Error importing CSV: {e}"));
                return;
            }
        };
        match self.import_file(path) {
            Ok(count) => self.show_popup(format!("Successfully imported {count} rows")),
            Err(e) => {
                error!("Import failed: {e}");
                self.show_popup(format!("Error importing CSV: {e}"));
            }
        }
    }

    fn export(&mut self) {
        let result = csv_bridge::write_export(
            &self.config.export_dir,
            self.store.rows(),
            &self.store.visible_columns(),
        );
        match result {
            Ok(path) => self.show_popup(format!("Exported to {}", path.display())),
            Err(e) => {
                error!("Export failed: {e}");
                self.show_popup(format!("Error exporting CSV: {e}"));
            }
        }
    }

    // -------------------- Column manager ---------------------- //

    fn open_column_manager(&mut self) {
        self.column_curser = 0;
        self.previous_modus = self.modus;
        self.modus = Modus::Columns;
    }

    fn move_column_curser(&mut self, step: isize) {
        let count = self.store.columns().len();
        self.column_curser = self
            .column_curser
            .saturating_add_signed(step)
            .min(count.saturating_sub(1));
    }

    fn toggle_current_column(&mut self) {
        if let Some(column) = self.store.columns().get(self.column_curser) {
            let id = column.id.clone();
            self.store.toggle_column_visibility(&id);
        }
    }

    /// Moves the selected column one slot and hands the full new order to
    /// the store.
    fn move_current_column(&mut self, step: isize) {
        let mut columns = self.store.columns().to_vec();
        let from = self.column_curser;
        let Some(to) = from.checked_add_signed(step) else {
            return;
        };
        if from >= columns.len() || to >= columns.len() {
            return;
        }
        let column = columns.remove(from);
        columns.insert(to, column);
        self.store.reorder_columns(columns);
        self.column_curser = to;
    }

    fn remove_current_column(&mut self) {
        if self.store.columns().len() <= 1 {
            self.set_status_message("Cannot remove the last column");
            return;
        }
        if let Some(column) = self.store.columns().get(self.column_curser) {
            let id = column.id.clone();
            info!("Removing column {id}");
            self.store.remove_column(&id);
            self.move_column_curser(0);
        }
    }

    fn add_column_from_input(&mut self, input: &str) {
        let (label, column_type) = match input.rsplit_once(':') {
            Some((label, type_name)) => match ColumnType::parse(type_name) {
                Some(column_type) => (label, column_type),
                None => {
                    self.set_status_message(format!("Unknown column type \"{type_name}\""));
                    self.enter_cmd_mode(CMDMode::AddColumn, input);
                    return;
                }
            },
            None => (input, ColumnType::String),
        };
        if label.trim().is_empty() {
            return;
        }
        let column = Column::from_label(label, column_type);
        self.set_status_message(format!("Added column {}", column.id));
        self.store.add_column(column);
    }

    // -------------------- Row editor ---------------------- //

    fn move_edit_curser(&mut self, step: isize) {
        let count = self.store.visible_columns().len();
        if let Some(edit) = self.edit.as_mut() {
            edit.curser_row = edit
                .curser_row
                .saturating_add_signed(step)
                .min(count.saturating_sub(1));
        }
    }

    fn edit_current_field(&mut self) {
        let Some(edit) = self.edit.as_ref() else {
            return;
        };
        let Some(column_id) = self
            .store
            .visible_columns()
            .get(edit.curser_row)
            .map(|c| c.id.clone())
        else {
            return;
        };
        let current = edit.values.get(&column_id).cloned().unwrap_or_default();
        self.enter_cmd_mode(CMDMode::EditField, &current);
    }

    fn set_current_field(&mut self, value: String) {
        let columns = self.store.visible_columns();
        if let Some(edit) = self.edit.as_mut()
            && let Some(column) = columns.get(edit.curser_row)
        {
            edit.values.insert(column.id.clone(), value);
        }
    }

    fn save_edit(&mut self) {
        let Some(edit) = self.edit.take() else {
            return;
        };
        if let Some(original) = self.store.row(&edit.row_id) {
            let mut row = original.clone();
            for column in self.store.columns() {
                if let Some(input) = edit.values.get(&column.id) {
                    if input.is_empty() {
                        row.fields.remove(&column.id);
                    } else {
                        row.fields
                            .insert(column.id.clone(), column.column_type.value_from_input(input));
                    }
                }
            }
            debug!("Saving row {}", row.id);
            self.store.update_row(row);
            self.set_status_message("Row saved");
        }
        self.store.set_editing_row(None);
        self.previous_modus = Modus::Edit;
        self.modus = Modus::Table;
    }

    // -------------------- Render snapshot ---------------------- //

    fn update_uidata(&mut self) {
        let view = DerivedView::derive(&self.store);
        let visible_columns = self.store.visible_columns();
        let page_rows = view.visible_page();

        self.curser_row = self.curser_row.min(page_rows.len().saturating_sub(1));
        self.curser_column = self
            .curser_column
            .min(visible_columns.len().saturating_sub(1));

        let headers = visible_columns
            .iter()
            .map(|c| HeaderView {
                label: c.label.clone(),
                sort: (self.store.sort_by() == Some(c.id.as_str()))
                    .then_some(self.store.sort_order()),
            })
            .collect();

        let table = page_rows
            .iter()
            .map(|row| visible_columns.iter().map(|c| row.display(&c.id)).collect())
            .collect();

        let (first, last, total) = view.showing();
        let page = PageInfo {
            page: view.clamped_page(),
            total_pages: view.total_pages,
            first,
            last,
            total,
        };

        let columns_panel = (self.modus == Modus::Columns
            || (self.modus == Modus::CmdInput && self.previous_modus == Modus::Columns))
            .then(|| ColumnsPanel {
                entries: self
                    .store
                    .columns()
                    .iter()
                    .map(|c| ColumnEntry {
                        label: c.label.clone(),
                        id: c.id.clone(),
                        column_type: c.column_type,
                        visible: c.visible,
                    })
                    .collect(),
                selected: self.column_curser,
                can_remove: self.store.columns().len() > 1,
            });

        let record = self.edit.as_ref().map(|edit| RecordView {
            title: format!("Edit row {}", edit.row_id),
            fields: visible_columns
                .iter()
                .map(|c| {
                    (
                        c.label.clone(),
                        edit.values.get(&c.id).cloned().unwrap_or_default(),
                    )
                })
                .collect(),
            selected: edit.curser_row,
        });

        self.uidata = UIData {
            name: "Data Table Manager".to_string(),
            theme: self.store.theme(),
            headers,
            table,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            page,
            search_query: self.store.search_query().to_string(),
            show_popup: self.modus == Modus::Popup,
            popup_message: self.popup_message.clone(),
            confirm_message: (self.modus == Modus::Confirm).then(|| self.popup_message.clone()),
            columns_panel,
            record,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::io::Write;

    fn model() -> Model {
        Model::init(&TDMConfig::default(), TableStore::seeded())
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_line(model: &mut Model, text: &str) {
        for c in text.chars() {
            send(
                model,
                Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)),
            );
        }
        send(
            model,
            Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
        );
    }

    fn clear_line(model: &mut Model) {
        send(
            model,
            Message::RawKey(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)),
        );
    }

    #[test]
    fn initial_render_shows_first_page() {
        let model = model();
        let ui = model.get_uidata();
        assert_eq!(ui.table.len(), 10);
        assert_eq!(ui.headers.len(), 4);
        assert_eq!(ui.table[0], vec!["John Doe", "john@example.com", "28", "Developer"]);
        assert_eq!(ui.page.total_pages, 2);
        assert_eq!((ui.page.first, ui.page.last, ui.page.total), (1, 10, 12));
    }

    #[test]
    fn sort_toggles_direction_on_same_column() {
        let mut model = model();
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::Sort);
        assert_eq!(model.store().sort_by(), Some("age"));
        assert_eq!(model.store().sort_order(), SortOrder::Asc);
        assert_eq!(model.get_uidata().table[0][0], "Eve Davis");
        assert_eq!(model.get_uidata().headers[2].sort, Some(SortOrder::Asc));

        send(&mut model, Message::Sort);
        assert_eq!(model.store().sort_order(), SortOrder::Desc);
        assert_eq!(model.get_uidata().table[0][0], "Bob Johnson");

        send(&mut model, Message::Sort);
        assert_eq!(model.store().sort_order(), SortOrder::Asc);
    }

    #[test]
    fn search_through_prompt_resets_page() {
        let mut model = model();
        send(&mut model, Message::NextPage);
        assert_eq!(model.store().current_page(), 1);

        send(&mut model, Message::Search);
        assert!(model.raw_keyevents());
        type_line(&mut model, "developer");
        assert!(!model.raw_keyevents());
        assert_eq!(model.store().search_query(), "developer");
        assert_eq!(model.store().current_page(), 0);
        assert_eq!(model.get_uidata().table.len(), 4);

        send(&mut model, Message::ClearSearch);
        assert_eq!(model.get_uidata().page.total, 12);
    }

    #[test]
    fn canceled_search_changes_nothing() {
        let mut model = model();
        send(&mut model, Message::Search);
        for c in "xyz".chars() {
            send(
                &mut model,
                Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)),
            );
        }
        send(
            &mut model,
            Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
        );
        assert_eq!(model.store().search_query(), "");
        assert_eq!(model.get_uidata().page.total, 12);
    }

    #[test]
    fn paging_stays_in_range() {
        let mut model = model();
        send(&mut model, Message::PrevPage);
        assert_eq!(model.store().current_page(), 0);
        send(&mut model, Message::NextPage);
        send(&mut model, Message::NextPage);
        assert_eq!(model.store().current_page(), 1);
        assert_eq!(model.get_uidata().table.len(), 2);
        send(&mut model, Message::FirstPage);
        assert_eq!(model.store().current_page(), 0);
        send(&mut model, Message::LastPage);
        assert_eq!(model.store().current_page(), 1);
    }

    #[test]
    fn declined_delete_keeps_row() {
        let mut model = model();
        send(&mut model, Message::Delete);
        assert!(model.get_uidata().confirm_message.is_some());
        send(&mut model, Message::Decline);
        assert_eq!(model.store().rows().len(), 12);
        assert!(model.get_uidata().confirm_message.is_none());
    }

    #[test]
    fn confirmed_delete_removes_selected_row() {
        let mut model = model();
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Delete);
        send(&mut model, Message::Confirm);
        assert_eq!(model.store().rows().len(), 11);
        assert!(model.store().row("2").is_none());
    }

    #[test]
    fn deleting_on_last_page_clamps_render() {
        let mut model = model();
        send(&mut model, Message::LastPage);
        send(&mut model, Message::Delete);
        send(&mut model, Message::Confirm);
        send(&mut model, Message::Delete);
        send(&mut model, Message::Confirm);
        assert_eq!(model.store().rows().len(), 10);
        // The store keeps the stale page, the render falls back to the last valid one
        assert_eq!(model.store().current_page(), 1);
        assert_eq!(model.get_uidata().page.page, 0);
        assert_eq!(model.get_uidata().table.len(), 10);
    }

    #[test]
    fn edit_save_persists_values() {
        let mut model = model();
        send(&mut model, Message::Edit);
        assert_eq!(model.store().editing_row(), Some("1"));

        // name field
        send(&mut model, Message::Enter);
        clear_line(&mut model);
        type_line(&mut model, "Johnny Doe");
        // age field
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Enter);
        clear_line(&mut model);
        type_line(&mut model, "29");
        send(&mut model, Message::Save);

        let row = model.store().row("1").unwrap();
        assert_eq!(row.display("name"), "Johnny Doe");
        assert_eq!(row.get("age"), Some(&crate::store::Value::Number(29.0)));
        assert_eq!(model.store().editing_row(), None);
    }

    #[test]
    fn edit_cancel_discards_values() {
        let mut model = model();
        send(&mut model, Message::Edit);
        send(&mut model, Message::Enter);
        clear_line(&mut model);
        type_line(&mut model, "Changed");
        assert_eq!(
            model.get_uidata().record.as_ref().unwrap().fields[0].1,
            "Changed"
        );
        send(&mut model, Message::Exit);
        assert_eq!(model.store().row("1").unwrap().display("name"), "John Doe");
        assert_eq!(model.store().editing_row(), None);
        assert!(model.get_uidata().record.is_none());
    }

    #[test]
    fn add_row_opens_editor() {
        let mut model = model();
        send(&mut model, Message::AddRow);
        assert_eq!(model.store().rows().len(), 13);
        assert!(model.get_uidata().record.is_some());
        send(&mut model, Message::Enter);
        type_line(&mut model, "Zed");
        send(&mut model, Message::Save);
        let last = model.store().rows().last().unwrap();
        assert_eq!(last.display("name"), "Zed");
        assert_eq!(last.display("email"), "");
    }

    #[test]
    fn canceling_a_new_row_removes_it() {
        let mut model = model();
        send(&mut model, Message::AddRow);
        assert_eq!(model.store().rows().len(), 13);
        send(&mut model, Message::Exit);
        assert_eq!(model.store().rows().len(), 12);
        assert_eq!(model.store().editing_row(), None);

        // Cancelling an existing row keeps it
        send(&mut model, Message::Edit);
        send(&mut model, Message::Exit);
        assert_eq!(model.store().rows().len(), 12);
    }

    #[test]
    fn column_manager_toggle_reorder_and_add() {
        let mut model = model();
        send(&mut model, Message::ManageColumns);
        assert!(model.get_uidata().columns_panel.is_some());

        send(&mut model, Message::MoveDown);
        send(&mut model, Message::ToggleVisibility);
        assert!(!model.store().columns()[1].visible);
        assert_eq!(model.get_uidata().headers.len(), 3);

        send(&mut model, Message::MoveColumnUp);
        let ids: Vec<&str> = model.store().columns().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["email", "name", "age", "role"]);

        send(&mut model, Message::Add);
        type_line(&mut model, "Start Date:number");
        let added = model.store().columns().last().unwrap();
        assert_eq!(added.id, "start_date");
        assert_eq!(added.label, "Start Date");
        assert_eq!(added.column_type, ColumnType::Number);

        send(&mut model, Message::Exit);
        assert!(model.get_uidata().columns_panel.is_none());
    }

    #[test]
    fn blank_column_name_is_ignored() {
        let mut model = model();
        send(&mut model, Message::ManageColumns);
        send(&mut model, Message::Add);
        type_line(&mut model, "   ");
        assert_eq!(model.store().columns().len(), 4);
    }

    #[test]
    fn unknown_column_type_keeps_prompt_open() {
        let mut model = model();
        send(&mut model, Message::ManageColumns);
        send(&mut model, Message::Add);
        type_line(&mut model, "Salary:money");
        assert_eq!(model.store().columns().len(), 4);
        assert!(model.raw_keyevents());
        assert_eq!(model.get_uidata().cmdinput.input, "Salary:money");
    }

    #[test]
    fn last_column_cannot_be_removed_from_manager() {
        let mut model = model();
        send(&mut model, Message::ManageColumns);
        for _ in 0..3 {
            send(&mut model, Message::Delete);
        }
        assert_eq!(model.store().columns().len(), 1);
        assert!(!model.get_uidata().columns_panel.as_ref().unwrap().can_remove);

        send(&mut model, Message::Delete);
        assert_eq!(model.store().columns().len(), 1);
    }

    #[test]
    fn failed_import_leaves_rows_untouched() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,age\nAda,36\nBob,1,2,3").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut model = model();
        send(&mut model, Message::Import);
        type_line(&mut model, &path);
        assert_eq!(model.store().rows().len(), 12);
        assert!(model.get_uidata().show_popup);
        assert!(model.get_uidata().popup_message.starts_with("Error importing CSV"));

        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn import_appends_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,Email,Age,Role\nAda Lovelace,ada@example.com,36,Engineer").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut model = model();
        send(&mut model, Message::Import);
        type_line(&mut model, &path);
        assert_eq!(model.store().rows().len(), 13);
        assert_eq!(
            model.get_uidata().popup_message,
            "Successfully imported 1 rows"
        );
        let last = model.store().rows().last().unwrap();
        assert_eq!(last.display("name"), "Ada Lovelace");
        assert_eq!(last.get("age"), Some(&crate::store::Value::Number(36.0)));
    }

    #[test]
    fn export_writes_into_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = TDMConfig::default().with_export_dir(dir.path().to_path_buf());
        let mut model = Model::init(&config, TableStore::seeded());
        send(&mut model, Message::Export);
        assert!(model.get_uidata().popup_message.starts_with("Exported to"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn theme_toggle_and_quit() {
        let mut model = model();
        send(&mut model, Message::ToggleTheme);
        assert_eq!(model.get_uidata().theme, Theme::Dark);
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::Quitting);
    }
}
