use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::CMDMode;
use crate::model::{Model, UIData};
use crate::store::{SortOrder, Theme};

pub const CMDLINE_HEIGHT: u16 = 1;
pub const FOOTER_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;

struct Palette {
    fg: Color,
    bg: Color,
    header: Color,
    border: Color,
    highlight_bg: Color,
    highlight_fg: Color,
    muted: Color,
    accent: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                header: Color::Blue,
                border: Color::Gray,
                highlight_bg: Color::LightBlue,
                highlight_fg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Magenta,
            },
            Theme::Dark => Palette {
                fg: Color::Gray,
                bg: Color::Black,
                header: Color::Cyan,
                border: Color::DarkGray,
                highlight_bg: Color::Blue,
                highlight_fg: Color::White,
                muted: Color::DarkGray,
                accent: Color::Yellow,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }
}

#[derive(Default)]
pub struct TableUI {}

impl TableUI {
    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let palette = Palette::for_theme(uidata.theme);
        let area = frame.area();

        frame.render_widget(Block::new().style(palette.base()), area);

        let [table_area, footer_area, cmdline_area] = Layout::vertical([
            Constraint::Min(TABLE_HEADER_HEIGHT + 2),
            Constraint::Length(FOOTER_HEIGHT),
            Constraint::Length(CMDLINE_HEIGHT),
        ])
        .areas(area);

        self.render_table(uidata, &palette, table_area, frame);
        render_footer(uidata, &palette, footer_area, frame);

        if let Some(panel) = &uidata.columns_panel {
            let popup = popup_area(area, 60, 60);
            frame.render_widget(Clear, popup);

            let items: Vec<ListItem> = panel
                .entries
                .iter()
                .map(|entry| {
                    let mark = if entry.visible { "[x]" } else { "[ ]" };
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{mark} {} ", entry.label)),
                        Span::styled(
                            format!("({}, {})", entry.id, entry.column_type),
                            Style::default().fg(palette.muted),
                        ),
                    ]))
                })
                .collect();

            let remove_hint = if panel.can_remove { " d remove " } else { "" };
            let hint = format!(" Space toggle  K/J move  a add {remove_hint} Esc close ");
            let list = List::new(items)
                .block(
                    Block::bordered()
                        .border_type(BorderType::Rounded)
                        .title(" Manage Columns ".bold())
                        .title_bottom(Line::from(hint).centered())
                        .border_style(Style::default().fg(palette.border)),
                )
                .style(palette.base())
                .highlight_style(
                    Style::default()
                        .bg(palette.highlight_bg)
                        .fg(palette.highlight_fg),
                );
            let mut state = ListState::default().with_selected(Some(panel.selected));
            frame.render_stateful_widget(list, popup, &mut state);
        }

        if let Some(record) = &uidata.record {
            let popup = popup_area(area, 60, 60);
            frame.render_widget(Clear, popup);

            let items: Vec<ListItem> = record
                .fields
                .iter()
                .map(|(label, value)| {
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{label}: "), Style::default().fg(palette.header).bold()),
                        Span::raw(value.clone()),
                    ]))
                })
                .collect();

            let list = List::new(items)
                .block(
                    Block::bordered()
                        .border_type(BorderType::Rounded)
                        .title(format!(" {} ", record.title).bold())
                        .title_bottom(Line::from(" Enter edit  s save  Esc cancel ").centered())
                        .border_style(Style::default().fg(palette.border)),
                )
                .style(palette.base())
                .highlight_style(
                    Style::default()
                        .bg(palette.highlight_bg)
                        .fg(palette.highlight_fg),
                );
            let mut state = ListState::default().with_selected(Some(record.selected));
            frame.render_stateful_widget(list, popup, &mut state);
        }

        if let Some(message) = &uidata.confirm_message {
            let popup = popup_area(area, 50, 20);
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(message.as_str())
                    .centered()
                    .wrap(Wrap { trim: true })
                    .style(palette.base())
                    .block(
                        Block::bordered()
                            .border_type(BorderType::Rounded)
                            .title(" Confirm ".bold())
                            .border_style(Style::default().fg(palette.accent)),
                    ),
                popup,
            );
        }

        if uidata.show_popup {
            let popup = popup_area(area, 70, 80);
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(uidata.popup_message.as_str())
                    .wrap(Wrap { trim: false })
                    .style(palette.base())
                    .block(
                        Block::bordered()
                            .border_type(BorderType::Rounded)
                            .title_bottom(Line::from(" Esc close ").centered())
                            .border_style(Style::default().fg(palette.border)),
                    ),
                popup,
            );
        }

        render_cmdline(uidata, &palette, cmdline_area, frame);
    }

    fn render_table(&self, uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(palette.border))
            .title(Line::from(format!(" {} ", uidata.name)).bold().centered());

        if uidata.table.is_empty() {
            let text = if uidata.headers.is_empty() {
                "No columns"
            } else {
                "No data available"
            };
            frame.render_widget(
                Paragraph::new(text)
                    .centered()
                    .style(Style::default().fg(palette.muted))
                    .block(block),
                area,
            );
            return;
        }

        let header = Row::new(uidata.headers.iter().map(|h| {
            let indicator = match h.sort {
                Some(SortOrder::Asc) => " ▲",
                Some(SortOrder::Desc) => " ▼",
                None => "",
            };
            Cell::from(format!("{}{indicator}", h.label))
        }))
        .style(Style::default().fg(palette.header).add_modifier(Modifier::BOLD))
        .height(TABLE_HEADER_HEIGHT);

        let rows = uidata
            .table
            .iter()
            .map(|row| Row::new(row.iter().map(|v| Cell::from(v.as_str()))));

        let widths = vec![Constraint::Fill(1); uidata.headers.len()];
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .style(palette.base())
            .row_highlight_style(Style::default().bg(palette.highlight_bg).fg(palette.highlight_fg))
            .cell_highlight_style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD));

        let mut state = TableState::default()
            .with_selected(Some(uidata.selected_row))
            .with_selected_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, area, &mut state);
    }
}

fn render_footer(uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
    let page = &uidata.page;
    let mut spans = vec![Span::raw(format!(
        " Showing {} to {} of {} entries   Page {} of {}",
        page.first,
        page.last,
        page.total,
        page.page + 1,
        page.total_pages.max(1),
    ))];
    if !uidata.search_query.is_empty() {
        spans.push(Span::styled(
            format!("   Search: {}", uidata.search_query),
            Style::default().fg(palette.accent),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(palette.base()), area);
}

fn render_cmdline(uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
    if uidata.active_cmdinput {
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::Search) => "Search: ",
            Some(CMDMode::ImportPath) => "Import CSV: ",
            Some(CMDMode::AddColumn) => "New column (label[:type]): ",
            Some(CMDMode::EditField) => "Value: ",
            None => "> ",
        };
        let line = Line::from(vec![
            Span::styled(prompt, Style::default().fg(palette.accent).bold()),
            Span::raw(uidata.cmdinput.input.as_str()),
        ]);
        frame.render_widget(Paragraph::new(line).style(palette.base()), area);

        let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    } else {
        frame.render_widget(
            Paragraph::new(uidata.status_message.as_str())
                .style(Style::default().fg(palette.muted).bg(palette.bg)),
            area,
        );
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
