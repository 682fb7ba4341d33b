use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TDMConfig, TDMError};
use crate::model::{Modus, Model};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TDMConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TDMError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(handle_key(key, model.modus()));
        }
        Ok(None)
    }
}

fn handle_key(key: event::KeyEvent, modus: Modus) -> Option<Message> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Message::Quit);
    }

    let message = match modus {
        Modus::Table => match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('c') => Some(Message::ClearSearch),
            KeyCode::Char('e') => Some(Message::Edit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Char('a') => Some(Message::AddRow),
            KeyCode::Char('d') => Some(Message::Delete),
            KeyCode::Char('m') => Some(Message::ManageColumns),
            KeyCode::Char('i') => Some(Message::Import),
            KeyCode::Char('x') => Some(Message::Export),
            KeyCode::Char('t') => Some(Message::ToggleTheme),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        },
        Modus::Columns => match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char(' ') => Some(Message::ToggleVisibility),
            KeyCode::Char('K') => Some(Message::MoveColumnUp),
            KeyCode::Char('J') => Some(Message::MoveColumnDown),
            KeyCode::Char('a') => Some(Message::Add),
            KeyCode::Char('d') => Some(Message::Delete),
            KeyCode::Char('m') => Some(Message::ManageColumns),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        },
        Modus::Edit => match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('e') => Some(Message::Edit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Char('s') => Some(Message::Save),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        },
        Modus::Popup => match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('?') => {
                Some(Message::Exit)
            }
            _ => None,
        },
        Modus::Confirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Message::Confirm),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Message::Decline),
            _ => None,
        },
        Modus::CmdInput => Some(Message::RawKey(key)),
    };
    trace!("Mapped: {key:?} => {message:?}");
    message
}
