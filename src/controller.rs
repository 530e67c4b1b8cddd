use std::time::Duration;
use tracing::trace;

use gateview::domain::{GateViewError, Message, ViewConfig};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ViewConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for a terminal event and maps it to a
    /// message. Returns `None` on timeout so the caller can run timers.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, GateViewError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('h') | KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l') | KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::Char('n') | KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('p') | KeyCode::PageUp, _) => Some(Message::PrevPage),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('S'), _) => Some(Message::ClearSort),
            (KeyCode::Char('f'), _) => Some(Message::Filter),
            (KeyCode::Char('F'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('R'), _) => Some(Message::Range),
            (KeyCode::Char('c'), _) => Some(Message::Columns),
            (KeyCode::Char('r'), _) => Some(Message::ResetColumns),
            (KeyCode::Char('A'), _) => Some(Message::ShowAllColumns),
            (KeyCode::Char(' '), _) => Some(Message::ToggleSelect),
            (KeyCode::Char('a'), _) => Some(Message::SelectAll),
            (KeyCode::Char('x'), _) => Some(Message::SelectNone),
            (KeyCode::Char('m'), _) => Some(Message::MarkSelected),
            (KeyCode::Char('D'), _) => Some(Message::DeleteSelected),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Char('P'), _) => Some(Message::ToggleFeed),
            (KeyCode::Char(':'), _) => Some(Message::GoToPage),
            (KeyCode::Char('z'), _) => Some(Message::PageSize),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
