//! UrlInput — wraps tui-input for the source URL entry line.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};
use unicode_width::UnicodeWidthChar;

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED};

pub enum UrlAction {
    Changed,
    /// Enter on non-empty text.
    Submitted(String),
    /// One level of unwind requested.
    Back,
    None,
}

pub struct UrlInput {
    input: Input,
    placeholder: String,
}

impl UrlInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            placeholder: placeholder.into(),
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Handle a key event.
    ///
    /// Unwind behaviour mirrors the rest of the app: Backspace edits text
    /// while there is any, and only unwinds once the line is empty. Esc
    /// clears a non-empty line first and unwinds on the second press.
    pub fn handle_key(&mut self, key: KeyEvent) -> UrlAction {
        match key.code {
            KeyCode::Esc => {
                if self.input.value().is_empty() {
                    UrlAction::Back
                } else {
                    self.input = Input::default();
                    UrlAction::Changed
                }
            }
            KeyCode::Backspace if self.input.value().is_empty() => UrlAction::Back,
            KeyCode::Enter => {
                let url = self.input.value().trim().to_string();
                if url.is_empty() {
                    UrlAction::None
                } else {
                    UrlAction::Submitted(url)
                }
            }
            _ => {
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                UrlAction::Changed
            }
        }
    }

    /// Render the input line into `area` and place the cursor.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("> {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let visible = &value[scroll_byte_offset(value, scroll)..];
            Span::styled(format!("> {visible}"), Style::default().fg(C_INPUT_FG))
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_INPUT_BG));
        frame.render_widget(paragraph, area);

        let cursor_x = area.x + 2 + (self.input.visual_cursor() - scroll) as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
    }
}

/// `visual_scroll` is a column count, not a byte index; map it to the byte
/// offset of the first character at or past that column so slicing stays on
/// a char boundary for multibyte input.
fn scroll_byte_offset(value: &str, scroll: usize) -> usize {
    let mut col = 0;
    for (idx, ch) in value.char_indices() {
        if col >= scroll {
            return idx;
        }
        col += ch.width().unwrap_or(0);
    }
    value.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_submits_trimmed_text() {
        let mut input = UrlInput::new("u");
        for c in "  https://example/watch  ".chars() {
            input.handle_key(key(KeyCode::Char(c)));
        }
        match input.handle_key(key(KeyCode::Enter)) {
            UrlAction::Submitted(url) => assert_eq!(url, "https://example/watch"),
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn enter_on_empty_line_does_nothing() {
        let mut input = UrlInput::new("u");
        assert!(matches!(input.handle_key(key(KeyCode::Enter)), UrlAction::None));
    }

    #[test]
    fn backspace_edits_before_it_unwinds() {
        let mut input = UrlInput::new("u");
        input.handle_key(key(KeyCode::Char('x')));
        assert!(matches!(
            input.handle_key(key(KeyCode::Backspace)),
            UrlAction::Changed
        ));
        assert_eq!(input.text(), "");
        assert!(matches!(
            input.handle_key(key(KeyCode::Backspace)),
            UrlAction::Back
        ));
    }

    #[test]
    fn draw_scrolls_multibyte_value_without_panicking() {
        let mut input = UrlInput::new("u");
        input.set_value(&"あ".repeat(30));

        let backend = ratatui::backend::TestBackend::new(20, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal.draw(|f| input.draw(f, f.area())).unwrap();
    }

    #[test]
    fn scroll_byte_offset_lands_on_char_boundaries() {
        // "あ" is 2 columns, 3 bytes
        let value = "あいう";
        assert_eq!(scroll_byte_offset(value, 0), 0);
        assert_eq!(scroll_byte_offset(value, 2), 3);
        // an odd column falls inside a wide char; snap to the next one
        assert_eq!(scroll_byte_offset(value, 3), 6);
        assert_eq!(scroll_byte_offset(value, 100), value.len());

        let ascii = "abcdef";
        assert_eq!(scroll_byte_offset(ascii, 4), 4);
    }

    #[test]
    fn esc_clears_then_unwinds() {
        let mut input = UrlInput::new("u");
        input.handle_key(key(KeyCode::Char('x')));
        assert!(matches!(input.handle_key(key(KeyCode::Esc)), UrlAction::Changed));
        assert_eq!(input.text(), "");
        assert!(matches!(input.handle_key(key(KeyCode::Esc)), UrlAction::Back));
    }
}
