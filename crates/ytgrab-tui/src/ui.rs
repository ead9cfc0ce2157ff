//! Screen rendering. Pure draw functions over the app's state; no input
//! handling lives here.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use ytgrab_core::format::{Format, FormatDetail, TrackKind};

use crate::flow::{FlowSession, Stage};
use crate::selection::{Phase, SelectionState};
use crate::theme;

pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn kind_title(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Video => "Download video",
        TrackKind::Audio => "Download audio",
        TrackKind::Subtitles => "Download subtitles",
    }
}

// ── Kind picker ───────────────────────────────────────────────────────────────

pub fn draw_picker(frame: &mut Frame, area: Rect, choice: usize) {
    let block = Block::default()
        .title(" ytgrab ")
        .borders(Borders::ALL)
        .border_style(theme::style_border_focused());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let entries = [
        ("Video", "pick a resolution, download the clip"),
        ("Audio", "extract an audio track"),
        ("Subtitles", "fetch auto-generated captions"),
    ];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "What do you want to grab?",
            theme::style_secondary(),
        ))),
        rows[0],
    );

    for (i, (name, hint)) in entries.iter().enumerate() {
        let (marker, name_style) = if i == choice {
            ("▸ ", theme::style_selected())
        } else {
            ("  ", theme::style_default())
        };
        let line = Line::from(vec![
            Span::styled(marker, theme::style_accent()),
            Span::styled(format!("{name:<10}"), name_style),
            Span::styled(*hint, theme::style_muted()),
        ]);
        frame.render_widget(Paragraph::new(line), rows[i + 1]);
    }
}

// ── Flow screens ──────────────────────────────────────────────────────────────

pub fn draw_flow(frame: &mut Frame, area: Rect, session: &FlowSession, spinner: usize) {
    let block = Block::default()
        .title(format!(" {} ", kind_title(session.kind)))
        .borders(Borders::ALL)
        .border_style(theme::style_border_focused());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &session.stage {
        Stage::EnteringUrl(input) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(inner);
            frame.render_widget(
                Paragraph::new(Span::styled("Paste the video URL:", theme::style_secondary())),
                rows[0],
            );
            input.draw(frame, rows[1]);
            if let Some(err) = &session.last_error {
                frame.render_widget(
                    Paragraph::new(Span::styled(truncated(err, rows[2].width), theme::style_error())),
                    rows[2],
                );
            }
        }
        Stage::Probing { url } => {
            let frame_str = SPINNER_FRAMES[spinner % SPINNER_FRAMES.len()];
            let lines = vec![
                Line::from(Span::styled(truncated(url, inner.width), theme::style_muted())),
                Line::from(vec![
                    Span::styled(format!("{frame_str} "), theme::style_busy()),
                    Span::styled("Fetching available formats…", theme::style_busy()),
                ]),
            ];
            frame.render_widget(Paragraph::new(lines), inner);
        }
        Stage::Selecting { url, selection } => {
            draw_selection(frame, inner, url, selection, spinner);
        }
    }
}

fn draw_selection(
    frame: &mut Frame,
    area: Rect,
    url: &str,
    selection: &SelectionState,
    spinner: usize,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(truncated(url, rows[0].width), theme::style_muted())),
        rows[0],
    );

    let (start, window) = selection.page_window();
    let list_area = rows[1];
    for (offset, format) in window.iter().enumerate() {
        if offset as u16 >= list_area.height {
            break;
        }
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + offset as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = start + offset == selection.choice();
        frame.render_widget(Paragraph::new(format_row(format, selected, row_area.width)), row_area);
    }

    let footer = match selection.phase() {
        Phase::Browsing => Line::from(vec![
            Span::styled(
                format!("page {}/{}  ", selection.page() + 1, selection.total_pages()),
                theme::style_secondary(),
            ),
            Span::styled("j/k move  h/l page  enter download  backspace back", theme::style_muted()),
        ]),
        Phase::Downloading => Line::from(vec![
            Span::styled(
                format!("{} ", SPINNER_FRAMES[spinner % SPINNER_FRAMES.len()]),
                theme::style_busy(),
            ),
            Span::styled(
                format!("Downloading {}…", selection.selected().quality()),
                theme::style_busy(),
            ),
        ]),
        Phase::Done => Line::from(Span::styled(
            "Done. Saved under the downloads directory — backspace to go again.",
            theme::style_success(),
        )),
        Phase::Error(msg) => Line::from(Span::styled(
            truncated(msg, rows[2].width),
            theme::style_error(),
        )),
    };
    frame.render_widget(Paragraph::new(footer), rows[2]);
}

fn format_row(format: &Format, selected: bool, width: u16) -> Line<'static> {
    let base = if selected {
        theme::style_selected()
    } else {
        theme::style_default()
    };
    let dim = if selected {
        theme::style_selected().add_modifier(Modifier::DIM)
    } else {
        theme::style_secondary()
    };
    let marker = if selected { "▸ " } else { "  " };

    let mut spans = vec![Span::styled(marker.to_string(), theme::style_accent())];
    match &format.detail {
        FormatDetail::Video {
            container,
            quality,
            resolution,
            filesize,
        } => {
            spans.push(Span::styled(format!("{quality:<16}"), base));
            spans.push(Span::styled(format!("{resolution:<12}"), dim));
            spans.push(Span::styled(format!("{container:<8}"), dim));
            spans.push(Span::styled(filesize.clone(), dim));
        }
        FormatDetail::Audio {
            container,
            quality,
            filesize,
        } => {
            spans.push(Span::styled(format!("{quality:<16}"), base));
            spans.push(Span::styled(format!("{container:<14}"), dim));
            spans.push(Span::styled(filesize.clone(), dim));
        }
        FormatDetail::Subtitle { code, name } => {
            spans.push(Span::styled(format!("{name:<20}"), base));
            spans.push(Span::styled(code.clone(), dim));
        }
    }

    let mut line = Line::from(spans);
    if line.width() > width as usize {
        // Rebuild as a single truncated span; column alignment is lost but
        // nothing wraps.
        let flat: String = line.spans.iter().map(|s| s.content.as_ref()).collect::<String>();
        line = Line::from(Span::styled(truncated(&flat, width), base));
    }
    line
}

// ── Status bar ────────────────────────────────────────────────────────────────

pub fn draw_status_bar(frame: &mut Frame, area: Rect, hint: &str) {
    frame.render_widget(
        Paragraph::new(Span::styled(hint, theme::style_muted()))
            .style(Style::default().bg(theme::C_SELECTION_BG)),
        area,
    );
}

fn truncated(text: &str, width: u16) -> String {
    let width = width as usize;
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
