use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::api::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

/// A modal message that stays up until the next key press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }

    pub fn from_api(context: &str, err: &ApiError) -> Self {
        Self::error(format!("{}: {}", context, err.user_message()))
    }
}

pub fn render_alert<B: Backend>(frame: &mut Frame<B>, alert: &Alert) {
    let (title, color) = match alert.kind {
        AlertKind::Success => ("Success", Color::Green),
        AlertKind::Error => ("Error", Color::Red),
    };
    let area = centered_rect(60, 25, frame.size());

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(alert.message.as_str()),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().title(title).borders(Borders::ALL))
    .style(Style::default().fg(color).bg(Color::Black));

    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

pub fn render_loading<B: Backend>(frame: &mut Frame<B>, area: Rect) {
    let loading = Paragraph::new("Loading...")
        .style(Style::default().fg(Color::Rgb(255, 165, 0)))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(loading, area);
}

// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
