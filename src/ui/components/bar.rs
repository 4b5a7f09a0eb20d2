use tui::{
    style::{Color, Style},
    text::{Span, Spans},
};

use crate::progress::{filled_cells, project_fill_percent, CategoryBar, PROJECT_BAR_COLOR};

const TRACK_COLOR: Color = Color::Rgb(0xe0, 0xe0, 0xe0);
const CATEGORY_TRACK_COLOR: Color = Color::White;

fn blank(cells: u16, color: Color) -> Span<'static> {
    Span::styled(" ".repeat(cells as usize), Style::default().bg(color))
}

/// The whole-project bar: gold fill from the left edge.
pub fn project_bar(progress: f64, track: u16) -> Spans<'static> {
    let filled = filled_cells(project_fill_percent(progress), track);
    Spans::from(vec![
        blank(filled, PROJECT_BAR_COLOR),
        blank(track - filled, TRACK_COLOR),
    ])
}

/// A category bar positioned inside the project track.
pub fn category_bar(bar: &CategoryBar, color: Color, track: u16) -> Spans<'static> {
    let (start, len) = bar.cells(track);
    let rest = track.saturating_sub(start + len);
    Spans::from(vec![
        blank(start, CATEGORY_TRACK_COLOR),
        blank(len, color),
        blank(rest, CATEGORY_TRACK_COLOR),
    ])
}
