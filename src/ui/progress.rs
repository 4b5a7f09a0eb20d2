use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::watch;
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::{CategoryProgress, Project, ProjectProgress};
use crate::progress::{
    category_bar, status_color, COMPLETED_COLOR, PROJECT_BAR_COLOR, RISKY_COLOR, UPCOMING_COLOR,
};
use crate::store::AppStore;
use crate::ui::components::bar;
use crate::ui::components::popup::{centered_rect, render_loading};

pub const NO_CATEGORIES: &str = "There are no categories available.";

pub enum ProgressMessage {
    Project(ApiResult<ProjectProgress>),
    Categories(ApiResult<Vec<CategoryProgress>>),
}

pub enum ProgressAction {
    Back,
}

// Represents the state of the progress screen
pub struct ProgressState {
    api: ApiClient,
    project_rx: watch::Receiver<Option<Project>>,
    project_id: Option<String>,
    project_title: String,
    project: Option<ProjectProgress>,
    categories: Vec<CategoryProgress>,
    tasks: ScreenTasks<ProgressMessage>,
    show_legend: bool,
    scroll: usize,
}

impl ProgressState {
    pub fn new(api: ApiClient, store: &AppStore) -> Self {
        let mut project_rx = store.subscribe_project();
        project_rx.borrow_and_update();

        let mut state = Self {
            api,
            project_rx,
            project_id: None,
            project_title: String::new(),
            project: None,
            categories: Vec::new(),
            tasks: ScreenTasks::new(),
            show_legend: false,
            scroll: 0,
        };
        state.load();
        state
    }

    /// Issues both progress requests for the active project, cancelling any
    /// that are still running from an earlier load. A different project
    /// starts from an empty view.
    fn load(&mut self) {
        self.tasks.restart();
        let project = self.project_rx.borrow().clone();
        let project_id = project.as_ref().map(|p| p.project_id.clone());
        if project_id != self.project_id {
            self.project_id = project_id;
            self.project = None;
            self.categories.clear();
            self.scroll = 0;
            self.project_title.clear();
        }
        let Some(project) = project else {
            return;
        };
        self.project_title = project.project_title.clone();

        let api = self.api.clone();
        let project_id = project.project_id.clone();
        self.tasks.spawn(async move {
            ProgressMessage::Project(api.project_progress(&project_id).await)
        });

        let api = self.api.clone();
        let project_id = project.project_id;
        self.tasks.spawn(async move {
            ProgressMessage::Categories(api.category_progress(&project_id).await)
        });
    }

    /// Reloads when the active project changed and applies finished fetches.
    pub fn update(&mut self) {
        if self.project_rx.has_changed().unwrap_or(false) {
            self.project_rx.borrow_and_update();
            self.load();
        }
        for message in self.tasks.drain() {
            self.apply(message);
        }
    }

    // Failures keep whatever was shown before.
    fn apply(&mut self, message: ProgressMessage) {
        match message {
            ProgressMessage::Project(Ok(progress)) => self.project = Some(progress),
            ProgressMessage::Project(Err(err)) => {
                warn!(error = %err, "error fetching project progress");
            }
            ProgressMessage::Categories(Ok(categories)) => {
                self.categories = categories;
                self.scroll = 0;
            }
            ProgressMessage::Categories(Err(err)) => {
                warn!(error = %err, "error fetching category progress");
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_loading()
    }

    pub fn toggle_legend(&mut self) {
        self.show_legend = !self.show_legend;
    }

    pub fn scroll_down(&mut self) {
        if self.scroll + 1 < self.categories.len() {
            self.scroll += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}

pub fn render_progress<B: Backend>(frame: &mut Frame<B>, state: &mut ProgressState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    if state.is_loading() {
        render_loading(frame, chunks[0]);
    } else {
        render_header(frame, state, chunks[0]);
    }

    let project_block = Block::default().borders(Borders::ALL).title("Project");
    let track_area = project_block.inner(chunks[1]);
    let progress = state.project.as_ref().map(|p| p.progress_percent).unwrap_or(0.0);
    frame.render_widget(project_block, chunks[1]);
    frame.render_widget(Paragraph::new(bar::project_bar(progress, track_area.width)), track_area);

    render_categories(frame, state, chunks[2]);

    let buttons = Paragraph::new("<Up/Down> Scroll | <I> Color Information | <Esc> Back")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);

    if state.show_legend {
        render_legend(frame, size);
    }
}

fn render_header<B: Backend>(frame: &mut Frame<B>, state: &ProgressState, area: Rect) {
    let duration = state
        .project
        .as_ref()
        .and_then(|p| p.project_duration)
        .map(|days| format!("{} Days", days))
        .unwrap_or_default();

    let header = Paragraph::new(Spans::from(vec![
        Span::styled(
            " Progress ",
            Style::default()
                .fg(Color::Rgb(255, 165, 0))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(duration, Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(state.project_title.clone()),
    );
    frame.render_widget(header, area);
}

fn render_categories<B: Backend>(frame: &mut Frame<B>, state: &ProgressState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Categories");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.categories.is_empty() && state.is_loading() {
        render_loading(frame, inner);
        return;
    }
    if state.categories.is_empty() {
        let empty = Paragraph::new(NO_CATEGORIES).style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, inner);
        return;
    }

    // Each category takes a name line and a bar line.
    let mut lines = Vec::new();
    for category in state.categories.iter().skip(state.scroll) {
        lines.push(Spans::from(Span::styled(
            category.cc_name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        let geometry = state.project.as_ref().and_then(|project| {
            category_bar(
                &category.start_date,
                &category.end_date,
                project.project_start_date,
                project.project_end_date,
            )
        });
        match geometry {
            Some(geometry) => lines.push(bar::category_bar(
                &geometry,
                status_color(&category.category_status),
                inner.width,
            )),
            None => lines.push(Spans::from("")),
        }
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_legend<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let area = centered_rect(50, 40, size);
    let swatch = |color: Color, text: &'static str| {
        Spans::from(vec![
            Span::styled("  ", Style::default().bg(color)),
            Span::raw(" "),
            Span::raw(text),
        ])
    };

    let legend = Paragraph::new(vec![
        Spans::from(""),
        swatch(PROJECT_BAR_COLOR, "Yellow: Whole Project Progress"),
        swatch(COMPLETED_COLOR, "Green: Completed"),
        swatch(RISKY_COLOR, "Orange: Risky/Uncompleted"),
        swatch(UPCOMING_COLOR, "Gray: Upcoming"),
        Spans::from(""),
        Spans::from("<I> Close"),
    ])
    .block(Block::default().title("Color Information").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, area);
    frame.render_widget(legend, area);
}

pub fn handle_key(state: &mut ProgressState, key: KeyEvent) -> Option<ProgressAction> {
    match key.code {
        KeyCode::Char('i') => state.toggle_legend(),
        KeyCode::Esc if state.show_legend => state.toggle_legend(),
        KeyCode::Char('q') | KeyCode::Esc => return Some(ProgressAction::Back),
        KeyCode::Down => state.scroll_down(),
        KeyCode::Up => state.scroll_up(),
        _ => {}
    }
    None
}
