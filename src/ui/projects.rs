use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::Project;
use crate::ui::components::popup::render_loading;

// Represents the state of the project selection screen
pub struct ProjectsState {
    user_id: String,
    projects: Vec<Project>,
    search: String,
    searching: bool,
    list_state: ListState,
    tasks: ScreenTasks<ApiResult<Vec<Project>>>,
}

pub enum ProjectAction {
    Exit,
    NewProject,
    SelectProject(Project),
    Settings,
}

impl ProjectsState {
    pub fn new(api: &ApiClient, user_id: String) -> Self {
        let mut state = Self {
            user_id,
            projects: Vec::new(),
            search: String::new(),
            searching: false,
            list_state: ListState::default(),
            tasks: ScreenTasks::new(),
        };
        state.reload(api);
        state
    }

    pub fn reload(&mut self, api: &ApiClient) {
        self.tasks.restart();
        let api = api.clone();
        let user_id = self.user_id.clone();
        self.tasks
            .spawn(async move { api.projects_for_user(&user_id).await });
    }

    pub fn update(&mut self) {
        for result in self.tasks.drain() {
            match result {
                Ok(projects) => self.set_projects(projects),
                Err(err) => {
                    warn!(error = %err, "error fetching projects");
                    self.set_projects(Vec::new());
                }
            }
        }
    }

    fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        let selected = if self.filtered().is_empty() { None } else { Some(0) };
        self.list_state.select(selected);
    }

    /// Projects whose title contains the search text, ignoring case.
    pub fn filtered(&self) -> Vec<&Project> {
        let needle = self.search.to_lowercase();
        self.projects
            .iter()
            .filter(|project| project.project_title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn next(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.list_state
            .selected()
            .and_then(|i| self.filtered().get(i).copied())
    }

    fn edit_search(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.search.push(c),
            KeyCode::Backspace => {
                self.search.pop();
            }
            _ => return,
        }
        self.reset_selection();
    }
}

pub fn render_projects<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectsState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    let search_style = if state.searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let search = Paragraph::new(format!(
        "{}{}",
        state.search,
        if state.searching { "|" } else { "" }
    ))
    .style(search_style)
    .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(search, chunks[0]);

    if state.tasks.is_loading() {
        render_loading(frame, chunks[1]);
    } else {
        let items: Vec<ListItem> = state
            .filtered()
            .into_iter()
            .map(|project| {
                let dates = match (&project.project_start_date, &project.project_end_date) {
                    (Some(start), Some(end)) => format!(" ({} to {})", start, end),
                    (Some(start), None) => format!(" (from {})", start),
                    _ => String::new(),
                };
                let quotee = project
                    .quotee_name
                    .as_deref()
                    .map(|name| format!(" - {}", name))
                    .unwrap_or_default();

                ListItem::new(Spans::from(vec![
                    Span::raw(project.project_title.clone()),
                    Span::styled(dates, Style::default().fg(Color::Gray)),
                    Span::raw(quotee),
                ]))
            })
            .collect();

        let title = if items.is_empty() {
            "Projects (none found)"
        } else {
            "Projects"
        };
        let projects_list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_stateful_widget(projects_list, chunks[1], &mut state.list_state);
    }

    let buttons_text = if state.searching {
        "Type to filter | <Enter>/<Esc> Done"
    } else if state.selected_project().is_some() {
        "</> Search | <N> New Project | <Enter> Open | <R> Reload | <S> Settings | <Q> Quit"
    } else {
        "</> Search | <N> New Project | <R> Reload | <S> Settings | <Q> Quit"
    };
    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_key(
    state: &mut ProjectsState,
    api: &ApiClient,
    key: KeyEvent,
) -> Option<ProjectAction> {
    if state.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => state.searching = false,
            code => state.edit_search(code),
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ProjectAction::Exit),
        KeyCode::Char('/') => state.searching = true,
        KeyCode::Char('n') => return Some(ProjectAction::NewProject),
        KeyCode::Char('s') => return Some(ProjectAction::Settings),
        KeyCode::Char('r') => state.reload(api),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Enter => {
            if let Some(project) = state.selected_project() {
                return Some(ProjectAction::SelectProject(project.clone()));
            }
        }
        _ => {}
    }
    None
}
