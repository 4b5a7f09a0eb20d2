use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::{ConstructionCategory, Project};
use crate::store::Tab;
use crate::ui::components::popup::{centered_rect, render_loading};

pub enum CategoryListAction {
    Back,
    Progress,
    FloorPlans,
    AddCategory(String),
    /// The chosen tab together with every tab of the project.
    Open { active: Tab, available: Vec<Tab> },
}

// Represents the state of the construction category screen
pub struct CategoriesState {
    project: Project,
    categories: Vec<ConstructionCategory>,
    list_state: ListState,
    new_name: Option<String>,
    tasks: ScreenTasks<ApiResult<Vec<ConstructionCategory>>>,
}

impl CategoriesState {
    pub fn new(api: &ApiClient, project: Project) -> Self {
        let mut state = Self {
            project,
            categories: Vec::new(),
            list_state: ListState::default(),
            new_name: None,
            tasks: ScreenTasks::new(),
        };
        state.reload(api);
        state
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn reload(&mut self, api: &ApiClient) {
        self.tasks.restart();
        let api = api.clone();
        let project_id = self.project.project_id.clone();
        self.tasks
            .spawn(async move { api.categories(&project_id).await });
    }

    pub fn update(&mut self) {
        for result in self.tasks.drain() {
            let categories = result.unwrap_or_else(|err| {
                warn!(error = %err, "error fetching construction categories");
                Vec::new()
            });
            self.list_state
                .select(if categories.is_empty() { None } else { Some(0) });
            self.categories = categories;
        }
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.categories
            .iter()
            .map(|category| Tab {
                key: category.cc_id.clone(),
                label: category.cc_name.clone(),
            })
            .collect()
    }

    pub fn next(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.categories.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.categories.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }
}

pub fn render_categories<B: Backend>(frame: &mut Frame<B>, state: &mut CategoriesState) {
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

    let header = Paragraph::new(Spans::from(vec![
        Span::styled(
            state.project.project_title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            state
                .project
                .quotee_mobile
                .as_deref()
                .map(|mobile| format!("  {}", mobile))
                .unwrap_or_default(),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Project"));
    frame.render_widget(header, chunks[0]);

    if state.tasks.is_loading() {
        render_loading(frame, chunks[1]);
    } else {
        let items: Vec<ListItem> = state
            .categories
            .iter()
            .map(|category| ListItem::new(category.cc_name.clone()))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title("Construction Categories")
                    .borders(Borders::ALL),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_stateful_widget(list, chunks[1], &mut state.list_state);
    }

    let buttons = Paragraph::new(
        "<Enter> Open | <A> Add Category | <P> Progress | <B> Floor Plans | <R> Reload | <Esc> Back",
    )
    .block(Block::default().borders(Borders::TOP))
    .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);

    if let Some(name) = &state.new_name {
        let area = centered_rect(50, 20, size);
        let popup = Paragraph::new(vec![
            Spans::from(""),
            Spans::from(format!("Name: {}|", name)),
            Spans::from(""),
            Spans::from("<Enter> Add  <Esc> Cancel"),
        ])
        .block(Block::default().title("New Category").borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

pub fn handle_key(
    state: &mut CategoriesState,
    api: &ApiClient,
    key: KeyEvent,
) -> Option<CategoryListAction> {
    if let Some(name) = &mut state.new_name {
        match key.code {
            KeyCode::Esc => state.new_name = None,
            KeyCode::Enter => {
                let name = name.trim().to_string();
                if !name.is_empty() {
                    state.new_name = None;
                    return Some(CategoryListAction::AddCategory(name));
                }
            }
            KeyCode::Char(c) => name.push(c),
            KeyCode::Backspace => {
                name.pop();
            }
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(CategoryListAction::Back),
        KeyCode::Char('p') => return Some(CategoryListAction::Progress),
        KeyCode::Char('b') => return Some(CategoryListAction::FloorPlans),
        KeyCode::Char('a') => state.new_name = Some(String::new()),
        KeyCode::Char('r') => state.reload(api),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Enter => {
            let available = state.tabs();
            let active = state
                .list_state
                .selected()
                .and_then(|i| available.get(i).cloned());
            if let Some(active) = active {
                return Some(CategoryListAction::Open { active, available });
            }
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn project() -> Project {
        Project {
            project_id: "p1".to_string(),
            project_title: "Harbour View".to_string(),
            quotee_name: None,
            quotee_mobile: None,
            project_start_date: None,
            project_end_date: None,
        }
    }

    #[tokio::test]
    async fn enter_opens_selected_category_with_all_tabs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-construction-category-from-project/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "construction categories": [
                    {"cc_id": 11, "cc_name": "Plumbing"},
                    {"cc_id": 12, "cc_name": "Electrical"}
                ]
            })))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut state = CategoriesState::new(&api, project());
        for _ in 0..200 {
            state.update();
            if !state.tasks.is_loading() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        handle_key(&mut state, &api, key(KeyCode::Down));
        match handle_key(&mut state, &api, key(KeyCode::Enter)) {
            Some(CategoryListAction::Open { active, available }) => {
                assert_eq!(active.key, "12");
                assert_eq!(active.label, "Electrical");
                assert_eq!(available.len(), 2);
            }
            _ => panic!("expected the category to open"),
        }
    }

    #[test]
    fn add_category_popup_requires_a_name() {
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let mut state = CategoriesState {
            project: project(),
            categories: Vec::new(),
            list_state: ListState::default(),
            new_name: None,
            tasks: ScreenTasks::new(),
        };

        handle_key(&mut state, &api, key(KeyCode::Char('a')));
        assert!(handle_key(&mut state, &api, key(KeyCode::Enter)).is_none());
        for c in "Tiling".chars() {
            handle_key(&mut state, &api, key(KeyCode::Char(c)));
        }
        match handle_key(&mut state, &api, key(KeyCode::Enter)) {
            Some(CategoryListAction::AddCategory(name)) => assert_eq!(name, "Tiling"),
            _ => panic!("expected a new category"),
        }
        assert!(state.new_name.is_none());
    }

    #[test]
    fn b_opens_floor_plans() {
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let mut state = CategoriesState {
            project: project(),
            categories: Vec::new(),
            list_state: ListState::default(),
            new_name: None,
            tasks: ScreenTasks::new(),
        };
        assert!(matches!(
            handle_key(&mut state, &api, key(KeyCode::Char('b'))),
            Some(CategoryListAction::FloorPlans)
        ));
    }
}
