use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, warn};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::{Area, FloorPlan, NewArea, Project};
use crate::ui::components::form::{render_form, FormEvent, FormField, FormState};
use crate::ui::components::popup::{centered_rect, render_loading};

const PLAN_NAME: usize = 0;
const PLAN_FILE: usize = 1;

pub enum BlueprintAction {
    Back,
    AddArea(NewArea),
    UploadPlan {
        area_id: String,
        name: String,
        file: PathBuf,
    },
}

enum Popup {
    AddArea(FormState),
    Upload { area_id: String, form: FormState },
}

// Represents the state of the floor plan screen. The first entry of the
// area list is the project's main floor plan.
pub struct BlueprintState {
    api: ApiClient,
    project_id: String,
    project_title: String,
    areas: Vec<Area>,
    plans: Vec<FloorPlan>,
    list_state: ListState,
    popup: Option<Popup>,
    error: Option<String>,
    area_tasks: ScreenTasks<ApiResult<Vec<Area>>>,
    plan_tasks: ScreenTasks<ApiResult<Vec<FloorPlan>>>,
}

impl BlueprintState {
    pub fn new(api: &ApiClient, project: &Project) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        let mut state = Self {
            api: api.clone(),
            project_id: project.project_id.clone(),
            project_title: project.project_title.clone(),
            areas: Vec::new(),
            plans: Vec::new(),
            list_state,
            popup: None,
            error: None,
            area_tasks: ScreenTasks::new(),
            plan_tasks: ScreenTasks::new(),
        };
        state.reload_areas();
        state.load_plans();
        state
    }

    pub fn reload_areas(&mut self) {
        self.area_tasks.restart();
        let api = self.api.clone();
        let project_id = self.project_id.clone();
        self.area_tasks
            .spawn(async move { api.areas(&project_id).await });
    }

    /// Fetches the plans of the highlighted entry, dropping any earlier request.
    pub fn load_plans(&mut self) {
        self.plan_tasks.restart();
        self.plans.clear();
        let api = self.api.clone();
        match self.selected_area() {
            Some(area) => {
                let area_id = area.area_id.clone();
                self.plan_tasks
                    .spawn(async move { api.area_floor_plans(&area_id).await });
            }
            None => {
                let project_id = self.project_id.clone();
                self.plan_tasks
                    .spawn(async move { api.floor_plans(&project_id).await });
            }
        }
    }

    pub fn update(&mut self) {
        for result in self.area_tasks.drain() {
            self.areas = result.unwrap_or_else(|err| {
                warn!(error = %err, "error fetching areas");
                Vec::new()
            });
            if self.list_state.selected().unwrap_or(0) > self.areas.len() {
                self.list_state.select(Some(0));
                self.load_plans();
            }
        }
        for result in self.plan_tasks.drain() {
            // An area without plans answers with a server error.
            self.plans = result.unwrap_or_else(|err| {
                debug!(error = %err, "no floor plans");
                Vec::new()
            });
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.popup.is_some()
    }

    fn selected_area(&self) -> Option<&Area> {
        match self.list_state.selected() {
            Some(i) if i > 0 => self.areas.get(i - 1),
            _ => None,
        }
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.areas.len() + 1;
        let i = self.list_state.selected().unwrap_or(0);
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        if next != i {
            self.list_state.select(Some(next));
            self.load_plans();
        }
    }

    fn open_add_area(&mut self) {
        self.error = None;
        self.popup = Some(Popup::AddArea(FormState::new(vec![FormField::text(
            "Description",
        )])));
    }

    fn open_upload(&mut self) {
        let Some(area) = self.selected_area() else {
            self.error = Some("Choose an area to upload a floor plan".to_string());
            return;
        };
        let area_id = area.area_id.clone();
        self.error = None;
        self.popup = Some(Popup::Upload {
            area_id,
            form: FormState::new(vec![
                FormField::text("Floor plan name"),
                FormField::text("File"),
            ]),
        });
    }

    fn submission(&self) -> Option<Result<BlueprintAction, String>> {
        let popup = self.popup.as_ref()?;
        let form = match popup {
            Popup::AddArea(form) | Popup::Upload { form, .. } => form,
        };
        if let Some(label) = form.first_missing() {
            return Some(Err(format!("{} is required", label)));
        }
        Some(Ok(match popup {
            Popup::AddArea(form) => BlueprintAction::AddArea(NewArea {
                description: form.value(0).to_string(),
                project_id: self.project_id.clone(),
            }),
            Popup::Upload { area_id, form } => BlueprintAction::UploadPlan {
                area_id: area_id.clone(),
                name: form.value(PLAN_NAME).to_string(),
                file: PathBuf::from(form.value(PLAN_FILE)),
            },
        }))
    }
}

pub fn render_blueprint<B: Backend>(frame: &mut Frame<B>, state: &mut BlueprintState) {
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

    let header = Paragraph::new(Span::styled(
        state.project_title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::ALL).title("Floor Plans"));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(chunks[1]);

    if state.area_tasks.is_loading() {
        render_loading(frame, body[0]);
    } else {
        let mut items = vec![ListItem::new("Main")];
        items.extend(
            state
                .areas
                .iter()
                .map(|area| ListItem::new(area.description.clone())),
        );
        let list = List::new(items)
            .block(Block::default().title("Areas").borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_stateful_widget(list, body[0], &mut state.list_state);
    }

    render_plans(frame, state, body[1]);

    let footer = match (&state.error, &state.popup) {
        (Some(error), None) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        _ => Paragraph::new("<A> Add Area | <U> Upload Floor Plan | <R> Reload | <Esc> Back")
            .style(Style::default().fg(Color::White)),
    }
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    let (form, title) = match &state.popup {
        Some(Popup::AddArea(form)) => (form, "Add Area"),
        Some(Popup::Upload { form, .. }) => (form, "Add Floor Plan"),
        None => return,
    };
    let popup_area = centered_rect(60, 30, size);
    let popup_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)].as_ref())
        .split(popup_area);
    frame.render_widget(Clear, popup_area);
    render_form(frame, form, popup_chunks[0], title);
    let help = match &state.error {
        Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(form.help_text()),
    };
    frame.render_widget(help, popup_chunks[1]);
}

fn render_plans<B: Backend>(frame: &mut Frame<B>, state: &BlueprintState, area: Rect) {
    if state.plan_tasks.is_loading() {
        render_loading(frame, area);
        return;
    }
    let block = Block::default().title("Files").borders(Borders::ALL);
    if state.plans.is_empty() {
        let empty = Paragraph::new("No floor plans uploaded.")
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let mut lines = Vec::new();
    for plan in &state.plans {
        lines.push(Spans::from(vec![
            Span::styled(plan.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                plan.content_type
                    .as_deref()
                    .map(|kind| format!("  {}", kind))
                    .unwrap_or_default(),
                Style::default().fg(Color::Gray),
            ),
        ]));
        lines.push(Spans::from(Span::styled(
            format!("  {}", plan.path),
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn handle_key(state: &mut BlueprintState, key: KeyEvent) -> Option<BlueprintAction> {
    if let Some(popup) = &mut state.popup {
        let form = match popup {
            Popup::AddArea(form) | Popup::Upload { form, .. } => form,
        };
        match form.handle_key(key)? {
            FormEvent::Cancel => {
                state.popup = None;
                state.error = None;
            }
            FormEvent::Submit => match state.submission()? {
                Ok(action) => {
                    state.popup = None;
                    state.error = None;
                    return Some(action);
                }
                Err(error) => state.error = Some(error),
            },
        }
        return None;
    }

    state.error = None;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(BlueprintAction::Back),
        KeyCode::Char('a') => state.open_add_area(),
        KeyCode::Char('u') => state.open_upload(),
        KeyCode::Char('r') => {
            state.reload_areas();
            state.load_plans();
        }
        KeyCode::Down => state.move_selection(true),
        KeyCode::Up => state.move_selection(false),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::time::Duration;
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

    async fn settle(state: &mut BlueprintState) {
        for _ in 0..200 {
            state.update();
            if !state.area_tasks.is_loading() && !state.plan_tasks.is_loading() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("floor plan fetches never finished");
    }

    fn fill(state: &mut BlueprintState, index: usize, value: &str) {
        if let Some(Popup::AddArea(form) | Popup::Upload { form, .. }) = &mut state.popup {
            form.fields[index].value = value.to_string();
        }
    }

    async fn mounted() -> (MockServer, BlueprintState) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/all-area-descriptions-of-one-project/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "area_descriptions": [
                    {"area_id": 4, "description": "Kitchen"},
                    {"area_id": 5, "description": "Bathroom"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/project-details/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "floor_plan_documents": [{"floor_plan_id": 1, "extension": "pdf", "name": "Site"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get-floor-plan-id-from-area/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pic_details": [{"image_url": "/9.pdf", "floor_plan_name": "Cabinets"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get-floor-plan-id-from-area/5"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut state = BlueprintState::new(&api, &project());
        settle(&mut state).await;
        (server, state)
    }

    #[tokio::test]
    async fn main_plans_load_first_and_areas_switch_files() {
        let (_server, mut state) = mounted().await;
        assert_eq!(state.areas.len(), 2);
        assert_eq!(state.plans[0].name, "Site");

        handle_key(&mut state, key(KeyCode::Down));
        settle(&mut state).await;
        assert_eq!(state.plans.len(), 1);
        assert_eq!(state.plans[0].name, "Cabinets");

        // The server answers 500 for an area without plans.
        handle_key(&mut state, key(KeyCode::Down));
        settle(&mut state).await;
        assert!(state.plans.is_empty());
    }

    #[tokio::test]
    async fn upload_needs_an_area_and_both_fields() {
        let (_server, mut state) = mounted().await;

        handle_key(&mut state, key(KeyCode::Char('u')));
        assert!(!state.is_capturing());
        assert!(state.error.is_some());

        handle_key(&mut state, key(KeyCode::Down));
        handle_key(&mut state, key(KeyCode::Char('u')));
        assert!(state.is_capturing());
        fill(&mut state, PLAN_NAME, "Cabinet layout");
        assert!(handle_key(&mut state, key(KeyCode::Char('s'))).is_none());
        assert_eq!(state.error.as_deref(), Some("File is required"));

        fill(&mut state, PLAN_FILE, "/tmp/cabinets.pdf");
        match handle_key(&mut state, key(KeyCode::Char('s'))) {
            Some(BlueprintAction::UploadPlan { area_id, name, file }) => {
                assert_eq!(area_id, "4");
                assert_eq!(name, "Cabinet layout");
                assert_eq!(file, PathBuf::from("/tmp/cabinets.pdf"));
            }
            _ => panic!("expected a floor plan upload"),
        }
        assert!(!state.is_capturing());
    }

    #[tokio::test]
    async fn new_area_belongs_to_project() {
        let (_server, mut state) = mounted().await;
        handle_key(&mut state, key(KeyCode::Char('a')));
        assert!(handle_key(&mut state, key(KeyCode::Char('s'))).is_none());
        assert_eq!(state.error.as_deref(), Some("Description is required"));

        fill(&mut state, 0, "Balcony");
        match handle_key(&mut state, key(KeyCode::Char('s'))) {
            Some(BlueprintAction::AddArea(area)) => {
                assert_eq!(area.description, "Balcony");
                assert_eq!(area.project_id, "p1");
            }
            _ => panic!("expected a new area"),
        }
    }

    #[tokio::test]
    async fn escape_leaves_screen() {
        let (_server, mut state) = mounted().await;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Esc)),
            Some(BlueprintAction::Back)
        ));
    }
}
