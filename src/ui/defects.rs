use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;
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
use crate::models::{Area, Defect};
use crate::ui::category::{CategoryContext, Submission};
use crate::ui::components::form::{render_form, FormEvent, FormField, FormState};
use crate::ui::components::popup::{centered_rect, render_loading};

const DESCRIPTION: usize = 0;
const AREA: usize = 1;
const PICTURE: usize = 2;

pub enum DefectsMessage {
    Defects(ApiResult<Vec<Defect>>),
    Areas(ApiResult<Vec<Area>>),
}

enum Popup {
    Add(FormState),
    Repair { defect_id: String, form: FormState },
}

pub struct DefectsState {
    api: ApiClient,
    defects: Vec<Defect>,
    areas: Vec<Area>,
    list_state: ListState,
    popup: Option<Popup>,
    error: Option<String>,
    tasks: ScreenTasks<DefectsMessage>,
}

impl DefectsState {
    pub fn new(api: &ApiClient, context: &CategoryContext) -> Self {
        let mut tasks = ScreenTasks::new();

        let fetch_api = api.clone();
        let cc_id = context.cc_id.clone();
        tasks.spawn(async move { DefectsMessage::Defects(fetch_api.defects(&cc_id).await) });

        let fetch_api = api.clone();
        let project_id = context.project_id.clone();
        tasks.spawn(async move { DefectsMessage::Areas(fetch_api.areas(&project_id).await) });

        Self {
            api: api.clone(),
            defects: Vec::new(),
            areas: Vec::new(),
            list_state: ListState::default(),
            popup: None,
            error: None,
            tasks,
        }
    }

    pub fn update(&mut self) {
        for message in self.tasks.drain() {
            match message {
                DefectsMessage::Defects(result) => {
                    self.defects = result.unwrap_or_else(|err| {
                        warn!(error = %err, "error fetching defects");
                        Vec::new()
                    });
                    self.list_state
                        .select(if self.defects.is_empty() { None } else { Some(0) });
                }
                DefectsMessage::Areas(result) => {
                    self.areas = result.unwrap_or_else(|err| {
                        warn!(error = %err, "error fetching areas");
                        Vec::new()
                    });
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_loading()
    }

    pub fn is_capturing(&self) -> bool {
        self.popup.is_some()
    }

    fn area_name(&self, area_id: Option<&str>) -> &str {
        area_id
            .and_then(|id| self.areas.iter().find(|area| area.area_id == id))
            .map(|area| area.description.as_str())
            .unwrap_or("")
    }

    fn selected(&self) -> Option<&Defect> {
        self.list_state.selected().and_then(|i| self.defects.get(i))
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.defects.len();
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        let i = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.list_state.select(Some(i));
    }

    fn open_add(&mut self) {
        let options = self
            .areas
            .iter()
            .map(|area| (area.area_id.clone(), area.description.clone()))
            .collect();
        self.error = None;
        self.popup = Some(Popup::Add(FormState::new(vec![
            FormField::text("Description"),
            FormField::choice("Area", options),
            FormField::text("Picture file"),
        ])));
    }

    fn open_repair(&mut self) {
        let Some(defect) = self.selected() else {
            return;
        };
        if defect.is_repaired() {
            self.error = Some("This defect is already repaired".to_string());
            return;
        }
        let defect_id = defect.defect_id.clone();
        self.error = None;
        self.popup = Some(Popup::Repair {
            defect_id,
            form: FormState::new(vec![FormField::text("After repair picture")]),
        });
    }
}

fn add_submission(form: &FormState) -> Result<Submission, String> {
    if let Some(label) = form.first_missing() {
        return Err(format!("{} is required", label));
    }
    let area_id = form
        .choice(AREA)
        .ok_or_else(|| "Add an area to the project first".to_string())?;
    Ok(Submission::AddDefect {
        description: form.value(DESCRIPTION).to_string(),
        area_id: area_id.to_string(),
        picture: PathBuf::from(form.value(PICTURE)),
    })
}

pub fn render_defects<B: Backend>(frame: &mut Frame<B>, state: &mut DefectsState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(area);

    if state.is_loading() && state.popup.is_none() {
        render_loading(frame, chunks[0]);
    } else {
        let items: Vec<ListItem> = state
            .defects
            .iter()
            .map(|defect| {
                let (status, color) = if defect.is_repaired() {
                    ("Repaired", Color::Green)
                } else {
                    ("Pending", Color::Red)
                };
                let mut lines = vec![Spans::from(vec![
                    Span::styled(format!("{:<9}", status), Style::default().fg(color)),
                    Span::styled(
                        defect.defect_description.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", state.area_name(defect.area_id.as_deref())),
                        Style::default().fg(Color::Gray),
                    ),
                ])];
                for (label, path) in [
                    ("before", defect.before_picture_path()),
                    ("after", defect.after_picture_path()),
                ] {
                    if let Some(path) = path {
                        lines.push(Spans::from(Span::styled(
                            format!("         {}: {}", label, state.api.url(&path)),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
                ListItem::new(lines)
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().title("Defects").borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_stateful_widget(list, chunks[0], &mut state.list_state);
    }

    let footer = match (&state.error, &state.popup) {
        (Some(error), None) => {
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red))
        }
        _ => Paragraph::new("<A> Add defect | <M> Mark repaired")
            .style(Style::default().fg(Color::Gray)),
    };
    frame.render_widget(footer, chunks[1]);

    let (form, title) = match &state.popup {
        Some(Popup::Add(form)) => (form, "New Defect"),
        Some(Popup::Repair { form, .. }) => (form, "Mark Repaired"),
        None => return,
    };
    let popup_area = centered_rect(60, 40, frame.size());
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

pub fn handle_key(state: &mut DefectsState, key: KeyEvent) -> Option<Submission> {
    if let Some(popup) = &mut state.popup {
        let form = match popup {
            Popup::Add(form) => form,
            Popup::Repair { form, .. } => form,
        };
        let event = form.handle_key(key)?;
        if event == FormEvent::Cancel {
            state.popup = None;
            state.error = None;
            return None;
        }

        let submission = match &state.popup {
            Some(Popup::Add(form)) => add_submission(form),
            Some(Popup::Repair { defect_id, form }) => match form.first_missing() {
                Some(label) => Err(format!("{} is required", label)),
                None => Ok(Submission::MarkRepaired {
                    defect_id: defect_id.clone(),
                    picture: PathBuf::from(form.value(0)),
                }),
            },
            None => return None,
        };
        match submission {
            Ok(submission) => {
                state.popup = None;
                state.error = None;
                return Some(submission);
            }
            Err(error) => state.error = Some(error),
        }
        return None;
    }

    state.error = None;
    match key.code {
        KeyCode::Char('a') => state.open_add(),
        KeyCode::Char('m') => state.open_repair(),
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

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state(defects: serde_json::Value) -> DefectsState {
        let defects: Vec<Defect> = serde_json::from_value(defects).unwrap();
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        DefectsState {
            api: ApiClient::with_base_url("http://api.test").unwrap(),
            defects,
            areas: vec![Area {
                area_id: "4".to_string(),
                description: "Kitchen".to_string(),
            }],
            list_state,
            popup: None,
            error: None,
            tasks: ScreenTasks::new(),
        }
    }

    fn fill(state: &mut DefectsState, index: usize, value: &str) {
        if let Some(Popup::Add(form) | Popup::Repair { form, .. }) = &mut state.popup {
            form.fields[index].value = value.to_string();
        }
    }

    #[test]
    fn add_defect_uses_chosen_area() {
        let mut state = state(serde_json::json!([]));
        handle_key(&mut state, key(KeyCode::Char('a')));
        fill(&mut state, DESCRIPTION, "Cracked tile");
        assert!(handle_key(&mut state, key(KeyCode::Char('s'))).is_none());
        assert_eq!(state.error.as_deref(), Some("Picture file is required"));

        fill(&mut state, PICTURE, "/tmp/tile.jpg");
        match handle_key(&mut state, key(KeyCode::Char('s'))) {
            Some(Submission::AddDefect { description, area_id, picture }) => {
                assert_eq!(description, "Cracked tile");
                assert_eq!(area_id, "4");
                assert_eq!(picture, PathBuf::from("/tmp/tile.jpg"));
            }
            _ => panic!("expected a new defect"),
        }
    }

    #[test]
    fn repaired_defect_cannot_be_marked_again() {
        let mut state = state(serde_json::json!([{
            "defect_id": 1, "defect_description": "Leak",
            "pic_af_repair_document": {"pic_af_repair_id": 2, "extension": "png"}
        }]));
        handle_key(&mut state, key(KeyCode::Char('m')));
        assert!(!state.is_capturing());
        assert!(state.error.is_some());
    }

    #[test]
    fn mark_repaired_sends_picture() {
        let mut state = state(serde_json::json!([{"defect_id": 9, "defect_description": "Leak"}]));
        handle_key(&mut state, key(KeyCode::Char('m')));
        fill(&mut state, 0, "after.png");
        match handle_key(&mut state, key(KeyCode::Char('s'))) {
            Some(Submission::MarkRepaired { defect_id, picture }) => {
                assert_eq!(defect_id, "9");
                assert_eq!(picture, PathBuf::from("after.png"));
            }
            _ => panic!("expected a repair"),
        }
        assert!(!state.is_capturing());
    }
}
