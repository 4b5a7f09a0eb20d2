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
use crate::models::{NewTask, Task};
use crate::ui::category::{CategoryContext, Submission};
use crate::ui::components::form::{render_form, FormEvent, FormField, FormState};
use crate::ui::components::popup::{centered_rect, render_loading};

const DESCRIPTION: usize = 0;
const START: usize = 1;
const END: usize = 2;

pub struct MilestonesState {
    context: CategoryContext,
    tasks_list: Vec<Task>,
    list_state: ListState,
    form: Option<FormState>,
    error: Option<String>,
    tasks: ScreenTasks<ApiResult<Vec<Task>>>,
}

impl MilestonesState {
    pub fn new(api: &ApiClient, context: CategoryContext) -> Self {
        let mut tasks = ScreenTasks::new();
        let api = api.clone();
        let cc_id = context.cc_id.clone();
        tasks.spawn(async move { api.tasks(&cc_id).await });

        Self {
            context,
            tasks_list: Vec::new(),
            list_state: ListState::default(),
            form: None,
            error: None,
            tasks,
        }
    }

    pub fn update(&mut self) {
        for result in self.tasks.drain() {
            self.tasks_list = result.unwrap_or_else(|err| {
                warn!(error = %err, "error fetching milestones");
                Vec::new()
            });
            self.list_state
                .select(if self.tasks_list.is_empty() { None } else { Some(0) });
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_loading()
    }

    pub fn is_capturing(&self) -> bool {
        self.form.is_some()
    }

    fn open_form(&mut self) {
        let today = chrono::Local::now().date_naive();
        self.error = None;
        self.form = Some(FormState::new(vec![
            FormField::text("Description"),
            FormField::date("Start Date", today),
            FormField::date("End Date", today),
        ]));
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.tasks_list.len();
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        let i = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.list_state.select(Some(i));
    }

    fn new_task(&self, form: &FormState) -> Result<NewTask, String> {
        if let Some(label) = form.first_missing() {
            return Err(format!("{} is required", label));
        }
        let (Some(start_date), Some(end_date)) = (form.date(START), form.date(END)) else {
            return Err("Both dates are required".to_string());
        };
        if end_date < start_date {
            return Err("End date cannot be before the start date".to_string());
        }
        Ok(NewTask {
            user_id: self.context.user.user_id.clone(),
            cc_id: self.context.cc_id.clone(),
            tb_description: form.value(DESCRIPTION).to_string(),
            start_date,
            end_date,
        })
    }
}

pub fn render_milestones<B: Backend>(frame: &mut Frame<B>, state: &mut MilestonesState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(area);

    if state.is_loading() {
        render_loading(frame, chunks[0]);
    } else {
        let items: Vec<ListItem> = state
            .tasks_list
            .iter()
            .map(|task| {
                let (mark, color) = if task.task_completion_status {
                    ("✔", Color::Green)
                } else {
                    ("○", Color::Gray)
                };
                let dates = match (&task.start_date, &task.end_date) {
                    (Some(start), Some(end)) => format!("  {} to {}", start, end),
                    _ => String::new(),
                };
                ListItem::new(Spans::from(vec![
                    Span::styled(format!("{} ", mark), Style::default().fg(color)),
                    Span::styled(
                        task.tb_description.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(dates, Style::default().fg(Color::Gray)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().title("Milestones").borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_stateful_widget(list, chunks[0], &mut state.list_state);
    }

    let footer = Paragraph::new("<A> Add milestone").style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, chunks[1]);

    if let Some(form) = &state.form {
        let popup_area = centered_rect(60, 40, frame.size());
        let popup_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(2)].as_ref())
            .split(popup_area);
        frame.render_widget(Clear, popup_area);
        render_form(frame, form, popup_chunks[0], "New Milestone");
        let help = match &state.error {
            Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            None => Paragraph::new(form.help_text()),
        };
        frame.render_widget(help.style(Style::default().bg(Color::Black)), popup_chunks[1]);
    }
}

pub fn handle_key(state: &mut MilestonesState, key: KeyEvent) -> Option<Submission> {
    if let Some(form) = &mut state.form {
        match form.handle_key(key)? {
            FormEvent::Cancel => state.form = None,
            FormEvent::Submit => {
                let form = form.clone();
                match state.new_task(&form) {
                    Ok(task) => {
                        state.form = None;
                        return Some(Submission::AddTask(task));
                    }
                    Err(error) => state.error = Some(error),
                }
            }
        }
        return None;
    }

    match key.code {
        KeyCode::Char('a') => state.open_form(),
        KeyCode::Down => state.move_selection(true),
        KeyCode::Up => state.move_selection(false),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::ui::components::form::FieldKind;
    use chrono::NaiveDate;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> MilestonesState {
        MilestonesState {
            context: CategoryContext {
                project_id: "p1".to_string(),
                cc_id: "11".to_string(),
                cc_name: "Plumbing".to_string(),
                user: User {
                    full_name: "Kim".to_string(),
                    user_id: "7".to_string(),
                    company_id: None,
                },
            },
            tasks_list: Vec::new(),
            list_state: ListState::default(),
            form: None,
            error: None,
            tasks: ScreenTasks::new(),
        }
    }

    fn set_date(state: &mut MilestonesState, index: usize, date: NaiveDate) {
        if let Some(form) = &mut state.form {
            if let FieldKind::Date(input) = &mut form.fields[index].kind {
                input.date = date;
            }
        }
    }

    #[test]
    fn end_before_start_keeps_form_open() {
        let mut state = state();
        handle_key(&mut state, key(KeyCode::Char('a')));
        if let Some(form) = &mut state.form {
            form.fields[DESCRIPTION].value = "Pour slab".to_string();
        }
        set_date(&mut state, START, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        set_date(&mut state, END, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        assert!(handle_key(&mut state, key(KeyCode::Char('s'))).is_none());
        assert!(state.is_capturing());
        assert!(state.error.is_some());
    }

    #[test]
    fn submit_builds_task_for_category() {
        let mut state = state();
        handle_key(&mut state, key(KeyCode::Char('a')));
        if let Some(form) = &mut state.form {
            form.fields[DESCRIPTION].value = " Pour slab ".to_string();
        }
        set_date(&mut state, START, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        set_date(&mut state, END, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        match handle_key(&mut state, key(KeyCode::Char('s'))) {
            Some(Submission::AddTask(task)) => {
                assert_eq!(task.tb_description, "Pour slab");
                assert_eq!(task.cc_id, "11");
                assert_eq!(task.user_id, "7");
            }
            _ => panic!("expected a new task"),
        }
        assert!(!state.is_capturing());
    }
}
