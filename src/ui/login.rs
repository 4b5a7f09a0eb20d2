use crossterm::event::KeyEvent;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::components::form::{render_form, FormEvent, FormField, FormState};

const USERNAME: usize = 0;
const PASSWORD: usize = 1;

pub enum LoginAction {
    Exit,
    SignIn { username: String, password: String },
}

pub struct LoginState {
    form: FormState,
    error: Option<String>,
}

impl Default for LoginState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginState {
    pub fn new() -> Self {
        Self {
            form: FormState::new(vec![FormField::text("Username"), FormField::secret("Password")]),
            error: None,
        }
    }

    /// Clears the password after a failed attempt, keeping the username.
    pub fn reset_password(&mut self) {
        if let Some(field) = self.form.fields.get_mut(PASSWORD) {
            field.value.clear();
        }
    }
}

pub fn render_login<B: Backend>(frame: &mut Frame<B>, state: &mut LoginState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(2),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(frame.size());

    let title = Paragraph::new("Construction Manager")
        .style(
            Style::default()
                .fg(Color::Rgb(255, 165, 0))
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    render_form(frame, &state.form, chunks[1], "Sign In");

    let footer = match &state.error {
        Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(state.form.help_text()).style(Style::default().fg(Color::Gray)),
    };
    frame.render_widget(footer, chunks[2]);
}

pub fn handle_key(state: &mut LoginState, key: KeyEvent) -> Option<LoginAction> {
    match state.form.handle_key(key)? {
        FormEvent::Cancel => Some(LoginAction::Exit),
        FormEvent::Submit => {
            if let Some(label) = state.form.first_missing() {
                state.error = Some(format!("{} is required", label));
                return None;
            }
            state.error = None;
            Some(LoginAction::SignIn {
                username: state.form.value(USERNAME).to_string(),
                password: state.form.fields[PASSWORD].value.clone(),
            })
        }
    }
}
