use crossterm::event::{KeyCode, KeyEvent};
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::{AboutUs, PasswordChange, User};
use crate::store::{AppStore, Language};
use crate::ui::components::form::{render_form, FormEvent, FormField, FormState};
use crate::ui::components::popup::render_loading;

const CURRENT: usize = 0;
const NEW: usize = 1;
const CONFIRM: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MenuItem {
    ChangePassword,
    Language,
    AboutUs,
    PrivacyPolicy,
    TermsOfService,
    Logout,
}

impl MenuItem {
    const ALL: [MenuItem; 6] = [
        MenuItem::ChangePassword,
        MenuItem::Language,
        MenuItem::AboutUs,
        MenuItem::PrivacyPolicy,
        MenuItem::TermsOfService,
        MenuItem::Logout,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuItem::ChangePassword => "Change Password",
            MenuItem::Language => "Language",
            MenuItem::AboutUs => "About Us",
            MenuItem::PrivacyPolicy => "Privacy Policy",
            MenuItem::TermsOfService => "Terms of Service",
            MenuItem::Logout => "Logout",
        }
    }
}

pub enum SettingsMessage {
    About(ApiResult<AboutUs>),
    Document(ApiResult<Value>),
}

enum View {
    Menu,
    ChangePassword(FormState),
    Document {
        title: &'static str,
        lines: Option<Vec<String>>,
        scroll: u16,
    },
}

pub enum SettingsAction {
    Back,
    ChangePassword(PasswordChange),
    SetLanguage(Language),
    Logout,
}

// Represents the state of the settings screen
pub struct SettingsState {
    api: ApiClient,
    user: User,
    language_rx: watch::Receiver<Language>,
    list_state: ListState,
    view: View,
    error: Option<String>,
    tasks: ScreenTasks<SettingsMessage>,
}

impl SettingsState {
    pub fn new(api: &ApiClient, store: &AppStore, user: User) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            api: api.clone(),
            user,
            language_rx: store.subscribe_language(),
            list_state,
            view: View::Menu,
            error: None,
            tasks: ScreenTasks::new(),
        }
    }

    pub fn update(&mut self) {
        for message in self.tasks.drain() {
            let lines = match message {
                SettingsMessage::About(Ok(about)) => about_lines(&about),
                SettingsMessage::Document(Ok(document)) => document_lines(&document),
                SettingsMessage::About(Err(err)) | SettingsMessage::Document(Err(err)) => {
                    warn!(error = %err, "error fetching settings document");
                    vec!["This information is not available right now.".to_string()]
                }
            };
            if let View::Document { lines: slot, .. } = &mut self.view {
                *slot = Some(lines);
            }
        }
    }

    /// Returns to the menu after a completed password change.
    pub fn show_menu(&mut self) {
        self.tasks.restart();
        self.view = View::Menu;
        self.error = None;
    }

    fn selected(&self) -> MenuItem {
        MenuItem::ALL[self.list_state.selected().unwrap_or(0)]
    }

    fn move_selection(&mut self, forward: bool) {
        let len = MenuItem::ALL.len();
        let i = self.list_state.selected().unwrap_or(0);
        let i = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.list_state.select(Some(i));
    }

    fn open_document(&mut self, item: MenuItem) {
        self.tasks.restart();
        let api = self.api.clone();
        match item {
            MenuItem::AboutUs => self
                .tasks
                .spawn(async move { SettingsMessage::About(api.about_us().await) }),
            MenuItem::PrivacyPolicy => self
                .tasks
                .spawn(async move { SettingsMessage::Document(api.document("privacy-policy").await) }),
            MenuItem::TermsOfService => self
                .tasks
                .spawn(async move { SettingsMessage::Document(api.document("terms-of-service").await) }),
            _ => return,
        }
        self.view = View::Document {
            title: item.label(),
            lines: None,
            scroll: 0,
        };
    }

    fn password_change(&self, form: &FormState) -> Result<PasswordChange, String> {
        if let Some(label) = form.first_missing() {
            return Err(format!("{} is required", label));
        }
        let new_password = form.fields[NEW].value.clone();
        if new_password != form.fields[CONFIRM].value {
            return Err("New passwords do not match".to_string());
        }
        Ok(PasswordChange {
            user_id: self.user.user_id.clone(),
            current_password: form.fields[CURRENT].value.clone(),
            new_password,
        })
    }
}

fn about_lines(about: &AboutUs) -> Vec<String> {
    [
        ("Company", &about.company_name),
        ("Mission", &about.mission),
        ("Email", &about.contact_email),
        ("Phone", &about.contact_phone),
        ("Address", &about.address),
    ]
    .iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| format!("{}: {}", label, value))
    .collect()
}

/// Flattens an arbitrary JSON document into readable lines.
fn document_lines(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    push_lines(value, None, 0, &mut lines);
    lines
}

fn push_lines(value: &Value, label: Option<&str>, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let heading = label.map(humanize);
    match value {
        Value::Object(map) => {
            let depth = match heading {
                Some(heading) => {
                    lines.push(format!("{}{}", indent, heading));
                    depth + 1
                }
                None => depth,
            };
            for (key, value) in map {
                push_lines(value, Some(key), depth, lines);
            }
        }
        Value::Array(items) => {
            let depth = match heading {
                Some(heading) => {
                    lines.push(format!("{}{}", indent, heading));
                    depth + 1
                }
                None => depth,
            };
            for item in items {
                push_lines(item, None, depth, lines);
            }
        }
        Value::Null => {}
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match heading {
                Some(heading) => lines.push(format!("{}{}: {}", indent, heading, text)),
                None => lines.push(format!("{}{}", indent, text)),
            }
        }
    }
}

fn humanize(key: &str) -> String {
    let mut text = key.replace('_', " ");
    if let Some(first) = text.get(..1) {
        let upper = first.to_uppercase();
        text.replace_range(..1, &upper);
    }
    text
}

pub fn render_settings<B: Backend>(frame: &mut Frame<B>, state: &mut SettingsState) {
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
        Span::styled("Settings  ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(state.user.full_name.clone(), Style::default().fg(Color::Gray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let language = *state.language_rx.borrow();
    let help = match &mut state.view {
        View::Menu => {
            let items: Vec<ListItem> = MenuItem::ALL
                .iter()
                .map(|item| {
                    let text = match item {
                        MenuItem::Language => format!(
                            "{} ({})",
                            item.label(),
                            match language {
                                Language::English => "English",
                                Language::Chinese => "中文",
                            }
                        ),
                        _ => item.label().to_string(),
                    };
                    ListItem::new(text)
                })
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL))
                .highlight_style(
                    Style::default()
                        .bg(Color::Blue)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                );
            frame.render_stateful_widget(list, chunks[1], &mut state.list_state);
            "<Enter> Open | <Up>/<Down> Move | <Esc> Back".to_string()
        }
        View::ChangePassword(form) => {
            render_form(frame, form, chunks[1], "Change Password");
            state
                .error
                .clone()
                .unwrap_or_else(|| form.help_text().to_string())
        }
        View::Document { title, lines, scroll } => match lines {
            None => {
                render_loading(frame, chunks[1]);
                "<Esc> Back".to_string()
            }
            Some(lines) => {
                let text: Vec<Spans> = lines.iter().map(|line| Spans::from(line.as_str())).collect();
                let document = Paragraph::new(text)
                    .wrap(Wrap { trim: false })
                    .scroll((*scroll, 0))
                    .block(Block::default().borders(Borders::ALL).title(*title));
                frame.render_widget(document, chunks[1]);
                "<Up>/<Down> Scroll | <Esc> Back".to_string()
            }
        },
    };

    let color = if state.error.is_some() { Color::Red } else { Color::White };
    let footer = Paragraph::new(help)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(color));
    frame.render_widget(footer, chunks[2]);
}

pub fn handle_key(state: &mut SettingsState, key: KeyEvent) -> Option<SettingsAction> {
    match &mut state.view {
        View::ChangePassword(form) => {
            match form.handle_key(key)? {
                FormEvent::Cancel => state.show_menu(),
                FormEvent::Submit => {
                    let form = form.clone();
                    match state.password_change(&form) {
                        Ok(change) => {
                            state.error = None;
                            return Some(SettingsAction::ChangePassword(change));
                        }
                        Err(error) => state.error = Some(error),
                    }
                }
            }
            return None;
        }
        View::Document { scroll, .. } => {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => state.show_menu(),
                KeyCode::Down => *scroll = scroll.saturating_add(1),
                KeyCode::Up => *scroll = scroll.saturating_sub(1),
                _ => {}
            }
            return None;
        }
        View::Menu => {}
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => return Some(SettingsAction::Back),
        KeyCode::Down => state.move_selection(true),
        KeyCode::Up => state.move_selection(false),
        KeyCode::Enter => match state.selected() {
            MenuItem::ChangePassword => {
                state.error = None;
                state.view = View::ChangePassword(FormState::new(vec![
                    FormField::secret("Current Password"),
                    FormField::secret("New Password"),
                    FormField::secret("Confirm New Password"),
                ]));
            }
            MenuItem::Language => {
                let language = state.language_rx.borrow().toggle();
                return Some(SettingsAction::SetLanguage(language));
            }
            MenuItem::Logout => return Some(SettingsAction::Logout),
            item => state.open_document(item),
        },
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

    fn user() -> User {
        User {
            full_name: "Kim Lee".to_string(),
            user_id: "7".to_string(),
            company_id: None,
        }
    }

    #[test]
    fn documents_flatten_to_lines() {
        let document = serde_json::json!({
            "title": "Privacy Policy",
            "sections": [{"heading": "Data", "body": "We keep little."}],
            "version": 2
        });
        let lines = document_lines(&document);
        assert!(lines.contains(&"Title: Privacy Policy".to_string()));
        assert!(lines.contains(&"Sections".to_string()));
        assert!(lines.contains(&"  Body: We keep little.".to_string()));
        assert!(lines.contains(&"Version: 2".to_string()));
    }

    #[test]
    fn about_skips_blank_fields() {
        let about = AboutUs {
            company_name: "Acme Build".to_string(),
            contact_phone: "555".to_string(),
            ..AboutUs::default()
        };
        assert_eq!(about_lines(&about), vec!["Company: Acme Build", "Phone: 555"]);
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let store = AppStore::new();
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let mut state = SettingsState::new(&api, &store, user());
        handle_key(&mut state, key(KeyCode::Enter));

        if let View::ChangePassword(form) = &mut state.view {
            form.fields[CURRENT].value = "old".to_string();
            form.fields[NEW].value = "new-one".to_string();
            form.fields[CONFIRM].value = "new-two".to_string();
        }
        assert!(handle_key(&mut state, key(KeyCode::Char('s'))).is_none());
        assert_eq!(state.error.as_deref(), Some("New passwords do not match"));

        if let View::ChangePassword(form) = &mut state.view {
            form.fields[CONFIRM].value = "new-one".to_string();
        }
        match handle_key(&mut state, key(KeyCode::Char('s'))) {
            Some(SettingsAction::ChangePassword(change)) => {
                assert_eq!(change.user_id, "7");
                assert_eq!(change.new_password, "new-one");
            }
            _ => panic!("expected a password change"),
        }
    }

    #[test]
    fn language_entry_toggles_current_language() {
        let store = AppStore::new();
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let mut state = SettingsState::new(&api, &store, user());
        handle_key(&mut state, key(KeyCode::Down));
        match handle_key(&mut state, key(KeyCode::Enter)) {
            Some(SettingsAction::SetLanguage(language)) => assert_eq!(language, Language::Chinese),
            _ => panic!("expected a language change"),
        }
    }

    #[tokio::test]
    async fn privacy_policy_is_fetched_and_shown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/privacy-policy"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": "Be nice."})),
            )
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut state = SettingsState::new(&api, &store, user());
        for _ in 0..3 {
            handle_key(&mut state, key(KeyCode::Down));
        }
        handle_key(&mut state, key(KeyCode::Enter));

        for _ in 0..200 {
            state.update();
            if !state.tasks.is_loading() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        match &state.view {
            View::Document { title, lines: Some(lines), .. } => {
                assert_eq!(*title, "Privacy Policy");
                assert_eq!(lines, &vec!["Content: Be nice.".to_string()]);
            }
            _ => panic!("expected the policy"),
        }

        handle_key(&mut state, key(KeyCode::Esc));
        assert!(matches!(state.view, View::Menu));
    }
}
