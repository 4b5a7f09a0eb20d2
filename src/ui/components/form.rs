use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::ui::components::date_input::DateInputState;

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    Secret,
    Date(DateInputState),
    /// `(value, label)` pairs cycled with Left/Right.
    Choice { options: Vec<(String, String)>, index: usize },
}

#[derive(Clone, Debug)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub kind: FieldKind,
}

impl FormField {
    pub fn text(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Text,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Secret,
        }
    }

    pub fn date(label: &'static str, date: NaiveDate) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Date(DateInputState::new(date)),
        }
    }

    pub fn choice(label: &'static str, options: Vec<(String, String)>) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Choice { options, index: 0 },
        }
    }

    fn display_value(&self, editing: bool) -> String {
        match &self.kind {
            FieldKind::Text => format!("{}{}", self.value, if editing { "|" } else { "" }),
            FieldKind::Secret => format!(
                "{}{}",
                "*".repeat(self.value.chars().count()),
                if editing { "|" } else { "" }
            ),
            FieldKind::Date(date) => date.get_display_string(),
            FieldKind::Choice { options, index } => match options.get(*index) {
                Some((_, label)) if editing => format!("< {} >", label),
                Some((_, label)) => label.clone(),
                None => "(none available)".to_string(),
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FormEvent {
    Submit,
    Cancel,
}

/// Field list navigated with Up/Down; Enter toggles editing of the current field.
#[derive(Clone, Debug)]
pub struct FormState {
    pub fields: Vec<FormField>,
    pub current: usize,
    pub editing: bool,
}

impl FormState {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            current: 0,
            editing: false,
        }
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.current = (self.current + 1) % self.fields.len();
        }
    }

    pub fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.current = (self.current + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        let editing = self.editing;
        if let Some(FormField {
            kind: FieldKind::Date(date),
            ..
        }) = self.fields.get_mut(self.current)
        {
            if editing {
                date.start_editing();
            } else {
                date.stop_editing();
            }
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }
        let Some(field) = self.fields.get_mut(self.current) else {
            return;
        };

        match &mut field.kind {
            FieldKind::Text | FieldKind::Secret => match key {
                KeyCode::Char(c) => field.value.push(c),
                KeyCode::Backspace => {
                    field.value.pop();
                }
                _ => {}
            },
            FieldKind::Date(date) => date.handle_input(key),
            FieldKind::Choice { options, index } => {
                if options.is_empty() {
                    return;
                }
                match key {
                    KeyCode::Right => *index = (*index + 1) % options.len(),
                    KeyCode::Left => *index = (*index + options.len() - 1) % options.len(),
                    _ => {}
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<FormEvent> {
        match key.code {
            KeyCode::Esc => {
                if self.editing {
                    self.toggle_editing();
                } else {
                    return Some(FormEvent::Cancel);
                }
            }
            KeyCode::Enter => self.toggle_editing(),
            KeyCode::Up | KeyCode::BackTab if !self.editing => self.previous_field(),
            KeyCode::Down | KeyCode::Tab if !self.editing => self.next_field(),
            KeyCode::Char('s') if !self.editing => return Some(FormEvent::Submit),
            code if self.editing => self.edit_current_field(code),
            _ => {}
        }
        None
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields
            .get(index)
            .map(|field| field.value.trim())
            .unwrap_or_default()
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        match self.fields.get(index).map(|field| &field.kind) {
            Some(FieldKind::Date(date)) => Some(date.date),
            _ => None,
        }
    }

    /// Value of the selected option of a choice field.
    pub fn choice(&self, index: usize) -> Option<&str> {
        match self.fields.get(index).map(|field| &field.kind) {
            Some(FieldKind::Choice { options, index }) => {
                options.get(*index).map(|(value, _)| value.as_str())
            }
            _ => None,
        }
    }

    /// Label of the first text field left blank.
    pub fn first_missing(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|field| {
                matches!(field.kind, FieldKind::Text | FieldKind::Secret) && field.value.trim().is_empty()
            })
            .map(|field| field.label)
    }

    pub fn help_text(&self) -> &'static str {
        if !self.editing {
            return "Enter - Edit field | Up/Down - Navigate fields | S - Submit | Esc - Cancel";
        }
        match self.fields.get(self.current).map(|field| &field.kind) {
            Some(FieldKind::Date(_)) => {
                "Enter - Save field | Left/Right - Switch date part | Esc - Cancel editing"
            }
            Some(FieldKind::Choice { .. }) => "Left/Right - Choose | Enter - Save field",
            _ => "Enter - Save field | Esc - Cancel editing",
        }
    }
}

pub fn render_form<B: Backend>(frame: &mut Frame<B>, form: &FormState, area: Rect, title: &str) {
    let items: Vec<ListItem> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let selected = i == form.current;
            let editing = selected && form.editing;
            let label_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let value_style = if editing {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", field.label), label_style),
                Span::styled(field.display_value(editing), value_style),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn login_form() -> FormState {
        FormState::new(vec![FormField::text("Username"), FormField::secret("Password")])
    }

    #[test]
    fn typing_requires_edit_mode() {
        let mut form = login_form();
        form.handle_key(key(KeyCode::Char('x')));
        assert_eq!(form.value(0), "");

        form.handle_key(key(KeyCode::Enter));
        for c in "kim".chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
        form.handle_key(key(KeyCode::Enter));
        assert_eq!(form.value(0), "kim");
        assert_eq!(form.first_missing(), Some("Password"));
    }

    #[test]
    fn s_submits_only_outside_edit_mode() {
        let mut form = login_form();
        form.handle_key(key(KeyCode::Enter));
        assert_eq!(form.handle_key(key(KeyCode::Char('s'))), None);
        assert_eq!(form.value(0), "s");
        form.handle_key(key(KeyCode::Esc));
        assert_eq!(form.handle_key(key(KeyCode::Char('s'))), Some(FormEvent::Submit));
        assert_eq!(form.handle_key(key(KeyCode::Esc)), Some(FormEvent::Cancel));
    }

    #[test]
    fn secret_is_masked() {
        let mut form = login_form();
        form.fields[1].value = "hunter2".to_string();
        assert_eq!(form.fields[1].display_value(false), "*******");
    }

    #[test]
    fn choice_cycles_with_arrows() {
        let mut form = FormState::new(vec![FormField::choice(
            "Area",
            vec![("1".into(), "Kitchen".into()), ("2".into(), "Bathroom".into())],
        )]);
        assert_eq!(form.choice(0), Some("1"));
        form.handle_key(key(KeyCode::Enter));
        form.handle_key(key(KeyCode::Left));
        assert_eq!(form.choice(0), Some("2"));
        form.handle_key(key(KeyCode::Right));
        assert_eq!(form.choice(0), Some("1"));
    }
}
