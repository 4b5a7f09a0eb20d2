use tracing::warn;
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::ContactBook;
use crate::ui::category::CategoryContext;
use crate::ui::components::popup::render_loading;

pub struct ContactsState {
    book: ContactBook,
    scroll: u16,
    tasks: ScreenTasks<ApiResult<ContactBook>>,
}

impl ContactsState {
    pub fn new(api: &ApiClient, context: &CategoryContext) -> Self {
        let mut tasks = ScreenTasks::new();
        let api = api.clone();
        let user_id = context.user.user_id.clone();
        tasks.spawn(async move { api.contacts(&user_id).await });

        Self {
            book: ContactBook::default(),
            scroll: 0,
            tasks,
        }
    }

    pub fn update(&mut self) {
        for result in self.tasks.drain() {
            self.book = result.unwrap_or_else(|err| {
                warn!(error = %err, "error fetching contacts");
                ContactBook::default()
            });
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    fn lines(&self) -> Vec<Spans<'static>> {
        let groups = self.book.ordered_groups();
        if groups.is_empty() {
            return vec![Spans::from("No contacts available.")];
        }

        let mut lines = Vec::new();
        for (role, contacts) in groups {
            lines.push(Spans::from(Span::styled(
                role,
                Style::default()
                    .fg(Color::Rgb(255, 165, 0))
                    .add_modifier(Modifier::BOLD),
            )));
            for contact in contacts {
                lines.push(Spans::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        contact.username.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        "  {}  {}",
                        contact.user_mobile.as_deref().unwrap_or("-"),
                        contact.user_email.as_deref().unwrap_or("-")
                    )),
                ]));
            }
            lines.push(Spans::from(""));
        }
        lines
    }
}

pub fn render_contacts<B: Backend>(frame: &mut Frame<B>, state: &mut ContactsState, area: Rect) {
    if state.tasks.is_loading() {
        render_loading(frame, area);
        return;
    }
    let contacts = Paragraph::new(state.lines())
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0))
        .block(Block::default().title("Contacts").borders(Borders::ALL));
    frame.render_widget(contacts, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_render_in_fixed_order() {
        let book: ContactBook = serde_json::from_value(serde_json::json!({
            "grouped_contacts": {
                "Admin": [{"user_id": 2, "username": "ada", "user_email": "ada@site.hk"}],
                "Management Team": [{"user_id": 1, "username": "boss"}]
            }
        }))
        .unwrap();
        let state = ContactsState {
            book,
            scroll: 0,
            tasks: ScreenTasks::new(),
        };

        let text: Vec<String> = state
            .lines()
            .iter()
            .map(|line| line.0.iter().map(|span| span.content.as_ref()).collect())
            .collect();
        assert_eq!(text[0], "Management Team");
        assert_eq!(text[1], "  boss  -  -");
        assert_eq!(text[3], "Admin");
        assert_eq!(text[4], "  ada  -  ada@site.hk");
    }

    #[test]
    fn empty_book_has_placeholder() {
        let state = ContactsState {
            book: ContactBook::default(),
            scroll: 0,
            tasks: ScreenTasks::new(),
        };
        assert_eq!(state.lines().len(), 1);
    }
}
