use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::{OrderKind, OrderRecord, ProofKind};
use crate::ui::category::{CategoryContext, Submission};
use crate::ui::components::popup::{centered_rect, render_loading};

pub enum OrdersMessage {
    Records(ApiResult<Vec<OrderRecord>>),
    Links(ProofKind, ApiResult<Vec<String>>),
}

enum Mode {
    Browse,
    Upload {
        kind: ProofKind,
        cr_id: String,
        paths: String,
    },
    Links {
        kind: ProofKind,
        links: Option<Vec<String>>,
    },
}

/// Confirmation records or variable orders of one category.
pub struct OrdersState {
    api: ApiClient,
    kind: OrderKind,
    records: Vec<OrderRecord>,
    list_state: ListState,
    mode: Mode,
    tasks: ScreenTasks<OrdersMessage>,
}

impl OrdersState {
    pub fn new(api: &ApiClient, context: &CategoryContext, kind: OrderKind) -> Self {
        let mut tasks = ScreenTasks::new();
        let fetch_api = api.clone();
        let cc_id = context.cc_id.clone();
        tasks.spawn(async move {
            let records = match kind {
                OrderKind::Confirmation => fetch_api.confirmed_products(&cc_id).await,
                OrderKind::Variable => fetch_api.variable_orders(&cc_id).await,
            };
            OrdersMessage::Records(records)
        });

        Self {
            api: api.clone(),
            kind,
            records: Vec::new(),
            list_state: ListState::default(),
            mode: Mode::Browse,
            tasks,
        }
    }

    pub fn update(&mut self) {
        for message in self.tasks.drain() {
            match message {
                OrdersMessage::Records(result) => {
                    self.records = result.unwrap_or_else(|err| {
                        warn!(error = %err, kind = self.kind.label(), "error fetching order records");
                        Vec::new()
                    });
                    self.list_state
                        .select(if self.records.is_empty() { None } else { Some(0) });
                }
                OrdersMessage::Links(kind, result) => {
                    let links = result.unwrap_or_else(|err| {
                        warn!(error = %err, "error fetching proof pictures");
                        Vec::new()
                    });
                    if let Mode::Links { kind: shown, links: slot } = &mut self.mode {
                        if *shown == kind {
                            *slot = Some(links);
                        }
                    }
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_loading()
    }

    /// Whether a popup is consuming every key.
    pub fn is_capturing(&self) -> bool {
        !matches!(self.mode, Mode::Browse)
    }

    fn selected(&self) -> Option<&OrderRecord> {
        self.list_state.selected().and_then(|i| self.records.get(i))
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        let i = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.list_state.select(Some(i));
    }

    fn start_upload(&mut self, kind: ProofKind) {
        if let Some(record) = self.selected() {
            self.mode = Mode::Upload {
                kind,
                cr_id: record.cr_id.clone(),
                paths: String::new(),
            };
        }
    }

    fn show_links(&mut self, kind: ProofKind) {
        let Some(cr_id) = self.selected().map(|record| record.cr_id.clone()) else {
            return;
        };
        let api = self.api.clone();
        self.tasks
            .spawn(async move { OrdersMessage::Links(kind, api.proof_images(kind, &cr_id).await) });
        self.mode = Mode::Links { kind, links: None };
    }
}

/// Splits a comma separated list of file paths.
fn parse_paths(input: &str) -> Vec<PathBuf> {
    input
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn flag(done: bool) -> Span<'static> {
    if done {
        Span::styled("■", Style::default().fg(Color::Green))
    } else {
        Span::styled("▲", Style::default().fg(Color::Red))
    }
}

fn proof_title(kind: ProofKind) -> &'static str {
    match kind {
        ProofKind::Order => "Order Status Proof",
        ProofKind::Delivery => "Delivery Status Proof",
    }
}

pub fn render_orders<B: Backend>(frame: &mut Frame<B>, state: &mut OrdersState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(area);

    if state.is_loading() && !state.is_capturing() {
        render_loading(frame, chunks[0]);
    } else {
        let mut items = vec![ListItem::new(Spans::from(Span::styled(
            "Product  Description                 Qty  Order  Delivery",
            Style::default().fg(Color::Rgb(0xee, 0xd7, 0x74)),
        )))];
        items.extend(state.records.iter().map(|record| {
            let description = format!(
                "{} {}",
                record.product_no.as_deref().unwrap_or(""),
                record.spec.as_deref().unwrap_or("")
            );
            ListItem::new(Spans::from(vec![
                Span::raw("   "),
                flag(record.product_status),
                Span::raw("    "),
                Span::styled(
                    format!("{:<28}", description),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "{:>3}  ",
                    record.quantity.map(|q| q.to_string()).unwrap_or_default()
                )),
                Span::raw("  "),
                flag(record.order_status),
                Span::raw("      "),
                flag(record.delivery_status),
            ]))
        }));

        // The header row shifts list positions by one.
        let mut list_state = ListState::default();
        list_state.select(state.list_state.selected().map(|i| i + 1));
        let list = List::new(items)
            .block(Block::default().title(state.kind.label()).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_stateful_widget(list, chunks[0], &mut list_state);
    }

    let help = Paragraph::new(
        "<O> Upload order proof | <D> Upload delivery proof | <V>/<W> View order/delivery proof",
    )
    .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, chunks[1]);

    match &state.mode {
        Mode::Browse => {}
        Mode::Upload { kind, paths, .. } => {
            let popup_area = centered_rect(70, 30, frame.size());
            let popup = Paragraph::new(vec![
                Spans::from(""),
                Spans::from("Image files, separated by commas:"),
                Spans::from(format!("{}|", paths)),
                Spans::from(""),
                Spans::from("<Enter> Upload  <Esc> Cancel"),
            ])
            .wrap(Wrap { trim: false })
            .block(Block::default().title(proof_title(*kind)).borders(Borders::ALL))
            .style(Style::default().fg(Color::White).bg(Color::Black));
            frame.render_widget(Clear, popup_area);
            frame.render_widget(popup, popup_area);
        }
        Mode::Links { kind, links } => {
            let popup_area = centered_rect(70, 50, frame.size());
            let mut lines = vec![Spans::from("")];
            match links {
                None => lines.push(Spans::from("Loading...")),
                Some(links) if links.is_empty() => lines.push(Spans::from("No pictures uploaded yet.")),
                Some(links) => lines.extend(links.iter().map(|link| Spans::from(link.as_str()))),
            }
            lines.push(Spans::from(""));
            lines.push(Spans::from("<Esc> Close"));
            let popup = Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(Block::default().title(proof_title(*kind)).borders(Borders::ALL))
                .style(Style::default().fg(Color::White).bg(Color::Black));
            frame.render_widget(Clear, popup_area);
            frame.render_widget(popup, popup_area);
        }
    }
}

pub fn handle_key(state: &mut OrdersState, key: KeyEvent) -> Option<Submission> {
    match &mut state.mode {
        Mode::Upload { kind, cr_id, paths } => {
            match key.code {
                KeyCode::Esc => state.mode = Mode::Browse,
                KeyCode::Enter => {
                    let files = parse_paths(paths);
                    if !files.is_empty() {
                        let submission = Submission::UploadProof {
                            kind: *kind,
                            cr_id: cr_id.clone(),
                            files,
                        };
                        state.mode = Mode::Browse;
                        return Some(submission);
                    }
                }
                KeyCode::Char(c) => paths.push(c),
                KeyCode::Backspace => {
                    paths.pop();
                }
                _ => {}
            }
            return None;
        }
        Mode::Links { .. } => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                state.mode = Mode::Browse;
            }
            return None;
        }
        Mode::Browse => {}
    }

    match key.code {
        KeyCode::Down => state.move_selection(true),
        KeyCode::Up => state.move_selection(false),
        KeyCode::Char('o') => state.start_upload(ProofKind::Order),
        KeyCode::Char('d') => state.start_upload(ProofKind::Delivery),
        KeyCode::Char('v') => state.show_links(ProofKind::Order),
        KeyCode::Char('w') => state.show_links(ProofKind::Delivery),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crossterm::event::KeyModifiers;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn context() -> CategoryContext {
        CategoryContext {
            project_id: "p1".to_string(),
            cc_id: "11".to_string(),
            cc_name: "Plumbing".to_string(),
            user: User {
                full_name: "Kim".to_string(),
                user_id: "7".to_string(),
                company_id: None,
            },
        }
    }

    async fn settle(state: &mut OrdersState) {
        for _ in 0..200 {
            state.update();
            if !state.is_loading() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/variable-orders/11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "cr_id": 5, "cm_id": 9, "product_no": "P-9", "spec": "Copper",
                "quantity": 4, "product_status": true, "order_status": false,
                "delivery_status": false
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get-delivered-pic-ids/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pic_details": [{"image_url": "/5/a.png"}]
            })))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn paths_are_split_on_commas() {
        assert_eq!(
            parse_paths(" a.png, ,dir/b.jpg "),
            vec![PathBuf::from("a.png"), PathBuf::from("dir/b.jpg")]
        );
        assert!(parse_paths(" , ").is_empty());
    }

    #[tokio::test]
    async fn upload_targets_selected_record() {
        let server = server().await;
        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut state = OrdersState::new(&api, &context(), OrderKind::Variable);
        settle(&mut state).await;
        assert_eq!(state.records.len(), 1);

        handle_key(&mut state, key(KeyCode::Char('d')));
        assert!(state.is_capturing());
        assert!(handle_key(&mut state, key(KeyCode::Enter)).is_none());
        for c in "x.png".chars() {
            handle_key(&mut state, key(KeyCode::Char(c)));
        }
        match handle_key(&mut state, key(KeyCode::Enter)) {
            Some(Submission::UploadProof { kind, cr_id, files }) => {
                assert_eq!(kind, ProofKind::Delivery);
                assert_eq!(cr_id, "5");
                assert_eq!(files, vec![PathBuf::from("x.png")]);
            }
            _ => panic!("expected an upload"),
        }
        assert!(!state.is_capturing());
    }

    #[tokio::test]
    async fn proof_links_load_into_popup() {
        let server = server().await;
        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut state = OrdersState::new(&api, &context(), OrderKind::Variable);
        settle(&mut state).await;

        handle_key(&mut state, key(KeyCode::Char('w')));
        settle(&mut state).await;
        match &state.mode {
            Mode::Links { links: Some(links), .. } => {
                assert_eq!(links.len(), 1);
                assert!(links[0].ends_with("/delivered-status-proof/5/a.png"));
            }
            _ => panic!("expected loaded links"),
        }
        handle_key(&mut state, key(KeyCode::Esc));
        assert!(!state.is_capturing());
    }
}
