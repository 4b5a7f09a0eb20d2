use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::fetch::ScreenTasks;
use crate::models::{CandidateMaterial, OrderKind, SelectProductRequest, SelectedProduct};
use crate::ui::category::{CategoryContext, Submission};
use crate::ui::components::popup::render_loading;

pub struct MaterialsState {
    api: ApiClient,
    context: CategoryContext,
    materials: Vec<CandidateMaterial>,
    list_state: ListState,
    /// Quantity per selected `cm_id`.
    selected: BTreeMap<String, u32>,
    order_kind: OrderKind,
    error: Option<String>,
    tasks: ScreenTasks<ApiResult<Vec<CandidateMaterial>>>,
}

impl MaterialsState {
    pub fn new(api: &ApiClient, context: CategoryContext) -> Self {
        let mut tasks = ScreenTasks::new();
        let fetch_api = api.clone();
        tasks.spawn(async move { fetch_api.candidate_materials().await });

        Self {
            api: api.clone(),
            context,
            materials: Vec::new(),
            list_state: ListState::default(),
            selected: BTreeMap::new(),
            order_kind: OrderKind::Confirmation,
            error: None,
            tasks,
        }
    }

    pub fn update(&mut self) {
        for result in self.tasks.drain() {
            self.materials = result.unwrap_or_else(|err| {
                warn!(error = %err, "error fetching candidate materials");
                Vec::new()
            });
            self.list_state
                .select(if self.materials.is_empty() { None } else { Some(0) });
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_loading()
    }

    fn current(&self) -> Option<&CandidateMaterial> {
        self.list_state.selected().and_then(|i| self.materials.get(i))
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.materials.len();
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        let i = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.list_state.select(Some(i));
    }

    fn toggle_current(&mut self) {
        let Some(cm_id) = self.current().map(|m| m.cm_id.clone()) else {
            return;
        };
        if self.selected.remove(&cm_id).is_none() {
            self.selected.insert(cm_id, 1);
        }
    }

    // Quantities never drop below one while selected.
    fn adjust_quantity(&mut self, delta: i64) {
        let Some(cm_id) = self.current().map(|m| m.cm_id.clone()) else {
            return;
        };
        if let Some(quantity) = self.selected.get_mut(&cm_id) {
            *quantity = (i64::from(*quantity) + delta).max(1) as u32;
        }
    }

    pub fn request(&self) -> Result<SelectProductRequest, String> {
        if self.selected.is_empty() {
            return Err("Select at least one material".to_string());
        }
        let product = self
            .selected
            .iter()
            .map(|(cm_id, quantity)| SelectedProduct {
                cm_id: cm_id.clone(),
                quantity: *quantity,
                cc_id: self.context.cc_id.clone(),
            })
            .collect();
        Ok(SelectProductRequest::new(
            product,
            self.context.user.user_id.clone(),
            self.order_kind,
        ))
    }
}

pub fn render_materials<B: Backend>(frame: &mut Frame<B>, state: &mut MaterialsState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(area);

    if state.is_loading() {
        render_loading(frame, chunks[0]);
    } else {
        let items: Vec<ListItem> = state
            .materials
            .iter()
            .map(|material| {
                let quantity = state.selected.get(&material.cm_id);
                let mark = if quantity.is_some() { "[x]" } else { "[ ]" };
                let price = material
                    .price
                    .map(|price| format!("${:.2}", price))
                    .unwrap_or_default();
                let mut lines = vec![Spans::from(vec![
                    Span::raw(format!("{} ", mark)),
                    Span::styled(
                        material.product_no.clone().unwrap_or_default(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("  {}  ", material.spec.as_deref().unwrap_or(""))),
                    Span::styled(price, Style::default().fg(Color::Gray)),
                    Span::styled(
                        quantity.map(|q| format!("  x{}", q)).unwrap_or_default(),
                        Style::default().fg(Color::Yellow),
                    ),
                ])];
                if let Some(path) = material.picture_path() {
                    lines.push(Spans::from(Span::styled(
                        format!("    {}", state.api.url(&path)),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();

        let title = format!("Candidate Materials - {}", state.order_kind.label());
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_stateful_widget(list, chunks[0], &mut state.list_state);
    }

    let footer = match &state.error {
        Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new("<Space> Select | <+>/<-> Quantity | <O> Order type | <S> Submit")
            .style(Style::default().fg(Color::Gray)),
    };
    frame.render_widget(footer, chunks[1]);
}

pub fn handle_key(state: &mut MaterialsState, key: KeyEvent) -> Option<Submission> {
    state.error = None;
    match key.code {
        KeyCode::Down => state.move_selection(true),
        KeyCode::Up => state.move_selection(false),
        KeyCode::Char(' ') => state.toggle_current(),
        KeyCode::Char('+') | KeyCode::Char('=') => state.adjust_quantity(1),
        KeyCode::Char('-') => state.adjust_quantity(-1),
        KeyCode::Char('o') => state.order_kind = state.order_kind.toggle(),
        KeyCode::Char('s') => match state.request() {
            Ok(request) => {
                state.selected.clear();
                return Some(Submission::SelectProducts(request));
            }
            Err(error) => state.error = Some(error),
        },
        _ => {}
    }
    None
}
