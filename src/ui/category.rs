//! A construction category with its six sub-tabs.
//!
//! The screen follows the store's tabs slice. Whenever the active category
//! or the sub-tab changes, the sub-tab content is rebuilt from scratch, which
//! drops and so cancels the fetches of the content it replaces.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::watch;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::api::{ApiClient, ApiResult};
use crate::models::{NewTask, OrderKind, ProofKind, SelectProductRequest, User};
use crate::store::{AppStore, Language, SubTab, TabsSlice};
use crate::ui::contacts::{render_contacts, ContactsState};
use crate::ui::defects::{self, render_defects, DefectsState};
use crate::ui::materials::{self, render_materials, MaterialsState};
use crate::ui::milestones::{self, render_milestones, MilestonesState};
use crate::ui::orders::{self, render_orders, OrdersState};

/// Everything a sub-tab needs to know about where it is.
#[derive(Clone, Debug)]
pub struct CategoryContext {
    pub project_id: String,
    pub cc_id: String,
    pub cc_name: String,
    pub user: User,
}

/// A write requested by a sub-tab, performed by the main loop.
#[derive(Debug)]
pub enum Submission {
    SelectProducts(SelectProductRequest),
    UploadProof {
        kind: ProofKind,
        cr_id: String,
        files: Vec<PathBuf>,
    },
    AddTask(NewTask),
    AddDefect {
        description: String,
        area_id: String,
        picture: PathBuf,
    },
    MarkRepaired {
        defect_id: String,
        picture: PathBuf,
    },
}

impl Submission {
    /// Sends the write and returns the confirmation to show.
    pub async fn send(self, api: &ApiClient, context: &CategoryContext) -> ApiResult<&'static str> {
        let user_id = context.user.user_id.as_str();
        match self {
            Submission::SelectProducts(request) => {
                api.select_products(&request).await?;
                Ok("Products selected")
            }
            Submission::UploadProof { kind, cr_id, files } => {
                api.upload_status_proof(kind, &cr_id, user_id, &files).await?;
                Ok("Images uploaded")
            }
            Submission::AddTask(task) => {
                api.add_task(&task).await?;
                Ok("Milestone added")
            }
            Submission::AddDefect {
                description,
                area_id,
                picture,
            } => {
                api.add_defect(&description, user_id, &context.cc_id, &area_id, &picture)
                    .await?;
                Ok("Defect added")
            }
            Submission::MarkRepaired { defect_id, picture } => {
                api.mark_defect_repaired(&defect_id, user_id, &picture).await?;
                Ok("Defect marked as repaired")
            }
        }
    }

    pub fn failure_context(&self) -> &'static str {
        match self {
            Submission::SelectProducts(_) => "Could not select products",
            Submission::UploadProof { .. } => "Could not upload images",
            Submission::AddTask(_) => "Could not add milestone",
            Submission::AddDefect { .. } => "Could not add defect",
            Submission::MarkRepaired { .. } => "Could not update defect",
        }
    }
}

pub enum SubTabContent {
    Materials(MaterialsState),
    Orders(OrdersState),
    Milestones(MilestonesState),
    Defects(DefectsState),
    Contacts(ContactsState),
}

impl SubTabContent {
    fn new(api: &ApiClient, context: &CategoryContext, sub_tab: SubTab) -> Self {
        match sub_tab {
            SubTab::CandidateMaterials => {
                SubTabContent::Materials(MaterialsState::new(api, context.clone()))
            }
            SubTab::ConfirmationRecord => {
                SubTabContent::Orders(OrdersState::new(api, context, OrderKind::Confirmation))
            }
            SubTab::VariableOrder => {
                SubTabContent::Orders(OrdersState::new(api, context, OrderKind::Variable))
            }
            SubTab::Milestone => {
                SubTabContent::Milestones(MilestonesState::new(api, context.clone()))
            }
            SubTab::Defects => SubTabContent::Defects(DefectsState::new(api, context)),
            SubTab::Contacts => SubTabContent::Contacts(ContactsState::new(api, context)),
        }
    }

    fn update(&mut self) {
        match self {
            SubTabContent::Materials(state) => state.update(),
            SubTabContent::Orders(state) => state.update(),
            SubTabContent::Milestones(state) => state.update(),
            SubTabContent::Defects(state) => state.update(),
            SubTabContent::Contacts(state) => state.update(),
        }
    }

    fn is_capturing(&self) -> bool {
        match self {
            SubTabContent::Orders(state) => state.is_capturing(),
            SubTabContent::Milestones(state) => state.is_capturing(),
            SubTabContent::Defects(state) => state.is_capturing(),
            SubTabContent::Materials(_) | SubTabContent::Contacts(_) => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Submission> {
        match self {
            SubTabContent::Materials(state) => materials::handle_key(state, key),
            SubTabContent::Orders(state) => orders::handle_key(state, key),
            SubTabContent::Milestones(state) => milestones::handle_key(state, key),
            SubTabContent::Defects(state) => defects::handle_key(state, key),
            SubTabContent::Contacts(state) => {
                match key.code {
                    KeyCode::Down => state.scroll_down(),
                    KeyCode::Up => state.scroll_up(),
                    _ => {}
                }
                None
            }
        }
    }
}

pub enum CategoryAction {
    Back,
    ShiftCategory(isize),
    SelectSubTab(SubTab),
    Submit(Submission),
}

// Represents the state of the category screen
pub struct CategoryState {
    api: ApiClient,
    project_id: String,
    user: User,
    tabs_rx: watch::Receiver<TabsSlice>,
    language_rx: watch::Receiver<Language>,
    tabs: TabsSlice,
    content: Option<SubTabContent>,
}

impl CategoryState {
    pub fn new(api: &ApiClient, store: &AppStore, project_id: String, user: User) -> Self {
        let mut tabs_rx = store.subscribe_tabs();
        let tabs = tabs_rx.borrow_and_update().clone();
        let mut state = Self {
            api: api.clone(),
            project_id,
            user,
            tabs_rx,
            language_rx: store.subscribe_language(),
            tabs,
            content: None,
        };
        state.reload();
        state
    }

    pub fn sub_tab(&self) -> SubTab {
        self.tabs.sub_tab.unwrap_or(SubTab::CandidateMaterials)
    }

    pub fn context(&self) -> Option<CategoryContext> {
        self.tabs.active_tab.as_ref().map(|tab| CategoryContext {
            project_id: self.project_id.clone(),
            cc_id: tab.key.clone(),
            cc_name: tab.label.clone(),
            user: self.user.clone(),
        })
    }

    /// Rebuilds the visible sub-tab, refetching its data.
    pub fn reload(&mut self) {
        self.content = self
            .context()
            .map(|context| SubTabContent::new(&self.api, &context, self.sub_tab()));
    }

    pub fn update(&mut self) {
        if self.tabs_rx.has_changed().unwrap_or(false) {
            let tabs = self.tabs_rx.borrow_and_update().clone();
            let rebuild = tabs.active_tab != self.tabs.active_tab || tabs.sub_tab != self.tabs.sub_tab;
            self.tabs = tabs;
            if rebuild {
                self.reload();
            }
        }
        if let Some(content) = &mut self.content {
            content.update();
        }
    }
}

pub fn render_category<B: Backend>(frame: &mut Frame<B>, state: &mut CategoryState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);

    let active_index = state
        .tabs
        .active_tab
        .as_ref()
        .and_then(|active| state.tabs.available_tabs.iter().position(|tab| tab == active))
        .unwrap_or(0);
    let categories = Tabs::new(
        state
            .tabs
            .available_tabs
            .iter()
            .map(|tab| Spans::from(tab.label.clone()))
            .collect(),
    )
    .select(active_index)
    .block(Block::default().borders(Borders::ALL).title("Categories"))
    .highlight_style(
        Style::default()
            .fg(Color::Rgb(255, 165, 0))
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(categories, chunks[0]);

    let language = *state.language_rx.borrow();
    let sub_tabs = Tabs::new(
        SubTab::ALL
            .iter()
            .map(|sub_tab| Spans::from(sub_tab.label(language)))
            .collect(),
    )
    .select(state.sub_tab().index())
    .block(Block::default().borders(Borders::ALL))
    .highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::Rgb(0xee, 0xd7, 0x74)),
    );
    frame.render_widget(sub_tabs, chunks[1]);

    match &mut state.content {
        Some(SubTabContent::Materials(content)) => render_materials(frame, content, chunks[2]),
        Some(SubTabContent::Orders(content)) => render_orders(frame, content, chunks[2]),
        Some(SubTabContent::Milestones(content)) => render_milestones(frame, content, chunks[2]),
        Some(SubTabContent::Defects(content)) => render_defects(frame, content, chunks[2]),
        Some(SubTabContent::Contacts(content)) => render_contacts(frame, content, chunks[2]),
        None => frame.render_widget(
            Paragraph::new("No category selected.").block(Block::default().borders(Borders::ALL)),
            chunks[2],
        ),
    }

    let help = Paragraph::new(
        "<Left>/<Right> Category | <Tab>/<Shift+Tab> Section | <Up>/<Down> Move | <Esc> Back",
    )
    .style(Style::default().fg(Color::White));
    frame.render_widget(help, chunks[3]);
}

pub fn handle_key(state: &mut CategoryState, key: KeyEvent) -> Option<CategoryAction> {
    if let Some(content) = &mut state.content {
        if content.is_capturing() {
            return content.handle_key(key).map(CategoryAction::Submit);
        }
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(CategoryAction::Back),
        KeyCode::Left => Some(CategoryAction::ShiftCategory(-1)),
        KeyCode::Right => Some(CategoryAction::ShiftCategory(1)),
        KeyCode::Tab => Some(CategoryAction::SelectSubTab(state.sub_tab().next())),
        KeyCode::BackTab => Some(CategoryAction::SelectSubTab(state.sub_tab().previous())),
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            Some(CategoryAction::SelectSubTab(SubTab::ALL[index]))
        }
        _ => state
            .content
            .as_mut()
            .and_then(|content| content.handle_key(key))
            .map(CategoryAction::Submit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Tab;
    use crossterm::event::KeyModifiers;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn user() -> User {
        User {
            full_name: "Kim".to_string(),
            user_id: "7".to_string(),
            company_id: None,
        }
    }

    fn tab(key: &str, label: &str) -> Tab {
        Tab {
            key: key.to_string(),
            label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn follows_active_tab_and_sub_tab() {
        let store = AppStore::new();
        let tabs = vec![tab("11", "Plumbing"), tab("12", "Electrical")];
        store.set_available_tabs(tabs.clone());
        store.set_active_tab(tabs[0].clone());

        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let mut state = CategoryState::new(&api, &store, "p1".to_string(), user());
        assert_eq!(state.context().map(|c| c.cc_id), Some("11".to_string()));
        assert!(matches!(state.content, Some(SubTabContent::Materials(_))));

        match handle_key(&mut state, key(KeyCode::Right)) {
            Some(CategoryAction::ShiftCategory(step)) => store.shift_active_tab(step),
            _ => panic!("expected a category shift"),
        }
        match handle_key(&mut state, key(KeyCode::Char('5'))) {
            Some(CategoryAction::SelectSubTab(sub_tab)) => store.set_sub_tab(sub_tab),
            _ => panic!("expected a sub-tab"),
        }
        state.update();

        assert_eq!(state.context().map(|c| c.cc_name), Some("Electrical".to_string()));
        assert_eq!(state.sub_tab(), SubTab::Defects);
        assert!(matches!(state.content, Some(SubTabContent::Defects(_))));
    }

    #[tokio::test]
    async fn no_active_tab_has_no_content() {
        let store = AppStore::new();
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let state = CategoryState::new(&api, &store, "p1".to_string(), user());
        assert!(state.content.is_none());
    }

    #[tokio::test]
    async fn repair_submission_hits_completion_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/update-defect-completion-status/9"))
            .and(query_param("user_id", "7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let picture = dir.path().join("after.png");
        std::fs::write(&picture, b"png-bytes").unwrap();

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let context = CategoryContext {
            project_id: "p1".to_string(),
            cc_id: "11".to_string(),
            cc_name: "Plumbing".to_string(),
            user: user(),
        };
        let message = Submission::MarkRepaired {
            defect_id: "9".to_string(),
            picture,
        }
        .send(&api, &context)
        .await
        .unwrap();
        assert_eq!(message, "Defect marked as repaired");
    }

    #[tokio::test]
    async fn missing_file_fails_before_sending() {
        let server = MockServer::start().await;
        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let context = CategoryContext {
            project_id: "p1".to_string(),
            cc_id: "11".to_string(),
            cc_name: "Plumbing".to_string(),
            user: user(),
        };
        let submission = Submission::AddDefect {
            description: "Leak".to_string(),
            area_id: "4".to_string(),
            picture: PathBuf::from("/definitely/missing.png"),
        };
        assert_eq!(submission.failure_context(), "Could not add defect");
        let err = submission.send(&api, &context).await.unwrap_err();
        assert!(matches!(err, crate::api::ApiError::Io { .. }));
    }
}
