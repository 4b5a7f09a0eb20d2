//! Application-wide state shared between screens.
//!
//! Every slice lives behind its own `watch` channel. The store is the only
//! writer; screens keep receivers for the slices they render and react when
//! `has_changed` reports an update.

use tokio::sync::watch;

use crate::models::{Project, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Chinese,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Language::English => Language::Chinese,
            Language::Chinese => Language::English,
        }
    }
}

/// A construction category as shown in the category tab strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTab {
    CandidateMaterials,
    ConfirmationRecord,
    VariableOrder,
    Milestone,
    Defects,
    Contacts,
}

impl SubTab {
    pub const ALL: [SubTab; 6] = [
        SubTab::CandidateMaterials,
        SubTab::ConfirmationRecord,
        SubTab::VariableOrder,
        SubTab::Milestone,
        SubTab::Defects,
        SubTab::Contacts,
    ];

    pub fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (SubTab::CandidateMaterials, Language::English) => "Candidate Materials",
            (SubTab::ConfirmationRecord, Language::English) => "Confirmation Record",
            (SubTab::VariableOrder, Language::English) => "Variable Order",
            (SubTab::Milestone, Language::English) => "Milestone",
            (SubTab::Defects, Language::English) => "Defects",
            (SubTab::Contacts, Language::English) => "Contacts",
            (SubTab::CandidateMaterials, Language::Chinese) => "候选材料",
            (SubTab::ConfirmationRecord, Language::Chinese) => "确认记录",
            (SubTab::VariableOrder, Language::Chinese) => "可变订单",
            (SubTab::Milestone, Language::Chinese) => "里程碑",
            (SubTab::Defects, Language::Chinese) => "缺陷",
            (SubTab::Contacts, Language::Chinese) => "聯絡人",
        }
    }

    pub fn index(self) -> usize {
        SubTab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        SubTab::ALL[(self.index() + 1) % SubTab::ALL.len()]
    }

    pub fn previous(self) -> Self {
        SubTab::ALL[(self.index() + SubTab::ALL.len() - 1) % SubTab::ALL.len()]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabsSlice {
    pub active_tab: Option<Tab>,
    pub available_tabs: Vec<Tab>,
    pub sub_tab: Option<SubTab>,
}

pub struct AppStore {
    project: watch::Sender<Option<Project>>,
    tabs: watch::Sender<TabsSlice>,
    user: watch::Sender<Option<User>>,
    language: watch::Sender<Language>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self {
            project: watch::channel(None).0,
            tabs: watch::channel(TabsSlice::default()).0,
            user: watch::channel(None).0,
            language: watch::channel(Language::default()).0,
        }
    }

    // Project slice
    pub fn set_project(&self, project: Project) {
        self.project.send_replace(Some(project));
    }

    pub fn clear_project(&self) {
        self.project.send_replace(None);
    }

    pub fn project(&self) -> Option<Project> {
        self.project.borrow().clone()
    }

    pub fn subscribe_project(&self) -> watch::Receiver<Option<Project>> {
        self.project.subscribe()
    }

    // Tabs slice
    pub fn set_active_tab(&self, tab: Tab) {
        self.tabs.send_modify(|tabs| tabs.active_tab = Some(tab));
    }

    pub fn set_available_tabs(&self, available: Vec<Tab>) {
        self.tabs.send_modify(|tabs| tabs.available_tabs = available);
    }

    pub fn set_sub_tab(&self, sub_tab: SubTab) {
        self.tabs.send_modify(|tabs| tabs.sub_tab = Some(sub_tab));
    }

    /// Moves the active tab by `step` within the available tabs, wrapping around.
    pub fn shift_active_tab(&self, step: isize) {
        self.tabs.send_if_modified(|tabs| {
            let len = tabs.available_tabs.len() as isize;
            if len == 0 {
                return false;
            }
            let current = tabs
                .active_tab
                .as_ref()
                .and_then(|active| tabs.available_tabs.iter().position(|t| t == active))
                .unwrap_or(0) as isize;
            let next = (current + step).rem_euclid(len) as usize;
            let tab = tabs.available_tabs[next].clone();
            if tabs.active_tab.as_ref() == Some(&tab) {
                return false;
            }
            tabs.active_tab = Some(tab);
            true
        });
    }

    pub fn subscribe_tabs(&self) -> watch::Receiver<TabsSlice> {
        self.tabs.subscribe()
    }

    // User slice
    pub fn set_user(&self, user: User) {
        self.user.send_replace(Some(user));
    }

    pub fn clear_user(&self) {
        self.user.send_replace(None);
    }

    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    // Language slice
    pub fn set_language(&self, language: Language) {
        self.language.send_replace(language);
    }

    pub fn subscribe_language(&self) -> watch::Receiver<Language> {
        self.language.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str) -> Project {
        Project {
            project_id: id.to_string(),
            project_title: format!("Project {id}"),
            quotee_name: None,
            quotee_mobile: None,
            project_start_date: None,
            project_end_date: None,
        }
    }

    fn tab(key: &str) -> Tab {
        Tab {
            key: key.to_string(),
            label: key.to_uppercase(),
        }
    }

    #[test]
    fn subscribers_see_project_changes() {
        let store = AppStore::new();
        let mut rx = store.subscribe_project();
        assert!(!rx.has_changed().unwrap());

        store.set_project(project("p1"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|p| p.project_id.as_str()), Some("p1"));
        assert!(!rx.has_changed().unwrap());

        store.clear_project();
        assert_eq!(store.project(), None);
    }

    #[test]
    fn slices_notify_independently() {
        let store = AppStore::new();
        let mut project_rx = store.subscribe_project();
        let mut language_rx = store.subscribe_language();

        store.set_language(Language::Chinese);
        assert!(language_rx.has_changed().unwrap());
        assert!(!project_rx.has_changed().unwrap());
        assert_eq!(*language_rx.borrow_and_update(), Language::Chinese);
    }

    #[test]
    fn shifting_tabs_wraps_and_notifies() {
        let store = AppStore::new();
        store.set_available_tabs(vec![tab("a"), tab("b"), tab("c")]);
        store.set_active_tab(tab("a"));
        let mut rx = store.subscribe_tabs();

        store.shift_active_tab(-1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().active_tab, Some(tab("c")));

        store.shift_active_tab(1);
        assert_eq!(rx.borrow_and_update().active_tab, Some(tab("a")));
    }

    #[test]
    fn shifting_single_tab_is_silent() {
        let store = AppStore::new();
        store.set_available_tabs(vec![tab("a")]);
        store.set_active_tab(tab("a"));
        let mut rx = store.subscribe_tabs();
        store.shift_active_tab(1);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn sub_tabs_cycle_in_fixed_order() {
        assert_eq!(SubTab::Contacts.next(), SubTab::CandidateMaterials);
        assert_eq!(SubTab::CandidateMaterials.previous(), SubTab::Contacts);
        assert_eq!(SubTab::Milestone.label(Language::English), "Milestone");
        assert_eq!(SubTab::Milestone.label(Language::Chinese), "里程碑");
    }
}
