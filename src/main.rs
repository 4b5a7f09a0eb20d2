mod api;
mod auth;
mod config;
mod fetch;
mod models;
mod progress;
mod store;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyEvent},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::api::ApiClient;
use crate::auth::{AuthError, SessionStore};
use crate::config::{Cli, Config};
use crate::models::NewCategory;
use crate::store::AppStore;
use crate::ui::{
    blueprint::{self, render_blueprint, BlueprintAction, BlueprintState},
    categories::{self, render_categories, CategoriesState, CategoryListAction},
    category::{self, render_category, CategoryAction, CategoryState},
    components::popup::{render_alert, Alert},
    login::{self, render_login, LoginAction, LoginState},
    progress::{self as progress_screen, render_progress, ProgressAction, ProgressState},
    project_wizard::{self, render_project_wizard, ProjectWizardAction, ProjectWizardState},
    projects::{self, render_projects, ProjectAction, ProjectsState},
    settings::{self, render_settings, SettingsAction, SettingsState},
};

// Represents the current screen in the app
enum AppScreen {
    Login,
    Projects,
    ProjectWizard,
    Categories,
    Progress,
    Blueprint,
    Category,
    Settings,
}

// Main application state
struct AppState {
    api: ApiClient,
    store: AppStore,
    sessions: SessionStore,
    screen: AppScreen,
    alert: Option<Alert>,
    login_state: Option<LoginState>,
    projects_state: Option<ProjectsState>,
    project_wizard_state: Option<ProjectWizardState>,
    categories_state: Option<CategoriesState>,
    progress_state: Option<ProgressState>,
    blueprint_state: Option<BlueprintState>,
    category_state: Option<CategoryState>,
    settings_state: Option<SettingsState>,
}

impl AppState {
    fn new(api: ApiClient, sessions: SessionStore) -> Self {
        Self {
            api,
            store: AppStore::new(),
            sessions,
            screen: AppScreen::Login,
            alert: None,
            login_state: None,
            projects_state: None,
            project_wizard_state: None,
            categories_state: None,
            progress_state: None,
            blueprint_state: None,
            category_state: None,
            settings_state: None,
        }
    }

    /// Applies finished background fetches of the visible screen.
    fn update(&mut self) {
        match self.screen {
            AppScreen::Projects => {
                if let Some(state) = &mut self.projects_state {
                    state.update();
                }
            }
            AppScreen::Categories => {
                if let Some(state) = &mut self.categories_state {
                    state.update();
                }
            }
            AppScreen::Progress => {
                if let Some(state) = &mut self.progress_state {
                    state.update();
                }
            }
            AppScreen::Blueprint => {
                if let Some(state) = &mut self.blueprint_state {
                    state.update();
                }
            }
            AppScreen::Category => {
                if let Some(state) = &mut self.category_state {
                    state.update();
                }
            }
            AppScreen::Settings => {
                if let Some(state) = &mut self.settings_state {
                    state.update();
                }
            }
            AppScreen::Login | AppScreen::ProjectWizard => {}
        }
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    // The terminal belongs to the UI, so the log goes to a file.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let cli = Cli::parse();
    let config = config::init(&cli)?;
    init_logging(&config)?;
    println!("Connecting to {}...", config.api_url());

    let mut api = ApiClient::new(&config)?;
    let sessions = SessionStore::new(config.session_path());
    if cli.logout {
        auth::sign_out(&sessions, &mut api)?;
    }
    let restored = auth::restore(&sessions, &mut api, Utc::now().timestamp()).await?;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app_state = AppState::new(api, sessions);
    match restored {
        Some((_, user)) => {
            info!(user_id = %user.user_id, "resumed stored session");
            app_state.store.set_user(user);
            load_projects_screen(&mut app_state);
        }
        None => show_login(&mut app_state),
    }

    // Run the main app loop
    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Show any error message
    if let Err(err) = result {
        error!(error = %err, "application error");
        println!("Error: {}", err);
    }

    println!("Thanks for using Construction Manager!");

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        app_state.update();

        // Render current screen
        terminal.draw(|f| {
            match app_state.screen {
                AppScreen::Login => {
                    if let Some(state) = &mut app_state.login_state {
                        render_login(f, state);
                    }
                }
                AppScreen::Projects => {
                    if let Some(state) = &mut app_state.projects_state {
                        render_projects(f, state);
                    }
                }
                AppScreen::ProjectWizard => {
                    if let Some(state) = &mut app_state.project_wizard_state {
                        render_project_wizard(f, state);
                    }
                }
                AppScreen::Categories => {
                    if let Some(state) = &mut app_state.categories_state {
                        render_categories(f, state);
                    }
                }
                AppScreen::Progress => {
                    if let Some(state) = &mut app_state.progress_state {
                        render_progress(f, state);
                    }
                }
                AppScreen::Blueprint => {
                    if let Some(state) = &mut app_state.blueprint_state {
                        render_blueprint(f, state);
                    }
                }
                AppScreen::Category => {
                    if let Some(state) = &mut app_state.category_state {
                        render_category(f, state);
                    }
                }
                AppScreen::Settings => {
                    if let Some(state) = &mut app_state.settings_state {
                        render_settings(f, state);
                    }
                }
            }
            if let Some(alert) = &app_state.alert {
                render_alert(f, alert);
            }
        })?;

        let Some(key) = ui::next_key()? else {
            continue;
        };

        // Any key dismisses an alert.
        if app_state.alert.take().is_some() {
            continue;
        }

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Login => handle_login_screen(app_state, key).await?,
            AppScreen::Projects => handle_projects_screen(app_state, key),
            AppScreen::ProjectWizard => handle_project_wizard_screen(app_state, key).await?,
            AppScreen::Categories => handle_categories_screen(app_state, key).await?,
            AppScreen::Progress => handle_progress_screen(app_state, key),
            AppScreen::Blueprint => handle_blueprint_screen(app_state, key).await?,
            AppScreen::Category => handle_category_screen(app_state, key).await?,
            AppScreen::Settings => handle_settings_screen(app_state, key).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

fn show_login(app_state: &mut AppState) {
    app_state.login_state = Some(LoginState::new());
    app_state.screen = AppScreen::Login;
}

fn load_projects_screen(app_state: &mut AppState) {
    match app_state.store.user() {
        Some(user) => {
            app_state.projects_state = Some(ProjectsState::new(&app_state.api, user.user_id));
            app_state.screen = AppScreen::Projects;
        }
        None => show_login(app_state),
    }
}

async fn handle_login_screen(app_state: &mut AppState, key: KeyEvent) -> Result<bool> {
    let Some(state) = &mut app_state.login_state else {
        return Ok(false);
    };

    match login::handle_key(state, key) {
        Some(LoginAction::Exit) => return Ok(true),
        Some(LoginAction::SignIn { username, password }) => {
            match auth::sign_in(&app_state.sessions, &mut app_state.api, &username, &password).await {
                Ok((_, user)) => {
                    app_state.store.set_user(user);
                    app_state.login_state = None;
                    load_projects_screen(app_state);
                }
                Err(err) => {
                    error!(error = %err, "sign in failed");
                    if let Some(state) = &mut app_state.login_state {
                        state.reset_password();
                    }
                    app_state.alert = Some(match &err {
                        AuthError::Api(api_err) => Alert::from_api("Sign in failed", api_err),
                        other => Alert::error(format!("Sign in failed: {}", other)),
                    });
                }
            }
        }
        None => {}
    }

    Ok(false)
}

fn handle_projects_screen(app_state: &mut AppState, key: KeyEvent) -> bool {
    let Some(state) = &mut app_state.projects_state else {
        return false;
    };

    match projects::handle_key(state, &app_state.api, key) {
        Some(ProjectAction::Exit) => return true,
        Some(ProjectAction::NewProject) => {
            if let Some(user) = app_state.store.user() {
                app_state.project_wizard_state = Some(ProjectWizardState::new(user));
                app_state.screen = AppScreen::ProjectWizard;
            }
        }
        Some(ProjectAction::SelectProject(project)) => {
            info!(project_id = %project.project_id, "project selected");
            app_state.store.set_project(project.clone());
            app_state.categories_state = Some(CategoriesState::new(&app_state.api, project));
            app_state.screen = AppScreen::Categories;
        }
        Some(ProjectAction::Settings) => {
            if let Some(user) = app_state.store.user() {
                app_state.settings_state =
                    Some(SettingsState::new(&app_state.api, &app_state.store, user));
                app_state.screen = AppScreen::Settings;
            }
        }
        None => {}
    }

    false
}

async fn handle_project_wizard_screen(app_state: &mut AppState, key: KeyEvent) -> Result<bool> {
    let Some(state) = &mut app_state.project_wizard_state else {
        return Ok(false);
    };

    match project_wizard::handle_key(state, key) {
        Some(ProjectWizardAction::Cancel) => {
            app_state.project_wizard_state = None;
            app_state.screen = AppScreen::Projects;
        }
        Some(ProjectWizardAction::Save(project)) => match app_state.api.add_project(&project).await {
            Ok(()) => {
                info!(name = %project.project_name, "project created");
                app_state.project_wizard_state = None;
                app_state.alert = Some(Alert::success("Project created"));
                load_projects_screen(app_state);
            }
            Err(err) => {
                error!(error = %err, "error creating project");
                app_state.alert = Some(Alert::from_api("Could not create project", &err));
            }
        },
        None => {}
    }

    Ok(false)
}

async fn handle_categories_screen(app_state: &mut AppState, key: KeyEvent) -> Result<bool> {
    let Some(state) = &mut app_state.categories_state else {
        return Ok(false);
    };

    match categories::handle_key(state, &app_state.api, key) {
        Some(CategoryListAction::Back) => {
            app_state.categories_state = None;
            app_state.store.clear_project();
            app_state.screen = AppScreen::Projects;
        }
        Some(CategoryListAction::Progress) => {
            app_state.progress_state = Some(ProgressState::new(app_state.api.clone(), &app_state.store));
            app_state.screen = AppScreen::Progress;
        }
        Some(CategoryListAction::FloorPlans) => {
            app_state.blueprint_state = Some(BlueprintState::new(&app_state.api, state.project()));
            app_state.screen = AppScreen::Blueprint;
        }
        Some(CategoryListAction::AddCategory(cc_name)) => {
            let Some(user) = app_state.store.user() else {
                return Ok(false);
            };
            let category = NewCategory {
                cc_name,
                project_id: state.project().project_id.clone(),
                user_id: user.user_id,
            };
            match app_state.api.add_category(&category).await {
                Ok(()) => {
                    app_state.alert = Some(Alert::success("Category added"));
                    state.reload(&app_state.api);
                }
                Err(err) => {
                    error!(error = %err, "error adding category");
                    app_state.alert = Some(Alert::from_api("Could not add category", &err));
                }
            }
        }
        Some(CategoryListAction::Open { active, available }) => {
            let Some(user) = app_state.store.user() else {
                return Ok(false);
            };
            let project_id = state.project().project_id.clone();
            app_state.store.set_available_tabs(available);
            app_state.store.set_active_tab(active);
            app_state.category_state = Some(CategoryState::new(
                &app_state.api,
                &app_state.store,
                project_id,
                user,
            ));
            app_state.screen = AppScreen::Category;
        }
        None => {}
    }

    Ok(false)
}

fn handle_progress_screen(app_state: &mut AppState, key: KeyEvent) -> bool {
    let Some(state) = &mut app_state.progress_state else {
        return false;
    };

    if let Some(ProgressAction::Back) = progress_screen::handle_key(state, key) {
        app_state.progress_state = None;
        app_state.screen = AppScreen::Categories;
    }

    false
}

async fn handle_blueprint_screen(app_state: &mut AppState, key: KeyEvent) -> Result<bool> {
    let Some(state) = &mut app_state.blueprint_state else {
        return Ok(false);
    };

    match blueprint::handle_key(state, key) {
        Some(BlueprintAction::Back) => {
            app_state.blueprint_state = None;
            app_state.screen = AppScreen::Categories;
        }
        Some(BlueprintAction::AddArea(area)) => match app_state.api.add_area(&area).await {
            Ok(()) => {
                info!(description = %area.description, "area added");
                app_state.alert = Some(Alert::success("Area added"));
                state.reload_areas();
            }
            Err(err) => {
                error!(error = %err, "error adding area");
                app_state.alert = Some(Alert::from_api("Could not add area", &err));
            }
        },
        Some(BlueprintAction::UploadPlan { area_id, name, file }) => {
            let Some(user) = app_state.store.user() else {
                return Ok(false);
            };
            match app_state
                .api
                .upload_floor_plan(&area_id, &name, &user.user_id, &file)
                .await
            {
                Ok(()) => {
                    info!(area_id = %area_id, "floor plan uploaded");
                    app_state.alert = Some(Alert::success("Floor plan uploaded"));
                    state.load_plans();
                }
                Err(err) => {
                    error!(error = %err, "error uploading floor plan");
                    app_state.alert = Some(Alert::from_api("Could not upload floor plan", &err));
                }
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_category_screen(app_state: &mut AppState, key: KeyEvent) -> Result<bool> {
    let Some(state) = &mut app_state.category_state else {
        return Ok(false);
    };

    match category::handle_key(state, key) {
        Some(CategoryAction::Back) => {
            app_state.category_state = None;
            app_state.screen = AppScreen::Categories;
        }
        Some(CategoryAction::ShiftCategory(step)) => app_state.store.shift_active_tab(step),
        Some(CategoryAction::SelectSubTab(sub_tab)) => app_state.store.set_sub_tab(sub_tab),
        Some(CategoryAction::Submit(submission)) => {
            let Some(context) = state.context() else {
                return Ok(false);
            };
            let failure = submission.failure_context();
            match submission.send(&app_state.api, &context).await {
                Ok(message) => {
                    info!(cc_id = %context.cc_id, "{}", message);
                    app_state.alert = Some(Alert::success(message));
                    state.reload();
                }
                Err(err) => {
                    error!(error = %err, "{}", failure);
                    app_state.alert = Some(Alert::from_api(failure, &err));
                }
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_settings_screen(app_state: &mut AppState, key: KeyEvent) -> Result<bool> {
    let Some(state) = &mut app_state.settings_state else {
        return Ok(false);
    };

    match settings::handle_key(state, key) {
        Some(SettingsAction::Back) => {
            app_state.settings_state = None;
            app_state.screen = AppScreen::Projects;
        }
        Some(SettingsAction::ChangePassword(change)) => {
            match app_state.api.change_password(&change).await {
                Ok(()) => {
                    app_state.alert = Some(Alert::success("Password changed"));
                    state.show_menu();
                }
                Err(err) => {
                    error!(error = %err, "error changing password");
                    app_state.alert = Some(Alert::from_api("Could not change password", &err));
                }
            }
        }
        Some(SettingsAction::SetLanguage(language)) => {
            info!(language = language.code(), "language changed");
            app_state.store.set_language(language);
        }
        Some(SettingsAction::Logout) => {
            auth::sign_out(&app_state.sessions, &mut app_state.api)?;
            app_state.store.clear_user();
            app_state.store.clear_project();
            app_state.settings_state = None;
            app_state.projects_state = None;
            app_state.categories_state = None;
            show_login(app_state);
        }
        None => {}
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn app_state() -> AppState {
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let sessions = SessionStore::new(std::env::temp_dir().join("cm-main-test-session.json"));
        AppState::new(api, sessions)
    }

    #[test]
    fn escape_on_progress_returns_to_categories() {
        let mut app_state = app_state();
        app_state.progress_state = Some(ProgressState::new(app_state.api.clone(), &app_state.store));
        app_state.screen = AppScreen::Progress;

        let quit = handle_progress_screen(&mut app_state, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!quit);
        assert!(app_state.progress_state.is_none());
        assert!(matches!(app_state.screen, AppScreen::Categories));
    }

    #[test]
    fn legend_key_keeps_progress_open() {
        let mut app_state = app_state();
        app_state.progress_state = Some(ProgressState::new(app_state.api.clone(), &app_state.store));
        app_state.screen = AppScreen::Progress;

        handle_progress_screen(&mut app_state, KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE));
        assert!(app_state.progress_state.is_some());
        assert!(matches!(app_state.screen, AppScreen::Progress));
    }
}
