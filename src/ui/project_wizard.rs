use crossterm::event::KeyEvent;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::models::{NewProject, ProjectAddress, User};
use crate::ui::components::form::{render_form, FormEvent, FormField, FormState};

pub enum ProjectWizardAction {
    Cancel,
    Save(NewProject),
}

#[derive(Clone, Copy)]
enum Field {
    Name,
    QuoteeName,
    QuoteeMobile,
    QuoteeEmail,
    CompanyName,
    District,
    Area,
    Street,
    FloorUnit,
    StartDate,
    EndDate,
}

impl Field {
    fn index(self) -> usize {
        self as usize
    }
}

pub struct ProjectWizardState {
    user: User,
    form: FormState,
    error: Option<String>,
}

impl ProjectWizardState {
    pub fn new(user: User) -> Self {
        let today = chrono::Local::now().date_naive();
        let form = FormState::new(vec![
            FormField::text("Project Name"),
            FormField::text("Quotee Name"),
            FormField::text("Quotee Mobile"),
            FormField::text("Quotee Email"),
            FormField::text("Company Name"),
            FormField::text("District"),
            FormField::text("Area"),
            FormField::text("Street"),
            FormField::text("Floor/Unit"),
            FormField::date("Start Date", today),
            FormField::date("End Date", today),
        ]);

        Self {
            user,
            form,
            error: None,
        }
    }

    fn text(&self, field: Field) -> String {
        self.form.value(field.index()).to_string()
    }

    /// Builds the request, or the message explaining why it can't be sent.
    pub fn validate(&self) -> Result<NewProject, String> {
        if let Some(label) = self.form.first_missing() {
            return Err(format!("{} is required", label));
        }

        let (Some(start), Some(end)) = (
            self.form.date(Field::StartDate.index()),
            self.form.date(Field::EndDate.index()),
        ) else {
            return Err("Both dates are required".to_string());
        };
        if end < start {
            return Err("End date cannot be before the start date".to_string());
        }

        Ok(NewProject {
            user_id: self.user.user_id.clone(),
            user_company_id: self.user.company_id.clone(),
            project_name: self.text(Field::Name),
            project_start_date: start,
            project_end_date: end,
            quotee_name: self.text(Field::QuoteeName),
            quotee_mobile: self.text(Field::QuoteeMobile),
            quotee_email: self.text(Field::QuoteeEmail),
            company_name: self.text(Field::CompanyName),
            project_address: ProjectAddress {
                district: self.text(Field::District),
                area: self.text(Field::Area),
                street: self.text(Field::Street),
                floor_unit: self.text(Field::FloorUnit),
            },
        })
    }
}

pub fn render_project_wizard<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(13),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(frame.size());

    render_form(frame, &state.form, chunks[0], "New Project");

    let footer = match &state.error {
        Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(state.form.help_text()).style(Style::default().fg(Color::White)),
    };
    frame.render_widget(footer.block(Block::default().borders(Borders::TOP)), chunks[1]);
}

pub fn handle_key(state: &mut ProjectWizardState, key: KeyEvent) -> Option<ProjectWizardAction> {
    match state.form.handle_key(key)? {
        FormEvent::Cancel => Some(ProjectWizardAction::Cancel),
        FormEvent::Submit => match state.validate() {
            Ok(project) => {
                state.error = None;
                Some(ProjectWizardAction::Save(project))
            }
            Err(error) => {
                state.error = Some(error);
                None
            }
        },
    }
}
