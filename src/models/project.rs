use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id_string;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    #[serde(deserialize_with = "id_string")]
    pub project_id: String,
    pub project_title: String,
    #[serde(default)]
    pub quotee_name: Option<String>,
    #[serde(default)]
    pub quotee_mobile: Option<String>,
    #[serde(default)]
    pub project_start_date: Option<String>,
    #[serde(default)]
    pub project_end_date: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ProjectAddress {
    pub district: String,
    pub area: String,
    pub street: String,
    pub floor_unit: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewProject {
    pub user_id: String,
    pub user_company_id: Option<String>,
    pub project_name: String,
    pub project_start_date: NaiveDate,
    pub project_end_date: NaiveDate,
    pub quotee_name: String,
    pub quotee_mobile: String,
    pub quotee_email: String,
    pub company_name: String,
    pub project_address: ProjectAddress,
}
