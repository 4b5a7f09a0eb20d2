use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id_string;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    #[serde(deserialize_with = "id_string")]
    pub tb_id: String,
    pub tb_description: String,
    #[serde(default)]
    pub task_completion_status: bool,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: String,
    pub cc_id: String,
    pub tb_description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
