use serde::{Deserialize, Serialize};

use super::{id_string, opt_id_string};

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct User {
    pub full_name: String,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub company_id: Option<String>,
}
