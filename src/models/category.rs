use serde::{Deserialize, Serialize};

use super::id_string;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ConstructionCategory {
    #[serde(deserialize_with = "id_string")]
    pub cc_id: String,
    pub cc_name: String,
}

#[derive(Deserialize, Debug)]
pub struct CategoryList {
    #[serde(rename = "construction categories", default)]
    pub categories: Vec<ConstructionCategory>,
}

#[derive(Serialize, Debug, Clone)]
pub struct NewCategory {
    pub cc_name: String,
    pub project_id: String,
    pub user_id: String,
}
