use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AboutUs {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct PasswordChange {
    pub user_id: String,
    pub current_password: String,
    pub new_password: String,
}
