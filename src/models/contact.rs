use std::collections::HashMap;

use serde::Deserialize;

use super::id_string;

/// Roles are shown in this order; other roles the server sends are ignored.
pub const ROLE_ORDER: [&str; 4] = ["Management Team", "Project Manager", "Admin", "Subcontractor"];

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Contact {
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub user_mobile: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ContactBook {
    #[serde(default)]
    pub grouped_contacts: HashMap<String, Vec<Contact>>,
}

impl ContactBook {
    /// Non-empty role groups in display order.
    pub fn ordered_groups(&self) -> Vec<(&'static str, &[Contact])> {
        ROLE_ORDER
            .iter()
            .filter_map(|role| {
                self.grouped_contacts
                    .get(*role)
                    .filter(|contacts| !contacts.is_empty())
                    .map(|contacts| (*role, contacts.as_slice()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_follow_role_order_and_skip_empty_or_unknown() {
        let body = r#"{"grouped_contacts": {
            "Subcontractor": [{"user_id": 3, "username": "sub"}],
            "Admin": [],
            "Visitor": [{"user_id": 9, "username": "guest"}],
            "Management Team": [{"user_id": "1", "username": "boss", "user_mobile": "555"}]
        }}"#;
        let book: ContactBook = serde_json::from_str(body).unwrap();
        let roles: Vec<&str> = book.ordered_groups().iter().map(|(role, _)| *role).collect();
        assert_eq!(roles, vec!["Management Team", "Subcontractor"]);
    }
}
