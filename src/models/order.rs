use serde::Deserialize;

use super::id_string;

/// A row of either the confirmation record or the variable order list.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct OrderRecord {
    #[serde(deserialize_with = "id_string")]
    pub cr_id: String,
    #[serde(deserialize_with = "id_string")]
    pub cm_id: String,
    #[serde(default)]
    pub product_no: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub product_status: bool,
    #[serde(default)]
    pub order_status: bool,
    #[serde(default)]
    pub delivery_status: bool,
}

/// The two proof-of-status uploads an order row accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    Order,
    Delivery,
}

impl ProofKind {
    pub fn update_path(self) -> &'static str {
        match self {
            ProofKind::Order => "update-order-status",
            ProofKind::Delivery => "update-delivery-status",
        }
    }

    pub fn user_query(self) -> &'static str {
        match self {
            ProofKind::Order => "ordered_user_id",
            ProofKind::Delivery => "delivered_user_id",
        }
    }

    pub fn form_field(self) -> &'static str {
        match self {
            ProofKind::Order => "ordered_pics",
            ProofKind::Delivery => "delivered_pics",
        }
    }

    pub fn ids_path(self) -> &'static str {
        match self {
            ProofKind::Order => "get-ordered-pic-ids",
            ProofKind::Delivery => "get-delivered-pic-ids",
        }
    }

    pub fn image_prefix(self) -> &'static str {
        match self {
            ProofKind::Order => "ordered-status-proof",
            ProofKind::Delivery => "delivered-status-proof",
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProofImage {
    pub image_url: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProofImages {
    #[serde(default)]
    pub pic_details: Option<Vec<ProofImage>>,
}

impl ProofImages {
    pub fn paths(&self, kind: ProofKind) -> Vec<String> {
        self.pic_details
            .iter()
            .flatten()
            .map(|detail| format!("/{}{}", kind.image_prefix(), detail.image_url))
            .collect()
    }
}
