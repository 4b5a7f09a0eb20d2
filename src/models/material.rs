use serde::{Deserialize, Serialize};

use super::id_string;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PicDocument {
    #[serde(deserialize_with = "id_string")]
    pub cm_pic_id: String,
    pub extension: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CandidateMaterial {
    #[serde(deserialize_with = "id_string")]
    pub cm_id: String,
    #[serde(default)]
    pub product_no: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub pic_document: Option<PicDocument>,
}

impl CandidateMaterial {
    /// Relative path of the product picture, if the material has one.
    pub fn picture_path(&self) -> Option<String> {
        self.pic_document
            .as_ref()
            .map(|pic| format!("/candidate-material-pic/{}.{}", pic.cm_pic_id, pic.extension))
    }
}

/// Which list a candidate material selection is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Confirmation,
    Variable,
}

impl OrderKind {
    pub fn toggle(self) -> Self {
        match self {
            OrderKind::Confirmation => OrderKind::Variable,
            OrderKind::Variable => OrderKind::Confirmation,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderKind::Confirmation => "Confirmation Record",
            OrderKind::Variable => "Variable Order",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SelectedProduct {
    pub cm_id: String,
    pub quantity: u32,
    pub cc_id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SelectProductRequest {
    pub product: Vec<SelectedProduct>,
    pub post_user_id: String,
    pub variable_order: bool,
    pub order_type: bool,
}

impl SelectProductRequest {
    pub fn new(product: Vec<SelectedProduct>, post_user_id: String, kind: OrderKind) -> Self {
        Self {
            product,
            post_user_id,
            variable_order: kind == OrderKind::Variable,
            order_type: kind == OrderKind::Confirmation,
        }
    }
}
