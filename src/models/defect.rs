use serde::Deserialize;

use super::{id_string, opt_id_string};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct BeforeRepairPic {
    #[serde(deserialize_with = "id_string")]
    pub pic_bef_repair_id: String,
    pub extension: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AfterRepairPic {
    #[serde(deserialize_with = "id_string")]
    pub pic_af_repair_id: String,
    pub extension: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Defect {
    #[serde(deserialize_with = "id_string")]
    pub defect_id: String,
    #[serde(default)]
    pub defect_description: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub area_id: Option<String>,
    #[serde(default)]
    pub pic_bef_repair_document: Option<BeforeRepairPic>,
    #[serde(default)]
    pub pic_af_repair_document: Option<AfterRepairPic>,
}

impl Defect {
    pub fn is_repaired(&self) -> bool {
        self.pic_af_repair_document.is_some()
    }

    pub fn before_picture_path(&self) -> Option<String> {
        self.pic_bef_repair_document.as_ref().map(|pic| {
            format!("/defect-before-repair/{}.{}", pic.pic_bef_repair_id, pic.extension)
        })
    }

    pub fn after_picture_path(&self) -> Option<String> {
        self.pic_af_repair_document.as_ref().map(|pic| {
            format!("/defect-after-repair/{}.{}", pic.pic_af_repair_id, pic.extension)
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct DefectList {
    #[serde(default)]
    pub defects: Vec<Defect>,
}
