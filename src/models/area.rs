use serde::{Deserialize, Serialize};

use super::id_string;

/// A named part of a project site, such as a kitchen or a floor.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Area {
    #[serde(deserialize_with = "id_string")]
    pub area_id: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct AreaList {
    pub area_descriptions: Vec<Area>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewArea {
    pub description: String,
    pub project_id: String,
}

/// A floor plan file with a path relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorPlan {
    pub name: String,
    pub content_type: Option<String>,
    pub path: String,
}

#[derive(Deserialize, Debug)]
struct MainFloorPlanDocument {
    #[serde(deserialize_with = "id_string")]
    floor_plan_id: String,
    extension: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

/// The parts of the project details response that carry the main floor plans.
#[derive(Deserialize, Debug)]
pub struct ProjectDetails {
    floor_plan_documents: Vec<MainFloorPlanDocument>,
}

impl ProjectDetails {
    pub fn floor_plans(self) -> Vec<FloorPlan> {
        self.floor_plan_documents
            .into_iter()
            .map(|doc| FloorPlan {
                path: format!("/main-floor-plan/{}.{}", doc.floor_plan_id, doc.extension),
                name: doc.name.unwrap_or_else(|| doc.floor_plan_id.clone()),
                content_type: doc.content_type,
            })
            .collect()
    }
}

#[derive(Deserialize, Debug)]
struct AreaFloorPlanDetail {
    image_url: String,
    #[serde(default)]
    floor_plan_name: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AreaFloorPlans {
    #[serde(default)]
    pic_details: Vec<AreaFloorPlanDetail>,
}

impl AreaFloorPlans {
    pub fn floor_plans(self) -> Vec<FloorPlan> {
        self.pic_details
            .into_iter()
            .map(|detail| FloorPlan {
                path: format!("/area-floor-plan{}", detail.image_url),
                name: detail.floor_plan_name.unwrap_or_default(),
                content_type: detail.content_type,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_plans_link_by_id_and_extension() {
        let details: ProjectDetails = serde_json::from_value(serde_json::json!({
            "project_title": "Harbour View",
            "floor_plan_documents": [
                {"floor_plan_id": 3, "extension": "pdf", "name": "Ground floor",
                 "content_type": "application/pdf"},
                {"floor_plan_id": 4, "extension": "png"}
            ]
        }))
        .unwrap();

        let plans = details.floor_plans();
        assert_eq!(plans[0].path, "/main-floor-plan/3.pdf");
        assert_eq!(plans[0].name, "Ground floor");
        assert_eq!(plans[1].name, "4");
        assert_eq!(plans[1].content_type, None);
    }

    #[test]
    fn area_plans_prefix_image_url() {
        let plans: AreaFloorPlans = serde_json::from_value(serde_json::json!({
            "pic_details": [{"image_url": "/8.pdf", "floor_plan_name": "Kitchen layout"}]
        }))
        .unwrap();
        let plans = plans.floor_plans();
        assert_eq!(plans[0].path, "/area-floor-plan/8.pdf");
        assert_eq!(plans[0].name, "Kitchen layout");
    }

    #[test]
    fn missing_area_plans_are_empty() {
        let plans: AreaFloorPlans = serde_json::from_str("{}").unwrap();
        assert!(plans.floor_plans().is_empty());
    }
}
