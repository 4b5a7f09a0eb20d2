mod user;
mod project;
mod category;
mod progress;
mod material;
mod order;
mod milestone;
mod defect;
mod area;
mod contact;
mod settings;

pub use user::User;
pub use project::{NewProject, Project, ProjectAddress, ProjectList};
pub use category::{CategoryList, ConstructionCategory, NewCategory};
pub use progress::{CategoryProgress, CategoryProgressList, CategoryStatus, ProjectProgress};
pub use material::{CandidateMaterial, OrderKind, PicDocument, SelectProductRequest, SelectedProduct};
pub use order::{OrderRecord, ProofImages, ProofKind};
pub use milestone::{NewTask, Task, TaskList};
pub use defect::{AfterRepairPic, BeforeRepairPic, Defect, DefectList};
pub use area::{Area, AreaFloorPlans, AreaList, FloorPlan, NewArea, ProjectDetails};
pub use contact::{Contact, ContactBook, ROLE_ORDER};
pub use settings::{AboutUs, PasswordChange};

use serde::{Deserialize, Deserializer};

/// Identifiers come back from the server as either JSON strings or numbers.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    }))
}
