mod error;

pub use error::ApiError;

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    AboutUs, Area, AreaFloorPlans, AreaList, CandidateMaterial, CategoryList, CategoryProgress,
    CategoryProgressList, ConstructionCategory, ContactBook, Defect, DefectList, FloorPlan,
    NewArea, NewCategory, NewProject, NewTask, OrderRecord, PasswordChange, Project,
    ProjectDetails, ProjectList, ProjectProgress, ProofImages, ProofKind, SelectProductRequest,
    Task, TaskList, User,
};
use crate::progress::sort_categories;

/// Image uploads are the only requests with a client-side deadline.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(20);

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Client for the project management backend.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        Self::with_base_url(config.api_url())
    }

    pub fn with_base_url(base_url: &str) -> ApiResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.post(self.url(path)))
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.patch(self.url(path)))
    }

    /// Sends the request and decodes a JSON body into `T`.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> ApiResult<T> {
        debug!(endpoint, "request");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|source| {
            warn!(endpoint, error = %source, "response did not match contract");
            ApiError::Malformed {
                endpoint: endpoint.to_string(),
                source,
            }
        })
    }

    /// Sends the request and only checks the status code.
    async fn execute(&self, request: RequestBuilder, endpoint: &str) -> ApiResult<()> {
        debug!(endpoint, "request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }

    // Session operations
    pub async fn sign_in(&self, username: &str, password: &str) -> ApiResult<String> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("client_id", ""),
            ("client_secret", ""),
        ];
        let token: TokenResponse = self
            .fetch(self.http.post(self.url("token")).form(&form), "token")
            .await?;
        Ok(token.access_token)
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        self.fetch(self.get("users/me/"), "users/me").await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> ApiResult<()> {
        self.execute(self.post("change-password").json(change), "change-password")
            .await
    }

    // Project operations
    pub async fn projects_for_user(&self, user_id: &str) -> ApiResult<Vec<Project>> {
        let list: ProjectList = self
            .fetch(
                self.get(&format!("get-project-from-user/{user_id}")),
                "get-project-from-user",
            )
            .await?;
        Ok(list.projects)
    }

    pub async fn add_project(&self, project: &NewProject) -> ApiResult<()> {
        self.execute(self.post("add-project").json(project), "add-project")
            .await
    }

    pub async fn categories(&self, project_id: &str) -> ApiResult<Vec<ConstructionCategory>> {
        let list: CategoryList = self
            .fetch(
                self.get(&format!("get-construction-category-from-project/{project_id}")),
                "get-construction-category-from-project",
            )
            .await?;
        Ok(list.categories)
    }

    pub async fn add_category(&self, category: &NewCategory) -> ApiResult<()> {
        self.execute(
            self.post("add-construction-category").json(category),
            "add-construction-category",
        )
        .await
    }

    pub async fn areas(&self, project_id: &str) -> ApiResult<Vec<Area>> {
        let list: AreaList = self
            .fetch(
                self.get(&format!("all-area-descriptions-of-one-project/{project_id}")),
                "all-area-descriptions-of-one-project",
            )
            .await?;
        Ok(list.area_descriptions)
    }

    pub async fn add_area(&self, area: &NewArea) -> ApiResult<()> {
        self.execute(
            self.post("add-area-description").json(area),
            "add-area-description",
        )
        .await
    }

    // Floor plan operations
    /// Main floor plans of the project, with absolute links.
    pub async fn floor_plans(&self, project_id: &str) -> ApiResult<Vec<FloorPlan>> {
        let details: ProjectDetails = self
            .fetch(
                self.get(&format!("project-details/{project_id}")),
                "project-details",
            )
            .await?;
        Ok(self.absolute(details.floor_plans()))
    }

    pub async fn area_floor_plans(&self, area_id: &str) -> ApiResult<Vec<FloorPlan>> {
        let plans: AreaFloorPlans = self
            .fetch(
                self.get(&format!("get-floor-plan-id-from-area/{area_id}")),
                "get-floor-plan-id-from-area",
            )
            .await?;
        Ok(self.absolute(plans.floor_plans()))
    }

    pub async fn upload_floor_plan(
        &self,
        area_id: &str,
        floor_plan_name: &str,
        user_id: &str,
        file: &Path,
    ) -> ApiResult<()> {
        let form = Form::new().part("ap", image_part(file).await?);
        let request = self
            .patch(&format!("add-floor-plan/{area_id}"))
            .query(&[("floor_plan_name", floor_plan_name), ("user_id", user_id)])
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT);
        self.execute(request, "add-floor-plan").await
    }

    fn absolute(&self, plans: Vec<FloorPlan>) -> Vec<FloorPlan> {
        plans
            .into_iter()
            .map(|plan| FloorPlan {
                path: self.url(&plan.path),
                ..plan
            })
            .collect()
    }

    // Progress operations
    pub async fn project_progress(&self, project_id: &str) -> ApiResult<ProjectProgress> {
        self.fetch(
            self.get(&format!("get-project-progress/{project_id}")),
            "get-project-progress",
        )
        .await
    }

    /// Category schedule entries, ordered by `cc_id`.
    pub async fn category_progress(&self, project_id: &str) -> ApiResult<Vec<CategoryProgress>> {
        let list: CategoryProgressList = self
            .fetch(
                self.get(&format!("progress-of-each-category/{project_id}")),
                "progress-of-each-category",
            )
            .await?;
        let mut categories = list.category_progress_info;
        sort_categories(&mut categories);
        Ok(categories)
    }

    // Material operations
    pub async fn candidate_materials(&self) -> ApiResult<Vec<CandidateMaterial>> {
        self.fetch(self.get("get-candidate-materials"), "get-candidate-materials")
            .await
    }

    pub async fn select_products(&self, request: &SelectProductRequest) -> ApiResult<()> {
        self.execute(self.post("select-product").json(request), "select-product")
            .await
    }

    pub async fn confirmed_products(&self, cc_id: &str) -> ApiResult<Vec<OrderRecord>> {
        self.fetch(
            self.get(&format!("confirmed-products/{cc_id}")),
            "confirmed-products",
        )
        .await
    }

    pub async fn variable_orders(&self, cc_id: &str) -> ApiResult<Vec<OrderRecord>> {
        self.fetch(self.get(&format!("variable-orders/{cc_id}")), "variable-orders")
            .await
    }

    /// Absolute links to the proof pictures already uploaded for an order row.
    pub async fn proof_images(&self, kind: ProofKind, cr_id: &str) -> ApiResult<Vec<String>> {
        let images: ProofImages = self
            .fetch(
                self.get(&format!("{}/{}", kind.ids_path(), cr_id)),
                kind.ids_path(),
            )
            .await?;
        Ok(images
            .paths(kind)
            .iter()
            .map(|path| self.url(path))
            .collect())
    }

    pub async fn upload_status_proof(
        &self,
        kind: ProofKind,
        cr_id: &str,
        user_id: &str,
        images: &[PathBuf],
    ) -> ApiResult<()> {
        let mut form = Form::new();
        for image in images {
            form = form.part(kind.form_field(), image_part(image).await?);
        }
        let request = self
            .patch(&format!("{}/{}", kind.update_path(), cr_id))
            .query(&[(kind.user_query(), user_id)])
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT);
        self.execute(request, kind.update_path()).await
    }

    // Milestone operations
    pub async fn tasks(&self, cc_id: &str) -> ApiResult<Vec<Task>> {
        let list: TaskList = self
            .fetch(
                self.get(&format!("get-all-tasks-from-category/{cc_id}")),
                "get-all-tasks-from-category",
            )
            .await?;
        Ok(list.tasks)
    }

    pub async fn add_task(&self, task: &NewTask) -> ApiResult<()> {
        self.execute(self.post("add-task-breakdown/").json(task), "add-task-breakdown")
            .await
    }

    // Defect operations
    pub async fn defects(&self, cc_id: &str) -> ApiResult<Vec<Defect>> {
        let list: DefectList = self
            .fetch(
                self.get(&format!("get-defect-from-category/{cc_id}")),
                "get-defect-from-category",
            )
            .await?;
        Ok(list.defects)
    }

    pub async fn add_defect(
        &self,
        description: &str,
        user_id: &str,
        cc_id: &str,
        area_id: &str,
        picture: &Path,
    ) -> ApiResult<()> {
        let form = Form::new().part("pic_bef_repair", image_part(picture).await?);
        let request = self
            .post("add-defect")
            .query(&[
                ("defect_description", description),
                ("user_id", user_id),
                ("cc_id", cc_id),
                ("area_id", area_id),
            ])
            .multipart(form);
        self.execute(request, "add-defect").await
    }

    pub async fn mark_defect_repaired(&self, defect_id: &str, user_id: &str, picture: &Path) -> ApiResult<()> {
        let form = Form::new().part("pic_af_repair", image_part(picture).await?);
        let request = self
            .patch(&format!("update-defect-completion-status/{defect_id}"))
            .query(&[("user_id", user_id)])
            .multipart(form);
        self.execute(request, "update-defect-completion-status").await
    }

    // Contact and information operations
    pub async fn contacts(&self, user_id: &str) -> ApiResult<ContactBook> {
        self.fetch(
            self.get(&format!("get-contact-details/{user_id}")),
            "get-contact-details",
        )
        .await
    }

    pub async fn about_us(&self) -> ApiResult<AboutUs> {
        self.fetch(self.get("about-us"), "about-us").await
    }

    /// Free-form documents such as the privacy policy.
    pub async fn document(&self, path: &str) -> ApiResult<serde_json::Value> {
        self.fetch(self.get(path), path).await
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|err| match err.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_default();
    ApiError::Status { status, detail }
}

async fn image_part(path: &Path) -> ApiResult<Part> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(image_mime(path).as_ref())?;
    Ok(part)
}

fn image_mime(path: &Path) -> mime::Mime {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "pdf" => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
