//! Application registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Application, ApplicationDetails, ApplicationId, ApplicationUpdate};

/// Request to register an application
///
/// Server-assigned fields (`id`, `apiKey`, `isValid`) are ignored if sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterApplicationRequest {
    pub name: String,
    pub description: String,
    pub owners: String,
    pub team_name: String,
}

impl From<RegisterApplicationRequest> for ApplicationDetails {
    fn from(request: RegisterApplicationRequest) -> Self {
        ApplicationDetails::new(request.name)
            .with_description(request.description)
            .with_owners(request.owners)
            .with_team_name(request.team_name)
    }
}

/// Request to update an application; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owners: Option<String>,
    pub team_name: Option<String>,
}

impl From<UpdateApplicationRequest> for ApplicationUpdate {
    fn from(request: UpdateApplicationRequest) -> Self {
        ApplicationUpdate {
            name: request.name,
            description: request.description,
            owners: request.owners,
            team_name: request.team_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owners: String,
    pub team_name: String,
    pub api_key: String,
    pub is_valid: bool,
}

impl From<&Application> for ApplicationResponse {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id().to_string(),
            name: app.name().to_string(),
            description: app.description().to_string(),
            owners: app.owners().to_string(),
            team_name: app.team_name().to_string(),
            api_key: app.api_key().to_string(),
            is_valid: app.is_valid(),
        }
    }
}

pub fn create_applications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_applications).post(create_application))
        .route(
            "/{id}",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
}

/// POST /applications
pub async fn create_application(
    State(state): State<AppState>,
    Json(request): Json<RegisterApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    debug!(name = %request.name, "Creating application");

    let app = state.registry.create(request.into()).await?;

    Ok((StatusCode::CREATED, Json(ApplicationResponse::from(&app))))
}

/// GET /applications
pub async fn list_applications(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError> {
    let apps = state.registry.list().await?;

    Ok(Json(apps.iter().map(ApplicationResponse::from).collect()))
}

/// GET /applications/{id}
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let app = state.registry.get(&ApplicationId::new(id)).await?;

    Ok(Json(ApplicationResponse::from(&app)))
}

/// PUT /applications/{id}
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateApplicationRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    debug!(id = %id, "Updating application");

    let app = state
        .registry
        .update(&ApplicationId::new(id), request.into())
        .await?;

    Ok(Json(ApplicationResponse::from(&app)))
}

/// DELETE /applications/{id}
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    debug!(id = %id, "Deleting application");

    state.registry.delete(&ApplicationId::new(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}
