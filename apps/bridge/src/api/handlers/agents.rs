use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::bridge::HubHandle;
use crate::domain::agent::Agent;

/// Current agent snapshot, in creation order
///
/// GET /api/agents
pub async fn list_agents(State(hub): State<HubHandle>) -> Result<Json<Vec<Agent>>, ApiError> {
    let agents = hub.snapshot().await?;
    Ok(Json(agents))
}
