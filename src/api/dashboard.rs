use std::collections::BTreeMap;

use crate::{
    auth::gate::AuthUser,
    error::ApiError,
    model::role::Role,
    store::{RequestStore, StatusCounts, UserStore},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub role: Role,
    /// Own requests for plain users, every request otherwise
    pub requests: StatusCounts,
    /// Pending requests still waiting on the caller's slot (approvers only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_my_decision: Option<i64>,
    /// Admin only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_by_role: Option<BTreeMap<String, i64>>,
}

/// Role-scoped summary for the landing page
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    requests: web::Data<dyn RequestStore>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, ApiError> {
    let scope = if auth.sees_all_requests() {
        None
    } else {
        Some(auth.id.as_str())
    };
    let counts = requests.count_by_status(scope).await?;

    let awaiting_my_decision = match auth.role.approver_slot() {
        Some(slot) => Some(requests.count_awaiting(slot).await?),
        None => None,
    };

    let users_by_role = if auth.role == Role::Admin {
        let by_role = users.count_users_by_role().await?;
        Some(
            by_role
                .into_iter()
                .map(|(role, n)| (role.to_string(), n))
                .collect(),
        )
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(DashboardResponse {
        role: auth.role,
        requests: counts,
        awaiting_my_decision,
        users_by_role,
    }))
}
