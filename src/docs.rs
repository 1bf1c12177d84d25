use crate::api::dashboard::DashboardResponse;
use crate::api::requests::{CreateLeave, CreateWfh, DecisionInput, RequestListResponse, RequestQuery};
use crate::api::users::{
    CreateUser, MeResponse, UpdateUser, UserListResponse, UserQuery, UserResponse,
};
use crate::model::request::{
    Action, ApproverRole, ApproverSlot, Approvers, Category, HistoryEntry, LeaveDetails, LeaveType,
    Request, RequestStatus, SlotStatus, WfhDetails, WorkType,
};
use crate::model::role::Role;
use crate::models::{LoginReqDto, TokenPair};
use crate::store::StatusCounts;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Approvals API",
        version = "0.1.0",
        description = r#"
## Leave and work-from-home approvals

Employees submit **leave** and **work-from-home** requests. Each request needs
sign-off from a **team lead** and from **HR**:

- a rejection from either approver rejects the request,
- both approvals approve it,
- anything else leaves it pending.

Every decision is kept in the request's history.

### 🔐 Security
All `/api` endpoints expect `Authorization: Bearer <access_token>`.
Tokens come from `POST /auth/login` and are renewed with `POST /auth/refresh`.
Roles: `admin`, `hr`, `teamlead`, `user`.

### 📦 Response Format
- JSON bodies; errors as `{"error": "...", "message": "..."}`
- Pagination (`page`, `per_page`) on list endpoints
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,

        crate::api::requests::create_leave,
        crate::api::requests::create_wfh,
        crate::api::requests::get_request,
        crate::api::requests::list_requests,
        crate::api::requests::decide,

        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::me,

        crate::api::dashboard::dashboard
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Role,
            Request,
            Approvers,
            ApproverSlot,
            ApproverRole,
            HistoryEntry,
            LeaveDetails,
            WfhDetails,
            Category,
            LeaveType,
            WorkType,
            Action,
            SlotStatus,
            RequestStatus,
            CreateLeave,
            CreateWfh,
            DecisionInput,
            RequestQuery,
            RequestListResponse,
            CreateUser,
            UpdateUser,
            UserQuery,
            UserResponse,
            UserListResponse,
            MeResponse,
            DashboardResponse,
            StatusCounts
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token refresh"),
        (name = "Requests", description = "Leave / WFH requests and approvals"),
        (name = "Users", description = "Account management"),
        (name = "Dashboard", description = "Role-based summaries"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_decision_endpoint_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/requests/{request_id}/decision"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
