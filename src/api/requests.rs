use crate::{
    auth::gate::AuthUser,
    error::ApiError,
    model::{
        request::{
            Action, ApproverRole, Category, LeaveDetails, LeaveType, Request, RequestDetails,
            RequestStatus, WfhDetails, WorkType,
        },
        role::Role,
    },
    store::{Page, RequestFilter, RequestStore},
    workflow::{Decision, evaluate_decision},
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

/// Longest free-text reason we accept.
const MAX_REASON_LEN: usize = 1000;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeave {
    #[schema(example = "2026-01-05")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07")]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    #[schema(example = "Doctor's appointment")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWfh {
    #[schema(example = "2026-01-05")]
    pub date: NaiveDate,
    #[schema(example = "full_day")]
    pub work_type: WorkType,
    #[schema(example = "Internet installation at home")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionInput {
    #[schema(example = "approve")]
    pub action: Action,
    #[schema(example = "Enjoy the break")]
    pub reason: Option<String>,
    /// Optional; when given it must be the caller's own slot
    #[schema(example = "teamLead")]
    pub role: Option<ApproverRole>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RequestQuery {
    /// Filter by aggregate status
    pub status: Option<RequestStatus>,
    /// Filter by request category
    pub category: Option<Category>,
    /// Filter by requester (ignored for plain users, who only see their own)
    pub requester_id: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RequestListResponse {
    pub data: Vec<Request>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

fn clean_reason(reason: &str) -> Result<String, ApiError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::validation("reason must not be empty"));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ApiError::validation(format!(
            "reason must be at most {} characters",
            MAX_REASON_LEN
        )));
    }
    Ok(reason.to_string())
}

fn clean_comment(reason: Option<&str>) -> Result<Option<String>, ApiError> {
    match reason.map(str::trim) {
        None | Some("") => Ok(None),
        Some(r) if r.chars().count() > MAX_REASON_LEN => Err(ApiError::validation(format!(
            "reason must be at most {} characters",
            MAX_REASON_LEN
        ))),
        Some(r) => Ok(Some(r.to_string())),
    }
}

async fn submit(
    auth: &AuthUser,
    store: &dyn RequestStore,
    details: RequestDetails,
) -> Result<HttpResponse, ApiError> {
    let request = Request::submit(auth.as_requester(), details, Utc::now());
    store.insert_request(&request).await?;

    info!(
        request_id = %request.id,
        requester_id = %request.requester_id,
        category = %request.category(),
        "Request submitted"
    );
    Ok(HttpResponse::Created().json(request))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/requests/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = Request),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn create_leave(
    auth: AuthUser,
    store: web::Data<dyn RequestStore>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    if payload.start_date > payload.end_date {
        return Err(ApiError::validation("startDate cannot be after endDate"));
    }

    let details = RequestDetails::Leave(LeaveDetails {
        start_date: payload.start_date,
        end_date: payload.end_date,
        leave_type: payload.leave_type,
        reason: clean_reason(&payload.reason)?,
    });
    submit(&auth, store.get_ref(), details).await
}

/* =========================
Create work-from-home request
========================= */
#[utoipa::path(
    post,
    path = "/api/requests/wfh",
    request_body = CreateWfh,
    responses(
        (status = 201, description = "WFH request submitted", body = Request),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn create_wfh(
    auth: AuthUser,
    store: web::Data<dyn RequestStore>,
    payload: web::Json<CreateWfh>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    let details = RequestDetails::Wfh(WfhDetails {
        date: payload.date,
        work_type: payload.work_type,
        reason: clean_reason(&payload.reason)?,
    });
    submit(&auth, store.get_ref(), details).await
}

/// Fetch one request with its approval record and history
#[utoipa::path(
    get,
    path = "/api/requests/{request_id}",
    params(
        ("request_id" = String, Path, description = "ID of the request")
    ),
    responses(
        (status = 200, description = "Request found", body = Request),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your request"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn get_request(
    auth: AuthUser,
    store: web::Data<dyn RequestStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let request_id = path.into_inner();

    let request = store
        .find_request(&request_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    if !auth.sees_all_requests() && request.requester_id != auth.id {
        return Err(ApiError::forbidden("You can only view your own requests"));
    }

    Ok(HttpResponse::Ok().json(request))
}

/// Paginated request list, newest first
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Paginated request list", body = RequestListResponse),
        (status = 400, description = "Bad filter value"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    store: web::Data<dyn RequestStore>,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let page = Page::new(query.page, query.per_page);

    let requester_id = if auth.sees_all_requests() {
        query.requester_id
    } else {
        Some(auth.id.clone())
    };

    let filter = RequestFilter {
        requester_id,
        status: query.status,
        category: query.category,
    };

    let (data, total) = store.list_requests(&filter, page).await?;

    Ok(HttpResponse::Ok().json(RequestListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/* =========================
Approve / reject (team lead or HR)
========================= */
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/decision",
    params(
        ("request_id" = String, Path, description = "ID of the request to decide on")
    ),
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Decision recorded; returns the updated request", body = Request),
        (status = 400, description = "Unknown action or role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an approver for this slot"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
#[instrument(
    name = "request_decision",
    skip(auth, store, path, payload),
    fields(request_id = %path.as_str(), approver = %auth.id)
)]
pub async fn decide(
    auth: AuthUser,
    store: web::Data<dyn RequestStore>,
    path: web::Path<String>,
    payload: web::Json<DecisionInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_any(&[Role::TeamLead, Role::Hr])?;
    let slot = auth.approver_slot()?;

    let payload = payload.into_inner();
    if let Some(claimed) = payload.role {
        if claimed != slot {
            return Err(ApiError::forbidden(format!(
                "A {} cannot decide for the {} slot",
                auth.role, claimed
            )));
        }
    }
    let reason = clean_comment(payload.reason.as_deref())?;

    let request_id = path.into_inner();
    let request = store
        .find_request(&request_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    let evaluated = evaluate_decision(
        request,
        Decision {
            role: slot,
            action: payload.action,
            reason,
            decided_by: auth.id.clone(),
        },
        Utc::now(),
    );

    match &evaluated.recorded {
        Some(entry) => {
            store.save_decision(&evaluated.request, entry).await?;
            info!(
                slot = %slot,
                action = %payload.action,
                status = %evaluated.request.status,
                "Decision recorded"
            );
        }
        None => info!(slot = %slot, action = %payload.action, "Decision already recorded"),
    }

    Ok(HttpResponse::Ok().json(evaluated.request))
}
