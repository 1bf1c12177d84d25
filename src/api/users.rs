use crate::{
    auth::{gate::AuthUser, password::hash_password},
    error::ApiError,
    model::{role::Role, user::User},
    store::{Page, UserChanges, UserStore},
};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
/// Width of the `name` and `email` columns.
const MAX_FIELD_LEN: usize = 255;

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "teamlead")]
    pub role: Role,
}

/// Every field an admin may change; anything else in the body is rejected.
#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    pub name: Option<String>,
    #[schema(format = "email")]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Filter by role
    pub role: Option<Role>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com")]
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

fn clean_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_FIELD_LEN {
        return Err(ApiError::validation(format!(
            "name must be at most {} characters",
            MAX_FIELD_LEN
        )));
    }
    Ok(name.to_string())
}

fn clean_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(ApiError::validation("email is not a valid address"));
    }
    if email.chars().count() > MAX_FIELD_LEN {
        return Err(ApiError::validation(format!(
            "email must be at most {} characters",
            MAX_FIELD_LEN
        )));
    }
    Ok(email)
}

fn hashed(password: &str) -> Result<String, ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal("password hashing failed".into())
    })
}

/// Hashes the password and stores a new account.
pub async fn create_account(
    users: &dyn UserStore,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, ApiError> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: clean_name(name)?,
        email: clean_email(email)?,
        password_hash: hashed(password)?,
        role,
        created_at: Utc::now(),
    };
    users.insert_user(&user).await?;
    Ok(user)
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let user = create_account(
        users.get_ref(),
        &payload.name,
        &payload.email,
        &payload.password,
        payload.role,
    )
    .await?;

    info!(user_id = %user.id, role = %user.role, created_by = %auth.id, "User created");
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Paginated user list (admin and HR)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "Admin/HR only")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_any(&[Role::Admin, Role::Hr])?;

    let page = Page::new(query.page, query.per_page);
    let (data, total) = users.list_users(query.role, page).await?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: data.into_iter().map(UserResponse::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Get a user by id (admin and HR)
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Admin/HR only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_any(&[Role::Admin, Role::Hr])?;

    let user = users
        .find_user(&path)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Update a user (admin only)
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Empty or invalid update"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
    path: web::Path<String>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    let changes = UserChanges {
        name: payload.name.as_deref().map(clean_name).transpose()?,
        email: payload.email.as_deref().map(clean_email).transpose()?,
        role: payload.role,
        password_hash: payload.password.as_deref().map(hashed).transpose()?,
    };

    if changes.name.is_none()
        && changes.email.is_none()
        && changes.role.is_none()
        && changes.password_hash.is_none()
    {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let user_id = path.into_inner();
    let user = users
        .update_user(&user_id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user.id, updated_by = %auth.id, "User updated");
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Delete a user (admin only)
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    if user_id == auth.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    if !users.delete_user(&user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %user_id, deleted_by = %auth.id, "User deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// The caller's own identity as carried by the token.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    #[schema(example = "9b2d5c1e-0f4a-4e6b-8d7c-1a2b3c4d5e6f")]
    pub id: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com")]
    pub email: String,
    pub role: Role,
}

impl From<AuthUser> for MeResponse {
    fn from(auth: AuthUser) -> Self {
        Self {
            id: auth.id,
            name: auth.name,
            email: auth.email,
            role: auth.role,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse::from(auth))
}
