use crate::{
    auth::jwt::verify_token,
    error::ApiError,
    model::{request::ApproverRole, request::Requester, role::Role},
    models::{Claims, TokenType},
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header};
use futures::future::{Ready, ready};

/// The authenticated caller, as read from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header encoding"))?;

    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must start with Bearer"))
}

/// Verifies an access token and checks its role against `allowed`.
///
/// Bad, expired or refresh tokens are `Unauthorized`; a valid token with a
/// role outside `allowed` is `Forbidden`.
pub fn authorize(token: &str, secret: &str, allowed: &[Role]) -> Result<Claims, ApiError> {
    let claims = verify_token(token, secret).map_err(|e| {
        tracing::debug!(error = %e, "Token verification failed");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::unauthorized("Access token required"));
    }

    if !allowed.contains(&claims.role) {
        return Err(ApiError::forbidden(format!(
            "Role {} is not allowed to perform this action",
            claims.role
        )));
    }

    Ok(claims)
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    /// Reads the caller stored by `auth_middleware`.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().cloned();
        ready(user.ok_or_else(|| {
            ApiError::Internal("AuthUser requested on a route without auth_middleware".into())
        }))
    }
}

impl AuthUser {
    pub fn require_any(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_any(&[Role::Admin])
    }

    /// The approver slot the caller may sign; `Forbidden` for non-approvers.
    pub fn approver_slot(&self) -> Result<ApproverRole, ApiError> {
        self.role
            .approver_slot()
            .ok_or_else(|| ApiError::forbidden("Only team leads and HR can decide on requests"))
    }

    /// Plain users only ever see their own requests.
    pub fn sees_all_requests(&self) -> bool {
        self.role != Role::User
    }

    pub fn as_requester(&self) -> Requester {
        Requester {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}
