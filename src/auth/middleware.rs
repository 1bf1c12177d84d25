use crate::auth::gate::{AuthUser, authorize, bearer_token};
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Verifies the bearer token for every route of the protected scope and
/// stores the caller as an [`AuthUser`] request extension.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let verified = match req.app_data::<Data<Config>>() {
        Some(config) => bearer_token(req.request())
            .and_then(|token| authorize(token, &config.jwt_secret, &Role::ALL)),
        None => Err(ApiError::Internal("App config missing".into())),
    };

    match verified {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser::from(claims));
            next.call(req).await
        }
        Err(err) => {
            let resp = err.error_response();
            Ok(req.into_response(resp))
        }
    }
}
