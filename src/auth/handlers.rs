use crate::{
    auth::{
        gate::bearer_token,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::ApiError,
    model::user::User,
    models::{LoginReqDto, TokenPair, TokenType},
    store::UserStore,
};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error, info, instrument};

fn issue_tokens(user: &User, config: &Config) -> Result<TokenPair, ApiError> {
    let access_token = generate_access_token(user, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            ApiError::Internal("token signing failed".into())
        })?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl).map_err(|e| {
            error!(error = %e, "Failed to sign refresh token");
            ApiError::Internal("token signing failed".into())
        })?;

    debug!(user_id = %user.id, jti = %refresh_claims.jti, "Issued token pair");

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Exchange email and password for a token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(users, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::validation("Email and password are required"));
    }

    let email = user.email.trim().to_lowercase();
    let Some(db_user) = users.find_user_by_email(&email).await? else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let tokens = issue_tokens(&db_user, &config)?;

    info!(user_id = %db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Trade a refresh token (as bearer) for a fresh token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or non-refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let token = bearer_token(&req)?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::unauthorized("Refresh token required"));
    }

    // re-read the account so role changes and deletions take effect
    let user = users
        .find_user(&claims.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(HttpResponse::Ok().json(issue_tokens(&user, &config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, user_with_password};
    use crate::model::role::Role;
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn login_returns_a_verifiable_access_token() {
        let app = TestApp::new();
        app.seed_user(user_with_password("u-1", "jane@company.com", Role::TeamLead, "pw-123")).await;
        let svc = test::init_service(app.app()).await;

        let req = app
            .post("/auth/login")
            .set_json(json!({"email": "jane@company.com", "password": "pw-123"}))
            .to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let tokens: TokenPair = test::read_body_json(resp).await;
        let claims = verify_token(&tokens.access_token, &app.config.jwt_secret).unwrap();
        assert_eq!(claims.id, "u-1");
        assert_eq!(claims.role, Role::TeamLead);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[actix_web::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = TestApp::new();
        app.seed_user(user_with_password("u-1", "jane@company.com", Role::User, "pw-123")).await;
        let svc = test::init_service(app.app()).await;

        for body in [
            json!({"email": "jane@company.com", "password": "nope"}),
            json!({"email": "nobody@company.com", "password": "pw-123"}),
        ] {
            let req = app.post("/auth/login").set_json(body).to_request();
            let resp = test::call_service(&svc, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["message"], "Invalid credentials");
        }
    }

    #[actix_web::test]
    async fn empty_credentials_are_a_validation_error() {
        let app = TestApp::new();
        let svc = test::init_service(app.app()).await;

        let req = app
            .post("/auth/login")
            .set_json(json!({"email": " ", "password": ""}))
            .to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn refresh_accepts_only_refresh_tokens() {
        let app = TestApp::new();
        let user = user_with_password("u-9", "hr@company.com", Role::Hr, "pw");
        app.seed_user(user.clone()).await;
        let svc = test::init_service(app.app()).await;

        let (refresh, _) = generate_refresh_token(&user, &app.config.jwt_secret, 60).unwrap();
        let req = app
            .post("/auth/refresh")
            .insert_header(("Authorization", format!("Bearer {}", refresh)))
            .to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let pair: TokenPair = test::read_body_json(resp).await;
        assert!(verify_token(&pair.refresh_token, &app.config.jwt_secret).is_ok());

        let access = app.token_for(&user);
        let req = app
            .post("/auth/refresh")
            .insert_header(("Authorization", format!("Bearer {}", access)))
            .to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
