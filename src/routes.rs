use crate::{
    api::{dashboard, requests, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::{json_error_handler, query_error_handler},
    store::{RequestStore, UserStore},
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Everything the handlers pull out of app data.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub requests: Arc<dyn RequestStore>,
    pub users: Arc<dyn UserStore>,
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    // Config::from_env rejects zero rates
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, state: AppState) {
    let config = state.config.clone();

    cfg.app_data(web::Data::new(state.config))
        .app_data(web::Data::from(state.requests))
        .app_data(web::Data::from(state.users))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler));

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(users::me)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard)))
            .service(
                web::scope("/requests")
                    // /requests
                    .service(web::resource("").route(web::get().to(requests::list_requests)))
                    // /requests/leave
                    .service(web::resource("/leave").route(web::post().to(requests::create_leave)))
                    // /requests/wfh
                    .service(web::resource("/wfh").route(web::post().to(requests::create_wfh)))
                    // /requests/{id}
                    .service(web::resource("/{id}").route(web::get().to(requests::get_request)))
                    // /requests/{id}/decision
                    .service(
                        web::resource("/{id}/decision").route(web::put().to(requests::decide)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::post().to(users::create_user))
                            .route(web::get().to(users::list_users)),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(users::get_user))
                            .route(web::put().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refresh_token
//       └─ returns a new token pair
