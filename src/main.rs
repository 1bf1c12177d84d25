use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
#[cfg(test)]
mod test_support;
mod workflow;

use config::{BootstrapAdmin, Config, StoreBackend};
use db::init_db;

use crate::docs::ApiDoc;
use crate::model::role::Role;
use crate::routes::AppState;
use crate::store::{MemoryStore, MySqlStore, RequestStore, UserStore};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR approvals service is running"
}

/// Creates the configured admin account unless that email is already taken.
async fn ensure_admin(users: &dyn UserStore, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    if users.find_user_by_email(&admin.email.to_lowercase()).await?.is_some() {
        info!(email = %admin.email, "Bootstrap admin already present");
        return Ok(());
    }

    let user = api::users::create_account(users, &admin.name, &admin.email, &admin.password, Role::Admin)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(backend = ?config.store_backend, "Server starting...");

    let (requests, users): (Arc<dyn RequestStore>, Arc<dyn UserStore>) = match config.store_backend {
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORE_BACKEND=mysql")?;
            let pool = init_db(url).await.context("Failed to connect to database")?;
            let store = Arc::new(MySqlStore::new(pool));
            (store.clone(), store)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        ensure_admin(users.as_ref(), admin).await?;
    }

    let server_addr = config.server_addr.clone();
    let state = AppState {
        config,
        requests,
        users,
    };

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .service(index)
            .configure(|cfg| routes::configure(cfg, state.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await?;

    Ok(())
}
