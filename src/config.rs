use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow, bail};
use strum::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

/// Account created at startup when no user has `email` yet.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,

    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn positive_rate(key: &str, default: u32) -> anyhow::Result<u32> {
    let rate = or_default(key, default)?;
    if rate == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(rate)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = or_default("STORE_BACKEND", StoreBackend::Mysql)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=mysql");
        }

        let bootstrap_admin = match env::var("ADMIN_EMAIL") {
            Ok(email) => Some(BootstrapAdmin {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
                email,
                password: required("ADMIN_PASSWORD")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: positive_rate("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: positive_rate("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: positive_rate("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: or_default("LOG_LEVEL", tracing::Level::INFO)?,

            bootstrap_admin,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 10_000,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            log_level: tracing::Level::INFO,
            bootstrap_admin: None,
        }
    }
}
