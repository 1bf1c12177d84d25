//! Shared fixtures for handler tests: an app wired to a fresh in-memory
//! store plus request builders that carry a peer address for the limiter.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    test::TestRequest,
};
use chrono::{NaiveDate, Utc};

use crate::{
    auth::{jwt, password::hash_password},
    config::Config,
    model::{
        request::{Request, RequestDetails, Requester, WfhDetails, WorkType},
        role::Role,
        user::User,
    },
    routes::{self, AppState},
    store::{MemoryStore, RequestStore, UserStore},
};

pub fn user(id: &str, role: Role) -> User {
    User {
        id: id.into(),
        name: format!("User {}", id),
        email: format!("{}@company.com", id),
        password_hash: String::new(),
        role,
        created_at: Utc::now(),
    }
}

pub fn user_with_password(id: &str, email: &str, role: Role, password: &str) -> User {
    User {
        email: email.into(),
        password_hash: hash_password(password).unwrap(),
        ..user(id, role)
    }
}

pub struct TestApp {
    pub config: Config,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            config: Config::for_tests(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// The app under test; the returned value borrows nothing from `self`.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let requests: Arc<dyn RequestStore> = self.store.clone();
        let users: Arc<dyn UserStore> = self.store.clone();
        let state = AppState {
            config: self.config.clone(),
            requests,
            users,
        };
        App::new().configure(|cfg| routes::configure(cfg, state))
    }

    pub async fn seed_user(&self, user: User) {
        self.store.insert_user(&user).await.unwrap();
    }

    /// Stores a pending full-day WFH request for `requester_id`.
    pub async fn seed_wfh(&self, requester_id: &str) -> Request {
        let owner = user(requester_id, Role::User);
        let request = Request::submit(
            Requester {
                id: owner.id,
                name: owner.name,
                email: owner.email,
            },
            RequestDetails::Wfh(WfhDetails {
                date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                work_type: WorkType::FullDay,
                reason: "Home office".into(),
            }),
            Utc::now(),
        );
        self.store.insert_request(&request).await.unwrap();
        request
    }

    pub fn token_for(&self, user: &User) -> String {
        jwt::generate_access_token(user, &self.config.jwt_secret, 300).unwrap()
    }

    pub fn bearer(&self, user: &User) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token_for(user)))
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40_000))
    }

    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::get().uri(uri).peer_addr(Self::peer())
    }

    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::post().uri(uri).peer_addr(Self::peer())
    }

    pub fn put(&self, uri: &str) -> TestRequest {
        TestRequest::put().uri(uri).peer_addr(Self::peer())
    }

    pub fn delete(&self, uri: &str) -> TestRequest {
        TestRequest::delete().uri(uri).peer_addr(Self::peer())
    }
}
