//! Persistence seams. Handlers only see the traits below; `main` picks the
//! backend and injects it as `web::Data<dyn RequestStore>` /
//! `web::Data<dyn UserStore>`.

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{
    request::{ApproverRole, Category, HistoryEntry, Request, RequestStatus},
    role::Role,
    user::User,
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    /// A unique constraint was hit.
    #[display(fmt = "{}", _0)]
    Conflict(String),
    /// The backend could not be reached or refused the operation.
    #[display(fmt = "store backend error: {}", _0)]
    Backend(String),
    /// A stored row could not be turned back into a domain value.
    #[display(fmt = "corrupt record: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 10;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub requester_id: Option<String>,
    pub status: Option<RequestStatus>,
    pub category: Option<Category>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        self.requester_id
            .as_deref()
            .is_none_or(|id| request.requester_id == id)
            && self.status.is_none_or(|s| request.status == s)
            && self.category.is_none_or(|c| request.category() == c)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: RequestStatus, n: i64) {
        match status {
            RequestStatus::Pending => self.pending += n,
            RequestStatus::Approved => self.approved += n,
            RequestStatus::Rejected => self.rejected += n,
        }
        self.total += n;
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(&self, request: &Request) -> Result<(), StoreError>;

    /// The request with its full history, if it exists.
    async fn find_request(&self, id: &str) -> Result<Option<Request>, StoreError>;

    /// Newest first. Returns the page and the total number of matches.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<(Vec<Request>, i64), StoreError>;

    /// Writes back the approver slots and status of `request` and appends
    /// `entry` to its history. No version check is made.
    async fn save_decision(&self, request: &Request, entry: &HistoryEntry) -> Result<(), StoreError>;

    async fn count_by_status(&self, requester_id: Option<&str>) -> Result<StatusCounts, StoreError>;

    /// Pending requests whose `slot` has not been decided yet.
    async fn count_awaiting(&self, slot: ApproverRole) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self, role: Option<Role>, page: Page) -> Result<(Vec<User>, i64), StoreError>;

    /// Applies `changes` and returns the updated user, `None` if unknown.
    async fn update_user(&self, id: &str, changes: &UserChanges) -> Result<Option<User>, StoreError>;

    /// `false` when no such user existed.
    async fn delete_user(&self, id: &str) -> Result<bool, StoreError>;

    async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>, StoreError>;
}
