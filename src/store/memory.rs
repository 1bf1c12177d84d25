use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{
    Page, RequestFilter, RequestStore, StatusCounts, StoreError, UserChanges, UserStore,
};
use crate::model::{
    request::{ApproverRole, HistoryEntry, Request, RequestStatus, SlotStatus},
    role::Role,
    user::User,
};

/// Process-local backend. Lives as long as the value that owns it; tests
/// build a fresh one or call [`MemoryStore::clear`].
#[derive(Default)]
pub struct MemoryStore {
    requests: RwLock<HashMap<String, Request>>,
    users: RwLock<HashMap<String, User>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
}

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let data = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.per_page as usize)
        .collect();
    (data, total)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every stored request and user.
    pub fn clear(&self) -> Result<(), StoreError> {
        write(&self.requests)?.clear();
        write(&self.users)?.clear();
        Ok(())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        let mut requests = write(&self.requests)?;
        if requests.contains_key(&request.id) {
            return Err(StoreError::Conflict("Request already exists".into()));
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn find_request(&self, id: &str) -> Result<Option<Request>, StoreError> {
        Ok(read(&self.requests)?.get(id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<(Vec<Request>, i64), StoreError> {
        let mut matching: Vec<Request> = read(&self.requests)?
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(paginate(matching, page))
    }

    async fn save_decision(&self, request: &Request, entry: &HistoryEntry) -> Result<(), StoreError> {
        let mut requests = write(&self.requests)?;
        let stored = requests
            .get_mut(&request.id)
            .ok_or_else(|| StoreError::Backend(format!("request {} vanished", request.id)))?;

        stored.approvers = request.approvers.clone();
        stored.status = request.status;
        stored.history.push(entry.clone());
        Ok(())
    }

    async fn count_by_status(&self, requester_id: Option<&str>) -> Result<StatusCounts, StoreError> {
        let mut counts = StatusCounts::default();
        for request in read(&self.requests)?.values() {
            if requester_id.is_none_or(|id| request.requester_id == id) {
                counts.add(request.status, 1);
            }
        }
        Ok(counts)
    }

    async fn count_awaiting(&self, slot: ApproverRole) -> Result<i64, StoreError> {
        let n = read(&self.requests)?
            .values()
            .filter(|r| {
                r.status == RequestStatus::Pending && r.approvers.slot(slot).status == SlotStatus::Unset
            })
            .count();
        Ok(n as i64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = write(&self.users)?;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict("Email already exists".into()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(read(&self.users)?.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(read(&self.users)?
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, role: Option<Role>, page: Page) -> Result<(Vec<User>, i64), StoreError> {
        let mut matching: Vec<User> = read(&self.users)?
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(paginate(matching, page))
    }

    async fn update_user(&self, id: &str, changes: &UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = write(&self.users)?;

        if let Some(email) = &changes.email {
            if users
                .values()
                .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email))
            {
                return Err(StoreError::Conflict("Email already exists".into()));
            }
        }

        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        Ok(write(&self.users)?.remove(id).is_some())
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>, StoreError> {
        let users = read(&self.users)?;
        Ok(Role::ALL
            .into_iter()
            .map(|role| (role, users.values().filter(|u| u.role == role).count() as i64))
            .collect())
    }
}
