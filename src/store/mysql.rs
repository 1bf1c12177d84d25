use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};

use super::{
    Page, RequestFilter, RequestStore, StatusCounts, StoreError, UserChanges, UserStore,
};
use crate::model::{
    request::{
        ApproverRole, ApproverSlot, Approvers, HistoryEntry, LeaveDetails, Request, RequestDetails,
        WfhDetails,
    },
    role::Role,
    user::User,
};

/// MySQL backend; schema lives in `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23000: integrity constraint violation (duplicate key)
            if db_err.code().as_deref() == Some("23000") {
                let msg = if db_err.message().contains("uq_users_email") {
                    "Email already exists"
                } else {
                    "Record already exists"
                };
                return StoreError::Conflict(msg.into());
            }
        }
        StoreError::Backend(err.to_string())
    }
}

fn parse<T: FromStr>(column: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("{} has unexpected value {:?}", column, value)))
}

fn required<T>(column: &str, value: Option<T>) -> Result<T, StoreError> {
    value.ok_or_else(|| StoreError::Corrupt(format!("{} is NULL", column)))
}

fn slot_status_column(slot: ApproverRole) -> &'static str {
    match slot {
        ApproverRole::TeamLead => "team_lead_status",
        ApproverRole::Hr => "hr_status",
    }
}

/// WHERE clause and bind value for an optional role filter on `users`.
fn role_filter(role: Option<Role>) -> (&'static str, Option<String>) {
    match role {
        Some(role) => (" WHERE role = ?", Some(role.to_string())),
        None => ("", None),
    }
}

const REQUEST_COLUMNS: &str = r#"
    id, requester_id, requester_name, requester_email, category,
    start_date, end_date, leave_type, work_date, work_type, reason,
    team_lead_status, team_lead_reason, team_lead_decided_at,
    hr_status, hr_reason, hr_decided_at,
    status, created_at
"#;

#[derive(FromRow)]
struct RequestRow {
    id: String,
    requester_id: String,
    requester_name: String,
    requester_email: String,
    category: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    leave_type: Option<String>,
    work_date: Option<NaiveDate>,
    work_type: Option<String>,
    reason: String,
    team_lead_status: String,
    team_lead_reason: Option<String>,
    team_lead_decided_at: Option<DateTime<Utc>>,
    hr_status: String,
    hr_reason: Option<String>,
    hr_decided_at: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self, history: Vec<HistoryEntry>) -> Result<Request, StoreError> {
        let details = match self.category.as_str() {
            "leave" => RequestDetails::Leave(LeaveDetails {
                start_date: required("start_date", self.start_date)?,
                end_date: required("end_date", self.end_date)?,
                leave_type: parse("leave_type", &required("leave_type", self.leave_type)?)?,
                reason: self.reason,
            }),
            "wfh" => RequestDetails::Wfh(WfhDetails {
                date: required("work_date", self.work_date)?,
                work_type: parse("work_type", &required("work_type", self.work_type)?)?,
                reason: self.reason,
            }),
            other => {
                return Err(StoreError::Corrupt(format!(
                    "category has unexpected value {:?}",
                    other
                )));
            }
        };

        Ok(Request {
            id: self.id,
            requester_id: self.requester_id,
            name: self.requester_name,
            email: self.requester_email,
            details,
            approvers: Approvers {
                team_lead: ApproverSlot {
                    status: parse("team_lead_status", &self.team_lead_status)?,
                    reason: self.team_lead_reason,
                    decided_at: self.team_lead_decided_at,
                },
                hr: ApproverSlot {
                    status: parse("hr_status", &self.hr_status)?,
                    reason: self.hr_reason,
                    decided_at: self.hr_decided_at,
                },
            },
            status: parse("status", &self.status)?,
            history,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct HistoryRow {
    request_id: String,
    approver: String,
    action: String,
    comment: Option<String>,
    decided_by: String,
    decided_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryEntry {
            approver: parse("approver", &row.approver)?,
            action: parse("action", &row.action)?,
            comment: row.comment,
            decided_by: row.decided_by,
            timestamp: row.decided_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: parse("role", &row.role)?,
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

impl MySqlStore {
    /// History of every id in `ids`, oldest entry first per request.
    async fn history_for(&self, ids: &[String]) -> Result<HashMap<String, Vec<HistoryEntry>>, StoreError> {
        let mut by_request: HashMap<String, Vec<HistoryEntry>> = HashMap::new();
        if ids.is_empty() {
            return Ok(by_request);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT request_id, approver, action, comment, decided_by, decided_at
            FROM request_history
            WHERE request_id IN ({})
            ORDER BY id
            "#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, HistoryRow>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        for row in query.fetch_all(&self.pool).await? {
            let request_id = row.request_id.clone();
            by_request
                .entry(request_id)
                .or_default()
                .push(HistoryEntry::try_from(row)?);
        }
        Ok(by_request)
    }
}

#[async_trait]
impl RequestStore for MySqlStore {
    async fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        let (start_date, end_date, leave_type, work_date, work_type, reason) = match &request.details {
            RequestDetails::Leave(d) => (
                Some(d.start_date),
                Some(d.end_date),
                Some(d.leave_type.as_ref()),
                None,
                None,
                d.reason.as_str(),
            ),
            RequestDetails::Wfh(d) => (
                None,
                None,
                None,
                Some(d.date),
                Some(d.work_type.as_ref()),
                d.reason.as_str(),
            ),
        };

        sqlx::query(
            r#"
            INSERT INTO requests
                (id, requester_id, requester_name, requester_email, category,
                 start_date, end_date, leave_type, work_date, work_type, reason,
                 team_lead_status, hr_status, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.requester_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(request.category().as_ref())
        .bind(start_date)
        .bind(end_date)
        .bind(leave_type)
        .bind(work_date)
        .bind(work_type)
        .bind(reason)
        .bind(request.approvers.team_lead.status.as_ref())
        .bind(request.approvers.hr.status.as_ref())
        .bind(request.status.as_ref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_request(&self, id: &str) -> Result<Option<Request>, StoreError> {
        let sql = format!("SELECT {} FROM requests WHERE id = ?", REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut history = self.history_for(&[row.id.clone()]).await?;
        let entries = history.remove(&row.id).unwrap_or_default();
        row.into_request(entries).map(Some)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<(Vec<Request>, i64), StoreError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<&str> = Vec::new();

        if let Some(requester_id) = filter.requester_id.as_deref() {
            where_sql.push_str(" AND requester_id = ?");
            args.push(requester_id);
        }
        if let Some(status) = &filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(status.as_ref());
        }
        if let Some(category) = &filter.category {
            where_sql.push_str(" AND category = ?");
            args.push(category.as_ref());
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM requests{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = count_q.bind(*arg);
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {} FROM requests{} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            REQUEST_COLUMNS, where_sql
        );
        let mut data_q = sqlx::query_as::<_, RequestRow>(&data_sql);
        for arg in &args {
            data_q = data_q.bind(*arg);
        }
        let rows = data_q
            .bind(page.per_page as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut history = self.history_for(&ids).await?;

        let requests = rows
            .into_iter()
            .map(|row| {
                let entries = history.remove(&row.id).unwrap_or_default();
                row.into_request(entries)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((requests, total))
    }

    async fn save_decision(&self, request: &Request, entry: &HistoryEntry) -> Result<(), StoreError> {
        let lead = &request.approvers.team_lead;
        let hr = &request.approvers.hr;

        sqlx::query(
            r#"
            UPDATE requests
            SET team_lead_status = ?, team_lead_reason = ?, team_lead_decided_at = ?,
                hr_status = ?, hr_reason = ?, hr_decided_at = ?,
                status = ?
            WHERE id = ?
            "#,
        )
        .bind(lead.status.as_ref())
        .bind(&lead.reason)
        .bind(lead.decided_at)
        .bind(hr.status.as_ref())
        .bind(&hr.reason)
        .bind(hr.decided_at)
        .bind(request.status.as_ref())
        .bind(&request.id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO request_history
                (request_id, approver, action, comment, decided_by, decided_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(entry.approver.as_ref())
        .bind(entry.action.as_ref())
        .bind(&entry.comment)
        .bind(&entry.decided_by)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_by_status(&self, requester_id: Option<&str>) -> Result<StatusCounts, StoreError> {
        let rows: Vec<(String, i64)> = match requester_id {
            Some(id) => {
                sqlx::query_as(
                    "SELECT status, COUNT(*) FROM requests WHERE requester_id = ? GROUP BY status",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT status, COUNT(*) FROM requests GROUP BY status")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(parse("status", &status)?, n);
        }
        Ok(counts)
    }

    async fn count_awaiting(&self, slot: ApproverRole) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM requests WHERE status = 'pending' AND {} = 'unset'",
            slot_status_column(slot)
        );
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self, role: Option<Role>, page: Page) -> Result<(Vec<User>, i64), StoreError> {
        let (where_sql, role) = role_filter(role);

        let count_sql = format!("SELECT COUNT(*) FROM users{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(role) = &role {
            count_q = count_q.bind(role);
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT id, name, email, password_hash, role, created_at FROM users{} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            where_sql
        );
        let mut data_q = sqlx::query_as::<_, UserRow>(&data_sql);
        if let Some(role) = &role {
            data_q = data_q.bind(role);
        }
        let users = data_q
            .bind(page.per_page as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total))
    }

    async fn update_user(&self, id: &str, changes: &UserChanges) -> Result<Option<User>, StoreError> {
        if self.find_user(id).await?.is_none() {
            return Ok(None);
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&str> = Vec::new();
        if let Some(name) = &changes.name {
            sets.push("name = ?");
            values.push(name);
        }
        if let Some(email) = &changes.email {
            sets.push("email = ?");
            values.push(email);
        }
        if let Some(role) = &changes.role {
            sets.push("role = ?");
            values.push(role.as_ref());
        }
        if let Some(hash) = &changes.password_hash {
            sets.push("password_hash = ?");
            values.push(hash);
        }

        if !sets.is_empty() {
            let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
            let mut query = sqlx::query(&sql);
            for value in values {
                query = query.bind(value);
            }
            query.bind(id).execute(&self.pool).await?;
        }

        self.find_user(id).await
    }

    async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
            .fetch_all(&self.pool)
            .await?;

        let mut counts: Vec<(Role, i64)> = Role::ALL.into_iter().map(|r| (r, 0)).collect();
        for (role, n) in rows {
            let role: Role = parse("role", &role)?;
            if let Some(entry) = counts.iter_mut().find(|(r, _)| *r == role) {
                entry.1 = n;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::request::{Action, LeaveType, RequestStatus, SlotStatus, WorkType};

    fn wfh_row() -> RequestRow {
        RequestRow {
            id: "r-1".into(),
            requester_id: "u-1".into(),
            requester_name: "Jane".into(),
            requester_email: "jane@company.com".into(),
            category: "wfh".into(),
            start_date: None,
            end_date: None,
            leave_type: None,
            work_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            work_type: Some("half_day".into()),
            reason: "Plumber visit".into(),
            team_lead_status: "approved".into(),
            team_lead_reason: Some("ok".into()),
            team_lead_decided_at: Some(Utc::now()),
            hr_status: "unset".into(),
            hr_reason: None,
            hr_decided_at: None,
            status: "pending".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_filter_binds_the_role_name() {
        assert_eq!(
            role_filter(Some(Role::TeamLead)),
            (" WHERE role = ?", Some("teamlead".to_string()))
        );
        assert_eq!(role_filter(None), ("", None));
    }

    #[test]
    fn wfh_row_becomes_a_request() {
        let request = wfh_row().into_request(Vec::new()).unwrap();

        match &request.details {
            RequestDetails::Wfh(d) => {
                assert_eq!(d.work_type, WorkType::HalfDay);
                assert_eq!(d.reason, "Plumber visit");
            }
            other => panic!("expected wfh details, got {:?}", other),
        }
        assert_eq!(request.approvers.team_lead.status, SlotStatus::Approved);
        assert_eq!(request.approvers.hr.status, SlotStatus::Unset);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.name, "Jane");
    }

    #[test]
    fn leave_row_needs_its_dates() {
        let row = RequestRow {
            category: "leave".into(),
            leave_type: Some("sick".into()),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            end_date: None,
            ..wfh_row()
        };
        let err = row.into_request(Vec::new()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg.contains("end_date")));

        let row = RequestRow {
            category: "leave".into(),
            leave_type: Some("sick".into()),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 2),
            ..wfh_row()
        };
        let request = row.into_request(Vec::new()).unwrap();
        assert!(matches!(
            request.details,
            RequestDetails::Leave(LeaveDetails { leave_type: LeaveType::Sick, .. })
        ));
    }

    #[test]
    fn unknown_stored_values_are_corrupt() {
        let row = RequestRow {
            category: "sabbatical".into(),
            ..wfh_row()
        };
        assert!(matches!(row.into_request(Vec::new()), Err(StoreError::Corrupt(_))));

        let row = RequestRow {
            status: "maybe".into(),
            ..wfh_row()
        };
        assert!(matches!(row.into_request(Vec::new()), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn history_row_converts_and_rejects_bad_action() {
        let row = HistoryRow {
            request_id: "r-1".into(),
            approver: "teamLead".into(),
            action: "reject".into(),
            comment: Some("Release week".into()),
            decided_by: "lead-1".into(),
            decided_at: Utc::now(),
        };
        let entry = HistoryEntry::try_from(row).unwrap();
        assert_eq!(entry.approver, ApproverRole::TeamLead);
        assert_eq!(entry.action, Action::Reject);
        assert_eq!(entry.decided_by, "lead-1");

        let row = HistoryRow {
            request_id: "r-1".into(),
            approver: "hr".into(),
            action: "approved".into(),
            comment: None,
            decided_by: "hr-1".into(),
            decided_at: Utc::now(),
        };
        assert!(matches!(HistoryEntry::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
