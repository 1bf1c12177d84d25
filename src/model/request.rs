use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Leave,
    Wfh,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkType {
    FullDay,
    HalfDay,
}

/// A named position in a request's approval record.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ApproverRole {
    TeamLead,
    Hr,
}

impl ApproverRole {
    pub const ALL: [ApproverRole; 2] = [ApproverRole::TeamLead, ApproverRole::Hr];
}

/// What an approver asks for.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Approve,
    Reject,
}

impl Action {
    /// The value an approver slot holds after this action.
    pub fn slot_status(self) -> SlotStatus {
        match self {
            Action::Approve => SlotStatus::Approved,
            Action::Reject => SlotStatus::Rejected,
        }
    }
}

/// Decision currently held in one approver slot.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SlotStatus {
    #[default]
    Unset,
    Approved,
    Rejected,
}

/// Aggregate status of a request, derived from its approver slots.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproverSlot {
    pub status: SlotStatus,
    pub reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Approvers {
    pub team_lead: ApproverSlot,
    pub hr: ApproverSlot,
}

impl Approvers {
    pub fn slot(&self, role: ApproverRole) -> &ApproverSlot {
        match role {
            ApproverRole::TeamLead => &self.team_lead,
            ApproverRole::Hr => &self.hr,
        }
    }

    pub fn slot_mut(&mut self, role: ApproverRole) -> &mut ApproverSlot {
        match role {
            ApproverRole::TeamLead => &mut self.team_lead,
            ApproverRole::Hr => &mut self.hr,
        }
    }

    pub fn statuses(&self) -> impl Iterator<Item = SlotStatus> + '_ {
        ApproverRole::ALL.into_iter().map(|role| self.slot(role).status)
    }
}

/// One recorded approver decision. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub approver: ApproverRole,
    pub action: Action,
    pub comment: Option<String>,
    /// id of the user who made the decision
    pub decided_by: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum RequestDetails {
    Leave(LeaveDetails),
    Wfh(WfhDetails),
}

impl RequestDetails {
    pub fn category(&self) -> Category {
        match self {
            RequestDetails::Leave(_) => Category::Leave,
            RequestDetails::Wfh(_) => Category::Wfh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDetails {
    #[schema(example = "2026-01-05")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07")]
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    #[schema(example = "Family event")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WfhDetails {
    #[schema(example = "2026-01-05")]
    pub date: NaiveDate,
    pub work_type: WorkType,
    #[schema(example = "Plumber visit")]
    pub reason: String,
}

/// A leave or work-from-home request together with its approval record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[schema(example = "3f1c2d8e-6a0b-4c57-9a35-7d5e6f0e9b11")]
    pub id: String,
    pub requester_id: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(value_type = Object)]
    pub details: RequestDetails,
    pub approvers: Approvers,
    pub status: RequestStatus,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

/// Who submits a request; copied from the caller's verified claims.
#[derive(Debug, Clone)]
pub struct Requester {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Request {
    /// A fresh submission: pending, with both approver slots unset.
    pub fn submit(requester: Requester, details: RequestDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            requester_id: requester.id,
            name: requester.name,
            email: requester.email,
            details,
            approvers: Approvers::default(),
            status: RequestStatus::Pending,
            history: Vec::new(),
            created_at: now,
        }
    }

    pub fn category(&self) -> Category {
        self.details.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn leave() -> RequestDetails {
        RequestDetails::Leave(LeaveDetails {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
            leave_type: LeaveType::Annual,
            reason: "Trip".into(),
        })
    }

    #[test]
    fn submitted_request_starts_pending_with_unset_slots() {
        let requester = Requester {
            id: "u-1".into(),
            name: "Jane".into(),
            email: "jane@company.com".into(),
        };
        let req = Request::submit(requester, leave(), Utc::now());

        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.approvers.statuses().all(|s| s == SlotStatus::Unset));
        assert!(req.history.is_empty());
        assert_eq!(req.category(), Category::Leave);
        assert_eq!(req.requester_id, "u-1");
    }

    #[test]
    fn approver_slots_serialize_with_canonical_keys() {
        let json = serde_json::to_value(Approvers::default()).unwrap();
        assert_eq!(json["teamLead"]["status"], "unset");
        assert_eq!(json["hr"]["status"], "unset");
        assert_eq!(ApproverRole::TeamLead.to_string(), "teamLead");
        assert_eq!(ApproverRole::from_str("hr").unwrap(), ApproverRole::Hr);
    }

    #[test]
    fn details_are_tagged_by_category() {
        let json = serde_json::to_value(leave()).unwrap();
        assert_eq!(json["category"], "leave");
        assert_eq!(json["startDate"], "2026-01-05");
        assert_eq!(json["leaveType"], "annual");

        let wfh: RequestDetails = serde_json::from_value(serde_json::json!({
            "category": "wfh",
            "date": "2026-02-01",
            "workType": "half_day",
            "reason": "Delivery"
        }))
        .unwrap();
        assert_eq!(wfh.category(), Category::Wfh);
    }

    #[test]
    fn action_maps_onto_slot_values() {
        assert_eq!(Action::Approve.slot_status(), SlotStatus::Approved);
        assert_eq!(Action::Reject.slot_status(), SlotStatus::Rejected);
        assert!(Action::from_str("approved").is_err());
    }
}
