//! Approval workflow for leave and work-from-home requests.
//!
//! A request carries one slot per approver role. Each decision overwrites the
//! caller's slot and the aggregate status is then recomputed from the slots
//! alone: any rejection wins, both approvals are needed to approve, anything
//! else is pending.

use chrono::{DateTime, Utc};

use crate::model::request::{
    Action, ApproverRole, Approvers, HistoryEntry, Request, RequestStatus, SlotStatus,
};

/// An approver's decision on one request.
#[derive(Debug, Clone)]
pub struct Decision {
    pub role: ApproverRole,
    pub action: Action,
    pub reason: Option<String>,
    /// id of the deciding user
    pub decided_by: String,
}

/// Result of [`evaluate_decision`].
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub request: Request,
    /// The history entry appended by this decision, `None` when the slot
    /// already held the same decision.
    pub recorded: Option<HistoryEntry>,
}

/// Derives the aggregate status from the approver slots.
pub fn aggregate_status(approvers: &Approvers) -> RequestStatus {
    if approvers.statuses().any(|s| s == SlotStatus::Rejected) {
        RequestStatus::Rejected
    } else if approvers.statuses().all(|s| s == SlotStatus::Approved) {
        RequestStatus::Approved
    } else {
        RequestStatus::Pending
    }
}

/// Merges `decision` into the request's approver slot and recomputes status.
///
/// Only the slot named by `decision.role`, `status` and `history` may change.
/// Repeating the decision a slot already holds is a no-op.
pub fn evaluate_decision(mut request: Request, decision: Decision, now: DateTime<Utc>) -> Evaluated {
    let new_status = decision.action.slot_status();
    let slot = request.approvers.slot_mut(decision.role);

    if slot.status == new_status {
        return Evaluated {
            request,
            recorded: None,
        };
    }

    slot.status = new_status;
    slot.reason = decision.reason.clone();
    slot.decided_at = Some(now);

    request.status = aggregate_status(&request.approvers);

    let entry = HistoryEntry {
        approver: decision.role,
        action: decision.action,
        comment: decision.reason,
        decided_by: decision.decided_by,
        timestamp: now,
    };
    request.history.push(entry.clone());

    Evaluated {
        request,
        recorded: Some(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::request::{LeaveDetails, LeaveType, RequestDetails, Requester};
    use chrono::{Duration, NaiveDate};

    fn new_request() -> Request {
        Request::submit(
            Requester {
                id: "emp-1".into(),
                name: "Jane Doe".into(),
                email: "jane@company.com".into(),
            },
            RequestDetails::Leave(LeaveDetails {
                start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
                leave_type: LeaveType::Sick,
                reason: "Flu".into(),
            }),
            Utc::now(),
        )
    }

    fn decide(request: Request, role: ApproverRole, action: Action) -> Evaluated {
        evaluate_decision(
            request,
            Decision {
                role,
                action,
                reason: Some(format!("{} by {}", action, role)),
                decided_by: "approver-1".into(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn team_lead_approval_alone_keeps_request_pending() {
        let out = decide(new_request(), ApproverRole::TeamLead, Action::Approve);

        assert_eq!(out.request.approvers.team_lead.status, SlotStatus::Approved);
        assert_eq!(out.request.approvers.hr.status, SlotStatus::Unset);
        assert_eq!(out.request.status, RequestStatus::Pending);
        assert!(out.recorded.is_some());
    }

    #[test]
    fn both_approvals_approve_the_request() {
        let out = decide(new_request(), ApproverRole::TeamLead, Action::Approve);
        let out = decide(out.request, ApproverRole::Hr, Action::Approve);

        assert_eq!(out.request.status, RequestStatus::Approved);
        assert_eq!(out.request.history.len(), 2);
        assert_eq!(out.request.history[0].approver, ApproverRole::TeamLead);
        assert_eq!(out.request.history[1].approver, ApproverRole::Hr);
    }

    #[test]
    fn hr_first_then_team_lead_also_approves() {
        let out = decide(new_request(), ApproverRole::Hr, Action::Approve);
        assert_eq!(out.request.status, RequestStatus::Pending);

        let out = decide(out.request, ApproverRole::TeamLead, Action::Approve);
        assert_eq!(out.request.status, RequestStatus::Approved);
    }

    #[test]
    fn any_rejection_rejects_regardless_of_other_slot() {
        for other in [None, Some(Action::Approve), Some(Action::Reject)] {
            let mut req = new_request();
            if let Some(action) = other {
                req = decide(req, ApproverRole::Hr, action).request;
            }
            let out = decide(req, ApproverRole::TeamLead, Action::Reject);
            assert_eq!(out.request.status, RequestStatus::Rejected, "hr: {:?}", other);
        }
    }

    #[test]
    fn approval_after_rejection_by_the_other_slot_stays_rejected() {
        let out = decide(new_request(), ApproverRole::TeamLead, Action::Reject);
        let out = decide(out.request, ApproverRole::Hr, Action::Approve);

        assert_eq!(out.request.status, RequestStatus::Rejected);
    }

    #[test]
    fn later_decision_overwrites_the_same_slot() {
        let out = decide(new_request(), ApproverRole::TeamLead, Action::Reject);
        let out = decide(out.request, ApproverRole::TeamLead, Action::Approve);

        assert_eq!(out.request.approvers.team_lead.status, SlotStatus::Approved);
        assert_eq!(out.request.status, RequestStatus::Pending);
        assert_eq!(out.request.history.len(), 2);
    }

    #[test]
    fn repeating_a_decision_changes_nothing() {
        let first = decide(new_request(), ApproverRole::Hr, Action::Approve);
        let before = first.request.clone();

        let second = evaluate_decision(
            first.request,
            Decision {
                role: ApproverRole::Hr,
                action: Action::Approve,
                reason: Some("again".into()),
                decided_by: "approver-2".into(),
            },
            Utc::now() + Duration::minutes(5),
        );

        assert!(second.recorded.is_none());
        assert_eq!(second.request, before);
    }

    #[test]
    fn decision_touches_only_its_own_slot() {
        let original = new_request();
        let out = decide(original.clone(), ApproverRole::Hr, Action::Reject);

        assert_eq!(out.request.id, original.id);
        assert_eq!(out.request.requester_id, original.requester_id);
        assert_eq!(out.request.name, original.name);
        assert_eq!(out.request.email, original.email);
        assert_eq!(out.request.details, original.details);
        assert_eq!(out.request.created_at, original.created_at);
        assert_eq!(out.request.approvers.team_lead, original.approvers.team_lead);
    }

    #[test]
    fn slot_records_reason_and_time() {
        let now = Utc::now();
        let out = evaluate_decision(
            new_request(),
            Decision {
                role: ApproverRole::TeamLead,
                action: Action::Reject,
                reason: Some("Deadline week".into()),
                decided_by: "lead-7".into(),
            },
            now,
        );

        let slot = &out.request.approvers.team_lead;
        assert_eq!(slot.reason.as_deref(), Some("Deadline week"));
        assert_eq!(slot.decided_at, Some(now));

        let entry = out.recorded.unwrap();
        assert_eq!(entry.decided_by, "lead-7");
        assert_eq!(entry.action, Action::Reject);
        assert_eq!(entry.comment.as_deref(), Some("Deadline week"));
    }

    #[test]
    fn status_is_a_function_of_the_slots() {
        use SlotStatus::*;
        let cases = [
            (Unset, Unset, RequestStatus::Pending),
            (Approved, Unset, RequestStatus::Pending),
            (Unset, Approved, RequestStatus::Pending),
            (Approved, Approved, RequestStatus::Approved),
            (Rejected, Unset, RequestStatus::Rejected),
            (Unset, Rejected, RequestStatus::Rejected),
            (Approved, Rejected, RequestStatus::Rejected),
            (Rejected, Approved, RequestStatus::Rejected),
            (Rejected, Rejected, RequestStatus::Rejected),
        ];

        for (lead, hr, expected) in cases {
            let mut approvers = Approvers::default();
            approvers.team_lead.status = lead;
            approvers.hr.status = hr;
            assert_eq!(aggregate_status(&approvers), expected, "{:?}/{:?}", lead, hr);
        }
    }
}
