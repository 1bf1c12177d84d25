use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::request::ApproverRole;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    TeamLead,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Hr, Role::TeamLead, Role::User];

    /// The approver slot this role signs, if any.
    pub fn approver_slot(self) -> Option<ApproverRole> {
        match self {
            Role::TeamLead => Some(ApproverRole::TeamLead),
            Role::Hr => Some(ApproverRole::Hr),
            Role::Admin | Role::User => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_use_lowercase_names() {
        assert_eq!(Role::TeamLead.to_string(), "teamlead");
        assert_eq!(Role::from_str("hr").unwrap(), Role::Hr);
        assert_eq!(serde_json::to_string(&Role::TeamLead).unwrap(), "\"teamlead\"");
        assert!(Role::from_str("manager").is_err());
    }

    #[test]
    fn only_team_leads_and_hr_hold_slots() {
        assert_eq!(Role::TeamLead.approver_slot(), Some(ApproverRole::TeamLead));
        assert_eq!(Role::Hr.approver_slot(), Some(ApproverRole::Hr));
        assert_eq!(Role::Admin.approver_slot(), None);
        assert_eq!(Role::User.approver_slot(), None);
    }
}
