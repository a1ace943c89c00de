use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub status: String,
}

/// Workflow state of a request. Fresh requests start in `pending_tl` and
/// only approver roles move them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    PendingTl,
    Approved,
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_strings_match_stored_values() {
        assert_eq!(LeaveStatus::PendingTl.to_string(), "pending_tl");
        assert_eq!(
            LeaveStatus::from_str("approved").unwrap(),
            LeaveStatus::Approved
        );
        assert!(LeaveStatus::from_str("bogus").is_err());
    }
}
