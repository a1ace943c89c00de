use derive_more::Display;
use serde_json::{Map, Value};

use crate::model::role::Role;
use crate::policy::evaluator::Decision;

/// Tables the policy layer covers.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
pub enum Table {
    #[display(fmt = "users")]
    Users,
    #[display(fmt = "leave_requests")]
    LeaveRequests,
    #[display(fmt = "break_schedules")]
    BreakSchedules,
    #[display(fmt = "comments")]
    Comments,
}

#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
pub enum Operation {
    #[display(fmt = "select")]
    Select,
    #[display(fmt = "insert")]
    Insert,
    #[display(fmt = "update")]
    Update,
    #[display(fmt = "delete")]
    Delete,
}

/// The authenticated actor a decision is made for. Always passed in
/// explicitly; there is no ambient current-user state anywhere.
#[derive(Debug, Copy, Clone)]
pub struct Subject {
    pub user_id: i64,
    pub role: Role,
}

/// Authorization-relevant snapshot of the row under evaluation.
///
/// For inserts this describes the candidate row; for everything else it is
/// the stored row, fetched in the same transaction that performs the write.
#[derive(Debug, Copy, Clone)]
pub enum Resource {
    User { id: i64, role_id: i16 },
    LeaveRequest { owner_id: i64 },
    BreakSchedule { owner_id: i64 },
    Comment { author_id: i64, is_system: bool },
}

impl Resource {
    pub fn table(&self) -> Table {
        match self {
            Resource::User { .. } => Table::Users,
            Resource::LeaveRequest { .. } => Table::LeaveRequests,
            Resource::BreakSchedule { .. } => Table::BreakSchedules,
            Resource::Comment { .. } => Table::Comments,
        }
    }
}

/// Proposed column changes of a mutation, keyed by column name. Reads pass
/// `None`. Same JSON-object shape the dynamic update builder consumes.
pub type Changes = Map<String, Value>;

type Check = fn(&Subject, &Resource, Option<&Changes>) -> Option<Decision>;

/// One entry of the rule table. `check` returns `None` when the rule does
/// not apply, letting evaluation fall through to the next entry.
pub struct Rule {
    pub table: Table,
    pub op: Operation,
    pub check: Check,
}

// Column allow-lists. A mutation touching anything outside the matched list
// is rejected as a whole, never partially applied.

/// Self-service profile columns. `role_id` stays out on purpose: role
/// changes only happen through the wfm path below.
pub const USER_SELF_COLUMNS: &[&str] = &["first_name", "last_name", "phone"];

pub const USER_WFM_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "phone",
    "email",
    "role_id",
    "is_active",
];

pub const USER_INSERT_COLUMNS: &[&str] = &[
    "email",
    "password",
    "first_name",
    "last_name",
    "phone",
    "role_id",
];

/// Status never appears here: a fresh request always starts in `pending_tl`
/// and transitions are a separate, role-gated update.
pub const LEAVE_INSERT_COLUMNS: &[&str] = &["user_id", "start_date", "end_date", "leave_type"];

pub const LEAVE_STATUS_COLUMNS: &[&str] = &["status"];

pub const BREAK_INSERT_COLUMNS: &[&str] =
    &["user_id", "date", "start_time", "end_time", "break_type"];

/// `is_system` is absent: it is server-assigned, so a caller-supplied value
/// fails the column check.
pub const COMMENT_INSERT_COLUMNS: &[&str] = &["request_type", "request_id", "author_id", "content"];

pub const COMMENT_SYSTEM_INSERT_COLUMNS: &[&str] = &[
    "request_type",
    "request_id",
    "author_id",
    "content",
    "is_system",
];

pub const COMMENT_OWN_COLUMNS: &[&str] = &["content"];

pub const COMMENT_WFM_COLUMNS: &[&str] = &["content", "is_system"];

/// All-or-nothing column gate for a mutation proposal.
fn columns_decision(changes: Option<&Changes>, allowed: &[&str]) -> Decision {
    match changes {
        None => Decision::deny("mutation requires a change set"),
        Some(map) if map.is_empty() => Decision::deny("empty change set"),
        Some(map) => {
            for key in map.keys() {
                if !allowed.contains(&key.as_str()) {
                    return Decision::deny(format!("column `{key}` is not mutable here"));
                }
            }
            Decision::Allow
        }
    }
}

// users ----------------------------------------------------------------

/// Directory lookup is universal for authenticated subjects.
fn users_select(_sub: &Subject, _res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    Some(Decision::Allow)
}

fn users_insert(sub: &Subject, _res: &Resource, changes: Option<&Changes>) -> Option<Decision> {
    match sub.role {
        Role::Wfm | Role::System => Some(columns_decision(changes, USER_INSERT_COLUMNS)),
        Role::Agent | Role::TeamLead => None,
    }
}

fn users_update_elevated(
    sub: &Subject,
    _res: &Resource,
    changes: Option<&Changes>,
) -> Option<Decision> {
    match sub.role {
        Role::Wfm | Role::System => Some(columns_decision(changes, USER_WFM_COLUMNS)),
        Role::Agent | Role::TeamLead => None,
    }
}

fn users_update_self(sub: &Subject, res: &Resource, changes: Option<&Changes>) -> Option<Decision> {
    let Resource::User { id, .. } = res else {
        return None;
    };
    if *id == sub.user_id {
        Some(columns_decision(changes, USER_SELF_COLUMNS))
    } else {
        None
    }
}

/// Users are never deleted in normal operation; only the service role may,
/// for cleanup.
fn users_delete(sub: &Subject, _res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    match sub.role {
        Role::System => Some(Decision::Allow),
        Role::Agent | Role::TeamLead | Role::Wfm => None,
    }
}

// leave_requests -------------------------------------------------------

fn leave_select(sub: &Subject, res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    let Resource::LeaveRequest { owner_id } = res else {
        return None;
    };
    match sub.role {
        Role::TeamLead | Role::Wfm | Role::System => Some(Decision::Allow),
        Role::Agent if *owner_id == sub.user_id => Some(Decision::Allow),
        Role::Agent => None,
    }
}

fn leave_insert_own(sub: &Subject, res: &Resource, changes: Option<&Changes>) -> Option<Decision> {
    let Resource::LeaveRequest { owner_id } = res else {
        return None;
    };
    if *owner_id == sub.user_id {
        Some(columns_decision(changes, LEAVE_INSERT_COLUMNS))
    } else {
        None
    }
}

/// Lifecycle transitions are approver-only, and only the status column moves.
fn leave_update_approver(
    sub: &Subject,
    _res: &Resource,
    changes: Option<&Changes>,
) -> Option<Decision> {
    match sub.role {
        Role::TeamLead | Role::Wfm | Role::System => {
            Some(columns_decision(changes, LEAVE_STATUS_COLUMNS))
        }
        Role::Agent => None,
    }
}

fn leave_delete(sub: &Subject, _res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    match sub.role {
        Role::System => Some(Decision::Allow),
        Role::Agent | Role::TeamLead | Role::Wfm => None,
    }
}

// break_schedules ------------------------------------------------------

fn break_select(sub: &Subject, res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    let Resource::BreakSchedule { owner_id } = res else {
        return None;
    };
    match sub.role {
        Role::TeamLead | Role::Wfm | Role::System => Some(Decision::Allow),
        Role::Agent if *owner_id == sub.user_id => Some(Decision::Allow),
        Role::Agent => None,
    }
}

fn break_insert_own(sub: &Subject, res: &Resource, changes: Option<&Changes>) -> Option<Decision> {
    let Resource::BreakSchedule { owner_id } = res else {
        return None;
    };
    if *owner_id == sub.user_id {
        Some(columns_decision(changes, BREAK_INSERT_COLUMNS))
    } else {
        None
    }
}

fn break_delete(sub: &Subject, res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    let Resource::BreakSchedule { owner_id } = res else {
        return None;
    };
    match sub.role {
        Role::Wfm | Role::System => Some(Decision::Allow),
        Role::Agent | Role::TeamLead if *owner_id == sub.user_id => Some(Decision::Allow),
        Role::Agent | Role::TeamLead => None,
    }
}

// comments -------------------------------------------------------------

/// Callers establish visibility of the parent request through that table's
/// select rule before reaching this one; comments themselves, system or
/// user-authored, are then readable as a set.
fn comments_select(_sub: &Subject, _res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    Some(Decision::Allow)
}

fn comments_insert_system(
    sub: &Subject,
    _res: &Resource,
    changes: Option<&Changes>,
) -> Option<Decision> {
    match sub.role {
        Role::System => Some(columns_decision(changes, COMMENT_SYSTEM_INSERT_COLUMNS)),
        Role::Agent | Role::TeamLead | Role::Wfm => None,
    }
}

fn comments_insert_own(
    sub: &Subject,
    res: &Resource,
    changes: Option<&Changes>,
) -> Option<Decision> {
    let Resource::Comment {
        author_id,
        is_system,
    } = res
    else {
        return None;
    };
    if *author_id == sub.user_id && !is_system {
        Some(columns_decision(changes, COMMENT_INSERT_COLUMNS))
    } else {
        None
    }
}

fn comments_update_privileged(
    sub: &Subject,
    _res: &Resource,
    changes: Option<&Changes>,
) -> Option<Decision> {
    match sub.role {
        Role::Wfm | Role::System => Some(columns_decision(changes, COMMENT_WFM_COLUMNS)),
        Role::Agent | Role::TeamLead => None,
    }
}

/// Gated on the stored `is_system` flag, not on whatever the caller claims
/// about it: a system comment falls through here and hits the default deny.
fn comments_update_own(
    sub: &Subject,
    res: &Resource,
    changes: Option<&Changes>,
) -> Option<Decision> {
    let Resource::Comment {
        author_id,
        is_system,
    } = res
    else {
        return None;
    };
    if !is_system && *author_id == sub.user_id {
        Some(columns_decision(changes, COMMENT_OWN_COLUMNS))
    } else {
        None
    }
}

fn comments_delete(sub: &Subject, _res: &Resource, _changes: Option<&Changes>) -> Option<Decision> {
    match sub.role {
        Role::System => Some(Decision::Allow),
        Role::Agent | Role::TeamLead | Role::Wfm => None,
    }
}

/// Ordered rule table. Evaluation walks it top to bottom, the first rule for
/// the (table, operation) pair that returns a decision wins, and anything
/// that falls off the end is denied.
pub static RULES: &[Rule] = &[
    Rule {
        table: Table::Users,
        op: Operation::Select,
        check: users_select,
    },
    Rule {
        table: Table::Users,
        op: Operation::Insert,
        check: users_insert,
    },
    Rule {
        table: Table::Users,
        op: Operation::Update,
        check: users_update_elevated,
    },
    Rule {
        table: Table::Users,
        op: Operation::Update,
        check: users_update_self,
    },
    Rule {
        table: Table::Users,
        op: Operation::Delete,
        check: users_delete,
    },
    Rule {
        table: Table::LeaveRequests,
        op: Operation::Select,
        check: leave_select,
    },
    Rule {
        table: Table::LeaveRequests,
        op: Operation::Insert,
        check: leave_insert_own,
    },
    Rule {
        table: Table::LeaveRequests,
        op: Operation::Update,
        check: leave_update_approver,
    },
    Rule {
        table: Table::LeaveRequests,
        op: Operation::Delete,
        check: leave_delete,
    },
    Rule {
        table: Table::BreakSchedules,
        op: Operation::Select,
        check: break_select,
    },
    Rule {
        table: Table::BreakSchedules,
        op: Operation::Insert,
        check: break_insert_own,
    },
    Rule {
        table: Table::BreakSchedules,
        op: Operation::Delete,
        check: break_delete,
    },
    Rule {
        table: Table::Comments,
        op: Operation::Select,
        check: comments_select,
    },
    Rule {
        table: Table::Comments,
        op: Operation::Insert,
        check: comments_insert_system,
    },
    Rule {
        table: Table::Comments,
        op: Operation::Insert,
        check: comments_insert_own,
    },
    Rule {
        table: Table::Comments,
        op: Operation::Update,
        check: comments_update_privileged,
    },
    Rule {
        table: Table::Comments,
        op: Operation::Update,
        check: comments_update_own,
    },
    Rule {
        table: Table::Comments,
        op: Operation::Delete,
        check: comments_delete,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_service_columns_exclude_role() {
        assert!(!USER_SELF_COLUMNS.contains(&"role_id"));
        assert!(!USER_SELF_COLUMNS.contains(&"email"));
        assert!(USER_WFM_COLUMNS.contains(&"role_id"));
    }

    #[test]
    fn comment_insert_columns_exclude_system_flag() {
        assert!(!COMMENT_INSERT_COLUMNS.contains(&"is_system"));
        assert!(COMMENT_SYSTEM_INSERT_COLUMNS.contains(&"is_system"));
    }

    #[test]
    fn resource_maps_to_its_table() {
        assert_eq!(
            Resource::User { id: 1, role_id: 1 }.table(),
            Table::Users
        );
        assert_eq!(
            Resource::Comment {
                author_id: 1,
                is_system: false
            }
            .table(),
            Table::Comments
        );
    }

    #[test]
    fn elevated_update_rule_wins_over_self_service() {
        // a wfm editing their own row must get the wider allow-list, which
        // only happens when the elevated rule sits first
        let sub = Subject {
            user_id: 5,
            role: Role::Wfm,
        };
        let own_row = Resource::User {
            id: 5,
            role_id: Role::Wfm.as_id(),
        };
        let proposal: Changes = serde_json::json!({"is_active": false})
            .as_object()
            .unwrap()
            .clone();
        let decision = (RULES
            .iter()
            .filter(|r| r.table == Table::Users && r.op == Operation::Update)
            .find_map(|r| (r.check)(&sub, &own_row, Some(&proposal))))
        .unwrap();
        assert!(decision.is_allowed());
    }
}
