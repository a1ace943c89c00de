use crate::policy::rules::{Changes, Operation, Resource, Subject, RULES};

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(reason),
        }
    }
}

/// Decide whether `subject` may perform `op` on the row described by
/// `resource`, with `changes` carrying the proposed columns of a mutation
/// (`None` for reads and deletes).
///
/// Walks the ordered rule table; the first rule for the (table, operation)
/// pair that returns a decision wins. No matching rule means deny, so a
/// missing rule can only over-restrict, never open access.
///
/// Pure function of its arguments with no shared state; callable from any
/// number of request tasks at once. Denials are terminal for the request --
/// they are surfaced, never retried.
pub fn can(
    subject: &Subject,
    op: Operation,
    resource: &Resource,
    changes: Option<&Changes>,
) -> Decision {
    let table = resource.table();
    for rule in RULES {
        if rule.table != table || rule.op != op {
            continue;
        }
        if let Some(decision) = (rule.check)(subject, resource, changes) {
            return decision;
        }
    }
    Decision::deny(format!("no policy rule allows {op} on {table}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use serde_json::json;

    fn subject(user_id: i64, role: Role) -> Subject {
        Subject { user_id, role }
    }

    fn changes(value: serde_json::Value) -> Changes {
        value.as_object().expect("test change set").clone()
    }

    #[test]
    fn any_authenticated_subject_reads_the_directory() {
        let row = Resource::User {
            id: 7,
            role_id: Role::Wfm.as_id(),
        };
        for role in [Role::Agent, Role::TeamLead, Role::Wfm, Role::System] {
            assert!(can(&subject(1, role), Operation::Select, &row, None).is_allowed());
        }
    }

    #[test]
    fn agent_updates_own_profile_columns() {
        let sub = subject(42, Role::Agent);
        let row = Resource::User {
            id: 42,
            role_id: Role::Agent.as_id(),
        };
        let ok = changes(json!({"first_name": "Ada", "phone": "+4670000000"}));
        assert!(can(&sub, Operation::Update, &row, Some(&ok)).is_allowed());
    }

    #[test]
    fn agent_cannot_touch_own_role_column() {
        let sub = subject(42, Role::Agent);
        let row = Resource::User {
            id: 42,
            role_id: Role::Agent.as_id(),
        };
        // mixing one allowed column in does not rescue the mutation
        let sneaky = changes(json!({"first_name": "Ada", "role_id": 3}));
        let decision = can(&sub, Operation::Update, &row, Some(&sneaky));
        assert!(!decision.is_allowed());
        assert!(decision.reason().unwrap().contains("role_id"));
    }

    #[test]
    fn agent_cannot_update_someone_elses_row() {
        let sub = subject(42, Role::Agent);
        let row = Resource::User {
            id: 43,
            role_id: Role::Agent.as_id(),
        };
        let ok = changes(json!({"first_name": "Eve"}));
        assert!(!can(&sub, Operation::Update, &row, Some(&ok)).is_allowed());
    }

    #[test]
    fn wfm_updates_any_user_row() {
        let sub = subject(1, Role::Wfm);
        let row = Resource::User {
            id: 43,
            role_id: Role::Agent.as_id(),
        };
        let ok = changes(json!({"first_name": "Eve", "role_id": 2, "is_active": false}));
        assert!(can(&sub, Operation::Update, &row, Some(&ok)).is_allowed());
    }

    #[test]
    fn empty_change_set_is_rejected() {
        let sub = subject(42, Role::Agent);
        let row = Resource::User {
            id: 42,
            role_id: Role::Agent.as_id(),
        };
        let empty = changes(json!({}));
        assert!(!can(&sub, Operation::Update, &row, Some(&empty)).is_allowed());
        assert!(!can(&sub, Operation::Update, &row, None).is_allowed());
    }

    #[test]
    fn owner_files_their_own_leave_request() {
        let sub = subject(42, Role::Agent);
        let candidate = Resource::LeaveRequest { owner_id: 42 };
        let ok = changes(json!({
            "user_id": 42,
            "start_date": "2026-09-01",
            "end_date": "2026-09-03",
            "leave_type": "annual"
        }));
        assert!(can(&sub, Operation::Insert, &candidate, Some(&ok)).is_allowed());

        let for_other = Resource::LeaveRequest { owner_id: 99 };
        assert!(!can(&sub, Operation::Insert, &for_other, Some(&ok)).is_allowed());
    }

    #[test]
    fn leave_status_moves_only_through_approver_roles() {
        let row = Resource::LeaveRequest { owner_id: 42 };
        let transition = changes(json!({"status": "approved"}));
        assert!(
            !can(
                &subject(42, Role::Agent),
                Operation::Update,
                &row,
                Some(&transition)
            )
            .is_allowed()
        );
        assert!(
            can(
                &subject(7, Role::TeamLead),
                Operation::Update,
                &row,
                Some(&transition)
            )
            .is_allowed()
        );
        assert!(
            can(
                &subject(8, Role::Wfm),
                Operation::Update,
                &row,
                Some(&transition)
            )
            .is_allowed()
        );
    }

    #[test]
    fn leave_reads_are_owner_or_elevated() {
        let row = Resource::LeaveRequest { owner_id: 42 };
        assert!(can(&subject(42, Role::Agent), Operation::Select, &row, None).is_allowed());
        assert!(!can(&subject(43, Role::Agent), Operation::Select, &row, None).is_allowed());
        assert!(can(&subject(7, Role::TeamLead), Operation::Select, &row, None).is_allowed());
    }

    #[test]
    fn owner_edits_content_of_their_own_comment() {
        let sub = subject(42, Role::Agent);
        let row = Resource::Comment {
            author_id: 42,
            is_system: false,
        };
        let ok = changes(json!({"content": "updated text"}));
        assert!(can(&sub, Operation::Update, &row, Some(&ok)).is_allowed());

        // but only content
        let flag = changes(json!({"content": "x", "is_system": true}));
        assert!(!can(&sub, Operation::Update, &row, Some(&flag)).is_allowed());
    }

    #[test]
    fn system_comment_is_immutable_for_non_privileged_subjects() {
        let row = Resource::Comment {
            author_id: 42,
            is_system: true,
        };
        // the stored flag decides, not whatever the caller claims about it
        let claims_user_comment = changes(json!({"content": "defaced", "is_system": false}));
        let content_only = changes(json!({"content": "defaced"}));
        for role in [Role::Agent, Role::TeamLead] {
            let sub = subject(42, role);
            assert!(
                !can(&sub, Operation::Update, &row, Some(&claims_user_comment)).is_allowed()
            );
            assert!(!can(&sub, Operation::Update, &row, Some(&content_only)).is_allowed());
        }
        // privileged path stays open
        let wfm = subject(1, Role::Wfm);
        assert!(can(&wfm, Operation::Update, &row, Some(&content_only)).is_allowed());
    }

    #[test]
    fn caller_cannot_self_assign_the_system_flag_on_insert() {
        let sub = subject(42, Role::Agent);
        let candidate = Resource::Comment {
            author_id: 42,
            is_system: false,
        };
        let with_flag = changes(json!({
            "request_type": "leave",
            "request_id": 5,
            "author_id": 42,
            "content": "hello",
            "is_system": true
        }));
        assert!(!can(&sub, Operation::Insert, &candidate, Some(&with_flag)).is_allowed());

        let plain = changes(json!({
            "request_type": "leave",
            "request_id": 5,
            "author_id": 42,
            "content": "hello"
        }));
        assert!(can(&sub, Operation::Insert, &candidate, Some(&plain)).is_allowed());

        // the service role is the only writer of system comments
        let system = subject(0, Role::System);
        let system_candidate = Resource::Comment {
            author_id: 0,
            is_system: true,
        };
        assert!(can(&system, Operation::Insert, &system_candidate, Some(&with_flag)).is_allowed());
    }

    #[test]
    fn comment_delete_is_service_cleanup_only() {
        let row = Resource::Comment {
            author_id: 42,
            is_system: false,
        };
        for role in [Role::Agent, Role::TeamLead, Role::Wfm] {
            assert!(!can(&subject(42, role), Operation::Delete, &row, None).is_allowed());
        }
        assert!(can(&subject(0, Role::System), Operation::Delete, &row, None).is_allowed());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let sub = subject(42, Role::Agent);
        let row = Resource::Comment {
            author_id: 42,
            is_system: true,
        };
        let proposal = changes(json!({"content": "x"}));
        let first = can(&sub, Operation::Update, &row, Some(&proposal));
        let second = can(&sub, Operation::Update, &row, Some(&proposal));
        assert_eq!(first, second);
    }

    #[test]
    fn unmatched_operations_fall_through_to_deny() {
        // no rule grants agents a user delete
        let row = Resource::User {
            id: 42,
            role_id: Role::Agent.as_id(),
        };
        let decision = can(&subject(42, Role::Agent), Operation::Delete, &row, None);
        assert!(!decision.is_allowed());
        assert!(decision.reason().unwrap().contains("delete"));
    }
}
