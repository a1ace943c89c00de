use crate::api::break_schedule::{BreakFilter, BreakResponse, BreakType, CreateBreak};
use crate::api::comment::{CommentFilter, CreateComment, RequestType};
use crate::api::leave_request::LeaveFilter;
use crate::api::leave_request::LeaveListResponse;
use crate::api::leave_request::LeaveResponse;
use crate::api::leave_request::{CreateLeave, LeaveType};
use crate::api::user::{UserListResponse, UserQuery, UserResponse};
use crate::model::comment::Comment;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WFM System API",
        version = "1.0.0",
        description = r#"
## Workforce Management (WFM) System

This API powers a **Workforce Management (WFM)** system for operational teams: a user directory, leave handling, break scheduling and request comments.

### 🔹 Key Features
- **User Directory**
  - Search the directory, view profiles, self-service profile updates
- **Leave Management**
  - File leave requests, approve/reject as team lead or WFM, view history
- **Break Scheduling**
  - Plan and list lunch/rest/training breaks per day
- **Comments**
  - Discuss leave and break requests; system-generated notes are read-only

### 🔐 Security
Every data operation is checked against a deny-by-default access policy on the
server, keyed by the caller's role (**Agent**, **Team Lead**, **WFM**, **System**).
Endpoints are protected with **JWT Bearer authentication**.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::break_schedule::create_break,
        crate::api::break_schedule::list_breaks,
        crate::api::break_schedule::delete_break,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,

        crate::api::comment::create_comment,
        crate::api::comment::list_comments,
        crate::api::comment::update_comment,
        crate::api::comment::delete_comment
    ),
    components(
        schemas(
            LeaveFilter,
            LeaveResponse,
            LeaveListResponse,
            CreateLeave,
            LeaveType,
            CreateBreak,
            BreakType,
            BreakFilter,
            BreakResponse,
            UserQuery,
            UserResponse,
            UserListResponse,
            CreateComment,
            RequestType,
            CommentFilter,
            Comment
        )
    ),
    tags(
        (name = "Leave", description = "Leave management APIs"),
        (name = "Breaks", description = "Break scheduling APIs"),
        (name = "Users", description = "User directory APIs"),
        (name = "Comments", description = "Request comment APIs"),
    )
)]
pub struct ApiDoc;
