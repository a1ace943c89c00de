use crate::auth::auth::AuthUser;
use crate::model::leave_request::LeaveStatus;
use crate::policy::{self, Operation, Resource};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use sqlx::{PgPool, prelude::FromRow};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

impl LeaveType {
    fn as_str(&self) -> &str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Unpaid => "unpaid",
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-09-01", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-09-03", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by owner (approver roles only; agents always see their own)
    pub user_id: Option<i64>,
    #[schema(example = "pending_tl")]
    /// Filter by workflow status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    I64(i64),
    Str(&'a str),
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: i64,
    /// user the leave is filed for
    #[schema(example = 42)]
    pub user_id: i64,
    #[schema(example = "2026-09-01", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-09-03", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "sick", value_type = String)]
    pub leave_type: String,
    #[schema(example = "pending_tl", value_type = String)]
    pub status: Option<String>,
    #[schema(example = "2026-08-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fetch the owner of a leave row; `None` when the row does not exist.
async fn fetch_owner(pool: &PgPool, leave_id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT user_id FROM leave_requests WHERE id = $1")
        .bind(leave_id)
        .fetch_optional(pool)
        .await
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": "Leave request not found"
    }))
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "status": "pending_tl"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    // 1️⃣ validate dates
    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    // 2️⃣ policy: owners file their own requests
    let mut changes = Map::new();
    changes.insert("user_id".into(), json!(auth.user_id));
    changes.insert("start_date".into(), json!(payload.start_date));
    changes.insert("end_date".into(), json!(payload.end_date));
    changes.insert("leave_type".into(), json!(payload.leave_type.as_str()));

    let decision = policy::can(
        &auth.subject(),
        Operation::Insert,
        &Resource::LeaveRequest {
            owner_id: auth.user_id,
        },
        Some(&changes),
    );
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    // 3️⃣ insert request
    sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, start_date, end_date, leave_type, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.leave_type.as_str())
    .bind(LeaveStatus::PendingTl.to_string())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request submitted",
        "status": LeaveStatus::PendingTl.to_string()
    })))
}

/// Shared body of the approve/reject endpoints; both are a status-column
/// update raced through `status = 'pending_tl'` in the same statement.
async fn transition_leave(
    auth: AuthUser,
    pool: &PgPool,
    leave_id: i64,
    next: LeaveStatus,
) -> actix_web::Result<HttpResponse> {
    let owner = fetch_owner(pool, leave_id).await.map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(owner_id) = owner else {
        return Ok(not_found());
    };

    let resource = Resource::LeaveRequest { owner_id };
    let subject = auth.subject();

    // a row the subject cannot read looks exactly like a missing one
    if !policy::can(&subject, Operation::Select, &resource, None).is_allowed() {
        return Ok(not_found());
    }

    let mut changes = Map::new();
    changes.insert("status".into(), json!(next.to_string()));

    let decision = policy::can(&subject, Operation::Update, &resource, Some(&changes));
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = $1
        WHERE id = $2
        AND status = $3
        "#,
    )
    .bind(next.to_string())
    .bind(leave_id)
    .bind(LeaveStatus::PendingTl.to_string())
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Leave transition failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": match next {
            LeaveStatus::Approved => "Leave approved",
            LeaveStatus::Rejected => "Leave rejected",
            LeaveStatus::PendingTl => "Leave pending",
        }
    })))
}

/* =========================
Approve leave (TL/WFM)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    transition_leave(auth, pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await
}

/* =========================
Reject leave (TL/WFM)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    transition_leave(auth, pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveResponse>(
        r#"
        SELECT id, user_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        WHERE id = $1
        "#,
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(data) = leave else {
        return Ok(not_found());
    };

    let readable = policy::can(
        &auth.subject(),
        Operation::Select,
        &Resource::LeaveRequest {
            owner_id: data.user_id,
        },
        None,
    );
    if !readable.is_allowed() {
        // indistinguishable from an absent row
        return Ok(not_found());
    }

    Ok(HttpResponse::Ok().json(data))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut conditions: Vec<String> = Vec::new();
    let mut args: Vec<FilterValue> = Vec::new();

    // agents only ever see their own rows; approver roles may scope by owner
    if auth.is_approver() {
        if let Some(user_id) = query.user_id {
            conditions.push(format!("user_id = ${}", args.len() + 1));
            args.push(FilterValue::I64(user_id));
        }
    } else {
        conditions.push(format!("user_id = ${}", args.len() + 1));
        args.push(FilterValue::I64(auth.user_id));
    }

    if let Some(status) = query.status.as_deref() {
        if LeaveStatus::from_str(status).is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Unknown leave status"
            })));
        }
        conditions.push(format!("status = ${}", args.len() + 1));
        args.push(FilterValue::Str(status));
    }

    let where_sql = if conditions.is_empty() {
        "".to_string()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::I64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count leave requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, user_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        {}
        ORDER BY created_at DESC
        LIMIT ${} OFFSET ${}
        "#,
        where_sql,
        args.len() + 1,
        args.len() + 2
    );

    let mut data_q = sqlx::query_as::<_, LeaveResponse>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::I64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
        };
    }

    let leaves = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // -------------------------
    // Response
    // -------------------------
    let response = LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}
