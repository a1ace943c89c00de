use crate::auth::auth::AuthUser;
use crate::policy::{self, Operation, Resource};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BreakType {
    Lunch,
    Rest,
    Training,
}

impl BreakType {
    fn as_str(&self) -> &str {
        match self {
            BreakType::Lunch => "lunch",
            BreakType::Rest => "rest",
            BreakType::Training => "training",
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBreak {
    #[schema(example = "2026-08-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "12:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "12:30:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = "lunch")]
    pub break_type: BreakType,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BreakFilter {
    /// Filter by owner (approver roles only; agents always see their own)
    #[schema(example = 42)]
    pub user_id: Option<i64>,
    #[schema(example = "2026-08-10", format = "date", value_type = String)]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BreakResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 42)]
    pub user_id: i64,
    #[schema(example = "2026-08-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "12:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "12:30:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = "lunch")]
    pub break_type: String,
}

/// Schedule a break
#[utoipa::path(
    post,
    path = "/api/v1/breaks",
    request_body = CreateBreak,
    responses(
        (status = 200, description = "Break scheduled successfully", body = Object, example = json!({
            "message": "Break scheduled"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Breaks"
)]
pub async fn create_break(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateBreak>,
) -> actix_web::Result<impl Responder> {
    if payload.start_time >= payload.end_time {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_time must be before end_time"
        })));
    }

    let mut changes = Map::new();
    changes.insert("user_id".into(), json!(auth.user_id));
    changes.insert("date".into(), json!(payload.date));
    changes.insert("start_time".into(), json!(payload.start_time));
    changes.insert("end_time".into(), json!(payload.end_time));
    changes.insert("break_type".into(), json!(payload.break_type.as_str()));

    let decision = policy::can(
        &auth.subject(),
        Operation::Insert,
        &Resource::BreakSchedule {
            owner_id: auth.user_id,
        },
        Some(&changes),
    );
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    sqlx::query(
        r#"
        INSERT INTO break_schedules (user_id, date, start_time, end_time, break_type)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.break_type.as_str())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to schedule break");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Break scheduled"
    })))
}

/// List scheduled breaks
#[utoipa::path(
    get,
    path = "/api/v1/breaks",
    params(BreakFilter),
    responses(
        (status = 200, description = "Break list", body = [BreakResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Breaks"
)]
pub async fn list_breaks(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<BreakFilter>,
) -> actix_web::Result<impl Responder> {
    // agents only ever see their own schedule
    let scope_user = if auth.is_approver() {
        query.user_id
    } else {
        Some(auth.user_id)
    };

    let mut conditions: Vec<String> = Vec::new();
    let mut idx = 0usize;

    if scope_user.is_some() {
        idx += 1;
        conditions.push(format!("user_id = ${idx}"));
    }
    if query.date.is_some() {
        idx += 1;
        conditions.push(format!("date = ${idx}"));
    }

    let where_sql = if conditions.is_empty() {
        "".to_string()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT id, user_id, date, start_time, end_time, break_type \
         FROM break_schedules{} ORDER BY date, start_time",
        where_sql
    );

    let mut q = sqlx::query_as::<_, BreakResponse>(&sql);
    if let Some(user_id) = scope_user {
        q = q.bind(user_id);
    }
    if let Some(date) = query.date {
        q = q.bind(date);
    }

    let breaks = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch break schedules");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(breaks))
}

/// Remove a scheduled break
#[utoipa::path(
    delete,
    path = "/api/v1/breaks/{break_id}",
    params(
        ("break_id" = i64, Path, description = "Break schedule ID")
    ),
    responses(
        (status = 200, description = "Break removed", body = Object, example = json!({
            "message": "Break removed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Break not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Breaks"
)]
pub async fn delete_break(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let break_id = path.into_inner();

    let owner = sqlx::query_scalar::<_, i64>("SELECT user_id FROM break_schedules WHERE id = $1")
        .bind(break_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, break_id, "Failed to fetch break schedule");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(owner_id) = owner else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Break not found"
        })));
    };

    let resource = Resource::BreakSchedule { owner_id };
    let subject = auth.subject();

    // a row the subject cannot read looks exactly like a missing one
    if !policy::can(&subject, Operation::Select, &resource, None).is_allowed() {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Break not found"
        })));
    }

    let decision = policy::can(&subject, Operation::Delete, &resource, None);
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    // ownership is re-asserted inside the delete itself for non-elevated
    // subjects, so decision and effect land in one statement
    let result = if auth.is_elevated() {
        sqlx::query("DELETE FROM break_schedules WHERE id = $1")
            .bind(break_id)
            .execute(pool.get_ref())
            .await
    } else {
        sqlx::query("DELETE FROM break_schedules WHERE id = $1 AND user_id = $2")
            .bind(break_id)
            .bind(auth.user_id)
            .execute(pool.get_ref())
            .await
    };

    let result = result.map_err(|e| {
        tracing::error!(error = %e, break_id, "Failed to delete break schedule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Break not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Break removed"
    })))
}
