use crate::auth::auth::AuthUser;
use crate::model::comment::Comment;
use crate::model::role::Role;
use crate::policy::{self, Operation, Resource};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use sqlx::PgPool;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};

/// Which request table a comment hangs off.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Deserialize, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Leave,
    Break,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateComment {
    #[schema(example = "leave")]
    pub request_type: RequestType,
    #[schema(example = 12)]
    pub request_id: i64,
    #[schema(example = "Covered by Kim while away")]
    pub content: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CommentFilter {
    #[schema(example = "leave")]
    pub request_type: String,
    #[schema(example = 12)]
    pub request_id: i64,
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": "Request not found"
    }))
}

/// Resolve the parent request row a comment points at. `None` when the
/// parent does not exist.
async fn parent_resource(
    pool: &PgPool,
    request_type: RequestType,
    request_id: i64,
) -> Result<Option<Resource>, sqlx::Error> {
    let owner = match request_type {
        RequestType::Leave => {
            sqlx::query_scalar::<_, i64>("SELECT user_id FROM leave_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(pool)
                .await?
                .map(|owner_id| Resource::LeaveRequest { owner_id })
        }
        RequestType::Break => {
            sqlx::query_scalar::<_, i64>("SELECT user_id FROM break_schedules WHERE id = $1")
                .bind(request_id)
                .fetch_optional(pool)
                .await?
                .map(|owner_id| Resource::BreakSchedule { owner_id })
        }
    };
    Ok(owner)
}

/// Create a comment on a request
///
/// The `is_system` flag is assigned by the server from the caller's role;
/// it is not accepted from the payload.
#[utoipa::path(
    post,
    path = "/api/v1/comments",
    request_body = CreateComment,
    responses(
        (status = 200, description = "Comment created", body = Object, example = json!({
            "message": "Comment added"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn create_comment(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateComment>,
) -> actix_web::Result<impl Responder> {
    if payload.content.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Comment content must not be empty"
        })));
    }

    let subject = auth.subject();

    // commenting requires visibility of the parent request; an invisible
    // parent reads as missing
    let parent = parent_resource(pool.get_ref(), payload.request_type, payload.request_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to resolve comment parent");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(parent) = parent else {
        return Ok(not_found());
    };

    if !policy::can(&subject, Operation::Select, &parent, None).is_allowed() {
        return Ok(not_found());
    }

    let is_system = auth.role == Role::System;

    let mut changes = Map::new();
    changes.insert(
        "request_type".into(),
        json!(payload.request_type.to_string()),
    );
    changes.insert("request_id".into(), json!(payload.request_id));
    changes.insert("author_id".into(), json!(auth.user_id));
    changes.insert("content".into(), json!(payload.content));
    if is_system {
        changes.insert("is_system".into(), json!(true));
    }

    let candidate = Resource::Comment {
        author_id: auth.user_id,
        is_system,
    };

    let decision = policy::can(&subject, Operation::Insert, &candidate, Some(&changes));
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    sqlx::query(
        r#"
        INSERT INTO comments (request_type, request_id, author_id, content, is_system)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(payload.request_type.to_string())
    .bind(payload.request_id)
    .bind(auth.user_id)
    .bind(&payload.content)
    .bind(is_system)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create comment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Comment added"
    })))
}

/// List comments on a request
#[utoipa::path(
    get,
    path = "/api/v1/comments",
    params(CommentFilter),
    responses(
        (status = 200, description = "Comments on the request, oldest first", body = [Comment]),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn list_comments(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<CommentFilter>,
) -> actix_web::Result<impl Responder> {
    let Ok(request_type) = RequestType::from_str(&query.request_type) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Unknown request type"
        })));
    };

    let parent = parent_resource(pool.get_ref(), request_type, query.request_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to resolve comment parent");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(parent) = parent else {
        return Ok(not_found());
    };

    let subject = auth.subject();
    if !policy::can(&subject, Operation::Select, &parent, None).is_allowed() {
        return Ok(not_found());
    }

    // system and user comments read alike once the parent is visible
    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, request_type, request_id, author_id, content, is_system, created_at
        FROM comments
        WHERE request_type = $1 AND request_id = $2
        ORDER BY created_at
        "#,
    )
    .bind(request_type.to_string())
    .bind(query.request_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch comments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(comments))
}

/// Edit a comment
///
/// Owners may edit the content of their own comments; system comments are
/// only editable through the privileged roles. The stored flag gates the
/// write, inside the same statement that performs it.
#[utoipa::path(
    put,
    path = "/api/v1/comments/{comment_id}",
    params(
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Comment updated", body = Object, example = json!({
            "message": "Comment updated"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden by access policy"),
        (status = 404, description = "Comment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn update_comment(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let comment_id = path.into_inner();

    let changes = body
        .as_object()
        .ok_or_else(|| actix_web::error::ErrorBadRequest("Payload must be a JSON object"))?;

    // decide against the stored row, not the caller's claims about it
    let stored = sqlx::query_as::<_, (i64, bool)>(
        "SELECT author_id, is_system FROM comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, comment_id, "Failed to fetch comment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((author_id, is_system)) = stored else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Comment not found"
        })));
    };

    let resource = Resource::Comment {
        author_id,
        is_system,
    };

    let decision = policy::can(
        &auth.subject(),
        Operation::Update,
        &resource,
        Some(changes),
    );
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    let affected = if auth.is_elevated() {
        let update = crate::utils::db_utils::build_update_sql("comments", &body, "id", comment_id)?;
        crate::utils::db_utils::execute_update(pool.get_ref(), update)
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?
    } else {
        // owner path: the policy has pinned the change set to `content`,
        // and the statement re-asserts authorship and the stored flag
        let content = changes
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| actix_web::error::ErrorBadRequest("content must be a string"))?;

        sqlx::query(
            r#"
            UPDATE comments
            SET content = $1
            WHERE id = $2
            AND author_id = $3
            AND is_system = FALSE
            "#,
        )
        .bind(content)
        .bind(comment_id)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, comment_id, "Failed to update comment");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .rows_affected()
    };

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Comment not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Comment updated"
    })))
}

/// Delete a comment (service cleanup only)
#[utoipa::path(
    delete,
    path = "/api/v1/comments/{comment_id}",
    params(
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment deleted", body = Object, example = json!({
            "message": "Comment deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden by access policy"),
        (status = 404, description = "Comment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn delete_comment(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let comment_id = path.into_inner();

    let stored = sqlx::query_as::<_, (i64, bool)>(
        "SELECT author_id, is_system FROM comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, comment_id, "Failed to fetch comment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((author_id, is_system)) = stored else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Comment not found"
        })));
    };

    let decision = policy::can(
        &auth.subject(),
        Operation::Delete,
        &Resource::Comment {
            author_id,
            is_system,
        },
        None,
    );
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({ "message": reason })));
    }

    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, comment_id, "Failed to delete comment");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Comment not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Comment deleted"
    })))
}
