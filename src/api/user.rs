use crate::{
    auth::auth::AuthUser,
    policy::{self, Operation, Resource},
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role_id: Option<i16>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

/// Directory row; the password column never leaves the database layer.
#[derive(Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "ada@company.com")]
    pub email: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace", nullable = true)]
    pub last_name: Option<String>,
    #[schema(example = "+46701234567", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub role_id: i16,
    #[schema(example = true)]
    pub is_active: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    I16(i16),
    Bool(bool),
    Like(String),
}

/// Directory listing; readable by every authenticated subject
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("role_id", Query, description = "Filter by role"),
        ("is_active", Query, description = "Filter by active flag"),
        ("search", Query, description = "Search by name or email")
    ),
    responses(
        (status = 200, description = "Paginated user directory", body = UserListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions: Vec<String> = Vec::new();
    let mut bindings: Vec<FilterValue> = Vec::new();

    if let Some(role_id) = query.role_id {
        conditions.push(format!("role_id = ${}", bindings.len() + 1));
        bindings.push(FilterValue::I16(role_id));
    }

    if let Some(is_active) = query.is_active {
        conditions.push(format!("is_active = ${}", bindings.len() + 1));
        bindings.push(FilterValue::Bool(is_active));
    }

    if let Some(search) = &query.search {
        let n = bindings.len() + 1;
        conditions.push(format!(
            "(first_name ILIKE ${} OR last_name ILIKE ${} OR email ILIKE ${})",
            n,
            n + 1,
            n + 2
        ));
        let like = format!("%{}%", search);
        bindings.push(FilterValue::Like(like.clone()));
        bindings.push(FilterValue::Like(like.clone()));
        bindings.push(FilterValue::Like(like));
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    debug!(sql = %count_sql, "Counting users");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            FilterValue::I16(v) => count_query.bind(*v),
            FilterValue::Bool(v) => count_query.bind(*v),
            FilterValue::Like(s) => count_query.bind(s.clone()),
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count users");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT id, email, first_name, last_name, phone, role_id, is_active \
         FROM users {} ORDER BY id DESC LIMIT ${} OFFSET ${}",
        where_clause,
        bindings.len() + 1,
        bindings.len() + 2
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching users");

    let mut data_query = sqlx::query_as::<_, UserResponse>(&data_sql);
    for b in &bindings {
        data_query = match b {
            FilterValue::I16(v) => data_query.bind(*v),
            FilterValue::Bool(v) => data_query.bind(*v),
            FilterValue::Like(s) => data_query.bind(s.clone()),
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let users = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch users");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found", body = Object, example = json!({
            "message": "User not found"
        })),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    _auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();

    let user = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, email, first_name, last_name, phone, role_id, is_active
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch user");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(u) => Ok(HttpResponse::Ok().json(u)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        }))),
    }
}

/// Update user profile columns
///
/// Agents may edit the contact columns of their own row; wfm may edit any
/// row including role assignment. Everything else comes back 403 with the
/// row untouched.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "User updated successfully", body = Object, example = json!({
            "message": "User updated successfully"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden by access policy"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();

    let changes = body
        .as_object()
        .ok_or_else(|| actix_web::error::ErrorBadRequest("Payload must be a JSON object"))?;

    // Snapshot the stored row the decision is made against
    let target = sqlx::query_as::<_, (i64, i16)>("SELECT id, role_id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user for update");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let Some((id, role_id)) = target else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    };

    let decision = policy::can(
        &auth.subject(),
        Operation::Update,
        &Resource::User { id, role_id },
        Some(changes),
    );
    if let Some(reason) = decision.reason() {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": reason
        })));
    }

    let update = build_update_sql("users", &body, "id", user_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated successfully"
    })))
}
