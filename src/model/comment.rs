use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "request_type": "leave",
        "request_id": 12,
        "author_id": 42,
        "content": "Covered by Kim while away",
        "is_system": false,
        "created_at": "2026-08-01T09:30:00Z"
    })
)]
pub struct Comment {
    #[schema(example = 1)]
    pub id: i64,

    /// Which request table the comment hangs off ("leave" or "break")
    #[schema(example = "leave")]
    pub request_type: String,

    #[schema(example = 12)]
    pub request_id: i64,

    #[schema(example = 42)]
    pub author_id: i64,

    #[schema(example = "Covered by Kim while away")]
    pub content: String,

    /// Platform-generated comments carry this flag and are not user-editable
    #[schema(example = false)]
    pub is_system: bool,

    #[schema(example = "2026-08-01T09:30:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
