use axum::Json;
use axum::http::StatusCode;

use crate::api::models::ChatReply;

pub fn success(reply: String) -> (StatusCode, Json<ChatReply>) {
    (StatusCode::OK, Json(ChatReply { reply }))
}
