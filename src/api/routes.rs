use axum::{
    body::Bytes,
    routing::post,
    Router,
    extract::State,
    response::IntoResponse,
};
use tower_http::cors::{CorsLayer, Any};
use tracing::info;

use crate::api::models::ChatRequest;
use crate::api::response;
use crate::error::{AppError, Result};
use crate::llm::call_openrouter;
use crate::prompt::{assemble, system_message};
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler).fallback(method_not_allowed))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse> {
    let start_time = std::time::Instant::now();
    let req = ChatRequest::from_body(&body)?;
    info!(
        messages = req.messages.len(),
        mode = %state.config.prompt_mode,
        "Processing chat request"
    );

    let reply = process_chat_request(&state, req).await?;

    info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Chat request completed");
    Ok(response::success(reply))
}

async fn process_chat_request(state: &AppState, req: ChatRequest) -> Result<String> {
    let mode = state.config.prompt_mode;
    let context = if mode.needs_context() {
        Some(state.aggregator.get_context().await)
    } else {
        None
    };

    let system = system_message(mode, context.as_deref());
    let messages = assemble(system, req.messages);

    call_openrouter(&state.http, &state.config, &messages).await
}
