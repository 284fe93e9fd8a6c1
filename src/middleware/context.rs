use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;

/// Attach a fresh [`RequestContext`](crate::hierarchy::RequestContext) to the
/// request. If the client goes away and the handler future is dropped, the
/// guard cancels the context and any store call still in flight returns.
pub async fn request_context_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let ctx = state.request_context();
    let _cancel_on_drop = ctx.cancel_on_drop();
    request.extensions_mut().insert(ctx);
    next.run(request).await
}
