//! 中间件
//!
//! 通过 `axum::middleware::from_fn` 挂载

use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 请求日志中间件
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    if status.is_server_error() {
        tracing::error!(method = %method, uri = %uri, status = status.as_u16(), elapsed = ?start.elapsed(), "Request failed");
    } else {
        tracing::info!(method = %method, uri = %uri, status = status.as_u16(), elapsed = ?start.elapsed(), "Request completed");
    }

    response
}

/// 请求 ID 中间件
///
/// 沿用客户端传入的 ID，没有时生成新的 UUID
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        });

    req.headers_mut().insert(REQUEST_ID_HEADER, request_id.clone());

    let mut response = next.run(req).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, request_id);

    response
}
