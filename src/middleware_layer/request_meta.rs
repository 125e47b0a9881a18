use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use http::HeaderValue;

use crate::error::{self, ErrorParts};
use crate::ids;

/// Header used to carry the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Outermost layer: correlates every request.
///
/// Takes the caller's `x-request-id` or generates one, re-renders any error
/// envelope left behind by `AppError::into_response` with `path` and
/// `requestId` filled in, and echoes the id on the response.
pub async fn request_meta(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(ids::new_request_id);

    let mut response = next.run(request).await;

    // Swap the body in place: inner layers (CORS, cookies) have already
    // stamped headers on this response and they must survive the rewrite.
    if let Some(parts) = response.extensions_mut().remove::<ErrorParts>() {
        let body = error::render_envelope(&parts, Some(&path), Some(&request_id));
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
            .headers_mut()
            .insert(http::header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        *response.body_mut() = Body::from(body);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::{middleware::from_fn, routing::get, Router};
    use http::{Request as HttpRequest, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/boom", get(|| async { Err::<(), _>(AppError::NotFound) }))
            .route("/ok", get(|| async { "fine" }))
            .layer(from_fn(request_meta))
    }

    #[tokio::test]
    async fn error_envelope_gains_path_and_request_id() {
        let response = app()
            .oneshot(HttpRequest::get("/boom").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(r#""path":"/boom""#), "{text}");
        assert!(text.contains(r#""requestId":"req_"#), "{text}");
    }

    #[tokio::test]
    async fn caller_supplied_request_id_is_kept() {
        let response = app()
            .oneshot(
                HttpRequest::get("/boom")
                    .header(REQUEST_ID_HEADER, "req_from_client")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "req_from_client"
        );
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains(r#""requestId":"req_from_client""#));
    }

    #[tokio::test]
    async fn error_rewrite_keeps_headers_set_by_inner_layers() {
        use tower_http::cors::CorsLayer;

        let cors = CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_credentials(true);
        let app = Router::new()
            .route("/boom", get(|| async { Err::<(), _>(AppError::NotFound) }))
            .layer(cors)
            .layer(from_fn(request_meta));

        let response = app
            .oneshot(
                HttpRequest::get("/boom")
                    .header("origin", "http://localhost:3000")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // The browser can only read the envelope if CORS survives the rewrite.
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .map(|v| v.to_str().unwrap()),
            Some("http://localhost:3000")
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .map(|v| v.to_str().unwrap()),
            Some("true")
        );

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(r#""path":"/boom""#), "{text}");
        assert!(text.contains(r#""requestId":"req_"#), "{text}");
    }

    #[tokio::test]
    async fn success_responses_pass_through_with_id() {
        let response = app()
            .oneshot(HttpRequest::get("/ok").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"fine");
    }
}
