use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Headers a browser client may send on the cross-origin call.
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Body of the preflight acknowledgement.
pub const PREFLIGHT_BODY: &str = "ok";

/// Answers `OPTIONS` preflights directly and stamps the CORS header set on
/// every other response, errors included.
///
/// Preflights never reach the inner service.
pub async fn cors_middleware(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        tracing::debug!(uri = %req.uri(), "Answering CORS preflight");
        let mut response = PREFLIGHT_BODY.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    response
}

pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}
