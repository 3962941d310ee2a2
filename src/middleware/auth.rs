use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::AuthContext;
use crate::handlers::AppState;

/// Decodes the bearer token, when there is a valid one, into an
/// `AuthContext` request extension. Never rejects: handlers decide what a
/// missing context means.
pub async fn jwt_decode_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_jwt_from_headers(&headers) {
        Ok(Some(token)) => match state.jwt.verify(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthContext::from(claims));
            }
            Err(e) => tracing::debug!("ignoring bearer token: {}", e),
        },
        Ok(None) => {}
        Err(msg) => tracing::debug!("ignoring authorization header: {}", msg),
    }

    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, &'static str> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token"),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err("Authorization header must use Bearer token format"),
    }
}
