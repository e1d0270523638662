use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use super::jwt::validate_access_token;
use super::AuthSettings;

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Permissive auth middleware.
///
/// Validates the bearer token, if any, and inserts its `Claims` into the
/// request extensions. Does NOT reject unauthenticated requests; the
/// extractors on each handler decide authorization.
pub async fn auth_middleware(
    State(settings): State<AuthSettings>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = extract_bearer_token(req.headers())
        .and_then(|token| match validate_access_token(&settings, token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid bearer token");
                None
            }
        });

    if let Some(claims) = claims {
        req.extensions_mut().insert(claims);
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers("bearer abc")), Some("abc"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert_eq!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer ")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
