//! Owner identity extraction
//!
//! Authentication happens upstream; by the time a request reaches the API
//! the authenticated user id travels in the `x-owner-id` header.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};

use crate::error::{ApiError, api_error};

/// Header carrying the authenticated owner id
pub const OWNER_HEADER: &str = "x-owner-id";

/// The tenant a request acts on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match owner {
            Some(owner) => Ok(OwnerId(owner.to_string())),
            None => {
                tracing::debug!("Request without owner header");
                Err(api_error(
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    format!("missing {} header", OWNER_HEADER),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<OwnerId, ApiError> {
        let (mut parts, _) = request.into_parts();
        OwnerId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_owner_from_header() {
        let request = Request::builder()
            .header(OWNER_HEADER, "tenant-7")
            .body(())
            .unwrap();

        let owner = extract(request).await.unwrap();

        assert_eq!(owner.as_str(), "tenant-7");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();

        let (status, _) = extract(request).await.unwrap_err();

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_header_is_unauthorized() {
        let request = Request::builder()
            .header(OWNER_HEADER, "   ")
            .body(())
            .unwrap();

        assert!(extract(request).await.is_err());
    }
}
