//! Caller identity
//!
//! The authentication gateway in front of this service places the
//! authenticated student's id in `X-User-Id`.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated student making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentId(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for StudentId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;

        let value = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("X-User-Id is not valid text".to_string()))?;

        Uuid::parse_str(value.trim())
            .map(StudentId)
            .map_err(|_| ApiError::Unauthorized(format!("X-User-Id is not a valid id: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<StudentId, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        StudentId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = Uuid::new_v4();
        assert_eq!(extract(Some(&id.to_string())).await.unwrap(), StudentId(id));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header() {
        assert!(matches!(extract(None).await, Err(ApiError::Unauthorized(_))));
        assert!(matches!(extract(Some("student-7")).await, Err(ApiError::Unauthorized(_))));
    }
}
