//! Request extractors.

use std::ops::{Deref, DerefMut};

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequest, FromRequestParts, OptionalFromRequest, Request};
use axum::http::request::Parts;
use axum::Json;
use bookstore_db::{Database, Session};
use sqlx::SqliteConnection;

use crate::error::AppError;

/// Store session scoped to the current request.
///
/// Acquired before the handler body runs; the connection returns to the pool
/// when the handler finishes, on every exit path.
pub struct DbSession(pub Session);

impl<S> FromRequestParts<S> for DbSession
where
    Database: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db = Database::from_ref(state);
        let session = db.session().await?;
        Ok(Self(session))
    }
}

impl Deref for DbSession {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// JSON request body whose rejections use the [`AppError`] envelope.
///
/// As `Option<JsonBody<T>>`, a request without a `Content-Type` header yields
/// `None` instead of a rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> OptionalFromRequest<S> for JsonBody<T>
where
    Json<T>: OptionalFromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(value.map(|Json(value)| Self(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, StatusCode};
    use axum::{routing::post, Router};
    use tower::ServiceExt;

    fn router() -> Router {
        Router::new()
            .route(
                "/required",
                post(|JsonBody(ids): JsonBody<Vec<i64>>| async move { ids.len().to_string() }),
            )
            .route(
                "/optional",
                post(|body: Option<JsonBody<Vec<i64>>>| async move {
                    body.map_or(0, |JsonBody(ids)| ids.len()).to_string()
                }),
            )
    }

    async fn call(
        uri: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, Vec<u8>) {
        let mut request = axum::http::Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let response = router()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn type_mismatch_is_a_validation_envelope() {
        let (status, body) = call("/required", Some("application/json"), r#"["x"]"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["trace_id"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_and_wrong_content_type_are_bad_requests() {
        let (status, body) = call("/required", Some("application/json"), "[1,").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "bad_request");

        let (status, _) = call("/required", Some("text/plain"), "[1]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn optional_body_may_be_omitted() {
        let (status, body) = call("/optional", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"0");

        let (status, body) = call("/optional", Some("application/json"), "[1,2]").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"2");
    }
}
