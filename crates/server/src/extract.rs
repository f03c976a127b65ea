//! Extractors whose rejections answer with the `{"error": msg}` body.
//!
//! They wrap the axum extractors of the same name, turning every rejection
//! into a `ServerError::Generic` (400).

use axum::{
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, typed_header::TypedHeaderRejection};
use serde::Serialize;
use uuid::Uuid;

use crate::{ServerError, server::XHouseholdIds};

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<TypedHeaderRejection> for ServerError {
    fn from(value: TypedHeaderRejection) -> Self {
        Self::Generic(format!("invalid {} header", value.name()))
    }
}

/// JSON body extractor and response.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    axum::extract::Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Households named by the optional `x-household-ids` header.
pub struct HouseholdScope(pub Option<Vec<Uuid>>);

impl<S> FromRequestParts<S> for HouseholdScope
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header =
            <Option<TypedHeader<XHouseholdIds>> as FromRequestParts<S>>::from_request_parts(
                parts, state,
            )
            .await?;
        Ok(Self(header.map(|TypedHeader(XHouseholdIds(ids))| ids)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    async fn scope_of(value: Option<&str>) -> Result<HouseholdScope, ServerError> {
        let mut builder = axum::http::Request::builder().uri("/receipts");
        if let Some(value) = value {
            builder = builder.header("x-household-ids", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        HouseholdScope::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_scope_header_means_every_household() {
        assert!(scope_of(None).await.ok().unwrap().0.is_none());
    }

    #[tokio::test]
    async fn malformed_scope_header_is_a_json_bad_request() {
        let Err(err) = scope_of(Some("nope")).await else {
            panic!("header should be rejected");
        };
        let (status, message) = err.into_parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("x-household-ids"));
    }

    #[tokio::test]
    async fn bad_query_string_is_a_bad_request() {
        #[derive(Debug, serde::Deserialize)]
        struct Limit {
            #[allow(dead_code)]
            limit: Option<u64>,
        }

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/receipts?limit=abc")
            .body(())
            .unwrap()
            .into_parts();
        let Err(err) = Query::<Limit>::from_request_parts(&mut parts, &()).await else {
            panic!("query should be rejected");
        };
        assert_eq!(err.into_parts().0, StatusCode::BAD_REQUEST);
    }
}
