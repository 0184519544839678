//! Request parameter extraction.
//!
//! Parameters are read from the query string and, for
//! `application/x-www-form-urlencoded` requests, from the body. A key present
//! in both takes the body's value.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::http::response::ApiResponse;

/// Extractor deserializing merged query/form parameters into `T`.
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<S, T> FromRequest<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiResponse<()>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut params = Map::new();
        if let Some(query) = req.uri().query() {
            collect_pairs(query.as_bytes(), &mut params);
        }

        if is_form(req.headers()) {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|rejection| bad_request(rejection.body_text()))?;
            collect_pairs(&body, &mut params);
        }

        serde_json::from_value(Value::Object(params))
            .map(Params)
            .map_err(|e| bad_request(format!("Invalid request parameters: {e}")))
    }
}

fn collect_pairs(raw: &[u8], into: &mut Map<String, Value>) {
    for (key, value) in form_urlencoded::parse(raw).into_owned() {
        into.insert(key, Value::String(value));
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn bad_request(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse::error(message, StatusCode::BAD_REQUEST.as_u16())
}
