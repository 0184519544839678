//! Firestore REST client (`v1` API).
//!
//! Writes use `PATCH documents/{collection}/{id}`; reads use `:runQuery`
//! and `:runAggregationQuery` with a structured query. Works against the
//! emulator when `emulator_host` is set.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use super::auth::TokenSource;
use super::value::{decode, decode_fields, encode, encode_fields};
use super::{Document, DocumentError, DocumentStore, Filter, Query};
use crate::config::FirestoreConfig;

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";
const COUNT_ALIAS: &str = "total";

pub struct FirestoreClient {
    http: reqwest::Client,
    documents_url: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct AggregationItem {
    result: Option<AggregationResult>,
}

#[derive(Deserialize)]
struct AggregationResult {
    #[serde(rename = "aggregateFields", default)]
    aggregate_fields: Map<String, Value>,
}

impl FirestoreClient {
    pub fn new(http: reqwest::Client, config: &FirestoreConfig, tokens: Arc<dyn TokenSource>) -> Self {
        let root = match &config.emulator_host {
            Some(host) => format!("http://{host}/v1"),
            None => FIRESTORE_API.to_string(),
        };
        Self {
            http,
            documents_url: format!(
                "{root}/projects/{}/databases/{}/documents",
                config.project_id, config.database
            ),
            tokens,
        }
    }

    pub fn documents_url(&self) -> &str {
        &self.documents_url
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, DocumentError> {
        let mut url = Url::parse(&self.documents_url)?;
        url.path_segments_mut()
            .map_err(|_| DocumentError::Decode(format!("cannot-be-a-base URL {}", self.documents_url)))?
            .push(collection)
            .push(id);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DocumentError> {
        let request = match self.tokens.token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DocumentError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
        merge: bool,
    ) -> Result<(), DocumentError> {
        let mut url = self.document_url(collection, id)?;
        if merge {
            let mut pairs = url.query_pairs_mut();
            for key in fields.keys() {
                pairs.append_pair("updateMask.fieldPaths", key);
            }
            pairs.append_pair("currentDocument.exists", "true");
        }

        let body = json!({ "fields": encode_fields(fields) });
        match self.send(self.http.patch(url).json(&body)).await {
            Ok(_) => Ok(()),
            Err(DocumentError::Api { status, .. }) if merge && status == StatusCode::NOT_FOUND.as_u16() => {
                Err(DocumentError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Build a Firestore `StructuredQuery` for `query` over `collection`.
pub fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = json!({ "from": [{ "collectionId": collection }] });

    if let Some(filter) = &query.filter {
        structured["where"] = field_filter(filter);
    }
    if let Some(order) = &query.order_by {
        structured["orderBy"] = json!([{
            "field": { "fieldPath": order.field },
            "direction": order.direction,
        }]);
    }
    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }
    structured
}

fn field_filter(filter: &Filter) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field },
            "op": filter.op,
            "value": encode(&filter.value),
        }
    })
}

/// Pull `error.message` out of a Google API error body, or fall back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentError> {
        self.patch(collection, id, &fields, false).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentError> {
        self.patch(collection, id, &fields, true).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, DocumentError> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({ "structuredQuery": structured_query(collection, query) });

        let items: Vec<RunQueryItem> = self.send(self.http.post(url).json(&body)).await?.json().await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| decode_fields(&doc.fields))
            .collect()
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64, DocumentError> {
        let url = format!("{}:runAggregationQuery", self.documents_url);
        let query = Query {
            filter: filter.cloned(),
            ..Query::default()
        };
        let body = json!({
            "structuredAggregationQuery": {
                "structuredQuery": structured_query(collection, &query),
                "aggregations": [{ "alias": COUNT_ALIAS, "count": {} }],
            }
        });

        let items: Vec<AggregationItem> =
            self.send(self.http.post(url).json(&body)).await?.json().await?;
        let count = items
            .into_iter()
            .find_map(|item| item.result)
            .and_then(|result| result.aggregate_fields.get(COUNT_ALIAS).cloned())
            .ok_or_else(|| DocumentError::Decode("aggregation response without count".into()))?;

        decode(&count)?
            .as_u64()
            .ok_or_else(|| DocumentError::Decode(format!("invalid count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::documents::auth::StaticToken;
    use crate::backends::documents::Direction;

    fn client(emulator: Option<&str>) -> FirestoreClient {
        let config = FirestoreConfig {
            project_id: "demo-project".into(),
            emulator_host: emulator.map(str::to_owned),
            ..FirestoreConfig::default()
        };
        FirestoreClient::new(
            reqwest::Client::new(),
            &config,
            Arc::new(StaticToken::anonymous()),
        )
    }

    #[test]
    fn test_documents_url() {
        assert_eq!(
            client(None).documents_url(),
            "https://firestore.googleapis.com/v1/projects/demo-project/databases/(default)/documents"
        );
        assert_eq!(
            client(Some("localhost:8081")).documents_url(),
            "http://localhost:8081/v1/projects/demo-project/databases/(default)/documents"
        );
    }

    #[test]
    fn test_document_url_escapes_id() {
        let url = client(Some("localhost:8081"))
            .document_url("user_sessions", "a b")
            .unwrap();
        assert!(url.path().ends_with("/documents/user_sessions/a%20b"));
    }

    #[test]
    fn test_structured_query_shape() {
        let query = Query::new()
            .filter(Filter::eq("metric_name", "cpu"))
            .order_by("timestamp", Direction::Descending)
            .limit(100);
        assert_eq!(
            structured_query("application_metrics", &query),
            json!({
                "from": [{"collectionId": "application_metrics"}],
                "where": {"fieldFilter": {
                    "field": {"fieldPath": "metric_name"},
                    "op": "EQUAL",
                    "value": {"stringValue": "cpu"}
                }},
                "orderBy": [{"field": {"fieldPath": "timestamp"}, "direction": "DESCENDING"}],
                "limit": 100
            })
        );
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "Permission denied");
        assert_eq!(error_message("upstream down\n"), "upstream down");
    }
}
