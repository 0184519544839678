//! In-process document store for local runs and tests.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{compare_values, Direction, Document, DocumentError, DocumentStore, Filter, Query};

/// `DocumentStore` backed by a concurrent map of collections.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one document, if present.
    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), DocumentError> {
        let not_found = || DocumentError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };

        let mut docs = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let doc = docs.get_mut(id).ok_or_else(not_found)?;
        doc.extend(fields);
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, DocumentError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = docs
            .values()
            .filter(|doc| query.filter.as_ref().map_or(true, |f| f.matches(doc)))
            .filter(|doc| {
                // Ordering on a field excludes documents that lack it.
                query
                    .order_by
                    .as_ref()
                    .map_or(true, |order| doc.contains_key(&order.field))
            })
            .cloned()
            .collect();
        drop(docs);

        if let Some(order) = &query.order_by {
            matched.sort_by(|a, b| {
                let ordering = compare_values(&a[&order.field], &b[&order.field])
                    .unwrap_or(Ordering::Equal);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64, DocumentError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(0);
        };
        let count = docs
            .values()
            .filter(|doc| filter.map_or(true, |f| f.matches(doc)))
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        for (id, name, ts) in [
            ("a", "cpu", "2024-05-01T10:00:00.000Z"),
            ("b", "cpu", "2024-05-02T10:00:00.000Z"),
            ("c", "mem", "2024-05-03T10:00:00.000Z"),
        ] {
            store
                .upsert("metrics", id, doc(json!({"metric_name": name, "timestamp": ts})))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = seeded().await;
        let query = Query::new()
            .filter(Filter::eq("metric_name", "cpu"))
            .order_by("timestamp", Direction::Descending)
            .limit(1);

        let docs = store.query("metrics", &query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["timestamp"], "2024-05-02T10:00:00.000Z");
    }

    #[tokio::test]
    async fn test_order_by_skips_documents_without_field() {
        let store = seeded().await;
        store
            .upsert("metrics", "d", doc(json!({"metric_name": "cpu"})))
            .await
            .unwrap();

        let docs = store
            .query("metrics", &Query::new().order_by("timestamp", Direction::Ascending))
            .await
            .unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["timestamp"], "2024-05-01T10:00:00.000Z");
    }

    #[tokio::test]
    async fn test_update_merges_existing_only() {
        let store = seeded().await;
        store
            .update("metrics", "a", doc(json!({"value": 5})))
            .await
            .unwrap();
        let a = store.get("metrics", "a").unwrap();
        assert_eq!(a["metric_name"], "cpu");
        assert_eq!(a["value"], 5);

        let err = store
            .update("metrics", "missing", doc(json!({"value": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_count_with_and_without_filter() {
        let store = seeded().await;
        assert_eq!(store.count("metrics", None).await.unwrap(), 3);
        assert_eq!(
            store
                .count("metrics", Some(&Filter::eq("metric_name", "mem")))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.count("unknown", None).await.unwrap(), 0);
    }
}
