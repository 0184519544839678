//! Document store collaborator.
//!
//! Documents are flat JSON objects keyed by id inside a named collection.
//! The query surface is the small subset the service needs: one field
//! filter, one ordering, a limit, and a filtered count.

pub mod auth;
pub mod firestore;
pub mod memory;
pub mod value;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::resilience::timeouts::DeadlineExceeded;

pub use firestore::FirestoreClient;
pub use memory::MemoryDocumentStore;

/// Field map of a single document.
pub type Document = Map<String, Value>;

/// Errors from the document store collaborator.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Firestore returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("malformed document: {0}")]
    Decode(String),

    #[error("invalid Firestore URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("{0}")]
    Backend(String),
}

/// Comparison operator of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FieldOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FieldOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldOp::Equal, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldOp::GreaterThanOrEqual, value)
    }

    /// Whether `doc` satisfies this filter. Range operators only match
    /// values of the same type as the operand.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        if type_rank(actual) != type_rank(&self.value) {
            return false;
        }
        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            FieldOp::Equal => ordering == Ordering::Equal,
            FieldOp::LessThan => ordering == Ordering::Less,
            FieldOp::LessThanOrEqual => ordering != Ordering::Greater,
            FieldOp::GreaterThan => ordering == Ordering::Greater,
            FieldOp::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A single-collection query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Document store operations used by the service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or fully replace a document.
    async fn upsert(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), DocumentError>;

    /// Merge `fields` into an existing document. Fails with
    /// [`DocumentError::NotFound`] if it does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), DocumentError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, DocumentError>;

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64, DocumentError>;
}

/// Cross-type ordering rank: null < bool < number < string < array < object.
pub(crate) fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total-ish ordering over JSON values. Values of different types order by
/// [`type_rank`]; arrays and objects of the same type are unordered.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => {
            match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            }
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => Some(type_rank(a).cmp(&type_rank(b))),
    }
}
