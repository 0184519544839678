//! Cloud collaborators behind narrow async traits.
//!
//! Each trait has a production implementation and an in-memory one. The
//! in-memory implementations back the default configuration and the tests.

pub mod activity_log;
pub mod blob;
pub mod documents;

pub use activity_log::{
    ActivityLog, ActivityLogStore, DatabaseError, MemoryActivityLogStore, NewActivityLog,
    PgActivityLogStore,
};
pub use blob::{BlobStore, ObjectStoreBlobs, StorageError};
pub use documents::{
    Direction, Document, DocumentError, DocumentStore, FieldOp, Filter, FirestoreClient,
    MemoryDocumentStore, Query,
};
