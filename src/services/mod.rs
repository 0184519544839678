//! Domain operations over the cloud collaborators.
//!
//! Every collaborator call runs under the configured backend deadline and
//! counts towards `backend_failures_total` when it fails.

pub mod cloud_storage;
pub mod firestore;

pub use cloud_storage::{CloudStorageService, DEFAULT_FOLDER};
pub use firestore::{ApplicationStats, FirestoreService};
