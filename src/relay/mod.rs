//! HTTP relay between the desktop client and the object store.

pub mod gcs;
pub mod naming;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use gcs::GcsStore;
pub use routes::{RelayError, RelayState, create_router};
pub use server::{MAX_UPLOAD_BYTES, build_app, run_server};
pub use store::{MemoryStore, ObjectStore, StoreError};
