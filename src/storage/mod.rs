// Storage layer module
pub mod sqlite_store;

pub use sqlite_store::{RequestMeta, RequestStore, RequestUpdate, StoredRequest};
