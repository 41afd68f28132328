/// Match record persistence backends.
pub mod match_store;
/// Persisted record definitions.
pub mod models;
/// Storage error contract shared by every backend.
pub mod storage;
